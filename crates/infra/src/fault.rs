use std::time::Duration;

/// Simulated collaborator behaviour.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Fault {
    /// Answer immediately.
    #[default]
    None,
    /// Answer after a delay.
    Delay(Duration),
    /// Fail with the given message.
    Fail(String),
    /// Never answer.
    Hang,
}

impl Fault {
    pub fn fail(msg: impl Into<String>) -> Self {
        Self::Fail(msg.into())
    }

    /// Apply the delay/hang part of the fault; returns the failure message, if any.
    pub async fn inject(&self) -> Option<String> {
        match self {
            Fault::None => None,
            Fault::Delay(by) => {
                tokio::time::sleep(*by).await;
                None
            }
            Fault::Fail(msg) => Some(msg.clone()),
            Fault::Hang => std::future::pending().await,
        }
    }
}
