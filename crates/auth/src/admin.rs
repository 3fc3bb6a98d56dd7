//! Configured admin allow-list.
//!
//! Emails on this list resolve to `Admin` with full entitlement regardless of the
//! profile store. It is an operator escape hatch read from configuration, not a
//! secret.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

/// Case-insensitive set of admin emails.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "Vec<String>", into = "Vec<String>")]
pub struct AdminAllowList(HashSet<String>);

impl AdminAllowList {
    pub fn new<I, S>(emails: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self(
            emails
                .into_iter()
                .filter_map(|e| normalize(e.as_ref()))
                .collect(),
        )
    }

    /// Parse a comma-separated list (`"a@x.org, b@x.org"`); blanks are ignored.
    pub fn parse(raw: &str) -> Self {
        Self::new(raw.split(','))
    }

    pub fn contains(&self, email: &str) -> bool {
        normalize(email).is_some_and(|e| self.0.contains(&e))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

fn normalize(email: &str) -> Option<String> {
    let trimmed = email.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_ascii_lowercase())
    }
}

impl From<Vec<String>> for AdminAllowList {
    fn from(value: Vec<String>) -> Self {
        Self::new(value)
    }
}

impl From<AdminAllowList> for Vec<String> {
    fn from(value: AdminAllowList) -> Self {
        let mut emails: Vec<String> = value.0.into_iter().collect();
        emails.sort();
        emails
    }
}
