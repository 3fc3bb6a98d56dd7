use core::convert::Infallible;
use core::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Role of a principal on the platform.
///
/// Roles form a closed set: every entitlement decision matches on them
/// exhaustively. Profile rows carrying a value this build does not know decode
/// to [`Role::Unknown`], which grants the least privilege.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum Role {
    Admin,
    Teacher,
    Student,
    Learner,
    Unknown,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Admin => "admin",
            Role::Teacher => "teacher",
            Role::Student => "student",
            Role::Learner => "learner",
            Role::Unknown => "unknown",
        }
    }
}

impl FromStr for Role {
    type Err = Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let role = match s.trim().to_ascii_lowercase().as_str() {
            "admin" => Role::Admin,
            "teacher" => Role::Teacher,
            "student" => Role::Student,
            "learner" => Role::Learner,
            _ => Role::Unknown,
        };
        Ok(role)
    }
}

impl core::fmt::Display for Role {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for Role {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for Role {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        // Infallible: unrecognized values become `Unknown`.
        let Ok(role) = raw.parse::<Role>();
        Ok(role)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_case_insensitively() {
        assert_eq!("Teacher".parse::<Role>().unwrap(), Role::Teacher);
        assert_eq!(" STUDENT ".parse::<Role>().unwrap(), Role::Student);
    }

    #[test]
    fn unrecognized_role_decodes_to_unknown() {
        let role: Role = serde_json::from_str("\"principal\"").unwrap();
        assert_eq!(role, Role::Unknown);
    }

    #[test]
    fn serializes_lowercase() {
        assert_eq!(serde_json::to_string(&Role::Learner).unwrap(), "\"learner\"");
    }
}
