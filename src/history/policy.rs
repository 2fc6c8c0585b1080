//! Authorization rules for history records.

use std::fmt;
use std::str::FromStr;

use crate::ids::UserId;

use super::record::History;

/// Whether `caller` may delete `record`.
///
/// Ownership is the only key: the caller must be the user the record was
/// created for.
pub fn can_delete(record: &History, caller: &UserId) -> bool {
    record.user_id == *caller
}

/// Who may list a user's history.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ListPolicy {
    /// Any authenticated caller may list any user's history.
    #[default]
    Open,

    /// Callers may only list their own history.
    OwnerOnly,
}

impl ListPolicy {
    /// Whether `caller` may list the history of `target` under this policy.
    pub fn allows(&self, caller: &UserId, target: &UserId) -> bool {
        match self {
            ListPolicy::Open => true,
            ListPolicy::OwnerOnly => caller == target,
        }
    }
}

impl fmt::Display for ListPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ListPolicy::Open => write!(f, "open"),
            ListPolicy::OwnerOnly => write!(f, "owner"),
        }
    }
}

impl FromStr for ListPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "open" => Ok(ListPolicy::Open),
            "owner" | "owner-only" | "owner_only" => Ok(ListPolicy::OwnerOnly),
            other => Err(format!(
                "unknown history policy '{}' (expected 'open' or 'owner')",
                other
            )),
        }
    }
}
