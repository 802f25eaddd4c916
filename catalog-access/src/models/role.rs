//! Role model - the three account tiers and their ranking.

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

/// Account tier of an identity.
///
/// Ordering goes through [`Role::rank`], never through declaration order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Normal,
    Administrator,
    Superuser,
}

impl Role {
    pub fn rank(self) -> u8 {
        match self {
            Role::Normal => 0,
            Role::Administrator => 1,
            Role::Superuser => 2,
        }
    }

    /// Map a stored `user_type_id`. Unknown ids and missing rows are normal
    /// accounts.
    pub fn from_type_id(type_id: i32) -> Self {
        match type_id {
            4 => Role::Superuser,
            3 => Role::Administrator,
            _ => Role::Normal,
        }
    }

    /// True iff `actual` ranks at or above `min`.
    pub fn rank_at_least(min: Role, actual: Role) -> bool {
        actual.rank() >= min.rank()
    }

    /// Administrators and superusers see every record.
    pub fn bypasses_visibility(self) -> bool {
        self.rank() > Role::Normal.rank()
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Normal => "normal",
            Role::Administrator => "administrator",
            Role::Superuser => "superuser",
        }
    }
}

impl PartialOrd for Role {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Role {
    fn cmp(&self, other: &Self) -> Ordering {
        self.rank().cmp(&other.rank())
    }
}
