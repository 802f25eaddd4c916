//! Result of a single credential check.

use serde::Serialize;

use super::Identity;

/// Exactly one outcome is produced per authentication attempt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum AuthOutcome {
    InvalidKeyFormat,
    ValidKeyFormat,
    InvalidUser,
    ValidUser,
    InvalidTotp,
    Success(Identity),
}

impl AuthOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, AuthOutcome::Success(_))
    }

    pub fn identity(&self) -> Option<&Identity> {
        match self {
            AuthOutcome::Success(identity) => Some(identity),
            _ => None,
        }
    }

    pub fn into_identity(self) -> Option<Identity> {
        match self {
            AuthOutcome::Success(identity) => Some(identity),
            _ => None,
        }
    }

    /// Stable label for logs and metrics.
    pub fn as_str(&self) -> &'static str {
        match self {
            AuthOutcome::InvalidKeyFormat => "invalid_key_format",
            AuthOutcome::ValidKeyFormat => "valid_key_format",
            AuthOutcome::InvalidUser => "invalid_user",
            AuthOutcome::ValidUser => "valid_user",
            AuthOutcome::InvalidTotp => "invalid_totp",
            AuthOutcome::Success(_) => "success",
        }
    }
}
