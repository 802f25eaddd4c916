use secrecy::{ExposeSecret, SecretString};
use tracing::instrument;

use super::cache::Cache;
use super::totp::{self, TotpParams};
use super::ServiceError;
use crate::models::IdentityId;

/// TOTP verification with a per-identity record of the last accepted window.
///
/// With `trust_same_window` set, any code presented in a window that already
/// validated for the identity is accepted without recomputation. That treats
/// "same window" as "same code"; turn the flag off to always verify.
pub struct ReplayGuard {
    params: TotpParams,
    trust_same_window: bool,
    accepted: Cache<IdentityId, i64>,
}

impl ReplayGuard {
    pub fn new(params: TotpParams, trust_same_window: bool) -> Self {
        Self {
            params,
            trust_same_window,
            accepted: Cache::new("replay_counters"),
        }
    }

    pub fn params(&self) -> &TotpParams {
        &self.params
    }

    #[instrument(skip(self, secret, code))]
    pub fn verify(
        &self,
        identity_id: IdentityId,
        secret: &SecretString,
        code: u32,
        now_seconds: i64,
    ) -> Result<bool, ServiceError> {
        let counter = self.params.counter_at(now_seconds);

        if self.trust_same_window && self.accepted.get(&identity_id) == Some(counter) {
            tracing::debug!(identity_id, counter, "TOTP window already accepted");
            return Ok(true);
        }

        let matched = totp::verify(
            secret.expose_secret().as_bytes(),
            code,
            counter,
            &self.params,
        )?;

        match matched {
            Some(window) => {
                self.accepted.put(identity_id, counter);
                tracing::debug!(identity_id, counter, window, "TOTP code accepted");
                Ok(true)
            }
            None => Ok(false),
        }
    }

    pub fn last_accepted(&self, identity_id: IdentityId) -> Option<i64> {
        self.accepted.get(&identity_id)
    }

    pub fn invalidate(&self, identity_id: IdentityId) {
        self.accepted.remove(&identity_id);
    }

    pub fn clear(&self) {
        self.accepted.clear();
    }
}
