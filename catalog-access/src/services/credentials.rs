//! API key + IP allow-list + TOTP authentication.

use secrecy::SecretString;
use std::sync::Arc;
use tracing::instrument;

use super::cache::Cache;
use super::clock::Clock;
use super::replay_guard::ReplayGuard;
use super::roles::RoleResolver;
use super::{DataStore, ServiceError};
use crate::models::{AuthOutcome, Identity, IdentityId, Role};
use crate::utils::{ip_matches, is_api_key};

/// Cached outcome of the allow-list check for one identity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IpDecision {
    /// The last address that passed.
    Allowed(String),
    /// Sticky until the cache is cleared.
    Blocked,
}

pub struct CredentialValidator {
    store: Arc<dyn DataStore>,
    roles: Arc<RoleResolver>,
    replay: ReplayGuard,
    clock: Arc<dyn Clock>,
    auth_enabled: bool,
    api_key_max_length: usize,
    keys: Cache<String, IdentityId>,
    secrets: Cache<IdentityId, SecretString>,
    ip_decisions: Cache<IdentityId, IpDecision>,
}

impl CredentialValidator {
    pub fn new(
        store: Arc<dyn DataStore>,
        roles: Arc<RoleResolver>,
        replay: ReplayGuard,
        clock: Arc<dyn Clock>,
        auth_enabled: bool,
        api_key_max_length: usize,
    ) -> Self {
        Self {
            store,
            roles,
            replay,
            clock,
            auth_enabled,
            api_key_max_length,
            keys: Cache::new("api_keys"),
            secrets: Cache::new("shared_secrets"),
            ip_decisions: Cache::new("ip_decisions"),
        }
    }

    /// Decide one authentication attempt.
    ///
    /// Malformed keys are rejected before any store access. An address
    /// outside the allow-list fails as `InvalidUser` without checking the
    /// code. Store failures are errors; denials are outcomes.
    #[instrument(skip(self, api_key, totp_code))]
    pub async fn authenticate(
        &self,
        api_key: &str,
        totp_code: u32,
        remote_ip: &str,
    ) -> Result<AuthOutcome, ServiceError> {
        if !is_api_key(api_key, self.api_key_max_length) {
            return Ok(self.finish(AuthOutcome::InvalidKeyFormat));
        }

        let Some(identity_id) = self.identity_for_key(api_key).await? else {
            return Ok(self.finish(AuthOutcome::InvalidUser));
        };

        if self.auth_enabled {
            if !self.ip_allowed(identity_id, remote_ip).await? {
                tracing::warn!(identity_id, remote_ip, "Address not on allow-list");
                self.record_attempt(identity_id, remote_ip, false).await;
                return Ok(self.finish(AuthOutcome::InvalidUser));
            }

            let Some(secret) = self.secret_of(identity_id).await? else {
                tracing::warn!(identity_id, "No shared secret on record");
                self.record_attempt(identity_id, remote_ip, false).await;
                return Ok(self.finish(AuthOutcome::InvalidTotp));
            };

            let now = self.clock.unix_seconds();
            if !self.replay.verify(identity_id, &secret, totp_code, now)? {
                tracing::warn!(identity_id, "TOTP code rejected");
                self.record_attempt(identity_id, remote_ip, false).await;
                return Ok(self.finish(AuthOutcome::InvalidTotp));
            }
        }

        let role = self.roles.role_of(identity_id).await?;
        self.record_attempt(identity_id, remote_ip, true).await;
        tracing::info!(identity_id, role = role.as_str(), "Authenticated");

        Ok(self.finish(AuthOutcome::Success(Identity::new(
            identity_id,
            api_key,
            role,
        ))))
    }

    /// `Some` only when authentication succeeds and the role ranks at least
    /// `min_role`.
    pub async fn authorize(
        &self,
        api_key: &str,
        totp_code: u32,
        remote_ip: &str,
        min_role: Role,
    ) -> Result<Option<Identity>, ServiceError> {
        let identity = self
            .authenticate(api_key, totp_code, remote_ip)
            .await?
            .into_identity()
            .filter(|identity| identity.has_rank(min_role));

        Ok(identity)
    }

    /// Key format and key lookup only, without IP or TOTP checks.
    pub async fn check_api_key(&self, api_key: &str) -> Result<Vec<AuthOutcome>, ServiceError> {
        if !is_api_key(api_key, self.api_key_max_length) {
            return Ok(vec![AuthOutcome::InvalidKeyFormat]);
        }

        let user = if self.identity_for_key(api_key).await?.is_some() {
            AuthOutcome::ValidUser
        } else {
            AuthOutcome::InvalidUser
        };

        Ok(vec![AuthOutcome::ValidKeyFormat, user])
    }

    async fn identity_for_key(&self, api_key: &str) -> Result<Option<IdentityId>, ServiceError> {
        if let Some(id) = self.keys.get(&api_key.to_string()) {
            return Ok(Some(id));
        }

        let id = self.store.lookup_identity_by_api_key(api_key).await?;
        // Unknown keys are not cached so new accounts work immediately.
        if let Some(id) = id {
            self.keys.put(api_key.to_string(), id);
        }

        Ok(id)
    }

    async fn secret_of(&self, identity_id: IdentityId) -> Result<Option<SecretString>, ServiceError> {
        if let Some(secret) = self.secrets.get(&identity_id) {
            return Ok(Some(secret));
        }

        let secret = self.store.lookup_shared_secret(identity_id).await?;
        if let Some(secret) = &secret {
            self.secrets.put(identity_id, secret.clone());
        }

        Ok(secret)
    }

    async fn ip_allowed(&self, identity_id: IdentityId, remote_ip: &str) -> Result<bool, ServiceError> {
        match self.ip_decisions.get(&identity_id) {
            Some(IpDecision::Blocked) => return Ok(false),
            Some(IpDecision::Allowed(ip)) if ip == remote_ip => return Ok(true),
            _ => {}
        }

        let allow_list = self.store.lookup_ip_allow_list(identity_id).await?;
        let allowed = allow_list.iter().any(|entry| ip_matches(entry, remote_ip));

        self.ip_decisions.put(
            identity_id,
            if allowed {
                IpDecision::Allowed(remote_ip.to_string())
            } else {
                IpDecision::Blocked
            },
        );

        Ok(allowed)
    }

    async fn record_attempt(&self, identity_id: IdentityId, remote_ip: &str, success: bool) {
        if let Err(e) = self
            .store
            .record_login_attempt(identity_id, remote_ip, success)
            .await
        {
            tracing::error!(identity_id, error = %e, "Failed to record login attempt");
        }
    }

    fn finish(&self, outcome: AuthOutcome) -> AuthOutcome {
        metrics::counter!("access_auth_outcomes_total", "outcome" => outcome.as_str())
            .increment(1);
        outcome
    }

    pub fn invalidate_identity(&self, identity_id: IdentityId) {
        self.keys.retain(|_, id| *id != identity_id);
        self.secrets.remove(&identity_id);
        self.ip_decisions.remove(&identity_id);
        self.replay.invalidate(identity_id);
    }

    /// Window last accepted for `identity_id`, if any.
    pub fn last_accepted(&self, identity_id: IdentityId) -> Option<i64> {
        self.replay.last_accepted(identity_id)
    }

    /// Forget allow-list decisions, releasing blocked identities.
    pub fn clear_ip_decisions(&self) {
        self.ip_decisions.clear();
    }

    pub fn clear_replay(&self) {
        self.replay.clear();
    }

    pub fn clear(&self) {
        self.keys.clear();
        self.secrets.clear();
        self.clear_ip_decisions();
        self.clear_replay();
    }
}
