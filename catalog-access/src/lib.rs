pub mod config;
pub mod models;
pub mod services;
pub mod utils;

use std::collections::BTreeSet;
use std::sync::Arc;

use crate::config::{AccessConfig, AccessSettings};
use crate::models::{
    AuthOutcome, FileId, Group, GroupId, Identity, IdentityId, RecordId, Role, SearchOp, TagId,
};
use crate::services::{
    default_clock, Clock, CredentialValidator, DataStore, GroupMembership, PgDataStore,
    QueryEvaluator, ReplayGuard, ResultFilter, RoleResolver, ServiceError, VisibilityGate,
};

/// The access core: authentication, visibility and search over one data
/// store, with every cache owned here and dropped with it.
pub struct AccessCore {
    store: Arc<dyn DataStore>,
    roles: Arc<RoleResolver>,
    groups: Arc<GroupMembership>,
    visibility: Arc<VisibilityGate>,
    credentials: CredentialValidator,
    evaluator: QueryEvaluator,
    filter: ResultFilter,
}

impl AccessCore {
    pub fn new(store: Arc<dyn DataStore>, settings: AccessSettings, clock: Arc<dyn Clock>) -> Self {
        let roles = Arc::new(RoleResolver::new(store.clone()));
        let groups = Arc::new(GroupMembership::new(store.clone()));
        let visibility = Arc::new(VisibilityGate::new(
            store.clone(),
            roles.clone(),
            groups.clone(),
            settings.view_permissions_enabled,
        ));
        let credentials = CredentialValidator::new(
            store.clone(),
            roles.clone(),
            ReplayGuard::new(settings.totp, settings.trust_same_window),
            clock,
            settings.auth_enabled,
            settings.api_key_max_length,
        );

        Self {
            evaluator: QueryEvaluator::new(store.clone()),
            filter: ResultFilter::new(visibility.clone(), groups.clone()),
            store,
            roles,
            groups,
            visibility,
            credentials,
        }
    }

    /// Connect to PostgreSQL and build a core on the system clock.
    pub async fn connect(config: &AccessConfig) -> Result<Self, ServiceError> {
        let store =
            PgDataStore::connect(&config.database.url, config.database.max_connections).await?;

        Ok(Self::new(
            Arc::new(store),
            config.access.clone(),
            default_clock(),
        ))
    }

    pub async fn authenticate(
        &self,
        api_key: &str,
        totp_code: u32,
        remote_ip: &str,
    ) -> Result<AuthOutcome, ServiceError> {
        self.credentials
            .authenticate(api_key, totp_code, remote_ip)
            .await
    }

    pub async fn authorize(
        &self,
        api_key: &str,
        totp_code: u32,
        remote_ip: &str,
        min_role: Role,
    ) -> Result<Option<Identity>, ServiceError> {
        self.credentials
            .authorize(api_key, totp_code, remote_ip, min_role)
            .await
    }

    pub async fn check_api_key(&self, api_key: &str) -> Result<Vec<AuthOutcome>, ServiceError> {
        self.credentials.check_api_key(api_key).await
    }

    pub async fn role_of(&self, identity_id: IdentityId) -> Result<Role, ServiceError> {
        self.roles.role_of(identity_id).await
    }

    /// Raw keyword search, before visibility filtering.
    pub async fn evaluate(
        &self,
        tag_id: TagId,
        expression: &[SearchOp],
        max_results: i64,
    ) -> Result<BTreeSet<RecordId>, ServiceError> {
        self.evaluator.evaluate(tag_id, expression, max_results).await
    }

    /// Keyword search narrowed to the records `identity_id` may see.
    pub async fn search(
        &self,
        identity_id: IdentityId,
        tag_id: TagId,
        expression: &[SearchOp],
        max_results: i64,
    ) -> Result<BTreeSet<RecordId>, ServiceError> {
        let ids = self.evaluate(tag_id, expression, max_results).await?;
        self.filter.filter(identity_id, ids).await
    }

    /// [`AccessCore::search`] over infix text such as `lymph AND -"gcb"`.
    pub async fn search_text(
        &self,
        identity_id: IdentityId,
        tag_id: TagId,
        query: &str,
        max_results: i64,
    ) -> Result<BTreeSet<RecordId>, ServiceError> {
        let expression = utils::parse_query(query)?;
        self.search(identity_id, tag_id, &expression, max_results)
            .await
    }

    pub async fn can_view(
        &self,
        identity_id: IdentityId,
        record_id: RecordId,
    ) -> Result<bool, ServiceError> {
        self.visibility.can_view(identity_id, record_id).await
    }

    pub async fn can_view_any(
        &self,
        identity_id: IdentityId,
        record_ids: &[RecordId],
    ) -> Result<bool, ServiceError> {
        self.visibility.can_view_any(identity_id, record_ids).await
    }

    pub async fn can_view_file(
        &self,
        identity_id: IdentityId,
        file_id: FileId,
    ) -> Result<bool, ServiceError> {
        self.visibility.can_view_file(identity_id, file_id).await
    }

    pub async fn filter_by_groups(
        &self,
        identity_id: IdentityId,
        record_ids: &[RecordId],
        group_ids: &[GroupId],
        all_mode: bool,
    ) -> Result<Vec<RecordId>, ServiceError> {
        self.filter
            .filter_by_groups(identity_id, record_ids, group_ids, all_mode)
            .await
    }

    /// Groups ordered by name; `None` lists all of them.
    pub async fn groups(&self, ids: Option<&[GroupId]>) -> Result<Vec<Group>, ServiceError> {
        self.store.lookup_groups(ids).await
    }

    /// Drop every cached entry for one identity.
    pub fn invalidate_identity(&self, identity_id: IdentityId) {
        self.roles.invalidate(identity_id);
        self.groups.invalidate_identity(identity_id);
        self.visibility.invalidate_identity(identity_id);
        self.credentials.invalidate_identity(identity_id);
        tracing::info!(identity_id, "Identity caches invalidated");
    }

    pub fn clear_role_cache(&self) {
        self.roles.clear();
    }

    pub fn clear_group_caches(&self) {
        self.groups.clear();
    }

    pub fn clear_visibility_cache(&self) {
        self.visibility.clear();
    }

    /// Key, secret, allow-list and replay caches together.
    pub fn clear_credential_caches(&self) {
        self.credentials.clear();
    }

    pub fn clear_ip_cache(&self) {
        self.credentials.clear_ip_decisions();
    }

    pub fn clear_replay_cache(&self) {
        self.credentials.clear_replay();
    }

    /// TOTP window last accepted for `identity_id`.
    pub fn last_accepted_window(&self, identity_id: IdentityId) -> Option<i64> {
        self.credentials.last_accepted(identity_id)
    }

    /// Empty every cache. Later lookups go back to the store.
    pub fn clear_caches(&self) {
        self.clear_role_cache();
        self.clear_group_caches();
        self.clear_visibility_cache();
        self.clear_credential_caches();
        tracing::info!("All access caches cleared");
    }
}
