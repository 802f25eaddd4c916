//! Per-record and per-file visibility decisions.
//!
//! A record is visible to an identity iff the identity's role outranks
//! Normal, or the identity and the record share at least one group. Cached
//! decisions are memoizations of that rule and never a separate source of
//! truth.

use std::sync::Arc;
use tracing::instrument;

use super::cache::NestedCache;
use super::groups::GroupMembership;
use super::roles::RoleResolver;
use super::{DataStore, ServiceError};
use crate::models::{FileId, IdentityId, RecordId};

pub struct VisibilityGate {
    enabled: bool,
    store: Arc<dyn DataStore>,
    roles: Arc<RoleResolver>,
    groups: Arc<GroupMembership>,
    records: NestedCache<IdentityId, RecordId, bool>,
    files: NestedCache<IdentityId, FileId, bool>,
}

impl VisibilityGate {
    pub fn new(
        store: Arc<dyn DataStore>,
        roles: Arc<RoleResolver>,
        groups: Arc<GroupMembership>,
        enabled: bool,
    ) -> Self {
        Self {
            enabled,
            store,
            roles,
            groups,
            records: NestedCache::new("record_visibility"),
            files: NestedCache::new("file_visibility"),
        }
    }

    /// False when view permissions are switched off and every record is
    /// visible to everyone.
    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    #[instrument(skip(self))]
    pub async fn can_view(
        &self,
        identity_id: IdentityId,
        record_id: RecordId,
    ) -> Result<bool, ServiceError> {
        if !self.enabled {
            return Ok(true);
        }

        if let Some(visible) = self.records.get(&identity_id, &record_id) {
            return Ok(visible);
        }

        let visible = if self.roles.role_of(identity_id).await?.bypasses_visibility() {
            true
        } else {
            let mine = self.groups.groups_of_identity(identity_id).await?;
            // Skip the record lookup when the identity has no groups at all.
            if mine.is_empty() {
                false
            } else {
                let theirs = self.groups.groups_of_record(record_id).await?;
                !mine.is_disjoint(&theirs)
            }
        };

        self.records.put(identity_id, record_id, visible);

        Ok(visible)
    }

    /// True as soon as one of `record_ids` is visible. An empty slice is not
    /// visible.
    pub async fn can_view_any(
        &self,
        identity_id: IdentityId,
        record_ids: &[RecordId],
    ) -> Result<bool, ServiceError> {
        if !self.enabled {
            return Ok(true);
        }

        for &record_id in record_ids {
            if self.can_view(identity_id, record_id).await? {
                return Ok(true);
            }
        }

        Ok(false)
    }

    /// A file is visible when any record it belongs to is.
    #[instrument(skip(self))]
    pub async fn can_view_file(
        &self,
        identity_id: IdentityId,
        file_id: FileId,
    ) -> Result<bool, ServiceError> {
        if !self.enabled {
            return Ok(true);
        }

        if self.roles.role_of(identity_id).await?.bypasses_visibility() {
            return Ok(true);
        }

        if let Some(visible) = self.files.get(&identity_id, &file_id) {
            return Ok(visible);
        }

        let records = self.store.lookup_records_of_file(file_id).await?;
        let visible = self.can_view_any(identity_id, &records).await?;
        self.files.put(identity_id, file_id, visible);

        Ok(visible)
    }

    pub fn invalidate_identity(&self, identity_id: IdentityId) {
        self.records.clear_outer(&identity_id);
        self.files.clear_outer(&identity_id);
    }

    pub fn clear(&self) {
        self.records.clear();
        self.files.clear();
    }
}
