use std::collections::HashSet;
use std::sync::Arc;
use tracing::instrument;

use super::cache::Cache;
use super::{DataStore, ServiceError};
use crate::models::{GroupId, IdentityId, RecordId};

pub type GroupSet = Arc<HashSet<GroupId>>;

/// Group ids of identities and of records, each cached under its own key.
pub struct GroupMembership {
    store: Arc<dyn DataStore>,
    identity_groups: Cache<IdentityId, GroupSet>,
    record_groups: Cache<RecordId, GroupSet>,
}

impl GroupMembership {
    pub fn new(store: Arc<dyn DataStore>) -> Self {
        Self {
            store,
            identity_groups: Cache::new("identity_groups"),
            record_groups: Cache::new("record_groups"),
        }
    }

    #[instrument(skip(self))]
    pub async fn groups_of_identity(
        &self,
        identity_id: IdentityId,
    ) -> Result<GroupSet, ServiceError> {
        if let Some(groups) = self.identity_groups.get(&identity_id) {
            return Ok(groups);
        }

        let groups: GroupSet = Arc::new(
            self.store
                .lookup_groups_of_identity(identity_id)
                .await?
                .into_iter()
                .collect(),
        );
        self.identity_groups.put(identity_id, groups.clone());

        Ok(groups)
    }

    #[instrument(skip(self))]
    pub async fn groups_of_record(&self, record_id: RecordId) -> Result<GroupSet, ServiceError> {
        if let Some(groups) = self.record_groups.get(&record_id) {
            return Ok(groups);
        }

        let groups: GroupSet = Arc::new(
            self.store
                .lookup_groups_of_record(record_id)
                .await?
                .into_iter()
                .collect(),
        );
        self.record_groups.put(record_id, groups.clone());

        Ok(groups)
    }

    pub fn invalidate_identity(&self, identity_id: IdentityId) {
        self.identity_groups.remove(&identity_id);
    }

    pub fn clear(&self) {
        self.identity_groups.clear();
        self.record_groups.clear();
    }
}
