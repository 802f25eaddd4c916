use std::collections::BTreeSet;
use std::sync::Arc;
use tracing::instrument;

use super::groups::GroupMembership;
use super::visibility::VisibilityGate;
use super::ServiceError;
use crate::models::{GroupId, IdentityId, RecordId};

/// Narrows raw search output to what an identity may see.
pub struct ResultFilter {
    gate: Arc<VisibilityGate>,
    groups: Arc<GroupMembership>,
}

impl ResultFilter {
    pub fn new(gate: Arc<VisibilityGate>, groups: Arc<GroupMembership>) -> Self {
        Self { gate, groups }
    }

    /// Keep the ids visible to `identity_id`. Order is preserved.
    #[instrument(skip(self, ids), fields(candidates = ids.len()))]
    pub async fn filter(
        &self,
        identity_id: IdentityId,
        ids: BTreeSet<RecordId>,
    ) -> Result<BTreeSet<RecordId>, ServiceError> {
        if !self.gate.is_enabled() {
            return Ok(ids);
        }

        let mut visible = BTreeSet::new();
        for id in ids {
            if self.gate.can_view(identity_id, id).await? {
                visible.insert(id);
            }
        }

        tracing::debug!(identity_id, visible = visible.len(), "Search results filtered");

        Ok(visible)
    }

    /// Keep records by group membership.
    ///
    /// In any-mode a record stays when it is in at least one of `group_ids`,
    /// and an empty list filters nothing. In all-mode a record must be in
    /// every listed group, and an empty list means the identity's own groups.
    #[instrument(skip(self, ids, group_ids))]
    pub async fn filter_by_groups(
        &self,
        identity_id: IdentityId,
        ids: &[RecordId],
        group_ids: &[GroupId],
        all_mode: bool,
    ) -> Result<Vec<RecordId>, ServiceError> {
        if !all_mode {
            if group_ids.is_empty() {
                return Ok(ids.to_vec());
            }

            let mut kept = Vec::with_capacity(ids.len());
            for &id in ids {
                let groups = self.groups.groups_of_record(id).await?;
                if group_ids.iter().any(|g| groups.contains(g)) {
                    kept.push(id);
                }
            }
            return Ok(kept);
        }

        let required: Vec<GroupId> = if group_ids.is_empty() {
            self.groups
                .groups_of_identity(identity_id)
                .await?
                .iter()
                .copied()
                .collect()
        } else {
            group_ids.to_vec()
        };

        let mut kept = Vec::with_capacity(ids.len());
        for &id in ids {
            let groups = self.groups.groups_of_record(id).await?;
            if required.iter().all(|g| groups.contains(g)) {
                kept.push(id);
            }
        }

        Ok(kept)
    }
}
