use std::sync::Arc;
use tracing::instrument;

use super::cache::Cache;
use super::{DataStore, ServiceError};
use crate::models::{IdentityId, Role};

/// Maps identities to their role, memoized without expiry.
pub struct RoleResolver {
    store: Arc<dyn DataStore>,
    roles: Cache<IdentityId, Role>,
}

impl RoleResolver {
    pub fn new(store: Arc<dyn DataStore>) -> Self {
        Self {
            store,
            roles: Cache::new("roles"),
        }
    }

    #[instrument(skip(self))]
    pub async fn role_of(&self, identity_id: IdentityId) -> Result<Role, ServiceError> {
        if let Some(role) = self.roles.get(&identity_id) {
            return Ok(role);
        }

        let role = self.store.lookup_role(identity_id).await?;
        self.roles.put(identity_id, role);
        tracing::debug!(identity_id, role = role.as_str(), "Role resolved");

        Ok(role)
    }

    pub fn invalidate(&self, identity_id: IdentityId) {
        self.roles.remove(&identity_id);
    }

    pub fn clear(&self) {
        self.roles.clear();
    }
}
