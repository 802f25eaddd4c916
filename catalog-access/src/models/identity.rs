//! Identity model and the integer id aliases used across the catalog.

use serde::Serialize;

use super::Role;

pub type IdentityId = i32;
pub type RecordId = i32;
pub type GroupId = i32;
pub type TagId = i32;
pub type KeywordId = i32;
pub type FileId = i32;

/// An authenticated caller. Built once per successful authentication and
/// never mutated afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Identity {
    pub id: IdentityId,
    pub key: String,
    #[serde(skip)]
    pub role: Role,
}

impl Identity {
    pub fn new(id: IdentityId, key: impl Into<String>, role: Role) -> Self {
        Self {
            id,
            key: key.into(),
            role,
        }
    }

    pub fn has_rank(&self, min: Role) -> bool {
        Role::rank_at_least(min, self.role)
    }
}
