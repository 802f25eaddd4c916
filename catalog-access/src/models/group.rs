use serde::Serialize;
use sqlx::FromRow;

use super::GroupId;

/// Access-control group linking identities and records.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, FromRow)]
pub struct Group {
    pub id: GroupId,
    pub name: String,
    pub color: String,
}
