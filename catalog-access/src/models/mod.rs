pub mod auth_outcome;
pub mod group;
pub mod identity;
pub mod role;
pub mod search;

pub use auth_outcome::AuthOutcome;
pub use group::Group;
pub use identity::{FileId, GroupId, Identity, IdentityId, KeywordId, RecordId, TagId};
pub use role::Role;
pub use search::{KeywordClause, SearchOp, SearchResultSet};
