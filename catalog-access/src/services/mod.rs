//! Services layer for catalog-access.
//!
//! Credential verification, role and group resolution, visibility decisions
//! and keyword search, each owning its own caches.

pub mod cache;
pub mod clock;
mod credentials;
mod database;
pub mod error;
mod groups;
mod mock_store;
mod replay_guard;
mod result_filter;
mod roles;
mod search;
pub mod totp;
mod visibility;

pub use cache::{Cache, NestedCache};
pub use clock::{default_clock, Clock, MockClock, SystemClock};
pub use credentials::{CredentialValidator, IpDecision};
pub use database::{DataStore, PgDataStore};
pub use error::ServiceError;
pub use groups::{GroupMembership, GroupSet};
pub use mock_store::MockDataStore;
pub use replay_guard::ReplayGuard;
pub use result_filter::ResultFilter;
pub use roles::RoleResolver;
pub use search::QueryEvaluator;
pub use totp::{TotpAlgorithm, TotpParams};
pub use visibility::VisibilityGate;
