//! Test helper module for catalog-access integration tests.
//!
//! Builds an [`AccessCore`] over the in-memory store with a fixed clock and
//! a small catalog fixture.

#![allow(dead_code)]

use catalog_access::config::AccessSettings;
use catalog_access::models::Role;
use catalog_access::services::totp::{self, TotpParams};
use catalog_access::services::{MockClock, MockDataStore};
use catalog_access::AccessCore;
use std::sync::Arc;

pub const NOW: i64 = 1_700_000_000;
pub const TAG: i32 = 1;
pub const OTHER_TAG: i32 = 2;

pub const NORMAL_ID: i32 = 1;
pub const NORMAL_KEY: &str = "normal-key";
pub const NORMAL_SECRET: &str = "normal-secret";
pub const ADMIN_ID: i32 = 2;
pub const ADMIN_KEY: &str = "admin-key";
pub const SUPER_ID: i32 = 3;
pub const SUPER_KEY: &str = "super-key";
pub const LONER_ID: i32 = 4;
pub const LONER_KEY: &str = "loner-key";

pub struct TestCore {
    pub core: AccessCore,
    pub store: Arc<MockDataStore>,
    pub clock: Arc<MockClock>,
    pub settings: AccessSettings,
}

impl TestCore {
    pub fn new() -> Self {
        Self::with_settings(AccessSettings::default())
    }

    pub fn with_settings(settings: AccessSettings) -> Self {
        Self::from_store(fixture(), settings)
    }

    pub fn from_store(store: MockDataStore, settings: AccessSettings) -> Self {
        let store = Arc::new(store);
        let clock = Arc::new(MockClock::at_unix(NOW));
        let core = AccessCore::new(store.clone(), settings.clone(), clock.clone());
        Self {
            core,
            store,
            clock,
            settings,
        }
    }

    /// The valid code for `secret` at the clock's current time.
    pub fn code_for(&self, secret: &str) -> u32 {
        code_at(secret, &self.settings.totp, self.clock_seconds())
    }

    pub fn clock_seconds(&self) -> i64 {
        use catalog_access::services::Clock;
        self.clock.unix_seconds()
    }
}

pub fn code_at(secret: &str, params: &TotpParams, now: i64) -> u32 {
    totp::generate(secret.as_bytes(), params.counter_at(now) as u64, params)
        .expect("code generation")
}

/// A code guaranteed to differ from every code accepted around `now`.
pub fn wrong_code(secret: &str, params: &TotpParams, now: i64) -> u32 {
    let accepted: Vec<u32> = (-(params.drift_windows as i64)..=params.drift_windows as i64)
        .map(|d| code_at(secret, params, now + d * params.step_seconds))
        .collect();
    (0..)
        .find(|c| !accepted.contains(c))
        .expect("some code is rejected")
}

/// Identities:
/// - 1 normal, groups {1, 2}, allowed from 10.0.*
/// - 2 administrator, no groups, allowed from anywhere
/// - 3 superuser
/// - 4 normal, no groups
///
/// Records 1..=3 carry "bar" under tag 1, records 2 and 3 carry "foo".
/// Record groups: 1 -> {3, 2}, 2 -> {3, 4}, 3 -> {1}, 4 -> {4}.
pub fn fixture() -> MockDataStore {
    MockDataStore::new()
        .with_identity(NORMAL_ID, NORMAL_KEY, NORMAL_SECRET, Role::Normal)
        .with_identity(ADMIN_ID, ADMIN_KEY, "admin-secret", Role::Administrator)
        .with_identity(SUPER_ID, SUPER_KEY, "super-secret", Role::Superuser)
        .with_identity(LONER_ID, LONER_KEY, "loner-secret", Role::Normal)
        .with_identity_groups(NORMAL_ID, &[1, 2])
        .with_ip_allow(NORMAL_ID, &["10.0."])
        .with_ip_allow(ADMIN_ID, &["*"])
        .with_ip_allow(SUPER_ID, &["*"])
        .with_ip_allow(LONER_ID, &["*"])
        .with_record_groups(1, &[3, 2])
        .with_record_groups(2, &[3, 4])
        .with_record_groups(3, &[1])
        .with_record_groups(4, &[4])
        .with_keyword(TAG, "bar", &[1, 2, 3])
        .with_keyword(TAG, "foo", &[2, 3])
        .with_keyword(TAG, "Lymphoma", &[1])
        .with_keyword(TAG, "Lymph node", &[4])
        .with_keyword(OTHER_TAG, "bar", &[9])
        .with_file(100, &[2, 1])
        .with_file(101, &[4])
        .with_group(1, "Staudt", "#ff0000")
        .with_group(2, "Dalla-Favera", "#00ff00")
        .with_group(3, "Basso", "#0000ff")
}
