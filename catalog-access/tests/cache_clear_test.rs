//! Integration tests for cache lifecycle: clearing and per-identity
//! invalidation.

mod common;

use catalog_access::models::{AuthOutcome, Role};
use common::*;

async fn snapshot(app: &TestCore) -> (Vec<bool>, Vec<Role>) {
    let mut visible = Vec::new();
    for record in 1..=4 {
        visible.push(app.core.can_view(NORMAL_ID, record).await.unwrap());
    }
    let mut roles = Vec::new();
    for identity in [NORMAL_ID, ADMIN_ID, SUPER_ID] {
        roles.push(app.core.role_of(identity).await.unwrap());
    }
    (visible, roles)
}

#[tokio::test]
async fn clear_forces_fresh_lookups_with_identical_results() {
    let app = TestCore::new();

    let before = snapshot(&app).await;
    app.store.reset_calls();
    assert_eq!(snapshot(&app).await, before);
    assert_eq!(app.store.total_calls(), 0);

    app.core.clear_caches();
    app.store.reset_calls();

    assert_eq!(snapshot(&app).await, before);
    assert!(app.store.calls("lookup_role") >= 1);
    assert!(app.store.calls("lookup_groups_of_identity") >= 1);
    assert!(app.store.calls("lookup_groups_of_record") >= 1);
}

#[tokio::test]
async fn clear_picks_up_changed_memberships() {
    let app = TestCore::new();

    assert!(!app.core.can_view(NORMAL_ID, 4).await.unwrap());
    app.store.set_record_groups(4, &[2]);

    // Still served from cache.
    assert!(!app.core.can_view(NORMAL_ID, 4).await.unwrap());

    app.core.clear_caches();
    assert!(app.core.can_view(NORMAL_ID, 4).await.unwrap());
}

#[tokio::test]
async fn clearing_only_visibility_keeps_group_caches() {
    let app = TestCore::new();

    app.core.can_view(NORMAL_ID, 1).await.unwrap();
    app.core.clear_visibility_cache();
    app.store.reset_calls();

    assert!(app.core.can_view(NORMAL_ID, 1).await.unwrap());
    assert_eq!(app.store.total_calls(), 0);
}

#[tokio::test]
async fn blocked_address_is_released_by_clear() {
    let app = TestCore::new();
    let code = app.code_for(NORMAL_SECRET);

    assert_eq!(
        app.core.authenticate(NORMAL_KEY, code, "172.16.0.1").await.unwrap(),
        AuthOutcome::InvalidUser
    );
    assert_eq!(
        app.core.authenticate(NORMAL_KEY, code, "10.0.0.1").await.unwrap(),
        AuthOutcome::InvalidUser
    );

    app.core.clear_credential_caches();
    assert!(app
        .core
        .authenticate(NORMAL_KEY, code, "10.0.0.1")
        .await
        .unwrap()
        .is_success());
}

#[tokio::test]
async fn clearing_ip_decisions_keeps_accepted_windows() {
    let app = TestCore::new();
    let code = app.code_for(NORMAL_SECRET);

    assert!(app
        .core
        .authenticate(NORMAL_KEY, code, "10.0.0.1")
        .await
        .unwrap()
        .is_success());
    assert_eq!(
        app.core.authenticate(NORMAL_KEY, code, "172.16.0.1").await.unwrap(),
        AuthOutcome::InvalidUser
    );
    let window = app.core.last_accepted_window(NORMAL_ID);
    assert!(window.is_some());

    app.core.clear_ip_cache();

    assert_eq!(app.core.last_accepted_window(NORMAL_ID), window);
    // Same window is still trusted, so a different code passes.
    let other = wrong_code(NORMAL_SECRET, &app.settings.totp, app.clock_seconds());
    assert!(app
        .core
        .authenticate(NORMAL_KEY, other, "10.0.0.1")
        .await
        .unwrap()
        .is_success());
}

#[tokio::test]
async fn clearing_replay_windows_keeps_blocked_addresses() {
    let app = TestCore::new();
    let code = app.code_for(NORMAL_SECRET);

    assert_eq!(
        app.core.authenticate(NORMAL_KEY, code, "172.16.0.1").await.unwrap(),
        AuthOutcome::InvalidUser
    );
    app.core.clear_replay_cache();

    assert_eq!(
        app.core.authenticate(NORMAL_KEY, code, "10.0.0.1").await.unwrap(),
        AuthOutcome::InvalidUser
    );
    assert_eq!(app.core.last_accepted_window(NORMAL_ID), None);
}

#[tokio::test]
async fn invalidate_identity_leaves_others_cached() {
    let app = TestCore::new();

    app.core.can_view(NORMAL_ID, 1).await.unwrap();
    app.core.can_view(ADMIN_ID, 1).await.unwrap();

    app.core.invalidate_identity(NORMAL_ID);
    app.store.reset_calls();

    app.core.can_view(ADMIN_ID, 1).await.unwrap();
    assert_eq!(app.store.total_calls(), 0);

    app.core.can_view(NORMAL_ID, 1).await.unwrap();
    assert_eq!(app.store.calls("lookup_role"), 1);
    assert_eq!(app.store.calls("lookup_groups_of_identity"), 1);
    // Record groups are not per-identity.
    assert_eq!(app.store.calls("lookup_groups_of_record"), 0);
}
