//! Integration tests for authentication through the access core.

mod common;

use catalog_access::config::AccessSettings;
use catalog_access::models::{AuthOutcome, Role};
use catalog_access::services::totp::TotpParams;
use catalog_access::services::ServiceError;
use chrono::TimeDelta;
use common::*;

#[tokio::test]
async fn malformed_key_is_rejected_without_store_access() {
    let app = TestCore::new();

    let outcome = app
        .core
        .authenticate("bad key!", 123456, "1.2.3.4")
        .await
        .unwrap();

    assert_eq!(outcome, AuthOutcome::InvalidKeyFormat);
    assert_eq!(app.store.total_calls(), 0);
}

#[tokio::test]
async fn overlong_key_is_malformed() {
    let app = TestCore::new();
    let key = "a".repeat(app.settings.api_key_max_length + 1);

    let outcome = app.core.authenticate(&key, 0, "10.0.0.1").await.unwrap();
    assert_eq!(outcome, AuthOutcome::InvalidKeyFormat);
    assert_eq!(app.store.total_calls(), 0);
}

#[tokio::test]
async fn valid_login_carries_identity_and_role() {
    let app = TestCore::new();
    let code = app.code_for(NORMAL_SECRET);

    let outcome = app
        .core
        .authenticate(NORMAL_KEY, code, "10.0.7.7")
        .await
        .unwrap();

    let identity = outcome.into_identity().unwrap();
    assert_eq!(identity.id, NORMAL_ID);
    assert_eq!(identity.key, NORMAL_KEY);
    assert_eq!(identity.role, Role::Normal);
    assert_eq!(
        app.store.login_attempts(),
        vec![(NORMAL_ID, "10.0.7.7".to_string(), true)]
    );
}

#[tokio::test]
async fn unknown_key_is_invalid_user() {
    let app = TestCore::new();
    let outcome = app
        .core
        .authenticate("no-such-key", 0, "10.0.7.7")
        .await
        .unwrap();
    assert_eq!(outcome, AuthOutcome::InvalidUser);
    assert!(app.store.login_attempts().is_empty());
}

#[tokio::test]
async fn address_outside_allow_list_fails_before_totp() {
    let app = TestCore::new();
    let code = app.code_for(NORMAL_SECRET);

    let outcome = app
        .core
        .authenticate(NORMAL_KEY, code, "192.168.1.1")
        .await
        .unwrap();

    assert_eq!(outcome, AuthOutcome::InvalidUser);
    assert_eq!(app.store.calls("lookup_shared_secret"), 0);
    assert_eq!(
        app.store.login_attempts(),
        vec![(NORMAL_ID, "192.168.1.1".to_string(), false)]
    );
}

#[tokio::test]
async fn wrong_code_is_invalid_totp() {
    let app = TestCore::new();
    let bad = wrong_code(NORMAL_SECRET, &app.settings.totp, NOW);

    let outcome = app.core.authenticate(NORMAL_KEY, bad, "10.0.0.1").await.unwrap();
    assert_eq!(outcome, AuthOutcome::InvalidTotp);
}

#[tokio::test]
async fn accepted_window_trusts_any_code() {
    let app = TestCore::new();
    let good = app.code_for(NORMAL_SECRET);
    let bad = wrong_code(NORMAL_SECRET, &app.settings.totp, NOW);

    assert!(app
        .core
        .authenticate(NORMAL_KEY, good, "10.0.0.1")
        .await
        .unwrap()
        .is_success());

    app.clock.advance(TimeDelta::seconds(10));
    assert!(app
        .core
        .authenticate(NORMAL_KEY, bad, "10.0.0.1")
        .await
        .unwrap()
        .is_success());
}

#[tokio::test]
async fn strict_mode_rechecks_every_code() {
    let app = TestCore::with_settings(AccessSettings {
        trust_same_window: false,
        ..AccessSettings::default()
    });
    let good = app.code_for(NORMAL_SECRET);
    let bad = wrong_code(NORMAL_SECRET, &app.settings.totp, NOW);

    assert!(app
        .core
        .authenticate(NORMAL_KEY, good, "10.0.0.1")
        .await
        .unwrap()
        .is_success());
    assert_eq!(
        app.core.authenticate(NORMAL_KEY, bad, "10.0.0.1").await.unwrap(),
        AuthOutcome::InvalidTotp
    );
}

#[tokio::test]
async fn old_code_expires_with_its_window() {
    let app = TestCore::new();
    let good = app.code_for(NORMAL_SECRET);

    assert!(app
        .core
        .authenticate(NORMAL_KEY, good, "10.0.0.1")
        .await
        .unwrap()
        .is_success());

    let step = app.settings.totp.step_seconds;
    app.clock.advance(TimeDelta::seconds(step * 5));

    assert_eq!(
        app.core.authenticate(NORMAL_KEY, good, "10.0.0.1").await.unwrap(),
        AuthOutcome::InvalidTotp
    );
}

#[tokio::test]
async fn auth_switch_off_accepts_any_code_from_anywhere() {
    let app = TestCore::with_settings(AccessSettings {
        auth_enabled: false,
        ..AccessSettings::default()
    });

    let outcome = app
        .core
        .authenticate(SUPER_KEY, 0, "203.0.113.9")
        .await
        .unwrap();

    assert_eq!(outcome.identity().map(|i| i.role), Some(Role::Superuser));
    assert_eq!(app.store.calls("lookup_ip_allow_list"), 0);
    assert_eq!(app.store.calls("lookup_shared_secret"), 0);
}

#[tokio::test]
async fn authorize_requires_minimum_rank() {
    let app = TestCore::new();
    let code = app.code_for("admin-secret");

    let admin = app
        .core
        .authorize(ADMIN_KEY, code, "1.1.1.1", Role::Administrator)
        .await
        .unwrap();
    assert_eq!(admin.map(|i| i.id), Some(ADMIN_ID));

    let denied = app
        .core
        .authorize(ADMIN_KEY, code, "1.1.1.1", Role::Superuser)
        .await
        .unwrap();
    assert!(denied.is_none());
}

#[tokio::test]
async fn api_key_probe_reports_format_and_user() {
    let app = TestCore::new();

    assert_eq!(
        app.core.check_api_key(ADMIN_KEY).await.unwrap(),
        vec![AuthOutcome::ValidKeyFormat, AuthOutcome::ValidUser]
    );
    assert_eq!(
        app.core.check_api_key("missing").await.unwrap(),
        vec![AuthOutcome::ValidKeyFormat, AuthOutcome::InvalidUser]
    );
    assert_eq!(
        app.core.check_api_key("sp ace").await.unwrap(),
        vec![AuthOutcome::InvalidKeyFormat]
    );
}

#[tokio::test]
async fn store_outage_is_an_error_not_a_denial() {
    let app = TestCore::new();
    app.store.fail_with(Some("connection refused"));

    let result = app.core.authenticate(NORMAL_KEY, 0, "10.0.0.1").await;
    assert!(matches!(result, Err(ServiceError::Store(_))));
}

#[tokio::test]
async fn failed_audit_write_does_not_change_the_outcome() {
    // Warm every cache so only the audit write reaches the failing store.
    let app = TestCore::new();
    let code = app.code_for(NORMAL_SECRET);
    assert!(app
        .core
        .authenticate(NORMAL_KEY, code, "10.0.0.1")
        .await
        .unwrap()
        .is_success());

    app.store.fail_with(Some("audit table locked"));
    let outcome = app
        .core
        .authenticate(NORMAL_KEY, code, "10.0.0.1")
        .await
        .unwrap();
    assert!(outcome.is_success());
}

#[tokio::test]
async fn oversized_digit_count_is_an_error_not_a_panic() {
    let app = TestCore::with_settings(AccessSettings {
        totp: TotpParams {
            digits: 10,
            ..TotpParams::default()
        },
        ..AccessSettings::default()
    });

    let result = app.core.authenticate(ADMIN_KEY, 123, "1.2.3.4").await;
    assert!(matches!(result, Err(ServiceError::Internal(_))));
}
