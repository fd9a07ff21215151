//! Integration tests for the authentication system.
//!
//! Tests registration, lockout, refresh-token rotation, logout, and password
//! change flows against the in-memory store with a controllable clock.

use authgate::auth::{AuthError, AuthManager, Clock, ManualClock};
use authgate::config::AuthConfig;
use authgate::db::{CredentialStore, MemoryCredentialStore};
use chrono::Duration;
use std::sync::Arc;

const SECRET: &str = "integration_test_secret_key_0123456789";

struct Harness {
    auth: AuthManager,
    store: Arc<MemoryCredentialStore>,
    clock: Arc<ManualClock>,
}

/// Helper to create a test auth manager with cheap hashing
fn setup_auth_manager() -> Harness {
    let clock = Arc::new(ManualClock::starting_now());
    let store = Arc::new(MemoryCredentialStore::with_clock(clock.clone()));
    let config = AuthConfig::new(SECRET).with_hasher_cost(1024, 1, 1);
    let auth = AuthManager::with_clock(store.clone(), config, clock.clone())
        .expect("Failed to build auth manager");

    Harness { auth, store, clock }
}

#[tokio::test]
async fn test_register_duplicate_email() {
    let h = setup_auth_manager();

    let user = h
        .auth
        .register("a@x.com", "p1")
        .await
        .expect("First registration should succeed");
    assert_eq!(user.email, "a@x.com");

    let result = h.auth.register("a@x.com", "other").await;
    assert!(
        matches!(result, Err(AuthError::EmailTaken)),
        "Should return EmailTaken error"
    );
}

#[tokio::test]
async fn test_lockout_scenario() {
    let h = setup_auth_manager();
    h.auth.register("a@x.com", "p1").await.unwrap();

    let tokens = h.auth.login("a@x.com", "p1").await.expect("Login should succeed");
    assert!(!tokens.access_token.is_empty());
    assert!(!tokens.refresh_token.is_empty());

    for attempt in 1..=5 {
        let result = h.auth.login("a@x.com", "wrong").await;
        assert!(
            matches!(result, Err(AuthError::InvalidCredentials)),
            "Attempt {attempt} should be rejected as invalid credentials"
        );
    }

    let result = h.auth.login("a@x.com", "p1").await;
    assert!(
        matches!(result, Err(AuthError::AccountLocked)),
        "Correct password must be refused while locked"
    );

    h.clock.advance(Duration::minutes(15) + Duration::seconds(1));
    assert!(
        h.auth.login("a@x.com", "p1").await.is_ok(),
        "Login should succeed once the lockout window elapses"
    );
}

#[tokio::test]
async fn test_successful_login_resets_counters() {
    let h = setup_auth_manager();
    h.auth.register("a@x.com", "p1").await.unwrap();

    for _ in 0..3 {
        let _ = h.auth.login("a@x.com", "wrong").await;
    }
    let user = h.auth.user_by_email("a@x.com").await.unwrap().unwrap();
    assert_eq!(user.failed_login_attempts, 3);

    h.auth.login("a@x.com", "p1").await.unwrap();

    let user = h.auth.user_by_email("a@x.com").await.unwrap().unwrap();
    assert_eq!(user.failed_login_attempts, 0);
    assert!(user.lockout_until.is_none());

    // Counter starts over: four more failures do not lock
    for _ in 0..4 {
        let _ = h.auth.login("a@x.com", "wrong").await;
    }
    assert!(h.auth.login("a@x.com", "p1").await.is_ok());
}

#[tokio::test]
async fn test_refresh_rotation_is_single_use() {
    let h = setup_auth_manager();
    h.auth.register("a@x.com", "p1").await.unwrap();
    let first = h.auth.login("a@x.com", "p1").await.unwrap();

    let second = h
        .auth
        .rotate(&first.refresh_token)
        .await
        .unwrap()
        .expect("First rotation should succeed");
    assert_ne!(first.refresh_token, second.refresh_token);

    assert!(
        h.auth.rotate(&first.refresh_token).await.unwrap().is_none(),
        "Consumed refresh token must not rotate again"
    );

    let third = h.auth.rotate(&second.refresh_token).await.unwrap();
    assert!(third.is_some(), "Token issued by rotation works once");
    assert!(h.auth.rotate(&second.refresh_token).await.unwrap().is_none());

    let user = h.auth.user_by_email("a@x.com").await.unwrap().unwrap();
    assert_eq!(h.store.refresh_token_count(user.id).await, 1);
}

#[tokio::test]
async fn test_logout_then_refresh_fails() {
    let h = setup_auth_manager();
    h.auth.register("a@x.com", "p1").await.unwrap();
    let tokens = h.auth.login("a@x.com", "p1").await.unwrap();

    h.auth.revoke(&tokens.refresh_token).await.unwrap();
    // Idempotent
    h.auth.revoke(&tokens.refresh_token).await.unwrap();
    h.auth.revoke("never-issued").await.unwrap();

    assert!(h.auth.rotate(&tokens.refresh_token).await.unwrap().is_none());
}

#[tokio::test]
async fn test_refresh_row_expiry_is_checked_independently() {
    let clock = Arc::new(ManualClock::starting_now());
    let store = Arc::new(MemoryCredentialStore::with_clock(clock.clone()));
    let config = AuthConfig::new(SECRET).with_hasher_cost(1024, 1, 1);
    let auth = AuthManager::with_clock(store.clone(), config, clock.clone()).unwrap();

    let user = auth.register("a@x.com", "p1").await.unwrap();
    let token = auth.tokens().issue_refresh(&user.email).unwrap();

    // Token itself is valid for days, but its row expired a second ago
    store
        .create_refresh_token(user.id, &token, clock.now() - Duration::seconds(1))
        .await
        .unwrap();

    assert!(auth.tokens().verify(&token).is_some());
    assert!(auth.rotate(&token).await.unwrap().is_none());
}

#[tokio::test]
async fn test_change_password() {
    let h = setup_auth_manager();
    let user = h.auth.register("a@x.com", "p1").await.unwrap();

    let changed = h.auth.change_password(&user, "wrong", "p2").await.unwrap();
    assert!(!changed, "Wrong old password must be refused");
    let unchanged = h.auth.user_by_email("a@x.com").await.unwrap().unwrap();
    assert_eq!(unchanged.password_hash, user.password_hash);

    let changed = h.auth.change_password(&user, "p1", "p2").await.unwrap();
    assert!(changed);

    assert!(matches!(
        h.auth.login("a@x.com", "p1").await,
        Err(AuthError::InvalidCredentials)
    ));
    assert!(h.auth.login("a@x.com", "p2").await.is_ok());
}

#[tokio::test]
async fn test_password_change_keeps_existing_sessions() {
    let h = setup_auth_manager();
    let user = h.auth.register("a@x.com", "p1").await.unwrap();
    let tokens = h.auth.login("a@x.com", "p1").await.unwrap();

    assert!(h.auth.change_password(&user, "p1", "p2").await.unwrap());
    assert!(h.auth.rotate(&tokens.refresh_token).await.unwrap().is_some());
}

#[tokio::test]
async fn test_issued_tokens_verify_immediately() {
    let h = setup_auth_manager();
    h.auth.register("a@x.com", "p1").await.unwrap();
    let tokens = h.auth.login("a@x.com", "p1").await.unwrap();

    let now = h.clock.now().timestamp();
    for token in [&tokens.access_token, &tokens.refresh_token] {
        let claims = h.auth.verify_access_token(token).expect("token should verify");
        assert_eq!(claims.sub, "a@x.com");
        assert!(claims.exp > now);
    }

    h.clock.advance(Duration::minutes(30));
    assert!(h.auth.verify_access_token(&tokens.access_token).is_none());
    assert!(h.auth.verify_access_token(&tokens.refresh_token).is_some());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_rotation_has_one_winner() {
    let h = setup_auth_manager();
    h.auth.register("a@x.com", "p1").await.unwrap();
    let tokens = h.auth.login("a@x.com", "p1").await.unwrap();

    let handles: Vec<_> = (0..8)
        .map(|_| {
            let auth = h.auth.clone();
            let token = tokens.refresh_token.clone();
            tokio::spawn(async move { auth.rotate(&token).await })
        })
        .collect();

    let mut successes = 0;
    for handle in handles {
        if handle.await.unwrap().unwrap().is_some() {
            successes += 1;
        }
    }
    assert_eq!(successes, 1, "Exactly one concurrent rotation should win");
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_failures_arm_lockout() {
    let h = setup_auth_manager();
    h.auth.register("a@x.com", "p1").await.unwrap();

    let handles: Vec<_> = (0..5)
        .map(|_| {
            let auth = h.auth.clone();
            tokio::spawn(async move { auth.login("a@x.com", "wrong").await })
        })
        .collect();
    for handle in handles {
        assert!(handle.await.unwrap().is_err());
    }

    assert!(matches!(
        h.auth.login("a@x.com", "p1").await,
        Err(AuthError::AccountLocked)
    ));
}

mod postgres {
    use super::*;
    use authgate::db::{Database, DatabaseConfig, PgCredentialStore};

    #[tokio::test]
    #[ignore = "requires a running PostgreSQL instance (set DATABASE_URL)"]
    async fn test_pg_store_full_flow() {
        let database_url = std::env::var("DATABASE_URL")
            .unwrap_or_else(|_| "postgres://postgres@localhost/authgate_test".to_string());
        let config = DatabaseConfig {
            database_url,
            max_connections: 5,
            min_connections: 1,
            ..DatabaseConfig::development()
        };

        let db = Database::new(&config).await.expect("Failed to connect");
        db.migrate().await.expect("Migration failed");

        let store = Arc::new(PgCredentialStore::new(db.pool().clone()));
        let auth = AuthManager::new(store, AuthConfig::new(SECRET).with_hasher_cost(1024, 1, 1))
            .unwrap();

        let email = format!("pg_{}@x.com", uuid_suffix());
        auth.register(&email, "p1").await.unwrap();
        assert!(matches!(
            auth.register(&email, "p1").await,
            Err(AuthError::EmailTaken)
        ));

        for _ in 0..5 {
            let _ = auth.login(&email, "wrong").await;
        }
        assert!(matches!(
            auth.login(&email, "p1").await,
            Err(AuthError::AccountLocked)
        ));

        db.close().await;
    }

    fn uuid_suffix() -> String {
        std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .map(|d| d.as_nanos().to_string())
            .unwrap_or_default()
    }
}
