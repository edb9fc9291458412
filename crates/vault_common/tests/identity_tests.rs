//! Tests for the identity simulator: sign-up, sign-in, sign-out, sessions.

use async_trait::async_trait;
use std::sync::{Arc, Mutex};
use vault_common::config::AuthSettings;
use vault_common::identity::{SessionEnvelope, StoredUser};
use vault_common::store::{SESSION_KEY, USERS_KEY};
use vault_common::{
    AuthError, IdentitySimulator, JsonStore, Latency, NoLatency, OperationLog, SimulatedOp, SqlVerb,
};

fn identity_with(store: JsonStore, settings: AuthSettings) -> IdentitySimulator {
    IdentitySimulator::new(store, Arc::new(OperationLog::new()), Arc::new(NoLatency), settings)
}

fn identity(store: JsonStore) -> IdentitySimulator {
    identity_with(store, AuthSettings::default())
}

#[tokio::test]
async fn test_sign_up_then_sign_in_roundtrip() {
    let cases = [
        ("learner@example.com", "password1"),
        ("x@y.z", "123456"),
        ("spaces.in@password.com", "correct horse battery staple"),
        ("unicode@example.com", "pässwörd✓"),
    ];

    for (email, password) in cases {
        let store = JsonStore::in_memory();
        let ident = identity(store.clone());

        let created = ident.sign_up(email, password).await.unwrap();
        assert_eq!(created.email, email);

        ident.sign_out().await;
        assert!(ident.current_user().is_none());

        let signed_in = ident.sign_in(email, password).await.unwrap();
        assert_eq!(signed_in.email, email);
        assert_eq!(signed_in.id, created.id);
        assert_eq!(ident.current_user(), Some(signed_in));
    }
}

#[tokio::test]
async fn test_duplicate_email_keeps_single_record() {
    let store = JsonStore::in_memory();
    let ident = identity(store.clone());

    ident.sign_up("dup@example.com", "password1").await.unwrap();
    let err = ident.sign_up("dup@example.com", "password2").await.unwrap_err();
    assert!(matches!(err, AuthError::DuplicateEmail));
    assert_eq!(err.message(), "Email already registered");

    let users: Vec<StoredUser> = store.read(USERS_KEY);
    assert_eq!(users.iter().filter(|u| u.email == "dup@example.com").count(), 1);
}

#[tokio::test]
async fn test_session_persists_without_hash() {
    let store = JsonStore::in_memory();
    let ident = identity(store.clone());
    let user = ident.sign_up("a@example.com", "password1").await.unwrap();

    let envelope: SessionEnvelope = store.read_record(SESSION_KEY).unwrap();
    assert_eq!(envelope.user, user);

    let users: Vec<StoredUser> = store.read(USERS_KEY);
    assert!(!users[0].password_hash.is_empty());
    assert_ne!(users[0].password_hash, "password1");
}

#[tokio::test]
async fn test_session_restored_by_new_simulator() {
    let store = JsonStore::in_memory();
    let first = identity(store.clone());
    let user = first.sign_up("a@example.com", "password1").await.unwrap();

    let second = identity(store.clone());
    assert!(second.is_loading());
    assert_eq!(second.restore_session().await, Some(user));
    assert!(!second.is_loading());
}

#[tokio::test]
async fn test_sign_out_removes_persisted_session() {
    let store = JsonStore::in_memory();
    let ident = identity(store.clone());
    ident.sign_up("a@example.com", "password1").await.unwrap();

    ident.sign_out().await;
    assert!(store.read_record::<SessionEnvelope>(SESSION_KEY).is_none());

    let fresh = identity(store);
    assert_eq!(fresh.restore_session().await, None);
}

#[tokio::test]
async fn test_demo_mode_accounts_verify_after_switch() {
    let store = JsonStore::in_memory();
    let demo = identity_with(
        store.clone(),
        AuthSettings {
            demo_mode: true,
            ..Default::default()
        },
    );
    demo.sign_up("demo@example.com", "password1").await.unwrap();

    let users: Vec<StoredUser> = store.read(USERS_KEY);
    assert!(!users[0].password_hash.starts_with("sha256$"));

    let strict = identity(store);
    assert!(strict.sign_in("demo@example.com", "password1").await.is_ok());
}

#[tokio::test]
async fn test_identity_operations_are_logged() {
    let log = Arc::new(OperationLog::new());
    let ident = IdentitySimulator::new(
        JsonStore::in_memory(),
        log.clone(),
        Arc::new(NoLatency),
        AuthSettings::default(),
    );

    ident.sign_up("a@example.com", "password1").await.unwrap();
    ident.sign_out().await;

    let verbs: Vec<SqlVerb> = log.entries().iter().map(|e| e.operation).collect();
    assert_eq!(verbs, vec![SqlVerb::Delete, SqlVerb::Insert, SqlVerb::Select]);
    assert!(!log.entries()[1].query.contains("password1"));
}

/// Records every pause instead of sleeping
#[derive(Default)]
struct RecordingLatency {
    ops: Mutex<Vec<SimulatedOp>>,
}

#[async_trait]
impl Latency for RecordingLatency {
    async fn pause(&self, op: SimulatedOp) {
        self.ops.lock().unwrap().push(op);
    }
}

#[tokio::test]
async fn test_every_identity_action_pauses() {
    let latency = Arc::new(RecordingLatency::default());
    let ident = IdentitySimulator::new(
        JsonStore::in_memory(),
        Arc::new(OperationLog::new()),
        latency.clone(),
        AuthSettings::default(),
    );

    ident.restore_session().await;
    ident.sign_up("a@example.com", "password1").await.unwrap();
    ident.sign_out().await;
    ident.sign_in("a@example.com", "password1").await.unwrap();

    assert_eq!(
        *latency.ops.lock().unwrap(),
        vec![
            SimulatedOp::SessionLoad,
            SimulatedOp::SignUp,
            SimulatedOp::SignOut,
            SimulatedOp::SignIn,
        ]
    );
}
