//! Identity simulator
//!
//! Emulates an authentication service against a fake `auth.users` table in
//! the store. The session survives restarts under `SESSION_KEY` until an
//! explicit sign-out.
//!
//! Every action waits on the injected `Latency` first, then touches the
//! store, and reports failures as `AuthError` values.

pub mod password;
pub mod types;

pub use password::PasswordScheme;
pub use types::{SessionEnvelope, StoredUser, User};

use crate::config::AuthSettings;
use crate::error::AuthError;
use crate::latency::{Latency, SimulatedOp};
use crate::oplog::{OpEntry, OperationLog, SqlVerb};
use crate::store::{JsonStore, SESSION_KEY, USERS_KEY};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::{watch, Mutex};
use tracing::{debug, info, warn};

pub struct IdentitySimulator {
    store: JsonStore,
    log: Arc<OperationLog>,
    latency: Arc<dyn Latency>,
    settings: AuthSettings,
    session: watch::Sender<Option<User>>,
    loading: AtomicBool,
    /// One sign-up/sign-in/sign-out in flight at a time
    write_gate: Mutex<()>,
}

impl IdentitySimulator {
    pub fn new(
        store: JsonStore,
        log: Arc<OperationLog>,
        latency: Arc<dyn Latency>,
        settings: AuthSettings,
    ) -> Self {
        let (session, _) = watch::channel(None);
        Self {
            store,
            log,
            latency,
            settings,
            session,
            loading: AtomicBool::new(true),
            write_gate: Mutex::new(()),
        }
    }

    /// Currently authenticated user
    pub fn current_user(&self) -> Option<User> {
        self.session.borrow().clone()
    }

    /// True until `restore_session` has completed
    pub fn is_loading(&self) -> bool {
        self.loading.load(Ordering::SeqCst)
    }

    /// Receiver notified whenever the active user changes
    pub fn subscribe(&self) -> watch::Receiver<Option<User>> {
        self.session.subscribe()
    }

    fn scheme(&self) -> PasswordScheme {
        PasswordScheme::from_demo_mode(self.settings.demo_mode)
    }

    fn set_user(&self, user: Option<User>) {
        self.session.send_replace(user);
    }

    /// Load a persisted session, if any. Absent or malformed data leaves the
    /// session unset.
    pub async fn restore_session(&self) -> Option<User> {
        self.latency.pause(SimulatedOp::SessionLoad).await;

        let restored = self
            .store
            .read_record::<SessionEnvelope>(SESSION_KEY)
            .map(|envelope| envelope.user);
        match &restored {
            Some(user) => info!(email = %user.email, "session restored"),
            None => debug!("no persisted session"),
        }
        self.set_user(restored.clone());
        self.loading.store(false, Ordering::SeqCst);
        restored
    }

    fn validate(&self, email: &str, password: &str, check_length: bool) -> Result<(), AuthError> {
        if email.trim().is_empty() || password.is_empty() {
            return Err(AuthError::InvalidInput(
                "Email and password are required".to_string(),
            ));
        }
        let min = self.settings.effective_min_password_len();
        if check_length && password.chars().count() < min {
            return Err(AuthError::InvalidInput(format!(
                "Password must be at least {} characters",
                min
            )));
        }
        Ok(())
    }

    fn persist_session(&self, user: &User) -> Result<(), crate::error::StoreError> {
        self.store.write_record(
            SESSION_KEY,
            &SessionEnvelope { user: user.clone() },
        )
    }

    /// Register a new account and sign it in
    pub async fn sign_up(&self, email: &str, password: &str) -> Result<User, AuthError> {
        let email = email.trim();
        self.validate(email, password, true)?;

        let _gate = self.write_gate.lock().await;
        self.latency.pause(SimulatedOp::SignUp).await;

        self.log.push(OpEntry::read(
            SqlVerb::Select,
            format!("SELECT id FROM auth.users WHERE email = '{}'", email),
        ));
        let mut users: Vec<StoredUser> = self.store.read(USERS_KEY);
        if users.iter().any(|u| u.email == email) {
            debug!(email, "sign-up rejected: duplicate email");
            return Err(AuthError::DuplicateEmail);
        }

        let stored = StoredUser::new(email, self.scheme().hash(password));
        users.push(stored.clone());
        self.log.push(OpEntry::write(
            SqlVerb::Insert,
            format!(
                "INSERT INTO auth.users (email, encrypted_password) VALUES ('{}', '********')",
                email
            ),
        ));

        let user = stored.to_user();
        if let Err(e) = self.store.write(USERS_KEY, &users) {
            warn!(error = %e, "sign-up failed to persist account");
            return Err(AuthError::StorageFailure("Error during sign-up"));
        }
        if let Err(e) = self.persist_session(&user) {
            warn!(error = %e, "sign-up failed to persist session, rolling back account");
            users.pop();
            if let Err(e) = self.store.write(USERS_KEY, &users) {
                warn!(error = %e, "account rollback failed");
            }
            return Err(AuthError::StorageFailure("Error during sign-up"));
        }

        info!(email = %user.email, "account created");
        self.set_user(Some(user.clone()));
        Ok(user)
    }

    /// Authenticate an existing account
    pub async fn sign_in(&self, email: &str, password: &str) -> Result<User, AuthError> {
        let email = email.trim();
        self.validate(email, password, false)?;

        let _gate = self.write_gate.lock().await;
        self.latency.pause(SimulatedOp::SignIn).await;

        self.log.push(OpEntry::read(
            SqlVerb::Select,
            format!("SELECT * FROM auth.users WHERE email = '{}'", email),
        ));
        let users: Vec<StoredUser> = self.store.read(USERS_KEY);
        let stored = users
            .iter()
            .find(|u| u.email == email)
            .ok_or(AuthError::EmailNotFound)?;

        if !password::verify(password, &stored.password_hash) {
            debug!(email, "sign-in rejected: wrong password");
            return Err(AuthError::InvalidPassword);
        }

        let user = stored.to_user();
        if let Err(e) = self.persist_session(&user) {
            warn!(error = %e, "sign-in failed to persist session");
            return Err(AuthError::StorageFailure("Error during sign-in"));
        }

        info!(email = %user.email, "signed in");
        self.set_user(Some(user.clone()));
        Ok(user)
    }

    /// Drop the session. Never fails; a store error is only reported.
    pub async fn sign_out(&self) {
        let _gate = self.write_gate.lock().await;
        self.latency.pause(SimulatedOp::SignOut).await;

        if let Some(user) = self.current_user() {
            self.log.push(OpEntry::write(
                SqlVerb::Delete,
                format!(
                    "DELETE FROM auth.sessions WHERE user_id = '{}'",
                    crate::oplog::short_id(&user.id)
                ),
            ));
        }
        if let Err(e) = self.store.remove(SESSION_KEY) {
            warn!(error = %e, "failed to remove persisted session");
        }
        self.set_user(None);
        info!("signed out");
    }
}
