//! Vault: the identity and progress simulators wired to one store, one
//! operation log and one latency strategy.
//!
//! Identity changes made through the vault re-fetch progress for the new
//! user (or clear it on sign-out), so consumers never have to.

use crate::config::VaultConfig;
use crate::error::AuthError;
use crate::identity::{IdentitySimulator, User};
use crate::latency::{self, Latency};
use crate::oplog::{OpEntry, OperationLog};
use crate::progress::{MutationOutcome, ProgressRecord, ProgressSimulator};
use crate::store::JsonStore;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::debug;

/// Progress half of the authenticated state
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProgressState {
    Loading,
    Ready(ProgressRecord),
}

/// Session state machine:
/// `Uninitialized -> Loading -> {Unauthenticated, Authenticated(Loading -> Ready)}`
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VaultState {
    Uninitialized,
    Loading,
    Unauthenticated,
    Authenticated { user: User, progress: ProgressState },
}

impl VaultState {
    pub fn as_str(&self) -> &'static str {
        match self {
            VaultState::Uninitialized => "uninitialized",
            VaultState::Loading => "loading",
            VaultState::Unauthenticated => "unauthenticated",
            VaultState::Authenticated {
                progress: ProgressState::Loading,
                ..
            } => "authenticated (progress loading)",
            VaultState::Authenticated {
                progress: ProgressState::Ready(_),
                ..
            } => "authenticated",
        }
    }
}

pub struct Vault {
    identity: IdentitySimulator,
    progress: ProgressSimulator,
    log: Arc<OperationLog>,
    store: JsonStore,
    started: AtomicBool,
}

impl Vault {
    pub fn new(store: JsonStore, config: &VaultConfig, latency: Arc<dyn Latency>) -> Self {
        let log = Arc::new(OperationLog::with_capacity(
            config.oplog.effective_capacity(),
        ));
        let identity = IdentitySimulator::new(
            store.clone(),
            log.clone(),
            latency.clone(),
            config.auth.clone(),
        );
        let progress = ProgressSimulator::new(
            store.clone(),
            log.clone(),
            latency,
            config.progress.clone(),
        )
        .with_session(identity.subscribe());
        Self {
            identity,
            progress,
            log,
            store,
            started: AtomicBool::new(false),
        }
    }

    /// Vault built entirely from configuration
    pub fn from_config(config: &VaultConfig) -> Self {
        Self::new(
            JsonStore::from_settings(&config.storage),
            config,
            latency::from_settings(&config.latency),
        )
    }

    pub fn identity(&self) -> &IdentitySimulator {
        &self.identity
    }

    pub fn progress_simulator(&self) -> &ProgressSimulator {
        &self.progress
    }

    pub fn store(&self) -> &JsonStore {
        &self.store
    }

    /// Restore the persisted session and load its progress
    pub async fn start(&self) -> Option<User> {
        self.started.store(true, Ordering::SeqCst);
        let user = self.identity.restore_session().await;
        self.progress.fetch_or_create_progress(user.as_ref()).await;
        user
    }

    pub async fn sign_up(&self, email: &str, password: &str) -> Result<User, AuthError> {
        let user = self.identity.sign_up(email, password).await?;
        self.progress.fetch_or_create_progress(Some(&user)).await;
        Ok(user)
    }

    pub async fn sign_in(&self, email: &str, password: &str) -> Result<User, AuthError> {
        let user = self.identity.sign_in(email, password).await?;
        self.progress.fetch_or_create_progress(Some(&user)).await;
        Ok(user)
    }

    pub async fn sign_out(&self) {
        self.identity.sign_out().await;
        self.progress.fetch_or_create_progress(None).await;
    }

    /// Re-fetch progress when the identity changed behind the vault's back,
    /// e.g. a sign-out made directly on `identity()`.
    async fn follow_identity(&self) {
        let active = self.identity.current_user();
        if active.as_ref().map(|u| u.id.clone()) != self.progress.tracked_user_id() {
            debug!(signed_in = active.is_some(), "identity changed, refreshing progress");
            self.progress.fetch_or_create_progress(active.as_ref()).await;
        }
    }

    pub async fn add_xp(&self, amount: u32) -> MutationOutcome {
        self.follow_identity().await;
        self.progress.add_xp(amount).await
    }

    pub async fn complete_lesson(&self) -> MutationOutcome {
        self.follow_identity().await;
        self.progress.complete_lesson().await
    }

    pub async fn reset_progress(&self) -> MutationOutcome {
        self.follow_identity().await;
        self.progress.reset_progress().await
    }

    pub fn clear_operation_log(&self) {
        self.progress.clear_operation_log();
    }

    pub fn current_user(&self) -> Option<User> {
        self.identity.current_user()
    }

    pub fn progress(&self) -> Option<ProgressRecord> {
        self.progress.progress()
    }

    pub fn operations(&self) -> Vec<OpEntry> {
        self.log.entries()
    }

    pub fn state(&self) -> VaultState {
        if !self.started.load(Ordering::SeqCst) {
            return VaultState::Uninitialized;
        }
        if self.identity.is_loading() {
            return VaultState::Loading;
        }
        match self.identity.current_user() {
            None => VaultState::Unauthenticated,
            Some(user) => {
                let progress = match self.progress.progress() {
                    Some(record) if !self.progress.is_loading() && record.user_id == user.id => {
                        ProgressState::Ready(record)
                    }
                    _ => ProgressState::Loading,
                };
                VaultState::Authenticated { user, progress }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::latency::NoLatency;

    fn vault() -> Vault {
        Vault::new(JsonStore::in_memory(), &VaultConfig::default(), Arc::new(NoLatency))
    }

    #[tokio::test]
    async fn test_state_machine_transitions() {
        let vault = vault();
        assert_eq!(vault.state(), VaultState::Uninitialized);

        vault.start().await;
        assert_eq!(vault.state(), VaultState::Unauthenticated);

        vault.sign_up("a@example.com", "password1").await.unwrap();
        match vault.state() {
            VaultState::Authenticated {
                user,
                progress: ProgressState::Ready(record),
            } => {
                assert_eq!(user.email, "a@example.com");
                assert_eq!(record.user_id, user.id);
            }
            other => panic!("unexpected state {:?}", other),
        }

        vault.sign_out().await;
        assert_eq!(vault.state(), VaultState::Unauthenticated);
        assert!(vault.progress().is_none());
    }

    #[tokio::test]
    async fn test_failed_sign_in_keeps_state() {
        let vault = vault();
        vault.start().await;
        vault.sign_up("a@example.com", "password1").await.unwrap();
        vault.add_xp(40).await;

        assert!(vault.sign_in("a@example.com", "wrong-pass").await.is_err());
        assert_eq!(vault.progress().unwrap().xp, 40);
        assert_eq!(vault.current_user().unwrap().email, "a@example.com");
    }

    #[tokio::test]
    async fn test_sign_out_on_identity_directly_stops_mutations() {
        let vault = vault();
        vault.start().await;
        vault.sign_up("a@example.com", "password1").await.unwrap();
        vault.add_xp(20).await;

        vault.identity().sign_out().await;
        assert!(vault.progress().is_none());
        assert_eq!(vault.state(), VaultState::Unauthenticated);
        assert_eq!(
            vault.progress_simulator().add_xp(50).await,
            MutationOutcome::Skipped(crate::progress::SkipReason::NoSession)
        );
        assert_eq!(
            vault.add_xp(50).await,
            MutationOutcome::Skipped(crate::progress::SkipReason::NoSession)
        );

        let stored: Vec<ProgressRecord> = vault.store().read(crate::store::PROGRESS_KEY);
        assert_eq!(stored[0].xp, 20);
    }

    #[tokio::test]
    async fn test_sign_in_on_identity_directly_loads_that_users_progress() {
        let vault = vault();
        vault.start().await;
        let a = vault.sign_up("a@example.com", "password1").await.unwrap();
        vault.add_xp(30).await;
        let b = vault.sign_up("b@example.com", "password2").await.unwrap();

        vault.identity().sign_in("a@example.com", "password1").await.unwrap();
        assert!(vault.progress().is_none());

        let record = vault.add_xp(5).await.record().cloned().unwrap();
        assert_eq!(record.user_id, a.id);
        assert_eq!(record.xp, 35);
        assert_ne!(record.user_id, b.id);
    }

    #[tokio::test]
    async fn test_switching_users_switches_progress() {
        let vault = vault();
        vault.start().await;
        let a = vault.sign_up("a@example.com", "password1").await.unwrap();
        vault.add_xp(30).await;

        let b = vault.sign_up("b@example.com", "password2").await.unwrap();
        assert_eq!(vault.progress().unwrap().user_id, b.id);
        assert_eq!(vault.progress().unwrap().xp, 0);

        vault.sign_in("a@example.com", "password1").await.unwrap();
        let progress = vault.progress().unwrap();
        assert_eq!(progress.user_id, a.id);
        assert_eq!(progress.xp, 30);
    }
}
