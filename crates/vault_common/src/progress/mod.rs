//! Progress simulator
//!
//! Emulates CRUD against a fake `user_progress` table: one record per user
//! holding level, xp and lessons. Each mutation:
//!
//! 1. checks its preconditions (skipped otherwise, state untouched)
//! 2. computes the full new record
//! 3. logs the equivalent SQL statement
//! 4. waits on the injected `Latency`
//! 5. writes the record back in one store call, then updates state
//!
//! The log entry therefore reflects the intended update, not a committed
//! one. Mutations are serialized through a write gate.

pub mod levels;
pub mod record;

pub use levels::{level_progress_percent, XpGain, XP_PER_LEVEL};
pub use record::ProgressRecord;

use crate::config::ProgressSettings;
use crate::identity::User;
use crate::latency::{Latency, SimulatedOp};
use crate::oplog::{short_id, OpEntry, OperationLog, SqlVerb};
use crate::store::{JsonStore, PROGRESS_KEY};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};
use tokio::sync::{watch, Mutex};
use tracing::{debug, info, warn};

/// Why a mutation left everything unchanged
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    /// Nobody is signed in
    NoSession,
    /// Signed in, but progress has not been loaded
    NoProgress,
    /// `lessons_completed` already equals `total_lessons`
    LessonsComplete,
    /// The store rejected the write
    StorageFailure,
}

impl SkipReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            SkipReason::NoSession => "no active session",
            SkipReason::NoProgress => "progress not loaded",
            SkipReason::LessonsComplete => "all lessons already completed",
            SkipReason::StorageFailure => "storage write failed",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MutationOutcome {
    Applied(ProgressRecord),
    Skipped(SkipReason),
}

impl MutationOutcome {
    pub fn is_applied(&self) -> bool {
        matches!(self, MutationOutcome::Applied(_))
    }

    pub fn record(&self) -> Option<&ProgressRecord> {
        match self {
            MutationOutcome::Applied(record) => Some(record),
            MutationOutcome::Skipped(_) => None,
        }
    }
}

#[derive(Debug, Default)]
struct ProgressState {
    user: Option<User>,
    progress: Option<ProgressRecord>,
}

pub struct ProgressSimulator {
    store: JsonStore,
    log: Arc<OperationLog>,
    latency: Arc<dyn Latency>,
    settings: ProgressSettings,
    state: RwLock<ProgressState>,
    /// Active identity, when wired to an `IdentitySimulator`
    session: Option<watch::Receiver<Option<User>>>,
    loading: AtomicBool,
    write_gate: Mutex<()>,
}

impl ProgressSimulator {
    pub fn new(
        store: JsonStore,
        log: Arc<OperationLog>,
        latency: Arc<dyn Latency>,
        settings: ProgressSettings,
    ) -> Self {
        Self {
            store,
            log,
            latency,
            settings,
            state: RwLock::new(ProgressState::default()),
            session: None,
            loading: AtomicBool::new(true),
            write_gate: Mutex::new(()),
        }
    }

    /// Follow the identity published on `session`. Progress loaded for
    /// anyone other than the active user is hidden and cannot be mutated.
    pub fn with_session(mut self, session: watch::Receiver<Option<User>>) -> Self {
        self.session = Some(session);
        self
    }

    // State is never held across an await, so a poisoned lock still holds
    // a consistent snapshot.
    fn read_state(&self) -> RwLockReadGuard<'_, ProgressState> {
        self.state.read().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn write_state(&self) -> RwLockWriteGuard<'_, ProgressState> {
        self.state.write().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Current record of the active user
    pub fn progress(&self) -> Option<ProgressRecord> {
        let progress = self.read_state().progress.clone()?;
        match self.session_check(&progress.user_id) {
            Ok(()) => Some(progress),
            Err(_) => None,
        }
    }

    /// Id of the user progress was last fetched for
    pub fn tracked_user_id(&self) -> Option<String> {
        self.read_state().user.as_ref().map(|u| u.id.clone())
    }

    fn session_check(&self, user_id: &str) -> Result<(), SkipReason> {
        let Some(session) = &self.session else {
            return Ok(());
        };
        match session.borrow().as_ref() {
            None => Err(SkipReason::NoSession),
            Some(active) if active.id != user_id => Err(SkipReason::NoProgress),
            Some(_) => Ok(()),
        }
    }

    /// Operation log, newest first
    pub fn operations(&self) -> Vec<OpEntry> {
        self.log.entries()
    }

    pub fn is_loading(&self) -> bool {
        self.loading.load(Ordering::SeqCst)
    }

    /// Empty the operation log; persisted progress is not touched
    pub fn clear_operation_log(&self) {
        self.log.clear();
    }

    /// Load the record of `user`, creating it on first access. `None`
    /// (signed out) clears progress without any store access.
    pub async fn fetch_or_create_progress(&self, user: Option<&User>) -> Option<ProgressRecord> {
        let _gate = self.write_gate.lock().await;

        let Some(user) = user else {
            let mut state = self.write_state();
            state.user = None;
            state.progress = None;
            self.loading.store(false, Ordering::SeqCst);
            debug!("no active user, progress cleared");
            return None;
        };

        self.loading.store(true, Ordering::SeqCst);
        self.write_state().user = Some(user.clone());

        self.log.push(OpEntry::read(
            SqlVerb::Select,
            format!(
                "SELECT * FROM user_progress WHERE user_id = '{}'",
                short_id(&user.id)
            ),
        ));
        self.latency.pause(SimulatedOp::FetchProgress).await;

        let mut records: Vec<ProgressRecord> = self.store.read(PROGRESS_KEY);
        let record = match records.iter().find(|r| r.user_id == user.id) {
            Some(existing) => {
                debug!(user_id = %user.id, level = existing.level, "progress loaded");
                Some(existing.clone())
            }
            None => {
                let created =
                    ProgressRecord::new(&user.id, self.settings.effective_total_lessons());
                records.push(created.clone());
                match self.store.write(PROGRESS_KEY, &records) {
                    Ok(()) => {
                        self.log.push(OpEntry::write(
                            SqlVerb::Insert,
                            format!(
                                "INSERT INTO user_progress (user_id, level, xp) VALUES ('{}', 1, 0)",
                                short_id(&user.id)
                            ),
                        ));
                        info!(user_id = %user.id, "progress record created");
                        Some(created)
                    }
                    Err(e) => {
                        warn!(error = %e, "failed to create progress record");
                        None
                    }
                }
            }
        };

        {
            let mut state = self.write_state();
            // A failed insert keeps whatever was loaded before.
            if record.is_some() || state.progress.as_ref().map(|p| &p.user_id) != Some(&user.id) {
                state.progress = record.clone();
            }
        }
        self.loading.store(false, Ordering::SeqCst);
        record
    }

    fn snapshot(&self) -> Result<(User, ProgressRecord), SkipReason> {
        let state = self.read_state();
        let user = state.user.clone().ok_or(SkipReason::NoSession)?;
        self.session_check(&user.id)?;
        let progress = state.progress.clone().ok_or(SkipReason::NoProgress)?;
        Ok((user, progress))
    }

    /// Replace the record by id (appending it if it vanished) and publish it
    fn commit(&self, updated: ProgressRecord) -> MutationOutcome {
        let mut records: Vec<ProgressRecord> = self.store.read(PROGRESS_KEY);
        match records.iter_mut().find(|r| r.id == updated.id) {
            Some(slot) => *slot = updated.clone(),
            None => {
                warn!(id = %updated.id, "progress record missing from store, re-inserting");
                records.push(updated.clone());
            }
        }

        if let Err(e) = self.store.write(PROGRESS_KEY, &records) {
            warn!(error = %e, "progress write failed, state unchanged");
            return MutationOutcome::Skipped(SkipReason::StorageFailure);
        }

        self.write_state().progress = Some(updated.clone());
        MutationOutcome::Applied(updated)
    }

    /// Award `amount` XP, levelling up once per 100 XP crossed
    pub async fn add_xp(&self, amount: u32) -> MutationOutcome {
        let _gate = self.write_gate.lock().await;
        let (user, progress) = match self.snapshot() {
            Ok(s) => s,
            Err(reason) => return MutationOutcome::Skipped(reason),
        };

        let gain = XpGain::apply(progress.level, progress.xp, amount);
        self.log.push(
            OpEntry::write(
                SqlVerb::Update,
                format!(
                    "UPDATE user_progress SET xp = {}, level = {}, updated_at = NOW() WHERE user_id = '{}'",
                    gain.raw_xp,
                    gain.new_level,
                    short_id(&user.id)
                ),
            )
            .with_column(gain.highlighted_column()),
        );
        self.latency.pause(SimulatedOp::AddXp).await;

        let outcome = self.commit(progress.with_gain(&gain));
        if outcome.is_applied() {
            info!(amount, level = gain.new_level, xp = gain.new_xp, "xp added");
        }
        outcome
    }

    /// Complete the next lesson and award the lesson bonus
    pub async fn complete_lesson(&self) -> MutationOutcome {
        let _gate = self.write_gate.lock().await;
        let (user, progress) = match self.snapshot() {
            Ok(s) => s,
            Err(reason) => return MutationOutcome::Skipped(reason),
        };
        if progress.course_complete() {
            debug!("lesson cap reached");
            return MutationOutcome::Skipped(SkipReason::LessonsComplete);
        }

        let bonus = self.settings.lesson_xp_bonus;
        let gain = XpGain::apply(progress.level, progress.xp, bonus);
        let updated = progress.with_lesson(&gain);
        self.log.push(
            OpEntry::write(
                SqlVerb::Update,
                format!(
                    "UPDATE user_progress SET lessons_completed = {}, xp = xp + {} WHERE user_id = '{}'",
                    updated.lessons_completed,
                    bonus,
                    short_id(&user.id)
                ),
            )
            .with_column("lessons_completed"),
        );
        self.latency.pause(SimulatedOp::CompleteLesson).await;

        let outcome = self.commit(updated);
        if let MutationOutcome::Applied(record) = &outcome {
            info!(
                lessons = record.lessons_completed,
                total = record.total_lessons,
                "lesson completed"
            );
        }
        outcome
    }

    /// Back to level 1, 0 XP, no lessons
    pub async fn reset_progress(&self) -> MutationOutcome {
        let _gate = self.write_gate.lock().await;
        let (user, progress) = match self.snapshot() {
            Ok(s) => s,
            Err(reason) => return MutationOutcome::Skipped(reason),
        };

        self.log.push(
            OpEntry::write(
                SqlVerb::Update,
                format!(
                    "UPDATE user_progress SET level = 1, xp = 0, lessons_completed = 0 WHERE user_id = '{}'",
                    short_id(&user.id)
                ),
            )
            .with_column("level"),
        );
        self.latency.pause(SimulatedOp::ResetProgress).await;

        let outcome = self.commit(progress.reset());
        if outcome.is_applied() {
            info!("progress reset");
        }
        outcome
    }
}
