//! ProgressVault core: a simulated database for teaching persistence.
//!
//! A learner's account and progress live in a local key/value store, and
//! every read or write shows up in an operation log as the SQL statement a
//! real backend would run.
//!
//! - `store`: JSON collections over a key/value backend (file or memory)
//! - `identity`: simulated `auth.users` table and persisted session
//! - `progress`: simulated `user_progress` table with level/xp rules
//! - `oplog`: capped, newest-first log of simulated statements
//! - `vault`: everything wired together

pub mod config;
pub mod error;
pub mod identity;
pub mod latency;
pub mod oplog;
pub mod progress;
pub mod store;
pub mod vault;

pub use config::VaultConfig;
pub use error::{AuthError, StoreError};
pub use identity::{IdentitySimulator, User};
pub use latency::{Latency, NoLatency, SimulatedLatency, SimulatedOp};
pub use oplog::{OpEntry, OpKind, OperationLog, SqlVerb};
pub use progress::{MutationOutcome, ProgressRecord, ProgressSimulator, SkipReason};
pub use store::{FileBackend, JsonStore, KvBackend, MemoryBackend};
pub use vault::{ProgressState, Vault, VaultState};
