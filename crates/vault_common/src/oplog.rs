//! Operation log
//!
//! In-memory, newest-first, capped list of the SQL statements a real
//! relational backend would have run. Shared by the identity and progress
//! simulators; rebuilt empty at every start.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::sync::{Mutex, MutexGuard};
use uuid::Uuid;

/// Default number of entries kept
pub const DEFAULT_CAPACITY: usize = 20;

/// Direction of a simulated database operation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OpKind {
    Read,
    Write,
}

impl OpKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            OpKind::Read => "read",
            OpKind::Write => "write",
        }
    }

    /// What happened to the data, from the learner's point of view
    pub fn direction(&self) -> &'static str {
        match self {
            OpKind::Read => "Data received from the database",
            OpKind::Write => "Data sent to the database",
        }
    }
}

/// SQL verb mirrored by an entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum SqlVerb {
    Select,
    Insert,
    Update,
    Delete,
}

impl SqlVerb {
    pub fn as_str(&self) -> &'static str {
        match self {
            SqlVerb::Select => "SELECT",
            SqlVerb::Insert => "INSERT",
            SqlVerb::Update => "UPDATE",
            SqlVerb::Delete => "DELETE",
        }
    }

    /// Beginner-level explanation of the verb
    pub fn explanation(&self) -> &'static str {
        match self {
            SqlVerb::Select => {
                "SELECT = \"give me the data\". Like asking the librarian to find a specific book."
            }
            SqlVerb::Insert => {
                "INSERT = \"add new data\". Like adding a new page to a notebook."
            }
            SqlVerb::Update => {
                "UPDATE = \"change saved data\". Like correcting a mistake in a saved document."
            }
            SqlVerb::Delete => {
                "DELETE = \"remove data\". Like tearing a page out of the notebook."
            }
        }
    }
}

impl std::fmt::Display for SqlVerb {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One simulated statement
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OpEntry {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: OpKind,
    pub operation: SqlVerb,
    pub query: String,
    pub timestamp: DateTime<Utc>,
    /// Field the operation mainly touched, for highlighting
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub column: Option<String>,
}

impl OpEntry {
    pub fn new(kind: OpKind, operation: SqlVerb, query: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            kind,
            operation,
            query: query.into(),
            timestamp: Utc::now(),
            column: None,
        }
    }

    pub fn read(operation: SqlVerb, query: impl Into<String>) -> Self {
        Self::new(OpKind::Read, operation, query)
    }

    pub fn write(operation: SqlVerb, query: impl Into<String>) -> Self {
        Self::new(OpKind::Write, operation, query)
    }

    pub fn with_column(mut self, column: impl Into<String>) -> Self {
        self.column = Some(column.into());
        self
    }
}

/// Abbreviated user id as shown inside queries: first 8 chars + `...`
pub fn short_id(id: &str) -> String {
    let prefix: String = id.chars().take(8).collect();
    format!("{}...", prefix)
}

/// Capped, newest-first log
#[derive(Debug)]
pub struct OperationLog {
    entries: Mutex<VecDeque<OpEntry>>,
    capacity: usize,
}

impl Default for OperationLog {
    fn default() -> Self {
        Self::new()
    }
}

impl OperationLog {
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CAPACITY)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            entries: Mutex::new(VecDeque::with_capacity(capacity)),
            capacity,
        }
    }

    fn lock(&self) -> MutexGuard<'_, VecDeque<OpEntry>> {
        // A panic while holding the lock cannot leave the deque half-updated.
        self.entries.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Prepend an entry, dropping the oldest beyond capacity
    pub fn push(&self, entry: OpEntry) {
        tracing::debug!(
            kind = entry.kind.as_str(),
            operation = entry.operation.as_str(),
            query = %entry.query,
            "operation logged"
        );
        let mut entries = self.lock();
        entries.push_front(entry);
        entries.truncate(self.capacity);
    }

    /// Snapshot, newest first
    pub fn entries(&self) -> Vec<OpEntry> {
        self.lock().iter().cloned().collect()
    }

    pub fn latest(&self) -> Option<OpEntry> {
        self.lock().front().cloned()
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    pub fn clear(&self) {
        self.lock().clear();
    }
}
