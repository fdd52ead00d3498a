//! Audit Log - Stores each request's plan, SQL, origin and outcome

use crate::query::compiler::StatementOrigin;
use crate::query::plan::QueryPlan;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

/// How a request ended
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "status", content = "detail")]
pub enum AuditOutcome {
    Answered,
    NotFound,
    OutOfScope,
    /// Error category, e.g. "execution"
    Failed(String),
}

/// Audit log entry
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct AuditLogEntry {
    pub id: String,
    pub question: String,
    pub plan: QueryPlan,
    /// Statement that ran, if any
    pub sql: Option<String>,
    pub origin: Option<StatementOrigin>,
    pub row_count: usize,
    pub elapsed_ms: u64,
    pub outcome: AuditOutcome,
    /// Seconds since the Unix epoch
    pub timestamp: u64,
}

/// Bounded in-memory audit log; the oldest entries are evicted past capacity
pub struct AuditLog {
    entries: Arc<RwLock<VecDeque<AuditLogEntry>>>,
    max_entries: usize,
}

/// Fields of one request, before an id and timestamp are assigned
pub struct AuditRecord<'a> {
    pub question: &'a str,
    pub plan: &'a QueryPlan,
    pub sql: Option<&'a str>,
    pub origin: Option<StatementOrigin>,
    pub row_count: usize,
    pub elapsed_ms: u64,
    pub outcome: AuditOutcome,
}

impl AuditLog {
    pub fn new(max_entries: usize) -> Self {
        Self {
            entries: Arc::new(RwLock::new(VecDeque::new())),
            max_entries: max_entries.max(1),
        }
    }

    /// Log an entry, returning its id
    pub fn log(&self, record: AuditRecord<'_>) -> String {
        let id = uuid::Uuid::new_v4().to_string();
        let entry = AuditLogEntry {
            id: id.clone(),
            question: record.question.to_string(),
            plan: record.plan.clone(),
            sql: record.sql.map(str::to_string),
            origin: record.origin,
            row_count: record.row_count,
            elapsed_ms: record.elapsed_ms,
            outcome: record.outcome,
            timestamp: Self::now_timestamp(),
        };

        let mut entries = self.write();
        entries.push_back(entry);
        while entries.len() > self.max_entries {
            entries.pop_front();
        }
        id
    }

    /// All entries, oldest first
    pub fn entries(&self) -> Vec<AuditLogEntry> {
        self.read().iter().cloned().collect()
    }

    pub fn entry(&self, id: &str) -> Option<AuditLogEntry> {
        self.read().iter().find(|e| e.id == id).cloned()
    }

    pub fn len(&self) -> usize {
        self.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.read().is_empty()
    }

    // A panic while holding the lock cannot leave the deque half-updated, so recover it
    fn read(&self) -> RwLockReadGuard<'_, VecDeque<AuditLogEntry>> {
        self.entries.read().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, VecDeque<AuditLogEntry>> {
        self.entries.write().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn now_timestamp() -> u64 {
        std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or(0)
    }
}

impl Default for AuditLog {
    fn default() -> Self {
        Self::new(1000) // keep last 1000 entries
    }
}
