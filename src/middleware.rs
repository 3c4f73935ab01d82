//! Cross-cutting wrappers around service operations
//!
//! [`with_retry`] re-runs storage operations that fail with a transient error,
//! and [`AuditTrail`] keeps an in-process record of every audited operation.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use tracing::{debug, error, info, warn};

use crate::error::{ErrorSeverity, RecoveryError, Result};

/// How often and how patiently transient failures are retried
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryPolicy {
    /// Total attempts including the first one
    pub max_attempts: u32,

    /// Delay before the second attempt; grows linearly per attempt
    pub base_delay_ms: u64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        RetryPolicy {
            max_attempts: 3,
            base_delay_ms: 50,
        }
    }
}

impl RetryPolicy {
    fn delay_before(&self, attempt: u32) -> Duration {
        Duration::from_millis(self.base_delay_ms.saturating_mul(attempt.saturating_sub(1) as u64))
    }
}

/// Run `op`, retrying while it fails with a retryable error
///
/// Non-retryable errors are returned immediately. After `max_attempts`
/// the last error is returned.
pub fn with_retry<T, F>(policy: &RetryPolicy, operation: &str, mut op: F) -> Result<T>
where
    F: FnMut() -> Result<T>,
{
    let max_attempts = policy.max_attempts.max(1);
    let mut attempt = 1;

    loop {
        match op() {
            Ok(value) => return Ok(value),
            Err(err) if err.is_retryable() && attempt < max_attempts => {
                attempt += 1;
                let delay = policy.delay_before(attempt);
                warn!(
                    operation,
                    attempt,
                    delay_ms = delay.as_millis() as u64,
                    error = %err,
                    "Retrying after transient failure"
                );
                std::thread::sleep(delay);
            }
            Err(err) => return Err(err),
        }
    }
}

/// Result of an audited operation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum AuditOutcome {
    Succeeded,
    Failed { reason: String },
}

/// Individual audit trail entry
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditEntry {
    /// Sequence number within the trail
    pub id: u64,
    pub timestamp: DateTime<Utc>,
    pub operation: String,
    pub user_id: String,
    pub duration_ms: u64,
    pub outcome: AuditOutcome,
}

const DEFAULT_MAX_ENTRIES: usize = 10_000;

#[derive(Debug, Default)]
struct AuditLog {
    next_id: u64,
    entries: VecDeque<AuditEntry>,
}

/// Shared record of the most recent service operations
#[derive(Debug, Clone)]
pub struct AuditTrail {
    log: Arc<Mutex<AuditLog>>,
    max_entries: usize,
}

impl Default for AuditTrail {
    fn default() -> Self {
        Self::with_capacity(DEFAULT_MAX_ENTRIES)
    }
}

impl AuditTrail {
    pub fn new() -> Self {
        Self::default()
    }

    /// Keep at most `max_entries`, dropping the oldest first
    pub fn with_capacity(max_entries: usize) -> Self {
        AuditTrail {
            log: Arc::new(Mutex::new(AuditLog::default())),
            max_entries: max_entries.max(1),
        }
    }

    /// Run `f` inside a tracing span and record its outcome
    pub fn audited<T, F>(&self, operation: &str, user_id: &str, f: F) -> Result<T>
    where
        F: FnOnce() -> Result<T>,
    {
        let span = tracing::debug_span!("operation", name = operation, user_id);
        let _guard = span.enter();

        let started = Instant::now();
        let timestamp = Utc::now();
        let result = f();
        let duration_ms = started.elapsed().as_millis() as u64;

        let outcome = match &result {
            Ok(_) => {
                debug!(duration_ms, "Operation succeeded");
                AuditOutcome::Succeeded
            }
            Err(err) => {
                log_failure(operation, err);
                AuditOutcome::Failed {
                    reason: err.to_string(),
                }
            }
        };

        self.record(timestamp, operation, user_id, duration_ms, outcome);
        result
    }

    fn record(
        &self,
        timestamp: DateTime<Utc>,
        operation: &str,
        user_id: &str,
        duration_ms: u64,
        outcome: AuditOutcome,
    ) {
        if let Ok(mut log) = self.log.lock() {
            log.next_id += 1;
            let id = log.next_id;

            if log.entries.len() == self.max_entries {
                log.entries.pop_front();
            }
            log.entries.push_back(AuditEntry {
                id,
                timestamp,
                operation: operation.to_string(),
                user_id: user_id.to_string(),
                duration_ms,
                outcome,
            });
        }
    }

    /// Retained audit entries, oldest first
    pub fn entries(&self) -> Vec<AuditEntry> {
        self.log
            .lock()
            .map(|log| log.entries.iter().cloned().collect())
            .unwrap_or_default()
    }

    /// Entries recorded for one user
    pub fn entries_for_user(&self, user_id: &str) -> Vec<AuditEntry> {
        self.entries()
            .into_iter()
            .filter(|e| e.user_id == user_id)
            .collect()
    }

    /// Count of successful and failed operations
    pub fn summary(&self) -> AuditSummary {
        let entries = self.entries();
        let failures = entries
            .iter()
            .filter(|e| matches!(e.outcome, AuditOutcome::Failed { .. }))
            .count();

        AuditSummary {
            total: entries.len(),
            successes: entries.len() - failures,
            failures,
        }
    }

    /// Export entries as pretty JSON
    pub fn export_json(&self) -> std::result::Result<String, serde_json::Error> {
        serde_json::to_string_pretty(&self.entries())
    }
}

/// Totals over an audit trail
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditSummary {
    pub total: usize,
    pub successes: usize,
    pub failures: usize,
}

fn log_failure(operation: &str, err: &RecoveryError) {
    match err.severity() {
        ErrorSeverity::Critical | ErrorSeverity::Error => {
            error!(operation, error = %err, "Operation failed")
        }
        ErrorSeverity::Warning => warn!(operation, error = %err, "Operation rejected"),
        ErrorSeverity::Info => info!(operation, error = %err, "Operation did not complete"),
    }
}
