//! Storage interfaces consumed by the recovery core
//!
//! The core never talks to a database directly. It reads and writes through
//! these traits, which are implemented by [`InMemoryRepository`] and by the
//! SQLite-backed [`crate::database::Database`].

use chrono::{DateTime, NaiveDate, Utc};
use std::collections::HashMap;
use std::sync::RwLock;

use crate::database::DatabaseError;
use crate::models::{RecoveryReading, TrainingSession};

/// Access to stored recovery readings
pub trait RecoveryReadingRepository: Send + Sync {
    /// Most recent reading by timestamp
    fn latest_reading(&self, user_id: &str) -> Result<Option<RecoveryReading>, DatabaseError>;

    /// Readings with `start <= timestamp < end`, oldest first
    fn readings_in_range(
        &self,
        user_id: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<RecoveryReading>, DatabaseError>;

    fn save_reading(&self, reading: &RecoveryReading) -> Result<(), DatabaseError>;
}

/// Access to stored training sessions
pub trait TrainingSessionRepository: Send + Sync {
    /// Sessions with `start <= training_date <= end`, oldest first
    fn sessions_in_range(
        &self,
        user_id: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<TrainingSession>, DatabaseError>;

    /// Up to `limit` sessions, most recent first
    fn recent_sessions(&self, user_id: &str, limit: usize) -> Result<Vec<TrainingSession>, DatabaseError>;

    fn save_session(&self, session: &TrainingSession) -> Result<(), DatabaseError>;
}

/// Thread-safe in-memory storage for both readings and sessions
#[derive(Debug, Default)]
pub struct InMemoryRepository {
    readings: RwLock<HashMap<String, Vec<RecoveryReading>>>,
    sessions: RwLock<HashMap<String, Vec<TrainingSession>>>,
}

impl InMemoryRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

fn poisoned(what: &str) -> DatabaseError {
    DatabaseError::LockPoisoned(what.to_string())
}

impl RecoveryReadingRepository for InMemoryRepository {
    fn latest_reading(&self, user_id: &str) -> Result<Option<RecoveryReading>, DatabaseError> {
        let readings = self.readings.read().map_err(|_| poisoned("readings"))?;

        Ok(readings
            .get(user_id)
            .and_then(|list| list.iter().max_by_key(|r| r.timestamp))
            .cloned())
    }

    fn readings_in_range(
        &self,
        user_id: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<RecoveryReading>, DatabaseError> {
        let readings = self.readings.read().map_err(|_| poisoned("readings"))?;

        let mut matching: Vec<RecoveryReading> = readings
            .get(user_id)
            .map(|list| {
                list.iter()
                    .filter(|r| r.timestamp >= start && r.timestamp < end)
                    .cloned()
                    .collect()
            })
            .unwrap_or_default();
        matching.sort_by_key(|r| r.timestamp);

        Ok(matching)
    }

    fn save_reading(&self, reading: &RecoveryReading) -> Result<(), DatabaseError> {
        let mut readings = self.readings.write().map_err(|_| poisoned("readings"))?;
        let list = readings.entry(reading.user_id.clone()).or_default();

        if list.iter().any(|r| r.id == reading.id) {
            return Err(DatabaseError::Duplicate(format!("reading {}", reading.id)));
        }

        list.push(reading.clone());
        Ok(())
    }
}

impl TrainingSessionRepository for InMemoryRepository {
    fn sessions_in_range(
        &self,
        user_id: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<TrainingSession>, DatabaseError> {
        let sessions = self.sessions.read().map_err(|_| poisoned("sessions"))?;

        let mut matching: Vec<TrainingSession> = sessions
            .get(user_id)
            .map(|list| {
                list.iter()
                    .filter(|s| s.training_date >= start && s.training_date <= end)
                    .cloned()
                    .collect()
            })
            .unwrap_or_default();
        matching.sort_by_key(|s| s.training_date);

        Ok(matching)
    }

    fn recent_sessions(&self, user_id: &str, limit: usize) -> Result<Vec<TrainingSession>, DatabaseError> {
        let sessions = self.sessions.read().map_err(|_| poisoned("sessions"))?;

        let mut list: Vec<(usize, TrainingSession)> = sessions
            .get(user_id)
            .map(|list| list.iter().cloned().enumerate().collect())
            .unwrap_or_default();
        // Newest date first, later insertions win ties
        list.sort_by(|(ia, a), (ib, b)| b.training_date.cmp(&a.training_date).then(ib.cmp(ia)));

        Ok(list.into_iter().take(limit).map(|(_, s)| s).collect())
    }

    fn save_session(&self, session: &TrainingSession) -> Result<(), DatabaseError> {
        let mut sessions = self.sessions.write().map_err(|_| poisoned("sessions"))?;
        let list = sessions.entry(session.user_id.clone()).or_default();

        if list.iter().any(|s| s.id == session.id) {
            return Err(DatabaseError::Duplicate(format!("session {}", session.id)));
        }

        list.push(session.clone());
        Ok(())
    }
}
