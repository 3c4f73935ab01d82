use chrono::{DateTime, NaiveDate, SecondsFormat, Utc};
use rusqlite::types::Type;
use rusqlite::{params, Connection, OptionalExtension, Row};
use rust_decimal::Decimal;
use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use crate::models::{RecoveryReading, TrainingSession};
use crate::repository::{RecoveryReadingRepository, TrainingSessionRepository};

/// Database error types
#[derive(Debug, thiserror::Error)]
pub enum DatabaseError {
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
    #[error("Serialization error: {0}")]
    Serialization(String),
    #[error("Data not found: {0}")]
    NotFound(String),
    #[error("Duplicate entry: {0}")]
    Duplicate(String),
    #[error("Lock poisoned: {0}")]
    LockPoisoned(String),
}

const READING_COLUMNS: &str = "id, user_id, timestamp, sleep_hours, sleep_quality, muscle_soreness, \
     stress_level, hrv, resting_heart_rate, recovery_score, notes";

const SESSION_COLUMNS: &str = "id, user_id, exercise_name, exercise_type, sets, reps, weight, \
     duration_minutes, training_date, total_volume";

/// SQLite-backed storage for readings and sessions
pub struct Database {
    conn: Mutex<Connection>,
}

impl Database {
    /// Create or open a database at the specified path
    pub fn new<P: AsRef<Path>>(db_path: P) -> Result<Self, DatabaseError> {
        let conn = Connection::open(db_path)?;
        Self::with_connection(conn)
    }

    /// Open a private in-memory database
    pub fn in_memory() -> Result<Self, DatabaseError> {
        Self::with_connection(Connection::open_in_memory()?)
    }

    fn with_connection(conn: Connection) -> Result<Self, DatabaseError> {
        let db = Self {
            conn: Mutex::new(conn),
        };

        db.init_schema()?;

        Ok(db)
    }

    fn conn(&self) -> Result<MutexGuard<'_, Connection>, DatabaseError> {
        self.conn
            .lock()
            .map_err(|_| DatabaseError::LockPoisoned("sqlite connection".to_string()))
    }

    /// Initialize database schema with tables and indexes
    fn init_schema(&self) -> Result<(), DatabaseError> {
        let conn = self.conn()?;

        // WAL for concurrent readers; returns a row so it is queried, not executed
        conn.query_row("PRAGMA journal_mode=WAL", [], |_| Ok(()))?;
        conn.execute("PRAGMA synchronous=NORMAL", [])?;

        conn.execute(
            r#"
            CREATE TABLE IF NOT EXISTS recovery_readings (
                id TEXT PRIMARY KEY,
                user_id TEXT NOT NULL,
                timestamp TEXT NOT NULL,
                sleep_hours REAL,
                sleep_quality INTEGER,
                muscle_soreness INTEGER,
                stress_level INTEGER,
                hrv INTEGER,
                resting_heart_rate INTEGER,
                recovery_score INTEGER NOT NULL CHECK (recovery_score BETWEEN 0 AND 100),
                notes TEXT,
                created_at DATETIME DEFAULT CURRENT_TIMESTAMP
            )
            "#,
            [],
        )?;

        conn.execute(
            r#"
            CREATE TABLE IF NOT EXISTS training_sessions (
                id TEXT PRIMARY KEY,
                user_id TEXT NOT NULL,
                exercise_name TEXT NOT NULL,
                exercise_type TEXT NOT NULL,
                sets INTEGER,
                reps INTEGER,
                weight TEXT,
                duration_minutes INTEGER,
                training_date DATE NOT NULL,
                total_volume TEXT,
                created_at DATETIME DEFAULT CURRENT_TIMESTAMP
            )
            "#,
            [],
        )?;

        conn.execute(
            "CREATE INDEX IF NOT EXISTS idx_readings_user_time ON recovery_readings (user_id, timestamp)",
            [],
        )?;
        conn.execute(
            "CREATE INDEX IF NOT EXISTS idx_sessions_user_date ON training_sessions (user_id, training_date)",
            [],
        )?;

        Ok(())
    }

    /// Get database statistics
    pub fn get_stats(&self) -> Result<DatabaseStats, DatabaseError> {
        let conn = self.conn()?;

        let reading_count: i64 =
            conn.query_row("SELECT COUNT(*) FROM recovery_readings", [], |row| row.get(0))?;
        let session_count: i64 =
            conn.query_row("SELECT COUNT(*) FROM training_sessions", [], |row| row.get(0))?;
        let user_count: i64 = conn.query_row(
            r#"
            SELECT COUNT(*) FROM (
                SELECT user_id FROM recovery_readings
                UNION
                SELECT user_id FROM training_sessions
            )
            "#,
            [],
            |row| row.get(0),
        )?;

        Ok(DatabaseStats {
            reading_count: reading_count as usize,
            session_count: session_count as usize,
            user_count: user_count as usize,
        })
    }
}

/// Fixed-width RFC 3339 so that text ordering matches time ordering
fn timestamp_key(ts: &DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn conversion_error<E>(idx: usize, err: E) -> rusqlite::Error
where
    E: std::error::Error + Send + Sync + 'static,
{
    rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(err))
}

fn parse_decimal(row: &Row, idx: usize) -> rusqlite::Result<Option<Decimal>> {
    row.get::<_, Option<String>>(idx)?
        .map(|s| s.parse::<Decimal>().map_err(|e| conversion_error(idx, e)))
        .transpose()
}

/// Helper to convert database row to RecoveryReading struct
fn reading_from_row(row: &Row) -> rusqlite::Result<RecoveryReading> {
    let timestamp = DateTime::parse_from_rfc3339(&row.get::<_, String>(2)?)
        .map_err(|e| conversion_error(2, e))?
        .with_timezone(&Utc);

    Ok(RecoveryReading {
        id: row.get(0)?,
        user_id: row.get(1)?,
        timestamp,
        sleep_hours: row.get(3)?,
        sleep_quality: row.get(4)?,
        muscle_soreness: row.get(5)?,
        stress_level: row.get(6)?,
        hrv: row.get(7)?,
        resting_heart_rate: row.get(8)?,
        recovery_score: row.get(9)?,
        notes: row.get(10)?,
    })
}

/// Helper to convert database row to TrainingSession struct
fn session_from_row(row: &Row) -> rusqlite::Result<TrainingSession> {
    let training_date = NaiveDate::parse_from_str(&row.get::<_, String>(8)?, "%Y-%m-%d")
        .map_err(|e| conversion_error(8, e))?;

    Ok(TrainingSession {
        id: row.get(0)?,
        user_id: row.get(1)?,
        exercise_name: row.get(2)?,
        exercise_type: row.get(3)?,
        sets: row.get(4)?,
        reps: row.get(5)?,
        weight: parse_decimal(row, 6)?,
        duration_minutes: row.get(7)?,
        training_date,
        total_volume: parse_decimal(row, 9)?,
    })
}

fn map_insert_error(err: rusqlite::Error, what: String) -> DatabaseError {
    match err {
        rusqlite::Error::SqliteFailure(e, _) if e.code == rusqlite::ErrorCode::ConstraintViolation => {
            DatabaseError::Duplicate(what)
        }
        other => DatabaseError::Sqlite(other),
    }
}

impl RecoveryReadingRepository for Database {
    fn latest_reading(&self, user_id: &str) -> Result<Option<RecoveryReading>, DatabaseError> {
        let conn = self.conn()?;
        let query = format!(
            "SELECT {} FROM recovery_readings WHERE user_id = ?1 ORDER BY timestamp DESC LIMIT 1",
            READING_COLUMNS
        );

        let reading = conn
            .query_row(&query, params![user_id], reading_from_row)
            .optional()?;

        Ok(reading)
    }

    fn readings_in_range(
        &self,
        user_id: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<RecoveryReading>, DatabaseError> {
        let conn = self.conn()?;
        let query = format!(
            "SELECT {} FROM recovery_readings \
             WHERE user_id = ?1 AND timestamp >= ?2 AND timestamp < ?3 \
             ORDER BY timestamp ASC",
            READING_COLUMNS
        );

        let mut stmt = conn.prepare(&query)?;
        let readings = stmt
            .query_map(
                params![user_id, timestamp_key(&start), timestamp_key(&end)],
                reading_from_row,
            )?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(readings)
    }

    fn save_reading(&self, reading: &RecoveryReading) -> Result<(), DatabaseError> {
        let conn = self.conn()?;

        conn.execute(
            r#"
            INSERT INTO recovery_readings (
                id, user_id, timestamp, sleep_hours, sleep_quality, muscle_soreness,
                stress_level, hrv, resting_heart_rate, recovery_score, notes
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)
            "#,
            params![
                reading.id,
                reading.user_id,
                timestamp_key(&reading.timestamp),
                reading.sleep_hours,
                reading.sleep_quality,
                reading.muscle_soreness,
                reading.stress_level,
                reading.hrv,
                reading.resting_heart_rate,
                reading.recovery_score,
                reading.notes,
            ],
        )
        .map_err(|e| map_insert_error(e, format!("reading {}", reading.id)))?;

        Ok(())
    }
}

impl TrainingSessionRepository for Database {
    fn sessions_in_range(
        &self,
        user_id: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<TrainingSession>, DatabaseError> {
        let conn = self.conn()?;
        let query = format!(
            "SELECT {} FROM training_sessions \
             WHERE user_id = ?1 AND training_date >= ?2 AND training_date <= ?3 \
             ORDER BY training_date ASC, rowid ASC",
            SESSION_COLUMNS
        );

        let mut stmt = conn.prepare(&query)?;
        let sessions = stmt
            .query_map(
                params![user_id, start.to_string(), end.to_string()],
                session_from_row,
            )?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(sessions)
    }

    fn recent_sessions(&self, user_id: &str, limit: usize) -> Result<Vec<TrainingSession>, DatabaseError> {
        let conn = self.conn()?;
        let query = format!(
            "SELECT {} FROM training_sessions WHERE user_id = ?1 \
             ORDER BY training_date DESC, rowid DESC LIMIT ?2",
            SESSION_COLUMNS
        );

        let mut stmt = conn.prepare(&query)?;
        let sessions = stmt
            .query_map(params![user_id, limit as i64], session_from_row)?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(sessions)
    }

    fn save_session(&self, session: &TrainingSession) -> Result<(), DatabaseError> {
        let conn = self.conn()?;

        conn.execute(
            r#"
            INSERT INTO training_sessions (
                id, user_id, exercise_name, exercise_type, sets, reps, weight,
                duration_minutes, training_date, total_volume
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
            "#,
            params![
                session.id,
                session.user_id,
                session.exercise_name,
                session.exercise_type,
                session.sets,
                session.reps,
                session.weight.map(|w| w.to_string()),
                session.duration_minutes,
                session.training_date.to_string(),
                session.total_volume.map(|v| v.to_string()),
            ],
        )
        .map_err(|e| map_insert_error(e, format!("session {}", session.id)))?;

        Ok(())
    }
}

/// Database statistics
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DatabaseStats {
    pub reading_count: usize,
    pub session_count: usize,
    pub user_count: usize,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::BiometricInputs;
    use chrono::Duration;
    use rust_decimal_macros::dec;

    fn reading(user_id: &str, timestamp: DateTime<Utc>, sleep_hours: f64) -> RecoveryReading {
        RecoveryReading::new(
            user_id,
            timestamp,
            BiometricInputs {
                sleep_hours: Some(sleep_hours),
                sleep_quality: Some(6),
                hrv: Some(52),
                ..BiometricInputs::default()
            },
            Some("morning check-in".to_string()),
        )
        .unwrap()
    }

    #[test]
    fn test_reading_round_trip() {
        let db = Database::in_memory().unwrap();
        let now = Utc::now();
        let stored = reading("user-1", now, 7.5);

        db.save_reading(&stored).unwrap();
        let loaded = db.latest_reading("user-1").unwrap().unwrap();

        assert_eq!(loaded.id, stored.id);
        assert_eq!(loaded.recovery_score, stored.recovery_score);
        assert_eq!(loaded.sleep_hours, Some(7.5));
        assert_eq!(loaded.hrv, Some(52));
        assert_eq!(loaded.notes.as_deref(), Some("morning check-in"));
        // Microsecond precision is kept
        assert!((loaded.timestamp - now).num_milliseconds().abs() < 1);
    }

    #[test]
    fn test_latest_and_range_queries() {
        let db = Database::in_memory().unwrap();
        let base = Utc::now() - Duration::days(3);

        for i in 0..3 {
            db.save_reading(&reading("user-1", base + Duration::days(i), 6.0 + i as f64))
                .unwrap();
        }
        db.save_reading(&reading("user-2", base + Duration::days(5), 9.0)).unwrap();

        let latest = db.latest_reading("user-1").unwrap().unwrap();
        assert_eq!(latest.sleep_hours, Some(8.0));

        let range = db
            .readings_in_range("user-1", base, base + Duration::days(2))
            .unwrap();
        assert_eq!(range.len(), 2);
        assert!(range[0].timestamp < range[1].timestamp);
    }

    #[test]
    fn test_session_round_trip_and_recent() {
        let db = Database::in_memory().unwrap();
        let day = |d| NaiveDate::from_ymd_opt(2024, 7, d).unwrap();

        let squat = TrainingSession::new(
            "user-1", "Back Squat", "legs", Some(5), Some(5), Some(dec!(102.5)), Some(50), day(1),
        );
        let bench = TrainingSession::new(
            "user-1", "Bench Press", "chest", Some(5), Some(5), Some(dec!(80)), Some(40), day(3),
        );
        db.save_session(&squat).unwrap();
        db.save_session(&bench).unwrap();

        let sessions = db.sessions_in_range("user-1", day(1), day(2)).unwrap();
        assert_eq!(sessions.len(), 1);
        assert_eq!(sessions[0], squat);
        assert_eq!(sessions[0].total_volume, Some(dec!(2562.5)));

        let recent = db.recent_sessions("user-1", 1).unwrap();
        assert_eq!(recent, vec![bench]);
    }

    #[test]
    fn test_duplicate_session_rejected() {
        let db = Database::in_memory().unwrap();
        let session = TrainingSession::new(
            "user-1",
            "Row",
            "back",
            Some(3),
            Some(12),
            Some(dec!(60)),
            None,
            NaiveDate::from_ymd_opt(2024, 7, 1).unwrap(),
        );

        db.save_session(&session).unwrap();
        assert!(matches!(db.save_session(&session), Err(DatabaseError::Duplicate(_))));
    }

    #[test]
    fn test_stats() {
        let db = Database::in_memory().unwrap();
        db.save_reading(&reading("user-1", Utc::now(), 7.0)).unwrap();
        db.save_reading(&reading("user-2", Utc::now(), 7.0)).unwrap();

        let stats = db.get_stats().unwrap();
        assert_eq!(stats.reading_count, 2);
        assert_eq!(stats.session_count, 0);
        assert_eq!(stats.user_count, 2);
    }
}
