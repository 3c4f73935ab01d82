//! Recovery service: the operations exposed to callers
//!
//! Every operation fetches what it needs from the repositories first, then
//! runs the pure calculators. Storage calls go through [`with_retry`] and each
//! public operation is recorded in the [`AuditTrail`].

use chrono::{DateTime, Days, Duration, NaiveDate, NaiveTime, Utc};
use rust_decimal::Decimal;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, RwLock};
use tracing::{debug, info, warn};

use crate::config::AppConfig;
use crate::error::{RecoveryError, Result};
use crate::events::{EventPublisher, TrainingCompleted};
use crate::impact::{impact_note, training_impact};
use crate::middleware::{with_retry, AuditTrail, RetryPolicy};
use crate::models::{sanitize_text, BiometricInputs, RecoveryReading, TrainingSession};
use crate::recovery::{self, RecoveryStatus, RecoveryTrend};
use crate::repository::{RecoveryReadingRepository, TrainingSessionRepository};
use crate::suggestions::{Suggestion, SuggestionGenerator};
use crate::training_load::{DailyLoadMetrics, LoadConfig, TrainingLoadCalculator, TrainingLoadSnapshot};

/// Service settings taken from the application config
#[derive(Debug, Clone, PartialEq)]
pub struct ServiceConfig {
    pub load: LoadConfig,
    pub retry: RetryPolicy,
    pub cache_enabled: bool,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        ServiceConfig {
            load: LoadConfig::default(),
            retry: RetryPolicy::default(),
            cache_enabled: true,
        }
    }
}

impl From<&AppConfig> for ServiceConfig {
    fn from(config: &AppConfig) -> Self {
        ServiceConfig {
            load: config.load.clone(),
            retry: config.retry.clone(),
            cache_enabled: config.cache_enabled,
        }
    }
}

pub struct RecoveryService {
    readings: Arc<dyn RecoveryReadingRepository>,
    sessions: Arc<dyn TrainingSessionRepository>,
    calculator: TrainingLoadCalculator,
    suggestions: SuggestionGenerator,
    retry: RetryPolicy,
    audit: AuditTrail,
    cache_enabled: bool,
    /// Today's status per user, dropped on every write for that user
    status_cache: Mutex<HashMap<String, RecoveryStatus>>,
    /// Serializes read-modify-write of a user's latest reading
    user_locks: Mutex<HashMap<String, Arc<Mutex<()>>>>,
    publisher: RwLock<Option<EventPublisher>>,
}

impl RecoveryService {
    pub fn new(
        readings: Arc<dyn RecoveryReadingRepository>,
        sessions: Arc<dyn TrainingSessionRepository>,
        config: ServiceConfig,
    ) -> Self {
        RecoveryService {
            readings,
            sessions,
            calculator: TrainingLoadCalculator::with_config(config.load),
            suggestions: SuggestionGenerator::new(),
            retry: config.retry,
            audit: AuditTrail::new(),
            cache_enabled: config.cache_enabled,
            status_cache: Mutex::new(HashMap::new()),
            user_locks: Mutex::new(HashMap::new()),
            publisher: RwLock::new(None),
        }
    }

    /// Publish a [`TrainingCompleted`] event for every recorded session
    pub fn attach_publisher(&self, publisher: EventPublisher) {
        if let Ok(mut slot) = self.publisher.write() {
            *slot = Some(publisher);
        }
    }

    /// Stop publishing; the worker drains its queue and exits
    pub fn detach_publisher(&self) {
        if let Ok(mut slot) = self.publisher.write() {
            slot.take();
        }
    }

    pub fn audit(&self) -> &AuditTrail {
        &self.audit
    }

    /// Recovery status for today from the user's latest reading
    pub fn current_recovery_status(&self, user_id: &str) -> Result<RecoveryStatus> {
        self.audit.audited("current_recovery_status", user_id, || {
            self.status_for_today(user_id)
        })
    }

    /// Recovery status from the last reading taken on `date` (UTC)
    pub fn recovery_status_for_date(&self, user_id: &str, date: NaiveDate) -> Result<RecoveryStatus> {
        self.audit.audited("recovery_status_for_date", user_id, || {
            let (start, end) = day_bounds(date, date);
            let readings = with_retry(&self.retry, "readings_in_range", || {
                Ok(self.readings.readings_in_range(user_id, start, end)?)
            })?;

            Ok(match readings.last() {
                Some(reading) => RecoveryStatus::from_reading(reading, date),
                None => RecoveryStatus::unknown(user_id, date),
            })
        })
    }

    /// Prioritized training suggestions for today
    pub fn training_suggestions(&self, user_id: &str) -> Result<Vec<Suggestion>> {
        self.audit.audited("training_suggestions", user_id, || {
            let latest = self.latest_reading(user_id)?;
            let limit = self.calculator.config().recent_session_limit.max(1);
            let recent = with_retry(&self.retry, "recent_sessions", || {
                Ok(self.sessions.recent_sessions(user_id, limit)?)
            })?;

            let score = latest
                .as_ref()
                .map(|r| r.recovery_score)
                .unwrap_or(recovery::DEFAULT_SCORE);

            Ok(self.suggestions.generate(score, latest.as_ref(), recent.first()))
        })
    }

    /// Training load over `[start, end]` with acute/chronic loads at `end`
    pub fn calculate_training_load(
        &self,
        user_id: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<TrainingLoadSnapshot> {
        self.audit.audited("calculate_training_load", user_id, || {
            check_range(start, end)?;
            let sessions = self.load_history(user_id, start, end)?;
            Ok(self.calculator.calculate_load(user_id, &sessions, start, end)?)
        })
    }

    /// Daily acute/chronic metrics for every day in `[start, end]`
    pub fn training_load_series(
        &self,
        user_id: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<DailyLoadMetrics>> {
        self.audit.audited("training_load_series", user_id, || {
            check_range(start, end)?;
            let sessions = self.load_history(user_id, start, end)?;
            let daily = self.calculator.aggregate_daily_volume(&sessions);
            Ok(self.calculator.calculate_load_series(&daily, start, end)?)
        })
    }

    /// Score a set of inputs without storing anything
    pub fn calculate_recovery_score(&self, inputs: &BiometricInputs) -> u8 {
        recovery::calculate_recovery_score(inputs)
    }

    /// Score trend over readings taken between `start` and `end` inclusive
    pub fn recovery_trend(&self, user_id: &str, start: NaiveDate, end: NaiveDate) -> Result<Option<RecoveryTrend>> {
        self.audit.audited("recovery_trend", user_id, || {
            check_range(start, end)?;
            let (from, to) = day_bounds(start, end);
            let readings = with_retry(&self.retry, "readings_in_range", || {
                Ok(self.readings.readings_in_range(user_id, from, to)?)
            })?;

            Ok(RecoveryTrend::from_readings(user_id, &readings))
        })
    }

    /// Validate, score and store a new reading
    pub fn submit_reading(
        &self,
        user_id: &str,
        inputs: BiometricInputs,
        notes: Option<String>,
        timestamp: Option<DateTime<Utc>>,
    ) -> Result<RecoveryReading> {
        self.audit.audited("submit_reading", user_id, || {
            let reading = RecoveryReading::new(user_id, timestamp.unwrap_or_else(Utc::now), inputs, notes)?;

            let lock = self.user_lock(user_id)?;
            let _guard = lock
                .lock()
                .map_err(|_| RecoveryError::Internal(format!("user lock poisoned: {}", user_id)))?;

            with_retry(&self.retry, "save_reading", || Ok(self.readings.save_reading(&reading)?))?;
            self.invalidate(user_id);

            info!(user_id, score = reading.recovery_score, "Recovery reading stored");
            Ok(reading)
        })
    }

    /// Store a completed session and announce it to the recovery worker
    ///
    /// Publishing is best effort; a missing or stopped worker never fails
    /// the write.
    pub fn record_training(&self, session: TrainingSession) -> Result<TrainingSession> {
        let user_id = session.user_id.clone();

        self.audit.audited("record_training", &user_id, || {
            let session = validate_session(session)?;

            with_retry(&self.retry, "save_session", || Ok(self.sessions.save_session(&session)?))?;
            self.invalidate(&session.user_id);
            info!(
                user_id = %session.user_id,
                session_id = %session.id,
                volume = ?session.total_volume,
                "Training session stored"
            );

            self.publish(TrainingCompleted::from(&session));
            Ok(session)
        })
    }

    /// Lower the user's score after a session by writing a new reading
    ///
    /// Returns `None` without writing when the user has no reading yet or
    /// the session has no impact.
    pub fn update_recovery_after_training(
        &self,
        user_id: &str,
        session_id: &str,
        total_volume: Option<Decimal>,
        exercise_type: &str,
    ) -> Result<Option<RecoveryReading>> {
        self.audit.audited("update_recovery_after_training", user_id, || {
            let impact = training_impact(total_volume);
            if impact == 0 {
                debug!(user_id, session_id, "Session has no recovery impact");
                return Ok(None);
            }

            let lock = self.user_lock(user_id)?;
            let _guard = lock
                .lock()
                .map_err(|_| RecoveryError::Internal(format!("user lock poisoned: {}", user_id)))?;

            let Some(latest) = self.latest_reading(user_id)? else {
                debug!(user_id, session_id, "No recovery reading to adjust");
                return Ok(None);
            };

            // The adjusted reading must become the latest one
            let timestamp = Utc::now().max(latest.timestamp + Duration::microseconds(1));
            let note = impact_note(
                session_id,
                exercise_type,
                total_volume.unwrap_or(Decimal::ZERO),
                impact,
            );
            let adjusted = latest.with_adjusted_score(impact, timestamp, note);

            with_retry(&self.retry, "save_reading", || Ok(self.readings.save_reading(&adjusted)?))?;
            self.invalidate(user_id);

            info!(
                user_id,
                session_id,
                impact,
                from = latest.recovery_score,
                to = adjusted.recovery_score,
                "Recovery adjusted after training"
            );
            Ok(Some(adjusted))
        })
    }

    fn status_for_today(&self, user_id: &str) -> Result<RecoveryStatus> {
        let today = Utc::now().date_naive();

        if let Some(status) = self.cached_status(user_id, today) {
            debug!(user_id, "Recovery status cache hit");
            return Ok(status);
        }
        debug!(user_id, "Recovery status cache miss");

        if !self.cache_enabled {
            return self.status_from_latest(user_id, today);
        }

        // Same lock writers hold across save + invalidate
        let lock = self.user_lock(user_id)?;
        let _guard = lock
            .lock()
            .map_err(|_| RecoveryError::Internal(format!("user lock poisoned: {}", user_id)))?;

        let status = self.status_from_latest(user_id, today)?;
        if let Ok(mut cache) = self.status_cache.lock() {
            cache.insert(user_id.to_string(), status.clone());
        }

        Ok(status)
    }

    fn status_from_latest(&self, user_id: &str, today: NaiveDate) -> Result<RecoveryStatus> {
        Ok(match self.latest_reading(user_id)? {
            Some(reading) => RecoveryStatus::from_reading(&reading, today),
            None => RecoveryStatus::unknown(user_id, today),
        })
    }

    fn cached_status(&self, user_id: &str, today: NaiveDate) -> Option<RecoveryStatus> {
        if !self.cache_enabled {
            return None;
        }

        let cache = self.status_cache.lock().ok()?;
        cache
            .get(user_id)
            .filter(|status| status.assessment_date == today)
            .cloned()
    }

    fn invalidate(&self, user_id: &str) {
        if let Ok(mut cache) = self.status_cache.lock() {
            cache.remove(user_id);
        }
    }

    fn latest_reading(&self, user_id: &str) -> Result<Option<RecoveryReading>> {
        with_retry(&self.retry, "latest_reading", || Ok(self.readings.latest_reading(user_id)?))
    }

    /// Sessions from the start of the chronic window up to `end`
    fn load_history(&self, user_id: &str, start: NaiveDate, end: NaiveDate) -> Result<Vec<TrainingSession>> {
        let from = self.calculator.history_start(start, end);
        with_retry(&self.retry, "sessions_in_range", || {
            Ok(self.sessions.sessions_in_range(user_id, from, end)?)
        })
    }

    fn user_lock(&self, user_id: &str) -> Result<Arc<Mutex<()>>> {
        let mut locks = self
            .user_locks
            .lock()
            .map_err(|_| RecoveryError::Internal("user lock table poisoned".to_string()))?;

        Ok(Arc::clone(locks.entry(user_id.to_string()).or_default()))
    }

    fn publish(&self, event: TrainingCompleted) {
        let publisher = self.publisher.read().ok().and_then(|slot| slot.clone());

        match publisher {
            Some(publisher) => {
                if let Err(err) = publisher.publish(event) {
                    warn!(error = %err, "Training event dropped");
                }
            }
            None => debug!(session_id = %event.session_id, "No recovery worker attached"),
        }
    }
}

fn check_range(start: NaiveDate, end: NaiveDate) -> Result<()> {
    if end < start {
        return Err(RecoveryError::InvalidRange { start, end });
    }
    Ok(())
}

/// Last instant with a four-digit year; stored timestamps compare as text
fn latest_bound() -> DateTime<Utc> {
    NaiveDate::from_ymd_opt(9999, 12, 31)
        .and_then(|date| date.and_hms_micro_opt(23, 59, 59, 999_999))
        .map(|dt| dt.and_utc())
        .unwrap_or(DateTime::<Utc>::MAX_UTC)
}

/// `[start 00:00, end + 1 day 00:00)` in UTC, clamped to year 9999
fn day_bounds(start: NaiveDate, end: NaiveDate) -> (DateTime<Utc>, DateTime<Utc>) {
    let latest = latest_bound();
    let from = start.and_time(NaiveTime::MIN).and_utc().min(latest);
    let to = end
        .checked_add_days(Days::new(1))
        .map(|next| next.and_time(NaiveTime::MIN).and_utc())
        .map_or(latest, |to| to.min(latest));
    (from, to)
}

fn validate_session(mut session: TrainingSession) -> Result<TrainingSession> {
    if session.user_id.trim().is_empty() {
        return Err(RecoveryError::Validation("user id is required".to_string()));
    }

    session.exercise_name = sanitize_text(&session.exercise_name);
    session.exercise_type = sanitize_text(&session.exercise_type);
    if session.exercise_name.is_empty() {
        return Err(RecoveryError::Validation("exercise name is required".to_string()));
    }

    if session.weight.is_some_and(|w| w < Decimal::ZERO) {
        return Err(RecoveryError::Validation("weight must not be negative".to_string()));
    }
    if session.volume_overflowed() {
        return Err(RecoveryError::Validation("session volume is too large".to_string()));
    }

    Ok(session)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::{Database, DatabaseError};
    use crate::recovery::RecoveryStatusLabel;
    use crate::repository::InMemoryRepository;
    use crate::training_load::LoadStatus;
    use rust_decimal_macros::dec;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Barrier;
    use std::thread;

    fn service() -> RecoveryService {
        let repo = Arc::new(InMemoryRepository::new());
        RecoveryService::new(repo.clone(), repo, ServiceConfig::default())
    }

    fn good_inputs() -> BiometricInputs {
        BiometricInputs {
            sleep_hours: Some(8.0),
            sleep_quality: Some(8),
            muscle_soreness: Some(2),
            stress_level: Some(3),
            hrv: Some(70),
            resting_heart_rate: Some(52),
        }
    }

    fn session_on(date: NaiveDate, weight: Decimal) -> TrainingSession {
        TrainingSession::new("user-1", "Squat", "legs", Some(5), Some(5), Some(weight), None, date)
    }

    #[test]
    fn test_unknown_status_without_readings() {
        let status = service().current_recovery_status("user-1").unwrap();

        assert_eq!(status.overall_score, 50);
        assert_eq!(status.status_label, RecoveryStatusLabel::Unknown);
    }

    #[test]
    fn test_current_status_is_idempotent() {
        let service = service();
        service.submit_reading("user-1", good_inputs(), None, None).unwrap();

        let first = service.current_recovery_status("user-1").unwrap();
        let second = service.current_recovery_status("user-1").unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_write_invalidates_cached_status() {
        let service = service();
        service.submit_reading("user-1", good_inputs(), None, None).unwrap();
        let before = service.current_recovery_status("user-1").unwrap();

        let poor = BiometricInputs {
            sleep_hours: Some(4.0),
            sleep_quality: Some(2),
            muscle_soreness: Some(9),
            stress_level: Some(9),
            ..BiometricInputs::default()
        };
        let later = Utc::now() + Duration::seconds(1);
        let reading = service.submit_reading("user-1", poor, None, Some(later)).unwrap();

        let after = service.current_recovery_status("user-1").unwrap();
        assert_eq!(after.overall_score, reading.recovery_score);
        assert_ne!(after.overall_score, before.overall_score);
    }

    /// Holds `latest_reading` open after reading so a write can land in between
    struct SlowReadings {
        inner: InMemoryRepository,
        slow_next: AtomicBool,
        read_done: Barrier,
    }

    impl RecoveryReadingRepository for SlowReadings {
        fn latest_reading(&self, user_id: &str) -> std::result::Result<Option<RecoveryReading>, DatabaseError> {
            let latest = self.inner.latest_reading(user_id)?;
            if self.slow_next.swap(false, Ordering::SeqCst) {
                self.read_done.wait();
                thread::sleep(std::time::Duration::from_millis(300));
            }
            Ok(latest)
        }

        fn readings_in_range(
            &self,
            user_id: &str,
            start: DateTime<Utc>,
            end: DateTime<Utc>,
        ) -> std::result::Result<Vec<RecoveryReading>, DatabaseError> {
            self.inner.readings_in_range(user_id, start, end)
        }

        fn save_reading(&self, reading: &RecoveryReading) -> std::result::Result<(), DatabaseError> {
            self.inner.save_reading(reading)
        }
    }

    #[test]
    fn test_cache_never_keeps_superseded_status() {
        let readings = Arc::new(SlowReadings {
            inner: InMemoryRepository::new(),
            slow_next: AtomicBool::new(false),
            read_done: Barrier::new(2),
        });
        let service = RecoveryService::new(
            readings.clone(),
            Arc::new(InMemoryRepository::new()),
            ServiceConfig::default(),
        );
        let first = service.submit_reading("user-1", good_inputs(), None, None).unwrap();

        let poor = BiometricInputs {
            sleep_hours: Some(4.0),
            sleep_quality: Some(2),
            stress_level: Some(9),
            ..BiometricInputs::default()
        };
        readings.slow_next.store(true, Ordering::SeqCst);

        let newer = thread::scope(|scope| {
            let reader = scope.spawn(|| service.current_recovery_status("user-1").unwrap());

            readings.read_done.wait();
            let later = Utc::now() + Duration::seconds(1);
            let newer = service.submit_reading("user-1", poor, None, Some(later)).unwrap();

            assert_eq!(reader.join().unwrap().overall_score, first.recovery_score);
            newer
        });

        assert_ne!(newer.recovery_score, first.recovery_score);
        let status = service.current_recovery_status("user-1").unwrap();
        assert_eq!(status.overall_score, newer.recovery_score);
    }

    #[test]
    fn test_day_bounds_stay_sortable() {
        let (from, to) = day_bounds(NaiveDate::MAX, NaiveDate::MAX);

        assert!(from <= to);
        assert_eq!(to, latest_bound());
        assert!(to.to_rfc3339().starts_with("9999-12-31T23:59:59"));
    }

    #[test]
    fn test_open_ended_range_finds_stored_readings() {
        let db = Arc::new(Database::in_memory().unwrap());
        let service = RecoveryService::new(db.clone(), db, ServiceConfig::default());
        let taken = NaiveDate::from_ymd_opt(2024, 3, 10).unwrap().and_hms_opt(7, 0, 0).unwrap().and_utc();
        service.submit_reading("user-1", good_inputs(), None, Some(taken)).unwrap();

        let trend = service
            .recovery_trend("user-1", taken.date_naive(), NaiveDate::MAX)
            .unwrap()
            .unwrap();
        assert_eq!(trend.reading_count, 1);
    }

    #[test]
    fn test_invalid_reading_rejected() {
        let inputs = BiometricInputs {
            sleep_quality: Some(11),
            ..BiometricInputs::default()
        };

        let result = service().submit_reading("user-1", inputs, None, None);
        assert!(matches!(result, Err(RecoveryError::Validation(_))));
    }

    #[test]
    fn test_update_without_history_is_noop() {
        let service = service();
        let result = service
            .update_recovery_after_training("user-1", "s-1", Some(dec!(12000)), "legs")
            .unwrap();

        assert!(result.is_none());
        assert_eq!(
            service.current_recovery_status("user-1").unwrap().status_label,
            RecoveryStatusLabel::Unknown
        );
    }

    #[test]
    fn test_update_writes_new_reading() {
        let service = service();
        let original = service.submit_reading("user-1", good_inputs(), None, None).unwrap();

        let adjusted = service
            .update_recovery_after_training("user-1", "s-1", Some(dec!(6000)), "legs")
            .unwrap()
            .unwrap();

        assert_ne!(adjusted.id, original.id);
        assert_eq!(adjusted.recovery_score, original.recovery_score.saturating_sub(10));
        assert_eq!(adjusted.sleep_hours, original.sleep_hours);
        assert!(adjusted.timestamp > original.timestamp);
        assert!(adjusted.notes.as_deref().unwrap_or_default().contains("s-1"));
    }

    #[test]
    fn test_missing_volume_is_noop() {
        let service = service();
        service.submit_reading("user-1", good_inputs(), None, None).unwrap();

        let result = service
            .update_recovery_after_training("user-1", "s-1", None, "cardio")
            .unwrap();
        assert!(result.is_none());
    }

    #[test]
    fn test_record_training_without_worker() {
        let service = service();
        let date = NaiveDate::from_ymd_opt(2024, 5, 1).unwrap();

        let stored = service.record_training(session_on(date, dec!(100))).unwrap();
        assert_eq!(stored.total_volume, Some(dec!(2500)));
    }

    #[test]
    fn test_record_training_rejects_negative_weight() {
        let date = NaiveDate::from_ymd_opt(2024, 5, 1).unwrap();
        let result = service().record_training(session_on(date, dec!(-5)));

        assert!(matches!(result, Err(RecoveryError::Validation(_))));
    }

    #[test]
    fn test_record_training_rejects_oversized_volume() {
        let date = NaiveDate::from_ymd_opt(2024, 5, 1).unwrap();
        let session = TrainingSession::new(
            "user-1",
            "Squat",
            "legs",
            Some(u32::MAX),
            Some(u32::MAX),
            Some(Decimal::MAX),
            None,
            date,
        );

        let result = service().record_training(session);
        assert!(matches!(result, Err(RecoveryError::Validation(_))));
    }

    #[test]
    fn test_empty_load_snapshot() {
        let start = NaiveDate::from_ymd_opt(2024, 5, 1).unwrap();
        let end = NaiveDate::from_ymd_opt(2024, 5, 7).unwrap();

        let snapshot = service().calculate_training_load("user-1", start, end).unwrap();
        assert_eq!(snapshot.total_volume, Decimal::ZERO);
        assert_eq!(snapshot.session_count, 0);
        assert_eq!(snapshot.load_status, LoadStatus::Undertraining);
    }

    #[test]
    fn test_load_uses_history_before_window() {
        let service = service();
        let end = NaiveDate::from_ymd_opt(2024, 5, 28).unwrap();
        let early = NaiveDate::from_ymd_opt(2024, 5, 5).unwrap();
        service.record_training(session_on(early, dec!(100))).unwrap();
        service.record_training(session_on(end, dec!(100))).unwrap();

        let snapshot = service.calculate_training_load("user-1", end, end).unwrap();
        assert_eq!(snapshot.total_volume, dec!(2500));
        assert_eq!(snapshot.chronic_load, dec!(5000) / dec!(28));
    }

    #[test]
    fn test_invalid_range() {
        let start = NaiveDate::from_ymd_opt(2024, 5, 7).unwrap();
        let end = NaiveDate::from_ymd_opt(2024, 5, 1).unwrap();
        let service = service();

        assert!(matches!(
            service.calculate_training_load("user-1", start, end),
            Err(RecoveryError::InvalidRange { .. })
        ));
        assert!(matches!(
            service.recovery_trend("user-1", start, end),
            Err(RecoveryError::InvalidRange { .. })
        ));
    }

    #[test]
    fn test_status_for_past_date() {
        let service = service();
        let date = NaiveDate::from_ymd_opt(2024, 3, 10).unwrap();
        let morning = date.and_hms_opt(7, 0, 0).unwrap().and_utc();

        let reading = service
            .submit_reading("user-1", good_inputs(), None, Some(morning))
            .unwrap();

        let status = service.recovery_status_for_date("user-1", date).unwrap();
        assert_eq!(status.overall_score, reading.recovery_score);
        assert_eq!(status.assessment_date, date);

        let next_day = date.succ_opt().unwrap();
        let empty = service.recovery_status_for_date("user-1", next_day).unwrap();
        assert_eq!(empty.status_label, RecoveryStatusLabel::Unknown);
    }

    #[test]
    fn test_suggestions_follow_latest_reading() {
        let service = service();
        service.submit_reading("user-1", good_inputs(), None, None).unwrap();
        let date = Utc::now().date_naive();
        service
            .record_training(TrainingSession::new(
                "user-1", "Bench", "chest", Some(3), Some(8), Some(dec!(60)), None, date,
            ))
            .unwrap();

        let suggestions = service.training_suggestions("user-1").unwrap();
        assert_eq!(suggestions[0].priority, 1);
        assert!(suggestions.iter().any(|s| s.title == "Train lower body"));
    }

    #[test]
    fn test_operations_are_audited() {
        let service = service();
        service.current_recovery_status("user-1").unwrap();
        let _ = service.submit_reading("", good_inputs(), None, None);

        let summary = service.audit().summary();
        assert_eq!(summary.total, 2);
        assert_eq!(summary.failures, 1);
    }
}
