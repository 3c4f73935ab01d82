//! Recovery scoring and status classification
//!
//! This module turns a user's biometric submission into a bounded 0-100
//! recovery score and derives everything the rest of the system reads from
//! that score: a qualitative status, a recommended training intensity and an
//! estimate of the days needed to recover fully.
//!
//! # Sports Science Background
//!
//! Readiness to train is approximated from a handful of noisy markers:
//!
//! - **Sleep duration and quality**: the strongest single predictor of next-day
//!   readiness. Seven to nine hours is the usual recommendation for athletes.
//! - **Muscle soreness**: delayed-onset soreness indicates incomplete tissue repair.
//! - **Perceived stress**: psychological load competes with training load for
//!   the same recovery resources.
//! - **HRV**: higher heart rate variability reflects parasympathetic dominance,
//!   i.e. a recovered autonomic state.
//! - **Resting heart rate**: an elevated morning heart rate is a classic sign
//!   of accumulated fatigue or illness.
//!
//! # Scoring Model
//!
//! The score starts from a neutral base of 50 and each marker adds or removes
//! a fixed number of points. Missing markers contribute nothing. The sum is
//! clamped to 0-100 at the very end, so individual contributions may push the
//! intermediate total outside that range.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::models::{BiometricInputs, RecoveryReading};

/// Neutral starting point of the recovery score
pub const BASE_SCORE: i32 = 50;

/// Score reported when a user has no readings at all
pub const DEFAULT_SCORE: u8 = 50;

/// Calculate the composite recovery score (0-100)
///
/// # Algorithm
///
/// | Marker             | Contribution                                         |
/// |--------------------|------------------------------------------------------|
/// | Sleep hours        | ≥8 → +20, ≥7 → +15, ≥6 → +5, <5 → −15, 5-6 → −5      |
/// | Sleep quality      | (quality − 5) × 3                                    |
/// | Muscle soreness    | −(soreness − 3) × 3                                  |
/// | Stress level       | −(stress − 5) × 3                                    |
/// | HRV (ms)           | ≥60 → +10, ≥50 → +5, <40 → −10                       |
/// | Resting HR (bpm)   | ≤55 → +5, ≤65 → +2, ≥80 → −5                         |
///
/// The function is total: out-of-range inputs are scored like any other value
/// and the result is still clamped.
///
/// # Example
///
/// ```rust
/// use recoveryrs::models::BiometricInputs;
/// use recoveryrs::recovery::calculate_recovery_score;
///
/// let inputs = BiometricInputs {
///     sleep_hours: Some(8.0),
///     hrv: Some(65),
///     ..BiometricInputs::default()
/// };
/// assert_eq!(calculate_recovery_score(&inputs), 80);
/// ```
pub fn calculate_recovery_score(inputs: &BiometricInputs) -> u8 {
    let adjustment = sleep_hours_adjustment(inputs.sleep_hours)
        + scale_adjustment(inputs.sleep_quality, 5, 3)
        - scale_adjustment(inputs.muscle_soreness, 3, 3)
        - scale_adjustment(inputs.stress_level, 5, 3)
        + hrv_adjustment(inputs.hrv)
        + resting_hr_adjustment(inputs.resting_heart_rate);

    clamp_score(BASE_SCORE + adjustment)
}

fn sleep_hours_adjustment(sleep_hours: Option<f64>) -> i32 {
    match sleep_hours {
        Some(h) if h >= 8.0 => 20,
        Some(h) if h >= 7.0 => 15,
        Some(h) if h >= 6.0 => 5,
        Some(h) if h < 5.0 => -15,
        Some(_) => -5,
        None => 0,
    }
}

/// (value − neutral) × weight, zero when the value is absent
fn scale_adjustment(value: Option<u8>, neutral: i32, weight: i32) -> i32 {
    value.map_or(0, |v| (v as i32 - neutral) * weight)
}

fn hrv_adjustment(hrv: Option<u16>) -> i32 {
    match hrv {
        Some(v) if v >= 60 => 10,
        Some(v) if v >= 50 => 5,
        Some(v) if v < 40 => -10,
        _ => 0,
    }
}

fn resting_hr_adjustment(resting_heart_rate: Option<u16>) -> i32 {
    match resting_heart_rate {
        Some(v) if v <= 55 => 5,
        Some(v) if v <= 65 => 2,
        Some(v) if v >= 80 => -5,
        _ => 0,
    }
}

fn clamp_score(raw: i32) -> u8 {
    raw.clamp(0, 100) as u8
}

/// Calculate the independent sleep sub-score (0-100)
///
/// Used for display and advice only; it is never fed back into the overall
/// recovery score.
///
/// - Base 50
/// - ≥8h → +25, ≥7h → +15, <6h → −20
/// - Quality: (quality − 5) × 5
pub fn calculate_sleep_score(sleep_hours: Option<f64>, sleep_quality: Option<u8>) -> u8 {
    let hours_adjustment = match sleep_hours {
        Some(h) if h >= 8.0 => 25,
        Some(h) if h >= 7.0 => 15,
        Some(h) if h < 6.0 => -20,
        _ => 0,
    };

    clamp_score(BASE_SCORE + hours_adjustment + scale_adjustment(sleep_quality, 5, 5))
}

/// Qualitative recovery status derived from the score
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RecoveryStatusLabel {
    /// Score ≥ 80
    Excellent,
    /// Score ≥ 60
    Good,
    /// Score ≥ 40
    Fair,
    /// Score ≥ 20
    Poor,
    /// Score < 20
    Critical,
    /// No reading available for the user
    Unknown,
}

impl RecoveryStatusLabel {
    /// Classify a score. Boundary values belong to the upper bucket.
    pub fn from_score(score: u8) -> Self {
        match score {
            80.. => RecoveryStatusLabel::Excellent,
            60..=79 => RecoveryStatusLabel::Good,
            40..=59 => RecoveryStatusLabel::Fair,
            20..=39 => RecoveryStatusLabel::Poor,
            _ => RecoveryStatusLabel::Critical,
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            RecoveryStatusLabel::Excellent => "Fully recovered and ready for hard training",
            RecoveryStatusLabel::Good => "Well recovered, normal training is fine",
            RecoveryStatusLabel::Fair => "Partially recovered, keep the intensity in check",
            RecoveryStatusLabel::Poor => "Poorly recovered, favour light activity",
            RecoveryStatusLabel::Critical => "Not recovered, rest is needed",
            RecoveryStatusLabel::Unknown => "No recovery data yet",
        }
    }
}

impl fmt::Display for RecoveryStatusLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RecoveryStatusLabel::Excellent => write!(f, "EXCELLENT"),
            RecoveryStatusLabel::Good => write!(f, "GOOD"),
            RecoveryStatusLabel::Fair => write!(f, "FAIR"),
            RecoveryStatusLabel::Poor => write!(f, "POOR"),
            RecoveryStatusLabel::Critical => write!(f, "CRITICAL"),
            RecoveryStatusLabel::Unknown => write!(f, "UNKNOWN"),
        }
    }
}

/// Recommended training intensity derived from the score
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TrainingIntensity {
    Rest,
    Light,
    Moderate,
    High,
    Intense,
}

impl TrainingIntensity {
    /// Classify a score. Boundary values belong to the upper bucket.
    pub fn from_score(score: u8) -> Self {
        match score {
            80.. => TrainingIntensity::Intense,
            65..=79 => TrainingIntensity::High,
            50..=64 => TrainingIntensity::Moderate,
            30..=49 => TrainingIntensity::Light,
            _ => TrainingIntensity::Rest,
        }
    }
}

impl fmt::Display for TrainingIntensity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TrainingIntensity::Rest => write!(f, "REST"),
            TrainingIntensity::Light => write!(f, "LIGHT"),
            TrainingIntensity::Moderate => write!(f, "MODERATE"),
            TrainingIntensity::High => write!(f, "HIGH"),
            TrainingIntensity::Intense => write!(f, "INTENSE"),
        }
    }
}

/// Days until full recovery is expected
pub fn estimated_recovery_days(score: u8) -> u8 {
    match score {
        80.. => 0,
        60..=79 => 1,
        40..=59 => 2,
        20..=39 => 3,
        _ => 4,
    }
}

/// Complete recovery assessment for a user on a given day
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecoveryStatus {
    pub user_id: String,

    /// Day the assessment applies to
    pub assessment_date: NaiveDate,

    /// Recovery score of the underlying reading (50 when there is none)
    pub overall_score: u8,

    pub status_label: RecoveryStatusLabel,

    pub recommended_intensity: TrainingIntensity,

    pub estimated_recovery_days: u8,

    /// Sleep sub-score, only when the reading carries sleep data
    pub sleep_score: Option<u8>,

    /// Timestamp of the reading this status was derived from
    pub reading_timestamp: Option<DateTime<Utc>>,

    /// Human-readable advice, most important first
    pub advice: Vec<String>,
}

impl RecoveryStatus {
    /// Assess a reading. Every score-derived field is a pure function of the score.
    pub fn from_reading(reading: &RecoveryReading, assessment_date: NaiveDate) -> Self {
        let score = reading.recovery_score;
        let sleep_score = if reading.sleep_hours.is_some() || reading.sleep_quality.is_some() {
            Some(calculate_sleep_score(reading.sleep_hours, reading.sleep_quality))
        } else {
            None
        };

        RecoveryStatus {
            user_id: reading.user_id.clone(),
            assessment_date,
            overall_score: score,
            status_label: RecoveryStatusLabel::from_score(score),
            recommended_intensity: TrainingIntensity::from_score(score),
            estimated_recovery_days: estimated_recovery_days(score),
            sleep_score,
            reading_timestamp: Some(reading.timestamp),
            advice: build_advice(score, sleep_score, reading),
        }
    }

    /// Neutral status reported when no reading exists
    ///
    /// The neutral score is for display only and is never persisted.
    pub fn unknown(user_id: impl Into<String>, assessment_date: NaiveDate) -> Self {
        RecoveryStatus {
            user_id: user_id.into(),
            assessment_date,
            overall_score: DEFAULT_SCORE,
            status_label: RecoveryStatusLabel::Unknown,
            recommended_intensity: TrainingIntensity::from_score(DEFAULT_SCORE),
            estimated_recovery_days: estimated_recovery_days(DEFAULT_SCORE),
            sleep_score: None,
            reading_timestamp: None,
            advice: vec!["Log a recovery reading to get a personalised assessment".to_string()],
        }
    }
}

fn build_advice(score: u8, sleep_score: Option<u8>, reading: &RecoveryReading) -> Vec<String> {
    let mut advice = vec![RecoveryStatusLabel::from_score(score).description().to_string()];

    if let Some(sleep) = sleep_score {
        if sleep < 60 {
            advice.push("Aim for 7-9 hours of sleep with a consistent bedtime".to_string());
        }
    }

    if reading.muscle_soreness.is_some_and(|s| s >= 7) {
        advice.push("Use foam rolling, mobility work and light movement for sore muscles".to_string());
    }

    if reading.stress_level.is_some_and(|s| s >= 7) {
        advice.push("Stress is high; breathing exercises or a walk can help".to_string());
    }

    if reading.hrv.is_some_and(|h| h < 40) {
        advice.push("HRV is low; avoid maximal efforts today".to_string());
    }

    if score < 40 {
        advice.push("Prioritize hydration, nutrition and an extra rest day".to_string());
    }

    advice
}

/// Direction of a metric over a period
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TrendDirection {
    Increasing,
    Stable,
    Decreasing,
}

impl TrendDirection {
    /// Compare the first and last values of a series with a 5% dead band
    pub fn between(start: f64, end: f64) -> Self {
        let change_threshold = 0.05;
        let percent_change = (end - start) / start.abs().max(1.0);

        if percent_change > change_threshold {
            TrendDirection::Increasing
        } else if percent_change < -change_threshold {
            TrendDirection::Decreasing
        } else {
            TrendDirection::Stable
        }
    }
}

/// Recovery score summary over a range of readings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecoveryTrend {
    pub user_id: String,
    pub reading_count: usize,
    pub average_score: f64,
    pub min_score: u8,
    pub max_score: u8,
    pub trend: TrendDirection,
}

impl RecoveryTrend {
    /// Summarize readings; `None` when the slice is empty
    pub fn from_readings(user_id: &str, readings: &[RecoveryReading]) -> Option<Self> {
        let mut sorted: Vec<&RecoveryReading> = readings.iter().collect();
        sorted.sort_by_key(|r| r.timestamp);

        let first = sorted.first()?;
        let last = sorted.last()?;

        let total: u32 = sorted.iter().map(|r| r.recovery_score as u32).sum();
        let min_score = sorted.iter().map(|r| r.recovery_score).min()?;
        let max_score = sorted.iter().map(|r| r.recovery_score).max()?;

        Some(RecoveryTrend {
            user_id: user_id.to_string(),
            reading_count: sorted.len(),
            average_score: total as f64 / sorted.len() as f64,
            min_score,
            max_score,
            trend: TrendDirection::between(first.recovery_score as f64, last.recovery_score as f64),
        })
    }
}
