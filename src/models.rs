use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::recovery::calculate_recovery_score;

/// Biometric inputs for a recovery score calculation
///
/// Every field is optional; an absent field simply contributes nothing to
/// the score.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BiometricInputs {
    /// Hours slept during the previous night
    pub sleep_hours: Option<f64>,

    /// Subjective sleep quality (1-10, 5 is neutral)
    pub sleep_quality: Option<u8>,

    /// Subjective muscle soreness (1-10, 3 is neutral)
    pub muscle_soreness: Option<u8>,

    /// Subjective stress level (1-10, 5 is neutral)
    pub stress_level: Option<u8>,

    /// Heart rate variability in milliseconds
    pub hrv: Option<u16>,

    /// Resting heart rate in beats per minute
    pub resting_heart_rate: Option<u16>,
}

impl BiometricInputs {
    /// Validate that every present field is within its plausible range
    pub fn validate(&self) -> Result<(), ReadingValidationError> {
        if let Some(hours) = self.sleep_hours {
            if !(0.0..=24.0).contains(&hours) || hours.is_nan() {
                return Err(ReadingValidationError::InvalidSleepHours(hours));
            }
        }

        for (field, value) in [
            ("sleep_quality", self.sleep_quality),
            ("muscle_soreness", self.muscle_soreness),
            ("stress_level", self.stress_level),
        ] {
            if let Some(v) = value {
                if !(1..=10).contains(&v) {
                    return Err(ReadingValidationError::OutOfScale { field, value: v });
                }
            }
        }

        if let Some(hrv) = self.hrv {
            if hrv > 300 {
                return Err(ReadingValidationError::InvalidHrv(hrv));
            }
        }

        if let Some(rhr) = self.resting_heart_rate {
            if !(20..=250).contains(&rhr) {
                return Err(ReadingValidationError::InvalidRestingHeartRate(rhr));
            }
        }

        Ok(())
    }
}

/// A single biometric submission for a user
///
/// Readings are immutable once stored; the latest reading by timestamp is
/// the user's current recovery state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecoveryReading {
    /// Unique identifier
    pub id: String,

    /// Owning user
    pub user_id: String,

    /// When the reading was taken
    pub timestamp: DateTime<Utc>,

    /// Hours slept
    pub sleep_hours: Option<f64>,

    /// Sleep quality (1-10)
    pub sleep_quality: Option<u8>,

    /// Muscle soreness (1-10)
    pub muscle_soreness: Option<u8>,

    /// Stress level (1-10)
    pub stress_level: Option<u8>,

    /// Heart rate variability in milliseconds
    pub hrv: Option<u16>,

    /// Resting heart rate in bpm
    pub resting_heart_rate: Option<u16>,

    /// Composite recovery score (0-100)
    pub recovery_score: u8,

    /// Free-text notes (sanitized)
    pub notes: Option<String>,
}

impl RecoveryReading {
    /// Create a validated reading, computing its recovery score from the inputs
    pub fn new(
        user_id: impl Into<String>,
        timestamp: DateTime<Utc>,
        inputs: BiometricInputs,
        notes: Option<String>,
    ) -> Result<Self, ReadingValidationError> {
        let user_id = user_id.into();
        if user_id.trim().is_empty() {
            return Err(ReadingValidationError::MissingUser);
        }

        inputs.validate()?;
        let recovery_score = calculate_recovery_score(&inputs);

        Ok(RecoveryReading {
            id: uuid::Uuid::new_v4().to_string(),
            user_id,
            timestamp,
            sleep_hours: inputs.sleep_hours,
            sleep_quality: inputs.sleep_quality,
            muscle_soreness: inputs.muscle_soreness,
            stress_level: inputs.stress_level,
            hrv: inputs.hrv,
            resting_heart_rate: inputs.resting_heart_rate,
            recovery_score,
            notes: notes.map(|n| sanitize_text(&n)),
        })
    }

    /// Biometric fields of this reading
    pub fn inputs(&self) -> BiometricInputs {
        BiometricInputs {
            sleep_hours: self.sleep_hours,
            sleep_quality: self.sleep_quality,
            muscle_soreness: self.muscle_soreness,
            stress_level: self.stress_level,
            hrv: self.hrv,
            resting_heart_rate: self.resting_heart_rate,
        }
    }

    /// Derive a successor reading with an adjusted score
    ///
    /// The biometric fields are carried over; the score is clamped to 0-100.
    pub fn with_adjusted_score(&self, adjustment: i32, timestamp: DateTime<Utc>, note: String) -> Self {
        let score = (self.recovery_score as i32 + adjustment).clamp(0, 100) as u8;

        RecoveryReading {
            id: uuid::Uuid::new_v4().to_string(),
            timestamp,
            recovery_score: score,
            notes: Some(sanitize_text(&note)),
            ..self.clone()
        }
    }
}

/// A completed strength/conditioning training session
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainingSession {
    /// Unique identifier
    pub id: String,

    /// Owning user
    pub user_id: String,

    /// Exercise name (e.g. "Back Squat")
    pub exercise_name: String,

    /// Exercise category used for muscle-group rotation (e.g. "legs", "chest")
    pub exercise_type: String,

    /// Number of sets
    pub sets: Option<u32>,

    /// Repetitions per set
    pub reps: Option<u32>,

    /// Load per repetition in kilograms
    pub weight: Option<Decimal>,

    /// Session duration in minutes
    pub duration_minutes: Option<u32>,

    /// Calendar day the session took place
    pub training_date: NaiveDate,

    /// sets * reps * weight, absent when any factor is missing
    pub total_volume: Option<Decimal>,
}

impl TrainingSession {
    /// Create a session, deriving its total volume
    pub fn new(
        user_id: impl Into<String>,
        exercise_name: impl Into<String>,
        exercise_type: impl Into<String>,
        sets: Option<u32>,
        reps: Option<u32>,
        weight: Option<Decimal>,
        duration_minutes: Option<u32>,
        training_date: NaiveDate,
    ) -> Self {
        let total_volume = Self::compute_volume(sets, reps, weight);

        TrainingSession {
            id: uuid::Uuid::new_v4().to_string(),
            user_id: user_id.into(),
            exercise_name: sanitize_text(&exercise_name.into()),
            exercise_type: sanitize_text(&exercise_type.into()),
            sets,
            reps,
            weight,
            duration_minutes,
            training_date,
            total_volume,
        }
    }

    /// Volume lifted: sets * reps * weight
    ///
    /// `None` when a factor is missing or the product does not fit in a
    /// `Decimal`.
    pub fn compute_volume(sets: Option<u32>, reps: Option<u32>, weight: Option<Decimal>) -> Option<Decimal> {
        match (sets, reps, weight) {
            (Some(s), Some(r), Some(w)) => Decimal::from(s)
                .checked_mul(Decimal::from(r))
                .and_then(|v| v.checked_mul(w)),
            _ => None,
        }
    }

    /// All volume factors are present but their product overflowed
    pub fn volume_overflowed(&self) -> bool {
        self.sets.is_some() && self.reps.is_some() && self.weight.is_some() && self.total_volume.is_none()
    }

    /// Volume with missing values treated as zero
    pub fn volume_or_zero(&self) -> Decimal {
        self.total_volume.unwrap_or(Decimal::ZERO)
    }
}

/// Reading validation errors
#[derive(Debug, Clone, PartialEq)]
pub enum ReadingValidationError {
    /// Reading has no owner
    MissingUser,
    /// Sleep hours outside 0-24
    InvalidSleepHours(f64),
    /// A 1-10 scale field outside its scale
    OutOfScale { field: &'static str, value: u8 },
    /// HRV outside 0-300ms
    InvalidHrv(u16),
    /// Resting heart rate outside 20-250bpm
    InvalidRestingHeartRate(u16),
}

impl fmt::Display for ReadingValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReadingValidationError::MissingUser => write!(f, "Reading must belong to a user"),
            ReadingValidationError::InvalidSleepHours(v) => {
                write!(f, "Invalid sleep hours: {} (valid range: 0-24)", v)
            }
            ReadingValidationError::OutOfScale { field, value } => {
                write!(f, "Invalid {}: {} (valid range: 1-10)", field, value)
            }
            ReadingValidationError::InvalidHrv(v) => {
                write!(f, "Invalid HRV value: {}ms (valid range: 0-300ms)", v)
            }
            ReadingValidationError::InvalidRestingHeartRate(v) => {
                write!(f, "Invalid resting heart rate: {}bpm (valid range: 20-250bpm)", v)
            }
        }
    }
}

impl std::error::Error for ReadingValidationError {}

/// Escape markup characters in user-supplied text before it is stored
pub fn sanitize_text(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for c in input.chars() {
        match c {
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '&' => out.push_str("&amp;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#x27;"),
            c if c.is_control() && c != '\n' && c != '\t' => {}
            c => out.push(c),
        }
    }
    out.trim().to_string()
}
