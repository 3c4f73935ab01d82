//! Training and recovery suggestions
//!
//! Suggestions are produced in three fixed steps and then ordered by
//! priority (1 is most important). Items with equal priority keep the order
//! in which the steps produced them.
//!
//! 1. An intensity suggestion from the current recovery score (priority 1)
//! 2. A muscle-group rotation suggestion from the most recent session (priority 3)
//! 3. Conditional sleep and soreness advice from the latest reading (priority 2)

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::models::{RecoveryReading, TrainingSession};
use crate::recovery::{calculate_sleep_score, TrainingIntensity};

const UPPER_BODY_KEYWORDS: &[&str] = &[
    "upper", "chest", "back", "shoulder", "arms", "forearm", "bicep", "tricep", "push", "pull", "bench",
];

const LOWER_BODY_KEYWORDS: &[&str] = &[
    "lower", "leg", "squat", "glute", "hamstring", "quad", "calf", "calves", "lunge", "deadlift",
];

/// Category of a suggestion
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SuggestionKind {
    Intensity,
    MuscleGroup,
    Sleep,
    Soreness,
}

impl fmt::Display for SuggestionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SuggestionKind::Intensity => write!(f, "Intensity"),
            SuggestionKind::MuscleGroup => write!(f, "Muscle Group"),
            SuggestionKind::Sleep => write!(f, "Sleep"),
            SuggestionKind::Soreness => write!(f, "Soreness"),
        }
    }
}

/// A single prioritized suggestion
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Suggestion {
    pub kind: SuggestionKind,
    pub title: String,
    pub description: String,

    /// Intensity to train at, for intensity suggestions
    pub intensity: Option<TrainingIntensity>,

    /// True only for the low-score rest day suggestion
    pub is_rest_day: bool,

    /// 1 is highest
    pub priority: u8,
}

impl Suggestion {
    fn new(kind: SuggestionKind, title: &str, description: &str, priority: u8) -> Self {
        Suggestion {
            kind,
            title: title.to_string(),
            description: description.to_string(),
            intensity: None,
            is_rest_day: false,
            priority,
        }
    }
}

/// Muscle-group focus suggested for the next session
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MuscleGroupFocus {
    UpperBody,
    LowerBody,
    Core,
    FullBody,
}

impl MuscleGroupFocus {
    /// Rotate away from the most recent session's exercise type
    ///
    /// Matching is a case-insensitive substring search; upper-body keywords
    /// are checked first.
    pub fn after(recent_exercise_type: Option<&str>) -> Self {
        let Some(exercise_type) = recent_exercise_type else {
            return MuscleGroupFocus::FullBody;
        };

        let exercise_type = exercise_type.to_lowercase();
        if UPPER_BODY_KEYWORDS.iter().any(|k| exercise_type.contains(k)) {
            MuscleGroupFocus::LowerBody
        } else if LOWER_BODY_KEYWORDS.iter().any(|k| exercise_type.contains(k)) {
            MuscleGroupFocus::UpperBody
        } else {
            MuscleGroupFocus::Core
        }
    }
}

/// Builds prioritized suggestions from recovery and training state
#[derive(Debug, Default, Clone, Copy)]
pub struct SuggestionGenerator;

impl SuggestionGenerator {
    pub fn new() -> Self {
        SuggestionGenerator
    }

    /// Generate suggestions, ordered by ascending priority
    pub fn generate(
        &self,
        score: u8,
        latest_reading: Option<&RecoveryReading>,
        recent_session: Option<&TrainingSession>,
    ) -> Vec<Suggestion> {
        let mut suggestions = vec![self.intensity_suggestion(score)];

        suggestions.push(self.muscle_group_suggestion(recent_session.map(|s| s.exercise_type.as_str())));

        if let Some(reading) = latest_reading {
            suggestions.extend(self.recovery_suggestions(reading));
        }

        // Stable sort keeps step order within equal priority
        suggestions.sort_by_key(|s| s.priority);
        suggestions
    }

    fn intensity_suggestion(&self, score: u8) -> Suggestion {
        let (title, description, intensity) = match score {
            80.. => (
                "High intensity training",
                "You are well recovered. A good day for heavy lifts or hard intervals.",
                TrainingIntensity::Intense,
            ),
            60..=79 => (
                "Normal training",
                "Recovery is good. Train as planned at normal intensity.",
                TrainingIntensity::Moderate,
            ),
            40..=59 => (
                "Light training",
                "Recovery is partial. Keep the session light and technique-focused.",
                TrainingIntensity::Light,
            ),
            _ => (
                "Rest day",
                "Recovery is low. Take a rest day or do gentle mobility work only.",
                TrainingIntensity::Rest,
            ),
        };

        Suggestion {
            intensity: Some(intensity),
            is_rest_day: score < 40,
            ..Suggestion::new(SuggestionKind::Intensity, title, description, 1)
        }
    }

    fn muscle_group_suggestion(&self, recent_exercise_type: Option<&str>) -> Suggestion {
        let (title, description) = match MuscleGroupFocus::after(recent_exercise_type) {
            MuscleGroupFocus::LowerBody => (
                "Train lower body",
                "Your last session worked the upper body. Focus on legs and glutes next.",
            ),
            MuscleGroupFocus::UpperBody => (
                "Train upper body",
                "Your last session worked the lower body. Focus on chest, back and arms next.",
            ),
            MuscleGroupFocus::Core => (
                "Train core",
                "Add core stability work to balance your recent training.",
            ),
            MuscleGroupFocus::FullBody => (
                "Full body session",
                "No recent training found. Start with a balanced full body session.",
            ),
        };

        Suggestion::new(SuggestionKind::MuscleGroup, title, description, 3)
    }

    fn recovery_suggestions(&self, reading: &RecoveryReading) -> Vec<Suggestion> {
        let mut suggestions = Vec::new();

        let has_sleep_data = reading.sleep_hours.is_some() || reading.sleep_quality.is_some();
        if has_sleep_data && calculate_sleep_score(reading.sleep_hours, reading.sleep_quality) < 60 {
            suggestions.push(Suggestion::new(
                SuggestionKind::Sleep,
                "Improve sleep",
                "Aim for 7-9 hours tonight: keep a regular bedtime and avoid screens late.",
                2,
            ));
        }

        if reading.muscle_soreness.is_some_and(|s| s >= 7) {
            suggestions.push(Suggestion::new(
                SuggestionKind::Soreness,
                "Relieve muscle soreness",
                "Use foam rolling, stretching and light cardio to ease soreness.",
                2,
            ));
        }

        suggestions
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::BiometricInputs;
    use chrono::{NaiveDate, Utc};

    fn reading(inputs: BiometricInputs) -> RecoveryReading {
        RecoveryReading::new("user-1", Utc::now(), inputs, None).unwrap()
    }

    fn session(exercise_type: &str) -> TrainingSession {
        TrainingSession::new(
            "user-1",
            "Exercise",
            exercise_type,
            Some(3),
            Some(10),
            None,
            None,
            NaiveDate::from_ymd_opt(2024, 6, 1).unwrap(),
        )
    }

    #[test]
    fn test_rest_day_for_low_score() {
        let suggestions = SuggestionGenerator::new().generate(25, None, None);

        assert_eq!(suggestions[0].priority, 1);
        assert!(suggestions[0].is_rest_day);
        assert_eq!(suggestions[0].intensity, Some(TrainingIntensity::Rest));
    }

    #[test]
    fn test_no_rest_day_for_high_score() {
        let suggestions = SuggestionGenerator::new().generate(85, None, None);

        assert!(suggestions.iter().all(|s| !s.is_rest_day));
        assert_eq!(suggestions[0].title, "High intensity training");
    }

    #[test]
    fn test_intensity_table_boundaries() {
        let generator = SuggestionGenerator::new();
        let title_for = |score| generator.generate(score, None, None)[0].title.clone();

        assert_eq!(title_for(80), "High intensity training");
        assert_eq!(title_for(79), "Normal training");
        assert_eq!(title_for(60), "Normal training");
        assert_eq!(title_for(59), "Light training");
        assert_eq!(title_for(40), "Light training");
        assert_eq!(title_for(39), "Rest day");
    }

    #[test]
    fn test_muscle_group_rotation() {
        assert_eq!(MuscleGroupFocus::after(Some("Chest")), MuscleGroupFocus::LowerBody);
        assert_eq!(MuscleGroupFocus::after(Some("upper body push")), MuscleGroupFocus::LowerBody);
        assert_eq!(MuscleGroupFocus::after(Some("LEGS")), MuscleGroupFocus::UpperBody);
        assert_eq!(MuscleGroupFocus::after(Some("squat")), MuscleGroupFocus::UpperBody);
        assert_eq!(MuscleGroupFocus::after(Some("cardio")), MuscleGroupFocus::Core);
        assert_eq!(MuscleGroupFocus::after(Some("arms")), MuscleGroupFocus::LowerBody);
        assert_eq!(MuscleGroupFocus::after(Some("warm-up")), MuscleGroupFocus::Core);
        assert_eq!(MuscleGroupFocus::after(Some("Warmup")), MuscleGroupFocus::Core);
        assert_eq!(MuscleGroupFocus::after(None), MuscleGroupFocus::FullBody);
    }

    #[test]
    fn test_rotation_uses_recent_session() {
        let recent = session("legs");
        let suggestions = SuggestionGenerator::new().generate(70, None, Some(&recent));

        let rotation = suggestions
            .iter()
            .find(|s| s.kind == SuggestionKind::MuscleGroup)
            .unwrap();
        assert_eq!(rotation.title, "Train upper body");
        assert_eq!(rotation.priority, 3);
    }

    #[test]
    fn test_recovery_advice_ordering() {
        let poor = reading(BiometricInputs {
            sleep_hours: Some(5.0),
            muscle_soreness: Some(8),
            ..BiometricInputs::default()
        });

        let suggestions = SuggestionGenerator::new().generate(poor.recovery_score, Some(&poor), None);
        let kinds: Vec<SuggestionKind> = suggestions.iter().map(|s| s.kind).collect();

        assert_eq!(
            kinds,
            vec![
                SuggestionKind::Intensity,
                SuggestionKind::Sleep,
                SuggestionKind::Soreness,
                SuggestionKind::MuscleGroup,
            ]
        );
        let priorities: Vec<u8> = suggestions.iter().map(|s| s.priority).collect();
        assert_eq!(priorities, vec![1, 2, 2, 3]);
    }

    #[test]
    fn test_no_recovery_advice_when_well_rested() {
        let rested = reading(BiometricInputs {
            sleep_hours: Some(8.0),
            sleep_quality: Some(7),
            muscle_soreness: Some(2),
            ..BiometricInputs::default()
        });

        let suggestions = SuggestionGenerator::new().generate(rested.recovery_score, Some(&rested), None);
        assert_eq!(suggestions.len(), 2);
        assert!(suggestions.iter().all(|s| s.priority != 2));
    }

    #[test]
    fn test_no_sleep_advice_without_sleep_data() {
        let hrv_only = reading(BiometricInputs {
            hrv: Some(70),
            ..BiometricInputs::default()
        });

        let suggestions = SuggestionGenerator::new().generate(hrv_only.recovery_score, Some(&hrv_only), None);
        let kinds: Vec<SuggestionKind> = suggestions.iter().map(|s| s.kind).collect();

        assert_eq!(kinds, vec![SuggestionKind::Intensity, SuggestionKind::MuscleGroup]);
    }
}
