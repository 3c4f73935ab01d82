//! Training load aggregation (acute:chronic workload ratio)
//!
//! Acute load is the average daily volume over the trailing 7 days, chronic
//! load the average daily volume over the trailing 28 days. Their ratio is
//! the Gabbett acute:chronic workload ratio, a workload-spike heuristic used
//! to flag injury risk. All arithmetic uses `Decimal` so classification at the
//! bucket boundaries is exact.

use crate::models::TrainingSession;
use chrono::{Days, NaiveDate};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use thiserror::Error;

/// Training load calculation errors
#[derive(Error, Debug, Clone, PartialEq)]
pub enum LoadError {
    #[error("Invalid date range: end {end} is before start {start}")]
    InvalidDateRange { start: NaiveDate, end: NaiveDate },
}

/// Daily volume record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DailyVolume {
    /// Date of the training day
    pub date: NaiveDate,

    /// Total volume for the day (sum of all sessions)
    pub total_volume: Decimal,

    /// Number of sessions completed on this day
    pub session_count: u32,
}

/// Injury-risk classification of the acute:chronic ratio
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LoadStatus {
    /// ratio < 0.8
    Undertraining,
    /// 0.8 ≤ ratio ≤ 1.3
    Optimal,
    /// 1.3 < ratio ≤ 1.5
    HighRisk,
    /// ratio > 1.5
    VeryHighRisk,
}

impl LoadStatus {
    /// Get load status from the acute:chronic ratio
    pub fn from_ratio(ratio: Decimal) -> Self {
        if ratio < dec!(0.8) {
            LoadStatus::Undertraining
        } else if ratio <= dec!(1.3) {
            LoadStatus::Optimal
        } else if ratio <= dec!(1.5) {
            LoadStatus::HighRisk
        } else {
            LoadStatus::VeryHighRisk
        }
    }

    /// Get status description
    pub fn description(&self) -> &'static str {
        match self {
            LoadStatus::Undertraining => "Undertraining (fitness may be declining)",
            LoadStatus::Optimal => "Optimal training load (sweet spot)",
            LoadStatus::HighRisk => "High injury risk (load spike)",
            LoadStatus::VeryHighRisk => "Very high injury risk (large load spike)",
        }
    }

    /// Get training recommendation
    pub fn recommendation(&self) -> &'static str {
        match self {
            LoadStatus::Undertraining => "Increase training volume gradually",
            LoadStatus::Optimal => "Maintain the current training progression",
            LoadStatus::HighRisk => "Reduce volume this week and monitor soreness",
            LoadStatus::VeryHighRisk => {
                "Cut volume substantially and schedule recovery days before progressing"
            }
        }
    }
}

impl fmt::Display for LoadStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LoadStatus::Undertraining => write!(f, "UNDERTRAINING"),
            LoadStatus::Optimal => write!(f, "OPTIMAL"),
            LoadStatus::HighRisk => write!(f, "HIGH_RISK"),
            LoadStatus::VeryHighRisk => write!(f, "VERY_HIGH_RISK"),
        }
    }
}

/// Training load metrics for a user over a window
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainingLoadSnapshot {
    pub user_id: String,
    pub window_start: NaiveDate,
    pub window_end: NaiveDate,

    /// Total volume of sessions inside the window
    pub total_volume: Decimal,

    /// Total volume divided by the number of training days
    pub average_volume: Decimal,

    /// Distinct training days inside the window
    pub session_count: u32,

    /// Average daily volume over the trailing acute window
    pub acute_load: Decimal,

    /// Average daily volume over the trailing chronic window
    pub chronic_load: Decimal,

    /// acute / chronic, zero when chronic load is zero
    pub acute_chronic_ratio: Decimal,

    pub load_status: LoadStatus,
}

/// Acute/chronic values for one day of a series
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DailyLoadMetrics {
    pub date: NaiveDate,
    pub daily_volume: Decimal,
    pub acute_load: Decimal,
    pub chronic_load: Decimal,
    pub acute_chronic_ratio: Decimal,
    pub load_status: LoadStatus,
}

/// Window configuration with customizable lengths
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoadConfig {
    /// Acute window in days (default: 7)
    pub acute_window_days: u16,

    /// Chronic window in days (default: 28)
    pub chronic_window_days: u16,

    /// Number of recent sessions considered for suggestions
    pub recent_session_limit: usize,
}

impl Default for LoadConfig {
    fn default() -> Self {
        LoadConfig {
            acute_window_days: 7,
            chronic_window_days: 28,
            recent_session_limit: 1,
        }
    }
}

/// Core training load calculation engine
pub struct TrainingLoadCalculator {
    config: LoadConfig,
}

impl TrainingLoadCalculator {
    /// Create new calculator with default windows (7/28 days)
    pub fn new() -> Self {
        TrainingLoadCalculator {
            config: LoadConfig::default(),
        }
    }

    /// Create new calculator with custom windows
    pub fn with_config(config: LoadConfig) -> Self {
        TrainingLoadCalculator { config }
    }

    pub fn config(&self) -> &LoadConfig {
        &self.config
    }

    /// First day of history needed to compute the chronic load at `end`
    pub fn history_start(&self, start: NaiveDate, end: NaiveDate) -> NaiveDate {
        let chronic_start = window_start(end, self.config.chronic_window_days);
        start.min(chronic_start)
    }

    /// Aggregate daily volume from a collection of sessions
    pub fn aggregate_daily_volume(&self, sessions: &[TrainingSession]) -> BTreeMap<NaiveDate, DailyVolume> {
        let mut daily: BTreeMap<NaiveDate, DailyVolume> = BTreeMap::new();

        for session in sessions {
            let volume = session.volume_or_zero();

            daily
                .entry(session.training_date)
                .and_modify(|day| {
                    day.total_volume = day.total_volume.saturating_add(volume);
                    day.session_count = day.session_count.saturating_add(1);
                })
                .or_insert(DailyVolume {
                    date: session.training_date,
                    total_volume: volume,
                    session_count: 1,
                });
        }

        daily
    }

    /// Calculate the load snapshot for `[start, end]`
    ///
    /// `sessions` may contain sessions outside the window; they only count
    /// toward the acute and chronic loads when they fall inside the trailing
    /// windows ending at `end`.
    pub fn calculate_load(
        &self,
        user_id: &str,
        sessions: &[TrainingSession],
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<TrainingLoadSnapshot, LoadError> {
        if end < start {
            return Err(LoadError::InvalidDateRange { start, end });
        }

        let own_sessions: Vec<TrainingSession> = sessions
            .iter()
            .filter(|s| s.user_id == user_id)
            .cloned()
            .collect();
        let daily = self.aggregate_daily_volume(&own_sessions);

        let in_window = daily.range(start..=end);
        let (total_volume, session_count) = in_window
            .fold((Decimal::ZERO, 0u32), |(total, days), (_, day)| {
                (total.saturating_add(day.total_volume), days + 1)
            });

        let average_volume = if session_count > 0 {
            total_volume / Decimal::from(session_count)
        } else {
            Decimal::ZERO
        };

        let acute_load = self.trailing_average(&daily, end, self.config.acute_window_days);
        let chronic_load = self.trailing_average(&daily, end, self.config.chronic_window_days);
        let acute_chronic_ratio = ratio(acute_load, chronic_load);

        Ok(TrainingLoadSnapshot {
            user_id: user_id.to_string(),
            window_start: start,
            window_end: end,
            total_volume,
            average_volume,
            session_count,
            acute_load,
            chronic_load,
            acute_chronic_ratio,
            load_status: LoadStatus::from_ratio(acute_chronic_ratio),
        })
    }

    /// Calculate acute/chronic metrics for every day in `[start, end]`
    pub fn calculate_load_series(
        &self,
        daily: &BTreeMap<NaiveDate, DailyVolume>,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<DailyLoadMetrics>, LoadError> {
        if end < start {
            return Err(LoadError::InvalidDateRange { start, end });
        }

        let mut series = Vec::new();
        for current_date in start.iter_days().take_while(|d| *d <= end) {
            let acute_load = self.trailing_average(daily, current_date, self.config.acute_window_days);
            let chronic_load =
                self.trailing_average(daily, current_date, self.config.chronic_window_days);
            let acute_chronic_ratio = ratio(acute_load, chronic_load);

            series.push(DailyLoadMetrics {
                date: current_date,
                daily_volume: daily
                    .get(&current_date)
                    .map(|d| d.total_volume)
                    .unwrap_or(Decimal::ZERO),
                acute_load,
                chronic_load,
                acute_chronic_ratio,
                load_status: LoadStatus::from_ratio(acute_chronic_ratio),
            });
        }

        Ok(series)
    }

    /// Sum of volume over the `days`-long window ending at `end`, divided by `days`
    fn trailing_average(&self, daily: &BTreeMap<NaiveDate, DailyVolume>, end: NaiveDate, days: u16) -> Decimal {
        if days == 0 {
            return Decimal::ZERO;
        }

        let total = daily
            .range(window_start(end, days)..=end)
            .fold(Decimal::ZERO, |total, (_, day)| total.saturating_add(day.total_volume));

        total / Decimal::from(days)
    }
}

impl Default for TrainingLoadCalculator {
    fn default() -> Self {
        Self::new()
    }
}

/// First day of a `days`-long window ending at `end` (inclusive)
fn window_start(end: NaiveDate, days: u16) -> NaiveDate {
    end.checked_sub_days(Days::new(days.saturating_sub(1) as u64))
        .unwrap_or(NaiveDate::MIN)
}

fn ratio(acute: Decimal, chronic: Decimal) -> Decimal {
    if chronic > Decimal::ZERO {
        acute / chronic
    } else {
        Decimal::ZERO
    }
}
