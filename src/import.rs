//! CSV import of training sessions
//!
//! Header names are matched case-insensitively against a set of common
//! variations. Rows that cannot be parsed are reported and skipped; they do
//! not abort the import.

use anyhow::{Context, Result};
use chrono::NaiveDate;
use csv::{ReaderBuilder, StringRecord, Trim};
use rust_decimal::Decimal;
use std::collections::HashMap;
use std::fs::File;
use std::io::Read;
use std::path::Path;
use std::str::FromStr;

use crate::models::TrainingSession;

const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%Y/%m/%d", "%d.%m.%Y"];

/// A row that was skipped
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RowError {
    /// 1-based line in the file, header included
    pub line: u64,
    pub reason: String,
}

#[derive(Debug, Default)]
pub struct ImportReport {
    pub sessions: Vec<TrainingSession>,
    pub skipped: Vec<RowError>,
}

/// Reads training sessions from CSV with flexible column names
pub struct SessionCsvImporter {
    column_mapping: HashMap<String, &'static str>,
}

impl SessionCsvImporter {
    pub fn new() -> Self {
        let mut column_mapping = HashMap::new();

        Self::add_mapping(&mut column_mapping, "user_id", &["user_id", "user", "athlete", "athlete_id"]);
        Self::add_mapping(&mut column_mapping, "exercise_name", &["exercise_name", "exercise", "name", "movement"]);
        Self::add_mapping(
            &mut column_mapping,
            "exercise_type",
            &["exercise_type", "type", "category", "muscle_group", "body_part"],
        );
        Self::add_mapping(&mut column_mapping, "sets", &["sets", "set_count"]);
        Self::add_mapping(&mut column_mapping, "reps", &["reps", "repetitions", "rep_count"]);
        Self::add_mapping(&mut column_mapping, "weight", &["weight", "weight_kg", "load", "kg", "lbs"]);
        Self::add_mapping(
            &mut column_mapping,
            "duration_minutes",
            &["duration_minutes", "duration", "minutes", "duration_min"],
        );
        Self::add_mapping(&mut column_mapping, "training_date", &["training_date", "date", "day", "session_date"]);

        Self { column_mapping }
    }

    fn add_mapping(mapping: &mut HashMap<String, &'static str>, standard: &'static str, variations: &[&str]) {
        for variation in variations {
            mapping.insert(variation.to_lowercase(), standard);
        }
    }

    fn normalize_column_name(&self, name: &str) -> Option<&'static str> {
        let normalized = name.trim().to_lowercase().replace([' ', '-'], "_");
        self.column_mapping.get(&normalized).copied()
    }

    pub fn import_file<P: AsRef<Path>>(&self, path: P, default_user: &str) -> Result<ImportReport> {
        let file = File::open(&path)
            .with_context(|| format!("Failed to open CSV file: {}", path.as_ref().display()))?;
        self.import_reader(file, default_user)
    }

    /// Parse sessions; `default_user` applies when the file has no user column
    /// or the cell is empty
    pub fn import_reader<R: Read>(&self, reader: R, default_user: &str) -> Result<ImportReport> {
        let mut reader = ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .trim(Trim::All)
            .from_reader(reader);

        let headers = reader.headers().context("Failed to read CSV header")?.clone();
        let columns = self.column_indexes(&headers);

        for required in ["exercise_name", "training_date"] {
            if !columns.contains_key(required) {
                anyhow::bail!("CSV is missing a {} column", required);
            }
        }

        let mut report = ImportReport::default();
        for (row, record) in reader.records().enumerate() {
            let line = row as u64 + 2;
            let parsed = record
                .map_err(|e| e.to_string())
                .and_then(|record| parse_row(&columns, &record, default_user));

            match parsed {
                Ok(session) => report.sessions.push(session),
                Err(reason) => {
                    tracing::warn!(line, reason = %reason, "Skipping CSV row");
                    report.skipped.push(RowError { line, reason });
                }
            }
        }

        tracing::info!(
            imported = report.sessions.len(),
            skipped = report.skipped.len(),
            "CSV import parsed"
        );
        Ok(report)
    }

    fn column_indexes(&self, headers: &StringRecord) -> HashMap<&'static str, usize> {
        let mut columns = HashMap::new();
        for (idx, header) in headers.iter().enumerate() {
            if let Some(standard) = self.normalize_column_name(header) {
                columns.entry(standard).or_insert(idx);
            }
        }
        columns
    }
}

impl Default for SessionCsvImporter {
    fn default() -> Self {
        Self::new()
    }
}

fn cell<'r>(columns: &HashMap<&'static str, usize>, record: &'r StringRecord, column: &str) -> Option<&'r str> {
    columns
        .get(column)
        .and_then(|idx| record.get(*idx))
        .filter(|value| !value.is_empty())
}

fn parse_optional<T: FromStr>(
    columns: &HashMap<&'static str, usize>,
    record: &StringRecord,
    column: &str,
) -> std::result::Result<Option<T>, String> {
    cell(columns, record, column)
        .map(|value| {
            value
                .parse::<T>()
                .map_err(|_| format!("invalid {}: {}", column, value))
        })
        .transpose()
}

fn parse_date(value: &str) -> std::result::Result<NaiveDate, String> {
    DATE_FORMATS
        .iter()
        .find_map(|format| NaiveDate::parse_from_str(value, format).ok())
        .ok_or_else(|| format!("invalid training_date: {}", value))
}

fn parse_row(
    columns: &HashMap<&'static str, usize>,
    record: &StringRecord,
    default_user: &str,
) -> std::result::Result<TrainingSession, String> {
    let user_id = cell(columns, record, "user_id").unwrap_or(default_user);
    let exercise_name = cell(columns, record, "exercise_name").ok_or("missing exercise_name")?;
    let exercise_type = cell(columns, record, "exercise_type").unwrap_or("general");
    let training_date = parse_date(cell(columns, record, "training_date").ok_or("missing training_date")?)?;

    let weight: Option<Decimal> = parse_optional(columns, record, "weight")?;
    if weight.is_some_and(|w| w < Decimal::ZERO) {
        return Err("weight must not be negative".to_string());
    }

    let session = TrainingSession::new(
        user_id,
        exercise_name,
        exercise_type,
        parse_optional(columns, record, "sets")?,
        parse_optional(columns, record, "reps")?,
        weight,
        parse_optional(columns, record, "duration_minutes")?,
        training_date,
    );
    if session.volume_overflowed() {
        return Err("volume is too large".to_string());
    }

    Ok(session)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_import_with_aliased_headers() {
        let data = "Exercise,Muscle Group,Sets,Reps,Weight KG,Date\n\
                    Back Squat,legs,5,5,100,2024-06-01\n\
                    Plank,core,,,,2024-06-02\n";

        let report = SessionCsvImporter::new()
            .import_reader(data.as_bytes(), "user-1")
            .unwrap();

        assert!(report.skipped.is_empty());
        assert_eq!(report.sessions.len(), 2);
        assert_eq!(report.sessions[0].user_id, "user-1");
        assert_eq!(report.sessions[0].total_volume, Some(dec!(2500)));
        assert_eq!(report.sessions[1].total_volume, None);
    }

    #[test]
    fn test_bad_rows_are_skipped() {
        let data = "user,exercise,type,sets,reps,weight,date\n\
                    user-2,Bench,chest,3,eight,60,2024-06-01\n\
                    user-2,Bench,chest,3,8,60,not-a-date\n\
                    user-2,Row,back,3,10,50,01.06.2024\n";

        let report = SessionCsvImporter::new()
            .import_reader(data.as_bytes(), "ignored")
            .unwrap();

        assert_eq!(report.sessions.len(), 1);
        assert_eq!(report.sessions[0].user_id, "user-2");
        assert_eq!(report.sessions[0].training_date, NaiveDate::from_ymd_opt(2024, 6, 1).unwrap());

        let lines: Vec<u64> = report.skipped.iter().map(|e| e.line).collect();
        assert_eq!(lines, vec![2, 3]);
        assert!(report.skipped[0].reason.contains("reps"));
    }

    #[test]
    fn test_oversized_volume_is_skipped() {
        let data = "exercise,type,sets,reps,weight,date\n\
                    Squat,legs,4000000000,4000000000,79228162514264337593543950,2024-06-01\n\
                    Squat,legs,5,5,100,2024-06-02\n";

        let report = SessionCsvImporter::new()
            .import_reader(data.as_bytes(), "user-1")
            .unwrap();

        assert_eq!(report.sessions.len(), 1);
        assert_eq!(report.skipped.len(), 1);
        assert_eq!(report.skipped[0].line, 2);
        assert!(report.skipped[0].reason.contains("volume"));
    }

    #[test]
    fn test_missing_required_column() {
        let data = "exercise,sets\nSquat,5\n";
        assert!(SessionCsvImporter::new().import_reader(data.as_bytes(), "u").is_err());
    }

    #[test]
    fn test_import_file() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "exercise_name,exercise_type,sets,reps,weight,training_date").unwrap();
        writeln!(file, "Deadlift,legs,3,5,140,2024-06-03").unwrap();

        let report = SessionCsvImporter::new().import_file(file.path(), "user-1").unwrap();
        assert_eq!(report.sessions[0].total_volume, Some(dec!(2100)));
    }
}
