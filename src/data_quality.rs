// ✅ Data Quality - per-field tallies, quality score, run statistics
//
// Works on the augmented table only: every cleaned field contributes one
// `{column}_status` column holding valid / error / optional.

use crate::cleaners::FieldStatus;
use crate::column_detector::ColumnType;
use crate::record::{Table, Value};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Derived columns read by `classified_rows`
const GEO_COUNTRY: &str = "geo_country";
const INDUSTRY_CATEGORY: &str = "industry_category";
const SIZE_CATEGORY: &str = "size_category";
const IS_DUPLICATE: &str = "is_duplicate";

// ============================================================================
// CLEANED FIELDS
// ============================================================================

/// A source column that went through a field cleaner
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CleanedField {
    pub column: String,
    pub kind: ColumnType,
}

impl CleanedField {
    pub fn new(column: impl Into<String>, kind: ColumnType) -> Self {
        CleanedField {
            column: column.into(),
            kind,
        }
    }

    pub fn status_column(&self) -> String {
        format!("{}_status", self.column)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldTally {
    pub valid: usize,
    pub error: usize,
    pub optional: usize,
}

impl FieldTally {
    pub fn total(&self) -> usize {
        self.valid + self.error + self.optional
    }

    /// valid / (total − optional) × 100, None when nothing was filled in
    pub fn valid_share(&self) -> Option<f64> {
        let filled = self.total() - self.optional;
        if filled == 0 {
            return None;
        }
        Some(self.valid as f64 / filled as f64 * 100.0)
    }
}

fn status_of(value: Option<&Value>) -> Option<FieldStatus> {
    match value.and_then(Value::as_str)? {
        "valid" => Some(FieldStatus::Valid),
        "error" => Some(FieldStatus::Error),
        "optional" => Some(FieldStatus::Optional),
        _ => None,
    }
}

pub fn tally(table: &Table, field: &CleanedField) -> FieldTally {
    let status_column = field.status_column();
    let mut tally = FieldTally::default();
    for row in &table.rows {
        match status_of(row.get(&status_column)) {
            Some(FieldStatus::Valid) => tally.valid += 1,
            Some(FieldStatus::Error) => tally.error += 1,
            Some(FieldStatus::Optional) => tally.optional += 1,
            None => {}
        }
    }
    tally
}

/// Mean valid share over the cleaned fields, in [0, 100].
/// Fields where every cell was optional are left out; no fields → 0.
pub fn quality_score(table: &Table, fields: &[CleanedField]) -> f64 {
    let shares: Vec<f64> = fields
        .iter()
        .filter_map(|field| tally(table, field).valid_share())
        .collect();

    if shares.is_empty() {
        return 0.0;
    }

    let mean = shares.iter().sum::<f64>() / shares.len() as f64;
    mean.clamp(0.0, 100.0)
}

// ============================================================================
// RUN STATISTICS
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CleaningStatistics {
    /// Rows in the input before the row cap
    pub total_rows: usize,
    pub processed_rows: usize,
    /// Processed rows without any field in error
    pub valid_rows: usize,
    /// Processed rows with at least one field in error
    pub error_rows: usize,
    pub duplicate_rows: usize,
    pub valid_phones: usize,
    pub valid_emails: usize,
    pub classified_rows: usize,
    pub field_valid_counts: BTreeMap<String, usize>,
    pub quality_score: f64,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    /// Seconds
    pub processing_time: f64,
}

impl CleaningStatistics {
    pub fn collect(
        total_rows: usize,
        table: &Table,
        fields: &[CleanedField],
        started_at: DateTime<Utc>,
    ) -> Self {
        let mut field_valid_counts = BTreeMap::new();
        let mut valid_phones = 0;
        let mut valid_emails = 0;

        for field in fields {
            let valid = tally(table, field).valid;
            field_valid_counts.insert(field.column.clone(), valid);
            match field.kind {
                ColumnType::Phone => valid_phones += valid,
                ColumnType::Email => valid_emails += valid,
                _ => {}
            }
        }

        let status_columns: Vec<String> = fields.iter().map(CleanedField::status_column).collect();
        let error_rows = table
            .rows
            .iter()
            .filter(|row| {
                status_columns
                    .iter()
                    .any(|column| status_of(row.get(column)) == Some(FieldStatus::Error))
            })
            .count();

        let duplicate_rows = table
            .rows
            .iter()
            .filter(|row| row.get(IS_DUPLICATE) == Some(&Value::Bool(true)))
            .count();

        let finished_at = Utc::now();
        let processing_time =
            (finished_at - started_at).num_milliseconds().max(0) as f64 / 1000.0;

        CleaningStatistics {
            total_rows,
            processed_rows: table.len(),
            valid_rows: table.len() - error_rows,
            error_rows,
            duplicate_rows,
            valid_phones,
            valid_emails,
            classified_rows: classified_rows(table),
            field_valid_counts,
            quality_score: quality_score(table, fields),
            started_at,
            finished_at,
            processing_time,
        }
    }

    pub fn summary(&self) -> String {
        format!(
            "Rows: {} processed of {}, {} valid, {} with errors, {} duplicates. Quality: {:.1}%",
            self.processed_rows,
            self.total_rows,
            self.valid_rows,
            self.error_rows,
            self.duplicate_rows,
            self.quality_score
        )
    }
}

/// Rows where at least one classifier produced a known value
pub fn classified_rows(table: &Table) -> usize {
    let known = |value: Option<&Value>| {
        value
            .and_then(Value::as_str)
            .map(|s| !s.is_empty() && s != "unknown")
            .unwrap_or(false)
    };

    table
        .rows
        .iter()
        .filter(|row| {
            known(row.get(GEO_COUNTRY))
                || known(row.get(INDUSTRY_CATEGORY))
                || known(row.get(SIZE_CATEGORY))
        })
        .count()
}

// ============================================================================
// TESTS
// ============================================================================
