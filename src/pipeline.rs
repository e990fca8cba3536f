// 🔄 Cleaning Pipeline - staged sweep over a whole table
//
// row cap → detect → phones → emails → names → companies
//   → geographic → industry → size → duplicates → statistics
//
// Each stage completes before the next one starts and appends its derived
// columns (`{column}_{suffix}`) to every row. Stages whose input columns are
// missing are skipped with a warning.

use crate::classifiers::{GeographicClassifier, IndustryClassifier, SizeClassifier};
use crate::cleaners::{CompanyCleaner, EmailCleaner, NameCleaner, PhoneCleaner};
use crate::column_detector::{
    ColumnDetection, ColumnDetector, ColumnType, DetectionMethod, Detections,
};
use crate::config::CleaningSettings;
use crate::countries::CountryRegistry;
use crate::data_quality::{CleanedField, CleaningStatistics};
use crate::deduplication::DuplicateDetector;
use crate::error::Result;
use crate::record::{Record, Table, Value};
use crate::reference::ReferenceData;
use chrono::Utc;
use serde::Serialize;
use tracing::{info, warn};

/// Progress callback: fraction in [0, 1] and a step label
pub type ProgressFn<'p> = dyn FnMut(f64, &str) + 'p;

#[derive(Debug, Clone, Serialize)]
pub struct CleaningOutcome {
    pub table: Table,
    pub detections: Detections,
    pub cleaned_fields: Vec<CleanedField>,
    pub statistics: CleaningStatistics,
}

// ============================================================================
// PROGRESS
// ============================================================================

/// Keeps reported fractions within [0, 1] and never decreasing
struct Progress<'p, 'c> {
    callback: &'c mut ProgressFn<'p>,
    last: f64,
}

impl<'p, 'c> Progress<'p, 'c> {
    fn new(callback: &'c mut ProgressFn<'p>) -> Self {
        Progress {
            callback,
            last: 0.0,
        }
    }

    fn report(&mut self, fraction: f64, label: &str) {
        let fraction = fraction.clamp(0.0, 1.0).max(self.last);
        self.last = fraction;
        (self.callback)(fraction, label);
    }
}

// ============================================================================
// PIPELINE
// ============================================================================

pub struct CleaningPipeline<'a> {
    settings: CleaningSettings,
    countries: &'a CountryRegistry,
    reference: &'a ReferenceData,
}

impl CleaningPipeline<'static> {
    pub fn new(settings: CleaningSettings) -> Self {
        CleaningPipeline::with_data(settings, CountryRegistry::builtin(), ReferenceData::builtin())
    }
}

impl<'a> CleaningPipeline<'a> {
    pub fn with_data(
        settings: CleaningSettings,
        countries: &'a CountryRegistry,
        reference: &'a ReferenceData,
    ) -> Self {
        CleaningPipeline {
            settings,
            countries,
            reference,
        }
    }

    pub fn settings(&self) -> &CleaningSettings {
        &self.settings
    }

    /// Run every enabled stage over `table`
    pub fn run(&self, mut table: Table, progress: &mut ProgressFn<'_>) -> Result<CleaningOutcome> {
        self.settings.validate()?;
        let started_at = Utc::now();
        let mut progress = Progress::new(progress);
        let total_rows = table.len();

        progress.report(0.05, "Applying row limit");
        if table.len() > self.settings.max_rows {
            warn!(
                rows = table.len(),
                max_rows = self.settings.max_rows,
                "row cap exceeded, truncating"
            );
            table.rows.truncate(self.settings.max_rows);
        }

        progress.report(0.10, "Detecting column types");
        let detections = self.detect(&table);

        let mut cleaned_fields = Vec::new();

        if self.settings.clean_phones {
            progress.report(0.25, "Cleaning phone numbers");
            cleaned_fields.extend(self.clean_phones(&mut table, &detections));
        }
        if self.settings.clean_emails {
            progress.report(0.40, "Cleaning emails");
            cleaned_fields.extend(self.clean_emails(&mut table, &detections));
        }
        if self.settings.clean_names {
            progress.report(0.50, "Cleaning names");
            cleaned_fields.extend(self.clean_names(&mut table, &detections));
        }
        if self.settings.clean_companies {
            progress.report(0.60, "Cleaning company names");
            cleaned_fields.extend(self.clean_companies(&mut table, &detections));
        }
        if self.settings.classify_geographic {
            progress.report(0.70, "Classifying locations");
            self.classify_geographic(&mut table, &detections);
        }
        if self.settings.classify_industry {
            progress.report(0.78, "Classifying industries");
            self.classify_industry(&mut table, &detections);
        }
        if self.settings.classify_size {
            progress.report(0.84, "Classifying company sizes");
            self.classify_size(&mut table);
        }
        if self.settings.remove_duplicates {
            progress.report(0.90, "Marking duplicates");
            self.mark_duplicates(&mut table, &cleaned_fields);
        }

        progress.report(0.95, "Computing statistics");
        let statistics =
            CleaningStatistics::collect(total_rows, &table, &cleaned_fields, started_at);
        info!(summary = %statistics.summary(), "cleaning finished");

        progress.report(1.0, "Completed");
        Ok(CleaningOutcome {
            table,
            detections,
            cleaned_fields,
            statistics,
        })
    }

    // ========================================================================
    // STAGES
    // ========================================================================

    /// Full detection, or name keywords only when detection is switched off
    fn detect(&self, table: &Table) -> Detections {
        let detector = ColumnDetector::with_reference(self.reference);
        if self.settings.detect_columns {
            return detector.detect_all(table);
        }

        let columns = table
            .columns
            .iter()
            .map(|column| {
                let (detected_type, confidence) = detector
                    .detect_by_name(column)
                    .unwrap_or((ColumnType::Unknown, 0.0));
                ColumnDetection {
                    column_name: column.clone(),
                    detected_type,
                    confidence,
                    method: DetectionMethod::Name,
                }
            })
            .collect();
        Detections { columns }
    }

    fn clean_phones(&self, table: &mut Table, detections: &Detections) -> Vec<CleanedField> {
        let columns = detections.columns_of(ColumnType::Phone);
        if columns.is_empty() {
            warn!("no phone column detected, skipping phone cleaning");
            return Vec::new();
        }

        let cleaner = PhoneCleaner::with_data(self.countries, self.reference)
            .with_policy(self.settings.phone);

        for column in &columns {
            let derived = suffixed(column, &["clean", "country", "status", "type", "error"]);
            augment_rows(table, &derived, |row| {
                let result = cleaner.clean(row.get(column).unwrap_or(&Value::Null));
                vec![
                    Value::from(result.field.clean()),
                    Value::from(result.country),
                    Value::from(result.field.status().as_str()),
                    Value::from(result.phone_type.as_str()),
                    Value::from(result.field.error_message()),
                ]
            });
            info!(column = %column, "phone column cleaned");
        }

        fields_of(columns, ColumnType::Phone)
    }

    fn clean_emails(&self, table: &mut Table, detections: &Detections) -> Vec<CleanedField> {
        let columns = detections.columns_of(ColumnType::Email);
        if columns.is_empty() {
            warn!("no email column detected, skipping email cleaning");
            return Vec::new();
        }

        let cleaner = EmailCleaner::with_reference(self.reference).with_policy(self.settings.email);

        for column in &columns {
            let derived = suffixed(
                column,
                &["clean", "status", "error", "is_disposable", "is_role_based", "suggestion"],
            );
            augment_rows(table, &derived, |row| {
                let result = cleaner.clean(row.get(column).unwrap_or(&Value::Null));
                vec![
                    Value::from(result.field.clean()),
                    Value::from(result.field.status().as_str()),
                    Value::from(result.field.error_message()),
                    Value::Bool(result.is_disposable),
                    Value::Bool(result.is_role_based),
                    result.suggested_correction.map_or(Value::Null, Value::from),
                ]
            });
            info!(column = %column, "email column cleaned");
        }

        fields_of(columns, ColumnType::Email)
    }

    fn clean_names(&self, table: &mut Table, detections: &Detections) -> Vec<CleanedField> {
        let columns = detections.columns_of(ColumnType::Name);
        if columns.is_empty() {
            warn!("no name column detected, skipping name cleaning");
            return Vec::new();
        }

        let cleaner = NameCleaner::with_reference(self.reference);

        for column in &columns {
            let derived = suffixed(column, &["clean", "status", "error", "extracted_phone"]);
            augment_rows(table, &derived, |row| {
                let result = cleaner.clean(row.get(column).unwrap_or(&Value::Null));
                vec![
                    Value::from(result.field.clean()),
                    Value::from(result.field.status().as_str()),
                    Value::from(result.field.error_message()),
                    result.extracted_phone.map_or(Value::Null, Value::from),
                ]
            });
            info!(column = %column, "name column cleaned");
        }

        fields_of(columns, ColumnType::Name)
    }

    fn clean_companies(&self, table: &mut Table, detections: &Detections) -> Vec<CleanedField> {
        let columns = detections.columns_of(ColumnType::Company);
        if columns.is_empty() {
            warn!("no company column detected, skipping company cleaning");
            return Vec::new();
        }

        let cleaner = CompanyCleaner::with_reference(self.reference);

        for column in &columns {
            let derived = suffixed(column, &["clean", "status", "error", "type", "name_only"]);
            augment_rows(table, &derived, |row| {
                let result = cleaner.clean(row.get(column).unwrap_or(&Value::Null));
                vec![
                    Value::from(result.field.clean()),
                    Value::from(result.field.status().as_str()),
                    Value::from(result.field.error_message()),
                    Value::from(result.company_type),
                    Value::from(result.name_only),
                ]
            });
            info!(column = %column, "company column cleaned");
        }

        fields_of(columns, ColumnType::Company)
    }

    fn classify_geographic(&self, table: &mut Table, detections: &Detections) {
        let phone = detections.first_of(ColumnType::Phone);
        let city = detections.first_of(ColumnType::City);
        let region = detections.first_of(ColumnType::Region);
        if phone.is_none() && city.is_none() {
            warn!("no phone or city column detected, skipping geographic classification");
            return;
        }

        let classifier = GeographicClassifier::with_registry(self.countries);
        let cleaner = PhoneCleaner::with_data(self.countries, self.reference)
            .with_policy(self.settings.phone);
        let derived: Vec<String> = [
            "geo_country",
            "geo_country_en",
            "geo_country_code",
            "geo_region",
            "geo_city",
        ]
        .iter()
        .map(|s| s.to_string())
        .collect();

        augment_rows(table, &derived, |row| {
            let code = phone.and_then(|column| self.phone_country_code(&cleaner, row, column));
            let city_text = city.map(|c| row.text(c));
            let region_text = region.map(|r| row.text(r));
            let geo = classifier.classify_location(
                city_text.as_deref(),
                region_text.as_deref(),
                code.as_deref(),
            );
            vec![
                Value::from(geo.country),
                Value::from(geo.country_en),
                Value::from(geo.country_code),
                Value::from(geo.region),
                Value::from(geo.city),
            ]
        });
        info!("geographic classification done");
    }

    /// Code of a valid phone, reusing `{column}_clean` when the phone stage ran
    fn phone_country_code(
        &self,
        cleaner: &PhoneCleaner<'_>,
        row: &Record,
        column: &str,
    ) -> Option<String> {
        let clean = row.text(&format!("{}_clean", column));
        if !clean.is_empty() {
            return self.countries.resolve_code(&clean).map(str::to_string);
        }

        let result = cleaner.clean(row.get(column)?);
        result.field.is_valid().then_some(result.country_code)
    }

    fn classify_industry(&self, table: &mut Table, detections: &Detections) {
        let company = detections.first_of(ColumnType::Company);
        let activity = detections.first_of(ColumnType::Activity);
        if company.is_none() && activity.is_none() {
            warn!("no company or activity column detected, skipping industry classification");
            return;
        }

        let classifier = IndustryClassifier::with_reference(self.reference);
        let derived: Vec<String> = [
            "industry",
            "industry_en",
            "industry_category",
            "industry_confidence",
        ]
        .iter()
        .map(|s| s.to_string())
        .collect();

        augment_rows(table, &derived, |row| {
            let company_text = company
                .map(|column| {
                    let clean = row.text(&format!("{}_clean", column));
                    if clean.is_empty() {
                        row.text(column)
                    } else {
                        clean
                    }
                })
                .unwrap_or_default();
            let activity_text = activity.map(|column| row.text(column));

            let result = classifier.classify(&company_text, activity_text.as_deref());
            vec![
                Value::from(result.industry),
                Value::from(result.industry_en),
                Value::from(result.category),
                Value::Number(result.confidence),
            ]
        });
        info!("industry classification done");
    }

    fn classify_size(&self, table: &mut Table) {
        let Some(column) = self.employee_column(table) else {
            warn!("no employee-count column found, skipping size classification");
            return;
        };

        let derived: Vec<String> = ["size", "size_en", "size_category", "size_confidence"]
            .iter()
            .map(|s| s.to_string())
            .collect();

        augment_rows(table, &derived, |row| {
            let employees = row.get(&column).and_then(Value::as_count);
            let result = SizeClassifier::classify(employees);
            vec![
                Value::from(result.size),
                Value::from(result.size_en),
                Value::from(result.category),
                Value::Number(result.confidence),
            ]
        });
        info!(column = %column, "size classification done");
    }

    /// Configured override when present in the table, else the first column
    /// whose normalized name contains an employee keyword
    fn employee_column(&self, table: &Table) -> Option<String> {
        if let Some(column) = &self.settings.columns.employees {
            if table.has_column(column) {
                return Some(column.clone());
            }
            warn!(column = %column, "configured employee column not in table");
        }

        let keywords: Vec<String> = self
            .reference
            .columns
            .employee_keywords
            .iter()
            .map(|k| ColumnDetector::normalize_column_name(k))
            .collect();

        table
            .columns
            .iter()
            .find(|column| {
                let normalized = ColumnDetector::normalize_column_name(column);
                keywords.iter().any(|k| !k.is_empty() && normalized.contains(k.as_str()))
            })
            .cloned()
    }

    fn mark_duplicates(&self, table: &mut Table, cleaned_fields: &[CleanedField]) {
        let configured = &self.settings.duplicates.key_columns;
        let key_columns: Vec<String> = if configured.is_empty() {
            cleaned_fields
                .iter()
                .filter(|f| matches!(f.kind, ColumnType::Phone | ColumnType::Email))
                .map(|f| format!("{}_clean", f.column))
                .collect()
        } else {
            configured
                .iter()
                .filter(|column| table.has_column(column))
                .cloned()
                .collect()
        };

        if key_columns.is_empty() {
            warn!("no duplicate key columns available, skipping duplicate marking");
            return;
        }

        let detector = DuplicateDetector::new(key_columns)
            .skip_blank_keys(self.settings.duplicates.skip_blank_keys);
        let flags = detector.mark_duplicates(&table.rows);

        let rows = std::mem::take(&mut table.rows);
        table.rows = rows
            .into_iter()
            .zip(flags.iter())
            .map(|(row, &flag)| row.augmented([("is_duplicate".to_string(), Value::Bool(flag))]))
            .collect();
        table.push_columns(["is_duplicate"]);

        info!(
            keys = ?detector.key_columns(),
            duplicates = flags.iter().filter(|f| **f).count(),
            "duplicates marked"
        );
    }
}

// ============================================================================
// HELPERS
// ============================================================================

fn suffixed(column: &str, suffixes: &[&str]) -> Vec<String> {
    suffixes
        .iter()
        .map(|suffix| format!("{}_{}", column, suffix))
        .collect()
}

fn fields_of(columns: Vec<String>, kind: ColumnType) -> Vec<CleanedField> {
    columns
        .into_iter()
        .map(|column| CleanedField::new(column, kind))
        .collect()
}

/// Rebuild every row with `derive(row)` appended under `columns` (same order)
fn augment_rows<F>(table: &mut Table, columns: &[String], mut derive: F)
where
    F: FnMut(&Record) -> Vec<Value>,
{
    let rows = std::mem::take(&mut table.rows);
    table.rows = rows
        .into_iter()
        .map(|row| {
            let values = derive(&row);
            row.augmented(columns.iter().cloned().zip(values))
        })
        .collect();
    table.push_columns(columns.iter().cloned());
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn contacts() -> Table {
        let rows = vec![
            Record::new()
                .with("name", "Dr. ahmed ali")
                .with("phone", "0501234567")
                .with("email", "ahmed@company.com")
                .with("company", "مؤسسة البناء للمقاولات")
                .with("city", "جدة")
                .with("employees", "30"),
            Record::new()
                .with("name", "sara")
                .with("phone", "+966 50 123 4567")
                .with("email", "user@gmial.com")
                .with("company", "Riyadh Dental Clinic LLC")
                .with("city", "الرياض")
                .with("employees", "300"),
            Record::new()
                .with("name", "")
                .with("phone", "911")
                .with("email", Value::Null)
                .with("company", "")
                .with("city", "")
                .with("employees", ""),
        ];
        let columns = ["name", "phone", "email", "company", "city", "employees"]
            .iter()
            .map(|s| s.to_string())
            .collect();
        Table::new(columns, rows).unwrap()
    }

    fn run(settings: CleaningSettings, table: Table) -> (CleaningOutcome, Vec<(f64, String)>) {
        let mut events = Vec::new();
        let outcome = CleaningPipeline::new(settings)
            .run(table, &mut |fraction: f64, label: &str| {
                events.push((fraction, label.to_string()))
            })
            .unwrap();
        (outcome, events)
    }

    #[test]
    fn test_full_sweep() {
        let (outcome, _) = run(CleaningSettings::all_stages(), contacts());
        let rows = &outcome.table.rows;

        assert_eq!(rows[0].text("phone_clean"), "966501234567");
        assert_eq!(rows[0].text("phone_status"), "valid");
        assert_eq!(rows[0].text("phone_type"), "mobile");
        assert_eq!(rows[0].text("phone_country"), "السعودية");
        assert_eq!(rows[2].text("phone_status"), "error");

        assert_eq!(rows[1].text("email_status"), "error");
        assert_eq!(rows[1].text("email_suggestion"), "user@gmail.com");
        assert_eq!(rows[2].text("email_status"), "optional");

        assert_eq!(rows[0].text("name_clean"), "Ahmed Ali");
        assert_eq!(rows[1].text("company_name_only"), "Riyadh Dental Clinic");

        assert_eq!(rows[0].text("geo_country_en"), "Saudi Arabia");
        assert_eq!(rows[0].text("geo_region"), "منطقة مكة المكرمة");

        assert_eq!(rows[0].text("industry_category"), "construction");
        assert_eq!(rows[1].text("industry_category"), "healthcare");

        assert_eq!(rows[0].text("size_category"), "small");
        assert_eq!(rows[1].text("size_category"), "large");
        assert_eq!(rows[2].text("size_category"), "unknown");

        // Same phone, different email
        assert_eq!(rows[1].get("is_duplicate"), Some(&Value::Bool(false)));
    }

    #[test]
    fn test_source_columns_are_untouched_and_first() {
        let input = contacts();
        let (outcome, _) = run(CleaningSettings::default(), input.clone());

        assert_eq!(&outcome.table.columns[..input.columns.len()], &input.columns[..]);
        for (before, after) in input.rows.iter().zip(&outcome.table.rows) {
            for column in &input.columns {
                assert_eq!(before.get(column), after.get(column));
            }
        }
        assert!(outcome.table.has_column("phone_clean"));
        assert!(!outcome.table.has_column("name_clean"));
    }

    #[test]
    fn test_progress_is_monotonic_and_complete() {
        let (_, events) = run(CleaningSettings::all_stages(), contacts());

        assert!(events.windows(2).all(|w| w[0].0 <= w[1].0));
        assert!(events.iter().all(|(f, _)| (0.0..=1.0).contains(f)));
        assert_eq!(events.last().map(|(f, l)| (*f, l.as_str())), Some((1.0, "Completed")));
    }

    #[test]
    fn test_row_cap_truncates() {
        let settings = CleaningSettings {
            max_rows: 2,
            ..Default::default()
        };
        let (outcome, _) = run(settings, contacts());
        assert_eq!(outcome.table.len(), 2);
        assert_eq!(outcome.statistics.total_rows, 3);
        assert_eq!(outcome.statistics.processed_rows, 2);
    }

    #[test]
    fn test_duplicates_on_cleaned_keys() {
        let rows = vec![
            Record::new().with("phone", "0501234567").with("email", "A@x.com"),
            Record::new().with("phone", "00966501234567").with("email", "a@x.com"),
            Record::new().with("phone", "0551234567").with("email", "a@x.com"),
        ];
        let table = Table::new(vec!["phone".into(), "email".into()], rows).unwrap();
        let (outcome, _) = run(CleaningSettings::default(), table);

        let flags: Vec<_> = outcome
            .table
            .rows
            .iter()
            .map(|r| r.get("is_duplicate").cloned())
            .collect();
        assert_eq!(
            flags,
            vec![Some(Value::Bool(false)), Some(Value::Bool(true)), Some(Value::Bool(false))]
        );
        assert_eq!(outcome.statistics.duplicate_rows, 1);
    }

    #[test]
    fn test_contacts_without_usable_keys_are_not_duplicates() {
        let rows = vec![
            Record::new().with("name", "Omar").with("phone", "123").with("email", "omar@x"),
            Record::new().with("name", "Lina").with("phone", "456").with("email", "lina@y"),
            Record::new().with("name", "Huda").with("phone", "").with("email", ""),
        ];
        let columns = vec!["name".into(), "phone".into(), "email".into()];
        let table = Table::new(columns, rows).unwrap();
        let (outcome, _) = run(CleaningSettings::default(), table);

        assert!(outcome
            .table
            .rows
            .iter()
            .all(|r| r.get("is_duplicate") == Some(&Value::Bool(false))));
        assert_eq!(outcome.statistics.duplicate_rows, 0);
    }

    #[test]
    fn test_blank_keys_group_when_configured() {
        let rows = vec![
            Record::new().with("phone", "123").with("email", "omar@x"),
            Record::new().with("phone", "456").with("email", "lina@y"),
        ];
        let table = Table::new(vec!["phone".into(), "email".into()], rows).unwrap();
        let mut settings = CleaningSettings::default();
        settings.duplicates.skip_blank_keys = false;
        let (outcome, _) = run(settings, table);

        assert_eq!(outcome.table.rows[1].get("is_duplicate"), Some(&Value::Bool(true)));
        assert_eq!(outcome.statistics.duplicate_rows, 1);
    }

    #[test]
    fn test_missing_columns_skip_stages() {
        let table = Table::new(
            vec!["notes".into()],
            vec![Record::new().with("notes", "call back later")],
        )
        .unwrap();
        let (outcome, _) = run(CleaningSettings::all_stages(), table);

        assert_eq!(outcome.table.columns, vec!["notes"]);
        assert!(outcome.cleaned_fields.is_empty());
        assert_eq!(outcome.statistics.quality_score, 0.0);
    }

    #[test]
    fn test_name_only_detection_when_sampling_is_off() {
        let settings = CleaningSettings {
            detect_columns: false,
            ..Default::default()
        };
        let (outcome, _) = run(settings, contacts());
        let phone = outcome.detections.get("phone").unwrap();
        assert_eq!(phone.detected_type, ColumnType::Phone);
        assert_eq!(phone.method, DetectionMethod::Name);
        assert!(outcome.table.has_column("phone_status"));
    }
}
