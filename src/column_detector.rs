// 🔎 Column Type Detector - declared name vs sampled content
//
// Name rules come from the reference data (bilingual keywords, per-type
// confidence). Content analysis samples up to N non-blank cells.
// Resolution order:
//   1. name confidence >= 0.8                        → name
//   2. data says phone/email/website with >= 0.6     → data
//   3. both signals agree                            → both, mean + 0.1 (max 1.0)
//   4. otherwise name if present, else data

use crate::record::{Table, Value};
use crate::reference::ReferenceData;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::debug;

const NAME_TRUST_THRESHOLD: f64 = 0.8;
const DATA_TRUST_THRESHOLD: f64 = 0.6;
const AGREEMENT_BONUS: f64 = 0.1;

static PHONE_LIKE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[\d+()\-\s]{8,}").expect("phone-like pattern compiles"));
static EMAIL_LIKE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[^@]+@[^@]+\.[^@]+$").expect("email-like pattern compiles"));
static ARABIC: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[\x{0600}-\x{06FF}]").expect("arabic pattern compiles"));
static NAME_NOISE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[^\w\s\x{0600}-\x{06FF}]").expect("name noise pattern compiles"));
static WHITESPACE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\s+").expect("whitespace pattern compiles"));

// ============================================================================
// TYPES
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ColumnType {
    Phone,
    Email,
    Name,
    Company,
    City,
    Region,
    Activity,
    Website,
    Number,
    Text,
    TextArabic,
    Unknown,
}

impl ColumnType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ColumnType::Phone => "phone",
            ColumnType::Email => "email",
            ColumnType::Name => "name",
            ColumnType::Company => "company",
            ColumnType::City => "city",
            ColumnType::Region => "region",
            ColumnType::Activity => "activity",
            ColumnType::Website => "website",
            ColumnType::Number => "number",
            ColumnType::Text => "text",
            ColumnType::TextArabic => "text_arabic",
            ColumnType::Unknown => "unknown",
        }
    }

    /// Anything outside the closed set collapses to `Unknown`
    pub fn parse(label: &str) -> ColumnType {
        match label.trim().to_lowercase().as_str() {
            "phone" => ColumnType::Phone,
            "email" => ColumnType::Email,
            "name" => ColumnType::Name,
            "company" => ColumnType::Company,
            "city" => ColumnType::City,
            "region" => ColumnType::Region,
            "activity" => ColumnType::Activity,
            "website" => ColumnType::Website,
            "number" => ColumnType::Number,
            "text" => ColumnType::Text,
            "text_arabic" => ColumnType::TextArabic,
            _ => ColumnType::Unknown,
        }
    }
}

impl fmt::Display for ColumnType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DetectionMethod {
    Name,
    Data,
    Both,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnDetection {
    pub column_name: String,
    pub detected_type: ColumnType,
    pub confidence: f64,
    pub method: DetectionMethod,
}

/// Detections for a whole table, in column order
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Detections {
    pub columns: Vec<ColumnDetection>,
}

impl Detections {
    pub fn get(&self, column: &str) -> Option<&ColumnDetection> {
        self.columns.iter().find(|d| d.column_name == column)
    }

    /// Columns of one type, in table order
    pub fn columns_of(&self, column_type: ColumnType) -> Vec<String> {
        self.columns
            .iter()
            .filter(|d| d.detected_type == column_type)
            .map(|d| d.column_name.clone())
            .collect()
    }

    pub fn first_of(&self, column_type: ColumnType) -> Option<&str> {
        self.columns
            .iter()
            .find(|d| d.detected_type == column_type)
            .map(|d| d.column_name.as_str())
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }
}

// ============================================================================
// DETECTOR
// ============================================================================

pub struct ColumnDetector<'a> {
    reference: &'a ReferenceData,
    sample_size: usize,
}

impl ColumnDetector<'static> {
    pub fn new() -> Self {
        ColumnDetector::with_reference(ReferenceData::builtin())
    }
}

impl Default for ColumnDetector<'static> {
    fn default() -> Self {
        Self::new()
    }
}

impl<'a> ColumnDetector<'a> {
    pub fn with_reference(reference: &'a ReferenceData) -> Self {
        ColumnDetector {
            reference,
            sample_size: reference.columns.sample_size.max(1),
        }
    }

    pub fn with_sample_size(mut self, sample_size: usize) -> Self {
        self.sample_size = sample_size.max(1);
        self
    }

    /// Lowercase, single spaces, punctuation removed
    pub fn normalize_column_name(name: &str) -> String {
        let lowered = name.trim().to_lowercase();
        let spaced = WHITESPACE.replace_all(&lowered, " ");
        NAME_NOISE.replace_all(&spaced, "").into_owned()
    }

    pub fn detect_by_name(&self, column: &str) -> Option<(ColumnType, f64)> {
        let normalized = Self::normalize_column_name(column);
        if normalized.is_empty() {
            return None;
        }

        self.reference.columns.rules.iter().find_map(|rule| {
            let hit = rule.keywords.iter().any(|keyword| {
                let keyword = Self::normalize_column_name(keyword);
                !keyword.is_empty() && normalized.contains(&keyword)
            });
            hit.then(|| (ColumnType::parse(&rule.column_type), rule.confidence))
        })
    }

    /// Share-based content classification over non-blank cells
    pub fn analyze_sample(&self, values: &[&Value]) -> (ColumnType, f64) {
        let sample: Vec<String> = values
            .iter()
            .filter(|v| !v.is_blank())
            .take(self.sample_size)
            .map(|v| v.to_text())
            .collect();

        if sample.is_empty() {
            return (ColumnType::Unknown, 0.0);
        }

        let mut phone = 0usize;
        let mut email = 0usize;
        let mut url = 0usize;
        let mut number = 0usize;
        let mut arabic = 0usize;

        for value in &sample {
            if PHONE_LIKE.is_match(value) {
                let digits = value.chars().filter(|c| c.is_ascii_digit()).count();
                if (8..=15).contains(&digits) {
                    phone += 1;
                }
            }
            if value.contains('@') && value.contains('.') && EMAIL_LIKE.is_match(value) {
                email += 1;
            }
            if value.contains("http") || value.contains("www.") || value.contains(".com") {
                url += 1;
            }
            let bare: String = value.chars().filter(|c| *c != '.' && *c != ',').collect();
            if !bare.is_empty() && bare.chars().all(|c| c.is_ascii_digit()) {
                number += 1;
            }
            if ARABIC.is_match(value) {
                arabic += 1;
            }
        }

        let total = sample.len() as f64;
        let share = |count: usize| count as f64 / total;

        if share(phone) > 0.5 {
            (ColumnType::Phone, share(phone))
        } else if share(email) > 0.5 {
            (ColumnType::Email, share(email))
        } else if share(url) > 0.5 {
            (ColumnType::Website, share(url))
        } else if share(arabic) > 0.7 {
            (ColumnType::TextArabic, share(arabic))
        } else if share(number) > 0.8 {
            (ColumnType::Number, share(number))
        } else {
            (ColumnType::Text, 0.5)
        }
    }

    pub fn detect_column(&self, column: &str, values: &[&Value]) -> ColumnDetection {
        let by_name = self.detect_by_name(column);
        let (data_type, data_confidence) = self.analyze_sample(values);

        let detection = |detected_type, confidence, method| ColumnDetection {
            column_name: column.to_string(),
            detected_type,
            confidence,
            method,
        };

        match by_name {
            Some((name_type, name_confidence)) if name_confidence >= NAME_TRUST_THRESHOLD => {
                detection(name_type, name_confidence, DetectionMethod::Name)
            }
            _ if matches!(
                data_type,
                ColumnType::Phone | ColumnType::Email | ColumnType::Website
            ) && data_confidence >= DATA_TRUST_THRESHOLD =>
            {
                detection(data_type, data_confidence, DetectionMethod::Data)
            }
            Some((name_type, name_confidence)) if name_type == data_type => {
                let average = (name_confidence + data_confidence) / 2.0;
                let boosted = (average + AGREEMENT_BONUS).min(1.0);
                detection(name_type, boosted, DetectionMethod::Both)
            }
            Some((name_type, name_confidence)) => {
                detection(name_type, name_confidence, DetectionMethod::Name)
            }
            None => detection(data_type, data_confidence, DetectionMethod::Data),
        }
    }

    pub fn detect_all(&self, table: &Table) -> Detections {
        let columns = table
            .columns
            .iter()
            .map(|column| {
                let detection = self.detect_column(column, &table.column_values(column));
                debug!(
                    column = %detection.column_name,
                    detected_type = %detection.detected_type,
                    confidence = detection.confidence,
                    method = ?detection.method,
                    "column detected"
                );
                detection
            })
            .collect();

        Detections { columns }
    }
}

// ============================================================================
// TESTS
// ============================================================================
