// 🏢 Company Normalizer - spacing, company type tag, legal-suffix-free name

use super::FieldResult;
use crate::record::Value;
use crate::reference::ReferenceData;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;

static WHITESPACE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\s+").expect("whitespace pattern compiles"));
static REPEATED_DOTS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\.{2,}").expect("dots pattern compiles"));
static REPEATED_DASHES: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"-{2,}").expect("dashes pattern compiles"));

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CompanyResult {
    #[serde(flatten)]
    pub field: FieldResult,

    /// First company-type keyword found ("شركة", "مؤسسة", ...), empty if none
    #[serde(rename = "type")]
    pub company_type: String,

    /// Clean name with one trailing legal form (LLC, Ltd, ذ.م.م, ...) removed
    pub name_only: String,
}

pub struct CompanyCleaner<'a> {
    reference: &'a ReferenceData,
}

impl CompanyCleaner<'static> {
    pub fn new() -> Self {
        CompanyCleaner::with_reference(ReferenceData::builtin())
    }
}

impl Default for CompanyCleaner<'static> {
    fn default() -> Self {
        Self::new()
    }
}

impl<'a> CompanyCleaner<'a> {
    pub fn with_reference(reference: &'a ReferenceData) -> Self {
        CompanyCleaner { reference }
    }

    pub fn clean_str(&self, raw: &str) -> CompanyResult {
        self.clean(&Value::from(raw))
    }

    pub fn clean(&self, raw: &Value) -> CompanyResult {
        if raw.is_blank() {
            return CompanyResult {
                field: FieldResult::optional(),
                company_type: String::new(),
                name_only: String::new(),
            };
        }

        let text = raw.to_text();
        if self.reference.contains_bad_data_marker(&text) {
            return CompanyResult {
                field: FieldResult::error("bad_data", "بيانات خاطئة"),
                company_type: String::new(),
                name_only: String::new(),
            };
        }

        let company = WHITESPACE.replace_all(text.trim(), " ");
        let company_type = self.detect_type(&company);

        let company = REPEATED_DOTS.replace_all(&company, ".");
        let company = REPEATED_DASHES.replace_all(&company, "-");
        let company = company.trim();

        let name_only = self.strip_legal_suffix(company).to_string();

        CompanyResult {
            field: FieldResult::valid(company, "valid"),
            company_type,
            name_only,
        }
    }

    pub fn detect_type(&self, company: &str) -> String {
        self.reference
            .company
            .types
            .iter()
            .find(|t| company.contains(t.as_str()))
            .cloned()
            .unwrap_or_default()
    }

    /// Remove the first listed legal suffix that ends the name on a word boundary
    pub fn strip_legal_suffix<'c>(&self, company: &'c str) -> &'c str {
        for suffix in &self.reference.company.legal_suffixes {
            if let Some(head) = strip_suffix_ignore_case(company, suffix) {
                let boundary = head.chars().last().map_or(false, |c| !c.is_alphanumeric());
                let head = head.trim_end_matches(|c: char| c.is_whitespace() || c == ',');
                if boundary && !head.is_empty() {
                    return head;
                }
            }
        }
        company
    }
}

fn strip_suffix_ignore_case<'t>(text: &'t str, suffix: &str) -> Option<&'t str> {
    let n = suffix.chars().count();
    if n == 0 {
        return None;
    }
    let (start, _) = text.char_indices().rev().nth(n - 1)?;
    let tail = &text[start..];
    if tail.to_lowercase() == suffix.to_lowercase() {
        Some(&text[..start])
    } else {
        None
    }
}
