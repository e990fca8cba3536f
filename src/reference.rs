// 📚 Reference Lists - keyword, typo, disposable-domain and suffix tables
// Embedded from data/reference.json; versioned with the country table

use crate::error::Result;
use once_cell::sync::Lazy;
use serde::Deserialize;
use std::collections::HashMap;

const BUILTIN_REFERENCE: &str = include_str!("../data/reference.json");

static BUILTIN: Lazy<ReferenceData> = Lazy::new(|| {
    ReferenceData::from_json(BUILTIN_REFERENCE).expect("embedded reference.json is valid")
});

#[derive(Debug, Clone, Deserialize)]
pub struct PhoneLists {
    pub service_numbers: Vec<String>,
    pub fake_numbers: Vec<String>,
    pub sequential_patterns: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct EmailLists {
    pub disposable_domains: Vec<String>,
    pub role_prefixes: Vec<String>,
    pub suspicious_chars: Vec<String>,
    /// Misspelled domain → intended domain
    pub typo_domains: HashMap<String, String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NameLists {
    pub titles: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CompanyLists {
    pub types: Vec<String>,
    pub legal_suffixes: Vec<String>,
}

/// Name keywords for one column type, tried in file order
#[derive(Debug, Clone, Deserialize)]
pub struct ColumnRule {
    #[serde(rename = "type")]
    pub column_type: String,
    pub confidence: f64,
    pub keywords: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ColumnLists {
    pub rules: Vec<ColumnRule>,
    pub sample_size: usize,
    pub employee_keywords: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct IndustryBucket {
    pub industry: String,
    pub name_en: String,
    pub category: String,
    pub keywords: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ReferenceData {
    #[serde(default)]
    pub version: String,

    /// Spreadsheet error tokens (#REF, #N/A, ...), compared case-insensitively
    pub data_error_tokens: Vec<String>,

    /// Characters that mark a name / company cell as broken data
    pub bad_data_markers: Vec<String>,

    pub phone: PhoneLists,
    pub email: EmailLists,
    pub name: NameLists,
    pub company: CompanyLists,
    pub columns: ColumnLists,
    pub industries: Vec<IndustryBucket>,
}

impl ReferenceData {
    pub fn builtin() -> &'static ReferenceData {
        &BUILTIN
    }

    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn contains_data_error(&self, text: &str) -> bool {
        let upper = text.to_uppercase();
        self.data_error_tokens
            .iter()
            .any(|token| upper.contains(&token.to_uppercase()))
    }

    pub fn contains_bad_data_marker(&self, text: &str) -> bool {
        self.bad_data_markers.iter().any(|m| text.contains(m.as_str()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_reference_loads() {
        let reference = ReferenceData::builtin();

        assert!(reference.phone.service_numbers.contains(&"911".to_string()));
        assert_eq!(
            reference.email.typo_domains.get("gmial.com").map(String::as_str),
            Some("gmail.com")
        );
        assert_eq!(reference.columns.rules[0].column_type, "phone");
        assert_eq!(reference.industries.len(), 10);
    }

    #[test]
    fn test_data_error_tokens_are_case_insensitive() {
        let reference = ReferenceData::builtin();
        assert!(reference.contains_data_error("#n/a"));
        assert!(reference.contains_data_error("=#REF!"));
        assert!(!reference.contains_data_error("0501234567"));
    }
}
