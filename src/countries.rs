// 🌍 Country Registry - dialing plans for every supported country
// Loaded once from the embedded data/countries.json, read-only afterwards

use crate::error::Result;
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

const BUILTIN_COUNTRIES: &str = include_str!("../data/countries.json");

static BUILTIN: Lazy<CountryRegistry> = Lazy::new(|| {
    CountryRegistry::from_json(BUILTIN_COUNTRIES).expect("embedded countries.json is valid")
});

// ============================================================================
// COUNTRY PROFILE
// ============================================================================

/// One region and the cities (Arabic and Latin spellings) that belong to it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Region {
    pub name: String,
    #[serde(default)]
    pub cities: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CountryProfile {
    /// Dialing code without `+` ("966", "1", ...)
    pub code: String,

    /// Localized (Arabic) display name
    pub name: String,

    pub name_en: String,

    /// Full digit count including the dialing code
    pub total_length: usize,

    #[serde(default)]
    pub mobile_prefixes: Vec<String>,

    #[serde(default)]
    pub landline_prefixes: Vec<String>,

    /// Single numbering plan (no mobile / landline split)
    #[serde(default)]
    pub unified: bool,

    #[serde(default)]
    pub regions: Vec<Region>,
}

impl CountryProfile {
    pub fn is_mobile_prefix(&self, subscriber: &str) -> bool {
        self.mobile_prefixes.iter().any(|p| subscriber.starts_with(p.as_str()))
    }

    pub fn is_landline_prefix(&self, subscriber: &str) -> bool {
        self.landline_prefixes
            .iter()
            .any(|p| subscriber.starts_with(p.as_str()))
    }
}

#[derive(Debug, Deserialize)]
struct CountryFile {
    #[serde(default)]
    version: String,
    countries: Vec<CountryProfile>,
}

// ============================================================================
// REGISTRY
// ============================================================================

#[derive(Debug, Clone)]
pub struct CountryRegistry {
    version: String,
    by_code: HashMap<String, CountryProfile>,

    /// Dialing codes sorted longest first; ties keep file order
    codes_longest_first: Vec<String>,
}

impl CountryRegistry {
    /// Registry backed by the embedded country table
    pub fn builtin() -> &'static CountryRegistry {
        &BUILTIN
    }

    /// Parse a country table (same shape as data/countries.json)
    pub fn from_json(json: &str) -> Result<Self> {
        let file: CountryFile = serde_json::from_str(json)?;
        Ok(Self::from_profiles(file.version, file.countries))
    }

    pub fn from_profiles(version: impl Into<String>, profiles: Vec<CountryProfile>) -> Self {
        let mut codes: Vec<String> = profiles.iter().map(|p| p.code.clone()).collect();
        // Longest first so "1" is never tried before "966"; ties by code
        codes.sort_by(|a, b| b.len().cmp(&a.len()).then_with(|| a.cmp(b)));
        codes.dedup();

        let by_code = profiles
            .into_iter()
            .map(|p| (p.code.clone(), p))
            .collect();

        CountryRegistry {
            version: version.into(),
            by_code,
            codes_longest_first: codes,
        }
    }

    pub fn lookup(&self, code: &str) -> Option<&CountryProfile> {
        self.by_code.get(code)
    }

    pub fn codes_longest_first(&self) -> &[String] {
        &self.codes_longest_first
    }

    /// Longest known dialing code that prefixes `digits`
    pub fn resolve_code(&self, digits: &str) -> Option<&str> {
        self.codes_longest_first
            .iter()
            .find(|code| digits.starts_with(code.as_str()))
            .map(|code| code.as_str())
    }

    pub fn version(&self) -> &str {
        &self.version
    }

    pub fn len(&self) -> usize {
        self.by_code.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_code.is_empty()
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_registry_loads() {
        let registry = CountryRegistry::builtin();
        assert_eq!(registry.len(), 79);

        let saudi = registry.lookup("966").unwrap();
        assert_eq!(saudi.name, "السعودية");
        assert_eq!(saudi.name_en, "Saudi Arabia");
        assert_eq!(saudi.total_length, 12);
        assert!(!saudi.regions.is_empty());

        assert!(registry.lookup("1").unwrap().unified);
        assert!(registry.lookup("999").is_none());
    }

    #[test]
    fn test_longest_code_wins() {
        let registry = CountryRegistry::builtin();

        // "20" and "212" share a leading digit with the 3-digit codes tried first
        assert_eq!(registry.resolve_code("966501234567"), Some("966"));
        assert_eq!(registry.resolve_code("971501234567"), Some("971"));
        assert_eq!(registry.resolve_code("212612345678"), Some("212"));
        assert_eq!(registry.resolve_code("201012345678"), Some("20"));
        assert_eq!(registry.resolve_code("12025551234"), Some("1"));
        assert_eq!(registry.resolve_code("0501234567"), None);
    }

    #[test]
    fn test_codes_sorted_by_length() {
        let registry = CountryRegistry::builtin();
        let lengths: Vec<usize> = registry
            .codes_longest_first()
            .iter()
            .map(|c| c.len())
            .collect();

        assert!(lengths.windows(2).all(|w| w[0] >= w[1]));
        assert_eq!(registry.codes_longest_first().last().map(|c| c.len()), Some(1));
    }

    #[test]
    fn test_custom_table() {
        let json = r#"{
            "version": "test",
            "countries": [
                {"code": "1", "name": "أمريكا", "name_en": "USA", "total_length": 11, "unified": true},
                {"code": "123", "name": "تجربة", "name_en": "Testland", "total_length": 10,
                 "mobile_prefixes": ["4"]}
            ]
        }"#;

        let registry = CountryRegistry::from_json(json).unwrap();
        assert_eq!(registry.version(), "test");
        assert_eq!(registry.resolve_code("1234000000"), Some("123"));
        assert_eq!(registry.resolve_code("1999000000"), Some("1"));
        assert!(registry.lookup("123").unwrap().is_mobile_prefix("4000000"));
    }

    #[test]
    fn test_repeated_code_listed_once() {
        let json = r#"{
            "version": "test",
            "countries": [
                {"code": "20", "name": "مصر", "name_en": "Egypt", "total_length": 12},
                {"code": "1", "name": "أمريكا", "name_en": "USA", "total_length": 11},
                {"code": "44", "name": "بريطانيا", "name_en": "UK", "total_length": 12},
                {"code": "20", "name": "مصر", "name_en": "Egypt", "total_length": 12}
            ]
        }"#;

        let registry = CountryRegistry::from_json(json).unwrap();
        assert_eq!(registry.codes_longest_first(), &["20", "44", "1"]);
    }

    #[test]
    fn test_malformed_table_is_an_error() {
        assert!(CountryRegistry::from_json("{\"countries\": 5}").is_err());
    }
}
