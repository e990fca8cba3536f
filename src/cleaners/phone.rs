// 📞 Phone Normalizer - digits → E.164-style international number
//
// Stages short-circuit on the first rejection:
//   extract → length floor → strip 00 → fake → service → country code
//   (local → international fallback) → length → mobile / landline / unified

use super::FieldResult;
use crate::config::{LandlinePolicy, PhonePolicy};
use crate::countries::{CountryProfile, CountryRegistry};
use crate::record::Value;
use crate::reference::ReferenceData;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;

const MIN_DIGITS: usize = 8;
const SAUDI_CODE: &str = "966";
const SAUDI_UNIFIED_PREFIX: &str = "920";
const UNKNOWN_COUNTRY: &str = "غير معروف";

static EXTENSION: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\s*(ext\.?|extension|x)\s*\d+").expect("extension pattern compiles")
});

/// A local dialing format and the country code it belongs to
struct LocalPattern {
    pattern: Regex,
    code: &'static str,
    /// Drop the leading trunk `0` before prefixing the code
    drop_trunk_zero: bool,
}

fn local(pattern: &str, code: &'static str, drop_trunk_zero: bool) -> LocalPattern {
    LocalPattern {
        pattern: Regex::new(pattern).expect("local phone pattern compiles"),
        code,
        drop_trunk_zero,
    }
}

// Tried in order; the first match wins
static LOCAL_PATTERNS: Lazy<Vec<LocalPattern>> = Lazy::new(|| {
    vec![
        // Saudi Arabia: mobile, unified 920, landline 01x
        local(r"^5\d{8}$", "966", false),
        local(r"^05\d{8}$", "966", true),
        local(r"^920\d{6}$", "966", false),
        local(r"^0920\d{6}$", "966", true),
        local(r"^01[1-7]\d{7}$", "966", true),
        // UAE landlines
        local(r"^[234679]\d{7}$", "971", false),
        local(r"^0[234679]\d{7}$", "971", true),
        // Kuwait, Qatar, Bahrain, Oman
        local(r"^[569]\d{7}$", "965", false),
        local(r"^[3567]\d{7}$", "974", false),
        local(r"^[36]\d{7}$", "973", false),
        local(r"^9\d{7}$", "968", false),
        // Egypt
        local(r"^1\d{9}$", "20", false),
        local(r"^01\d{9}$", "20", true),
        // Jordan
        local(r"^7\d{8}$", "962", false),
        local(r"^07\d{8}$", "962", true),
        // Tunisia
        local(r"^[2459]\d{7}$", "216", false),
        // Turkey
        local(r"^5\d{9}$", "90", false),
        local(r"^05\d{9}$", "90", true),
    ]
});

// ============================================================================
// RESULT
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PhoneType {
    Mobile,
    Landline,
    UnifiedNumber,
    Fake,
    Service,
    Unknown,
}

impl PhoneType {
    pub fn as_str(&self) -> &'static str {
        match self {
            PhoneType::Mobile => "mobile",
            PhoneType::Landline => "landline",
            PhoneType::UnifiedNumber => "unified_number",
            PhoneType::Fake => "fake",
            PhoneType::Service => "service",
            PhoneType::Unknown => "unknown",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PhoneResult {
    #[serde(flatten)]
    pub field: FieldResult,

    /// Localized country name (empty until a code is resolved)
    pub country: String,
    pub country_en: String,
    pub country_code: String,

    #[serde(rename = "type")]
    pub phone_type: PhoneType,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
}

impl PhoneResult {
    fn rejected(category: &str, message: impl Into<String>, phone_type: PhoneType) -> Self {
        PhoneResult {
            field: FieldResult::error(category, message),
            country: String::new(),
            country_en: String::new(),
            country_code: String::new(),
            phone_type,
            note: None,
        }
    }

    fn optional() -> Self {
        PhoneResult {
            field: FieldResult::optional(),
            country: String::new(),
            country_en: String::new(),
            country_code: String::new(),
            phone_type: PhoneType::Unknown,
            note: None,
        }
    }

    fn in_country(mut self, profile: &CountryProfile) -> Self {
        self.country = profile.name.clone();
        self.country_en = profile.name_en.clone();
        self.country_code = profile.code.clone();
        self
    }

    fn accepted(clean: &str, phone_type: PhoneType, note: Option<String>) -> Self {
        PhoneResult {
            field: FieldResult::valid(clean, phone_type.as_str()),
            country: String::new(),
            country_en: String::new(),
            country_code: String::new(),
            phone_type,
            note,
        }
    }
}

// ============================================================================
// CLEANER
// ============================================================================

pub struct PhoneCleaner<'a> {
    countries: &'a CountryRegistry,
    reference: &'a ReferenceData,
    policy: PhonePolicy,
}

impl PhoneCleaner<'static> {
    /// Cleaner over the embedded country and reference tables
    pub fn new() -> Self {
        PhoneCleaner::with_data(CountryRegistry::builtin(), ReferenceData::builtin())
    }
}

impl Default for PhoneCleaner<'static> {
    fn default() -> Self {
        Self::new()
    }
}

impl<'a> PhoneCleaner<'a> {
    pub fn with_data(countries: &'a CountryRegistry, reference: &'a ReferenceData) -> Self {
        PhoneCleaner {
            countries,
            reference,
            policy: PhonePolicy::default(),
        }
    }

    pub fn with_policy(mut self, policy: PhonePolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn clean(&self, raw: &Value) -> PhoneResult {
        if raw.is_blank() {
            return PhoneResult::optional();
        }
        self.validate(&raw.to_text())
    }

    pub fn clean_str(&self, raw: &str) -> PhoneResult {
        self.clean(&Value::from(raw))
    }

    /// Digits only: spreadsheet errors yield "", extensions are dropped,
    /// Arabic-Indic digits are translated
    pub fn extract_digits(&self, text: &str) -> String {
        let text = text.trim();
        if self.reference.contains_data_error(text) {
            return String::new();
        }

        let without_extension = EXTENSION.replace_all(text, "");
        without_extension
            .chars()
            .filter_map(ascii_digit)
            .collect()
    }

    /// Longest dialing code that prefixes an already-normalized number
    pub fn detect_country_code(&self, digits: &str) -> Option<&'a str> {
        self.countries.resolve_code(digits)
    }

    pub fn convert_local_to_international(&self, digits: &str) -> Option<String> {
        LOCAL_PATTERNS
            .iter()
            .find(|local| local.pattern.is_match(digits))
            .map(|local| {
                let national = if local.drop_trunk_zero {
                    &digits[1..]
                } else {
                    digits
                };
                format!("{}{}", local.code, national)
            })
    }

    pub fn is_fake_number(&self, number: &str) -> bool {
        let fakes = &self.reference.phone.fake_numbers;
        if fakes.iter().any(|f| f == number) {
            return true;
        }

        if number.len() >= 10 {
            let last_ten = &number[number.len() - 10..];
            if fakes.iter().any(|f| f == last_ten) {
                return true;
            }

            let first = last_ten.as_bytes()[0];
            if last_ten.bytes().all(|b| b == first) {
                return true;
            }

            if self
                .reference
                .phone
                .sequential_patterns
                .iter()
                .any(|p| p == last_ten)
            {
                return true;
            }
        }

        false
    }

    pub fn is_service_number(&self, number: &str) -> bool {
        self.reference
            .phone
            .service_numbers
            .iter()
            .any(|s| number.starts_with(s.as_str()))
    }

    fn validate(&self, text: &str) -> PhoneResult {
        let digits = self.extract_digits(text);

        if digits.is_empty() {
            return PhoneResult::rejected("empty", "رقم فارغ", PhoneType::Unknown);
        }

        if digits.len() < MIN_DIGITS {
            // Short service numbers (911, 999) are reported as such, not as too short
            if self.reference.phone.service_numbers.iter().any(|s| *s == digits) {
                return PhoneResult::rejected(
                    "service_number",
                    "رقم خدمة/طوارئ",
                    PhoneType::Service,
                );
            }
            return PhoneResult::rejected(
                "too_short",
                format!("قصير جداً ({} أرقام)", digits.len()),
                PhoneType::Unknown,
            );
        }

        let number = digits.strip_prefix("00").unwrap_or(&digits);

        if self.is_fake_number(number) {
            return PhoneResult::rejected("fake_number", "رقم مزيف/تسويقي", PhoneType::Fake);
        }

        if self.is_service_number(number) {
            return PhoneResult::rejected("service_number", "رقم خدمة/طوارئ", PhoneType::Service);
        }

        let (number, code) = match self.detect_country_code(number) {
            Some(code) => (number.to_string(), code),
            None => {
                let converted = self.convert_local_to_international(number);
                match converted.and_then(|n| self.detect_country_code(&n).map(|c| (n, c))) {
                    Some(found) => found,
                    None => {
                        let mut result = PhoneResult::rejected(
                            "unknown_country",
                            "كود دولة غير معروف",
                            PhoneType::Unknown,
                        );
                        result.country = UNKNOWN_COUNTRY.to_string();
                        return result;
                    }
                }
            }
        };

        let Some(profile) = self.countries.lookup(code) else {
            let mut result =
                PhoneResult::rejected("unsupported_country", "دولة غير مدعومة", PhoneType::Unknown);
            result.country = UNKNOWN_COUNTRY.to_string();
            result.country_code = code.to_string();
            return result;
        };

        if number.len() != profile.total_length {
            return PhoneResult::rejected(
                "wrong_length",
                format!(
                    "طول خاطئ: {} بدلاً من {}",
                    number.len(),
                    profile.total_length
                ),
                PhoneType::Unknown,
            )
            .in_country(profile);
        }

        self.classify(&number, profile).in_country(profile)
    }

    fn classify(&self, number: &str, profile: &CountryProfile) -> PhoneResult {
        let subscriber = &number[profile.code.len()..];
        let lead: String = subscriber.chars().take(2).collect();

        if profile.unified {
            return PhoneResult::accepted(
                number,
                PhoneType::Mobile,
                Some("نظام موحد".to_string()),
            );
        }

        if profile.code == SAUDI_CODE && subscriber.starts_with(SAUDI_UNIFIED_PREFIX) {
            return PhoneResult::accepted(
                number,
                PhoneType::UnifiedNumber,
                Some("رقم موحد".to_string()),
            );
        }

        if profile.is_mobile_prefix(subscriber) {
            return PhoneResult::accepted(number, PhoneType::Mobile, None);
        }

        if profile.is_landline_prefix(subscriber) {
            return match self.policy.landline {
                LandlinePolicy::Accept => PhoneResult::accepted(
                    number,
                    PhoneType::Landline,
                    Some(format!("رقم أرضي (يبدأ بـ {})", lead)),
                ),
                LandlinePolicy::Reject => PhoneResult::rejected(
                    "landline",
                    format!("رقم أرضي غير مقبول (يبدأ بـ {})", lead),
                    PhoneType::Landline,
                ),
            };
        }

        PhoneResult::rejected(
            "unknown_prefix",
            format!("بادئة غير معروفة: {}", lead),
            PhoneType::Unknown,
        )
    }
}

/// ASCII digit for ASCII, Arabic-Indic and Extended Arabic-Indic glyphs
fn ascii_digit(c: char) -> Option<char> {
    let offset = match c {
        '0'..='9' => return Some(c),
        '\u{0660}'..='\u{0669}' => c as u32 - 0x0660,
        '\u{06F0}'..='\u{06F9}' => c as u32 - 0x06F0,
        _ => return None,
    };
    char::from_digit(offset, 10)
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cleaners::FieldStatus;

    fn clean(raw: &str) -> PhoneResult {
        PhoneCleaner::new().clean_str(raw)
    }

    #[test]
    fn test_saudi_mobile() {
        let result = clean("966501234567");
        assert_eq!(result.field.status(), FieldStatus::Valid);
        assert_eq!(result.field.clean(), "966501234567");
        assert_eq!(result.phone_type, PhoneType::Mobile);
        assert_eq!(result.country, "السعودية");
        assert_eq!(result.country_en, "Saudi Arabia");
        assert_eq!(result.country_code, "966");
    }

    #[test]
    fn test_equivalent_formats_normalize_identically() {
        let formats = [
            "00966501234567",
            "+966501234567",
            "0501234567",
            "501234567",
            "+966 50 123 4567",
        ];
        for raw in formats {
            assert_eq!(clean(raw).field.clean(), "966501234567", "input {}", raw);
        }
    }

    #[test]
    fn test_arabic_digits_and_extension() {
        assert_eq!(clean("٠٥٠١٢٣٤٥٦٧").field.clean(), "966501234567");
        assert_eq!(clean("+966 50 123 4567 ext. 22").field.clean(), "966501234567");
    }

    #[test]
    fn test_numeric_cell() {
        let result = PhoneCleaner::new().clean(&Value::Number(966501234567.0));
        assert_eq!(result.field.clean(), "966501234567");
    }

    #[test]
    fn test_service_number() {
        let result = clean("911");
        assert_eq!(result.field.status(), FieldStatus::Error);
        assert_eq!(result.field.category(), "service_number");
        assert!(result.field.clean().is_empty());

        assert_eq!(clean("99912345678").field.category(), "service_number");
    }

    #[test]
    fn test_rejections() {
        assert_eq!(clean("12345").field.category(), "too_short");
        assert_eq!(clean("0555555555").field.category(), "fake_number");
        assert_eq!(clean("1234567890").field.category(), "fake_number");
        assert_eq!(clean("966522222222").field.category(), "fake_number");
        assert_eq!(clean("9665012345678").field.category(), "wrong_length");
        assert_eq!(clean("966201234567").field.category(), "unknown_prefix");

        let unknown = clean("0912345678");
        assert_eq!(unknown.field.category(), "unknown_country");
        assert_eq!(unknown.country, "غير معروف");
    }

    #[test]
    fn test_blank_and_broken_cells() {
        assert_eq!(clean("").field.status(), FieldStatus::Optional);
        assert_eq!(PhoneCleaner::new().clean(&Value::Null).field.status(), FieldStatus::Optional);

        let broken = clean("#REF!");
        assert_eq!(broken.field.status(), FieldStatus::Error);
        assert_eq!(broken.field.category(), "empty");

        assert_eq!(clean("no phone").field.category(), "empty");
    }

    #[test]
    fn test_gulf_and_international_numbers() {
        let cases = [
            ("96550123456", "965"),
            ("97433123456", "974"),
            ("97336123456", "973"),
            ("96891234567", "968"),
            ("201012345678", "20"),
            ("12025551234", "1"),
            ("447700900123", "44"),
        ];
        for (raw, code) in cases {
            let result = clean(raw);
            assert_eq!(result.field.status(), FieldStatus::Valid, "input {}", raw);
            assert_eq!(result.country_code, code);
        }
    }

    #[test]
    fn test_local_formats_round_trip_country_code() {
        let cleaner = PhoneCleaner::new();
        let cases = [
            ("0501234567", "966"),
            ("0112345678", "966"),
            ("01012345678", "20"),
            ("0791234567", "962"),
            ("05321234567", "90"),
        ];
        for (raw, code) in cases {
            let result = cleaner.clean_str(raw);
            assert_eq!(result.field.status(), FieldStatus::Valid, "input {}", raw);
            assert_eq!(cleaner.detect_country_code(result.field.clean()), Some(code));
        }
    }

    #[test]
    fn test_saudi_landline_local_forms() {
        let cleaner = PhoneCleaner::new();
        assert_eq!(
            cleaner.convert_local_to_international("0112345678").as_deref(),
            Some("966112345678")
        );
        assert_eq!(
            cleaner.convert_local_to_international("0172345678").as_deref(),
            Some("966172345678")
        );
        // Area codes outside 011-017, and the bare 8-digit form, are not Saudi
        assert_eq!(cleaner.convert_local_to_international("0182345678"), None);
        assert_eq!(cleaner.convert_local_to_international("12345678"), None);
    }

    #[test]
    fn test_unified_numbers() {
        let us = clean("+1 (202) 555-1234");
        assert_eq!(us.phone_type, PhoneType::Mobile);
        assert_eq!(us.note.as_deref(), Some("نظام موحد"));

        let saudi = clean("966920012345");
        assert_eq!(saudi.phone_type, PhoneType::UnifiedNumber);
        assert_eq!(saudi.field.category(), "unified_number");
    }

    #[test]
    fn test_landline_policy() {
        let accepted = clean("966112345678");
        assert_eq!(accepted.field.status(), FieldStatus::Valid);
        assert_eq!(accepted.phone_type, PhoneType::Landline);

        let strict = PhoneCleaner::new().with_policy(PhonePolicy {
            landline: LandlinePolicy::Reject,
        });
        let rejected = strict.clean_str("966112345678");
        assert_eq!(rejected.field.status(), FieldStatus::Error);
        assert_eq!(rejected.field.category(), "landline");
        assert_eq!(rejected.country_code, "966");
    }
}
