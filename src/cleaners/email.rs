// 📧 Email Validator - ordered check chain, first failure wins
//
// The order of the checks below is part of the contract: the category
// reported for a bad address must not depend on anything but this order.

use super::FieldResult;
use crate::config::{EmailPolicy, TypoPolicy};
use crate::record::Value;
use crate::reference::ReferenceData;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;

const MIN_LENGTH: usize = 5;
const MAX_LENGTH: usize = 254;

// RFC 5322 subset: dot-atom local part, hostname labels of up to 63 chars
static STRICT_EMAIL: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"^[a-zA-Z0-9.!#$%&'*+/=?^_`{|}~-]+@[a-zA-Z0-9](?:[a-zA-Z0-9-]{0,61}[a-zA-Z0-9])?(?:\.[a-zA-Z0-9](?:[a-zA-Z0-9-]{0,61}[a-zA-Z0-9])?)*$",
    )
    .expect("email pattern compiles")
});

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EmailResult {
    #[serde(flatten)]
    pub field: FieldResult,

    pub is_disposable: bool,
    pub is_role_based: bool,
    pub has_suspicious_chars: bool,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub suggested_correction: Option<String>,
}

impl EmailResult {
    fn from_field(field: FieldResult) -> Self {
        EmailResult {
            field,
            is_disposable: false,
            is_role_based: false,
            has_suspicious_chars: false,
            suggested_correction: None,
        }
    }

    fn rejected(category: &str, message: impl Into<String>) -> Self {
        Self::from_field(FieldResult::error(category, message))
    }
}

pub struct EmailCleaner<'a> {
    reference: &'a ReferenceData,
    policy: EmailPolicy,
}

impl EmailCleaner<'static> {
    pub fn new() -> Self {
        EmailCleaner::with_reference(ReferenceData::builtin())
    }
}

impl Default for EmailCleaner<'static> {
    fn default() -> Self {
        Self::new()
    }
}

impl<'a> EmailCleaner<'a> {
    pub fn with_reference(reference: &'a ReferenceData) -> Self {
        EmailCleaner {
            reference,
            policy: EmailPolicy::default(),
        }
    }

    pub fn with_policy(mut self, policy: EmailPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn is_disposable(&self, domain: &str) -> bool {
        self.reference
            .email
            .disposable_domains
            .iter()
            .any(|d| domain.contains(d.as_str()))
    }

    pub fn is_role_based(&self, local: &str) -> bool {
        self.reference
            .email
            .role_prefixes
            .iter()
            .any(|role| local.starts_with(role.as_str()))
    }

    pub fn has_suspicious_chars(&self, email: &str) -> bool {
        self.reference
            .email
            .suspicious_chars
            .iter()
            .any(|c| email.contains(c.as_str()))
    }

    pub fn typo_correction(&self, domain: &str) -> Option<&'a str> {
        self.reference
            .email
            .typo_domains
            .get(domain)
            .map(String::as_str)
    }

    pub fn clean_str(&self, raw: &str) -> EmailResult {
        self.clean(&Value::from(raw))
    }

    pub fn clean(&self, raw: &Value) -> EmailResult {
        let text = match raw {
            Value::Null => return EmailResult::from_field(FieldResult::optional()),
            Value::String(s) => s,
            Value::Number(_) => {
                return EmailResult::rejected(
                    "invalid_type",
                    format!("نوع بيانات خاطئ: رقم ({})", raw.to_text()),
                )
            }
            Value::Bool(b) => {
                return EmailResult::rejected(
                    "invalid_type",
                    format!("نوع بيانات خاطئ: قيمة منطقية ({})", b),
                )
            }
            Value::List(_) => {
                return EmailResult::rejected("invalid_type", "نوع بيانات خاطئ: قائمة")
            }
        };

        let trimmed = text.trim();
        if trimmed.is_empty() {
            return EmailResult::from_field(FieldResult::optional());
        }

        self.validate(&trimmed.to_lowercase())
    }

    fn validate(&self, email: &str) -> EmailResult {
        if self.has_suspicious_chars(email) {
            return EmailResult::rejected("suspicious_chars", "يحتوي على أحرف مشبوهة");
        }

        if self.reference.contains_data_error(email) {
            return EmailResult::rejected("excel_error", "خطأ في البيانات");
        }

        if email.contains(' ') {
            return EmailResult::rejected("contains_spaces", "يحتوي على مسافات");
        }

        let length = email.chars().count();
        if !(MIN_LENGTH..=MAX_LENGTH).contains(&length) {
            let message = format!("طول غير صالح ({} حرف)", length);
            return EmailResult::rejected("invalid_length", message);
        }

        if !email.contains('@') || !email.contains('.') {
            return EmailResult::rejected("missing_symbols", "تنسيق خاطئ (بدون @ أو .)");
        }

        if email.matches('@').count() != 1 {
            return EmailResult::rejected("multiple_at", "يجب أن يحتوي على @ واحدة فقط");
        }

        let Some((local, domain)) = email.split_once('@') else {
            return EmailResult::rejected("invalid_format", "تنسيق خاطئ");
        };

        if local.is_empty() || domain.is_empty() {
            return EmailResult::rejected("wrong_at_position", "@ في موقع خاطئ");
        }

        if !domain.contains('.') {
            return EmailResult::rejected("no_dot_in_domain", "نطاق بدون نقطة");
        }

        if domain.starts_with('.') || domain.ends_with('.') {
            return EmailResult::rejected("wrong_dot_position", "نقطة في بداية أو نهاية النطاق");
        }

        if email.contains("..") {
            return EmailResult::rejected("consecutive_dots", "نقاط متتالية");
        }

        if local.starts_with('.') || local.ends_with('.') {
            return EmailResult::rejected("invalid_local_part", "أحرف غير صالحة قبل @");
        }

        let tld = domain.rsplit('.').next().unwrap_or_default();
        if tld.chars().count() < 2 {
            return EmailResult::rejected("short_tld", "امتداد النطاق قصير جداً");
        }

        if !STRICT_EMAIL.is_match(email) {
            return EmailResult::rejected("invalid_characters", "أحرف غير مسموحة");
        }

        if self.is_disposable(domain) {
            let mut result = EmailResult::rejected("disposable", "إيميل مؤقت");
            result.is_disposable = true;
            return result;
        }

        if let Some(fixed) = self.typo_correction(domain) {
            let suggestion = format!("{}@{}", local, fixed);
            let mut result = match self.policy.typo {
                TypoPolicy::RejectWithSuggestion => EmailResult::rejected(
                    "possible_typo",
                    format!("خطأ إملائي محتمل في النطاق، هل تقصد {}؟", suggestion),
                ),
                TypoPolicy::AutoCorrect => {
                    let mut corrected =
                        EmailResult::from_field(FieldResult::valid(&suggestion, "corrected"));
                    corrected.is_role_based = self.is_role_based(local);
                    corrected
                }
            };
            result.suggested_correction = Some(suggestion);
            return result;
        }

        let mut result = EmailResult::from_field(FieldResult::valid(email, "valid"));
        result.is_role_based = self.is_role_based(local);
        result.has_suspicious_chars = self.has_suspicious_chars(email);
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cleaners::FieldStatus;

    fn clean(raw: &str) -> EmailResult {
        EmailCleaner::new().clean_str(raw)
    }

    #[test]
    fn test_valid_email() {
        let result = clean("  Ahmed.Ali@Example.COM ");
        assert_eq!(result.field.status(), FieldStatus::Valid);
        assert_eq!(result.field.clean(), "ahmed.ali@example.com");
        assert!(!result.is_role_based);
        assert!(!result.has_suspicious_chars);
    }

    #[test]
    fn test_role_based_is_flagged_not_rejected() {
        let result = clean("admin@company.com");
        assert_eq!(result.field.status(), FieldStatus::Valid);
        assert!(result.is_role_based);
    }

    #[test]
    fn test_typo_rejected_with_suggestion() {
        let result = clean("user@gmial.com");
        assert_eq!(result.field.status(), FieldStatus::Error);
        assert_eq!(result.field.category(), "possible_typo");
        assert_eq!(result.suggested_correction.as_deref(), Some("user@gmail.com"));
        assert!(result.field.clean().is_empty());
    }

    #[test]
    fn test_typo_auto_corrected() {
        let cleaner = EmailCleaner::new().with_policy(EmailPolicy {
            typo: TypoPolicy::AutoCorrect,
        });
        let result = cleaner.clean_str("user@gmial.com");
        assert_eq!(result.field.status(), FieldStatus::Valid);
        assert_eq!(result.field.clean(), "user@gmail.com");
        assert_eq!(result.suggested_correction.as_deref(), Some("user@gmail.com"));
    }

    #[test]
    fn test_case_variants_clean_identically() {
        for raw in ["Sara@Mail.com", "info@Company.SA", "user@gmial.com"] {
            assert_eq!(clean(raw), clean(&raw.to_uppercase()), "input {}", raw);
        }
    }

    #[test]
    fn test_check_order() {
        let cases = [
            ("a'b@x.com", "suspicious_chars"),
            ("a;b c@x.com", "suspicious_chars"),
            ("#n/a", "excel_error"),
            ("a b@x.com", "contains_spaces"),
            ("a@b", "invalid_length"),
            ("abcdef", "missing_symbols"),
            ("a@b@c.com", "multiple_at"),
            ("@example.com", "wrong_at_position"),
            ("user.name@localhost", "no_dot_in_domain"),
            ("user@example.com.", "wrong_dot_position"),
            ("user..name@example.com", "consecutive_dots"),
            (".user@example.com", "invalid_local_part"),
            ("user@example.c", "short_tld"),
            ("us(er)@example.com", "invalid_characters"),
            ("someone@mailinator.com", "disposable"),
        ];
        for (raw, category) in cases {
            assert_eq!(clean(raw).field.category(), category, "input {}", raw);
        }
    }

    #[test]
    fn test_disposable_flag() {
        let result = clean("x@yopmail.com");
        assert!(result.is_disposable);
        assert_eq!(result.field.status(), FieldStatus::Error);
    }

    #[test]
    fn test_empty_and_wrong_types() {
        let cleaner = EmailCleaner::new();
        assert_eq!(cleaner.clean(&Value::Null).field.status(), FieldStatus::Optional);
        assert_eq!(cleaner.clean_str("   ").field.status(), FieldStatus::Optional);

        let number = cleaner.clean(&Value::Number(12.0));
        assert_eq!(number.field.category(), "invalid_type");
        assert!(number.field.error_message().contains("12"));

        let list = cleaner.clean(&Value::List(vec![Value::from("a@b.com")]));
        assert_eq!(list.field.category(), "invalid_type");
        assert_ne!(list.field.error_message(), number.field.error_message());
    }
}
