// 🧹 Field Cleaners - per-field validators returning status/category pairs
//
// A cleaner never fails: every input maps to exactly one FieldResult whose
// status is valid, error or optional. The constructors below are the only
// way to build one, so the status/clean/error combination is always coherent.

pub mod company;
pub mod email;
pub mod name;
pub mod phone;

use serde::{Deserialize, Serialize};
use std::fmt;

pub use company::{CompanyCleaner, CompanyResult};
pub use email::{EmailCleaner, EmailResult};
pub use name::{NameCleaner, NameResult};
pub use phone::{PhoneCleaner, PhoneResult, PhoneType};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldStatus {
    Valid,
    Error,
    /// Input was empty or absent; not counted as an error
    Optional,
}

impl FieldStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            FieldStatus::Valid => "valid",
            FieldStatus::Error => "error",
            FieldStatus::Optional => "optional",
        }
    }
}

impl fmt::Display for FieldStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Common part of every cleaner's output
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldResult {
    clean: String,
    status: FieldStatus,
    error: String,
    category: String,
}

impl FieldResult {
    /// Accepted value. An empty `clean` would break the valid invariant,
    /// so it is downgraded to an error.
    pub fn valid(clean: impl Into<String>, category: impl Into<String>) -> Self {
        let clean = clean.into();
        if clean.is_empty() {
            return FieldResult::error("empty", "قيمة فارغة بعد التنظيف");
        }
        FieldResult {
            clean,
            status: FieldStatus::Valid,
            error: String::new(),
            category: category.into(),
        }
    }

    /// Rejected value with a user-facing message
    pub fn error(category: impl Into<String>, message: impl Into<String>) -> Self {
        let mut error = message.into();
        if error.is_empty() {
            error = "قيمة غير صالحة".to_string();
        }
        FieldResult {
            clean: String::new(),
            status: FieldStatus::Error,
            error,
            category: category.into(),
        }
    }

    pub fn optional() -> Self {
        FieldResult {
            clean: String::new(),
            status: FieldStatus::Optional,
            error: String::new(),
            category: "empty".to_string(),
        }
    }

    pub fn clean(&self) -> &str {
        &self.clean
    }

    pub fn status(&self) -> FieldStatus {
        self.status
    }

    pub fn error_message(&self) -> &str {
        &self.error
    }

    pub fn category(&self) -> &str {
        &self.category
    }

    pub fn is_valid(&self) -> bool {
        self.status == FieldStatus::Valid
    }
}
