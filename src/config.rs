// ⚙️ Configuration - which stages run, field policies, TOML loading
// Every field is defaulted so a partial file (or no file) is always usable

use crate::error::{CleanerError, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

// ============================================================================
// FIELD POLICIES
// ============================================================================

/// What to do with a number that resolves to a landline prefix
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LandlinePolicy {
    #[default]
    Accept,
    Reject,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PhonePolicy {
    pub landline: LandlinePolicy,
}

/// What to do with an address whose domain is a known misspelling
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TypoPolicy {
    #[default]
    RejectWithSuggestion,
    AutoCorrect,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct EmailPolicy {
    pub typo: TypoPolicy,
}

// ============================================================================
// STAGE SETTINGS
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DuplicateSettings {
    /// Key columns; empty means "every cleaned phone and email column"
    pub key_columns: Vec<String>,

    /// Rows whose key values are all blank are never grouped together (default on)
    pub skip_blank_keys: bool,
}

impl Default for DuplicateSettings {
    fn default() -> Self {
        DuplicateSettings {
            key_columns: Vec::new(),
            skip_blank_keys: true,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ColumnOverrides {
    /// Employee-count column for size classification
    pub employees: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CleaningSettings {
    pub detect_columns: bool,
    pub clean_phones: bool,
    pub clean_emails: bool,
    pub clean_names: bool,
    pub clean_companies: bool,
    pub classify_geographic: bool,
    pub classify_industry: bool,
    pub classify_size: bool,
    pub remove_duplicates: bool,
    pub max_rows: usize,

    pub phone: PhonePolicy,
    pub email: EmailPolicy,
    pub duplicates: DuplicateSettings,
    pub columns: ColumnOverrides,
}

impl Default for CleaningSettings {
    fn default() -> Self {
        CleaningSettings {
            detect_columns: true,
            clean_phones: true,
            clean_emails: true,
            clean_names: false,
            clean_companies: false,
            classify_geographic: true,
            classify_industry: false,
            classify_size: false,
            remove_duplicates: true,
            max_rows: 100_000,
            phone: PhonePolicy::default(),
            email: EmailPolicy::default(),
            duplicates: DuplicateSettings::default(),
            columns: ColumnOverrides::default(),
        }
    }
}

impl CleaningSettings {
    /// Every cleaner and classifier switched on
    pub fn all_stages() -> Self {
        CleaningSettings {
            clean_names: true,
            clean_companies: true,
            classify_industry: true,
            classify_size: true,
            ..Default::default()
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.max_rows == 0 {
            return Err(CleanerError::Config("max_rows must be greater than zero".into()));
        }
        Ok(())
    }
}

// ============================================================================
// APPLICATION CONFIG
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub database_path: PathBuf,
    pub cleaning: CleaningSettings,
}

impl Default for AppConfig {
    fn default() -> Self {
        AppConfig {
            database_path: PathBuf::from("contact_cleaner.db"),
            cleaning: CleaningSettings::default(),
        }
    }
}

impl AppConfig {
    pub fn from_toml_str(text: &str) -> Result<Self> {
        let config: AppConfig = toml::from_str(text)?;
        config.cleaning.validate()?;
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_toml_str(&text)
    }
}
