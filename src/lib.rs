// Contact Cleaner - Core Library
// Exposes all modules for use in the CLI, job runners, and tests

pub mod error;
pub mod record;
pub mod loader;
pub mod config;
pub mod countries;       // Dialing plans + Saudi regions
pub mod reference;       // Keyword / typo / disposable lists
pub mod cleaners;        // Phone, email, name, company
pub mod column_detector;
pub mod deduplication;
pub mod classifiers;     // Geographic, industry, size
pub mod data_quality;
pub mod pipeline;
pub mod jobs;
pub mod db;
pub mod logging;

// Re-export commonly used types
pub use error::{CleanerError, Result};
pub use record::{Record, Table, Value};
pub use loader::{load_csv, load_json, load_table};
pub use config::{
    AppConfig, CleaningSettings, ColumnOverrides, DuplicateSettings,
    EmailPolicy, LandlinePolicy, PhonePolicy, TypoPolicy,
};
pub use countries::{CountryProfile, CountryRegistry, Region};
pub use reference::ReferenceData;
pub use cleaners::{
    CompanyCleaner, CompanyResult, EmailCleaner, EmailResult,
    FieldResult, FieldStatus, NameCleaner, NameResult,
    PhoneCleaner, PhoneResult, PhoneType,
};
pub use column_detector::{
    ColumnDetection, ColumnDetector, ColumnType, DetectionMethod, Detections,
};
pub use deduplication::{
    DuplicateDetector, DuplicateGroup, FuzzyMatcher, LevenshteinRatio,
    MatchStrategy, SimilarityScorer,
};
pub use classifiers::{
    GeoResult, GeographicClassifier, PhoneGeography,
    IndustryClassifier, IndustryResult, SizeClassifier, SizeResult,
};
pub use data_quality::{quality_score, CleanedField, CleaningStatistics, FieldTally};
pub use pipeline::{CleaningOutcome, CleaningPipeline};
pub use jobs::{InMemoryJobStore, Job, JobReport, JobRunner, JobStatus, JobStore};
pub use db::SqliteJobStore;

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
