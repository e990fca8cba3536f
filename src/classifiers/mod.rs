// 🏷️ Classifiers - geography, industry and company size for cleaned rows

pub mod geographic;
pub mod industry;
pub mod size;

pub use geographic::{GeoResult, GeographicClassifier, PhoneGeography};
pub use industry::{IndustryClassifier, IndustryResult};
pub use size::{SizeClassifier, SizeResult};
