// 📏 Size Classifier - employee-count thresholds

use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SizeResult {
    pub size: String,
    pub size_en: String,
    pub category: String,
    pub confidence: f64,
}

impl SizeResult {
    fn new(size: &str, size_en: &str, category: &str, confidence: f64) -> Self {
        SizeResult {
            size: size.to_string(),
            size_en: size_en.to_string(),
            category: category.to_string(),
            confidence,
        }
    }
}

pub struct SizeClassifier;

impl SizeClassifier {
    /// ≤5 micro, ≤49 small, ≤249 medium, else large. No count (or zero) → unspecified
    pub fn classify(employees: Option<u64>) -> SizeResult {
        match employees {
            None | Some(0) => SizeResult::new("غير محدد", "Unspecified", "unknown", 0.0),
            Some(n) if n <= 5 => SizeResult::new("متناهية الصغر", "Micro", "micro", 0.9),
            Some(n) if n <= 49 => SizeResult::new("صغيرة", "Small", "small", 0.9),
            Some(n) if n <= 249 => SizeResult::new("متوسطة", "Medium", "medium", 0.9),
            Some(_) => SizeResult::new("كبيرة", "Large", "large", 0.9),
        }
    }
}
