// 🏭 Industry Classifier - keyword scoring over company name + activity text

use crate::reference::{IndustryBucket, ReferenceData};
use serde::Serialize;

const SCORE_WEIGHT: f64 = 0.3;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IndustryResult {
    pub industry: String,
    pub industry_en: String,
    pub category: String,
    pub confidence: f64,
    pub matched_keywords: Vec<String>,
}

impl IndustryResult {
    pub fn unspecified() -> Self {
        IndustryResult {
            industry: "غير محدد".to_string(),
            industry_en: "Unspecified".to_string(),
            category: "unknown".to_string(),
            confidence: 0.0,
            matched_keywords: Vec::new(),
        }
    }

    fn from_bucket(bucket: &IndustryBucket, matched_keywords: Vec<String>) -> Self {
        let confidence = (matched_keywords.len() as f64 * SCORE_WEIGHT).min(1.0);
        IndustryResult {
            industry: bucket.industry.clone(),
            industry_en: bucket.name_en.clone(),
            category: bucket.category.clone(),
            confidence,
            matched_keywords,
        }
    }
}

pub struct IndustryClassifier<'a> {
    reference: &'a ReferenceData,
}

impl IndustryClassifier<'static> {
    pub fn new() -> Self {
        IndustryClassifier::with_reference(ReferenceData::builtin())
    }
}

impl Default for IndustryClassifier<'static> {
    fn default() -> Self {
        Self::new()
    }
}

impl<'a> IndustryClassifier<'a> {
    pub fn with_reference(reference: &'a ReferenceData) -> Self {
        IndustryClassifier { reference }
    }

    /// Highest keyword count wins; ties go to the bucket listed first
    pub fn classify(&self, company: &str, activity: Option<&str>) -> IndustryResult {
        let text = format!("{} {}", company, activity.unwrap_or_default()).to_lowercase();
        if text.trim().is_empty() {
            return IndustryResult::unspecified();
        }

        let mut best: Option<(&IndustryBucket, Vec<String>)> = None;
        for bucket in &self.reference.industries {
            let matched: Vec<String> = bucket
                .keywords
                .iter()
                .filter(|k| text.contains(&k.to_lowercase()))
                .cloned()
                .collect();

            let best_score = best.as_ref().map_or(0, |(_, m)| m.len());
            if matched.len() > best_score {
                best = Some((bucket, matched));
            }
        }

        match best {
            Some((bucket, matched)) => IndustryResult::from_bucket(bucket, matched),
            None => IndustryResult::unspecified(),
        }
    }
}
