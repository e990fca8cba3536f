// 🌍 Geographic Classifier - country from dialing code, Saudi region from city

use crate::countries::CountryRegistry;
use serde::Serialize;

const SAUDI_CODE: &str = "966";
const UNKNOWN_AR: &str = "غير معروف";
const UNKNOWN_EN: &str = "Unknown";

/// Country lookup by dialing code alone
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PhoneGeography {
    pub country: String,
    pub country_en: String,
    pub country_code: String,
    /// Region names known for the country (may be empty)
    pub regions: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct GeoResult {
    pub country: String,
    pub country_en: String,
    pub country_code: String,
    pub region: String,
    pub city: String,
    pub confidence: f64,
}

pub struct GeographicClassifier<'a> {
    countries: &'a CountryRegistry,
}

impl GeographicClassifier<'static> {
    pub fn new() -> Self {
        GeographicClassifier::with_registry(CountryRegistry::builtin())
    }
}

impl Default for GeographicClassifier<'static> {
    fn default() -> Self {
        Self::new()
    }
}

impl<'a> GeographicClassifier<'a> {
    pub fn with_registry(countries: &'a CountryRegistry) -> Self {
        GeographicClassifier { countries }
    }

    pub fn classify_by_phone(&self, country_code: &str) -> PhoneGeography {
        match self.countries.lookup(country_code) {
            Some(profile) => PhoneGeography {
                country: profile.name.clone(),
                country_en: profile.name_en.clone(),
                country_code: country_code.to_string(),
                regions: profile.regions.iter().map(|r| r.name.clone()).collect(),
            },
            None => PhoneGeography {
                country: UNKNOWN_AR.to_string(),
                country_en: UNKNOWN_EN.to_string(),
                country_code: country_code.to_string(),
                regions: Vec::new(),
            },
        }
    }

    /// Region whose city list contains (or is contained in) `city`, case-insensitive
    pub fn find_saudi_region(&self, city: &str) -> Option<String> {
        let city = city.trim().to_lowercase();
        if city.is_empty() {
            return None;
        }

        let saudi = self.countries.lookup(SAUDI_CODE)?;
        saudi
            .regions
            .iter()
            .find(|region| {
                region.cities.iter().any(|known| {
                    let known = known.to_lowercase();
                    known.contains(&city) || city.contains(&known)
                })
            })
            .map(|region| region.name.clone())
    }

    /// Confidence 0.9 with a known code, 1.0 when a Saudi region is also resolved
    pub fn classify_location(
        &self,
        city: Option<&str>,
        region: Option<&str>,
        country_code: Option<&str>,
    ) -> GeoResult {
        let city = city.map(str::trim).unwrap_or_default();
        let region = region.map(str::trim).unwrap_or_default();
        let code = country_code.map(str::trim).unwrap_or_default();

        let mut result = GeoResult {
            country_code: code.to_string(),
            region: region.to_string(),
            city: city.to_string(),
            ..Default::default()
        };

        if code.is_empty() {
            return result;
        }

        if let Some(profile) = self.countries.lookup(code) {
            result.country = profile.name.clone();
            result.country_en = profile.name_en.clone();
            result.confidence = 0.9;

            if code == SAUDI_CODE && !city.is_empty() && region.is_empty() {
                if let Some(found) = self.find_saudi_region(city) {
                    result.region = found;
                    result.confidence = 1.0;
                }
            }
        }

        result
    }
}
