// 👤 Name Normalizer - titles, embedded phones, letters only, Title Case

use super::FieldResult;
use crate::record::Value;
use crate::reference::ReferenceData;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;

const MIN_NAME_CHARS: usize = 2;
const MIN_PHONE_DIGITS: usize = 8;

static PHONE_RUN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\+?[\d\s\-()]{8,}").expect("phone run pattern compiles"));
static DIGITS: Lazy<Regex> = Lazy::new(|| Regex::new(r"\d+").expect("digits pattern compiles"));
static NON_LETTERS: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"[^a-zA-Z\x{0600}-\x{06FF}\s]").expect("letters pattern compiles")
});
static WHITESPACE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\s+").expect("whitespace pattern compiles"));

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NameResult {
    #[serde(flatten)]
    pub field: FieldResult,

    /// Phone-like digit run found inside the name, reported as-is
    #[serde(skip_serializing_if = "Option::is_none")]
    pub extracted_phone: Option<String>,
}

pub struct NameCleaner<'a> {
    reference: &'a ReferenceData,
}

impl NameCleaner<'static> {
    pub fn new() -> Self {
        NameCleaner::with_reference(ReferenceData::builtin())
    }
}

impl Default for NameCleaner<'static> {
    fn default() -> Self {
        Self::new()
    }
}

impl<'a> NameCleaner<'a> {
    pub fn with_reference(reference: &'a ReferenceData) -> Self {
        NameCleaner { reference }
    }

    pub fn clean_str(&self, raw: &str) -> NameResult {
        self.clean(&Value::from(raw))
    }

    pub fn clean(&self, raw: &Value) -> NameResult {
        if raw.is_blank() {
            return NameResult {
                field: FieldResult::optional(),
                extracted_phone: None,
            };
        }

        let text = raw.to_text();
        let name = text.trim();

        if self.reference.contains_bad_data_marker(name) {
            return NameResult {
                field: FieldResult::error("bad_data", "بيانات خاطئة"),
                extracted_phone: None,
            };
        }

        let (name, extracted_phone) = split_embedded_phone(name);
        let name = self.strip_titles(&name);
        let name = DIGITS.replace_all(name, "");
        let name = NON_LETTERS.replace_all(&name, "");
        let name = WHITESPACE.replace_all(&name, " ");
        let name = name.trim();

        let field = if name.chars().count() < MIN_NAME_CHARS {
            FieldResult::error("too_short", "اسم قصير جداً")
        } else {
            FieldResult::valid(title_case(name), "valid")
        };

        NameResult {
            field,
            extracted_phone,
        }
    }

    /// Drop leading honorifics ("Dr.", "المهندس", ...) until none is left
    fn strip_titles<'n>(&self, name: &'n str) -> &'n str {
        let mut rest = name.trim();
        loop {
            let stripped = self
                .reference
                .name
                .titles
                .iter()
                .find_map(|title| strip_word_prefix(rest, title));
            match stripped {
                Some(next) => rest = next,
                None => return rest,
            }
        }
    }
}

/// Remove the first phone-like run with at least 8 digits
fn split_embedded_phone(name: &str) -> (String, Option<String>) {
    let found = PHONE_RUN
        .find_iter(name)
        .find(|m| m.as_str().chars().filter(|c| c.is_numeric()).count() >= MIN_PHONE_DIGITS);

    match found {
        Some(m) => {
            let mut rest = String::with_capacity(name.len());
            rest.push_str(&name[..m.start()]);
            rest.push(' ');
            rest.push_str(&name[m.end()..]);
            (rest.trim().to_string(), Some(m.as_str().trim().to_string()))
        }
        None => (name.to_string(), None),
    }
}

/// `text` without a leading `word` (ASCII case-insensitive) followed by whitespace
fn strip_word_prefix<'t>(text: &'t str, word: &str) -> Option<&'t str> {
    let head = text.get(..word.len())?;
    if !head.eq_ignore_ascii_case(word) {
        return None;
    }
    let tail = &text[word.len()..];
    if tail.starts_with(char::is_whitespace) {
        Some(tail.trim_start())
    } else {
        None
    }
}

fn title_case(name: &str) -> String {
    name.split(' ')
        .filter(|w| !w.is_empty())
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first
                    .to_uppercase()
                    .chain(chars.flat_map(char::to_lowercase))
                    .collect(),
                None => String::new(),
            }
        })
        .collect::<Vec<String>>()
        .join(" ")
}
