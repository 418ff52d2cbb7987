//! Reference data: country, currency, and language definitions
//!
//! Date/time patterns arrive from the backend in Java `SimpleDateFormat`
//! notation and are normalized once to display notation when the languages
//! list is ingested into the state container.

use serde::{Deserialize, Serialize};

/// Currency attached to a country definition
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Currency {
    /// ISO 4217 code
    #[serde(rename = "iSOCode")]
    pub iso_code: String,
    /// Standard number of decimal places
    pub std_precision: u32,
}

impl Default for Currency {
    /// Fallback used by the currency getter before a country is loaded
    fn default() -> Self {
        Self {
            iso_code: "USD".to_string(),
            std_precision: 2,
        }
    }
}

/// Country definition resolved from the session context
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Country {
    pub id: i32,
    pub uuid: String,
    pub name: String,
    /// Locale in underscore form, e.g. `en_US`
    pub language: String,
    pub currency: Option<Currency>,
}

impl Country {
    /// Locale tag in hyphen form, e.g. `en-US`
    pub fn language_tag(&self) -> String {
        self.language.replace('_', "-")
    }
}

/// A supported language with its display formats
///
/// The full list is immutable once loaded.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct LanguageDefinition {
    /// Locale in underscore form, e.g. `en_US`
    pub language: String,
    pub language_name: String,
    pub date_pattern: String,
    pub time_pattern: String,
}

impl LanguageDefinition {
    /// Return a copy with date/time patterns normalized to display form
    pub fn normalized(mut self) -> Self {
        self.date_pattern = normalize_display_pattern(&self.date_pattern);
        self.time_pattern = normalize_display_pattern(&self.time_pattern);
        self
    }
}

/// Convert a Java `SimpleDateFormat` pattern to the display notation the
/// console's formatters expect (`yyyy` → `YYYY`, `dd` → `DD`, `aa` → `A`).
pub fn normalize_display_pattern(pattern: &str) -> String {
    let mut out = String::with_capacity(pattern.len());
    let mut chars = pattern.chars().peekable();
    while let Some(c) = chars.next() {
        match c {
            'y' => out.push('Y'),
            'd' => out.push('D'),
            'a' => {
                // Java repeats the meridiem letter; display form uses one 'A'
                while chars.peek() == Some(&'a') {
                    chars.next();
                }
                out.push('A');
            }
            other => out.push(other),
        }
    }
    out
}
