// src/table/codes.rs
use serde::Serialize;

use super::error::TableError;

/// Currencies published on the NBS foreign-currency list that we track by default.
pub static DEFAULT_TRACKED_CODES: &[&str] = &[
    "EUR", "AUD", "CAD", "CNY", "HRK", "CZK", "DKK", "HUF", "INR", "JPY", "KWD", "NOK", "RUB",
    "SEK", "CHF", "GBP", "USD", "BYN", "RON", "TRY", "BGN", "BAM", "PLN",
];

/// Ordered, de-duplicated, non-empty list of currency codes that act as row anchors.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TrackedCodes {
    codes: Vec<String>,
}

impl TrackedCodes {
    /// Build from any list of codes. Blanks are dropped, duplicates keep their
    /// first position. Fails if nothing is left.
    pub fn new<I, S>(codes: I) -> Result<Self, TableError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut out: Vec<String> = Vec::new();
        for code in codes {
            let code = code.as_ref().trim();
            if code.is_empty() || out.iter().any(|c| c == code) {
                continue;
            }
            out.push(code.to_string());
        }
        if out.is_empty() {
            return Err(TableError::EmptyTrackedCodes);
        }
        Ok(Self { codes: out })
    }

    /// Parse a comma separated list such as `"EUR, USD,CHF"`.
    pub fn parse_list(list: &str) -> Result<Self, TableError> {
        Self::new(list.split(','))
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.codes.iter().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.codes.len()
    }

    /// Never true for a list built through `new`.
    pub fn is_empty(&self) -> bool {
        self.codes.is_empty()
    }

    pub fn contains(&self, code: &str) -> bool {
        self.codes.iter().any(|c| c == code)
    }
}

impl Default for TrackedCodes {
    fn default() -> Self {
        Self {
            codes: DEFAULT_TRACKED_CODES.iter().map(|c| c.to_string()).collect(),
        }
    }
}
