// src/table/record.rs
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Positional fields that follow an anchor cell, in column order.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Field {
    NumericCode,
    CountryOrRegion,
    UnitRelation,
    BuyRate,
    SellRate,
}

impl Field {
    /// Map an offset-from-anchor to the field it carries. Offsets outside 1..=5
    /// belong to unused columns.
    pub fn from_offset(offset: usize) -> Option<Self> {
        match offset {
            1 => Some(Field::NumericCode),
            2 => Some(Field::CountryOrRegion),
            3 => Some(Field::UnitRelation),
            4 => Some(Field::BuyRate),
            5 => Some(Field::SellRate),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Field::NumericCode => "numeric_code",
            Field::CountryOrRegion => "country_or_region",
            Field::UnitRelation => "unit_relation",
            Field::BuyRate => "buy_rate",
            Field::SellRate => "sell_rate",
        }
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A cell that sat in a numeric column but did not parse. The field itself keeps
/// its previous value; this is the only trace of the failure. Dropped again
/// once a later cell fills the field.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldParseFailure {
    pub field: Field,
    pub raw: String,
}

/// One row of the exchange-rate list.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CurrencyRecord {
    /// Currency symbol, e.g. "EUR".
    pub code: String,
    /// Bank-assigned numeric identifier (ISO 4217 number on the NBS page).
    pub numeric_code: i64,
    pub country_or_region: String,
    /// Rates are quoted per this many units.
    pub unit_relation: i64,
    pub buy_rate: Decimal,
    pub sell_rate: Decimal,
    /// Pass time, set once the record was anchored in the page.
    pub observed_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub parse_failures: Vec<FieldParseFailure>,
}

impl CurrencyRecord {
    /// Skeleton record: everything zero or empty except the code.
    pub fn skeleton(code: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            numeric_code: 0,
            country_or_region: String::new(),
            unit_relation: 0,
            buy_rate: Decimal::ZERO,
            sell_rate: Decimal::ZERO,
            observed_at: None,
            parse_failures: Vec::new(),
        }
    }

    /// True when the code was seen as an anchor during the pass.
    pub fn is_observed(&self) -> bool {
        self.observed_at.is_some()
    }
}
