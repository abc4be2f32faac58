// src/table/parser.rs
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::{collections::HashSet, str::FromStr};
use tracing::{debug, trace};

use super::codes::TrackedCodes;
use super::record::{Field, FieldParseFailure};
use super::registry::Registry;

/// What happened to a single submitted cell.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CellOutcome {
    /// Cell text matched a tracked code; the cursor now points at that record.
    Anchor,
    /// Cell value was written into the active record.
    Written(Field),
    /// Numeric column did not parse; field left as it was.
    ParseFailed(Field),
    /// Field was already written earlier in this pass (repeated anchor).
    AlreadyWritten(Field),
    /// Offset past the last known column.
    Ignored,
    /// No anchor seen yet in this pass.
    Unattributed,
}

/// Per-pass cell counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CellTally {
    pub cells: usize,
    pub anchors: usize,
    pub written: usize,
    pub parse_failures: usize,
    pub already_written: usize,
    pub ignored: usize,
    pub unattributed: usize,
}

impl CellTally {
    fn count(&mut self, outcome: CellOutcome) {
        self.cells += 1;
        match outcome {
            CellOutcome::Anchor => self.anchors += 1,
            CellOutcome::Written(_) => self.written += 1,
            CellOutcome::ParseFailed(_) => self.parse_failures += 1,
            CellOutcome::AlreadyWritten(_) => self.already_written += 1,
            CellOutcome::Ignored => self.ignored += 1,
            CellOutcome::Unattributed => self.unattributed += 1,
        }
    }
}

#[derive(Debug, Default)]
struct Cursor {
    /// Registry slot of the record being filled.
    active: Option<usize>,
    /// Cells seen since the last anchor.
    offset: usize,
}

/// Rebuilds rows from a flat, document-ordered stream of table cell texts.
///
/// A cell whose trimmed text equals a tracked currency code is an anchor: it
/// selects that code's record and resets the column offset. Every following
/// cell is attributed, by its offset from the anchor, to one of the record's
/// fields until the next anchor arrives:
///
/// | offset | field               | parsing                           |
/// |--------|---------------------|-----------------------------------|
/// | 1      | `numeric_code`      | integer                           |
/// | 2      | `country_or_region` | verbatim                          |
/// | 3      | `unit_relation`     | integer                           |
/// | 4      | `buy_rate`          | decimal, `,` as decimal separator |
/// | 5      | `sell_rate`         | decimal, `,` as decimal separator |
///
/// Bad numbers never abort the pass. The parser assumes cells arrive in
/// document order and does not try to repair a shuffled stream.
#[derive(Debug)]
pub struct TableStreamParser {
    registry: Registry,
    cursor: Cursor,
    pass_time: DateTime<Utc>,
    written: HashSet<(usize, Field)>,
    tally: CellTally,
}

impl TableStreamParser {
    /// Start a pass stamped with the current wall-clock time.
    pub fn initialize(codes: &TrackedCodes) -> Self {
        Self::with_pass_time(codes, Utc::now())
    }

    /// Start a pass with an explicit pass time.
    pub fn with_pass_time(codes: &TrackedCodes, pass_time: DateTime<Utc>) -> Self {
        Self {
            registry: Registry::initialize(codes),
            cursor: Cursor::default(),
            pass_time,
            written: HashSet::new(),
            tally: CellTally::default(),
        }
    }

    pub fn pass_time(&self) -> DateTime<Utc> {
        self.pass_time
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    pub fn tally(&self) -> CellTally {
        self.tally
    }

    /// Feed the next cell in document order.
    pub fn submit_cell(&mut self, text: &str) -> CellOutcome {
        let outcome = self.route(text);
        self.tally.count(outcome);
        outcome
    }

    /// Feed a whole stream of cells.
    pub fn submit_all<I, S>(&mut self, cells: I)
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        for cell in cells {
            self.submit_cell(cell.as_ref());
        }
    }

    /// End of pass: hand the registry over to the sink.
    pub fn finalize(self) -> Registry {
        debug!(
            cells = self.tally.cells,
            anchors = self.tally.anchors,
            observed = self.registry.observed_count(),
            "table stream finalized"
        );
        self.registry
    }

    /// Like `finalize`, but also returns the cell counters.
    pub fn finalize_with_tally(self) -> (Registry, CellTally) {
        let tally = self.tally;
        (self.finalize(), tally)
    }

    fn route(&mut self, text: &str) -> CellOutcome {
        if let Some(slot) = self.registry.position(text.trim()) {
            self.cursor.active = Some(slot);
            self.cursor.offset = 0;
            self.registry.slot_mut(slot).observed_at = Some(self.pass_time);
            trace!(code = text.trim(), "anchor");
            return CellOutcome::Anchor;
        }

        self.cursor.offset += 1;

        let Some(slot) = self.cursor.active else {
            return CellOutcome::Unattributed;
        };
        let Some(field) = Field::from_offset(self.cursor.offset) else {
            return CellOutcome::Ignored;
        };
        if self.written.contains(&(slot, field)) {
            return CellOutcome::AlreadyWritten(field);
        }

        let pass_time = self.pass_time;
        let record = self.registry.slot_mut(slot);
        let applied = match field {
            Field::NumericCode => parse_integer(text).map(|v| record.numeric_code = v),
            Field::CountryOrRegion => {
                record.country_or_region = text.to_string();
                Some(())
            }
            Field::UnitRelation => parse_integer(text).map(|v| record.unit_relation = v),
            Field::BuyRate => parse_rate(text).map(|v| record.buy_rate = v),
            Field::SellRate => parse_rate(text).map(|v| record.sell_rate = v),
        };

        match applied {
            Some(()) => {
                record.observed_at = Some(pass_time);
                record.parse_failures.retain(|f| f.field != field);
                self.written.insert((slot, field));
                CellOutcome::Written(field)
            }
            None => {
                debug!(code = %record.code, %field, raw = text, "field did not parse");
                record.parse_failures.push(FieldParseFailure {
                    field,
                    raw: text.to_string(),
                });
                CellOutcome::ParseFailed(field)
            }
        }
    }
}

fn parse_integer(text: &str) -> Option<i64> {
    text.trim().parse().ok()
}

/// Decimal with `,` as the decimal separator, e.g. "117,5".
fn parse_rate(text: &str) -> Option<Decimal> {
    Decimal::from_str(&text.trim().replace(',', ".")).ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use rust_decimal_macros::dec;
    use tracing_subscriber::{EnvFilter, FmtSubscriber};

    fn init_test_logging() {
        let subscriber = FmtSubscriber::builder()
            .with_env_filter(
                EnvFilter::try_from_default_env()
                    .unwrap_or_else(|_| EnvFilter::new("info,ratescraper::table=trace")),
            )
            .with_test_writer()
            .finish();
        let _ = tracing::subscriber::set_global_default(subscriber);
    }

    fn codes(list: &str) -> TrackedCodes {
        TrackedCodes::parse_list(list).unwrap()
    }

    fn run(list: &str, cells: &[&str]) -> Registry {
        let mut parser = TableStreamParser::initialize(&codes(list));
        parser.submit_all(cells);
        parser.finalize()
    }

    #[test]
    fn test_full_row() {
        let reg = run("EUR,USD", &["EUR", "940", "Eurozone", "1", "117,5", "118,2"]);
        let eur = reg.get("EUR").unwrap();
        assert_eq!(eur.numeric_code, 940);
        assert_eq!(eur.country_or_region, "Eurozone");
        assert_eq!(eur.unit_relation, 1);
        assert_eq!(eur.buy_rate, dec!(117.5));
        assert_eq!(eur.sell_rate, dec!(118.2));
        assert!(eur.observed_at.is_some());
        assert!(eur.parse_failures.is_empty());
    }

    #[test]
    fn test_absent_codes_stay_skeleton() {
        let reg = run("EUR,USD,CHF", &["EUR", "978", "EMU", "1", "117,1", "117,5"]);
        let skeleton = Registry::initialize(&codes("EUR,USD,CHF"));
        assert_eq!(reg.get("USD"), skeleton.get("USD"));
        assert_eq!(reg.get("CHF"), skeleton.get("CHF"));
        assert_eq!(reg.observed_count(), 1);
    }

    #[test]
    fn test_anchor_resets_offset() {
        let reg = run("EUR,USD", &["EUR", "USD", "123"]);
        assert_eq!(reg.get("USD").unwrap().numeric_code, 123);
        assert_eq!(reg.get("EUR").unwrap().unit_relation, 0);
        assert_eq!(reg.get("EUR").unwrap().numeric_code, 0);
    }

    #[test]
    fn test_anchor_is_trimmed() {
        let reg = run("EUR", &["  EUR\n", "978"]);
        assert_eq!(reg.get("EUR").unwrap().numeric_code, 978);
    }

    #[test]
    fn test_malformed_numeric_does_not_abort() {
        init_test_logging();
        let reg = run("EUR", &["EUR", "abc", "X", "2", "10,0", "10,5"]);
        let eur = reg.get("EUR").unwrap();
        assert_eq!(eur.numeric_code, 0);
        assert_eq!(eur.country_or_region, "X");
        assert_eq!(eur.unit_relation, 2);
        assert_eq!(eur.buy_rate, dec!(10.0));
        assert_eq!(eur.sell_rate, dec!(10.5));
        assert_eq!(
            eur.parse_failures,
            vec![FieldParseFailure {
                field: Field::NumericCode,
                raw: "abc".to_string()
            }]
        );
        assert_eq!(reg.parse_failure_count(), 1);
    }

    #[test]
    fn test_extra_columns_are_ignored() {
        let reg = run(
            "EUR,USD",
            &[
                "EUR", "978", "EMU", "1", "117,1", "117,5", "extra", "999", "USD", "840", "США",
                "1", "99,5", "100,1",
            ],
        );
        let eur = reg.get("EUR").unwrap();
        assert_eq!(eur.sell_rate, dec!(117.5));
        assert_eq!(eur.numeric_code, 978);
        let usd = reg.get("USD").unwrap();
        assert_eq!(usd.numeric_code, 840);
        assert_eq!(usd.country_or_region, "США");
        assert_eq!(usd.sell_rate, dec!(100.1));
    }

    #[test]
    fn test_cells_before_first_anchor_are_discarded() {
        init_test_logging();
        let mut parser = TableStreamParser::initialize(&codes("EUR"));
        assert_eq!(parser.submit_cell("Oznaka valute"), CellOutcome::Unattributed);
        assert_eq!(parser.submit_cell("978"), CellOutcome::Unattributed);
        assert_eq!(parser.submit_cell("EUR"), CellOutcome::Anchor);
        assert_eq!(
            parser.submit_cell("978"),
            CellOutcome::Written(Field::NumericCode)
        );
        let tally = parser.tally();
        assert_eq!(tally.unattributed, 2);
        assert_eq!(tally.anchors, 1);
        assert_eq!(tally.written, 1);
        assert_eq!(tally.cells, 4);
    }

    #[test]
    fn test_country_written_verbatim() {
        let reg = run("EUR", &["EUR", "978", "  EMU \t", "1"]);
        assert_eq!(reg.get("EUR").unwrap().country_or_region, "  EMU \t");
    }

    #[test]
    fn test_observed_at_uses_pass_time() {
        let t = Utc.with_ymd_and_hms(2024, 5, 1, 8, 0, 0).unwrap();
        let mut parser = TableStreamParser::with_pass_time(&codes("EUR,USD"), t);
        parser.submit_all(["EUR"]);
        let reg = parser.finalize();
        assert_eq!(reg.get("EUR").unwrap().observed_at, Some(t));
        assert_eq!(reg.get("USD").unwrap().observed_at, None);
    }

    #[test]
    fn test_repeated_anchor_does_not_overwrite() {
        let mut parser = TableStreamParser::initialize(&codes("EUR"));
        parser.submit_all(["EUR", "978", "EMU", "1", "117,1", "117,5"]);
        parser.submit_cell("EUR");
        assert_eq!(
            parser.submit_cell("111"),
            CellOutcome::AlreadyWritten(Field::NumericCode)
        );
        let reg = parser.finalize();
        assert_eq!(reg.get("EUR").unwrap().numeric_code, 978);
    }

    #[test]
    fn test_failed_field_can_be_filled_by_later_anchor() {
        let reg = run("EUR", &["EUR", "n/a", "EUR", "978", "EMU", "1", "1,0", "2,0"]);
        let eur = reg.get("EUR").unwrap();
        assert_eq!(eur.numeric_code, 978);
        assert!(eur.parse_failures.is_empty());
        assert_eq!(reg.parse_failure_count(), 0);
    }

    #[test]
    fn test_failure_kept_when_field_never_filled() {
        let reg = run("EUR", &["EUR", "n/a", "EMU", "1", "EUR", "x"]);
        let eur = reg.get("EUR").unwrap();
        assert_eq!(eur.numeric_code, 0);
        assert_eq!(
            eur.parse_failures,
            vec![
                FieldParseFailure {
                    field: Field::NumericCode,
                    raw: "n/a".to_string()
                },
                FieldParseFailure {
                    field: Field::NumericCode,
                    raw: "x".to_string()
                },
            ]
        );
    }

    #[test]
    fn test_reordered_stream_is_not_repaired() {
        let reg = run("EUR", &["940", "EUR", "Eurozone", "1", "117,5", "118,2"]);
        let eur = reg.get("EUR").unwrap();
        // "Eurozone" lands in the numeric column and everything shifts left.
        assert_eq!(eur.numeric_code, 0);
        assert_eq!(eur.country_or_region, "1");
        assert_eq!(eur.unit_relation, 0);
        assert_eq!(eur.buy_rate, dec!(118.2));
        assert_eq!(eur.sell_rate, Decimal::ZERO);
        assert_eq!(eur.parse_failures.len(), 2);
    }

    #[test]
    fn test_rate_parsing() {
        assert_eq!(parse_rate("117,5"), Some(dec!(117.5)));
        assert_eq!(parse_rate(" 0,7312 "), Some(dec!(0.7312)));
        assert_eq!(parse_rate("118.2"), Some(dec!(118.2)));
        assert_eq!(parse_rate("1.234,56"), None);
        assert_eq!(parse_rate(""), None);
        assert_eq!(parse_integer(" 100 "), Some(100));
        assert_eq!(parse_integer("1,0"), None);
    }
}
