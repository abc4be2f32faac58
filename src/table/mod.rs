// src/table/mod.rs
//! Positional table-to-record mapping.
//!
//! The rate table is consumed as a flat list of `<td>` texts; row boundaries are
//! recovered from currency-code anchors, see [`TableStreamParser`].

pub mod codes;
pub mod error;
pub mod parser;
pub mod record;
pub mod registry;

pub use codes::{TrackedCodes, DEFAULT_TRACKED_CODES};
pub use error::TableError;
pub use parser::{CellOutcome, CellTally, TableStreamParser};
pub use record::{CurrencyRecord, Field, FieldParseFailure};
pub use registry::Registry;
