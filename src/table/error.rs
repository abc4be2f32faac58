// src/table/error.rs
use thiserror::Error;

/// Errors that stop a pass before any cell is submitted.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TableError {
    /// The tracked-code list was empty after trimming blanks.
    #[error("configuration error: tracked currency code list is empty")]
    EmptyTrackedCodes,
}
