//! Scrapes the NBS foreign-currency exchange list into per-currency records.
//!
//! The rate table is read as a flat stream of cell texts ([`fetch`]), mapped
//! back into rows by the anchor-driven [`table::TableStreamParser`], and each
//! pass is persisted to a date-partitioned Parquet store ([`store`]).

pub mod config;
pub mod fetch;
pub mod pass;
pub mod schedule;
pub mod stats;
pub mod store;
pub mod table;

pub use config::ScraperConfig;
pub use stats::PassStats;
