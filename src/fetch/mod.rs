// src/fetch/mod.rs
//! Page retrieval and markup traversal: everything that produces the ordered
//! cell stream for the table parser.

use anyhow::{Context, Result};
use reqwest::Client;
use std::time::Duration;

pub mod cells;
pub mod page;

pub use cells::table_cells;
pub use page::{ensure_allowed, fetch_page};

/// HTTP client shared by all passes.
pub fn build_client(timeout: Duration) -> Result<Client> {
    Client::builder()
        .timeout(timeout)
        .cookie_store(true)
        .gzip(true)
        .user_agent(concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")))
        .build()
        .context("building HTTP client")
}
