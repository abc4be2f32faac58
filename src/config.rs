// src/config.rs
//! Environment based configuration.

use anyhow::{Context, Result};
use std::{path::PathBuf, time::Duration};
use url::Url;

use crate::table::TrackedCodes;

/// NBS foreign-currency exchange list (Latin script).
pub const DEFAULT_PAGE_URL: &str = "https://nbs.rs/kursnaListaModul/zaDevize.faces?lang=lat";

#[derive(Debug, Clone)]
pub struct ScraperConfig {
    /// Page holding the rate table.
    pub page_url: Url,
    /// Codes used as row anchors; one record each per pass.
    pub tracked_codes: TrackedCodes,
    /// Hosts the fetcher may talk to.
    pub allowed_domains: Vec<String>,
    /// Root of the Parquet rate store.
    pub output_dir: PathBuf,
    /// Hours between passes in daemon mode.
    pub interval_hours: u64,
    pub request_timeout_secs: u64,
    /// Refuse to persist a pass in which any field failed to parse.
    pub strict: bool,
}

impl ScraperConfig {
    /// Load `.env` (if present) and read `RATES_*` variables.
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from an arbitrary key lookup; unset keys fall back to defaults.
    pub fn from_lookup<F>(get: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let page_url = get("RATES_PAGE_URL").unwrap_or_else(|| DEFAULT_PAGE_URL.to_string());
        let page_url =
            Url::parse(&page_url).with_context(|| format!("parsing RATES_PAGE_URL {}", page_url))?;

        let tracked_codes = match get("RATES_TRACKED_CODES") {
            Some(list) => TrackedCodes::parse_list(&list).context("reading RATES_TRACKED_CODES")?,
            None => TrackedCodes::default(),
        };

        let allowed_domains = get("RATES_ALLOWED_DOMAINS")
            .unwrap_or_else(|| "nbs.rs".to_string())
            .split(',')
            .map(str::trim)
            .filter(|d| !d.is_empty())
            .map(str::to_string)
            .collect();

        Ok(Self {
            page_url,
            tracked_codes,
            allowed_domains,
            output_dir: get("RATES_OUTPUT_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from("rates")),
            interval_hours: parse_or(&get, "RATES_INTERVAL_HOURS", 24),
            request_timeout_secs: parse_or(&get, "RATES_REQUEST_TIMEOUT_SECS", 30),
            strict: get("RATES_STRICT")
                .map(|v| v == "true" || v == "1")
                .unwrap_or(false),
        })
    }

    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_hours.max(1).saturating_mul(60 * 60))
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

/// Parse a value, falling back to `default` when unset or malformed.
fn parse_or<F, T>(get: &F, key: &str, default: T) -> T
where
    F: Fn(&str) -> Option<String>,
    T: std::str::FromStr,
{
    get(key).and_then(|v| v.trim().parse().ok()).unwrap_or(default)
}
