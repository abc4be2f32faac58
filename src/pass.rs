// src/pass.rs
//! One extraction pass: fetch → cells → parser → sink.

use anyhow::{bail, Result};
use chrono::{DateTime, Utc};
use reqwest::Client;
use std::time::Instant;
use tracing::{info, warn};

use crate::{
    config::ScraperConfig,
    fetch,
    stats::PassStats,
    store::RecordSink,
    table::{CellTally, Registry, TableStreamParser, TrackedCodes},
};

/// Run the table parser over a fetched page.
pub fn extract_registry(
    html: &str,
    codes: &TrackedCodes,
    pass_time: DateTime<Utc>,
) -> Result<(Registry, CellTally)> {
    let cells = fetch::table_cells(html)?;
    let mut parser = TableStreamParser::with_pass_time(codes, pass_time);
    parser.submit_all(&cells);
    Ok(parser.finalize_with_tally())
}

/// Log every record in tracked-code order.
pub fn log_registry(registry: &Registry) {
    for r in registry.iter() {
        info!(
            code = %r.code,
            numeric_code = r.numeric_code,
            country = %r.country_or_region,
            unit = r.unit_relation,
            buy = %r.buy_rate,
            sell = %r.sell_rate,
            observed = r.is_observed(),
            "rate"
        );
        for failure in &r.parse_failures {
            warn!(code = %r.code, field = %failure.field, raw = %failure.raw, "unparsed cell");
        }
    }
}

/// In strict mode, any field that failed to parse fails the whole pass.
pub fn check_strict(registry: &Registry, strict: bool) -> Result<()> {
    let failures = registry.parse_failure_count();
    if strict && failures > 0 {
        bail!(
            "{} field(s) failed to parse; not storing pass (strict mode)",
            failures
        );
    }
    Ok(())
}

/// Fetch the page, rebuild the registry and hand it to `sink`. Fetch failures
/// are returned as is; in strict mode, parse failures are too.
#[tracing::instrument(level = "info", skip_all, fields(url = %config.page_url))]
pub async fn run_pass<S: RecordSink>(
    client: &Client,
    config: &ScraperConfig,
    sink: &S,
) -> Result<PassStats> {
    let start = Instant::now();
    let pass_time = Utc::now();

    let html = fetch::fetch_page(client, &config.page_url, &config.allowed_domains).await?;
    let (registry, tally) = extract_registry(&html, &config.tracked_codes, pass_time)?;
    log_registry(&registry);

    if registry.observed_count() == 0 {
        warn!("no tracked currency code found on the page");
    }

    check_strict(&registry, config.strict)?;
    sink.store(&registry, pass_time)?;

    Ok(PassStats::new(&registry, tally, start.elapsed()))
}
