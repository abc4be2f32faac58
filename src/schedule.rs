// src/schedule.rs
//! Fixed-interval pass loop with graceful shutdown.

use anyhow::Result;
use reqwest::Client;
use std::future::Future;
use tokio::time::{interval, MissedTickBehavior};
use tracing::{error, info};

use crate::{config::ScraperConfig, pass::run_pass, store::RecordSink};

/// Resolves on Ctrl-C, or SIGTERM on unix.
pub async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("failed to listen for Ctrl-C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                error!("failed to listen for SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };
    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}

/// Run a pass immediately and then once per `config.interval()` until
/// `shutdown` resolves. A failing pass is logged and the loop goes on; a pass
/// in progress is never interrupted.
pub async fn run_daemon<S, F>(
    client: &Client,
    config: &ScraperConfig,
    sink: &S,
    shutdown: F,
) -> Result<usize>
where
    S: RecordSink,
    F: Future<Output = ()>,
{
    info!(
        "=== daemon started (every {}h, {} codes) ===",
        config.interval_hours,
        config.tracked_codes.len()
    );

    let mut ticker = interval(config.interval());
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
    tokio::pin!(shutdown);

    let mut passes = 0usize;
    loop {
        tokio::select! {
            _ = &mut shutdown => {
                info!("shutdown signal received, stopping");
                break;
            }
            _ = ticker.tick() => {
                passes += 1;
                match run_pass(client, config, sink).await {
                    Ok(stats) => stats.log_summary("rate pass"),
                    Err(e) => error!(pass = passes, "rate pass failed: {:#}", e),
                }
                info!("next pass in {}h", config.interval_hours);
            }
        }
    }

    Ok(passes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::table::Registry;
    use chrono::{DateTime, Utc};
    use std::{cell::Cell, path::PathBuf};

    struct CountingSink(Cell<usize>);

    impl RecordSink for CountingSink {
        fn store(&self, _registry: &Registry, _pass_time: DateTime<Utc>) -> Result<PathBuf> {
            self.0.set(self.0.get() + 1);
            Ok(PathBuf::new())
        }
    }

    #[tokio::test]
    async fn test_stops_on_shutdown_and_survives_failed_pass() {
        // example.com is not allowed, so every pass fails before any request
        let mut config = ScraperConfig::from_lookup(|_| None).unwrap();
        config.page_url = url::Url::parse("https://example.com/").unwrap();
        let client = Client::new();
        let sink = CountingSink(Cell::new(0));

        let shutdown = tokio::time::sleep(std::time::Duration::from_millis(50));
        let passes = run_daemon(&client, &config, &sink, shutdown).await.unwrap();

        assert_eq!(passes, 1);
        assert_eq!(sink.0.get(), 0);
    }
}
