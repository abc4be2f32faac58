// src/stats.rs
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::table::{CellTally, Registry};

/// Summary of one extraction pass.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PassStats {
    /// Number of tracked codes.
    pub tracked: usize,
    /// Tracked codes found on the page.
    pub observed: usize,
    #[serde(flatten)]
    pub cells: CellTally,
    #[serde(skip)]
    pub elapsed: Duration,
}

impl PassStats {
    pub fn new(registry: &Registry, cells: CellTally, elapsed: Duration) -> Self {
        Self {
            tracked: registry.len(),
            observed: registry.observed_count(),
            cells,
            elapsed,
        }
    }

    /// Share of tracked codes found on the page (%).
    pub fn coverage(&self) -> f64 {
        if self.tracked == 0 {
            0.0
        } else {
            (self.observed as f64 / self.tracked as f64) * 100.0
        }
    }

    pub fn log_summary(&self, operation: &str) {
        tracing::info!(
            operation = operation,
            tracked = self.tracked,
            observed = self.observed,
            cells = self.cells.cells,
            anchors = self.cells.anchors,
            written = self.cells.written,
            parse_failures = self.cells.parse_failures,
            already_written = self.cells.already_written,
            ignored = self.cells.ignored,
            unattributed = self.cells.unattributed,
            coverage = format!("{:.1}%", self.coverage()),
            elapsed = format!("{:.3}s", self.elapsed.as_secs_f64()),
            "pass complete"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::{
        io,
        sync::{Arc, Mutex},
    };

    #[derive(Clone, Default)]
    struct SharedBuf(Arc<Mutex<Vec<u8>>>);

    impl io::Write for SharedBuf {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn test_summary_reports_repeated_anchor_cells() {
        let buf = SharedBuf::default();
        let writer = buf.clone();
        let subscriber = tracing_subscriber::fmt()
            .with_writer(move || writer.clone())
            .with_ansi(false)
            .finish();

        let stats = PassStats {
            tracked: 1,
            observed: 1,
            cells: CellTally {
                already_written: 2,
                ..Default::default()
            },
            ..Default::default()
        };
        tracing::subscriber::with_default(subscriber, || stats.log_summary("rate pass"));

        let out = String::from_utf8(buf.0.lock().unwrap().clone()).unwrap();
        assert!(out.contains("already_written=2"), "{}", out);
    }

    #[test]
    fn test_coverage() {
        let stats = PassStats {
            tracked: 4,
            observed: 3,
            ..Default::default()
        };
        assert_eq!(stats.coverage(), 75.0);
        assert_eq!(PassStats::default().coverage(), 0.0);
    }
}
