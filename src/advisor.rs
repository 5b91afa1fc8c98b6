//! Ranking & advisory loop
//!
//! Once per period: snapshot the frequency table, rank by counter value,
//! and ask the kernel to prefetch the code sections of the top candidates.
//! The snapshot is best-effort consistent with concurrent monitor mutation;
//! no state other than the shared table carries between rounds.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use tracing::{debug, info, warn};

use crate::bin_name::BinName;
use crate::elf_section;
use crate::freq_table::FreqTable;
use crate::prefetch::Prefetcher;

/// Granularity at which the round sleep re-checks the shutdown flag.
const SLEEP_SLICE: Duration = Duration::from_millis(250);

/// One ranked row of a round's snapshot.
#[derive(Debug, Clone, Copy)]
pub struct RankedEntry {
    pub name: BinName,
    pub count: u64,
}

/// Sort a table snapshot descending by counter value. The comparator is the
/// count only; ties land in arbitrary order.
pub fn rank(snapshot: Vec<(BinName, u64)>) -> Vec<RankedEntry> {
    let mut ranked: Vec<RankedEntry> = snapshot
        .into_iter()
        .map(|(name, count)| RankedEntry { name, count })
        .collect();
    ranked.sort_by(|a, b| b.count.cmp(&a.count));
    ranked
}

/// The periodic ranking/advisory driver. Runs in a single control thread.
pub struct AdvisoryLoop<P: Prefetcher> {
    table: Arc<FreqTable>,
    prefetcher: P,
    period: Duration,
    top_k: usize,
}

impl<P: Prefetcher> AdvisoryLoop<P> {
    pub fn new(table: Arc<FreqTable>, prefetcher: P, period: Duration, top_k: usize) -> Self {
        Self {
            table,
            prefetcher,
            period,
            top_k,
        }
    }

    /// Run rounds until `shutdown` is observed at a sleep boundary. Sleeps
    /// first, then advises, matching the deployed cadence.
    pub fn run(&self, shutdown: &AtomicBool) {
        while !shutdown.load(Ordering::Relaxed) {
            if self.sleep_interruptible(shutdown) {
                break;
            }
            let advised = self.run_round();
            debug!(advised, "advisory round complete");
        }
        info!("advisory loop stopped");
    }

    /// One round: snapshot → rank → top-K → extract → advise. A failing
    /// candidate is skipped; the round always runs to completion. Returns
    /// the number of advisories actually issued.
    pub fn run_round(&self) -> usize {
        let ranked = rank(self.table.snapshot());
        if ranked.is_empty() {
            debug!("frequency table is empty, nothing to advise");
            return 0;
        }

        let mut advised = 0;
        for entry in ranked.iter().take(self.top_k) {
            let path = entry.name.to_path_buf();
            let section = match elf_section::locate_code_section(&path) {
                Ok(section) => section,
                Err(err) => {
                    warn!(%err, "skipping candidate");
                    continue;
                }
            };
            match self.prefetcher.advise(&section.file, &section.range) {
                Ok(()) => {
                    info!(
                        path = %entry.name,
                        count = entry.count,
                        offset = section.range.offset,
                        len = section.range.len,
                        "prefetch hint issued"
                    );
                    advised += 1;
                }
                Err(err) => warn!(%err, path = %entry.name, "prefetch advisory rejected"),
            }
        }
        advised
    }

    /// Chunked sleep for one period; returns true if shutdown was requested.
    fn sleep_interruptible(&self, shutdown: &AtomicBool) -> bool {
        let deadline = Instant::now() + self.period;
        loop {
            if shutdown.load(Ordering::Relaxed) {
                return true;
            }
            let now = Instant::now();
            if now >= deadline {
                return false;
            }
            std::thread::sleep(SLEEP_SLICE.min(deadline - now));
        }
    }
}
