//! Frequency monitor - per-exec-event update policy
//!
//! Invoked once per observed execution event, possibly concurrently from
//! several worker threads. Decides whether the executed path qualifies and
//! applies exactly one of: counter increment, global overflow reset, plain
//! insert, or evict-and-replace. Never errors and never blocks; every race
//! it can lose degrades silently to approximate state.

use std::sync::atomic::Ordering;
use std::sync::Arc;

use crate::bin_name::BinName;
use crate::freq_table::{FreqTable, Visit};
use crate::params::{BIN_PATH, MAX_VALUE};

/// Applies the frequency-tracking policy to execution events.
pub struct ExecMonitor {
    table: Arc<FreqTable>,
    prefix: Vec<u8>,
}

impl ExecMonitor {
    /// Monitor with the default `/usr/bin/` qualifying prefix.
    pub fn new(table: Arc<FreqTable>) -> Self {
        Self::with_prefix(table, BIN_PATH)
    }

    pub fn with_prefix(table: Arc<FreqTable>, prefix: &[u8]) -> Self {
        Self {
            table,
            prefix: prefix.to_vec(),
        }
    }

    pub fn table(&self) -> &Arc<FreqTable> {
        &self.table
    }

    /// Record one execution of `raw_path`. Non-qualifying and empty paths
    /// are ignored. The lookup→branch→mutate sequence is intentionally not
    /// a critical section (see the table's atomicity contract).
    pub fn observe(&self, raw_path: &[u8]) {
        let name = BinName::from_raw(raw_path);
        if name.is_empty() || !name.starts_with(&self.prefix) {
            return;
        }

        if let Some(count) = self.table.lookup(&name) {
            let current = count.load(Ordering::Relaxed);
            if current + 1 == MAX_VALUE {
                // One saturating key opens a fresh epoch for every key,
                // instead of tracking per-key rollover state.
                self.table.reset_all_counts();
            } else {
                count.fetch_add(1, Ordering::Relaxed);
            }
        } else if self.table.len() < self.table.capacity() {
            // Create-if-absent; a racing insert for the same key wins and
            // this event is dropped.
            self.table.insert_if_absent(&name);
        } else {
            self.evict_and_replace(&name);
        }
    }

    /// Full-table scan for the minimum-count entry, then replace it with the
    /// new name. Remove + insert net to zero on the unique count; if the
    /// removal loses a race the new path is dropped for this event.
    fn evict_and_replace(&self, name: &BinName) {
        let mut victim: Option<BinName> = None;
        let mut victim_count = MAX_VALUE;
        self.table.for_each(|entry, count| {
            if count < victim_count {
                victim_count = count;
                victim = Some(*entry);
            }
            Visit::Continue
        });

        if let Some(victim) = victim {
            if self.table.remove(&victim) {
                self.table.insert_if_absent(name);
            }
        }
    }
}
