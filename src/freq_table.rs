//! Bounded, atomics-backed frequency table
//!
//! Fixed-capacity mapping from binary name to execution counter, shared
//! between the concurrently-invoked frequency monitor (sole writer) and the
//! periodic advisory loop (best-effort reader).
//!
//! # Atomicity contract
//!
//! Only individual operations are atomic: a counter add, a single-slot
//! insert publish, a single-slot delete. Compound sequences
//! (lookup → branch → mutate) are deliberately *not* protected by any lock;
//! lost updates, duplicate inserts that race past the absence check, and
//! deletes that lose to a concurrent remove are all tolerated. The table is
//! a heuristic feed, not a ledger, and its bounded size keeps worst-case
//! staleness bounded.
//!
//! Slot name bytes are individually atomic so a reader racing a slot reuse
//! observes a torn name rather than undefined behavior; a torn name is just
//! one more flavor of the approximate state the contract allows.

use std::sync::atomic::{AtomicU64, AtomicU8, Ordering};

use crate::bin_name::BinName;
use crate::params::{MAX_ENTRIES, MAX_FILENAME_LENGTH};

const SLOT_EMPTY: u8 = 0;
/// Reserved: a writer owns the slot and is writing or tearing down the name.
const SLOT_BUSY: u8 = 1;
/// Published: name is stable, counter live.
const SLOT_LIVE: u8 = 2;

/// Flow control for [`FreqTable::for_each`] visitors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Visit {
    Continue,
    Stop,
}

struct Slot {
    state: AtomicU8,
    name: [AtomicU8; MAX_FILENAME_LENGTH],
    count: AtomicU64,
}

impl Slot {
    fn new() -> Self {
        Self {
            state: AtomicU8::new(SLOT_EMPTY),
            name: std::array::from_fn(|_| AtomicU8::new(0)),
            count: AtomicU64::new(0),
        }
    }

    fn store_name(&self, name: &BinName) {
        for (cell, &b) in self.name.iter().zip(name.key().iter()) {
            cell.store(b, Ordering::Relaxed);
        }
    }

    fn load_name(&self) -> BinName {
        let mut key = [0u8; MAX_FILENAME_LENGTH];
        for (dst, cell) in key.iter_mut().zip(self.name.iter()) {
            *dst = cell.load(Ordering::Relaxed);
        }
        BinName::from_key(key)
    }

    fn name_matches(&self, name: &BinName) -> bool {
        self.name
            .iter()
            .zip(name.key().iter())
            .all(|(cell, &b)| cell.load(Ordering::Relaxed) == b)
    }
}

/// Fixed-capacity name→counter map with per-operation atomicity.
pub struct FreqTable {
    slots: Box<[Slot]>,
    /// Mirrors the number of live slots at all times.
    unique: AtomicU64,
}

impl FreqTable {
    /// Create an empty table with the given capacity.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            slots: (0..capacity).map(|_| Slot::new()).collect(),
            unique: AtomicU64::new(0),
        }
    }

    /// Create an empty table with the default capacity (100).
    pub fn new() -> Self {
        Self::with_capacity(MAX_ENTRIES)
    }

    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    /// Number of distinct keys currently present.
    pub fn len(&self) -> usize {
        self.unique.load(Ordering::Relaxed) as usize
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Find the counter for `name`, if present. The returned reference is
    /// valid for atomic adds; the entry may be concurrently deleted, in
    /// which case the add lands on a dead slot and is lost (tolerated).
    pub fn lookup(&self, name: &BinName) -> Option<&AtomicU64> {
        self.slots
            .iter()
            .find(|slot| {
                slot.state.load(Ordering::Acquire) == SLOT_LIVE && slot.name_matches(name)
            })
            .map(|slot| &slot.count)
    }

    /// Insert `(name, 1)` if no entry for `name` exists. Returns false when
    /// the key is already present, when no free slot could be claimed, or
    /// when a concurrent insert for the same key raced ahead (the insert is
    /// dropped, per the create-if-absent contract).
    pub fn insert_if_absent(&self, name: &BinName) -> bool {
        if self.lookup(name).is_some() {
            return false;
        }

        let Some(idx) = self.reserve_slot() else {
            return false;
        };

        // Absence re-check after reservation narrows (but does not close)
        // the duplicate-insert window.
        let duplicate = self.slots.iter().enumerate().any(|(i, slot)| {
            i != idx && slot.state.load(Ordering::Acquire) == SLOT_LIVE && slot.name_matches(name)
        });
        if duplicate {
            self.slots[idx].state.store(SLOT_EMPTY, Ordering::Release);
            return false;
        }

        let slot = &self.slots[idx];
        slot.store_name(name);
        slot.count.store(1, Ordering::Relaxed);
        slot.state.store(SLOT_LIVE, Ordering::Release);
        self.unique.fetch_add(1, Ordering::Relaxed);
        true
    }

    /// Delete the entry for `name`. Returns false if the entry is absent or
    /// a concurrent delete claimed it first.
    pub fn remove(&self, name: &BinName) -> bool {
        for slot in self.slots.iter() {
            if slot.state.load(Ordering::Acquire) != SLOT_LIVE || !slot.name_matches(name) {
                continue;
            }
            if slot
                .state
                .compare_exchange(SLOT_LIVE, SLOT_BUSY, Ordering::AcqRel, Ordering::Acquire)
                .is_ok()
            {
                slot.count.store(0, Ordering::Relaxed);
                slot.state.store(SLOT_EMPTY, Ordering::Release);
                self.unique.fetch_sub(1, Ordering::Relaxed);
                return true;
            }
            // Raced: someone else is tearing this slot down.
            return false;
        }
        false
    }

    /// Visit every currently-live entry once, in slot order, until the
    /// visitor returns [`Visit::Stop`]. The walk is consistent only with
    /// concurrent mutation producing a best-effort snapshot.
    pub fn for_each<F>(&self, mut f: F)
    where
        F: FnMut(&BinName, u64) -> Visit,
    {
        for slot in self.slots.iter() {
            if slot.state.load(Ordering::Acquire) != SLOT_LIVE {
                continue;
            }
            let name = slot.load_name();
            if name.is_empty() {
                // Torn read against a slot teardown; skip.
                continue;
            }
            if f(&name, slot.count.load(Ordering::Relaxed)) == Visit::Stop {
                break;
            }
        }
    }

    /// Reset every counter to zero. Keys and table size are unchanged.
    pub fn reset_all_counts(&self) {
        for slot in self.slots.iter() {
            if slot.state.load(Ordering::Acquire) == SLOT_LIVE {
                slot.count.store(0, Ordering::Relaxed);
            }
        }
    }

    /// Copy the table into a transient `(name, count)` array, one round's
    /// worth of best-effort-consistent state.
    pub fn snapshot(&self) -> Vec<(BinName, u64)> {
        let mut out = Vec::with_capacity(self.capacity());
        self.for_each(|name, count| {
            out.push((*name, count));
            Visit::Continue
        });
        out
    }

    fn reserve_slot(&self) -> Option<usize> {
        for (idx, slot) in self.slots.iter().enumerate() {
            if slot.state.load(Ordering::Relaxed) != SLOT_EMPTY {
                continue;
            }
            if slot
                .state
                .compare_exchange(SLOT_EMPTY, SLOT_BUSY, Ordering::AcqRel, Ordering::Acquire)
                .is_ok()
            {
                return Some(idx);
            }
        }
        None
    }
}

impl Default for FreqTable {
    fn default() -> Self {
        Self::new()
    }
}
