//! Binwarm - execution-frequency-driven page cache prefetcher
//!
//! This library observes process-execution events, keeps a bounded
//! approximate frequency ranking of binaries executed from one directory,
//! and periodically asks the kernel to prefetch the `.text` sections of the
//! hottest ones via `posix_fadvise(POSIX_FADV_WILLNEED)`.

pub mod advisor;
pub mod bin_name;
pub mod cli;
pub mod elf_section;
pub mod exec_events;
pub mod freq_table;
pub mod monitor;
pub mod params;
pub mod prefetch;
