//! Prefetch issuing - the readahead advisory seam
//!
//! `posix_fadvise(POSIX_FADV_WILLNEED)` is purely advisory: the kernel may
//! ignore it and the system is correct either way. The trait exists so the
//! advisory loop can be exercised in tests without touching the kernel.

use std::fs::File;
use std::io;
use std::os::unix::io::AsRawFd;

use crate::elf_section::CodeRange;

/// Issues OS page-cache preload hints for a byte range of an open file.
pub trait Prefetcher {
    fn advise(&self, file: &File, range: &CodeRange) -> io::Result<()>;
}

/// `posix_fadvise(POSIX_FADV_WILLNEED)` over the given range.
pub struct FadviseWillNeed;

impl Prefetcher for FadviseWillNeed {
    fn advise(&self, file: &File, range: &CodeRange) -> io::Result<()> {
        // posix_fadvise returns the error number directly, not via errno
        let rc = unsafe {
            libc::posix_fadvise(
                file.as_raw_fd(),
                range.offset as libc::off_t,
                range.len as libc::off_t,
                libc::POSIX_FADV_WILLNEED,
            )
        };
        if rc == 0 {
            Ok(())
        } else {
            Err(io::Error::from_raw_os_error(rc))
        }
    }
}
