//! Fixed-size, NUL-padded binary name buffer
//!
//! `BinName` preserves the shared table's key schema: a 128-byte buffer
//! holding at most 127 data bytes followed by NUL padding. Construction
//! truncates rather than fails, matching the bounded path read at the
//! event source.

use std::ffi::OsStr;
use std::fmt;
use std::os::unix::ffi::OsStrExt;
use std::path::{Path, PathBuf};

use crate::params::MAX_FILENAME_LENGTH;

/// A binary's execution path, bounded to the table key width.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct BinName {
    bytes: [u8; MAX_FILENAME_LENGTH],
}

impl BinName {
    /// Build a name from a raw path read, truncating to 127 data bytes and
    /// stopping at the first NUL. An empty read yields an empty name.
    pub fn from_raw(raw: &[u8]) -> Self {
        let mut bytes = [0u8; MAX_FILENAME_LENGTH];
        let mut len = 0;
        for &b in raw.iter().take(MAX_FILENAME_LENGTH - 1) {
            if b == 0 {
                break;
            }
            bytes[len] = b;
            len += 1;
        }
        Self { bytes }
    }

    /// Reconstruct a name from a full 128-byte key buffer.
    pub fn from_key(key: [u8; MAX_FILENAME_LENGTH]) -> Self {
        // Re-normalize: everything after the first NUL is padding.
        Self::from_raw(&key)
    }

    /// The name's data bytes, up to the first NUL.
    pub fn as_bytes(&self) -> &[u8] {
        let len = self
            .bytes
            .iter()
            .position(|&b| b == 0)
            .unwrap_or(MAX_FILENAME_LENGTH);
        &self.bytes[..len]
    }

    /// The full 128-byte NUL-padded key buffer (table wire format).
    pub fn key(&self) -> &[u8; MAX_FILENAME_LENGTH] {
        &self.bytes
    }

    pub fn is_empty(&self) -> bool {
        self.bytes[0] == 0
    }

    /// Prefix match over the prefix length only; bytes beyond it are not
    /// inspected. This is how the event filter qualifies a path.
    pub fn starts_with(&self, prefix: &[u8]) -> bool {
        self.as_bytes().len() >= prefix.len() && &self.bytes[..prefix.len()] == prefix
    }

    /// The name as a filesystem path, for opening the binary.
    pub fn as_path(&self) -> &Path {
        Path::new(OsStr::from_bytes(self.as_bytes()))
    }

    pub fn to_path_buf(&self) -> PathBuf {
        self.as_path().to_path_buf()
    }
}

impl fmt::Display for BinName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", String::from_utf8_lossy(self.as_bytes()))
    }
}

impl fmt::Debug for BinName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "BinName({})", self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_short_path_roundtrips() {
        let name = BinName::from_raw(b"/usr/bin/bash");
        assert_eq!(name.as_bytes(), b"/usr/bin/bash");
        assert_eq!(name.to_string(), "/usr/bin/bash");
        assert!(!name.is_empty());
    }

    #[test]
    fn test_truncates_to_127_data_bytes() {
        let long = vec![b'a'; 300];
        let name = BinName::from_raw(&long);
        assert_eq!(name.as_bytes().len(), MAX_FILENAME_LENGTH - 1);
        // Terminator position is preserved in the key buffer
        assert_eq!(name.key()[MAX_FILENAME_LENGTH - 1], 0);
    }

    #[test]
    fn test_stops_at_first_nul() {
        let name = BinName::from_raw(b"/usr/bin/ls\0garbage");
        assert_eq!(name.as_bytes(), b"/usr/bin/ls");
    }

    #[test]
    fn test_empty_read_is_empty_name() {
        let name = BinName::from_raw(b"");
        assert!(name.is_empty());
        assert_eq!(name.as_bytes(), b"");
    }

    #[test]
    fn test_prefix_match_inspects_prefix_length_only() {
        let name = BinName::from_raw(b"/usr/bin/grep");
        assert!(name.starts_with(b"/usr/bin/"));
        assert!(!name.starts_with(b"/usr/sbin"));

        // A path shorter than the prefix never matches
        let short = BinName::from_raw(b"/usr");
        assert!(!short.starts_with(b"/usr/bin/"));
    }

    #[test]
    fn test_key_is_nul_padded_to_width() {
        let name = BinName::from_raw(b"/usr/bin/cat");
        let key = name.key();
        assert_eq!(&key[..12], b"/usr/bin/cat");
        assert!(key[12..].iter().all(|&b| b == 0));
    }
}
