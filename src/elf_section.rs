//! Binary section extraction - locating `.text` for prefetch
//!
//! Given a candidate path, opens the file read-only, parses its section
//! directory and returns the file-offset byte range of the executable code
//! section. Pure read; the descriptor is handed back to the caller so the
//! advisory call can reuse it, and is closed on every failure path by RAII.

use std::fs::File;
use std::io;
use std::path::{Path, PathBuf};

use object::{Object, ObjectSection};
use thiserror::Error;

/// Name of the executable code section in ELF binaries.
const CODE_SECTION: &str = ".text";

/// Why extraction failed for one candidate. All variants are recoverable at
/// the round level: the candidate is skipped, the round continues.
#[derive(Debug, Error)]
pub enum ExtractError {
    #[error("cannot open {path}: {source}")]
    Unreadable {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    /// Not the expected binary container format (a script, a malformed
    /// binary, a truncated file).
    #[error("{path} is not a parseable object file: {source}")]
    InvalidFormat {
        path: PathBuf,
        #[source]
        source: object::read::Error,
    },
    #[error("{path} has no file-backed {CODE_SECTION} section")]
    SectionNotFound { path: PathBuf },
}

/// File-offset byte range of a code section.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CodeRange {
    pub offset: u64,
    pub len: u64,
}

/// A located code section, with the still-open descriptor it was found in.
#[derive(Debug)]
pub struct CodeSection {
    pub file: File,
    pub range: CodeRange,
}

/// Locate the code section of the binary at `path`.
pub fn locate_code_section(path: &Path) -> Result<CodeSection, ExtractError> {
    let file = File::open(path).map_err(|source| ExtractError::Unreadable {
        path: path.to_path_buf(),
        source,
    })?;

    let mmap = unsafe { memmap2::Mmap::map(&file) }.map_err(|source| ExtractError::Unreadable {
        path: path.to_path_buf(),
        source,
    })?;

    let object = object::File::parse(&*mmap).map_err(|source| ExtractError::InvalidFormat {
        path: path.to_path_buf(),
        source,
    })?;

    let range = object
        .section_by_name(CODE_SECTION)
        .and_then(|section| section.file_range())
        .map(|(offset, len)| CodeRange { offset, len })
        .ok_or_else(|| ExtractError::SectionNotFound {
            path: path.to_path_buf(),
        })?;

    Ok(CodeSection { file, range })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_locates_text_section_of_a_real_elf() {
        // The test binary itself is the most convenient known-good ELF
        let exe = std::env::current_exe().unwrap();
        let section = locate_code_section(&exe).unwrap();
        assert!(section.range.len > 0);
        // .text never starts at offset 0 (the ELF header lives there)
        assert!(section.range.offset > 0);
    }

    #[test]
    fn test_missing_file_is_unreadable() {
        let err = locate_code_section(Path::new("/nonexistent/binary")).unwrap_err();
        assert!(matches!(err, ExtractError::Unreadable { .. }));
    }

    #[test]
    fn test_script_is_invalid_format() {
        let mut script = tempfile::NamedTempFile::new().unwrap();
        script
            .write_all(b"#!/bin/sh\necho not an elf\n")
            .unwrap();
        let err = locate_code_section(script.path()).unwrap_err();
        assert!(matches!(err, ExtractError::InvalidFormat { .. }));
    }

    #[test]
    fn test_error_messages_name_the_path() {
        let err = locate_code_section(Path::new("/nonexistent/binary")).unwrap_err();
        assert!(err.to_string().contains("/nonexistent/binary"));
    }
}
