//! Cache file integrity utilities
//!
//! A downloaded dataset is stored alongside a small sidecar file holding its
//! CRC-32 (IEEE 802.3) as eight hex digits. A cache file is only trusted when
//! its content still matches that checksum; files without a sidecar are
//! treated as operator-provided and trusted when non-empty.

use std::fmt;
use std::fs::File;
use std::io::{self, Read};
use std::path::{Path, PathBuf};

use crate::config::constants::dataset::CHECKSUM_SIDECAR_EXTENSION;

/// Data integrity error types
#[derive(Debug, Clone, PartialEq)]
pub enum IntegrityError {
    /// CRC mismatch between file content and sidecar
    CrcMismatch {
        expected: u32,
        actual: u32,
        context: String,
    },
    /// Sidecar exists but does not hold a valid checksum
    MalformedSidecar {
        path: String,
        content: String,
    },
    /// File could not be read
    Io(String),
}

impl fmt::Display for IntegrityError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IntegrityError::CrcMismatch { expected, actual, context } => {
                write!(f, "CRC-32 mismatch in {}: expected {:08x}, got {:08x}", context, expected, actual)
            }
            IntegrityError::MalformedSidecar { path, content } => {
                write!(f, "Malformed checksum sidecar {}: '{}'", path, content)
            }
            IntegrityError::Io(msg) => write!(f, "Integrity check I/O error: {}", msg),
        }
    }
}

impl std::error::Error for IntegrityError {}

impl From<io::Error> for IntegrityError {
    fn from(err: io::Error) -> Self {
        IntegrityError::Io(err.to_string())
    }
}

/// Result type for integrity operations
pub type IntegrityResult<T> = Result<T, IntegrityError>;

/// Outcome of checking a cache file
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheIntegrity {
    /// Sidecar present and checksum matched
    Verified,
    /// No sidecar; file content is taken as-is
    Unverified,
}

/// Path of the checksum sidecar for `path` (`data.csv` -> `data.csv.crc32`)
pub fn sidecar_path(path: &Path) -> PathBuf {
    let mut name = path.as_os_str().to_owned();
    name.push(".");
    name.push(CHECKSUM_SIDECAR_EXTENSION);
    PathBuf::from(name)
}

/// Compute the CRC-32 of a file by streaming it through the hasher
pub fn crc32_file(path: &Path) -> IntegrityResult<u32> {
    let mut file = File::open(path)?;
    let mut hasher = crc32fast::Hasher::new();
    let mut buf = [0u8; 8192];
    loop {
        let n = file.read(&mut buf)?;
        if n == 0 {
            break;
        }
        hasher.update(&buf[..n]);
    }
    Ok(hasher.finalize())
}

pub fn format_checksum(crc: u32) -> String {
    format!("{:08x}", crc)
}

pub fn parse_checksum(text: &str) -> Option<u32> {
    let trimmed = text.trim();
    if trimmed.len() != 8 {
        return None;
    }
    u32::from_str_radix(trimmed, 16).ok()
}

/// Write the sidecar for `path` holding `crc`
pub fn write_sidecar(path: &Path, crc: u32) -> IntegrityResult<()> {
    std::fs::write(sidecar_path(path), format_checksum(crc))?;
    Ok(())
}

/// Verify `path` against its sidecar, if one exists
pub fn verify_cache_file(path: &Path) -> IntegrityResult<CacheIntegrity> {
    let sidecar = sidecar_path(path);
    if !sidecar.exists() {
        return Ok(CacheIntegrity::Unverified);
    }

    let content = std::fs::read_to_string(&sidecar)?;
    let expected = parse_checksum(&content).ok_or_else(|| IntegrityError::MalformedSidecar {
        path: sidecar.display().to_string(),
        content: content.trim().to_string(),
    })?;

    let actual = crc32_file(path)?;
    if actual != expected {
        return Err(IntegrityError::CrcMismatch {
            expected,
            actual,
            context: path.display().to_string(),
        });
    }

    Ok(CacheIntegrity::Verified)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::tempdir;

    #[test]
    fn test_sidecar_path() {
        let path = Path::new("/data/mitbih_test.csv");
        assert_eq!(sidecar_path(path), PathBuf::from("/data/mitbih_test.csv.crc32"));
    }

    #[test]
    fn test_checksum_format_roundtrip() {
        assert_eq!(format_checksum(0xdeadbeef), "deadbeef");
        assert_eq!(parse_checksum("deadbeef\n"), Some(0xdeadbeef));
        assert_eq!(parse_checksum("xyz"), None);
    }

    #[test]
    fn test_verify_without_sidecar_is_unverified() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("beats.csv");
        std::fs::write(&path, "0.1,0.9,0.0\n").unwrap();

        assert_eq!(verify_cache_file(&path).unwrap(), CacheIntegrity::Unverified);
    }

    #[test]
    fn test_verify_detects_truncation() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("beats.csv");
        std::fs::write(&path, "0.1,0.9,0.0\n0.2,0.8,2.0\n").unwrap();

        let crc = crc32_file(&path).unwrap();
        write_sidecar(&path, crc).unwrap();
        assert_eq!(verify_cache_file(&path).unwrap(), CacheIntegrity::Verified);

        let mut file = std::fs::OpenOptions::new().append(true).open(&path).unwrap();
        writeln!(file, "0.3,0.7").unwrap();

        assert!(matches!(
            verify_cache_file(&path),
            Err(IntegrityError::CrcMismatch { .. })
        ));
    }

    #[test]
    fn test_crc_matches_crc32fast() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("blob");
        std::fs::write(&path, b"123456789").unwrap();

        // CRC-32/ISO-HDLC check value
        assert_eq!(crc32_file(&path).unwrap(), 0xcbf43926);
    }
}
