//! Main Scanner Module
//!
//! Scan configuration and the path-based entry points that open a journal
//! file and hand it to the [`JournalScanner`].

use crate::error::{Result, UsnJrnlError};
use crate::logging;
use crate::ntfs::block::DEFAULT_BLOCK_SIZE;
use crate::ntfs::structs::MIN_RECORD_SIZE;
use crate::ntfs::usn::JournalScanner;
use serde::Serialize;
use std::fs::File;
use std::io::BufReader;
use std::path::Path;

/// Largest record length accepted before the header is treated as garbage
pub const DEFAULT_MAX_RECORD_SIZE: usize = 0x10000;

// ============================================================================
// Scanner Configuration
// ============================================================================

/// Configuration for a journal scan
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ScanConfig {
    /// Bytes requested from the stream per read
    pub block_size: usize,
    /// Declared record lengths above this are reported as corrupted
    pub max_record_size: usize,
    /// Abort on records whose version is known but not implemented (V4)
    /// instead of reporting them as corrupted
    pub strict_versions: bool,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            block_size: DEFAULT_BLOCK_SIZE,
            max_record_size: DEFAULT_MAX_RECORD_SIZE,
            strict_versions: false,
        }
    }
}

impl ScanConfig {
    pub fn validate(&self) -> Result<()> {
        if self.block_size == 0 {
            return Err(UsnJrnlError::InvalidConfig(
                "block size must be greater than zero".to_string(),
            ));
        }

        if self.max_record_size < MIN_RECORD_SIZE {
            return Err(UsnJrnlError::InvalidConfig(format!(
                "max record size {} is below the minimum record size {}",
                self.max_record_size, MIN_RECORD_SIZE
            )));
        }

        Ok(())
    }

    pub fn with_block_size(mut self, block_size: usize) -> Self {
        self.block_size = block_size;
        self
    }

    pub fn with_strict_versions(mut self, strict: bool) -> Self {
        self.strict_versions = strict;
        self
    }
}

// ============================================================================
// Entry Points
// ============================================================================

/// Scan the journal file at `path` with the default configuration
pub fn usn_journal<P: AsRef<Path>>(path: P) -> Result<JournalScanner<BufReader<File>>> {
    usn_journal_with_config(path, ScanConfig::default())
}

/// Scan the journal file at `path`
pub fn usn_journal_with_config<P: AsRef<Path>>(
    path: P,
    config: ScanConfig,
) -> Result<JournalScanner<BufReader<File>>> {
    let path = path.as_ref();
    let file = File::open(path)?;

    logging::info(
        logging::USN,
        &format!(
            "Opening journal {} (block size {})",
            path.display(),
            config.block_size
        ),
    );

    JournalScanner::with_config(BufReader::new(file), config)
}
