//! usnjrnl - NTFS USN Change Journal decoder
//!
//! Decodes the raw `$UsnJrnl:$J` stream of an NTFS volume into typed change
//! records. The decoder is a lazy iterator that tolerates zero padding,
//! records straddling read blocks, version skew and corrupted entries.
//!
//! # Features
//!
//! - **V2 and V3 records**: offset-exact decoding of both layouts
//! - **Corruption recovery**: undecodable records become positional markers
//! - **Streaming**: constant memory, one block at a time
//! - **Timeline**: fold consecutive records into per-change events
//!
//! # Example
//!
//! ```no_run
//! use usnjrnl::{usn_journal, JournalEntry};
//!
//! fn main() -> usnjrnl::Result<()> {
//!     for entry in usn_journal("extracted/$UsnJrnl_$J")? {
//!         match entry? {
//!             JournalEntry::Record { index, record } => {
//!                 println!("{} {} {} {:?}", index, record.timestamp, record.file_name, record.reasons);
//!             }
//!             JournalEntry::Corrupted(marker) => {
//!                 println!("{} <corrupted>", marker.index);
//!             }
//!         }
//!     }
//!     Ok(())
//! }
//! ```

pub mod error;
pub mod logging;
pub mod ntfs;
pub mod scanner;
pub mod timeline;

// Re-export main types
pub use error::{Result, UsnJrnlError};
pub use scanner::{usn_journal, usn_journal_with_config, ScanConfig};
pub use timeline::{coalesce_events, JournalEvent, TimelineStats};

// Re-export journal types that users might need
pub use ntfs::{
    CorruptedRecord, JournalEntry, JournalScanner, RecordHeader, ScanStats, UsnRecord,
};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
