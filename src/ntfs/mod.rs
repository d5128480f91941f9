//! NTFS USN journal support
//!
//! This module provides the journal decoding layers:
//! - Bit flag tables for reasons, source info and file attributes
//! - Record header and versioned record layouts (V2, V3; V4 recognized)
//! - Block reading with push back and padding removal
//! - The streaming journal scanner

pub mod block;
pub mod flags;
pub mod structs;
pub mod usn;

// Re-export commonly used types
pub use block::{strip_padding, BlockReader};
pub use flags::{FlagTable, ATTRIBUTES, REASONS, SOURCE_INFO};
pub use structs::{
    decode_record, filetime_to_datetime, RecordHeader, RecordVersion, UsnRecord,
    MIN_RECORD_SIZE,
};
pub use usn::{CorruptedRecord, JournalEntry, JournalScanner, ScanStats};
