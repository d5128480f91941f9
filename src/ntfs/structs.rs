//! USN journal on-disk structures and constants
//!
//! Every record starts with the same 8-byte header; the fixed portion that
//! follows depends on the major version. All fields are little-endian.

use crate::error::{Result, UsnJrnlError};
use crate::ntfs::flags::{ATTRIBUTES, REASONS, SOURCE_INFO};
use byteorder::{LittleEndian, ReadBytesExt};
use chrono::{DateTime, NaiveDate, TimeDelta, Utc};
use serde::Serialize;
use std::io::Cursor;

// ============================================================================
// Record Layout Constants
// ============================================================================

/// Common header: length (4), major version (2), minor version (2)
pub const RECORD_HEADER_SIZE: usize = 8;

/// USN_RECORD_V2 fixed portion after the header
pub const V2_FIXED_SIZE: usize = 52;

/// USN_RECORD_V3 fixed portion after the header
pub const V3_FIXED_SIZE: usize = 68;

/// USN_RECORD_V4 fixed portion after the header (layout not decoded yet)
pub const V4_FIXED_SIZE: usize = 52;

/// Smallest buffer that can hold a record of any known version
pub const MIN_RECORD_SIZE: usize = RECORD_HEADER_SIZE + min_fixed_size();

const fn min_fixed_size() -> usize {
    let mut size = V2_FIXED_SIZE;
    if V3_FIXED_SIZE < size {
        size = V3_FIXED_SIZE;
    }
    if V4_FIXED_SIZE < size {
        size = V4_FIXED_SIZE;
    }
    size
}

// ============================================================================
// Record Header
// ============================================================================

/// Header shared by every USN record version
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RecordHeader {
    /// Size of the whole record, header and file name included
    pub length: u32,
    pub major_version: i16,
    pub minor_version: i16,
}

impl RecordHeader {
    /// Parse the header at the front of `data`
    pub fn from_bytes(data: &[u8]) -> Result<Self> {
        if data.len() < RECORD_HEADER_SIZE {
            return Err(UsnJrnlError::BufferTooSmall {
                needed: RECORD_HEADER_SIZE,
                got: data.len(),
            });
        }

        let mut cursor = Cursor::new(data);

        Ok(Self {
            length: cursor.read_u32::<LittleEndian>()?,
            major_version: cursor.read_i16::<LittleEndian>()?,
            minor_version: cursor.read_i16::<LittleEndian>()?,
        })
    }

    pub fn version(&self) -> RecordVersion {
        RecordVersion::from_major(self.major_version)
    }

    /// `major.minor` read as a decimal number, so 2.10 reads as 2.1
    pub fn version_number(&self) -> Option<f64> {
        format!("{}.{}", self.major_version, self.minor_version)
            .parse()
            .ok()
    }
}

// ============================================================================
// Record Versions
// ============================================================================

/// Record layout selected by the header's major version
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordVersion {
    V2,
    V3,
    /// Recognized, decoding not implemented
    V4,
    Unknown(i16),
}

impl RecordVersion {
    pub fn from_major(major: i16) -> Self {
        match major {
            2 => Self::V2,
            3 => Self::V3,
            4 => Self::V4,
            other => Self::Unknown(other),
        }
    }

    /// Size of the fixed portion following the header
    pub fn fixed_size(&self) -> Option<usize> {
        match self {
            Self::V2 => Some(V2_FIXED_SIZE),
            Self::V3 => Some(V3_FIXED_SIZE),
            Self::V4 => Some(V4_FIXED_SIZE),
            Self::Unknown(_) => None,
        }
    }
}

// ============================================================================
// USN Record
// ============================================================================

/// A decoded journal entry
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UsnRecord {
    pub length: u32,
    pub version: f64,
    pub file_reference_number: u64,
    pub file_reference_number_sequence: u64,
    pub parent_file_reference_number: u64,
    pub parent_file_reference_number_sequence: u64,
    pub update_sequence_number: i64,
    pub timestamp: DateTime<Utc>,
    pub reasons: Vec<&'static str>,
    pub source_info: Vec<&'static str>,
    pub security_id: u32,
    pub file_attributes: Vec<&'static str>,
    pub file_name: String,
}

/// Version-independent view of the fixed fields
struct FixedFields {
    file_reference_number: u64,
    file_reference_number_sequence: u64,
    parent_file_reference_number: u64,
    parent_file_reference_number_sequence: u64,
    usn: i64,
    raw_timestamp: i64,
    reason: u32,
    source_info: u32,
    security_id: u32,
    file_attributes: u32,
    file_name_length: i16,
    file_name_offset: i16,
}

/// Decode one record.
///
/// `record` holds the bytes sliced by `header.length`, header included.
/// Layout problems come back as [`UsnJrnlError::CorruptedRecord`]; a V4
/// record yields [`UsnJrnlError::UnsupportedVersion`].
pub fn decode_record(header: &RecordHeader, record: &[u8]) -> Result<UsnRecord> {
    let fields = match header.version() {
        RecordVersion::V2 => read_fixed(record, read_v2_fields)?,
        RecordVersion::V3 => read_fixed(record, read_v3_fields)?,
        RecordVersion::V4 => {
            if record.len() < RECORD_HEADER_SIZE + V4_FIXED_SIZE {
                return Err(UsnJrnlError::corrupted(format!(
                    "v4 record holds {} bytes, fixed layout needs {}",
                    record.len(),
                    RECORD_HEADER_SIZE + V4_FIXED_SIZE
                )));
            }
            return Err(UsnJrnlError::UnsupportedVersion {
                major: header.major_version,
                minor: header.minor_version,
            });
        }
        RecordVersion::Unknown(major) => {
            return Err(UsnJrnlError::corrupted(format!(
                "unknown major version {}",
                major
            )));
        }
    };

    let version = header.version_number().ok_or_else(|| {
        UsnJrnlError::corrupted(format!(
            "invalid version {}.{}",
            header.major_version, header.minor_version
        ))
    })?;

    let timestamp = filetime_to_datetime(fields.raw_timestamp).ok_or_else(|| {
        UsnJrnlError::corrupted(format!("timestamp {} out of range", fields.raw_timestamp))
    })?;

    let file_name = decode_file_name(record, fields.file_name_offset, fields.file_name_length)?;

    Ok(UsnRecord {
        length: header.length,
        version,
        file_reference_number: fields.file_reference_number,
        file_reference_number_sequence: fields.file_reference_number_sequence,
        parent_file_reference_number: fields.parent_file_reference_number,
        parent_file_reference_number_sequence: fields.parent_file_reference_number_sequence,
        update_sequence_number: fields.usn,
        timestamp,
        reasons: REASONS.decode(fields.reason),
        source_info: SOURCE_INFO.decode(fields.source_info),
        security_id: fields.security_id,
        file_attributes: ATTRIBUTES.decode(fields.file_attributes),
        file_name,
    })
}

/// Run a fixed-layout reader positioned just past the header
fn read_fixed(
    record: &[u8],
    reader: fn(&mut Cursor<&[u8]>) -> std::io::Result<FixedFields>,
) -> Result<FixedFields> {
    let mut cursor = Cursor::new(record);
    cursor.set_position(RECORD_HEADER_SIZE as u64);

    reader(&mut cursor).map_err(|_| {
        UsnJrnlError::corrupted(format!(
            "record holds {} bytes, too short for its fixed layout",
            record.len()
        ))
    })
}

fn read_v2_fields(cursor: &mut Cursor<&[u8]>) -> std::io::Result<FixedFields> {
    let file_ref_low = cursor.read_u32::<LittleEndian>()?;
    let file_ref_high = cursor.read_u16::<LittleEndian>()?;
    let file_ref_seq = cursor.read_u16::<LittleEndian>()?;
    let parent_ref_low = cursor.read_u32::<LittleEndian>()?;
    let parent_ref_high = cursor.read_u16::<LittleEndian>()?;
    let parent_ref_seq = cursor.read_u16::<LittleEndian>()?;

    Ok(FixedFields {
        file_reference_number: combine_reference(file_ref_low, file_ref_high),
        file_reference_number_sequence: file_ref_seq as u64,
        parent_file_reference_number: combine_reference(parent_ref_low, parent_ref_high),
        parent_file_reference_number_sequence: parent_ref_seq as u64,
        usn: cursor.read_i64::<LittleEndian>()?,
        raw_timestamp: cursor.read_i64::<LittleEndian>()?,
        reason: cursor.read_u32::<LittleEndian>()?,
        source_info: cursor.read_u32::<LittleEndian>()?,
        security_id: cursor.read_u32::<LittleEndian>()?,
        file_attributes: cursor.read_u32::<LittleEndian>()?,
        file_name_length: cursor.read_i16::<LittleEndian>()?,
        file_name_offset: cursor.read_i16::<LittleEndian>()?,
    })
}

fn read_v3_fields(cursor: &mut Cursor<&[u8]>) -> std::io::Result<FixedFields> {
    Ok(FixedFields {
        file_reference_number: cursor.read_u64::<LittleEndian>()?,
        file_reference_number_sequence: cursor.read_u64::<LittleEndian>()?,
        parent_file_reference_number: cursor.read_u64::<LittleEndian>()?,
        parent_file_reference_number_sequence: cursor.read_u64::<LittleEndian>()?,
        usn: cursor.read_i64::<LittleEndian>()?,
        raw_timestamp: cursor.read_i64::<LittleEndian>()?,
        reason: cursor.read_u32::<LittleEndian>()?,
        source_info: cursor.read_u32::<LittleEndian>()?,
        security_id: cursor.read_u32::<LittleEndian>()?,
        file_attributes: cursor.read_u32::<LittleEndian>()?,
        file_name_length: cursor.read_i16::<LittleEndian>()?,
        file_name_offset: cursor.read_i16::<LittleEndian>()?,
    })
}

/// V2 segment number from its split low/high parts.
///
/// NOTE: the high word is shifted by 16, not 32, so it overlaps the low
/// dword. Existing journal exports were produced this way; keep it until it
/// is checked against real captures.
fn combine_reference(low: u32, high: u16) -> u64 {
    low as u64 | (high as u64) << 16
}

/// Read `length` bytes of UTF-16LE text at `offset` from the record start
fn decode_file_name(record: &[u8], offset: i16, length: i16) -> Result<String> {
    let (start, len) = match (usize::try_from(offset), usize::try_from(length)) {
        (Ok(start), Ok(len)) => (start, len),
        _ => {
            return Err(UsnJrnlError::corrupted(format!(
                "negative file name bounds: offset={}, length={}",
                offset, length
            )))
        }
    };

    if len % 2 != 0 {
        return Err(UsnJrnlError::corrupted(format!(
            "odd UTF-16 file name length {}",
            len
        )));
    }

    let name_data = record.get(start..start + len).ok_or_else(|| {
        UsnJrnlError::corrupted(format!(
            "file name {}..{} outside record of {} bytes",
            start,
            start + len,
            record.len()
        ))
    })?;

    let name_u16: Vec<u16> = name_data
        .chunks_exact(2)
        .map(|chunk| u16::from_le_bytes([chunk[0], chunk[1]]))
        .collect();

    Ok(String::from_utf16_lossy(&name_u16))
}

// ============================================================================
// FILETIME conversion
// ============================================================================

/// Convert a FILETIME (100-nanosecond intervals since 1601-01-01 UTC).
///
/// Sub-microsecond precision is truncated. Returns `None` when the result
/// falls outside chrono's representable range.
pub fn filetime_to_datetime(filetime: i64) -> Option<DateTime<Utc>> {
    let epoch = NaiveDate::from_ymd_opt(1601, 1, 1)?
        .and_hms_opt(0, 0, 0)?
        .and_utc();

    epoch.checked_add_signed(TimeDelta::microseconds(filetime / 10))
}
