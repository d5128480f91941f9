//! Bit flag tables for USN record fields
//!
//! Reason, source-info and file-attribute fields are bit masks. Each table maps
//! a single bit (or the zero sentinel) to the name reported for it.

/// Name reported for a reason or source-info value of zero
pub const NO_FLAGS: &str = " ";

// USN Reason flags
pub mod usn_reason {
    pub const DATA_OVERWRITE: u32 = 0x00000001;
    pub const DATA_EXTEND: u32 = 0x00000002;
    pub const DATA_TRUNCATION: u32 = 0x00000004;
    pub const NAMED_DATA_OVERWRITE: u32 = 0x00000010;
    pub const NAMED_DATA_EXTEND: u32 = 0x00000020;
    pub const NAMED_DATA_TRUNCATION: u32 = 0x00000040;
    pub const FILE_CREATE: u32 = 0x00000100;
    pub const FILE_DELETE: u32 = 0x00000200;
    pub const EA_CHANGE: u32 = 0x00000400;
    pub const SECURITY_CHANGE: u32 = 0x00000800;
    pub const RENAME_OLD_NAME: u32 = 0x00001000;
    pub const RENAME_NEW_NAME: u32 = 0x00002000;
    pub const INDEXABLE_CHANGE: u32 = 0x00004000;
    pub const BASIC_INFO_CHANGE: u32 = 0x00008000;
    pub const HARD_LINK_CHANGE: u32 = 0x00010000;
    pub const COMPRESSION_CHANGE: u32 = 0x00020000;
    pub const ENCRYPTION_CHANGE: u32 = 0x00040000;
    pub const OBJECT_ID_CHANGE: u32 = 0x00080000;
    pub const REPARSE_POINT_CHANGE: u32 = 0x00100000;
    pub const STREAM_CHANGE: u32 = 0x00200000;
    pub const TRANSACTED_CHANGE: u32 = 0x00400000;
    pub const INTEGRITY_CHANGE: u32 = 0x00800000;
    pub const CLOSE: u32 = 0x80000000;
}

// USN SourceInfo flags
pub mod usn_source {
    pub const DATA_MANAGEMENT: u32 = 0x00000001;
    pub const AUXILIARY_DATA: u32 = 0x00000002;
    pub const REPLICATION_MANAGEMENT: u32 = 0x00000004;
    pub const CLIENT_REPLICATION_MANAGEMENT: u32 = 0x00000008;
}

// File Attributes
pub mod file_attributes {
    pub const READONLY: u32 = 0x00000001;
    pub const HIDDEN: u32 = 0x00000002;
    pub const SYSTEM: u32 = 0x00000004;
    pub const DIRECTORY: u32 = 0x00000010;
    pub const ARCHIVE: u32 = 0x00000020;
    pub const DEVICE: u32 = 0x00000040;
    pub const NORMAL: u32 = 0x00000080;
    pub const TEMPORARY: u32 = 0x00000100;
    pub const SPARSE_FILE: u32 = 0x00000200;
    pub const REPARSE_POINT: u32 = 0x00000400;
    pub const COMPRESSED: u32 = 0x00000800;
    pub const OFFLINE: u32 = 0x00001000;
    pub const NOT_CONTENT_INDEXED: u32 = 0x00002000;
    pub const ENCRYPTED: u32 = 0x00004000;
    pub const INTEGRITY_STREAM: u32 = 0x00008000;
    pub const VIRTUAL: u32 = 0x00010000;
    pub const NO_SCRUB_DATA: u32 = 0x00020000;
    pub const RECALL_ON_OPEN: u32 = 0x00040000;
    pub const PINNED: u32 = 0x00080000;
    pub const UNPINNED: u32 = 0x00100000;
    pub const RECALL_ON_DATA_ACCESS: u32 = 0x00400000;
}

// ============================================================================
// Flag Table
// ============================================================================

/// Static mapping from bit values to flag names
#[derive(Debug, Clone, Copy)]
pub struct FlagTable {
    entries: &'static [(u32, &'static str)],
}

impl FlagTable {
    pub const fn new(entries: &'static [(u32, &'static str)]) -> Self {
        Self { entries }
    }

    /// Name of an exact table key
    pub fn name(&self, value: u32) -> Option<&'static str> {
        self.entries
            .iter()
            .find(|(key, _)| *key == value)
            .map(|(_, name)| *name)
    }

    /// Unpack a field value into flag names.
    ///
    /// An exact key match (including the zero sentinel) yields that single
    /// name. Otherwise every key sharing a bit with `value` is reported, in
    /// ascending key order.
    pub fn decode(&self, value: u32) -> Vec<&'static str> {
        if let Some(name) = self.name(value) {
            return vec![name];
        }

        let mut matched: Vec<(u32, &'static str)> = self
            .entries
            .iter()
            .filter(|(key, _)| key & value != 0)
            .copied()
            .collect();
        matched.sort_unstable_by_key(|(key, _)| *key);

        matched.into_iter().map(|(_, name)| name).collect()
    }

    pub fn entries(&self) -> &'static [(u32, &'static str)] {
        self.entries
    }
}

/// Change reasons (`Reason` field)
pub static REASONS: FlagTable = FlagTable::new(&[
    (0, NO_FLAGS),
    (usn_reason::DATA_OVERWRITE, "DATA_OVERWRITE"),
    (usn_reason::DATA_EXTEND, "DATA_EXTEND"),
    (usn_reason::DATA_TRUNCATION, "DATA_TRUNCATION"),
    (usn_reason::NAMED_DATA_OVERWRITE, "NAMED_DATA_OVERWRITE"),
    (usn_reason::NAMED_DATA_EXTEND, "NAMED_DATA_EXTEND"),
    (usn_reason::NAMED_DATA_TRUNCATION, "NAMED_DATA_TRUNCATION"),
    (usn_reason::FILE_CREATE, "FILE_CREATE"),
    (usn_reason::FILE_DELETE, "FILE_DELETE"),
    (usn_reason::EA_CHANGE, "EA_CHANGE"),
    (usn_reason::SECURITY_CHANGE, "SECURITY_CHANGE"),
    (usn_reason::RENAME_OLD_NAME, "RENAME_OLD_NAME"),
    (usn_reason::RENAME_NEW_NAME, "RENAME_NEW_NAME"),
    (usn_reason::INDEXABLE_CHANGE, "INDEXABLE_CHANGE"),
    (usn_reason::BASIC_INFO_CHANGE, "BASIC_INFO_CHANGE"),
    (usn_reason::HARD_LINK_CHANGE, "HARD_LINK_CHANGE"),
    (usn_reason::COMPRESSION_CHANGE, "COMPRESSION_CHANGE"),
    (usn_reason::ENCRYPTION_CHANGE, "ENCRYPTION_CHANGE"),
    (usn_reason::OBJECT_ID_CHANGE, "OBJECT_ID_CHANGE"),
    (usn_reason::REPARSE_POINT_CHANGE, "REPARSE_POINT_CHANGE"),
    (usn_reason::STREAM_CHANGE, "STREAM_CHANGE"),
    (usn_reason::TRANSACTED_CHANGE, "TRANSACTED_CHANGE"),
    (usn_reason::INTEGRITY_CHANGE, "INTEGRITY_CHANGE"),
    (usn_reason::CLOSE, "CLOSED"),
]);

/// Change origin (`SourceInfo` field)
pub static SOURCE_INFO: FlagTable = FlagTable::new(&[
    (0, NO_FLAGS),
    (usn_source::DATA_MANAGEMENT, "DATA_MANAGEMENT"),
    (usn_source::AUXILIARY_DATA, "AUXILIARY_DATA"),
    (usn_source::REPLICATION_MANAGEMENT, "REPLICATION_MANAGEMENT"),
    (usn_source::CLIENT_REPLICATION_MANAGEMENT, "CLIENT_REPLICATION_MANAGEMENT"),
]);

/// File attributes (`FileAttributes` field). No zero sentinel: an empty mask
/// decodes to no names.
pub static ATTRIBUTES: FlagTable = FlagTable::new(&[
    (file_attributes::READONLY, "READONLY"),
    (file_attributes::HIDDEN, "HIDDEN"),
    (file_attributes::SYSTEM, "SYSTEM"),
    (file_attributes::DIRECTORY, "DIRECTORY"),
    (file_attributes::ARCHIVE, "ARCHIVE"),
    (file_attributes::DEVICE, "DEVICE"),
    (file_attributes::NORMAL, "NORMAL"),
    (file_attributes::TEMPORARY, "TEMPORARY"),
    (file_attributes::SPARSE_FILE, "SPARSE_FILE"),
    (file_attributes::REPARSE_POINT, "REPARSE_POINT"),
    (file_attributes::COMPRESSED, "COMPRESSED"),
    (file_attributes::OFFLINE, "OFFLINE"),
    (file_attributes::NOT_CONTENT_INDEXED, "NOT_CONTENT_INDEXED"),
    (file_attributes::ENCRYPTED, "ENCRYPTED"),
    (file_attributes::INTEGRITY_STREAM, "INTEGRITY_STREAM"),
    (file_attributes::VIRTUAL, "VIRTUAL"),
    (file_attributes::NO_SCRUB_DATA, "NO_SCRUB_DATA"),
    (file_attributes::RECALL_ON_OPEN, "RECALL_ON_OPEN"),
    (file_attributes::PINNED, "PINNED"),
    (file_attributes::UNPINNED, "UNPINNED"),
    (file_attributes::RECALL_ON_DATA_ACCESS, "RECALL_ON_DATA_ACCESS"),
]);
