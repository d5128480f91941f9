//! USN Journal Scanner
//!
//! Streams a raw `$UsnJrnl:$J` byte stream into decoded records. The journal
//! is a run of variable-length records separated by zero padding, and records
//! freely straddle the blocks the stream is read in.

use crate::error::{Result, UsnJrnlError};
use crate::logging;
use crate::ntfs::block::{padding_len, BlockReader};
use crate::ntfs::structs::*;
use crate::scanner::ScanConfig;
use serde::Serialize;
use std::io::{Read, Seek};

// ============================================================================
// Scan Output
// ============================================================================

/// Placeholder for a record slot that could not be decoded
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CorruptedRecord {
    pub index: u64,
}

/// One element of the scan, in on-disk order
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum JournalEntry {
    Record {
        index: u64,
        #[serde(flatten)]
        record: UsnRecord,
    },
    Corrupted(CorruptedRecord),
}

impl JournalEntry {
    /// Position of the entry among all attempted records
    pub fn index(&self) -> u64 {
        match self {
            JournalEntry::Record { index, .. } => *index,
            JournalEntry::Corrupted(corrupted) => corrupted.index,
        }
    }

    pub fn record(&self) -> Option<&UsnRecord> {
        match self {
            JournalEntry::Record { record, .. } => Some(record),
            JournalEntry::Corrupted(_) => None,
        }
    }

    pub fn into_record(self) -> Option<UsnRecord> {
        match self {
            JournalEntry::Record { record, .. } => Some(record),
            JournalEntry::Corrupted(_) => None,
        }
    }

    pub fn is_corrupted(&self) -> bool {
        matches!(self, JournalEntry::Corrupted(_))
    }
}

/// Counters for a single scan
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ScanStats {
    /// Records decoded
    pub records: u64,
    /// Slots reported as corrupted (unsupported versions included)
    pub corrupted: u64,
    /// Slots holding a recognized but unimplemented version
    pub unsupported: u64,
    /// Trailing bytes dropped at end of stream
    pub discarded_bytes: u64,
}

// ============================================================================
// Journal Scanner
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ScanState {
    /// Fetching the next block
    Reading,
    /// Decoding records out of the current buffer
    Scanning,
    Done,
    Failed,
}

/// Lazy, single-pass decoder over a journal stream.
///
/// Yields [`JournalEntry`] values in on-disk order. Undecodable records are
/// reported as [`JournalEntry::Corrupted`] and the scan continues; an IO
/// error is yielded once and ends the scan.
pub struct JournalScanner<R> {
    reader: BlockReader<R>,
    config: ScanConfig,
    buffer: Vec<u8>,
    /// Start of the unconsumed part of `buffer`
    cursor: usize,
    /// Stream offset of `buffer[0]`
    buffer_offset: u64,
    next_index: u64,
    state: ScanState,
    stats: ScanStats,
}

impl<R: Read + Seek> JournalScanner<R> {
    /// Create a scanner with the default configuration
    pub fn new(inner: R) -> Self {
        let config = ScanConfig::default();
        Self::build(inner, config)
    }

    /// Create a scanner with a custom configuration
    pub fn with_config(inner: R, config: ScanConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self::build(inner, config))
    }

    fn build(inner: R, config: ScanConfig) -> Self {
        Self {
            reader: BlockReader::new(inner, config.block_size),
            config,
            buffer: Vec::new(),
            cursor: 0,
            buffer_offset: 0,
            next_index: 0,
            state: ScanState::Reading,
            stats: ScanStats::default(),
        }
    }

    pub fn config(&self) -> &ScanConfig {
        &self.config
    }

    /// Counters so far; final once the iterator returns `None`
    pub fn stats(&self) -> ScanStats {
        self.stats
    }

    /// Whether the scan has ended, normally or not
    pub fn is_finished(&self) -> bool {
        matches!(self.state, ScanState::Done | ScanState::Failed)
    }

    /// Load the next block, re-reading the unconsumed tail of the current one
    fn fill_buffer(&mut self) -> Result<()> {
        let leftover = self.buffer.len() - self.cursor;
        self.reader.rewind(leftover)?;

        let offset = self.reader.position()?;
        let block = self.reader.next_block()?;

        // With no new bytes behind it, a tail at or below the minimum record
        // size can never hold a record. A longer tail is a truncated record
        // and still gets its slot.
        if block.len() <= leftover && block.len() <= MIN_RECORD_SIZE {
            if !block.is_empty() {
                logging::log_discarded_tail(offset, block.len());
                self.stats.discarded_bytes += block.len() as u64;
            }
            self.buffer.clear();
            self.cursor = 0;
            self.finish(offset + block.len() as u64);
            return Ok(());
        }

        self.cursor = padding_len(&block);
        self.buffer = block;
        self.buffer_offset = offset;
        self.state = ScanState::Scanning;
        Ok(())
    }

    /// Decode the record at the cursor.
    ///
    /// Returns `Ok(None)` when the buffer needs more bytes first.
    fn scan_record(&mut self) -> Result<Option<JournalEntry>> {
        let remaining = self.buffer.len() - self.cursor;
        if remaining <= MIN_RECORD_SIZE {
            self.state = ScanState::Reading;
            return Ok(None);
        }

        let data = &self.buffer[self.cursor..];
        let header = RecordHeader::from_bytes(data)?;
        let declared = header.length as usize;
        let plausible = (MIN_RECORD_SIZE..=self.config.max_record_size).contains(&declared);

        if plausible && declared > remaining && !self.reader.is_exhausted() {
            // Record continues in the next block
            self.state = ScanState::Reading;
            return Ok(None);
        }

        // A length below the header size still consumes the header, so a
        // zeroed length cannot stall the scan.
        let size = declared.max(RECORD_HEADER_SIZE).min(remaining);
        let outcome = if plausible {
            decode_record(&header, &data[..size])
        } else {
            Err(UsnJrnlError::corrupted(format!(
                "declared length {} outside {}..={}",
                declared, MIN_RECORD_SIZE, self.config.max_record_size
            )))
        };

        let index = self.next_index;
        let offset = self.buffer_offset + self.cursor as u64;
        self.next_index += 1;

        self.cursor += size;
        self.cursor += padding_len(&self.buffer[self.cursor..]);

        match outcome {
            Ok(record) => {
                self.stats.records += 1;
                Ok(Some(JournalEntry::Record { index, record }))
            }
            Err(err) if err.is_unsupported_version() => {
                self.stats.unsupported += 1;
                logging::log_unsupported_version(
                    index,
                    offset,
                    header.major_version,
                    header.minor_version,
                );

                if self.config.strict_versions {
                    return Err(err);
                }
                self.stats.corrupted += 1;
                Ok(Some(JournalEntry::Corrupted(CorruptedRecord { index })))
            }
            Err(err) if err.is_recoverable() => {
                self.stats.corrupted += 1;
                logging::log_corrupted_record(index, offset, &err.to_string());
                Ok(Some(JournalEntry::Corrupted(CorruptedRecord { index })))
            }
            Err(err) => Err(err),
        }
    }

    fn finish(&mut self, stream_len: u64) {
        self.state = ScanState::Done;
        logging::log_scan_summary(self.stats.records, self.stats.corrupted, stream_len);
    }

    fn fail(&mut self, err: UsnJrnlError) -> UsnJrnlError {
        self.state = ScanState::Failed;
        logging::error(logging::USN, &format!("Scan aborted: {}", err));
        err
    }
}

impl<R: Read + Seek> Iterator for JournalScanner<R> {
    type Item = Result<JournalEntry>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            match self.state {
                ScanState::Done | ScanState::Failed => return None,
                ScanState::Reading => {
                    if let Err(err) = self.fill_buffer() {
                        return Some(Err(self.fail(err)));
                    }
                }
                ScanState::Scanning => match self.scan_record() {
                    Ok(Some(entry)) => return Some(Ok(entry)),
                    Ok(None) => {}
                    Err(err) => return Some(Err(self.fail(err))),
                },
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ntfs::flags::{file_attributes, usn_reason};
    use byteorder::{LittleEndian, WriteBytesExt};
    use std::io::{Cursor, SeekFrom};

    struct Spec<'a> {
        major: i16,
        frn: u64,
        usn: i64,
        timestamp: i64,
        name: &'a str,
    }

    fn spec(name: &str, usn: i64) -> Spec<'_> {
        Spec { major: 2, frn: 0x100 + usn as u64, usn, timestamp: 10_000_000 * usn, name }
    }

    /// Encode a V2 or V3 record with `frn` placed in the low part of the
    /// reference. The length is padded to 8 bytes as NTFS does.
    fn encode(spec: &Spec) -> Vec<u8> {
        let name: Vec<u8> = spec.name.encode_utf16().flat_map(|u| u.to_le_bytes()).collect();
        let fixed = if spec.major == 3 { V3_FIXED_SIZE } else { V2_FIXED_SIZE };
        let name_offset = RECORD_HEADER_SIZE + fixed;
        let length = (name_offset + name.len() + 7) & !7;

        let mut buf = Vec::new();
        buf.write_u32::<LittleEndian>(length as u32).unwrap();
        buf.write_i16::<LittleEndian>(spec.major).unwrap();
        buf.write_i16::<LittleEndian>(0).unwrap();
        if spec.major == 3 {
            buf.write_u64::<LittleEndian>(spec.frn).unwrap();
            buf.write_u64::<LittleEndian>(1).unwrap();
            buf.write_u64::<LittleEndian>(5).unwrap();
            buf.write_u64::<LittleEndian>(5).unwrap();
        } else {
            buf.write_u32::<LittleEndian>(spec.frn as u32).unwrap();
            buf.write_u16::<LittleEndian>(0).unwrap();
            buf.write_u16::<LittleEndian>(1).unwrap();
            buf.write_u32::<LittleEndian>(5).unwrap();
            buf.write_u16::<LittleEndian>(0).unwrap();
            buf.write_u16::<LittleEndian>(5).unwrap();
        }
        buf.write_i64::<LittleEndian>(spec.usn).unwrap();
        buf.write_i64::<LittleEndian>(spec.timestamp).unwrap();
        buf.write_u32::<LittleEndian>(usn_reason::DATA_EXTEND).unwrap();
        buf.write_u32::<LittleEndian>(0).unwrap();
        buf.write_u32::<LittleEndian>(0).unwrap();
        buf.write_u32::<LittleEndian>(file_attributes::ARCHIVE).unwrap();
        buf.write_i16::<LittleEndian>(name.len() as i16).unwrap();
        buf.write_i16::<LittleEndian>(name_offset as i16).unwrap();
        buf.extend_from_slice(&name);
        buf.resize(length, 0);
        buf
    }

    fn scan(data: Vec<u8>, block_size: usize) -> Vec<JournalEntry> {
        let config = ScanConfig { block_size, ..Default::default() };
        JournalScanner::with_config(Cursor::new(data), config)
            .unwrap()
            .map(|entry| entry.unwrap())
            .collect()
    }

    fn names(entries: &[JournalEntry]) -> Vec<String> {
        entries
            .iter()
            .filter_map(|e| e.record().map(|r| r.file_name.clone()))
            .collect()
    }

    #[test]
    fn test_three_back_to_back_records() {
        let specs = [spec("alpha.txt", 1), spec("beta.txt", 2), spec("gamma.txt", 3)];
        let mut journal = Vec::new();
        for s in &specs {
            journal.extend_from_slice(&encode(s));
        }

        let entries = scan(journal, 4096);
        assert_eq!(entries.len(), 3);

        for (i, (entry, s)) in entries.iter().zip(&specs).enumerate() {
            assert_eq!(entry.index(), i as u64);
            let record = entry.record().expect("decoded record");
            assert_eq!(record.file_name, s.name);
            assert_eq!(record.file_reference_number, s.frn);
            assert_eq!(record.update_sequence_number, s.usn);
            assert_eq!(record.timestamp.timestamp(), -11_644_473_600 + s.usn);
            assert_eq!(record.reasons, vec!["DATA_EXTEND"]);
            assert_eq!(record.file_attributes, vec!["ARCHIVE"]);
        }
    }

    #[test]
    fn test_corrupted_record_in_the_middle() {
        let mut journal = Vec::new();
        journal.extend_from_slice(&encode(&spec("first", 1)));

        // Declared length below the v2 fixed layout; only that many bytes present
        let truncated = encode(&spec("second", 2));
        let mut short = truncated[..40].to_vec();
        short[0..4].copy_from_slice(&40u32.to_le_bytes());
        journal.extend_from_slice(&short);

        journal.extend_from_slice(&encode(&spec("third", 3)));

        let entries = scan(journal, 4096);
        assert_eq!(entries.len(), 3);
        assert_eq!(entries[0].record().unwrap().file_name, "first");
        assert_eq!(entries[1], JournalEntry::Corrupted(CorruptedRecord { index: 1 }));
        assert_eq!(entries[2].index(), 2);
        assert_eq!(entries[2].record().unwrap().file_name, "third");
    }

    #[test]
    fn test_record_straddling_blocks() {
        let mut journal = Vec::new();
        journal.extend_from_slice(&encode(&spec("a-rather-long-file-name.log", 1)));
        journal.extend_from_slice(&encode(&spec("second.log", 2)));

        // Block smaller than a single record
        let entries = scan(journal.clone(), 32);
        assert_eq!(names(&entries), vec!["a-rather-long-file-name.log", "second.log"]);

        // Block boundary in the middle of the first record's file name
        let entries = scan(journal, 80);
        assert_eq!(names(&entries), vec!["a-rather-long-file-name.log", "second.log"]);
        assert!(entries.iter().all(|e| !e.is_corrupted()));
    }

    #[test]
    fn test_every_block_size_yields_same_records() {
        let mut journal = Vec::new();
        for usn in 1..=6 {
            let name = format!("file-{}.bin", "x".repeat(usn as usize * 3));
            journal.extend_from_slice(&encode(&spec(&name, usn)));
            journal.extend_from_slice(&[0u8; 24]);
        }

        let expected = names(&scan(journal.clone(), 4096));
        assert_eq!(expected.len(), 6);

        for block_size in [1, 7, 8, 59, 60, 61, 64, 100, 333] {
            let entries = scan(journal.clone(), block_size);
            assert_eq!(names(&entries), expected, "block size {}", block_size);
            let indices: Vec<u64> = entries.iter().map(|e| e.index()).collect();
            assert_eq!(indices, (0..6).collect::<Vec<_>>());
        }
    }

    #[test]
    fn test_padding_between_records_is_skipped() {
        let mut journal = vec![0u8; 4096];
        journal.extend_from_slice(&encode(&spec("after-padding", 1)));
        journal.extend_from_slice(&[0u8; 1000]);
        journal.extend_from_slice(&encode(&spec("late", 2)));

        let entries = scan(journal, 512);
        assert_eq!(names(&entries), vec!["after-padding", "late"]);
    }

    #[test]
    fn test_v3_records() {
        let mut journal = Vec::new();
        let mut first = spec("v3-entry", 4);
        first.major = 3;
        first.frn = 0x0005_0000_0000_1234;
        journal.extend_from_slice(&encode(&first));
        journal.extend_from_slice(&encode(&spec("v2-entry", 5)));

        let entries = scan(journal, 4096);
        let record = entries[0].record().unwrap();
        assert_eq!(record.version, 3.0);
        assert_eq!(record.file_reference_number, 0x0005_0000_0000_1234);
        assert_eq!(names(&entries), vec!["v3-entry", "v2-entry"]);
    }

    #[test]
    fn test_trailing_tail_below_minimum_is_discarded() {
        let mut journal = Vec::new();
        journal.extend_from_slice(&encode(&spec("only", 1)));
        journal.extend(std::iter::repeat(0xAB).take(MIN_RECORD_SIZE - 1));

        let data_len = journal.len();
        let mut scanner = JournalScanner::new(Cursor::new(journal));
        let entries: Vec<JournalEntry> = scanner.by_ref().map(|e| e.unwrap()).collect();

        assert_eq!(names(&entries), vec!["only"]);
        assert!(scanner.is_finished());
        assert_eq!(scanner.stats().discarded_bytes as usize, MIN_RECORD_SIZE - 1);
        assert!(data_len > MIN_RECORD_SIZE);
    }

    #[test]
    fn test_empty_stream() {
        assert!(scan(Vec::new(), 64).is_empty());
        assert!(scan(vec![0u8; 4096], 64).is_empty());
    }

    #[test]
    fn test_unsupported_version_becomes_marker() {
        let mut journal = Vec::new();
        journal.extend_from_slice(&encode(&spec("before", 1)));
        let mut v4 = encode(&spec("v4", 2));
        v4[4] = 4;
        journal.extend_from_slice(&v4);
        journal.extend_from_slice(&encode(&spec("after", 3)));

        let mut scanner = JournalScanner::new(Cursor::new(journal));
        let entries: Vec<JournalEntry> = scanner.by_ref().map(|e| e.unwrap()).collect();

        assert_eq!(entries.len(), 3);
        assert!(entries[1].is_corrupted());
        assert_eq!(names(&entries), vec!["before", "after"]);
        let stats = scanner.stats();
        assert_eq!(stats.unsupported, 1);
        assert_eq!(stats.corrupted, 1);
        assert_eq!(stats.records, 2);
    }

    #[test]
    fn test_unsupported_version_is_fatal_when_strict() {
        let mut journal = Vec::new();
        journal.extend_from_slice(&encode(&spec("before", 1)));
        let mut v4 = encode(&spec("v4", 2));
        v4[4] = 4;
        journal.extend_from_slice(&v4);
        journal.extend_from_slice(&encode(&spec("after", 3)));

        let config = ScanConfig { strict_versions: true, ..Default::default() };
        let mut scanner = JournalScanner::with_config(Cursor::new(journal), config).unwrap();

        assert!(scanner.next().unwrap().is_ok());
        let err = scanner.next().unwrap().unwrap_err();
        assert!(err.is_unsupported_version());
        assert!(scanner.next().is_none());
    }

    #[test]
    fn test_oversized_length_drops_rest_of_buffer() {
        let mut journal = Vec::new();
        let mut bogus = encode(&spec("bogus", 1));
        bogus[0..4].copy_from_slice(&0x00FF_FFFFu32.to_le_bytes());
        journal.extend_from_slice(&bogus);
        journal.resize(512, 0);
        journal.extend_from_slice(&encode(&spec("next-block", 2)));

        let entries = scan(journal, 512);
        assert_eq!(entries.len(), 2);
        assert!(entries[0].is_corrupted());
        assert_eq!(entries[1].record().unwrap().file_name, "next-block");
    }

    #[test]
    fn test_truncated_record_at_end_of_stream() {
        let mut journal = Vec::new();
        journal.extend_from_slice(&encode(&spec("complete", 1)));
        let cut = encode(&spec("cut-short-by-the-end", 2));
        journal.extend_from_slice(&cut[..cut.len() - 6]);

        let entries = scan(journal, 64);
        assert_eq!(entries.len(), 2);
        assert!(entries[1].is_corrupted());
    }

    struct FailingReader {
        inner: Cursor<Vec<u8>>,
        fail_after: u64,
    }

    impl Read for FailingReader {
        fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
            if self.inner.position() >= self.fail_after {
                return Err(std::io::Error::other("device detached"));
            }
            self.inner.read(buf)
        }
    }

    impl Seek for FailingReader {
        fn seek(&mut self, pos: SeekFrom) -> std::io::Result<u64> {
            self.inner.seek(pos)
        }
    }

    #[test]
    fn test_io_error_ends_scan() {
        let mut journal = Vec::new();
        journal.extend_from_slice(&encode(&spec("one", 1)));
        let first_len = journal.len() as u64;
        journal.extend_from_slice(&encode(&spec("two", 2)));

        let reader = FailingReader { inner: Cursor::new(journal), fail_after: first_len };
        let config = ScanConfig { block_size: first_len as usize, ..Default::default() };
        let mut scanner = JournalScanner::with_config(reader, config).unwrap();

        let results: Vec<Result<JournalEntry>> = scanner.by_ref().collect();
        assert!(matches!(results.last(), Some(Err(UsnJrnlError::IoError(_)))));
        assert!(scanner.is_finished());
        assert!(scanner.next().is_none());
    }
}
