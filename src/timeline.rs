//! Journal timeline
//!
//! A single file operation usually leaves several consecutive journal
//! records (one per reason bit set while the handle was open, then a close).
//! This module folds such runs into one event per change.

use crate::logging;
use crate::ntfs::usn::JournalEntry;
use crate::ntfs::UsnRecord;
use chrono::{DateTime, Utc};
use serde::Serialize;

/// Consecutive records for the same file, name and timestamp
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct JournalEvent {
    pub file_reference_number: u64,
    pub parent_file_reference_number: u64,
    pub file_name: String,
    pub timestamp: DateTime<Utc>,
    /// Union of the run's reasons, in first-seen order
    pub reasons: Vec<&'static str>,
    /// Union of the run's attributes, in first-seen order
    pub file_attributes: Vec<&'static str>,
}

impl JournalEvent {
    fn from_record(record: UsnRecord) -> Self {
        Self {
            file_reference_number: record.file_reference_number,
            parent_file_reference_number: record.parent_file_reference_number,
            file_name: record.file_name,
            timestamp: record.timestamp,
            reasons: record.reasons,
            file_attributes: record.file_attributes,
        }
    }

    fn same_change(&self, record: &UsnRecord) -> bool {
        self.file_reference_number == record.file_reference_number
            && self.file_name == record.file_name
            && self.timestamp == record.timestamp
    }

    fn merge(&mut self, record: &UsnRecord) {
        merge_names(&mut self.reasons, &record.reasons);
        merge_names(&mut self.file_attributes, &record.file_attributes);
    }
}

fn merge_names(into: &mut Vec<&'static str>, names: &[&'static str]) {
    for name in names {
        if !into.contains(name) {
            into.push(*name);
        }
    }
}

/// Counters for a timeline build
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct TimelineStats {
    /// Decoded records consumed
    pub records: u64,
    /// Corrupted markers dropped
    pub corrupted: u64,
    /// Events produced
    pub events: u64,
}

/// Fold decoded records into events, dropping corrupted markers
pub fn coalesce_events<I>(entries: I) -> (Vec<JournalEvent>, TimelineStats)
where
    I: IntoIterator<Item = JournalEntry>,
{
    let mut events: Vec<JournalEvent> = Vec::new();
    let mut stats = TimelineStats::default();

    for entry in entries {
        let record = match entry.into_record() {
            Some(record) => record,
            None => {
                stats.corrupted += 1;
                continue;
            }
        };
        stats.records += 1;

        if let Some(last) = events.last_mut() {
            if last.same_change(&record) {
                last.merge(&record);
                continue;
            }
        }
        events.push(JournalEvent::from_record(record));
    }

    stats.events = events.len() as u64;

    if stats.corrupted > 0 {
        logging::debug(
            logging::TIMELINE,
            &format!(
                "Corrupted records in UsnJrnl, some events might be missing ({} dropped)",
                stats.corrupted
            ),
        );
    }

    (events, stats)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ntfs::usn::CorruptedRecord;
    use crate::ntfs::filetime_to_datetime;

    fn record(frn: u64, name: &str, seconds: i64, reasons: &[&'static str]) -> UsnRecord {
        UsnRecord {
            length: 96,
            version: 2.0,
            file_reference_number: frn,
            file_reference_number_sequence: 1,
            parent_file_reference_number: 5,
            parent_file_reference_number_sequence: 5,
            update_sequence_number: 0,
            timestamp: filetime_to_datetime(seconds * 10_000_000).unwrap(),
            reasons: reasons.to_vec(),
            source_info: vec![" "],
            security_id: 0,
            file_attributes: vec!["ARCHIVE"],
            file_name: name.to_string(),
        }
    }

    fn entry(index: u64, record: UsnRecord) -> JournalEntry {
        JournalEntry::Record { index, record }
    }

    #[test]
    fn test_consecutive_records_merge() {
        let entries = vec![
            entry(0, record(40, "notes.txt", 100, &["FILE_CREATE"])),
            entry(1, record(40, "notes.txt", 100, &["DATA_EXTEND", "FILE_CREATE"])),
            entry(2, record(40, "notes.txt", 100, &["DATA_EXTEND", "CLOSED"])),
            entry(3, record(40, "notes.txt", 101, &["FILE_DELETE", "CLOSED"])),
        ];

        let (events, stats) = coalesce_events(entries);
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].reasons, vec!["FILE_CREATE", "DATA_EXTEND", "CLOSED"]);
        assert_eq!(events[1].reasons, vec!["FILE_DELETE", "CLOSED"]);
        assert_eq!(stats, TimelineStats { records: 4, corrupted: 0, events: 2 });
    }

    #[test]
    fn test_interleaved_files_do_not_merge() {
        let entries = vec![
            entry(0, record(40, "a.txt", 100, &["FILE_CREATE"])),
            entry(1, record(41, "b.txt", 100, &["FILE_CREATE"])),
            entry(2, record(40, "a.txt", 100, &["CLOSED"])),
        ];

        let (events, _) = coalesce_events(entries);
        assert_eq!(events.len(), 3);
    }

    #[test]
    fn test_corrupted_markers_are_dropped() {
        let entries = vec![
            entry(0, record(40, "a.txt", 100, &["FILE_CREATE"])),
            JournalEntry::Corrupted(CorruptedRecord { index: 1 }),
            entry(2, record(40, "a.txt", 100, &["CLOSED"])),
        ];

        let (events, stats) = coalesce_events(entries);
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].reasons, vec!["FILE_CREATE", "CLOSED"]);
        assert_eq!(stats.corrupted, 1);
        assert_eq!(stats.records, 2);
    }
}
