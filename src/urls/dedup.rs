use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use serde::{Serialize, Serializer};
use std::collections::BTreeSet;
use std::fmt;
use std::sync::atomic::{AtomicU8, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use super::normalizer::CanonicalUrl;
use crate::core::types::SourceLocation;

/// Identity of a link for deduplication.
///
/// Raw strings that fail normalization are still indexed, keyed by their
/// cleaned text, so repeated malformed links fan in to one result.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum LinkKey {
    Canonical(CanonicalUrl),
    Malformed(String),
}

impl LinkKey {
    pub fn canonical(&self) -> Option<&CanonicalUrl> {
        match self {
            LinkKey::Canonical(url) => Some(url),
            LinkKey::Malformed(_) => None,
        }
    }

    pub fn is_malformed(&self) -> bool {
        matches!(self, LinkKey::Malformed(_))
    }
}

impl fmt::Display for LinkKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LinkKey::Canonical(url) => write!(f, "{url}"),
            LinkKey::Malformed(raw) => f.write_str(raw),
        }
    }
}

impl Serialize for LinkKey {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// Lifecycle of a record. Transitions only move forward.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum RecordState {
    Pending = 0,
    InFlight = 1,
    Done = 2,
}

impl RecordState {
    fn from_u8(value: u8) -> Self {
        match value {
            0 => RecordState::Pending,
            1 => RecordState::InFlight,
            _ => RecordState::Done,
        }
    }
}

/// One distinct link and every place it was seen.
#[derive(Debug)]
pub struct UrlRecord {
    key: LinkKey,
    locations: Mutex<BTreeSet<SourceLocation>>,
    state: AtomicU8,
}

impl UrlRecord {
    fn new(key: LinkKey, first: SourceLocation) -> Self {
        Self {
            key,
            locations: Mutex::new(BTreeSet::from([first])),
            state: AtomicU8::new(RecordState::Pending as u8),
        }
    }

    pub fn key(&self) -> &LinkKey {
        &self.key
    }

    pub fn state(&self) -> RecordState {
        RecordState::from_u8(self.state.load(Ordering::Acquire))
    }

    /// Pending → InFlight. Returns false if the record was already started or finished.
    pub fn begin(&self) -> bool {
        self.state
            .compare_exchange(
                RecordState::Pending as u8,
                RecordState::InFlight as u8,
                Ordering::AcqRel,
                Ordering::Acquire,
            )
            .is_ok()
    }

    /// Move to Done and hand out the location set.
    ///
    /// Only the first caller receives the locations; every later call returns `None`.
    pub fn complete(&self) -> Option<Vec<SourceLocation>> {
        let previous = self.state.swap(RecordState::Done as u8, Ordering::AcqRel);
        if previous == RecordState::Done as u8 {
            return None;
        }
        Some(self.locations().into_iter().collect())
    }

    fn add_location(&self, location: SourceLocation) -> bool {
        self.locations
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(location)
    }

    pub fn locations(&self) -> BTreeSet<SourceLocation> {
        self.locations
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn location_count(&self) -> usize {
        self.locations
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }
}

/// Result of offering an occurrence to the index
#[derive(Debug, Clone)]
pub enum Admission {
    /// First sighting; the caller must schedule the record exactly once
    Admitted(Arc<UrlRecord>),
    /// Already known; the location was appended
    Merged,
}

/// Concurrent map from link identity to its record.
///
/// Create-or-merge happens under the shard lock of the key, so two
/// concurrent admits of the same key never both see `Admitted`.
#[derive(Debug, Default)]
pub struct DedupIndex {
    records: DashMap<LinkKey, Arc<UrlRecord>>,
    occurrences: AtomicUsize,
}

impl DedupIndex {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn admit(&self, key: LinkKey, location: SourceLocation) -> Admission {
        self.occurrences.fetch_add(1, Ordering::Relaxed);

        match self.records.entry(key) {
            Entry::Occupied(entry) => {
                entry.get().add_location(location);
                Admission::Merged
            }
            Entry::Vacant(entry) => {
                let record = Arc::new(UrlRecord::new(entry.key().clone(), location));
                entry.insert(Arc::clone(&record));
                Admission::Admitted(record)
            }
        }
    }

    pub fn get(&self, key: &LinkKey) -> Option<Arc<UrlRecord>> {
        self.records.get(key).map(|record| Arc::clone(record.value()))
    }

    /// Number of distinct links
    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Number of occurrences offered so far, duplicates included
    pub fn occurrences(&self) -> usize {
        self.occurrences.load(Ordering::Relaxed)
    }

    /// Records that have not reached Done yet
    pub fn unfinished(&self) -> Vec<Arc<UrlRecord>> {
        self.records
            .iter()
            .filter(|record| record.state() != RecordState::Done)
            .map(|record| Arc::clone(record.value()))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    #![allow(non_snake_case)]

    use super::*;
    use crate::urls::normalize;
    use std::thread;

    fn key(raw: &str) -> LinkKey {
        LinkKey::Canonical(normalize(raw).unwrap())
    }

    #[test]
    fn test_admit__first_sighting_is_admitted() {
        let index = DedupIndex::new();
        let admission = index.admit(key("https://example.com"), SourceLocation::line("a.md", 1));

        let Admission::Admitted(record) = admission else {
            panic!("expected Admitted");
        };
        assert_eq!(record.state(), RecordState::Pending);
        assert_eq!(record.location_count(), 1);
        assert_eq!(index.len(), 1);
    }

    #[test]
    fn test_admit__repeat_sighting_merges() {
        let index = DedupIndex::new();
        index.admit(key("https://example.com/a"), SourceLocation::line("a.md", 1));
        let second = index.admit(key("HTTPS://example.com/a/"), SourceLocation::line("b.md", 4));
        // Same document and line again only counts once
        let third = index.admit(key("https://example.com/a"), SourceLocation::line("b.md", 4));

        assert!(matches!(second, Admission::Merged));
        assert!(matches!(third, Admission::Merged));
        assert_eq!(index.len(), 1);
        assert_eq!(index.occurrences(), 3);

        let record = index.get(&key("https://example.com/a")).unwrap();
        let locations: Vec<_> = record.locations().into_iter().collect();
        assert_eq!(
            locations,
            vec![SourceLocation::line("a.md", 1), SourceLocation::line("b.md", 4)]
        );
    }

    #[test]
    fn test_admit__malformed_keys_fan_in() {
        let index = DedupIndex::new();
        let first = index.admit(
            LinkKey::Malformed("htp:/broken".to_string()),
            SourceLocation::line("a.md", 1),
        );
        let second = index.admit(
            LinkKey::Malformed("htp:/broken".to_string()),
            SourceLocation::line("a.md", 9),
        );

        assert!(matches!(first, Admission::Admitted(_)));
        assert!(matches!(second, Admission::Merged));
        assert!(index.get(&LinkKey::Malformed("htp:/broken".to_string())).unwrap().key().is_malformed());
    }

    #[test]
    fn test_admit__concurrent_producers_admit_once() {
        let index = Arc::new(DedupIndex::new());
        let handles: Vec<_> = (0..8)
            .map(|producer| {
                let index = Arc::clone(&index);
                thread::spawn(move || {
                    let mut admitted = 0;
                    for line in 1..=50 {
                        let location = SourceLocation::line(format!("doc{producer}.md"), line);
                        if let Admission::Admitted(_) =
                            index.admit(key("https://example.com/shared"), location)
                        {
                            admitted += 1;
                        }
                    }
                    admitted
                })
            })
            .collect();

        let admitted: usize = handles.into_iter().map(|h| h.join().unwrap()).sum();
        assert_eq!(admitted, 1);
        assert_eq!(index.len(), 1);
        assert_eq!(index.occurrences(), 400);
        assert_eq!(
            index.get(&key("https://example.com/shared")).unwrap().location_count(),
            400
        );
    }

    #[test]
    fn test_record__state_transitions() {
        let index = DedupIndex::new();
        let Admission::Admitted(record) =
            index.admit(key("https://example.com"), SourceLocation::line("a.md", 1))
        else {
            panic!("expected Admitted");
        };

        assert!(record.begin());
        assert!(!record.begin());
        assert_eq!(record.state(), RecordState::InFlight);
        assert_eq!(index.unfinished().len(), 1);

        let locations = record.complete().unwrap();
        assert_eq!(locations, vec![SourceLocation::line("a.md", 1)]);
        assert_eq!(record.state(), RecordState::Done);
        assert!(record.complete().is_none());
        assert!(!record.begin());
        assert!(index.unfinished().is_empty());
    }

    #[test]
    fn test_record__complete_from_pending() {
        let index = DedupIndex::new();
        let Admission::Admitted(record) = index.admit(
            LinkKey::Malformed("nope".to_string()),
            SourceLocation::line("a.md", 1),
        ) else {
            panic!("expected Admitted");
        };

        assert!(record.complete().is_some());
        assert!(record.complete().is_none());
    }

    #[test]
    fn test_link_key__display() {
        assert_eq!(key("https://Example.com/a/").to_string(), "https://example.com/a");
        assert_eq!(LinkKey::Malformed("ftp://x".to_string()).to_string(), "ftp://x");
    }
}
