use std::collections::HashSet;

use crate::record::{DedupKey, Keyed};

/// First-seen-wins record collector scoped to one session.
#[derive(Debug, Clone)]
pub struct Deduplicator<R> {
    seen: HashSet<DedupKey>,
    records: Vec<R>,
}

impl<R: Keyed> Deduplicator<R> {
    pub fn new() -> Self {
        Self {
            seen: HashSet::new(),
            records: Vec::new(),
        }
    }

    /// Returns `true` if the record was new and has been kept.
    pub fn add(&mut self, record: R) -> bool {
        if self.seen.insert(record.dedup_key()) {
            self.records.push(record);
            true
        } else {
            false
        }
    }

    /// Adds every record and returns how many were new.
    pub fn extend(&mut self, records: impl IntoIterator<Item = R>) -> usize {
        let mut added = 0;
        for record in records {
            if self.add(record) {
                added += 1;
            }
        }
        added
    }

    pub fn contains(&self, key: &DedupKey) -> bool {
        self.seen.contains(key)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn records(&self) -> &[R] {
        &self.records
    }

    pub fn into_records(self) -> Vec<R> {
        self.records
    }
}

impl<R: Keyed> Default for Deduplicator<R> {
    fn default() -> Self {
        Self::new()
    }
}
