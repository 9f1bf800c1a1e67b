//! Entity store: all data records of one file, indexed by instance ID.

use std::collections::HashMap;

use crate::error::StepError;
use crate::parser::Record;

/// Arena of records with ID lookup.
///
/// Records keep file order. When an ID occurs more than once the later record
/// wins, taking over the slot (and file position) of the first occurrence.
#[derive(Debug, Default)]
pub struct EntityStore {
    records: Vec<Record>,
    slots: HashMap<u64, usize>,
    duplicates: usize,
}

impl EntityStore {
    /// Build the store from parsed records.
    pub fn index(records: Vec<Record>) -> Self {
        let mut store = Self {
            records: Vec::with_capacity(records.len()),
            slots: HashMap::with_capacity(records.len()),
            duplicates: 0,
        };
        for record in records {
            store.insert(record);
        }
        store
    }

    fn insert(&mut self, record: Record) {
        match self.slots.get(&record.id) {
            Some(&slot) => {
                tracing::debug!(
                    id = record.id,
                    first_line = self.records[slot].line,
                    line = record.line,
                    "duplicate instance id, keeping the later record"
                );
                self.records[slot] = record;
                self.duplicates += 1;
            }
            None => {
                self.slots.insert(record.id, self.records.len());
                self.records.push(record);
            }
        }
    }

    /// Get a record by ID.
    pub fn get(&self, id: u64) -> Option<&Record> {
        self.slots.get(&id).map(|&slot| &self.records[slot])
    }

    /// Get a record by ID, returning an error if not found.
    pub fn require(&self, id: u64) -> Result<&Record, StepError> {
        self.get(id).ok_or(StepError::UnresolvedReference(id))
    }

    /// All records with the given keyword, in file order.
    pub fn all_of_kind<'a>(&'a self, keyword: &'a str) -> impl Iterator<Item = &'a Record> + 'a {
        self.records.iter().filter(move |r| r.keyword == keyword)
    }

    /// All records in file order.
    pub fn iter(&self) -> impl Iterator<Item = &Record> {
        self.records.iter()
    }

    /// Number of distinct instance IDs.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Whether the store holds no records.
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Number of records that were replaced by a later record with the same ID.
    pub fn duplicates(&self) -> usize {
        self.duplicates
    }
}
