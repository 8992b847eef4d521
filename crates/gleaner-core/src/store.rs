use std::collections::{HashMap, HashSet};

use crate::error::AppError;
use crate::models::Record;
use crate::traits::PersistenceWriter;

/// How records already present in durable storage are treated when the
/// crawl meets them again.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RevisitPolicy {
    /// Re-extract stored records and overwrite them with the fresh values.
    /// Records collected earlier in the same run are still skipped.
    #[default]
    Refresh,
    /// Treat every stored record as already known and never revisit it.
    SkipStored,
}

/// Result of a single [`DeduplicationStore::upsert`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpsertOutcome {
    Inserted,
    Updated,
    Unchanged,
}

/// In-memory identity → record map for one crawl.
///
/// Iteration order is insertion order: seeded records first, in the order
/// they were loaded, then new identities in the order they were discovered.
/// Replacing a record keeps its position.
#[derive(Debug, Clone, Default)]
pub struct DeduplicationStore {
    records: Vec<Record>,
    index: HashMap<String, usize>,
    /// Identities upserted during this run.
    collected: HashSet<String>,
    policy: RevisitPolicy,
}

impl DeduplicationStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a store from previously persisted records. A repeated identity
    /// replaces the earlier record in place.
    pub fn seeded(records: impl IntoIterator<Item = Record>) -> Self {
        let mut store = Self::new();
        for record in records {
            store.put(record);
        }
        store
    }

    /// Seed a store from whatever `writer` currently holds.
    pub fn load_from<W: PersistenceWriter>(writer: &W) -> Result<Self, AppError> {
        let records = writer.load()?;
        tracing::info!(records = records.len(), "Loaded stored records");
        Ok(Self::seeded(records))
    }

    pub fn with_policy(mut self, policy: RevisitPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn policy(&self) -> RevisitPolicy {
        self.policy
    }

    /// Whether the crawler may skip an item with this identity.
    pub fn contains(&self, key: &str) -> bool {
        self.collected.contains(key)
            || (self.policy == RevisitPolicy::SkipStored && self.index.contains_key(key))
    }

    pub fn get(&self, key: &str) -> Option<&Record> {
        self.index.get(key).map(|&i| &self.records[i])
    }

    /// Insert `record`, or fully replace the record with the same identity.
    pub fn upsert(&mut self, record: Record) -> UpsertOutcome {
        self.collected.insert(record.key().to_string());
        self.put(record)
    }

    fn put(&mut self, record: Record) -> UpsertOutcome {
        match self.index.get(record.key()) {
            Some(&i) if self.records[i] == record => UpsertOutcome::Unchanged,
            Some(&i) => {
                self.records[i] = record;
                UpsertOutcome::Updated
            }
            None => {
                self.index
                    .insert(record.key().to_string(), self.records.len());
                self.records.push(record);
                UpsertOutcome::Inserted
            }
        }
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Number of identities upserted during this run.
    pub fn collected_len(&self) -> usize {
        self.collected.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Record> {
        self.records.iter()
    }
}
