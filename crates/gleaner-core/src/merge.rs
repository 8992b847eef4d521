use std::collections::HashMap;

use crate::models::Record;
use crate::store::DeduplicationStore;

/// What a merge did to the stored set.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MergeSummary {
    pub added: usize,
    pub updated: usize,
    pub unchanged: usize,
    /// Size of the written set.
    pub total: usize,
}

/// Overlay `store` on the `existing` stored records.
///
/// Existing records keep their position; records the store does not know are
/// retained untouched. Store records replace an existing record with the same
/// identity in full, and unknown identities are appended in store order.
/// Applying the same store to the result again yields the same sequence.
pub fn merge_records(existing: Vec<Record>, store: &DeduplicationStore) -> (Vec<Record>, MergeSummary) {
    let mut merged: Vec<Record> = Vec::with_capacity(existing.len() + store.len());
    let mut index: HashMap<String, usize> = HashMap::with_capacity(existing.len());

    for record in existing {
        match index.get(record.key()) {
            Some(&i) => merged[i] = record,
            None => {
                index.insert(record.key().to_string(), merged.len());
                merged.push(record);
            }
        }
    }

    let mut summary = MergeSummary::default();
    for record in store.iter() {
        match index.get(record.key()) {
            Some(&i) if merged[i] == *record => summary.unchanged += 1,
            Some(&i) => {
                tracing::debug!(key = %record.key(), "Updating stored record");
                merged[i] = record.clone();
                summary.updated += 1;
            }
            None => {
                tracing::debug!(key = %record.key(), "Adding new record");
                index.insert(record.key().to_string(), merged.len());
                merged.push(record.clone());
                summary.added += 1;
            }
        }
    }

    summary.total = merged.len();
    (merged, summary)
}
