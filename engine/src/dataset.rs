//! A loaded, normalized dataset with a row-id index.

use crate::normalize::Normalizer;
use crate::{Record, RowId};
use serde_json::Value;
use std::collections::HashMap;
use std::ops::Deref;
use tracing::{debug, warn};

/// Normalized records in load order, indexed by row id.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Dataset {
    records: Vec<Record>,
    index: HashMap<RowId, usize>,
}

impl Dataset {
    /// Index already normalized records. When two records share a row id the
    /// first one keeps the index entry.
    pub fn new(records: Vec<Record>) -> Self {
        let mut index = HashMap::with_capacity(records.len());
        let mut duplicates = 0usize;
        for (position, record) in records.iter().enumerate() {
            let id = record.row_key();
            if index.contains_key(&id) {
                duplicates += 1;
                debug!(row_id = %id, position, "duplicate row id");
                continue;
            }
            index.insert(id, position);
        }
        if duplicates > 0 {
            warn!(duplicates, total = records.len(), "dataset contains duplicate row ids");
        }
        Self { records, index }
    }

    /// Normalize a raw dataset document (array or wrapped array).
    pub fn from_document(document: &Value, normalizer: &Normalizer) -> Self {
        Self::new(normalizer.normalize_document(document))
    }

    /// Normalize raw rows with the default alias table.
    pub fn from_raw(raw: &[Value]) -> Self {
        Self::new(Normalizer::default().normalize(raw))
    }

    pub fn records(&self) -> &[Record] {
        &self.records
    }

    /// Look a record up by row id.
    pub fn get(&self, row_id: &str) -> Option<&Record> {
        self.index.get(row_id).map(|&i| &self.records[i])
    }

    pub fn contains(&self, row_id: &str) -> bool {
        self.index.contains_key(row_id)
    }

    /// Records for `row_ids` in the given order, unknown ids skipped.
    pub fn resolve<'a, I, S>(&'a self, row_ids: I) -> Vec<&'a Record>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        row_ids
            .into_iter()
            .filter_map(|id| self.get(id.as_ref()))
            .collect()
    }

    /// Number of distinct row ids.
    pub fn distinct_rows(&self) -> usize {
        self.index.len()
    }
}

impl Deref for Dataset {
    type Target = [Record];

    fn deref(&self) -> &Self::Target {
        &self.records
    }
}

impl From<Vec<Record>> for Dataset {
    fn from(records: Vec<Record>) -> Self {
        Self::new(records)
    }
}
