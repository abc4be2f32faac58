// src/table/registry.rs
use serde::ser::{Serialize, SerializeMap, Serializer};
use std::collections::HashMap;

use super::codes::TrackedCodes;
use super::record::CurrencyRecord;

/// Code → record mapping for one pass. Iterates in tracked-code order.
#[derive(Debug, Clone, PartialEq)]
pub struct Registry {
    records: Vec<CurrencyRecord>,
    index: HashMap<String, usize>,
}

impl Registry {
    /// One skeleton record per tracked code, so codes missing from the page
    /// still show up (empty) at the sink.
    pub fn initialize(codes: &TrackedCodes) -> Self {
        let records: Vec<CurrencyRecord> = codes.iter().map(CurrencyRecord::skeleton).collect();
        let index = records
            .iter()
            .enumerate()
            .map(|(i, r)| (r.code.clone(), i))
            .collect();
        Self { records, index }
    }

    /// Slot of `code` in the registry, if tracked. Exact match only.
    pub fn position(&self, code: &str) -> Option<usize> {
        self.index.get(code).copied()
    }

    pub fn get(&self, code: &str) -> Option<&CurrencyRecord> {
        self.position(code).map(|i| &self.records[i])
    }

    pub(crate) fn slot_mut(&mut self, slot: usize) -> &mut CurrencyRecord {
        &mut self.records[slot]
    }

    pub fn iter(&self) -> impl Iterator<Item = &CurrencyRecord> {
        self.records.iter()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Number of tracked codes that were anchored on the page.
    pub fn observed_count(&self) -> usize {
        self.records.iter().filter(|r| r.is_observed()).count()
    }

    /// Total field parse failures across all records.
    pub fn parse_failure_count(&self) -> usize {
        self.records.iter().map(|r| r.parse_failures.len()).sum()
    }

    pub fn into_records(self) -> Vec<CurrencyRecord> {
        self.records
    }
}

impl Serialize for Registry {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.records.len()))?;
        for record in &self.records {
            map.serialize_entry(&record.code, record)?;
        }
        map.end()
    }
}
