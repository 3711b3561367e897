//! Read-only view over a decoded text blob.

use std::collections::HashMap;

use crate::endian::DynEndian;
use crate::format::{Flags, TextIndexEntry};
use crate::hash::hash_name;

use super::row::{decode_row_at, decode_rows, TextDataPoint};

pub struct TextBlob {
    endian: DynEndian,
    flags: Flags,
    start_time_us: i64,
    entries: Vec<TextIndexEntry>,
    names: Vec<String>,
    id_to_idx: HashMap<u64, usize>,
    name_to_idx: HashMap<String, usize>,
    data: Vec<u8>,
}

impl TextBlob {
    pub(crate) fn new(
        endian: DynEndian,
        flags: Flags,
        start_time_us: i64,
        entries: Vec<TextIndexEntry>,
        names: Vec<String>,
        data: Vec<u8>,
    ) -> Self {
        let id_to_idx = entries.iter().enumerate().map(|(i, e)| (e.metric_id, i)).collect();
        let name_to_idx = names.iter().enumerate().map(|(i, n)| (n.clone(), i)).collect();
        Self {
            endian,
            flags,
            start_time_us,
            entries,
            names,
            id_to_idx,
            name_to_idx,
            data,
        }
    }

    pub fn start_time_us(&self) -> i64 {
        self.start_time_us
    }

    pub fn has_tag(&self) -> bool {
        self.flags.has_tag()
    }

    pub fn has_metric_names(&self) -> bool {
        self.flags.has_metric_names()
    }

    pub fn metric_count(&self) -> usize {
        self.entries.len()
    }

    pub fn metric_ids(&self) -> Vec<u64> {
        self.entries.iter().map(|e| e.metric_id).collect()
    }

    pub fn metric_names(&self) -> &[String] {
        &self.names
    }

    pub fn has_metric_id(&self, id: u64) -> bool {
        self.id_to_idx.contains_key(&id)
    }

    pub fn has_metric_name(&self, name: &str) -> bool {
        self.resolve_by_name(name).is_some()
    }

    /// The stored name for `id`, if `HasMetricNames` and `id` is present.
    pub fn name_for_id(&self, id: u64) -> Option<String> {
        if !self.flags.has_metric_names() {
            return None;
        }
        self.id_to_idx.get(&id).and_then(|&i| self.names.get(i).cloned())
    }

    fn resolve_by_id(&self, id: u64) -> Option<usize> {
        self.id_to_idx.get(&id).copied()
    }

    /// Resolves a name via the stored names payload if present, else by
    /// falling back to `H(name)`.
    fn resolve_by_name(&self, name: &str) -> Option<usize> {
        if self.flags.has_metric_names() {
            self.name_to_idx.get(name).copied()
        } else {
            self.resolve_by_id(hash_name(name))
        }
    }

    pub fn len(&self, id: u64) -> Option<usize> {
        self.resolve_by_id(id).map(|i| self.entries[i].count as usize)
    }

    pub fn len_by_name(&self, name: &str) -> Option<usize> {
        self.resolve_by_name(name).map(|i| self.entries[i].count as usize)
    }

    fn row_slice(&self, i: usize) -> &[u8] {
        let e = &self.entries[i];
        &self.data[e.offset as usize..(e.offset + e.size) as usize]
    }

    pub fn all(&self, id: u64) -> Option<Vec<TextDataPoint>> {
        let i = self.resolve_by_id(id)?;
        let entry = &self.entries[i];
        decode_rows(self.row_slice(i), entry.count as usize, self.flags.ts_encoding().ok()?, self.endian, self.flags.has_tag()).ok()
    }

    pub fn all_by_name(&self, name: &str) -> Option<Vec<TextDataPoint>> {
        let i = self.resolve_by_name(name)?;
        self.all(self.entries[i].metric_id)
    }

    pub fn at(&self, id: u64, i: usize) -> Option<TextDataPoint> {
        let idx = self.resolve_by_id(id)?;
        let entry = &self.entries[idx];
        decode_row_at(self.row_slice(idx), entry.count as usize, self.flags.ts_encoding().ok()?, self.endian, self.flags.has_tag(), i)
    }

    pub fn at_by_name(&self, name: &str, i: usize) -> Option<TextDataPoint> {
        let idx = self.resolve_by_name(name)?;
        self.at(self.entries[idx].metric_id, i)
    }

    pub fn materialize(&self) -> super::materialized::MaterializedTextBlob {
        super::materialized::MaterializedTextBlob::from_blob(self)
    }

    pub fn materialize_metric(&self, id: u64) -> Option<super::materialized::MaterializedTextMetric> {
        super::materialized::MaterializedTextMetric::from_blob(self, id)
    }
}
