//! Read-only view over a decoded numeric blob.

use std::collections::HashMap;

use crate::endian::DynEndian;
use crate::format::{Flags, NumericIndexEntry};
use crate::hash::hash_name;

use super::columns::{decode_tag_at, decode_tags, decode_ts, decode_ts_at, decode_val, decode_val_at};

/// One decoded data point.
#[derive(Debug, Clone, PartialEq)]
pub struct DataPoint {
    pub timestamp: i64,
    pub value: f64,
    pub tag: Option<String>,
}

pub struct NumericBlob {
    endian: DynEndian,
    flags: Flags,
    start_time_us: i64,
    entries: Vec<NumericIndexEntry>,
    names: Vec<String>,
    id_to_idx: HashMap<u64, usize>,
    name_to_idx: HashMap<String, usize>,
    ts_bytes: Vec<u8>,
    val_bytes: Vec<u8>,
    tag_bytes: Vec<u8>,
    ts_abs: Vec<u64>,
    val_abs: Vec<u64>,
    tag_abs: Vec<u64>,
}

impl NumericBlob {
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn new(
        endian: DynEndian,
        flags: Flags,
        start_time_us: i64,
        entries: Vec<NumericIndexEntry>,
        names: Vec<String>,
        ts_bytes: Vec<u8>,
        val_bytes: Vec<u8>,
        tag_bytes: Vec<u8>,
        ts_abs: Vec<u64>,
        val_abs: Vec<u64>,
        tag_abs: Vec<u64>,
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
            ts_bytes,
            val_bytes,
            tag_bytes,
            ts_abs,
            val_abs,
            tag_abs,
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

    /// Resolves a name to an index entry: via the stored names payload if
    /// present, else by falling back to `H(name)`.
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

    fn ts_slice(&self, i: usize) -> &[u8] {
        &self.ts_bytes[self.ts_abs[i] as usize..self.ts_abs[i + 1] as usize]
    }

    fn val_slice(&self, i: usize) -> &[u8] {
        &self.val_bytes[self.val_abs[i] as usize..self.val_abs[i + 1] as usize]
    }

    fn tag_slice(&self, i: usize) -> &[u8] {
        &self.tag_bytes[self.tag_abs[i] as usize..self.tag_abs[i + 1] as usize]
    }

    pub fn all_timestamps(&self, id: u64) -> Option<Vec<i64>> {
        let i = self.resolve_by_id(id)?;
        let entry = &self.entries[i];
        decode_ts(self.flags.ts_encoding().ok()?, self.endian, self.ts_slice(i), entry.count as usize).ok()
    }

    pub fn all_timestamps_by_name(&self, name: &str) -> Option<Vec<i64>> {
        let i = self.resolve_by_name(name)?;
        self.all_timestamps(self.entries[i].metric_id)
    }

    pub fn all_values(&self, id: u64) -> Option<Vec<f64>> {
        let i = self.resolve_by_id(id)?;
        let entry = &self.entries[i];
        decode_val(self.flags.val_encoding().ok()?, self.endian, self.val_slice(i), entry.count as usize).ok()
    }

    pub fn all_values_by_name(&self, name: &str) -> Option<Vec<f64>> {
        let i = self.resolve_by_name(name)?;
        self.all_values(self.entries[i].metric_id)
    }

    pub fn all_tags(&self, id: u64) -> Option<Vec<String>> {
        let i = self.resolve_by_id(id)?;
        if !self.flags.has_tag() {
            return Some(Vec::new());
        }
        let entry = &self.entries[i];
        decode_tags(self.endian, self.tag_slice(i), entry.count as usize).ok()
    }

    pub fn all_tags_by_name(&self, name: &str) -> Option<Vec<String>> {
        let i = self.resolve_by_name(name)?;
        self.all_tags(self.entries[i].metric_id)
    }

    pub fn all(&self, id: u64) -> Option<Vec<DataPoint>> {
        let ts = self.all_timestamps(id)?;
        let vals = self.all_values(id)?;
        let tags = self.all_tags(id).unwrap_or_default();
        Some(
            ts.into_iter()
                .zip(vals)
                .enumerate()
                .map(|(i, (timestamp, value))| DataPoint {
                    timestamp,
                    value,
                    tag: tags.get(i).cloned(),
                })
                .collect(),
        )
    }

    pub fn timestamp_at(&self, id: u64, i: usize) -> Option<i64> {
        let idx = self.resolve_by_id(id)?;
        let entry = &self.entries[idx];
        decode_ts_at(self.flags.ts_encoding().ok()?, self.endian, self.ts_slice(idx), entry.count as usize, i)
    }

    pub fn value_at(&self, id: u64, i: usize) -> Option<f64> {
        let idx = self.resolve_by_id(id)?;
        let entry = &self.entries[idx];
        decode_val_at(self.flags.val_encoding().ok()?, self.endian, self.val_slice(idx), entry.count as usize, i)
    }

    pub fn tag_at(&self, id: u64, i: usize) -> Option<String> {
        if !self.flags.has_tag() {
            return None;
        }
        let idx = self.resolve_by_id(id)?;
        let entry = &self.entries[idx];
        decode_tag_at(self.endian, self.tag_slice(idx), entry.count as usize, i)
    }

    pub fn timestamp_at_by_name(&self, name: &str, i: usize) -> Option<i64> {
        let idx = self.resolve_by_name(name)?;
        self.timestamp_at(self.entries[idx].metric_id, i)
    }

    pub fn value_at_by_name(&self, name: &str, i: usize) -> Option<f64> {
        let idx = self.resolve_by_name(name)?;
        self.value_at(self.entries[idx].metric_id, i)
    }

    pub fn tag_at_by_name(&self, name: &str, i: usize) -> Option<String> {
        let idx = self.resolve_by_name(name)?;
        self.tag_at(self.entries[idx].metric_id, i)
    }

    pub fn materialize(&self) -> super::materialized::MaterializedNumericBlob {
        super::materialized::MaterializedNumericBlob::from_blob(self)
    }

    pub fn materialize_metric(&self, id: u64) -> Option<super::materialized::MaterializedMetric> {
        super::materialized::MaterializedMetric::from_blob(self, id)
    }
}
