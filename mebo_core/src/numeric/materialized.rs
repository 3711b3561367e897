//! Decode-once, random-access-many views built from one or more blobs.

use std::collections::{HashMap, HashSet};

use super::blob::{DataPoint, NumericBlob};

/// One metric's fully decoded columns from a single blob.
#[derive(Debug, Clone)]
pub struct MaterializedMetric {
    pub id: u64,
    pub name: Option<String>,
    pub timestamps: Vec<i64>,
    pub values: Vec<f64>,
    pub tags: Vec<String>,
}

impl MaterializedMetric {
    pub(crate) fn from_blob(blob: &NumericBlob, id: u64) -> Option<Self> {
        let timestamps = blob.all_timestamps(id)?;
        let values = blob.all_values(id)?;
        let tags = blob.all_tags(id).unwrap_or_default();
        Some(Self {
            id,
            name: blob.name_for_id(id),
            timestamps,
            values,
            tags,
        })
    }

    pub fn data_point_count(&self) -> usize {
        self.timestamps.len()
    }

    pub fn value_at(&self, i: usize) -> Option<f64> {
        self.values.get(i).copied()
    }

    pub fn timestamp_at(&self, i: usize) -> Option<i64> {
        self.timestamps.get(i).copied()
    }

    pub fn tag_at(&self, i: usize) -> Option<String> {
        self.tags.get(i).cloned()
    }

    pub fn as_data_points(&self) -> Vec<DataPoint> {
        self.timestamps
            .iter()
            .zip(self.values.iter())
            .enumerate()
            .map(|(i, (&timestamp, &value))| DataPoint {
                timestamp,
                value,
                tag: self.tags.get(i).cloned(),
            })
            .collect()
    }
}

/// All metrics of a single blob, decoded once via `blob.materialize()`.
pub struct MaterializedNumericBlob {
    metrics: Vec<MaterializedMetric>,
    id_to_idx: HashMap<u64, usize>,
    name_to_idx: HashMap<String, usize>,
}

impl MaterializedNumericBlob {
    pub(crate) fn from_blob(blob: &NumericBlob) -> Self {
        let metrics: Vec<MaterializedMetric> = blob
            .metric_ids()
            .into_iter()
            .filter_map(|id| MaterializedMetric::from_blob(blob, id))
            .collect();
        build(metrics)
    }

    pub fn metric_count(&self) -> usize {
        self.metrics.len()
    }

    pub fn metric_ids(&self) -> Vec<u64> {
        self.metrics.iter().map(|m| m.id).collect()
    }

    pub fn metric_names(&self) -> Vec<String> {
        self.metrics.iter().filter_map(|m| m.name.clone()).collect()
    }

    fn get(&self, id: u64) -> Option<&MaterializedMetric> {
        self.id_to_idx.get(&id).map(|&i| &self.metrics[i])
    }

    fn get_by_name(&self, name: &str) -> Option<&MaterializedMetric> {
        self.name_to_idx.get(name).map(|&i| &self.metrics[i])
    }

    pub fn data_point_count(&self, id: u64) -> Option<usize> {
        self.get(id).map(|m| m.data_point_count())
    }

    pub fn value_at(&self, id: u64, i: usize) -> Option<f64> {
        self.get(id).and_then(|m| m.value_at(i))
    }

    pub fn timestamp_at(&self, id: u64, i: usize) -> Option<i64> {
        self.get(id).and_then(|m| m.timestamp_at(i))
    }

    pub fn tag_at(&self, id: u64, i: usize) -> Option<String> {
        self.get(id).and_then(|m| m.tag_at(i))
    }

    pub fn value_at_by_name(&self, name: &str, i: usize) -> Option<f64> {
        self.get_by_name(name).and_then(|m| m.value_at(i))
    }

    pub fn timestamp_at_by_name(&self, name: &str, i: usize) -> Option<i64> {
        self.get_by_name(name).and_then(|m| m.timestamp_at(i))
    }

    pub fn tag_at_by_name(&self, name: &str, i: usize) -> Option<String> {
        self.get_by_name(name).and_then(|m| m.tag_at(i))
    }

    pub fn metric(&self, id: u64) -> Option<&MaterializedMetric> {
        self.get(id)
    }

    pub fn metric_by_name(&self, name: &str) -> Option<&MaterializedMetric> {
        self.get_by_name(name)
    }
}

fn build(metrics: Vec<MaterializedMetric>) -> MaterializedNumericBlob {
    let id_to_idx = metrics.iter().enumerate().map(|(i, m)| (m.id, i)).collect();
    let name_to_idx = metrics
        .iter()
        .enumerate()
        .filter_map(|(i, m)| m.name.as_ref().map(|n| (n.clone(), i)))
        .collect();
    MaterializedNumericBlob {
        metrics,
        id_to_idx,
        name_to_idx,
    }
}

/// A metric's arrays concatenated across an ordered sequence of blobs.
#[derive(Debug, Clone)]
pub struct MaterializedSetMetric {
    pub id: u64,
    pub name: Option<String>,
    pub timestamps: Vec<i64>,
    pub values: Vec<f64>,
    pub tags: Vec<String>,
}

impl MaterializedSetMetric {
    pub fn data_point_count(&self) -> usize {
        self.timestamps.len()
    }

    pub fn value_at(&self, i: usize) -> Option<f64> {
        self.values.get(i).copied()
    }

    pub fn timestamp_at(&self, i: usize) -> Option<i64> {
        self.timestamps.get(i).copied()
    }

    pub fn tag_at(&self, i: usize) -> Option<String> {
        self.tags.get(i).cloned()
    }
}

/// Metrics merged across an ordered sequence of blobs; a global index `i`
/// into a metric spans all blobs in the order they were passed to
/// `from_blobs`. A blob missing a metric simply contributes zero points —
/// it does not shift other blobs' contributions.
pub struct MaterializedNumericBlobSet {
    metrics: Vec<MaterializedSetMetric>,
    id_to_idx: HashMap<u64, usize>,
    name_to_idx: HashMap<String, usize>,
}

impl MaterializedNumericBlobSet {
    pub fn from_blobs(blobs: &[NumericBlob]) -> Self {
        let mut order: Vec<u64> = Vec::new();
        let mut seen: HashSet<u64> = HashSet::new();
        let mut name_for_id: HashMap<u64, String> = HashMap::new();

        for blob in blobs {
            for id in blob.metric_ids() {
                if seen.insert(id) {
                    order.push(id);
                }
                if let Some(name) = blob.name_for_id(id) {
                    name_for_id.entry(id).or_insert(name);
                }
            }
        }

        let metrics = order
            .into_iter()
            .map(|id| {
                let mut timestamps = Vec::new();
                let mut values = Vec::new();
                let mut tags = Vec::new();
                for blob in blobs {
                    if let (Some(ts), Some(vals)) = (blob.all_timestamps(id), blob.all_values(id)) {
                        timestamps.extend(ts);
                        values.extend(vals);
                        tags.extend(blob.all_tags(id).unwrap_or_default());
                    }
                }
                MaterializedSetMetric {
                    id,
                    name: name_for_id.get(&id).cloned(),
                    timestamps,
                    values,
                    tags,
                }
            })
            .collect::<Vec<_>>();

        let id_to_idx = metrics.iter().enumerate().map(|(i, m)| (m.id, i)).collect();
        let name_to_idx = metrics
            .iter()
            .enumerate()
            .filter_map(|(i, m)| m.name.as_ref().map(|n| (n.clone(), i)))
            .collect();

        Self {
            metrics,
            id_to_idx,
            name_to_idx,
        }
    }

    pub fn metric_count(&self) -> usize {
        self.metrics.len()
    }

    pub fn metric_ids(&self) -> Vec<u64> {
        self.metrics.iter().map(|m| m.id).collect()
    }

    fn get(&self, id: u64) -> Option<&MaterializedSetMetric> {
        self.id_to_idx.get(&id).map(|&i| &self.metrics[i])
    }

    fn get_by_name(&self, name: &str) -> Option<&MaterializedSetMetric> {
        self.name_to_idx.get(name).map(|&i| &self.metrics[i])
    }

    pub fn data_point_count(&self, id: u64) -> Option<usize> {
        self.get(id).map(|m| m.data_point_count())
    }

    pub fn value_at(&self, id: u64, i: usize) -> Option<f64> {
        self.get(id).and_then(|m| m.value_at(i))
    }

    pub fn timestamp_at(&self, id: u64, i: usize) -> Option<i64> {
        self.get(id).and_then(|m| m.timestamp_at(i))
    }

    pub fn tag_at(&self, id: u64, i: usize) -> Option<String> {
        self.get(id).and_then(|m| m.tag_at(i))
    }

    pub fn materialize_metric(&self, id: u64) -> Option<&MaterializedSetMetric> {
        self.get(id)
    }

    pub fn materialize_metric_by_name(&self, name: &str) -> Option<&MaterializedSetMetric> {
        self.get_by_name(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::numeric::encoder::{EncoderOptions, NumericEncoder};
    use crate::numeric::decoder::NumericDecoder;
    use crate::format::{TsEncoding, ValEncoding};

    fn build_blob(id: u64, ts: &[i64], vals: &[f64]) -> Vec<u8> {
        let opts = EncoderOptions {
            ts_encoding: TsEncoding::Delta,
            val_encoding: ValEncoding::Gorilla,
            ..Default::default()
        };
        let mut enc = NumericEncoder::new(0, opts).unwrap();
        enc.start_metric_id(id, ts.len()).unwrap();
        for (t, v) in ts.iter().zip(vals.iter()) {
            enc.add_data_point(*t, *v, "").unwrap();
        }
        enc.end_metric().unwrap();
        enc.finish().unwrap()
    }

    #[test]
    fn materialize_single_blob_matches_sequential_access() {
        let bytes = build_blob(7, &[1, 2, 3, 4], &[1.0, 2.0, 3.0, 4.0]);
        let decoder = NumericDecoder::new(&bytes).unwrap();
        let blob = decoder.decode(None, None).unwrap();
        let mat = blob.materialize();

        for i in 0..4 {
            assert_eq!(mat.value_at(7, i), blob.value_at(7, i));
            assert_eq!(mat.timestamp_at(7, i), blob.timestamp_at(7, i));
        }
    }

    #[test]
    fn materialize_set_concatenates_sparse_metrics() {
        let bytes_a = build_blob(1, &[1, 2], &[1.0, 2.0]);
        let bytes_b = build_blob(2, &[10, 11, 12], &[10.0, 11.0, 12.0]);

        let decoder_a = NumericDecoder::new(&bytes_a).unwrap();
        let blob_a = decoder_a.decode(None, None).unwrap();
        let decoder_b = NumericDecoder::new(&bytes_b).unwrap();
        let blob_b = decoder_b.decode(None, None).unwrap();

        let set = MaterializedNumericBlobSet::from_blobs(&[blob_a, blob_b]);
        assert_eq!(set.data_point_count(1), Some(2));
        assert_eq!(set.data_point_count(2), Some(3));
        assert_eq!(set.metric_count(), 2);
    }
}
