//! Decode-once, random-access-many views built from one or more text blobs.

use std::collections::{HashMap, HashSet};

use super::blob::TextBlob;
use super::row::TextDataPoint;

/// One metric's fully decoded rows from a single blob.
#[derive(Debug, Clone)]
pub struct MaterializedTextMetric {
    pub id: u64,
    pub name: Option<String>,
    pub rows: Vec<TextDataPoint>,
}

impl MaterializedTextMetric {
    pub(crate) fn from_blob(blob: &TextBlob, id: u64) -> Option<Self> {
        let rows = blob.all(id)?;
        Some(Self {
            id,
            name: blob.name_for_id(id),
            rows,
        })
    }

    pub fn data_point_count(&self) -> usize {
        self.rows.len()
    }

    pub fn at(&self, i: usize) -> Option<&TextDataPoint> {
        self.rows.get(i)
    }
}

/// All metrics of a single blob, decoded once via `blob.materialize()`.
pub struct MaterializedTextBlob {
    metrics: Vec<MaterializedTextMetric>,
    id_to_idx: HashMap<u64, usize>,
    name_to_idx: HashMap<String, usize>,
}

impl MaterializedTextBlob {
    pub(crate) fn from_blob(blob: &TextBlob) -> Self {
        let metrics: Vec<MaterializedTextMetric> = blob
            .metric_ids()
            .into_iter()
            .filter_map(|id| MaterializedTextMetric::from_blob(blob, id))
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

    fn get(&self, id: u64) -> Option<&MaterializedTextMetric> {
        self.id_to_idx.get(&id).map(|&i| &self.metrics[i])
    }

    fn get_by_name(&self, name: &str) -> Option<&MaterializedTextMetric> {
        self.name_to_idx.get(name).map(|&i| &self.metrics[i])
    }

    pub fn data_point_count(&self, id: u64) -> Option<usize> {
        self.get(id).map(|m| m.data_point_count())
    }

    pub fn at(&self, id: u64, i: usize) -> Option<&TextDataPoint> {
        self.get(id).and_then(|m| m.at(i))
    }

    pub fn at_by_name(&self, name: &str, i: usize) -> Option<&TextDataPoint> {
        self.get_by_name(name).and_then(|m| m.at(i))
    }

    pub fn metric(&self, id: u64) -> Option<&MaterializedTextMetric> {
        self.get(id)
    }

    pub fn metric_by_name(&self, name: &str) -> Option<&MaterializedTextMetric> {
        self.get_by_name(name)
    }
}

fn build(metrics: Vec<MaterializedTextMetric>) -> MaterializedTextBlob {
    let id_to_idx = metrics.iter().enumerate().map(|(i, m)| (m.id, i)).collect();
    let name_to_idx = metrics
        .iter()
        .enumerate()
        .filter_map(|(i, m)| m.name.as_ref().map(|n| (n.clone(), i)))
        .collect();
    MaterializedTextBlob {
        metrics,
        id_to_idx,
        name_to_idx,
    }
}

/// A metric's rows concatenated across an ordered sequence of blobs.
#[derive(Debug, Clone)]
pub struct MaterializedTextSetMetric {
    pub id: u64,
    pub name: Option<String>,
    pub rows: Vec<TextDataPoint>,
}

impl MaterializedTextSetMetric {
    pub fn data_point_count(&self) -> usize {
        self.rows.len()
    }

    pub fn at(&self, i: usize) -> Option<&TextDataPoint> {
        self.rows.get(i)
    }
}

/// Metrics merged across an ordered sequence of blobs; a blob missing a
/// metric contributes zero rows without shifting other blobs' contributions
/// (same sparse-concatenation semantics as `numeric::MaterializedNumericBlobSet`).
pub struct MaterializedTextBlobSet {
    metrics: Vec<MaterializedTextSetMetric>,
    id_to_idx: HashMap<u64, usize>,
    name_to_idx: HashMap<String, usize>,
}

impl MaterializedTextBlobSet {
    pub fn from_blobs(blobs: &[TextBlob]) -> Self {
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
                let mut rows = Vec::new();
                for blob in blobs {
                    if let Some(r) = blob.all(id) {
                        rows.extend(r);
                    }
                }
                MaterializedTextSetMetric {
                    id,
                    name: name_for_id.get(&id).cloned(),
                    rows,
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

    fn get(&self, id: u64) -> Option<&MaterializedTextSetMetric> {
        self.id_to_idx.get(&id).map(|&i| &self.metrics[i])
    }

    fn get_by_name(&self, name: &str) -> Option<&MaterializedTextSetMetric> {
        self.name_to_idx.get(name).map(|&i| &self.metrics[i])
    }

    pub fn data_point_count(&self, id: u64) -> Option<usize> {
        self.get(id).map(|m| m.data_point_count())
    }

    pub fn at(&self, id: u64, i: usize) -> Option<&TextDataPoint> {
        self.get(id).and_then(|m| m.at(i))
    }

    pub fn materialize_metric(&self, id: u64) -> Option<&MaterializedTextSetMetric> {
        self.get(id)
    }

    pub fn materialize_metric_by_name(&self, name: &str) -> Option<&MaterializedTextSetMetric> {
        self.get_by_name(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::text::decoder::TextDecoder;
    use crate::text::encoder::{TextEncoder, TextEncoderOptions};
    use crate::format::TsEncoding;

    fn build_blob(id: u64, rows: &[(i64, &str)]) -> Vec<u8> {
        let opts = TextEncoderOptions {
            ts_encoding: TsEncoding::Delta,
            ..Default::default()
        };
        let mut enc = TextEncoder::new(0, opts).unwrap();
        enc.start_metric_id(id, rows.len()).unwrap();
        for (ts, v) in rows {
            enc.add_data_point(*ts, v, "").unwrap();
        }
        enc.end_metric().unwrap();
        enc.finish().unwrap()
    }

    #[test]
    fn materialize_single_blob_matches_sequential_access() {
        let bytes = build_blob(7, &[(1, "a"), (2, "b"), (3, "c")]);
        let decoder = TextDecoder::new(&bytes).unwrap();
        let blob = decoder.decode(None).unwrap();
        let mat = blob.materialize();

        for i in 0..3 {
            assert_eq!(mat.at(7, i), blob.at(7, i).as_ref());
        }
    }

    #[test]
    fn materialize_set_concatenates_sparse_metrics() {
        let bytes_a = build_blob(1, &[(1, "a"), (2, "b")]);
        let bytes_b = build_blob(2, &[(10, "x"), (11, "y"), (12, "z")]);

        let decoder_a = TextDecoder::new(&bytes_a).unwrap();
        let blob_a = decoder_a.decode(None).unwrap();
        let decoder_b = TextDecoder::new(&bytes_b).unwrap();
        let blob_b = decoder_b.decode(None).unwrap();

        let set = MaterializedTextBlobSet::from_blobs(&[blob_a, blob_b]);
        assert_eq!(set.data_point_count(1), Some(2));
        assert_eq!(set.data_point_count(2), Some(3));
        assert_eq!(set.metric_count(), 2);
    }
}
