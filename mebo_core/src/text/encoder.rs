//! Orchestrates the text family's `start_metric_* -> add_data_point* ->
//! end_metric -> finish()` lifecycle, mirroring `numeric::encoder` but
//! emitting one row-oriented data payload instead of three columns.

use std::collections::HashSet;
use std::sync::Arc;

use crate::codec::Codec;
use crate::collision::CollisionTracker;
use crate::endian::DynEndian;
use crate::error::{Error, Result};
use crate::format::{self, codec_id, Flags, TextHeader, TextIndexEntry, TsEncoding};
use crate::hash::hash_name;
use crate::names;

use super::row::RowEncoder;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum IdentifierMode {
    Undefined,
    UserId,
    NameManaged,
}

#[derive(Clone)]
pub struct TextEncoderOptions {
    pub ts_encoding: TsEncoding,
    pub has_tag: bool,
    pub big_endian: bool,
    pub codec: Option<Arc<dyn Codec>>,
}

impl Default for TextEncoderOptions {
    fn default() -> Self {
        Self {
            ts_encoding: TsEncoding::Raw,
            has_tag: false,
            big_endian: false,
            codec: None,
        }
    }
}

struct CurrentMetric {
    id: u64,
    name: Option<String>,
    n: u32,
    points_written: u32,
}

pub struct TextEncoder {
    start_time_us: i64,
    opts: TextEncoderOptions,
    endian: DynEndian,
    mode: IdentifierMode,
    row_enc: RowEncoder,
    buf: Vec<u8>,
    index: Vec<TextIndexEntry>,
    seen_ids: HashSet<u64>,
    collision: Option<CollisionTracker>,
    has_non_empty_tags: bool,
    current: Option<CurrentMetric>,
    last_offset: usize,
}

impl TextEncoder {
    pub fn new(start_time_us: i64, opts: TextEncoderOptions) -> Result<Self> {
        let endian = DynEndian::from_big_flag(opts.big_endian);
        Ok(Self {
            row_enc: RowEncoder::new(opts.ts_encoding, endian, opts.has_tag),
            start_time_us,
            endian,
            opts,
            mode: IdentifierMode::Undefined,
            buf: Vec::new(),
            index: Vec::new(),
            seen_ids: HashSet::new(),
            collision: None,
            has_non_empty_tags: false,
            current: None,
            last_offset: 0,
        })
    }

    fn check_can_start(&self, n: usize) -> Result<()> {
        if self.current.is_some() {
            return Err(Error::MetricAlreadyStarted);
        }
        if n == 0 || n > format::MAX_POINTS_PER_METRIC {
            return Err(Error::InvalidNumOfDataPoints { n });
        }
        if self.index.len() >= format::MAX_METRIC_COUNT {
            return Err(Error::MetricCountExceeded {
                limit: format::MAX_METRIC_COUNT,
            });
        }
        Ok(())
    }

    pub fn start_metric_id(&mut self, id: u64, n: usize) -> Result<()> {
        self.check_can_start(n)?;
        match self.mode {
            IdentifierMode::NameManaged => {
                return Err(Error::MixedIdentifierMode {
                    latched: "name",
                    attempted: "id",
                })
            }
            IdentifierMode::Undefined => self.mode = IdentifierMode::UserId,
            IdentifierMode::UserId => {}
        }
        if id == 0 {
            return Err(Error::InvalidMetricId("metric id must be non-zero".to_string()));
        }
        if !self.seen_ids.insert(id) {
            return Err(Error::HashCollision { id });
        }
        self.current = Some(CurrentMetric {
            id,
            name: None,
            n: n as u32,
            points_written: 0,
        });
        self.row_enc.start_metric();
        Ok(())
    }

    pub fn start_metric_name(&mut self, name: &str, n: usize) -> Result<()> {
        self.check_can_start(n)?;
        match self.mode {
            IdentifierMode::UserId => {
                return Err(Error::MixedIdentifierMode {
                    latched: "id",
                    attempted: "name",
                })
            }
            IdentifierMode::Undefined => self.mode = IdentifierMode::NameManaged,
            IdentifierMode::NameManaged => {}
        }
        if name.is_empty() {
            return Err(Error::InvalidMetricName("metric name must be non-empty".to_string()));
        }
        let id = hash_name(name);
        self.collision.get_or_insert_with(CollisionTracker::new).track(name, id)?;
        self.current = Some(CurrentMetric {
            id,
            name: Some(name.to_string()),
            n: n as u32,
            points_written: 0,
        });
        self.row_enc.start_metric();
        Ok(())
    }

    pub fn add_data_point(&mut self, ts: i64, value: &str, tag: &str) -> Result<()> {
        let cur = self.current.as_mut().ok_or(Error::NoMetricStarted)?;
        if cur.points_written >= cur.n {
            return Err(Error::TooManyDataPoints { limit: cur.n as usize });
        }
        self.row_enc.push(&mut self.buf, ts, value, tag)?;
        if self.opts.has_tag && !tag.is_empty() {
            self.has_non_empty_tags = true;
        }
        self.current.as_mut().unwrap().points_written += 1;
        Ok(())
    }

    pub fn add_data_points(&mut self, ts: &[i64], values: &[&str], tags: &[&str]) -> Result<()> {
        if ts.len() != values.len() {
            return Err(Error::DataPointCountMismatch {
                expected: ts.len(),
                actual: values.len(),
            });
        }
        if !tags.is_empty() && tags.len() != ts.len() {
            return Err(Error::DataPointCountMismatch {
                expected: ts.len(),
                actual: tags.len(),
            });
        }
        for chunk_start in (0..ts.len()).step_by(512) {
            let end = (chunk_start + 512).min(ts.len());
            for j in chunk_start..end {
                let tag = tags.get(j).copied().unwrap_or("");
                self.add_data_point(ts[j], values[j], tag)?;
            }
        }
        Ok(())
    }

    pub fn end_metric(&mut self) -> Result<()> {
        if self.current.is_none() {
            return Err(Error::NoMetricStarted);
        }
        {
            let cur = self.current.as_ref().unwrap();
            if cur.points_written == 0 {
                return Err(Error::NoDataPointsAdded);
            }
            if cur.points_written != cur.n {
                return Err(Error::DataPointCountMismatch {
                    expected: cur.n as usize,
                    actual: cur.points_written as usize,
                });
            }
        }
        let cur = self.current.take().unwrap();

        let size = self.buf.len() - self.last_offset;
        self.index.push(TextIndexEntry {
            metric_id: cur.id,
            count: cur.n as u16,
            offset: self.last_offset as u32,
            size: size as u32,
        });
        self.last_offset = self.buf.len();

        tracing::trace!(metric_id = cur.id, points = cur.n, "text metric finished");
        Ok(())
    }

    pub fn finish(self) -> Result<Vec<u8>> {
        if self.current.is_some() {
            return Err(Error::MetricNotEnded);
        }
        if self.index.is_empty() {
            return Err(Error::NoMetricsAdded);
        }

        let has_collision = self.collision.as_ref().map(|c| c.has_collision()).unwrap_or(false);
        let has_tag = self.opts.has_tag && self.has_non_empty_tags;

        let mut flags = Flags::new();
        flags.set_big_endian(self.opts.big_endian);
        flags.set_ts_encoding(self.opts.ts_encoding);
        flags.set_has_tag(has_tag);
        flags.set_has_metric_names(has_collision);
        let data_codec_id = self.opts.codec.as_ref().map(|c| c.id()).unwrap_or(codec_id::NONE);
        flags.set_val_codec(data_codec_id);

        let names_bytes = if has_collision {
            let names: Vec<String> = self
                .collision
                .as_ref()
                .unwrap()
                .names_in_order()
                .map(|s| s.to_string())
                .collect();
            names::encode(self.endian, &names)
        } else {
            Vec::new()
        };

        let metric_count = self.index.len() as u32;
        let index_offset = format::HEADER_SIZE as u32 + names_bytes.len() as u32;
        let data_offset = index_offset + format::TEXT_INDEX_ENTRY_SIZE as u32 * metric_count;

        let header = TextHeader {
            flags,
            metric_count,
            start_time_us: self.start_time_us,
            index_offset,
            data_offset,
        };

        let compressed = compress_section(self.opts.codec.as_deref(), &self.buf)?;

        let mut out = Vec::with_capacity(
            format::HEADER_SIZE + names_bytes.len() + self.index.len() * format::TEXT_INDEX_ENTRY_SIZE + compressed.len() + 8,
        );
        out.extend_from_slice(&header.to_bytes());
        out.extend_from_slice(&names_bytes);
        for entry in &self.index {
            out.extend_from_slice(&entry.to_bytes(self.endian));
        }
        write_section(&mut out, self.endian, self.buf.len() as u32, &compressed);

        tracing::debug!(
            metric_count,
            bytes = out.len(),
            has_tag,
            has_metric_names = has_collision,
            "text blob finished"
        );

        Ok(out)
    }
}

fn compress_section(codec: Option<&dyn Codec>, raw: &[u8]) -> Result<Vec<u8>> {
    match codec {
        Some(c) => c.compress(raw),
        None => Ok(raw.to_vec()),
    }
}

/// Same `compressed_len:u32 | raw_len:u32` prefix as the numeric family's
/// payload sections (see `numeric::decoder::read_section`), applied once to
/// the whole data payload since text has a single section, not three.
fn write_section(out: &mut Vec<u8>, endian: DynEndian, raw_len: u32, compressed: &[u8]) {
    use crate::endian::Endian;
    let mut prefix = [0u8; 8];
    endian.write_u32(&mut prefix[0..4], compressed.len() as u32);
    endian.write_u32(&mut prefix[4..8], raw_len);
    out.extend_from_slice(&prefix);
    out.extend_from_slice(compressed);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mixed_identifier_mode_rejected() {
        let mut enc = TextEncoder::new(0, TextEncoderOptions::default()).unwrap();
        enc.start_metric_id(1, 1).unwrap();
        enc.add_data_point(0, "ok", "").unwrap();
        enc.end_metric().unwrap();
        let err = enc.start_metric_name("log.line", 1).unwrap_err();
        assert!(matches!(err, Error::MixedIdentifierMode { .. }));
    }

    #[test]
    fn duplicate_id_rejected() {
        let mut enc = TextEncoder::new(0, TextEncoderOptions::default()).unwrap();
        enc.start_metric_id(1, 1).unwrap();
        enc.add_data_point(0, "ok", "").unwrap();
        enc.end_metric().unwrap();
        let err = enc.start_metric_id(1, 1).unwrap_err();
        assert!(matches!(err, Error::HashCollision { .. }));
    }

    #[test]
    fn finish_without_metrics_errors() {
        let enc = TextEncoder::new(0, TextEncoderOptions::default()).unwrap();
        assert!(matches!(enc.finish().unwrap_err(), Error::NoMetricsAdded));
    }

    #[test]
    fn metric_not_ended_errors() {
        let mut enc = TextEncoder::new(0, TextEncoderOptions::default()).unwrap();
        enc.start_metric_id(1, 1).unwrap();
        assert!(matches!(enc.finish().unwrap_err(), Error::MetricNotEnded));
    }
}
