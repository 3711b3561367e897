//! Orchestrates per-metric `start_metric_* -> add_data_point* -> end_metric`
//! into a finished numeric blob. Mirrors the accumulate-then-`finish()`
//! shape of the lineage's file-backed `Writer`, translated to pure
//! in-memory buffers (no I/O in this crate — see module docs at the crate root).

use std::collections::HashSet;
use std::sync::Arc;

use crate::codec::Codec;
use crate::collision::CollisionTracker;
use crate::endian::DynEndian;
use crate::error::{Error, Payload, Result};
use crate::format::{self, codec_id, Flags, NumericHeader, NumericIndexEntry, TsEncoding, ValEncoding};
use crate::hash::hash_name;
use crate::names;

use super::columns::{TagColumnEncoder, TsColumnEncoder, ValColumnEncoder};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum IdentifierMode {
    Undefined,
    UserId,
    NameManaged,
}

/// Encoder-time choices that become header flags and codec selection.
/// Unlike a config-loading subsystem, this is a plain struct the caller
/// builds explicitly — there is no ambient config source for blob layout.
#[derive(Clone)]
pub struct EncoderOptions {
    pub ts_encoding: TsEncoding,
    pub val_encoding: ValEncoding,
    pub has_tag: bool,
    pub big_endian: bool,
    pub ts_codec: Option<Arc<dyn Codec>>,
    pub val_codec: Option<Arc<dyn Codec>>,
}

impl Default for EncoderOptions {
    fn default() -> Self {
        Self {
            ts_encoding: TsEncoding::Raw,
            val_encoding: ValEncoding::Raw,
            has_tag: false,
            big_endian: false,
            ts_codec: None,
            val_codec: None,
        }
    }
}

struct CurrentMetric {
    id: u64,
    name: Option<String>,
    n: u32,
    points_written: u32,
}

pub struct NumericEncoder {
    start_time_us: i64,
    opts: EncoderOptions,
    endian: DynEndian,
    mode: IdentifierMode,
    ts_col: TsColumnEncoder,
    val_col: ValColumnEncoder,
    tag_col: TagColumnEncoder,
    index: Vec<NumericIndexEntry>,
    seen_ids: HashSet<u64>,
    collision: Option<CollisionTracker>,
    has_non_empty_tags: bool,
    current: Option<CurrentMetric>,
    last_ts_len: usize,
    last_val_len: usize,
    last_tag_len: usize,
}

impl NumericEncoder {
    pub fn new(start_time_us: i64, opts: EncoderOptions) -> Result<Self> {
        let endian = DynEndian::from_big_flag(opts.big_endian);
        Ok(Self {
            start_time_us,
            ts_col: TsColumnEncoder::new(opts.ts_encoding, endian),
            val_col: ValColumnEncoder::new(opts.val_encoding, endian),
            tag_col: TagColumnEncoder::new(endian),
            endian,
            opts,
            mode: IdentifierMode::Undefined,
            index: Vec::new(),
            seen_ids: HashSet::new(),
            collision: None,
            has_non_empty_tags: false,
            current: None,
            last_ts_len: 0,
            last_val_len: 0,
            last_tag_len: 0,
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
        Ok(())
    }

    pub fn add_data_point(&mut self, ts: i64, v: f64, tag: &str) -> Result<()> {
        let cur = self.current.as_mut().ok_or(Error::NoMetricStarted)?;
        if cur.points_written >= cur.n {
            return Err(Error::TooManyDataPoints { limit: cur.n as usize });
        }
        self.ts_col.push(ts);
        self.val_col.push(v);
        if self.opts.has_tag {
            self.tag_col.push(tag)?;
            if !tag.is_empty() {
                self.has_non_empty_tags = true;
            }
        }
        self.current.as_mut().unwrap().points_written += 1;
        Ok(())
    }

    pub fn add_data_points(&mut self, ts: &[i64], v: &[f64], tags: &[&str]) -> Result<()> {
        if ts.len() != v.len() {
            return Err(Error::DataPointCountMismatch {
                expected: ts.len(),
                actual: v.len(),
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
                self.add_data_point(ts[j], v[j], tag)?;
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

        let ts_total = self.ts_col.finish_metric();
        let val_total = self.val_col.finish_metric();
        let tag_total = if self.opts.has_tag {
            self.tag_col.finish_metric()
        } else {
            self.last_tag_len
        };

        let ts_delta = (ts_total - self.last_ts_len) as u64;
        let val_delta = (val_total - self.last_val_len) as u64;
        let tag_delta = (tag_total - self.last_tag_len) as u64;

        if ts_delta > format::MAX_OFFSET_DELTA {
            return Err(Error::OffsetOutOfRange {
                which: Payload::Timestamp,
                delta: ts_delta,
            });
        }
        if val_delta > format::MAX_OFFSET_DELTA {
            return Err(Error::OffsetOutOfRange {
                which: Payload::Value,
                delta: val_delta,
            });
        }
        if tag_delta > format::MAX_OFFSET_DELTA {
            return Err(Error::OffsetOutOfRange {
                which: Payload::Tag,
                delta: tag_delta,
            });
        }

        self.index.push(NumericIndexEntry {
            metric_id: cur.id,
            count: cur.n as u16,
            ts_delta: ts_delta as u16,
            val_delta: val_delta as u16,
            tag_delta: tag_delta as u16,
        });

        self.last_ts_len = ts_total;
        self.last_val_len = val_total;
        self.last_tag_len = tag_total;

        tracing::trace!(metric_id = cur.id, points = cur.n, "metric finished");
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
        flags.set_val_encoding(self.opts.val_encoding);
        flags.set_has_tag(has_tag);
        flags.set_has_metric_names(has_collision);
        let ts_codec_id = self.opts.ts_codec.as_ref().map(|c| c.id()).unwrap_or(codec_id::NONE);
        let val_codec_id = self.opts.val_codec.as_ref().map(|c| c.id()).unwrap_or(codec_id::NONE);
        flags.set_ts_codec(ts_codec_id);
        flags.set_val_codec(val_codec_id);

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
        let ts_payload_offset = index_offset + format::NUMERIC_INDEX_ENTRY_SIZE as u32 * metric_count;

        let header = NumericHeader {
            flags,
            metric_count,
            start_time_us: self.start_time_us,
            index_offset,
            ts_payload_offset,
        };

        let ts_raw = self.ts_col.into_bytes();
        let val_raw = self.val_col.into_bytes();
        let tag_raw = if has_tag { self.tag_col.into_bytes() } else { Vec::new() };

        let ts_compressed = compress_section(self.opts.ts_codec.as_deref(), &ts_raw)?;
        let val_compressed = compress_section(self.opts.val_codec.as_deref(), &val_raw)?;
        let tag_compressed = if has_tag {
            compress_section(self.opts.val_codec.as_deref(), &tag_raw)?
        } else {
            Vec::new()
        };

        let mut out = Vec::with_capacity(
            format::HEADER_SIZE + names_bytes.len() + self.index.len() * format::NUMERIC_INDEX_ENTRY_SIZE + ts_compressed.len() + val_compressed.len() + tag_compressed.len() + 16,
        );
        out.extend_from_slice(&header.to_bytes());
        out.extend_from_slice(&names_bytes);
        for entry in &self.index {
            out.extend_from_slice(&entry.to_bytes(self.endian));
        }
        write_section(&mut out, self.endian, ts_raw.len() as u32, &ts_compressed);
        write_section(&mut out, self.endian, val_raw.len() as u32, &val_compressed);
        if has_tag {
            write_section(&mut out, self.endian, tag_raw.len() as u32, &tag_compressed);
        }

        tracing::debug!(
            metric_count,
            bytes = out.len(),
            has_tag,
            has_metric_names = has_collision,
            "numeric blob finished"
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

/// Writes a section's `compressed_len:u32 | raw_len:u32` prefix followed by
/// the compressed bytes. See `numeric::decoder::read_section` for why both
/// lengths are needed.
fn write_section(out: &mut Vec<u8>, endian: DynEndian, raw_len: u32, compressed: &[u8]) {
    use crate::endian::Endian;
    let mut prefix = [0u8; 8];
    endian.write_u32(&mut prefix[0..4], compressed.len() as u32);
    endian.write_u32(&mut prefix[4..8], raw_len);
    out.extend_from_slice(&prefix);
    out.extend_from_slice(compressed);
}
