//! Parses a finished numeric blob into a read-only [`NumericBlob`] view.
//!
//! Mirrors the lineage's "open → validate header → load index → hand out a
//! reader" shape (`Reader::open`), but since there is no file here the
//! whole blob is a borrowed/owned byte buffer from the start.

use crate::codec::Codec;
use crate::endian::Endian;
use crate::error::{Error, Payload, Result};
use crate::format::{self, NumericHeader, NumericIndexEntry};
use crate::names;

use super::blob::NumericBlob;

pub struct NumericDecoder<'a> {
    bytes: &'a [u8],
    header: NumericHeader,
}

impl<'a> NumericDecoder<'a> {
    pub fn new(bytes: &'a [u8]) -> Result<Self> {
        let header = NumericHeader::from_bytes(bytes)?;
        Ok(Self { bytes, header })
    }

    pub fn header(&self) -> &NumericHeader {
        &self.header
    }

    pub fn decode(&self, ts_codec: Option<&dyn Codec>, val_codec: Option<&dyn Codec>) -> Result<NumericBlob> {
        let bytes = self.bytes;
        let endian = self.header.flags.endian();
        let metric_count = self.header.metric_count as usize;

        // ── optional metric-names payload ───────────────────────────────
        let mut names_list: Vec<String> = Vec::new();
        if self.header.flags.has_metric_names() {
            let names_start = format::HEADER_SIZE;
            if names_start > self.header.index_offset as usize || self.header.index_offset as usize > bytes.len() {
                return Err(Error::InvalidHeader("index_offset precedes header or exceeds blob length".to_string()));
            }
            let names_buf = &bytes[names_start..self.header.index_offset as usize];
            let (decoded, consumed) = names::decode(endian, names_buf)?;
            if decoded.len() != metric_count {
                return Err(Error::InvalidMetricNamesCount {
                    expected: metric_count,
                    actual: decoded.len(),
                });
            }
            if consumed != names_buf.len() {
                return Err(Error::InvalidHeader(
                    "metric names payload length does not match index_offset".to_string(),
                ));
            }
            names_list = decoded;
        }

        // ── index ────────────────────────────────────────────────────────
        let index_start = self.header.index_offset as usize;
        let index_needed = metric_count * format::NUMERIC_INDEX_ENTRY_SIZE;
        if bytes.len() < index_start || bytes.len() - index_start < index_needed {
            return Err(Error::InvalidIndexEntrySize {
                remaining: bytes.len().saturating_sub(index_start),
                needed: index_needed,
                count: metric_count,
            });
        }
        let mut entries = Vec::with_capacity(metric_count);
        for i in 0..metric_count {
            let start = index_start + i * format::NUMERIC_INDEX_ENTRY_SIZE;
            entries.push(NumericIndexEntry::from_bytes(
                endian,
                &bytes[start..start + format::NUMERIC_INDEX_ENTRY_SIZE],
            ));
        }

        // ── payload sections: ts, val, [tag] ────────────────────────────
        let ts_payload_offset = self.header.ts_payload_offset as usize;
        if ts_payload_offset > bytes.len() {
            return Err(Error::InvalidPayloadOffset {
                which: Payload::Timestamp,
                offset: ts_payload_offset as u64,
                len: bytes.len(),
            });
        }
        let (ts_raw_len, ts_compressed, after_ts) = read_section(bytes, endian, ts_payload_offset, Payload::Timestamp)?;
        let ts_bytes = decompress_section(ts_codec, ts_compressed, ts_raw_len, Payload::Timestamp)?;

        let (val_raw_len, val_compressed, after_val) = read_section(bytes, endian, after_ts, Payload::Value)?;
        let val_bytes = decompress_section(val_codec, val_compressed, val_raw_len, Payload::Value)?;

        let tag_bytes = if self.header.flags.has_tag() {
            let (tag_raw_len, tag_compressed, _after_tag) = read_section(bytes, endian, after_val, Payload::Tag)?;
            decompress_section(val_codec, tag_compressed, tag_raw_len, Payload::Tag)?
        } else {
            Vec::new()
        };

        // ── absolute offsets from 16-bit deltas ─────────────────────────
        let ts_abs = accumulate_offsets(&entries, ts_bytes.len(), Payload::Timestamp, |e| e.ts_delta)?;
        let val_abs = accumulate_offsets(&entries, val_bytes.len(), Payload::Value, |e| e.val_delta)?;
        let tag_abs = if self.header.flags.has_tag() {
            accumulate_offsets(&entries, tag_bytes.len(), Payload::Tag, |e| e.tag_delta)?
        } else {
            vec![0u64; metric_count + 1]
        };

        if self.header.flags.has_metric_names() {
            let ids: Vec<u64> = entries.iter().map(|e| e.metric_id).collect();
            names::verify(&names_list, &ids)?;
        }

        Ok(NumericBlob::new(
            endian,
            self.header.flags,
            self.header.start_time_us,
            entries,
            names_list,
            ts_bytes,
            val_bytes,
            tag_bytes,
            ts_abs,
            val_abs,
            tag_abs,
        ))
    }
}

/// Reads a section's `compressed_len:u32 | raw_len:u32` prefix at `offset`,
/// slices out exactly `compressed_len` compressed bytes, and returns
/// `(raw_len, compressed_slice, next_offset)` — `next_offset` is where the
/// following section's prefix begins. Codecs compress to a variable number
/// of bytes, so the raw (uncompressed) length alone cannot locate the next
/// section; storing the compressed length alongside it is what lets
/// sections sit back-to-back with no external index (see SPEC_FULL.md §6.1
/// Open Question resolution).
fn read_section<'a>(bytes: &'a [u8], endian: impl Endian, offset: usize, which: Payload) -> Result<(u32, &'a [u8], usize)> {
    if bytes.len() < offset + 8 {
        return Err(Error::InvalidPayloadOffset {
            which,
            offset: offset as u64,
            len: bytes.len(),
        });
    }
    let compressed_len = endian.read_u32(&bytes[offset..offset + 4]) as usize;
    let raw_len = endian.read_u32(&bytes[offset + 4..offset + 8]);
    let data_start = offset + 8;
    if bytes.len() < data_start + compressed_len {
        return Err(Error::InvalidPayloadOffset {
            which,
            offset: (data_start + compressed_len) as u64,
            len: bytes.len(),
        });
    }
    Ok((raw_len, &bytes[data_start..data_start + compressed_len], data_start + compressed_len))
}

fn decompress_section(codec: Option<&dyn Codec>, compressed: &[u8], raw_len: u32, which: Payload) -> Result<Vec<u8>> {
    let raw = match codec {
        Some(c) => c.decompress(compressed)?,
        None => compressed.to_vec(),
    };
    if raw.len() != raw_len as usize {
        return Err(Error::DecompressionFailed {
            codec: 0,
            message: format!("{which} payload: expected {raw_len} raw bytes, got {}", raw.len()),
        });
    }
    Ok(raw)
}

fn accumulate_offsets(
    entries: &[NumericIndexEntry],
    payload_size: usize,
    which: Payload,
    delta_of: impl Fn(&NumericIndexEntry) -> u16,
) -> Result<Vec<u64>> {
    let mut abs = Vec::with_capacity(entries.len() + 1);
    abs.push(0u64);
    for e in entries {
        let prev = *abs.last().unwrap();
        let next = prev + delta_of(e) as u64;
        if next < prev {
            return Err(Error::InvalidIndexOffsets(format!("{which} offsets decreased")));
        }
        abs.push(next);
    }
    let last = *abs.last().unwrap();
    if last > payload_size as u64 {
        return Err(Error::InvalidIndexOffsets(format!(
            "{which} offsets exceed decompressed payload size ({last} > {payload_size})"
        )));
    }
    // Final entry's length runs to the end of the payload, not to another
    // delta — overwrite the logical "boundary past the last metric" with
    // the true payload size so `abs[i+1]-abs[i]` gives the right length
    // uniformly for every i, including the last.
    *abs.last_mut().unwrap() = payload_size as u64;
    Ok(abs)
}
