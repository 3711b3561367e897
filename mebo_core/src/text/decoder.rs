//! Parses a finished text blob into a read-only [`TextBlob`] view.

use crate::codec::Codec;
use crate::endian::Endian;
use crate::error::{Error, Payload, Result};
use crate::format::{self, TextHeader, TextIndexEntry};
use crate::names;

use super::blob::TextBlob;

pub struct TextDecoder<'a> {
    bytes: &'a [u8],
    header: TextHeader,
}

impl<'a> TextDecoder<'a> {
    pub fn new(bytes: &'a [u8]) -> Result<Self> {
        let header = TextHeader::from_bytes(bytes)?;
        Ok(Self { bytes, header })
    }

    pub fn header(&self) -> &TextHeader {
        &self.header
    }

    pub fn decode(&self, codec: Option<&dyn Codec>) -> Result<TextBlob> {
        let bytes = self.bytes;
        let endian = self.header.flags.endian();
        let metric_count = self.header.metric_count as usize;

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

        let index_start = self.header.index_offset as usize;
        let index_needed = metric_count * format::TEXT_INDEX_ENTRY_SIZE;
        if bytes.len() < index_start || bytes.len() - index_start < index_needed {
            return Err(Error::InvalidIndexEntrySize {
                remaining: bytes.len().saturating_sub(index_start),
                needed: index_needed,
                count: metric_count,
            });
        }
        let mut entries = Vec::with_capacity(metric_count);
        for i in 0..metric_count {
            let start = index_start + i * format::TEXT_INDEX_ENTRY_SIZE;
            entries.push(TextIndexEntry::from_bytes(
                endian,
                &bytes[start..start + format::TEXT_INDEX_ENTRY_SIZE],
            ));
        }

        let data_offset = self.header.data_offset as usize;
        if data_offset > bytes.len() {
            return Err(Error::InvalidPayloadOffset {
                which: Payload::Data,
                offset: data_offset as u64,
                len: bytes.len(),
            });
        }
        let (raw_len, compressed, _next) = read_section(bytes, endian, data_offset)?;
        let data = decompress_section(codec, compressed, raw_len)?;

        for e in &entries {
            let end = e.offset as u64 + e.size as u64;
            if end > data.len() as u64 {
                return Err(Error::InvalidIndexOffsets(format!(
                    "metric {} row range [{}, {}) exceeds decompressed data payload size {}",
                    e.metric_id,
                    e.offset,
                    end,
                    data.len()
                )));
            }
        }

        if self.header.flags.has_metric_names() {
            let ids: Vec<u64> = entries.iter().map(|e| e.metric_id).collect();
            names::verify(&names_list, &ids)?;
        }

        Ok(TextBlob::new(
            endian,
            self.header.flags,
            self.header.start_time_us,
            entries,
            names_list,
            data,
        ))
    }
}

/// Reads the text family's single `compressed_len:u32 | raw_len:u32` data
/// section — same framing as the numeric family's per-column sections, but
/// there is only ever one of these since index entries already carry
/// absolute offset/size into the decompressed payload (see SPEC_FULL.md
/// §6.2).
fn read_section<'a>(bytes: &'a [u8], endian: impl Endian, offset: usize) -> Result<(u32, &'a [u8], usize)> {
    if bytes.len() < offset + 8 {
        return Err(Error::InvalidPayloadOffset {
            which: Payload::Data,
            offset: offset as u64,
            len: bytes.len(),
        });
    }
    let compressed_len = endian.read_u32(&bytes[offset..offset + 4]) as usize;
    let raw_len = endian.read_u32(&bytes[offset + 4..offset + 8]);
    let data_start = offset + 8;
    if bytes.len() < data_start + compressed_len {
        return Err(Error::InvalidPayloadOffset {
            which: Payload::Data,
            offset: (data_start + compressed_len) as u64,
            len: bytes.len(),
        });
    }
    Ok((raw_len, &bytes[data_start..data_start + compressed_len], data_start + compressed_len))
}

fn decompress_section(codec: Option<&dyn Codec>, compressed: &[u8], raw_len: u32) -> Result<Vec<u8>> {
    let raw = match codec {
        Some(c) => c.decompress(compressed)?,
        None => compressed.to_vec(),
    };
    if raw.len() != raw_len as usize {
        return Err(Error::DecompressionFailed {
            codec: 0,
            message: format!("data payload: expected {raw_len} raw bytes, got {}", raw.len()),
        });
    }
    Ok(raw)
}
