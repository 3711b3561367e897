//! Per-column encoders/decoders for the numeric blob family.
//!
//! Each column accumulates bytes for the *whole blob* in one cumulative
//! buffer (payload sections are the concatenation of every metric's column
//! in insertion order); `finish_metric` is called once per `end_metric()`
//! to flush any in-flight bit state (Gorilla) and reset the per-metric
//! encoding context (previous timestamp/delta/value) without touching
//! already-written bytes.

use crate::bitbuffer::{BitReader, BitWriter};
use crate::endian::{DynEndian, Endian};
use crate::error::{Error, Payload, Result};
use crate::format::{TsEncoding, ValEncoding};
use crate::varint::{read_varint, write_varint};

#[inline]
fn bitmask(n: u8) -> u64 {
    if n >= 64 {
        u64::MAX
    } else {
        (1u64 << n) - 1
    }
}

// ── timestamp column ─────────────────────────────────────────────────────

pub struct TsColumnEncoder {
    encoding: TsEncoding,
    endian: DynEndian,
    buf: Vec<u8>,
    count_in_metric: u32,
    prev_ts: i64,
    prev_delta: i64,
}

impl TsColumnEncoder {
    pub fn new(encoding: TsEncoding, endian: DynEndian) -> Self {
        Self {
            encoding,
            endian,
            buf: Vec::new(),
            count_in_metric: 0,
            prev_ts: 0,
            prev_delta: 0,
        }
    }

    pub fn push(&mut self, ts: i64) {
        match self.encoding {
            TsEncoding::Raw => {
                let mut b = [0u8; 8];
                self.endian.write_i64(&mut b, ts);
                self.buf.extend_from_slice(&b);
            }
            TsEncoding::Delta => {
                if self.count_in_metric == 0 {
                    write_varint(&mut self.buf, ts);
                } else if self.count_in_metric == 1 {
                    let delta = ts - self.prev_ts;
                    write_varint(&mut self.buf, delta);
                    self.prev_delta = delta;
                } else {
                    let delta = ts - self.prev_ts;
                    let dod = delta - self.prev_delta;
                    write_varint(&mut self.buf, dod);
                    self.prev_delta = delta;
                }
                self.prev_ts = ts;
            }
        }
        self.count_in_metric += 1;
    }

    /// Flushes pending state (a no-op for this column — there's no bit
    /// buffer to drain) and resets per-metric context. Returns the
    /// cumulative buffer length after flushing, for delta-offset bookkeeping.
    pub fn finish_metric(&mut self) -> usize {
        self.count_in_metric = 0;
        self.prev_ts = 0;
        self.prev_delta = 0;
        self.buf.len()
    }

    pub fn byte_len(&self) -> usize {
        self.buf.len()
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.buf
    }
}

pub fn decode_ts(encoding: TsEncoding, endian: DynEndian, buf: &[u8], count: usize) -> Result<Vec<i64>> {
    match encoding {
        TsEncoding::Raw => {
            let needed = count * 8;
            if buf.len() < needed {
                return Err(Error::InvalidIndexEntrySize {
                    remaining: buf.len(),
                    needed,
                    count,
                });
            }
            Ok((0..count).map(|i| endian.read_i64(&buf[i * 8..i * 8 + 8])).collect())
        }
        TsEncoding::Delta => {
            let mut out = Vec::with_capacity(count);
            let mut pos = 0usize;
            let mut prev_ts = 0i64;
            let mut prev_delta = 0i64;
            for i in 0..count {
                let (v, consumed) = read_varint(buf, pos).ok_or_else(|| Error::InvalidIndexEntrySize {
                    remaining: buf.len().saturating_sub(pos),
                    needed: 1,
                    count,
                })?;
                pos += consumed;
                let ts = if i == 0 {
                    v
                } else if i == 1 {
                    prev_delta = v;
                    prev_ts + v
                } else {
                    prev_delta += v;
                    prev_ts + prev_delta
                };
                prev_ts = ts;
                out.push(ts);
            }
            Ok(out)
        }
    }
}

/// Random access at index `i`: O(1) for `Raw`, O(i) for `Delta` (sequential
/// scan from the column start, per the contract in SPEC_FULL.md §4.4).
pub fn decode_ts_at(encoding: TsEncoding, endian: DynEndian, buf: &[u8], count: usize, i: usize) -> Option<i64> {
    if i >= count {
        return None;
    }
    match encoding {
        TsEncoding::Raw => {
            let start = i * 8;
            if buf.len() < start + 8 {
                return None;
            }
            Some(endian.read_i64(&buf[start..start + 8]))
        }
        TsEncoding::Delta => decode_ts(encoding, endian, buf, i + 1).ok().and_then(|v| v.into_iter().nth(i)),
    }
}

// ── value column ─────────────────────────────────────────────────────────

pub struct ValColumnEncoder {
    encoding: ValEncoding,
    endian: DynEndian,
    buf: Vec<u8>,
    count_in_metric: u32,
    bitw: BitWriter,
    prev_bits: u64,
    prev_leading: u8,
    prev_trailing: u8,
}

impl ValColumnEncoder {
    pub fn new(encoding: ValEncoding, endian: DynEndian) -> Self {
        Self {
            encoding,
            endian,
            buf: Vec::new(),
            count_in_metric: 0,
            bitw: BitWriter::new(),
            prev_bits: 0,
            prev_leading: 64,
            prev_trailing: 64,
        }
    }

    pub fn push(&mut self, v: f64) {
        match self.encoding {
            ValEncoding::Raw => {
                let mut b = [0u8; 8];
                self.endian.write_f64(&mut b, v);
                self.buf.extend_from_slice(&b);
            }
            ValEncoding::Gorilla => {
                let bits = v.to_bits();
                if self.count_in_metric == 0 {
                    self.bitw.write_bits(bits, 64);
                } else {
                    let xor = bits ^ self.prev_bits;
                    if xor == 0 {
                        self.bitw.write_bit(false);
                    } else {
                        self.bitw.write_bit(true);
                        let leading = xor.leading_zeros() as u8;
                        let trailing = xor.trailing_zeros() as u8;
                        if leading >= self.prev_leading && trailing >= self.prev_trailing {
                            self.bitw.write_bit(false);
                            let meaningful = 64 - self.prev_leading - self.prev_trailing;
                            let val = (xor >> self.prev_trailing) & bitmask(meaningful);
                            self.bitw.write_bits(val, meaningful);
                        } else {
                            self.bitw.write_bit(true);
                            let meaningful = 64 - leading - trailing;
                            self.bitw.write_bits(leading as u64, 6);
                            self.bitw.write_bits((meaningful - 1) as u64, 6);
                            let val = (xor >> trailing) & bitmask(meaningful);
                            self.bitw.write_bits(val, meaningful);
                            self.prev_leading = leading;
                            self.prev_trailing = trailing;
                        }
                    }
                }
                self.prev_bits = bits;
            }
        }
        self.count_in_metric += 1;
    }

    pub fn finish_metric(&mut self) -> usize {
        if self.encoding == ValEncoding::Gorilla {
            let flushed = std::mem::take(&mut self.bitw).into_bytes();
            self.buf.extend_from_slice(&flushed);
        }
        self.count_in_metric = 0;
        self.prev_bits = 0;
        self.prev_leading = 64;
        self.prev_trailing = 64;
        self.buf.len()
    }

    pub fn byte_len(&self) -> usize {
        self.buf.len()
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.buf
    }
}

fn gorilla_decode_err() -> Error {
    Error::InvalidPayloadOffset {
        which: Payload::Value,
        offset: 0,
        len: 0,
    }
}

pub fn decode_val(encoding: ValEncoding, endian: DynEndian, buf: &[u8], count: usize) -> Result<Vec<f64>> {
    match encoding {
        ValEncoding::Raw => {
            let needed = count * 8;
            if buf.len() < needed {
                return Err(Error::InvalidIndexEntrySize {
                    remaining: buf.len(),
                    needed,
                    count,
                });
            }
            Ok((0..count).map(|i| endian.read_f64(&buf[i * 8..i * 8 + 8])).collect())
        }
        ValEncoding::Gorilla => {
            let mut r = BitReader::new(buf);
            let mut out = Vec::with_capacity(count);
            let mut prev_bits = 0u64;
            let mut prev_leading = 64u8;
            let mut prev_trailing = 64u8;
            for i in 0..count {
                if i == 0 {
                    let bits = r.read_bits(64).ok_or_else(gorilla_decode_err)?;
                    prev_bits = bits;
                    out.push(f64::from_bits(bits));
                    continue;
                }
                let changed = r.read_bit().ok_or_else(gorilla_decode_err)?;
                if !changed {
                    out.push(f64::from_bits(prev_bits));
                    continue;
                }
                let new_window = r.read_bit().ok_or_else(gorilla_decode_err)?;
                let bits = if !new_window {
                    let meaningful = 64 - prev_leading - prev_trailing;
                    let val = r.read_bits(meaningful).ok_or_else(gorilla_decode_err)?;
                    prev_bits ^ (val << prev_trailing)
                } else {
                    let leading = r.read_bits(6).ok_or_else(gorilla_decode_err)? as u8;
                    let meaningful = r.read_bits(6).ok_or_else(gorilla_decode_err)? as u8 + 1;
                    let trailing = 64 - leading - meaningful;
                    let val = r.read_bits(meaningful).ok_or_else(gorilla_decode_err)?;
                    prev_leading = leading;
                    prev_trailing = trailing;
                    prev_bits ^ (val << trailing)
                };
                prev_bits = bits;
                out.push(f64::from_bits(bits));
            }
            Ok(out)
        }
    }
}

pub fn decode_val_at(encoding: ValEncoding, endian: DynEndian, buf: &[u8], count: usize, i: usize) -> Option<f64> {
    if i >= count {
        return None;
    }
    match encoding {
        ValEncoding::Raw => {
            let start = i * 8;
            if buf.len() < start + 8 {
                return None;
            }
            Some(endian.read_f64(&buf[start..start + 8]))
        }
        ValEncoding::Gorilla => decode_val(encoding, endian, buf, i + 1).ok().and_then(|v| v.into_iter().nth(i)),
    }
}

// ── tag column ───────────────────────────────────────────────────────────
//
// One scheme regardless of flags: `len:u16 | utf8_bytes`, concatenated.

pub struct TagColumnEncoder {
    endian: DynEndian,
    buf: Vec<u8>,
}

impl TagColumnEncoder {
    pub fn new(endian: DynEndian) -> Self {
        Self { endian, buf: Vec::new() }
    }

    pub fn push(&mut self, tag: &str) -> Result<()> {
        let bytes = tag.as_bytes();
        if bytes.len() > u16::MAX as usize {
            return Err(Error::ValueOrTagTooLong {
                field: "tag",
                len: bytes.len(),
                limit: u16::MAX as usize,
            });
        }
        let mut len_buf = [0u8; 2];
        self.endian.write_u16(&mut len_buf, bytes.len() as u16);
        self.buf.extend_from_slice(&len_buf);
        self.buf.extend_from_slice(bytes);
        Ok(())
    }

    pub fn finish_metric(&mut self) -> usize {
        self.buf.len()
    }

    pub fn byte_len(&self) -> usize {
        self.buf.len()
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.buf
    }
}

pub fn decode_tags(endian: DynEndian, buf: &[u8], count: usize) -> Result<Vec<String>> {
    let mut out = Vec::with_capacity(count);
    let mut pos = 0usize;
    for _ in 0..count {
        if buf.len() < pos + 2 {
            return Err(Error::InvalidPayloadOffset {
                which: Payload::Tag,
                offset: pos as u64,
                len: buf.len(),
            });
        }
        let len = endian.read_u16(&buf[pos..pos + 2]) as usize;
        pos += 2;
        if buf.len() < pos + len {
            return Err(Error::InvalidPayloadOffset {
                which: Payload::Tag,
                offset: pos as u64,
                len: buf.len(),
            });
        }
        let s = std::str::from_utf8(&buf[pos..pos + len])
            .map_err(|e| Error::InvalidHeader(format!("tag is not valid utf-8: {e}")))?
            .to_string();
        pos += len;
        out.push(s);
    }
    Ok(out)
}

pub fn decode_tag_at(endian: DynEndian, buf: &[u8], count: usize, i: usize) -> Option<String> {
    if i >= count {
        return None;
    }
    decode_tags(endian, buf, i + 1).ok().and_then(|v| v.into_iter().nth(i))
}
