//! Row codec for the text family: `ts_token | len_v:u8 | [len_t:u8] |
//! value_bytes | [tag_bytes]`, concatenated per metric into one payload.
//!
//! Unlike the numeric family's independent ts/val/tag columns, text rows
//! interleave everything so a reader can scan one row at a time without
//! juggling three cursors — the natural layout for variable-length string
//! payloads (see SPEC_FULL.md §3, "VarString").

use crate::endian::{DynEndian, Endian};
use crate::error::{Error, Result};
use crate::format::TsEncoding;
use crate::varint::{read_varint, write_varint};

pub const MAX_FIELD_LEN: usize = u8::MAX as usize;

#[derive(Debug, Clone, PartialEq)]
pub struct TextDataPoint {
    pub timestamp: i64,
    pub value: String,
    pub tag: Option<String>,
}

/// Per-metric timestamp encoding state, reset at each `start_metric_*`.
#[derive(Default)]
struct TsState {
    count: u32,
    prev_ts: i64,
    prev_delta: i64,
}

impl TsState {
    fn reset(&mut self) {
        *self = Self::default();
    }

    fn write(&mut self, out: &mut Vec<u8>, encoding: TsEncoding, endian: DynEndian, ts: i64) {
        match encoding {
            TsEncoding::Raw => {
                let mut b = [0u8; 8];
                endian.write_i64(&mut b, ts);
                out.extend_from_slice(&b);
            }
            TsEncoding::Delta => {
                if self.count == 0 {
                    write_varint(out, ts);
                } else if self.count == 1 {
                    let delta = ts - self.prev_ts;
                    write_varint(out, delta);
                    self.prev_delta = delta;
                } else {
                    let delta = ts - self.prev_ts;
                    let dod = delta - self.prev_delta;
                    write_varint(out, dod);
                    self.prev_delta = delta;
                }
                self.prev_ts = ts;
            }
        }
        self.count += 1;
    }
}

pub fn validate_field_len(field: &'static str, len: usize) -> Result<()> {
    if len > MAX_FIELD_LEN {
        Err(Error::ValueOrTagTooLong {
            field,
            len,
            limit: MAX_FIELD_LEN,
        })
    } else {
        Ok(())
    }
}

/// Accumulates encoded rows for one metric's worth of points into `out`
/// (the cumulative per-blob data payload buffer).
pub struct RowEncoder {
    encoding: TsEncoding,
    endian: DynEndian,
    has_tag: bool,
    ts_state: TsState,
}

impl RowEncoder {
    pub fn new(encoding: TsEncoding, endian: DynEndian, has_tag: bool) -> Self {
        Self {
            encoding,
            endian,
            has_tag,
            ts_state: TsState::default(),
        }
    }

    pub fn start_metric(&mut self) {
        self.ts_state.reset();
    }

    pub fn push(&mut self, out: &mut Vec<u8>, ts: i64, value: &str, tag: &str) -> Result<()> {
        validate_field_len("value", value.len())?;
        if self.has_tag {
            validate_field_len("tag", tag.len())?;
        }
        self.ts_state.write(out, self.encoding, self.endian, ts);
        out.push(value.len() as u8);
        if self.has_tag {
            out.push(tag.len() as u8);
        }
        out.extend_from_slice(value.as_bytes());
        if self.has_tag {
            out.extend_from_slice(tag.as_bytes());
        }
        Ok(())
    }
}

fn read_ts(buf: &[u8], pos: usize, encoding: TsEncoding, endian: DynEndian, state: &mut TsState) -> Result<(i64, usize)> {
    match encoding {
        TsEncoding::Raw => {
            if buf.len() < pos + 8 {
                return Err(Error::InvalidHeader("text row truncated (timestamp)".to_string()));
            }
            Ok((endian.read_i64(&buf[pos..pos + 8]), 8))
        }
        TsEncoding::Delta => {
            let (v, consumed) = read_varint(buf, pos)
                .ok_or_else(|| Error::InvalidHeader("text row truncated (timestamp varint)".to_string()))?;
            let ts = if state.count == 0 {
                v
            } else if state.count == 1 {
                state.prev_delta = v;
                state.prev_ts + v
            } else {
                state.prev_delta += v;
                state.prev_ts + state.prev_delta
            };
            state.prev_ts = ts;
            state.count += 1;
            Ok((ts, consumed))
        }
    }
}

/// Decodes every row of a metric's slice (`buf`) in order.
pub fn decode_rows(buf: &[u8], count: usize, encoding: TsEncoding, endian: DynEndian, has_tag: bool) -> Result<Vec<TextDataPoint>> {
    let mut out = Vec::with_capacity(count);
    let mut pos = 0usize;
    let mut ts_state = TsState::default();
    for _ in 0..count {
        let (timestamp, consumed) = read_ts(buf, pos, encoding, endian, &mut ts_state)?;
        pos += consumed;
        if buf.len() < pos + 1 {
            return Err(Error::InvalidHeader("text row truncated (value length)".to_string()));
        }
        let len_v = buf[pos] as usize;
        pos += 1;
        let len_t = if has_tag {
            if buf.len() < pos + 1 {
                return Err(Error::InvalidHeader("text row truncated (tag length)".to_string()));
            }
            let l = buf[pos] as usize;
            pos += 1;
            Some(l)
        } else {
            None
        };
        if buf.len() < pos + len_v {
            return Err(Error::InvalidHeader("text row truncated (value bytes)".to_string()));
        }
        let value = std::str::from_utf8(&buf[pos..pos + len_v])
            .map_err(|e| Error::InvalidHeader(format!("text value is not valid utf-8: {e}")))?
            .to_string();
        pos += len_v;
        let tag = if let Some(len_t) = len_t {
            if buf.len() < pos + len_t {
                return Err(Error::InvalidHeader("text row truncated (tag bytes)".to_string()));
            }
            let s = std::str::from_utf8(&buf[pos..pos + len_t])
                .map_err(|e| Error::InvalidHeader(format!("text tag is not valid utf-8: {e}")))?
                .to_string();
            pos += len_t;
            Some(s)
        } else {
            None
        };
        out.push(TextDataPoint { timestamp, value, tag });
    }
    Ok(out)
}

pub fn decode_row_at(buf: &[u8], count: usize, encoding: TsEncoding, endian: DynEndian, has_tag: bool, i: usize) -> Option<TextDataPoint> {
    if i >= count {
        return None;
    }
    decode_rows(buf, i + 1, encoding, endian, has_tag).ok().and_then(|v| v.into_iter().nth(i))
}
