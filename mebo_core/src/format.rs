//! Wire-format constants and fixed-width struct packing for both blob
//! families. See SPEC_FULL.md §6 for the full field-by-field rationale.

use crate::endian::{DynEndian, Endian};
use crate::error::{Error, Result};

/// Magic prefix for both numeric and text blobs: `b"MEB0"`.
pub const MAGIC: &[u8; 4] = b"MEB0";

pub const VERSION: u16 = 1;

/// Fixed size of the numeric/text header, in bytes.
pub const HEADER_SIZE: usize = 32;

/// Size of one numeric index entry, in bytes.
pub const NUMERIC_INDEX_ENTRY_SIZE: usize = 16;

/// Size of one text index entry, in bytes.
pub const TEXT_INDEX_ENTRY_SIZE: usize = 24;

pub const MAX_METRIC_COUNT: usize = 65_536;
pub const MAX_POINTS_PER_METRIC: usize = 65_535;
pub const MAX_OFFSET_DELTA: u64 = 65_535;

// ── flag bits ────────────────────────────────────────────────────────────

pub const FLAG_HAS_TAG: u16 = 1 << 0;
pub const FLAG_HAS_METRIC_NAMES: u16 = 1 << 1;
pub const FLAG_BIG_ENDIAN: u16 = 1 << 2;
// bits 3-4: timestamp encoding
// bits 5-6: value encoding
// bits 7-8: timestamp-payload codec
// bits 9-10: value-payload codec (tag payload reuses this)
const TS_ENCODING_SHIFT: u16 = 3;
const VAL_ENCODING_SHIFT: u16 = 5;
const TS_CODEC_SHIFT: u16 = 7;
const VAL_CODEC_SHIFT: u16 = 9;
const TWO_BIT_MASK: u16 = 0b11;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TsEncoding {
    Raw = 0,
    Delta = 1,
}

impl TsEncoding {
    pub fn from_bits(bits: u16) -> Result<Self> {
        match bits {
            0 => Ok(TsEncoding::Raw),
            1 => Ok(TsEncoding::Delta),
            other => Err(Error::UnsupportedEncoding(format!(
                "unknown timestamp encoding tag {other}"
            ))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValEncoding {
    Raw = 0,
    Gorilla = 1,
}

impl ValEncoding {
    pub fn from_bits(bits: u16) -> Result<Self> {
        match bits {
            0 => Ok(ValEncoding::Raw),
            1 => Ok(ValEncoding::Gorilla),
            other => Err(Error::UnsupportedEncoding(format!(
                "unknown value encoding tag {other}"
            ))),
        }
    }
}

pub mod codec_id {
    pub const NONE: u16 = 0;
    pub const ZSTD: u16 = 1;
    pub const LZ4: u16 = 2;
}

fn pack2(flags: u16, shift: u16, value: u16) -> u16 {
    (flags & !(TWO_BIT_MASK << shift)) | ((value & TWO_BIT_MASK) << shift)
}

fn unpack2(flags: u16, shift: u16) -> u16 {
    (flags >> shift) & TWO_BIT_MASK
}

#[derive(Debug, Clone, Copy)]
pub struct Flags(pub u16);

impl Flags {
    pub fn new() -> Self {
        Flags(0)
    }

    pub fn has_tag(&self) -> bool {
        self.0 & FLAG_HAS_TAG != 0
    }
    pub fn set_has_tag(&mut self, v: bool) {
        self.0 = if v { self.0 | FLAG_HAS_TAG } else { self.0 & !FLAG_HAS_TAG };
    }

    pub fn has_metric_names(&self) -> bool {
        self.0 & FLAG_HAS_METRIC_NAMES != 0
    }
    pub fn set_has_metric_names(&mut self, v: bool) {
        self.0 = if v {
            self.0 | FLAG_HAS_METRIC_NAMES
        } else {
            self.0 & !FLAG_HAS_METRIC_NAMES
        };
    }

    pub fn big_endian(&self) -> bool {
        self.0 & FLAG_BIG_ENDIAN != 0
    }
    pub fn set_big_endian(&mut self, v: bool) {
        self.0 = if v { self.0 | FLAG_BIG_ENDIAN } else { self.0 & !FLAG_BIG_ENDIAN };
    }

    pub fn ts_encoding(&self) -> Result<TsEncoding> {
        TsEncoding::from_bits(unpack2(self.0, TS_ENCODING_SHIFT))
    }
    pub fn set_ts_encoding(&mut self, e: TsEncoding) {
        self.0 = pack2(self.0, TS_ENCODING_SHIFT, e as u16);
    }

    pub fn val_encoding(&self) -> Result<ValEncoding> {
        ValEncoding::from_bits(unpack2(self.0, VAL_ENCODING_SHIFT))
    }
    pub fn set_val_encoding(&mut self, e: ValEncoding) {
        self.0 = pack2(self.0, VAL_ENCODING_SHIFT, e as u16);
    }

    pub fn ts_codec(&self) -> u16 {
        unpack2(self.0, TS_CODEC_SHIFT)
    }
    pub fn set_ts_codec(&mut self, id: u16) {
        self.0 = pack2(self.0, TS_CODEC_SHIFT, id);
    }

    pub fn val_codec(&self) -> u16 {
        unpack2(self.0, VAL_CODEC_SHIFT)
    }
    pub fn set_val_codec(&mut self, id: u16) {
        self.0 = pack2(self.0, VAL_CODEC_SHIFT, id);
    }

    /// Tag payload reuses the value-column codec (see SPEC_FULL.md §6.1
    /// Open Question resolution — only two 2-bit codec selectors fit).
    pub fn tag_codec(&self) -> u16 {
        self.val_codec()
    }

    pub fn endian(&self) -> DynEndian {
        DynEndian::from_big_flag(self.big_endian())
    }
}

impl Default for Flags {
    fn default() -> Self {
        Self::new()
    }
}

// ── numeric header ───────────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct NumericHeader {
    pub flags: Flags,
    pub metric_count: u32,
    pub start_time_us: i64,
    pub index_offset: u32,
    pub ts_payload_offset: u32,
}

impl NumericHeader {
    pub fn to_bytes(&self) -> [u8; HEADER_SIZE] {
        let mut buf = [0u8; HEADER_SIZE];
        let endian = self.flags.endian();
        buf[0..4].copy_from_slice(MAGIC);
        endian.write_u16(&mut buf[4..6], VERSION);
        endian.write_u16(&mut buf[6..8], self.flags.0);
        // buf[8..12] reserved, stays zero
        endian.write_u32(&mut buf[12..16], self.metric_count);
        endian.write_i64(&mut buf[16..24], self.start_time_us);
        endian.write_u32(&mut buf[24..28], self.index_offset);
        endian.write_u32(&mut buf[28..32], self.ts_payload_offset);
        buf
    }

    pub fn from_bytes(buf: &[u8]) -> Result<Self> {
        if buf.len() < HEADER_SIZE {
            return Err(Error::InvalidHeaderSize {
                expected: HEADER_SIZE,
                actual: buf.len(),
            });
        }
        if &buf[0..4] != MAGIC {
            return Err(Error::InvalidHeader(
                "bad magic bytes — not a MEB0 blob".to_string(),
            ));
        }
        // Flags determine endianness, but we need the flags themselves to
        // know which endian to read them with. Peek the field both ways and
        // trust whichever reading self-confirms its own `BIG_ENDIAN` bit: a
        // genuinely BE-written flags field sets that bit only when read back
        // as BE, not as LE.
        let flags_le = DynEndian::Little.read_u16(&buf[6..8]);
        let flags_be = DynEndian::Big.read_u16(&buf[6..8]);
        let (flags_raw, endian) = if flags_be & FLAG_BIG_ENDIAN != 0 {
            (flags_be, DynEndian::Big)
        } else {
            (flags_le, DynEndian::Little)
        };

        let version = endian.read_u16(&buf[4..6]);
        if version != VERSION {
            return Err(Error::InvalidHeader(format!(
                "unsupported version {version} (only version {VERSION} is supported)"
            )));
        }

        let flags = Flags(flags_raw);
        // Validate the encoding tags eagerly so a later decode() doesn't
        // have to re-derive them from a possibly-corrupt flags field.
        flags.ts_encoding()?;
        flags.val_encoding()?;

        Ok(Self {
            metric_count: endian.read_u32(&buf[12..16]),
            start_time_us: endian.read_i64(&buf[16..24]),
            index_offset: endian.read_u32(&buf[24..28]),
            ts_payload_offset: endian.read_u32(&buf[28..32]),
            flags,
        })
    }
}

#[derive(Debug, Clone, Default)]
pub struct NumericIndexEntry {
    pub metric_id: u64,
    pub count: u16,
    pub ts_delta: u16,
    pub val_delta: u16,
    pub tag_delta: u16,
}

impl NumericIndexEntry {
    pub fn to_bytes<E: Endian>(&self, endian: E) -> [u8; NUMERIC_INDEX_ENTRY_SIZE] {
        let mut buf = [0u8; NUMERIC_INDEX_ENTRY_SIZE];
        endian.write_u64(&mut buf[0..8], self.metric_id);
        endian.write_u16(&mut buf[8..10], self.count);
        endian.write_u16(&mut buf[10..12], self.ts_delta);
        endian.write_u16(&mut buf[12..14], self.val_delta);
        endian.write_u16(&mut buf[14..16], self.tag_delta);
        buf
    }

    pub fn from_bytes<E: Endian>(endian: E, buf: &[u8]) -> Self {
        Self {
            metric_id: endian.read_u64(&buf[0..8]),
            count: endian.read_u16(&buf[8..10]),
            ts_delta: endian.read_u16(&buf[10..12]),
            val_delta: endian.read_u16(&buf[12..14]),
            tag_delta: endian.read_u16(&buf[14..16]),
        }
    }
}

// ── text header ──────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct TextHeader {
    pub flags: Flags,
    pub metric_count: u32,
    pub start_time_us: i64,
    pub index_offset: u32,
    pub data_offset: u32,
}

impl TextHeader {
    pub fn to_bytes(&self) -> [u8; HEADER_SIZE] {
        let mut buf = [0u8; HEADER_SIZE];
        let endian = self.flags.endian();
        buf[0..4].copy_from_slice(MAGIC);
        endian.write_u16(&mut buf[4..6], VERSION);
        endian.write_u16(&mut buf[6..8], self.flags.0);
        endian.write_u32(&mut buf[12..16], self.metric_count);
        endian.write_i64(&mut buf[16..24], self.start_time_us);
        endian.write_u32(&mut buf[24..28], self.index_offset);
        endian.write_u32(&mut buf[28..32], self.data_offset);
        buf
    }

    pub fn from_bytes(buf: &[u8]) -> Result<Self> {
        if buf.len() < HEADER_SIZE {
            return Err(Error::InvalidHeaderSize {
                expected: HEADER_SIZE,
                actual: buf.len(),
            });
        }
        if &buf[0..4] != MAGIC {
            return Err(Error::InvalidHeader(
                "bad magic bytes — not a MEB0 blob".to_string(),
            ));
        }
        let flags_le = DynEndian::Little.read_u16(&buf[6..8]);
        let flags_be = DynEndian::Big.read_u16(&buf[6..8]);
        let (flags_raw, endian) = if flags_be & FLAG_BIG_ENDIAN != 0 {
            (flags_be, DynEndian::Big)
        } else {
            (flags_le, DynEndian::Little)
        };

        let version = endian.read_u16(&buf[4..6]);
        if version != VERSION {
            return Err(Error::InvalidHeader(format!(
                "unsupported version {version} (only version {VERSION} is supported)"
            )));
        }
        let flags = Flags(flags_raw);
        flags.ts_encoding()?;

        Ok(Self {
            metric_count: endian.read_u32(&buf[12..16]),
            start_time_us: endian.read_i64(&buf[16..24]),
            index_offset: endian.read_u32(&buf[24..28]),
            data_offset: endian.read_u32(&buf[28..32]),
            flags,
        })
    }
}

#[derive(Debug, Clone, Default)]
pub struct TextIndexEntry {
    pub metric_id: u64,
    pub count: u16,
    pub offset: u32,
    pub size: u32,
}

pub const TEXT_INDEX_ENTRY_RESERVED_LEN: usize = 4;

impl TextIndexEntry {
    pub fn to_bytes<E: Endian>(&self, endian: E) -> [u8; TEXT_INDEX_ENTRY_SIZE] {
        let mut buf = [0u8; TEXT_INDEX_ENTRY_SIZE];
        endian.write_u64(&mut buf[0..8], self.metric_id);
        endian.write_u16(&mut buf[8..10], self.count);
        // buf[10..12] pad, stays zero
        endian.write_u32(&mut buf[12..16], self.offset);
        endian.write_u32(&mut buf[16..20], self.size);
        // buf[20..24] reserved, stays zero
        buf
    }

    pub fn from_bytes<E: Endian>(endian: E, buf: &[u8]) -> Self {
        Self {
            metric_id: endian.read_u64(&buf[0..8]),
            count: endian.read_u16(&buf[8..10]),
            offset: endian.read_u32(&buf[12..16]),
            size: endian.read_u32(&buf[16..20]),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::endian::LittleEndian;

    #[test]
    fn flags_pack_unpack_roundtrip() {
        let mut f = Flags::new();
        f.set_has_tag(true);
        f.set_has_metric_names(true);
        f.set_ts_encoding(TsEncoding::Delta);
        f.set_val_encoding(ValEncoding::Gorilla);
        f.set_ts_codec(codec_id::ZSTD);
        f.set_val_codec(codec_id::LZ4);

        assert!(f.has_tag());
        assert!(f.has_metric_names());
        assert!(!f.big_endian());
        assert_eq!(f.ts_encoding().unwrap(), TsEncoding::Delta);
        assert_eq!(f.val_encoding().unwrap(), ValEncoding::Gorilla);
        assert_eq!(f.ts_codec(), codec_id::ZSTD);
        assert_eq!(f.val_codec(), codec_id::LZ4);
        assert_eq!(f.tag_codec(), codec_id::LZ4);
    }

    #[test]
    fn numeric_header_roundtrip_little_endian() {
        let mut flags = Flags::new();
        flags.set_has_tag(true);
        flags.set_ts_encoding(TsEncoding::Delta);
        flags.set_val_encoding(ValEncoding::Gorilla);

        let header = NumericHeader {
            flags,
            metric_count: 3,
            start_time_us: 1_700_000_000_000_000,
            index_offset: 32,
            ts_payload_offset: 80,
        };
        let bytes = header.to_bytes();
        let decoded = NumericHeader::from_bytes(&bytes).unwrap();
        assert_eq!(decoded.metric_count, 3);
        assert_eq!(decoded.start_time_us, 1_700_000_000_000_000);
        assert_eq!(decoded.index_offset, 32);
        assert_eq!(decoded.ts_payload_offset, 80);
        assert!(decoded.flags.has_tag());
        assert_eq!(decoded.flags.ts_encoding().unwrap(), TsEncoding::Delta);
        assert_eq!(decoded.flags.val_encoding().unwrap(), ValEncoding::Gorilla);
    }

    #[test]
    fn numeric_header_roundtrip_big_endian() {
        let mut flags = Flags::new();
        flags.set_big_endian(true);
        flags.set_has_metric_names(true);

        let header = NumericHeader {
            flags,
            metric_count: 7,
            start_time_us: 42,
            index_offset: 32,
            ts_payload_offset: 200,
        };
        let bytes = header.to_bytes();
        let decoded = NumericHeader::from_bytes(&bytes).unwrap();
        assert_eq!(decoded.metric_count, 7);
        assert!(decoded.flags.big_endian());
        assert!(decoded.flags.has_metric_names());
    }

    #[test]
    fn bad_magic_rejected() {
        let mut bytes = NumericHeader {
            flags: Flags::new(),
            metric_count: 1,
            start_time_us: 0,
            index_offset: 32,
            ts_payload_offset: 32,
        }
        .to_bytes();
        bytes[0] = b'X';
        assert!(NumericHeader::from_bytes(&bytes).is_err());
    }

    #[test]
    fn numeric_index_entry_roundtrip() {
        let entry = NumericIndexEntry {
            metric_id: 0xDEAD_BEEF,
            count: 10,
            ts_delta: 100,
            val_delta: 200,
            tag_delta: 0,
        };
        let bytes = entry.to_bytes(LittleEndian);
        let decoded = NumericIndexEntry::from_bytes(LittleEndian, &bytes);
        assert_eq!(decoded.metric_id, entry.metric_id);
        assert_eq!(decoded.count, entry.count);
        assert_eq!(decoded.ts_delta, entry.ts_delta);
        assert_eq!(decoded.val_delta, entry.val_delta);
        assert_eq!(decoded.tag_delta, entry.tag_delta);
    }

    #[test]
    fn text_header_and_index_roundtrip() {
        let header = TextHeader {
            flags: Flags::new(),
            metric_count: 2,
            start_time_us: 99,
            index_offset: 32,
            data_offset: 64,
        };
        let bytes = header.to_bytes();
        let decoded = TextHeader::from_bytes(&bytes).unwrap();
        assert_eq!(decoded.metric_count, 2);
        assert_eq!(decoded.data_offset, 64);

        let entry = TextIndexEntry {
            metric_id: 55,
            count: 3,
            offset: 10,
            size: 20,
        };
        let eb = entry.to_bytes(LittleEndian);
        let de = TextIndexEntry::from_bytes(LittleEndian, &eb);
        assert_eq!(de.metric_id, 55);
        assert_eq!(de.count, 3);
        assert_eq!(de.offset, 10);
        assert_eq!(de.size, 20);
    }
}
