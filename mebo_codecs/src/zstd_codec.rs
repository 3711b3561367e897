use mebo_core::error::{Error, Result};
use mebo_core::format::codec_id;
use mebo_core::Codec;

/// Zstandard payload codec.
///
/// Each payload section (all metrics' timestamp columns concatenated, for
/// instance) is compressed as one `zstd` frame at the configured level
/// (default: 3).
///
/// Best for: general numeric series, tag/log text, mixed structured data.
pub struct ZstdCodec {
    /// Compression level (1 = fast / larger, 22 = slow / smallest).
    pub level: i32,
}

impl Default for ZstdCodec {
    fn default() -> Self {
        Self { level: 3 }
    }
}

impl ZstdCodec {
    pub fn new(level: i32) -> Self {
        Self { level }
    }
}

impl Codec for ZstdCodec {
    fn id(&self) -> u16 {
        codec_id::ZSTD
    }

    fn name(&self) -> &'static str {
        "zstd"
    }

    fn compress(&self, raw: &[u8]) -> Result<Vec<u8>> {
        zstd::bulk::compress(raw, self.level).map_err(|e| Error::Codec(format!("zstd compress error: {e}")))
    }

    fn decompress(&self, compressed: &[u8]) -> Result<Vec<u8>> {
        // The section's own `raw_len` prefix (read by the caller) is the
        // authoritative size check; zstd's frame header carries its own
        // content size too, so we let it decode into a freshly sized Vec.
        zstd::decode_all(compressed).map_err(|e| Error::Codec(format!("zstd decompress error: {e}")))
    }
}
