use lz4_flex::{compress_prepend_size, decompress_size_prepended};

use mebo_core::error::{Error, Result};
use mebo_core::format::codec_id;
use mebo_core::Codec;

/// LZ4 payload codec.
///
/// Fastest decompression of the bundled codecs — typically 3-5 GB/s on
/// modern hardware. Best for hot series where decode speed during random
/// access matters more than size reduction.
pub struct Lz4Codec;

impl Codec for Lz4Codec {
    fn id(&self) -> u16 {
        codec_id::LZ4
    }

    fn name(&self) -> &'static str {
        "lz4"
    }

    fn compress(&self, raw: &[u8]) -> Result<Vec<u8>> {
        Ok(compress_prepend_size(raw))
    }

    fn decompress(&self, compressed: &[u8]) -> Result<Vec<u8>> {
        decompress_size_prepended(compressed).map_err(|e| Error::Codec(format!("lz4 decompress error: {e}")))
    }
}
