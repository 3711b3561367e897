use mebo_core::error::Result;
use mebo_core::format::codec_id;
use mebo_core::Codec;

/// No-op codec: stores payload sections verbatim, with no compression.
///
/// Useful for verifying the format round-trip independently of any codec, or
/// for data that is already compressed upstream where further compression
/// would only add overhead.
pub struct PassThroughCodec;

impl Codec for PassThroughCodec {
    fn id(&self) -> u16 {
        codec_id::NONE
    }

    fn name(&self) -> &'static str {
        "passthrough"
    }

    fn compress(&self, raw: &[u8]) -> Result<Vec<u8>> {
        Ok(raw.to_vec())
    }

    fn decompress(&self, compressed: &[u8]) -> Result<Vec<u8>> {
        Ok(compressed.to_vec())
    }
}
