mod lz4_codec;
mod passthrough;
mod zstd_codec;

pub use lz4_codec::Lz4Codec;
pub use passthrough::PassThroughCodec;
pub use zstd_codec::ZstdCodec;

use std::sync::Arc;

use mebo_core::error::{Error, Result};
use mebo_core::format::codec_id;
use mebo_core::Codec;

/// Resolves a codec from its on-disk `codec_id` (the 2-bit field packed into
/// a blob's flags). Called by the CLI when inspecting or decoding an
/// existing blob so the reader is initialized with the right codec
/// automatically.
pub fn codec_by_id(id: u16) -> Result<Arc<dyn Codec>> {
    match id {
        codec_id::NONE => Ok(Arc::new(PassThroughCodec)),
        codec_id::ZSTD => Ok(Arc::new(ZstdCodec::default())),
        codec_id::LZ4 => Ok(Arc::new(Lz4Codec)),
        other => Err(Error::Codec(format!(
            "unknown codec id {other}; mebo supports 0 (passthrough), 1 (zstd), 2 (lz4)"
        ))),
    }
}
