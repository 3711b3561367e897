/// Pluggable compression codec used for the timestamp, value, and tag
/// payload sections.
///
/// Unlike the block-oriented container this format's encoder/decoder pair
/// is descended from, a `Codec` here compresses a single whole payload
/// section (all metrics' timestamp columns concatenated, for instance)
/// rather than an independent fixed-size block, so there is no per-block
/// metadata sidecar to carry.
pub trait Codec: Send + Sync {
    /// Stable codec id stored in the blob header's compression flag bits
    /// (0=None, 1=Zstd, 2=Lz4 — see `format::codec` constants).
    fn id(&self) -> u16;

    fn name(&self) -> &'static str;

    fn compress(&self, raw: &[u8]) -> crate::error::Result<Vec<u8>>;

    fn decompress(&self, compressed: &[u8]) -> crate::error::Result<Vec<u8>>;
}
