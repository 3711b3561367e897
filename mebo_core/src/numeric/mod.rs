//! The numeric (float64 observation) blob family: encoder, decoder, a
//! read-only blob view, and materialized random-access views.

pub mod blob;
pub mod columns;
pub mod decoder;
pub mod encoder;
pub mod materialized;

pub use blob::{DataPoint, NumericBlob};
pub use decoder::NumericDecoder;
pub use encoder::{EncoderOptions, NumericEncoder};
pub use materialized::{MaterializedMetric, MaterializedNumericBlob, MaterializedNumericBlobSet, MaterializedSetMetric};
