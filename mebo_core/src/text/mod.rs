//! The text (string observation) blob family: row-oriented encoder, decoder,
//! a read-only blob view, and materialized random-access views.

pub mod blob;
pub mod decoder;
pub mod encoder;
pub mod materialized;
pub mod row;

pub use blob::TextBlob;
pub use decoder::TextDecoder;
pub use encoder::{TextEncoder, TextEncoderOptions};
pub use materialized::{MaterializedTextBlob, MaterializedTextBlobSet, MaterializedTextMetric, MaterializedTextSetMetric};
pub use row::TextDataPoint;
