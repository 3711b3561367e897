//! Columnar time-series blob codec: a compact binary container for batches
//! of numeric or text observations, plus materialized views for random
//! access. See `numeric` and `text` for the two blob families.

pub mod bitbuffer;
pub mod codec;
pub mod collision;
pub mod endian;
pub mod error;
pub mod format;
pub mod hash;
pub mod names;
pub mod numeric;
pub mod text;
pub mod varint;

pub use codec::Codec;
pub use endian::{BigEndian, DynEndian, Endian, LittleEndian};
pub use error::{Error, Result};
pub use format::{HEADER_SIZE, MAGIC};
pub use hash::hash_name;
