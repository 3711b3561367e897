//! The 64-bit metric-name hash `H(name) -> u64`.
//!
//! Deliberately out of scope as a *pluggable* interface per the format
//! (any implementation-agnostic 64-bit hash with `H("") != 0` works), but a
//! concrete default is needed to actually run. This mirrors the teacher
//! crate's existing `xxhash-rust` dependency (there used for block
//! checksums); reused here as `xxh3_64` for name hashing.

use xxhash_rust::xxh3::xxh3_64;

/// Computes the metric id from a metric name.
///
/// `xxh3_64("")` happens to be a fixed non-zero constant, but we don't want
/// correctness of this format to depend on that incidental fact, so the
/// empty string is salted with its (zero) length to guarantee `H("") != 0`
/// without disturbing the distribution of non-empty names.
pub fn hash_name(name: &str) -> u64 {
    let h = xxh3_64(name.as_bytes());
    if name.is_empty() && h == 0 {
        0x9E37_79B9_7F4A_7C15
    } else {
        h
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_name_hashes_nonzero() {
        assert_ne!(hash_name(""), 0);
    }

    #[test]
    fn distinct_names_usually_differ() {
        assert_ne!(hash_name("cpu.usage"), hash_name("mem.usage"));
    }

    #[test]
    fn deterministic() {
        assert_eq!(hash_name("cpu.usage"), hash_name("cpu.usage"));
    }
}
