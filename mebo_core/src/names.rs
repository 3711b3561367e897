//! Metric-names payload: `count:u32 | (len:u16 | utf8_bytes)*count`.
//!
//! Present iff the `HAS_METRIC_NAMES` header flag is set; the i-th name
//! corresponds to the i-th index entry.

use crate::endian::Endian;
use crate::error::{Error, Result};
use crate::hash::hash_name;

pub fn encode<E: Endian>(endian: E, names: &[String]) -> Vec<u8> {
    let mut out = Vec::new();
    let mut count_buf = [0u8; 4];
    endian.write_u32(&mut count_buf, names.len() as u32);
    out.extend_from_slice(&count_buf);

    for name in names {
        let bytes = name.as_bytes();
        let mut len_buf = [0u8; 2];
        endian.write_u16(&mut len_buf, bytes.len() as u16);
        out.extend_from_slice(&len_buf);
        out.extend_from_slice(bytes);
    }
    out
}

/// Decodes the names list starting at `buf[0]`, returning the names and the
/// number of bytes consumed.
pub fn decode<E: Endian>(endian: E, buf: &[u8]) -> Result<(Vec<String>, usize)> {
    if buf.len() < 4 {
        return Err(Error::InvalidHeader(
            "metric names payload truncated (missing count)".to_string(),
        ));
    }
    let count = endian.read_u32(&buf[0..4]) as usize;
    let mut pos = 4;
    let mut names = Vec::with_capacity(count);

    for _ in 0..count {
        if buf.len() < pos + 2 {
            return Err(Error::InvalidHeader(
                "metric names payload truncated (missing length prefix)".to_string(),
            ));
        }
        let len = endian.read_u16(&buf[pos..pos + 2]) as usize;
        pos += 2;
        if buf.len() < pos + len {
            return Err(Error::InvalidHeader(
                "metric names payload truncated (missing name bytes)".to_string(),
            ));
        }
        let name = std::str::from_utf8(&buf[pos..pos + len])
            .map_err(|e| Error::InvalidHeader(format!("metric name is not valid utf-8: {e}")))?
            .to_string();
        pos += len;
        names.push(name);
    }

    Ok((names, pos))
}

/// Verifies `H(names[i]) == ids[i]` for every i, per the decoder contract.
pub fn verify(names: &[String], ids: &[u64]) -> Result<()> {
    for (i, (name, &expected)) in names.iter().zip(ids.iter()).enumerate() {
        let computed = hash_name(name);
        if computed != expected {
            return Err(Error::MetricNameVerificationFailed {
                index: i,
                computed,
                expected,
            });
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::endian::LittleEndian;

    #[test]
    fn roundtrip() {
        let names = vec!["cpu.usage".to_string(), "mem.usage".to_string(), "".to_string()];
        let encoded = encode(LittleEndian, &names);
        let (decoded, consumed) = decode(LittleEndian, &encoded).unwrap();
        assert_eq!(decoded, names);
        assert_eq!(consumed, encoded.len());
    }

    #[test]
    fn verify_detects_mismatch() {
        let names = vec!["cpu.usage".to_string()];
        let ids = vec![hash_name("cpu.usage").wrapping_add(1)];
        assert!(verify(&names, &ids).is_err());
    }

    #[test]
    fn verify_passes_for_correct_hashes() {
        let names = vec!["a".to_string(), "b".to_string()];
        let ids: Vec<u64> = names.iter().map(|n| hash_name(n)).collect();
        assert!(verify(&names, &ids).is_ok());
    }
}
