//! Synthetic multi-metric, multi-blob demo: builds several numeric series
//! spread across a handful of blobs (as if each blob were one ingestion
//! window), then compares sequential-decode access against a materialized
//! blob-set view for random point lookups.

use std::sync::Arc;
use std::time::Instant;

use mebo_core::format::{TsEncoding, ValEncoding};
use mebo_core::numeric::materialized::MaterializedNumericBlobSet;
use mebo_core::numeric::{EncoderOptions, NumericBlob, NumericDecoder, NumericEncoder};

const BLOB_COUNT: u64 = 10;
const METRICS_PER_BLOB: u64 = 50;
const POINTS_PER_METRIC: usize = 2_000;
const RANDOM_READS: u64 = 50_000;

fn human_bytes(n: u64) -> String {
    const UNITS: &[&str] = &["B", "KB", "MB", "GB"];
    let mut v = n as f64;
    let mut unit = 0;
    while v >= 1024.0 && unit < UNITS.len() - 1 {
        v /= 1024.0;
        unit += 1;
    }
    format!("{v:.2} {}", UNITS[unit])
}

fn build_blob(blob_idx: u64, codec: Arc<dyn mebo_core::Codec>) -> anyhow::Result<Vec<u8>> {
    let opts = EncoderOptions {
        ts_encoding: TsEncoding::Delta,
        val_encoding: ValEncoding::Gorilla,
        has_tag: false,
        big_endian: false,
        ts_codec: Some(codec.clone()),
        val_codec: Some(codec),
    };
    let mut enc = NumericEncoder::new(blob_idx as i64 * POINTS_PER_METRIC as i64, opts)?;
    for m in 0..METRICS_PER_BLOB {
        // Every third metric is missing from every other blob, exercising
        // the sparse cross-blob concatenation path.
        if m % 3 == 0 && blob_idx % 2 == 1 {
            continue;
        }
        let id = m + 1;
        enc.start_metric_id(id, POINTS_PER_METRIC)?;
        for p in 0..POINTS_PER_METRIC {
            let ts = (blob_idx * POINTS_PER_METRIC as u64 + p as u64) as i64;
            let value = (ts as f64 * 0.01 + m as f64).sin() * 50.0 + m as f64 * 10.0;
            enc.add_data_point(ts, value, "")?;
        }
        enc.end_metric()?;
    }
    Ok(enc.finish()?)
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::init();

    let codec: Arc<dyn mebo_core::Codec> = Arc::new(mebo_codecs::ZstdCodec::default());

    println!("building {BLOB_COUNT} blobs, {METRICS_PER_BLOB} metrics x {POINTS_PER_METRIC} points each...");
    let t0 = Instant::now();
    let blob_bytes: Vec<Vec<u8>> = (0..BLOB_COUNT).map(|i| build_blob(i, codec.clone())).collect::<anyhow::Result<_>>()?;
    let build_elapsed = t0.elapsed();

    let total_bytes: u64 = blob_bytes.iter().map(|b| b.len() as u64).sum();
    println!("  built in {:.3}s, total size {}", build_elapsed.as_secs_f64(), human_bytes(total_bytes));

    let t0 = Instant::now();
    let ts_codec = codec.clone();
    let val_codec = codec;
    let blobs: Vec<NumericBlob> = blob_bytes
        .iter()
        .map(|bytes| NumericDecoder::new(bytes)?.decode(Some(ts_codec.as_ref()), Some(val_codec.as_ref())))
        .collect::<mebo_core::error::Result<_>>()?;
    let decode_elapsed = t0.elapsed();
    println!("  decoded {} blobs in {:.3}s", blobs.len(), decode_elapsed.as_secs_f64());

    let t0 = Instant::now();
    let set = MaterializedNumericBlobSet::from_blobs(&blobs);
    let materialize_elapsed = t0.elapsed();
    println!(
        "  materialized blob set: {} distinct metrics in {:.3}ms",
        set.metric_count(),
        materialize_elapsed.as_secs_f64() * 1000.0
    );

    // metric 1 (id 1, m=0) is present in every blob; metric with id 4 (m=3)
    // is dropped from every odd-indexed blob, so its point count is smaller.
    println!(
        "  metric 1 points (present in all blobs) : {}",
        set.data_point_count(1).unwrap_or(0)
    );
    println!(
        "  metric 4 points (sparse, half the blobs): {}",
        set.data_point_count(4).unwrap_or(0)
    );

    let ids = set.metric_ids();
    let mut rng = 42u64;
    let mut next_index = |bound: u64| -> u64 {
        rng = rng.wrapping_mul(6364136223846793005).wrapping_add(1442695040888963407);
        (rng >> 33) % bound.max(1)
    };
    let picks: Vec<(u64, usize)> = (0..RANDOM_READS)
        .map(|_| {
            let id = ids[next_index(ids.len() as u64) as usize];
            let len = set.data_point_count(id).unwrap_or(1).max(1);
            (id, next_index(len as u64) as usize)
        })
        .collect();

    let t0 = Instant::now();
    let mut per_blob_total = 0.0f64;
    for &(id, i) in &picks {
        // Re-derive which blob owns index `i` for this metric the naive way:
        // scan blobs in order, accumulating counts, same cost a caller would
        // pay without a materialized set.
        let mut remaining = i;
        for blob in &blobs {
            if let Some(len) = blob.len(id) {
                if remaining < len {
                    per_blob_total += blob.value_at(id, remaining).unwrap_or(0.0);
                    break;
                }
                remaining -= len;
            }
        }
    }
    let scan_elapsed = t0.elapsed();
    std::hint::black_box(per_blob_total);

    let t0 = Instant::now();
    for &(id, i) in &picks {
        std::hint::black_box(set.value_at(id, i));
    }
    let materialized_elapsed = t0.elapsed();

    println!();
    println!("=== random access over {RANDOM_READS} (metric, index) picks ===");
    println!(
        "  per-blob scan   : {:.3}ms ({:.1} ns/read)",
        scan_elapsed.as_secs_f64() * 1000.0,
        scan_elapsed.as_nanos() as f64 / RANDOM_READS as f64
    );
    println!(
        "  materialized set: {:.3}ms ({:.1} ns/read)",
        materialized_elapsed.as_secs_f64() * 1000.0,
        materialized_elapsed.as_nanos() as f64 / RANDOM_READS as f64
    );

    Ok(())
}
