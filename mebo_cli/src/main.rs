use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use anyhow::Context;
use clap::{Parser, Subcommand};

use mebo_codecs::codec_by_id;
use mebo_core::format::{TsEncoding, ValEncoding};
use mebo_core::numeric::{EncoderOptions, NumericDecoder, NumericEncoder};
use mebo_core::text::{TextDecoder, TextEncoder, TextEncoderOptions};
use mebo_core::Codec;

// ── CLI definition ─────────────────────────────────────────────────────────

#[derive(Parser)]
#[command(
    name = "mebo",
    about = "Mebo time-series blob codec — encode, inspect, and randomly access numeric/text blobs",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate a synthetic multi-metric numeric blob
    EncodeNumeric {
        /// Destination blob file
        output: PathBuf,
        /// Number of metrics to generate
        #[arg(long, default_value_t = 8)]
        metrics: u64,
        /// Data points per metric
        #[arg(long, default_value_t = 1000)]
        points: usize,
        /// Timestamp encoding: raw | delta
        #[arg(long, default_value = "delta")]
        ts_encoding: String,
        /// Value encoding: raw | gorilla
        #[arg(long, default_value = "gorilla")]
        val_encoding: String,
        /// Payload codec: passthrough | zstd | lz4
        #[arg(long, default_value = "zstd")]
        codec: String,
    },
    /// Print header metadata and per-metric index for a numeric blob
    InspectNumeric {
        file: PathBuf,
        /// Print the full per-metric index table
        #[arg(long)]
        index: bool,
    },
    /// Decode a numeric blob and print one metric's data points
    DecodeNumeric {
        file: PathBuf,
        /// Metric id to print
        #[arg(long)]
        id: u64,
        /// Limit how many points to print (0 = all)
        #[arg(long, default_value_t = 20)]
        limit: usize,
    },
    /// Materialize a numeric blob and compare sequential vs. random access timing
    BenchNumeric {
        file: PathBuf,
        /// Number of random (metric, point-index) reads to perform
        #[arg(long, default_value_t = 10_000)]
        reads: u64,
        /// Fixed random seed for reproducibility
        #[arg(long, default_value_t = 42)]
        seed: u64,
    },
    /// Generate a synthetic multi-metric text (log line) blob
    EncodeText {
        output: PathBuf,
        #[arg(long, default_value_t = 8)]
        metrics: u64,
        #[arg(long, default_value_t = 500)]
        points: usize,
        #[arg(long, default_value = "delta")]
        ts_encoding: String,
        #[arg(long, default_value = "zstd")]
        codec: String,
    },
    /// Decode a text blob and print one metric's rows
    DecodeText {
        file: PathBuf,
        #[arg(long)]
        id: u64,
        #[arg(long, default_value_t = 20)]
        limit: usize,
    },
}

// ── Helpers ────────────────────────────────────────────────────────────────

fn ts_encoding_from_name(name: &str) -> anyhow::Result<TsEncoding> {
    match name {
        "raw" => Ok(TsEncoding::Raw),
        "delta" => Ok(TsEncoding::Delta),
        other => anyhow::bail!("unknown timestamp encoding '{other}'. Valid options: raw, delta"),
    }
}

fn val_encoding_from_name(name: &str) -> anyhow::Result<ValEncoding> {
    match name {
        "raw" => Ok(ValEncoding::Raw),
        "gorilla" => Ok(ValEncoding::Gorilla),
        other => anyhow::bail!("unknown value encoding '{other}'. Valid options: raw, gorilla"),
    }
}

fn codec_from_name(name: &str) -> anyhow::Result<Arc<dyn Codec>> {
    match name {
        "passthrough" | "pass" | "none" => Ok(Arc::new(mebo_codecs::PassThroughCodec)),
        "zstd" | "z" => Ok(Arc::new(mebo_codecs::ZstdCodec::default())),
        "lz4" | "l" => Ok(Arc::new(mebo_codecs::Lz4Codec)),
        other => anyhow::bail!("unknown codec '{other}'. Valid options: passthrough, zstd, lz4"),
    }
}

fn human_bytes(n: u64) -> String {
    const UNITS: &[&str] = &["B", "KB", "MB", "GB", "TB"];
    let mut v = n as f64;
    let mut unit = 0;
    while v >= 1024.0 && unit < UNITS.len() - 1 {
        v /= 1024.0;
        unit += 1;
    }
    if unit == 0 {
        format!("{n} B")
    } else {
        format!("{v:.2} {}", UNITS[unit])
    }
}

/// Deterministic synthetic waveform so repeated CLI runs are reproducible:
/// a slow sine plus a per-metric offset, sampled once per second.
fn synthetic_value(metric_idx: u64, point_idx: usize) -> f64 {
    let phase = (point_idx as f64) * 0.05 + (metric_idx as f64);
    phase.sin() * 100.0 + metric_idx as f64 * 1000.0
}

// ── Subcommand implementations ─────────────────────────────────────────────

fn run_encode_numeric(
    output: PathBuf,
    metrics: u64,
    points: usize,
    ts_encoding: &str,
    val_encoding: &str,
    codec_name: &str,
) -> anyhow::Result<()> {
    let ts_encoding = ts_encoding_from_name(ts_encoding)?;
    let val_encoding = val_encoding_from_name(val_encoding)?;
    let codec = codec_from_name(codec_name)?;

    let opts = EncoderOptions {
        ts_encoding,
        val_encoding,
        has_tag: false,
        big_endian: false,
        ts_codec: Some(codec.clone()),
        val_codec: Some(codec.clone()),
    };

    let t0 = Instant::now();
    let mut enc = NumericEncoder::new(0, opts)?;
    for m in 0..metrics {
        enc.start_metric_id(m + 1, points)?;
        for p in 0..points {
            enc.add_data_point((p as i64) * 1_000_000, synthetic_value(m, p), "")?;
        }
        enc.end_metric()?;
    }
    let bytes = enc.finish()?;
    let elapsed = t0.elapsed();

    std::fs::write(&output, &bytes).with_context(|| format!("writing output file {output:?}"))?;

    eprintln!("  metrics     : {metrics}");
    eprintln!("  points each : {points}");
    eprintln!("  codec       : {}", codec.name());
    eprintln!("  blob size   : {}", human_bytes(bytes.len() as u64));
    eprintln!("  elapsed     : {:.3}s", elapsed.as_secs_f64());
    Ok(())
}

fn run_inspect_numeric(file: PathBuf, show_index: bool) -> anyhow::Result<()> {
    let bytes = std::fs::read(&file).with_context(|| format!("reading {file:?}"))?;
    let decoder = NumericDecoder::new(&bytes)?;
    let header = decoder.header();

    println!("=== numeric blob: {file:?} ===");
    println!();
    println!("  metric count    : {}", header.metric_count);
    println!("  start_time_us   : {}", header.start_time_us);
    println!("  ts encoding     : {:?}", header.flags.ts_encoding()?);
    println!("  val encoding    : {:?}", header.flags.val_encoding()?);
    println!("  has_tag         : {}", header.flags.has_tag());
    println!("  has_metric_names: {}", header.flags.has_metric_names());
    println!("  big_endian      : {}", header.flags.big_endian());
    println!("  ts codec id     : {}", header.flags.ts_codec());
    println!("  val codec id    : {}", header.flags.val_codec());
    println!("  file size       : {}", human_bytes(bytes.len() as u64));

    if show_index {
        let ts_codec = codec_by_id(header.flags.ts_codec())?;
        let val_codec = codec_by_id(header.flags.val_codec())?;
        let blob = decoder.decode(Some(ts_codec.as_ref()), Some(val_codec.as_ref()))?;
        println!();
        println!("  {:>10}  {:>8}", "metric id", "count");
        println!("  {}", "-".repeat(22));
        for id in blob.metric_ids() {
            println!("  {id:>10}  {:>8}", blob.len(id).unwrap_or(0));
        }
    }

    Ok(())
}

fn run_decode_numeric(file: PathBuf, id: u64, limit: usize) -> anyhow::Result<()> {
    let bytes = std::fs::read(&file).with_context(|| format!("reading {file:?}"))?;
    let decoder = NumericDecoder::new(&bytes)?;
    let header = decoder.header();
    let ts_codec = codec_by_id(header.flags.ts_codec())?;
    let val_codec = codec_by_id(header.flags.val_codec())?;
    let blob = decoder.decode(Some(ts_codec.as_ref()), Some(val_codec.as_ref()))?;

    let points = blob.all(id).ok_or_else(|| anyhow::anyhow!("metric id {id} not found in blob"))?;
    let shown = if limit == 0 { points.len() } else { points.len().min(limit) };

    println!("metric {id}: {} points", points.len());
    for p in &points[..shown] {
        println!("  {:>14}  {:>12.4}", p.timestamp, p.value);
    }
    if shown < points.len() {
        println!("  ... ({} more not shown)", points.len() - shown);
    }
    Ok(())
}

fn run_bench_numeric(file: PathBuf, reads: u64, seed: u64) -> anyhow::Result<()> {
    let bytes = std::fs::read(&file).with_context(|| format!("reading {file:?}"))?;
    let decoder = NumericDecoder::new(&bytes)?;
    let header = decoder.header();
    let ts_codec = codec_by_id(header.flags.ts_codec())?;
    let val_codec = codec_by_id(header.flags.val_codec())?;
    let blob = decoder.decode(Some(ts_codec.as_ref()), Some(val_codec.as_ref()))?;

    let ids = blob.metric_ids();
    if ids.is_empty() {
        anyhow::bail!("blob has no metrics");
    }

    let t0 = Instant::now();
    let materialized = blob.materialize();
    let materialize_elapsed = t0.elapsed();

    // Simple LCG for reproducible indices (no external dependency).
    let mut rng = seed;
    let mut next_index = |bound: u64| -> u64 {
        rng = rng.wrapping_mul(6364136223846793005).wrapping_add(1442695040888963407);
        (rng >> 33) % bound.max(1)
    };

    let picks: Vec<(u64, usize)> = (0..reads)
        .map(|_| {
            let id = ids[next_index(ids.len() as u64) as usize];
            let len = blob.len(id).unwrap_or(1).max(1);
            let i = next_index(len as u64) as usize;
            (id, i)
        })
        .collect();

    let t0 = Instant::now();
    for &(id, i) in &picks {
        std::hint::black_box(blob.value_at(id, i));
    }
    let sequential_elapsed = t0.elapsed();

    let t0 = Instant::now();
    for &(id, i) in &picks {
        std::hint::black_box(materialized.value_at(id, i));
    }
    let materialized_elapsed = t0.elapsed();

    println!("=== Random Access Benchmark ===");
    println!("  metrics            : {}", ids.len());
    println!("  reads              : {reads}");
    println!("  materialize()      : {:.3}ms", materialize_elapsed.as_secs_f64() * 1000.0);
    println!(
        "  direct blob reads  : {:.3}ms ({:.1} ns/read)",
        sequential_elapsed.as_secs_f64() * 1000.0,
        sequential_elapsed.as_nanos() as f64 / reads as f64
    );
    println!(
        "  materialized reads : {:.3}ms ({:.1} ns/read)",
        materialized_elapsed.as_secs_f64() * 1000.0,
        materialized_elapsed.as_nanos() as f64 / reads as f64
    );
    Ok(())
}

fn run_encode_text(output: PathBuf, metrics: u64, points: usize, ts_encoding: &str, codec_name: &str) -> anyhow::Result<()> {
    let ts_encoding = ts_encoding_from_name(ts_encoding)?;
    let codec = codec_from_name(codec_name)?;

    let opts = TextEncoderOptions {
        ts_encoding,
        has_tag: true,
        big_endian: false,
        codec: Some(codec.clone()),
    };

    let t0 = Instant::now();
    let mut enc = TextEncoder::new(0, opts)?;
    for m in 0..metrics {
        enc.start_metric_id(m + 1, points)?;
        for p in 0..points {
            let line = format!("level=info metric={m} seq={p} msg=\"synthetic log line\"");
            enc.add_data_point((p as i64) * 1_000_000, &line, "host=synthetic")?;
        }
        enc.end_metric()?;
    }
    let bytes = enc.finish()?;
    let elapsed = t0.elapsed();

    std::fs::write(&output, &bytes).with_context(|| format!("writing output file {output:?}"))?;

    eprintln!("  metrics     : {metrics}");
    eprintln!("  points each : {points}");
    eprintln!("  codec       : {}", codec.name());
    eprintln!("  blob size   : {}", human_bytes(bytes.len() as u64));
    eprintln!("  elapsed     : {:.3}s", elapsed.as_secs_f64());
    Ok(())
}

fn run_decode_text(file: PathBuf, id: u64, limit: usize) -> anyhow::Result<()> {
    let bytes = std::fs::read(&file).with_context(|| format!("reading {file:?}"))?;
    let decoder = TextDecoder::new(&bytes)?;
    let header = decoder.header();
    let codec = codec_by_id(header.flags.val_codec())?;
    let blob = decoder.decode(Some(codec.as_ref()))?;

    let rows = blob.all(id).ok_or_else(|| anyhow::anyhow!("metric id {id} not found in blob"))?;
    let shown = if limit == 0 { rows.len() } else { rows.len().min(limit) };

    println!("metric {id}: {} rows", rows.len());
    for r in &rows[..shown] {
        match &r.tag {
            Some(tag) => println!("  {:>14}  {}  [{}]", r.timestamp, r.value, tag),
            None => println!("  {:>14}  {}", r.timestamp, r.value),
        }
    }
    if shown < rows.len() {
        println!("  ... ({} more not shown)", rows.len() - shown);
    }
    Ok(())
}

// ── Entry point ────────────────────────────────────────────────────────────

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::init();
    let cli = Cli::parse();
    match cli.command {
        Commands::EncodeNumeric {
            output,
            metrics,
            points,
            ts_encoding,
            val_encoding,
            codec,
        } => run_encode_numeric(output, metrics, points, &ts_encoding, &val_encoding, &codec),
        Commands::InspectNumeric { file, index } => run_inspect_numeric(file, index),
        Commands::DecodeNumeric { file, id, limit } => run_decode_numeric(file, id, limit),
        Commands::BenchNumeric { file, reads, seed } => run_bench_numeric(file, reads, seed),
        Commands::EncodeText {
            output,
            metrics,
            points,
            ts_encoding,
            codec,
        } => run_encode_text(output, metrics, points, &ts_encoding, &codec),
        Commands::DecodeText { file, id, limit } => run_decode_text(file, id, limit),
    }
}
