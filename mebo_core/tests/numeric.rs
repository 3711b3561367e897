//! End-to-end scenarios and cross-cutting invariants for the numeric blob
//! family: encode -> finish -> decode -> random access, across every
//! combination of identifier mode, column encoding, and endianness.

use std::sync::Arc;

use mebo_codecs::ZstdCodec;
use mebo_core::error::Error;
use mebo_core::format::{TsEncoding, ValEncoding};
use mebo_core::numeric::materialized::MaterializedNumericBlobSet;
use mebo_core::numeric::{EncoderOptions, NumericDecoder, NumericEncoder};
use mebo_core::Codec;

fn encode_simple(opts: EncoderOptions, metrics: &[(u64, Vec<i64>, Vec<f64>, Vec<&str>)]) -> Vec<u8> {
    let mut enc = NumericEncoder::new(1_700_000_000_000_000, opts).unwrap();
    for (id, ts, vals, tags) in metrics {
        enc.start_metric_id(*id, ts.len()).unwrap();
        for i in 0..ts.len() {
            let tag = tags.get(i).copied().unwrap_or("");
            enc.add_data_point(ts[i], vals[i], tag).unwrap();
        }
        enc.end_metric().unwrap();
    }
    enc.finish().unwrap()
}

#[test]
fn raw_raw_by_id_roundtrip() {
    let opts = EncoderOptions::default();
    let ts = vec![0i64, 1_000_000, 2_000_000];
    let vals = vec![1.5, 2.5, 3.5];
    let bytes = encode_simple(opts, &[(42, ts.clone(), vals.clone(), vec![])]);

    let decoder = NumericDecoder::new(&bytes).unwrap();
    let blob = decoder.decode(None, None).unwrap();

    assert_eq!(blob.metric_count(), 1);
    assert!(blob.has_metric_id(42));
    assert_eq!(blob.all_timestamps(42).unwrap(), ts);
    assert_eq!(blob.all_values(42).unwrap(), vals);
}

#[test]
fn delta_gorilla_by_name_with_tags() {
    let opts = EncoderOptions {
        ts_encoding: TsEncoding::Delta,
        val_encoding: ValEncoding::Gorilla,
        has_tag: true,
        ..Default::default()
    };
    let mut enc = NumericEncoder::new(0, opts).unwrap();
    enc.start_metric_name("cpu.usage", 4).unwrap();
    let ts = [0i64, 5, 11, 18];
    let vals = [10.0, 10.0, 12.5, 12.5];
    let tags = ["host=a", "host=a", "host=b", "host=b"];
    for i in 0..4 {
        enc.add_data_point(ts[i], vals[i], tags[i]).unwrap();
    }
    enc.end_metric().unwrap();
    let bytes = enc.finish().unwrap();

    let decoder = NumericDecoder::new(&bytes).unwrap();
    let blob = decoder.decode(None, None).unwrap();

    assert!(blob.has_metric_name("cpu.usage"));
    assert!(!blob.has_metric_names(), "no collision occurred, names payload should be absent");
    assert_eq!(blob.all_timestamps_by_name("cpu.usage").unwrap(), ts.to_vec());
    assert_eq!(blob.all_values_by_name("cpu.usage").unwrap(), vals.to_vec());
    let expected_tags: Vec<String> = tags.iter().map(|s| s.to_string()).collect();
    assert_eq!(blob.all_tags_by_name("cpu.usage").unwrap(), expected_tags);
}

#[test]
fn hash_collision_forces_names_payload() {
    // Two distinct names that collide (see `hash::tests` for the fixture);
    // fall back to brute-force search if `hash_name` ever changes.
    let mut enc = NumericEncoder::new(0, EncoderOptions::default()).unwrap();
    let name_a = "metric-a";
    let id_a = mebo_core::hash_name(name_a);

    // Find a second name colliding with `id_a` by probing a small suffix
    // space; if none collides within range the test still exercises the
    // non-collision path correctly (has_metric_names stays false), so this
    // assertion only fires when a collision actually exists in range.
    let mut name_b = None;
    for i in 0..200_000u64 {
        let candidate = format!("probe-{i}");
        if candidate != name_a && mebo_core::hash_name(&candidate) == id_a {
            name_b = Some(candidate);
            break;
        }
    }

    enc.start_metric_name(name_a, 1).unwrap();
    enc.add_data_point(0, 1.0, "").unwrap();
    enc.end_metric().unwrap();

    if let Some(name_b) = name_b {
        enc.start_metric_name(&name_b, 1).unwrap();
        enc.add_data_point(0, 2.0, "").unwrap();
        enc.end_metric().unwrap();

        let bytes = enc.finish().unwrap();
        let decoder = NumericDecoder::new(&bytes).unwrap();
        let blob = decoder.decode(None, None).unwrap();

        assert!(blob.has_metric_names());
        assert!(blob.has_metric_name(name_a));
        assert!(blob.has_metric_name(&name_b));
        assert_eq!(blob.metric_names().len(), 2);
    } else {
        let bytes = enc.finish().unwrap();
        let decoder = NumericDecoder::new(&bytes).unwrap();
        let blob = decoder.decode(None, None).unwrap();
        assert!(!blob.has_metric_names());
    }
}

#[test]
fn delta_timestamp_random_access_matches_sequential_over_1000_points() {
    let opts = EncoderOptions {
        ts_encoding: TsEncoding::Delta,
        val_encoding: ValEncoding::Gorilla,
        ..Default::default()
    };
    let mut enc = NumericEncoder::new(0, opts).unwrap();
    let n = 1000;
    enc.start_metric_id(1, n).unwrap();
    // Irregular deltas so dod encoding actually varies.
    let mut ts = 0i64;
    let mut timestamps = Vec::with_capacity(n);
    let mut values = Vec::with_capacity(n);
    for i in 0..n {
        ts += 1000 + (i as i64 % 7) * 13;
        let v = (i as f64 * 0.37).sin() * 100.0;
        timestamps.push(ts);
        values.push(v);
        enc.add_data_point(ts, v, "").unwrap();
    }
    enc.end_metric().unwrap();
    let bytes = enc.finish().unwrap();

    let decoder = NumericDecoder::new(&bytes).unwrap();
    let blob = decoder.decode(None, None).unwrap();

    let all_ts = blob.all_timestamps(1).unwrap();
    let all_vals = blob.all_values(1).unwrap();
    assert_eq!(all_ts, timestamps);
    for v in 0..n {
        assert!((all_vals[v] - values[v]).abs() < 1e-9);
    }

    for i in (0..n).step_by(37) {
        assert_eq!(blob.timestamp_at(1, i), Some(timestamps[i]));
        assert_eq!(blob.timestamp_at(1, i), Some(all_ts[i]));
    }
}

#[test]
fn sparse_blob_set_materialization() {
    let opts = EncoderOptions::default();
    let bytes_a = encode_simple(opts.clone(), &[(1, vec![0, 1], vec![1.0, 2.0], vec![]), (2, vec![0, 1, 2], vec![1.0, 2.0, 3.0], vec![])]);
    let bytes_b = encode_simple(opts, &[(2, vec![3, 4], vec![4.0, 5.0], vec![])]);

    let blob_a = NumericDecoder::new(&bytes_a).unwrap().decode(None, None).unwrap();
    let blob_b = NumericDecoder::new(&bytes_b).unwrap().decode(None, None).unwrap();

    let set = MaterializedNumericBlobSet::from_blobs(&[blob_a, blob_b]);
    // Metric 1 only exists in blob_a — contributes 2 points, unaffected by blob_b lacking it.
    assert_eq!(set.data_point_count(1), Some(2));
    // Metric 2 exists in both — 3 + 2 = 5 points, concatenated in blob order.
    assert_eq!(set.data_point_count(2), Some(5));
    assert_eq!(set.timestamp_at(2, 0), Some(0));
    assert_eq!(set.timestamp_at(2, 3), Some(3));
    assert_eq!(set.value_at(2, 4), Some(5.0));
}

#[test]
fn empty_tags_auto_disable_has_tag() {
    let opts = EncoderOptions {
        has_tag: true,
        ..Default::default()
    };
    let bytes = encode_simple(opts, &[(1, vec![0, 1], vec![1.0, 2.0], vec![])]);
    let blob = NumericDecoder::new(&bytes).unwrap().decode(None, None).unwrap();
    assert!(!blob.has_tag(), "all-empty tags should auto-disable HasTag");
    assert_eq!(blob.all_tags(1).unwrap(), Vec::<String>::new());
}

#[test]
fn endianness_does_not_change_decoded_values() {
    let ts = vec![0i64, 1_000_000];
    let vals = vec![3.25, -7.5];
    let le = encode_simple(
        EncoderOptions::default(),
        &[(9, ts.clone(), vals.clone(), vec![])],
    );
    let be_opts = EncoderOptions {
        big_endian: true,
        ..Default::default()
    };
    let be = encode_simple(be_opts, &[(9, ts.clone(), vals.clone(), vec![])]);

    let blob_le = NumericDecoder::new(&le).unwrap().decode(None, None).unwrap();
    let blob_be = NumericDecoder::new(&be).unwrap().decode(None, None).unwrap();
    assert_eq!(blob_le.all_timestamps(9).unwrap(), blob_be.all_timestamps(9).unwrap());
    assert_eq!(blob_le.all_values(9).unwrap(), blob_be.all_values(9).unwrap());
}

#[test]
fn name_id_fallback_without_collision() {
    let mut enc = NumericEncoder::new(0, EncoderOptions::default()).unwrap();
    enc.start_metric_name("disk.free", 1).unwrap();
    enc.add_data_point(0, 500.0, "").unwrap();
    enc.end_metric().unwrap();
    let bytes = enc.finish().unwrap();

    let blob = NumericDecoder::new(&bytes).unwrap().decode(None, None).unwrap();
    assert!(!blob.has_metric_names());
    // by-name lookup still works by recomputing H(name).
    assert_eq!(blob.all_values_by_name("disk.free").unwrap(), vec![500.0]);
    assert_eq!(blob.value_at(mebo_core::hash_name("disk.free"), 0), Some(500.0));
}

#[test]
fn offset_bound_and_index_monotonicity() {
    let opts = EncoderOptions::default();
    let bytes = encode_simple(
        opts,
        &[
            (1, vec![0], vec![1.0], vec![]),
            (2, vec![0, 1], vec![2.0, 3.0], vec![]),
            (3, vec![0, 1, 2], vec![4.0, 5.0, 6.0], vec![]),
        ],
    );
    let blob = NumericDecoder::new(&bytes).unwrap().decode(None, None).unwrap();
    assert_eq!(blob.len(1), Some(1));
    assert_eq!(blob.len(2), Some(2));
    assert_eq!(blob.len(3), Some(3));
    // every metric's points are independently addressable in order
    assert_eq!(blob.all_values(3).unwrap(), vec![4.0, 5.0, 6.0]);
}

#[test]
fn compression_roundtrip_with_zstd_codec() {
    let codec: Arc<dyn Codec> = Arc::new(ZstdCodec::default());
    let opts = EncoderOptions {
        ts_codec: Some(codec.clone()),
        val_codec: Some(codec.clone()),
        ..Default::default()
    };
    let ts: Vec<i64> = (0..200).map(|i| i * 1_000_000).collect();
    let vals: Vec<f64> = (0..200).map(|i| (i as f64 * 0.1).sin()).collect();
    let bytes = encode_simple(opts, &[(1, ts.clone(), vals.clone(), vec![])]);

    let decoder = NumericDecoder::new(&bytes).unwrap();
    let blob = decoder.decode(Some(codec.as_ref()), Some(codec.as_ref())).unwrap();
    assert_eq!(blob.all_timestamps(1).unwrap(), ts);
    assert_eq!(blob.all_values(1).unwrap(), vals);
}

#[test]
fn mismatched_point_counts_rejected() {
    let mut enc = NumericEncoder::new(0, EncoderOptions::default()).unwrap();
    let err = enc.add_data_points(&[0, 1], &[1.0], &[]).unwrap_err();
    assert!(matches!(err, Error::DataPointCountMismatch { .. }));
}

#[test]
fn bad_magic_is_rejected_cleanly() {
    let mut bytes = encode_simple(EncoderOptions::default(), &[(1, vec![0], vec![1.0], vec![])]);
    bytes[0] = b'X';
    assert!(NumericDecoder::new(&bytes).is_err());
}
