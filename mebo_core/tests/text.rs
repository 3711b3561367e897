//! End-to-end scenarios and cross-cutting invariants for the text (string
//! observation) blob family, mirroring `tests/numeric.rs` for the
//! row-oriented codec.

use mebo_core::error::Error;
use mebo_core::format::TsEncoding;
use mebo_core::hash_name;
use mebo_core::text::materialized::MaterializedTextBlobSet;
use mebo_core::text::{TextDecoder, TextEncoder, TextEncoderOptions};

fn encode_simple(opts: TextEncoderOptions, metrics: &[(u64, Vec<i64>, Vec<&str>, Vec<&str>)]) -> Vec<u8> {
    let mut enc = TextEncoder::new(1_700_000_000_000_000, opts).unwrap();
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
fn raw_by_id_roundtrip_with_tag() {
    let opts = TextEncoderOptions {
        has_tag: true,
        ..Default::default()
    };
    let ts = vec![0i64, 1_000_000, 2_000_000];
    let vals = vec!["GET /", "POST /login", "GET /assets/app.js"];
    let tags = vec!["svc=web", "svc=web", "svc=cdn"];
    let bytes = encode_simple(opts, &[(7, ts.clone(), vals.clone(), tags.clone())]);

    let blob = TextDecoder::new(&bytes).unwrap().decode(None).unwrap();
    assert_eq!(blob.metric_count(), 1);
    assert!(blob.has_tag());
    let rows = blob.all(7).unwrap();
    assert_eq!(rows.len(), 3);
    for (i, row) in rows.iter().enumerate() {
        assert_eq!(row.timestamp, ts[i]);
        assert_eq!(row.value, vals[i]);
        assert_eq!(row.tag.as_deref(), Some(tags[i]));
    }
}

#[test]
fn delta_ts_by_name_no_tag() {
    let opts = TextEncoderOptions {
        ts_encoding: TsEncoding::Delta,
        ..Default::default()
    };
    let mut enc = TextEncoder::new(0, opts).unwrap();
    enc.start_metric_name("log.error", 4).unwrap();
    let ts = [0i64, 5, 11, 18];
    let vals = ["boom", "boom", "timeout", "timeout"];
    for i in 0..4 {
        enc.add_data_point(ts[i], vals[i], "").unwrap();
    }
    enc.end_metric().unwrap();
    let bytes = enc.finish().unwrap();

    let blob = TextDecoder::new(&bytes).unwrap().decode(None).unwrap();
    assert!(blob.has_metric_name("log.error"));
    assert!(!blob.has_metric_names());
    let rows = blob.all_by_name("log.error").unwrap();
    let decoded_ts: Vec<i64> = rows.iter().map(|r| r.timestamp).collect();
    let decoded_vals: Vec<String> = rows.iter().map(|r| r.value.clone()).collect();
    assert_eq!(decoded_ts, ts.to_vec());
    assert_eq!(decoded_vals, vals.iter().map(|s| s.to_string()).collect::<Vec<_>>());
    assert!(rows.iter().all(|r| r.tag.is_none()));
}

#[test]
fn hash_collision_forces_names_payload() {
    let mut enc = TextEncoder::new(0, TextEncoderOptions::default()).unwrap();
    let name_a = "metric-a";
    let id_a = hash_name(name_a);

    let mut name_b = None;
    for i in 0..200_000u64 {
        let candidate = format!("probe-{i}");
        if candidate != name_a && hash_name(&candidate) == id_a {
            name_b = Some(candidate);
            break;
        }
    }

    enc.start_metric_name(name_a, 1).unwrap();
    enc.add_data_point(0, "a", "").unwrap();
    enc.end_metric().unwrap();

    if let Some(name_b) = name_b {
        enc.start_metric_name(&name_b, 1).unwrap();
        enc.add_data_point(0, "b", "").unwrap();
        enc.end_metric().unwrap();

        let bytes = enc.finish().unwrap();
        let blob = TextDecoder::new(&bytes).unwrap().decode(None).unwrap();
        assert!(blob.has_metric_names());
        assert!(blob.has_metric_name(name_a));
        assert!(blob.has_metric_name(&name_b));
        assert_eq!(blob.metric_names().len(), 2);
    } else {
        let bytes = enc.finish().unwrap();
        let blob = TextDecoder::new(&bytes).unwrap().decode(None).unwrap();
        assert!(!blob.has_metric_names());
    }
}

#[test]
fn random_access_matches_sequential_over_500_rows() {
    let opts = TextEncoderOptions {
        ts_encoding: TsEncoding::Delta,
        has_tag: true,
        ..Default::default()
    };
    let mut enc = TextEncoder::new(0, opts).unwrap();
    let n = 500;
    enc.start_metric_id(1, n).unwrap();
    let mut ts_vals = Vec::with_capacity(n);
    let mut strings = Vec::with_capacity(n);
    let mut ts = 0i64;
    for i in 0..n {
        ts += 100 + (i as i64 % 5) * 7;
        let s = format!("event-{i}");
        ts_vals.push(ts);
        strings.push(s);
    }
    for i in 0..n {
        enc.add_data_point(ts_vals[i], &strings[i], "t").unwrap();
    }
    enc.end_metric().unwrap();
    let bytes = enc.finish().unwrap();

    let blob = TextDecoder::new(&bytes).unwrap().decode(None).unwrap();
    let all = blob.all(1).unwrap();
    assert_eq!(all.len(), n);
    for i in (0..n).step_by(23) {
        let row = blob.at(1, i).unwrap();
        assert_eq!(row.timestamp, ts_vals[i]);
        assert_eq!(row.value, strings[i]);
        assert_eq!(row, all[i]);
    }
}

#[test]
fn sparse_blob_set_materialization() {
    let opts = TextEncoderOptions::default();
    let bytes_a = encode_simple(
        opts.clone(),
        &[(1, vec![0, 1], vec!["a0", "a1"], vec![]), (2, vec![0, 1, 2], vec!["b0", "b1", "b2"], vec![])],
    );
    let bytes_b = encode_simple(opts, &[(2, vec![3, 4], vec!["b3", "b4"], vec![])]);

    let blob_a = TextDecoder::new(&bytes_a).unwrap().decode(None).unwrap();
    let blob_b = TextDecoder::new(&bytes_b).unwrap().decode(None).unwrap();

    let set = MaterializedTextBlobSet::from_blobs(&[blob_a, blob_b]);
    assert_eq!(set.data_point_count(1), Some(2));
    assert_eq!(set.data_point_count(2), Some(5));
    assert_eq!(set.at(2, 0).unwrap().value, "b0");
    assert_eq!(set.at(2, 4).unwrap().value, "b4");
}

#[test]
fn empty_tags_auto_disable_has_tag() {
    let opts = TextEncoderOptions {
        has_tag: true,
        ..Default::default()
    };
    let bytes = encode_simple(opts, &[(1, vec![0, 1], vec!["a", "b"], vec![])]);
    let blob = TextDecoder::new(&bytes).unwrap().decode(None).unwrap();
    assert!(!blob.has_tag(), "all-empty tags should auto-disable HasTag");
}

#[test]
fn big_endian_does_not_change_decoded_values() {
    let ts = vec![0i64, 1_000_000];
    let vals = vec!["alpha", "beta"];
    let le = encode_simple(TextEncoderOptions::default(), &[(9, ts.clone(), vals.clone(), vec![])]);
    let be_opts = TextEncoderOptions {
        big_endian: true,
        ..Default::default()
    };
    let be = encode_simple(be_opts, &[(9, ts.clone(), vals.clone(), vec![])]);

    let blob_le = TextDecoder::new(&le).unwrap().decode(None).unwrap();
    let blob_be = TextDecoder::new(&be).unwrap().decode(None).unwrap();
    let rows_le = blob_le.all(9).unwrap();
    let rows_be = blob_be.all(9).unwrap();
    assert_eq!(rows_le.len(), rows_be.len());
    for (a, b) in rows_le.iter().zip(rows_be.iter()) {
        assert_eq!(a.timestamp, b.timestamp);
        assert_eq!(a.value, b.value);
    }
}

#[test]
fn name_id_fallback_without_collision() {
    let mut enc = TextEncoder::new(0, TextEncoderOptions::default()).unwrap();
    enc.start_metric_name("audit.trail", 1).unwrap();
    enc.add_data_point(0, "start", "").unwrap();
    enc.end_metric().unwrap();
    let bytes = enc.finish().unwrap();

    let blob = TextDecoder::new(&bytes).unwrap().decode(None).unwrap();
    assert!(!blob.has_metric_names());
    assert_eq!(blob.all_by_name("audit.trail").unwrap()[0].value, "start");
    assert_eq!(blob.at(hash_name("audit.trail"), 0).unwrap().value, "start");
}

#[test]
fn oversized_field_rejected_at_encode_time() {
    let mut enc = TextEncoder::new(0, TextEncoderOptions::default()).unwrap();
    enc.start_metric_id(1, 1).unwrap();
    let huge = "x".repeat(300);
    let err = enc.add_data_point(0, &huge, "").unwrap_err();
    assert!(matches!(err, Error::ValueOrTagTooLong { .. }));
}

#[test]
fn mismatched_point_counts_rejected() {
    let mut enc = TextEncoder::new(0, TextEncoderOptions::default()).unwrap();
    let err = enc.add_data_points(&[0, 1], &["a"], &[]).unwrap_err();
    assert!(matches!(err, Error::DataPointCountMismatch { .. }));
}

#[test]
fn row_range_exceeding_payload_is_rejected() {
    let bytes = encode_simple(TextEncoderOptions::default(), &[(1, vec![0], vec!["a"], vec![])]);
    // Truncate the data payload so the index entry's offset+size run past
    // the end of what's actually there.
    let mut corrupt = bytes.clone();
    corrupt.truncate(corrupt.len() - 1);
    assert!(TextDecoder::new(&corrupt).unwrap().decode(None).is_err());
}
