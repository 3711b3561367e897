use thiserror::Error;

/// Which payload section an offset error refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Payload {
    Timestamp,
    Value,
    Tag,
    Data,
}

impl std::fmt::Display for Payload {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Payload::Timestamp => "timestamp",
            Payload::Value => "value",
            Payload::Tag => "tag",
            Payload::Data => "data",
        };
        f.write_str(s)
    }
}

/// The single error type for all `mebo_core` fallible operations.
///
/// Variant names track the named error kinds in the format's contract
/// (encoder/decoder), not Rust-ism concerns — callers match on these to
/// decide whether a failure is recoverable (e.g. retry with a fresh metric)
/// or fatal (malformed input).
#[derive(Debug, Error)]
pub enum Error {
    // ── format errors (decode) ──────────────────────────────────────────
    #[error("invalid header size: expected {expected} bytes, got {actual}")]
    InvalidHeaderSize { expected: usize, actual: usize },

    #[error("invalid header: {0}")]
    InvalidHeader(String),

    #[error("invalid {which} payload offset {offset}: exceeds blob length {len}")]
    InvalidPayloadOffset {
        which: Payload,
        offset: u64,
        len: usize,
    },

    #[error("invalid index entry size: blob has {remaining} bytes but {needed} are required for {count} entries")]
    InvalidIndexEntrySize {
        remaining: usize,
        needed: usize,
        count: usize,
    },

    #[error("invalid index offsets: {0}")]
    InvalidIndexOffsets(String),

    #[error("invalid metric names count: header declares {expected} metrics but {actual} names were decoded")]
    InvalidMetricNamesCount { expected: usize, actual: usize },

    #[error("decompression failed for codec {codec}: {message}")]
    DecompressionFailed { codec: u16, message: String },

    #[error("metric name verification failed: name at index {index} hashes to {computed:#x} but index entry has id {expected:#x}")]
    MetricNameVerificationFailed {
        index: usize,
        computed: u64,
        expected: u64,
    },

    // ── contract errors (encode) ────────────────────────────────────────
    #[error("a metric is already in progress; call end_metric() first")]
    MetricAlreadyStarted,

    #[error("no metric is in progress; call start_metric_id()/start_metric_name() first")]
    NoMetricStarted,

    #[error("a metric is in progress; call end_metric() before finish()")]
    MetricNotEnded,

    #[error("no metrics were added before finish()")]
    NoMetricsAdded,

    #[error("end_metric() called but no data points were added")]
    NoDataPointsAdded,

    #[error("too many data points written for this metric: limit is {limit}")]
    TooManyDataPoints { limit: usize },

    #[error("data point count mismatch: expected {expected}, got {actual}")]
    DataPointCountMismatch { expected: usize, actual: usize },

    #[error("invalid metric id: {0}")]
    InvalidMetricId(String),

    #[error("invalid metric name: {0}")]
    InvalidMetricName(String),

    #[error("invalid number of data points: {n} (must be 1..=65535)")]
    InvalidNumOfDataPoints { n: usize },

    #[error("metric count exceeded: limit is {limit}")]
    MetricCountExceeded { limit: usize },

    #[error("offset out of range for {which} column: delta {delta} exceeds 65535 bytes")]
    OffsetOutOfRange { which: Payload, delta: u64 },

    #[error("identifier mode mismatch: encoder is latched to {latched}, cannot use {attempted}")]
    MixedIdentifierMode {
        latched: &'static str,
        attempted: &'static str,
    },

    #[error("hash collision: id {id:#x} was already used by a different metric in id mode")]
    HashCollision { id: u64 },

    #[error("duplicate metric: name {name:?} was already started in this encoder")]
    DuplicateMetric { name: String },

    #[error("unsupported encoding: {0}")]
    UnsupportedEncoding(String),

    #[error("invalid encoder configuration: {0}")]
    InvalidConfig(String),

    #[error("value or tag too long: {field} is {len} bytes, limit is {limit}")]
    ValueOrTagTooLong {
        field: &'static str,
        len: usize,
        limit: usize,
    },

    // ── codec errors (external) ─────────────────────────────────────────
    #[error("codec error: {0}")]
    Codec(String),
}

pub type Result<T> = std::result::Result<T, Error>;
