use std::path::PathBuf;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, HistoryError>;

#[derive(Error, Debug)]
pub enum HistoryError {
    #[error("no history files found: {0} does not exist")]
    EmptyResult(PathBuf),

    #[error("failed to read {path}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed history file {path}: {reason}")]
    FileFormat { path: PathBuf, reason: String },

    #[error("record {index}: timestamp {value:?} does not match YYYY-MM-DDTHH:MM:SSZ")]
    TimestampParse {
        index: usize,
        value: String,
        #[source]
        source: time::error::Parse,
    },

    #[error("record {index}: missing field {field}")]
    MissingField { index: usize, field: &'static str },

    #[error("record {index}: invalid value for {field}: {value}")]
    InvalidField {
        index: usize,
        field: &'static str,
        value: String,
    },

    #[error("invalid date range: {from} is after {to}")]
    InvalidRange { from: String, to: String },

    #[error("bucket interval must be positive, got {0}")]
    InvalidInterval(time::Duration),

    #[error("bucket width of {0} days is out of range")]
    IntervalOverflow(i64),

    #[error("cannot compute percentages: no classified plays")]
    DivisionByZero,
}
