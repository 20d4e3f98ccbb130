use thiserror::Error;

/// Errors raised while ingesting, joining and aggregating archive records.
#[derive(Debug, Error)]
pub enum ArchiveError {
    #[error("record set '{record_set}' is malformed: record {index} has no '{field}' field")]
    MalformedInput {
        record_set: String,
        index: usize,
        field: String,
    },
    #[error("record set '{record_set}' is malformed: {reason}")]
    MalformedRecordSet { record_set: String, reason: String },
    #[error("cannot average {scope}: division by zero")]
    DivisionByZero { scope: String },
    #[error("rollup of '{stat}' is inconsistent: expected {expected}, found {actual}")]
    RollupMismatch {
        stat: String,
        expected: u64,
        actual: u64,
    },
    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

pub type ArchiveResult<T> = Result<T, ArchiveError>;
