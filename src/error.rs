use std::io;

use thiserror::Error;

/// Failures that abort a capture operation. Per-packet problems are never
/// errors; they are recorded on the packet instead.
#[derive(Debug, Error)]
pub enum CaptureError {
    #[error("cannot open capture source '{source_name}': {reason}")]
    SourceOpen { source_name: String, reason: String },

    #[error("invalid capture filter '{filter}': {reason}")]
    FilterCompile { filter: String, reason: String },

    #[error("cannot enumerate capture devices: {0}")]
    DeviceList(String),

    #[error("capture read failed: {0}")]
    Read(String),

    #[error(transparent)]
    Io(#[from] io::Error),
}

/// Display filter compile failure.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FilterError {
    #[error("empty condition in filter")]
    EmptyCondition,

    #[error("cannot parse condition '{0}'")]
    InvalidCondition(String),

    #[error("missing value after '{field} {op}'")]
    MissingValue { field: String, op: String },

    #[error("unknown field '{0}'")]
    UnknownField(String),

    #[error("invalid value '{value}' for field '{field}': {reason}")]
    InvalidValue { field: String, value: String, reason: String },

    #[error("operator '{op}' not supported for field '{field}'")]
    UnsupportedOperator { field: String, op: String },

    #[error("unbalanced quote in filter")]
    UnbalancedQuote,
}
