use std::path::PathBuf;

use thiserror::Error;

/// Failures of the data layer.
///
/// `Io` and `Parse` are fatal for the load that raised them. `EmptyInput`
/// is a normal outcome for an empty selection; callers render a
/// placeholder instead of treating it as a crash.
#[derive(Debug, Error)]
pub enum DataError {
    #[error("Failed to read '{0}'")]
    Io(PathBuf, #[source] std::io::Error),

    #[error("Malformed delimited data in '{path}'")]
    Csv {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },

    #[error("Malformed JSON in '{path}'")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Unsupported file extension: .{0}")]
    UnsupportedFormat(String),

    #[error("Required column '{0}' not found")]
    MissingColumn(String),

    #[error("Row {row}: cannot parse timestamp '{value}'")]
    Parse { row: usize, value: String },

    #[error("Cannot pick a group from an empty summary")]
    EmptyInput,
}
