//! Error kinds raised while preparing the dataset.
//!
//! A missing evidence ID is deliberately absent from this enum: lookups
//! return `Option` and the caller decides how to surface the miss.

use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum DataError {
    /// Source file missing or unreadable. Loaders degrade this to an
    /// empty record sequence; it is only surfaced for logging.
    #[error("cannot read {path}: {source}")]
    FileUnavailable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A corpus line is not a JSON object, or a question record does not
    /// match the question schema. `line` is 1-based.
    #[error("{source_name} line {line}: malformed record: {message}")]
    MalformedRecord {
        source_name: String,
        line: usize,
        message: String,
    },

    /// An evidence record lacks a usable identifier. `line` is 1-based.
    #[error("line {line}: missing or non-scalar '{key}' field")]
    MissingKey { line: usize, key: &'static str },

    /// A question id has too few `_`-separated components to derive a
    /// conversation id.
    #[error("qid '{qid}' does not have the form <prefix>_<conversation>_<turn>")]
    MalformedIdentifier { qid: String },

    /// A table evidence record cannot be reconstructed.
    #[error("table '{table_id}': {detail}")]
    MalformedTable { table_id: String, detail: String },

    /// Two evidence records share an id and duplicates are rejected.
    #[error("duplicate evidence id '{id}'")]
    DuplicateId { id: String },
}
