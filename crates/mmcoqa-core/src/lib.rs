//! # MMCoQA Core
//!
//! I/O-free data layer for the MMCoQA explorer: question/answer models,
//! conversation grouping, ID-keyed evidence lookups, and table
//! reconstruction with answer-cell highlighting.
//!
//! This crate never touches the filesystem. Records arrive already parsed
//! (one JSON object per corpus line) and everything built here is
//! immutable once constructed, so a [`dataset::Dataset`] can be shared
//! across any number of readers without synchronization.

pub mod conversation;
pub mod dataset;
pub mod error;
pub mod lookup;
pub mod models;
pub mod table;

pub use error::DataError;

use serde::Deserialize;

/// One parsed corpus line: a JSON object with arbitrary fields.
pub type Record = serde_json::Map<String, serde_json::Value>;

/// A [`Record`] with the 1-based file line it was parsed from.
#[derive(Debug, Clone, PartialEq)]
pub struct LineRecord {
    pub line: usize,
    pub record: Record,
}

/// How per-record defects are handled during bulk loading.
///
/// `Strict` turns the first defect into an error; `Lenient` logs the
/// defect and drops the offending record.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Strictness {
    #[default]
    Strict,
    Lenient,
}
