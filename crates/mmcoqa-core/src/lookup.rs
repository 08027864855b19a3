//! ID-keyed evidence lookups.
//!
//! Each evidence corpus (images, tables, text passages) is indexed by its
//! records' `id` field. The three lookups are independent namespaces.

use std::collections::HashMap;

use serde::Deserialize;

use crate::{DataError, LineRecord, Record, Strictness};

/// Field every evidence record is keyed by.
pub const ID_FIELD: &str = "id";

/// What to do when two records share an id.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DuplicatePolicy {
    /// Later record replaces the earlier one silently.
    #[default]
    LastWins,
    /// Later record wins, and the collision is logged.
    Warn,
    /// Collision is a [`DataError::DuplicateId`].
    Reject,
}

/// Indexing options for one corpus.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct IndexOptions {
    pub missing_id: Strictness,
    pub duplicates: DuplicatePolicy,
}

/// Full evidence record, as read from its corpus line.
pub type EvidenceRecord = Record;

/// Mapping from evidence id to its record.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EvidenceLookup {
    records: HashMap<String, EvidenceRecord>,
}

impl EvidenceLookup {
    /// Index in-memory `records` by their `id` field, numbering them from
    /// line 1 in iteration order.
    pub fn build<I>(records: I, options: IndexOptions) -> Result<Self, DataError>
    where
        I: IntoIterator<Item = EvidenceRecord>,
    {
        let numbered = records
            .into_iter()
            .enumerate()
            .map(|(i, record)| LineRecord { line: i + 1, record });
        Self::from_lines(numbered, options)
    }

    /// Index records read from a corpus file by their `id` field.
    ///
    /// A record whose `id` is absent or not a string/number is a
    /// [`DataError::MissingKey`] at its file line under strict indexing
    /// and is skipped with a warning under lenient indexing. Numeric ids
    /// are stored in their decimal string form.
    pub fn from_lines<I>(records: I, options: IndexOptions) -> Result<Self, DataError>
    where
        I: IntoIterator<Item = LineRecord>,
    {
        let mut map: HashMap<String, EvidenceRecord> = HashMap::new();

        for LineRecord { line, record } in records {
            let id = match record_id(&record) {
                Some(id) => id,
                None => {
                    let err = DataError::MissingKey {
                        line,
                        key: ID_FIELD,
                    };
                    if options.missing_id == Strictness::Lenient {
                        tracing::warn!("skipping evidence record: {}", err);
                        continue;
                    }
                    return Err(err);
                }
            };

            if map.contains_key(&id) {
                match options.duplicates {
                    DuplicatePolicy::LastWins => {}
                    DuplicatePolicy::Warn => {
                        tracing::warn!(
                            id = %id,
                            line,
                            "duplicate evidence id; keeping the later record"
                        );
                    }
                    DuplicatePolicy::Reject => return Err(DataError::DuplicateId { id }),
                }
            }
            map.insert(id, record);
        }

        Ok(Self { records: map })
    }

    pub fn get(&self, id: &str) -> Option<&EvidenceRecord> {
        self.records.get(id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.records.contains_key(id)
    }

    /// Read a string field of a record, if both exist.
    pub fn field(&self, id: &str, field: &str) -> Option<&str> {
        self.get(id)?.get(field)?.as_str()
    }

    /// All ids, sorted.
    pub fn ids(&self) -> Vec<&str> {
        let mut ids: Vec<&str> = self.records.keys().map(String::as_str).collect();
        ids.sort_unstable();
        ids
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

fn record_id(record: &EvidenceRecord) -> Option<String> {
    match record.get(ID_FIELD)? {
        serde_json::Value::String(s) => Some(s.clone()),
        serde_json::Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}
