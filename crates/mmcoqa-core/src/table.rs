//! Table reconstruction and answer-cell highlighting.
//!
//! A table evidence record stores its grid as
//!
//! ```text
//! header:     [{ "column_name": "Name" }, { "column_name": "Year" }]
//! table_rows: [[{ "text": "X" }, { "text": "2020" }], ...]
//! ```
//!
//! either at the top level or nested under a `table` object (the layout
//! of the MMQA table corpus). [`ReconstructedTable::from_record`] turns
//! that into plain column names and cell strings; [`HighlightMask`]
//! marks the cells an answer points at.

use serde::{Deserialize, Serialize};

use crate::lookup::{EvidenceRecord, ID_FIELD};
use crate::DataError;

/// How rows whose length disagrees with the header are handled.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RaggedRows {
    /// Any mismatch is a [`DataError::MalformedTable`].
    #[default]
    Strict,
    /// Short rows are padded with empty cells, long rows truncated.
    Pad,
}

/// Column names and cell text of one table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReconstructedTable {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl ReconstructedTable {
    /// Rebuild a table from its evidence record.
    pub fn from_record(record: &EvidenceRecord, ragged: RaggedRows) -> Result<Self, DataError> {
        let table_id = record
            .get(ID_FIELD)
            .map(|v| match v {
                serde_json::Value::String(s) => s.clone(),
                other => other.to_string(),
            })
            .unwrap_or_else(|| "<unknown>".to_string());
        let malformed = |detail: String| DataError::MalformedTable {
            table_id: table_id.clone(),
            detail,
        };

        let body = match record.get("table") {
            Some(serde_json::Value::Object(nested)) => nested,
            _ => record,
        };

        let header = body
            .get("header")
            .and_then(|v| v.as_array())
            .ok_or_else(|| malformed("missing 'header' array".to_string()))?;
        let table_rows = body
            .get("table_rows")
            .and_then(|v| v.as_array())
            .ok_or_else(|| malformed("missing 'table_rows' array".to_string()))?;

        let columns = header
            .iter()
            .enumerate()
            .map(|(i, col)| {
                col.get("column_name")
                    .and_then(|v| v.as_str())
                    .map(str::to_string)
                    .ok_or_else(|| malformed(format!("header entry {} has no 'column_name'", i)))
            })
            .collect::<Result<Vec<_>, _>>()?;

        let mut rows = Vec::with_capacity(table_rows.len());
        for (r, row) in table_rows.iter().enumerate() {
            let cells = row
                .as_array()
                .ok_or_else(|| malformed(format!("row {} is not an array", r)))?;

            let mut texts = cells
                .iter()
                .enumerate()
                .map(|(c, cell)| {
                    cell_text(cell)
                        .ok_or_else(|| malformed(format!("cell ({}, {}) has no 'text'", r, c)))
                })
                .collect::<Result<Vec<_>, _>>()?;

            if texts.len() != columns.len() {
                match ragged {
                    RaggedRows::Strict => {
                        return Err(malformed(format!(
                            "row {} has {} cells, header has {} columns",
                            r,
                            texts.len(),
                            columns.len()
                        )))
                    }
                    RaggedRows::Pad => texts.resize(columns.len(), String::new()),
                }
            }
            rows.push(texts);
        }

        Ok(Self { columns, rows })
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    pub fn column_count(&self) -> usize {
        self.columns.len()
    }

    pub fn cell(&self, row: usize, column: usize) -> Option<&str> {
        self.rows.get(row)?.get(column).map(String::as_str)
    }

    /// Project answer `(row, column)` pairs onto this table.
    pub fn highlight(&self, indices: &[(i64, i64)]) -> HighlightMask {
        HighlightMask::project(self, indices)
    }
}

/// Cell text; numeric cells are rendered to strings.
fn cell_text(cell: &serde_json::Value) -> Option<String> {
    match cell.get("text")? {
        serde_json::Value::String(s) => Some(s.clone()),
        serde_json::Value::Number(n) => Some(n.to_string()),
        serde_json::Value::Null => Some(String::new()),
        _ => None,
    }
}

/// Per-cell highlight flags with the same shape as the table's rows.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HighlightMask {
    cells: Vec<Vec<bool>>,
}

impl HighlightMask {
    /// Mark every in-range pair. Pairs outside `0..rows` × `0..columns`
    /// are dropped without error.
    pub fn project(table: &ReconstructedTable, indices: &[(i64, i64)]) -> Self {
        let mut cells: Vec<Vec<bool>> = table
            .rows
            .iter()
            .map(|row| vec![false; row.len()])
            .collect();

        for &(row, column) in indices {
            let (Ok(r), Ok(c)) = (usize::try_from(row), usize::try_from(column)) else {
                continue;
            };
            if r < table.row_count() && c < table.column_count() {
                if let Some(flag) = cells[r].get_mut(c) {
                    *flag = true;
                }
            }
        }

        Self { cells }
    }

    pub fn is_highlighted(&self, row: usize, column: usize) -> bool {
        self.cells
            .get(row)
            .and_then(|r| r.get(column))
            .copied()
            .unwrap_or(false)
    }

    /// Highlighted positions in row-major order.
    pub fn positions(&self) -> Vec<(usize, usize)> {
        self.cells
            .iter()
            .enumerate()
            .flat_map(|(r, row)| {
                row.iter()
                    .enumerate()
                    .filter(|&(_, &on)| on)
                    .map(move |(c, _)| (r, c))
            })
            .collect()
    }

    pub fn rows(&self) -> &[Vec<bool>] {
        &self.cells
    }

    pub fn any(&self) -> bool {
        self.cells.iter().any(|row| row.iter().any(|&on| on))
    }
}

/// A table together with the cells an answer references.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HighlightedTable {
    pub table_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    pub table: ReconstructedTable,
    pub highlight: HighlightMask,
}
