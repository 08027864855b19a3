//! Newline-delimited JSON record loading.
//!
//! Each non-blank line of a corpus file must be a JSON object. A file that
//! cannot be opened degrades to an empty record list (logged); a bad line
//! is fatal under [`Strictness::Strict`] and skipped under
//! [`Strictness::Lenient`].

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use mmcoqa_core::{DataError, LineRecord, Record, Strictness};

/// Load every record of a JSONL file, in line order, tagged with the
/// line it came from.
pub fn load_records(path: &Path, mode: Strictness) -> Result<Vec<LineRecord>, DataError> {
    let file = match File::open(path) {
        Ok(f) => f,
        Err(source) => {
            let err = DataError::FileUnavailable {
                path: path.to_path_buf(),
                source,
            };
            tracing::warn!("{}; continuing with no records", err);
            return Ok(Vec::new());
        }
    };

    let source_name = path.display().to_string();
    let records = read_records(BufReader::new(file), &source_name, mode)?;
    tracing::debug!(path = %source_name, count = records.len(), "loaded records");
    Ok(records)
}

/// Parse records from any line-oriented reader. `source_name` labels
/// errors and log lines.
pub fn read_records<R: BufRead>(
    reader: R,
    source_name: &str,
    mode: Strictness,
) -> Result<Vec<LineRecord>, DataError> {
    let mut records = Vec::new();

    for (i, line) in reader.lines().enumerate() {
        let line_no = i + 1;
        let line = match line {
            Ok(l) => l,
            Err(e) => {
                // A read failure mid-file (e.g. invalid UTF-8) is a
                // file-level defect: keep nothing from this source.
                tracing::warn!(
                    source = source_name,
                    line = line_no,
                    "read failed: {}; continuing with no records",
                    e
                );
                return Ok(Vec::new());
            }
        };

        if line.trim().is_empty() {
            continue;
        }

        match parse_line(&line, source_name, line_no) {
            Ok(record) => records.push(LineRecord {
                line: line_no,
                record,
            }),
            Err(e) if mode == Strictness::Lenient => {
                tracing::warn!("skipping line: {}", e);
            }
            Err(e) => return Err(e),
        }
    }

    Ok(records)
}

fn parse_line(line: &str, source_name: &str, line_no: usize) -> Result<Record, DataError> {
    let malformed = |message: String| DataError::MalformedRecord {
        source_name: source_name.to_string(),
        line: line_no,
        message,
    };

    match serde_json::from_str::<serde_json::Value>(line) {
        Ok(serde_json::Value::Object(map)) => Ok(map),
        Ok(other) => Err(malformed(format!(
            "expected a JSON object, found {}",
            json_kind(&other)
        ))),
        Err(e) => Err(malformed(e.to_string())),
    }
}

fn json_kind(value: &serde_json::Value) -> &'static str {
    match value {
        serde_json::Value::Null => "null",
        serde_json::Value::Bool(_) => "a boolean",
        serde_json::Value::Number(_) => "a number",
        serde_json::Value::String(_) => "a string",
        serde_json::Value::Array(_) => "an array",
        serde_json::Value::Object(_) => "an object",
    }
}
