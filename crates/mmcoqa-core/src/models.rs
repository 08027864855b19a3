//! Question and answer models for the MMCoQA question corpus.
//!
//! A [`QuestionTurn`] is one line of the question corpus. Its answers each
//! carry a [`Modality`] and the evidence list for that modality; the other
//! two lists are normally empty.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize};

use crate::{DataError, Record};

/// Evidence medium backing an answer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Modality {
    Text,
    Table,
    Image,
}

impl Modality {
    pub const ALL: [Modality; 3] = [Modality::Image, Modality::Table, Modality::Text];

    pub fn as_str(&self) -> &'static str {
        match self {
            Modality::Text => "text",
            Modality::Table => "table",
            Modality::Image => "image",
        }
    }
}

impl fmt::Display for Modality {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Modality {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "text" => Ok(Modality::Text),
            "table" => Ok(Modality::Table),
            "image" => Ok(Modality::Image),
            other => Err(format!(
                "unknown modality '{}'. Must be text, table, or image.",
                other
            )),
        }
    }
}

/// A text passage span supporting an answer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextInstance {
    pub doc_id: String,
    #[serde(default)]
    pub start_byte: Option<u64>,
    #[serde(default)]
    pub text: Option<String>,
}

/// An image supporting an answer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImageInstance {
    pub doc_id: String,
}

/// One accepted answer to a turn.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Answer {
    #[serde(deserialize_with = "scalar_text")]
    pub answer: String,
    pub modality: Modality,
    #[serde(default)]
    pub text_instances: Vec<TextInstance>,
    /// Zero-based `(row, column)` pairs into the turn's table. Signed so
    /// that drifted indices survive parsing and are dropped later.
    #[serde(default)]
    pub table_indices: Vec<(i64, i64)>,
    #[serde(default)]
    pub image_instances: Vec<ImageInstance>,
}

/// Borrowed view of the evidence list selected by an answer's modality.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum AnswerEvidence<'a> {
    Text(&'a [TextInstance]),
    Table(&'a [(i64, i64)]),
    Image(&'a [ImageInstance]),
}

impl AnswerEvidence<'_> {
    pub fn is_empty(&self) -> bool {
        match self {
            AnswerEvidence::Text(items) => items.is_empty(),
            AnswerEvidence::Table(items) => items.is_empty(),
            AnswerEvidence::Image(items) => items.is_empty(),
        }
    }
}

impl Answer {
    pub fn evidence(&self) -> AnswerEvidence<'_> {
        match self.modality {
            Modality::Text => AnswerEvidence::Text(&self.text_instances),
            Modality::Table => AnswerEvidence::Table(&self.table_indices),
            Modality::Image => AnswerEvidence::Image(&self.image_instances),
        }
    }
}

/// One conversational turn from the question corpus.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuestionTurn {
    pub qid: String,
    pub question: String,
    pub answer: Vec<Answer>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub table_id: Option<String>,
    /// Prior turns, kept verbatim for context display.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub history: Option<Vec<serde_json::Value>>,
    /// Fields this model does not interpret.
    #[serde(flatten)]
    pub extra: Record,
}

impl QuestionTurn {
    /// Parse a question record. `source_name` and `line` only feed the
    /// error message.
    pub fn from_record(record: Record, source_name: &str, line: usize) -> Result<Self, DataError> {
        serde_json::from_value(serde_json::Value::Object(record)).map_err(|e| {
            DataError::MalformedRecord {
                source_name: source_name.to_string(),
                line,
                message: e.to_string(),
            }
        })
    }

    /// All answers backed by the given modality.
    pub fn answers_by(&self, modality: Modality) -> impl Iterator<Item = &Answer> {
        self.answer.iter().filter(move |a| a.modality == modality)
    }

    /// Union of `table_indices` over every table-modality answer.
    pub fn table_indices(&self) -> Vec<(i64, i64)> {
        self.answers_by(Modality::Table)
            .flat_map(|a| a.table_indices.iter().copied())
            .collect()
    }
}

/// Answers in the corpus are occasionally numeric; render them as text.
fn scalar_text<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    use serde::de::Error;

    match serde_json::Value::deserialize(deserializer)? {
        serde_json::Value::String(s) => Ok(s),
        serde_json::Value::Number(n) => Ok(n.to_string()),
        serde_json::Value::Bool(b) => Ok(b.to_string()),
        other => Err(D::Error::custom(format!(
            "expected answer text, found {}",
            other
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn record(value: serde_json::Value) -> Record {
        match value {
            serde_json::Value::Object(map) => map,
            _ => panic!("fixture must be an object"),
        }
    }

    #[test]
    fn parses_image_turn() {
        let turn = QuestionTurn::from_record(
            record(json!({
                "qid": "C_381_1",
                "question": "What color is the bird?",
                "answer": [{
                    "answer": "red",
                    "modality": "image",
                    "text_instances": [],
                    "table_indices": [],
                    "image_instances": [{"doc_id": "img1", "doc_part": "image"}]
                }],
                "gold_question": "What color is the parrot?"
            })),
            "questions",
            1,
        )
        .unwrap();

        assert_eq!(turn.qid, "C_381_1");
        assert_eq!(turn.table_id, None);
        assert_eq!(turn.answer[0].modality, Modality::Image);
        assert_eq!(
            turn.answer[0].evidence(),
            AnswerEvidence::Image(&[ImageInstance {
                doc_id: "img1".to_string()
            }])
        );
        assert_eq!(turn.extra["gold_question"], "What color is the parrot?");
    }

    #[test]
    fn numeric_answer_becomes_text() {
        let turn = QuestionTurn::from_record(
            record(json!({
                "qid": "C_2_1",
                "question": "What year?",
                "table_id": "t1",
                "answer": [{"answer": 2020, "modality": "table", "table_indices": [[0, 1], [-1, 3]]}]
            })),
            "questions",
            4,
        )
        .unwrap();

        assert_eq!(turn.answer[0].answer, "2020");
        assert_eq!(turn.table_indices(), vec![(0, 1), (-1, 3)]);
        assert!(turn.answer[0].text_instances.is_empty());
    }

    #[test]
    fn unknown_modality_is_malformed() {
        let err = QuestionTurn::from_record(
            record(json!({
                "qid": "C_2_1",
                "question": "?",
                "answer": [{"answer": "x", "modality": "audio"}]
            })),
            "questions",
            7,
        )
        .unwrap_err();

        match err {
            DataError::MalformedRecord {
                source_name, line, ..
            } => {
                assert_eq!(source_name, "questions");
                assert_eq!(line, 7);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn missing_question_is_malformed() {
        let err = QuestionTurn::from_record(record(json!({"qid": "C_1_1", "answer": []})), "q", 1)
            .unwrap_err();
        assert!(err.to_string().contains("question"));
    }

    #[test]
    fn modality_from_str() {
        assert_eq!("Table".parse::<Modality>().unwrap(), Modality::Table);
        assert!("video".parse::<Modality>().is_err());
        assert_eq!(Modality::Image.to_string(), "image");
    }
}
