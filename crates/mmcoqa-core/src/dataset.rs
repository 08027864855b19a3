//! The prepared dataset and cross-modal evidence resolution.
//!
//! A [`Dataset`] bundles the conversation map with the three evidence
//! lookups. It is built once and never mutated, so callers share it
//! behind an `Arc` without locking.

use std::path::{Path, PathBuf};

use serde::Serialize;

use crate::conversation::ConversationMap;
use crate::lookup::{EvidenceLookup, EvidenceRecord};
use crate::models::{Modality, QuestionTurn};
use crate::table::{HighlightedTable, RaggedRows, ReconstructedTable};
use crate::DataError;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Dataset {
    pub conversations: ConversationMap,
    pub images: EvidenceLookup,
    pub tables: EvidenceLookup,
    pub texts: EvidenceLookup,
}

/// Record counts for a prepared dataset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DatasetSummary {
    pub questions: usize,
    pub conversations: usize,
    pub images: usize,
    pub tables: usize,
    pub texts: usize,
}

/// An image evidence file paired with the question it answers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ImageQuestionPair {
    pub qid: String,
    pub question: String,
    pub image_id: String,
    pub image_path: PathBuf,
}

/// Outcome of collecting image–question pairs.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ImagePairs {
    pub pairs: Vec<ImageQuestionPair>,
    /// Image instances whose doc_id is absent from the image lookup.
    pub missing: usize,
    /// Image records present but without a usable `path`.
    pub pathless: usize,
}

impl Dataset {
    pub fn lookup(&self, modality: Modality) -> &EvidenceLookup {
        match modality {
            Modality::Image => &self.images,
            Modality::Table => &self.tables,
            Modality::Text => &self.texts,
        }
    }

    /// Resolve an evidence id within one modality's corpus.
    pub fn resolve(&self, modality: Modality, id: &str) -> Option<&EvidenceRecord> {
        self.lookup(modality).get(id)
    }

    pub fn summary(&self) -> DatasetSummary {
        DatasetSummary {
            questions: self.conversations.turn_count(),
            conversations: self.conversations.len(),
            images: self.images.len(),
            tables: self.tables.len(),
            texts: self.texts.len(),
        }
    }

    /// File-system path of an image record: its `path` joined onto
    /// `image_root`. Existence is not checked.
    pub fn image_path(&self, id: &str, image_root: &Path) -> Option<PathBuf> {
        let file = self.images.field(id, "path")?;
        if file.is_empty() {
            return None;
        }
        Some(image_root.join(file))
    }

    /// Reconstruct a table by id with no highlighted cells.
    pub fn table(
        &self,
        table_id: &str,
        ragged: RaggedRows,
    ) -> Result<Option<HighlightedTable>, DataError> {
        self.highlighted_table(table_id, &[], ragged)
    }

    /// Reconstruct a table by id and project `indices` onto it.
    ///
    /// `Ok(None)` means the id is not in the table lookup.
    pub fn highlighted_table(
        &self,
        table_id: &str,
        indices: &[(i64, i64)],
        ragged: RaggedRows,
    ) -> Result<Option<HighlightedTable>, DataError> {
        let Some(record) = self.tables.get(table_id) else {
            return Ok(None);
        };
        let table = ReconstructedTable::from_record(record, ragged)?;
        let highlight = table.highlight(indices);
        Ok(Some(HighlightedTable {
            table_id: table_id.to_string(),
            title: record.get("title").and_then(|v| v.as_str()).map(str::to_string),
            table,
            highlight,
        }))
    }

    /// The table backing `turn`, with every cell referenced by its
    /// table-modality answers highlighted.
    ///
    /// `Ok(None)` when the turn carries no `table_id` or the id does not
    /// resolve.
    pub fn turn_table(
        &self,
        turn: &QuestionTurn,
        ragged: RaggedRows,
    ) -> Result<Option<HighlightedTable>, DataError> {
        match turn.table_id.as_deref() {
            Some(table_id) => self.highlighted_table(table_id, &turn.table_indices(), ragged),
            None => Ok(None),
        }
    }

    /// Every resolvable (image, question) pair, in conversation order.
    pub fn image_question_pairs(&self, image_root: &Path) -> ImagePairs {
        let mut out = ImagePairs::default();

        for turn in self.conversations.turns() {
            for answer in turn.answers_by(Modality::Image) {
                for instance in &answer.image_instances {
                    if !self.images.contains(&instance.doc_id) {
                        tracing::debug!(
                            qid = %turn.qid,
                            doc_id = %instance.doc_id,
                            "image evidence not found"
                        );
                        out.missing += 1;
                        continue;
                    }
                    match self.image_path(&instance.doc_id, image_root) {
                        Some(image_path) => out.pairs.push(ImageQuestionPair {
                            qid: turn.qid.clone(),
                            question: turn.question.clone(),
                            image_id: instance.doc_id.clone(),
                            image_path,
                        }),
                        None => out.pathless += 1,
                    }
                }
            }
        }

        out
    }
}
