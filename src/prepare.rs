//! Dataset preparation.
//!
//! Loads the question corpus and the three evidence corpora, groups the
//! questions into conversations, and indexes the evidence by id. A corpus
//! file that cannot be read leaves its structure empty; the rest of the
//! dataset is still returned.

use anyhow::{Context, Result};
use mmcoqa_core::conversation::group_by_conversation;
use mmcoqa_core::dataset::Dataset;
use mmcoqa_core::lookup::{EvidenceLookup, IndexOptions};
use mmcoqa_core::models::{Modality, QuestionTurn};
use mmcoqa_core::{LineRecord, Strictness};
use std::path::Path;

use crate::config::{DataConfig, LoadingConfig};
use crate::loader::load_records;

/// Build the [`Dataset`] described by `data` under the `loading` policies.
///
/// Side-effect free apart from reading the four files; calling it twice
/// with the same inputs yields equal datasets.
pub fn prepare_dataset(data: &DataConfig, loading: &LoadingConfig) -> Result<Dataset> {
    let turns = load_turns(&data.questions, loading.mode)?;
    let conversations = group_by_conversation(turns, loading.mode)
        .with_context(|| format!("Failed to group questions from {}", data.questions.display()))?;

    let options = loading.index_options();
    let images = index_corpus(Modality::Image, &data.images, loading.mode, options)?;
    let tables = index_corpus(Modality::Table, &data.tables, loading.mode, options)?;
    let texts = index_corpus(Modality::Text, &data.texts, loading.mode, options)?;

    let dataset = Dataset {
        conversations,
        images,
        tables,
        texts,
    };

    let summary = dataset.summary();
    tracing::info!(
        questions = summary.questions,
        conversations = summary.conversations,
        images = summary.images,
        tables = summary.tables,
        texts = summary.texts,
        "dataset prepared"
    );

    Ok(dataset)
}

fn load_turns(path: &Path, mode: Strictness) -> Result<Vec<QuestionTurn>> {
    let source_name = path.display().to_string();
    let records = load_records(path, mode)?;

    let mut turns = Vec::with_capacity(records.len());
    for LineRecord { line, record } in records {
        match QuestionTurn::from_record(record, &source_name, line) {
            Ok(turn) => turns.push(turn),
            Err(e) if mode == Strictness::Lenient => tracing::warn!("skipping question: {}", e),
            Err(e) => return Err(e.into()),
        }
    }
    Ok(turns)
}

fn index_corpus(
    modality: Modality,
    path: &Path,
    mode: Strictness,
    options: IndexOptions,
) -> Result<EvidenceLookup> {
    let records = load_records(path, mode)?;
    EvidenceLookup::from_lines(records, options)
        .with_context(|| format!("Failed to index {} corpus {}", modality, path.display()))
}
