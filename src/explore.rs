//! Terminal exploration commands: summary, conversation listing, turn
//! display, evidence lookup, and table rendering.
//!
//! Lookup misses are reported inline as warnings; only a missing top-level
//! target (conversation, evidence id, table) fails the command.

use anyhow::{bail, Result};
use mmcoqa_core::dataset::Dataset;
use mmcoqa_core::models::{Answer, AnswerEvidence, Modality, QuestionTurn};
use mmcoqa_core::table::HighlightedTable;
use std::fmt::Write as _;

use crate::config::Config;

/// `mmqa summary`
pub fn run_summary(dataset: &Dataset) {
    let s = dataset.summary();
    println!("MMCoQA dataset");
    println!("==============");
    println!("  Questions:      {}", s.questions);
    println!("  Conversations:  {}", s.conversations);
    println!("  Image records:  {}", s.images);
    println!("  Table records:  {}", s.tables);
    println!("  Text records:   {}", s.texts);
}

/// `mmqa conversations`
pub fn run_conversations(dataset: &Dataset, limit: Option<usize>) {
    let ids = dataset.conversations.sorted_ids();
    let shown = limit.unwrap_or(ids.len()).min(ids.len());

    println!("{:<20} {:>6}", "CONVERSATION", "TURNS");
    for id in &ids[..shown] {
        let turns = dataset
            .conversations
            .get(id)
            .map(|c| c.turns.len())
            .unwrap_or(0);
        println!("{:<20} {:>6}", id, turns);
    }
    if shown < ids.len() {
        println!("... {} more", ids.len() - shown);
    }
}

/// `mmqa show <conversation_id>`
pub fn run_show(dataset: &Dataset, conversation_id: &str) -> Result<()> {
    let Some(conv) = dataset.conversations.get(conversation_id) else {
        bail!("conversation not found: {}", conversation_id);
    };

    println!("Conversation {} ({} turns)", conv.id, conv.turns.len());
    for turn in &conv.turns {
        println!();
        print!("{}", describe_turn(dataset, turn));
    }
    Ok(())
}

/// Text block for one turn: question, answers, and resolved evidence.
pub fn describe_turn(dataset: &Dataset, turn: &QuestionTurn) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "--- {} ---", turn.qid);
    let _ = writeln!(out, "Q: {}", turn.question);

    for (i, answer) in turn.answer.iter().enumerate() {
        let _ = writeln!(out, "A{}: {} [{}]", i + 1, answer.answer, answer.modality);
        describe_evidence(dataset, turn, answer, &mut out);
    }
    out
}

fn describe_evidence(dataset: &Dataset, turn: &QuestionTurn, answer: &Answer, out: &mut String) {
    let mut line = |modality: Modality, id: &str| match dataset.resolve(modality, id) {
        Some(record) => {
            let title = record
                .get("title")
                .and_then(|v| v.as_str())
                .unwrap_or("(untitled)");
            let _ = writeln!(out, "    {} {}: {}", modality, id, title);
        }
        None => {
            let _ = writeln!(out, "    ! {} evidence not found: {}", modality, id);
        }
    };

    match answer.evidence() {
        AnswerEvidence::Text(instances) => {
            for inst in instances {
                line(Modality::Text, &inst.doc_id);
            }
        }
        AnswerEvidence::Image(instances) => {
            for inst in instances {
                line(Modality::Image, &inst.doc_id);
            }
        }
        AnswerEvidence::Table(indices) => match turn.table_id.as_deref() {
            Some(table_id) => {
                line(Modality::Table, table_id);
                let cells: Vec<String> = indices
                    .iter()
                    .map(|(r, c)| format!("({}, {})", r, c))
                    .collect();
                if !cells.is_empty() {
                    let _ = writeln!(out, "      cells: {}", cells.join(" "));
                }
            }
            None => {
                let _ = writeln!(out, "    ! table answer without table_id");
            }
        },
    }
}

/// `mmqa evidence <modality> <id>`
pub fn run_evidence(dataset: &Dataset, modality: Modality, id: &str) -> Result<()> {
    match dataset.resolve(modality, id) {
        Some(record) => {
            println!("{}", serde_json::to_string_pretty(record)?);
            Ok(())
        }
        None => bail!("{} evidence not found: {}", modality, id),
    }
}

/// `mmqa table <table_id>`
///
/// With `qid`, the turn's own answer cells are highlighted in addition to
/// any explicit `highlight` pairs. The turn must reference `table_id`.
pub fn run_table(
    config: &Config,
    dataset: &Dataset,
    table_id: &str,
    highlight: &[(i64, i64)],
    qid: Option<&str>,
    json: bool,
) -> Result<()> {
    let mut indices = highlight.to_vec();
    if let Some(qid) = qid {
        let Some(turn) = dataset.conversations.turn(qid) else {
            bail!("turn not found: {}", qid);
        };
        match turn.table_id.as_deref() {
            Some(own) if own == table_id => indices.extend(turn.table_indices()),
            Some(own) => bail!("turn {} references table {}, not {}", qid, own, table_id),
            None => bail!("turn {} has no table", qid),
        }
    }

    let view = dataset.highlighted_table(table_id, &indices, config.loading.ragged_tables)?;
    let Some(view) = view else {
        bail!("table evidence not found: {}", table_id);
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&view)?);
    } else {
        print!("{}", render_table(&view));
    }
    Ok(())
}

/// Plain-text grid; highlighted cells are wrapped in `*`.
pub fn render_table(view: &HighlightedTable) -> String {
    let table = &view.table;
    let cell = |r: usize, c: usize| -> String {
        let text = table.cell(r, c).unwrap_or("");
        if view.highlight.is_highlighted(r, c) {
            format!("*{}*", text)
        } else {
            text.to_string()
        }
    };

    let mut widths: Vec<usize> = table.columns.iter().map(|c| c.chars().count()).collect();
    for r in 0..table.row_count() {
        for (c, width) in widths.iter_mut().enumerate() {
            *width = (*width).max(cell(r, c).chars().count());
        }
    }

    let mut out = String::new();
    let title = view.title.as_deref().unwrap_or("(untitled)");
    let _ = writeln!(out, "{} [{}]", title, view.table_id);

    let header: Vec<String> = table
        .columns
        .iter()
        .zip(&widths)
        .map(|(name, &w)| format!("{:<w$}", name, w = w))
        .collect();
    let _ = writeln!(out, "{}", header.join(" | ").trim_end());
    let rule: Vec<String> = widths.iter().map(|&w| "-".repeat(w)).collect();
    let _ = writeln!(out, "{}", rule.join("-+-"));

    for r in 0..table.row_count() {
        let row: Vec<String> = widths
            .iter()
            .enumerate()
            .map(|(c, &w)| format!("{:<w$}", cell(r, c), w = w))
            .collect();
        let _ = writeln!(out, "{}", row.join(" | ").trim_end());
    }
    out
}

/// Parse `R,C` into a zero-based index pair.
pub fn parse_index_pair(s: &str) -> Result<(i64, i64), String> {
    let (r, c) = s
        .split_once(',')
        .ok_or_else(|| format!("invalid ROW,COL: no ',' found in '{}'", s))?;
    let parse = |v: &str| {
        v.trim()
            .parse::<i64>()
            .map_err(|e| format!("invalid ROW,COL '{}': {}", s, e))
    };
    Ok((parse(r)?, parse(c)?))
}
