//! Conversation grouping.
//!
//! Question ids look like `<prefix>_<conversation>_<turn>` (e.g. `C_381_7`);
//! the conversation id is the first two components (`C_381`). Grouping is a
//! single stable pass: turns keep source order inside their conversation,
//! and conversations keep the order in which they were first seen.

use std::collections::HashMap;

use serde::Serialize;

use crate::models::QuestionTurn;
use crate::{DataError, Strictness};

/// Derive the conversation id from a question id.
///
/// ```rust
/// use mmcoqa_core::conversation::conversation_id;
///
/// assert_eq!(conversation_id("C_381_7").unwrap(), "C_381");
/// assert!(conversation_id("C381").is_err());
/// ```
pub fn conversation_id(qid: &str) -> Result<String, DataError> {
    let mut parts = qid.split('_');
    match (parts.next(), parts.next()) {
        (Some(prefix), Some(number)) if !prefix.is_empty() && !number.is_empty() => {
            Ok(format!("{}_{}", prefix, number))
        }
        _ => Err(DataError::MalformedIdentifier {
            qid: qid.to_string(),
        }),
    }
}

/// Ordered turns sharing one conversation id.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Conversation {
    pub id: String,
    pub turns: Vec<QuestionTurn>,
}

/// Conversations in first-encounter order with O(1) lookup by id.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ConversationMap {
    conversations: Vec<Conversation>,
    index: HashMap<String, usize>,
}

impl ConversationMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a turn to its conversation, creating the conversation on
    /// first encounter.
    pub fn push(&mut self, turn: QuestionTurn) -> Result<(), DataError> {
        let conv_id = conversation_id(&turn.qid)?;
        match self.index.get(&conv_id) {
            Some(&pos) => self.conversations[pos].turns.push(turn),
            None => {
                self.index.insert(conv_id.clone(), self.conversations.len());
                self.conversations.push(Conversation {
                    id: conv_id,
                    turns: vec![turn],
                });
            }
        }
        Ok(())
    }

    pub fn get(&self, conv_id: &str) -> Option<&Conversation> {
        self.index.get(conv_id).map(|&pos| &self.conversations[pos])
    }

    /// Find a turn by its question id.
    pub fn turn(&self, qid: &str) -> Option<&QuestionTurn> {
        let conv = self.get(&conversation_id(qid).ok()?)?;
        conv.turns.iter().find(|t| t.qid == qid)
    }

    /// Conversations in first-encounter order.
    pub fn iter(&self) -> impl Iterator<Item = &Conversation> {
        self.conversations.iter()
    }

    /// Every turn, conversation by conversation.
    pub fn turns(&self) -> impl Iterator<Item = &QuestionTurn> {
        self.conversations.iter().flat_map(|c| c.turns.iter())
    }

    /// Conversation ids sorted lexically, for deterministic listings.
    pub fn sorted_ids(&self) -> Vec<&str> {
        let mut ids: Vec<&str> = self.conversations.iter().map(|c| c.id.as_str()).collect();
        ids.sort_unstable();
        ids
    }

    /// Number of conversations.
    pub fn len(&self) -> usize {
        self.conversations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.conversations.is_empty()
    }

    pub fn turn_count(&self) -> usize {
        self.conversations.iter().map(|c| c.turns.len()).sum()
    }
}

/// Group question turns into conversations.
///
/// Under [`Strictness::Strict`] the first malformed qid aborts grouping;
/// under [`Strictness::Lenient`] the offending turn is dropped and logged.
pub fn group_by_conversation<I>(turns: I, mode: Strictness) -> Result<ConversationMap, DataError>
where
    I: IntoIterator<Item = QuestionTurn>,
{
    let mut map = ConversationMap::new();
    for turn in turns {
        let qid = turn.qid.clone();
        match map.push(turn) {
            Ok(()) => {}
            Err(e) if mode == Strictness::Lenient => {
                tracing::warn!(qid = %qid, "skipping turn: {}", e);
            }
            Err(e) => return Err(e),
        }
    }
    Ok(map)
}
