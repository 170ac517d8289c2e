//! Conversation turns and bounded history

use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

use crate::Result;

/// One question/answer exchange
///
/// Serialized as `{"Q": .., "A": ..}` to stay compatible with histories
/// already stored in dialog sessions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Turn {
    #[serde(rename = "Q")]
    pub question: String,
    #[serde(rename = "A")]
    pub answer: String,
}

impl Turn {
    pub fn new(question: impl Into<String>, answer: impl Into<String>) -> Self {
        Self {
            question: question.into(),
            answer: answer.into(),
        }
    }
}

/// Bounded FIFO of turns, oldest first
#[derive(Debug, Clone)]
pub struct ConversationHistory {
    turns: VecDeque<Turn>,
    max_turns: usize,
}

impl ConversationHistory {
    /// Create an empty history holding at most `max_turns` turns
    pub fn new(max_turns: usize) -> Self {
        Self {
            turns: VecDeque::with_capacity(max_turns + 1),
            max_turns,
        }
    }

    /// Decode a stored history
    ///
    /// Missing or undecodable data yields an empty history. Stored histories
    /// longer than the cap keep their most recent turns.
    pub fn from_json(data: Option<&str>, max_turns: usize) -> Self {
        let mut history = Self::new(max_turns);
        let Some(data) = data.filter(|d| !d.is_empty()) else {
            return history;
        };

        match serde_json::from_str::<Vec<Turn>>(data) {
            Ok(turns) => {
                for turn in turns {
                    history.push(turn);
                }
            }
            Err(e) => {
                tracing::warn!(error = %e, "Discarding undecodable conversation history");
            }
        }
        history
    }

    /// Encode for storage in session state
    pub fn to_json(&self) -> Result<String> {
        let turns: Vec<&Turn> = self.turns.iter().collect();
        Ok(serde_json::to_string(&turns)?)
    }

    /// Append a turn, evicting the oldest when over capacity
    pub fn push(&mut self, turn: Turn) {
        self.turns.push_back(turn);
        while self.turns.len() > self.max_turns {
            self.turns.pop_front();
        }
    }

    /// Build the rolling transcript for a new question
    ///
    /// With no stored turns the transcript is the question itself.
    pub fn transcript(&self, question: &str) -> String {
        if self.turns.is_empty() {
            return question.to_string();
        }

        let mut transcript = String::from("CONVERSATION HISTORY:\n");
        for turn in &self.turns {
            transcript.push_str("Q: ");
            transcript.push_str(&turn.question);
            transcript.push_str("\nA: ");
            transcript.push_str(&turn.answer);
            transcript.push('\n');
        }
        transcript.push_str("\nQUESTION: ");
        transcript.push_str(question);
        transcript
    }

    /// Answer of the most recent turn
    pub fn last_answer(&self) -> Option<&str> {
        self.turns.back().map(|t| t.answer.as_str())
    }

    pub fn len(&self) -> usize {
        self.turns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }

    pub fn max_turns(&self) -> usize {
        self.max_turns
    }

    pub fn iter(&self) -> impl Iterator<Item = &Turn> {
        self.turns.iter()
    }
}
