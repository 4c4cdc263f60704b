//! Chat history sent with every request
//!
//! Keeps the running exchange with the hosted model within a turn count and a
//! rough token budget, dropping the oldest turns first.

use serde::{Deserialize, Serialize};

/// Speaker of a chat turn, in the model API's vocabulary
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    User,
    Model,
}

/// One exchange turn
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ChatTurn {
    pub role: ChatRole,
    pub text: String,
    token_estimate: usize,
}

impl ChatTurn {
    pub fn new(role: ChatRole, text: impl Into<String>) -> Self {
        let text = text.into();
        let token_estimate = estimate_tokens(&text);
        Self {
            role,
            text,
            token_estimate,
        }
    }
}

#[derive(Clone, Debug)]
pub struct ChatContext {
    turns: Vec<ChatTurn>,
    max_turns: usize,
    max_tokens: usize,
    current_tokens: usize,
}

impl ChatContext {
    pub fn new(max_turns: usize, max_tokens: usize) -> Self {
        Self {
            turns: Vec::new(),
            max_turns,
            max_tokens,
            current_tokens: 0,
        }
    }

    /// Record a completed user/model exchange
    pub fn push_exchange(&mut self, query: impl Into<String>, reply: impl Into<String>) {
        self.push(ChatTurn::new(ChatRole::User, query));
        self.push(ChatTurn::new(ChatRole::Model, reply));
        self.trim_to_fit();
    }

    fn push(&mut self, turn: ChatTurn) {
        self.current_tokens += turn.token_estimate;
        self.turns.push(turn);
    }

    pub fn turns(&self) -> &[ChatTurn] {
        &self.turns
    }

    pub fn len(&self) -> usize {
        self.turns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }

    pub fn total_tokens(&self) -> usize {
        self.current_tokens
    }

    pub fn clear(&mut self) {
        self.turns.clear();
        self.current_tokens = 0;
    }

    // Drop whole exchanges so the history always starts with a user turn
    fn trim_to_fit(&mut self) {
        while (self.current_tokens > self.max_tokens || self.turns.len() > self.max_turns)
            && !self.turns.is_empty()
        {
            let drop = self.turns.len().min(2);
            for removed in self.turns.drain(..drop) {
                self.current_tokens = self.current_tokens.saturating_sub(removed.token_estimate);
            }
        }
    }
}

/// ~4 characters per token for English text, never below the word count
fn estimate_tokens(text: &str) -> usize {
    let char_estimate = (text.len() + 3) / 4;
    let word_estimate = text.split_whitespace().count();
    char_estimate.max(word_estimate).max(1)
}
