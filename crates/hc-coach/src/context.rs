use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::provider::ProviderContext;

pub const DEFAULT_MAX_HISTORY_DEPTH: usize = 10;

const DEFAULT_SYSTEM_PROMPT: &str = "You are a supportive personal health and fitness coach. \
Answer questions about training, nutrition, sleep and habits concisely. \
When the user reports something worth tracking, call the matching function: \
health_metric for body measurements, meal for food eaten, workout for training sessions, \
coaching_session to save a summary of a coaching conversation, habit to define a new habit, \
and habit_completion when a habit was done. Use one call per record; several calls are fine \
when the user reports several things. Dates must be YYYY-MM-DD; resolve words like \
\"today\" or \"yesterday\" against the current date. Never invent values the user did not give.";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatTurn {
    pub role: Role,
    pub content: String,
}

impl ChatTurn {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }
}

/// The last `depth` turns. Older turns are dropped, never summarized.
pub fn truncate_history(history: &[ChatTurn], depth: usize) -> &[ChatTurn] {
    &history[history.len().saturating_sub(depth)..]
}

pub fn system_instruction(custom: Option<&str>, today: NaiveDate) -> String {
    let base = custom
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .unwrap_or(DEFAULT_SYSTEM_PROMPT);
    format!("{base}\n\nToday's date is {}.", today.format("%Y-%m-%d"))
}

pub fn build_context(
    history: &[ChatTurn],
    user_message: &str,
    max_history_depth: usize,
    system_prompt: Option<&str>,
    today: NaiveDate,
) -> ProviderContext {
    let mut messages: Vec<ChatTurn> = truncate_history(history, max_history_depth)
        .iter()
        .filter(|turn| !turn.content.trim().is_empty())
        .cloned()
        .collect();
    messages.push(ChatTurn::user(user_message));
    ProviderContext {
        system_instruction: system_instruction(system_prompt, today),
        messages,
    }
}
