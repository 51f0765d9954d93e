use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::context::ChatTurn;

/// Turns kept per session before the oldest are dropped.
pub const MAX_TURNS_PER_SESSION: usize = 200;

/// Sessions kept before the least recently updated one is evicted.
pub const MAX_SESSIONS: usize = 1000;

/// Per-session chat transcript.
#[async_trait]
pub trait ConversationLog: Send + Sync {
    async fn append(&self, session_id: &str, turns: Vec<ChatTurn>);
    /// The last `limit` turns of a session, oldest first.
    async fn recent(&self, session_id: &str, limit: usize) -> Vec<ChatTurn>;
}

#[derive(Default)]
struct Sessions {
    logs: HashMap<String, SessionLog>,
    tick: u64,
}

struct SessionLog {
    turns: Vec<ChatTurn>,
    touched: u64,
}

/// Process-local transcript store. Lost on restart.
#[derive(Clone, Default)]
pub struct InMemoryConversationLog {
    sessions: Arc<RwLock<Sessions>>,
}

impl InMemoryConversationLog {
    pub fn new() -> Self {
        Self::default()
    }

    #[cfg(test)]
    async fn session_count(&self) -> usize {
        self.sessions.read().await.logs.len()
    }
}

#[async_trait]
impl ConversationLog for InMemoryConversationLog {
    async fn append(&self, session_id: &str, turns: Vec<ChatTurn>) {
        let mut sessions = self.sessions.write().await;
        sessions.tick += 1;
        let tick = sessions.tick;

        if !sessions.logs.contains_key(session_id) && sessions.logs.len() >= MAX_SESSIONS {
            let stale = sessions
                .logs
                .iter()
                .min_by_key(|(_, log)| log.touched)
                .map(|(id, _)| id.clone());
            if let Some(stale) = stale {
                sessions.logs.remove(&stale);
                tracing::debug!(session_id = %stale, "Evicted idle conversation");
            }
        }

        let log = sessions
            .logs
            .entry(session_id.to_string())
            .or_insert_with(|| SessionLog {
                turns: Vec::new(),
                touched: tick,
            });
        log.touched = tick;
        log.turns.extend(turns);
        if log.turns.len() > MAX_TURNS_PER_SESSION {
            let excess = log.turns.len() - MAX_TURNS_PER_SESSION;
            log.turns.drain(..excess);
        }
    }

    async fn recent(&self, session_id: &str, limit: usize) -> Vec<ChatTurn> {
        let sessions = self.sessions.read().await;
        sessions
            .logs
            .get(session_id)
            .map(|log| log.turns[log.turns.len().saturating_sub(limit)..].to_vec())
            .unwrap_or_default()
    }
}
