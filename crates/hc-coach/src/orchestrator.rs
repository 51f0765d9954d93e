use hc_quota::QuotaLedger;
use std::sync::Arc;

use crate::context::{build_context, ChatTurn, DEFAULT_MAX_HISTORY_DEPTH};
use crate::error::CoachError;
use crate::normalize::{normalize, CompletionResult};
use crate::provider::{CallableSchema, CompletionProvider, SafetyPolicy};
use crate::transcript::{ConversationLog, InMemoryConversationLog};

/// Used when a quota error carries no readable retry hint.
pub const DEFAULT_RETRY_DELAY_SECS: u64 = 3600;

#[derive(Debug, Clone)]
pub struct OrchestratorSettings {
    /// Fallback chain, highest priority first.
    pub models: Vec<String>,
    pub default_retry_delay_secs: u64,
    pub system_prompt: Option<String>,
}

impl Default for OrchestratorSettings {
    fn default() -> Self {
        Self {
            models: vec![
                "gemini-2.5-flash".to_string(),
                "gemini-2.0-flash".to_string(),
                "gemini-2.0-flash-lite".to_string(),
            ],
            default_retry_delay_secs: DEFAULT_RETRY_DELAY_SECS,
            system_prompt: None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct CompletionRequest {
    pub user_message: String,
    pub history: Vec<ChatTurn>,
    pub callable_schemas: Option<Vec<CallableSchema>>,
    pub max_history_depth: usize,
    /// When set, the exchange is appended to the conversation log, and an
    /// empty `history` is filled from it.
    pub session_id: Option<String>,
}

impl CompletionRequest {
    pub fn new(user_message: impl Into<String>) -> Self {
        Self {
            user_message: user_message.into(),
            history: Vec::new(),
            callable_schemas: None,
            max_history_depth: DEFAULT_MAX_HISTORY_DEPTH,
            session_id: None,
        }
    }

    pub fn with_history(mut self, history: Vec<ChatTurn>) -> Self {
        self.history = history;
        self
    }

    pub fn with_schemas(mut self, schemas: Vec<CallableSchema>) -> Self {
        self.callable_schemas = Some(schemas);
        self
    }

    pub fn with_max_history_depth(mut self, depth: usize) -> Self {
        self.max_history_depth = depth;
        self
    }

    pub fn with_session(mut self, session_id: impl Into<String>) -> Self {
        self.session_id = Some(session_id.into());
        self
    }
}

/// Runs one completion across the model fallback chain.
pub struct CoachOrchestrator {
    provider: Arc<dyn CompletionProvider>,
    ledger: Arc<QuotaLedger>,
    log: Arc<dyn ConversationLog>,
    settings: OrchestratorSettings,
    safety: SafetyPolicy,
}

impl CoachOrchestrator {
    pub fn new(
        provider: Arc<dyn CompletionProvider>,
        ledger: Arc<QuotaLedger>,
        settings: OrchestratorSettings,
    ) -> Self {
        Self {
            provider,
            ledger,
            log: Arc::new(InMemoryConversationLog::new()),
            settings,
            safety: SafetyPolicy::conservative(),
        }
    }

    pub fn with_log(mut self, log: Arc<dyn ConversationLog>) -> Self {
        self.log = log;
        self
    }

    pub fn ledger(&self) -> &Arc<QuotaLedger> {
        &self.ledger
    }

    pub fn log(&self) -> &Arc<dyn ConversationLog> {
        &self.log
    }

    pub fn settings(&self) -> &OrchestratorSettings {
        &self.settings
    }

    /// Try each model in priority order until one answers.
    ///
    /// Exhausted models are skipped. A quota failure marks the model
    /// exhausted and moves on; any other failure is returned immediately.
    /// Models are attempted one at a time, never concurrently.
    pub async fn complete(&self, request: CompletionRequest) -> Result<CompletionResult, CoachError> {
        if self.settings.models.is_empty() {
            return Err(CoachError::NoModelsConfigured);
        }

        let history = match (&request.session_id, request.history.is_empty()) {
            (Some(session_id), true) => {
                self.log
                    .recent(session_id, request.max_history_depth)
                    .await
            }
            _ => request.history.clone(),
        };

        let today = chrono::Local::now().date_naive();
        let context = build_context(
            &history,
            &request.user_message,
            request.max_history_depth,
            self.settings.system_prompt.as_deref(),
            today,
        );
        let schemas = request.callable_schemas.as_deref();

        for model in &self.settings.models {
            if !self.ledger.is_available(model) {
                tracing::debug!(model = %model, "Skipping exhausted model");
                continue;
            }

            tracing::debug!(model = %model, turns = context.messages.len(), "Sending completion");
            match self
                .provider
                .send(model, &context, schemas, &self.safety)
                .await
            {
                Ok(response) => {
                    let result = normalize(response);
                    tracing::info!(
                        model = %model,
                        calls = result.calls.len(),
                        "Completion succeeded"
                    );
                    if let Some(session_id) = &request.session_id {
                        self.log
                            .append(
                                session_id,
                                vec![
                                    ChatTurn::user(request.user_message.clone()),
                                    ChatTurn::assistant(result.text.clone()),
                                ],
                            )
                            .await;
                    }
                    return Ok(result);
                }
                Err(e) if e.is_quota() => {
                    let delay = e
                        .retry_delay_secs()
                        .unwrap_or(self.settings.default_retry_delay_secs);
                    tracing::info!(
                        model = %model,
                        retry_delay_secs = delay,
                        "Model over quota, falling back"
                    );
                    self.ledger.mark_exhausted(model, delay);
                }
                Err(e) => {
                    tracing::warn!(model = %model, error = %e, "Completion failed");
                    return Err(CoachError::Provider {
                        model: model.clone(),
                        source: e,
                    });
                }
            }
        }

        let retry_after_secs = self.ledger.seconds_until_next_reset();
        tracing::warn!(?retry_after_secs, "All models exhausted");
        Err(CoachError::QuotaExhausted { retry_after_secs })
    }
}
