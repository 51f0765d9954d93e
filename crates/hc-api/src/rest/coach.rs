use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use hc_coach::{CallableSchema, ChatTurn, CompletionRequest};
use hc_records::{BatchError, BatchProposal, BatchResult, ProposalItem};
use serde::{Deserialize, Serialize};

use crate::error::{ApiError, ApiErrorResponse};
use crate::state::AppState;

#[derive(Deserialize)]
pub struct ChatRequest {
    #[serde(default)]
    pub session_id: Option<String>,
    pub user_message: String,
    #[serde(default)]
    pub conversation_history: Vec<ChatTurn>,
}

/// Outcome of saving the records the model proposed during a chat turn.
#[derive(Debug, Serialize)]
pub struct RecordSummary {
    pub total_records: usize,
    pub successful: usize,
    pub failed: usize,
    pub errors: Vec<String>,
    pub message: String,
}

#[derive(Serialize)]
pub struct ChatResponse {
    pub response_text: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub record_summary: Option<RecordSummary>,
}

impl From<BatchResult> for RecordSummary {
    fn from(result: BatchResult) -> Self {
        let message = result.summary();
        Self {
            total_records: result.total,
            successful: result.successful,
            failed: result.failed,
            errors: result.errors,
            message,
        }
    }
}

impl RecordSummary {
    fn from_error(total: usize, err: BatchError) -> Self {
        let message = err.to_string();
        let errors = match err {
            BatchError::AllFailed { errors, .. } => errors,
            _ => vec![message.clone()],
        };
        Self {
            total_records: total,
            successful: 0,
            failed: total,
            errors,
            message,
        }
    }
}

pub async fn chat(
    State(state): State<AppState>,
    Json(req): Json<ChatRequest>,
) -> Result<Json<ChatResponse>, ApiErrorResponse> {
    if req.user_message.trim().is_empty() {
        return Err(ApiErrorResponse {
            status: StatusCode::BAD_REQUEST,
            error: ApiError::invalid_request("user_message must not be empty"),
        });
    }

    let schemas: Vec<CallableSchema> = state
        .processor
        .registry()
        .schemas()
        .into_iter()
        .map(|s| CallableSchema {
            name: s.name,
            description: s.description,
            parameters: s.parameters,
        })
        .collect();

    let mut request = CompletionRequest::new(req.user_message)
        .with_history(req.conversation_history)
        .with_schemas(schemas)
        .with_max_history_depth(state.config.llm.max_history_depth);
    if let Some(session_id) = req.session_id {
        request = request.with_session(session_id);
    }

    let result = state.orchestrator.complete(request).await?;

    let proposal: BatchProposal = result
        .record_calls()
        .into_iter()
        .map(|call| ProposalItem::new(call.name, call.arguments))
        .collect();

    let record_summary = if proposal.is_empty() {
        None
    } else {
        let total = proposal.len();
        Some(match state.processor.process(&proposal) {
            Ok(batch) => batch.into(),
            Err(e) => {
                tracing::warn!(error = %e, "Proposed records were not saved");
                RecordSummary::from_error(total, e)
            }
        })
    };

    Ok(Json(ChatResponse {
        response_text: result.text,
        record_summary,
    }))
}
