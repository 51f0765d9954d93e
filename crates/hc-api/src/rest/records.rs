use axum::extract::State;
use axum::Json;
use hc_records::{BatchProposal, BatchResult, ProposalItem, RecordKind};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::error::ApiErrorResponse;
use crate::state::AppState;

#[derive(Deserialize)]
pub struct BatchRequest {
    #[serde(default)]
    pub records: Vec<ProposalItem>,
}

#[derive(Debug, Serialize)]
pub struct BatchResponse {
    pub total_records: usize,
    pub successful: usize,
    pub failed: usize,
    pub errors: Vec<String>,
}

impl From<BatchResult> for BatchResponse {
    fn from(result: BatchResult) -> Self {
        Self {
            total_records: result.total,
            successful: result.successful,
            failed: result.failed,
            errors: result.errors,
        }
    }
}

pub async fn batch(
    State(state): State<AppState>,
    Json(req): Json<BatchRequest>,
) -> Result<Json<BatchResponse>, ApiErrorResponse> {
    let proposal = BatchProposal::new(req.records);
    let result = state.processor.process(&proposal)?;
    Ok(Json(result.into()))
}

pub async fn counts(
    State(state): State<AppState>,
) -> Result<Json<BTreeMap<RecordKind, i64>>, ApiErrorResponse> {
    Ok(Json(state.store.record_counts()?))
}
