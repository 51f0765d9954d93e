use axum::extract::State;
use axum::Json;
use hc_quota::ExhaustedModel;
use serde::Serialize;

use crate::state::AppState;

#[derive(Serialize)]
pub struct QuotaStatus {
    pub exhausted: Vec<ExhaustedModel>,
    pub seconds_until_next_reset: Option<i64>,
}

pub async fn status(State(state): State<AppState>) -> Json<QuotaStatus> {
    let ledger = state.orchestrator.ledger();
    Json(QuotaStatus {
        exhausted: ledger.snapshot(),
        seconds_until_next_reset: ledger.seconds_until_next_reset(),
    })
}
