use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use hc_coach::CoachError;
use hc_records::{BatchError, StoreError};
use serde::Serialize;

#[derive(Debug, Serialize)]
pub struct ApiError {
    pub code: String,
    pub message: String,
    pub details: Option<serde_json::Value>,
    pub retryable: bool,
}

impl ApiError {
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
            details: None,
            retryable: false,
        }
    }

    pub fn retryable(mut self) -> Self {
        self.retryable = true;
        self
    }

    pub fn with_details(mut self, details: serde_json::Value) -> Self {
        self.details = Some(details);
        self
    }

    pub fn invalid_request(message: impl Into<String>) -> Self {
        Self::new("INVALID_REQUEST", message)
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::new("INTERNAL_ERROR", message).retryable()
    }

    pub fn coach_error(err: &CoachError) -> (StatusCode, Self) {
        match err {
            CoachError::QuotaExhausted { retry_after_secs } => (
                StatusCode::TOO_MANY_REQUESTS,
                Self::new("QUOTA_EXHAUSTED", err.to_string())
                    .retryable()
                    .with_details(serde_json::json!({ "retry_after_secs": retry_after_secs })),
            ),
            CoachError::Provider { model, .. } => (
                StatusCode::BAD_GATEWAY,
                Self::new("PROVIDER_ERROR", err.to_string())
                    .with_details(serde_json::json!({ "model": model })),
            ),
            CoachError::NoModelsConfigured => (
                StatusCode::INTERNAL_SERVER_ERROR,
                Self::internal(err.to_string()),
            ),
        }
    }

    pub fn batch_error(err: &BatchError) -> (StatusCode, Self) {
        match err {
            BatchError::Empty => (
                StatusCode::BAD_REQUEST,
                Self::new("BATCH_EMPTY", err.to_string()),
            ),
            BatchError::AllFailed { errors, .. } => (
                StatusCode::UNPROCESSABLE_ENTITY,
                Self::new("BATCH_ALL_FAILED", err.to_string())
                    .with_details(serde_json::json!({ "errors": errors })),
            ),
            BatchError::Store(e) => Self::store_error(e),
        }
    }

    pub fn store_error(err: &StoreError) -> (StatusCode, Self) {
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            Self::internal(err.to_string()),
        )
    }
}

#[derive(Debug)]
pub struct ApiErrorResponse {
    pub status: StatusCode,
    pub error: ApiError,
}

impl IntoResponse for ApiErrorResponse {
    fn into_response(self) -> Response {
        let body = serde_json::to_string(&self.error).unwrap_or_default();
        (self.status, [("content-type", "application/json")], body).into_response()
    }
}

impl From<(StatusCode, ApiError)> for ApiErrorResponse {
    fn from((status, error): (StatusCode, ApiError)) -> Self {
        Self { status, error }
    }
}

impl From<CoachError> for ApiErrorResponse {
    fn from(err: CoachError) -> Self {
        ApiError::coach_error(&err).into()
    }
}

impl From<BatchError> for ApiErrorResponse {
    fn from(err: BatchError) -> Self {
        ApiError::batch_error(&err).into()
    }
}

impl From<StoreError> for ApiErrorResponse {
    fn from(err: StoreError) -> Self {
        ApiError::store_error(&err).into()
    }
}
