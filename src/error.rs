// =============================================================================
// PNODE RADAR — error.rs
// Error taxonomy of the aggregation pipeline
//
//   SeedUnreachable / MalformedResponse — per-seed, recovered inside the fan-out
//   TotalAggregationFailure             — every seed failed, escalated to the store
//   IdentityNotFound                    — single-node lookup miss, not a transport error
//   InvalidFilter                       — query parameter the read API cannot honor
// =============================================================================

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;

#[derive(Debug, thiserror::Error)]
pub enum AggregatorError {
    #[error("seed {seed} unreachable: {reason}")]
    SeedUnreachable { seed: String, reason: String },

    #[error("seed {seed} returned a malformed response: {reason}")]
    MalformedResponse { seed: String, reason: String },

    #[error("all {seeds} seeds failed, no observations this cycle")]
    TotalAggregationFailure { seeds: usize },

    #[error("node {0} not found")]
    IdentityNotFound(String),

    #[error("invalid filter: {0}")]
    InvalidFilter(String),

    #[error("cannot bind listener: {0}")]
    Bind(#[from] std::io::Error),
}

impl AggregatorError {
    /// Seed-level failures are recovered by the fan-out; everything else escalates.
    pub fn is_seed_failure(&self) -> bool {
        matches!(
            self,
            AggregatorError::SeedUnreachable { .. } | AggregatorError::MalformedResponse { .. }
        )
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            AggregatorError::IdentityNotFound(_) => StatusCode::NOT_FOUND,
            AggregatorError::InvalidFilter(_) => StatusCode::BAD_REQUEST,
            AggregatorError::TotalAggregationFailure { .. } => StatusCode::SERVICE_UNAVAILABLE,
            AggregatorError::SeedUnreachable { .. } | AggregatorError::MalformedResponse { .. } => {
                StatusCode::BAD_GATEWAY
            }
            AggregatorError::Bind(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AggregatorError {
    fn into_response(self) -> Response {
        let message = match &self {
            AggregatorError::IdentityNotFound(_) => "Node not found".to_string(),
            other => other.to_string(),
        };
        let body = Json(serde_json::json!({
            "success": false,
            "error": message,
        }));
        (self.status_code(), body).into_response()
    }
}
