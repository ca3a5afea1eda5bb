//! HTTP mapping for gateway failures.
//!
//! Every failure serializes as `{"error": {"kind", "message", ...}}` with a
//! stable kind tag, so a calling agent can self-correct (retry with a valid
//! chunk index, restart an expired session) without parsing prose.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use dooray_api::ApiError;
use dooray_transfer::{SourceError, TransferError};
use serde_json::json;

#[derive(Debug, thiserror::Error)]
pub enum GatewayError {
    #[error("{field} is required")]
    MissingField { field: &'static str },

    #[error(transparent)]
    Transfer(#[from] TransferError),

    #[error(transparent)]
    Api(#[from] ApiError),
}

impl IntoResponse for GatewayError {
    fn into_response(self) -> Response {
        let (status, body) = match &self {
            Self::MissingField { field } => (
                StatusCode::BAD_REQUEST,
                json!({
                    "kind": "invalid_input",
                    "message": self.to_string(),
                    "field": field,
                }),
            ),
            Self::Transfer(err) => transfer_response(err),
            Self::Api(err) => api_response(err),
        };
        (status, Json(json!({ "error": body }))).into_response()
    }
}

fn transfer_response(err: &TransferError) -> (StatusCode, serde_json::Value) {
    let status = match err {
        TransferError::SessionNotFound(_) => StatusCode::NOT_FOUND,
        TransferError::ChunkOutOfRange { .. } => StatusCode::BAD_REQUEST,
        TransferError::Upstream(SourceError::NotFound(_)) => StatusCode::NOT_FOUND,
        TransferError::Upstream(SourceError::Unauthorized(_)) => StatusCode::UNAUTHORIZED,
        TransferError::Upstream(_) => StatusCode::BAD_GATEWAY,
        TransferError::Storage(_) | TransferError::LockPoisoned => {
            StatusCode::INTERNAL_SERVER_ERROR
        }
    };
    let mut body = json!({
        "kind": err.kind(),
        "message": err.to_string(),
    });
    if let TransferError::ChunkOutOfRange { total, .. } = err {
        body["valid_range"] = json!({
            "min": 0,
            "max": total.saturating_sub(1),
        });
    }
    (status, body)
}

fn api_response(err: &ApiError) -> (StatusCode, serde_json::Value) {
    // Pass the upstream status through when one was received, the way the
    // original proxy surfaced Dooray's own 4xx answers.
    let status = err
        .status()
        .and_then(|s| StatusCode::from_u16(s.as_u16()).ok())
        .unwrap_or(StatusCode::BAD_GATEWAY);
    (
        status,
        json!({
            "kind": "upstream_error",
            "message": err.to_string(),
        }),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn out_of_range_response_carries_the_valid_range() {
        let err = GatewayError::Transfer(TransferError::ChunkOutOfRange { index: 9, total: 4 });
        let (status, body) = transfer_response(match &err {
            GatewayError::Transfer(inner) => inner,
            _ => unreachable!(),
        });
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["kind"], "chunk_out_of_range");
        assert_eq!(body["valid_range"]["max"], 3);
    }
}
