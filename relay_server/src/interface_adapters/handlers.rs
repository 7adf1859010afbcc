use crate::domain::errors::AccessError;
use crate::interface_adapters::protocol::{ErrorResponse, HealthResponse, NegotiateResponse};
use crate::interface_adapters::state::{AppState, SystemClock};
use crate::use_cases::IssueTokenUseCase;

use axum::{Json, extract::State, http::StatusCode};
use tracing::{debug, error};

// Handler issuing a short-lived, pre-authenticated websocket URL.
pub async fn negotiate(
    State(state): State<AppState>,
) -> Result<Json<NegotiateResponse>, (StatusCode, Json<ErrorResponse>)> {
    let use_case = IssueTokenUseCase {
        clock: SystemClock,
        store: state.token_store(),
        ttl_seconds: state.token_ttl_seconds,
    };

    let issued = use_case.execute().await.map_err(map_access_error)?;
    debug!(expires_at = issued.expires_at, "access token issued");

    let base = state.public_url.trim_end_matches('/');
    Ok(Json(NegotiateResponse {
        url: format!("{base}/client?access_token={}", issued.token),
    }))
}

pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse { status: "ok" })
}

pub(crate) fn map_access_error(err: AccessError) -> (StatusCode, Json<ErrorResponse>) {
    let status = match err {
        AccessError::InvalidToken | AccessError::TokenExpired => StatusCode::UNAUTHORIZED,
        AccessError::StorageFailure => {
            error!("token store unavailable");
            StatusCode::INTERNAL_SERVER_ERROR
        }
    };
    (
        status,
        Json(ErrorResponse {
            error: err.to_string(),
        }),
    )
}
