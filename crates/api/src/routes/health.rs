use crate::AppState;
use axum::{extract::State, http::StatusCode, response::Json as ResponseJson};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Health check response
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct HealthResponse {
    /// Service status
    pub status: String,
    /// Service version (optional)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    /// Whether single sign-on is usable
    pub sso_configured: bool,
    /// Whether a translation provider is configured
    pub translation_configured: bool,
}

/// Health check endpoint
///
/// Returns the health status of the service.
/// This endpoint requires no authentication and is useful for monitoring and load balancers.
/// A portal with sign-in unavailable still reports `ok`; the flags say what works.
#[utoipa::path(
    get,
    path = "/v1/health",
    responses(
        (status = 200, description = "Service is healthy", body = HealthResponse),
    ),
    tag = "Health"
)]
pub async fn health_check(
    State(state): State<AppState>,
) -> (StatusCode, ResponseJson<HealthResponse>) {
    (
        StatusCode::OK,
        ResponseJson(HealthResponse {
            status: "ok".to_string(),
            version: option_env!("CARGO_PKG_VERSION").map(|v| v.to_string()),
            sso_configured: state.auth.is_configured(),
            translation_configured: state.translation.is_configured(),
        }),
    )
}
