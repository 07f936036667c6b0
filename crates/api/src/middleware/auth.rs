use crate::{models::ErrorResponse, AppState};
use axum::{
    extract::{Request, State},
    http::StatusCode,
    middleware::Next,
    response::Response,
    Extension, Json,
};
use services::auth::{SessionKey, UserIdentity};
use tracing::debug;

/// Authenticated user information passed to route handlers
#[derive(Clone, Debug)]
pub struct AuthenticatedUser(pub UserIdentity);

/// Reject requests whose session has no usable identity.
///
/// Goes through `get_identity`, so an expired access token is refreshed
/// transparently before the request is turned away.
pub async fn require_identity(
    State(state): State<AppState>,
    Extension(key): Extension<SessionKey>,
    mut request: Request,
    next: Next,
) -> Result<Response, (StatusCode, Json<ErrorResponse>)> {
    match state.auth.get_identity(&key).await {
        Some(identity) => {
            debug!("Request authenticated for {}", identity.name());
            request
                .extensions_mut()
                .insert(AuthenticatedUser(identity));
            Ok(next.run(request).await)
        }
        None => Err((
            StatusCode::UNAUTHORIZED,
            Json(ErrorResponse::new(
                "Sign in to continue".to_string(),
                "unauthorized".to_string(),
            )),
        )),
    }
}
