use crate::{
    middleware::AuthenticatedUser,
    models::{ErrorResponse, UserResponse},
    routes::pages::{error_page, found, login_again_page, unavailable_page},
    AppState,
};
use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Extension, Json,
};
use serde::Deserialize;
use services::auth::{AuthError, CallbackParams, SessionKey};
use tracing::{debug, error, info, warn};
use url::Url;

/// Start sign-in - redirects to the identity provider
#[utoipa::path(
    get,
    path = "/auth/login",
    responses(
        (status = 302, description = "Redirect to the identity provider"),
        (status = 503, description = "Single sign-on is not configured"),
    ),
    tag = "Auth"
)]
pub async fn login(State(state): State<AppState>) -> Response {
    match state.auth.build_login_url() {
        Ok(url) => {
            debug!("Redirecting to identity provider");
            found(url.as_str())
        }
        Err(AuthError::ConfigError(reason)) => unavailable_page(&reason),
        Err(e) => {
            error!("Failed to build login URL: {}", e);
            error_page(StatusCode::INTERNAL_SERVER_ERROR, "Could not start sign-in")
        }
    }
}

/// Handle the identity provider's redirect
///
/// Successful sign-ins, reloads of an already used callback URL and
/// callbacks without a code all land on the home page.
#[utoipa::path(
    get,
    path = "/auth/callback",
    params(
        ("code" = Option<String>, Query, description = "Authorization code"),
        ("error" = Option<String>, Query, description = "Error reported by the identity provider"),
        ("error_description" = Option<String>, Query, description = "Error description"),
    ),
    responses(
        (status = 302, description = "Signed in, or nothing to do; back to the home page"),
        (status = 401, description = "The identity provider refused the sign-in"),
        (status = 503, description = "Single sign-on is not configured"),
    ),
    tag = "Auth"
)]
pub async fn callback(
    State(state): State<AppState>,
    Extension(key): Extension<SessionKey>,
    Query(params): Query<CallbackParams>,
) -> Response {
    match state.auth.handle_callback(&key, &params).await {
        Ok(_) => found("/"),
        Err(AuthError::NoCode) => found("/"),
        Err(AuthError::Replay) => {
            debug!("Callback reloaded, ignoring");
            found("/")
        }
        Err(AuthError::TokenExchange(description))
        | Err(AuthError::AuthorizationDenied(description)) => login_again_page(&description),
        Err(AuthError::ConfigError(reason)) => unavailable_page(&reason),
        Err(e) => {
            error!("Callback failed: {}", e);
            error_page(StatusCode::INTERNAL_SERVER_ERROR, "Sign-in could not be completed")
        }
    }
}

/// Sign out and forget the session
#[utoipa::path(
    post,
    path = "/auth/logout",
    responses(
        (status = 302, description = "Signed out; back to the home page"),
    ),
    tag = "Auth"
)]
pub async fn logout(
    State(state): State<AppState>,
    Extension(key): Extension<SessionKey>,
) -> Response {
    if let Err(e) = state.auth.logout(&key).await {
        error!("Logout failed: {}", e);
    }
    found("/")
}

/// Current user
#[utoipa::path(
    get,
    path = "/auth/me",
    responses(
        (status = 200, description = "Signed-in user", body = UserResponse),
        (status = 401, description = "Not signed in", body = ErrorResponse),
    ),
    tag = "Auth",
    security(("session_cookie" = []))
)]
pub async fn current_user(Extension(user): Extension<AuthenticatedUser>) -> Json<UserResponse> {
    Json(UserResponse::from(user.0))
}

#[derive(Debug, Deserialize)]
pub struct DevAuthorizeParams {
    pub redirect_uri: Option<String>,
}

/// Local development stand-in for the identity provider's authorize page
///
/// Signs the browser in immediately by redirecting back with a fresh code.
pub async fn dev_authorize(
    State(state): State<AppState>,
    Query(params): Query<DevAuthorizeParams>,
) -> Response {
    let (Some(local), Some(identity)) = (state.dev_identity.as_ref(), state.auth.client_identity())
    else {
        return StatusCode::NOT_FOUND.into_response();
    };

    if let Some(requested) = &params.redirect_uri {
        if requested != &identity.redirect_uri {
            warn!("Development sign-in asked to redirect elsewhere: {}", requested);
            return (
                StatusCode::BAD_REQUEST,
                Json(ErrorResponse::with_param(
                    "redirect_uri does not match the configured redirect URI".to_string(),
                    "invalid_request_error".to_string(),
                    "redirect_uri".to_string(),
                )),
            )
                .into_response();
        }
    }

    let mut redirect = match Url::parse(&identity.redirect_uri) {
        Ok(url) => url,
        Err(e) => {
            error!("Invalid development redirect URI: {}", e);
            return error_page(StatusCode::INTERNAL_SERVER_ERROR, "Invalid redirect URI");
        }
    };
    let code = local.issue_code().await;
    redirect.query_pairs_mut().append_pair("code", &code);

    info!("Issued development authorization code");
    found(redirect.as_str())
}
