use crate::AppState;
use axum::{
    extract::{Request, State},
    middleware::Next,
    response::{IntoResponse, Response},
};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use services::auth::SessionKey;
use tracing::debug;
use uuid::Uuid;

/// Name of the cookie carrying the session key
pub const SESSION_COOKIE: &str = "translator_session";

/// Attach a [`SessionKey`] to every request.
///
/// The key comes from the session cookie; a browser without one (or with a
/// malformed one) gets a fresh key and the cookie is set on the response.
pub async fn session_middleware(
    State(state): State<AppState>,
    jar: CookieJar,
    mut request: Request,
    next: Next,
) -> Response {
    let existing = jar
        .get(SESSION_COOKIE)
        .map(|cookie| cookie.value())
        .filter(|value| Uuid::parse_str(value).is_ok())
        .map(|value| SessionKey(value.to_string()));

    let (key, minted) = match existing {
        Some(key) => (key, false),
        None => (SessionKey::generate(), true),
    };
    request.extensions_mut().insert(key.clone());

    let response = next.run(request).await;
    if !minted {
        return response;
    }

    debug!("Issued new session cookie");
    let cookie = Cookie::build((SESSION_COOKIE, key.0))
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax)
        .secure(state.secure_cookies)
        .build();
    (jar.add(cookie), response).into_response()
}
