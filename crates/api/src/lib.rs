pub mod middleware;
pub mod models;
pub mod openapi;
pub mod routes;

use crate::{
    middleware::{require_identity, session_middleware},
    openapi::ApiDoc,
    routes::{
        auth::{callback, current_user, dev_authorize, login, logout},
        health::health_check,
        pages::home,
        translate::{list_languages, translate_document, translate_text},
    },
};
use axum::{
    extract::DefaultBodyLimit,
    middleware::from_fn_with_state,
    response::Html,
    routing::{get, post},
    Router,
};
use config::{ApiConfig, AuthConfig, TranslationConfig};
use services::{
    auth::{
        AzureAdProvider, InMemorySessionStore, LocalIdentityProvider, SessionAuthManager,
        SessionStore,
    },
    translation::ports::TranslationServiceTrait,
    TranslationServiceImpl,
};
use std::{sync::Arc, time::Duration};
use tower_http::trace::TraceLayer;
use translation_providers::{DeepLConfig, DeepLProvider, MockTranslationProvider};
use utoipa::OpenApi;

/// Room for multipart framing on top of the document itself
const MULTIPART_OVERHEAD_BYTES: usize = 64 * 1024;

/// Shared state handed to every route
#[derive(Clone)]
pub struct AppState {
    pub auth: Arc<SessionAuthManager>,
    pub translation: Arc<dyn TranslationServiceTrait>,
    /// Present only in development mode
    pub dev_identity: Option<Arc<LocalIdentityProvider>>,
    pub secure_cookies: bool,
    pub max_upload_bytes: usize,
}

/// Build the session authentication manager from configuration.
///
/// An incomplete client identity is logged once here; the portal keeps
/// running with sign-in unavailable.
pub fn init_auth_services(
    config: &AuthConfig,
    store: Arc<dyn SessionStore>,
) -> (SessionAuthManager, Option<Arc<LocalIdentityProvider>>) {
    let code_ttl = Duration::from_secs(config.authorization_code_ttl_seconds);

    let identity = match config.client_identity() {
        Ok(identity) => identity,
        Err(e) => {
            tracing::error!("Single sign-on unavailable: {}", e);
            return (SessionAuthManager::unconfigured(e.to_string(), store), None);
        }
    };

    if config.dev_mode {
        tracing::warn!("Development sign-in enabled; do not use in production");
        let local = Arc::new(LocalIdentityProvider::new(
            config.dev_user_name.clone(),
            config.dev_user_email.clone(),
        ));
        let manager =
            SessionAuthManager::new(identity, local.clone(), store).with_code_ttl(code_ttl);
        return (manager, Some(local));
    }

    match AzureAdProvider::new(&identity, config.identity_endpoint.clone()) {
        Ok(provider) => {
            tracing::info!("Single sign-on configured for client {}", identity.client_id);
            let manager = SessionAuthManager::new(identity, Arc::new(provider), store)
                .with_code_ttl(code_ttl);
            (manager, None)
        }
        Err(e) => {
            tracing::error!("Single sign-on unavailable: {}", e);
            (SessionAuthManager::unconfigured(e.to_string(), store), None)
        }
    }
}

/// Build the translation service from configuration.
///
/// Without an API key the mock provider is used in development mode and
/// translation is disabled otherwise.
pub fn init_translation_service(
    config: &TranslationConfig,
    dev_mode: bool,
) -> TranslationServiceImpl {
    if let (Some(api_key), Some(base_url)) = (config.deepl_api_key.clone(), config.server_url()) {
        let deepl_config = DeepLConfig::new(base_url, api_key)
            .with_timeouts(config.timeout_seconds, config.document_timeout_seconds);
        return match DeepLProvider::new(deepl_config) {
            Ok(provider) => {
                tracing::info!("Translation provider configured");
                TranslationServiceImpl::new(Arc::new(provider), config.max_document_bytes)
            }
            Err(e) => {
                tracing::error!("Failed to create translation provider: {}", e);
                TranslationServiceImpl::unconfigured()
            }
        };
    }

    if dev_mode {
        tracing::info!("No translation API key, using the mock provider");
        TranslationServiceImpl::new(
            Arc::new(MockTranslationProvider::new()),
            config.max_document_bytes,
        )
    } else {
        tracing::warn!("DEEPL_API_KEY is not set, translation is disabled");
        TranslationServiceImpl::unconfigured()
    }
}

/// Wire every service from configuration
pub fn init_app_state(config: &ApiConfig) -> AppState {
    let store = Arc::new(InMemorySessionStore::new(
        Duration::from_secs(config.auth.session_idle_timeout_seconds),
        config.auth.session_max_entries,
    ));
    let (auth, dev_identity) = init_auth_services(&config.auth, store);
    let translation = init_translation_service(&config.translation, config.auth.dev_mode);

    let secure_cookies = auth
        .client_identity()
        .map(|identity| identity.redirect_uri.starts_with("https://"))
        .unwrap_or(false);

    AppState {
        auth: Arc::new(auth),
        translation: Arc::new(translation),
        dev_identity,
        secure_cookies,
        max_upload_bytes: config.translation.max_document_bytes,
    }
}

/// Build the complete application router
pub fn build_app(state: AppState) -> Router {
    let auth_routes = build_auth_routes(state.clone());
    let translation_routes = build_translation_routes(state.clone());

    Router::new()
        .route("/", get(home))
        .nest("/auth", auth_routes)
        .nest(
            "/v1",
            Router::new()
                .route("/health", get(health_check))
                .merge(translation_routes),
        )
        .with_state(state.clone())
        .merge(build_openapi_routes())
        .layer(from_fn_with_state(state, session_middleware))
        .layer(TraceLayer::new_for_http())
}

/// Build authentication routes
pub fn build_auth_routes(state: AppState) -> Router<AppState> {
    let mut router = Router::new()
        .route("/login", get(login))
        .route("/callback", get(callback))
        .route("/logout", post(logout))
        .route(
            "/me",
            get(current_user).layer(from_fn_with_state(state.clone(), require_identity)),
        );

    if state.dev_identity.is_some() {
        router = router.route("/dev/authorize", get(dev_authorize));
    }
    router
}

/// Build translation routes; everything but the language list needs a signed-in user
pub fn build_translation_routes(state: AppState) -> Router<AppState> {
    let protected = Router::new()
        .route("/translate/text", post(translate_text))
        .route(
            "/translate/document",
            post(translate_document).layer(DefaultBodyLimit::max(
                state.max_upload_bytes + MULTIPART_OVERHEAD_BYTES,
            )),
        )
        .route_layer(from_fn_with_state(state, require_identity));

    Router::new()
        .route("/languages", get(list_languages))
        .merge(protected)
}

/// Build OpenAPI documentation routes
pub fn build_openapi_routes() -> Router {
    Router::new().route("/docs", get(swagger_ui_handler)).route(
        "/api-docs/openapi.json",
        get(|| async { axum::Json(ApiDoc::openapi()) }),
    )
}

/// Serve Swagger UI HTML page
async fn swagger_ui_handler() -> Html<String> {
    Html(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
    <meta charset="UTF-8">
    <title>Translator Portal API Documentation</title>
    <link rel="stylesheet" type="text/css" href="https://unpkg.com/swagger-ui-dist@5.10.5/swagger-ui.css" />
</head>
<body>
    <div id="swagger-ui"></div>
    <script src="https://unpkg.com/swagger-ui-dist@5.10.5/swagger-ui-bundle.js"></script>
    <script>
    window.onload = function() {
        SwaggerUIBundle({
            url: '/api-docs/openapi.json',
            dom_id: '#swagger-ui',
            deepLinking: true,
            presets: [SwaggerUIBundle.presets.apis],
            docExpansion: 'list'
        });
    };
    </script>
</body>
</html>"#
            .to_string(),
    )
}
