use crate::models::*;
use crate::routes::health::HealthResponse;
use utoipa::openapi::security::{ApiKey, ApiKeyValue, SecurityScheme};
use utoipa::{Modify, OpenApi};

/// OpenAPI documentation configuration
#[derive(OpenApi)]
#[openapi(
    info(
        title = "Translator Portal API",
        description = "Text and document translation behind corporate single sign-on.\n\n## Authentication\n\nSign in through `/auth/login` in a browser. The portal keeps the sign-in in the `translator_session` cookie; every translation endpoint requires it.",
        version = "1.0.0",
        license(
            name = "MIT",
        )
    ),
    paths(
        // Auth endpoints
        crate::routes::auth::login,
        crate::routes::auth::callback,
        crate::routes::auth::logout,
        crate::routes::auth::current_user,
        // Translation endpoints
        crate::routes::translate::list_languages,
        crate::routes::translate::translate_text,
        crate::routes::translate::translate_document,
        // Health
        crate::routes::health::health_check,
    ),
    components(
        schemas(
            ErrorResponse, ErrorDetail, UserResponse,
            LanguageInfo, LanguagesResponse,
            TranslateTextRequest, TranslateTextResponse, TranslateDocumentForm,
            HealthResponse,
        ),
    ),
    modifiers(&SecurityAddon)
    // No servers - let client determine the URL dynamically
)]
pub struct ApiDoc;

/// Security configuration for OpenAPI
pub struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            // Browser session cookie set by the portal
            components.add_security_scheme(
                "session_cookie",
                SecurityScheme::ApiKey(ApiKey::Cookie(ApiKeyValue::new(
                    crate::middleware::SESSION_COOKIE,
                ))),
            );
        }
    }
}
