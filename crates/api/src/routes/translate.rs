use crate::{
    middleware::AuthenticatedUser,
    models::{
        ErrorResponse, LanguageInfo, LanguagesResponse, TranslateDocumentForm,
        TranslateTextRequest, TranslateTextResponse,
    },
    AppState,
};
use axum::{
    extract::{Multipart, State},
    http::{
        header::{CONTENT_DISPOSITION, CONTENT_TYPE},
        StatusCode,
    },
    response::{IntoResponse, Response},
    Extension, Json,
};
use services::translation::{
    ports::{TranslationServiceError, TranslationServiceTrait},
    DocumentUpload,
};
use tracing::{debug, error};
use translation_providers::{TargetLanguage, TranslationError};

type ApiError = (StatusCode, Json<ErrorResponse>);

fn invalid_request(message: String, param: &str) -> ApiError {
    (
        StatusCode::BAD_REQUEST,
        Json(ErrorResponse::with_param(
            message,
            "invalid_request_error".to_string(),
            param.to_string(),
        )),
    )
}

fn parse_target(raw: &str) -> Result<TargetLanguage, ApiError> {
    raw.parse::<TargetLanguage>()
        .map_err(|e| invalid_request(e.to_string(), "target_language"))
}

/// Map service errors to HTTP responses
pub fn map_translation_error(err: TranslationServiceError) -> ApiError {
    let message = err.to_string();
    let (status, error_type, code) = match &err {
        TranslationServiceError::EmptyText => {
            (StatusCode::BAD_REQUEST, "invalid_request_error", "empty_text")
        }
        TranslationServiceError::EmptyDocument => {
            (StatusCode::BAD_REQUEST, "invalid_request_error", "empty_document")
        }
        TranslationServiceError::DocumentTooLarge { .. } => (
            StatusCode::PAYLOAD_TOO_LARGE,
            "invalid_request_error",
            "document_too_large",
        ),
        TranslationServiceError::NotConfigured => (
            StatusCode::SERVICE_UNAVAILABLE,
            "service_unavailable",
            "translation_not_configured",
        ),
        TranslationServiceError::Provider(provider_err) => match provider_err {
            TranslationError::UnsupportedFormat(_) => (
                StatusCode::BAD_REQUEST,
                "invalid_request_error",
                "unsupported_format",
            ),
            TranslationError::SameLanguage(_) => (
                StatusCode::BAD_REQUEST,
                "invalid_request_error",
                "same_language",
            ),
            TranslationError::QuotaExceeded => (
                StatusCode::TOO_MANY_REQUESTS,
                "rate_limit_error",
                "quota_exceeded",
            ),
            TranslationError::TooManyRequests => (
                StatusCode::TOO_MANY_REQUESTS,
                "rate_limit_error",
                "too_many_requests",
            ),
            TranslationError::Authorization
            | TranslationError::Connectivity(_)
            | TranslationError::Timeout
            | TranslationError::DocumentFailed(_)
            | TranslationError::Api { .. }
            | TranslationError::InvalidResponse(_) => {
                error!("Translation provider failure: {}", provider_err);
                (StatusCode::BAD_GATEWAY, "upstream_error", "translation_failed")
            }
        },
    };

    (
        status,
        Json(ErrorResponse::new(message, error_type.to_string()).with_code(code)),
    )
}

/// List target languages
#[utoipa::path(
    get,
    path = "/v1/languages",
    responses(
        (status = 200, description = "Supported target languages", body = LanguagesResponse),
    ),
    tag = "Translation"
)]
pub async fn list_languages(State(state): State<AppState>) -> Json<LanguagesResponse> {
    Json(LanguagesResponse {
        languages: state
            .translation
            .languages()
            .into_iter()
            .map(LanguageInfo::from)
            .collect(),
    })
}

/// Translate text
#[utoipa::path(
    post,
    path = "/v1/translate/text",
    request_body = TranslateTextRequest,
    responses(
        (status = 200, description = "Translated text", body = TranslateTextResponse),
        (status = 400, description = "Invalid request", body = ErrorResponse),
        (status = 401, description = "Not signed in", body = ErrorResponse),
        (status = 429, description = "Translation quota exhausted", body = ErrorResponse),
        (status = 502, description = "Translation service failure", body = ErrorResponse),
        (status = 503, description = "Translation is not configured", body = ErrorResponse),
    ),
    tag = "Translation",
    security(("session_cookie" = []))
)]
pub async fn translate_text(
    State(state): State<AppState>,
    Extension(user): Extension<AuthenticatedUser>,
    Json(request): Json<TranslateTextRequest>,
) -> Result<Json<TranslateTextResponse>, ApiError> {
    let target = parse_target(&request.target_language)?;
    debug!("Text translation into {} requested by {}", target, user.0.name());

    let translated = state
        .translation
        .translate_text(request.text, target)
        .await
        .map_err(map_translation_error)?;

    Ok(Json(TranslateTextResponse::new(translated, target)))
}

/// Translate a document
///
/// Responds with the translated document as an attachment named
/// `{CODE}_{original name}`.
#[utoipa::path(
    post,
    path = "/v1/translate/document",
    request_body(content = TranslateDocumentForm, content_type = "multipart/form-data"),
    responses(
        (status = 200, description = "Translated document", content_type = "application/octet-stream"),
        (status = 400, description = "Invalid request", body = ErrorResponse),
        (status = 401, description = "Not signed in", body = ErrorResponse),
        (status = 413, description = "Document too large", body = ErrorResponse),
        (status = 429, description = "Translation quota exhausted", body = ErrorResponse),
        (status = 502, description = "Translation service failure", body = ErrorResponse),
        (status = 503, description = "Translation is not configured", body = ErrorResponse),
    ),
    tag = "Translation",
    security(("session_cookie" = []))
)]
pub async fn translate_document(
    State(state): State<AppState>,
    Extension(user): Extension<AuthenticatedUser>,
    mut multipart: Multipart,
) -> Result<Response, ApiError> {
    let mut target = None;
    let mut document = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| invalid_request(e.body_text(), "file"))?
    {
        let name = field.name().map(str::to_string);
        match name.as_deref() {
            Some("target_language") => {
                let raw = field
                    .text()
                    .await
                    .map_err(|e| invalid_request(e.body_text(), "target_language"))?;
                target = Some(parse_target(&raw)?);
            }
            Some("file") => {
                let file_name = field.file_name().unwrap_or_default().to_string();
                let bytes = field.bytes().await.map_err(|e| {
                    (
                        e.status(),
                        Json(ErrorResponse::with_param(
                            e.body_text(),
                            "invalid_request_error".to_string(),
                            "file".to_string(),
                        )),
                    )
                })?;
                document = Some(DocumentUpload { file_name, bytes });
            }
            _ => {}
        }
    }

    let target = target.ok_or_else(|| {
        invalid_request("target_language is required".to_string(), "target_language")
    })?;
    let document =
        document.ok_or_else(|| invalid_request("file is required".to_string(), "file"))?;
    debug!(
        "Document translation into {} requested by {}",
        target,
        user.0.name()
    );

    let translated = state
        .translation
        .translate_document(document, target)
        .await
        .map_err(map_translation_error)?;

    let disposition = format!(
        "attachment; filename=\"{}\"",
        translated.file_name.replace(['"', '\\', '\r', '\n'], "_")
    );
    Ok((
        [
            (CONTENT_TYPE, "application/octet-stream".to_string()),
            (CONTENT_DISPOSITION, disposition),
        ],
        translated.bytes,
    )
        .into_response())
}
