use crate::{
    models::{translated_file_name, SupportedFormat},
    DocumentUpload, TargetLanguage, TranslatedDocument, TranslatedText, TranslationError,
    TranslationProvider,
};
use async_trait::async_trait;
use reqwest::{
    header::{HeaderMap, HeaderValue, AUTHORIZATION},
    multipart::{Form, Part},
    Client,
};
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// Longest pause between two document status checks
const MAX_POLL_INTERVAL: Duration = Duration::from_secs(5);

/// Configuration for the DeepL provider
#[derive(Clone)]
pub struct DeepLConfig {
    pub base_url: String,
    pub api_key: String,
    pub timeout_seconds: u64,
    pub document_timeout_seconds: u64,
}

impl DeepLConfig {
    pub fn new(base_url: String, api_key: String) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key,
            timeout_seconds: 30,
            document_timeout_seconds: 600,
        }
    }

    pub fn with_timeouts(mut self, request_seconds: u64, document_seconds: u64) -> Self {
        self.timeout_seconds = request_seconds;
        self.document_timeout_seconds = document_seconds;
        self
    }
}

impl std::fmt::Debug for DeepLConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DeepLConfig")
            .field("base_url", &self.base_url)
            .field("api_key", &"***")
            .field("timeout_seconds", &self.timeout_seconds)
            .field("document_timeout_seconds", &self.document_timeout_seconds)
            .finish()
    }
}

#[derive(Serialize)]
struct TextRequest<'a> {
    text: [&'a str; 1],
    target_lang: &'static str,
}

#[derive(Deserialize)]
struct TextResponse {
    translations: Vec<TextTranslation>,
}

#[derive(Deserialize)]
struct TextTranslation {
    text: String,
    #[serde(default)]
    detected_source_language: Option<String>,
}

#[derive(Deserialize)]
struct DocumentHandle {
    document_id: String,
    document_key: String,
}

#[derive(Serialize)]
struct DocumentKey<'a> {
    document_key: &'a str,
}

#[derive(Debug, Deserialize)]
struct DocumentStatus {
    status: DocumentState,
    #[serde(default)]
    seconds_remaining: Option<u64>,
    #[serde(default)]
    error_message: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
enum DocumentState {
    Queued,
    Translating,
    Done,
    Error,
}

#[derive(Deserialize)]
struct ApiErrorBody {
    #[serde(default)]
    message: Option<String>,
}

/// DeepL provider implementation
///
/// Text goes through `/v2/translate`. Documents are uploaded, polled until
/// the service reports them done, and then downloaded.
pub struct DeepLProvider {
    config: DeepLConfig,
    client: Client,
}

impl DeepLProvider {
    /// Create a new DeepL provider with the given configuration
    pub fn new(config: DeepLConfig) -> Result<Self, TranslationError> {
        let client = Client::builder()
            .connect_timeout(Duration::from_secs(30))
            .pool_idle_timeout(Duration::from_secs(90))
            .timeout(Duration::from_secs(config.timeout_seconds))
            .build()
            .map_err(|e| TranslationError::Connectivity(format!("Failed to create HTTP client: {e}")))?;

        Ok(Self { config, client })
    }

    /// Build HTTP request headers
    fn build_headers(&self) -> Result<HeaderMap, TranslationError> {
        let mut headers = HeaderMap::new();
        let auth_value = format!("DeepL-Auth-Key {}", self.config.api_key);
        let header_value =
            HeaderValue::from_str(&auth_value).map_err(|_| TranslationError::Authorization)?;
        headers.insert(AUTHORIZATION, header_value);
        Ok(headers)
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.config.base_url, path)
    }

    async fn check_document(
        &self,
        handle: &DocumentHandle,
    ) -> Result<DocumentStatus, TranslationError> {
        let response = self
            .client
            .post(self.url(&format!("/v2/document/{}", handle.document_id)))
            .headers(self.build_headers()?)
            .json(&DocumentKey {
                document_key: &handle.document_key,
            })
            .send()
            .await
            .map_err(connectivity)?;

        if !response.status().is_success() {
            return Err(error_from_response(response).await);
        }

        response
            .json()
            .await
            .map_err(|e| TranslationError::InvalidResponse(e.to_string()))
    }

    async fn wait_for_document(&self, handle: &DocumentHandle) -> Result<(), TranslationError> {
        let deadline = Instant::now() + Duration::from_secs(self.config.document_timeout_seconds);

        loop {
            let status = self.check_document(handle).await?;
            debug!(
                document_id = %handle.document_id,
                status = ?status.status,
                seconds_remaining = ?status.seconds_remaining,
                "Document status"
            );

            match status.status {
                DocumentState::Done => return Ok(()),
                DocumentState::Error => {
                    let message = status
                        .error_message
                        .unwrap_or_else(|| "unknown error".to_string());
                    warn!(document_id = %handle.document_id, "Document translation failed: {}", message);
                    return Err(classify_document_error(message));
                }
                DocumentState::Queued | DocumentState::Translating => {}
            }

            let now = Instant::now();
            if now >= deadline {
                return Err(TranslationError::Timeout);
            }

            let wait = Duration::from_secs(status.seconds_remaining.unwrap_or(1))
                .clamp(Duration::from_secs(1), MAX_POLL_INTERVAL)
                .min(deadline - now);
            tokio::time::sleep(wait).await;
        }
    }
}

#[async_trait]
impl TranslationProvider for DeepLProvider {
    async fn translate_text(
        &self,
        text: &str,
        target: TargetLanguage,
    ) -> Result<TranslatedText, TranslationError> {
        debug!(target_lang = target.code(), chars = text.len(), "Translating text");

        let response = self
            .client
            .post(self.url("/v2/translate"))
            .headers(self.build_headers()?)
            .json(&TextRequest {
                text: [text],
                target_lang: target.code(),
            })
            .send()
            .await
            .map_err(connectivity)?;

        if !response.status().is_success() {
            return Err(error_from_response(response).await);
        }

        let body: TextResponse = response
            .json()
            .await
            .map_err(|e| TranslationError::InvalidResponse(e.to_string()))?;

        let translation = body.translations.into_iter().next().ok_or_else(|| {
            TranslationError::InvalidResponse("response contained no translations".to_string())
        })?;

        Ok(TranslatedText {
            text: translation.text,
            detected_source_language: translation.detected_source_language,
        })
    }

    async fn translate_document(
        &self,
        document: DocumentUpload,
        target: TargetLanguage,
    ) -> Result<TranslatedDocument, TranslationError> {
        let format = SupportedFormat::from_file_name(&document.file_name)?;
        let output_name = translated_file_name(target, &document.file_name);

        let file = Part::bytes(document.bytes.to_vec())
            .file_name(document.file_name.clone())
            .mime_str(format.mime_type())
            .map_err(|e| TranslationError::InvalidResponse(e.to_string()))?;
        let form = Form::new()
            .text("target_lang", target.code())
            .text("filename", document.file_name.clone())
            .part("file", file);

        let response = self
            .client
            .post(self.url("/v2/document"))
            .headers(self.build_headers()?)
            .multipart(form)
            .send()
            .await
            .map_err(connectivity)?;

        if !response.status().is_success() {
            return Err(error_from_response(response).await);
        }

        let handle: DocumentHandle = response
            .json()
            .await
            .map_err(|e| TranslationError::InvalidResponse(e.to_string()))?;
        info!(document_id = %handle.document_id, target_lang = target.code(), "Document uploaded for translation");

        self.wait_for_document(&handle).await?;

        let response = self
            .client
            .post(self.url(&format!("/v2/document/{}/result", handle.document_id)))
            .headers(self.build_headers()?)
            .json(&DocumentKey {
                document_key: &handle.document_key,
            })
            .send()
            .await
            .map_err(connectivity)?;

        if !response.status().is_success() {
            return Err(error_from_response(response).await);
        }

        let bytes = response.bytes().await.map_err(connectivity)?;
        info!(document_id = %handle.document_id, size = bytes.len(), "Document translation downloaded");

        Ok(TranslatedDocument {
            file_name: output_name,
            bytes,
        })
    }
}

fn connectivity(e: reqwest::Error) -> TranslationError {
    TranslationError::Connectivity(e.to_string())
}

/// Map a non-success response onto the error taxonomy
async fn error_from_response(response: reqwest::Response) -> TranslationError {
    let status = response.status().as_u16();
    let body = response.text().await.unwrap_or_default();
    let message = serde_json::from_str::<ApiErrorBody>(&body)
        .ok()
        .and_then(|b| b.message)
        .unwrap_or(body);

    match status {
        403 => TranslationError::Authorization,
        429 => TranslationError::TooManyRequests,
        456 => TranslationError::QuotaExceeded,
        _ if is_same_language(&message) => TranslationError::SameLanguage(message),
        _ => TranslationError::Api { status, message },
    }
}

fn classify_document_error(message: String) -> TranslationError {
    if is_same_language(&message) {
        TranslationError::SameLanguage(message)
    } else {
        TranslationError::DocumentFailed(message)
    }
}

fn is_same_language(message: &str) -> bool {
    let lower = message.to_ascii_lowercase();
    lower.contains("source and target language") || lower.contains("same language")
}
