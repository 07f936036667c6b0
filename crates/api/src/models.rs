use serde::{Deserialize, Serialize};
use services::auth::UserIdentity;
use translation_providers::{TargetLanguage, TranslatedText};
use utoipa::ToSchema;

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ErrorResponse {
    pub error: ErrorDetail,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ErrorDetail {
    pub message: String,
    pub r#type: String,
    pub param: Option<String>,
    pub code: Option<String>,
}

impl ErrorResponse {
    pub fn new(message: String, error_type: String) -> Self {
        Self {
            error: ErrorDetail {
                message,
                r#type: error_type,
                param: None,
                code: None,
            },
        }
    }

    pub fn with_param(message: String, error_type: String, param: String) -> Self {
        Self {
            error: ErrorDetail {
                message,
                r#type: error_type,
                param: Some(param),
                code: None,
            },
        }
    }

    pub fn with_code(mut self, code: &str) -> Self {
        self.error.code = Some(code.to_string());
        self
    }
}

/// Signed-in user as returned by `/auth/me`
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct UserResponse {
    /// Best available display name
    pub name: String,
    pub id: Option<String>,
    pub display_name: Option<String>,
    pub user_principal_name: Option<String>,
    pub mail: Option<String>,
    pub job_title: Option<String>,
}

impl From<UserIdentity> for UserResponse {
    fn from(identity: UserIdentity) -> Self {
        Self {
            name: identity.name().to_string(),
            id: identity.id,
            display_name: identity.display_name,
            user_principal_name: identity.user_principal_name,
            mail: identity.mail,
            job_title: identity.job_title,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct LanguageInfo {
    /// Language code, e.g. `EN-GB`
    pub code: String,
    /// Human-readable name, e.g. `English (British)`
    pub name: String,
}

impl From<TargetLanguage> for LanguageInfo {
    fn from(language: TargetLanguage) -> Self {
        Self {
            code: language.code().to_string(),
            name: language.display_name().to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct LanguagesResponse {
    pub languages: Vec<LanguageInfo>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct TranslateTextRequest {
    pub text: String,
    /// Language code or display name
    pub target_language: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct TranslateTextResponse {
    pub translated_text: String,
    pub detected_source_language: Option<String>,
    pub target_language: String,
}

impl TranslateTextResponse {
    pub fn new(translated: TranslatedText, target: TargetLanguage) -> Self {
        Self {
            translated_text: translated.text,
            detected_source_language: translated.detected_source_language,
            target_language: target.code().to_string(),
        }
    }
}

/// Multipart form accepted by `/v1/translate/document`
#[derive(ToSchema)]
#[allow(dead_code)]
pub struct TranslateDocumentForm {
    /// Language code or display name
    pub target_language: String,
    /// The document to translate
    #[schema(value_type = String, format = Binary)]
    pub file: Vec<u8>,
}
