use bytes::Bytes;
use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr};
use thiserror::Error;

/// Target languages offered to users.
///
/// Serialized as the provider language code (for example `EN-US`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum TargetLanguage {
    EnglishAmerican,
    EnglishBritish,
    Japanese,
    German,
    French,
    PortugueseBrazilian,
    PortugueseEuropean,
    Spanish,
    Finnish,
    Indonesian,
    Italian,
    Latvian,
    Dutch,
    Polish,
    Russian,
    Slovenian,
    Swedish,
    Turkish,
    ChineseSimplified,
    ChineseTraditional,
}

impl TargetLanguage {
    const ALL: [TargetLanguage; 20] = [
        Self::EnglishAmerican,
        Self::EnglishBritish,
        Self::Japanese,
        Self::German,
        Self::French,
        Self::PortugueseBrazilian,
        Self::PortugueseEuropean,
        Self::Spanish,
        Self::Finnish,
        Self::Indonesian,
        Self::Italian,
        Self::Latvian,
        Self::Dutch,
        Self::Polish,
        Self::Russian,
        Self::Slovenian,
        Self::Swedish,
        Self::Turkish,
        Self::ChineseSimplified,
        Self::ChineseTraditional,
    ];

    /// Every supported target, in the order they are presented
    pub fn all() -> &'static [TargetLanguage] {
        &Self::ALL
    }

    pub fn code(&self) -> &'static str {
        match self {
            Self::EnglishAmerican => "EN-US",
            Self::EnglishBritish => "EN-GB",
            Self::Japanese => "JA",
            Self::German => "DE",
            Self::French => "FR",
            Self::PortugueseBrazilian => "PT-BR",
            Self::PortugueseEuropean => "PT-PT",
            Self::Spanish => "ES",
            Self::Finnish => "FI",
            Self::Indonesian => "ID",
            Self::Italian => "IT",
            Self::Latvian => "LV",
            Self::Dutch => "NL",
            Self::Polish => "PL",
            Self::Russian => "RU",
            Self::Slovenian => "SL",
            Self::Swedish => "SV",
            Self::Turkish => "TR",
            Self::ChineseSimplified => "ZH-HANS",
            Self::ChineseTraditional => "ZH-HANT",
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            Self::EnglishAmerican => "English (American)",
            Self::EnglishBritish => "English (British)",
            Self::Japanese => "Japanese",
            Self::German => "German",
            Self::French => "French",
            Self::PortugueseBrazilian => "Portuguese (Brazilian)",
            Self::PortugueseEuropean => "Portuguese (European)",
            Self::Spanish => "Spanish",
            Self::Finnish => "Finnish",
            Self::Indonesian => "Indonesian",
            Self::Italian => "Italian",
            Self::Latvian => "Latvian",
            Self::Dutch => "Dutch",
            Self::Polish => "Polish",
            Self::Russian => "Russian",
            Self::Slovenian => "Slovenian",
            Self::Swedish => "Swedish",
            Self::Turkish => "Turkish",
            Self::ChineseSimplified => "Chinese (simplified)",
            Self::ChineseTraditional => "Chinese (traditional)",
        }
    }

    /// Language part of the code, without any regional variant
    pub fn base_code(&self) -> &'static str {
        self.code().split('-').next().unwrap_or_default()
    }
}

impl fmt::Display for TargetLanguage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Unknown target language: {0}")]
pub struct UnknownLanguage(pub String);

impl FromStr for TargetLanguage {
    type Err = UnknownLanguage;

    /// Accepts either the language code or the display name, ignoring case
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim();
        Self::ALL
            .iter()
            .copied()
            .find(|lang| {
                lang.code().eq_ignore_ascii_case(wanted)
                    || lang.display_name().eq_ignore_ascii_case(wanted)
            })
            .ok_or_else(|| UnknownLanguage(s.to_string()))
    }
}

impl TryFrom<String> for TargetLanguage {
    type Error = UnknownLanguage;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<TargetLanguage> for String {
    fn from(lang: TargetLanguage) -> Self {
        lang.code().to_string()
    }
}

/// Document formats the provider accepts
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SupportedFormat {
    Pdf,
    Docx,
    Pptx,
    Xlsx,
    Txt,
    Html,
}

impl SupportedFormat {
    /// Determine the format from a file name's extension
    pub fn from_file_name(file_name: &str) -> Result<Self, TranslationError> {
        let extension = file_name
            .rsplit_once('.')
            .map(|(_, ext)| ext.to_ascii_lowercase())
            .unwrap_or_default();

        match extension.as_str() {
            "pdf" => Ok(Self::Pdf),
            "docx" => Ok(Self::Docx),
            "pptx" => Ok(Self::Pptx),
            "xlsx" => Ok(Self::Xlsx),
            "txt" => Ok(Self::Txt),
            "html" | "htm" => Ok(Self::Html),
            _ => Err(TranslationError::UnsupportedFormat(if extension.is_empty() {
                file_name.to_string()
            } else {
                extension
            })),
        }
    }

    pub fn mime_type(&self) -> &'static str {
        match self {
            Self::Pdf => "application/pdf",
            Self::Docx => {
                "application/vnd.openxmlformats-officedocument.wordprocessingml.document"
            }
            Self::Pptx => {
                "application/vnd.openxmlformats-officedocument.presentationml.presentation"
            }
            Self::Xlsx => "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet",
            Self::Txt => "text/plain",
            Self::Html => "text/html",
        }
    }
}

/// A document submitted for translation
#[derive(Debug, Clone)]
pub struct DocumentUpload {
    pub file_name: String,
    pub bytes: Bytes,
}

/// Result of a text translation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TranslatedText {
    pub text: String,
    pub detected_source_language: Option<String>,
}

/// Result of a document translation
#[derive(Debug, Clone)]
pub struct TranslatedDocument {
    pub file_name: String,
    pub bytes: Bytes,
}

/// Name given to a translated file: the target code prefixed to the original name
pub fn translated_file_name(target: TargetLanguage, original: &str) -> String {
    let base = original
        .rsplit(['/', '\\'])
        .next()
        .filter(|name| !name.is_empty())
        .unwrap_or("document");
    format!("{}_{}", target.code(), base)
}

#[derive(Debug, Error)]
pub enum TranslationError {
    #[error("Unsupported document format: {0}")]
    UnsupportedFormat(String),
    #[error("Source and target language are the same: {0}")]
    SameLanguage(String),
    #[error("Could not reach the translation service: {0}")]
    Connectivity(String),
    #[error("Translation service rejected the API key")]
    Authorization,
    #[error("Translation quota exceeded")]
    QuotaExceeded,
    #[error("Too many translation requests")]
    TooManyRequests,
    #[error("Document translation failed: {0}")]
    DocumentFailed(String),
    #[error("Document translation did not finish in time")]
    Timeout,
    #[error("Translation service returned HTTP {status}: {message}")]
    Api { status: u16, message: String },
    #[error("Invalid response from translation service: {0}")]
    InvalidResponse(String),
}
