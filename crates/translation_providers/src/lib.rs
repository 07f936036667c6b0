//! Translation providers crate for the external translation service
//!
//! The portal treats translation as an opaque collaborator: it hands over
//! text or a document together with a target language and gets back the
//! translated text or document, or a typed [`TranslationError`].
//!
//! # Usage
//!
//! ```rust,ignore
//! use translation_providers::{DeepLConfig, DeepLProvider, TargetLanguage, TranslationProvider};
//!
//! async fn example() -> Result<(), translation_providers::TranslationError> {
//!     let provider = DeepLProvider::new(DeepLConfig::new(
//!         "https://api-free.deepl.com".to_string(),
//!         "my-key:fx".to_string(),
//!     ))?;
//!     let translated = provider
//!         .translate_text("Guten Morgen", TargetLanguage::EnglishBritish)
//!         .await?;
//!     println!("{}", translated.text);
//!     Ok(())
//! }
//! ```

pub mod deepl;
pub mod mock;
pub mod models;

use async_trait::async_trait;

// Re-export commonly used types for convenience
pub use deepl::{DeepLConfig, DeepLProvider};
pub use mock::MockTranslationProvider;
pub use models::{
    translated_file_name, DocumentUpload, SupportedFormat, TargetLanguage, TranslatedDocument,
    TranslatedText, TranslationError, UnknownLanguage,
};

#[async_trait]
pub trait TranslationProvider: Send + Sync {
    /// Translates a block of text into the target language
    async fn translate_text(
        &self,
        text: &str,
        target: TargetLanguage,
    ) -> Result<TranslatedText, TranslationError>;

    /// Translates a whole document, preserving its format
    ///
    /// The returned document is named `{CODE}_{original name}`.
    async fn translate_document(
        &self,
        document: DocumentUpload,
        target: TargetLanguage,
    ) -> Result<TranslatedDocument, TranslationError>;
}
