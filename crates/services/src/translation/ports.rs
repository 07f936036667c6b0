use async_trait::async_trait;
#[cfg(any(test, feature = "test-mocks"))]
use mockall::automock;
use translation_providers::{
    DocumentUpload, TargetLanguage, TranslatedDocument, TranslatedText, TranslationError,
};

#[derive(Debug, thiserror::Error)]
pub enum TranslationServiceError {
    #[error("Enter some text to translate")]
    EmptyText,

    #[error("The uploaded document is empty")]
    EmptyDocument,

    #[error("Document is {size} bytes, the limit is {limit} bytes")]
    DocumentTooLarge { size: usize, limit: usize },

    #[error("Translation is not configured")]
    NotConfigured,

    #[error(transparent)]
    Provider(#[from] TranslationError),
}

#[cfg_attr(any(test, feature = "test-mocks"), automock)]
#[async_trait]
pub trait TranslationServiceTrait: Send + Sync {
    async fn translate_text(
        &self,
        text: String,
        target: TargetLanguage,
    ) -> Result<TranslatedText, TranslationServiceError>;

    async fn translate_document(
        &self,
        document: DocumentUpload,
        target: TargetLanguage,
    ) -> Result<TranslatedDocument, TranslationServiceError>;

    /// Target languages offered to users
    fn languages(&self) -> Vec<TargetLanguage>;

    fn is_configured(&self) -> bool;
}
