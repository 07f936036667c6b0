//! Translation service implementation
//!
//! Validates user input before handing it to the configured translation
//! provider, so empty or oversized submissions never leave the process.

pub mod ports;

use async_trait::async_trait;
use ports::{TranslationServiceError, TranslationServiceTrait};
use std::sync::Arc;
use tracing::{debug, info, warn};
use translation_providers::{
    SupportedFormat, TargetLanguage, TranslatedDocument, TranslatedText, TranslationProvider,
};

pub use translation_providers::DocumentUpload;

pub struct TranslationServiceImpl {
    provider: Option<Arc<dyn TranslationProvider>>,
    max_document_bytes: usize,
}

impl TranslationServiceImpl {
    pub fn new(provider: Arc<dyn TranslationProvider>, max_document_bytes: usize) -> Self {
        Self {
            provider: Some(provider),
            max_document_bytes,
        }
    }

    /// Service without a provider; every translation reports `NotConfigured`
    pub fn unconfigured() -> Self {
        Self {
            provider: None,
            max_document_bytes: 0,
        }
    }

    fn provider(&self) -> Result<&Arc<dyn TranslationProvider>, TranslationServiceError> {
        self.provider
            .as_ref()
            .ok_or(TranslationServiceError::NotConfigured)
    }
}

#[async_trait]
impl TranslationServiceTrait for TranslationServiceImpl {
    async fn translate_text(
        &self,
        text: String,
        target: TargetLanguage,
    ) -> Result<TranslatedText, TranslationServiceError> {
        if text.trim().is_empty() {
            return Err(TranslationServiceError::EmptyText);
        }
        let provider = self.provider()?;

        debug!("Translating {} characters into {}", text.chars().count(), target);
        let translated = provider.translate_text(&text, target).await.map_err(|e| {
            warn!("Text translation into {} failed: {}", target, e);
            e
        })?;
        Ok(translated)
    }

    async fn translate_document(
        &self,
        document: DocumentUpload,
        target: TargetLanguage,
    ) -> Result<TranslatedDocument, TranslationServiceError> {
        if document.bytes.is_empty() {
            return Err(TranslationServiceError::EmptyDocument);
        }
        let provider = self.provider()?;

        if document.bytes.len() > self.max_document_bytes {
            return Err(TranslationServiceError::DocumentTooLarge {
                size: document.bytes.len(),
                limit: self.max_document_bytes,
            });
        }
        SupportedFormat::from_file_name(&document.file_name)?;

        let size = document.bytes.len();
        let translated = provider
            .translate_document(document, target)
            .await
            .map_err(|e| {
                warn!("Document translation into {} failed: {}", target, e);
                e
            })?;

        info!(
            "Translated document of {} bytes into {} as {}",
            size, target, translated.file_name
        );
        Ok(translated)
    }

    fn languages(&self) -> Vec<TargetLanguage> {
        TargetLanguage::all().to_vec()
    }

    fn is_configured(&self) -> bool {
        self.provider.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;
    use translation_providers::{MockTranslationProvider, TranslationError};

    fn service(provider: Arc<MockTranslationProvider>) -> TranslationServiceImpl {
        TranslationServiceImpl::new(provider, 1024)
    }

    fn upload(name: &str, bytes: &'static [u8]) -> DocumentUpload {
        DocumentUpload {
            file_name: name.to_string(),
            bytes: Bytes::from_static(bytes),
        }
    }

    #[tokio::test]
    async fn test_translate_text() {
        let provider = Arc::new(MockTranslationProvider::new());
        let result = service(provider.clone())
            .translate_text("Guten Morgen".to_string(), TargetLanguage::EnglishBritish)
            .await
            .unwrap();

        assert_eq!(result.text, "[EN-GB] Guten Morgen");
        assert_eq!(provider.text_calls(), 1);
    }

    #[tokio::test]
    async fn test_blank_text_is_rejected_locally() {
        let provider = Arc::new(MockTranslationProvider::new());
        let err = service(provider.clone())
            .translate_text("   \n".to_string(), TargetLanguage::French)
            .await
            .unwrap_err();

        assert!(matches!(err, TranslationServiceError::EmptyText));
        assert_eq!(provider.text_calls(), 0);
    }

    #[tokio::test]
    async fn test_document_validation_happens_before_provider() {
        let provider = Arc::new(MockTranslationProvider::new());
        let service = service(provider.clone());

        assert!(matches!(
            service
                .translate_document(upload("memo.txt", b""), TargetLanguage::French)
                .await,
            Err(TranslationServiceError::EmptyDocument)
        ));
        assert!(matches!(
            service
                .translate_document(upload("memo.txt", &[b'a'; 2048]), TargetLanguage::French)
                .await,
            Err(TranslationServiceError::DocumentTooLarge { size: 2048, limit: 1024 })
        ));
        assert!(matches!(
            service
                .translate_document(upload("tool.exe", b"MZ"), TargetLanguage::French)
                .await,
            Err(TranslationServiceError::Provider(
                TranslationError::UnsupportedFormat(_)
            ))
        ));
        assert_eq!(provider.document_calls(), 0);
    }

    #[tokio::test]
    async fn test_translate_document() {
        let provider = Arc::new(MockTranslationProvider::new());
        let translated = service(provider)
            .translate_document(upload("Brief.docx", b"Hallo"), TargetLanguage::Japanese)
            .await
            .unwrap();

        assert_eq!(translated.file_name, "JA_Brief.docx");
        assert_eq!(translated.bytes, Bytes::from_static(b"[JA] Hallo"));
    }

    #[tokio::test]
    async fn test_provider_errors_pass_through() {
        let provider = Arc::new(MockTranslationProvider::with_source_language("FR"));
        let err = service(provider)
            .translate_document(upload("lettre.pdf", b"%PDF"), TargetLanguage::French)
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            TranslationServiceError::Provider(TranslationError::SameLanguage(_))
        ));
    }

    #[tokio::test]
    async fn test_unconfigured_service() {
        let service = TranslationServiceImpl::unconfigured();
        assert!(!service.is_configured());
        assert_eq!(service.languages().len(), 20);
        assert!(matches!(
            service
                .translate_text("Hallo".to_string(), TargetLanguage::German)
                .await,
            Err(TranslationServiceError::NotConfigured)
        ));
    }
}
