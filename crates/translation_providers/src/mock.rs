//! Mock implementation of TranslationProvider for testing
//!
//! Produces deterministic translations without contacting the real service,
//! which also lets the portal run locally without an API key.

use crate::{
    models::{translated_file_name, SupportedFormat},
    DocumentUpload, TargetLanguage, TranslatedDocument, TranslatedText, TranslationError,
    TranslationProvider,
};
use async_trait::async_trait;
use bytes::{BufMut, Bytes, BytesMut};
use std::sync::atomic::{AtomicUsize, Ordering};

/// Deterministic provider that tags its input with the target code
pub struct MockTranslationProvider {
    source_language: String,
    text_calls: AtomicUsize,
    document_calls: AtomicUsize,
}

impl Default for MockTranslationProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl MockTranslationProvider {
    /// Mock that pretends every input is German
    pub fn new() -> Self {
        Self::with_source_language("DE")
    }

    /// Mock that reports `code` as the detected source language.
    ///
    /// Documents whose target shares that language are rejected the way the
    /// real service rejects them.
    pub fn with_source_language(code: impl Into<String>) -> Self {
        Self {
            source_language: code.into().to_ascii_uppercase(),
            text_calls: AtomicUsize::new(0),
            document_calls: AtomicUsize::new(0),
        }
    }

    pub fn text_calls(&self) -> usize {
        self.text_calls.load(Ordering::SeqCst)
    }

    pub fn document_calls(&self) -> usize {
        self.document_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl TranslationProvider for MockTranslationProvider {
    async fn translate_text(
        &self,
        text: &str,
        target: TargetLanguage,
    ) -> Result<TranslatedText, TranslationError> {
        self.text_calls.fetch_add(1, Ordering::SeqCst);
        Ok(TranslatedText {
            text: format!("[{}] {}", target.code(), text),
            detected_source_language: Some(self.source_language.clone()),
        })
    }

    async fn translate_document(
        &self,
        document: DocumentUpload,
        target: TargetLanguage,
    ) -> Result<TranslatedDocument, TranslationError> {
        self.document_calls.fetch_add(1, Ordering::SeqCst);
        SupportedFormat::from_file_name(&document.file_name)?;

        if target.base_code() == self.source_language {
            return Err(TranslationError::SameLanguage(format!(
                "document is already in {}",
                target.display_name()
            )));
        }

        let mut bytes = BytesMut::with_capacity(document.bytes.len() + 8);
        bytes.put_slice(format!("[{}] ", target.code()).as_bytes());
        bytes.put_slice(&document.bytes);

        Ok(TranslatedDocument {
            file_name: translated_file_name(target, &document.file_name),
            bytes: Bytes::from(bytes),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_mock_text_translation_is_tagged() {
        let provider = MockTranslationProvider::new();
        let result = provider
            .translate_text("Hallo", TargetLanguage::Japanese)
            .await
            .unwrap();

        assert_eq!(result.text, "[JA] Hallo");
        assert_eq!(result.detected_source_language.as_deref(), Some("DE"));
        assert_eq!(provider.text_calls(), 1);
    }

    #[tokio::test]
    async fn test_mock_document_rejects_same_language() {
        let provider = MockTranslationProvider::with_source_language("en");
        let document = DocumentUpload {
            file_name: "memo.txt".to_string(),
            bytes: Bytes::from_static(b"hello"),
        };

        let err = provider
            .translate_document(document.clone(), TargetLanguage::EnglishBritish)
            .await
            .unwrap_err();
        assert!(matches!(err, TranslationError::SameLanguage(_)));

        let ok = provider
            .translate_document(document, TargetLanguage::Spanish)
            .await
            .unwrap();
        assert_eq!(ok.file_name, "ES_memo.txt");
        assert_eq!(ok.bytes, Bytes::from_static(b"[ES] hello"));
        assert_eq!(provider.document_calls(), 2);
    }
}
