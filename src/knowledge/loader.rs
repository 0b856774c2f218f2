use sha2::{Digest, Sha256};
use std::path::Path;

use tracing::{debug, info};

use crate::config::KnowledgeConfig;
use crate::error::KnowledgeError;
use crate::knowledge::types::{ChunkMetadata, LoadedDocument, PageRecord};

/// Placeholder text recorded for pages without extractable text
pub const EMPTY_PAGE_PLACEHOLDER: &str = "(no text on this page)";

/// Reads a PDF page by page into [`PageRecord`]s
pub struct PdfLoader {
    source_label: String,
    watch_terms: Vec<String>,
}

impl PdfLoader {
    pub fn new(config: &KnowledgeConfig) -> Self {
        Self {
            source_label: config.source_label.clone(),
            watch_terms: config.watch_terms.clone(),
        }
    }

    /// Extract one record per page, in page order. The file is read once;
    /// hashing and extraction run off the async executor.
    pub async fn load(&self, path: &Path) -> Result<LoadedDocument, KnowledgeError> {
        if !path.exists() {
            return Err(KnowledgeError::SourceNotFound(path.to_path_buf()));
        }

        info!(path = %path.display(), "Reading PDF");

        // pdf-extract is synchronous and may panic on malformed input
        let owned = path.to_path_buf();
        let (texts, sha256) = tokio::task::spawn_blocking(move || {
            let bytes = std::fs::read(&owned)
                .map_err(|e| KnowledgeError::Extraction(format!("failed to read source: {}", e)))?;
            let sha256 = hex::encode(Sha256::digest(&bytes));
            let texts = pdf_extract::extract_text_from_mem_by_pages(&bytes)
                .map_err(|e| KnowledgeError::Extraction(e.to_string()))?;
            Ok::<_, KnowledgeError>((texts, sha256))
        })
        .await
        .map_err(|e| KnowledgeError::Extraction(format!("PDF parser aborted: {}", e)))??;

        info!(pages = texts.len(), "Extracted PDF pages");
        Ok(LoadedDocument {
            pages: self.pages_from_texts(texts)?,
            sha256,
        })
    }

    /// Build page records from raw per-page text
    pub fn pages_from_texts(&self, texts: Vec<String>) -> Result<Vec<PageRecord>, KnowledgeError> {
        if texts.iter().all(|t| t.trim().is_empty()) {
            return Err(KnowledgeError::EmptyCorpus);
        }

        let pages = texts
            .into_iter()
            .enumerate()
            .map(|(i, raw)| {
                let page = i as u32 + 1;
                let body = raw.trim();
                let body = if body.is_empty() {
                    debug!(page, "Page has no extractable text");
                    EMPTY_PAGE_PLACEHOLDER
                } else {
                    self.report_watch_terms(page, body);
                    body
                };

                PageRecord {
                    text: format!("[Manual Ref: Page {}]\n{}", page, body),
                    metadata: ChunkMetadata {
                        source: self.source_label.clone(),
                        page,
                    },
                }
            })
            .collect();

        Ok(pages)
    }

    fn report_watch_terms(&self, page: u32, text: &str) {
        for term in self.watch_terms.iter().filter(|t| text.contains(t.as_str())) {
            info!(page, term = %term, "Found tracked figure");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn loader() -> PdfLoader {
        PdfLoader::new(&KnowledgeConfig::default())
    }

    #[test]
    fn test_one_record_per_page_in_order() {
        let texts = vec![
            "First page".to_string(),
            "Second page".to_string(),
            "Third page".to_string(),
        ];
        let pages = loader().pages_from_texts(texts).unwrap();

        assert_eq!(pages.len(), 3);
        for (i, page) in pages.iter().enumerate() {
            assert_eq!(page.metadata.page, i as u32 + 1);
            assert_eq!(page.metadata.source, "manual_doc.pdf");
        }
        assert_eq!(pages[1].text, "[Manual Ref: Page 2]\nSecond page");
    }

    #[test]
    fn test_blank_pages_get_placeholder() {
        let texts = vec![
            "Cover".to_string(),
            "   \n ".to_string(),
            "Backlog of 330,000 work orders".to_string(),
        ];
        let pages = loader().pages_from_texts(texts).unwrap();

        assert_eq!(pages.len(), 3);
        assert!(pages[1].text.contains(EMPTY_PAGE_PLACEHOLDER));
        assert_eq!(pages[1].metadata.page, 2);
    }

    #[test]
    fn test_empty_corpus() {
        assert!(matches!(
            loader().pages_from_texts(vec![]),
            Err(KnowledgeError::EmptyCorpus)
        ));
        assert!(matches!(
            loader().pages_from_texts(vec![String::new(), "  ".to_string()]),
            Err(KnowledgeError::EmptyCorpus)
        ));
    }

    #[tokio::test]
    async fn test_missing_source() {
        let err = loader()
            .load(Path::new("/definitely/not/here/doc.pdf"))
            .await
            .unwrap_err();
        assert!(matches!(err, KnowledgeError::SourceNotFound(_)));
    }

    fn fixture(name: &str) -> std::path::PathBuf {
        Path::new(env!("CARGO_MANIFEST_DIR"))
            .join("tests/fixtures")
            .join(name)
    }

    #[tokio::test]
    async fn test_load_real_pdf_pages_in_order() {
        let path = fixture("three_pages.pdf");
        let doc = loader().load(&path).await.unwrap();

        assert_eq!(doc.pages.len(), 3);
        for (i, page) in doc.pages.iter().enumerate() {
            let number = i as u32 + 1;
            assert_eq!(page.metadata.page, number);
            assert_eq!(page.metadata.source, "manual_doc.pdf");
            assert!(page
                .text
                .starts_with(&format!("[Manual Ref: Page {}]\n", number)));
        }
        assert!(doc.pages[0].text.contains("housing authority"));
        assert_eq!(
            doc.pages[1].text,
            format!("[Manual Ref: Page 2]\n{}", EMPTY_PAGE_PLACEHOLDER)
        );
        assert!(doc.pages[2].text.contains("330,000"));

        let bytes = std::fs::read(&path).unwrap();
        assert_eq!(doc.sha256, hex::encode(Sha256::digest(&bytes)));
    }

    #[tokio::test]
    async fn test_garbage_file_is_extraction_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("doc.pdf");
        std::fs::write(&path, b"this is not a pdf").unwrap();

        let err = loader().load(&path).await.unwrap_err();
        assert!(matches!(err, KnowledgeError::Extraction(_)));
    }
}
