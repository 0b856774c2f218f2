use anyhow::Result;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::config::{Config, KnowledgeConfig};
use crate::embedding::{embed_in_batches, Embedder};
use crate::error::KnowledgeError;
use crate::knowledge::chunker::PageSplitter;
use crate::knowledge::loader::PdfLoader;
use crate::knowledge::store::{KnowledgeStore, SourceInfo};
use crate::knowledge::types::{BuildSummary, KnowledgeManifest, PageRecord, SearchHit};

/// Owns the ingestion path (PDF -> pages -> chunks -> vectors -> index) and
/// the query path (index -> nearest chunks -> context string)
pub struct KnowledgeManager {
    config: KnowledgeConfig,
    batch_size: usize,
    store: KnowledgeStore,
    loader: PdfLoader,
    splitter: PageSplitter,
    embedder: Arc<dyn Embedder>,
}

impl KnowledgeManager {
    pub fn new(config: &Config, root: impl Into<PathBuf>, embedder: Arc<dyn Embedder>) -> Self {
        Self {
            config: config.knowledge.clone(),
            batch_size: config.embedding.batch_size,
            store: KnowledgeStore::new(root),
            loader: PdfLoader::new(&config.knowledge),
            splitter: PageSplitter::new(&config.knowledge),
            embedder,
        }
    }

    /// Configured document used by the learn operation
    pub fn default_pdf_path(&self) -> &Path {
        &self.config.pdf_path
    }

    pub fn default_top_k(&self) -> usize {
        self.config.top_k
    }

    /// Rebuild the knowledge base from a PDF, replacing the previous one
    pub async fn build(&self, pdf_path: &Path) -> Result<BuildSummary, KnowledgeError> {
        let document = self.loader.load(pdf_path).await?;
        self.build_from_pages(pdf_path, document.sha256, document.pages)
            .await
    }

    /// Chunk, embed and persist already extracted pages
    pub async fn build_from_pages(
        &self,
        source_path: &Path,
        source_sha256: String,
        pages: Vec<PageRecord>,
    ) -> Result<BuildSummary, KnowledgeError> {
        if pages.is_empty() {
            return Err(KnowledgeError::EmptyCorpus);
        }

        let chunks = self.splitter.split_pages(&pages);
        if chunks.is_empty() {
            return Err(KnowledgeError::EmptyCorpus);
        }
        info!(
            pages = pages.len(),
            chunks = chunks.len(),
            "Split pages, computing embeddings"
        );

        let texts: Vec<String> = chunks.iter().map(|c| c.text.clone()).collect();
        let embeddings = embed_in_batches(self.embedder.as_ref(), &texts, self.batch_size)
            .await
            .map_err(KnowledgeError::IndexPersist)?;

        let source = SourceInfo {
            path: source_path.to_path_buf(),
            sha256: source_sha256,
            page_count: pages.len(),
            embedding_model: self.embedder.model_id().to_string(),
        };
        let manifest = self
            .store
            .replace(&source, &chunks, &embeddings)
            .await
            .map_err(KnowledgeError::IndexPersist)?;

        info!(
            generation = %manifest.generation,
            root = %self.store.root().display(),
            "Knowledge base built"
        );

        Ok(BuildSummary {
            page_count: pages.len(),
            chunk_count: chunks.len(),
            manifest,
        })
    }

    /// Nearest chunks for `text`. `Ok(None)` when no knowledge base exists yet.
    pub async fn search(&self, text: &str, k: usize) -> Result<Option<Vec<SearchHit>>> {
        let Some(snapshot) = self.store.open().await? else {
            return Ok(None);
        };

        if snapshot.manifest().embedding_model != self.embedder.model_id() {
            warn!(
                built_with = %snapshot.manifest().embedding_model,
                querying_with = %self.embedder.model_id(),
                "Knowledge base was built with a different embedding model"
            );
        }

        let query_embedding = self.embedder.embed(text).await?;
        let hits = snapshot.search(&query_embedding, k.max(1)).await?;
        Ok(Some(hits))
    }

    /// Retrieved context for a question: the texts of the `k` nearest chunks,
    /// most relevant first, separated by blank lines.
    ///
    /// Never fails: a missing index, an empty result, or any provider/index
    /// error all come back as `None`.
    pub async fn query(&self, text: &str, k: usize) -> Option<String> {
        match self.search(text, k).await {
            Ok(Some(hits)) if !hits.is_empty() => {
                debug!(hits = hits.len(), "Retrieved context");
                Some(
                    hits.iter()
                        .map(|h| h.chunk.text.as_str())
                        .collect::<Vec<_>>()
                        .join("\n\n"),
                )
            }
            Ok(Some(_)) => None,
            Ok(None) => {
                debug!("No knowledge base built yet");
                None
            }
            Err(e) => {
                warn!(error = %e, "Knowledge base query failed, continuing without context");
                None
            }
        }
    }

    /// Manifest of the knowledge base in service, if any
    pub fn status(&self) -> Result<Option<KnowledgeManifest>> {
        self.store.current_manifest()
    }
}
