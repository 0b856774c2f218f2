use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Text of one PDF page, tagged with where it came from
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageRecord {
    pub text: String,
    pub metadata: ChunkMetadata,
}

/// Pages of a source document plus its content fingerprint
#[derive(Debug, Clone)]
pub struct LoadedDocument {
    pub pages: Vec<PageRecord>,
    /// Hex SHA-256 of the file bytes that were extracted
    pub sha256: String,
}

/// Metadata carried from a page onto every chunk cut from it
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChunkMetadata {
    pub source: String,
    /// 1-based page number
    pub page: u32,
}

/// Unit stored in the vector index
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Chunk {
    pub text: String,
    pub metadata: ChunkMetadata,
}

/// Search result with relevance score
#[derive(Debug, Clone)]
pub struct SearchHit {
    pub chunk: Chunk,
    pub relevance_score: f32,
}

/// Describes the knowledge base generation currently in service
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KnowledgeManifest {
    pub generation: String,
    pub source_path: PathBuf,
    pub source_sha256: String,
    pub page_count: usize,
    pub chunk_count: usize,
    pub embedding_model: String,
    pub vector_dim: usize,
    pub built_at: DateTime<Utc>,
}

/// Result of a successful build
#[derive(Debug, Clone)]
pub struct BuildSummary {
    pub page_count: usize,
    pub chunk_count: usize,
    pub manifest: KnowledgeManifest,
}

impl BuildSummary {
    /// Human-readable message returned by the learn operation
    pub fn message(&self) -> String {
        format!(
            "Success: Ingested {} pages of manual context ({} chunks). Ready for consulting questions.",
            self.page_count, self.chunk_count
        )
    }
}
