use anyhow::{Context, Result};
use arrow_array::{
    Array, FixedSizeListArray, Float32Array, Int32Array, RecordBatch, StringArray,
};
use arrow_schema::{DataType, Field, Schema};
use chrono::Utc;
use futures::TryStreamExt;
use lancedb::{
    connect,
    index::Index,
    query::{ExecutableQuery, QueryBase},
    Connection, DistanceType,
};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::knowledge::types::{Chunk, ChunkMetadata, KnowledgeManifest, SearchHit};
use crate::vector_optimizer::VectorOptimizer;

const TABLE_NAME: &str = "knowledge_chunks";
const CURRENT_POINTER: &str = "CURRENT";
const GENERATIONS_DIR: &str = "generations";
const MANIFEST_FILE: &str = "manifest.json";
const LANCE_DIR: &str = "lance";

/// What the manager knows about the document being indexed
#[derive(Debug, Clone)]
pub struct SourceInfo {
    pub path: PathBuf,
    pub sha256: String,
    pub page_count: usize,
    pub embedding_model: String,
}

/// The single knowledge base slot on disk.
///
/// Every build goes into a fresh generation directory; `CURRENT` is swapped
/// atomically once the generation is complete, so readers either see the old
/// generation or the new one.
pub struct KnowledgeStore {
    root: PathBuf,
}

/// One opened, immutable generation
pub struct KnowledgeSnapshot {
    db: Connection,
    manifest: KnowledgeManifest,
}

impl KnowledgeStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn generations_dir(&self) -> PathBuf {
        self.root.join(GENERATIONS_DIR)
    }

    /// Directory of the generation `CURRENT` points at, if any
    pub fn current_generation(&self) -> Result<Option<PathBuf>> {
        let pointer = self.root.join(CURRENT_POINTER);
        if !pointer.exists() {
            return Ok(None);
        }

        let name = std::fs::read_to_string(&pointer)
            .with_context(|| format!("Failed to read {}", pointer.display()))?;
        let name = name.trim();
        if name.is_empty() {
            return Ok(None);
        }

        let dir = self.generations_dir().join(name);
        Ok(dir.exists().then_some(dir))
    }

    /// Read the manifest of the current generation without opening the table
    pub fn current_manifest(&self) -> Result<Option<KnowledgeManifest>> {
        match self.current_generation()? {
            Some(dir) => Ok(Some(read_manifest(&dir)?)),
            None => Ok(None),
        }
    }

    /// Open the current generation for searching; `None` until the first build
    pub async fn open(&self) -> Result<Option<KnowledgeSnapshot>> {
        let Some(dir) = self.current_generation()? else {
            return Ok(None);
        };

        let manifest = read_manifest(&dir)?;
        let db = connect(path_str(&dir.join(LANCE_DIR))?).execute().await?;

        Ok(Some(KnowledgeSnapshot { db, manifest }))
    }

    /// Build a new generation from chunks and their vectors and make it current.
    /// Replaces whatever was there before; nothing is merged.
    pub async fn replace(
        &self,
        source: &SourceInfo,
        chunks: &[Chunk],
        embeddings: &[Vec<f32>],
    ) -> Result<KnowledgeManifest> {
        if chunks.len() != embeddings.len() {
            anyhow::bail!(
                "{} chunks but {} embeddings",
                chunks.len(),
                embeddings.len()
            );
        }
        let vector_dim = embeddings.first().map(|e| e.len()).unwrap_or(0);
        if vector_dim == 0 {
            anyhow::bail!("Cannot build a knowledge base without embeddings");
        }
        if embeddings.iter().any(|e| e.len() != vector_dim) {
            anyhow::bail!("Embedding provider returned vectors of differing dimensions");
        }

        let generation = uuid::Uuid::new_v4().to_string();
        let dir = self.generations_dir().join(&generation);
        std::fs::create_dir_all(&dir)?;

        let manifest = KnowledgeManifest {
            generation: generation.clone(),
            source_path: source.path.clone(),
            source_sha256: source.sha256.clone(),
            page_count: source.page_count,
            chunk_count: chunks.len(),
            embedding_model: source.embedding_model.clone(),
            vector_dim,
            built_at: Utc::now(),
        };

        if let Err(e) = self.write_generation(&dir, &manifest, chunks, embeddings).await {
            let _ = std::fs::remove_dir_all(&dir);
            return Err(e);
        }

        self.swap_current(&generation)?;
        info!(
            generation = %generation,
            chunks = chunks.len(),
            "Knowledge base generation is now current"
        );

        self.prune_generations(&generation);

        Ok(manifest)
    }

    async fn write_generation(
        &self,
        dir: &Path,
        manifest: &KnowledgeManifest,
        chunks: &[Chunk],
        embeddings: &[Vec<f32>],
    ) -> Result<()> {
        let db = connect(path_str(&dir.join(LANCE_DIR))?).execute().await?;

        let batch = build_batch(chunks, embeddings, manifest.vector_dim)?;

        use arrow::record_batch::RecordBatchIterator;
        use std::iter::once;
        let schema = batch.schema();
        let batch_reader = RecordBatchIterator::new(once(Ok(batch)), schema);
        let table = db.create_table(TABLE_NAME, batch_reader).execute().await?;

        let index_params =
            VectorOptimizer::calculate_index_params(chunks.len(), manifest.vector_dim);
        if index_params.should_create_index {
            info!(
                rows = chunks.len(),
                partitions = index_params.num_partitions,
                sub_vectors = index_params.num_sub_vectors,
                "Creating vector index"
            );
            table
                .create_index(
                    &["embedding"],
                    Index::IvfPq(
                        lancedb::index::vector::IvfPqIndexBuilder::default()
                            .distance_type(index_params.distance_type)
                            .num_partitions(index_params.num_partitions)
                            .num_sub_vectors(index_params.num_sub_vectors)
                            .num_bits(index_params.num_bits as u32),
                    ),
                )
                .execute()
                .await?;
        } else {
            debug!(rows = chunks.len(), "Skipping vector index, flat search is faster");
        }

        let manifest_json = serde_json::to_vec_pretty(manifest)?;
        std::fs::write(dir.join(MANIFEST_FILE), manifest_json)?;

        Ok(())
    }

    /// Write the pointer to a temp file and rename it over `CURRENT`
    fn swap_current(&self, generation: &str) -> Result<()> {
        let tmp = self.root.join(format!("{}.{}.tmp", CURRENT_POINTER, generation));
        std::fs::write(&tmp, generation)?;
        std::fs::rename(&tmp, self.root.join(CURRENT_POINTER))
            .context("Failed to swap knowledge base pointer")?;
        Ok(())
    }

    /// Keep the current generation and the newest superseded one, which an
    /// in-flight reader may still hold; delete the rest. Generations without
    /// a manifest are still being written by a concurrent build and are left
    /// alone.
    fn prune_generations(&self, current: &str) {
        let Ok(entries) = std::fs::read_dir(self.generations_dir()) else {
            return;
        };

        let mut stale: Vec<(std::time::SystemTime, PathBuf)> = entries
            .filter_map(|e| e.ok())
            .filter(|e| e.file_name().to_string_lossy() != current)
            .filter(|e| e.path().join(MANIFEST_FILE).exists())
            .map(|e| {
                let modified = e
                    .metadata()
                    .and_then(|m| m.modified())
                    .unwrap_or(std::time::UNIX_EPOCH);
                (modified, e.path())
            })
            .collect();

        stale.sort_by(|a, b| b.0.cmp(&a.0));
        for (_, path) in stale.into_iter().skip(1) {
            if let Err(e) = std::fs::remove_dir_all(&path) {
                warn!(path = %path.display(), error = %e, "Failed to remove stale generation");
            }
        }
    }
}

impl KnowledgeSnapshot {
    pub fn manifest(&self) -> &KnowledgeManifest {
        &self.manifest
    }

    /// k nearest chunks by cosine distance, most relevant first
    pub async fn search(&self, query_embedding: &[f32], limit: usize) -> Result<Vec<SearchHit>> {
        if query_embedding.len() != self.manifest.vector_dim {
            anyhow::bail!(
                "Query vector has {} dimensions, index was built with {}",
                query_embedding.len(),
                self.manifest.vector_dim
            );
        }

        let table = self.db.open_table(TABLE_NAME).execute().await?;

        let query = table
            .vector_search(query_embedding)?
            .distance_type(DistanceType::Cosine)
            .limit(limit);

        let mut results = query.execute().await?;
        let mut hits = Vec::new();

        while let Some(batch) = results.try_next().await? {
            if batch.num_rows() == 0 {
                continue;
            }

            let sources = column::<StringArray>(&batch, "source")?;
            let pages = column::<Int32Array>(&batch, "page")?;
            let contents = column::<StringArray>(&batch, "content")?;
            let distances = column::<Float32Array>(&batch, "_distance")?;

            for i in 0..batch.num_rows() {
                hits.push(SearchHit {
                    chunk: Chunk {
                        text: contents.value(i).to_string(),
                        metadata: ChunkMetadata {
                            source: sources.value(i).to_string(),
                            page: pages.value(i).max(0) as u32,
                        },
                    },
                    relevance_score: 1.0 - distances.value(i),
                });
            }
        }

        hits.sort_by(|a, b| b.relevance_score.total_cmp(&a.relevance_score));
        hits.truncate(limit);

        Ok(hits)
    }

    #[cfg(test)]
    pub async fn count_chunks(&self) -> Result<usize> {
        let table = self.db.open_table(TABLE_NAME).execute().await?;
        Ok(table.count_rows(None).await?)
    }
}

fn schema(vector_dim: usize) -> Arc<Schema> {
    Arc::new(Schema::new(vec![
        Field::new("id", DataType::Utf8, false),
        Field::new("source", DataType::Utf8, false),
        Field::new("page", DataType::Int32, false),
        Field::new("chunk_index", DataType::Int32, false),
        Field::new("content", DataType::Utf8, false),
        Field::new(
            "embedding",
            DataType::FixedSizeList(
                Arc::new(Field::new("item", DataType::Float32, true)),
                vector_dim as i32,
            ),
            false,
        ),
    ]))
}

fn build_batch(chunks: &[Chunk], embeddings: &[Vec<f32>], vector_dim: usize) -> Result<RecordBatch> {
    let ids: Vec<String> = chunks
        .iter()
        .map(|_| uuid::Uuid::new_v4().to_string())
        .collect();
    let sources: Vec<&str> = chunks.iter().map(|c| c.metadata.source.as_str()).collect();
    let pages: Vec<i32> = chunks.iter().map(|c| c.metadata.page as i32).collect();
    let chunk_indices: Vec<i32> = (0..chunks.len() as i32).collect();
    let contents: Vec<&str> = chunks.iter().map(|c| c.text.as_str()).collect();

    let embedding_values: Vec<f32> = embeddings.iter().flat_map(|e| e.iter().copied()).collect();
    let embedding_array = FixedSizeListArray::try_new(
        Arc::new(Field::new("item", DataType::Float32, true)),
        vector_dim as i32,
        Arc::new(Float32Array::from(embedding_values)),
        None,
    )?;

    let batch = RecordBatch::try_new(
        schema(vector_dim),
        vec![
            Arc::new(StringArray::from(ids)),
            Arc::new(StringArray::from(sources)),
            Arc::new(Int32Array::from(pages)),
            Arc::new(Int32Array::from(chunk_indices)),
            Arc::new(StringArray::from(contents)),
            Arc::new(embedding_array),
        ],
    )?;

    Ok(batch)
}

fn column<'a, T: Array + 'static>(batch: &'a RecordBatch, name: &str) -> Result<&'a T> {
    batch
        .column_by_name(name)
        .and_then(|col| col.as_any().downcast_ref::<T>())
        .ok_or_else(|| anyhow::anyhow!("{} column not found or wrong type", name))
}

fn read_manifest(dir: &Path) -> Result<KnowledgeManifest> {
    let path = dir.join(MANIFEST_FILE);
    let content = std::fs::read_to_string(&path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    Ok(serde_json::from_str(&content)?)
}

fn path_str(path: &Path) -> Result<&str> {
    path.to_str()
        .ok_or_else(|| anyhow::anyhow!("Non UTF-8 path: {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chunk(text: &str, page: u32) -> Chunk {
        Chunk {
            text: text.to_string(),
            metadata: ChunkMetadata {
                source: "manual_doc.pdf".to_string(),
                page,
            },
        }
    }

    fn source(pages: usize) -> SourceInfo {
        SourceInfo {
            path: PathBuf::from("doc.pdf"),
            sha256: "00".repeat(32),
            page_count: pages,
            embedding_model: "test:axes".to_string(),
        }
    }

    #[tokio::test]
    async fn test_open_before_first_build() {
        let dir = tempfile::tempdir().unwrap();
        let store = KnowledgeStore::new(dir.path().join("knowledge"));

        assert!(store.current_generation().unwrap().is_none());
        assert!(store.open().await.unwrap().is_none());
        assert!(store.current_manifest().unwrap().is_none());
    }

    #[tokio::test]
    async fn test_search_orders_by_similarity() {
        let dir = tempfile::tempdir().unwrap();
        let store = KnowledgeStore::new(dir.path());

        let chunks = vec![chunk("east", 1), chunk("north", 2), chunk("north-east", 3)];
        let embeddings = vec![
            vec![1.0, 0.0, 0.0],
            vec![0.0, 1.0, 0.0],
            vec![0.7, 0.7, 0.1],
        ];
        let manifest = store
            .replace(&source(3), &chunks, &embeddings)
            .await
            .unwrap();
        assert_eq!(manifest.chunk_count, 3);
        assert_eq!(manifest.vector_dim, 3);

        let snapshot = store.open().await.unwrap().unwrap();
        assert_eq!(snapshot.count_chunks().await.unwrap(), 3);

        let hits = snapshot.search(&[0.0, 1.0, 0.0], 2).await.unwrap();
        assert_eq!(hits.len(), 2);
        assert_eq!(hits[0].chunk.text, "north");
        assert_eq!(hits[0].chunk.metadata.page, 2);
        assert_eq!(hits[1].chunk.text, "north-east");
        assert!(hits[0].relevance_score >= hits[1].relevance_score);
    }

    #[tokio::test]
    async fn test_rebuild_replaces_previous_generation() {
        let dir = tempfile::tempdir().unwrap();
        let store = KnowledgeStore::new(dir.path());

        let first = store
            .replace(&source(1), &[chunk("old text", 1)], &[vec![1.0, 0.0]])
            .await
            .unwrap();
        let second = store
            .replace(&source(1), &[chunk("new text", 1)], &[vec![1.0, 0.0]])
            .await
            .unwrap();
        assert_ne!(first.generation, second.generation);

        let current = store.current_manifest().unwrap().unwrap();
        assert_eq!(current.generation, second.generation);

        let snapshot = store.open().await.unwrap().unwrap();
        let hits = snapshot.search(&[1.0, 0.0], 4).await.unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].chunk.text, "new text");
    }

    #[tokio::test]
    async fn test_old_generations_are_pruned() {
        let dir = tempfile::tempdir().unwrap();
        let store = KnowledgeStore::new(dir.path());

        for i in 0..4 {
            store
                .replace(&source(1), &[chunk(&format!("text {}", i), 1)], &[vec![1.0, 0.0]])
                .await
                .unwrap();
        }

        let remaining = std::fs::read_dir(dir.path().join(GENERATIONS_DIR))
            .unwrap()
            .count();
        assert!(remaining <= 2, "expected at most 2 generations, found {}", remaining);
    }

    #[tokio::test]
    async fn test_prune_skips_generation_being_written() {
        let dir = tempfile::tempdir().unwrap();
        let store = KnowledgeStore::new(dir.path());

        store
            .replace(&source(1), &[chunk("first", 1)], &[vec![1.0, 0.0]])
            .await
            .unwrap();

        // A concurrent build that has created its directory but not finished
        let in_flight = dir.path().join(GENERATIONS_DIR).join("in-flight");
        std::fs::create_dir_all(in_flight.join(LANCE_DIR)).unwrap();

        for i in 0..3 {
            store
                .replace(&source(1), &[chunk(&format!("text {}", i), 1)], &[vec![1.0, 0.0]])
                .await
                .unwrap();
        }
        assert!(in_flight.exists());

        // Once it completes and swaps in, it is a normal current generation
        std::fs::write(
            in_flight.join(MANIFEST_FILE),
            serde_json::to_vec(&store.current_manifest().unwrap().unwrap()).unwrap(),
        )
        .unwrap();
        store.swap_current("in-flight").unwrap();
        assert_eq!(store.current_generation().unwrap(), Some(in_flight));
    }

    #[tokio::test]
    async fn test_mismatched_inputs_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let store = KnowledgeStore::new(dir.path());

        assert!(store
            .replace(&source(1), &[chunk("a", 1)], &[])
            .await
            .is_err());
        assert!(store
            .replace(
                &source(1),
                &[chunk("a", 1), chunk("b", 1)],
                &[vec![1.0, 0.0], vec![1.0]]
            )
            .await
            .is_err());
        // Nothing became current
        assert!(store.current_generation().unwrap().is_none());
    }

    #[tokio::test]
    async fn test_query_dimension_mismatch_is_error() {
        let dir = tempfile::tempdir().unwrap();
        let store = KnowledgeStore::new(dir.path());
        store
            .replace(&source(1), &[chunk("a", 1)], &[vec![1.0, 0.0]])
            .await
            .unwrap();

        let snapshot = store.open().await.unwrap().unwrap();
        assert!(snapshot.search(&[1.0, 0.0, 0.0], 4).await.is_err());
    }
}
