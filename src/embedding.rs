// Copyright 2026 Muvon Un Limited
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

use async_trait::async_trait;
use std::sync::Arc;

// Re-export embedding functionality from octolib
pub use octolib::embedding::{
    parse_provider_model, provider::create_embedding_provider_from_parts,
    provider::EmbeddingProvider, types::EmbeddingProviderType, types::InputType,
};
use tracing::warn;

/// Turns text into fixed-length vectors.
///
/// Indexing and querying must go through the same instance so that both sides
/// use the same provider and model.
#[async_trait]
pub trait Embedder: Send + Sync {
    /// Model identifier recorded in the knowledge base manifest
    fn model_id(&self) -> &str;

    async fn embed(&self, text: &str) -> anyhow::Result<Vec<f32>>;

    async fn embed_batch(&self, texts: Vec<String>) -> anyhow::Result<Vec<Vec<f32>>>;
}

/// Embedder backed by an octolib provider
pub struct OctolibEmbedder {
    model: String,
    provider: Box<dyn EmbeddingProvider>,
}

#[async_trait]
impl Embedder for OctolibEmbedder {
    fn model_id(&self) -> &str {
        &self.model
    }

    async fn embed(&self, text: &str) -> anyhow::Result<Vec<f32>> {
        self.provider.generate_embedding(text).await
    }

    async fn embed_batch(&self, texts: Vec<String>) -> anyhow::Result<Vec<Vec<f32>>> {
        self.provider
            .generate_embeddings_batch(texts, InputType::None)
            .await
    }
}

/// Environment variable a hosted embedding provider reads its key from.
/// Local providers (fastembed, huggingface) and OctoHub need none.
pub fn credential_env(provider: &EmbeddingProviderType) -> Option<&'static str> {
    match provider {
        EmbeddingProviderType::OpenAI => Some("OPENAI_API_KEY"),
        EmbeddingProviderType::Jina => Some("JINA_API_KEY"),
        EmbeddingProviderType::Voyage => Some("VOYAGE_API_KEY"),
        EmbeddingProviderType::Google => Some("GOOGLE_API_KEY"),
        EmbeddingProviderType::OpenRouter => Some("OPENROUTER_API_KEY"),
        EmbeddingProviderType::Together => Some("TOGETHER_API_KEY"),
        _ => None,
    }
}

/// Credential variable the configured model needs but that is unset or blank
pub fn missing_credential<F>(model: &str, lookup: F) -> anyhow::Result<Option<&'static str>>
where
    F: Fn(&str) -> Option<String>,
{
    let (provider, _) = parse_provider_model(model)?;
    Ok(credential_env(&provider)
        .filter(|key| lookup(key).map_or(true, |v| v.trim().is_empty())))
}

/// Create embedding provider from config
pub async fn create_embedder(config: &crate::config::Config) -> anyhow::Result<Arc<dyn Embedder>> {
    if let Some(key) = missing_credential(&config.embedding.model, |k| std::env::var(k).ok())? {
        warn!(
            model = %config.embedding.model,
            env = key,
            "Embedding credential not set, learning and retrieval will fail"
        );
    }

    let (provider, model) = parse_provider_model(&config.embedding.model)?;
    let provider = create_embedding_provider_from_parts(&provider, &model).await?;
    Ok(Arc::new(OctolibEmbedder {
        model: config.embedding.model.clone(),
        provider,
    }))
}

/// Embed many texts, `batch_size` at a time, preserving input order
pub async fn embed_in_batches(
    embedder: &dyn Embedder,
    texts: &[String],
    batch_size: usize,
) -> anyhow::Result<Vec<Vec<f32>>> {
    let mut vectors = Vec::with_capacity(texts.len());
    for batch in texts.chunks(batch_size.max(1)) {
        let embedded = embedder.embed_batch(batch.to_vec()).await?;
        if embedded.len() != batch.len() {
            anyhow::bail!(
                "embedding provider returned {} vectors for {} inputs",
                embedded.len(),
                batch.len()
            );
        }
        vectors.extend(embedded);
    }
    Ok(vectors)
}
