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

use anyhow::{anyhow, Result};
use serde_json::json;
use std::sync::Arc;

use crate::assistant::Assistant;
use crate::cli::Commands;
use crate::completion::OpenAiCompatibleClient;
use crate::config::Config;
use crate::embedding::create_embedder;
use crate::knowledge::formatting::{format_manifest, format_search_results};
use crate::knowledge::types::SearchHit;
use crate::knowledge::KnowledgeManager;
use crate::server;
use crate::storage;

async fn knowledge_manager(config: &Config) -> Result<Arc<KnowledgeManager>> {
    let embedder = create_embedder(config).await?;
    let root = storage::get_knowledge_base_root()?;
    Ok(Arc::new(KnowledgeManager::new(config, root, embedder)))
}

pub async fn execute(config: &Config, command: Commands) -> Result<()> {
    match command {
        Commands::Serve { host, port } => {
            let knowledge = knowledge_manager(config).await?;
            let completion = Arc::new(OpenAiCompatibleClient::new(&config.completion)?);
            let assistant = Arc::new(Assistant::new(
                knowledge,
                completion,
                config.server.gamma_link.clone(),
            ));

            let host = host.unwrap_or_else(|| config.server.host.clone());
            let port = port.unwrap_or(config.server.port);
            server::serve(assistant, &host, port, &config.server.allowed_origin).await
        }

        Commands::Learn { pdf } => {
            let knowledge = knowledge_manager(config).await?;
            let path = pdf.unwrap_or_else(|| knowledge.default_pdf_path().to_path_buf());
            let summary = knowledge.build(&path).await?;
            println!("{}", summary.message());
            println!("Generation: {}", summary.manifest.generation);
            Ok(())
        }

        Commands::Query { text, k, format } => {
            let knowledge = knowledge_manager(config).await?;
            let k = k.unwrap_or_else(|| knowledge.default_top_k());
            let hits = knowledge.search(&text, k).await?.ok_or_else(|| {
                anyhow!("No knowledge base built yet. Run `deckbrain learn` first.")
            })?;

            match format.as_str() {
                "json" => println!("{}", serde_json::to_string_pretty(&hits_to_json(&hits))?),
                "text" => print!("{}", format_search_results(&hits)),
                other => return Err(anyhow!("Unknown output format: {}", other)),
            }
            Ok(())
        }

        Commands::Status => {
            let knowledge = knowledge_manager(config).await?;
            println!("{}", format_manifest(knowledge.status()?.as_ref()));
            Ok(())
        }
    }
}

fn hits_to_json(hits: &[SearchHit]) -> serde_json::Value {
    json!(hits
        .iter()
        .map(|hit| json!({
            "source": hit.chunk.metadata.source,
            "page": hit.chunk.metadata.page,
            "relevance_score": hit.relevance_score,
            "content": hit.chunk.text,
        }))
        .collect::<Vec<_>>())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::knowledge::types::{Chunk, ChunkMetadata};

    #[test]
    fn test_hits_to_json() {
        let hits = vec![SearchHit {
            chunk: Chunk {
                text: "[Manual Ref: Page 2]\nBacklog".to_string(),
                metadata: ChunkMetadata {
                    source: "manual_doc.pdf".to_string(),
                    page: 2,
                },
            },
            relevance_score: 0.5,
        }];

        let value = hits_to_json(&hits);
        assert_eq!(value[0]["page"], 2);
        assert_eq!(value[0]["source"], "manual_doc.pdf");
        assert_eq!(value[0]["relevance_score"], 0.5);
    }
}
