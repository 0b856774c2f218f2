// Copyright 2025 Muvon Un Limited
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

use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Embedding configuration shared by indexing and querying
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbeddingConfig {
    pub model: String,
    pub batch_size: usize,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            model: "openai:text-embedding-3-small".to_string(),
            batch_size: 25,
        }
    }
}

/// Knowledge base ingestion and retrieval settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KnowledgeConfig {
    pub pdf_path: PathBuf,
    pub source_label: String,
    pub chunk_size: usize,
    pub chunk_overlap: usize,
    pub top_k: usize,
    #[serde(default)]
    pub watch_terms: Vec<String>,
}

impl Default for KnowledgeConfig {
    fn default() -> Self {
        Self {
            pdf_path: PathBuf::from("doc.pdf"),
            source_label: "manual_doc.pdf".to_string(),
            chunk_size: 1200,
            chunk_overlap: 300,
            top_k: 4,
            watch_terms: vec![
                "330,000".to_string(),
                "Backlog".to_string(),
                "16B".to_string(),
                "17B".to_string(),
            ],
        }
    }
}

/// Hosted language model settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompletionConfig {
    pub model: String,
    pub base_url: String,
    #[serde(default)]
    pub api_key: String,
    /// 0 disables the timeout
    #[serde(default)]
    pub timeout_secs: u64,
}

impl Default for CompletionConfig {
    fn default() -> Self {
        Self {
            model: "qwen-plus".to_string(),
            base_url: "https://dashscope.aliyuncs.com/compatible-mode/v1".to_string(),
            api_key: String::new(),
            timeout_secs: 0,
        }
    }
}

/// HTTP server settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub allowed_origin: String,
    pub gamma_link: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8000,
            allowed_origin: "http://localhost:3000".to_string(),
            gamma_link: "https://gamma.app/new?mode=text".to_string(),
        }
    }
}

/// Main configuration for deckbrain
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub embedding: EmbeddingConfig,
    #[serde(default)]
    pub knowledge: KnowledgeConfig,
    #[serde(default)]
    pub completion: CompletionConfig,
    #[serde(default)]
    pub server: ServerConfig,
}

impl Config {
    /// Load configuration from config.toml file
    /// First tries to load from system config directory, falls back to embedded template
    pub fn load() -> Result<Self> {
        let config_path = crate::storage::get_system_config_path()?;

        let mut config: Self = if config_path.exists() {
            let content = std::fs::read_to_string(&config_path)?;
            toml::from_str(&content)?
        } else {
            // Config doesn't exist, create from template
            let template_content = include_str!("../config-templates/default.toml");
            let config = toml::from_str(template_content)?;

            if let Some(parent) = config_path.parent() {
                if !parent.exists() {
                    std::fs::create_dir_all(parent)?;
                }
            }
            std::fs::write(&config_path, template_content)?;

            config
        };

        config.apply_env_overrides(|key| std::env::var(key).ok());
        config.validate()?;

        Ok(config)
    }

    /// Environment wins over the file for credentials, endpoint, model and CORS origin
    pub fn apply_env_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(key) = non_empty("DASHSCOPE_API_KEY") {
            self.completion.api_key = key;
        }
        if let Some(url) = non_empty("QWEN_BASE_URL") {
            self.completion.base_url = url;
        }
        if let Some(model) = non_empty("MODEL_NAME") {
            self.completion.model = model;
        }
        if let Some(origin) = non_empty("ALLOWED_ORIGIN") {
            self.server.allowed_origin = origin;
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.knowledge.chunk_size == 0 {
            anyhow::bail!("knowledge.chunk_size must be greater than zero");
        }
        if self.knowledge.chunk_overlap >= self.knowledge.chunk_size {
            anyhow::bail!(
                "knowledge.chunk_overlap ({}) must be smaller than knowledge.chunk_size ({})",
                self.knowledge.chunk_overlap,
                self.knowledge.chunk_size
            );
        }
        if self.knowledge.top_k == 0 {
            anyhow::bail!("knowledge.top_k must be at least 1");
        }
        if self.embedding.batch_size == 0 {
            anyhow::bail!("embedding.batch_size must be at least 1");
        }
        Ok(())
    }
}
