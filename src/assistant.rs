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

use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::completion::{ChatMessage, CompletionClient};
use crate::error::ProviderError;
use crate::knowledge::KnowledgeManager;
use crate::prompt::{self, Persona};
use crate::slides;

const SLIDE_READY_MESSAGE: &str =
    "Content generated! Please copy the markdown and paste it into Gamma.";

#[derive(Debug, Clone, Deserialize)]
pub struct ChatRequest {
    pub role: String,
    pub message: String,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct ChatReply {
    pub reply: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SlideRequest {
    pub topic: String,
    pub role: String,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum LearnResponse {
    Success { message: String },
    Error { message: String },
}

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum SlideResponse {
    Success {
        markdown: String,
        gamma_link: String,
        message: String,
    },
    Error {
        message: String,
    },
}

/// The three user-facing operations, composed from explicitly passed services
pub struct Assistant {
    knowledge: Arc<KnowledgeManager>,
    completion: Arc<dyn CompletionClient>,
    gamma_link: String,
}

impl Assistant {
    pub fn new(
        knowledge: Arc<KnowledgeManager>,
        completion: Arc<dyn CompletionClient>,
        gamma_link: impl Into<String>,
    ) -> Self {
        Self {
            knowledge,
            completion,
            gamma_link: gamma_link.into(),
        }
    }

    pub fn model(&self) -> &str {
        self.completion.model()
    }

    /// Rebuild the knowledge base from the configured PDF.
    /// Ingestion errors become an error payload, never a failure.
    pub async fn learn(&self) -> LearnResponse {
        let path = self.knowledge.default_pdf_path().to_path_buf();
        match self.knowledge.build(&path).await {
            Ok(summary) => LearnResponse::Success {
                message: summary.message(),
            },
            Err(e) => {
                warn!(error = %e, path = %path.display(), "Learning failed");
                LearnResponse::Error {
                    message: e.to_string(),
                }
            }
        }
    }

    /// Answer a chat message in the requested persona. Only the Associate is
    /// grounded in the knowledge base; provider failures are returned to the caller.
    pub async fn chat(&self, request: &ChatRequest) -> Result<ChatReply, ProviderError> {
        let context = if Persona::from_role(&request.role).uses_knowledge_base() {
            let context = self
                .knowledge
                .query(&request.message, self.knowledge.default_top_k())
                .await;
            match &context {
                Some(_) => info!("Chat: found context, injecting into prompt"),
                None => info!(query = %request.message, "Chat: no context found"),
            }
            context.unwrap_or_default()
        } else {
            String::new()
        };

        let messages = vec![
            ChatMessage::system(prompt::compose(&request.role, &context)),
            ChatMessage::user(request.message.clone()),
        ];

        let reply = self.completion.complete(&messages).await?;
        Ok(ChatReply { reply })
    }

    /// Ask the model for slide content and render it as Gamma-ready markdown.
    /// Unparseable answers degrade to a raw-text document.
    pub async fn generate_slide(&self, request: &SlideRequest) -> SlideResponse {
        let context = self
            .knowledge
            .query(&request.topic, self.knowledge.default_top_k())
            .await
            .unwrap_or_default();

        let messages = vec![ChatMessage::user(prompt::slide_request(
            &request.topic,
            &request.role,
            &context,
        ))];

        let raw = match self.completion.complete(&messages).await {
            Ok(raw) => raw,
            Err(e) => {
                warn!(error = %e, "Slide generation failed");
                return SlideResponse::Error {
                    message: e.to_string(),
                };
            }
        };
        debug!(raw = %raw, "Model output for slide");

        let (markdown, parse_error) = slides::render_generated(&raw);
        if let Some(e) = parse_error {
            warn!(error = %e, "Slide JSON parsing failed, falling back to raw text");
        }

        SlideResponse::Success {
            markdown,
            gamma_link: self.gamma_link.clone(),
            message: SLIDE_READY_MESSAGE.to_string(),
        }
    }
}
