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

#[cfg(test)]
mod tests {
    use std::path::Path;
    use std::sync::Arc;

    use crate::assistant::{Assistant, ChatRequest, LearnResponse, SlideRequest, SlideResponse};
    use crate::completion::testing::RecordingClient;
    use crate::completion::ChatRole;
    use crate::config::{Config, KnowledgeConfig};
    use crate::embedding::testing::HashingEmbedder;
    use crate::error::ProviderError;
    use crate::knowledge::loader::PdfLoader;
    use crate::knowledge::KnowledgeManager;
    use crate::prompt::{NO_CONTEXT_SENTINEL, NO_SLIDE_CONTEXT};

    const GAMMA: &str = "https://gamma.app/new?mode=text";

    fn knowledge(root: &Path, pdf: &Path) -> Arc<KnowledgeManager> {
        let mut config = Config::default();
        config.knowledge.pdf_path = pdf.to_path_buf();
        Arc::new(KnowledgeManager::new(
            &config,
            root,
            Arc::new(HashingEmbedder::new(128)),
        ))
    }

    async fn seeded_knowledge(root: &Path) -> Arc<KnowledgeManager> {
        let manager = knowledge(root, Path::new("doc.pdf"));
        let pages = PdfLoader::new(&KnowledgeConfig::default())
            .pages_from_texts(vec![
                "Governance of the housing authority.".to_string(),
                "The repair backlog reached 330,000 open work orders.".to_string(),
            ])
            .unwrap();
        manager
            .build_from_pages(Path::new("doc.pdf"), String::new(), pages)
            .await
            .unwrap();
        manager
    }

    fn chat(role: &str, message: &str) -> ChatRequest {
        ChatRequest {
            role: role.to_string(),
            message: message.to_string(),
        }
    }

    #[tokio::test]
    async fn test_associate_chat_without_index_uses_sentinel() {
        let dir = tempfile::tempdir().unwrap();
        let client = Arc::new(RecordingClient::replying("We need an assumption."));
        let assistant = Assistant::new(
            knowledge(dir.path(), Path::new("doc.pdf")),
            client.clone(),
            GAMMA,
        );

        let reply = assistant
            .chat(&chat("Associate", "What is the backlog?"))
            .await
            .unwrap();
        assert_eq!(reply.reply, "We need an assumption.");

        let request = client.last_request();
        assert_eq!(request.len(), 2);
        assert_eq!(request[0].role, ChatRole::System);
        assert!(request[0].content.contains(NO_CONTEXT_SENTINEL));
        assert_eq!(request[1].role, ChatRole::User);
        assert_eq!(request[1].content, "What is the backlog?");
    }

    #[tokio::test]
    async fn test_associate_chat_is_grounded() {
        let dir = tempfile::tempdir().unwrap();
        let client = Arc::new(RecordingClient::replying("330,000 (Source: P2 Data)"));
        let assistant = Assistant::new(seeded_knowledge(dir.path()).await, client.clone(), GAMMA);

        assistant
            .chat(&chat("Associate", "How big is the repair backlog?"))
            .await
            .unwrap();

        let system = &client.last_request()[0].content;
        assert!(system.contains("330,000"));
        assert!(!system.contains(NO_CONTEXT_SENTINEL));
    }

    #[tokio::test]
    async fn test_other_personas_are_not_grounded() {
        let dir = tempfile::tempdir().unwrap();
        let client = Arc::new(RecordingClient::replying("So what?"));
        let assistant = Assistant::new(seeded_knowledge(dir.path()).await, client.clone(), GAMMA);

        assistant
            .chat(&chat("Partner", "How big is the repair backlog?"))
            .await
            .unwrap();

        let system = &client.last_request()[0].content;
        assert!(system.contains("Partner"));
        assert!(!system.contains("330,000"));
    }

    #[tokio::test]
    async fn test_chat_provider_failure_propagates() {
        let dir = tempfile::tempdir().unwrap();
        let assistant = Assistant::new(
            knowledge(dir.path(), Path::new("doc.pdf")),
            Arc::new(RecordingClient::failing(503)),
            GAMMA,
        );

        let err = assistant.chat(&chat("BA", "numbers?")).await.unwrap_err();
        assert!(matches!(err, ProviderError::Status { status: 503, .. }));
    }

    #[tokio::test]
    async fn test_learn_missing_pdf_is_error_payload() {
        let dir = tempfile::tempdir().unwrap();
        let pdf = dir.path().join("doc.pdf");
        let assistant = Assistant::new(
            knowledge(&dir.path().join("kb"), &pdf),
            Arc::new(RecordingClient::replying("")),
            GAMMA,
        );

        match assistant.learn().await {
            LearnResponse::Error { message } => assert!(message.contains("not found")),
            other => panic!("expected error, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_learn_from_pdf_reports_page_count() {
        let dir = tempfile::tempdir().unwrap();
        let pdf = Path::new(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures/three_pages.pdf");
        let knowledge = knowledge(dir.path(), &pdf);
        let client = Arc::new(RecordingClient::replying("330,000 (Source: P3 Data)"));
        let assistant = Assistant::new(knowledge.clone(), client.clone(), GAMMA);

        match assistant.learn().await {
            LearnResponse::Success { message } => {
                assert!(message.starts_with("Success: Ingested 3 pages"), "{}", message);
            }
            other => panic!("expected success, got {:?}", other),
        }

        let manifest = knowledge.status().unwrap().unwrap();
        assert_eq!(manifest.page_count, 3);
        assert_eq!(manifest.source_path, pdf);

        assistant
            .chat(&chat("Associate", "How big is the repair backlog?"))
            .await
            .unwrap();
        let system = &client.last_request()[0].content;
        assert!(system.contains("[Manual Ref: Page 3]"));
    }

    #[tokio::test]
    async fn test_learn_response_shape() {
        let success = serde_json::to_value(LearnResponse::Success {
            message: "ok".to_string(),
        })
        .unwrap();
        assert_eq!(success, serde_json::json!({"status": "success", "message": "ok"}));

        let error = serde_json::to_value(LearnResponse::Error {
            message: "bad".to_string(),
        })
        .unwrap();
        assert_eq!(error, serde_json::json!({"status": "error", "message": "bad"}));
    }

    #[tokio::test]
    async fn test_slide_from_valid_json() {
        let dir = tempfile::tempdir().unwrap();
        let raw = "```json\n{\"title\": \"Repair Backlog\", \"points\": [\"330,000 open orders\"], \
                   \"chart_data\": {\"type\": \"bar\", \"categories\": [\"NYCHA\", \"Benchmark\"], \"values\": [330000, 0]}}\n```";
        let client = Arc::new(RecordingClient::replying(raw));
        let assistant = Assistant::new(seeded_knowledge(dir.path()).await, client.clone(), GAMMA);

        let response = assistant
            .generate_slide(&SlideRequest {
                topic: "repair backlog".to_string(),
                role: "Associate".to_string(),
            })
            .await;

        let SlideResponse::Success {
            markdown,
            gamma_link,
            message,
        } = response
        else {
            panic!("expected success");
        };
        assert!(markdown.starts_with("# Repair Backlog\n"));
        assert!(markdown.contains("| NYCHA | 330000 |"));
        assert_eq!(gamma_link, GAMMA);
        assert!(message.contains("Gamma"));

        let prompt = &client.last_request()[0];
        assert_eq!(prompt.role, ChatRole::User);
        assert!(prompt.content.contains("\"repair backlog\""));
        assert!(prompt.content.contains("330,000"));
    }

    #[tokio::test]
    async fn test_slide_from_prose_falls_back() {
        let dir = tempfile::tempdir().unwrap();
        let prose = "The backlog is 330,000 orders and growing.";
        let client = Arc::new(RecordingClient::replying(prose));
        let assistant = Assistant::new(
            knowledge(dir.path(), Path::new("doc.pdf")),
            client.clone(),
            GAMMA,
        );

        let response = assistant
            .generate_slide(&SlideRequest {
                topic: "backlog".to_string(),
                role: "Associate".to_string(),
            })
            .await;

        let value = serde_json::to_value(&response).unwrap();
        assert_eq!(value["status"], "success");
        let markdown = value["markdown"].as_str().unwrap();
        assert!(!markdown.is_empty());
        assert!(markdown.contains(prose));

        // No index: the prompt says so instead of carrying context
        assert!(client.last_request()[0].content.contains(NO_SLIDE_CONTEXT));
    }

    #[tokio::test]
    async fn test_slide_provider_failure_is_error_payload() {
        let dir = tempfile::tempdir().unwrap();
        let assistant = Assistant::new(
            knowledge(dir.path(), Path::new("doc.pdf")),
            Arc::new(RecordingClient::failing(500)),
            GAMMA,
        );

        let response = assistant
            .generate_slide(&SlideRequest {
                topic: "backlog".to_string(),
                role: "Associate".to_string(),
            })
            .await;

        let value = serde_json::to_value(&response).unwrap();
        assert_eq!(value["status"], "error");
        assert!(value["message"].as_str().unwrap().contains("500"));
        assert!(value.get("markdown").is_none());
    }
}
