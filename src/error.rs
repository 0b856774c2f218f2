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

use std::path::PathBuf;

use thiserror::Error;

/// Failures of the ingestion path. Query-time failures never surface as errors.
#[derive(Debug, Error)]
pub enum KnowledgeError {
    #[error("source document not found: {}", .0.display())]
    SourceNotFound(PathBuf),

    #[error("failed to read PDF: {0}")]
    Extraction(String),

    #[error("no extractable text in the document, check whether the PDF is empty")]
    EmptyCorpus,

    #[error("failed to embed or persist the knowledge base: {0:#}")]
    IndexPersist(#[source] anyhow::Error),
}

/// Failures of the hosted completion model
#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("completion request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("completion API returned {status}: {body}")]
    Status { status: u16, body: String },

    #[error("completion API returned no content")]
    EmptyResponse,
}

/// Generated slide content could not be parsed. Always recovered by the caller.
#[derive(Debug, Error)]
pub enum SlideParseError {
    #[error("generated content is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("generated JSON is not an object")]
    NotAnObject,
}
