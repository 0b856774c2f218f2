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

use anyhow::{Context, Result};
use axum::{
    extract::State,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use http::header::{ACCEPT, AUTHORIZATION, CONTENT_TYPE};
use http::{HeaderValue, Method, StatusCode};
use serde_json::json;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tracing::{error, info};

use crate::assistant::{Assistant, ChatRequest, LearnResponse, SlideRequest, SlideResponse};

/// Build the router: health, learn, chat and generate-slide
pub fn build_router(assistant: Arc<Assistant>, allowed_origin: &str) -> Result<Router> {
    Ok(Router::new()
        .route("/", get(health))
        .route("/api/learn", post(learn))
        .route("/api/chat", post(chat))
        .route("/api/generate_ppt", post(generate_slide))
        .layer(cors_layer(allowed_origin)?)
        .with_state(assistant))
}

/// Wildcard origin allows any header without credentials; a concrete origin
/// gets credentials and an explicit header list, since tower-http rejects
/// credentials combined with wildcard headers
fn cors_layer(allowed_origin: &str) -> Result<CorsLayer> {
    let layer = CorsLayer::new().allow_methods([Method::GET, Method::POST, Method::OPTIONS]);

    if allowed_origin.trim() == "*" {
        return Ok(layer.allow_origin(Any).allow_headers(Any));
    }

    let origin = HeaderValue::from_str(allowed_origin.trim())
        .with_context(|| format!("Invalid allowed origin: {}", allowed_origin))?;
    Ok(layer
        .allow_origin(origin)
        .allow_headers([CONTENT_TYPE, AUTHORIZATION, ACCEPT])
        .allow_credentials(true))
}

/// Bind and serve until Ctrl-C
pub async fn serve(assistant: Arc<Assistant>, host: &str, port: u16, allowed_origin: &str) -> Result<()> {
    let router = build_router(assistant, allowed_origin)?;

    let addr = format!("{}:{}", host, port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    info!(address = %addr, origin = %allowed_origin, "deckbrain listening");

    axum::serve(listener, router)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            info!("Shutting down");
        })
        .await?;

    Ok(())
}

async fn health(State(assistant): State<Arc<Assistant>>) -> Json<serde_json::Value> {
    Json(json!({ "status": "Brain Online", "model": assistant.model() }))
}

async fn learn(State(assistant): State<Arc<Assistant>>) -> Json<LearnResponse> {
    Json(assistant.learn().await)
}

async fn chat(State(assistant): State<Arc<Assistant>>, Json(request): Json<ChatRequest>) -> Response {
    match assistant.chat(&request).await {
        Ok(reply) => Json(reply).into_response(),
        Err(e) => {
            error!(error = %e, "Chat completion failed");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "detail": e.to_string() })),
            )
                .into_response()
        }
    }
}

async fn generate_slide(
    State(assistant): State<Arc<Assistant>>,
    Json(request): Json<SlideRequest>,
) -> Json<SlideResponse> {
    Json(assistant.generate_slide(&request).await)
}
