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

use std::path::Path;
use tracing::info;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{fmt::Layer, prelude::*, registry::Registry, EnvFilter};

fn env_filter(debug_mode: bool) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        if debug_mode {
            EnvFilter::new("info,deckbrain=debug")
        } else {
            EnvFilter::new("deckbrain=info")
        }
    })
}

/// Console-only logging for one-shot CLI commands
pub fn init_cli_logging(debug_mode: bool) {
    let console_layer = Layer::new().with_target(false).with_writer(std::io::stderr);

    Registry::default()
        .with(console_layer)
        .with(env_filter(debug_mode))
        .init();
}

/// Console plus daily-rotated JSON file logs for the server
pub fn init_server_logging(log_dir: &Path, debug_mode: bool) -> Result<(), anyhow::Error> {
    std::fs::create_dir_all(log_dir)?;

    let file_appender = RollingFileAppender::new(Rotation::DAILY, log_dir, "server.log");

    // File layer with JSON formatting for structured logs
    let file_layer = Layer::new()
        .with_writer(file_appender)
        .with_ansi(false)
        .with_target(true)
        .with_file(true)
        .with_line_number(true)
        .with_thread_ids(true)
        .json();

    let console_layer = Layer::new().with_target(false);

    Registry::default()
        .with(file_layer)
        .with(console_layer)
        .with(env_filter(debug_mode))
        .init();

    info!(
        log_directory = %log_dir.display(),
        debug_mode = debug_mode,
        "Server logging initialized"
    );

    Ok(())
}
