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

use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "deckbrain")]
#[command(version, author = "Muvon Un Limited <opensource@muvon.io>")]
#[command(about = "Consulting assistant grounded in a PDF knowledge base, with slide-ready markdown", long_about = None)]
pub struct Cli {
    /// Verbose logging for deckbrain modules
    #[arg(long, global = true)]
    pub debug: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Start the HTTP server exposing learn, chat and slide generation
    Serve {
        /// Address to bind (overrides config)
        #[arg(long)]
        host: Option<String>,

        /// Port to bind (overrides config)
        #[arg(short, long)]
        port: Option<u16>,
    },

    /// Build the knowledge base from a PDF
    Learn {
        /// PDF to ingest (defaults to knowledge.pdf_path)
        #[arg(long)]
        pdf: Option<PathBuf>,
    },

    /// Retrieve the passages the assistant would see for a question
    Query {
        /// Question or topic to search for
        text: String,

        /// Number of passages to return (defaults to knowledge.top_k)
        #[arg(short)]
        k: Option<usize>,

        /// Output format: text or json
        #[arg(short, long, default_value = "text")]
        format: String,
    },

    /// Show the knowledge base currently in service
    Status,
}

impl Commands {
    pub fn is_server(&self) -> bool {
        matches!(self, Commands::Serve { .. })
    }
}
