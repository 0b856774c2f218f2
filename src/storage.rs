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

use anyhow::Result;
use std::fs;
use std::path::PathBuf;

/// Get the system-wide storage directory for deckbrain
/// `DECKBRAIN_DATA_DIR` wins, then the XDG Base Directory convention on
/// Unix-like systems and the platform data directory elsewhere
pub fn get_system_storage_dir() -> Result<PathBuf> {
    let base_dir = if let Ok(explicit) = std::env::var("DECKBRAIN_DATA_DIR") {
        PathBuf::from(explicit)
    } else if cfg!(target_os = "macos") {
        // macOS: ~/.local/share/deckbrain
        dirs::home_dir()
            .ok_or_else(|| anyhow::anyhow!("Unable to determine home directory"))?
            .join(".local")
            .join("share")
            .join("deckbrain")
    } else if cfg!(target_os = "windows") {
        // Windows: %APPDATA%/deckbrain
        dirs::data_dir()
            .ok_or_else(|| anyhow::anyhow!("Unable to determine data directory"))?
            .join("deckbrain")
    } else if let Ok(xdg_data_home) = std::env::var("XDG_DATA_HOME") {
        PathBuf::from(xdg_data_home).join("deckbrain")
    } else {
        dirs::home_dir()
            .ok_or_else(|| anyhow::anyhow!("Unable to determine home directory"))?
            .join(".local")
            .join("share")
            .join("deckbrain")
    };

    if !base_dir.exists() {
        fs::create_dir_all(&base_dir)?;
    }

    Ok(base_dir)
}

/// Root of the single knowledge base slot
pub fn get_knowledge_base_root() -> Result<PathBuf> {
    Ok(get_system_storage_dir()?.join("knowledge"))
}

/// Directory for rotated server logs
pub fn get_log_dir() -> Result<PathBuf> {
    Ok(get_system_storage_dir()?.join("logs"))
}

/// Get the system config file path
pub fn get_system_config_path() -> Result<PathBuf> {
    let system_dir = get_system_storage_dir()?;
    Ok(system_dir.join("config.toml"))
}
