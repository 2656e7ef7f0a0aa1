// ABOUTME: Configuration loading and management for weft
// ABOUTME: TOML config file with streaming and chat defaults

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Main configuration structure
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// How stream events are interpreted
    pub streaming: StreamingConfig,
    /// Defaults attached to outgoing user input
    pub chat: ChatConfig,
}

/// How streamed chunk content is accumulated
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChunkMode {
    /// Trust the backend's `accumulated` field; bare deltas are appended
    /// only for backends that do not send it
    #[default]
    Cumulative,
    /// Append every delta and ignore `accumulated`
    Delta,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StreamingConfig {
    /// When false, stream-start is ignored and only legacy bot responses apply
    pub enabled: bool,
    pub chunk_mode: ChunkMode,
}

impl Default for StreamingConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            chunk_mode: ChunkMode::Cumulative,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChatConfig {
    /// Interaction mode sent with each message (e.g. "agent", "ask")
    pub mode: String,
    /// Assistant alias shown to the backend
    pub alias: Option<String>,
    /// Conversation thread to continue
    pub thread_id: Option<String>,
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self {
            mode: "agent".to_string(),
            alias: None,
            thread_id: None,
        }
    }
}

impl Config {
    /// Get the XDG config directory for weft (~/.config/weft)
    pub fn config_dir() -> PathBuf {
        // Respect XDG_CONFIG_HOME if set, otherwise use ~/.config
        std::env::var("XDG_CONFIG_HOME")
            .map(PathBuf::from)
            .unwrap_or_else(|_| {
                dirs::home_dir()
                    .map(|p| p.join(".config"))
                    .unwrap_or_else(|| PathBuf::from("."))
            })
            .join("weft")
    }

    /// Get the default config file path
    pub fn config_path() -> PathBuf {
        Self::config_dir().join("config.toml")
    }

    /// Load config from XDG config directory
    pub fn load() -> Result<Self> {
        let path = Self::config_path();

        if path.exists() {
            Self::load_from(&path)
        } else {
            Ok(Self::default())
        }
    }

    /// Load config from a specific path
    pub fn load_from(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config from {}", path.display()))?;

        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config from {}", path.display()))?;

        Ok(config)
    }

    /// Generate a default config file content
    pub fn default_toml() -> String {
        r#"# weft configuration
# Location: ~/.config/weft/config.toml

[streaming]
enabled = true
# "cumulative" trusts the backend's accumulated text, "delta" appends chunks
chunk_mode = "cumulative"

[chat]
mode = "agent"
# alias = "assistant"
# thread_id = "..."
"#
        .to_string()
    }

    /// Write the default config into `dir` unless one exists; returns its path
    pub fn init_in(dir: &Path) -> Result<PathBuf> {
        let config_path = dir.join("config.toml");

        std::fs::create_dir_all(dir)
            .with_context(|| format!("Failed to create config dir: {}", dir.display()))?;

        if !config_path.exists() {
            std::fs::write(&config_path, Self::default_toml())
                .with_context(|| format!("Failed to write config: {}", config_path.display()))?;
        }

        Ok(config_path)
    }

    /// Initialize config directory and create default config if needed
    pub fn init() -> Result<PathBuf> {
        Self::init_in(&Self::config_dir())
    }
}
