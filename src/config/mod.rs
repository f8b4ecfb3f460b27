//! Server configuration.
//!
//! Loaded from an optional YAML file (`shelfdb.yaml` in the working
//! directory, or a path given with `--config`), with `SHELFDB_*` environment
//! variables overriding file values.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::constants::{
    CONFIG_FILE_NAME, DEFAULT_CACHE_MAX_MEMORY_MB, DEFAULT_COHERE_MODEL,
    DEFAULT_EMBEDDING_DIMENSIONS, DEFAULT_HOST, DEFAULT_PORT,
};

/// Which embedding provider to wire up.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EmbeddingProviderKind {
    /// Offline, reproducible embeddings; no network access.
    #[default]
    Deterministic,
    /// The Cohere embed API; requires an API key.
    Cohere,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbeddingConfig {
    #[serde(default)]
    pub provider: EmbeddingProviderKind,
    #[serde(default)]
    pub cohere_api_key: Option<String>,
    #[serde(default = "default_cohere_model")]
    pub cohere_model: String,
    /// Vector dimension of the deterministic provider.
    #[serde(default = "default_dimensions")]
    pub dimensions: usize,
    #[serde(default = "default_cache_mb")]
    pub cache_max_memory_mb: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default)]
    pub embedding: EmbeddingConfig,
    /// Directory for log files; no file logging when unset.
    #[serde(default)]
    pub log_dir: Option<PathBuf>,
}

fn default_port() -> u16 {
    DEFAULT_PORT
}

fn default_host() -> String {
    DEFAULT_HOST.to_string()
}

fn default_cohere_model() -> String {
    DEFAULT_COHERE_MODEL.to_string()
}

fn default_dimensions() -> usize {
    DEFAULT_EMBEDDING_DIMENSIONS
}

fn default_cache_mb() -> usize {
    DEFAULT_CACHE_MAX_MEMORY_MB
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            provider: EmbeddingProviderKind::default(),
            cohere_api_key: None,
            cohere_model: default_cohere_model(),
            dimensions: default_dimensions(),
            cache_max_memory_mb: default_cache_mb(),
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: default_port(),
            host: default_host(),
            embedding: EmbeddingConfig::default(),
            log_dir: None,
        }
    }
}

impl ServerConfig {
    /// Load configuration. Missing file means defaults; env vars win over
    /// file values either way.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut config = match path {
            Some(path) => Self::from_file(path)?,
            None => {
                let default_path = PathBuf::from(CONFIG_FILE_NAME);
                if default_path.exists() {
                    Self::from_file(&default_path)?
                } else {
                    Self::default()
                }
            }
        };

        config.apply_env_overrides();
        Ok(config)
    }

    fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config file {}", path.display()))?;
        serde_yaml_ng::from_str(&content)
            .with_context(|| format!("failed to parse config {}", path.display()))
    }

    fn apply_env_overrides(&mut self) {
        if let Ok(port) = std::env::var("SHELFDB_PORT") {
            if let Ok(p) = port.parse() {
                self.port = p;
            }
        }
        if let Ok(host) = std::env::var("SHELFDB_HOST") {
            self.host = host;
        }
        if let Ok(key) = std::env::var("SHELFDB_COHERE_API_KEY") {
            if !key.is_empty() {
                self.embedding.cohere_api_key = Some(key);
                self.embedding.provider = EmbeddingProviderKind::Cohere;
            }
        }
        if let Ok(dims) = std::env::var("SHELFDB_EMBEDDING_DIMENSIONS") {
            if let Ok(d) = dims.parse() {
                self.embedding.dimensions = d;
            }
        }
        if let Ok(dir) = std::env::var("SHELFDB_LOG_DIR") {
            if !dir.is_empty() {
                self.log_dir = Some(PathBuf::from(dir));
            }
        }
    }
}
