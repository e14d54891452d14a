//! TOML configuration parsing and validation.
//!
//! Configuration is loaded once at startup from the file passed via
//! `--config`, validated, and passed explicitly to the components that
//! need it. There is no cached global: tests construct their own `Config`
//! values and stay hermetic by construction.

use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub db: DbConfig,
    #[serde(default)]
    pub chunking: ChunkingConfig,
    #[serde(default)]
    pub embedding: EmbeddingConfig,
    #[serde(default)]
    pub llm: LlmConfig,
    pub server: ServerConfig,
    #[serde(default)]
    pub search: SearchConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DbConfig {
    pub path: PathBuf,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ChunkingConfig {
    #[serde(default = "default_chunk_size")]
    pub chunk_size: usize,
    #[serde(default = "default_overlap")]
    pub overlap: usize,
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self {
            chunk_size: default_chunk_size(),
            overlap: default_overlap(),
        }
    }
}

fn default_chunk_size() -> usize {
    800
}
fn default_overlap() -> usize {
    80
}

#[derive(Debug, Deserialize, Clone)]
pub struct EmbeddingConfig {
    /// Embedding backend. Only `"stub"` is implemented; other names fail
    /// with a not-supported error at provider creation.
    #[serde(default = "default_embedding_provider")]
    pub provider: String,
    #[serde(default = "default_dims")]
    pub dims: usize,
    /// When false, chunks are stored without embeddings and the store
    /// does not advertise a vector-search capability.
    #[serde(default = "default_true")]
    pub enabled: bool,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            provider: default_embedding_provider(),
            dims: default_dims(),
            enabled: true,
        }
    }
}

fn default_embedding_provider() -> String {
    "stub".to_string()
}
fn default_dims() -> usize {
    crate::embedding::DEFAULT_DIMS
}
fn default_true() -> bool {
    true
}

#[derive(Debug, Deserialize, Clone)]
pub struct LlmConfig {
    /// Provider label reported in generation responses.
    #[serde(default = "default_llm_provider")]
    pub provider: String,
    /// Environment variable consulted for an API key.
    #[serde(default = "default_api_key_env")]
    pub api_key_env: String,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            provider: default_llm_provider(),
            api_key_env: default_api_key_env(),
        }
    }
}

fn default_llm_provider() -> String {
    "openai".to_string()
}
fn default_api_key_env() -> String {
    "OPENAI_API_KEY".to_string()
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    pub bind: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct SearchConfig {
    #[serde(default = "default_limit")]
    pub default_limit: usize,
    #[serde(default = "default_max_limit")]
    pub max_limit: usize,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            default_limit: default_limit(),
            max_limit: default_max_limit(),
        }
    }
}

fn default_limit() -> usize {
    5
}
fn default_max_limit() -> usize {
    20
}

pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    let config: Config = toml::from_str(&content).with_context(|| "Failed to parse config file")?;
    validate(&config)?;
    Ok(config)
}

fn validate(config: &Config) -> Result<()> {
    if config.chunking.chunk_size == 0 {
        anyhow::bail!("chunking.chunk_size must be > 0");
    }

    if config.embedding.enabled && config.embedding.dims == 0 {
        anyhow::bail!(
            "embedding.dims must be > 0 when provider is '{}'",
            config.embedding.provider
        );
    }

    if config.search.default_limit < 1 || config.search.default_limit > config.search.max_limit {
        anyhow::bail!(
            "search.default_limit must be in [1, {}]",
            config.search.max_limit
        );
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn minimal_toml() -> &'static str {
        r#"
[db]
path = "/tmp/docbase.sqlite"

[server]
bind = "127.0.0.1:7411"
"#
    }

    #[test]
    fn minimal_config_gets_defaults() {
        let config: Config = toml::from_str(minimal_toml()).unwrap();
        validate(&config).unwrap();
        assert_eq!(config.chunking.chunk_size, 800);
        assert_eq!(config.chunking.overlap, 80);
        assert_eq!(config.embedding.provider, "stub");
        assert_eq!(config.embedding.dims, crate::embedding::DEFAULT_DIMS);
        assert!(config.embedding.enabled);
        assert_eq!(config.search.default_limit, 5);
        assert_eq!(config.search.max_limit, 20);
    }

    #[test]
    fn zero_chunk_size_is_rejected() {
        let toml = format!("{}\n[chunking]\nchunk_size = 0\n", minimal_toml());
        let config: Config = toml::from_str(&toml).unwrap();
        assert!(validate(&config).is_err());
    }

    #[test]
    fn default_limit_above_max_is_rejected() {
        let toml = format!(
            "{}\n[search]\ndefault_limit = 50\nmax_limit = 20\n",
            minimal_toml()
        );
        let config: Config = toml::from_str(&toml).unwrap();
        assert!(validate(&config).is_err());
    }
}
