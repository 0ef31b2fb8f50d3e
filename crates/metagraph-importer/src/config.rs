//! Configuration with layered resolution
//!
//! Resolution order (highest priority last):
//! 1. Built-in defaults
//! 2. `metagraph.toml` in the working directory, or the file given explicitly
//! 3. `.env`, loaded into the process environment if present
//! 4. Environment variables: `METAGRAPH_*`, `OPENAI_MODEL`
//!
//! ```toml
//! graph = "metagraph.graphson"
//!
//! [import]
//! cache_dir = ".cache/import"
//! max_deterministic_bytes = 16384
//! concurrency = 4
//!
//! [ai]
//! provider = "openai"
//! model = "gpt-4o-mini"
//! ```
//!
//! API keys stay in the environment (`OPENAI_API_KEY`, `ANTHROPIC_API_KEY`)
//! and are read by the providers themselves.

use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::Arc;

use metagraph_ai::{AIProvider, create_provider};
use metagraph_core::GRAPH_FILE;
use serde::Deserialize;
use tracing::debug;

use crate::cache::DEFAULT_CACHE_DIR;
use crate::error::ConfigError;
use crate::strategy::DEFAULT_MAX_DETERMINISTIC_BYTES;

pub const CONFIG_FILE: &str = "metagraph.toml";

/// Provider name that disables the AI path.
pub const NO_PROVIDER: &str = "none";

/// Root configuration structure.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct MetagraphConfig {
    /// Graph file used when a command is not given one.
    pub graph: PathBuf,
    pub import: ImportConfig,
    pub ai: AiConfig,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct ImportConfig {
    pub cache_dir: PathBuf,
    /// Largest file, in bytes, handled by a deterministic extractor when an
    /// AI provider is available.
    pub max_deterministic_bytes: u64,
    /// Files imported concurrently by a batch.
    pub concurrency: usize,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct AiConfig {
    /// `none`, `openai` or `anthropic`.
    pub provider: String,
    /// Provider default when unset (`gpt-4o-mini` for OpenAI).
    pub model: Option<String>,
}

impl Default for MetagraphConfig {
    fn default() -> Self {
        Self {
            graph: PathBuf::from(GRAPH_FILE),
            import: ImportConfig::default(),
            ai: AiConfig::default(),
        }
    }
}

impl Default for ImportConfig {
    fn default() -> Self {
        Self {
            cache_dir: PathBuf::from(DEFAULT_CACHE_DIR),
            max_deterministic_bytes: DEFAULT_MAX_DETERMINISTIC_BYTES,
            concurrency: 4,
        }
    }
}

impl Default for AiConfig {
    fn default() -> Self {
        Self {
            provider: NO_PROVIDER.to_string(),
            model: None,
        }
    }
}

impl MetagraphConfig {
    /// Load config with layered resolution (defaults → file → env).
    ///
    /// An explicit `path` must exist; the default `metagraph.toml` is optional.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        if let Ok(env_file) = dotenvy::dotenv() {
            debug!("Loaded environment from {}", env_file.display());
        }

        let mut config = match path {
            Some(path) => Self::from_file(path)?,
            None if Path::new(CONFIG_FILE).exists() => Self::from_file(Path::new(CONFIG_FILE))?,
            None => Self::default(),
        };
        config.apply_env(|var| std::env::var(var).ok())?;
        debug!("Resolved config: {:?}", config);
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        toml::from_str(&text).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Apply environment overrides, reading variables through `lookup`.
    pub fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) -> Result<(), ConfigError> {
        if let Some(graph) = lookup("METAGRAPH_GRAPH") {
            self.graph = PathBuf::from(graph);
        }
        if let Some(dir) = lookup("METAGRAPH_CACHE_DIR") {
            self.import.cache_dir = PathBuf::from(dir);
        }
        if let Some(value) = lookup("METAGRAPH_MAX_DETERMINISTIC_BYTES") {
            self.import.max_deterministic_bytes = parse_env("METAGRAPH_MAX_DETERMINISTIC_BYTES", value)?;
        }
        if let Some(value) = lookup("METAGRAPH_CONCURRENCY") {
            let concurrency: usize = parse_env("METAGRAPH_CONCURRENCY", value.clone())?;
            if concurrency == 0 {
                return Err(ConfigError::Env {
                    var: "METAGRAPH_CONCURRENCY",
                    value,
                    reason: "must be at least 1".into(),
                });
            }
            self.import.concurrency = concurrency;
        }
        if let Some(provider) = lookup("METAGRAPH_AI_PROVIDER") {
            self.ai.provider = provider;
        }
        if self.ai.provider == "openai" {
            if let Some(model) = lookup("OPENAI_MODEL") {
                self.ai.model = Some(model);
            }
        }
        Ok(())
    }

    pub fn ai_enabled(&self) -> bool {
        self.ai.provider != NO_PROVIDER
    }

    /// The configured AI provider, or `None` when the AI path is disabled.
    pub fn ai_provider(&self) -> anyhow::Result<Option<Arc<dyn AIProvider>>> {
        if !self.ai_enabled() {
            return Ok(None);
        }
        let provider = create_provider(&self.ai.provider, None, self.ai.model.clone())?;
        Ok(Some(Arc::from(provider)))
    }
}

fn parse_env<T>(var: &'static str, value: String) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    value.trim().parse().map_err(|e: T::Err| ConfigError::Env {
        var,
        reason: e.to_string(),
        value,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key: &str| vars.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = MetagraphConfig::default();
        assert_eq!(config.graph, PathBuf::from("metagraph.graphson"));
        assert_eq!(config.import.cache_dir, PathBuf::from(".cache/import"));
        assert_eq!(config.import.max_deterministic_bytes, 16_384);
        assert_eq!(config.import.concurrency, 4);
        assert!(!config.ai_enabled());
        assert!(config.ai_provider().unwrap().is_none());
    }

    #[test]
    fn test_partial_file_keeps_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(CONFIG_FILE);
        std::fs::write(&path, "[import]\nconcurrency = 8\n\n[ai]\nprovider = \"anthropic\"\n").unwrap();

        let config = MetagraphConfig::from_file(&path).unwrap();
        assert_eq!(config.import.concurrency, 8);
        assert_eq!(config.import.max_deterministic_bytes, 16_384);
        assert_eq!(config.ai.provider, "anthropic");
        assert_eq!(config.graph, PathBuf::from(GRAPH_FILE));
    }

    #[test]
    fn test_invalid_file_is_parse_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(CONFIG_FILE);
        std::fs::write(&path, "[import]\nconcurrency = \"many\"\n").unwrap();
        assert!(matches!(
            MetagraphConfig::from_file(&path),
            Err(ConfigError::Parse { .. })
        ));
        assert!(matches!(
            MetagraphConfig::load(Some(&dir.path().join("missing.toml"))),
            Err(ConfigError::Read { .. })
        ));
    }

    #[test]
    fn test_env_overrides() {
        let mut config = MetagraphConfig::default();
        config
            .apply_env(env(&[
                ("METAGRAPH_GRAPH", "g/other.graphson"),
                ("METAGRAPH_CACHE_DIR", "/tmp/mg-cache"),
                ("METAGRAPH_MAX_DETERMINISTIC_BYTES", "1024"),
                ("METAGRAPH_CONCURRENCY", "2"),
                ("METAGRAPH_AI_PROVIDER", "openai"),
                ("OPENAI_MODEL", "gpt-4o"),
            ]))
            .unwrap();

        assert_eq!(config.graph, PathBuf::from("g/other.graphson"));
        assert_eq!(config.import.cache_dir, PathBuf::from("/tmp/mg-cache"));
        assert_eq!(config.import.max_deterministic_bytes, 1024);
        assert_eq!(config.import.concurrency, 2);
        assert_eq!(config.ai.provider, "openai");
        assert_eq!(config.ai.model.as_deref(), Some("gpt-4o"));
    }

    #[test]
    fn test_openai_model_ignored_for_other_providers() {
        let mut config = MetagraphConfig::default();
        config.apply_env(env(&[("OPENAI_MODEL", "gpt-4o")])).unwrap();
        assert_eq!(config.ai.model, None);
    }

    #[test]
    fn test_bad_env_values() {
        let mut config = MetagraphConfig::default();
        let err = config
            .apply_env(env(&[("METAGRAPH_MAX_DETERMINISTIC_BYTES", "big")]))
            .unwrap_err();
        assert!(matches!(err, ConfigError::Env { var: "METAGRAPH_MAX_DETERMINISTIC_BYTES", .. }));

        let err = config.apply_env(env(&[("METAGRAPH_CONCURRENCY", "0")])).unwrap_err();
        assert!(matches!(err, ConfigError::Env { var: "METAGRAPH_CONCURRENCY", .. }));
    }

    #[test]
    fn test_unknown_provider_is_rejected() {
        let mut config = MetagraphConfig::default();
        config.ai.provider = "mystery".into();
        assert!(config.ai_provider().is_err());
    }
}
