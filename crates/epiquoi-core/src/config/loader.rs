//! Configuration loading from layered sources

use super::model::ClientConfig;
use crate::error::{ChatError, ChatResultOf};
use reqwest::Url;
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

/// Full URL of the single-shot chat endpoint, as used by the web frontend
pub const ENV_API_URL: &str = "EPIQUOI_API_URL";
pub const ENV_BASE_URL: &str = "EPIQUOI_BASE_URL";
pub const ENV_STREAM_PATH: &str = "EPIQUOI_STREAM_PATH";
pub const ENV_REQUEST_TIMEOUT_SECS: &str = "EPIQUOI_REQUEST_TIMEOUT_SECS";
pub const ENV_CONNECT_TIMEOUT_SECS: &str = "EPIQUOI_CONNECT_TIMEOUT_SECS";

type EnvLookup = Box<dyn Fn(&str) -> Option<String> + Send + Sync>;

/// Partial configuration; only the fields that are set win a merge
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ConfigOverrides {
    pub base_url: Option<String>,
    pub chat_path: Option<String>,
    pub stream_path: Option<String>,
    pub health_path: Option<String>,
    pub connect_timeout_secs: Option<u64>,
    pub request_timeout_secs: Option<u64>,
    pub max_message_chars: Option<usize>,
    pub max_frame_bytes: Option<usize>,
}

impl ConfigOverrides {
    /// Apply every set field onto `config`
    pub fn apply_to(self, config: &mut ClientConfig) {
        if let Some(v) = self.base_url {
            config.base_url = v;
        }
        if let Some(v) = self.chat_path {
            config.chat_path = v;
        }
        if let Some(v) = self.stream_path {
            config.stream_path = v;
        }
        if let Some(v) = self.health_path {
            config.health_path = v;
        }
        if let Some(v) = self.connect_timeout_secs {
            config.connect_timeout_secs = v;
        }
        if let Some(v) = self.request_timeout_secs {
            config.request_timeout_secs = v;
        }
        if let Some(v) = self.max_message_chars {
            config.max_message_chars = v;
        }
        if let Some(v) = self.max_frame_bytes {
            config.max_frame_bytes = v;
        }
    }

    /// Read overrides through `lookup` instead of the process environment
    pub fn from_env_with(lookup: impl Fn(&str) -> Option<String>) -> ChatResultOf<Self> {
        let mut overrides = Self::default();

        if let Some(api_url) = lookup(ENV_API_URL) {
            let (base, path) = split_api_url(&api_url)?;
            overrides.base_url = Some(base);
            if let Some(path) = path {
                overrides.stream_path = Some(format!("{}/stream", path));
                overrides.chat_path = Some(path);
            }
        }

        // A bare base URL is more specific than the frontend-style chat URL
        if let Some(base) = lookup(ENV_BASE_URL) {
            overrides.base_url = Some(base.trim_end_matches('/').to_string());
        }
        if let Some(path) = lookup(ENV_STREAM_PATH) {
            overrides.stream_path = Some(path);
        }
        if let Some(raw) = lookup(ENV_REQUEST_TIMEOUT_SECS) {
            overrides.request_timeout_secs = Some(parse_secs(ENV_REQUEST_TIMEOUT_SECS, &raw)?);
        }
        if let Some(raw) = lookup(ENV_CONNECT_TIMEOUT_SECS) {
            overrides.connect_timeout_secs = Some(parse_secs(ENV_CONNECT_TIMEOUT_SECS, &raw)?);
        }

        Ok(overrides)
    }
}

fn parse_secs(name: &str, raw: &str) -> ChatResultOf<u64> {
    raw.trim()
        .parse()
        .map_err(|_| ChatError::config(format!("Invalid {} value: '{}'", name, raw)))
}

/// Split `http://host:8000/chat` into its origin and a non-root path
fn split_api_url(raw: &str) -> ChatResultOf<(String, Option<String>)> {
    let url = Url::parse(raw.trim())
        .map_err(|e| ChatError::config(format!("Invalid {} '{}': {}", ENV_API_URL, raw, e)))?;

    let origin = url.origin().ascii_serialization();
    let path = url.path().trim_end_matches('/');
    let path = (!path.is_empty()).then(|| path.to_string());
    Ok((origin, path))
}

/// Source of configuration data
#[derive(Debug, Clone)]
pub enum ConfigSource {
    /// Built-in defaults
    Default,
    /// A JSON, TOML or YAML file that must exist
    File(PathBuf),
    /// A file that is skipped when absent
    OptionalFile(PathBuf),
    /// `EPIQUOI_*` environment variables
    Environment,
    /// Values supplied by the caller, usually the command line
    Overrides(ConfigOverrides),
}

/// Configuration loader; later sources override earlier ones
pub struct ConfigLoader {
    sources: Vec<ConfigSource>,
    env: EnvLookup,
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}

impl ConfigLoader {
    pub fn new() -> Self {
        Self {
            sources: Vec::new(),
            env: Box::new(|key: &str| std::env::var(key).ok()),
        }
    }

    /// Add a configuration source
    pub fn add_source(mut self, source: ConfigSource) -> Self {
        self.sources.push(source);
        self
    }

    pub fn with_defaults(self) -> Self {
        self.add_source(ConfigSource::Default)
    }

    pub fn with_file<P: AsRef<Path>>(self, path: P) -> Self {
        self.add_source(ConfigSource::File(path.as_ref().to_path_buf()))
    }

    pub fn with_optional_file<P: AsRef<Path>>(self, path: P) -> Self {
        self.add_source(ConfigSource::OptionalFile(path.as_ref().to_path_buf()))
    }

    pub fn with_env(self) -> Self {
        self.add_source(ConfigSource::Environment)
    }

    pub fn with_overrides(self, overrides: ConfigOverrides) -> Self {
        self.add_source(ConfigSource::Overrides(overrides))
    }

    /// Replace the environment lookup (tests, embedding)
    pub fn with_env_lookup(
        mut self,
        lookup: impl Fn(&str) -> Option<String> + Send + Sync + 'static,
    ) -> Self {
        self.env = Box::new(lookup);
        self
    }

    /// Merge all sources in order and validate the result
    pub fn load(self) -> ChatResultOf<ClientConfig> {
        let mut config = ClientConfig::default();

        for source in &self.sources {
            match source {
                ConfigSource::Default => {
                    tracing::debug!("Loading default config");
                    config = ClientConfig::default();
                }
                ConfigSource::File(path) => {
                    tracing::debug!("Loading config from file: {}", path.display());
                    load_from_file(path)?.apply_to(&mut config);
                }
                ConfigSource::OptionalFile(path) => {
                    if path.exists() {
                        tracing::debug!("Loading config from file: {}", path.display());
                        load_from_file(path)?.apply_to(&mut config);
                    } else {
                        tracing::trace!("No config file at {}", path.display());
                    }
                }
                ConfigSource::Environment => {
                    tracing::debug!("Loading config from environment");
                    ConfigOverrides::from_env_with(&self.env)?.apply_to(&mut config);
                }
                ConfigSource::Overrides(overrides) => {
                    tracing::debug!("Applying caller overrides");
                    overrides.clone().apply_to(&mut config);
                }
            }
        }

        config.validate()?;
        tracing::debug!("Resolved backend base URL: {}", config.base_url);
        Ok(config)
    }
}

/// Per-user config file, e.g. `~/.config/epiquoi/config.toml` on Linux
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("epiquoi").join("config.toml"))
}

/// Parse a config file; the format follows the extension, JSON otherwise
pub fn load_from_file(path: &Path) -> ChatResultOf<ConfigOverrides> {
    let content = fs::read_to_string(path).map_err(|e| {
        ChatError::config(format!(
            "Failed to read config file '{}': {}",
            path.display(),
            e
        ))
    })?;

    let overrides = match path.extension().and_then(|s| s.to_str()) {
        Some("toml") => toml::from_str(&content).map_err(|e| {
            ChatError::config(format!("Failed to parse TOML config '{}': {}", path.display(), e))
        })?,
        Some("yaml") | Some("yml") => serde_yaml::from_str(&content).map_err(|e| {
            ChatError::config(format!("Failed to parse YAML config '{}': {}", path.display(), e))
        })?,
        _ => serde_json::from_str(&content).map_err(|e| {
            ChatError::config(format!("Failed to parse JSON config '{}': {}", path.display(), e))
        })?,
    };

    Ok(overrides)
}
