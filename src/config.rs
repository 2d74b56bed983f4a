//! Process configuration: defaults, optional JSON file, environment
//! overrides, in that order. Resolved once at startup and threaded into
//! constructors; nothing reads the environment lazily mid-run.

use std::env;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

pub const DEFAULT_API_BASE: &str = "https://api.openai.com/v1";
pub const DEFAULT_MODEL: &str = "gpt-4o-mini";
pub const DEFAULT_PORT: u16 = 8080;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// API key for the chat-completions backend.
    pub api_key: Option<String>,
    pub api_base: String,
    pub model: String,
    pub temperature: f32,
    /// Per-request timeout for model calls, in seconds.
    pub request_timeout_secs: u64,
    /// Page navigation timeout for the fetch browser, in milliseconds.
    pub navigation_timeout_ms: u64,
    /// Workspace root for sandboxed tools.
    pub workspace: Option<PathBuf>,
    pub port: u16,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_key: None,
            api_base: DEFAULT_API_BASE.to_string(),
            model: DEFAULT_MODEL.to_string(),
            temperature: 0.2,
            request_timeout_secs: 60,
            navigation_timeout_ms: 20_000,
            workspace: None,
            port: DEFAULT_PORT,
        }
    }
}

impl Config {
    /// Load configuration: defaults, then the JSON file (if any), then
    /// environment overrides.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut config = match path {
            Some(path) if path.exists() => {
                let content = std::fs::read_to_string(path)
                    .with_context(|| format!("reading config file {}", path.display()))?;
                let config: Config = serde_json::from_str(&content)
                    .with_context(|| format!("parsing config file {}", path.display()))?;
                info!(path = %path.display(), "loaded configuration file");
                config
            }
            Some(path) => {
                warn!(path = %path.display(), "config file not found, using defaults");
                Config::default()
            }
            None => Config::default(),
        };
        config.apply_env_overrides();
        Ok(config)
    }

    fn apply_env_overrides(&mut self) {
        if let Some(key) = env_string("WEBSCOUT_API_KEY").or_else(|| env_string("OPENAI_API_KEY")) {
            self.api_key = Some(key);
        }
        if let Some(base) = env_string("WEBSCOUT_API_BASE") {
            self.api_base = base;
        }
        if let Some(model) = env_string("WEBSCOUT_MODEL") {
            self.model = model;
        }
        if let Some(workspace) = env_string("WEBSCOUT_WORKSPACE") {
            self.workspace = Some(PathBuf::from(workspace));
        }
        if let Some(port) = env_string("WEBSCOUT_PORT").and_then(|v| v.parse().ok()) {
            self.port = port;
        }
    }

    /// Pick the workspace root: CLI flag beats config/env, which beat the
    /// process working directory.
    pub fn resolve_workspace(&self, flag: Option<&Path>) -> Result<PathBuf> {
        if let Some(path) = flag {
            return Ok(path.to_path_buf());
        }
        if let Some(path) = &self.workspace {
            return Ok(path.clone());
        }
        env::current_dir().context("determining current directory for workspace root")
    }

    pub fn require_api_key(&self) -> Result<&str> {
        self.api_key
            .as_deref()
            .context("no API key configured; set WEBSCOUT_API_KEY or add api_key to the config file")
    }
}

fn env_string(name: &str) -> Option<String> {
    env::var(name)
        .ok()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_sane() {
        let config = Config::default();
        assert_eq!(config.api_base, DEFAULT_API_BASE);
        assert_eq!(config.port, DEFAULT_PORT);
        assert!(config.api_key.is_none());
    }

    #[test]
    fn flag_wins_workspace_resolution() {
        let mut config = Config::default();
        config.workspace = Some(PathBuf::from("/from-config"));
        let resolved = config
            .resolve_workspace(Some(Path::new("/from-flag")))
            .unwrap();
        assert_eq!(resolved, PathBuf::from("/from-flag"));

        let resolved = config.resolve_workspace(None).unwrap();
        assert_eq!(resolved, PathBuf::from("/from-config"));
    }

    #[test]
    fn partial_file_fills_from_defaults() {
        let config: Config = serde_json::from_str(r#"{"model": "custom-model"}"#).unwrap();
        assert_eq!(config.model, "custom-model");
        assert_eq!(config.api_base, DEFAULT_API_BASE);
    }
}
