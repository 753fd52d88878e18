use std::collections::HashMap;
use std::env;
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{AgentError, Result};

pub const DEFAULT_MODEL: &str = "gemini-2.5-pro";
pub const DOTENV_FILE: &str = ".env";
pub const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ModelConfig {
    #[serde(default = "default_model")]
    pub model: String,
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default)]
    pub api_key: Option<String>,
    /// Request timeout for the backend. Unset means wait indefinitely.
    #[serde(default)]
    pub timeout_secs: Option<u64>,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            model: default_model(),
            base_url: default_base_url(),
            api_key: None,
            timeout_secs: None,
        }
    }
}

fn default_model() -> String {
    DEFAULT_MODEL.into()
}

fn default_base_url() -> String {
    DEFAULT_BASE_URL.into()
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct LoopConfig {
    /// Upper bound on model turns per run. Unset means unbounded.
    #[serde(default)]
    pub max_steps: Option<usize>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ToolsConfig {
    /// Kill terminal commands that run longer than this.
    #[serde(default)]
    pub command_timeout_secs: Option<u64>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct AgentConfig {
    #[serde(default)]
    pub model: ModelConfig,
    #[serde(default, rename = "loop")]
    pub run: LoopConfig,
    #[serde(default)]
    pub tools: ToolsConfig,
}

impl AgentConfig {
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let raw = fs::read_to_string(path).map_err(|err| {
            AgentError::Config(format!("failed to read {}: {err}", path.display()))
        })?;
        toml::from_str(&raw)
            .map_err(|err| AgentError::Config(format!("failed to parse configuration: {err}")))
    }

    /// Defaults (or `path` when given) overlaid with `.env` in the working
    /// directory and then the process environment. Process variables win
    /// over `.env` entries.
    pub fn from_env_or_file(path: Option<&Path>) -> Result<Self> {
        Self::load(path, Path::new(DOTENV_FILE), |key| env::var(key).ok())
    }

    fn load(
        path: Option<&Path>,
        dotenv_path: &Path,
        process_env: impl Fn(&str) -> Option<String>,
    ) -> Result<Self> {
        let dotenv = read_dotenv(dotenv_path)?;
        let mut cfg = match path {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };
        cfg.apply_overrides(|key| process_env(key).or_else(|| dotenv.get(key).cloned()))?;
        Ok(cfg)
    }

    pub fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) -> Result<()> {
        if let Some(key) = lookup("OPENAI_API_KEY") {
            self.model.api_key = Some(key);
        }
        if let Some(url) = lookup("OPENAI_BASE_URL") {
            self.model.base_url = url;
        }
        if let Some(model) = lookup("REACT_AGENT_MODEL") {
            self.model.model = model;
        }
        if let Some(raw) = lookup("REACT_AGENT_MODEL_TIMEOUT") {
            self.model.timeout_secs = Some(parse_number("REACT_AGENT_MODEL_TIMEOUT", &raw)?);
        }
        if let Some(raw) = lookup("REACT_AGENT_MAX_STEPS") {
            self.run.max_steps = Some(parse_number("REACT_AGENT_MAX_STEPS", &raw)?);
        }
        if let Some(raw) = lookup("REACT_AGENT_COMMAND_TIMEOUT") {
            self.tools.command_timeout_secs =
                Some(parse_number("REACT_AGENT_COMMAND_TIMEOUT", &raw)?);
        }
        Ok(())
    }
}

/// `KEY=value` pairs from a dotenv file. A missing file yields no entries.
fn read_dotenv(path: &Path) -> Result<HashMap<String, String>> {
    let parse_error =
        |err: dotenvy::Error| AgentError::Config(format!("failed to load {}: {err}", path.display()));
    match dotenvy::from_path_iter(path) {
        Ok(entries) => entries
            .collect::<std::result::Result<HashMap<_, _>, _>>()
            .map_err(parse_error),
        Err(err) if err.not_found() => Ok(HashMap::new()),
        Err(err) => Err(parse_error(err)),
    }
}

fn parse_number<T: std::str::FromStr>(key: &str, raw: &str) -> Result<T> {
    raw.trim()
        .parse()
        .map_err(|_| AgentError::Config(format!("{key} must be a non-negative integer, got `{raw}`")))
}
