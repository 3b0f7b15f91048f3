use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

pub const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";
pub const DEFAULT_MODEL: &str = "gpt-4.1-mini";
pub const DEFAULT_MAX_TOOL_ITERATIONS: u32 = 8;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to parse config {path}: {source}")]
    Parse {
        path: PathBuf,
        source: serde_json::Error,
    },
}

#[derive(Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub instructions: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub organization: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub project: Option<String>,
    pub headers: BTreeMap<String, String>,
    pub parallel_tool_calls: bool,
    pub max_tool_iterations: u32,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: None,
            model: None,
            instructions: None,
            organization: None,
            project: None,
            headers: BTreeMap::new(),
            parallel_tool_calls: false,
            max_tool_iterations: DEFAULT_MAX_TOOL_ITERATIONS,
        }
    }
}

impl fmt::Debug for ClientConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientConfig")
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .field("base_url", &self.base_url)
            .field("model", &self.model)
            .field("instructions", &self.instructions)
            .field("organization", &self.organization)
            .field("project", &self.project)
            .field("headers", &self.headers.keys().collect::<Vec<_>>())
            .field("parallel_tool_calls", &self.parallel_tool_calls)
            .field("max_tool_iterations", &self.max_tool_iterations)
            .finish()
    }
}

impl ClientConfig {
    /// Everything from the environment, defaults elsewhere.
    pub fn from_env() -> Self {
        let mut config = Self::default().with_env_fallbacks();
        if let Some(value) = env_var("PARLEY_PARALLEL_TOOL_CALLS") {
            config.parallel_tool_calls = parse_bool(&value);
        }
        if let Some(value) = env_var("PARLEY_MAX_TOOL_ITERATIONS") {
            match value.trim().parse::<u32>() {
                Ok(limit) => config.max_tool_iterations = limit,
                Err(err) => tracing::warn!(
                    value = %value,
                    error = %err,
                    "invalid PARLEY_MAX_TOOL_ITERATIONS; keeping default"
                ),
            }
        }
        config
    }

    /// Reads a JSON config file, then fills unset connection parameters from
    /// the environment.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let config: Self = serde_json::from_str(&raw).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(config.with_env_fallbacks())
    }

    pub fn with_env_fallbacks(mut self) -> Self {
        fill(&mut self.api_key, &["PARLEY_API_KEY", "OPENAI_API_KEY"]);
        fill(&mut self.base_url, &["PARLEY_BASE_URL", "OPENAI_BASE_URL"]);
        fill(&mut self.model, &["PARLEY_MODEL"]);
        fill(&mut self.instructions, &["PARLEY_INSTRUCTIONS"]);
        fill(&mut self.organization, &["OPENAI_ORG_ID", "OPENAI_ORGANIZATION"]);
        fill(&mut self.project, &["OPENAI_PROJECT_ID"]);
        self
    }

    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(api_key.into());
        self
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = Some(base_url.into());
        self
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    pub fn with_instructions(mut self, instructions: impl Into<String>) -> Self {
        self.instructions = Some(instructions.into());
        self
    }

    pub fn with_organization(mut self, organization: impl Into<String>) -> Self {
        self.organization = Some(organization.into());
        self
    }

    pub fn with_project(mut self, project: impl Into<String>) -> Self {
        self.project = Some(project.into());
        self
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }

    pub fn with_parallel_tool_calls(mut self, enabled: bool) -> Self {
        self.parallel_tool_calls = enabled;
        self
    }

    pub fn with_max_tool_iterations(mut self, limit: u32) -> Self {
        self.max_tool_iterations = limit;
        self
    }

    pub fn api_key(&self) -> Option<&str> {
        self.api_key
            .as_deref()
            .map(str::trim)
            .filter(|key| !key.is_empty())
    }

    pub fn base_url(&self) -> &str {
        self.base_url
            .as_deref()
            .map(str::trim)
            .filter(|url| !url.is_empty())
            .unwrap_or(DEFAULT_BASE_URL)
    }

    pub fn model(&self) -> &str {
        self.model
            .as_deref()
            .map(str::trim)
            .filter(|model| !model.is_empty())
            .unwrap_or(DEFAULT_MODEL)
    }

    pub fn responses_url(&self) -> String {
        format!("{}/responses", self.base_url().trim_end_matches('/'))
    }

    pub fn is_ready(&self) -> bool {
        self.api_key().is_some()
    }
}

fn fill(slot: &mut Option<String>, keys: &[&str]) {
    if slot.is_some() {
        return;
    }
    *slot = keys.iter().find_map(|key| env_var(key));
}

fn env_var(key: &str) -> Option<String> {
    std::env::var(key)
        .ok()
        .filter(|value| !value.trim().is_empty())
}

fn parse_bool(value: &str) -> bool {
    matches!(
        value.trim().to_ascii_lowercase().as_str(),
        "1" | "true" | "yes" | "on"
    )
}
