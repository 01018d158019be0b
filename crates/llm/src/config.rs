use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Connection settings for the completion endpoint
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ClientConfig {
    #[serde(default = "ClientConfig::default_base_url")]
    pub base_url: String,
    #[serde(default = "ClientConfig::default_model")]
    pub model: String,
    #[serde(default)]
    pub api_key: Option<String>,
    #[serde(default)]
    pub temperature: Option<f32>,
    #[serde(default)]
    pub request_timeout_secs: Option<u64>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: Self::default_base_url(),
            model: Self::default_model(),
            api_key: None,
            temperature: None,
            request_timeout_secs: None,
        }
    }
}

impl ClientConfig {
    const FILE_NAME: &'static str = "client.json";

    pub fn default_base_url() -> String {
        "http://localhost:8080/v1".to_string()
    }

    pub fn default_model() -> String {
        "default".to_string()
    }

    /// Default location: `<config dir>/canvas-chat/client.json`
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("canvas-chat").join(Self::FILE_NAME))
    }

    /// Load from `custom_path`, or from the default location if it exists.
    ///
    /// An explicit path must exist; a missing default file yields defaults.
    pub fn load(custom_path: Option<&Path>) -> Result<Self> {
        match custom_path {
            Some(path) => Self::load_from_file(path),
            None => match Self::default_path() {
                Some(path) if path.exists() => Self::load_from_file(&path),
                _ => Ok(Self::default()),
            },
        }
    }

    pub fn load_from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read client config: {}", path.display()))?;
        let value: serde_json::Value = serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse client config: {}", path.display()))?;
        let value = substitute_env_vars_in_value(value)
            .with_context(|| format!("Failed to substitute env vars in: {}", path.display()))?;

        serde_json::from_value(value)
            .with_context(|| format!("Invalid client config: {}", path.display()))
    }
}

/// Recursively substitute environment variables in JSON values
fn substitute_env_vars_in_value(value: serde_json::Value) -> Result<serde_json::Value> {
    match value {
        serde_json::Value::String(s) => Ok(serde_json::Value::String(
            substitute_env_vars_in_string(&s)?,
        )),
        serde_json::Value::Object(map) => {
            let mut result = serde_json::Map::with_capacity(map.len());
            for (key, val) in map {
                result.insert(key, substitute_env_vars_in_value(val)?);
            }
            Ok(serde_json::Value::Object(result))
        }
        serde_json::Value::Array(arr) => Ok(serde_json::Value::Array(
            arr.into_iter()
                .map(substitute_env_vars_in_value)
                .collect::<Result<_>>()?,
        )),
        other => Ok(other),
    }
}

/// Replace every `${VAR}` in `input` with the variable's value
fn substitute_env_vars_in_string(input: &str) -> Result<String> {
    let mut result = String::with_capacity(input.len());
    let mut rest = input;

    while let Some(start) = rest.find("${") {
        result.push_str(&rest[..start]);
        let after = &rest[start + 2..];
        let end = after
            .find('}')
            .with_context(|| format!("Unclosed environment variable reference in '{input}'"))?;
        let name = &after[..end];
        let value = std::env::var(name)
            .with_context(|| format!("Environment variable '{name}' not set"))?;
        result.push_str(&value);
        rest = &after[end + 1..];
    }
    result.push_str(rest);

    Ok(result)
}
