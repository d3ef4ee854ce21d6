use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde_json::{Map, Value};

use super::defaults::default_config;
use super::paths::AppPaths;
use super::settings::RagSettings;
use super::validation::validate_config;
use crate::core::errors::RagError;

const REDACT_PLACEHOLDER: &str = "****";

const SENSITIVE_PATTERNS: [&str; 8] = [
    "api_key",
    "secret",
    "password",
    "_token",
    "token_",
    "credential",
    "private_key",
    "bearer",
];

const SENSITIVE_WHITELIST: [&str; 3] = ["max_tokens", "token_count", "tokens"];

const API_KEY_ENV_VARS: [&str; 2] = ["RAG_LLM_API_KEY", "OPENAI_API_KEY"];

#[derive(Clone)]
pub struct ConfigService {
    paths: Arc<AppPaths>,
}

impl ConfigService {
    pub fn new(paths: Arc<AppPaths>) -> Self {
        Self { paths }
    }

    pub fn paths(&self) -> &AppPaths {
        &self.paths
    }

    pub fn config_path(&self) -> PathBuf {
        if let Ok(path) = env::var("RAG_CONFIG_PATH") {
            return PathBuf::from(path);
        }

        let user_config = self.paths.user_data_dir.join("config.yml");
        if user_config.exists() {
            return user_config;
        }

        self.paths.project_root.join("config.yml")
    }

    pub fn secrets_path(&self) -> PathBuf {
        self.paths.secrets_path.clone()
    }

    /// Defaults, then `config.yml`, then `secrets.yaml`, then API key env vars.
    pub fn load_config(&self) -> Result<Value, RagError> {
        let public_config = load_yaml_file(&self.config_path())?;
        let secrets_config = load_yaml_file(&self.secrets_path())?;

        let merged = deep_merge(&default_config(), &public_config);
        let mut merged = deep_merge(&merged, &secrets_config);
        apply_env_overrides(&mut merged);

        validate_config(&merged)?;
        Ok(merged)
    }

    pub fn load_settings(&self) -> Result<RagSettings, RagError> {
        let config = self.load_config()?;
        tracing::debug!(
            "Loaded configuration from {}: {}",
            self.config_path().display(),
            redact_sensitive_values(&config)
        );
        RagSettings::from_value(&config)
    }

    pub fn redact_sensitive_values(&self, value: &Value) -> Value {
        redact_sensitive_values(value)
    }
}

fn load_yaml_file(path: &Path) -> Result<Value, RagError> {
    if !path.exists() {
        return Ok(Value::Object(Map::new()));
    }

    let contents = fs::read_to_string(path)
        .map_err(|e| RagError::Config(format!("failed to read {}: {}", path.display(), e)))?;
    let value = serde_yaml::from_str::<Value>(&contents)
        .map_err(|e| RagError::Config(format!("failed to parse {}: {}", path.display(), e)))?;

    match value {
        Value::Object(_) => Ok(value),
        Value::Null => Ok(Value::Object(Map::new())),
        _ => Err(RagError::Config(format!(
            "{} must contain a mapping at the top level",
            path.display()
        ))),
    }
}

fn apply_env_overrides(config: &mut Value) {
    let Some(api_key) = API_KEY_ENV_VARS
        .iter()
        .find_map(|name| env::var(name).ok().filter(|v| !v.trim().is_empty()))
    else {
        return;
    };

    if let Some(root) = config.as_object_mut() {
        let llm = root
            .entry("llm".to_string())
            .or_insert_with(|| Value::Object(Map::new()));
        if let Some(llm) = llm.as_object_mut() {
            llm.insert("api_key".to_string(), Value::String(api_key));
        }
    }
}

fn deep_merge(base: &Value, override_value: &Value) -> Value {
    match (base, override_value) {
        (Value::Object(base_map), Value::Object(override_map)) => {
            let mut merged: Map<String, Value> = base_map.clone();
            for (key, value) in override_map {
                let merged_value = match merged.get(key) {
                    Some(existing) => deep_merge(existing, value),
                    None => value.clone(),
                };
                merged.insert(key.clone(), merged_value);
            }
            Value::Object(merged)
        }
        _ => override_value.clone(),
    }
}

fn redact_sensitive_values(value: &Value) -> Value {
    match value {
        Value::Object(map) => {
            let mut redacted = Map::new();
            for (key, val) in map {
                if is_sensitive_key(key) && !val.is_null() {
                    redacted.insert(key.clone(), Value::String(REDACT_PLACEHOLDER.to_string()));
                } else {
                    redacted.insert(key.clone(), redact_sensitive_values(val));
                }
            }
            Value::Object(redacted)
        }
        Value::Array(items) => Value::Array(items.iter().map(redact_sensitive_values).collect()),
        _ => value.clone(),
    }
}

fn is_sensitive_key(key: &str) -> bool {
    let key_lower = key.to_lowercase();
    if SENSITIVE_WHITELIST
        .iter()
        .any(|allowed| *allowed == key_lower)
    {
        return false;
    }
    SENSITIVE_PATTERNS
        .iter()
        .any(|pattern| key_lower.contains(pattern))
}
