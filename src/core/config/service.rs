use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde_json::{Map, Value};

use super::defaults::default_config;
use super::paths::AppPaths;
use super::settings::AppConfig;
use super::validation::{check_http_url, validate_config};
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

const SENSITIVE_WHITELIST: [&str; 2] = ["max_tokens", "tokens"];

#[derive(Clone)]
pub struct ConfigService {
    paths: Arc<AppPaths>,
    explicit_path: Option<PathBuf>,
}

impl ConfigService {
    pub fn new(paths: Arc<AppPaths>) -> Self {
        Self {
            paths,
            explicit_path: None,
        }
    }

    /// Use `path` instead of the discovered `config.yml`.
    pub fn with_config_path(mut self, path: Option<PathBuf>) -> Self {
        self.explicit_path = path;
        self
    }

    pub fn paths(&self) -> &AppPaths {
        &self.paths
    }

    pub fn config_path(&self) -> PathBuf {
        if let Some(path) = &self.explicit_path {
            return path.clone();
        }
        if let Ok(path) = env::var("RAGLOOP_CONFIG_PATH") {
            return PathBuf::from(path);
        }

        let user_config = self.paths.user_data_dir.join("config.yml");
        if user_config.exists() {
            return user_config;
        }

        self.paths.project_root.join("config.yml")
    }

    pub fn config_write_path(&self) -> PathBuf {
        if let Some(path) = &self.explicit_path {
            return path.clone();
        }
        if let Ok(path) = env::var("RAGLOOP_CONFIG_PATH") {
            return PathBuf::from(path);
        }

        self.paths.user_data_dir.join("config.yml")
    }

    pub fn secrets_path(&self) -> PathBuf {
        self.paths.secrets_path.clone()
    }

    /// Defaults, then `config.yml`, then `secrets.yaml`, then environment.
    pub fn load_value(&self) -> Result<Value, RagError> {
        let public_config = load_yaml_file(&self.config_path())?;
        let secrets_config = load_yaml_file(&self.secrets_path())?;
        let merged = deep_merge(&default_config(), &public_config);
        let mut merged = deep_merge(&merged, &secrets_config);
        apply_env_overrides(&mut merged)?;

        validate_config(&merged)?;
        Ok(merged)
    }

    pub fn load_config(&self) -> Result<AppConfig, RagError> {
        let value = self.load_value()?;
        serde_json::from_value(value)
            .map_err(|e| RagError::Config(format!("failed to read config: {}", e)))
    }

    /// Effective config with secrets masked, for display.
    pub fn redacted(&self) -> Result<Value, RagError> {
        Ok(redact_sensitive_values(&self.load_value()?))
    }

    /// Write the built-in defaults as a starting `config.yml`. Secrets go to
    /// `secrets.yaml`.
    pub fn write_defaults(&self, force: bool) -> Result<PathBuf, RagError> {
        let config_path = self.config_write_path();
        if config_path.exists() && !force {
            return Err(RagError::Config(format!(
                "{} already exists (use --force to overwrite)",
                config_path.display()
            )));
        }

        save_config_files(self, &default_config())?;
        Ok(config_path)
    }

    /// Where the document index lives: `index.path` if set, else the data dir.
    pub fn index_path(&self, config: &AppConfig) -> PathBuf {
        config
            .index
            .path
            .clone()
            .unwrap_or_else(|| self.paths.default_index_path.clone())
    }
}

fn load_yaml_file(path: &Path) -> Result<Value, RagError> {
    if !path.exists() {
        return Ok(Value::Object(Map::new()));
    }

    let contents = fs::read_to_string(path)
        .map_err(|e| RagError::Config(format!("failed to read {}: {}", path.display(), e)))?;

    match serde_yaml::from_str::<Value>(&contents) {
        Ok(value @ Value::Object(_)) => Ok(value),
        Ok(Value::Null) => Ok(Value::Object(Map::new())),
        Ok(_) => Err(RagError::Config(format!(
            "{} must contain a mapping at the top level",
            path.display()
        ))),
        Err(e) => Err(RagError::Config(format!(
            "failed to parse {}: {}",
            path.display(),
            e
        ))),
    }
}

fn apply_env_overrides(config: &mut Value) -> Result<(), RagError> {
    if let Ok(base_url) = env::var("RAGLOOP_LLM_BASE_URL") {
        check_http_url("RAGLOOP_LLM_BASE_URL", &base_url)?;
        if let Some(llm) = config.get_mut("llm").and_then(|v| v.as_object_mut()) {
            llm.insert("base_url".to_string(), Value::String(base_url));
        }
    }
    Ok(())
}

fn save_config_files(service: &ConfigService, config: &Value) -> Result<(), RagError> {
    let (public_config, secrets_config) = split_config(config);

    let config_path = service.config_write_path();
    if let Some(parent) = config_path.parent() {
        let _ = fs::create_dir_all(parent);
    }
    let public_yaml = serde_yaml::to_string(&public_config).map_err(RagError::storage)?;
    fs::write(&config_path, public_yaml).map_err(RagError::storage)?;

    if is_empty_object(&secrets_config) {
        return Ok(());
    }

    let secrets_path = service.secrets_path();
    if let Some(parent) = secrets_path.parent() {
        let _ = fs::create_dir_all(parent);
    }
    let secrets_yaml = serde_yaml::to_string(&secrets_config).map_err(RagError::storage)?;
    fs::write(&secrets_path, secrets_yaml).map_err(RagError::storage)?;

    Ok(())
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

fn split_config(config: &Value) -> (Value, Value) {
    match config {
        Value::Object(map) => {
            let mut public_map = Map::new();
            let mut secret_map = Map::new();

            for (key, value) in map {
                match value {
                    Value::Object(_) => {
                        let (public_sub, secret_sub) = split_config(value);
                        if !is_empty_object(&public_sub) {
                            public_map.insert(key.clone(), public_sub);
                        }
                        if !is_empty_object(&secret_sub) {
                            secret_map.insert(key.clone(), secret_sub);
                        }
                    }
                    _ => {
                        if is_sensitive_key(key) {
                            if !value.is_null() {
                                secret_map.insert(key.clone(), value.clone());
                            }
                        } else {
                            public_map.insert(key.clone(), value.clone());
                        }
                    }
                }
            }

            (Value::Object(public_map), Value::Object(secret_map))
        }
        _ => (config.clone(), Value::Object(Map::new())),
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

fn is_empty_object(value: &Value) -> bool {
    matches!(value, Value::Object(map) if map.is_empty())
}
