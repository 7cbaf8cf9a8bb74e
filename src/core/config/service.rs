use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde_json::{Map, Value};

use super::paths::AppPaths;
use super::validation::validate_config;
use crate::core::errors::ApiError;

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
        if let Ok(path) = env::var("OVERLAY_RAG_CONFIG_PATH") {
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

    /// Load `config.yml`, overlay `secrets.yaml` on top and validate the result.
    ///
    /// Missing or unparsable files are treated as empty objects so a fresh
    /// install starts on defaults.
    pub fn load_config(&self) -> Result<Value, ApiError> {
        let public_config = load_yaml_file(&self.config_path());
        let secrets_config = load_yaml_file(&self.secrets_path());
        let merged = deep_merge(&public_config, &secrets_config);
        validate_config(&merged)?;
        Ok(merged)
    }
}

fn load_yaml_file(path: &Path) -> Value {
    if !path.exists() {
        return Value::Object(Map::new());
    }

    match fs::read_to_string(path) {
        Ok(contents) => match serde_yaml::from_str::<Value>(&contents) {
            Ok(value) => match value {
                Value::Object(_) => value,
                _ => Value::Object(Map::new()),
            },
            Err(err) => {
                tracing::warn!("Ignoring unparsable config {}: {}", path.display(), err);
                Value::Object(Map::new())
            }
        },
        Err(_) => Value::Object(Map::new()),
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

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn deep_merge_overlays_secrets_on_public_config() {
        let base = json!({
            "llm": { "base_url": "https://api.openai.com", "timeout_secs": 60 },
            "search": { "provider": "brave" }
        });
        let secrets = json!({
            "llm": { "api_key": "sk-test" },
            "search": { "brave_api_key": "brv" }
        });

        let merged = deep_merge(&base, &secrets);

        assert_eq!(
            merged,
            json!({
                "llm": { "base_url": "https://api.openai.com", "timeout_secs": 60, "api_key": "sk-test" },
                "search": { "provider": "brave", "brave_api_key": "brv" }
            })
        );
    }

    #[test]
    fn load_config_reads_yaml_and_secrets() {
        let dir = tempfile::tempdir().unwrap();
        let paths = AppPaths::with_data_dir(dir.path().to_path_buf(), dir.path().to_path_buf());
        fs::write(
            dir.path().join("config.yml"),
            "pipeline:\n  top_k: 4\n  strategy: hybrid\n",
        )
        .unwrap();
        fs::write(&paths.secrets_path, "llm:\n  api_key: sk-abc\n").unwrap();

        let service = ConfigService::new(Arc::new(paths));
        let config = service.load_config().unwrap();

        assert_eq!(config["pipeline"]["top_k"], json!(4));
        assert_eq!(config["llm"]["api_key"], json!("sk-abc"));
    }

    #[test]
    fn load_config_rejects_invalid_values() {
        let dir = tempfile::tempdir().unwrap();
        let paths = AppPaths::with_data_dir(dir.path().to_path_buf(), dir.path().to_path_buf());
        fs::write(dir.path().join("config.yml"), "pipeline:\n  top_k: 0\n").unwrap();

        let service = ConfigService::new(Arc::new(paths));
        assert!(matches!(
            service.load_config(),
            Err(ApiError::BadRequest(_))
        ));
    }
}
