pub mod paths;
pub mod service;
pub mod validation;

pub use paths::AppPaths;
pub use service::ConfigService;

use serde_json::Value;

/// Look up a dotted path (`"pipeline.top_k"`) in a merged config value.
pub fn lookup<'a>(config: &'a Value, path: &str) -> Option<&'a Value> {
    path.split('.')
        .try_fold(config, |value, key| value.get(key))
}

pub fn get_str<'a>(config: &'a Value, path: &str) -> Option<&'a str> {
    lookup(config, path).and_then(|v| v.as_str())
}

pub fn get_u64(config: &Value, path: &str) -> Option<u64> {
    lookup(config, path).and_then(|v| v.as_u64())
}

pub fn get_f64(config: &Value, path: &str) -> Option<f64> {
    lookup(config, path).and_then(|v| v.as_f64())
}

pub fn get_bool(config: &Value, path: &str) -> Option<bool> {
    lookup(config, path).and_then(|v| v.as_bool())
}
