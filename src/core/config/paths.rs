use std::env;
use std::fs;
use std::path::{Path, PathBuf};

const DATA_DIR_NAME: &str = "overlay-rag";

/// Where the service reads config and keeps its data.
///
/// `project_root` holds the shipped `config.yml`; everything the service
/// writes (logs, the vector database, secrets) lives under `user_data_dir`.
#[derive(Debug, Clone)]
pub struct AppPaths {
    pub project_root: PathBuf,
    pub user_data_dir: PathBuf,
    pub log_dir: PathBuf,
    pub vector_db_path: PathBuf,
    pub secrets_path: PathBuf,
}

impl AppPaths {
    /// Resolve from `OVERLAY_RAG_ROOT` and `OVERLAY_RAG_DATA_DIR`, else the
    /// crate directory and the platform data directory.
    pub fn new() -> Self {
        let project_root = env_path("OVERLAY_RAG_ROOT").unwrap_or_else(default_project_root);
        let user_data_dir =
            env_path("OVERLAY_RAG_DATA_DIR").unwrap_or_else(|| default_data_dir(&project_root));
        Self::with_data_dir(project_root, user_data_dir)
    }

    /// Derive every data path from `user_data_dir`, creating it and the log
    /// directory if missing.
    pub fn with_data_dir(project_root: PathBuf, user_data_dir: PathBuf) -> Self {
        let paths = AppPaths {
            log_dir: user_data_dir.join("logs"),
            vector_db_path: user_data_dir.join("vectors.db"),
            secrets_path: user_data_dir.join("secrets.yaml"),
            project_root,
            user_data_dir,
        };

        for dir in [&paths.user_data_dir, &paths.log_dir] {
            let _ = fs::create_dir_all(dir);
        }
        paths
    }
}

impl Default for AppPaths {
    fn default() -> Self {
        Self::new()
    }
}

fn env_path(key: &str) -> Option<PathBuf> {
    env::var_os(key)
        .filter(|value| !value.is_empty())
        .map(PathBuf::from)
}

fn default_project_root() -> PathBuf {
    let manifest_dir = PathBuf::from(env!("CARGO_MANIFEST_DIR"));
    if manifest_dir.join("config.yml").exists() {
        return manifest_dir;
    }
    env::current_dir().unwrap_or(manifest_dir)
}

// Debug builds keep data next to the checkout.
fn default_data_dir(project_root: &Path) -> PathBuf {
    if cfg!(debug_assertions) {
        return project_root.join(".overlay-rag");
    }
    platform_data_home().join(DATA_DIR_NAME)
}

fn platform_data_home() -> PathBuf {
    let home = env_path("HOME")
        .or_else(|| env_path("USERPROFILE"))
        .unwrap_or_else(|| PathBuf::from("."));

    if cfg!(target_os = "windows") {
        env_path("LOCALAPPDATA").unwrap_or(home)
    } else if cfg!(target_os = "macos") {
        home.join("Library").join("Application Support")
    } else {
        env_path("XDG_DATA_HOME").unwrap_or_else(|| home.join(".local").join("share"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn data_paths_derive_from_data_dir() {
        let dir = tempfile::tempdir().unwrap();
        let data_dir = dir.path().join("data");

        let paths = AppPaths::with_data_dir(dir.path().to_path_buf(), data_dir.clone());

        assert_eq!(paths.project_root, dir.path());
        assert_eq!(paths.vector_db_path, data_dir.join("vectors.db"));
        assert_eq!(paths.secrets_path, data_dir.join("secrets.yaml"));
        assert!(paths.log_dir.is_dir());
        assert!(paths.log_dir.starts_with(&data_dir));
    }

    #[test]
    fn debug_builds_keep_data_under_project_root() {
        let root = PathBuf::from("/srv/overlay");
        let data_dir = default_data_dir(&root);
        if cfg!(debug_assertions) {
            assert_eq!(data_dir, root.join(".overlay-rag"));
        } else {
            assert!(data_dir.ends_with(DATA_DIR_NAME));
        }
    }
}
