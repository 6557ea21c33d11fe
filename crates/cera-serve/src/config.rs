//! Server configuration (`cera-serve.toml`)

use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::info;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Bind address for the HTTP listener
    #[serde(default = "default_bind")]
    pub bind: String,
    /// URL prefix the bundle is mounted under, e.g. `/cera-ar/`
    #[serde(default = "default_base_path")]
    pub base_path: String,
    /// Directory holding the built bundle, `viewer.toml` and the assets
    #[serde(default = "default_root")]
    pub root: PathBuf,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
            base_path: default_base_path(),
            root: default_root(),
        }
    }
}

fn default_bind() -> String {
    "127.0.0.1:8080".to_string()
}

fn default_base_path() -> String {
    "/".to_string()
}

fn default_root() -> PathBuf {
    PathBuf::from("web")
}

/// Normalize a mount prefix to `/segment/...` with no trailing slash.
/// The site root normalizes to the empty string.
pub fn normalize_base_path(base: &str) -> String {
    let segments: Vec<&str> = base.split('/').filter(|s| !s.is_empty()).collect();
    if segments.is_empty() {
        String::new()
    } else {
        format!("/{}", segments.join("/"))
    }
}

/// Load configuration from file, or defaults if the file does not exist
pub fn load_config(path: &Path) -> Result<Config> {
    if path.exists() {
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        info!(path = %path.display(), "Loaded configuration");
        Ok(config)
    } else {
        info!(
            path = %path.display(),
            "Configuration file not found, using defaults"
        );
        Ok(Config::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_missing_file_uses_defaults() {
        let temp_dir = TempDir::new().unwrap();
        let config = load_config(&temp_dir.path().join("absent.toml")).unwrap();
        assert_eq!(config.server.bind, "127.0.0.1:8080");
        assert_eq!(config.server.base_path, "/");
        assert_eq!(config.server.root, PathBuf::from("web"));
    }

    #[test]
    fn test_partial_file_keeps_other_defaults() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("cera-serve.toml");
        std::fs::write(&path, "[server]\nbase_path = \"/cera-ar/\"\n").unwrap();

        let config = load_config(&path).unwrap();
        assert_eq!(config.server.base_path, "/cera-ar/");
        assert_eq!(config.server.bind, "127.0.0.1:8080");
    }

    #[test]
    fn test_malformed_file_is_an_error() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("cera-serve.toml");
        std::fs::write(&path, "[server\nbind = ").unwrap();
        assert!(load_config(&path).is_err());
    }

    #[test]
    fn test_normalize_base_path() {
        assert_eq!(normalize_base_path("/"), "");
        assert_eq!(normalize_base_path(""), "");
        assert_eq!(normalize_base_path("cera-ar"), "/cera-ar");
        assert_eq!(normalize_base_path("/cera-ar/"), "/cera-ar");
        assert_eq!(normalize_base_path("//a//b/"), "/a/b");
    }
}
