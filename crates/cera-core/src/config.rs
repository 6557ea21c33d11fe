//! Viewer configuration (`viewer.toml`)
//!
//! Every field has a default so a partial or missing file still yields a
//! working viewer.

use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::{info, warn};

use crate::error::ViewerError;

/// Conventional file name, resolved against the deployment base
pub const CONFIG_FILE_NAME: &str = "viewer.toml";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ViewerConfig {
    #[serde(default)]
    pub assets: AssetsConfig,
    #[serde(default)]
    pub animation: AnimationConfig,
    #[serde(default)]
    pub ar: ArConfig,
    #[serde(default)]
    pub ui: UiConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssetsConfig {
    /// glTF binary with both baked pose clips
    #[serde(default = "default_model")]
    pub model: String,
    /// Equirectangular HDR used for image-based lighting
    #[serde(default = "default_environment")]
    pub environment: String,
    /// Cube face edge length for the projected environment map
    #[serde(default = "default_environment_face_size")]
    pub environment_face_size: u32,
}

impl Default for AssetsConfig {
    fn default() -> Self {
        Self {
            model: default_model(),
            environment: default_environment(),
            environment_face_size: default_environment_face_size(),
        }
    }
}

fn default_model() -> String {
    "CERA_V11_low_001_Self_optimize3.glb".to_string()
}

fn default_environment() -> String {
    "climbing_gym_1k.hdr".to_string()
}

fn default_environment_face_size() -> u32 {
    256
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnimationConfig {
    #[serde(default = "default_chair_clip")]
    pub chair_clip: String,
    #[serde(default = "default_stretch_clip")]
    pub stretch_clip: String,
    /// Crossfade duration in seconds
    #[serde(default = "default_transition_secs")]
    pub transition_secs: f32,
}

impl Default for AnimationConfig {
    fn default() -> Self {
        Self {
            chair_clip: default_chair_clip(),
            stretch_clip: default_stretch_clip(),
            transition_secs: default_transition_secs(),
        }
    }
}

fn default_chair_clip() -> String {
    "CERA_V11_ChairMode(1)_Baked".to_string()
}

fn default_stretch_clip() -> String {
    "CERA_V11_Stretch(1)_Baked".to_string()
}

fn default_transition_secs() -> f32 {
    3.0
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArConfig {
    /// Request the anchors feature (optional; placement works without it)
    #[serde(default = "default_true")]
    pub use_anchors: bool,
    /// Element id for the DOM overlay; `None` skips the feature
    #[serde(default = "default_dom_overlay_root")]
    pub dom_overlay_root: Option<String>,
    #[serde(default = "default_reference_space")]
    pub reference_space: String,
    /// Toast shown once the session is running
    #[serde(default = "default_place_prompt")]
    pub place_prompt: String,
}

impl Default for ArConfig {
    fn default() -> Self {
        Self {
            use_anchors: true,
            dom_overlay_root: default_dom_overlay_root(),
            reference_space: default_reference_space(),
            place_prompt: default_place_prompt(),
        }
    }
}

fn default_true() -> bool {
    true
}

fn default_dom_overlay_root() -> Option<String> {
    Some("ar-view".to_string())
}

fn default_reference_space() -> String {
    "local-floor".to_string()
}

fn default_place_prompt() -> String {
    "Tap the screen to place the model".to_string()
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UiConfig {
    /// How long transient toasts stay visible, in seconds
    #[serde(default = "default_toast_secs")]
    pub toast_secs: f32,
}

impl Default for UiConfig {
    fn default() -> Self {
        Self {
            toast_secs: default_toast_secs(),
        }
    }
}

fn default_toast_secs() -> f32 {
    3.0
}

/// Parse configuration from TOML text
pub fn load_config_str(content: &str) -> Result<ViewerConfig, ViewerError> {
    let config: ViewerConfig = toml::from_str(content)?;
    if !(config.animation.transition_secs.is_finite() && config.animation.transition_secs >= 0.0) {
        return Err(ViewerError::Config(format!(
            "animation.transition_secs must be a non-negative number, got {}",
            config.animation.transition_secs
        )));
    }
    if config.assets.environment_face_size == 0 {
        return Err(ViewerError::Config(
            "assets.environment_face_size must be greater than zero".to_string(),
        ));
    }
    Ok(config)
}

/// Parse configuration, falling back to defaults on any error
pub fn load_config_or_default(content: Option<&str>) -> ViewerConfig {
    match content {
        Some(content) => load_config_str(content).unwrap_or_else(|e| {
            warn!(error = %e, "Invalid viewer configuration, using defaults");
            ViewerConfig::default()
        }),
        None => {
            info!("No viewer configuration found, using defaults");
            ViewerConfig::default()
        }
    }
}

/// Load configuration from a file on disk
pub fn load_config_file(path: &Path) -> Result<ViewerConfig, ViewerError> {
    let content = std::fs::read_to_string(path)
        .map_err(|e| ViewerError::Config(format!("{}: {}", path.display(), e)))?;
    let config = load_config_str(&content)?;
    info!(path = %path.display(), "Loaded viewer configuration");
    Ok(config)
}

/// Parse a log level name, defaulting to INFO
pub fn parse_level(level: &str) -> tracing::Level {
    match level.to_lowercase().as_str() {
        "trace" => tracing::Level::TRACE,
        "debug" => tracing::Level::DEBUG,
        "info" => tracing::Level::INFO,
        "warn" => tracing::Level::WARN,
        "error" => tracing::Level::ERROR,
        _ => tracing::Level::INFO,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_empty_config_uses_defaults() {
        let config = load_config_str("").unwrap();
        assert_eq!(config, ViewerConfig::default());
        assert_eq!(config.animation.transition_secs, 3.0);
        assert_eq!(config.ar.reference_space, "local-floor");
        assert_eq!(config.ui.toast_secs, 3.0);
    }

    #[test]
    fn test_partial_override() {
        let config = load_config_str(
            r#"
            [assets]
            model = "models/chair.glb"

            [ar]
            use_anchors = false
            "#,
        )
        .unwrap();
        assert_eq!(config.assets.model, "models/chair.glb");
        assert_eq!(config.assets.environment, "climbing_gym_1k.hdr");
        assert!(!config.ar.use_anchors);
        assert_eq!(config.ar.dom_overlay_root.as_deref(), Some("ar-view"));
    }

    #[test]
    fn test_negative_duration_rejected() {
        let err = load_config_str("[animation]\ntransition_secs = -1.0").unwrap_err();
        assert!(matches!(err, ViewerError::Config(_)));
    }

    #[test]
    fn test_malformed_falls_back() {
        let config = load_config_or_default(Some("[assets\nmodel = 3"));
        assert_eq!(config, ViewerConfig::default());
        assert_eq!(load_config_or_default(None), ViewerConfig::default());
    }

    #[test]
    fn test_load_from_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join(CONFIG_FILE_NAME);
        std::fs::write(&path, "[ui]\ntoast_secs = 5.0\n").unwrap();

        let config = load_config_file(&path).unwrap();
        assert_eq!(config.ui.toast_secs, 5.0);
        assert_eq!(config.assets, AssetsConfig::default());

        let missing = load_config_file(&dir.path().join("nope.toml"));
        assert!(missing.is_err());
    }

    #[test]
    fn test_parse_level_fallback() {
        assert_eq!(parse_level("WARN"), tracing::Level::WARN);
        assert_eq!(parse_level("chatty"), tracing::Level::INFO);
    }
}
