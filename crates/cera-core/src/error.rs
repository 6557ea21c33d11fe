//! Error taxonomy for the viewer
//!
//! Every failure is handled where it happens and surfaced to the user as a
//! single toast. Nothing here is fatal and nothing is retried.

use thiserror::Error;

use crate::assets::AssetKind;

/// Platform capability that can be missing on a device
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Capability {
    /// The browser exposes no XR API at all
    XrApi,
    /// The XR API exists but cannot run an immersive AR session
    ImmersiveAr,
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ViewerError {
    #[error("Capability not supported: {0:?}")]
    Unsupported(Capability),
    #[error("Failed to load {kind} from {path}: {reason}")]
    AssetLoad {
        kind: AssetKind,
        path: String,
        reason: String,
    },
    #[error("AR session failed: {0}")]
    Session(String),
    #[error("Anchor creation failed: {0}")]
    Anchor(String),
    #[error("Invalid configuration: {0}")]
    Config(String),
}

impl ViewerError {
    /// Human-readable message for the toast channel
    pub fn user_message(&self) -> String {
        match self {
            ViewerError::Unsupported(Capability::XrApi) => {
                "This browser does not support WebXR".to_string()
            }
            ViewerError::Unsupported(Capability::ImmersiveAr) => {
                "AR mode is not supported on this device".to_string()
            }
            ViewerError::AssetLoad { kind, .. } => format!("Could not load the {}", kind),
            ViewerError::Session(_) => "Could not start the AR session".to_string(),
            ViewerError::Anchor(_) => {
                "Anchoring unavailable, the model stays where it was placed".to_string()
            }
            ViewerError::Config(_) => "Viewer settings were invalid, using defaults".to_string(),
        }
    }
}

impl From<toml::de::Error> for ViewerError {
    fn from(e: toml::de::Error) -> Self {
        ViewerError::Config(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_user_messages_are_distinct() {
        let unsupported = ViewerError::Unsupported(Capability::ImmersiveAr).user_message();
        let no_api = ViewerError::Unsupported(Capability::XrApi).user_message();
        assert_ne!(unsupported, no_api);
        assert!(unsupported.contains("not supported"));
    }

    #[test]
    fn test_asset_message_names_kind() {
        let err = ViewerError::AssetLoad {
            kind: AssetKind::Model,
            path: "models/cera.glb".to_string(),
            reason: "404".to_string(),
        };
        assert_eq!(err.user_message(), "Could not load the 3D model");
        assert!(err.to_string().contains("models/cera.glb"));
    }
}
