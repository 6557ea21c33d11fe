//! CERA Core - Engine-independent logic for the CERA AR viewer
//!
//! This crate holds everything that does not need a renderer or a browser:
//! - Pose crossfade between the two baked animation clips
//! - Placement state machine (reticle, confirm, anchors)
//! - Two-finger rotation gesture
//! - AR session launch sequencing and capability resolution
//! - View routing, asset path resolution, toast notifications
//! - Equirectangular to cubemap projection for the HDR environment

pub mod assets;
pub mod config;
pub mod easing;
pub mod environment;
pub mod error;
pub mod gesture;
pub mod placement;
pub mod pose;
pub mod rigid;
pub mod route;
pub mod session;
pub mod toast;

pub use assets::{AssetKind, AssetLoadTracker, AssetStatus, base_directory, resolve_asset_url};
pub use config::{ViewerConfig, load_config_or_default, load_config_str};
pub use error::{Capability, ViewerError};
pub use gesture::TwoFingerRotation;
pub use placement::{AnchorId, PlacementCommand, PlacementController, PlacementState};
pub use pose::{Pose, PoseController, PoseWeights, SwitchOutcome};
pub use rigid::{RigidPose, ViewProjection};
pub use route::{View, ViewRouter, ViewSwitch};
pub use session::{
    SessionCapabilities, SessionCommand, SessionEvent, SessionInit, SessionLauncher, SessionOutput,
    SessionState,
};
pub use toast::{Toast, ToastQueue};
