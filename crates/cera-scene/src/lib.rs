//! CERA Scene - Bevy side of the viewer
//!
//! Composes the landing and AR scenes, loads the model and HDR environment,
//! drives the pose crossfade on the model's animation player and provides
//! the shared egui widgets. View switching itself lives in the viewer app,
//! which schedules the `setup_*` and [`scene::teardown_view`] systems.

pub mod camera;
pub mod environment;
pub mod models;
pub mod pose;
pub mod scene;
pub mod ui;

use bevy::prelude::*;

/// Plugin that registers the per-frame scene systems
pub struct CeraScenePlugin;

impl Plugin for CeraScenePlugin {
    fn build(&self, app: &mut App) {
        app.init_resource::<ui::Toasts>()
            .add_plugins(camera::CameraPlugin)
            .add_plugins(scene::SceneSetupPlugin)
            .add_plugins(models::ModelsPlugin)
            .add_plugins(environment::EnvironmentPlugin)
            .add_plugins(pose::PosePlugin);
    }
}

pub use camera::{CameraSettings, MainCamera};
pub use models::{begin_asset_loads, ModelRoot, ViewAssets};
pub use pose::{PendingPoseRequest, PoseDriver};
pub use scene::{
    setup_ar_scene, setup_landing_scene, teardown_view, Reticle, SceneProfile, ViewScoped,
    ViewerSettings,
};
pub use ui::Toasts;
