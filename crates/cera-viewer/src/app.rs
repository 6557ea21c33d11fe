//! Bevy application setup

use bevy::asset::AssetMetaCheck;
use bevy::prelude::*;
use bevy::window::CompositeAlphaMode;
use bevy_egui::EguiPlugin;
use bevy_picking::DefaultPickingPlugins;
use cera_scene::{
    begin_asset_loads, setup_ar_scene, setup_landing_scene, teardown_view, CeraScenePlugin,
};

use crate::ar::ArPlugin;
use crate::config_loader::ConfigLoaderPlugin;
use crate::router::{AppView, RouterPlugin};
use crate::ui::UiPlugin;

/// Run the Bevy application
pub fn run() {
    App::new()
        // Transparent so the camera feed shows through in AR
        .insert_resource(ClearColor(Color::NONE))
        .add_plugins(
            DefaultPlugins
                .set(WindowPlugin {
                    primary_window: Some(Window {
                        title: "CERA AR Viewer".to_string(),
                        canvas: Some("#cera-canvas".to_string()),
                        fit_canvas_to_parent: true,
                        prevent_default_event_handling: false,
                        transparent: true,
                        composite_alpha_mode: CompositeAlphaMode::PreMultiplied,
                        ..default()
                    }),
                    ..default()
                })
                .set(AssetPlugin {
                    // Asset URLs are already resolved against the page directory
                    file_path: "".to_string(),
                    meta_check: AssetMetaCheck::Never,
                    ..default()
                }),
        )
        // bevy_egui's picking integration needs the picking plugins first
        .add_plugins(DefaultPickingPlugins)
        .add_plugins(EguiPlugin::default())
        .add_plugins(CeraScenePlugin)
        .add_plugins(RouterPlugin)
        .add_plugins(ConfigLoaderPlugin)
        .add_plugins(ArPlugin)
        .add_plugins(UiPlugin)
        .add_systems(
            OnEnter(AppView::Landing),
            (setup_landing_scene, begin_asset_loads).chain(),
        )
        .add_systems(OnExit(AppView::Landing), teardown_view)
        .add_systems(OnEnter(AppView::Ar), (setup_ar_scene, begin_asset_loads).chain())
        .add_systems(OnExit(AppView::Ar), teardown_view)
        .run();
}
