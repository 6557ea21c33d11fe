//! Model and environment load bookkeeping, model spawning

use bevy::asset::LoadState;
use bevy::gltf::Gltf;
use bevy::prelude::*;
use cera_core::{AssetKind, AssetLoadTracker};
use tracing::{error, info};

use crate::scene::{shadow_catcher_material, ActiveProfile, ShadowCatcher, ViewScoped, ViewerSettings};
use crate::ui::Toasts;

/// Handles and status of the current view's two independent loads
#[derive(Resource)]
pub struct ViewAssets {
    pub tracker: AssetLoadTracker,
    pub model: Handle<Gltf>,
    pub model_url: String,
    pub environment: Handle<Image>,
    pub environment_url: String,
}

/// Root of the spawned furniture scene
#[derive(Component)]
pub struct ModelRoot {
    pub gltf: Handle<Gltf>,
}

pub struct ModelsPlugin;

impl Plugin for ModelsPlugin {
    fn build(&self, app: &mut App) {
        app.add_systems(Update, poll_model_load);
    }
}

/// Kick off both loads for the view being entered
pub fn begin_asset_loads(
    mut commands: Commands,
    asset_server: Res<AssetServer>,
    settings: Res<ViewerSettings>,
) {
    let model_url = settings.asset_url(&settings.config.assets.model);
    let environment_url = settings.asset_url(&settings.config.assets.environment);
    info!("Loading model {} and environment {}", model_url, environment_url);

    commands.insert_resource(ViewAssets {
        tracker: AssetLoadTracker::new(),
        model: asset_server.load(model_url.clone()),
        model_url,
        environment: asset_server.load(environment_url.clone()),
        environment_url,
    });
}

/// Spawn the model once its glTF resolves, or report the failure once
fn poll_model_load(
    mut commands: Commands,
    assets: Option<ResMut<ViewAssets>>,
    profile: Option<Res<ActiveProfile>>,
    asset_server: Res<AssetServer>,
    gltf_assets: Res<Assets<Gltf>>,
    mut meshes: ResMut<Assets<Mesh>>,
    mut materials: ResMut<Assets<StandardMaterial>>,
    mut toasts: ResMut<Toasts>,
    time: Res<Time>,
) {
    let (Some(mut assets), Some(profile)) = (assets, profile) else {
        return;
    };
    if *assets.tracker.status(AssetKind::Model) != cera_core::AssetStatus::Pending {
        return;
    }

    match asset_server.get_load_state(assets.model.id()) {
        Some(LoadState::Loaded) => {
            let Some(gltf) = gltf_assets.get(&assets.model) else {
                return;
            };
            let scene = gltf.default_scene.clone().or_else(|| gltf.scenes.first().cloned());
            let Some(scene) = scene else {
                let url = assets.model_url.clone();
                if let Some(err) = assets.tracker.mark_failed(AssetKind::Model, &url, "no scene in file") {
                    error!("{}", err);
                    toasts.show(err.user_message(), false, time.elapsed_secs_f64());
                }
                return;
            };

            let params = profile.0.params();
            // The AR model stays hidden until placed
            let visibility = if params.ground_on_model {
                Visibility::Hidden
            } else {
                Visibility::Inherited
            };
            let handle = assets.model.clone();
            let mut root = commands.spawn((
                SceneRoot(scene),
                Transform::IDENTITY,
                visibility,
                ModelRoot { gltf: handle },
                ViewScoped,
            ));
            if params.ground_on_model {
                root.with_children(|parent| {
                    parent.spawn((
                        Mesh3d(meshes.add(
                            Plane3d::default().mesh().size(params.ground_size, params.ground_size),
                        )),
                        MeshMaterial3d(shadow_catcher_material(&mut materials)),
                        Transform::IDENTITY,
                        ShadowCatcher,
                    ));
                });
            }

            assets.tracker.mark_loaded(AssetKind::Model);
            info!("Model loaded: {}", assets.model_url);
        }
        Some(LoadState::Failed(err)) => {
            let url = assets.model_url.clone();
            if let Some(err) = assets.tracker.mark_failed(AssetKind::Model, &url, err.to_string()) {
                error!("{}", err);
                toasts.show(err.user_message(), false, time.elapsed_secs_f64());
            }
        }
        _ => {
            // Still loading
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::camera::MainCamera;
    use crate::environment::EnvironmentPlugin;
    use crate::scene::SceneProfile;
    use bevy::asset::RenderAssetUsages;
    use bevy::render::render_resource::{Extent3d, TextureDimension, TextureFormat};
    use cera_core::{AssetStatus, ViewerConfig};
    use std::time::Duration;

    fn grey_panorama() -> Image {
        let data: Vec<u8> = (0..8 * 4)
            .flat_map(|_| [0.5f32, 0.5, 0.5, 1.0])
            .flat_map(|v| v.to_le_bytes())
            .collect();
        Image::new(
            Extent3d {
                width: 8,
                height: 4,
                depth_or_array_layers: 1,
            },
            TextureDimension::D2,
            data,
            TextureFormat::Rgba32Float,
            RenderAssetUsages::MAIN_WORLD,
        )
    }

    #[test]
    fn test_model_failure_leaves_environment_loading() {
        let mut app = App::new();
        app.add_plugins((MinimalPlugins, AssetPlugin::default()))
            .init_asset::<Gltf>()
            .init_asset::<Mesh>()
            .init_asset::<StandardMaterial>()
            .init_asset::<Image>()
            .init_resource::<Toasts>()
            .add_plugins((ModelsPlugin, EnvironmentPlugin));

        let mut config = ViewerConfig::default();
        config.assets.environment_face_size = 4;
        app.insert_resource(ViewerSettings::new(config, ""))
            .insert_resource(ActiveProfile(SceneProfile::Landing));
        let camera = app.world_mut().spawn(MainCamera).id();

        let asset_server = app.world().resource::<AssetServer>().clone();
        app.insert_resource(ViewAssets {
            tracker: AssetLoadTracker::new(),
            model: asset_server.load("missing/cera.glb"),
            model_url: "missing/cera.glb".to_string(),
            environment: asset_server.add(grey_panorama()),
            environment_url: "studio.hdr".to_string(),
        });

        let settled = |app: &App| {
            let tracker = &app.world().resource::<ViewAssets>().tracker;
            *tracker.status(AssetKind::Model) != AssetStatus::Pending
                && *tracker.status(AssetKind::Environment) != AssetStatus::Pending
        };
        for _ in 0..500 {
            app.update();
            if settled(&app) {
                break;
            }
            std::thread::sleep(Duration::from_millis(2));
        }
        // Failures are reported once, later frames change nothing
        app.update();

        let tracker = &app.world().resource::<ViewAssets>().tracker;
        assert!(matches!(tracker.status(AssetKind::Model), AssetStatus::Failed(_)));
        assert_eq!(*tracker.status(AssetKind::Environment), AssetStatus::Loaded);
        assert!(app.world().get::<EnvironmentMapLight>(camera).is_some());

        let mut model_roots = app.world_mut().query::<&ModelRoot>();
        assert_eq!(model_roots.iter(app.world()).count(), 0);

        let now = app.world().resource::<Time>().elapsed_secs_f64();
        let mut toasts = app.world_mut().resource_mut::<Toasts>();
        let toast = toasts.0.visible(now).expect("model failure toast");
        assert_eq!(toast.message, "Could not load the 3D model");
        assert!(toast.expires_at.is_some());
    }
}
