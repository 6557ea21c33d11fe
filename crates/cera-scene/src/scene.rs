//! Per-view scene composition: camera, lights, ground and reticle
//!
//! Everything a view spawns carries [`ViewScoped`] so the view can be torn
//! down in one sweep when the router leaves it.

use bevy::prelude::*;
use cera_core::ViewerConfig;
use tracing::{debug, info};

use crate::camera::{CameraSettings, MainCamera, OrbitControlled};
use crate::models::ViewAssets;
use crate::pose::{PendingPoseRequest, PoseDriver};

/// Unitless light strengths are scaled into Bevy's photometric units
const AMBIENT_SCALE: f32 = 400.0;
const ILLUMINANCE_SCALE: f32 = 4000.0;

/// Viewer configuration plus the directory the page was served from
#[derive(Debug, Clone, Resource)]
pub struct ViewerSettings {
    pub config: ViewerConfig,
    pub base_url: String,
}

impl ViewerSettings {
    pub fn new(config: ViewerConfig, base_url: impl Into<String>) -> Self {
        Self {
            config,
            base_url: base_url.into(),
        }
    }

    pub fn asset_url(&self, path: &str) -> String {
        cera_core::resolve_asset_url(&self.base_url, path)
    }
}

/// Marker for entities owned by the active view
#[derive(Component)]
pub struct ViewScoped;

/// Floor that only shows the model's shadow
#[derive(Component)]
pub struct ShadowCatcher;

/// Ring shown on the detected surface while searching
#[derive(Component)]
pub struct Reticle;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SceneProfile {
    Landing,
    Ar,
}

/// Camera, lighting and ground parameters of a profile
#[derive(Debug, Clone, PartialEq)]
pub struct ProfileParams {
    /// `None` renders a transparent background over the camera feed
    pub background: Option<Color>,
    pub fov_degrees: f32,
    pub near: f32,
    pub far: f32,
    pub camera_position: Vec3,
    pub camera_target: Vec3,
    pub ambient: f32,
    pub directional: f32,
    pub directional_position: Vec3,
    /// Edge length of the shadow-catching plane
    pub ground_size: f32,
    /// Ground follows the model instead of sitting at the origin
    pub ground_on_model: bool,
    pub environment_intensity: f32,
}

impl SceneProfile {
    pub fn params(self) -> ProfileParams {
        match self {
            SceneProfile::Landing => ProfileParams {
                background: Some(Color::srgb_u8(0x1a, 0x1a, 0x1a)),
                fov_degrees: 45.0,
                near: 0.1,
                far: 100.0,
                camera_position: Vec3::new(2.0, 1.5, 2.0),
                camera_target: Vec3::new(0.0, 0.5, 0.0),
                ambient: 0.5,
                directional: 1.5,
                directional_position: Vec3::new(5.0, 10.0, 7.5),
                ground_size: 10.0,
                ground_on_model: false,
                environment_intensity: 900.0,
            },
            SceneProfile::Ar => ProfileParams {
                background: None,
                fov_degrees: 70.0,
                near: 0.01,
                far: 20.0,
                camera_position: Vec3::ZERO,
                camera_target: Vec3::NEG_Z,
                ambient: 1.0,
                directional: 1.0,
                directional_position: Vec3::new(1.0, 3.0, 2.0),
                ground_size: 2.0,
                ground_on_model: true,
                environment_intensity: 900.0,
            },
        }
    }
}

/// Profile of the view currently composed
#[derive(Debug, Clone, Copy, Resource)]
pub struct ActiveProfile(pub SceneProfile);

pub struct SceneSetupPlugin;

impl Plugin for SceneSetupPlugin {
    fn build(&self, app: &mut App) {
        app.insert_resource(AmbientLight::NONE);
    }
}

fn spawn_common(
    commands: &mut Commands,
    profile: SceneProfile,
    params: &ProfileParams,
) -> Entity {
    let clear_color = ClearColorConfig::Custom(params.background.unwrap_or(Color::NONE));

    let camera = commands
        .spawn((
            Camera3d::default(),
            Camera {
                clear_color,
                ..default()
            },
            Projection::Perspective(PerspectiveProjection {
                fov: params.fov_degrees.to_radians(),
                near: params.near,
                far: params.far,
                ..default()
            }),
            Transform::from_translation(params.camera_position)
                .looking_at(params.camera_target, Vec3::Y),
            MainCamera,
            ViewScoped,
        ))
        .id();

    commands.insert_resource(AmbientLight {
        color: Color::WHITE,
        brightness: params.ambient * AMBIENT_SCALE,
        ..default()
    });

    commands.spawn((
        DirectionalLight {
            illuminance: params.directional * ILLUMINANCE_SCALE,
            shadows_enabled: true,
            ..default()
        },
        Transform::from_translation(params.directional_position).looking_at(Vec3::ZERO, Vec3::Y),
        ViewScoped,
    ));

    commands.insert_resource(ActiveProfile(profile));
    camera
}

/// Material that darkens what is behind it only where a shadow falls
pub fn shadow_catcher_material(materials: &mut Assets<StandardMaterial>) -> Handle<StandardMaterial> {
    materials.add(StandardMaterial {
        base_color: Color::WHITE,
        perceptual_roughness: 1.0,
        reflectance: 0.0,
        alpha_mode: AlphaMode::Multiply,
        ..default()
    })
}

/// Landing view: dark background, orbit camera, ground at the origin
pub fn setup_landing_scene(
    mut commands: Commands,
    mut meshes: ResMut<Assets<Mesh>>,
    mut materials: ResMut<Assets<StandardMaterial>>,
) {
    let params = SceneProfile::Landing.params();
    let camera = spawn_common(&mut commands, SceneProfile::Landing, &params);
    commands.entity(camera).insert(OrbitControlled);
    commands.insert_resource(CameraSettings::looking_from(
        params.camera_position,
        params.camera_target,
    ));

    commands.spawn((
        Mesh3d(meshes.add(Plane3d::default().mesh().size(params.ground_size, params.ground_size))),
        MeshMaterial3d(shadow_catcher_material(&mut materials)),
        Transform::IDENTITY,
        ShadowCatcher,
        ViewScoped,
    ));

    info!("Landing scene composed");
}

/// AR view: transparent background, camera driven by the viewer pose,
/// reticle hidden until a surface is found
pub fn setup_ar_scene(
    mut commands: Commands,
    mut meshes: ResMut<Assets<Mesh>>,
    mut materials: ResMut<Assets<StandardMaterial>>,
) {
    let params = SceneProfile::Ar.params();
    spawn_common(&mut commands, SceneProfile::Ar, &params);

    commands.spawn((
        Mesh3d(meshes.add(Annulus::new(0.15, 0.2))),
        MeshMaterial3d(materials.add(StandardMaterial {
            base_color: Color::WHITE,
            unlit: true,
            double_sided: true,
            cull_mode: None,
            ..default()
        })),
        Transform::IDENTITY,
        Visibility::Hidden,
        Reticle,
        ViewScoped,
    ));

    info!("AR scene composed");
}

/// Despawn everything the view spawned and drop its resources. Pose
/// updates stop with the driver, so nothing touches the old model.
pub fn teardown_view(mut commands: Commands, scoped: Query<Entity, With<ViewScoped>>) {
    let mut count = 0;
    for entity in &scoped {
        commands.entity(entity).despawn();
        count += 1;
    }
    commands.remove_resource::<ViewAssets>();
    commands.remove_resource::<PoseDriver>();
    commands.remove_resource::<ActiveProfile>();
    commands.insert_resource(PendingPoseRequest::default());
    commands.insert_resource(AmbientLight::NONE);
    debug!("View torn down, {} entities despawned", count);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_landing_profile() {
        let params = SceneProfile::Landing.params();
        assert_eq!(params.fov_degrees, 45.0);
        assert!(params.background.is_some());
        assert!(!params.ground_on_model);
        assert_eq!(params.ground_size, 10.0);
    }

    #[test]
    fn test_ar_profile_is_transparent() {
        let params = SceneProfile::Ar.params();
        assert!(params.background.is_none());
        assert_eq!(params.near, 0.01);
        assert_eq!(params.far, 20.0);
        assert!(params.ground_on_model);
    }

    #[test]
    fn test_asset_url_uses_base() {
        let settings = ViewerSettings::new(ViewerConfig::default(), "https://host/shop/");
        assert_eq!(
            settings.asset_url("/climbing_gym_1k.hdr"),
            "https://host/shop/climbing_gym_1k.hdr"
        );
    }

    #[test]
    fn test_teardown_despawns_scoped_entities() {
        let mut app = App::new();
        app.add_systems(Update, teardown_view);
        let scoped = app.world_mut().spawn(ViewScoped).id();
        let kept = app.world_mut().spawn_empty().id();
        app.insert_resource(ActiveProfile(SceneProfile::Landing));

        app.update();

        assert!(app.world().get_entity(scoped).is_err());
        assert!(app.world().get_entity(kept).is_ok());
        assert!(app.world().get_resource::<ActiveProfile>().is_none());
    }
}
