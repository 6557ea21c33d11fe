//! HDR environment: equirectangular image to cubemap image-based lighting

use bevy::asset::{LoadState, RenderAssetUsages};
use bevy::render::render_resource::{
    Extent3d, TextureDimension, TextureFormat, TextureViewDescriptor, TextureViewDimension,
};
use bevy::prelude::*;
use cera_core::environment::{project_to_cubemap, EquirectImage, CUBE_FACES};
use cera_core::{AssetKind, AssetStatus};
use tracing::{error, info};

use crate::camera::MainCamera;
use crate::models::ViewAssets;
use crate::scene::{ActiveProfile, ViewerSettings};
use crate::ui::Toasts;

pub struct EnvironmentPlugin;

impl Plugin for EnvironmentPlugin {
    fn build(&self, app: &mut App) {
        app.add_systems(Update, poll_environment_load);
    }
}

/// Read an `Rgba32Float` image as RGBA texels
fn float_texels(image: &Image) -> Result<Vec<[f32; 4]>, String> {
    if image.texture_descriptor.format != TextureFormat::Rgba32Float {
        return Err(format!(
            "unexpected texture format {:?}",
            image.texture_descriptor.format
        ));
    }
    let data = image.data.as_ref().ok_or("image has no CPU data")?;
    Ok(data
        .chunks_exact(16)
        .map(|texel| {
            let mut out = [0.0f32; 4];
            for (i, channel) in texel.chunks_exact(4).enumerate() {
                out[i] = f32::from_le_bytes([channel[0], channel[1], channel[2], channel[3]]);
            }
            out
        })
        .collect())
}

/// Build a half-float cubemap image from a loaded panorama
pub fn equirect_to_cubemap(image: &Image, face_size: u32) -> Result<Image, String> {
    let texels = float_texels(image)?;
    let source = EquirectImage::new(image.width(), image.height(), &texels)
        .ok_or("panorama size does not match its data")?;
    let faces = project_to_cubemap(&source, face_size);

    let data: Vec<u8> = faces
        .iter()
        .flat_map(|texel| texel.iter().map(|v| half::f16::from_f32(*v)))
        .flat_map(|v| v.to_le_bytes())
        .collect();

    let mut cubemap = Image::new(
        Extent3d {
            width: face_size,
            height: face_size,
            depth_or_array_layers: CUBE_FACES as u32,
        },
        TextureDimension::D2,
        data,
        TextureFormat::Rgba16Float,
        RenderAssetUsages::RENDER_WORLD,
    );
    cubemap.texture_view_descriptor = Some(TextureViewDescriptor {
        dimension: Some(TextureViewDimension::Cube),
        ..default()
    });
    Ok(cubemap)
}

/// Install the environment as image-based lighting once it loads. A
/// failure leaves the direct lights in place and shows one toast.
fn poll_environment_load(
    mut commands: Commands,
    assets: Option<ResMut<ViewAssets>>,
    profile: Option<Res<ActiveProfile>>,
    settings: Option<Res<ViewerSettings>>,
    asset_server: Res<AssetServer>,
    mut images: ResMut<Assets<Image>>,
    cameras: Query<Entity, With<MainCamera>>,
    mut toasts: ResMut<Toasts>,
    time: Res<Time>,
) {
    let (Some(mut assets), Some(profile), Some(settings)) = (assets, profile, settings) else {
        return;
    };
    if *assets.tracker.status(AssetKind::Environment) != AssetStatus::Pending {
        return;
    }

    let url = assets.environment_url.clone();
    let result = match asset_server.get_load_state(assets.environment.id()) {
        Some(LoadState::Loaded) => {
            let Ok(camera) = cameras.single() else {
                return;
            };
            let Some(image) = images.get(&assets.environment) else {
                return;
            };
            equirect_to_cubemap(image, settings.config.assets.environment_face_size).map(|cubemap| {
                let handle = images.add(cubemap);
                commands.entity(camera).insert(EnvironmentMapLight {
                    diffuse_map: handle.clone(),
                    specular_map: handle,
                    intensity: profile.0.params().environment_intensity,
                    ..default()
                });
            })
        }
        Some(LoadState::Failed(err)) => Err(err.to_string()),
        _ => return,
    };

    match result {
        Ok(()) => {
            assets.tracker.mark_loaded(AssetKind::Environment);
            info!("Environment installed: {}", url);
        }
        Err(reason) => {
            if let Some(err) = assets.tracker.mark_failed(AssetKind::Environment, &url, reason) {
                error!("{}", err);
                toasts.show(err.user_message(), false, time.elapsed_secs_f64());
            }
        }
    }
}
