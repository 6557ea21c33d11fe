//! Binds the two baked pose clips to the model and applies crossfade weights

use bevy::animation::AnimationPlayer;
use bevy::gltf::Gltf;
use bevy::prelude::*;
use cera_core::{Pose, PoseController, SwitchOutcome};
use tracing::{debug, info, warn};

use crate::models::ModelRoot;
use crate::scene::ViewerSettings;

/// Latest pose requested by the UI, consumed on the next frame
#[derive(Resource, Default, Debug, Clone, Copy)]
pub struct PendingPoseRequest(pub Option<Pose>);

impl PendingPoseRequest {
    pub fn request(&mut self, pose: Pose) {
        self.0 = Some(pose);
    }
}

#[derive(Debug, Clone, Copy)]
struct PoseBinding {
    player: Entity,
    chair: AnimationNodeIndex,
    stretch: AnimationNodeIndex,
}

/// Crossfade state of the current view's model. Removed on teardown.
#[derive(Resource)]
pub struct PoseDriver {
    controller: PoseController,
    binding: Option<PoseBinding>,
}

impl PoseDriver {
    fn unbound(duration_secs: f32) -> Self {
        Self {
            controller: PoseController::new(duration_secs),
            binding: None,
        }
    }

    pub fn controller(&self) -> &PoseController {
        &self.controller
    }

    pub fn current(&self) -> Pose {
        self.controller.current()
    }

    pub fn is_ready(&self) -> bool {
        self.controller.is_ready()
    }
}

pub struct PosePlugin;

impl Plugin for PosePlugin {
    fn build(&self, app: &mut App) {
        app.init_resource::<PendingPoseRequest>()
            .add_systems(Update, (bind_pose_animations, drive_pose_weights).chain());
    }
}

/// Once the model's scene has spawned its animation player, build a graph
/// with both clips and start them paused: chair at full weight, stretch off.
fn bind_pose_animations(
    mut commands: Commands,
    driver: Option<Res<PoseDriver>>,
    settings: Option<Res<ViewerSettings>>,
    models: Query<(Entity, &ModelRoot)>,
    children: Query<&Children>,
    mut players: Query<&mut AnimationPlayer>,
    gltf_assets: Res<Assets<Gltf>>,
    mut graphs: ResMut<Assets<AnimationGraph>>,
) {
    if driver.is_some() {
        return;
    }
    let Some(settings) = settings else {
        return;
    };
    let Ok((root, model)) = models.single() else {
        return;
    };
    let Some(gltf) = gltf_assets.get(&model.gltf) else {
        return;
    };

    let animation = &settings.config.animation;
    let chair_clip = gltf.named_animations.get(animation.chair_clip.as_str());
    let stretch_clip = gltf.named_animations.get(animation.stretch_clip.as_str());
    let (Some(chair_clip), Some(stretch_clip)) = (chair_clip, stretch_clip) else {
        warn!(
            "Pose clips not found in model (want '{}' and '{}', have {:?})",
            animation.chair_clip,
            animation.stretch_clip,
            gltf.named_animations.keys().collect::<Vec<_>>()
        );
        // Pose switching stays disabled for this view
        commands.insert_resource(PoseDriver::unbound(animation.transition_secs));
        return;
    };

    let Some(player_entity) = children
        .iter_descendants(root)
        .find(|entity| players.contains(*entity))
    else {
        // Scene not instantiated yet
        return;
    };
    let Ok(mut player) = players.get_mut(player_entity) else {
        return;
    };

    let mut graph = AnimationGraph::new();
    let chair = graph.add_clip(chair_clip.clone(), 1.0, graph.root);
    let stretch = graph.add_clip(stretch_clip.clone(), 1.0, graph.root);
    commands
        .entity(player_entity)
        .insert(AnimationGraphHandle(graphs.add(graph)));

    player.play(chair).repeat().set_weight(1.0).pause();
    player.play(stretch).repeat().set_weight(0.0).pause();

    let mut driver = PoseDriver::unbound(animation.transition_secs);
    driver.binding = Some(PoseBinding {
        player: player_entity,
        chair,
        stretch,
    });
    driver.controller.mark_ready();
    commands.insert_resource(driver);
    info!("Pose animations bound");
}

/// Apply a pending request, then sample the crossfade for this frame
fn drive_pose_weights(
    driver: Option<ResMut<PoseDriver>>,
    mut pending: ResMut<PendingPoseRequest>,
    mut players: Query<&mut AnimationPlayer>,
    time: Res<Time>,
) {
    let Some(mut driver) = driver else {
        pending.0 = None;
        return;
    };
    let driver = &mut *driver;
    let now = time.elapsed_secs_f64();

    if let Some(target) = pending.0.take() {
        match driver.controller.switch_pose(target, now) {
            SwitchOutcome::Started => info!("Switching pose to {}", target.label()),
            outcome => debug!("Pose request {:?} ignored: {:?}", target, outcome),
        }
    }

    if !driver.controller.is_transitioning() {
        return;
    }
    let weights = driver.controller.sample(now);

    let Some(binding) = driver.binding else {
        return;
    };
    let Ok(mut player) = players.get_mut(binding.player) else {
        return;
    };
    if let Some(active) = player.animation_mut(binding.chair) {
        active.set_weight(weights.chair);
    }
    if let Some(active) = player.animation_mut(binding.stretch) {
        active.set_weight(weights.stretch);
    }
}
