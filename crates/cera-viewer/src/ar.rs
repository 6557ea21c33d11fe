//! AR view systems: session launch, reticle, placement, anchors, rotation

use bevy::prelude::*;
use cera_core::{
    PlacementCommand, PlacementController, SessionCommand, SessionEvent, SessionLauncher,
    SessionOutput, TwoFingerRotation, View, ViewProjection,
};
use cera_scene::{MainCamera, ModelRoot, Reticle, Toasts, ViewAssets, ViewerSettings};
use std::f32::consts::FRAC_PI_2;
use tracing::{debug, info};

use crate::router::{navigate_to, AppView};
use crate::xr::{XrBridge, XrInbox};

/// Per-view AR state. Inserted on entering `#ar`, removed on leaving it.
#[derive(Resource)]
pub struct ArSession {
    launcher: SessionLauncher,
    /// Created once the session reports its capabilities
    placement: Option<PlacementController>,
    rotation: TwoFingerRotation,
    last_sequence: u64,
}

impl ArSession {
    fn new(launcher: SessionLauncher) -> Self {
        Self {
            launcher,
            placement: None,
            rotation: TwoFingerRotation::new(),
            last_sequence: 0,
        }
    }

    pub fn placement(&self) -> Option<&PlacementController> {
        self.placement.as_ref()
    }
}

pub struct ArPlugin;

impl Plugin for ArPlugin {
    fn build(&self, app: &mut App) {
        let inbox = XrInbox::default();
        app.insert_resource(inbox.clone())
            .insert_non_send_resource(XrBridge::new(inbox))
            .add_systems(OnEnter(AppView::Ar), start_ar_session)
            .add_systems(OnExit(AppView::Ar), stop_ar_session)
            .add_systems(
                Update,
                (
                    pump_session_events,
                    apply_xr_frame,
                    place_on_select,
                    receive_anchors,
                    rotate_with_touches,
                    sync_ar_entities,
                )
                    .chain()
                    .run_if(in_state(AppView::Ar)),
            );
    }
}

/// Carry out what the launcher asked for
fn execute(outputs: Vec<SessionOutput>, bridge: &XrBridge, toasts: &mut Toasts, now: f64) {
    for output in outputs {
        match output {
            SessionOutput::Command(SessionCommand::CheckSupport) => bridge.check_support(),
            SessionOutput::Command(SessionCommand::RequestSession(init)) => {
                bridge.request_session(init)
            }
            SessionOutput::Command(SessionCommand::EndSession) => bridge.end_session(),
            SessionOutput::Toast { message, permanent } => toasts.show(message, permanent, now),
        }
    }
}

fn start_ar_session(
    mut commands: Commands,
    settings: Res<ViewerSettings>,
    inbox: Res<XrInbox>,
    bridge: NonSend<XrBridge>,
    mut toasts: ResMut<Toasts>,
    time: Res<Time>,
) {
    inbox.clear();
    let mut launcher = SessionLauncher::new(&settings.config.ar);
    let outputs = launcher.start();
    execute(outputs, &bridge, &mut toasts, time.elapsed_secs_f64());
    commands.insert_resource(ArSession::new(launcher));
}

fn stop_ar_session(
    mut commands: Commands,
    session: Option<ResMut<ArSession>>,
    inbox: Res<XrInbox>,
    bridge: NonSend<XrBridge>,
    mut toasts: ResMut<Toasts>,
    time: Res<Time>,
) {
    if let Some(mut session) = session {
        let outputs = session.launcher.end();
        execute(outputs, &bridge, &mut toasts, time.elapsed_secs_f64());
    }
    // Also covers a request that has not resolved yet
    bridge.end_session();
    inbox.clear();
    toasts.clear();
    commands.remove_resource::<ArSession>();
}

fn pump_session_events(
    session: Option<ResMut<ArSession>>,
    inbox: Res<XrInbox>,
    bridge: NonSend<XrBridge>,
    mut toasts: ResMut<Toasts>,
    time: Res<Time>,
) {
    let Some(mut session) = session else {
        return;
    };

    for event in inbox.take_events() {
        let granted = match &event {
            SessionEvent::SessionStarted(caps) => Some(*caps),
            _ => None,
        };
        let platform_ended = event == SessionEvent::Ended && session.launcher.is_running();

        let outputs = session.launcher.handle(event);
        if let (Some(caps), true) = (granted, session.launcher.is_running()) {
            session.placement = Some(PlacementController::new(caps.anchors));
        }
        execute(outputs, &bridge, &mut toasts, time.elapsed_secs_f64());

        if platform_ended {
            navigate_to(View::Landing);
        }
    }
}

/// Consume the newest XR frame sample: camera, reticle and anchor poses
fn apply_xr_frame(
    session: Option<ResMut<ArSession>>,
    inbox: Res<XrInbox>,
    mut cameras: Query<(&mut Transform, &mut Projection), With<MainCamera>>,
) {
    let Some(mut session) = session else {
        return;
    };
    let Some(sample) = inbox.latest_frame() else {
        return;
    };
    if sample.sequence == session.last_sequence {
        return;
    }
    session.last_sequence = sample.sequence;

    if let Ok((mut transform, mut projection)) = cameras.single_mut() {
        if let Some(viewer) = sample.viewer {
            transform.translation = viewer.position;
            transform.rotation = viewer.orientation;
        }
        if let (Some(view), Projection::Perspective(perspective)) =
            (sample.projection, &mut *projection)
        {
            match_view_projection(perspective, view);
        }
    }

    let Some(placement) = session.placement.as_mut() else {
        return;
    };
    placement.update_hit(sample.hit);
    if let Some(anchor) = sample.anchor {
        placement.apply_anchor_pose(anchor);
    }
}

/// Render with the platform's lens so overlays line up with the camera
/// feed. The aspect ratio follows the canvas.
fn match_view_projection(perspective: &mut PerspectiveProjection, view: ViewProjection) {
    perspective.fov = view.fov_y;
    perspective.near = view.near;
    if view.far.is_finite() {
        perspective.far = view.far;
    }
}

fn place_on_select(
    session: Option<ResMut<ArSession>>,
    inbox: Res<XrInbox>,
    assets: Option<Res<ViewAssets>>,
    bridge: NonSend<XrBridge>,
) {
    let selects = inbox.take_selects();
    if selects == 0 {
        return;
    }
    let Some(mut session) = session else {
        return;
    };
    let Some(placement) = session.placement.as_mut() else {
        return;
    };
    // Nothing to place until the model is in
    if !assets.is_some_and(|assets| assets.tracker.model_ready()) {
        return;
    }

    for _ in 0..selects {
        match placement.confirm() {
            Some(PlacementCommand::RequestAnchor { pose }) => bridge.request_anchor(pose),
            Some(PlacementCommand::Static { position }) => {
                debug!("Placed without anchor at {:?}", position)
            }
            None => {}
        }
    }
}

/// A failed anchor leaves the model where it was placed; only the log hears about it
fn receive_anchors(session: Option<ResMut<ArSession>>, inbox: Res<XrInbox>) {
    let results = inbox.take_anchor_results();
    let Some(mut session) = session else {
        return;
    };
    let Some(placement) = session.placement.as_mut() else {
        return;
    };

    for result in results {
        match result {
            Ok(anchor) => {
                info!("Model anchored ({:?})", anchor);
                placement.anchor_created(anchor);
            }
            Err(reason) => placement.anchor_failed(&reason),
        }
    }
}

/// Two-finger twist rotates the placed model around Y
fn rotate_with_touches(session: Option<ResMut<ArSession>>, touches: Res<Touches>) {
    let Some(mut session) = session else {
        return;
    };
    let session = &mut *session;
    let Some(placement) = session.placement.as_mut() else {
        return;
    };

    // Stable finger order between frames
    let mut active: Vec<_> = touches.iter().map(|t| (t.id(), t.position())).collect();
    active.sort_by_key(|(id, _)| *id);
    let positions: Vec<Vec2> = active.into_iter().map(|(_, position)| position).collect();

    let current_y = placement.model_rotation().y;
    if let Some(y) = session
        .rotation
        .update(&positions, placement.is_placed(), current_y)
    {
        placement.set_rotation_y(y);
    }
}

fn sync_ar_entities(
    session: Option<Res<ArSession>>,
    mut reticles: Query<(&mut Transform, &mut Visibility), (With<Reticle>, Without<ModelRoot>)>,
    mut models: Query<(&mut Transform, &mut Visibility), (With<ModelRoot>, Without<Reticle>)>,
) {
    let Some(placement) = session.as_ref().and_then(|s| s.placement()) else {
        return;
    };

    for (mut transform, mut visibility) in &mut reticles {
        match placement.reticle_pose() {
            Some(pose) => {
                transform.translation = pose.position;
                // Ring mesh faces +Z; lay it on the surface
                transform.rotation = pose.orientation * Quat::from_rotation_x(-FRAC_PI_2);
                visibility.set_if_neq(Visibility::Visible);
            }
            None => {
                visibility.set_if_neq(Visibility::Hidden);
            }
        }
    }

    for (mut transform, mut visibility) in &mut models {
        let rotation = placement.model_rotation();
        transform.translation = placement.model_position();
        transform.rotation = Quat::from_euler(EulerRot::XYZ, rotation.x, rotation.y, rotation.z);
        visibility.set_if_neq(if placement.model_visible() {
            Visibility::Visible
        } else {
            Visibility::Hidden
        });
    }
}
