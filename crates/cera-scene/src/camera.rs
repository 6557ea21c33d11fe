//! Orbit camera for the landing view

use bevy::input::mouse::{AccumulatedMouseMotion, AccumulatedMouseScroll, MouseScrollUnit};
use bevy::prelude::*;

/// Orbit camera state. Angles are in radians, Y is up.
#[derive(Debug, Clone, Resource)]
pub struct CameraSettings {
    pub distance: f32,
    pub target_distance: f32,
    pub azimuth: f32,
    pub target_azimuth: f32,
    pub elevation: f32,
    pub target_elevation: f32,
    pub target: Vec3,
    pub target_focus: Vec3,
    pub sensitivity: f32,
    pub zoom_speed: f32,
    pub smooth_factor: f32,
    pub min_distance: f32,
    pub max_distance: f32,
}

impl Default for CameraSettings {
    fn default() -> Self {
        Self::looking_from(Vec3::new(2.0, 1.5, 2.0), Vec3::new(0.0, 0.5, 0.0))
    }
}

impl CameraSettings {
    /// Orbit parameters that put the camera at `position` facing `target`
    pub fn looking_from(position: Vec3, target: Vec3) -> Self {
        let offset = position - target;
        let distance = offset.length().max(f32::EPSILON);
        let elevation = (offset.y / distance).clamp(-1.0, 1.0).asin();
        let azimuth = offset.z.atan2(offset.x);
        Self {
            distance,
            target_distance: distance,
            azimuth,
            target_azimuth: azimuth,
            elevation,
            target_elevation: elevation,
            target,
            target_focus: target,
            sensitivity: 0.005,
            zoom_speed: 0.1,
            // OrbitControls-style damping
            smooth_factor: 0.05,
            min_distance: 0.3,
            max_distance: 20.0,
        }
    }

    /// Camera position for the current (smoothed) orbit state
    pub fn eye(&self) -> Vec3 {
        let x = self.distance * self.azimuth.cos() * self.elevation.cos();
        let z = self.distance * self.azimuth.sin() * self.elevation.cos();
        let y = self.distance * self.elevation.sin();
        self.target + Vec3::new(x, y, z)
    }

    pub fn orbit(&mut self, delta: Vec2) {
        self.target_azimuth += delta.x * self.sensitivity;
        self.target_elevation =
            (self.target_elevation + delta.y * self.sensitivity).clamp(-1.5, 1.5);
    }

    pub fn pan(&mut self, delta: Vec2) {
        let right = Vec3::new(self.azimuth.sin(), 0.0, -self.azimuth.cos());
        let pan_speed = self.distance * 0.002;
        self.target_focus += right * delta.x * pan_speed;
        self.target_focus += Vec3::Y * delta.y * pan_speed;
    }

    pub fn zoom(&mut self, factor: f32) {
        self.target_distance =
            (self.target_distance * factor).clamp(self.min_distance, self.max_distance);
    }

    /// Ease the smoothed state towards its targets
    pub fn step(&mut self, dt: f32) {
        let lerp_factor = 1.0 - (-self.smooth_factor * 60.0 * dt).exp();
        self.distance += (self.target_distance - self.distance) * lerp_factor;
        self.azimuth += (self.target_azimuth - self.azimuth) * lerp_factor;
        self.elevation += (self.target_elevation - self.elevation) * lerp_factor;
        self.target += (self.target_focus - self.target) * lerp_factor;
    }
}

/// Marker component for the camera every view renders through
#[derive(Component)]
pub struct MainCamera;

/// Cameras carrying this are driven by the orbit controls
#[derive(Component)]
pub struct OrbitControlled;

pub struct CameraPlugin;

impl Plugin for CameraPlugin {
    fn build(&self, app: &mut App) {
        app.init_resource::<CameraSettings>()
            .add_systems(Update, update_orbit_camera);
    }
}

fn update_orbit_camera(
    mut camera_query: Query<&mut Transform, (With<MainCamera>, With<OrbitControlled>)>,
    mut settings: ResMut<CameraSettings>,
    mouse_motion: Res<AccumulatedMouseMotion>,
    mouse_scroll: Res<AccumulatedMouseScroll>,
    mouse_button: Res<ButtonInput<MouseButton>>,
    touch_input: Res<Touches>,
    time: Res<Time>,
    mut contexts: bevy_egui::EguiContexts,
) {
    let Ok(mut transform) = camera_query.single_mut() else {
        return;
    };

    // Buttons and toasts sit on top of the canvas
    let egui_wants_pointer = contexts
        .ctx_mut()
        .map(|ctx| ctx.wants_pointer_input())
        .unwrap_or(false);

    if !egui_wants_pointer {
        let motion = mouse_motion.delta;
        if mouse_button.pressed(MouseButton::Left) {
            settings.orbit(Vec2::new(motion.x, -motion.y));
        }
        if mouse_button.pressed(MouseButton::Right) {
            settings.pan(motion);
        }

        let scroll = match mouse_scroll.unit {
            MouseScrollUnit::Line => mouse_scroll.delta.y,
            MouseScrollUnit::Pixel => mouse_scroll.delta.y / 100.0,
        };
        if scroll != 0.0 {
            let zoom_speed = settings.zoom_speed;
            settings.zoom(1.0 - scroll * zoom_speed * 0.3);
        }

        let touches: Vec<_> = touch_input.iter().collect();
        match touches.as_slice() {
            [t] => {
                let delta = t.delta();
                if delta != Vec2::ZERO {
                    settings.orbit(Vec2::new(delta.x, -delta.y));
                }
            }
            [t1, t2] => {
                let curr_dist = t1.position().distance(t2.position());
                let prev_dist = (t1.position() - t1.delta()).distance(t2.position() - t2.delta());
                settings.zoom(prev_dist / curr_dist.max(1.0));
            }
            _ => {}
        }
    }

    settings.step(time.delta_secs());

    transform.translation = settings.eye();
    transform.look_at(settings.target, Vec3::Y);
}
