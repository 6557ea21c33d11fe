//! egui overlay: loading indicator, view buttons, pose buttons, toast

use bevy::prelude::*;
use bevy_egui::{egui, EguiContexts, EguiPrimaryContextPass};
use cera_core::{AssetKind, AssetStatus, View};
use cera_scene::ui::{render_pose_buttons, render_toast};
use cera_scene::{ModelRoot, PendingPoseRequest, PoseDriver, Toasts, ViewAssets};

use crate::router::{navigate_to, AppView};

pub struct UiPlugin;

impl Plugin for UiPlugin {
    fn build(&self, app: &mut App) {
        app.add_systems(
            EguiPrimaryContextPass,
            overlay_ui.run_if(not(in_state(AppView::Booting))),
        );
    }
}

/// Larger controls on narrow (phone) screens
fn ui_scale(windows: &Query<&Window>) -> f32 {
    match windows.single() {
        Ok(window) if window.width() < 600.0 => 1.25,
        _ => 1.0,
    }
}

fn overlay_ui(
    mut contexts: EguiContexts,
    state: Res<State<AppView>>,
    assets: Option<Res<ViewAssets>>,
    driver: Option<Res<PoseDriver>>,
    models: Query<&Visibility, With<ModelRoot>>,
    windows: Query<&Window>,
    mut pending: ResMut<PendingPoseRequest>,
    mut toasts: ResMut<Toasts>,
    time: Res<Time>,
) {
    let scale = ui_scale(&windows);
    let Ok(ctx) = contexts.ctx_mut() else { return };
    let view = *state.get();

    let loading = assets
        .as_ref()
        .is_some_and(|assets| *assets.tracker.status(AssetKind::Model) == AssetStatus::Pending);
    if loading {
        egui::Area::new(egui::Id::new("loading"))
            .anchor(egui::Align2::CENTER_CENTER, egui::Vec2::ZERO)
            .interactable(false)
            .show(ctx, |ui| {
                ui.vertical_centered(|ui| {
                    ui.add(egui::Spinner::new().size(32.0 * scale));
                    ui.label(egui::RichText::new("Loading...").size(15.0 * scale));
                });
            });
    }

    match view {
        AppView::Landing => {
            egui::Area::new(egui::Id::new("enter_ar"))
                .anchor(egui::Align2::RIGHT_TOP, egui::vec2(-16.0, 16.0))
                .show(ctx, |ui| {
                    let button = egui::Button::new(egui::RichText::new("View in AR").size(16.0 * scale))
                        .min_size(egui::vec2(120.0 * scale, 40.0 * scale));
                    if ui.add(button).clicked() {
                        navigate_to(View::Ar);
                    }
                });
        }
        AppView::Ar => {
            egui::Area::new(egui::Id::new("exit_ar"))
                .anchor(egui::Align2::LEFT_TOP, egui::vec2(16.0, 16.0))
                .show(ctx, |ui| {
                    let button = egui::Button::new(egui::RichText::new("Exit AR").size(16.0 * scale))
                        .min_size(egui::vec2(96.0 * scale, 40.0 * scale));
                    if ui.add(button).clicked() {
                        navigate_to(View::Landing);
                    }
                });
        }
        AppView::Booting => {}
    }

    // Pose buttons only act on a visible, bound model that is not mid-fade
    if let Some(driver) = driver.as_ref() {
        let model_visible = models.iter().any(|v| *v != Visibility::Hidden);
        let controller = driver.controller();
        let enabled = model_visible && controller.is_ready() && !controller.is_transitioning();
        let highlighted = controller.target().unwrap_or(controller.current());

        egui::Area::new(egui::Id::new("pose_buttons"))
            .anchor(egui::Align2::CENTER_BOTTOM, egui::vec2(0.0, -24.0 * scale))
            .show(ctx, |ui| {
                if let Some(pose) = render_pose_buttons(ui, highlighted, enabled, scale) {
                    pending.request(pose);
                }
            });
    }

    render_toast(ctx, &mut toasts, time.elapsed_secs_f64(), scale);
}
