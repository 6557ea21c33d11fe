//! Shared egui widgets: toast and pose buttons

use bevy::prelude::*;
use bevy_egui::egui;
use cera_core::{Pose, ToastQueue};

/// The single toast channel every failure and prompt goes through
#[derive(Resource, Default)]
pub struct Toasts(pub ToastQueue);

impl Toasts {
    pub fn new(duration_secs: f32) -> Self {
        Self(ToastQueue::new(duration_secs))
    }

    pub fn show(&mut self, message: impl Into<String>, permanent: bool, now: f64) {
        self.0.show(message, permanent, now);
    }

    pub fn clear(&mut self) {
        self.0.clear();
    }
}

/// Draw the current toast centered near the bottom of the screen
pub fn render_toast(ctx: &egui::Context, toasts: &mut Toasts, now: f64, ui_scale: f32) {
    let Some(toast) = toasts.0.visible(now) else {
        return;
    };

    egui::Area::new(egui::Id::new("toast"))
        .anchor(egui::Align2::CENTER_BOTTOM, egui::vec2(0.0, -96.0 * ui_scale))
        .interactable(false)
        .show(ctx, |ui| {
            egui::Frame::new()
                .fill(egui::Color32::from_black_alpha(180))
                .corner_radius(8.0)
                .inner_margin(egui::Margin::symmetric(16, 10))
                .show(ui, |ui| {
                    ui.label(
                        egui::RichText::new(&toast.message)
                            .size(15.0 * ui_scale)
                            .color(egui::Color32::WHITE),
                    );
                });
        });
}

/// Chair and stretch buttons with the active pose highlighted. Returns the
/// pose the user clicked, if any.
pub fn render_pose_buttons(
    ui: &mut egui::Ui,
    current: Pose,
    enabled: bool,
    ui_scale: f32,
) -> Option<Pose> {
    let mut clicked = None;
    ui.horizontal(|ui| {
        for pose in [Pose::Chair, Pose::Stretch] {
            let active = pose == current;
            let text = egui::RichText::new(pose.label()).size(16.0 * ui_scale);
            let button = egui::Button::new(if active { text.strong() } else { text })
                .min_size(egui::vec2(96.0 * ui_scale, 40.0 * ui_scale))
                .fill(if active {
                    egui::Color32::from_rgb(70, 130, 220)
                } else {
                    egui::Color32::from_gray(60)
                });
            if ui.add_enabled(enabled, button).clicked() {
                clicked = Some(pose);
            }
        }
    });
    clicked
}
