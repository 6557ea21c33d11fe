//! Placement state machine for the AR view
//!
//! `Searching` follows the per-frame hit test with a reticle. A confirm
//! gesture while a hit exists moves to `Placed`, which is terminal for the
//! lifetime of the session.

use glam::Vec3;

use crate::error::ViewerError;
use crate::rigid::RigidPose;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PlacementState {
    #[default]
    Searching,
    Placed,
}

/// Opaque reference to a platform anchor, issued by the XR bridge
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct AnchorId(pub u32);

/// What the caller must do after a successful confirm
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PlacementCommand {
    /// Anchors are unavailable for this session; the model stays put
    Static { position: Vec3 },
    /// Ask the platform for an anchor at this pose
    RequestAnchor { pose: RigidPose },
}

#[derive(Debug, Clone)]
pub struct PlacementController {
    state: PlacementState,
    reticle: Option<RigidPose>,
    anchors_enabled: bool,
    anchor: Option<AnchorId>,
    model_visible: bool,
    model_position: Vec3,
    /// Euler XYZ; only Y is ever written after placement
    model_rotation: Vec3,
}

impl PlacementController {
    /// `anchors_enabled` is the session capability resolved at start
    pub fn new(anchors_enabled: bool) -> Self {
        Self {
            state: PlacementState::Searching,
            reticle: None,
            anchors_enabled,
            anchor: None,
            model_visible: false,
            model_position: Vec3::ZERO,
            model_rotation: Vec3::ZERO,
        }
    }

    pub fn state(&self) -> PlacementState {
        self.state
    }

    pub fn is_placed(&self) -> bool {
        self.state == PlacementState::Placed
    }

    pub fn anchors_enabled(&self) -> bool {
        self.anchors_enabled
    }

    pub fn anchor(&self) -> Option<AnchorId> {
        self.anchor
    }

    pub fn model_visible(&self) -> bool {
        self.model_visible
    }

    pub fn model_position(&self) -> Vec3 {
        self.model_position
    }

    pub fn model_rotation(&self) -> Vec3 {
        self.model_rotation
    }

    pub fn reticle_visible(&self) -> bool {
        self.state == PlacementState::Searching && self.reticle.is_some()
    }

    pub fn reticle_pose(&self) -> Option<RigidPose> {
        if self.reticle_visible() {
            self.reticle
        } else {
            None
        }
    }

    /// Feed this frame's first hit-test result. Ignored once placed.
    pub fn update_hit(&mut self, hit: Option<RigidPose>) {
        if self.state == PlacementState::Searching {
            self.reticle = hit;
        }
    }

    /// Handle a select/tap. Returns `None` when nothing was placed.
    pub fn confirm(&mut self) -> Option<PlacementCommand> {
        if self.state != PlacementState::Searching {
            return None;
        }
        let reticle = self.reticle?;

        self.model_position = reticle.position;
        self.model_rotation = Vec3::ZERO;
        self.model_visible = true;
        self.state = PlacementState::Placed;
        self.reticle = None;

        tracing::info!(position = ?self.model_position, "Model placed");

        if self.anchors_enabled {
            Some(PlacementCommand::RequestAnchor {
                pose: RigidPose::from_position(self.model_position),
            })
        } else {
            Some(PlacementCommand::Static {
                position: self.model_position,
            })
        }
    }

    pub fn anchor_created(&mut self, anchor: AnchorId) {
        if self.is_placed() {
            self.anchor = Some(anchor);
        }
    }

    /// Anchor creation was rejected; keep the static placement
    pub fn anchor_failed(&mut self, reason: &str) {
        let err = ViewerError::Anchor(reason.to_string());
        tracing::warn!(error = %err, "{}", err.user_message());
        self.anchor = None;
    }

    /// Re-apply the tracked anchor position. Rotation stays under user control.
    pub fn apply_anchor_pose(&mut self, pose: RigidPose) {
        if self.is_placed() && self.anchor.is_some() {
            self.model_position = pose.position;
        }
    }

    /// Set the model's Y rotation. Returns false before placement.
    pub fn set_rotation_y(&mut self, radians: f32) -> bool {
        if !self.is_placed() {
            return false;
        }
        self.model_rotation.y = radians;
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hit_at(x: f32, y: f32, z: f32) -> Option<RigidPose> {
        Some(RigidPose::from_position(Vec3::new(x, y, z)))
    }

    #[test]
    fn test_reticle_tracks_hits() {
        let mut placement = PlacementController::new(false);
        assert!(!placement.reticle_visible());

        placement.update_hit(hit_at(0.0, 0.0, -1.0));
        assert!(placement.reticle_visible());

        placement.update_hit(None);
        assert!(!placement.reticle_visible());
    }

    #[test]
    fn test_confirm_without_hit_is_noop() {
        let mut placement = PlacementController::new(true);
        assert!(placement.confirm().is_none());
        assert_eq!(placement.state(), PlacementState::Searching);
        assert!(!placement.model_visible());
    }

    #[test]
    fn test_confirm_places_at_reticle() {
        let mut placement = PlacementController::new(false);
        placement.update_hit(hit_at(0.5, 0.0, -1.5));
        let command = placement.confirm();
        assert_eq!(
            command,
            Some(PlacementCommand::Static {
                position: Vec3::new(0.5, 0.0, -1.5)
            })
        );
        assert!(placement.is_placed());
        assert!(placement.model_visible());
        assert_eq!(placement.model_rotation(), Vec3::ZERO);
        assert!(!placement.reticle_visible());
    }

    #[test]
    fn test_placement_happens_once() {
        let mut placement = PlacementController::new(false);
        placement.update_hit(hit_at(1.0, 0.0, 0.0));
        assert!(placement.confirm().is_some());

        placement.update_hit(hit_at(9.0, 0.0, 9.0));
        assert!(!placement.reticle_visible());
        assert!(placement.confirm().is_none());
        assert_eq!(placement.model_position(), Vec3::new(1.0, 0.0, 0.0));
    }

    #[test]
    fn test_anchor_requested_only_with_capability() {
        let mut placement = PlacementController::new(true);
        placement.update_hit(hit_at(0.0, 0.0, -2.0));
        match placement.confirm() {
            Some(PlacementCommand::RequestAnchor { pose }) => {
                assert_eq!(pose.position, Vec3::new(0.0, 0.0, -2.0));
            }
            other => panic!("expected anchor request, got {:?}", other),
        }
    }

    #[test]
    fn test_anchor_updates_position_only() {
        let mut placement = PlacementController::new(true);
        placement.update_hit(hit_at(0.0, 0.0, -2.0));
        placement.confirm();
        placement.anchor_created(AnchorId(7));
        placement.set_rotation_y(1.0);

        let tracked = RigidPose {
            position: Vec3::new(0.1, 0.0, -2.1),
            orientation: glam::Quat::from_rotation_y(2.5),
        };
        placement.apply_anchor_pose(tracked);
        assert_eq!(placement.model_position(), Vec3::new(0.1, 0.0, -2.1));
        assert_eq!(placement.model_rotation(), Vec3::new(0.0, 1.0, 0.0));
    }

    #[test]
    fn test_anchor_failure_falls_back_to_static() {
        let mut placement = PlacementController::new(true);
        placement.update_hit(hit_at(0.0, 0.0, -2.0));
        placement.confirm();
        placement.anchor_failed("NotSupportedError");

        placement.apply_anchor_pose(RigidPose::from_position(Vec3::ONE));
        assert_eq!(placement.model_position(), Vec3::new(0.0, 0.0, -2.0));
        assert!(placement.anchor().is_none());
    }

    #[test]
    fn test_rotation_rejected_before_placement() {
        let mut placement = PlacementController::new(false);
        assert!(!placement.set_rotation_y(1.2));
        assert_eq!(placement.model_rotation(), Vec3::ZERO);
    }
}
