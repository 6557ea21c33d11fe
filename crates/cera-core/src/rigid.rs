//! View transforms and projections reported by the AR platform

use glam::{Mat4, Quat, Vec3};

/// Position and orientation without scale
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RigidPose {
    pub position: Vec3,
    pub orientation: Quat,
}

impl RigidPose {
    pub const IDENTITY: Self = Self {
        position: Vec3::ZERO,
        orientation: Quat::IDENTITY,
    };

    pub fn from_position(position: Vec3) -> Self {
        Self {
            position,
            orientation: Quat::IDENTITY,
        }
    }

    /// Build from a column-major 4x4 matrix (the layout WebXR uses)
    pub fn from_cols_array(m: &[f32; 16]) -> Self {
        let (_scale, orientation, position) = Mat4::from_cols_array(m).to_scale_rotation_translation();
        Self {
            position,
            orientation: orientation.normalize(),
        }
    }

    /// Build from a slice of at least 16 floats; shorter input yields `None`
    pub fn from_slice(m: &[f32]) -> Option<Self> {
        let array: [f32; 16] = m.get(..16)?.try_into().ok()?;
        Some(Self::from_cols_array(&array))
    }
}

impl Default for RigidPose {
    fn default() -> Self {
        Self::IDENTITY
    }
}

/// Symmetric perspective recovered from a view's projection matrix.
/// Off-axis terms are dropped.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ViewProjection {
    /// Vertical field of view in radians
    pub fov_y: f32,
    pub aspect: f32,
    pub near: f32,
    /// `f32::INFINITY` for an infinite far plane
    pub far: f32,
}

impl ViewProjection {
    /// Decompose a column-major, GL clip-space (z in -1..1) perspective matrix
    pub fn from_slice(m: &[f32]) -> Option<Self> {
        let m: &[f32; 16] = m.get(..16)?.try_into().ok()?;
        let (m0, m5, m10, m14) = (m[0], m[5], m[10], m[14]);
        if !(m0.is_finite() && m5.is_finite() && m0 > 0.0 && m5 > 0.0) {
            return None;
        }

        let near = m14 / (m10 - 1.0);
        let far = if (m10 + 1.0).abs() <= f32::EPSILON {
            f32::INFINITY
        } else {
            m14 / (m10 + 1.0)
        };
        if !(near.is_finite() && near > 0.0 && far > near) {
            return None;
        }

        Some(Self {
            fov_y: 2.0 * (1.0 / m5).atan(),
            aspect: m5 / m0,
            near,
            far,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_translation_column() {
        let mut m = Mat4::IDENTITY.to_cols_array();
        m[12] = 1.0;
        m[13] = -0.5;
        m[14] = 2.0;
        let pose = RigidPose::from_cols_array(&m);
        assert_eq!(pose.position, Vec3::new(1.0, -0.5, 2.0));
        assert!(pose.orientation.abs_diff_eq(Quat::IDENTITY, 1e-6));
    }

    #[test]
    fn test_rotation_preserved() {
        let rotation = Quat::from_rotation_y(0.7);
        let m = Mat4::from_rotation_translation(rotation, Vec3::new(0.0, 1.0, 0.0)).to_cols_array();
        let pose = RigidPose::from_cols_array(&m);
        assert!(pose.orientation.abs_diff_eq(rotation, 1e-5));
    }

    #[test]
    fn test_short_slice_rejected() {
        assert!(RigidPose::from_slice(&[0.0; 12]).is_none());
        assert!(RigidPose::from_slice(&Mat4::IDENTITY.to_cols_array()).is_some());
    }

    #[test]
    fn test_projection_roundtrips_perspective() {
        let m = Mat4::perspective_rh_gl(1.2, 0.5, 0.05, 40.0).to_cols_array();
        let projection = ViewProjection::from_slice(&m).unwrap();
        assert!((projection.fov_y - 1.2).abs() < 1e-5);
        assert!((projection.aspect - 0.5).abs() < 1e-5);
        assert!((projection.near - 0.05).abs() < 1e-4);
        assert!((projection.far - 40.0).abs() < 1e-1);
    }

    #[test]
    fn test_projection_infinite_far() {
        let mut m = Mat4::perspective_rh_gl(1.0, 1.0, 0.1, 10.0).to_cols_array();
        m[10] = -1.0;
        m[14] = -0.2;
        let projection = ViewProjection::from_slice(&m).unwrap();
        assert!((projection.near - 0.1).abs() < 1e-6);
        assert!(projection.far.is_infinite());
    }

    #[test]
    fn test_projection_rejects_non_perspective() {
        assert!(ViewProjection::from_slice(&Mat4::IDENTITY.to_cols_array()).is_none());
        assert!(ViewProjection::from_slice(&[1.0; 8]).is_none());
    }
}
