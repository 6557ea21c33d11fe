//! Two-finger twist gesture that rotates the placed model around Y

use glam::Vec2;

/// Tracks a two-finger twist. The rotation is absolute: it is the angle of
/// the line between the two touches, offset so the gesture starts from the
/// model's current Y rotation.
#[derive(Debug, Clone, Default)]
pub struct TwoFingerRotation {
    active: bool,
    start_offset: f32,
}

fn touch_angle(a: Vec2, b: Vec2) -> f32 {
    (b.y - a.y).atan2(b.x - a.x)
}

impl TwoFingerRotation {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    /// Begin a gesture if exactly two touches are down and the model is placed
    pub fn touch_start(&mut self, touches: &[Vec2], placed: bool, current_y: f32) -> bool {
        if let ([a, b], true) = (touches, placed) {
            self.active = true;
            self.start_offset = touch_angle(*a, *b) - current_y;
        }
        self.active
    }

    /// New Y rotation for this move, if the gesture is live
    pub fn touch_move(&mut self, touches: &[Vec2], placed: bool) -> Option<f32> {
        match (touches, self.active && placed) {
            ([a, b], true) => Some(touch_angle(*a, *b) - self.start_offset),
            _ => None,
        }
    }

    /// Called with the number of touches still down
    pub fn touch_end(&mut self, remaining: usize) {
        if remaining < 2 {
            self.active = false;
        }
    }

    /// Feed the full set of active touches for one frame.
    ///
    /// Starts, continues or ends the gesture as appropriate and returns the
    /// Y rotation to apply, if any.
    pub fn update(&mut self, touches: &[Vec2], placed: bool, current_y: f32) -> Option<f32> {
        if touches.len() < 2 {
            self.touch_end(touches.len());
            return None;
        }
        if !self.active {
            self.touch_start(touches, placed, current_y);
            return None;
        }
        self.touch_move(touches, placed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f32::consts::FRAC_PI_2;

    #[test]
    fn test_inactive_before_placement() {
        let mut gesture = TwoFingerRotation::new();
        let touches = [Vec2::new(0.0, 0.0), Vec2::new(100.0, 0.0)];
        assert!(!gesture.touch_start(&touches, false, 0.0));
        assert_eq!(gesture.touch_move(&touches, false), None);
        assert_eq!(gesture.update(&touches, false, 0.0), None);
        assert!(!gesture.is_active());
    }

    #[test]
    fn test_twist_rotates_from_current() {
        let mut gesture = TwoFingerRotation::new();
        let start = [Vec2::new(0.0, 0.0), Vec2::new(100.0, 0.0)];
        assert!(gesture.touch_start(&start, true, 0.5));

        // Unchanged touches keep the current rotation
        let same = gesture.touch_move(&start, true).unwrap();
        assert!((same - 0.5).abs() < 1e-6);

        // Second finger swings a quarter turn
        let twisted = [Vec2::new(0.0, 0.0), Vec2::new(0.0, 100.0)];
        let y = gesture.touch_move(&twisted, true).unwrap();
        assert!((y - (0.5 + FRAC_PI_2)).abs() < 1e-5);
    }

    #[test]
    fn test_single_touch_ends_gesture() {
        let mut gesture = TwoFingerRotation::new();
        let two = [Vec2::ZERO, Vec2::X];
        gesture.touch_start(&two, true, 0.0);
        gesture.touch_end(1);
        assert!(!gesture.is_active());
        assert_eq!(gesture.touch_move(&two, true), None);
    }

    #[test]
    fn test_three_touches_do_not_rotate() {
        let mut gesture = TwoFingerRotation::new();
        gesture.touch_start(&[Vec2::ZERO, Vec2::X], true, 0.0);
        assert_eq!(gesture.touch_move(&[Vec2::ZERO, Vec2::X, Vec2::Y], true), None);
    }

    #[test]
    fn test_frame_update_sequence() {
        let mut gesture = TwoFingerRotation::new();
        let start = [Vec2::new(0.0, 0.0), Vec2::new(10.0, 0.0)];
        assert_eq!(gesture.update(&start, true, 0.2), None);
        assert!(gesture.is_active());

        let moved = [Vec2::new(0.0, 0.0), Vec2::new(10.0, 10.0)];
        let y = gesture.update(&moved, true, 0.2).unwrap();
        assert!((y - (0.2 + std::f32::consts::FRAC_PI_4)).abs() < 1e-5);

        assert_eq!(gesture.update(&[Vec2::ZERO], true, y), None);
        assert!(!gesture.is_active());
    }
}
