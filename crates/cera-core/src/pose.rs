//! Pose crossfade between the "chair" and "stretch" animation clips
//!
//! The crossfade is a pure function of time. Whoever owns the frame loop
//! calls [`PoseController::sample`] once per frame and applies the returned
//! weights to the two animation actions; nothing here schedules itself.

use crate::easing::ease_in_out_quad;

/// The two baked poses of the model
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Pose {
    #[default]
    Chair,
    Stretch,
}

impl Pose {
    /// The pose this one crossfades away from
    pub fn other(self) -> Pose {
        match self {
            Pose::Chair => Pose::Stretch,
            Pose::Stretch => Pose::Chair,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Pose::Chair => "Chair",
            Pose::Stretch => "Stretch",
        }
    }
}

/// Effective weights of the two animation actions
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PoseWeights {
    pub chair: f32,
    pub stretch: f32,
}

impl PoseWeights {
    /// Weights with `pose` fully active and the other fully off
    pub fn settled(pose: Pose) -> Self {
        match pose {
            Pose::Chair => Self { chair: 1.0, stretch: 0.0 },
            Pose::Stretch => Self { chair: 0.0, stretch: 1.0 },
        }
    }

    pub fn of(&self, pose: Pose) -> f32 {
        match pose {
            Pose::Chair => self.chair,
            Pose::Stretch => self.stretch,
        }
    }

    fn set(&mut self, pose: Pose, weight: f32) {
        match pose {
            Pose::Chair => self.chair = weight,
            Pose::Stretch => self.stretch = weight,
        }
    }

    pub fn sum(&self) -> f32 {
        self.chair + self.stretch
    }
}

/// Result of a pose switch request. Only `Started` changes any state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SwitchOutcome {
    Started,
    /// The requested pose is already the current pose
    AlreadyActive,
    /// A transition is in flight; requests are dropped, not queued
    Busy,
    /// The animation actions have not been bound yet
    NotReady,
}

#[derive(Debug, Clone, Copy)]
struct Transition {
    to: Pose,
    started_at: f64,
    start_from: f32,
    start_to: f32,
}

/// Owns the current pose and the in-flight crossfade, if any
#[derive(Debug, Clone)]
pub struct PoseController {
    current: Pose,
    weights: PoseWeights,
    transition: Option<Transition>,
    duration_secs: f32,
    ready: bool,
}

impl PoseController {
    /// Create a controller resting in the chair pose
    pub fn new(duration_secs: f32) -> Self {
        Self {
            current: Pose::Chair,
            weights: PoseWeights::settled(Pose::Chair),
            transition: None,
            duration_secs: duration_secs.max(0.0),
            ready: false,
        }
    }

    /// Mark both animation actions as bound
    pub fn mark_ready(&mut self) {
        self.ready = true;
    }

    pub fn is_ready(&self) -> bool {
        self.ready
    }

    pub fn current(&self) -> Pose {
        self.current
    }

    pub fn weights(&self) -> PoseWeights {
        self.weights
    }

    pub fn is_transitioning(&self) -> bool {
        self.transition.is_some()
    }

    /// Target of the in-flight transition
    pub fn target(&self) -> Option<Pose> {
        self.transition.map(|t| t.to)
    }

    pub fn duration_secs(&self) -> f32 {
        self.duration_secs
    }

    /// Begin a crossfade towards `target` at time `now` (seconds)
    pub fn switch_pose(&mut self, target: Pose, now: f64) -> SwitchOutcome {
        if !self.ready {
            return SwitchOutcome::NotReady;
        }
        if self.transition.is_some() {
            return SwitchOutcome::Busy;
        }
        if target == self.current {
            return SwitchOutcome::AlreadyActive;
        }

        self.transition = Some(Transition {
            to: target,
            started_at: now,
            start_from: self.weights.of(target.other()),
            start_to: self.weights.of(target),
        });
        tracing::debug!(?target, "Pose transition started");
        SwitchOutcome::Started
    }

    /// Advance to time `now` and return the weights to apply this frame
    pub fn sample(&mut self, now: f64) -> PoseWeights {
        let Some(transition) = self.transition else {
            return self.weights;
        };

        let elapsed = (now - transition.started_at).max(0.0) as f32;
        let progress = if self.duration_secs > 0.0 {
            (elapsed / self.duration_secs).min(1.0)
        } else {
            1.0
        };

        let to = transition.to;
        let from = to.other();

        if progress >= 1.0 {
            self.weights = PoseWeights::settled(to);
            self.current = to;
            self.transition = None;
            tracing::debug!(pose = ?to, "Pose transition finished");
            return self.weights;
        }

        let eased = ease_in_out_quad(progress);
        self.weights.set(from, transition.start_from * (1.0 - eased));
        self.weights
            .set(to, transition.start_to + (1.0 - transition.start_to) * eased);
        self.weights
    }
}

impl Default for PoseController {
    fn default() -> Self {
        Self::new(3.0)
    }
}
