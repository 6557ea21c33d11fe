//! AR session launch sequencing
//!
//! The launcher does no I/O. It turns platform results ([`SessionEvent`])
//! into the next platform request ([`SessionCommand`]) plus any toast to
//! show. Optional features are resolved once, when the session starts, into
//! [`SessionCapabilities`].

use crate::config::ArConfig;
use crate::error::{Capability, ViewerError};

pub const FEATURE_HIT_TEST: &str = "hit-test";
pub const FEATURE_ANCHORS: &str = "anchors";
pub const FEATURE_DOM_OVERLAY: &str = "dom-overlay";

/// Parameters for the immersive session request
#[derive(Debug, Clone, PartialEq)]
pub struct SessionInit {
    pub required_features: Vec<String>,
    pub optional_features: Vec<String>,
    /// Element id used as the DOM overlay root, if requested
    pub dom_overlay_root: Option<String>,
    pub reference_space: String,
}

impl SessionInit {
    pub fn from_config(config: &ArConfig) -> Self {
        let mut optional_features = Vec::new();
        if config.use_anchors {
            optional_features.push(FEATURE_ANCHORS.to_string());
        }
        if config.dom_overlay_root.is_some() {
            optional_features.push(FEATURE_DOM_OVERLAY.to_string());
        }
        Self {
            required_features: vec![FEATURE_HIT_TEST.to_string()],
            optional_features,
            dom_overlay_root: config.dom_overlay_root.clone(),
            reference_space: config.reference_space.clone(),
        }
    }
}

/// Optional features actually granted by the platform
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SessionCapabilities {
    pub anchors: bool,
    pub dom_overlay: bool,
}

impl SessionCapabilities {
    /// Resolve from the session's enabled feature list
    pub fn from_granted<S: AsRef<str>>(features: &[S]) -> Self {
        let has = |name: &str| features.iter().any(|f| f.as_ref() == name);
        Self {
            anchors: has(FEATURE_ANCHORS),
            dom_overlay: has(FEATURE_DOM_OVERLAY),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SessionState {
    #[default]
    Idle,
    CheckingSupport,
    Requesting,
    Running(SessionCapabilities),
    Ended,
    Failed,
}

/// Request for the platform bridge
#[derive(Debug, Clone, PartialEq)]
pub enum SessionCommand {
    CheckSupport,
    RequestSession(SessionInit),
    EndSession,
}

/// Result reported by the platform bridge
#[derive(Debug, Clone, PartialEq)]
pub enum SessionEvent {
    /// No XR object exists in this browser
    ApiMissing,
    SupportChecked(bool),
    SessionStarted(SessionCapabilities),
    SessionFailed(String),
    /// The platform ended the session
    Ended,
}

/// Side effects produced by a launcher step
#[derive(Debug, Clone, PartialEq)]
pub enum SessionOutput {
    Command(SessionCommand),
    Toast { message: String, permanent: bool },
}

#[derive(Debug, Clone)]
pub struct SessionLauncher {
    state: SessionState,
    init: SessionInit,
    place_prompt: String,
}

impl SessionLauncher {
    pub fn new(config: &ArConfig) -> Self {
        Self {
            state: SessionState::Idle,
            init: SessionInit::from_config(config),
            place_prompt: config.place_prompt.clone(),
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Capabilities of the running session
    pub fn capabilities(&self) -> Option<SessionCapabilities> {
        match self.state {
            SessionState::Running(caps) => Some(caps),
            _ => None,
        }
    }

    pub fn is_running(&self) -> bool {
        matches!(self.state, SessionState::Running(_))
    }

    /// Kick off the capability query. Only valid from `Idle`.
    pub fn start(&mut self) -> Vec<SessionOutput> {
        if self.state != SessionState::Idle {
            return Vec::new();
        }
        self.state = SessionState::CheckingSupport;
        vec![SessionOutput::Command(SessionCommand::CheckSupport)]
    }

    pub fn handle(&mut self, event: SessionEvent) -> Vec<SessionOutput> {
        match (self.state, event) {
            (SessionState::CheckingSupport, SessionEvent::ApiMissing) => {
                self.fail(ViewerError::Unsupported(Capability::XrApi))
            }
            (SessionState::CheckingSupport, SessionEvent::SupportChecked(false)) => {
                self.fail(ViewerError::Unsupported(Capability::ImmersiveAr))
            }
            (SessionState::CheckingSupport, SessionEvent::SupportChecked(true)) => {
                self.state = SessionState::Requesting;
                vec![SessionOutput::Command(SessionCommand::RequestSession(
                    self.init.clone(),
                ))]
            }
            (SessionState::Requesting, SessionEvent::SessionStarted(caps)) => {
                tracing::info!(anchors = caps.anchors, dom_overlay = caps.dom_overlay, "AR session started");
                self.state = SessionState::Running(caps);
                vec![SessionOutput::Toast {
                    message: self.place_prompt.clone(),
                    permanent: false,
                }]
            }
            (SessionState::Requesting, SessionEvent::SessionFailed(reason)) => {
                self.fail(ViewerError::Session(reason))
            }
            (SessionState::Requesting | SessionState::Running(_), SessionEvent::Ended) => {
                tracing::info!("AR session ended by platform");
                self.state = SessionState::Ended;
                Vec::new()
            }
            (state, event) => {
                tracing::debug!(?state, ?event, "Ignoring session event");
                Vec::new()
            }
        }
    }

    /// End the session from our side (view teardown)
    pub fn end(&mut self) -> Vec<SessionOutput> {
        match self.state {
            SessionState::Running(_) => {
                self.state = SessionState::Ended;
                vec![SessionOutput::Command(SessionCommand::EndSession)]
            }
            _ => Vec::new(),
        }
    }

    fn fail(&mut self, error: ViewerError) -> Vec<SessionOutput> {
        tracing::error!(%error, "AR session unavailable");
        self.state = SessionState::Failed;
        vec![SessionOutput::Toast {
            message: error.user_message(),
            permanent: true,
        }]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn launcher() -> SessionLauncher {
        SessionLauncher::new(&ArConfig::default())
    }

    fn toasts(outputs: &[SessionOutput]) -> usize {
        outputs
            .iter()
            .filter(|o| matches!(o, SessionOutput::Toast { .. }))
            .count()
    }

    fn requests(outputs: &[SessionOutput]) -> usize {
        outputs
            .iter()
            .filter(|o| matches!(o, SessionOutput::Command(SessionCommand::RequestSession(_))))
            .count()
    }

    #[test]
    fn test_start_checks_support_once() {
        let mut l = launcher();
        assert_eq!(l.start(), vec![SessionOutput::Command(SessionCommand::CheckSupport)]);
        assert!(l.start().is_empty());
    }

    #[test]
    fn test_unsupported_single_toast_no_request() {
        let mut l = launcher();
        let mut outputs = l.start();
        outputs.extend(l.handle(SessionEvent::SupportChecked(false)));

        assert_eq!(toasts(&outputs), 1);
        assert_eq!(requests(&outputs), 0);
        assert_eq!(l.state(), SessionState::Failed);
        match outputs.last() {
            Some(SessionOutput::Toast { message, permanent }) => {
                assert!(message.contains("not supported"));
                assert!(*permanent);
            }
            other => panic!("expected toast, got {:?}", other),
        }

        // Late events do not produce a second toast or a request
        let late = l.handle(SessionEvent::SupportChecked(true));
        assert!(late.is_empty());
    }

    #[test]
    fn test_missing_api_reports_once() {
        let mut l = launcher();
        l.start();
        let outputs = l.handle(SessionEvent::ApiMissing);
        assert_eq!(toasts(&outputs), 1);
        assert_eq!(requests(&outputs), 0);
    }

    #[test]
    fn test_request_features() {
        let mut l = launcher();
        l.start();
        let outputs = l.handle(SessionEvent::SupportChecked(true));
        match &outputs[..] {
            [SessionOutput::Command(SessionCommand::RequestSession(init))] => {
                assert_eq!(init.required_features, vec!["hit-test".to_string()]);
                assert!(init.optional_features.contains(&"anchors".to_string()));
                assert!(init.optional_features.contains(&"dom-overlay".to_string()));
                assert_eq!(init.reference_space, "local-floor");
            }
            other => panic!("unexpected outputs {:?}", other),
        }
        assert_eq!(l.state(), SessionState::Requesting);
    }

    #[test]
    fn test_capabilities_resolved_at_start() {
        let mut l = launcher();
        l.start();
        l.handle(SessionEvent::SupportChecked(true));
        let caps = SessionCapabilities::from_granted(&["hit-test", "local-floor"]);
        let outputs = l.handle(SessionEvent::SessionStarted(caps));
        assert_eq!(toasts(&outputs), 1);
        assert_eq!(l.capabilities(), Some(SessionCapabilities { anchors: false, dom_overlay: false }));
    }

    #[test]
    fn test_session_failure_is_reported() {
        let mut l = launcher();
        l.start();
        l.handle(SessionEvent::SupportChecked(true));
        let outputs = l.handle(SessionEvent::SessionFailed("NotAllowedError".into()));
        assert_eq!(toasts(&outputs), 1);
        assert_eq!(l.state(), SessionState::Failed);
        assert!(l.end().is_empty());
    }

    #[test]
    fn test_end_only_while_running() {
        let mut l = launcher();
        assert!(l.end().is_empty());
        l.start();
        l.handle(SessionEvent::SupportChecked(true));
        l.handle(SessionEvent::SessionStarted(SessionCapabilities::default()));
        assert_eq!(l.end(), vec![SessionOutput::Command(SessionCommand::EndSession)]);
        assert_eq!(l.state(), SessionState::Ended);
        assert!(l.end().is_empty());
    }

    #[test]
    fn test_anchors_can_be_disabled() {
        let config = ArConfig {
            use_anchors: false,
            dom_overlay_root: None,
            ..ArConfig::default()
        };
        let init = SessionInit::from_config(&config);
        assert!(init.optional_features.is_empty());
    }
}
