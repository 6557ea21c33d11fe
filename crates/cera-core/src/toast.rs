//! Transient user notifications
//!
//! Only one toast is visible at a time; a new one replaces the old.

#[derive(Debug, Clone, PartialEq)]
pub struct Toast {
    pub message: String,
    /// `None` for permanent toasts
    pub expires_at: Option<f64>,
}

#[derive(Debug, Clone)]
pub struct ToastQueue {
    current: Option<Toast>,
    duration_secs: f64,
}

impl ToastQueue {
    pub fn new(duration_secs: f32) -> Self {
        Self {
            current: None,
            duration_secs: duration_secs.max(0.0) as f64,
        }
    }

    /// Show `message` starting at `now`. An empty message clears the toast.
    pub fn show(&mut self, message: impl Into<String>, permanent: bool, now: f64) {
        let message = message.into();
        if message.is_empty() {
            self.current = None;
            return;
        }
        tracing::info!(toast = %message, "Notify");
        self.current = Some(Toast {
            message,
            expires_at: (!permanent).then_some(now + self.duration_secs),
        });
    }

    pub fn clear(&mut self) {
        self.current = None;
    }

    /// Drop the toast once expired and return what is visible at `now`
    pub fn visible(&mut self, now: f64) -> Option<&Toast> {
        if let Some(expires_at) = self.current.as_ref().and_then(|t| t.expires_at) {
            if now >= expires_at {
                self.current = None;
            }
        }
        self.current.as_ref()
    }
}

impl Default for ToastQueue {
    fn default() -> Self {
        Self::new(3.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transient_toast_expires() {
        let mut toasts = ToastQueue::new(3.0);
        toasts.show("Loading", false, 10.0);
        assert_eq!(toasts.visible(12.9).map(|t| t.message.as_str()), Some("Loading"));
        assert!(toasts.visible(13.0).is_none());
    }

    #[test]
    fn test_permanent_toast_stays() {
        let mut toasts = ToastQueue::new(3.0);
        toasts.show("AR mode is not supported on this device", true, 0.0);
        assert!(toasts.visible(1_000.0).is_some());
    }

    #[test]
    fn test_newer_replaces_older() {
        let mut toasts = ToastQueue::new(3.0);
        toasts.show("first", true, 0.0);
        toasts.show("second", false, 1.0);
        let visible = toasts.visible(1.5).unwrap();
        assert_eq!(visible.message, "second");
        assert_eq!(visible.expires_at, Some(4.0));
    }

    #[test]
    fn test_empty_message_clears() {
        let mut toasts = ToastQueue::new(3.0);
        toasts.show("placed", true, 0.0);
        toasts.show("", false, 1.0);
        assert!(toasts.visible(1.0).is_none());
    }
}
