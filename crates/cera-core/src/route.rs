//! Fragment-driven routing between the landing and AR views

use std::fmt;

/// The two mutually exclusive views
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum View {
    /// Orbit preview
    #[default]
    Landing,
    /// Immersive placement
    Ar,
}

impl View {
    /// Parse a URL fragment (with or without the leading `#`).
    /// Anything other than `ar` routes to the landing view.
    pub fn from_fragment(fragment: &str) -> View {
        let tag = fragment.trim_start_matches('#').trim();
        if tag.eq_ignore_ascii_case("ar") {
            View::Ar
        } else {
            View::Landing
        }
    }

    pub fn tag(self) -> &'static str {
        match self {
            View::Landing => "landing",
            View::Ar => "ar",
        }
    }

    pub fn fragment(self) -> String {
        format!("#{}", self.tag())
    }
}

impl fmt::Display for View {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

/// A required view change: tear `from` down, then set `to` up
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ViewSwitch {
    pub from: Option<View>,
    pub to: View,
}

/// Remembers the active view and decides whether a navigation needs a switch
#[derive(Debug, Clone, Default)]
pub struct ViewRouter {
    active: Option<View>,
}

impl ViewRouter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn active(&self) -> Option<View> {
        self.active
    }

    /// Navigate to `view`; `None` when it is already active
    pub fn navigate(&mut self, view: View) -> Option<ViewSwitch> {
        if self.active == Some(view) {
            return None;
        }
        let switch = ViewSwitch {
            from: self.active,
            to: view,
        };
        self.active = Some(view);
        Some(switch)
    }

    /// Navigate from a raw URL fragment
    pub fn navigate_fragment(&mut self, fragment: &str) -> Option<ViewSwitch> {
        self.navigate(View::from_fragment(fragment))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fragment_parsing() {
        assert_eq!(View::from_fragment("#ar"), View::Ar);
        assert_eq!(View::from_fragment("AR"), View::Ar);
        assert_eq!(View::from_fragment(""), View::Landing);
        assert_eq!(View::from_fragment("#landing"), View::Landing);
        assert_eq!(View::from_fragment("#something-else"), View::Landing);
    }

    #[test]
    fn test_fragment_round_trip_tags() {
        assert_eq!(View::from_fragment(&View::Ar.fragment()), View::Ar);
        assert_eq!(View::Landing.to_string(), "landing");
    }

    #[test]
    fn test_first_navigation_has_no_teardown() {
        let mut router = ViewRouter::new();
        assert_eq!(
            router.navigate(View::Landing),
            Some(ViewSwitch { from: None, to: View::Landing })
        );
    }

    #[test]
    fn test_switch_tears_down_previous() {
        let mut router = ViewRouter::new();
        router.navigate(View::Landing);
        assert_eq!(
            router.navigate_fragment("#ar"),
            Some(ViewSwitch { from: Some(View::Landing), to: View::Ar })
        );
        assert_eq!(router.active(), Some(View::Ar));
    }

    #[test]
    fn test_same_view_is_noop() {
        let mut router = ViewRouter::new();
        router.navigate(View::Ar);
        assert_eq!(router.navigate(View::Ar), None);
        assert_eq!(router.navigate_fragment("#AR"), None);
    }
}
