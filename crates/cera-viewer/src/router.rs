//! View routing bound to the URL fragment

use bevy::prelude::*;
use cera_core::{View, ViewRouter};
use std::sync::{Arc, Mutex};
use tracing::{error, info, warn};
use wasm_bindgen::prelude::*;
use wasm_bindgen::JsCast;

/// Application state. `Booting` lasts until the viewer configuration has
/// been fetched (or given up on).
#[derive(States, Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum AppView {
    #[default]
    Booting,
    Landing,
    Ar,
}

impl From<View> for AppView {
    fn from(view: View) -> Self {
        match view {
            View::Landing => AppView::Landing,
            View::Ar => AppView::Ar,
        }
    }
}

/// Active view plus the fragment reported by the last `hashchange`
#[derive(Resource, Default)]
pub struct Router {
    router: ViewRouter,
    pub pending_fragment: Arc<Mutex<Option<String>>>,
}

impl Router {
    /// Route to `fragment`, queuing the state change if the view differs
    pub fn route(&mut self, fragment: &str, next: &mut NextState<AppView>) {
        if let Some(switch) = self.router.navigate_fragment(fragment) {
            info!("Switching view {:?} -> {}", switch.from, switch.to);
            next.set(switch.to.into());
        }
    }
}

pub struct RouterPlugin;

impl Plugin for RouterPlugin {
    fn build(&self, app: &mut App) {
        app.init_state::<AppView>()
            .init_resource::<Router>()
            .add_systems(Startup, listen_for_fragment_changes)
            .add_systems(
                Update,
                route_pending_fragment.run_if(not(in_state(AppView::Booting))),
            );
    }
}

/// Current `location.hash`, empty if unavailable
pub fn current_fragment() -> String {
    web_sys::window()
        .and_then(|window| window.location().hash().ok())
        .unwrap_or_default()
}

/// Set the fragment; the `hashchange` listener performs the switch
pub fn navigate_to(view: View) {
    let Some(window) = web_sys::window() else {
        return;
    };
    if let Err(e) = window.location().set_hash(view.tag()) {
        warn!("Failed to set location hash: {:?}", e);
    }
}

fn listen_for_fragment_changes(router: Res<Router>) {
    let Some(window) = web_sys::window() else {
        return;
    };

    let pending = router.pending_fragment.clone();
    let closure = Closure::<dyn FnMut()>::new(move || {
        if let Ok(mut slot) = pending.lock() {
            *slot = Some(current_fragment());
        }
    });

    if let Err(e) =
        window.add_event_listener_with_callback("hashchange", closure.as_ref().unchecked_ref())
    {
        error!("Failed to listen for hashchange: {:?}", e);
    }
    closure.forget();
}

fn route_pending_fragment(mut router: ResMut<Router>, mut next: ResMut<NextState<AppView>>) {
    let fragment = router
        .pending_fragment
        .try_lock()
        .ok()
        .and_then(|mut slot| slot.take());
    if let Some(fragment) = fragment {
        router.route(&fragment, &mut next);
    }
}
