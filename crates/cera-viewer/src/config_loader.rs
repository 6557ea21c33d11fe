//! Fetches `viewer.toml` from the deployment directory before the first view

use bevy::prelude::*;
use cera_core::config::CONFIG_FILE_NAME;
use cera_core::{base_directory, load_config_or_default, resolve_asset_url};
use cera_scene::{Toasts, ViewerSettings};
use std::sync::{Arc, Mutex};
use tracing::{debug, info};
use wasm_bindgen::JsCast;

use crate::router::{current_fragment, AppView, Router};

pub struct ConfigLoaderPlugin;

impl Plugin for ConfigLoaderPlugin {
    fn build(&self, app: &mut App) {
        app.init_resource::<PendingConfig>()
            .add_systems(Startup, fetch_viewer_config)
            .add_systems(Update, finish_boot.run_if(in_state(AppView::Booting)));
    }
}

/// Outcome of the config fetch, filled in by the async task
#[derive(Resource, Default)]
pub struct PendingConfig {
    pub base_url: String,
    pub data: Arc<Mutex<Option<String>>>,
    pub error: Arc<Mutex<Option<String>>>,
}

fn fetch_viewer_config(mut pending: ResMut<PendingConfig>) {
    let href = web_sys::window()
        .and_then(|window| window.location().href().ok())
        .unwrap_or_default();
    pending.base_url = base_directory(&href);

    let url = resolve_asset_url(&pending.base_url, CONFIG_FILE_NAME);
    info!("Fetching viewer configuration from {}", url);

    let data = pending.data.clone();
    let error = pending.error.clone();
    wasm_bindgen_futures::spawn_local(async move {
        match fetch_text(&url).await {
            Ok(content) => {
                if let Ok(mut slot) = data.lock() {
                    *slot = Some(content);
                }
            }
            Err(e) => {
                if let Ok(mut slot) = error.lock() {
                    *slot = Some(e);
                }
            }
        }
    });
}

/// Fetch a text resource
async fn fetch_text(url: &str) -> Result<String, String> {
    let window = web_sys::window().ok_or("No window")?;

    let resp = wasm_bindgen_futures::JsFuture::from(window.fetch_with_str(url))
        .await
        .map_err(|e| format!("Fetch failed: {:?}", e))?;

    let resp: web_sys::Response = resp.dyn_into().map_err(|_| "Response cast failed")?;

    if !resp.ok() {
        return Err(format!("HTTP {}: {}", resp.status(), resp.status_text()));
    }

    let text = wasm_bindgen_futures::JsFuture::from(resp.text().map_err(|_| "Failed to get text")?)
        .await
        .map_err(|e| format!("Text extraction failed: {:?}", e))?;

    text.as_string().ok_or_else(|| "Not a string".to_string())
}

/// Install the settings and route to the view named by the fragment
fn finish_boot(
    mut commands: Commands,
    pending: Res<PendingConfig>,
    mut router: ResMut<Router>,
    mut next: ResMut<NextState<AppView>>,
) {
    let content = pending.data.try_lock().ok().and_then(|mut slot| slot.take());
    let failed = pending.error.try_lock().ok().and_then(|mut slot| slot.take());

    let config = match (content, failed) {
        (Some(content), _) => load_config_or_default(Some(&content)),
        (None, Some(reason)) => {
            debug!("No {} ({})", CONFIG_FILE_NAME, reason);
            load_config_or_default(None)
        }
        (None, None) => return,
    };

    commands.insert_resource(Toasts::new(config.ui.toast_secs));
    commands.insert_resource(ViewerSettings::new(config, pending.base_url.clone()));
    router.route(&current_fragment(), &mut next);
}
