//! CERA Viewer - Web AR viewer for the CERA chair
//!
//! The landing view shows the chair on an orbit camera; `#ar` opens an
//! immersive WebXR session where the chair is placed on a detected surface.
//! Both views share the pose buttons that crossfade between the chair and
//! stretch poses.

mod app;
mod ar;
mod config_loader;
mod router;
mod ui;
mod xr;

use wasm_bindgen::prelude::*;

/// Log level from the `?log=` query parameter, INFO otherwise
fn requested_log_level() -> tracing::Level {
    web_sys::window()
        .and_then(|window| window.location().search().ok())
        .and_then(|search| web_sys::UrlSearchParams::new_with_str(&search).ok())
        .and_then(|params| params.get("log"))
        .map(|level| cera_core::config::parse_level(&level))
        .unwrap_or(tracing::Level::INFO)
}

/// WASM entry point
#[wasm_bindgen(start)]
pub fn main() {
    console_error_panic_hook::set_once();

    tracing_wasm::set_as_global_default_with_config(
        tracing_wasm::WASMLayerConfigBuilder::new()
            .set_max_level(requested_log_level())
            .build(),
    );

    app::run();
}
