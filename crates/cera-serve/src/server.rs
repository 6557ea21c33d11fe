//! Static file server for the viewer bundle

use anyhow::Result;
use axum::{
    extract::{Request, State},
    http::Uri,
    middleware::{self, Next},
    response::{IntoResponse, Redirect, Response},
    routing::get,
    Json, Router,
};
use cera_core::config::{load_config_file, CONFIG_FILE_NAME};
use cera_core::{resolve_asset_url, ViewerConfig};
use serde::Serialize;
use std::path::PathBuf;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::services::ServeDir;
use tracing::{info, warn};

/// What the server hosts and where
#[derive(Debug, Clone)]
pub struct ServeState {
    pub root: PathBuf,
    /// Normalized mount prefix (empty for the site root)
    pub base_path: String,
    /// The bundle's own `viewer.toml`, used to report its assets
    pub viewer: ViewerConfig,
}

impl ServeState {
    /// Check the bundle directory and read its viewer configuration
    pub fn load(root: PathBuf, base_path: String) -> Result<Self> {
        if !root.is_dir() {
            anyhow::bail!("Bundle directory not found: {}", root.display());
        }

        let config_path = root.join(CONFIG_FILE_NAME);
        let viewer = if config_path.exists() {
            load_config_file(&config_path).unwrap_or_else(|e| {
                warn!(error = %e, "Bundle configuration is invalid, the viewer will use defaults");
                ViewerConfig::default()
            })
        } else {
            info!(path = %config_path.display(), "No bundle configuration, the viewer will use defaults");
            ViewerConfig::default()
        };

        Ok(Self {
            root,
            base_path,
            viewer,
        })
    }

    /// URL prefix as seen by the browser, always ending in `/`
    pub fn public_base(&self) -> String {
        format!("{}/", self.base_path)
    }
}

#[derive(Debug, Serialize)]
struct HealthResponse {
    status: &'static str,
    version: &'static str,
    base_path: String,
    assets: Vec<AssetEntry>,
}

#[derive(Debug, Serialize)]
struct AssetEntry {
    kind: &'static str,
    url: String,
    /// `None` for assets hosted elsewhere
    present: Option<bool>,
}

async fn health(State(state): State<Arc<ServeState>>) -> Json<HealthResponse> {
    let base = state.public_base();
    let assets = [
        ("config", CONFIG_FILE_NAME),
        ("model", state.viewer.assets.model.as_str()),
        ("environment", state.viewer.assets.environment.as_str()),
    ]
    .into_iter()
    .map(|(kind, path)| {
        let url = resolve_asset_url(&base, path);
        let present = url
            .strip_prefix(base.as_str())
            .map(|relative| state.root.join(relative).is_file());
        AssetEntry { kind, url, present }
    })
    .collect();

    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
        base_path: base,
        assets,
    })
}

/// `/base` redirects to `/base/` so relative asset URLs resolve inside the mount
async fn redirect_bare_base(
    State(state): State<Arc<ServeState>>,
    request: Request,
    next: Next,
) -> Response {
    let original = request
        .extensions()
        .get::<axum::extract::OriginalUri>()
        .map(|original| original.0.clone())
        .unwrap_or_else(|| request.uri().clone());

    if is_bare_base(&original, &state.base_path) {
        let mut location = state.public_base();
        if let Some(query) = original.query() {
            location.push('?');
            location.push_str(query);
        }
        return Redirect::permanent(&location).into_response();
    }
    next.run(request).await
}

fn is_bare_base(uri: &Uri, base_path: &str) -> bool {
    !base_path.is_empty() && uri.path() == base_path
}

/// Build the application router
pub fn build_router(state: Arc<ServeState>) -> Router {
    let files = ServeDir::new(&state.root);

    let router = Router::new().route("/health", get(health));
    let router = if state.base_path.is_empty() {
        router.fallback_service(files)
    } else {
        router.nest_service(&state.base_path, files)
    };

    router
        .layer(middleware::from_fn_with_state(state.clone(), redirect_bare_base))
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .with_state(state)
}

/// Run the HTTP server
pub async fn run(state: Arc<ServeState>, bind: &str) -> Result<()> {
    let base = state.public_base();
    let root = state.root.display().to_string();
    let app = build_router(state);

    let listener = tokio::net::TcpListener::bind(bind).await?;
    info!(address = %bind, base = %base, root = %root, "Starting web server");
    info!("Viewer available at http://{}{}", bind, base);
    axum::serve(listener, app).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::{header, Request as HttpRequest, StatusCode};
    use tempfile::TempDir;
    use tower::ServiceExt;

    fn bundle() -> TempDir {
        let temp_dir = TempDir::new().unwrap();
        std::fs::write(temp_dir.path().join("index.html"), "<html>viewer</html>").unwrap();
        std::fs::write(
            temp_dir.path().join(CONFIG_FILE_NAME),
            "[assets]\nmodel = \"models/chair.glb\"\nenvironment = \"https://cdn.example.com/studio.hdr\"\n",
        )
        .unwrap();
        std::fs::create_dir(temp_dir.path().join("models")).unwrap();
        std::fs::write(temp_dir.path().join("models/chair.glb"), b"glTF").unwrap();
        temp_dir
    }

    fn router(temp_dir: &TempDir, base: &str) -> Router {
        let state = ServeState::load(temp_dir.path().to_path_buf(), base.to_string()).unwrap();
        build_router(Arc::new(state))
    }

    async fn fetch(router: Router, uri: &str) -> Response {
        router
            .oneshot(HttpRequest::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap()
    }

    async fn body_text(response: Response) -> String {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    #[tokio::test]
    async fn test_serves_bundle_under_base_path() {
        let temp_dir = bundle();

        let response = fetch(router(&temp_dir, "/cera-ar"), "/cera-ar/models/chair.glb").await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_text(response).await, "glTF");

        let response = fetch(router(&temp_dir, "/cera-ar"), "/cera-ar/").await;
        assert_eq!(response.status(), StatusCode::OK);
        assert!(body_text(response).await.contains("viewer"));
    }

    #[tokio::test]
    async fn test_paths_outside_base_are_not_found() {
        let temp_dir = bundle();
        let response = fetch(router(&temp_dir, "/cera-ar"), "/models/chair.glb").await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_bare_base_redirects_to_directory() {
        let temp_dir = bundle();
        let response = fetch(router(&temp_dir, "/cera-ar"), "/cera-ar?log=debug").await;
        assert_eq!(response.status(), StatusCode::PERMANENT_REDIRECT);
        assert_eq!(
            response.headers().get(header::LOCATION).unwrap(),
            "/cera-ar/?log=debug"
        );
    }

    #[tokio::test]
    async fn test_serves_from_site_root() {
        let temp_dir = bundle();
        let response = fetch(router(&temp_dir, ""), "/models/chair.glb").await;
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_health_reports_bundle_assets() {
        let temp_dir = bundle();
        let response = fetch(router(&temp_dir, "/cera-ar"), "/health").await;
        assert_eq!(response.status(), StatusCode::OK);

        let json: serde_json::Value = serde_json::from_str(&body_text(response).await).unwrap();
        assert_eq!(json["status"], "ok");
        assert_eq!(json["base_path"], "/cera-ar/");

        let assets = json["assets"].as_array().unwrap();
        assert_eq!(assets[0]["kind"], "config");
        assert_eq!(assets[0]["present"], true);
        assert_eq!(assets[1]["url"], "/cera-ar/models/chair.glb");
        assert_eq!(assets[1]["present"], true);
        assert_eq!(assets[2]["url"], "https://cdn.example.com/studio.hdr");
        assert!(assets[2]["present"].is_null());
    }

    #[test]
    fn test_missing_bundle_directory_is_an_error() {
        let temp_dir = TempDir::new().unwrap();
        let missing = temp_dir.path().join("dist");
        assert!(ServeState::load(missing, String::new()).is_err());
    }

    #[test]
    fn test_invalid_bundle_config_falls_back_to_defaults() {
        let temp_dir = TempDir::new().unwrap();
        std::fs::write(temp_dir.path().join(CONFIG_FILE_NAME), "[assets\n").unwrap();
        let state = ServeState::load(temp_dir.path().to_path_buf(), String::new()).unwrap();
        assert_eq!(state.viewer, ViewerConfig::default());
    }
}
