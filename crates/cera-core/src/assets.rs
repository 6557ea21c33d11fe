//! Asset path resolution and load bookkeeping
//!
//! Paths are resolved against the directory of the page that loaded the
//! viewer, so a deployment under a sub-path (`/shop/cera/`) still finds its
//! files. The model and the environment load independently.

use std::fmt;

use crate::error::ViewerError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AssetKind {
    Model,
    Environment,
}

impl fmt::Display for AssetKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            AssetKind::Model => "3D model",
            AssetKind::Environment => "environment lighting",
        })
    }
}

/// Directory part of a document URL, always ending in `/`.
///
/// Query strings and fragments are dropped.
pub fn base_directory(document_url: &str) -> String {
    let without_fragment = document_url.split('#').next().unwrap_or_default();
    let without_query = without_fragment.split('?').next().unwrap_or_default();

    let path_start = without_query
        .find("://")
        .map(|scheme_end| {
            without_query[scheme_end + 3..]
                .find('/')
                .map(|i| scheme_end + 3 + i)
                .unwrap_or(without_query.len())
        })
        .unwrap_or(0);

    match without_query[path_start..].rfind('/') {
        Some(i) => without_query[..path_start + i + 1].to_string(),
        None => format!("{}/", without_query),
    }
}

/// Resolve an asset path against a base directory.
///
/// Absolute URLs pass through. A leading `/` is treated as relative to the
/// base so that root-absolute paths survive sub-path hosting.
pub fn resolve_asset_url(base: &str, path: &str) -> String {
    if path.starts_with("http://") || path.starts_with("https://") || path.starts_with("data:") {
        return path.to_string();
    }
    let path = path.trim_start_matches("./").trim_start_matches('/');
    if base.is_empty() {
        return path.to_string();
    }
    if base.ends_with('/') {
        format!("{}{}", base, path)
    } else {
        format!("{}/{}", base, path)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum AssetStatus {
    #[default]
    Pending,
    Loaded,
    Failed(String),
}

/// Tracks the model and environment loads of one view
#[derive(Debug, Clone, Default)]
pub struct AssetLoadTracker {
    model: AssetStatus,
    environment: AssetStatus,
}

impl AssetLoadTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn status(&self, kind: AssetKind) -> &AssetStatus {
        match kind {
            AssetKind::Model => &self.model,
            AssetKind::Environment => &self.environment,
        }
    }

    fn slot(&mut self, kind: AssetKind) -> &mut AssetStatus {
        match kind {
            AssetKind::Model => &mut self.model,
            AssetKind::Environment => &mut self.environment,
        }
    }

    /// Record success. Returns false if the asset was already settled.
    pub fn mark_loaded(&mut self, kind: AssetKind) -> bool {
        let slot = self.slot(kind);
        if *slot != AssetStatus::Pending {
            return false;
        }
        *slot = AssetStatus::Loaded;
        true
    }

    /// Record failure. Returns the error to report exactly once.
    pub fn mark_failed(&mut self, kind: AssetKind, path: &str, reason: impl Into<String>) -> Option<ViewerError> {
        let slot = self.slot(kind);
        if *slot != AssetStatus::Pending {
            return None;
        }
        let reason = reason.into();
        *slot = AssetStatus::Failed(reason.clone());
        Some(ViewerError::AssetLoad {
            kind,
            path: path.to_string(),
            reason,
        })
    }

    pub fn model_ready(&self) -> bool {
        self.model == AssetStatus::Loaded
    }
}
