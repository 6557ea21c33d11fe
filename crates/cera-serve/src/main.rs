//! cera-serve - hosts the built AR viewer bundle for local testing
//!
//! Mounts the bundle under a configurable sub-path so deployments behind a
//! path prefix can be reproduced.

mod config;
mod server;

use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::FmtSubscriber;

#[derive(Parser, Debug)]
#[command(name = "cera-serve")]
#[command(about = "Static file server for the CERA AR viewer")]
#[command(version)]
struct Args {
    /// Path to configuration file
    #[arg(short, long, default_value = "cera-serve.toml")]
    config: PathBuf,

    /// Bind address for web server
    #[arg(short, long)]
    bind: Option<String>,

    /// URL prefix to mount the bundle under (e.g. /cera-ar/)
    #[arg(long)]
    base_path: Option<String>,

    /// Directory holding the built bundle
    #[arg(short, long)]
    root: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long, default_value = "info")]
    log_level: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let level = cera_core::config::parse_level(&args.log_level);

    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(true)
        .finish();

    tracing::subscriber::set_global_default(subscriber)?;

    info!("cera-serve v{}", env!("CARGO_PKG_VERSION"));

    let mut config = config::load_config(&args.config)?;

    if let Some(bind) = args.bind {
        config.server.bind = bind;
    }
    if let Some(base_path) = args.base_path {
        config.server.base_path = base_path;
    }
    if let Some(root) = args.root {
        config.server.root = root;
    }

    let base_path = config::normalize_base_path(&config.server.base_path);
    info!(
        root = %config.server.root.display(),
        base = %base_path,
        "Configuration loaded"
    );

    let state = server::ServeState::load(config.server.root.clone(), base_path)?;
    server::run(Arc::new(state), &config.server.bind).await
}
