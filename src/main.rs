use anyhow::{Context, Result};
use clap::Parser;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use newswire::api::{create_router, AppState};
use newswire::config::Config;
use newswire::publish::Publisher;
use newswire::store::{FeedInfo, FeedStore, FileStorage};

#[derive(Parser, Debug)]
#[command(name = "newswire", about = "Self-hosted RSS feed service")]
struct Args {
    /// Path to the TOML config file
    #[arg(long, default_value = "newswire.toml")]
    config: PathBuf,

    /// Override the data directory
    #[arg(long)]
    data_dir: Option<PathBuf>,

    /// Override the listen port
    #[arg(long)]
    port: Option<u16>,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let args = Args::parse();

    let mut config = Config::load(&args.config)
        .with_context(|| format!("Failed to load config from {}", args.config.display()))?
        .apply_env();
    if let Some(data_dir) = args.data_dir {
        config.data_dir = data_dir;
    }
    if let Some(port) = args.port {
        config.port = port;
    }

    // A bad data-dir override must not keep the feed down; fall back to the
    // default location and keep serving.
    let default_dir = Config::default().data_dir;
    let storage = FileStorage::open_or_default(&config.data_dir, &default_dir)
        .context("Failed to open data directory")?;
    tracing::info!(path = %storage.data_file().display(), "Using feed data file");

    let store = Arc::new(FeedStore::new(
        Box::new(storage),
        config.reject_duplicate_urls,
    ));
    store
        .initialize(seed_feed_info(&config))
        .await
        .context("Failed to initialize feed document")?;

    std::fs::create_dir_all(&config.public_dir).with_context(|| {
        format!(
            "Failed to create public directory '{}'",
            config.public_dir.display()
        )
    })?;

    let publisher = Arc::new(Publisher::new(
        Arc::clone(&store),
        config.public_dir.clone(),
        config.public_url(),
    ));
    if let Err(e) = publisher.regenerate().await {
        tracing::warn!(error = %e, "Initial feed generation failed, continuing");
    }

    let state = AppState::new(store, publisher);
    let app = create_router(state, &config.public_dir);

    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {addr}"))?;

    tracing::info!(port = config.port, "Server running");
    tracing::info!(url = %format!("{}/feed.xml", config.public_url()), "RSS feed");

    axum::serve(listener, app).await?;
    Ok(())
}

/// Feed metadata used when seeding a brand-new document.
fn seed_feed_info(config: &Config) -> FeedInfo {
    let public_url = config.public_url();
    FeedInfo {
        title: Some("RSS Feed".into()),
        description: Some("RSS Feed Description".into()),
        feed_url: Some(format!("{public_url}/feed.xml")),
        site_url: Some(public_url),
        language: Some("en".into()),
    }
}
