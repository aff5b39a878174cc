//! moodlens-pa service binary

use anyhow::Context;
use clap::Parser;
use moodlens_common::config::{
    default_config_path, load_toml_config, prepare_root_folder, resolve_root_folder,
};
use moodlens_common::db::init_database_pool;
use moodlens_common::events::EventBus;
use moodlens_common::Platform;
use moodlens_pa::config::{resolve_oauth_config, resolve_service_config};
use moodlens_pa::platform::PlatformEndpoints;
use moodlens_pa::{build_router, AppState, PlatformRuntime};
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "moodlens-pa")]
#[command(about = "MoodLens playlist analysis service")]
struct Args {
    /// HTTP listen port
    #[arg(short, long, env = "MOODLENS_PORT", default_value_t = 5701)]
    port: u16,

    /// Root folder for the database and durable state
    #[arg(long, env = "MOODLENS_ROOT_FOLDER")]
    root_folder: Option<String>,

    /// Path to the TOML configuration file
    #[arg(short, long, env = "MOODLENS_CONFIG")]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let config_path = args.config.clone().unwrap_or_else(default_config_path);
    let toml_config =
        load_toml_config(&config_path).context("Failed to load TOML configuration")?;

    // RUST_LOG wins over the config file's filter
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        toml_config
            .logging
            .filter
            .as_deref()
            .map(EnvFilter::new)
            .unwrap_or_else(|| EnvFilter::new("info"))
    });
    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        config = %config_path.display(),
        "Starting moodlens-pa"
    );

    let root_folder = resolve_root_folder(
        args.root_folder.as_deref(),
        "MOODLENS_ROOT_FOLDER",
        &toml_config,
    );
    let db_path = prepare_root_folder(&root_folder).context("Failed to prepare root folder")?;
    tracing::info!(root_folder = %root_folder.display(), "Root folder resolved");

    let db = init_database_pool(&db_path)
        .await
        .context("Database initialization failed")?;

    let service = resolve_service_config(&db, &toml_config).await?;
    let http = reqwest::Client::builder()
        .timeout(Duration::from_secs(30))
        .build()
        .context("Failed to build HTTP client")?;
    let events = EventBus::new(256);

    // A platform missing its OAuth registration is skipped, not fatal; the
    // API reports it as not configured.
    let mut platforms = HashMap::new();
    for platform in Platform::ALL {
        match resolve_oauth_config(&db, &toml_config, platform, args.port).await {
            Ok(oauth) => {
                let runtime = PlatformRuntime::new(
                    platform,
                    db.clone(),
                    events.clone(),
                    PlatformEndpoints::for_platform(platform),
                    oauth,
                    &service,
                    http.clone(),
                );
                platforms.insert(platform, runtime);
            }
            Err(e) => {
                tracing::warn!(platform = %platform, error = %e, "Platform not configured");
            }
        }
    }

    let state = AppState {
        db: db.clone(),
        events,
        platforms,
        records: Arc::new(moodlens_pa::records::SqliteRecordStore::new(db)),
        frontend_url: service.frontend_url.clone(),
        started_at: Instant::now(),
    };

    let router = build_router(state);
    let addr = format!("0.0.0.0:{}", args.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    tracing::info!(addr = %addr, "moodlens-pa listening");

    axum::serve(listener, router)
        .await
        .context("Server error")?;

    Ok(())
}
