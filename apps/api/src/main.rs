mod config;
mod errors;
mod flows;
mod routes;
mod state;
mod storage;
mod submission;
mod wizard;

use anyhow::{ensure, Context, Result};
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::Config;
use crate::routes::build_router;
use crate::state::AppState;
use crate::storage::{KeyValueStore, MemoryStore, RedisStore};
use crate::submission::HttpSubmissionClient;
use crate::wizard::service::WizardService;

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration first (fails fast on missing required env vars)
    let config = Config::from_env()?;

    // Initialize structured logging
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!("{}={}", env!("CARGO_PKG_NAME"), &config.rust_log))
        }))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting Funnel API v{}", env!("CARGO_PKG_VERSION"));

    ensure!(
        flows::storage_keys_are_unique(),
        "Two flows share a storage key: {:?}",
        flows::STORAGE_KEYS
    );

    // Snapshot storage: Redis when configured, process memory otherwise
    let store: Arc<dyn KeyValueStore> = match &config.redis_url {
        Some(url) => Arc::new(RedisStore::connect(url).await?),
        None => {
            info!("REDIS_URL not set, keeping wizard snapshots in memory");
            Arc::new(MemoryStore::new())
        }
    };

    let career_os_client =
        HttpSubmissionClient::new(&config.career_os_submit_url, config.submission_timeout)
            .context("Failed to build Career OS submission client")?;
    let contributor_client =
        HttpSubmissionClient::new(&config.contributor_submit_url, config.submission_timeout)
            .context("Failed to build contributor submission client")?;
    info!(
        "Submission clients initialized (timeout: {}s)",
        config.submission_timeout.as_secs()
    );

    let state = AppState {
        career_os: Arc::new(WizardService::new(
            store.clone(),
            Arc::new(career_os_client),
            &config.storage_namespace,
            config.snapshot_ttl,
        )),
        contributor: Arc::new(WizardService::new(
            store,
            Arc::new(contributor_client),
            &config.storage_namespace,
            config.snapshot_ttl,
        )),
    };

    let app = build_router(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive());

    let addr: SocketAddr = format!("0.0.0.0:{}", config.port).parse()?;
    info!("Listening on {addr}");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
