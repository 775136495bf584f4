//! `pilotwatch-worker` -- background update daemon.
//!
//! Connects to Postgres and ESI, then runs three loops until
//! terminated: the character update scheduler, the market price
//! refresh and the expired-cache purge. All engine tunables are read
//! from `PILOTWATCH_*` variables, documented on [`EngineConfig`].
//!
//! # Environment variables
//!
//! | Variable                   | Required | Default | Description                        |
//! |----------------------------|----------|---------|------------------------------------|
//! | `DATABASE_URL`             | yes      | --      | Postgres connection string         |
//! | `DATABASE_MAX_CONNECTIONS` | no       | `10`    | Pool size                          |
//! | `PILOTWATCH_ACCESS_TOKEN`  | no       | --      | Fallback ESI token; per-character tokens use `PILOTWATCH_TOKEN_<id>` |

mod cache_retention;

use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use pilotwatch_core::section::Section;
use pilotwatch_engine::{CharacterUpdater, EngineConfig, UpdateScheduler};
use pilotwatch_esi::token::EnvTokenProvider;
use pilotwatch_esi::{AccessTokenProvider, ErrorLimiter, EsiClient, PgCache};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

const DEFAULT_MAX_CONNECTIONS: u32 = 10;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "pilotwatch_engine=info,pilotwatch_esi=info,pilotwatch_worker=info".into()
            }),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // --- Configuration ---
    let config = EngineConfig::from_env();
    tracing::info!(
        esi_base_url = %config.esi_base_url,
        poll_interval_secs = config.poll_interval.as_secs(),
        max_concurrent_characters = config.max_concurrent_characters,
        "Loaded engine configuration"
    );

    tracing::info!(
        scopes = Section::all_scopes().join(" "),
        "Access tokens must grant these ESI scopes for full coverage"
    );

    // --- Database ---
    let database_url = std::env::var("DATABASE_URL").context("DATABASE_URL must be set")?;
    let max_connections = std::env::var("DATABASE_MAX_CONNECTIONS")
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(DEFAULT_MAX_CONNECTIONS);

    let pool = pilotwatch_db::create_pool(&database_url, max_connections)
        .await
        .context("Failed to connect to database")?;
    tracing::info!("Database connection pool created");

    pilotwatch_db::health_check(&pool)
        .await
        .context("Database health check failed")?;

    pilotwatch_db::run_migrations(&pool)
        .await
        .context("Failed to run database migrations")?;
    tracing::info!("Database migrations applied");

    // --- ESI clients ---
    // One error limiter shared through Postgres, so every worker on
    // this IP sees the same budget. The reqwest client is shared too;
    // EsiClient is cheap on top of it.
    let limiter = Arc::new(ErrorLimiter::new(
        Arc::new(PgCache::new(pool.clone())),
        config.error_limit_threshold,
        config.window_tolerance_secs,
    ));
    let http = reqwest::Client::builder()
        .user_agent(&config.user_agent)
        .timeout(pilotwatch_esi::client::REQUEST_TIMEOUT)
        .build()
        .context("Failed to build HTTP client")?;
    let esi = EsiClient::with_client(http.clone(), &config.esi_base_url, Arc::clone(&limiter))
        .with_retry_policy(config.retry_policy());
    let price_esi = EsiClient::with_client(http, &config.esi_base_url, limiter)
        .with_retry_policy(config.retry_policy());

    // --- Updater and schedulers ---
    let tokens: Arc<dyn AccessTokenProvider> = Arc::new(EnvTokenProvider);
    let updater = Arc::new(CharacterUpdater::new(
        pool.clone(),
        esi,
        tokens,
        config.clone(),
    ));
    let scheduler = UpdateScheduler::new(pool.clone(), Arc::clone(&updater), &config);

    let cancel = tokio_util::sync::CancellationToken::new();

    let scheduler_cancel = cancel.clone();
    let scheduler_handle = tokio::spawn(async move { scheduler.run(scheduler_cancel).await });

    let prices_handle = tokio::spawn(pilotwatch_engine::prices::run_refresh_loop(
        pool.clone(),
        price_esi,
        config.market_refresh_interval,
        cancel.clone(),
    ));

    let purge_handle = tokio::spawn(cache_retention::run(pool, cancel.clone()));

    tracing::info!("Worker started");

    // --- Shutdown ---
    shutdown_signal().await;
    cancel.cancel();
    let _ = tokio::time::timeout(Duration::from_secs(5), scheduler_handle).await;
    let _ = tokio::time::timeout(Duration::from_secs(5), prices_handle).await;
    let _ = tokio::time::timeout(Duration::from_secs(5), purge_handle).await;
    tracing::info!("Graceful shutdown complete");
    Ok(())
}

/// Wait for a termination signal to initiate graceful shutdown.
///
/// Handles both SIGINT (Ctrl-C) and SIGTERM (on Unix) so the worker
/// shuts down cleanly whether stopped interactively or by a process
/// manager.
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl-C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            tracing::info!("Received SIGINT (Ctrl-C), starting graceful shutdown");
        }
        () = terminate => {
            tracing::info!("Received SIGTERM, starting graceful shutdown");
        }
    }
}
