//! Loyalty API server.
//!
//! Serves the front-desk loyalty API on `HOST:PORT` (default `0.0.0.0:3000`).
//!
//! # Lifecycle
//!
//! 1. Configuration is read from the environment (`.env` honoured); any
//!    problem is logged and the process exits non-zero before binding.
//! 2. Sentry (optional) and tracing are initialized.
//! 3. The `PostgreSQL` pool is created lazily, so the server starts even
//!    when the database is down and `/health` reports the outage.
//! 4. On SIGINT, SIGTERM or a panic the server stops accepting, drains
//!    in-flight requests and closes the pool. If draining takes longer than
//!    `SHUTDOWN_TIMEOUT` the process exits with a failure status.

#![cfg_attr(not(test), forbid(unsafe_code))]

use std::net::SocketAddr;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use sentry::integrations::tracing as sentry_tracing;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

use loyalty_api::config::{ApiConfig, Environment};
use loyalty_api::db::{self, GuestStore, PgGuestStore};
use loyalty_api::state::{AppState, StateError};

/// Why the server is stopping.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ShutdownReason {
    CtrlC,
    Terminate,
    Panic,
}

type ShutdownSender = watch::Sender<Option<ShutdownReason>>;

/// Fatal errors after configuration has loaded.
#[derive(Debug, thiserror::Error)]
enum ServeError {
    #[error("invalid database url: {0}")]
    Pool(#[from] sqlx::Error),
    #[error("failed to build application state: {0}")]
    State(#[from] StateError),
    #[error("server error: {0}")]
    Io(#[from] std::io::Error),
    #[error("server task failed: {0}")]
    Join(#[from] tokio::task::JoinError),
    #[error("in-flight requests did not finish within {0:?}")]
    ShutdownTimeout(Duration),
}

/// Initialize Sentry error tracking and return guard that must be kept alive.
fn init_sentry(config: &ApiConfig) -> Option<sentry::ClientInitGuard> {
    let dsn = config.sentry_dsn.as_ref()?;

    let environment = match config.environment {
        Environment::Development => "development",
        Environment::Production => "production",
    };

    let guard = sentry::init((
        dsn.as_str(),
        sentry::ClientOptions {
            release: sentry::release_name!(),
            environment: Some(environment.into()),
            attach_stacktrace: true,
            ..Default::default()
        },
    ));

    tracing::info!("Sentry initialized");
    Some(guard)
}

/// Filter tracing events to Sentry event types.
fn sentry_event_filter(metadata: &tracing::Metadata<'_>) -> sentry_tracing::EventFilter {
    match *metadata.level() {
        tracing::Level::ERROR | tracing::Level::WARN => sentry_tracing::EventFilter::Event,
        tracing::Level::INFO | tracing::Level::DEBUG => sentry_tracing::EventFilter::Breadcrumb,
        _ => sentry_tracing::EventFilter::Ignore,
    }
}

/// `RUST_LOG` wins; otherwise `LOG_LEVEL` applies to this crate and `tower_http`.
fn init_tracing(config: &ApiConfig) {
    let level = &config.log_level;
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| format!("loyalty_api={level},tower_http={level}").into());

    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer())
        .with(sentry_tracing::layer().event_filter(sentry_event_filter))
        .init();
}

#[tokio::main]
async fn main() -> ExitCode {
    let config = match ApiConfig::from_env() {
        Ok(config) => config,
        Err(err) => {
            tracing_subscriber::fmt().init();
            tracing::error!(error = %err, "Invalid configuration");
            return ExitCode::FAILURE;
        }
    };

    let _sentry_guard = init_sentry(&config);
    init_tracing(&config);

    match serve(config).await {
        Ok(()) => {
            tracing::info!("Server stopped");
            ExitCode::SUCCESS
        }
        Err(err) => {
            tracing::error!(error = %err, "Server failed");
            ExitCode::FAILURE
        }
    }
}

async fn serve(config: ApiConfig) -> Result<(), ServeError> {
    let pool = db::create_pool(&config.database_url, &config.pool, config.environment)?;
    let store = Arc::new(PgGuestStore::new(pool, config.pool.statement_timeout));
    let dyn_store: Arc<dyn GuestStore> = store.clone();

    let addr = config.socket_addr();
    let shutdown_timeout = config.shutdown_timeout;

    if config.auth.is_disabled() {
        tracing::warn!("Password gate is disabled");
    }
    let origins = config.allowed_origins();
    tracing::info!(origins = %origins.join(", "), "Allowed origins");

    let state = AppState::new(config, dyn_store)?;
    let app = loyalty_api::router(state)
        // Sentry layers (outermost for full request coverage)
        .layer(sentry_tower::NewSentryLayer::new_from_top())
        .layer(sentry_tower::SentryHttpLayer::new().enable_transaction());

    let (shutdown_tx, shutdown_rx) = watch::channel(None);
    install_panic_hook(shutdown_tx.clone());
    tokio::spawn(forward_signals(shutdown_tx));

    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!("loyalty-api listening on {}", addr);

    let mut drain_rx = shutdown_rx.clone();
    let mut server = tokio::spawn(async move {
        axum::serve(
            listener,
            app.into_make_service_with_connect_info::<SocketAddr>(),
        )
        .with_graceful_shutdown(async move {
            let _ = drain_rx.wait_for(Option::is_some).await;
        })
        .await
    });

    let mut trigger_rx = shutdown_rx;
    tokio::select! {
        joined = &mut server => {
            store.close().await;
            joined??;
            return Ok(());
        }
        _ = trigger_rx.wait_for(Option::is_some) => {}
    }

    let reason = *trigger_rx.borrow();
    tracing::info!(?reason, "Shutting down, draining in-flight requests");

    drain(server, shutdown_timeout, store.close()).await
}

/// Wait up to `deadline` for the server task, then run `close`.
///
/// Past the deadline the server is aborted and `close` is dropped unpolled:
/// closing the pool would wait for connections still held by in-flight
/// requests.
async fn drain<C>(
    mut server: JoinHandle<std::io::Result<()>>,
    deadline: Duration,
    close: C,
) -> Result<(), ServeError>
where
    C: Future<Output = ()>,
{
    let Ok(joined) = tokio::time::timeout(deadline, &mut server).await else {
        server.abort();
        tracing::warn!(?deadline, "Shutdown deadline passed, leaving database pool open");
        return Err(ServeError::ShutdownTimeout(deadline));
    };

    close.await;
    tracing::info!("Database pool closed");
    joined??;
    Ok(())
}

/// Record a shutdown reason unless one is already set.
fn trigger_shutdown(tx: &ShutdownSender, reason: ShutdownReason) {
    tx.send_if_modified(|current| {
        if current.is_some() {
            return false;
        }
        *current = Some(reason);
        true
    });
}

/// Log panics and turn them into a graceful shutdown.
fn install_panic_hook(tx: ShutdownSender) {
    let previous = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |info| {
        tracing::error!(panic = %info, "Panic, shutting down");
        trigger_shutdown(&tx, ShutdownReason::Panic);
        previous(info);
    }));
}

/// Wait for Ctrl+C or SIGTERM and trigger shutdown.
async fn forward_signals(tx: ShutdownSender) {
    let ctrl_c = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %err, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(err) => {
                tracing::error!(error = %err, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    let reason = tokio::select! {
        () = ctrl_c => ShutdownReason::CtrlC,
        () = terminate => ShutdownReason::Terminate,
    };

    tracing::info!(?reason, "Shutdown signal received");
    trigger_shutdown(&tx, reason);
}
