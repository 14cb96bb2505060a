//! Server module: the keeper HTTP service.
//!
//! This module provides:
//! - SQLite store and repositories (`db`, `repository`)
//! - The secret store service and user accounts (`service`, `users`)
//! - Session tokens and the auth gate (`tokens`, `auth`)
//! - The axum router and handlers (`http`)
//! - Startup and graceful shutdown (`run`, `serve`)

pub mod auth;
pub mod db;
pub mod error;
pub mod http;
pub mod repository;
pub mod service;
pub mod state;
pub mod tokens;
pub mod users;

use std::future::Future;
use std::io;
use std::time::Duration;

use tokio::net::TcpListener;
use tokio::sync::oneshot;
use tokio::task::JoinError;
use tracing::{info, warn};

use crate::config::ServerSettings;
use crate::errors::{KeeperError, Result};

pub use db::Database;
pub use error::{AppError, AppErrorKind, StoreError};
pub use state::AppState;
pub use tokens::TokenAuthority;

/// Open the store, generate the signing key and serve until Ctrl-C or
/// SIGTERM.
pub async fn run(settings: ServerSettings) -> Result<()> {
    let db = Database::open(&settings.database)?;
    let tokens = TokenAuthority::generate(settings.token_ttl())
        .map_err(|e| KeeperError::Config(e.to_string()))?;
    let state =
        AppState::new(db, tokens, settings.truncation).with_body_limit(settings.max_body_bytes);

    let listener = TcpListener::bind(settings.address.as_str())
        .await
        .map_err(|e| {
            KeeperError::Config(format!("failed to bind {}: {e}", settings.address))
        })?;
    info!(address = %listener.local_addr()?, database = %settings.database, "keeper server listening");

    serve(listener, state, shutdown_signal(), settings.shutdown_grace()).await
}

/// Serve on `listener` until `shutdown` resolves, then give in-flight
/// requests `grace` to finish.
///
/// Running past the grace period is `ShutdownTimeout`.
pub async fn serve<F>(
    listener: TcpListener,
    state: AppState,
    shutdown: F,
    grace: Duration,
) -> Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    let (signalled_tx, signalled_rx) = oneshot::channel::<()>();
    let graceful = async move {
        shutdown.await;
        let _ = signalled_tx.send(());
    };

    let router = http::router(state);
    let mut server = tokio::spawn(async move {
        axum::serve(listener, router)
            .with_graceful_shutdown(graceful)
            .await
    });

    tokio::select! {
        joined = &mut server => return finish(joined),
        Ok(()) = signalled_rx => {}
    }

    info!(grace_secs = grace.as_secs_f64(), "shutting down");
    match tokio::time::timeout(grace, &mut server).await {
        Ok(joined) => finish(joined),
        Err(_) => {
            server.abort();
            warn!(grace_secs = grace.as_secs_f64(), "in-flight requests outlived the grace period");
            Err(KeeperError::ShutdownTimeout(grace))
        }
    }
}

fn finish(joined: std::result::Result<io::Result<()>, JoinError>) -> Result<()> {
    match joined {
        Ok(result) => Ok(result?),
        Err(e) => Err(KeeperError::Io(io::Error::other(e))),
    }
}

pub async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            warn!(?err, "failed to install ctrl-c handler");
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};
        match signal(SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(err) => warn!(?err, "failed to install sigterm handler"),
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
