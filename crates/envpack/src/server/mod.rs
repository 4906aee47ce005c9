//! HTTP façade over the release manager

pub mod auth;
pub mod handlers;

use std::future::{Future, IntoFuture};
use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use axum::http::{Method, header};
use axum::middleware;
use axum::routing::{get, post};
use envpack_kube::{ApiKeys, ReleaseManager};
use tokio::net::TcpListener;
use tokio::sync::watch;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::error::{CliError, Result};

/// Shared state for every handler
#[derive(Clone)]
pub struct AppState {
    pub manager: Arc<ReleaseManager>,
}

impl AppState {
    pub fn new(manager: ReleaseManager) -> Self {
        Self {
            manager: Arc::new(manager),
        }
    }
}

/// Build the router with authentication, CORS and request tracing
pub fn router(state: AppState, keys: ApiKeys) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST])
        .allow_headers([header::ACCEPT, header::CONTENT_TYPE]);

    Router::new()
        .route("/create-env", post(handlers::create_env))
        .route("/update-env/{name}", post(handlers::update_env))
        .route("/delete-env/{name}", post(handlers::delete_env))
        .route("/list", get(handlers::list_envs))
        .route("/health-check", get(handlers::health_check))
        .with_state(state)
        .layer(middleware::from_fn_with_state(
            Arc::new(keys),
            auth::require_api_key,
        ))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
}

/// Serve `app` until `shutdown` resolves, then drain in-flight requests
///
/// Requests still running after `drain` are abandoned and reported as an error.
pub async fn serve(
    listener: TcpListener,
    app: Router,
    shutdown: impl Future<Output = ()> + Send + 'static,
    drain: Duration,
) -> Result<()> {
    let (stop_tx, mut stop_rx) = watch::channel(false);
    let server = axum::serve(listener, app).with_graceful_shutdown(async move {
        let _ = stop_rx.changed().await;
    });
    let mut server = tokio::spawn(server.into_future());

    tokio::select! {
        joined = &mut server => return flatten(joined),
        _ = shutdown => {}
    }

    tracing::info!(drain_secs = drain.as_secs(), "shutdown signal received, draining");
    let _ = stop_tx.send(true);

    match tokio::time::timeout(drain, &mut server).await {
        Ok(joined) => {
            tracing::info!("server stopped");
            flatten(joined)
        }
        Err(_) => {
            server.abort();
            tracing::warn!("drain deadline exceeded, abandoning in-flight requests");
            Err(CliError::server(format!(
                "requests still in flight after {}s",
                drain.as_secs()
            )))
        }
    }
}

fn flatten(
    joined: std::result::Result<std::io::Result<()>, tokio::task::JoinError>,
) -> Result<()> {
    match joined {
        Ok(result) => Ok(result?),
        Err(e) => Err(CliError::server(e.to_string())),
    }
}

/// Resolves on Ctrl-C or SIGTERM
pub async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::warn!(error = %e, "failed to listen for Ctrl-C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{SignalKind, signal};
        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                tracing::warn!(error = %e, "failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }
}
