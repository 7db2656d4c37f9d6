mod app_state;
mod error;
mod github;
mod routes;
mod scheduler;
mod utils;

use axum::routing::get;
use axum::{routing::post, Router};
use dotenvy::dotenv;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::signal;

use crate::app_state::build_app_state;
use crate::routes::webhook::webhook_handler;

#[tokio::main]
async fn main() {
    dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "runner_provisioner=info".to_string()),
        )
        .init();

    let app_state = build_app_state().expect("Failed to build AppState");
    let port = app_state.port;

    let app = Router::new()
        .route("/webhooks", post(webhook_handler))
        .route("/", get(|| async { "Hola Provisioner!!!" }))
        .with_state(Arc::new(app_state));

    tracing::info!("Listening on http://0.0.0.0:{port}");

    let listener = TcpListener::bind(("0.0.0.0", port)).await.unwrap();

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .unwrap();
}

async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("Signal received, starting graceful shutdown");
}
