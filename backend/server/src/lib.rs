//! Answer server for questions about course tracking events.
//!
//! A browser asks a question through a URL, the server answers it from the MySQL tracking-event
//! tables and sends back a small HTML page.
//!
//! Ex. URL: `http://localhost:8000/question?qID=NumStudents&className=CS144`
//!
//!
//!
//! # Endpoints
//! - `GET /`: form page listing every question
//! - `GET /question?qID=<kind>&...`: answer page, or 400 with a plain-text reason
//! - `GET /invalidateCache`: forget every cached answer, 204
//! - Anything else: 400 `Server only answers questions.`
//!
//! `HEAD` is answered on the same routes without a body.
//!
//!
//!
//! # Caching
//! - Each answer is cached per question kind and parameter for the life of the process
//! - Nothing expires, `/invalidateCache` is the only way to refresh
//! - Only intended for low-traffic internal use, memory grows with distinct questions asked
//!
//!
//!
//! # Setup
//!
//! Environment.
//! ```sh
//! ANSWER_PORT=8000
//! MYSQL_HOST=localhost
//! MYSQL_PORT=3306
//! MYSQL_USER=root
//! MYSQL_DB=Edx
//! ```
//!
//! Password is read from `/run/secrets/MYSQL_PASSWORD`, or `MYSQL_PASSWORD` if no secret is mounted.
//!
//! Run with logs.
//! ```sh
//! RUST_LOG=answer_server=debug cargo run -p answer
//! ```
//!
//! Ask every question against a running server.
//! ```sh
//! cargo run -p tester
//! ```
use std::{sync::Arc, time::Duration};

use axum::{
    Router,
    http::{Method, header::CONTENT_TYPE},
    routing::get,
};

use signal::{
    ctrl_c,
    unix::{SignalKind, signal},
};
use tokio::{net::TcpListener, signal};
use tower_http::cors::CorsLayer;
use tracing::info;
use tracing_subscriber::{EnvFilter, fmt};

pub mod cache;
pub mod config;
pub mod database;
pub mod error;
pub mod questions;
pub mod render;
pub mod routes;
pub mod state;
pub mod utils;

use config::Config;
use routes::{
    invalidate_cache_handler, question_handler, question_page_handler, unknown_path_handler,
};
use state::State;

pub async fn start_server() -> anyhow::Result<()> {
    fmt().with_env_filter(EnvFilter::from_default_env()).init();

    info!("Loading configuration...");
    let config = Config::load()?;

    info!("Initializing state...");
    let state = State::new(config);

    info!("Starting server...");

    let address = format!("0.0.0.0:{}", state.config.port);
    info!("Binding to {address}");

    let listener = TcpListener::bind(&address).await?;
    info!("Server running on {address}");

    axum::serve(listener, app(state.clone()))
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server shutting down...");
    state.executor.close().await;
    info!("Server stopped on {address}");

    Ok(())
}

pub fn app(state: Arc<State>) -> Router {
    let cors = CorsLayer::new()
        .allow_methods([Method::GET, Method::HEAD, Method::OPTIONS])
        .allow_headers([CONTENT_TYPE])
        .max_age(Duration::from_secs(60 * 60));

    Router::new()
        .route("/", get(question_page_handler))
        .route("/question", get(question_handler))
        .route("/invalidateCache", get(invalidate_cache_handler))
        .fallback(unknown_path_handler)
        .layer(cors)
        .with_state(state)
}

async fn shutdown_signal() {
    let ctrl_c = async {
        ctrl_c().await.expect("Failed to install Ctrl+C handler");

        info!("Received Ctrl+C, shutting down");
    };

    #[cfg(unix)]
    let terminate = async {
        signal(SignalKind::terminate())
            .expect("Failed to install signal handler")
            .recv()
            .await;

        info!("Received terminate signal, shutting down");
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
