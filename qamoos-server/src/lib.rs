mod app;
pub mod config;
pub mod http;
pub mod services;

use anyhow::Result;
use qamoos_axum::AxumApp;
use qamoos_core::DictConfig;

pub use services::{AppState, Backends};

/// Build the application from the process environment.
pub fn build() -> Result<AxumApp> {
    let config = app::dict_app()?;
    let backends = Backends::in_memory(services::blob_store(&config.snapshot())?);
    build_with(config, backends)
}

/// Build the application over explicit configuration and storage backends.
pub fn build_with(config: DictConfig, backends: Backends) -> Result<AxumApp> {
    let snapshot = config.snapshot();
    let state = services::configure(&snapshot, backends)?;

    let ax = qamoos_axum::axum(snapshot)
        .use_router("/api/auth", http::auth_routes::router(state.clone()))
        .use_router("/api/categories", http::categories_routes::router(state.clone()))
        .use_router("/api/words", http::words_routes::router(state))
        .service("/health", || async { "ok" })
        .with_http_layers();

    Ok(ax)
}
