// lib.rs - Ad studio service: brief analysis, staged generation pipeline and asset bundles
pub mod assets;
pub mod brief_client;
pub mod campaigns;
pub mod config;
pub mod db;
pub mod error;
pub mod export;
pub mod handlers;
pub mod middleware;
pub mod pipeline;
pub mod store;
pub mod types;
pub mod voiceover_client;

use axum::{Extension, Router};
use std::sync::Arc;
use tower_http::cors::CorsLayer;

pub use error::{StudioError, StudioResult};
pub use types::*;

/// Shared state handed to every handler through `Extension<Arc<AppState>>`.
pub struct AppState {
    pub config: config::StudioConfig,
    pub pipeline: pipeline::SharedPipeline,
    pub store: Arc<dyn store::StepStatusStore>,
    pub voiceover: Option<Arc<dyn voiceover_client::VoiceoverSynthesizer>>,
    pub bundler: export::BundleAssembler,
    pub db_pool: Option<sqlx::PgPool>,
}

pub fn app(state: Arc<AppState>) -> Router {
    Router::new()
        .merge(handlers::generate::generate_routes())
        .merge(handlers::pipeline::pipeline_routes())
        .merge(handlers::sessions::session_routes())
        .merge(handlers::catalog::catalog_routes())
        .merge(handlers::voiceover::voiceover_routes())
        .route("/api/status", axum::routing::get(handlers::status::api_status))
        .layer(axum::middleware::from_fn(middleware::logging::request_logging_middleware))
        .layer(CorsLayer::permissive())
        .layer(Extension(state))
}
