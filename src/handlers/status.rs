// src/handlers/status.rs
use axum::{extract::Extension, response::Json};
use serde_json::{json, Value};
use std::sync::Arc;

use crate::config::{AssetSource, DriveMode};
use crate::AppState;

fn source_label(source: &AssetSource) -> &'static str {
    match source {
        AssetSource::Directory(_) => "directory",
        AssetSource::Bucket { .. } => "bucket",
        AssetSource::Disabled => "not_configured",
    }
}

pub async fn api_status(Extension(state): Extension<Arc<AppState>>) -> Json<Value> {
    let db_status = match state.db_pool {
        Some(ref pool) => match sqlx::query("SELECT 1").fetch_one(pool).await {
            Ok(_) => "healthy",
            Err(_) => "unhealthy",
        },
        None => "not_configured",
    };

    let mode = match state.config.pipeline.mode {
        DriveMode::Simulated => json!({ "mode": "simulated" }),
        DriveMode::Polled { interval, max_attempts } => json!({
            "mode": "polled",
            "intervalMs": interval.as_millis() as u64,
            "maxAttempts": max_attempts,
        }),
    };

    let snapshot = state.pipeline.snapshot().await;

    Json(json!({
        "status": "operational",
        "version": env!("CARGO_PKG_VERSION"),
        "statusLine": snapshot.status_line(),
        "services": {
            "database": db_status,
            "stepStore": state.store.backend(),
            "briefAnalysis": state.pipeline.analyzer_name(),
            "voiceover": if state.voiceover.is_some() { "configured" } else { "not_configured" },
            "audioAssets": source_label(&state.config.audio_assets),
            "videoAssets": source_label(&state.config.video_assets),
        },
        "pipeline": mode,
        "endpoints": {
            "generate": "/api/generate",
            "pipeline": "/api/pipeline",
            "websocket": "/ws/pipeline",
            "sessions": "/api/sessions",
            "bundle": "/api/sessions/:session_id/bundle",
            "campaigns": "/api/campaigns",
            "templates": "/api/templates",
            "voiceover": "/api/voiceover",
        }
    }))
}
