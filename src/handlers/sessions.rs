// src/handlers/sessions.rs
use axum::{
    extract::{Extension, Path, Query},
    http::{header, StatusCode},
    response::{IntoResponse, Json, Response},
    routing::get,
    Router,
};
use serde::Deserialize;
use std::sync::Arc;

use crate::error::{StudioError, StudioResult};
use crate::export::BundleInput;
use crate::store::{SessionRecord, SessionSummary};
use crate::AppState;

const DEFAULT_HISTORY_LIMIT: i64 = 20;
const MAX_HISTORY_LIMIT: i64 = 100;

#[derive(Deserialize, Debug)]
pub struct HistoryQuery {
    pub limit: Option<i64>,
}

impl HistoryQuery {
    fn limit(&self) -> i64 {
        self.limit
            .unwrap_or(DEFAULT_HISTORY_LIMIT)
            .clamp(1, MAX_HISTORY_LIMIT)
    }
}

pub fn session_routes() -> Router {
    Router::new()
        .route("/api/sessions", get(list_sessions))
        .route("/api/sessions/:session_id", get(get_session))
        .route("/api/sessions/:session_id/bundle", get(download_bundle))
}

async fn list_sessions(
    Query(query): Query<HistoryQuery>,
    Extension(state): Extension<Arc<AppState>>,
) -> StudioResult<Json<Vec<SessionSummary>>> {
    Ok(Json(state.store.list_sessions(query.limit()).await?))
}

async fn load(state: &AppState, session_id: &str) -> StudioResult<SessionRecord> {
    state
        .store
        .load_session(session_id)
        .await?
        .ok_or_else(|| StudioError::SessionNotFound(session_id.to_string()))
}

/// Reloads a past session: step statuses plus its extracted info and script.
async fn get_session(
    Path(session_id): Path<String>,
    Extension(state): Extension<Arc<AppState>>,
) -> StudioResult<Json<SessionRecord>> {
    Ok(Json(load(&state, &session_id).await?))
}

async fn download_bundle(
    Path(session_id): Path<String>,
    Extension(state): Extension<Arc<AppState>>,
) -> StudioResult<Response> {
    let record = load(&state, &session_id).await?;
    let input = BundleInput::from_record(&record)?;
    let bundle = state.bundler.assemble(&input).await?;

    Ok((
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, "application/zip".to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{}\"", bundle.file_name),
            ),
            (header::CACHE_CONTROL, "no-store".to_string()),
        ],
        bundle.bytes,
    )
        .into_response())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_history_limit_is_clamped() {
        assert_eq!(HistoryQuery { limit: None }.limit(), 20);
        assert_eq!(HistoryQuery { limit: Some(0) }.limit(), 1);
        assert_eq!(HistoryQuery { limit: Some(5000) }.limit(), 100);
    }
}
