// src/handlers/pipeline.rs
use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        Extension,
    },
    response::{IntoResponse, Json},
    routing::get,
    Router,
};
use futures::{sink::SinkExt, stream::StreamExt};
use serde::Serialize;
use std::sync::Arc;
use tokio::sync::broadcast::error::RecvError;

use crate::pipeline::{PipelineState, ProgressUpdate};
use crate::AppState;

/// Pipeline snapshot plus the status bar text.
#[derive(Serialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct PipelineView {
    #[serde(flatten)]
    pub state: PipelineState,
    pub status_line: String,
}

impl From<PipelineState> for PipelineView {
    fn from(state: PipelineState) -> Self {
        let status_line = state.status_line();
        Self { state, status_line }
    }
}

#[derive(Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum PipelineMessage {
    Snapshot { pipeline: PipelineView },
    Progress { update: ProgressUpdate },
}

pub fn pipeline_routes() -> Router {
    Router::new()
        .route("/api/pipeline", get(get_pipeline))
        .route("/ws/pipeline", get(pipeline_socket_handler))
}

async fn get_pipeline(Extension(state): Extension<Arc<AppState>>) -> Json<PipelineView> {
    Json(state.pipeline.snapshot().await.into())
}

async fn pipeline_socket_handler(
    ws: WebSocketUpgrade,
    Extension(state): Extension<Arc<AppState>>,
) -> impl IntoResponse {
    ws.on_upgrade(|socket| pipeline_socket(socket, state))
}

async fn pipeline_socket(stream: WebSocket, state: Arc<AppState>) {
    let (mut sender, mut receiver) = stream.split();
    // subscribe before the snapshot so nothing falls between the two
    let mut updates = state.pipeline.subscribe();
    tracing::info!("🔌 Pipeline progress subscriber connected");

    if send_snapshot(&mut sender, &state).await.is_err() {
        return;
    }

    loop {
        tokio::select! {
            incoming = receiver.next() => {
                match incoming {
                    Some(Ok(Message::Close(_))) | None => break,
                    Some(Ok(_)) => {}
                    Some(Err(e)) => {
                        tracing::debug!("Pipeline socket receive error: {}", e);
                        break;
                    }
                }
            }
            update = updates.recv() => {
                let sent = match update {
                    Ok(update) => send_json(&mut sender, &PipelineMessage::Progress { update }).await,
                    Err(RecvError::Lagged(skipped)) => {
                        tracing::warn!("Pipeline subscriber lagged by {} updates, resending snapshot", skipped);
                        send_snapshot(&mut sender, &state).await
                    }
                    Err(RecvError::Closed) => break,
                };
                if sent.is_err() {
                    break;
                }
            }
        }
    }

    tracing::info!("🔌 Pipeline progress subscriber disconnected");
}

async fn send_snapshot<S>(sender: &mut S, state: &AppState) -> Result<(), ()>
where
    S: SinkExt<Message> + Unpin,
{
    let pipeline = state.pipeline.snapshot().await.into();
    send_json(sender, &PipelineMessage::Snapshot { pipeline }).await
}

async fn send_json<S>(sender: &mut S, message: &PipelineMessage) -> Result<(), ()>
where
    S: SinkExt<Message> + Unpin,
{
    let text = match serde_json::to_string(message) {
        Ok(text) => text,
        Err(e) => {
            tracing::error!("Failed to serialize pipeline message: {}", e);
            return Ok(());
        }
    };
    sender.send(Message::Text(text)).await.map_err(|_| ())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Stage;

    #[test]
    fn test_view_flattens_state() {
        let mut state = PipelineState::default();
        state.phase = crate::pipeline::RunPhase::Generating;
        state.activate(Stage::Visuals);

        let value = serde_json::to_value(PipelineView::from(state)).unwrap();
        assert_eq!(value["statusLine"], "Processing: Visuals");
        assert_eq!(value["activeStage"], 3);
        assert_eq!(value["phase"], "generating");
        assert_eq!(value["stages"][0]["status"], "complete");
        assert_eq!(value["stages"][2]["label"], "Visuals");
    }
}
