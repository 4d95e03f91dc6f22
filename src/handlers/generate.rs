// src/handlers/generate.rs
use axum::{
    extract::Extension,
    http::StatusCode,
    response::{IntoResponse, Json},
    routing::post,
    Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::campaigns::compose_brief;
use crate::pipeline::{AttemptToken, GenerationRequest};
use crate::types::{AdFormat, AdvancedSettings, AspectRatio, Tone};
use crate::voiceover_client::DefaultVoices;
use crate::AppState;

#[derive(Deserialize, Debug, Default)]
#[serde(rename_all = "camelCase")]
pub struct GenerateBody {
    #[serde(default)]
    pub brief: String,
    #[serde(default)]
    pub format: AdFormat,
    #[serde(default)]
    pub tone: Tone,
    /// Overrides the ratio in `settings` when given.
    pub aspect_ratio: Option<AspectRatio>,
    #[serde(default)]
    pub settings: AdvancedSettings,
    /// Audio panel preset (professional, energetic, calm, conversational).
    pub voice_preset: Option<String>,
    pub voice_id: Option<String>,
}

impl GenerateBody {
    pub fn into_request(self) -> GenerationRequest {
        let mut settings = self.settings;
        if let Some(ratio) = self.aspect_ratio {
            settings.aspect_ratio = ratio;
        }

        let voice_id = self
            .voice_id
            .filter(|v| !v.trim().is_empty())
            .or_else(|| self.voice_preset.as_deref().map(|p| DefaultVoices::for_preset(p).to_string()));

        GenerationRequest {
            brief: compose_brief(&self.brief, self.format, self.tone, settings.aspect_ratio),
            settings,
            voice_id,
        }
    }
}

#[derive(Serialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct GenerateResponse {
    pub session_id: String,
    pub attempt: AttemptToken,
}

pub fn generate_routes() -> Router {
    Router::new().route("/api/generate", post(start_generation))
}

/// Starts a run and returns immediately; progress arrives on `/ws/pipeline`.
async fn start_generation(
    Extension(state): Extension<Arc<AppState>>,
    Json(body): Json<GenerateBody>,
) -> impl IntoResponse {
    let ticket = state.pipeline.start(body.into_request()).await;
    tracing::info!("📝 Generation accepted: session {} (attempt {})", ticket.session_id, ticket.attempt);

    (
        StatusCode::ACCEPTED,
        Json(GenerateResponse {
            session_id: ticket.session_id,
            attempt: ticket.attempt,
        }),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_blank_brief_uses_example_and_appends_options() {
        let body: GenerateBody = serde_json::from_str(
            r#"{"brief":"  ","format":"15s Story","tone":"Playful","aspectRatio":"1:1"}"#,
        )
        .unwrap();
        let request = body.into_request();

        assert!(request.brief.starts_with("Product: NovaPods Pro"));
        assert!(request.brief.ends_with(
            "Preferred Format: 15s Story\nPreferred Tone: Playful\nAspect Ratio: 1:1 Square"
        ));
        assert_eq!(request.settings.aspect_ratio, AspectRatio::Square);
        assert_eq!(request.settings.preview_video(), "cinematic_1x1.mp4");
        assert!(request.voice_id.is_none());
    }

    #[test]
    fn test_voice_selection() {
        let body = GenerateBody {
            brief: "coffee".to_string(),
            voice_preset: Some("energetic".to_string()),
            ..GenerateBody::default()
        };
        assert_eq!(body.into_request().voice_id.as_deref(), Some(DefaultVoices::LIAM));

        let body = GenerateBody {
            voice_preset: Some("energetic".to_string()),
            voice_id: Some("custom-voice".to_string()),
            ..GenerateBody::default()
        };
        assert_eq!(body.into_request().voice_id.as_deref(), Some("custom-voice"));
    }
}
