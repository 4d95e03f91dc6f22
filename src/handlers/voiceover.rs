// src/handlers/voiceover.rs
use axum::{extract::Extension, response::Json, routing::post, Router};
use serde::Deserialize;
use std::sync::Arc;

use crate::error::{StudioError, StudioResult};
use crate::voiceover_client::{DefaultVoices, VoiceoverAsset, VoiceoverRequest};
use crate::AppState;

#[derive(Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct VoiceoverBody {
    pub text: String,
    pub voice_preset: Option<String>,
    pub voice_id: Option<String>,
    pub session_id: Option<String>,
}

impl VoiceoverBody {
    pub fn into_request(self) -> StudioResult<VoiceoverRequest> {
        if self.text.trim().is_empty() {
            return Err(StudioError::InvalidInput("text is required".to_string()));
        }
        let voice_id = self
            .voice_id
            .unwrap_or_else(|| DefaultVoices::for_preset(self.voice_preset.as_deref().unwrap_or_default()).to_string());

        let mut request = VoiceoverRequest::new(self.text).with_voice(&voice_id);
        if let Some(ref session_id) = self.session_id {
            request = request.with_session(session_id);
        }
        Ok(request)
    }
}

pub fn voiceover_routes() -> Router {
    Router::new().route("/api/voiceover", post(generate_voiceover))
}

/// Standalone synthesis for the audio panel.
async fn generate_voiceover(
    Extension(state): Extension<Arc<AppState>>,
    Json(body): Json<VoiceoverBody>,
) -> StudioResult<Json<VoiceoverAsset>> {
    let synthesizer = state
        .voiceover
        .as_ref()
        .ok_or_else(|| StudioError::Unavailable("voiceover synthesis is not configured".to_string()))?;

    let request = body.into_request()?;
    Ok(Json(synthesizer.synthesize(&request).await?))
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    #[test]
    fn test_body_maps_preset_and_session() {
        let body: VoiceoverBody = serde_json::from_str(
            r#"{"text":"Find your flow.","voicePreset":"calm","sessionId":"s1"}"#,
        )
        .unwrap();
        let request = body.into_request().unwrap();
        assert_eq!(request.voice_id, DefaultVoices::RACHEL);
        assert_eq!(request.session_id.as_deref(), Some("s1"));
        assert_eq!(request.stability, 0.4);
    }

    #[test]
    fn test_blank_text_is_rejected() {
        let body: VoiceoverBody = serde_json::from_str(r#"{"text":"   "}"#).unwrap();
        assert_matches!(body.into_request(), Err(StudioError::InvalidInput(_)));
    }
}
