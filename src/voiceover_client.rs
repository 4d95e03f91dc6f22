// Voiceover synthesis client
// Calls the voiceover endpoint, which renders speech and uploads it to the audio store

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::error::{StudioError, StudioResult};

// ============================================================================
// API REQUEST/RESPONSE STRUCTURES
// ============================================================================

#[derive(Serialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct VoiceoverRequest {
    pub text: String,
    pub voice_id: String,
    pub stability: f64,
    pub similarity_boost: f64,
    pub style: f64,
    pub speed: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub session_id: Option<String>,
}

impl VoiceoverRequest {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            voice_id: DefaultVoices::GEORGE.to_string(),
            stability: 0.4,
            similarity_boost: 0.75,
            style: 0.6,
            speed: 1.0,
            session_id: None,
        }
    }

    pub fn with_voice(mut self, voice_id: &str) -> Self {
        self.voice_id = voice_id.to_string();
        self
    }

    pub fn with_session(mut self, session_id: &str) -> Self {
        self.session_id = Some(session_id.to_string());
        self
    }
}

/// Reference to an uploaded voiceover.
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct VoiceoverAsset {
    pub url: String,
    pub file_name: String,
}

#[derive(Deserialize, Debug)]
struct VoiceoverErrorBody {
    error: Option<String>,
    details: Option<String>,
}

#[async_trait]
pub trait VoiceoverSynthesizer: Send + Sync {
    async fn synthesize(&self, request: &VoiceoverRequest) -> StudioResult<VoiceoverAsset>;
}

// ============================================================================
// IMPLEMENTATION
// ============================================================================

#[derive(Clone)]
pub struct HttpVoiceoverClient {
    client: Client,
    endpoint: String,
    api_key: Option<String>,
}

impl HttpVoiceoverClient {
    pub fn new(endpoint: String, api_key: Option<String>, timeout: Duration) -> StudioResult<Self> {
        Ok(Self {
            client: Client::builder().timeout(timeout).build()?,
            endpoint,
            api_key,
        })
    }
}

#[async_trait]
impl VoiceoverSynthesizer for HttpVoiceoverClient {
    async fn synthesize(&self, request: &VoiceoverRequest) -> StudioResult<VoiceoverAsset> {
        if request.text.trim().is_empty() {
            return Err(StudioError::InvalidInput("text is required".to_string()));
        }

        let mut call = self
            .client
            .post(&self.endpoint)
            .header("Content-Type", "application/json")
            .json(request);

        if let Some(ref key) = self.api_key {
            call = call.bearer_auth(key);
        }

        tracing::info!(
            "🎙️ Requesting voiceover ({} chars, voice {})",
            request.text.len(),
            DefaultVoices::get_voice_name(&request.voice_id)
        );

        let response = call.send().await?;
        let status = response.status();

        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_else(|_| "Unknown error".to_string());
            let parsed = serde_json::from_str::<VoiceoverErrorBody>(&error_text).ok();
            let message = match parsed {
                Some(VoiceoverErrorBody { error: Some(error), details: Some(details) }) => {
                    format!("{}: {}", error, details)
                }
                Some(VoiceoverErrorBody { error: Some(error), .. }) => error,
                _ => error_text,
            };
            tracing::error!("Voiceover API error ({}): {}", status, message);
            return Err(StudioError::Upstream {
                status: status.as_u16(),
                message,
            });
        }

        let body = response.text().await?;
        let asset: VoiceoverAsset = serde_json::from_str(&body)
            .map_err(|e| StudioError::MalformedResponse(format!("voiceover response: {}", e)))?;

        tracing::info!("✅ Voiceover uploaded as {}", asset.file_name);
        Ok(asset)
    }
}

// ============================================================================
// VOICE PRESETS
// ============================================================================

pub struct DefaultVoices;

impl DefaultVoices {
    pub const GEORGE: &'static str = "JBFqnCBsd6RMkjVDRZzb"; // Male, warm narrator
    pub const LIAM: &'static str = "TX3LPaxmHKxFdv7VOQHJ"; // Male, articulate
    pub const RACHEL: &'static str = "21m00Tcm4TlvDq8ikWAM"; // Female, calm
    pub const EMILY: &'static str = "LcfcDJNUP1GQjkzn1xUU"; // Female, conversational

    pub fn get_voice_name(voice_id: &str) -> &'static str {
        match voice_id {
            Self::GEORGE => "George (Clear, authoritative)",
            Self::LIAM => "Liam (Upbeat, dynamic)",
            Self::RACHEL => "Rachel (Soothing, reassuring)",
            Self::EMILY => "Emily (Friendly, natural)",
            _ => "Custom Voice",
        }
    }

    /// Audio panel preset → voice id. Unknown presets fall back to the narrator.
    pub fn for_preset(preset: &str) -> &'static str {
        match preset.to_lowercase().as_str() {
            "professional" => Self::GEORGE,
            "energetic" => Self::LIAM,
            "calm" => Self::RACHEL,
            "conversational" => Self::EMILY,
            _ => Self::GEORGE,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct VoicePreset {
    pub value: &'static str,
    pub label: &'static str,
    pub description: &'static str,
}

pub const VOICE_PRESETS: [VoicePreset; 4] = [
    VoicePreset { value: "professional", label: "Professional", description: "Clear, authoritative tone" },
    VoicePreset { value: "energetic", label: "Energetic", description: "Upbeat, dynamic delivery" },
    VoicePreset { value: "calm", label: "Calm", description: "Soothing, reassuring voice" },
    VoicePreset { value: "conversational", label: "Conversational", description: "Friendly, natural feel" },
];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_defaults_and_wire_names() {
        let request = VoiceoverRequest::new("Hello").with_session("abc");
        let value = serde_json::to_value(&request).unwrap();
        assert_eq!(value["voiceId"], "JBFqnCBsd6RMkjVDRZzb");
        assert_eq!(value["similarityBoost"], 0.75);
        assert_eq!(value["stability"], 0.4);
        assert_eq!(value["sessionId"], "abc");

        let anonymous = serde_json::to_value(VoiceoverRequest::new("Hi")).unwrap();
        assert!(anonymous.get("sessionId").is_none());
    }

    #[test]
    fn test_presets_map_to_voice_ids() {
        assert_eq!(DefaultVoices::for_preset("Calm"), DefaultVoices::RACHEL);
        assert_eq!(DefaultVoices::for_preset("unknown"), DefaultVoices::GEORGE);
        assert_eq!(VOICE_PRESETS.len(), 4);
    }

    #[test]
    fn test_asset_parses_upload_response() {
        let asset: VoiceoverAsset =
            serde_json::from_str(r#"{"url":"https://cdn/voiceover-1.mp3","fileName":"voiceover-1.mp3"}"#).unwrap();
        assert_eq!(asset.file_name, "voiceover-1.mp3");
    }
}
