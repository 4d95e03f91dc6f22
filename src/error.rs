// src/error.rs
use axum::{
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use serde_json::json;
use thiserror::Error;

use crate::types::Stage;

#[derive(Error, Debug)]
pub enum StudioError {
    #[error("Network error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("Rate limit exceeded: {0}")]
    RateLimited(String),

    #[error("Usage quota exhausted: {0}")]
    QuotaExhausted(String),

    #[error("Upstream error ({status}): {message}")]
    Upstream { status: u16, message: String },

    #[error("Malformed response: {0}")]
    MalformedResponse(String),

    #[error("Stage '{stage}' failed")]
    StageFailed { stage: Stage },

    #[error("Stage '{stage}' did not finish after {attempts} status checks")]
    PollTimeout { stage: Stage, attempts: u32 },

    #[error("Campaign not found: {0}")]
    CampaignNotFound(String),

    #[error("Session not found: {0}")]
    SessionNotFound(String),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Archive error: {0}")]
    Archive(#[from] zip::result::ZipError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Service unavailable: {0}")]
    Unavailable(String),
}

pub type StudioResult<T> = Result<T, StudioError>;

impl StudioError {
    /// Single notification text shown to the user when a run fails.
    pub fn user_message(&self) -> String {
        match self {
            StudioError::Transport(_) => {
                "Could not reach the generation service. Check your connection and try again.".to_string()
            }
            StudioError::RateLimited(_) => "Rate limit exceeded. Please try again in a moment.".to_string(),
            StudioError::QuotaExhausted(_) => {
                "AI usage limit reached. Please add credits to continue.".to_string()
            }
            StudioError::Upstream { message, .. } if !message.is_empty() => message.clone(),
            StudioError::Upstream { .. } => "AI gateway error. Please try again.".to_string(),
            StudioError::MalformedResponse(_) => {
                "AI returned an unexpected format. Please try again.".to_string()
            }
            StudioError::StageFailed { stage } => format!("{} failed. Please try again.", stage.label()),
            StudioError::PollTimeout { stage, .. } => {
                format!("{} is taking too long. Please try again.", stage.label())
            }
            other => other.to_string(),
        }
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            StudioError::RateLimited(_) => StatusCode::TOO_MANY_REQUESTS,
            StudioError::QuotaExhausted(_) => StatusCode::PAYMENT_REQUIRED,
            StudioError::Transport(_)
            | StudioError::Upstream { .. }
            | StudioError::MalformedResponse(_) => StatusCode::BAD_GATEWAY,
            StudioError::PollTimeout { .. } => StatusCode::GATEWAY_TIMEOUT,
            StudioError::CampaignNotFound(_) | StudioError::SessionNotFound(_) => StatusCode::NOT_FOUND,
            StudioError::InvalidInput(_) => StatusCode::BAD_REQUEST,
            StudioError::Unavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for StudioError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            tracing::error!(error = %self, "request failed");
        } else {
            tracing::warn!(error = %self, "request rejected");
        }
        (status, Json(json!({ "error": self.user_message() }))).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_user_messages_match_upstream_wording() {
        assert_eq!(
            StudioError::RateLimited("slow down".into()).user_message(),
            "Rate limit exceeded. Please try again in a moment."
        );
        assert_eq!(
            StudioError::QuotaExhausted(String::new()).user_message(),
            "AI usage limit reached. Please add credits to continue."
        );
        assert_eq!(
            StudioError::StageFailed { stage: Stage::Audio }.user_message(),
            "Audio failed. Please try again."
        );
    }

    #[test]
    fn test_status_codes() {
        assert_eq!(StudioError::RateLimited(String::new()).status_code(), StatusCode::TOO_MANY_REQUESTS);
        assert_eq!(StudioError::QuotaExhausted(String::new()).status_code(), StatusCode::PAYMENT_REQUIRED);
        assert_eq!(
            StudioError::SessionNotFound("abc".into()).status_code(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            StudioError::CampaignNotFound("mock-x".into()).status_code(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(StudioError::MalformedResponse("{".into()).status_code(), StatusCode::BAD_GATEWAY);
    }
}
