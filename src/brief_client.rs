// Brief analysis client
// Talks to the brief-analysis endpoint, or falls back to the offline catalog

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::campaigns;
use crate::error::{StudioError, StudioResult};
use crate::types::{AdvancedSettings, BriefAnalysis};

lazy_static::lazy_static! {
    static ref JSON_FENCE: regex::Regex = regex::Regex::new(r"```json\n?").expect("valid fence regex");
    static ref PLAIN_FENCE: regex::Regex = regex::Regex::new(r"```\n?").expect("valid fence regex");
}

// ============================================================================
// API REQUEST/RESPONSE STRUCTURES
// ============================================================================

#[derive(Serialize, Debug, Clone)]
pub struct BriefAnalysisRequest {
    pub brief: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata: Option<AdvancedSettings>,
}

#[derive(Deserialize, Debug)]
struct ErrorBody {
    error: Option<String>,
}

/// Anything that can turn a brief into extracted info plus a script.
#[async_trait]
pub trait BriefAnalyzer: Send + Sync {
    async fn analyze(&self, request: &BriefAnalysisRequest) -> StudioResult<BriefAnalysis>;

    /// Short name for logs and the status endpoint.
    fn name(&self) -> &'static str;
}

// ============================================================================
// IMPLEMENTATION
// ============================================================================

#[derive(Clone)]
pub struct HttpBriefAnalyzer {
    client: Client,
    endpoint: String,
    api_key: Option<String>,
}

impl HttpBriefAnalyzer {
    pub fn new(endpoint: String, api_key: Option<String>, timeout: Duration) -> StudioResult<Self> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            endpoint,
            api_key,
        })
    }
}

#[async_trait]
impl BriefAnalyzer for HttpBriefAnalyzer {
    async fn analyze(&self, request: &BriefAnalysisRequest) -> StudioResult<BriefAnalysis> {
        let mut call = self
            .client
            .post(&self.endpoint)
            .header("Content-Type", "application/json")
            .json(request);

        if let Some(ref key) = self.api_key {
            call = call.bearer_auth(key);
        }

        tracing::info!("🧠 Sending brief for analysis ({} chars)", request.brief.len());
        let response = call.send().await?;
        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            return Err(classify_failure(status, &body));
        }

        let analysis = parse_analysis(&body)?;
        tracing::info!("✅ Brief analyzed: product '{}'", analysis.product_name);
        Ok(analysis)
    }

    fn name(&self) -> &'static str {
        "http"
    }
}

/// Offline analyzer backed by the campaign catalog.
#[derive(Clone, Default)]
pub struct CatalogAnalyzer;

#[async_trait]
impl BriefAnalyzer for CatalogAnalyzer {
    async fn analyze(&self, request: &BriefAnalysisRequest) -> StudioResult<BriefAnalysis> {
        let campaign = campaigns::find_best_campaign(&request.brief);
        tracing::info!("📚 Brief matched catalog campaign {}", campaign.id);
        Ok(campaign.analysis())
    }

    fn name(&self) -> &'static str {
        "catalog"
    }
}

/// Maps a non-2xx analysis response onto the error taxonomy.
pub fn classify_failure(status: StatusCode, body: &str) -> StudioError {
    let message = serde_json::from_str::<ErrorBody>(body)
        .ok()
        .and_then(|b| b.error)
        .unwrap_or_default();

    match status {
        StatusCode::TOO_MANY_REQUESTS => StudioError::RateLimited(message),
        StatusCode::PAYMENT_REQUIRED => StudioError::QuotaExhausted(message),
        _ => {
            tracing::error!("Brief analysis error ({}): {}", status, body);
            StudioError::Upstream {
                status: status.as_u16(),
                message,
            }
        }
    }
}

/// Removes markdown code fences that models like to wrap JSON in.
pub fn strip_code_fences(raw: &str) -> String {
    let without_json = JSON_FENCE.replace_all(raw, "");
    PLAIN_FENCE.replace_all(&without_json, "").trim().to_string()
}

pub fn parse_analysis(raw: &str) -> StudioResult<BriefAnalysis> {
    let cleaned = strip_code_fences(raw);
    serde_json::from_str::<BriefAnalysis>(&cleaned).map_err(|e| {
        tracing::error!("Failed to parse analysis response: {}", cleaned);
        StudioError::MalformedResponse(e.to_string())
    })
}
