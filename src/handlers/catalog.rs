// src/handlers/catalog.rs
use axum::{
    extract::Path,
    response::Json,
    routing::{get, post},
    Router,
};
use serde::{Deserialize, Serialize};

use crate::campaigns::{self, BriefTemplate, CatalogCampaign, EXAMPLE_BRIEF, TEMPLATES};
use crate::error::{StudioError, StudioResult};
use crate::types::{AdFormat, AspectRatio, Tone};
use crate::voiceover_client::{VoicePreset, VOICE_PRESETS};

#[derive(Deserialize, Debug)]
pub struct MatchRequest {
    pub brief: String,
}

#[derive(Serialize, Debug)]
pub struct OptionEntry {
    pub value: &'static str,
    pub label: &'static str,
}

/// Everything the brief panel offers for selection.
#[derive(Serialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct TemplateCatalog {
    pub templates: &'static [BriefTemplate],
    pub formats: Vec<OptionEntry>,
    pub tones: Vec<OptionEntry>,
    pub aspect_ratios: Vec<OptionEntry>,
    pub voice_presets: &'static [VoicePreset],
    pub example_brief: &'static str,
}

pub fn catalog_routes() -> Router {
    Router::new()
        .route("/api/campaigns", get(list_campaigns))
        .route("/api/campaigns/match", post(match_campaign))
        .route("/api/campaigns/:id", get(get_campaign))
        .route("/api/templates", get(list_templates))
}

async fn list_campaigns() -> Json<&'static [CatalogCampaign]> {
    Json(campaigns::catalog())
}

async fn match_campaign(Json(request): Json<MatchRequest>) -> Json<&'static CatalogCampaign> {
    Json(campaigns::find_best_campaign(&request.brief))
}

async fn get_campaign(Path(id): Path<String>) -> StudioResult<Json<&'static CatalogCampaign>> {
    campaigns::find_campaign(&id)
        .map(Json)
        .ok_or(StudioError::CampaignNotFound(id))
}

async fn list_templates() -> Json<TemplateCatalog> {
    Json(template_catalog())
}

pub fn template_catalog() -> TemplateCatalog {
    TemplateCatalog {
        templates: &TEMPLATES,
        formats: AdFormat::ALL
            .iter()
            .map(|f| OptionEntry { value: f.label(), label: f.label() })
            .collect(),
        tones: Tone::ALL
            .iter()
            .map(|t| OptionEntry { value: t.label(), label: t.label() })
            .collect(),
        aspect_ratios: [AspectRatio::Vertical, AspectRatio::Square, AspectRatio::Landscape]
            .iter()
            .map(|r| OptionEntry { value: r.as_str(), label: r.label() })
            .collect(),
        voice_presets: &VOICE_PRESETS,
        example_brief: EXAMPLE_BRIEF,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    #[tokio::test]
    async fn test_match_endpoint_uses_keyword_scoring() {
        let Json(campaign) = match_campaign(Json(MatchRequest {
            brief: "Launch a LUXURY watch line".to_string(),
        }))
        .await;
        assert_eq!(campaign.id, "mock-luxury-001");
    }

    #[tokio::test]
    async fn test_campaign_lookup_by_id() {
        let Json(campaign) = get_campaign(Path("mock-food-003".to_string())).await.unwrap();
        assert_eq!(campaign.info.product_name, "Verdant Cold Brew");

        let missing = get_campaign(Path("mock-none-999".to_string())).await;
        assert_matches!(missing, Err(StudioError::CampaignNotFound(id)) if id == "mock-none-999");
    }

    #[test]
    fn test_template_catalog_options() {
        let catalog = template_catalog();
        assert_eq!(catalog.templates.len(), 3);
        assert_eq!(catalog.formats[3].label, "6s Bumper");
        assert_eq!(catalog.aspect_ratios[2].value, "16:9");
        assert_eq!(catalog.voice_presets[2].value, "calm");
    }
}
