// src/campaigns.rs
//! Offline campaign catalog, keyword matcher and brief templates.
//!
//! The matcher stands in for the live brief-analysis call when no endpoint is
//! configured: every catalog entry scores one point per keyword found in the
//! brief, and the first entry with the strictly highest score wins.

use serde::Serialize;

use crate::types::{AdFormat, AdScript, AspectRatio, BriefAnalysis, ExtractedInfo, Tone};

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CatalogCampaign {
    pub id: &'static str,
    pub keywords: &'static [&'static str],
    pub info: ExtractedInfo,
    pub script: AdScript,
    pub video_url: &'static str,
}

impl CatalogCampaign {
    pub fn analysis(&self) -> BriefAnalysis {
        BriefAnalysis::from_parts(self.info.clone(), self.script.clone())
    }

    /// Number of this entry's keywords present in an already-lowercased brief.
    fn score(&self, lowered_brief: &str) -> usize {
        self.keywords.iter().filter(|kw| lowered_brief.contains(*kw)).count()
    }
}

fn entry(
    id: &'static str,
    keywords: &'static [&'static str],
    info: [&str; 4],
    script: [&str; 3],
) -> CatalogCampaign {
    let [product_name, audience, tone, duration] = info;
    let [hook, body, cta] = script;
    CatalogCampaign {
        id,
        keywords,
        info: ExtractedInfo {
            product_name: product_name.to_string(),
            audience: audience.to_string(),
            tone: tone.to_string(),
            duration: duration.to_string(),
        },
        script: AdScript {
            hook: hook.to_string(),
            body: body.to_string(),
            cta: cta.to_string(),
        },
        video_url: "/placeholder.svg",
    }
}

lazy_static::lazy_static! {
    static ref CATALOG: Vec<CatalogCampaign> = build_catalog();
}

/// The fixed catalog, in match priority order.
pub fn catalog() -> &'static [CatalogCampaign] {
    &CATALOG
}

fn build_catalog() -> Vec<CatalogCampaign> {
    vec![
        entry(
            "mock-luxury-001",
            &["luxury", "watch", "premium", "elegant", "fashion", "jewelry", "brand", "gold"],
            ["Aurelia Timepieces", "Affluent professionals aged 30–55", "Sophisticated & aspirational", "15s"],
            [
                "Time doesn't wait — but it does make a statement. Introducing Aurelia, where heritage meets the extraordinary.",
                "Crafted from aerospace-grade titanium and sapphire crystal, each Aurelia timepiece undergoes 280 hours of hand-finishing. Worn by those who shape tomorrow, not chase it. Available in Midnight Carbon, Rose Summit, and Arctic Platinum.",
                "Claim your legacy. Visit aurelia.com and receive complimentary engraving on your first order.",
            ],
        ),
        entry(
            "mock-tech-002",
            &["tech", "app", "software", "saas", "ai", "startup", "platform", "cloud", "device", "gadget"],
            ["NeuralDesk Pro", "Remote workers & creative professionals", "Bold & innovative", "15s"],
            [
                "Your desk is smart. Your tools should be smarter. Meet NeuralDesk Pro — the AI workspace that thinks ahead.",
                "NeuralDesk Pro uses on-device AI to organize your files, prioritize your tasks, and auto-generate meeting summaries in real time. Seamless integration with 200+ apps. Zero cloud dependency. Your data stays yours — always.",
                "Start your free 30-day trial at neuraldesk.io. No credit card required.",
            ],
        ),
        entry(
            "mock-food-003",
            &["food", "drink", "beverage", "restaurant", "coffee", "organic", "healthy", "snack", "meal"],
            ["Verdant Cold Brew", "Health-conscious millennials & Gen Z", "Fresh & energetic", "15s"],
            [
                "Forget everything you know about energy drinks. Verdant Cold Brew is fuel — grown, not manufactured.",
                "Slow-steeped for 18 hours from single-origin Ethiopian beans, blended with adaptogenic mushrooms and a hint of oat milk. 120mg of clean caffeine, zero crash, zero sugar. Available in Original, Vanilla Fog, and Matcha Haze.",
                "Find your flow. Order a Verdant starter pack at verdantbrew.co — free shipping on your first box.",
            ],
        ),
        entry(
            "mock-fitness-004",
            &["fitness", "gym", "workout", "sport", "athletic", "training", "health", "run", "exercise", "yoga"],
            ["Kinetic Pulse Tracker", "Athletes & fitness enthusiasts aged 18–40", "Motivational & high-energy", "15s"],
            [
                "Your body speaks in data. The Kinetic Pulse listens — and pushes you further than you thought possible.",
                "Track heart-rate zones, VO2 max, recovery score, and sleep architecture with medical-grade biometric sensors. The Pulse adapts your training plan in real time using AI coaching. Waterproof to 100m. Battery life: 14 days.",
                "Push your limit. Pre-order Kinetic Pulse at kineticpulse.com and save 20% before launch.",
            ],
        ),
        entry(
            "mock-social-005",
            &["social", "media", "viral", "tiktok", "instagram", "influencer", "content", "creator", "hype", "trend"],
            ["VibeCheck Social Suite", "Content creators & social media managers", "Playful & trend-savvy", "15s"],
            [
                "Stop guessing what's trending. VibeCheck already knows — and it's building your content calendar while you sleep.",
                "VibeCheck scans 12 platforms in real time to surface trending sounds, hashtags, and formats before they peak. Auto-schedule posts, generate captions with AI, and track engagement across all your channels in one dashboard.",
                "Get ahead of the algorithm. Start free at vibecheck.app — your first 500 scheduled posts are on us.",
            ],
        ),
    ]
}

/// Picks the catalog entry whose keywords best match the brief.
pub fn find_best_campaign(brief: &str) -> &'static CatalogCampaign {
    find_best_in(catalog(), brief)
}

fn find_best_in<'a>(entries: &'a [CatalogCampaign], brief: &str) -> &'a CatalogCampaign {
    let lowered = brief.to_lowercase();
    let mut best_index = 0;
    let mut best_score = 0;

    for (index, campaign) in entries.iter().enumerate() {
        let score = campaign.score(&lowered);
        if score > best_score {
            best_score = score;
            best_index = index;
        }
    }

    tracing::debug!(campaign = entries[best_index].id, score = best_score, "catalog match");
    &entries[best_index]
}

/// Looks a catalog entry up by id, for reloading a history item.
pub fn find_campaign(id: &str) -> Option<&'static CatalogCampaign> {
    catalog().iter().find(|c| c.id == id)
}

// ============================================================================
// BRIEF COMPOSITION
// ============================================================================

pub const EXAMPLE_BRIEF: &str = "Product: NovaPods Pro — Noise-cancelling wireless earbuds

Target Audience: Urban professionals aged 25–40 who commute daily and value focus and premium sound quality.

Tone: Premium, cinematic, aspirational

Key Message: \"Silence the world. Own your focus.\"

Duration: 30-second vertical video ad for Instagram Reels";

/// Brief text sent for analysis: the user's brief (or the example brief when
/// blank) followed by the selected options.
pub fn compose_brief(brief: &str, format: AdFormat, tone: Tone, ratio: AspectRatio) -> String {
    let body = if brief.trim().is_empty() { EXAMPLE_BRIEF } else { brief };
    format!(
        "{}\n\nPreferred Format: {}\nPreferred Tone: {}\nAspect Ratio: {}",
        body,
        format.label(),
        tone.label(),
        ratio.label()
    )
}

#[derive(Debug, Clone, Serialize)]
pub struct BriefTemplate {
    pub title: &'static str,
    pub icon: &'static str,
    pub description: &'static str,
    pub brief: &'static str,
}

pub const TEMPLATES: [BriefTemplate; 3] = [
    BriefTemplate {
        title: "Luxury Product",
        icon: "✦",
        description: "High-end product showcase with cinematic slow-motion and premium feel.",
        brief: "Product: Noir Lumière — Luxury Leather Watch\n\nTarget Audience: Affluent professionals aged 30–55 who value craftsmanship and exclusivity.\n\nTone: Premium, cinematic, aspirational\n\nKey Message: \"Timeless by design. Crafted for the extraordinary.\"\n\nDuration: 30-second vertical video ad for Instagram Reels",
    },
    BriefTemplate {
        title: "Tech Sizzler",
        icon: "⚡",
        description: "Fast-paced tech reveal with glitch effects and bold typography.",
        brief: "Product: VortexPad Ultra — Next-gen Tablet\n\nTarget Audience: Tech enthusiasts and creators aged 18–35 who demand bleeding-edge performance.\n\nTone: Energetic, futuristic, bold\n\nKey Message: \"Create at the speed of thought.\"\n\nDuration: 15-second story ad for TikTok",
    },
    BriefTemplate {
        title: "Social Hype",
        icon: "🔥",
        description: "Trend-native UGC-style ad optimized for viral reach.",
        brief: "Product: GlowUp Serum — Vitamin C Face Serum\n\nTarget Audience: Gen Z beauty enthusiasts aged 16–28 active on TikTok and Instagram.\n\nTone: Playful, authentic, trend-aware\n\nKey Message: \"Your skin's new best friend. #GlowUpChallenge\"\n\nDuration: 30-second vertical video ad for TikTok",
    },
];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_luxury_watch_brief_returns_luxury_entry_unchanged() {
        let matched = find_best_campaign("Launch a LUXURY watch line");
        let expected = &catalog()[0];
        assert_eq!(matched.id, "mock-luxury-001");
        assert_eq!(matched.info, expected.info);
        assert_eq!(matched.script, expected.script);
        assert_eq!(matched.info.product_name, "Aurelia Timepieces");
    }

    #[test]
    fn test_single_entry_keyword_selects_that_entry() {
        assert_eq!(find_best_campaign("New yoga mats").id, "mock-fitness-004");
        assert_eq!(find_best_campaign("Organic coffee").id, "mock-food-003");
    }

    #[test]
    fn test_uneven_matches_pick_strictly_higher_score() {
        // one luxury keyword (gold) versus three social keywords
        let brief = "gold tiktok influencer trend";
        assert_eq!(find_best_campaign(brief).id, "mock-social-005");
    }

    #[test]
    fn test_zero_matches_default_to_first_entry() {
        assert_eq!(find_best_campaign("zzz qqq").id, "mock-luxury-001");
        assert_eq!(find_best_campaign("").id, "mock-luxury-001");
    }

    #[test]
    fn test_ties_favor_catalog_order() {
        // "watch" (luxury) and "snack" (food) score one point each
        assert_eq!(find_best_campaign("watch snack").id, "mock-luxury-001");
    }

    #[test]
    fn test_compose_brief_falls_back_to_example() {
        let composed = compose_brief("   ", AdFormat::Story, Tone::Playful, AspectRatio::Square);
        assert!(composed.starts_with("Product: NovaPods Pro"));
        assert!(composed.ends_with(
            "Preferred Format: 15s Story\nPreferred Tone: Playful\nAspect Ratio: 1:1 Square"
        ));

        let composed = compose_brief("My brief", AdFormat::Reel, Tone::Cinematic, AspectRatio::Vertical);
        assert!(composed.starts_with("My brief\n\nPreferred Format: 30s Reel"));
    }

    #[test]
    fn test_find_campaign_by_id() {
        let campaign = find_campaign("mock-tech-002").unwrap();
        assert_eq!(campaign.info.product_name, "NeuralDesk Pro");
        assert!(find_campaign("missing").is_none());
    }

    #[test]
    fn test_catalog_is_built_once() {
        assert_eq!(catalog().len(), 5);
        assert!(std::ptr::eq(catalog(), catalog()));
        assert!(std::ptr::eq(find_best_campaign("gym"), &catalog()[3]));
    }
}
