// types.rs - Common data structures shared by the pipeline, store and export modules
use serde::{Deserialize, Serialize};
use std::fmt;

// ============================================================================
// STAGES
// ============================================================================

/// The five fixed pipeline stages, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Stage {
    Brief,
    Script,
    Visuals,
    Audio,
    Export,
}

impl Stage {
    pub const ALL: [Stage; 5] = [
        Stage::Brief,
        Stage::Script,
        Stage::Visuals,
        Stage::Audio,
        Stage::Export,
    ];

    /// Name used as the `step` column of the status store.
    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::Brief => "brief",
            Stage::Script => "script",
            Stage::Visuals => "visuals",
            Stage::Audio => "audio",
            Stage::Export => "export",
        }
    }

    pub fn parse(step: &str) -> Option<Stage> {
        match step {
            "brief" => Some(Stage::Brief),
            "script" => Some(Stage::Script),
            "visuals" => Some(Stage::Visuals),
            "audio" => Some(Stage::Audio),
            "export" => Some(Stage::Export),
            _ => None,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Stage::Brief => "Brief Analysis",
            Stage::Script => "Scripting",
            Stage::Visuals => "Visuals",
            Stage::Audio => "Audio",
            Stage::Export => "Final Export",
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            Stage::Brief => "Extract intent, audience & key messages",
            Stage::Script => "Generate voiceover script & scene cues",
            Stage::Visuals => "Compose visuals, transitions & motion",
            Stage::Audio => "Score music, mix sound & voice",
            Stage::Export => "Render, encode & optimize for platform",
        }
    }

    /// 1-based position, as shown by the stepper.
    pub fn number(&self) -> usize {
        match self {
            Stage::Brief => 1,
            Stage::Script => 2,
            Stage::Visuals => 3,
            Stage::Audio => 4,
            Stage::Export => 5,
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Live status of a stage in the current pipeline view.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StageStatus {
    Pending,
    Active,
    Complete,
}

/// Persisted status of a step in the status store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StepStatus {
    Pending,
    Completed,
    Failed,
}

impl StepStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            StepStatus::Pending => "pending",
            StepStatus::Completed => "completed",
            StepStatus::Failed => "failed",
        }
    }

    pub fn parse(status: &str) -> Option<StepStatus> {
        match status {
            "pending" => Some(StepStatus::Pending),
            "completed" => Some(StepStatus::Completed),
            "failed" => Some(StepStatus::Failed),
            _ => None,
        }
    }

    pub fn is_terminal(&self) -> bool {
        !matches!(self, StepStatus::Pending)
    }
}

/// Overall status of a session, derived from its step statuses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionStatus {
    Pending,
    Completed,
    Failed,
}

impl SessionStatus {
    pub fn derive<'a, I>(steps: I) -> SessionStatus
    where
        I: IntoIterator<Item = &'a StepStatus>,
    {
        let mut seen = 0;
        let mut completed = 0;
        for status in steps {
            seen += 1;
            match status {
                StepStatus::Failed => return SessionStatus::Failed,
                StepStatus::Completed => completed += 1,
                StepStatus::Pending => {}
            }
        }
        if seen > 0 && completed == seen {
            SessionStatus::Completed
        } else {
            SessionStatus::Pending
        }
    }
}

// ============================================================================
// ANALYSIS RESULTS
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExtractedInfo {
    pub product_name: String,
    pub audience: String,
    pub tone: String,
    pub duration: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AdScript {
    pub hook: String,
    pub body: String,
    pub cta: String,
}

/// One of the three timed script segments.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Segment {
    Hook,
    Body,
    Cta,
}

impl Segment {
    pub const ALL: [Segment; 3] = [Segment::Hook, Segment::Body, Segment::Cta];

    pub fn label(&self) -> &'static str {
        match self {
            Segment::Hook => "Hook",
            Segment::Body => "Body",
            Segment::Cta => "CTA",
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            Segment::Hook => "Attention grab",
            Segment::Body => "Core message",
            Segment::Cta => "Call to action",
        }
    }

    /// Nominal timing window in seconds (start, end).
    pub fn window(&self) -> (u32, u32) {
        match self {
            Segment::Hook => (0, 3),
            Segment::Body => (3, 12),
            Segment::Cta => (12, 15),
        }
    }

    pub fn timing_label(&self) -> String {
        let (start, end) = self.window();
        format!("{}–{}s", start, end)
    }
}

impl AdScript {
    pub fn segment(&self, segment: Segment) -> &str {
        match segment {
            Segment::Hook => &self.hook,
            Segment::Body => &self.body,
            Segment::Cta => &self.cta,
        }
    }

    /// Text read by the voiceover: all segments in order.
    pub fn narration(&self) -> String {
        Segment::ALL
            .iter()
            .map(|s| self.segment(*s).trim())
            .filter(|s| !s.is_empty())
            .collect::<Vec<_>>()
            .join(" ")
    }
}

/// Brief-analysis response: extracted info plus the generated script.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BriefAnalysis {
    pub product_name: String,
    pub audience: String,
    pub tone: String,
    pub duration: String,
    pub script: AdScript,
}

impl BriefAnalysis {
    pub fn extracted_info(&self) -> ExtractedInfo {
        ExtractedInfo {
            product_name: self.product_name.clone(),
            audience: self.audience.clone(),
            tone: self.tone.clone(),
            duration: self.duration.clone(),
        }
    }

    pub fn from_parts(info: ExtractedInfo, script: AdScript) -> Self {
        Self {
            product_name: info.product_name,
            audience: info.audience,
            tone: info.tone,
            duration: info.duration,
            script,
        }
    }
}

// ============================================================================
// BRIEF OPTIONS
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum AspectRatio {
    #[default]
    #[serde(rename = "9:16")]
    Vertical,
    #[serde(rename = "1:1")]
    Square,
    #[serde(rename = "16:9")]
    Landscape,
}

impl AspectRatio {
    pub fn as_str(&self) -> &'static str {
        match self {
            AspectRatio::Vertical => "9:16",
            AspectRatio::Square => "1:1",
            AspectRatio::Landscape => "16:9",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            AspectRatio::Vertical => "9:16 Vertical",
            AspectRatio::Square => "1:1 Square",
            AspectRatio::Landscape => "16:9 Landscape",
        }
    }

    pub fn slug(&self) -> &'static str {
        match self {
            AspectRatio::Vertical => "9x16",
            AspectRatio::Square => "1x1",
            AspectRatio::Landscape => "16x9",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum AdFormat {
    #[default]
    #[serde(rename = "30s Reel")]
    Reel,
    #[serde(rename = "15s Story")]
    Story,
    #[serde(rename = "60s YouTube")]
    YouTube,
    #[serde(rename = "6s Bumper")]
    Bumper,
}

impl AdFormat {
    pub const ALL: [AdFormat; 4] = [AdFormat::Reel, AdFormat::Story, AdFormat::YouTube, AdFormat::Bumper];

    pub fn label(&self) -> &'static str {
        match self {
            AdFormat::Reel => "30s Reel",
            AdFormat::Story => "15s Story",
            AdFormat::YouTube => "60s YouTube",
            AdFormat::Bumper => "6s Bumper",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum Tone {
    #[default]
    Cinematic,
    Energetic,
    Minimal,
    Playful,
}

impl Tone {
    pub const ALL: [Tone; 4] = [Tone::Cinematic, Tone::Energetic, Tone::Minimal, Tone::Playful];

    pub fn label(&self) -> &'static str {
        match self {
            Tone::Cinematic => "Cinematic",
            Tone::Energetic => "Energetic",
            Tone::Minimal => "Minimal",
            Tone::Playful => "Playful",
        }
    }
}

/// User-selected advanced settings, passed through to the analysis request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AdvancedSettings {
    #[serde(default)]
    pub aspect_ratio: AspectRatio,
    #[serde(default = "default_audio_model")]
    pub audio_model: String,
    #[serde(default = "default_visual_style")]
    pub visual_style: String,
}

fn default_audio_model() -> String {
    "eleven_v3".to_string()
}

fn default_visual_style() -> String {
    "cinematic".to_string()
}

impl Default for AdvancedSettings {
    fn default() -> Self {
        Self {
            aspect_ratio: AspectRatio::default(),
            audio_model: default_audio_model(),
            visual_style: default_visual_style(),
        }
    }
}

impl AdvancedSettings {
    /// File name of the pre-rendered preview video for these settings.
    pub fn preview_video(&self) -> String {
        let style: String = self
            .visual_style
            .trim()
            .to_lowercase()
            .chars()
            .map(|c| if c.is_ascii_alphanumeric() { c } else { '-' })
            .collect();
        let style = if style.is_empty() { default_visual_style() } else { style };
        format!("{}_{}.mp4", style, self.aspect_ratio.slug())
    }
}
