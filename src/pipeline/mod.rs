// src/pipeline/mod.rs
//! Generation pipeline: the single "current" run, its stage view and progress feed.
//!
//! Every run gets a monotonically increasing attempt token. State changes go
//! through [`Pipeline::transition`], which applies them only while the run's
//! token is still the current one, so a superseded run can never touch the
//! view or publish progress once a newer run has begun.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::Arc;
use tokio::sync::{broadcast, RwLock};
use tokio_util::sync::CancellationToken;

use crate::brief_client::BriefAnalyzer;
use crate::config::PipelineConfig;
use crate::store::StepStatusStore;
use crate::types::{AdScript, ExtractedInfo, Stage, StageStatus};
use crate::voiceover_client::{VoiceoverAsset, VoiceoverSynthesizer};

pub mod generation;
pub mod sequencer;

pub use generation::{GenerationRequest, GenerationTicket, RunOutcome};

/// Token identifying one generation attempt.
pub type AttemptToken = u64;

const PROGRESS_CHANNEL_CAPACITY: usize = 256;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RunPhase {
    Idle,
    Generating,
    Complete,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StageView {
    pub id: usize,
    pub stage: Stage,
    pub label: &'static str,
    pub description: &'static str,
    pub status: StageStatus,
}

impl StageView {
    fn pending(stage: Stage) -> Self {
        Self {
            id: stage.number(),
            stage,
            label: stage.label(),
            description: stage.description(),
            status: StageStatus::Pending,
        }
    }
}

/// What the studio shows for the current run.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PipelineState {
    pub attempt: AttemptToken,
    pub session_id: Option<String>,
    pub phase: RunPhase,
    pub stages: Vec<StageView>,
    /// 1-based index of the active stage; 0 when idle.
    pub active_stage: usize,
    pub extracted_info: Option<ExtractedInfo>,
    pub script: Option<AdScript>,
    pub voiceover: Option<VoiceoverAsset>,
    pub preview_video: Option<String>,
    pub last_error: Option<String>,
}

impl Default for PipelineState {
    fn default() -> Self {
        Self {
            attempt: 0,
            session_id: None,
            phase: RunPhase::Idle,
            stages: Stage::ALL.iter().copied().map(StageView::pending).collect(),
            active_stage: 0,
            extracted_info: None,
            script: None,
            voiceover: None,
            preview_video: None,
            last_error: None,
        }
    }
}

impl PipelineState {
    fn reset_for(&mut self, attempt: AttemptToken, session_id: &str) {
        *self = PipelineState {
            attempt,
            session_id: Some(session_id.to_string()),
            phase: RunPhase::Generating,
            ..PipelineState::default()
        };
    }

    pub fn stage_status(&self, stage: Stage) -> StageStatus {
        self.stages[stage.number() - 1].status
    }

    /// Makes `stage` active and everything before it complete.
    pub fn activate(&mut self, stage: Stage) {
        let index = stage.number() - 1;
        for (i, view) in self.stages.iter_mut().enumerate() {
            if i < index {
                view.status = StageStatus::Complete;
            } else if i == index && view.status != StageStatus::Complete {
                view.status = StageStatus::Active;
            }
        }
        self.active_stage = stage.number();
    }

    pub fn complete_stage(&mut self, stage: Stage) {
        self.stages[stage.number() - 1].status = StageStatus::Complete;
    }

    pub fn finish(&mut self, preview_video: String) {
        for view in self.stages.iter_mut() {
            view.status = StageStatus::Complete;
        }
        self.phase = RunPhase::Complete;
        self.active_stage = 0;
        self.preview_video = Some(preview_video);
    }

    /// Back to idle after a failure. Completed stages stay complete.
    pub fn fail(&mut self, message: String) {
        for view in self.stages.iter_mut() {
            if view.status == StageStatus::Active {
                view.status = StageStatus::Pending;
            }
        }
        self.phase = RunPhase::Idle;
        self.active_stage = 0;
        self.last_error = Some(message);
    }

    /// Status bar text.
    pub fn status_line(&self) -> String {
        match self.phase {
            RunPhase::Generating => {
                let label = Stage::ALL
                    .get(self.active_stage.wrapping_sub(1))
                    .map(|s| s.label())
                    .unwrap_or("…");
                format!("Processing: {}", label)
            }
            RunPhase::Complete => "Export ready".to_string(),
            RunPhase::Idle => "Ready".to_string(),
        }
    }
}

// ============================================================================
// PROGRESS FEED
// ============================================================================

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ProgressEvent {
    Started,
    StageActive { stage: Stage, index: usize },
    StageComplete { stage: Stage },
    Analysis { extracted_info: ExtractedInfo, script: AdScript },
    Voiceover { asset: VoiceoverAsset },
    Completed { preview_video: String },
    Failed { message: String },
}

/// Progress message pushed to subscribers (WebSocket clients).
#[derive(Debug, Clone, Serialize)]
pub struct ProgressUpdate {
    pub attempt: AttemptToken,
    pub session_id: String,
    pub timestamp: DateTime<Utc>,
    pub message: String,
    pub event: ProgressEvent,
}

/// Handle given to a running attempt.
#[derive(Debug, Clone)]
pub struct Attempt {
    pub token: AttemptToken,
    pub session_id: String,
    cancel: CancellationToken,
}

impl Attempt {
    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// Resolves once a newer attempt supersedes this one.
    pub async fn cancelled(&self) {
        self.cancel.cancelled().await
    }
}

struct Current {
    state: PipelineState,
    cancel: CancellationToken,
}

pub struct Pipeline {
    current: RwLock<Current>,
    progress: broadcast::Sender<ProgressUpdate>,
    pub(crate) analyzer: Arc<dyn BriefAnalyzer>,
    pub(crate) voiceover: Option<Arc<dyn VoiceoverSynthesizer>>,
    pub(crate) store: Arc<dyn StepStatusStore>,
    pub(crate) config: PipelineConfig,
}

impl Pipeline {
    pub fn new(
        analyzer: Arc<dyn BriefAnalyzer>,
        voiceover: Option<Arc<dyn VoiceoverSynthesizer>>,
        store: Arc<dyn StepStatusStore>,
        config: PipelineConfig,
    ) -> Self {
        let (progress, _) = broadcast::channel(PROGRESS_CHANNEL_CAPACITY);
        Self {
            current: RwLock::new(Current {
                state: PipelineState::default(),
                cancel: CancellationToken::new(),
            }),
            progress,
            analyzer,
            voiceover,
            store,
            config,
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ProgressUpdate> {
        self.progress.subscribe()
    }

    pub async fn snapshot(&self) -> PipelineState {
        self.current.read().await.state.clone()
    }

    pub fn analyzer_name(&self) -> &'static str {
        self.analyzer.name()
    }

    /// Supersedes whatever run is in flight and makes `session_id` current.
    pub(crate) async fn begin(&self, session_id: &str) -> Attempt {
        let mut current = self.current.write().await;
        current.cancel.cancel();

        let token = current.state.attempt + 1;
        if current.state.phase == RunPhase::Generating {
            tracing::info!(
                "⏭️ Attempt {} supersedes attempt {} (session {:?})",
                token,
                current.state.attempt,
                current.state.session_id
            );
        }

        current.state.reset_for(token, session_id);
        current.state.activate(Stage::Brief);
        current.cancel = CancellationToken::new();

        let attempt = Attempt {
            token,
            session_id: session_id.to_string(),
            cancel: current.cancel.clone(),
        };
        self.send(&attempt, "Generation started".to_string(), ProgressEvent::Started);
        self.send(
            &attempt,
            format!("Processing: {}", Stage::Brief.label()),
            ProgressEvent::StageActive { stage: Stage::Brief, index: 1 },
        );
        attempt
    }

    /// Applies `change` and publishes `event` if `attempt` is still current.
    /// Returns false for a stale attempt, in which case nothing happens.
    pub(crate) async fn transition<F>(
        &self,
        attempt: &Attempt,
        message: impl Into<String>,
        event: ProgressEvent,
        change: F,
    ) -> bool
    where
        F: FnOnce(&mut PipelineState),
    {
        let mut current = self.current.write().await;
        if current.state.attempt != attempt.token {
            tracing::debug!(
                "Discarding stale update from attempt {} (current {})",
                attempt.token,
                current.state.attempt
            );
            return false;
        }
        change(&mut current.state);
        self.send(attempt, message.into(), event);
        true
    }

    fn send(&self, attempt: &Attempt, message: String, event: ProgressEvent) {
        let update = ProgressUpdate {
            attempt: attempt.token,
            session_id: attempt.session_id.clone(),
            timestamp: Utc::now(),
            message,
            event,
        };
        // No subscribers is fine; the state snapshot stays authoritative.
        if self.progress.send(update).is_err() {
            tracing::trace!("No progress subscribers for attempt {}", attempt.token);
        }
    }
}

pub type SharedPipeline = Arc<Pipeline>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_activate_completes_earlier_stages() {
        let mut state = PipelineState::default();
        state.activate(Stage::Visuals);
        assert_eq!(state.stage_status(Stage::Brief), StageStatus::Complete);
        assert_eq!(state.stage_status(Stage::Script), StageStatus::Complete);
        assert_eq!(state.stage_status(Stage::Visuals), StageStatus::Active);
        assert_eq!(state.stage_status(Stage::Audio), StageStatus::Pending);
        assert_eq!(state.active_stage, 3);
    }

    #[test]
    fn test_fail_keeps_completed_stages() {
        let mut state = PipelineState::default();
        state.phase = RunPhase::Generating;
        state.activate(Stage::Audio);
        state.fail("boom".to_string());

        assert_eq!(state.phase, RunPhase::Idle);
        assert_eq!(state.active_stage, 0);
        assert_eq!(state.stage_status(Stage::Visuals), StageStatus::Complete);
        assert_eq!(state.stage_status(Stage::Audio), StageStatus::Pending);
        assert_eq!(state.last_error.as_deref(), Some("boom"));
    }

    #[test]
    fn test_status_line() {
        let mut state = PipelineState::default();
        assert_eq!(state.status_line(), "Ready");
        state.phase = RunPhase::Generating;
        state.activate(Stage::Script);
        assert_eq!(state.status_line(), "Processing: Scripting");
        state.finish("cinematic_9x16.mp4".to_string());
        assert_eq!(state.status_line(), "Export ready");
        assert_eq!(state.active_stage, 0);
    }
}
