// src/pipeline/generation.rs
//! Generation run executor: brief analysis, then the remaining stages in order.

use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use uuid::Uuid;

use super::sequencer::{Interrupt, StageResult, StageSequencer};
use super::{Attempt, AttemptToken, Pipeline, ProgressEvent};
use crate::brief_client::BriefAnalysisRequest;
use crate::config::DriveMode;
use crate::error::StudioError;
use crate::store::StepPayload;
use crate::types::{AdScript, AdvancedSettings, Stage, StepStatus};
use crate::voiceover_client::VoiceoverRequest;

/// Input for one generation run.
#[derive(Debug, Clone)]
pub struct GenerationRequest {
    /// Fully composed brief, options already appended.
    pub brief: String,
    pub settings: AdvancedSettings,
    /// Voice to narrate the script with; `None` skips the voiceover.
    pub voice_id: Option<String>,
}

impl GenerationRequest {
    pub fn new(brief: impl Into<String>) -> Self {
        Self {
            brief: brief.into(),
            settings: AdvancedSettings::default(),
            voice_id: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunOutcome {
    Completed,
    /// Carries the message shown to the user.
    Failed(String),
    Superseded,
}

pub struct GenerationTicket {
    pub attempt: AttemptToken,
    pub session_id: String,
    pub handle: JoinHandle<RunOutcome>,
}

impl Pipeline {
    /// Starts a new run in the background, superseding any run in flight.
    pub async fn start(self: &Arc<Self>, request: GenerationRequest) -> GenerationTicket {
        let session_id = Uuid::new_v4().to_string();
        let attempt = self.begin(&session_id).await;
        let token = attempt.token;

        tracing::info!(
            "🎬 Starting generation attempt {} (session {}, analyzer {})",
            token,
            session_id,
            self.analyzer.name()
        );

        let handle = tokio::spawn(run(Arc::clone(self), attempt, request));
        GenerationTicket {
            attempt: token,
            session_id,
            handle,
        }
    }
}

pub async fn run(
    pipeline: Arc<Pipeline>,
    attempt: Attempt,
    request: GenerationRequest,
) -> RunOutcome {
    let started = Instant::now();
    match drive(&pipeline, &attempt, &request).await {
        Ok(()) => {
            let preview = request.settings.preview_video();
            let applied = pipeline
                .transition(
                    &attempt,
                    "Export ready",
                    ProgressEvent::Completed { preview_video: preview.clone() },
                    |state| state.finish(preview),
                )
                .await;
            if applied {
                tracing::info!(
                    "✅ Generation attempt {} finished in {:.1}s",
                    attempt.token,
                    started.elapsed().as_secs_f64()
                );
                RunOutcome::Completed
            } else {
                RunOutcome::Superseded
            }
        }
        Err(Interrupt::Superseded) => {
            tracing::info!("⏹️ Generation attempt {} superseded", attempt.token);
            RunOutcome::Superseded
        }
        Err(Interrupt::Failed { stage, error }) => fail(&pipeline, &attempt, stage, error).await,
    }
}

async fn fail(
    pipeline: &Pipeline,
    attempt: &Attempt,
    stage: Stage,
    error: StudioError,
) -> RunOutcome {
    tracing::error!("❌ Generation attempt {} failed at {}: {}", attempt.token, stage, error);

    if let Err(e) = pipeline
        .store
        .record(&attempt.session_id, stage, StepStatus::Failed, None)
        .await
    {
        tracing::error!(
            "Failed to record {} failure for session {}: {}",
            stage,
            attempt.session_id,
            e
        );
    }

    let message = error.user_message();
    let notice = message.clone();
    let applied = pipeline
        .transition(
            attempt,
            message.clone(),
            ProgressEvent::Failed { message: message.clone() },
            |state| state.fail(notice),
        )
        .await;

    if applied {
        RunOutcome::Failed(message)
    } else {
        RunOutcome::Superseded
    }
}

async fn drive(
    pipeline: &Pipeline,
    attempt: &Attempt,
    request: &GenerationRequest,
) -> StageResult<()> {
    let sequencer = StageSequencer::new(pipeline, attempt);
    let session_id = attempt.session_id.as_str();

    pipeline
        .store
        .create_session(session_id)
        .await
        .map_err(Interrupt::failed(Stage::Brief))?;

    // Stage 1: the analysis call is the stage's work; the hold only pads it out.
    let started = Instant::now();
    let analysis_request = BriefAnalysisRequest {
        brief: request.brief.clone(),
        metadata: Some(request.settings.clone()),
    };
    let analysis = tokio::select! {
        _ = attempt.cancelled() => return Err(Interrupt::Superseded),
        result = pipeline.analyzer.analyze(&analysis_request) => {
            result.map_err(Interrupt::failed(Stage::Brief))?
        }
    };

    let info = analysis.extracted_info();
    let script = analysis.script;
    let applied = pipeline
        .transition(
            attempt,
            format!("Brief analyzed: {}", info.product_name),
            ProgressEvent::Analysis {
                extracted_info: info.clone(),
                script: script.clone(),
            },
            |state| {
                state.extracted_info = Some(info.clone());
                state.script = Some(script.clone());
            },
        )
        .await;
    if !applied {
        return Err(Interrupt::Superseded);
    }

    pipeline
        .store
        .record(
            session_id,
            Stage::Brief,
            StepStatus::Completed,
            Some(StepPayload {
                extracted_info: Some(info),
                ad_script: Some(script.clone()),
            }),
        )
        .await
        .map_err(Interrupt::failed(Stage::Brief))?;
    sequencer.hold(remaining(pipeline, Stage::Brief, started)).await?;
    sequencer.complete(Stage::Brief, false).await?;

    for stage in [Stage::Script, Stage::Visuals, Stage::Audio, Stage::Export] {
        sequencer.enter(stage).await?;
        let started = Instant::now();

        if stage == Stage::Audio {
            synthesize_voiceover(pipeline, attempt, request, &script).await?;
        }

        match (&pipeline.config.mode, stage) {
            (
                DriveMode::Polled { interval, max_attempts },
                Stage::Visuals | Stage::Audio | Stage::Export,
            ) => {
                sequencer.await_terminal(stage, *interval, *max_attempts).await?;
                sequencer.complete(stage, false).await?;
            }
            _ => {
                sequencer.hold(remaining(pipeline, stage, started)).await?;
                sequencer.complete(stage, true).await?;
            }
        }
    }

    Ok(())
}

fn remaining(pipeline: &Pipeline, stage: Stage, started: Instant) -> Duration {
    pipeline
        .config
        .stage_duration(stage.number() - 1)
        .saturating_sub(started.elapsed())
}

async fn synthesize_voiceover(
    pipeline: &Pipeline,
    attempt: &Attempt,
    request: &GenerationRequest,
    script: &AdScript,
) -> StageResult<()> {
    let Some(voice_id) = request.voice_id.as_deref() else {
        return Ok(());
    };
    let Some(synthesizer) = pipeline.voiceover.as_ref() else {
        tracing::warn!("Voiceover requested but no synthesis endpoint is configured, skipping");
        return Ok(());
    };

    let voiceover_request = VoiceoverRequest::new(script.narration())
        .with_voice(voice_id)
        .with_session(&attempt.session_id);

    let asset = tokio::select! {
        _ = attempt.cancelled() => return Err(Interrupt::Superseded),
        result = synthesizer.synthesize(&voiceover_request) => {
            result.map_err(Interrupt::failed(Stage::Audio))?
        }
    };

    let stored = asset.clone();
    let applied = pipeline
        .transition(
            attempt,
            format!("Voiceover ready: {}", asset.file_name),
            ProgressEvent::Voiceover { asset },
            |state| state.voiceover = Some(stored),
        )
        .await;
    if !applied {
        return Err(Interrupt::Superseded);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::brief_client::BriefAnalyzer;
    use crate::campaigns;
    use crate::config::PipelineConfig;
    use crate::error::StudioResult;
    use crate::pipeline::{ProgressUpdate, RunPhase};
    use crate::store::{MemoryStepStore, StepStatusStore};
    use crate::types::{BriefAnalysis, SessionStatus, StageStatus};
    use crate::voiceover_client::{DefaultVoices, VoiceoverAsset, VoiceoverSynthesizer};
    use async_trait::async_trait;
    use tokio::sync::broadcast;

    struct SlowAnalyzer {
        delay: Duration,
        fail: bool,
    }

    #[async_trait]
    impl BriefAnalyzer for SlowAnalyzer {
        async fn analyze(&self, request: &BriefAnalysisRequest) -> StudioResult<BriefAnalysis> {
            tokio::time::sleep(self.delay).await;
            if self.fail {
                return Err(StudioError::RateLimited("slow down".to_string()));
            }
            Ok(campaigns::find_best_campaign(&request.brief).analysis())
        }

        fn name(&self) -> &'static str {
            "slow"
        }
    }

    #[derive(Default)]
    struct RecordingSynthesizer {
        requests: std::sync::Mutex<Vec<VoiceoverRequest>>,
    }

    #[async_trait]
    impl VoiceoverSynthesizer for RecordingSynthesizer {
        async fn synthesize(&self, request: &VoiceoverRequest) -> StudioResult<VoiceoverAsset> {
            self.requests.lock().unwrap().push(request.clone());
            Ok(VoiceoverAsset {
                url: "https://cdn.example/voiceover-1.mp3".to_string(),
                file_name: "voiceover-1.mp3".to_string(),
            })
        }
    }

    fn ms(value: u64) -> Duration {
        Duration::from_millis(value)
    }

    fn pipeline(
        store: Arc<MemoryStepStore>,
        analyzer: SlowAnalyzer,
        config: PipelineConfig,
    ) -> Arc<Pipeline> {
        Arc::new(Pipeline::new(Arc::new(analyzer), None, store, config))
    }

    fn polled(max_attempts: u32) -> PipelineConfig {
        PipelineConfig {
            mode: DriveMode::Polled {
                interval: ms(2000),
                max_attempts,
            },
            ..PipelineConfig::default()
        }
    }

    fn drain(updates: &mut broadcast::Receiver<ProgressUpdate>) -> Vec<ProgressUpdate> {
        let mut drained = Vec::new();
        while let Ok(update) = updates.try_recv() {
            drained.push(update);
        }
        drained
    }

    fn activated(updates: &[ProgressUpdate]) -> Vec<Stage> {
        updates
            .iter()
            .filter_map(|u| match u.event {
                ProgressEvent::StageActive { stage, .. } => Some(stage),
                _ => None,
            })
            .collect()
    }

    #[tokio::test(start_paused = true)]
    async fn test_simulated_run_completes_every_stage_in_order() {
        let store = Arc::new(MemoryStepStore::new());
        let analyzer = SlowAnalyzer { delay: ms(500), fail: false };
        let pipeline = pipeline(store.clone(), analyzer, PipelineConfig::default());
        let mut updates = pipeline.subscribe();

        let ticket = pipeline.start(GenerationRequest::new("A luxury watch for collectors")).await;
        assert_eq!(ticket.handle.await.unwrap(), RunOutcome::Completed);

        let state = pipeline.snapshot().await;
        assert_eq!(state.phase, RunPhase::Complete);
        assert_eq!(state.active_stage, 0);
        assert!(state.stages.iter().all(|s| s.status == StageStatus::Complete));
        assert_eq!(state.preview_video.as_deref(), Some("cinematic_9x16.mp4"));
        assert_eq!(state.extracted_info.unwrap().product_name, "Aurelia Timepieces");

        let record = store.load_session(&ticket.session_id).await.unwrap().unwrap();
        assert_eq!(record.status, SessionStatus::Completed);
        assert!(record.ad_script.is_some());

        let updates = drain(&mut updates);
        assert_eq!(activated(&updates), Stage::ALL.to_vec());
    }

    #[tokio::test(start_paused = true)]
    async fn test_new_run_supersedes_pending_analysis() {
        let store = Arc::new(MemoryStepStore::new());
        let analyzer = SlowAnalyzer { delay: ms(1000), fail: false };
        let pipeline = pipeline(store.clone(), analyzer, PipelineConfig::default());
        let mut updates = pipeline.subscribe();

        let first = pipeline.start(GenerationRequest::new("watch")).await;
        tokio::time::sleep(ms(200)).await;
        let second = pipeline.start(GenerationRequest::new("snack")).await;

        assert_eq!(first.handle.await.unwrap(), RunOutcome::Superseded);
        assert_eq!(second.handle.await.unwrap(), RunOutcome::Completed);

        let state = pipeline.snapshot().await;
        assert_eq!(state.attempt, second.attempt);
        assert_eq!(state.session_id.as_deref(), Some(second.session_id.as_str()));
        assert_eq!(state.extracted_info.unwrap().product_name, "Verdant Cold Brew");

        let updates = drain(&mut updates);
        let completions = updates
            .iter()
            .filter(|u| matches!(u.event, ProgressEvent::Completed { .. }))
            .count();
        assert_eq!(completions, 1);

        let second_start = updates.iter().position(|u| u.attempt == second.attempt).unwrap();
        assert!(updates[second_start..].iter().all(|u| u.attempt == second.attempt));

        let stale = store.load_session(&first.session_id).await.unwrap().unwrap();
        assert_eq!(stale.steps[0].status, StepStatus::Pending);
        assert!(stale.extracted_info.is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_supersede_during_stage_hold() {
        let store = Arc::new(MemoryStepStore::new());
        let analyzer = SlowAnalyzer { delay: ms(10), fail: false };
        let pipeline = pipeline(store, analyzer, PipelineConfig::default());

        let first = pipeline.start(GenerationRequest::new("watch")).await;
        // brief (3.2s) + part of scripting (4s)
        tokio::time::sleep(ms(5000)).await;
        assert_eq!(pipeline.snapshot().await.active_stage, 2);

        let second = pipeline.start(GenerationRequest::new("watch")).await;
        let state = pipeline.snapshot().await;
        assert_eq!(state.active_stage, 1);
        assert_eq!(state.stage_status(Stage::Script), StageStatus::Pending);

        assert_eq!(first.handle.await.unwrap(), RunOutcome::Superseded);
        assert_eq!(second.handle.await.unwrap(), RunOutcome::Completed);
    }

    #[tokio::test(start_paused = true)]
    async fn test_analysis_failure_never_reaches_later_stages() {
        let store = Arc::new(MemoryStepStore::new());
        let analyzer = SlowAnalyzer { delay: ms(100), fail: true };
        let pipeline = pipeline(store.clone(), analyzer, PipelineConfig::default());
        let mut updates = pipeline.subscribe();

        let ticket = pipeline.start(GenerationRequest::new("anything")).await;
        assert_eq!(
            ticket.handle.await.unwrap(),
            RunOutcome::Failed("Rate limit exceeded. Please try again in a moment.".to_string())
        );

        let state = pipeline.snapshot().await;
        assert_eq!(state.phase, RunPhase::Idle);
        assert_eq!(state.active_stage, 0);
        assert!(state.stages.iter().all(|s| s.status == StageStatus::Pending));
        assert!(state.last_error.is_some());

        assert_eq!(
            store.step_status(&ticket.session_id, Stage::Brief).await.unwrap(),
            Some(StepStatus::Failed)
        );
        assert_eq!(
            store.step_status(&ticket.session_id, Stage::Script).await.unwrap(),
            Some(StepStatus::Pending)
        );

        let updates = drain(&mut updates);
        assert_eq!(activated(&updates), vec![Stage::Brief]);
        let failures = updates
            .iter()
            .filter(|u| matches!(u.event, ProgressEvent::Failed { .. }))
            .count();
        assert_eq!(failures, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_polled_failure_halts_before_export() {
        let store = Arc::new(MemoryStepStore::new());
        let analyzer = SlowAnalyzer { delay: ms(100), fail: false };
        let pipeline = pipeline(store.clone(), analyzer, polled(90));
        let mut updates = pipeline.subscribe();

        let ticket = pipeline.start(GenerationRequest::new("fitness tracker")).await;
        store.force_status(&ticket.session_id, Stage::Visuals, StepStatus::Completed).await;
        store.force_status(&ticket.session_id, Stage::Audio, StepStatus::Failed).await;

        assert_eq!(
            ticket.handle.await.unwrap(),
            RunOutcome::Failed("Audio failed. Please try again.".to_string())
        );

        let state = pipeline.snapshot().await;
        assert_eq!(state.phase, RunPhase::Idle);
        assert_eq!(state.stage_status(Stage::Visuals), StageStatus::Complete);
        assert_eq!(state.stage_status(Stage::Audio), StageStatus::Pending);
        assert_eq!(state.stage_status(Stage::Export), StageStatus::Pending);

        let record = store.load_session(&ticket.session_id).await.unwrap().unwrap();
        assert_eq!(record.status, SessionStatus::Failed);
        assert_eq!(record.steps[4].status, StepStatus::Pending);

        let updates = drain(&mut updates);
        assert!(!activated(&updates).contains(&Stage::Export));
    }

    #[tokio::test(start_paused = true)]
    async fn test_polling_is_bounded() {
        let store = Arc::new(MemoryStepStore::new());
        let analyzer = SlowAnalyzer { delay: ms(100), fail: false };
        let pipeline = pipeline(store.clone(), analyzer, polled(3));

        let ticket = pipeline.start(GenerationRequest::new("gadget")).await;
        assert_eq!(
            ticket.handle.await.unwrap(),
            RunOutcome::Failed("Visuals is taking too long. Please try again.".to_string())
        );
        assert_eq!(
            store.step_status(&ticket.session_id, Stage::Visuals).await.unwrap(),
            Some(StepStatus::Failed)
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_zero_poll_bound_still_checks_the_store() {
        let store = Arc::new(MemoryStepStore::new());
        let analyzer = SlowAnalyzer { delay: ms(100), fail: false };
        let pipeline = pipeline(store.clone(), analyzer, polled(0));

        let ticket = pipeline.start(GenerationRequest::new("gadget")).await;
        for stage in [Stage::Visuals, Stage::Audio, Stage::Export] {
            store.force_status(&ticket.session_id, stage, StepStatus::Completed).await;
        }

        assert_eq!(ticket.handle.await.unwrap(), RunOutcome::Completed);
        assert_eq!(pipeline.snapshot().await.phase, RunPhase::Complete);
    }

    #[tokio::test(start_paused = true)]
    async fn test_audio_stage_synthesizes_script_narration() {
        let store = Arc::new(MemoryStepStore::new());
        let synthesizer = Arc::new(RecordingSynthesizer::default());
        let pipeline = Arc::new(Pipeline::new(
            Arc::new(SlowAnalyzer { delay: ms(100), fail: false }),
            Some(synthesizer.clone()),
            store,
            PipelineConfig::default(),
        ));

        let mut request = GenerationRequest::new("protein snack");
        request.voice_id = Some(DefaultVoices::RACHEL.to_string());
        let ticket = pipeline.start(request).await;
        assert_eq!(ticket.handle.await.unwrap(), RunOutcome::Completed);

        let state = pipeline.snapshot().await;
        assert_eq!(state.voiceover.unwrap().file_name, "voiceover-1.mp3");

        let requests = synthesizer.requests.lock().unwrap();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].voice_id, DefaultVoices::RACHEL);
        assert_eq!(requests[0].session_id.as_deref(), Some(ticket.session_id.as_str()));
        assert_eq!(requests[0].text, state.script.unwrap().narration());
    }
}
