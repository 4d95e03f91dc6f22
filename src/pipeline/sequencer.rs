// src/pipeline/sequencer.rs
//! Moves one attempt through its stages: timed holds, store polling and the
//! view/store bookkeeping around each stage boundary.

use std::time::Duration;

use super::{Attempt, Pipeline, ProgressEvent};
use crate::error::StudioError;
use crate::types::{Stage, StepStatus};

/// Why an attempt stopped before finishing.
#[derive(Debug)]
pub enum Interrupt {
    /// A newer attempt took over; nothing more may be applied.
    Superseded,
    Failed { stage: Stage, error: StudioError },
}

impl Interrupt {
    pub fn failed(stage: Stage) -> impl FnOnce(StudioError) -> Interrupt {
        move |error| Interrupt::Failed { stage, error }
    }
}

pub type StageResult<T> = Result<T, Interrupt>;

pub struct StageSequencer<'a> {
    pipeline: &'a Pipeline,
    attempt: &'a Attempt,
}

impl<'a> StageSequencer<'a> {
    pub fn new(pipeline: &'a Pipeline, attempt: &'a Attempt) -> Self {
        Self { pipeline, attempt }
    }

    fn ensure_current(&self) -> StageResult<()> {
        if self.attempt.is_cancelled() {
            return Err(Interrupt::Superseded);
        }
        Ok(())
    }

    /// Marks `stage` active; everything before it becomes complete.
    pub async fn enter(&self, stage: Stage) -> StageResult<()> {
        self.ensure_current()?;
        let applied = self
            .pipeline
            .transition(
                self.attempt,
                format!("Processing: {}", stage.label()),
                ProgressEvent::StageActive { stage, index: stage.number() },
                |state| state.activate(stage),
            )
            .await;
        if !applied {
            return Err(Interrupt::Superseded);
        }
        tracing::info!("▶️ [{}] {} started", self.attempt.session_id, stage.label());
        Ok(())
    }

    /// Holds the active stage for `duration`, waking early on supersession.
    pub async fn hold(&self, duration: Duration) -> StageResult<()> {
        tokio::select! {
            _ = self.attempt.cancelled() => Err(Interrupt::Superseded),
            _ = tokio::time::sleep(duration) => Ok(()),
        }
    }

    /// Polls the store until `stage` reaches a terminal status. The store is
    /// always checked at least once.
    pub async fn await_terminal(
        &self,
        stage: Stage,
        interval: Duration,
        max_attempts: u32,
    ) -> StageResult<()> {
        let store = &self.pipeline.store;
        let max_attempts = max_attempts.max(1);
        for check in 1..=max_attempts {
            self.ensure_current()?;
            let status = store
                .step_status(&self.attempt.session_id, stage)
                .await
                .map_err(Interrupt::failed(stage))?;

            match status {
                Some(StepStatus::Completed) => {
                    tracing::debug!(
                        "[{}] {} completed after {} checks",
                        self.attempt.session_id,
                        stage,
                        check
                    );
                    return Ok(());
                }
                Some(StepStatus::Failed) => {
                    tracing::warn!(
                        "❌ [{}] {} reported failed by the status store",
                        self.attempt.session_id,
                        stage
                    );
                    return Err(Interrupt::Failed {
                        stage,
                        error: StudioError::StageFailed { stage },
                    });
                }
                Some(StepStatus::Pending) | None => {}
            }

            if check < max_attempts {
                self.hold(interval).await?;
            }
        }

        Err(Interrupt::Failed {
            stage,
            error: StudioError::PollTimeout { stage, attempts: max_attempts },
        })
    }

    /// Persists `stage` as completed and marks it complete in the view.
    pub async fn complete(&self, stage: Stage, persist: bool) -> StageResult<()> {
        self.ensure_current()?;
        if persist {
            self.pipeline
                .store
                .record(&self.attempt.session_id, stage, StepStatus::Completed, None)
                .await
                .map_err(Interrupt::failed(stage))?;
        }
        let applied = self
            .pipeline
            .transition(
                self.attempt,
                format!("{} complete", stage.label()),
                ProgressEvent::StageComplete { stage },
                |state| state.complete_stage(stage),
            )
            .await;
        if !applied {
            return Err(Interrupt::Superseded);
        }
        Ok(())
    }
}
