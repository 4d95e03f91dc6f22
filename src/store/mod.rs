// src/store/mod.rs
//! Session/step status store.
//!
//! One row per `(session_id, step)`. A step leaves `pending` at most once:
//! `completed` and `failed` are terminal, so writes against a terminal step are
//! ignored. The brief step carries the extracted info and script payloads used
//! to reload a session from history.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::error::StudioResult;
use crate::types::{AdScript, ExtractedInfo, SessionStatus, Stage, StepStatus};

pub mod memory;
pub mod postgres;

pub use memory::MemoryStepStore;
pub use postgres::PgStepStore;

/// Payloads stored alongside a step for history reload.
#[derive(Debug, Clone, Default)]
pub struct StepPayload {
    pub extracted_info: Option<ExtractedInfo>,
    pub ad_script: Option<AdScript>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StepRecord {
    pub step: Stage,
    pub status: StepStatus,
    pub updated_at: DateTime<Utc>,
}

/// Everything the store knows about one session.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionRecord {
    pub session_id: String,
    pub created_at: DateTime<Utc>,
    pub status: SessionStatus,
    pub steps: Vec<StepRecord>,
    pub extracted_info: Option<ExtractedInfo>,
    pub ad_script: Option<AdScript>,
}

impl SessionRecord {
    /// Orders steps by pipeline position and derives the overall status.
    pub fn assemble(
        session_id: String,
        created_at: DateTime<Utc>,
        mut steps: Vec<StepRecord>,
        extracted_info: Option<ExtractedInfo>,
        ad_script: Option<AdScript>,
    ) -> Self {
        steps.sort_by_key(|s| s.step.number());
        let status = SessionStatus::derive(steps.iter().map(|s| &s.status));
        Self {
            session_id,
            created_at,
            status,
            steps,
            extracted_info,
            ad_script,
        }
    }
}

/// Row in the history listing.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionSummary {
    pub session_id: String,
    pub created_at: DateTime<Utc>,
    pub status: SessionStatus,
    pub product_name: Option<String>,
}

impl From<&SessionRecord> for SessionSummary {
    fn from(record: &SessionRecord) -> Self {
        Self {
            session_id: record.session_id.clone(),
            created_at: record.created_at,
            status: record.status,
            product_name: record.extracted_info.as_ref().map(|i| i.product_name.clone()),
        }
    }
}

#[async_trait]
pub trait StepStatusStore: Send + Sync {
    /// Inserts a `pending` row for every stage. Existing rows are left alone.
    async fn create_session(&self, session_id: &str) -> StudioResult<()>;

    /// Moves a pending step to `status`. Returns false when the step was already terminal.
    async fn record(
        &self,
        session_id: &str,
        step: Stage,
        status: StepStatus,
        payload: Option<StepPayload>,
    ) -> StudioResult<bool>;

    async fn step_status(&self, session_id: &str, step: Stage) -> StudioResult<Option<StepStatus>>;

    async fn load_session(&self, session_id: &str) -> StudioResult<Option<SessionRecord>>;

    /// Most recent sessions first.
    async fn list_sessions(&self, limit: i64) -> StudioResult<Vec<SessionSummary>>;

    fn backend(&self) -> &'static str;
}
