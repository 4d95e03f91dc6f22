// In-memory step store, used when no database is configured and in tests
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use tokio::sync::RwLock;

use super::{SessionRecord, SessionSummary, StepPayload, StepRecord, StepStatusStore};
use crate::error::StudioResult;
use crate::types::{AdScript, ExtractedInfo, Stage, StepStatus};

#[derive(Debug, Clone)]
struct StoredSession {
    created_at: DateTime<Utc>,
    steps: HashMap<Stage, StepRecord>,
    extracted_info: Option<ExtractedInfo>,
    ad_script: Option<AdScript>,
}

impl StoredSession {
    fn to_record(&self, session_id: &str) -> SessionRecord {
        SessionRecord::assemble(
            session_id.to_string(),
            self.created_at,
            self.steps.values().cloned().collect(),
            self.extracted_info.clone(),
            self.ad_script.clone(),
        )
    }
}

#[derive(Default)]
pub struct MemoryStepStore {
    sessions: RwLock<HashMap<String, StoredSession>>,
}

impl MemoryStepStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Overwrites a step regardless of its current status. Stands in for the
    /// external workers that drive polled stages.
    pub async fn force_status(&self, session_id: &str, step: Stage, status: StepStatus) {
        let mut sessions = self.sessions.write().await;
        let session = sessions
            .entry(session_id.to_string())
            .or_insert_with(|| new_session(Utc::now()));
        session.steps.insert(
            step,
            StepRecord {
                step,
                status,
                updated_at: Utc::now(),
            },
        );
    }
}

fn new_session(now: DateTime<Utc>) -> StoredSession {
    StoredSession {
        created_at: now,
        steps: HashMap::new(),
        extracted_info: None,
        ad_script: None,
    }
}

#[async_trait]
impl StepStatusStore for MemoryStepStore {
    async fn create_session(&self, session_id: &str) -> StudioResult<()> {
        let now = Utc::now();
        let mut sessions = self.sessions.write().await;
        let session = sessions
            .entry(session_id.to_string())
            .or_insert_with(|| new_session(now));
        for stage in Stage::ALL {
            session.steps.entry(stage).or_insert(StepRecord {
                step: stage,
                status: StepStatus::Pending,
                updated_at: now,
            });
        }
        Ok(())
    }

    async fn record(
        &self,
        session_id: &str,
        step: Stage,
        status: StepStatus,
        payload: Option<StepPayload>,
    ) -> StudioResult<bool> {
        let now = Utc::now();
        let mut sessions = self.sessions.write().await;
        let session = sessions
            .entry(session_id.to_string())
            .or_insert_with(|| new_session(now));

        let current = session.steps.get(&step).map(|r| r.status);
        if current.map(|s| s.is_terminal()).unwrap_or(false) {
            tracing::debug!("Ignoring {} -> {} for session {}: step already terminal", step, status.as_str(), session_id);
            return Ok(false);
        }

        session.steps.insert(step, StepRecord { step, status, updated_at: now });
        if let Some(payload) = payload {
            if payload.extracted_info.is_some() {
                session.extracted_info = payload.extracted_info;
            }
            if payload.ad_script.is_some() {
                session.ad_script = payload.ad_script;
            }
        }
        Ok(true)
    }

    async fn step_status(&self, session_id: &str, step: Stage) -> StudioResult<Option<StepStatus>> {
        let sessions = self.sessions.read().await;
        Ok(sessions
            .get(session_id)
            .and_then(|s| s.steps.get(&step))
            .map(|r| r.status))
    }

    async fn load_session(&self, session_id: &str) -> StudioResult<Option<SessionRecord>> {
        let sessions = self.sessions.read().await;
        Ok(sessions.get(session_id).map(|s| s.to_record(session_id)))
    }

    async fn list_sessions(&self, limit: i64) -> StudioResult<Vec<SessionSummary>> {
        let sessions = self.sessions.read().await;
        let mut records: Vec<SessionRecord> = sessions
            .iter()
            .map(|(id, session)| session.to_record(id))
            .collect();
        records.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(records
            .iter()
            .take(limit.max(0) as usize)
            .map(SessionSummary::from)
            .collect())
    }

    fn backend(&self) -> &'static str {
        "memory"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::SessionStatus;

    fn info() -> ExtractedInfo {
        ExtractedInfo {
            product_name: "Verdant Cold Brew".to_string(),
            audience: "Gen Z".to_string(),
            tone: "Fresh".to_string(),
            duration: "15s".to_string(),
        }
    }

    #[tokio::test]
    async fn test_session_lifecycle_and_derived_status() {
        let store = MemoryStepStore::new();
        store.create_session("s1").await.unwrap();

        let record = store.load_session("s1").await.unwrap().unwrap();
        assert_eq!(record.steps.len(), 5);
        assert_eq!(record.status, SessionStatus::Pending);
        assert_eq!(record.steps[0].step, Stage::Brief);

        let payload = StepPayload { extracted_info: Some(info()), ad_script: None };
        assert!(store.record("s1", Stage::Brief, StepStatus::Completed, Some(payload)).await.unwrap());
        for stage in &Stage::ALL[1..] {
            store.record("s1", *stage, StepStatus::Completed, None).await.unwrap();
        }

        let record = store.load_session("s1").await.unwrap().unwrap();
        assert_eq!(record.status, SessionStatus::Completed);
        assert_eq!(record.extracted_info, Some(info()));
    }

    #[tokio::test]
    async fn test_terminal_steps_never_regress() {
        let store = MemoryStepStore::new();
        store.create_session("s1").await.unwrap();
        store.record("s1", Stage::Visuals, StepStatus::Completed, None).await.unwrap();

        assert!(!store.record("s1", Stage::Visuals, StepStatus::Pending, None).await.unwrap());
        assert!(!store.record("s1", Stage::Visuals, StepStatus::Failed, None).await.unwrap());
        assert_eq!(
            store.step_status("s1", Stage::Visuals).await.unwrap(),
            Some(StepStatus::Completed)
        );

        // re-creating the session does not reset progress
        store.create_session("s1").await.unwrap();
        assert_eq!(
            store.step_status("s1", Stage::Visuals).await.unwrap(),
            Some(StepStatus::Completed)
        );
    }

    #[tokio::test]
    async fn test_listing_is_newest_first_and_limited() {
        let store = MemoryStepStore::new();
        store.create_session("old").await.unwrap();
        tokio::time::sleep(std::time::Duration::from_millis(5)).await;
        store.create_session("new").await.unwrap();
        store.record("old", Stage::Brief, StepStatus::Failed, None).await.unwrap();

        let listing = store.list_sessions(10).await.unwrap();
        assert_eq!(listing[0].session_id, "new");
        assert_eq!(listing[1].status, SessionStatus::Failed);
        assert_eq!(store.list_sessions(1).await.unwrap().len(), 1);
        assert!(store.load_session("missing").await.unwrap().is_none());
    }
}
