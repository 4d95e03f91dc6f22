// Postgres-backed step store (generation_steps table)
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{FromRow, PgPool};
use tracing::{debug, error};

use super::{SessionRecord, SessionSummary, StepPayload, StepRecord, StepStatusStore};
use crate::error::{StudioError, StudioResult};
use crate::types::{AdScript, ExtractedInfo, SessionStatus, Stage, StepStatus};

#[derive(Debug, FromRow)]
struct StepRow {
    step: String,
    status: String,
    extracted_info: Option<serde_json::Value>,
    ad_script: Option<serde_json::Value>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

#[derive(Debug, FromRow)]
struct SummaryRow {
    session_id: String,
    created_at: DateTime<Utc>,
    any_failed: Option<bool>,
    all_completed: Option<bool>,
    product_name: Option<String>,
}

pub struct PgStepStore {
    pool: PgPool,
}

impl PgStepStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn parse_status(raw: &str) -> StudioResult<StepStatus> {
    StepStatus::parse(raw)
        .ok_or_else(|| StudioError::MalformedResponse(format!("unknown step status '{}'", raw)))
}

#[async_trait]
impl StepStatusStore for PgStepStore {
    async fn create_session(&self, session_id: &str) -> StudioResult<()> {
        let mut tx = self.pool.begin().await?;
        for stage in Stage::ALL {
            sqlx::query(
                r#"
                INSERT INTO generation_steps (session_id, step, status, created_at, updated_at)
                VALUES ($1, $2, 'pending', NOW(), NOW())
                ON CONFLICT (session_id, step) DO NOTHING
                "#,
            )
            .bind(session_id)
            .bind(stage.as_str())
            .execute(&mut *tx)
            .await?;
        }
        tx.commit().await?;
        debug!("Created step rows for session {}", session_id);
        Ok(())
    }

    async fn record(
        &self,
        session_id: &str,
        step: Stage,
        status: StepStatus,
        payload: Option<StepPayload>,
    ) -> StudioResult<bool> {
        let payload = payload.unwrap_or_default();
        let extracted_info = payload.extracted_info.map(serde_json::to_value).transpose()?;
        let ad_script = payload.ad_script.map(serde_json::to_value).transpose()?;

        // Terminal rows are never touched again.
        let result = sqlx::query(
            r#"
            INSERT INTO generation_steps
                (session_id, step, status, extracted_info, ad_script, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, NOW(), NOW())
            ON CONFLICT (session_id, step) DO UPDATE
            SET status = EXCLUDED.status,
                extracted_info = COALESCE(EXCLUDED.extracted_info, generation_steps.extracted_info),
                ad_script = COALESCE(EXCLUDED.ad_script, generation_steps.ad_script),
                updated_at = NOW()
            WHERE generation_steps.status = 'pending'
            "#,
        )
        .bind(session_id)
        .bind(step.as_str())
        .bind(status.as_str())
        .bind(extracted_info)
        .bind(ad_script)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            error!("Failed to record step {} for session {}: {}", step, session_id, e);
            e
        })?;

        Ok(result.rows_affected() > 0)
    }

    async fn step_status(&self, session_id: &str, step: Stage) -> StudioResult<Option<StepStatus>> {
        let raw: Option<String> = sqlx::query_scalar(
            "SELECT status FROM generation_steps WHERE session_id = $1 AND step = $2",
        )
        .bind(session_id)
        .bind(step.as_str())
        .fetch_optional(&self.pool)
        .await?;

        raw.as_deref().map(parse_status).transpose()
    }

    async fn load_session(&self, session_id: &str) -> StudioResult<Option<SessionRecord>> {
        let rows = sqlx::query_as::<_, StepRow>(
            r#"
            SELECT step, status, extracted_info, ad_script, created_at, updated_at
            FROM generation_steps
            WHERE session_id = $1
            "#,
        )
        .bind(session_id)
        .fetch_all(&self.pool)
        .await?;

        if rows.is_empty() {
            return Ok(None);
        }

        let created_at = rows.iter().map(|r| r.created_at).min().unwrap_or_else(Utc::now);
        let mut extracted_info: Option<ExtractedInfo> = None;
        let mut ad_script: Option<AdScript> = None;
        let mut steps = Vec::with_capacity(rows.len());

        for row in rows {
            let Some(step) = Stage::parse(&row.step) else {
                debug!("Skipping unknown step '{}' in session {}", row.step, session_id);
                continue;
            };
            if let Some(value) = row.extracted_info {
                extracted_info = Some(serde_json::from_value(value)?);
            }
            if let Some(value) = row.ad_script {
                ad_script = Some(serde_json::from_value(value)?);
            }
            steps.push(StepRecord {
                step,
                status: parse_status(&row.status)?,
                updated_at: row.updated_at,
            });
        }

        Ok(Some(SessionRecord::assemble(
            session_id.to_string(),
            created_at,
            steps,
            extracted_info,
            ad_script,
        )))
    }

    async fn list_sessions(&self, limit: i64) -> StudioResult<Vec<SessionSummary>> {
        let rows = sqlx::query_as::<_, SummaryRow>(
            r#"
            SELECT session_id,
                   MIN(created_at) AS created_at,
                   BOOL_OR(status = 'failed') AS any_failed,
                   BOOL_AND(status = 'completed') AS all_completed,
                   MAX(extracted_info ->> 'productName') AS product_name
            FROM generation_steps
            GROUP BY session_id
            ORDER BY MIN(created_at) DESC
            LIMIT $1
            "#,
        )
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .map(|row| SessionSummary {
                session_id: row.session_id,
                created_at: row.created_at,
                status: if row.any_failed.unwrap_or(false) {
                    SessionStatus::Failed
                } else if row.all_completed.unwrap_or(false) {
                    SessionStatus::Completed
                } else {
                    SessionStatus::Pending
                },
                product_name: row.product_name,
            })
            .collect())
    }

    fn backend(&self) -> &'static str {
        "postgres"
    }
}
