// Postgres persistence for investigations, branches, evidence and hypotheses.

use std::collections::HashSet;

use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use tracing::warn;
use uuid::Uuid;

use timelineforge_common::{
    Branch, Event, EventStatus, Evidence, EvidenceType, Hypothesis, HypothesisStatus,
    InvestigationLog, LogLevel, Merge, MAIN_BRANCH_COLOR, MAIN_BRANCH_NAME, TOTAL_PHASES,
};

use crate::error::{Result, StoreError};
use crate::rows::{BranchRow, EventRow, EvidenceRow, HypothesisRow, LogRow, MergeRow};

#[derive(Clone)]
pub struct Store {
    pool: PgPool,
}

/// Parameters for inserting a new branch.
pub struct NewBranch {
    pub event_id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub confidence_score: f64,
    pub color: String,
    pub position_z: f64,
}

/// Parameters for inserting a new evidence node.
pub struct NewEvidence {
    pub event_id: Uuid,
    pub branch_id: Uuid,
    pub title: String,
    pub content: Option<String>,
    pub evidence_type: EvidenceType,
    pub source_url: Option<String>,
    pub source_credibility: f64,
    pub ai_analysis: Option<serde_json::Value>,
    pub position_x: f64,
    pub position_y: f64,
}

/// Parameters for inserting a new hypothesis.
pub struct NewHypothesis {
    pub branch_id: Uuid,
    pub claim: String,
    pub testable_prediction: Option<String>,
    pub confidence_impact: f64,
    pub reasoning: Option<String>,
}

impl Store {
    pub async fn connect(database_url: &str) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(10)
            .connect(database_url)
            .await?;
        Ok(Self { pool })
    }

    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Run the embedded SQL migrations.
    pub async fn migrate(&self) -> Result<()> {
        sqlx::migrate!("./migrations").run(&self.pool).await?;
        Ok(())
    }

    // --- Events ---

    /// Create an event together with its main branch. The pair is inserted in
    /// one transaction so an event is never visible without a main branch.
    pub async fn create_event(
        &self,
        user_id: Uuid,
        title: &str,
        description: &str,
    ) -> Result<(Event, Branch)> {
        let mut tx = self.pool.begin().await?;

        let event = sqlx::query_as::<_, EventRow>(
            r#"
            INSERT INTO events (user_id, title, description, total_phases)
            VALUES ($1, $2, $3, $4)
            RETURNING id, user_id, title, description, status::text AS status,
                      current_phase, total_phases, created_at, updated_at
            "#,
        )
        .bind(user_id)
        .bind(title)
        .bind(description)
        .bind(TOTAL_PHASES)
        .fetch_one(&mut *tx)
        .await?
        .into_event()?;

        let main = sqlx::query_as::<_, BranchRow>(
            r#"
            INSERT INTO branches (event_id, name, color, is_main)
            VALUES ($1, $2, $3, true)
            RETURNING *
            "#,
        )
        .bind(event.id)
        .bind(MAIN_BRANCH_NAME)
        .bind(MAIN_BRANCH_COLOR)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;

        Ok((event, main.into()))
    }

    pub async fn get_event(&self, id: Uuid) -> Result<Option<Event>> {
        let row = sqlx::query_as::<_, EventRow>(
            r#"
            SELECT id, user_id, title, description, status::text AS status,
                   current_phase, total_phases, created_at, updated_at
            FROM events
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(EventRow::into_event).transpose()
    }

    /// Advance an event's phase counter, optionally moving it to a new status.
    pub async fn update_event_progress(
        &self,
        id: Uuid,
        phase: i32,
        status: Option<EventStatus>,
    ) -> Result<()> {
        match status {
            Some(status) => {
                sqlx::query(
                    r#"
                    UPDATE events
                    SET current_phase = $2, status = $3::event_status, updated_at = now()
                    WHERE id = $1
                    "#,
                )
                .bind(id)
                .bind(phase)
                .bind(status.to_string())
                .execute(&self.pool)
                .await?;
            }
            None => {
                sqlx::query(
                    r#"
                    UPDATE events
                    SET current_phase = $2, updated_at = now()
                    WHERE id = $1
                    "#,
                )
                .bind(id)
                .bind(phase)
                .execute(&self.pool)
                .await?;
            }
        }
        Ok(())
    }

    /// Events currently mid-investigation, oldest first.
    pub async fn list_active_events(&self) -> Result<Vec<Event>> {
        let rows = sqlx::query_as::<_, EventRow>(
            r#"
            SELECT id, user_id, title, description, status::text AS status,
                   current_phase, total_phases, created_at, updated_at
            FROM events
            WHERE status IN ('collecting', 'analyzing')
            ORDER BY updated_at ASC
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(EventRow::into_event).collect()
    }

    // --- Branches ---

    pub async fn branches_for_event(&self, event_id: Uuid) -> Result<Vec<Branch>> {
        let rows = sqlx::query_as::<_, BranchRow>(
            r#"
            SELECT * FROM branches
            WHERE event_id = $1
            ORDER BY created_at ASC
            "#,
        )
        .bind(event_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(Branch::from).collect())
    }

    pub async fn get_branch(&self, id: Uuid) -> Result<Option<Branch>> {
        let row = sqlx::query_as::<_, BranchRow>("SELECT * FROM branches WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.map(Branch::from))
    }

    pub async fn create_branch(&self, b: NewBranch) -> Result<Branch> {
        let row = sqlx::query_as::<_, BranchRow>(
            r#"
            INSERT INTO branches
                (event_id, name, description, confidence_score, color, position_z)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING *
            "#,
        )
        .bind(b.event_id)
        .bind(&b.name)
        .bind(&b.description)
        .bind(b.confidence_score)
        .bind(&b.color)
        .bind(b.position_z)
        .fetch_one(&self.pool)
        .await?;

        Ok(row.into())
    }

    pub async fn update_branch_confidence(&self, id: Uuid, score: f64) -> Result<()> {
        sqlx::query("UPDATE branches SET confidence_score = $2 WHERE id = $1")
            .bind(id)
            .bind(score)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    // --- Evidence ---

    /// Source URLs already attached to an event, for dedup during collection.
    pub async fn evidence_urls(&self, event_id: Uuid) -> Result<HashSet<String>> {
        let urls = sqlx::query_scalar::<_, String>(
            r#"
            SELECT source_url FROM evidence
            WHERE event_id = $1 AND source_url IS NOT NULL
            "#,
        )
        .bind(event_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(urls.into_iter().collect())
    }

    pub async fn evidence_count(&self, event_id: Uuid) -> Result<i64> {
        let count =
            sqlx::query_scalar::<_, i64>("SELECT count(*) FROM evidence WHERE event_id = $1")
                .bind(event_id)
                .fetch_one(&self.pool)
                .await?;
        Ok(count)
    }

    pub async fn insert_evidence(&self, e: NewEvidence) -> Result<Evidence> {
        let row = sqlx::query_as::<_, EvidenceRow>(
            r#"
            INSERT INTO evidence
                (event_id, branch_id, title, content, evidence_type, source_url,
                 source_credibility, ai_analysis, position_x, position_y)
            VALUES ($1, $2, $3, $4, $5::evidence_type, $6, $7, $8, $9, $10)
            RETURNING id, event_id, branch_id, title, content,
                      evidence_type::text AS evidence_type, source_url,
                      source_credibility, ai_analysis, parent_id,
                      position_x, position_y, created_at
            "#,
        )
        .bind(e.event_id)
        .bind(e.branch_id)
        .bind(&e.title)
        .bind(&e.content)
        .bind(e.evidence_type.to_string())
        .bind(&e.source_url)
        .bind(e.source_credibility)
        .bind(&e.ai_analysis)
        .bind(e.position_x)
        .bind(e.position_y)
        .fetch_one(&self.pool)
        .await?;

        row.into_evidence()
    }

    pub async fn evidence_for_event(&self, event_id: Uuid) -> Result<Vec<Evidence>> {
        let rows = sqlx::query_as::<_, EvidenceRow>(
            r#"
            SELECT id, event_id, branch_id, title, content,
                   evidence_type::text AS evidence_type, source_url,
                   source_credibility, ai_analysis, parent_id,
                   position_x, position_y, created_at
            FROM evidence
            WHERE event_id = $1
            ORDER BY created_at ASC
            "#,
        )
        .bind(event_id)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(EvidenceRow::into_evidence).collect()
    }

    pub async fn branch_credibility_scores(&self, branch_id: Uuid) -> Result<Vec<f64>> {
        let scores = sqlx::query_scalar::<_, f64>(
            "SELECT source_credibility FROM evidence WHERE branch_id = $1",
        )
        .bind(branch_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(scores)
    }

    // --- Hypotheses ---

    pub async fn insert_hypothesis(&self, h: NewHypothesis) -> Result<Hypothesis> {
        let row = sqlx::query_as::<_, HypothesisRow>(
            r#"
            INSERT INTO hypotheses
                (branch_id, claim, testable_prediction, confidence_impact, reasoning)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING id, branch_id, claim, testable_prediction, status::text AS status,
                      confidence_impact, reasoning, created_at, updated_at
            "#,
        )
        .bind(h.branch_id)
        .bind(&h.claim)
        .bind(&h.testable_prediction)
        .bind(h.confidence_impact)
        .bind(&h.reasoning)
        .fetch_one(&self.pool)
        .await?;

        row.into_hypothesis()
    }

    /// A hypothesis with its branch and owning event, for ownership checks.
    pub async fn get_hypothesis_context(
        &self,
        id: Uuid,
    ) -> Result<Option<(Hypothesis, Branch, Event)>> {
        let Some(row) = sqlx::query_as::<_, HypothesisRow>(
            r#"
            SELECT id, branch_id, claim, testable_prediction, status::text AS status,
                   confidence_impact, reasoning, created_at, updated_at
            FROM hypotheses
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?
        else {
            return Ok(None);
        };

        let hypothesis = row.into_hypothesis()?;

        let branch = self
            .get_branch(hypothesis.branch_id)
            .await?
            .ok_or_else(|| StoreError::Corrupt(format!("hypothesis {id} has no branch")))?;

        let event = self
            .get_event(branch.event_id)
            .await?
            .ok_or_else(|| StoreError::Corrupt(format!("branch {} has no event", branch.id)))?;

        Ok(Some((hypothesis, branch, event)))
    }

    pub async fn set_hypothesis_status(&self, id: Uuid, status: HypothesisStatus) -> Result<()> {
        sqlx::query(
            r#"
            UPDATE hypotheses
            SET status = $2::hypothesis_status, updated_at = now()
            WHERE id = $1
            "#,
        )
        .bind(id)
        .bind(status.to_string())
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// Record the outcome of testing a hypothesis.
    pub async fn update_hypothesis_result(
        &self,
        id: Uuid,
        status: HypothesisStatus,
        confidence_impact: f64,
        reasoning: Option<&str>,
    ) -> Result<()> {
        sqlx::query(
            r#"
            UPDATE hypotheses
            SET status = $2::hypothesis_status,
                confidence_impact = $3,
                reasoning = $4,
                updated_at = now()
            WHERE id = $1
            "#,
        )
        .bind(id)
        .bind(status.to_string())
        .bind(confidence_impact)
        .bind(reasoning)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    pub async fn hypotheses_for_event(&self, event_id: Uuid) -> Result<Vec<Hypothesis>> {
        let rows = sqlx::query_as::<_, HypothesisRow>(
            r#"
            SELECT h.id, h.branch_id, h.claim, h.testable_prediction,
                   h.status::text AS status, h.confidence_impact, h.reasoning,
                   h.created_at, h.updated_at
            FROM hypotheses h
            JOIN branches b ON b.id = h.branch_id
            WHERE b.event_id = $1
            ORDER BY h.created_at ASC
            "#,
        )
        .bind(event_id)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(HypothesisRow::into_hypothesis).collect()
    }

    // --- Investigation logs ---

    /// Append a log entry. Logs a warning on failure rather than propagating —
    /// a failed audit write shouldn't abort the investigation.
    pub async fn log(
        &self,
        event_id: Uuid,
        phase: i32,
        action: &str,
        details: Option<serde_json::Value>,
        level: LogLevel,
    ) {
        let result = sqlx::query(
            r#"
            INSERT INTO investigation_logs (event_id, phase, action, details, level)
            VALUES ($1, $2, $3, $4, $5::log_level)
            "#,
        )
        .bind(event_id)
        .bind(phase)
        .bind(action)
        .bind(&details)
        .bind(level.to_string())
        .execute(&self.pool)
        .await;

        if let Err(e) = result {
            warn!(event_id = %event_id, action = %action, error = %e, "Failed to record investigation log");
        }
    }

    pub async fn logs_for_event(&self, event_id: Uuid) -> Result<Vec<InvestigationLog>> {
        let rows = sqlx::query_as::<_, LogRow>(
            r#"
            SELECT id, event_id, phase, action, details, level::text AS level, created_at
            FROM investigation_logs
            WHERE event_id = $1
            ORDER BY created_at ASC
            "#,
        )
        .bind(event_id)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(LogRow::into_log).collect()
    }

    // --- Merges ---

    /// Copy evidence from one branch onto another and record the merge.
    /// Copies skip URLs the target already holds. Returns the merge record
    /// and the number of evidence rows copied.
    pub async fn merge_branches(
        &self,
        event_id: Uuid,
        source_branch_id: Uuid,
        target_branch_id: Uuid,
    ) -> Result<(Merge, u64)> {
        let mut tx = self.pool.begin().await?;

        let merge = sqlx::query_as::<_, MergeRow>(
            r#"
            INSERT INTO merges (event_id, source_branch_id, target_branch_id)
            VALUES ($1, $2, $3)
            RETURNING *
            "#,
        )
        .bind(event_id)
        .bind(source_branch_id)
        .bind(target_branch_id)
        .fetch_one(&mut *tx)
        .await?;

        let copied = sqlx::query(
            r#"
            INSERT INTO evidence
                (event_id, branch_id, title, content, evidence_type, source_url,
                 source_credibility, ai_analysis, parent_id, position_x, position_y)
            SELECT s.event_id, $2, s.title, s.content, s.evidence_type, s.source_url,
                   s.source_credibility, s.ai_analysis, s.id, s.position_x, s.position_y
            FROM evidence s
            WHERE s.branch_id = $1
              AND (s.source_url IS NULL OR s.source_url NOT IN (
                    SELECT t.source_url FROM evidence t
                    WHERE t.branch_id = $2 AND t.source_url IS NOT NULL
              ))
            "#,
        )
        .bind(source_branch_id)
        .bind(target_branch_id)
        .execute(&mut *tx)
        .await?
        .rows_affected();

        tx.commit().await?;

        Ok((merge.into(), copied))
    }
}
