// Row mirrors of the domain types. Enum columns are selected as `::text`
// and parsed here so the domain crate stays free of sqlx.

use chrono::{DateTime, Utc};
use uuid::Uuid;

use timelineforge_common::{
    Branch, Event, Evidence, Hypothesis, InvestigationLog, Merge,
};

use crate::error::{Result, StoreError};

fn parse_enum<T>(raw: &str) -> Result<T>
where
    T: std::str::FromStr<Err = String>,
{
    raw.parse().map_err(StoreError::Corrupt)
}

#[derive(Debug, sqlx::FromRow)]
pub(crate) struct EventRow {
    pub id: Uuid,
    pub user_id: Uuid,
    pub title: String,
    pub description: String,
    pub status: String,
    pub current_phase: i32,
    pub total_phases: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl EventRow {
    pub(crate) fn into_event(self) -> Result<Event> {
        Ok(Event {
            id: self.id,
            user_id: self.user_id,
            title: self.title,
            description: self.description,
            status: parse_enum(&self.status)?,
            current_phase: self.current_phase,
            total_phases: self.total_phases,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

#[derive(Debug, sqlx::FromRow)]
pub(crate) struct BranchRow {
    pub id: Uuid,
    pub event_id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub confidence_score: f64,
    pub color: String,
    pub is_main: bool,
    pub position_z: f64,
    pub created_at: DateTime<Utc>,
}

impl From<BranchRow> for Branch {
    fn from(r: BranchRow) -> Self {
        Branch {
            id: r.id,
            event_id: r.event_id,
            name: r.name,
            description: r.description,
            confidence_score: r.confidence_score,
            color: r.color,
            is_main: r.is_main,
            position_z: r.position_z,
            created_at: r.created_at,
        }
    }
}

#[derive(Debug, sqlx::FromRow)]
pub(crate) struct EvidenceRow {
    pub id: Uuid,
    pub event_id: Uuid,
    pub branch_id: Uuid,
    pub title: String,
    pub content: Option<String>,
    pub evidence_type: String,
    pub source_url: Option<String>,
    pub source_credibility: f64,
    pub ai_analysis: Option<serde_json::Value>,
    pub parent_id: Option<Uuid>,
    pub position_x: f64,
    pub position_y: f64,
    pub created_at: DateTime<Utc>,
}

impl EvidenceRow {
    pub(crate) fn into_evidence(self) -> Result<Evidence> {
        Ok(Evidence {
            id: self.id,
            event_id: self.event_id,
            branch_id: self.branch_id,
            title: self.title,
            content: self.content,
            evidence_type: parse_enum(&self.evidence_type)?,
            source_url: self.source_url,
            source_credibility: self.source_credibility,
            ai_analysis: self.ai_analysis,
            parent_id: self.parent_id,
            position_x: self.position_x,
            position_y: self.position_y,
            created_at: self.created_at,
        })
    }
}

#[derive(Debug, sqlx::FromRow)]
pub(crate) struct HypothesisRow {
    pub id: Uuid,
    pub branch_id: Uuid,
    pub claim: String,
    pub testable_prediction: Option<String>,
    pub status: String,
    pub confidence_impact: f64,
    pub reasoning: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl HypothesisRow {
    pub(crate) fn into_hypothesis(self) -> Result<Hypothesis> {
        Ok(Hypothesis {
            id: self.id,
            branch_id: self.branch_id,
            claim: self.claim,
            testable_prediction: self.testable_prediction,
            status: parse_enum(&self.status)?,
            confidence_impact: self.confidence_impact,
            reasoning: self.reasoning,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

#[derive(Debug, sqlx::FromRow)]
pub(crate) struct LogRow {
    pub id: Uuid,
    pub event_id: Uuid,
    pub phase: i32,
    pub action: String,
    pub details: Option<serde_json::Value>,
    pub level: String,
    pub created_at: DateTime<Utc>,
}

impl LogRow {
    pub(crate) fn into_log(self) -> Result<InvestigationLog> {
        Ok(InvestigationLog {
            id: self.id,
            event_id: self.event_id,
            phase: self.phase,
            action: self.action,
            details: self.details,
            level: parse_enum(&self.level)?,
            created_at: self.created_at,
        })
    }
}

#[derive(Debug, sqlx::FromRow)]
pub(crate) struct MergeRow {
    pub id: Uuid,
    pub event_id: Uuid,
    pub source_branch_id: Uuid,
    pub target_branch_id: Uuid,
    pub created_at: DateTime<Utc>,
}

impl From<MergeRow> for Merge {
    fn from(r: MergeRow) -> Self {
        Merge {
            id: r.id,
            event_id: r.event_id,
            source_branch_id: r.source_branch_id,
            target_branch_id: r.target_branch_id,
            created_at: r.created_at,
        }
    }
}
