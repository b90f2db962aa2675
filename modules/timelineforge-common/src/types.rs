use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

// --- Enums ---

/// Lifecycle of an investigation: idle → collecting/analyzing → complete.
/// `Error` exists for manual resets; the orchestrator never sets it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventStatus {
    Idle,
    Collecting,
    Analyzing,
    Complete,
    Error,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EvidenceType {
    Text,
    Image,
    Link,
    Document,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HypothesisStatus {
    Pending,
    Testing,
    Confirmed,
    Refuted,
}

/// Severity of an investigation log entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogLevel {
    Info,
    Warning,
    Error,
}

/// Kind of vision analysis requested from the image endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnalysisType {
    Detection,
    Description,
    Credibility,
    Region,
}

macro_rules! text_enum {
    ($ty:ident { $($variant:ident => $text:literal),+ $(,)? }) => {
        impl std::fmt::Display for $ty {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                match self {
                    $($ty::$variant => write!(f, $text)),+
                }
            }
        }

        impl std::str::FromStr for $ty {
            type Err = String;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($text => Ok($ty::$variant)),+,
                    other => Err(format!("unknown {} value: {other}", stringify!($ty))),
                }
            }
        }
    };
}

text_enum!(EventStatus {
    Idle => "idle",
    Collecting => "collecting",
    Analyzing => "analyzing",
    Complete => "complete",
    Error => "error",
});

text_enum!(EvidenceType {
    Text => "text",
    Image => "image",
    Link => "link",
    Document => "document",
});

text_enum!(HypothesisStatus {
    Pending => "pending",
    Testing => "testing",
    Confirmed => "confirmed",
    Refuted => "refuted",
});

text_enum!(LogLevel {
    Info => "info",
    Warning => "warning",
    Error => "error",
});

// --- Domain types ---

/// An investigation tracked through fixed phases.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Event {
    pub id: Uuid,
    pub user_id: Uuid,
    pub title: String,
    pub description: String,
    pub status: EventStatus,
    pub current_phase: i32,
    pub total_phases: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A candidate narrative grouping evidence under an event.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Branch {
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

/// A discrete item supporting or contradicting a branch.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Evidence {
    pub id: Uuid,
    pub event_id: Uuid,
    pub branch_id: Uuid,
    pub title: String,
    pub content: Option<String>,
    pub evidence_type: EvidenceType,
    pub source_url: Option<String>,
    pub source_credibility: f64,
    pub ai_analysis: Option<serde_json::Value>,
    pub parent_id: Option<Uuid>,
    pub position_x: f64,
    pub position_y: f64,
    pub created_at: DateTime<Utc>,
}

/// A falsifiable claim tied to a branch.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Hypothesis {
    pub id: Uuid,
    pub branch_id: Uuid,
    pub claim: String,
    pub testable_prediction: Option<String>,
    pub status: HypothesisStatus,
    pub confidence_impact: f64,
    pub reasoning: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Append-only audit trail entry for an investigation run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InvestigationLog {
    pub id: Uuid,
    pub event_id: Uuid,
    pub phase: i32,
    pub action: String,
    pub details: Option<serde_json::Value>,
    pub level: LogLevel,
    pub created_at: DateTime<Utc>,
}

/// Recorded intent to combine two branches (evidence-copy, no conflict resolution).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Merge {
    pub id: Uuid,
    pub event_id: Uuid,
    pub source_branch_id: Uuid,
    pub target_branch_id: Uuid,
    pub created_at: DateTime<Utc>,
}

/// Cycled palette for narrative branches created by the orchestrator.
pub const BRANCH_COLORS: [&str; 5] = ["#8b5cf6", "#06b6d4", "#22c55e", "#eab308", "#ef4444"];

/// Color and name for the main branch created alongside every event.
pub const MAIN_BRANCH_NAME: &str = "Main Timeline";
pub const MAIN_BRANCH_COLOR: &str = "#3b82f6";

/// Number of phases a marathon run drives an event through.
pub const TOTAL_PHASES: i32 = 5;
