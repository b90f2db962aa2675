//! REST handlers for event management and the pipeline endpoints.

use std::sync::Arc;

use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::Json;
use serde::Deserialize;
use serde_json::{json, Value};
use uuid::Uuid;

use timelineforge_common::ForgeError;
use timelineforge_investigator::{CollectionOutcome, MonitorReport, TestOutcome};

use crate::auth::AuthUser;
use crate::error::{ApiError, ApiResult};
use crate::vision::{self, VisionRequest};
use crate::AppState;

const DEFAULT_MAX_RESULTS: u32 = 5;

/// Unwrap a JSON body, turning malformed payloads into a 400.
fn body<T>(body: Result<Json<T>, JsonRejection>) -> ApiResult<T> {
    body.map(|Json(v)| v)
        .map_err(|_| ApiError::validation("Invalid request parameters"))
}

fn require_len(value: &str, field: &str, max: usize) -> ApiResult<()> {
    if value.is_empty() {
        return Err(ApiError::validation(format!("{field} is required")));
    }
    bound_len(value, field, max)
}

fn bound_len(value: &str, field: &str, max: usize) -> ApiResult<()> {
    if value.len() > max {
        return Err(ApiError::validation(format!(
            "{field} exceeds {max} characters"
        )));
    }
    Ok(())
}

// --- Events ---

#[derive(Debug, Deserialize)]
pub struct CreateEventRequest {
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
}

pub async fn create_event(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    payload: Result<Json<CreateEventRequest>, JsonRejection>,
) -> ApiResult<Json<Value>> {
    let req = body(payload)?;
    require_len(&req.title, "title", 200)?;
    if let Some(d) = &req.description {
        bound_len(d, "description", 2000)?;
    }

    let (event, main_branch) = state
        .store
        .create_event(user.id, &req.title, req.description.as_deref().unwrap_or(""))
        .await?;

    Ok(Json(json!({ "event": event, "main_branch": main_branch })))
}

pub async fn get_event(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<Value>> {
    let event = state
        .store
        .get_event(id)
        .await?
        .ok_or_else(|| ApiError::not_found(format!("event {id} not found")))?;

    if event.user_id != user.id {
        return Err(ForgeError::Authorization("event belongs to another user".into()).into());
    }

    let branches = state.store.branches_for_event(id).await?;
    let evidence = state.store.evidence_for_event(id).await?;
    let hypotheses = state.store.hypotheses_for_event(id).await?;
    let logs = state.store.logs_for_event(id).await?;

    Ok(Json(json!({
        "event": event,
        "branches": branches,
        "evidence": evidence,
        "hypotheses": hypotheses,
        "logs": logs,
    })))
}

#[derive(Debug, Deserialize)]
pub struct MergeRequest {
    pub source_branch_id: Uuid,
    pub target_branch_id: Uuid,
}

pub async fn merge_branches(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    Path(id): Path<Uuid>,
    payload: Result<Json<MergeRequest>, JsonRejection>,
) -> ApiResult<Json<Value>> {
    let req = body(payload)?;

    if req.source_branch_id == req.target_branch_id {
        return Err(ApiError::validation("cannot merge a branch into itself"));
    }

    let event = state
        .store
        .get_event(id)
        .await?
        .ok_or_else(|| ApiError::not_found(format!("event {id} not found")))?;
    if event.user_id != user.id {
        return Err(ForgeError::Authorization("event belongs to another user".into()).into());
    }

    for branch_id in [req.source_branch_id, req.target_branch_id] {
        let branch = state
            .store
            .get_branch(branch_id)
            .await?
            .ok_or_else(|| ApiError::not_found(format!("branch {branch_id} not found")))?;
        if branch.event_id != id {
            return Err(ApiError::validation("branch does not belong to this event"));
        }
    }

    let (merge, evidence_copied) = state
        .store
        .merge_branches(id, req.source_branch_id, req.target_branch_id)
        .await?;

    Ok(Json(json!({ "merge": merge, "evidence_copied": evidence_copied })))
}

// --- Pipeline endpoints ---

#[derive(Debug, Deserialize)]
pub struct InvestigateRequest {
    pub event_id: Uuid,
}

pub async fn investigate(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    payload: Result<Json<InvestigateRequest>, JsonRejection>,
) -> ApiResult<Json<Value>> {
    let req = body(payload)?;
    let stats = state.investigator.run(req.event_id, user.id).await?;

    Ok(Json(json!({
        "success": true,
        "event_id": req.event_id,
        "evidence_count": stats.evidence_added,
        "hypotheses_count": stats.hypotheses_created,
    })))
}

#[derive(Debug, Deserialize)]
pub struct CollectRequest {
    pub query: String,
    pub event_title: String,
    #[serde(default)]
    pub branch_name: Option<String>,
    #[serde(default)]
    pub max_results: Option<u32>,
}

pub async fn collect_evidence(
    State(state): State<Arc<AppState>>,
    _user: AuthUser,
    payload: Result<Json<CollectRequest>, JsonRejection>,
) -> ApiResult<Json<CollectionOutcome>> {
    let req = body(payload)?;
    require_len(&req.query, "query", 500)?;
    require_len(&req.event_title, "event_title", 200)?;
    if let Some(name) = &req.branch_name {
        bound_len(name, "branch_name", 200)?;
    }
    let max_results = req.max_results.unwrap_or(DEFAULT_MAX_RESULTS);
    if !(1..=20).contains(&max_results) {
        return Err(ApiError::validation("max_results must be between 1 and 20"));
    }

    let outcome = state
        .collector
        .collect(
            &req.query,
            &req.event_title,
            req.branch_name.as_deref(),
            max_results,
        )
        .await?;

    Ok(Json(outcome))
}

#[derive(Debug, Deserialize)]
pub struct TestRequest {
    pub hypothesis_id: Uuid,
}

pub async fn test_hypothesis(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    payload: Result<Json<TestRequest>, JsonRejection>,
) -> ApiResult<Json<TestOutcome>> {
    let req = body(payload)?;
    let outcome = state.tester.test(req.hypothesis_id, user.id).await?;
    Ok(Json(outcome))
}

pub async fn vision_analyze(
    State(state): State<Arc<AppState>>,
    _user: AuthUser,
    payload: Result<Json<VisionRequest>, JsonRejection>,
) -> ApiResult<Json<Value>> {
    let req = body(payload)?;
    let analysis = vision::analyze(&state.gemini, &state.http, req).await?;
    Ok(Json(analysis))
}

pub async fn monitor_sweep(
    State(state): State<Arc<AppState>>,
    _user: AuthUser,
) -> ApiResult<Json<MonitorReport>> {
    let report = state.monitor.sweep().await?;
    Ok(Json(report))
}
