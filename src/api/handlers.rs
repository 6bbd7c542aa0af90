use crate::api::error::ApiError;
use crate::api::extract::AuthenticatedOwner;
use crate::api::state::AppState;
use crate::crawler::{CrawlRequest, CrawlResult};
use crate::jobs::Job;
use crate::schedules::{Schedule, ScheduleRequest};
use crate::storage::{audit, record_audit};
use crate::JobStatus;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::collections::BTreeMap;
use uuid::Uuid;

pub const SERVICE_NAME: &str = "shadowgraph";

#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub ok: bool,
    pub service: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ReadinessResponse {
    pub checks: BTreeMap<String, bool>,
    pub missing: Vec<String>,
    pub ready: bool,
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct LoginResponse {
    pub access_token: String,
    pub token_type: String,
    pub owner: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct JobAccepted {
    pub job_id: Uuid,
    pub status: JobStatus,
}

#[derive(Debug, Serialize)]
pub struct JobList {
    pub jobs: Vec<Job>,
}

#[derive(Debug, Serialize)]
pub struct ScheduleList {
    pub schedules: Vec<Schedule>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ScheduleDeleted {
    pub status: String,
    pub schedule_id: Uuid,
}

pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        ok: true,
        service: SERVICE_NAME.to_string(),
    })
}

/// Reports which collaborators are configured and reachable
pub async fn readiness(State(state): State<AppState>) -> Json<ReadinessResponse> {
    let checks = BTreeMap::from([
        ("redis_configured".to_string(), state.redis_configured()),
        (
            "accounts_configured".to_string(),
            !state.accounts.is_empty(),
        ),
        (
            "storage_available".to_string(),
            state.events.is_available().await,
        ),
    ]);
    let missing: Vec<String> = checks
        .iter()
        .filter(|(_, ok)| !**ok)
        .map(|(name, _)| name.clone())
        .collect();

    Json(ReadinessResponse {
        ready: missing.is_empty(),
        checks,
        missing,
    })
}

/// Exchanges email and password for the account's bearer token
///
/// A locked identity is refused before its password is looked at.
pub async fn login(
    State(state): State<AppState>,
    Json(payload): Json<LoginRequest>,
) -> Result<Json<LoginResponse>, ApiError> {
    let email = payload.email.trim().to_lowercase();

    if let Some(remaining) = state.login_guard.is_locked(&email) {
        let seconds = remaining.as_secs() + u64::from(remaining.subsec_nanos() > 0);
        return Err(ApiError::too_many_requests(format!(
            "Too many failed attempts. Try again in {} seconds.",
            seconds
        )));
    }

    let Some(account) = state.accounts.verify_password(&email, &payload.password) else {
        if state.login_guard.record_failure(&email).is_some() {
            tracing::warn!("Login locked for {} after repeated failures", email);
        }
        let known = state.accounts.find_by_email(&email).map(|a| a.owner.clone());
        record_audit(
            state.events.as_ref(),
            audit::LOGIN_FAILED,
            known.as_ref(),
            json!({ "email": email }),
        )
        .await;
        return Err(ApiError::unauthorized("Invalid email or password"));
    };

    state.login_guard.clear_failures(&email);
    record_audit(
        state.events.as_ref(),
        audit::LOGIN_SUCCESS,
        Some(&account.owner),
        json!({ "email": account.email }),
    )
    .await;

    Ok(Json(LoginResponse {
        access_token: account.token().to_string(),
        token_type: "bearer".to_string(),
        owner: account.owner.to_string(),
    }))
}

/// Runs a crawl inline and returns its result
pub async fn scrape_aggregate(
    State(state): State<AppState>,
    AuthenticatedOwner(owner): AuthenticatedOwner,
    Json(request): Json<CrawlRequest>,
) -> Result<Json<CrawlResult>, ApiError> {
    let result = state.orchestrator.run_direct(&owner, request).await?;
    Ok(Json(result))
}

pub async fn submit_job(
    State(state): State<AppState>,
    AuthenticatedOwner(owner): AuthenticatedOwner,
    Json(request): Json<CrawlRequest>,
) -> Result<Json<JobAccepted>, ApiError> {
    let job_id = state.orchestrator.submit(&owner, request, None).await?;
    Ok(Json(JobAccepted {
        job_id,
        status: JobStatus::Queued,
    }))
}

pub async fn list_jobs(
    State(state): State<AppState>,
    AuthenticatedOwner(owner): AuthenticatedOwner,
) -> Json<JobList> {
    Json(JobList {
        jobs: state.orchestrator.list(&owner),
    })
}

/// Malformed ids are reported exactly like unknown ones
pub async fn get_job(
    State(state): State<AppState>,
    AuthenticatedOwner(owner): AuthenticatedOwner,
    Path(job_id): Path<String>,
) -> Result<Json<Job>, ApiError> {
    let job_id = Uuid::parse_str(&job_id).map_err(|_| ApiError::not_found("Job"))?;
    let job = state.orchestrator.get(&job_id, &owner)?;
    Ok(Json(job))
}

pub async fn create_schedule(
    State(state): State<AppState>,
    AuthenticatedOwner(owner): AuthenticatedOwner,
    Json(request): Json<ScheduleRequest>,
) -> Result<Json<Schedule>, ApiError> {
    let schedule = state.schedules.create(&owner, request).await?;
    Ok(Json(schedule))
}

pub async fn list_schedules(
    State(state): State<AppState>,
    AuthenticatedOwner(owner): AuthenticatedOwner,
) -> Json<ScheduleList> {
    Json(ScheduleList {
        schedules: state.schedules.list(&owner),
    })
}

pub async fn delete_schedule(
    State(state): State<AppState>,
    AuthenticatedOwner(owner): AuthenticatedOwner,
    Path(schedule_id): Path<String>,
) -> Result<Json<ScheduleDeleted>, ApiError> {
    let parsed = Uuid::parse_str(&schedule_id).map_err(|_| ApiError::not_found("Schedule"))?;

    if !state.schedules.delete(&parsed, &owner).await {
        return Err(ApiError::not_found("Schedule"));
    }

    Ok(Json(ScheduleDeleted {
        status: "deleted".to_string(),
        schedule_id: parsed,
    }))
}

/// Fallback for unknown paths
pub async fn not_found() -> ApiError {
    ApiError::new(StatusCode::NOT_FOUND, "Not Found")
}
