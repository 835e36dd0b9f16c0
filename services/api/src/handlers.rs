//! Axum Handlers for the REST API
//!
//! Each endpoint is a thin wrapper over one orchestrator operation.
//! `utoipa` doc comments generate the OpenAPI documentation.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use dataready_core::roles::{self, Role};
use dataready_core::{CandidateAnswer, OrchestratorError};
use std::sync::Arc;
use tracing::error;

use crate::{
    models::{
        CreateInterviewPayload, ErrorResponse, InterviewStatus, RoleInfo, SkillInfo,
        SubmitResponsePayload,
    },
    state::AppState,
};

pub enum ApiError {
    BadRequest(String),
    NotFound(String),
    Conflict(String),
    BadGateway(String),
    InternalServerError(anyhow::Error),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::BadRequest(message) => (StatusCode::BAD_REQUEST, message),
            ApiError::NotFound(message) => (StatusCode::NOT_FOUND, message),
            ApiError::Conflict(message) => (StatusCode::CONFLICT, message),
            ApiError::BadGateway(message) => (StatusCode::BAD_GATEWAY, message),
            ApiError::InternalServerError(err) => {
                error!("Internal Server Error: {:?}", err);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "An internal server error occurred.".to_string(),
                )
            }
        };
        (status, Json(ErrorResponse { message })).into_response()
    }
}

impl From<OrchestratorError> for ApiError {
    fn from(err: OrchestratorError) -> Self {
        match err {
            OrchestratorError::Validation(_) => ApiError::BadRequest(err.to_string()),
            OrchestratorError::SessionNotFound(_) => ApiError::NotFound(err.to_string()),
            OrchestratorError::InvalidTransition { .. } | OrchestratorError::ConcurrentAccess(_) => {
                ApiError::Conflict(err.to_string())
            }
            OrchestratorError::GatewayUnavailable(_) => ApiError::BadGateway(err.to_string()),
            OrchestratorError::Store(inner) => ApiError::InternalServerError(inner),
        }
    }
}

/// Create a new interview session.
#[utoipa::path(
    post,
    path = "/interviews",
    request_body = CreateInterviewPayload,
    responses(
        (status = 201, description = "Interview created", body = InterviewStatus),
        (status = 400, description = "Invalid setup", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    )
)]
pub async fn create_interview(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<CreateInterviewPayload>,
) -> Result<impl IntoResponse, ApiError> {
    let setup = payload.into_setup().map_err(ApiError::BadRequest)?;
    let session = state.orchestrator.create_session(setup).await?;
    Ok((
        StatusCode::CREATED,
        Json(InterviewStatus::from_session(&session)),
    ))
}

/// Ask the first question.
#[utoipa::path(
    post,
    path = "/interviews/{id}/start",
    responses(
        (status = 200, description = "First question payload"),
        (status = 404, description = "Interview not found", body = ErrorResponse),
        (status = 409, description = "Interview already started", body = ErrorResponse)
    ),
    params(("id" = String, Path, description = "Interview session ID"))
)]
pub async fn start_interview(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let prompt = state.orchestrator.start_interview(&id).await?;
    Ok(Json(prompt))
}

/// Submit the candidate's answer (or skip) for the current question.
#[utoipa::path(
    post,
    path = "/interviews/{id}/response",
    request_body = SubmitResponsePayload,
    responses(
        (status = 200, description = "Next step: a question, a follow-up, or the final report"),
        (status = 404, description = "Interview not found", body = ErrorResponse),
        (status = 409, description = "No answer expected in the current state", body = ErrorResponse),
        (status = 502, description = "Evaluation backend unavailable", body = ErrorResponse)
    ),
    params(("id" = String, Path, description = "Interview session ID"))
)]
pub async fn submit_response(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(payload): Json<SubmitResponsePayload>,
) -> Result<impl IntoResponse, ApiError> {
    let answer = if payload.skip {
        CandidateAnswer::Skip
    } else {
        let transcript = payload
            .transcript
            .filter(|t| !t.trim().is_empty())
            .ok_or_else(|| {
                ApiError::BadRequest("transcript is required unless skip is set".to_string())
            })?;
        CandidateAnswer::Transcript(transcript)
    };
    let outcome = state.orchestrator.submit_response(&id, answer).await?;
    Ok(Json(outcome))
}

/// End the interview early and get the (partial) report.
#[utoipa::path(
    post,
    path = "/interviews/{id}/end",
    responses(
        (status = 200, description = "Final report"),
        (status = 404, description = "Interview not found", body = ErrorResponse),
        (status = 409, description = "Interview already cancelled or failed", body = ErrorResponse)
    ),
    params(("id" = String, Path, description = "Interview session ID"))
)]
pub async fn end_interview(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let report = state.orchestrator.end_interview(&id).await?;
    Ok(Json(report))
}

/// Get the current status of an interview session.
#[utoipa::path(
    get,
    path = "/interviews/{id}",
    responses(
        (status = 200, description = "Interview status", body = InterviewStatus),
        (status = 404, description = "Interview not found", body = ErrorResponse)
    ),
    params(("id" = String, Path, description = "Interview session ID"))
)]
pub async fn get_interview(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<InterviewStatus>, ApiError> {
    let session = state.orchestrator.get_session(&id).await?;
    Ok(Json(InterviewStatus::from_session(&session)))
}

/// Fetch the final report of a finished interview.
#[utoipa::path(
    get,
    path = "/interviews/{id}/report",
    responses(
        (status = 200, description = "Final report"),
        (status = 404, description = "Interview not found or not finished", body = ErrorResponse)
    ),
    params(("id" = String, Path, description = "Interview session ID"))
)]
pub async fn get_report(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let session = state.orchestrator.get_session(&id).await?;
    let report = session
        .report
        .ok_or_else(|| ApiError::NotFound("no report generated for this interview".to_string()))?;
    Ok(Json(report))
}

/// List the supported target roles.
#[utoipa::path(
    get,
    path = "/roles",
    responses((status = 200, description = "Available roles", body = [RoleInfo]))
)]
pub async fn list_roles() -> Json<Vec<RoleInfo>> {
    let infos = Role::all()
        .iter()
        .map(|role| RoleInfo {
            id: serde_json::to_value(role)
                .ok()
                .and_then(|v| v.as_str().map(String::from))
                .unwrap_or_default(),
            name: role.display_name().to_string(),
            initial_difficulty: role.initial_difficulty(),
            focus_areas: roles::focus_areas(*role)
                .iter()
                .map(|a| a.to_string())
                .collect(),
        })
        .collect();
    Json(infos)
}

/// List the skill catalog.
#[utoipa::path(
    get,
    path = "/skills",
    responses((status = 200, description = "Skill catalog", body = [SkillInfo]))
)]
pub async fn list_skills() -> Json<Vec<SkillInfo>> {
    let infos = roles::SKILL_CATALOG
        .iter()
        .map(|skill| SkillInfo {
            id: skill.id.to_string(),
            name: skill.name.to_string(),
            roles: skill
                .roles
                .iter()
                .filter_map(|r| {
                    serde_json::to_value(r)
                        .ok()
                        .and_then(|v| v.as_str().map(String::from))
                })
                .collect(),
        })
        .collect();
    Json(infos)
}
