//! Axum Router Configuration
//!
//! This module defines the complete HTTP routing for the application,
//! including the REST API, WebSocket endpoint, and OpenAPI documentation.

use crate::{
    handlers,
    models::{
        CreateInterviewPayload, ErrorResponse, InterviewStatus, RoleInfo, SkillInfo,
        SubmitResponsePayload,
    },
    state::AppState,
    ws::ws_handler,
};

use axum::{
    Router,
    routing::{get, post},
};
use std::sync::Arc;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

#[derive(OpenApi)]
#[openapi(
    paths(
        handlers::create_interview,
        handlers::start_interview,
        handlers::submit_response,
        handlers::end_interview,
        handlers::get_interview,
        handlers::get_report,
        handlers::list_roles,
        handlers::list_skills,
    ),
    components(
        schemas(
            CreateInterviewPayload,
            SubmitResponsePayload,
            InterviewStatus,
            RoleInfo,
            SkillInfo,
            ErrorResponse
        )
    ),
    tags(
        (name = "DataReady API", description = "Mock-interview orchestration for data engineering candidates")
    )
)]
pub struct ApiDoc;

/// Creates the main Axum router for the application.
pub fn create_router(app_state: Arc<AppState>) -> Router {
    // Group all routes that require AppState into their own router.
    let api_router = Router::new()
        .route("/interviews", post(handlers::create_interview))
        .route("/interviews/{id}", get(handlers::get_interview))
        .route("/interviews/{id}/start", post(handlers::start_interview))
        .route("/interviews/{id}/response", post(handlers::submit_response))
        .route("/interviews/{id}/end", post(handlers::end_interview))
        .route("/interviews/{id}/report", get(handlers::get_report))
        .route("/roles", get(handlers::list_roles))
        .route("/skills", get(handlers::list_skills))
        .route("/ws/{id}", get(ws_handler))
        .with_state(app_state);

    Router::new()
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .merge(api_router)
}
