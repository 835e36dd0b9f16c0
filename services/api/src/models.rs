//! REST payload types for the interview API.
//!
//! Request enums arrive as plain strings and are validated here into the
//! core domain types, so a bad value becomes a 400 instead of a serde
//! panic deep in a handler.

use chrono::{DateTime, Utc};
use dataready_core::session::{InterviewSession, InterviewSetup};
use dataready_core::roles::{CloudPreference, InterviewMode, Role};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(Deserialize, ToSchema)]
pub struct CreateInterviewPayload {
    /// One of: junior, mid, senior, staff, principal.
    #[schema(example = "senior")]
    pub target_role: String,
    #[schema(example = 6)]
    pub years_of_experience: u8,
    /// One of: aws, gcp, azure, agnostic. Defaults to agnostic.
    #[serde(default)]
    #[schema(example = "aws")]
    pub cloud_preference: Option<String>,
    /// One of: structured, structured_followup. Defaults to structured_followup.
    #[serde(default)]
    pub mode: Option<String>,
    #[serde(default)]
    #[schema(example = 10)]
    pub max_questions: Option<u32>,
    #[serde(default)]
    pub include_skills: Vec<String>,
    #[serde(default)]
    pub exclude_skills: Vec<String>,
}

impl CreateInterviewPayload {
    pub fn into_setup(self) -> Result<InterviewSetup, String> {
        let target_role = match self.target_role.to_lowercase().as_str() {
            "junior" => Role::Junior,
            "mid" => Role::Mid,
            "senior" => Role::Senior,
            "staff" => Role::Staff,
            "principal" => Role::Principal,
            other => return Err(format!("unknown target_role '{other}'")),
        };
        let cloud_preference = match self.cloud_preference.as_deref() {
            None | Some("agnostic") => CloudPreference::Agnostic,
            Some("aws") => CloudPreference::Aws,
            Some("gcp") => CloudPreference::Gcp,
            Some("azure") => CloudPreference::Azure,
            Some(other) => return Err(format!("unknown cloud_preference '{other}'")),
        };
        let mode = match self.mode.as_deref() {
            None | Some("structured_followup") => InterviewMode::StructuredFollowup,
            Some("structured") => InterviewMode::Structured,
            Some(other) => return Err(format!("unknown mode '{other}'")),
        };
        Ok(InterviewSetup {
            target_role,
            years_of_experience: self.years_of_experience,
            cloud_preference,
            mode,
            max_questions: self
                .max_questions
                .unwrap_or(InterviewSetup::DEFAULT_MAX_QUESTIONS),
            include_skills: self.include_skills,
            exclude_skills: self.exclude_skills,
        })
    }
}

#[derive(Deserialize, ToSchema)]
pub struct SubmitResponsePayload {
    /// Transcript text of the candidate's answer. Ignored when `skip` is set.
    #[serde(default)]
    pub transcript: Option<String>,
    /// Skip the current question without answering.
    #[serde(default)]
    pub skip: bool,
}

#[derive(Serialize, ToSchema)]
pub struct InterviewStatus {
    pub id: String,
    #[schema(example = "asking")]
    pub state: String,
    #[schema(example = "senior")]
    pub target_role: String,
    pub questions_asked: u32,
    pub followups_asked: u32,
    pub max_questions: u32,
    pub current_difficulty: u8,
    pub running_score: f64,
    pub created_at: DateTime<Utc>,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    pub error_message: Option<String>,
}

impl InterviewStatus {
    pub fn from_session(session: &InterviewSession) -> Self {
        Self {
            id: session.id.clone(),
            state: session.state.to_string(),
            target_role: serde_plain(session.setup.target_role),
            questions_asked: session.total_core_questions_asked,
            followups_asked: session.total_followups_asked,
            max_questions: session.setup.max_questions,
            current_difficulty: session.current_difficulty,
            running_score: session.running_score,
            created_at: session.created_at,
            started_at: session.started_at,
            completed_at: session.completed_at,
            error_message: session.error_message.clone(),
        }
    }
}

#[derive(Serialize, ToSchema)]
pub struct RoleInfo {
    #[schema(example = "senior")]
    pub id: String,
    #[schema(example = "Senior Data Engineer")]
    pub name: String,
    pub initial_difficulty: u8,
    pub focus_areas: Vec<String>,
}

#[derive(Serialize, ToSchema)]
pub struct SkillInfo {
    #[schema(example = "spark_tuning")]
    pub id: String,
    #[schema(example = "Spark Performance Tuning")]
    pub name: String,
    pub roles: Vec<String>,
}

#[derive(Serialize, ToSchema)]
pub struct ErrorResponse {
    pub message: String,
}

/// Snake-case string form of a serde-tagged enum value.
fn serde_plain<T: Serialize>(value: T) -> String {
    serde_json::to_value(&value)
        .ok()
        .and_then(|v| v.as_str().map(String::from))
        .unwrap_or_default()
}
