//! Reasoning gateway: the LLM-facing contract the orchestrator depends on.
//!
//! The orchestrator only ever sees typed payloads. Model output that does
//! not parse is reported as `RawText` or `Unparsable` so the caller's
//! degradation ladder can act on it; transport failures surface as
//! `GatewayError::Unavailable`.

use async_openai::Client;
use async_openai::config::OpenAIConfig;
use async_openai::types::{
    ChatCompletionRequestSystemMessageArgs, ChatCompletionRequestUserMessageArgs,
    CreateChatCompletionRequestArgs,
};
use async_trait::async_trait;
use serde::Deserialize;
use thiserror::Error;
use tracing::warn;

use crate::evaluation::{
    EvaluationFeedback, ResponseEvaluation, ScoreBreakdown,
};
use crate::question::{FollowupKind, FollowupQuestion, Question, QuestionKind};
use crate::session::{ConversationTurn, InterviewSession, QuestionResponse, TurnRole};

#[derive(Debug, Error)]
pub enum GatewayError {
    /// Output was unusable but the transport worked. Handled internally
    /// by the caller's fallback ladder, never surfaced.
    #[error("gateway returned degraded output: {0}")]
    Degraded(String),
    /// Transport-level failure. Retried by the caller; fatal if retries
    /// are exhausted and no fallback applies.
    #[error("gateway unavailable: {0}")]
    Unavailable(String),
}

/// Gateway output as seen by the orchestrator's degradation ladder.
#[derive(Debug, Clone)]
pub enum GatewayPayload<T> {
    Structured(T),
    RawText(String),
    Unparsable,
}

/// Candidate performance direction across recent answers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PerformanceTrend {
    Improving,
    Declining,
    Stable,
}

/// Everything the gateway needs to generate or evaluate, snapshotted
/// from the session so gateway calls cannot mutate it.
#[derive(Debug, Clone)]
pub struct GatewayContext {
    pub session_id: String,
    pub role_name: String,
    pub years_of_experience: u8,
    pub cloud: String,
    pub difficulty: u8,
    pub core_questions_asked: u32,
    pub max_questions: u32,
    pub covered_skills: Vec<String>,
    pub remaining_skills: Vec<String>,
    pub prior_questions: Vec<String>,
    pub conversation: Vec<ConversationTurn>,
    pub trend: PerformanceTrend,
}

impl GatewayContext {
    pub fn from_session(session: &InterviewSession) -> Self {
        Self {
            session_id: session.id.clone(),
            role_name: session.setup.target_role.display_name().to_string(),
            years_of_experience: session.setup.years_of_experience,
            cloud: format!("{:?}", session.setup.cloud_preference).to_lowercase(),
            difficulty: session.current_difficulty,
            core_questions_asked: session.total_core_questions_asked,
            max_questions: session.setup.max_questions,
            covered_skills: session.covered_skills(),
            remaining_skills: session.remaining_skills(),
            prior_questions: session.prior_question_texts(),
            conversation: session.current_question_context.clone(),
            trend: trend_of(&session.scored_overalls()),
        }
    }
}

/// Direction of the last few overall scores. Stable unless the recent
/// window clearly moves.
pub fn trend_of(overalls: &[f64]) -> PerformanceTrend {
    if overalls.len() < 2 {
        return PerformanceTrend::Stable;
    }
    let window = &overalls[overalls.len().saturating_sub(3)..];
    let delta = window[window.len() - 1] - window[0];
    if delta >= 1.0 {
        PerformanceTrend::Improving
    } else if delta <= -1.0 {
        PerformanceTrend::Declining
    } else {
        PerformanceTrend::Stable
    }
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ReasoningGateway: Send + Sync {
    async fn generate_question(
        &self,
        ctx: &GatewayContext,
    ) -> Result<GatewayPayload<Question>, GatewayError>;

    async fn evaluate_response(
        &self,
        ctx: &GatewayContext,
        question: &QuestionResponse,
        transcript: &str,
    ) -> Result<GatewayPayload<ResponseEvaluation>, GatewayError>;

    async fn generate_followup(
        &self,
        ctx: &GatewayContext,
        evaluation: &ResponseEvaluation,
    ) -> Result<GatewayPayload<FollowupQuestion>, GatewayError>;
}

/// Chat-completions implementation against any OpenAI-compatible API.
pub struct OpenAiReasoningGateway {
    client: Client<OpenAIConfig>,
    model: String,
}

impl OpenAiReasoningGateway {
    pub fn new(api_key: &str, base_url: &str, model: &str) -> Self {
        let config = OpenAIConfig::new()
            .with_api_key(api_key)
            .with_api_base(base_url);
        Self {
            client: Client::with_config(config),
            model: model.to_string(),
        }
    }

    async fn chat(&self, system: &str, user: &str) -> Result<String, GatewayError> {
        let request = CreateChatCompletionRequestArgs::default()
            .model(&self.model)
            .messages(vec![
                ChatCompletionRequestSystemMessageArgs::default()
                    .content(system)
                    .build()
                    .map_err(|e| GatewayError::Unavailable(e.to_string()))?
                    .into(),
                ChatCompletionRequestUserMessageArgs::default()
                    .content(user)
                    .build()
                    .map_err(|e| GatewayError::Unavailable(e.to_string()))?
                    .into(),
            ])
            .build()
            .map_err(|e| GatewayError::Unavailable(e.to_string()))?;

        let response = self
            .client
            .chat()
            .create(request)
            .await
            .map_err(|e| GatewayError::Unavailable(e.to_string()))?;

        response
            .choices
            .first()
            .and_then(|c| c.message.content.clone())
            .ok_or_else(|| GatewayError::Degraded("empty completion".to_string()))
    }
}

/// Extracts the first-`{`-to-last-`}` slice of a completion, tolerating
/// markdown fences and prose around the JSON object.
pub fn extract_json(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let end = text.rfind('}')?;
    if end > start { Some(&text[start..=end]) } else { None }
}

#[derive(Debug, Deserialize)]
struct QuestionWire {
    question: String,
    #[serde(default)]
    skill_id: Option<String>,
    #[serde(default, rename = "type")]
    kind: Option<String>,
    #[serde(default)]
    expected_points: Vec<String>,
    #[serde(default)]
    red_flags: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct ScoresWire {
    technical_correctness: f64,
    depth_of_understanding: f64,
    practical_experience: f64,
    communication_clarity: f64,
    confidence: f64,
}

#[derive(Debug, Deserialize)]
struct EvaluationWire {
    scores: ScoresWire,
    #[serde(default)]
    feedback: EvaluationFeedback,
    #[serde(default)]
    needs_followup: bool,
    #[serde(default)]
    followup_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct FollowupWire {
    #[serde(default, rename = "type")]
    kind: Option<String>,
    question: String,
    #[serde(default)]
    reason: String,
}

fn parse_question_kind(raw: Option<&str>) -> QuestionKind {
    match raw {
        Some("scenario") => QuestionKind::Scenario,
        Some("design") => QuestionKind::Design,
        Some("troubleshooting") => QuestionKind::Troubleshooting,
        Some("tradeoff") => QuestionKind::Tradeoff,
        Some("behavioral") => QuestionKind::Behavioral,
        _ => QuestionKind::Conceptual,
    }
}

fn parse_followup_kind(raw: Option<&str>) -> FollowupKind {
    match raw {
        Some("clarify") => FollowupKind::Clarify,
        Some("example") => FollowupKind::Example,
        Some("challenge") => FollowupKind::Challenge,
        _ => FollowupKind::Probe,
    }
}

/// Classifies raw completion text for the degradation ladder. Text that
/// looks like JSON but fails to parse is Unparsable; plain prose is
/// RawText so the caller may still use it verbatim.
fn classify_unparsed<T>(content: String) -> GatewayPayload<T> {
    let trimmed = content.trim();
    if trimmed.starts_with('{') || trimmed.starts_with('[') || trimmed.is_empty() {
        GatewayPayload::Unparsable
    } else {
        GatewayPayload::RawText(content)
    }
}

#[async_trait]
impl ReasoningGateway for OpenAiReasoningGateway {
    async fn generate_question(
        &self,
        ctx: &GatewayContext,
    ) -> Result<GatewayPayload<Question>, GatewayError> {
        let system = format!(
            "You are a technical interviewer for a {} position. \
             Reply with a single JSON object: {{\"question\", \"skill_id\", \
             \"type\", \"expected_points\", \"red_flags\"}}.",
            ctx.role_name
        );
        let user = format!(
            "Candidate experience: {} years. Cloud focus: {}. Difficulty: {}/10. \
             Question {} of {}. Skills still to cover: {}. \
             Do not repeat any of these earlier questions: {}",
            ctx.years_of_experience,
            ctx.cloud,
            ctx.difficulty,
            ctx.core_questions_asked + 1,
            ctx.max_questions,
            ctx.remaining_skills.join(", "),
            ctx.prior_questions.join(" | "),
        );
        let content = self.chat(&system, &user).await?;

        let Some(json) = extract_json(&content) else {
            return Ok(classify_unparsed(content));
        };
        match serde_json::from_str::<QuestionWire>(json) {
            Ok(wire) => {
                let skill = wire
                    .skill_id
                    .or_else(|| ctx.remaining_skills.first().cloned())
                    .unwrap_or_else(|| "general".to_string());
                let mut question = Question::new(
                    wire.question,
                    skill,
                    parse_question_kind(wire.kind.as_deref()),
                    ctx.difficulty,
                );
                question.expected_points = wire.expected_points;
                question.red_flags = wire.red_flags;
                Ok(GatewayPayload::Structured(question))
            }
            Err(e) => {
                warn!(error = %e, "question payload failed to parse");
                Ok(classify_unparsed(content))
            }
        }
    }

    async fn evaluate_response(
        &self,
        ctx: &GatewayContext,
        question: &QuestionResponse,
        transcript: &str,
    ) -> Result<GatewayPayload<ResponseEvaluation>, GatewayError> {
        let system = format!(
            "You evaluate interview answers for a {} position. Reply with a \
             single JSON object: {{\"scores\": {{\"technical_correctness\", \
             \"depth_of_understanding\", \"practical_experience\", \
             \"communication_clarity\", \"confidence\"}} (each 0-10), \
             \"feedback\": {{\"what_went_well\", \"what_was_missing\", \
             \"red_flags\", \"seniority_signals\"}}, \"needs_followup\", \
             \"followup_reason\"}}.",
            ctx.role_name
        );
        let user = format!(
            "Question ({}, difficulty {}/10): {}\n\nCandidate answer:\n{}",
            question.skill_id, question.difficulty, question.question_text, transcript,
        );
        let content = self.chat(&system, &user).await?;

        let Some(json) = extract_json(&content) else {
            return Ok(classify_unparsed(content));
        };
        match serde_json::from_str::<EvaluationWire>(json) {
            Ok(wire) => Ok(GatewayPayload::Structured(ResponseEvaluation {
                question_id: question.question_id.clone(),
                skill_id: question.skill_id.clone(),
                scores: ScoreBreakdown {
                    technical_correctness: wire.scores.technical_correctness,
                    depth_of_understanding: wire.scores.depth_of_understanding,
                    practical_experience: wire.scores.practical_experience,
                    communication_clarity: wire.scores.communication_clarity,
                    confidence: wire.scores.confidence,
                }
                .clamped(),
                feedback: wire.feedback,
                needs_followup: wire.needs_followup,
                followup_reason: wire.followup_reason,
                degraded: false,
            })),
            Err(e) => {
                warn!(error = %e, "evaluation payload failed to parse");
                Ok(classify_unparsed(content))
            }
        }
    }

    async fn generate_followup(
        &self,
        ctx: &GatewayContext,
        evaluation: &ResponseEvaluation,
    ) -> Result<GatewayPayload<FollowupQuestion>, GatewayError> {
        let system = "You ask one short follow-up question to probe a weak \
                      interview answer. Reply with a single JSON object: \
                      {\"type\": \"probe|clarify|example|challenge\", \
                      \"question\", \"reason\"}."
            .to_string();
        let conversation: String = ctx
            .conversation
            .iter()
            .map(|t| {
                let speaker = match t.role {
                    TurnRole::Interviewer => "Interviewer",
                    TurnRole::Candidate => "Candidate",
                };
                format!("{speaker}: {}\n", t.text)
            })
            .collect();
        let user = format!(
            "Conversation so far:\n{}\nIdentified weakness: {}",
            conversation,
            evaluation
                .followup_reason
                .as_deref()
                .unwrap_or("answer lacked depth"),
        );
        let content = self.chat(&system, &user).await?;

        let Some(json) = extract_json(&content) else {
            return Ok(classify_unparsed(content));
        };
        match serde_json::from_str::<FollowupWire>(json) {
            Ok(wire) => Ok(GatewayPayload::Structured(FollowupQuestion {
                kind: parse_followup_kind(wire.kind.as_deref()),
                text: wire.question,
                reason: wire.reason,
            })),
            Err(e) => {
                warn!(error = %e, "followup payload failed to parse");
                Ok(classify_unparsed(content))
            }
        }
    }
}
