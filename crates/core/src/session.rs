//! Session aggregate and the interview state machine's transition table.
//!
//! `InterviewSession` is the single mutable aggregate for one interview
//! attempt. All mutation goes through the orchestrator; the helpers here
//! keep counters, fingerprints, and the per-question conversation context
//! consistent so the orchestrator never edits those fields directly.

use std::collections::{BTreeMap, HashSet};
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::difficulty::DifficultyChange;
use crate::evaluation::ResponseEvaluation;
use crate::report::InterviewReport;
use crate::roles::{CloudPreference, InterviewMode, Role, skills_for_role};

/// Transcript sentinel recorded when the candidate skips a question.
pub const SKIPPED_TRANSCRIPT: &str = "[skipped]";

/// Machine states for one interview session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InterviewState {
    Setup,
    Ready,
    Asking,
    Listening,
    Processing,
    Evaluating,
    Deciding,
    Complete,
    GeneratingReport,
    Finished,
    Paused,
    Error,
    Cancelled,
}

impl InterviewState {
    /// Destinations reachable from this state. Requested transitions
    /// outside this table are rejected without mutating the session.
    pub fn allowed_transitions(&self) -> &'static [InterviewState] {
        use InterviewState::*;
        match self {
            Setup => &[Ready, Cancelled],
            Ready => &[Asking, Cancelled],
            Asking => &[Listening, Paused, Error],
            Listening => &[Processing, Paused, Error],
            Processing => &[Evaluating, Error],
            Evaluating => &[Deciding, Error],
            Deciding => &[Asking, Complete, Error],
            Complete => &[GeneratingReport],
            GeneratingReport => &[Finished, Error],
            Finished | Paused | Error | Cancelled => &[],
        }
    }

    pub fn can_transition_to(&self, next: InterviewState) -> bool {
        self.allowed_transitions().contains(&next)
    }

    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            InterviewState::Finished | InterviewState::Error | InterviewState::Cancelled
        )
    }
}

impl fmt::Display for InterviewState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            InterviewState::Setup => "setup",
            InterviewState::Ready => "ready",
            InterviewState::Asking => "asking",
            InterviewState::Listening => "listening",
            InterviewState::Processing => "processing",
            InterviewState::Evaluating => "evaluating",
            InterviewState::Deciding => "deciding",
            InterviewState::Complete => "complete",
            InterviewState::GeneratingReport => "generating_report",
            InterviewState::Finished => "finished",
            InterviewState::Paused => "paused",
            InterviewState::Error => "error",
            InterviewState::Cancelled => "cancelled",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Error)]
pub enum SetupError {
    #[error("max_questions must be at least 1")]
    MaxQuestionsZero,
    #[error("years_of_experience out of range: {0}")]
    ExperienceOutOfRange(u8),
    #[error("skill id appears in both include and exclude lists: {0}")]
    ConflictingSkillFilter(String),
}

/// Immutable interview parameters captured at session creation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InterviewSetup {
    pub target_role: Role,
    pub years_of_experience: u8,
    pub cloud_preference: CloudPreference,
    pub mode: InterviewMode,
    pub max_questions: u32,
    #[serde(default)]
    pub include_skills: Vec<String>,
    #[serde(default)]
    pub exclude_skills: Vec<String>,
}

impl InterviewSetup {
    pub const DEFAULT_MAX_QUESTIONS: u32 = 10;

    pub fn validate(&self) -> Result<(), SetupError> {
        if self.max_questions == 0 {
            return Err(SetupError::MaxQuestionsZero);
        }
        if self.years_of_experience > 60 {
            return Err(SetupError::ExperienceOutOfRange(self.years_of_experience));
        }
        for skill in &self.include_skills {
            if self.exclude_skills.contains(skill) {
                return Err(SetupError::ConflictingSkillFilter(skill.clone()));
            }
        }
        Ok(())
    }

    /// Skill ids this interview may cover, after include/exclude filters.
    pub fn applicable_skills(&self) -> Vec<String> {
        let mut skills: Vec<String> = skills_for_role(self.target_role)
            .iter()
            .map(|s| s.id.to_string())
            .collect();
        if !self.include_skills.is_empty() {
            for extra in &self.include_skills {
                if !skills.contains(extra) {
                    skills.push(extra.clone());
                }
            }
        }
        skills.retain(|s| !self.exclude_skills.contains(s));
        skills
    }
}

/// Who produced a conversation turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TurnRole {
    Interviewer,
    Candidate,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConversationTurn {
    pub role: TurnRole,
    pub text: String,
}

/// One asked question and everything recorded about its answer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuestionResponse {
    pub question_id: String,
    pub question_text: String,
    pub skill_id: String,
    pub difficulty: u8,
    pub is_followup: bool,
    pub parent_question_id: Option<String>,
    pub followup_reason: Option<String>,
    pub transcript: Option<String>,
    pub evaluation: Option<ResponseEvaluation>,
    pub asked_at: DateTime<Utc>,
    pub answered_at: Option<DateTime<Utc>>,
}

impl QuestionResponse {
    pub fn is_skipped(&self) -> bool {
        self.transcript.as_deref() == Some(SKIPPED_TRANSCRIPT)
    }

    pub fn is_scored(&self) -> bool {
        self.evaluation.is_some() && !self.is_skipped()
    }

    pub fn overall_score(&self) -> Option<f64> {
        if self.is_skipped() {
            return None;
        }
        self.evaluation.as_ref().map(|e| e.scores.overall())
    }
}

/// The central mutable aggregate for one interview attempt.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InterviewSession {
    pub id: String,
    pub setup: InterviewSetup,
    pub state: InterviewState,
    pub questions: Vec<QuestionResponse>,
    pub total_core_questions_asked: u32,
    pub total_followups_asked: u32,
    /// Follow-ups issued for the current core question only.
    pub current_question_followups: u32,
    pub fingerprints: HashSet<String>,
    pub asked_skills: HashSet<String>,
    /// Turns for the active core question and its follow-ups. Reset at
    /// every core-question boundary.
    pub current_question_context: Vec<ConversationTurn>,
    pub skill_scores: BTreeMap<String, Vec<f64>>,
    pub running_score: f64,
    pub current_difficulty: u8,
    pub difficulty_history: Vec<DifficultyChange>,
    pub created_at: DateTime<Utc>,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    pub error_message: Option<String>,
    /// Cached final report, making repeated end_interview calls idempotent.
    pub report: Option<InterviewReport>,
}

impl InterviewSession {
    pub fn new(setup: InterviewSetup) -> Self {
        let mut skill_scores = BTreeMap::new();
        for skill in setup.applicable_skills() {
            skill_scores.insert(skill, Vec::new());
        }
        let current_difficulty = setup.target_role.initial_difficulty();
        Self {
            id: Uuid::new_v4().to_string(),
            setup,
            state: InterviewState::Setup,
            questions: Vec::new(),
            total_core_questions_asked: 0,
            total_followups_asked: 0,
            current_question_followups: 0,
            fingerprints: HashSet::new(),
            asked_skills: HashSet::new(),
            current_question_context: Vec::new(),
            skill_scores,
            running_score: 0.0,
            current_difficulty,
            difficulty_history: Vec::new(),
            created_at: Utc::now(),
            started_at: None,
            completed_at: None,
            error_message: None,
            report: None,
        }
    }

    pub fn current_question(&self) -> Option<&QuestionResponse> {
        self.questions.last()
    }

    pub fn current_question_mut(&mut self) -> Option<&mut QuestionResponse> {
        self.questions.last_mut()
    }

    /// Records a newly asked question, maintaining counters, the
    /// fingerprint set, and the conversation context. Core questions
    /// reset the context; follow-ups extend it.
    pub fn add_question(&mut self, question: QuestionResponse, fingerprint: String) {
        if question.is_followup {
            self.total_followups_asked += 1;
            self.current_question_followups += 1;
        } else {
            self.total_core_questions_asked += 1;
            self.current_question_followups = 0;
            self.current_question_context.clear();
        }
        self.fingerprints.insert(fingerprint);
        self.asked_skills.insert(question.skill_id.clone());
        self.current_question_context.push(ConversationTurn {
            role: TurnRole::Interviewer,
            text: question.question_text.clone(),
        });
        self.questions.push(question);
    }

    pub fn add_candidate_turn(&mut self, text: &str) {
        self.current_question_context.push(ConversationTurn {
            role: TurnRole::Candidate,
            text: text.to_string(),
        });
    }

    /// True once the core-question budget is spent.
    pub fn should_end(&self) -> bool {
        self.total_core_questions_asked >= self.setup.max_questions
    }

    pub fn covered_skills(&self) -> Vec<String> {
        let mut covered: Vec<String> = self.asked_skills.iter().cloned().collect();
        covered.sort();
        covered
    }

    pub fn remaining_skills(&self) -> Vec<String> {
        self.skill_scores
            .keys()
            .filter(|s| !self.asked_skills.contains(*s))
            .cloned()
            .collect()
    }

    pub fn prior_question_texts(&self) -> Vec<String> {
        self.questions
            .iter()
            .map(|q| q.question_text.clone())
            .collect()
    }

    pub fn scored_overalls(&self) -> Vec<f64> {
        self.questions
            .iter()
            .filter_map(|q| q.overall_score())
            .collect()
    }

    pub fn duration_seconds(&self) -> Option<i64> {
        let started = self.started_at?;
        let end = self.completed_at.unwrap_or_else(Utc::now);
        Some((end - started).num_seconds())
    }
}
