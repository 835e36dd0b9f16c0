//! The interview state machine and its operation contracts.
//!
//! All session mutation funnels through this type: transitions are
//! validated against the table in `session.rs`, observers are notified
//! after each commit, and every session is a single-writer resource
//! guarded by a per-session lock.

use std::collections::HashMap;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::Arc;

use chrono::Utc;
use serde::Serialize;
use thiserror::Error;
use tokio::sync::Mutex;
use tracing::{error, info, instrument, warn};
use uuid::Uuid;

use crate::dedup;
use crate::difficulty::{self, DifficultyChange, DifficultyDirection, NextStep};
use crate::evaluation::{self, ResponseEvaluation, heuristic_evaluation};
use crate::fallback;
use crate::gateway::{GatewayContext, GatewayError, GatewayPayload, ReasoningGateway};
use crate::question::{FollowupKind, FollowupQuestion, Question, QuestionKind};
use crate::report::{self, InterviewReport, VerdictPolicy};
use crate::session::{
    InterviewSession, InterviewSetup, InterviewState, QuestionResponse, SKIPPED_TRANSCRIPT,
};
use crate::store::SessionStore;

/// Dedup retry bound for question generation before the static pool.
const GENERATION_ATTEMPTS: u32 = 3;
/// Transport retry bound for evaluation before the session goes to ERROR.
const EVALUATION_ATTEMPTS: u32 = 3;
/// Probing stops after this many follow-ups on one core question.
const MAX_FOLLOWUPS_PER_QUESTION: u32 = 2;

#[derive(Debug, Error)]
pub enum OrchestratorError {
    #[error("invalid transition from {from} to {to}")]
    InvalidTransition {
        from: InterviewState,
        to: InterviewState,
    },
    #[error("session not found: {0}")]
    SessionNotFound(String),
    #[error("validation failed: {0}")]
    Validation(String),
    #[error("reasoning gateway unavailable: {0}")]
    GatewayUnavailable(String),
    #[error("another operation is in flight for session {0}")]
    ConcurrentAccess(String),
    #[error(transparent)]
    Store(#[from] anyhow::Error),
}

/// Candidate input for the active question.
#[derive(Debug, Clone)]
pub enum CandidateAnswer {
    Transcript(String),
    Skip,
}

#[derive(Debug, Clone, Serialize)]
pub struct QuestionPrompt {
    pub question_id: String,
    pub text: String,
    pub skill_id: String,
    pub difficulty: u8,
    /// 1-based ordinal among core questions.
    pub number: u32,
    pub total: u32,
}

#[derive(Debug, Clone, Serialize)]
pub struct FollowupPrompt {
    pub question_id: String,
    pub text: String,
    pub kind: FollowupKind,
    pub reason: String,
}

/// What the caller should present next after an operation.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum StepOutcome {
    Question(QuestionPrompt),
    Followup(FollowupPrompt),
    Complete(InterviewReport),
}

pub type StateObserver = Arc<dyn Fn(&str, InterviewState, InterviewState) + Send + Sync>;

pub struct InterviewOrchestrator {
    store: Arc<dyn SessionStore>,
    gateway: Arc<dyn ReasoningGateway>,
    verdicts: VerdictPolicy,
    observers: std::sync::RwLock<Vec<StateObserver>>,
    locks: Mutex<HashMap<String, Arc<Mutex<()>>>>,
}

impl InterviewOrchestrator {
    pub fn new(store: Arc<dyn SessionStore>, gateway: Arc<dyn ReasoningGateway>) -> Self {
        Self {
            store,
            gateway,
            verdicts: VerdictPolicy::default(),
            observers: std::sync::RwLock::new(Vec::new()),
            locks: Mutex::new(HashMap::new()),
        }
    }

    pub fn with_verdict_policy(mut self, verdicts: VerdictPolicy) -> Self {
        self.verdicts = verdicts;
        self
    }

    /// Registers a state-change observer. Observers run synchronously
    /// after each transition commits; their failures are swallowed.
    pub fn on_state_change<F>(&self, observer: F)
    where
        F: Fn(&str, InterviewState, InterviewState) + Send + Sync + 'static,
    {
        let mut observers = self.observers.write().unwrap_or_else(|e| e.into_inner());
        observers.push(Arc::new(observer));
    }

    pub async fn create_session(
        &self,
        setup: InterviewSetup,
    ) -> Result<InterviewSession, OrchestratorError> {
        setup
            .validate()
            .map_err(|e| OrchestratorError::Validation(e.to_string()))?;
        let session = InterviewSession::new(setup);
        info!(session_id = %session.id, role = ?session.setup.target_role, "session created");
        self.store.insert(session.clone()).await?;
        Ok(session)
    }

    pub async fn get_session(
        &self,
        session_id: &str,
    ) -> Result<InterviewSession, OrchestratorError> {
        self.load(session_id).await
    }

    /// Asks the first question. Auto-promotes SETUP to READY.
    #[instrument(skip(self))]
    pub async fn start_interview(
        &self,
        session_id: &str,
    ) -> Result<QuestionPrompt, OrchestratorError> {
        let _guard = self.acquire(session_id).await?;
        let mut session = self.load(session_id).await?;

        if session.state == InterviewState::Setup {
            self.transition(&mut session, InterviewState::Ready)?;
        }
        if session.state != InterviewState::Ready {
            return Err(OrchestratorError::InvalidTransition {
                from: session.state,
                to: InterviewState::Asking,
            });
        }

        let question = self.next_question(&session).await;
        self.transition(&mut session, InterviewState::Asking)?;
        let prompt = self.ask_core_question(&mut session, question);
        self.store.update(&session).await?;
        Ok(prompt)
    }

    /// Records the answer, scores it, and resolves DECIDING into a
    /// follow-up, the next core question, or completion.
    #[instrument(skip(self, answer))]
    pub async fn submit_response(
        &self,
        session_id: &str,
        answer: CandidateAnswer,
    ) -> Result<StepOutcome, OrchestratorError> {
        let _guard = self.acquire(session_id).await?;
        let mut session = self.load(session_id).await?;

        if session.state == InterviewState::Asking {
            self.transition(&mut session, InterviewState::Listening)?;
        }
        if session.state != InterviewState::Listening {
            return Err(OrchestratorError::InvalidTransition {
                from: session.state,
                to: InterviewState::Processing,
            });
        }
        self.transition(&mut session, InterviewState::Processing)?;

        let skipped = matches!(answer, CandidateAnswer::Skip);
        let transcript = match answer {
            CandidateAnswer::Transcript(text) => text,
            CandidateAnswer::Skip => SKIPPED_TRANSCRIPT.to_string(),
        };
        let answered = {
            let question = session
                .current_question_mut()
                .ok_or_else(|| OrchestratorError::Validation("no active question".to_string()))?;
            question.transcript = Some(transcript.clone());
            question.answered_at = Some(Utc::now());
            question.clone()
        };
        if !skipped {
            session.add_candidate_turn(&transcript);
        }

        self.transition(&mut session, InterviewState::Evaluating)?;
        let evaluation = if skipped {
            info!(session_id, "question skipped, no score recorded");
            None
        } else {
            let ctx = GatewayContext::from_session(&session);
            match self.evaluate(&ctx, &answered, &transcript).await {
                Ok(evaluation) => {
                    if let Some(question) = session.current_question_mut()
                        && question.evaluation.is_none()
                    {
                        question.evaluation = Some(evaluation.clone());
                    }
                    evaluation::record_score(
                        &mut session,
                        &evaluation.skill_id,
                        evaluation.scores.overall(),
                    );
                    Some(evaluation)
                }
                Err(message) => {
                    session.error_message = Some(message.clone());
                    self.transition(&mut session, InterviewState::Error)?;
                    self.store.update(&session).await?;
                    return Err(OrchestratorError::GatewayUnavailable(message));
                }
            }
        };

        self.transition(&mut session, InterviewState::Deciding)?;
        let outcome = self.decide(&mut session, evaluation, skipped).await?;
        self.store.update(&session).await?;
        Ok(outcome)
    }

    /// Forces the session to COMPLETE and produces the report. Idempotent
    /// once FINISHED: the cached report is returned as-is.
    #[instrument(skip(self))]
    pub async fn end_interview(
        &self,
        session_id: &str,
    ) -> Result<InterviewReport, OrchestratorError> {
        let _guard = self.acquire(session_id).await?;
        let mut session = self.load(session_id).await?;

        if session.state == InterviewState::Finished
            && let Some(report) = &session.report
        {
            return Ok(report.clone());
        }
        if session.state.is_terminal() {
            return Err(OrchestratorError::InvalidTransition {
                from: session.state,
                to: InterviewState::Complete,
            });
        }
        if session.state != InterviewState::Complete {
            self.force_complete(&mut session);
        }
        let report = self.finish(&mut session)?;
        self.store.update(&session).await?;
        Ok(report)
    }

    async fn load(&self, session_id: &str) -> Result<InterviewSession, OrchestratorError> {
        self.store
            .get(session_id)
            .await?
            .ok_or_else(|| OrchestratorError::SessionNotFound(session_id.to_string()))
    }

    /// Per-session single-flight: rejects rather than queues, so a stuck
    /// gateway call cannot pile up writers behind it.
    async fn acquire(
        &self,
        session_id: &str,
    ) -> Result<tokio::sync::OwnedMutexGuard<()>, OrchestratorError> {
        let lock = {
            let mut locks = self.locks.lock().await;
            locks
                .entry(session_id.to_string())
                .or_insert_with(|| Arc::new(Mutex::new(())))
                .clone()
        };
        lock.try_lock_owned()
            .map_err(|_| OrchestratorError::ConcurrentAccess(session_id.to_string()))
    }

    fn transition(
        &self,
        session: &mut InterviewSession,
        to: InterviewState,
    ) -> Result<(), OrchestratorError> {
        let from = session.state;
        if !from.can_transition_to(to) {
            return Err(OrchestratorError::InvalidTransition { from, to });
        }
        session.state = to;
        apply_entry_effects(session, to);
        info!(session_id = %session.id, %from, %to, "state transition");
        self.notify(&session.id, from, to);
        Ok(())
    }

    /// end_interview is valid from any non-terminal state, including
    /// states with no COMPLETE edge in the table.
    fn force_complete(&self, session: &mut InterviewSession) {
        let from = session.state;
        session.state = InterviewState::Complete;
        apply_entry_effects(session, InterviewState::Complete);
        info!(session_id = %session.id, %from, "interview ended early, forcing complete");
        self.notify(&session.id, from, InterviewState::Complete);
    }

    fn notify(&self, session_id: &str, from: InterviewState, to: InterviewState) {
        let observers = self.observers.read().unwrap_or_else(|e| e.into_inner());
        for observer in observers.iter() {
            let result = catch_unwind(AssertUnwindSafe(|| observer(session_id, from, to)));
            if result.is_err() {
                error!(session_id, %from, %to, "state observer panicked");
            }
        }
    }

    /// Generation ladder: up to three gateway attempts rejecting
    /// duplicates and unparsable output, then the curated pool.
    async fn next_question(&self, session: &InterviewSession) -> Question {
        let ctx = GatewayContext::from_session(session);
        for attempt in 1..=GENERATION_ATTEMPTS {
            match self.gateway.generate_question(&ctx).await {
                Ok(GatewayPayload::Structured(question)) => {
                    if dedup::is_duplicate(session, &question.text) {
                        warn!(attempt, "generated question duplicates an earlier one");
                        continue;
                    }
                    return question;
                }
                Ok(GatewayPayload::RawText(text)) => {
                    if dedup::is_duplicate(session, &text) {
                        warn!(attempt, "raw-text question duplicates an earlier one");
                        continue;
                    }
                    warn!(attempt, "degraded to raw gateway text for question");
                    let skill = ctx
                        .remaining_skills
                        .first()
                        .cloned()
                        .unwrap_or_else(|| "general".to_string());
                    return Question::new(
                        text,
                        skill,
                        QuestionKind::Conceptual,
                        session.current_difficulty,
                    );
                }
                Ok(GatewayPayload::Unparsable) => {
                    warn!(attempt, "unparsable question payload");
                }
                Err(e) => {
                    warn!(attempt, error = %e, "question generation attempt failed");
                }
            }
        }
        info!(session_id = %session.id, "degraded to the curated question pool");
        fallback::pick_question(session)
    }

    /// Evaluation has no static fallback for transport failure. Malformed
    /// output degrades to the local heuristic; an unreachable gateway
    /// after retries is fatal for the operation.
    async fn evaluate(
        &self,
        ctx: &GatewayContext,
        question: &QuestionResponse,
        transcript: &str,
    ) -> Result<ResponseEvaluation, String> {
        let mut last_error = String::new();
        for attempt in 1..=EVALUATION_ATTEMPTS {
            match self.gateway.evaluate_response(ctx, question, transcript).await {
                Ok(GatewayPayload::Structured(evaluation)) => return Ok(evaluation),
                Ok(GatewayPayload::RawText(_)) | Ok(GatewayPayload::Unparsable) => {
                    warn!(attempt, "malformed evaluation, degrading to heuristic scoring");
                    return Ok(heuristic_evaluation(
                        &question.question_id,
                        &question.skill_id,
                        transcript,
                    ));
                }
                Err(GatewayError::Degraded(message)) => {
                    warn!(attempt, %message, "degraded evaluation, using heuristic scoring");
                    return Ok(heuristic_evaluation(
                        &question.question_id,
                        &question.skill_id,
                        transcript,
                    ));
                }
                Err(GatewayError::Unavailable(message)) => {
                    warn!(attempt, %message, "evaluation attempt failed");
                    last_error = message;
                }
            }
        }
        Err(last_error)
    }

    async fn next_followup(
        &self,
        session: &InterviewSession,
        evaluation: &ResponseEvaluation,
    ) -> FollowupQuestion {
        let ctx = GatewayContext::from_session(session);
        match self.gateway.generate_followup(&ctx, evaluation).await {
            Ok(GatewayPayload::Structured(followup)) => followup,
            Ok(GatewayPayload::RawText(text)) => {
                warn!("degraded to raw gateway text for follow-up");
                FollowupQuestion {
                    kind: FollowupKind::Probe,
                    text,
                    reason: evaluation
                        .followup_reason
                        .clone()
                        .unwrap_or_else(|| "answer needed more depth".to_string()),
                }
            }
            Ok(GatewayPayload::Unparsable) => {
                warn!("unparsable follow-up payload, using canned follow-up");
                fallback::pick_followup(evaluation.scores.overall())
            }
            Err(e) => {
                warn!(error = %e, "follow-up generation failed, using canned follow-up");
                fallback::pick_followup(evaluation.scores.overall())
            }
        }
    }

    /// Resolves DECIDING. The difficulty thresholds are authoritative;
    /// the evaluator's needs_followup flag cannot override them.
    async fn decide(
        &self,
        session: &mut InterviewSession,
        evaluation: Option<ResponseEvaluation>,
        skipped: bool,
    ) -> Result<StepOutcome, OrchestratorError> {
        let decision = match (&evaluation, skipped) {
            (Some(evaluation), false) => {
                difficulty::decide(evaluation.scores.overall(), session.current_difficulty)
            }
            _ => difficulty::DifficultyDecision {
                step: NextStep::Advance,
                level: session.current_difficulty,
                change: DifficultyChange {
                    level: session.current_difficulty,
                    direction: DifficultyDirection::Unchanged,
                    score: 0.0,
                },
            },
        };
        session.current_difficulty = decision.level;
        session.difficulty_history.push(decision.change);

        let followups_allowed = session.setup.mode == crate::roles::InterviewMode::StructuredFollowup
            && session.current_question_followups < MAX_FOLLOWUPS_PER_QUESTION;

        if decision.step == NextStep::Followup && !skipped && followups_allowed {
            let evaluation = evaluation.as_ref().ok_or_else(|| {
                OrchestratorError::Validation("follow-up requested without evaluation".to_string())
            })?;
            let followup = self.next_followup(session, evaluation).await;
            self.transition(session, InterviewState::Asking)?;
            let prompt = self.ask_followup(session, followup);
            return Ok(StepOutcome::Followup(prompt));
        }

        if session.should_end() {
            self.transition(session, InterviewState::Complete)?;
            let report = self.finish(session)?;
            return Ok(StepOutcome::Complete(report));
        }

        let question = self.next_question(session).await;
        self.transition(session, InterviewState::Asking)?;
        let prompt = self.ask_core_question(session, question);
        Ok(StepOutcome::Question(prompt))
    }

    fn ask_core_question(
        &self,
        session: &mut InterviewSession,
        question: Question,
    ) -> QuestionPrompt {
        let fingerprint = dedup::fingerprint(&question.text);
        let record = QuestionResponse {
            question_id: question.id.clone(),
            question_text: question.text.clone(),
            skill_id: question.skill_id.clone(),
            difficulty: question.difficulty,
            is_followup: false,
            parent_question_id: None,
            followup_reason: None,
            transcript: None,
            evaluation: None,
            asked_at: Utc::now(),
            answered_at: None,
        };
        session.add_question(record, fingerprint);
        QuestionPrompt {
            question_id: question.id,
            text: question.text,
            skill_id: question.skill_id,
            difficulty: question.difficulty,
            number: session.total_core_questions_asked,
            total: session.setup.max_questions,
        }
    }

    fn ask_followup(
        &self,
        session: &mut InterviewSession,
        followup: FollowupQuestion,
    ) -> FollowupPrompt {
        let parent = session
            .current_question()
            .map(|q| {
                q.parent_question_id
                    .clone()
                    .unwrap_or_else(|| q.question_id.clone())
            })
            .unwrap_or_default();
        let skill = session
            .current_question()
            .map(|q| q.skill_id.clone())
            .unwrap_or_else(|| "general".to_string());
        let question_id = Uuid::new_v4().to_string();
        let fingerprint = dedup::fingerprint(&followup.text);
        let record = QuestionResponse {
            question_id: question_id.clone(),
            question_text: followup.text.clone(),
            skill_id: skill,
            difficulty: session.current_difficulty,
            is_followup: true,
            parent_question_id: Some(parent),
            followup_reason: Some(followup.reason.clone()),
            transcript: None,
            evaluation: None,
            asked_at: Utc::now(),
            answered_at: None,
        };
        session.add_question(record, fingerprint);
        FollowupPrompt {
            question_id,
            text: followup.text,
            kind: followup.kind,
            reason: followup.reason,
        }
    }

    /// COMPLETE → GENERATING_REPORT → FINISHED, caching the report.
    fn finish(
        &self,
        session: &mut InterviewSession,
    ) -> Result<InterviewReport, OrchestratorError> {
        self.transition(session, InterviewState::GeneratingReport)?;
        let report = report::compile(session, &self.verdicts);
        session.report = Some(report.clone());
        self.transition(session, InterviewState::Finished)?;
        info!(session_id = %session.id, overall = report.overall_score, "report generated");
        Ok(report)
    }
}

fn apply_entry_effects(session: &mut InterviewSession, to: InterviewState) {
    match to {
        InterviewState::Ready => {
            if session.started_at.is_none() {
                session.started_at = Some(Utc::now());
            }
        }
        InterviewState::Complete => {
            if session.completed_at.is_none() {
                session.completed_at = Some(Utc::now());
            }
        }
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::evaluation::{EvaluationFeedback, ScoreBreakdown};
    use crate::gateway::MockReasoningGateway;
    use crate::roles::{CloudPreference, InterviewMode, Role};
    use crate::store::InMemorySessionStore;
    use std::sync::Mutex as StdMutex;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn setup(mode: InterviewMode, max_questions: u32) -> InterviewSetup {
        InterviewSetup {
            target_role: Role::Mid,
            years_of_experience: 3,
            cloud_preference: CloudPreference::Aws,
            mode,
            max_questions,
            include_skills: vec![],
            exclude_skills: vec![],
        }
    }

    fn evaluation_with_score(question: &QuestionResponse, all: f64) -> ResponseEvaluation {
        ResponseEvaluation {
            question_id: question.question_id.clone(),
            skill_id: question.skill_id.clone(),
            scores: ScoreBreakdown {
                technical_correctness: all,
                depth_of_understanding: all,
                practical_experience: all,
                communication_clarity: all,
                confidence: all,
            },
            feedback: EvaluationFeedback::default(),
            needs_followup: false,
            followup_reason: Some("probe further".to_string()),
            degraded: false,
        }
    }

    fn unique_question_gateway() -> MockReasoningGateway {
        let mut gateway = MockReasoningGateway::new();
        let counter = AtomicU32::new(0);
        gateway.expect_generate_question().returning(move |ctx| {
            let n = counter.fetch_add(1, Ordering::SeqCst);
            Ok(GatewayPayload::Structured(Question::new(
                format!("generated question number {n}"),
                "sql_joins".to_string(),
                QuestionKind::Conceptual,
                ctx.difficulty,
            )))
        });
        gateway
    }

    fn orchestrator(gateway: MockReasoningGateway) -> InterviewOrchestrator {
        InterviewOrchestrator::new(
            Arc::new(InMemorySessionStore::new()),
            Arc::new(gateway),
        )
    }

    #[tokio::test]
    async fn create_session_rejects_invalid_setup() {
        let orch = orchestrator(MockReasoningGateway::new());
        let result = orch
            .create_session(setup(InterviewMode::Structured, 0))
            .await;
        assert!(matches!(result, Err(OrchestratorError::Validation(_))));
    }

    #[tokio::test]
    async fn start_asks_first_question_and_reaches_asking() {
        let mut gateway = unique_question_gateway();
        gateway.expect_evaluate_response().never();
        let orch = orchestrator(gateway);
        let session = orch
            .create_session(setup(InterviewMode::Structured, 5))
            .await
            .unwrap();
        let prompt = orch.start_interview(&session.id).await.unwrap();
        assert_eq!(prompt.number, 1);
        assert_eq!(prompt.total, 5);

        let loaded = orch.get_session(&session.id).await.unwrap();
        assert_eq!(loaded.state, InterviewState::Asking);
        assert!(loaded.started_at.is_some());
        assert_eq!(loaded.total_core_questions_asked, 1);
        assert_eq!(loaded.fingerprints.len(), 1);
    }

    #[tokio::test]
    async fn submit_before_start_is_an_invalid_transition() {
        let orch = orchestrator(MockReasoningGateway::new());
        let session = orch
            .create_session(setup(InterviewMode::Structured, 5))
            .await
            .unwrap();
        let result = orch
            .submit_response(&session.id, CandidateAnswer::Transcript("hi".to_string()))
            .await;
        assert!(matches!(
            result,
            Err(OrchestratorError::InvalidTransition { .. })
        ));
        let loaded = orch.get_session(&session.id).await.unwrap();
        assert_eq!(loaded.state, InterviewState::Setup);
    }

    #[tokio::test]
    async fn unknown_session_id_is_not_found() {
        let orch = orchestrator(MockReasoningGateway::new());
        assert!(matches!(
            orch.start_interview("missing").await,
            Err(OrchestratorError::SessionNotFound(_))
        ));
    }

    #[tokio::test]
    async fn strong_answer_raises_difficulty_and_advances() {
        let mut gateway = unique_question_gateway();
        gateway
            .expect_evaluate_response()
            .returning(|_, q, _| Ok(GatewayPayload::Structured(evaluation_with_score(q, 8.0))));
        let orch = orchestrator(gateway);
        let session = orch
            .create_session(setup(InterviewMode::StructuredFollowup, 5))
            .await
            .unwrap();
        orch.start_interview(&session.id).await.unwrap();
        let outcome = orch
            .submit_response(
                &session.id,
                CandidateAnswer::Transcript("a strong answer".to_string()),
            )
            .await
            .unwrap();
        assert!(matches!(outcome, StepOutcome::Question(_)));

        let loaded = orch.get_session(&session.id).await.unwrap();
        assert_eq!(loaded.current_difficulty, 6);
        assert_eq!(loaded.total_core_questions_asked, 2);
        assert_eq!(loaded.difficulty_history.len(), 1);
        assert_eq!(
            loaded.difficulty_history[0].direction,
            DifficultyDirection::Increase
        );
        assert!((loaded.running_score - 8.0).abs() < 1e-9);
    }

    #[tokio::test]
    async fn weak_answer_triggers_followup_without_consuming_budget() {
        let mut gateway = unique_question_gateway();
        gateway
            .expect_evaluate_response()
            .returning(|_, q, _| Ok(GatewayPayload::Structured(evaluation_with_score(q, 3.0))));
        gateway.expect_generate_followup().returning(|_, _| {
            Ok(GatewayPayload::Structured(FollowupQuestion {
                kind: FollowupKind::Probe,
                text: "can you go deeper on partitioning?".to_string(),
                reason: "shallow answer".to_string(),
            }))
        });
        let orch = orchestrator(gateway);
        let session = orch
            .create_session(setup(InterviewMode::StructuredFollowup, 5))
            .await
            .unwrap();
        orch.start_interview(&session.id).await.unwrap();
        let outcome = orch
            .submit_response(
                &session.id,
                CandidateAnswer::Transcript("a weak answer".to_string()),
            )
            .await
            .unwrap();
        let StepOutcome::Followup(prompt) = outcome else {
            panic!("expected a follow-up");
        };
        assert_eq!(prompt.kind, FollowupKind::Probe);

        let loaded = orch.get_session(&session.id).await.unwrap();
        assert_eq!(loaded.total_core_questions_asked, 1);
        assert_eq!(loaded.total_followups_asked, 1);
        assert_eq!(loaded.current_difficulty, 5);
        assert!(loaded.questions.last().unwrap().is_followup);
    }

    #[tokio::test]
    async fn structured_mode_never_asks_followups() {
        let mut gateway = unique_question_gateway();
        gateway
            .expect_evaluate_response()
            .returning(|_, q, _| Ok(GatewayPayload::Structured(evaluation_with_score(q, 3.0))));
        gateway.expect_generate_followup().never();
        let orch = orchestrator(gateway);
        let session = orch
            .create_session(setup(InterviewMode::Structured, 5))
            .await
            .unwrap();
        orch.start_interview(&session.id).await.unwrap();
        let outcome = orch
            .submit_response(
                &session.id,
                CandidateAnswer::Transcript("a weak answer".to_string()),
            )
            .await
            .unwrap();
        assert!(matches!(outcome, StepOutcome::Question(_)));
    }

    #[tokio::test]
    async fn followups_cap_at_two_per_core_question() {
        let mut gateway = unique_question_gateway();
        gateway
            .expect_evaluate_response()
            .returning(|_, q, _| Ok(GatewayPayload::Structured(evaluation_with_score(q, 2.0))));
        gateway.expect_generate_followup().returning(|_, _| {
            Ok(GatewayPayload::Structured(FollowupQuestion {
                kind: FollowupKind::Clarify,
                text: "what do you mean exactly?".to_string(),
                reason: "unclear".to_string(),
            }))
        });
        let orch = orchestrator(gateway);
        let session = orch
            .create_session(setup(InterviewMode::StructuredFollowup, 5))
            .await
            .unwrap();
        orch.start_interview(&session.id).await.unwrap();
        let answer = || CandidateAnswer::Transcript("still weak".to_string());
        assert!(matches!(
            orch.submit_response(&session.id, answer()).await.unwrap(),
            StepOutcome::Followup(_)
        ));
        assert!(matches!(
            orch.submit_response(&session.id, answer()).await.unwrap(),
            StepOutcome::Followup(_)
        ));
        // Third weak answer on the same lineage must advance.
        assert!(matches!(
            orch.submit_response(&session.id, answer()).await.unwrap(),
            StepOutcome::Question(_)
        ));
        let loaded = orch.get_session(&session.id).await.unwrap();
        assert_eq!(loaded.total_followups_asked, 2);
        assert_eq!(loaded.total_core_questions_asked, 2);
    }

    #[tokio::test]
    async fn skip_never_scores_and_never_probes() {
        let mut gateway = unique_question_gateway();
        gateway.expect_evaluate_response().never();
        gateway.expect_generate_followup().never();
        let orch = orchestrator(gateway);
        let session = orch
            .create_session(setup(InterviewMode::StructuredFollowup, 5))
            .await
            .unwrap();
        orch.start_interview(&session.id).await.unwrap();
        let outcome = orch
            .submit_response(&session.id, CandidateAnswer::Skip)
            .await
            .unwrap();
        assert!(matches!(outcome, StepOutcome::Question(_)));

        let loaded = orch.get_session(&session.id).await.unwrap();
        assert!(loaded.questions[0].is_skipped());
        assert!(loaded.questions[0].evaluation.is_none());
        assert_eq!(loaded.running_score, 0.0);
        assert_eq!(loaded.total_followups_asked, 0);
        assert_eq!(loaded.difficulty_history.len(), 1);
    }

    #[tokio::test]
    async fn single_question_session_completes_after_one_answer() {
        let mut gateway = unique_question_gateway();
        gateway
            .expect_evaluate_response()
            .returning(|_, q, _| Ok(GatewayPayload::Structured(evaluation_with_score(q, 6.0))));
        let orch = orchestrator(gateway);
        let session = orch
            .create_session(setup(InterviewMode::Structured, 1))
            .await
            .unwrap();
        orch.start_interview(&session.id).await.unwrap();
        let outcome = orch
            .submit_response(
                &session.id,
                CandidateAnswer::Transcript("an adequate answer".to_string()),
            )
            .await
            .unwrap();
        let StepOutcome::Complete(report) = outcome else {
            panic!("expected completion");
        };
        assert!((report.overall_score - 60.0).abs() < 1e-6);

        let loaded = orch.get_session(&session.id).await.unwrap();
        assert_eq!(loaded.state, InterviewState::Finished);
        assert!(loaded.completed_at.is_some());
    }

    #[tokio::test]
    async fn duplicate_generation_falls_back_to_the_pool() {
        let mut gateway = MockReasoningGateway::new();
        // Always regenerates the exact text of the first question.
        gateway.expect_generate_question().returning(|ctx| {
            Ok(GatewayPayload::Structured(Question::new(
                "the one and only question".to_string(),
                "sql_joins".to_string(),
                QuestionKind::Conceptual,
                ctx.difficulty,
            )))
        });
        gateway
            .expect_evaluate_response()
            .returning(|_, q, _| Ok(GatewayPayload::Structured(evaluation_with_score(q, 6.0))));
        let orch = orchestrator(gateway);
        let session = orch
            .create_session(setup(InterviewMode::Structured, 5))
            .await
            .unwrap();
        let first = orch.start_interview(&session.id).await.unwrap();
        let outcome = orch
            .submit_response(
                &session.id,
                CandidateAnswer::Transcript("fine".to_string()),
            )
            .await
            .unwrap();
        let StepOutcome::Question(second) = outcome else {
            panic!("expected next question");
        };
        assert_ne!(
            dedup::fingerprint(&second.text),
            dedup::fingerprint(&first.text)
        );
    }

    #[tokio::test]
    async fn unavailable_evaluator_drives_session_to_error() {
        let mut gateway = unique_question_gateway();
        gateway.expect_evaluate_response().times(3).returning(|_, _, _| {
            Err(GatewayError::Unavailable("connection refused".to_string()))
        });
        let orch = orchestrator(gateway);
        let session = orch
            .create_session(setup(InterviewMode::Structured, 5))
            .await
            .unwrap();
        orch.start_interview(&session.id).await.unwrap();
        let result = orch
            .submit_response(
                &session.id,
                CandidateAnswer::Transcript("an answer".to_string()),
            )
            .await;
        assert!(matches!(
            result,
            Err(OrchestratorError::GatewayUnavailable(_))
        ));
        let loaded = orch.get_session(&session.id).await.unwrap();
        assert_eq!(loaded.state, InterviewState::Error);
        assert!(loaded.error_message.is_some());
    }

    #[tokio::test]
    async fn malformed_evaluation_degrades_to_heuristic_not_error() {
        let mut gateway = unique_question_gateway();
        gateway
            .expect_evaluate_response()
            .returning(|_, _, _| Ok(GatewayPayload::Unparsable));
        let orch = orchestrator(gateway);
        let session = orch
            .create_session(setup(InterviewMode::Structured, 5))
            .await
            .unwrap();
        orch.start_interview(&session.id).await.unwrap();
        let outcome = orch
            .submit_response(
                &session.id,
                CandidateAnswer::Transcript(
                    "we partition the warehouse tables and checkpoint the stream".to_string(),
                ),
            )
            .await
            .unwrap();
        assert!(matches!(outcome, StepOutcome::Question(_)));
        let loaded = orch.get_session(&session.id).await.unwrap();
        let evaluation = loaded.questions[0].evaluation.as_ref().unwrap();
        assert!(evaluation.degraded);
    }

    #[tokio::test]
    async fn end_interview_is_idempotent() {
        let mut gateway = unique_question_gateway();
        gateway
            .expect_evaluate_response()
            .returning(|_, q, _| Ok(GatewayPayload::Structured(evaluation_with_score(q, 7.0))));
        let orch = orchestrator(gateway);
        let session = orch
            .create_session(setup(InterviewMode::Structured, 5))
            .await
            .unwrap();
        orch.start_interview(&session.id).await.unwrap();
        orch.submit_response(
            &session.id,
            CandidateAnswer::Transcript("an answer".to_string()),
        )
        .await
        .unwrap();

        let first = orch.end_interview(&session.id).await.unwrap();
        let second = orch.end_interview(&session.id).await.unwrap();
        assert_eq!(first, second);
        assert_eq!(first.generated_at, second.generated_at);
    }

    #[tokio::test]
    async fn end_interview_forces_complete_from_asking() {
        let gateway = unique_question_gateway();
        let orch = orchestrator(gateway);
        let session = orch
            .create_session(setup(InterviewMode::Structured, 5))
            .await
            .unwrap();
        orch.start_interview(&session.id).await.unwrap();
        let report = orch.end_interview(&session.id).await.unwrap();
        assert_eq!(report.session_id, session.id);
        let loaded = orch.get_session(&session.id).await.unwrap();
        assert_eq!(loaded.state, InterviewState::Finished);
    }

    #[tokio::test]
    async fn observers_see_commits_and_cannot_break_them() {
        let gateway = unique_question_gateway();
        let orch = orchestrator(gateway);
        let seen: Arc<StdMutex<Vec<(InterviewState, InterviewState)>>> =
            Arc::new(StdMutex::new(Vec::new()));
        let sink = seen.clone();
        orch.on_state_change(move |_, from, to| {
            sink.lock().unwrap().push((from, to));
        });
        orch.on_state_change(|_, _, _| panic!("observer blows up"));

        let session = orch
            .create_session(setup(InterviewMode::Structured, 5))
            .await
            .unwrap();
        orch.start_interview(&session.id).await.unwrap();

        let transitions = seen.lock().unwrap().clone();
        assert_eq!(
            transitions,
            vec![
                (InterviewState::Setup, InterviewState::Ready),
                (InterviewState::Ready, InterviewState::Asking),
            ]
        );
        let loaded = orch.get_session(&session.id).await.unwrap();
        assert_eq!(loaded.state, InterviewState::Asking);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_submissions_do_not_interleave() {
        let mut gateway = unique_question_gateway();
        gateway.expect_evaluate_response().returning(|_, q, _| {
            // Hold the session lock long enough for the race to be real.
            std::thread::sleep(std::time::Duration::from_millis(100));
            Ok(GatewayPayload::Structured(evaluation_with_score(q, 6.0)))
        });
        let orch = Arc::new(orchestrator(gateway));
        let session = orch
            .create_session(setup(InterviewMode::Structured, 5))
            .await
            .unwrap();
        orch.start_interview(&session.id).await.unwrap();

        let a = {
            let orch = orch.clone();
            let id = session.id.clone();
            tokio::spawn(async move {
                orch.submit_response(&id, CandidateAnswer::Transcript("one".to_string()))
                    .await
            })
        };
        let b = {
            let orch = orch.clone();
            let id = session.id.clone();
            tokio::spawn(async move {
                orch.submit_response(&id, CandidateAnswer::Transcript("two".to_string()))
                    .await
            })
        };
        let (a, b) = (a.await.unwrap(), b.await.unwrap());

        let successes = [&a, &b].iter().filter(|r| r.is_ok()).count();
        assert!(successes >= 1, "at least one submission must proceed");
        for result in [a, b] {
            if let Err(e) = result {
                assert!(
                    matches!(
                        e,
                        OrchestratorError::ConcurrentAccess(_)
                            | OrchestratorError::InvalidTransition { .. }
                    ),
                    "unexpected error: {e}"
                );
            }
        }
        let loaded = orch.get_session(&session.id).await.unwrap();
        // Exactly one answer was recorded for the first question.
        assert!(loaded.questions[0].transcript.is_some());
    }
}
