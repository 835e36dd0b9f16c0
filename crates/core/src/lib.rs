//! Core domain for the DataReady mock-interview service.
//!
//! The orchestrator in [`orchestrator`] drives one interview session at a
//! time through a validated state machine, delegating question
//! generation and scoring to a [`gateway::ReasoningGateway`] and
//! persisting through a [`store::SessionStore`]. Both seams are traits
//! so transports and backends stay out of this crate.

pub mod dedup;
pub mod difficulty;
pub mod evaluation;
pub mod fallback;
pub mod gateway;
pub mod orchestrator;
pub mod question;
pub mod report;
pub mod roles;
pub mod session;
pub mod store;

pub use gateway::{OpenAiReasoningGateway, ReasoningGateway};
pub use orchestrator::{CandidateAnswer, InterviewOrchestrator, OrchestratorError, StepOutcome};
pub use report::{InterviewReport, VerdictPolicy};
pub use session::{InterviewSession, InterviewSetup, InterviewState};
pub use store::{InMemorySessionStore, SessionStore};
