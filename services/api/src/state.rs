//! Shared Application State
//!
//! This module defines the `AppState` struct holding the shared,
//! clonable resources every handler needs.

use crate::config::Config;
use dataready_core::InterviewOrchestrator;
use std::sync::Arc;

/// The shared application state, created once at startup and passed to all handlers.
#[derive(Clone)]
pub struct AppState {
    pub orchestrator: Arc<InterviewOrchestrator>,
    pub config: Arc<Config>,
}
