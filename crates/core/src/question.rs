//! Question and follow-up value types produced by the reasoning gateway
//! and the fallback pool.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QuestionKind {
    Conceptual,
    Scenario,
    Design,
    Troubleshooting,
    Tradeoff,
    Behavioral,
}

impl Default for QuestionKind {
    fn default() -> Self {
        QuestionKind::Conceptual
    }
}

/// Coarse difficulty band derived from the numeric 1-10 level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DifficultyBand {
    Easy,
    Medium,
    Hard,
    Expert,
}

impl DifficultyBand {
    pub fn from_level(level: u8) -> Self {
        match level {
            0..=3 => DifficultyBand::Easy,
            4..=6 => DifficultyBand::Medium,
            7..=8 => DifficultyBand::Hard,
            _ => DifficultyBand::Expert,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Question {
    pub id: String,
    pub text: String,
    pub skill_id: String,
    pub kind: QuestionKind,
    pub difficulty: u8,
    pub band: DifficultyBand,
    #[serde(default)]
    pub expected_points: Vec<String>,
    #[serde(default)]
    pub red_flags: Vec<String>,
}

impl Question {
    pub fn new(text: String, skill_id: String, kind: QuestionKind, difficulty: u8) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            text,
            skill_id,
            kind,
            difficulty,
            band: DifficultyBand::from_level(difficulty),
            expected_points: Vec::new(),
            red_flags: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FollowupKind {
    Probe,
    Clarify,
    Example,
    Challenge,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FollowupQuestion {
    pub kind: FollowupKind,
    pub text: String,
    pub reason: String,
}
