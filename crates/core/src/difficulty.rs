//! Score-driven difficulty policy.
//!
//! The thresholds here are the authority for the follow-up versus
//! next-question branch: the evaluator's needs_followup flag is advisory
//! and never overrides them.

use serde::{Deserialize, Serialize};

/// A weak answer (below this overall score) triggers a follow-up probe.
pub const FOLLOWUP_THRESHOLD: f64 = 5.0;
/// A strong answer (at or above) raises the difficulty one level.
pub const RAISE_THRESHOLD: f64 = 7.5;

pub const MIN_DIFFICULTY: u8 = 1;
pub const MAX_DIFFICULTY: u8 = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DifficultyDirection {
    Increase,
    Unchanged,
}

/// One entry in the session's difficulty audit trail. Appended on every
/// decision, including holds.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DifficultyChange {
    pub level: u8,
    pub direction: DifficultyDirection,
    pub score: f64,
}

/// What DECIDING should do next, as determined by the score thresholds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NextStep {
    Followup,
    Advance,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DifficultyDecision {
    pub step: NextStep,
    pub level: u8,
    pub change: DifficultyChange,
}

/// Applies the threshold policy to the latest overall score.
pub fn decide(score: f64, current: u8) -> DifficultyDecision {
    let current = current.clamp(MIN_DIFFICULTY, MAX_DIFFICULTY);
    if score < FOLLOWUP_THRESHOLD {
        return DifficultyDecision {
            step: NextStep::Followup,
            level: current,
            change: DifficultyChange {
                level: current,
                direction: DifficultyDirection::Unchanged,
                score,
            },
        };
    }
    if score >= RAISE_THRESHOLD && current < MAX_DIFFICULTY {
        let level = current + 1;
        return DifficultyDecision {
            step: NextStep::Advance,
            level,
            change: DifficultyChange {
                level,
                direction: DifficultyDirection::Increase,
                score,
            },
        };
    }
    DifficultyDecision {
        step: NextStep::Advance,
        level: current,
        change: DifficultyChange {
            level: current,
            direction: DifficultyDirection::Unchanged,
            score,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn weak_score_holds_difficulty_and_requests_followup() {
        let decision = decide(4.9, 6);
        assert_eq!(decision.step, NextStep::Followup);
        assert_eq!(decision.level, 6);
        assert_eq!(decision.change.direction, DifficultyDirection::Unchanged);
    }

    #[test]
    fn strong_score_raises_by_one_with_logged_increase() {
        let decision = decide(8.0, 9);
        assert_eq!(decision.step, NextStep::Advance);
        assert_eq!(decision.level, 10);
        assert_eq!(decision.change.direction, DifficultyDirection::Increase);
    }

    #[test]
    fn difficulty_is_capped_at_ten() {
        let decision = decide(9.5, 10);
        assert_eq!(decision.level, 10);
        assert_eq!(decision.change.direction, DifficultyDirection::Unchanged);
    }

    #[test]
    fn middling_score_advances_without_change() {
        let decision = decide(7.4, 5);
        assert_eq!(decision.step, NextStep::Advance);
        assert_eq!(decision.level, 5);
        assert_eq!(decision.change.direction, DifficultyDirection::Unchanged);
    }

    #[test]
    fn boundary_scores() {
        assert_eq!(decide(5.0, 5).step, NextStep::Advance);
        assert_eq!(decide(7.5, 5).level, 6);
    }
}
