//! Response scoring types and aggregation.

use serde::{Deserialize, Serialize};

use crate::session::InterviewSession;

/// Fixed weights for the overall score. A hard contract of the scoring
/// model, not a tunable default.
const W_TECHNICAL: f64 = 0.30;
const W_DEPTH: f64 = 0.25;
const W_PRACTICAL: f64 = 0.20;
const W_COMMUNICATION: f64 = 0.15;
const W_CONFIDENCE: f64 = 0.10;

/// Five scoring dimensions, each 0-10.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScoreBreakdown {
    pub technical_correctness: f64,
    pub depth_of_understanding: f64,
    pub practical_experience: f64,
    pub communication_clarity: f64,
    pub confidence: f64,
}

impl ScoreBreakdown {
    /// Weighted overall score on the 0-10 scale. The orchestrator always
    /// computes this itself rather than trusting a gateway-supplied value.
    pub fn overall(&self) -> f64 {
        self.technical_correctness * W_TECHNICAL
            + self.depth_of_understanding * W_DEPTH
            + self.practical_experience * W_PRACTICAL
            + self.communication_clarity * W_COMMUNICATION
            + self.confidence * W_CONFIDENCE
    }

    pub fn clamped(self) -> Self {
        Self {
            technical_correctness: self.technical_correctness.clamp(0.0, 10.0),
            depth_of_understanding: self.depth_of_understanding.clamp(0.0, 10.0),
            practical_experience: self.practical_experience.clamp(0.0, 10.0),
            communication_clarity: self.communication_clarity.clamp(0.0, 10.0),
            confidence: self.confidence.clamp(0.0, 10.0),
        }
    }
}

/// Qualitative band for a single overall score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScoreLevel {
    Excellent,
    Good,
    Adequate,
    Weak,
    Poor,
}

impl ScoreLevel {
    pub fn from_overall(score: f64) -> Self {
        if score >= 8.5 {
            ScoreLevel::Excellent
        } else if score >= 7.0 {
            ScoreLevel::Good
        } else if score >= 5.0 {
            ScoreLevel::Adequate
        } else if score >= 3.0 {
            ScoreLevel::Weak
        } else {
            ScoreLevel::Poor
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EvaluationFeedback {
    #[serde(default)]
    pub what_went_well: Vec<String>,
    #[serde(default)]
    pub what_was_missing: Vec<String>,
    #[serde(default)]
    pub red_flags: Vec<String>,
    #[serde(default)]
    pub seniority_signals: Vec<String>,
}

/// Full evaluation of one answer as attached to its QuestionResponse.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResponseEvaluation {
    pub question_id: String,
    pub skill_id: String,
    pub scores: ScoreBreakdown,
    pub feedback: EvaluationFeedback,
    /// Advisory only. The difficulty thresholds decide whether a
    /// follow-up actually happens.
    pub needs_followup: bool,
    pub followup_reason: Option<String>,
    /// Set when the evaluation came from the local heuristic instead of
    /// the reasoning gateway.
    #[serde(default)]
    pub degraded: bool,
}

/// Appends an overall score under a skill and recomputes the running
/// mean from scratch over every scored answer.
pub fn record_score(session: &mut InterviewSession, skill_id: &str, overall: f64) {
    session
        .skill_scores
        .entry(skill_id.to_string())
        .or_default()
        .push(overall);
    let scored: Vec<f64> = session
        .skill_scores
        .values()
        .flat_map(|v| v.iter().copied())
        .collect();
    session.running_score = if scored.is_empty() {
        0.0
    } else {
        scored.iter().sum::<f64>() / scored.len() as f64
    };
}

const TECHNICAL_KEYWORDS: &[&str] = &[
    "partition", "index", "schema", "pipeline", "batch", "stream", "shuffle",
    "join", "aggregate", "idempotent", "latency", "throughput", "replica",
    "consistency", "warehouse", "lake", "dag", "orchestration", "transaction",
    "cluster", "cache", "retry", "backfill", "checkpoint",
];

/// Transcript-based scoring used when the gateway returns malformed
/// evaluator output. Deliberately conservative: length and keyword
/// density only, never above the "good" band.
pub fn heuristic_evaluation(
    question_id: &str,
    skill_id: &str,
    transcript: &str,
) -> ResponseEvaluation {
    let words: Vec<&str> = transcript.split_whitespace().collect();
    let lower = transcript.to_lowercase();
    let keyword_hits = TECHNICAL_KEYWORDS
        .iter()
        .filter(|k| lower.contains(*k))
        .count();

    let length_score: f64 = match words.len() {
        0..=10 => 2.0,
        11..=40 => 4.0,
        41..=120 => 5.5,
        _ => 6.5,
    };
    let keyword_score = (keyword_hits as f64 * 0.5).min(2.0);
    let technical = (length_score + keyword_score).min(7.0);

    let scores = ScoreBreakdown {
        technical_correctness: technical,
        depth_of_understanding: (technical - 0.5).max(1.0),
        practical_experience: (length_score - 0.5).max(1.0),
        communication_clarity: length_score,
        confidence: length_score,
    }
    .clamped();

    ResponseEvaluation {
        question_id: question_id.to_string(),
        skill_id: skill_id.to_string(),
        scores,
        feedback: EvaluationFeedback {
            what_went_well: if keyword_hits > 0 {
                vec!["Used relevant technical vocabulary".to_string()]
            } else {
                vec![]
            },
            what_was_missing: vec![
                "Automated scoring was unavailable for this answer; assessed on structure only"
                    .to_string(),
            ],
            red_flags: vec![],
            seniority_signals: vec![],
        },
        needs_followup: scores.overall() < 5.0,
        followup_reason: None,
        degraded: true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::roles::{CloudPreference, InterviewMode, Role};
    use crate::session::InterviewSetup;
    use approx::assert_relative_eq;

    #[test]
    fn weighted_overall_is_exact() {
        let scores = ScoreBreakdown {
            technical_correctness: 8.0,
            depth_of_understanding: 6.0,
            practical_experience: 4.0,
            communication_clarity: 9.0,
            confidence: 7.0,
        };
        assert_relative_eq!(scores.overall(), 6.75, epsilon = 1e-9);
    }

    #[test]
    fn score_levels_band_correctly() {
        assert_eq!(ScoreLevel::from_overall(9.0), ScoreLevel::Excellent);
        assert_eq!(ScoreLevel::from_overall(7.0), ScoreLevel::Good);
        assert_eq!(ScoreLevel::from_overall(5.5), ScoreLevel::Adequate);
        assert_eq!(ScoreLevel::from_overall(3.2), ScoreLevel::Weak);
        assert_eq!(ScoreLevel::from_overall(1.0), ScoreLevel::Poor);
    }

    #[test]
    fn running_score_is_plain_mean() {
        let mut session = InterviewSession::new(InterviewSetup {
            target_role: Role::Senior,
            years_of_experience: 6,
            cloud_preference: CloudPreference::Gcp,
            mode: InterviewMode::Structured,
            max_questions: 10,
            include_skills: vec![],
            exclude_skills: vec![],
        });
        record_score(&mut session, "spark_tuning", 8.0);
        assert_relative_eq!(session.running_score, 8.0);
        record_score(&mut session, "cap_theorem", 4.0);
        assert_relative_eq!(session.running_score, 6.0);
        record_score(&mut session, "spark_tuning", 6.0);
        assert_relative_eq!(session.running_score, 6.0);
        assert_eq!(session.skill_scores["spark_tuning"], vec![8.0, 6.0]);
    }

    #[test]
    fn heuristic_scores_stay_conservative() {
        let short = heuristic_evaluation("q1", "sql_joins", "I don't know");
        assert!(short.scores.overall() < 4.0);
        assert!(short.degraded);

        let long = heuristic_evaluation(
            "q1",
            "spark_tuning",
            &"we partition the data and checkpoint the stream to handle shuffle skew "
                .repeat(20),
        );
        assert!(long.scores.overall() > short.scores.overall());
        assert!(long.scores.technical_correctness <= 7.0);
    }

    #[test]
    fn clamping_bounds_dimensions() {
        let scores = ScoreBreakdown {
            technical_correctness: 12.0,
            depth_of_understanding: -1.0,
            practical_experience: 5.0,
            communication_clarity: 5.0,
            confidence: 5.0,
        }
        .clamped();
        assert_eq!(scores.technical_correctness, 10.0);
        assert_eq!(scores.depth_of_understanding, 0.0);
    }
}
