//! Final report compilation.
//!
//! Runs exactly once per session, at GENERATING_REPORT. Everything here
//! is a pure function of the session's final state; the verdict
//! cutpoints are policy constants injected via `VerdictPolicy`.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::roles::{Role, focus_areas, skill_name};
use crate::session::InterviewSession;

/// Verdict cutpoints on the 0-100 overall scale.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct VerdictPolicy {
    pub strong_hire: f64,
    pub hire: f64,
    pub borderline: f64,
}

impl Default for VerdictPolicy {
    fn default() -> Self {
        Self {
            strong_hire: 85.0,
            hire: 70.0,
            borderline: 50.0,
        }
    }
}

impl VerdictPolicy {
    pub fn verdict(&self, overall: f64) -> HiringVerdict {
        if overall >= self.strong_hire {
            HiringVerdict::StrongHire
        } else if overall >= self.hire {
            HiringVerdict::Hire
        } else if overall >= self.borderline {
            HiringVerdict::Borderline
        } else {
            HiringVerdict::NeedsImprovement
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HiringVerdict {
    StrongHire,
    Hire,
    Borderline,
    NeedsImprovement,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RoleReadiness {
    Ready,
    NearlyReady,
    NeedsDevelopment,
    NotReady,
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct DimensionAverages {
    pub technical_correctness: f64,
    pub depth_of_understanding: f64,
    pub practical_experience: f64,
    pub communication_clarity: f64,
    pub confidence: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoadmapWeek {
    pub week: u32,
    pub focus: String,
    pub activities: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StudyRoadmap {
    pub weeks: Vec<RoadmapWeek>,
    pub practice_suggestions: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuestionFeedback {
    pub number: usize,
    pub question_text: String,
    pub skill_id: String,
    pub is_followup: bool,
    pub skipped: bool,
    pub score: Option<f64>,
    pub what_went_well: Vec<String>,
    pub improvements: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimelinePoint {
    pub number: usize,
    pub is_followup: bool,
    pub score: Option<f64>,
    pub difficulty: u8,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InterviewReport {
    pub session_id: String,
    pub generated_at: DateTime<Utc>,
    pub target_role: Role,
    pub role_display: String,
    pub years_of_experience: u8,
    pub duration_seconds: Option<i64>,
    pub questions_asked: u32,
    pub followups_asked: u32,
    /// 0-100 scale (running score times ten).
    pub overall_score: f64,
    pub score_interpretation: String,
    pub dimension_averages: DimensionAverages,
    pub skill_radar: BTreeMap<String, f64>,
    pub verdict: HiringVerdict,
    pub role_readiness: RoleReadiness,
    pub readiness_summary: String,
    pub top_strengths: Vec<String>,
    pub areas_for_improvement: Vec<String>,
    pub communication_feedback: String,
    pub study_roadmap: StudyRoadmap,
    pub question_feedback: Vec<QuestionFeedback>,
    pub performance_timeline: Vec<TimelinePoint>,
}

const MAX_LISTED_ITEMS: usize = 5;
const WEAK_SKILL_CUTOFF: f64 = 6.5;
const MAX_ROADMAP_SKILLS: usize = 3;

pub fn compile(session: &InterviewSession, policy: &VerdictPolicy) -> InterviewReport {
    let overall = session.running_score * 10.0;
    let dimensions = dimension_averages(session);
    let radar = skill_radar(session);
    let verdict = policy.verdict(overall);
    let (readiness, readiness_summary) = role_readiness(session, overall);

    let mut strengths = Vec::new();
    let mut improvements = Vec::new();
    for question in &session.questions {
        if let Some(evaluation) = &question.evaluation {
            strengths.extend(evaluation.feedback.what_went_well.iter().cloned());
            improvements.extend(evaluation.feedback.what_was_missing.iter().cloned());
            improvements.extend(evaluation.feedback.red_flags.iter().cloned());
        }
    }
    let mut strengths = dedup_keep_order(strengths);
    let mut improvements = dedup_keep_order(improvements);
    strengths.truncate(MAX_LISTED_ITEMS);
    improvements.truncate(MAX_LISTED_ITEMS);

    InterviewReport {
        session_id: session.id.clone(),
        generated_at: Utc::now(),
        target_role: session.setup.target_role,
        role_display: session.setup.target_role.display_name().to_string(),
        years_of_experience: session.setup.years_of_experience,
        duration_seconds: session.duration_seconds(),
        questions_asked: session.total_core_questions_asked,
        followups_asked: session.total_followups_asked,
        overall_score: overall,
        score_interpretation: interpret_score(overall).to_string(),
        dimension_averages: dimensions,
        skill_radar: radar.clone(),
        verdict,
        role_readiness: readiness,
        readiness_summary,
        top_strengths: strengths,
        areas_for_improvement: improvements,
        communication_feedback: communication_feedback(dimensions.communication_clarity)
            .to_string(),
        study_roadmap: build_roadmap(session, &radar, &dimensions),
        question_feedback: question_feedback(session),
        performance_timeline: timeline(session),
    }
}

fn dimension_averages(session: &InterviewSession) -> DimensionAverages {
    let evaluations: Vec<_> = session
        .questions
        .iter()
        .filter(|q| q.is_scored())
        .filter_map(|q| q.evaluation.as_ref())
        .collect();
    if evaluations.is_empty() {
        return DimensionAverages::default();
    }
    let n = evaluations.len() as f64;
    DimensionAverages {
        technical_correctness: evaluations
            .iter()
            .map(|e| e.scores.technical_correctness)
            .sum::<f64>()
            / n,
        depth_of_understanding: evaluations
            .iter()
            .map(|e| e.scores.depth_of_understanding)
            .sum::<f64>()
            / n,
        practical_experience: evaluations
            .iter()
            .map(|e| e.scores.practical_experience)
            .sum::<f64>()
            / n,
        communication_clarity: evaluations
            .iter()
            .map(|e| e.scores.communication_clarity)
            .sum::<f64>()
            / n,
        confidence: evaluations.iter().map(|e| e.scores.confidence).sum::<f64>() / n,
    }
}

/// Mean score per skill, only for skills that were actually scored.
fn skill_radar(session: &InterviewSession) -> BTreeMap<String, f64> {
    session
        .skill_scores
        .iter()
        .filter(|(_, scores)| !scores.is_empty())
        .map(|(skill, scores)| {
            (
                skill.clone(),
                scores.iter().sum::<f64>() / scores.len() as f64,
            )
        })
        .collect()
}

fn interpret_score(overall: f64) -> &'static str {
    if overall >= 85.0 {
        "Outstanding performance across the board."
    } else if overall >= 70.0 {
        "Solid performance with a few gaps worth closing."
    } else if overall >= 50.0 {
        "Mixed performance; core concepts are present but inconsistent."
    } else {
        "Significant gaps against the target role's expectations."
    }
}

fn communication_feedback(clarity: f64) -> &'static str {
    if clarity >= 8.0 {
        "Answers were clear, structured, and easy to follow."
    } else if clarity >= 6.0 {
        "Generally clear answers; tighter structure would help on harder questions."
    } else if clarity > 0.0 {
        "Answers were hard to follow; practice summarizing the approach before diving into detail."
    } else {
        "Not enough answered questions to assess communication."
    }
}

/// Readiness from the overall score, adjusted down one band when the
/// candidate's experience falls short of the role's expected range.
fn role_readiness(session: &InterviewSession, overall: f64) -> (RoleReadiness, String) {
    let base = if overall >= 80.0 {
        RoleReadiness::Ready
    } else if overall >= 65.0 {
        RoleReadiness::NearlyReady
    } else if overall >= 45.0 {
        RoleReadiness::NeedsDevelopment
    } else {
        RoleReadiness::NotReady
    };
    let (min_years, _) = session.setup.target_role.experience_range();
    let under_experienced = session.setup.years_of_experience < min_years;
    let adjusted = match (base, under_experienced) {
        (RoleReadiness::Ready, true) => RoleReadiness::NearlyReady,
        (RoleReadiness::NearlyReady, true) => RoleReadiness::NeedsDevelopment,
        (band, _) => band,
    };
    let role = session.setup.target_role.display_name();
    let summary = match adjusted {
        RoleReadiness::Ready => format!("Performing at the level expected of a {role}."),
        RoleReadiness::NearlyReady => format!(
            "Close to the bar for a {role}; targeted preparation should close the gap."
        ),
        RoleReadiness::NeedsDevelopment => format!(
            "Needs focused development before interviewing again for a {role}."
        ),
        RoleReadiness::NotReady => format!(
            "Not yet ready for a {role}; consider targeting an earlier level while building fundamentals."
        ),
    };
    (adjusted, summary)
}

fn build_roadmap(
    session: &InterviewSession,
    radar: &BTreeMap<String, f64>,
    dimensions: &DimensionAverages,
) -> StudyRoadmap {
    let mut weak: Vec<(&String, f64)> = radar
        .iter()
        .filter(|(_, score)| **score < WEAK_SKILL_CUTOFF)
        .map(|(skill, score)| (skill, *score))
        .collect();
    weak.sort_by(|a, b| a.1.total_cmp(&b.1));
    weak.truncate(MAX_ROADMAP_SKILLS);

    let mut weeks = Vec::new();
    let mut week = 1;
    if dimensions.technical_correctness > 0.0 && dimensions.technical_correctness < 5.0 {
        weeks.push(RoadmapWeek {
            week,
            focus: "Fundamentals review".to_string(),
            activities: focus_areas(session.setup.target_role)
                .iter()
                .map(|a| format!("Revisit {a}"))
                .collect(),
        });
        week += 1;
    }
    for (skill, score) in weak {
        weeks.push(RoadmapWeek {
            week,
            focus: skill_name(skill).to_string(),
            activities: vec![
                format!("Study {} in depth", skill_name(skill)),
                format!("Build a small project exercising {}", skill_name(skill)),
                format!("Scored {:.1}/10 in this interview; aim for 8+", score),
            ],
        });
        week += 1;
    }
    weeks.push(RoadmapWeek {
        week,
        focus: "Mock interview practice".to_string(),
        activities: vec![
            "Run a full-length timed mock interview".to_string(),
            "Practice answering aloud with the situation-action-result structure".to_string(),
        ],
    });

    StudyRoadmap {
        weeks,
        practice_suggestions: vec![
            "Answer one interview question aloud every day".to_string(),
            "Write up one past project as a system-design walkthrough".to_string(),
        ],
    }
}

fn question_feedback(session: &InterviewSession) -> Vec<QuestionFeedback> {
    session
        .questions
        .iter()
        .enumerate()
        .map(|(i, q)| {
            let (went_well, improvements) = q
                .evaluation
                .as_ref()
                .map(|e| {
                    (
                        e.feedback.what_went_well.clone(),
                        e.feedback.what_was_missing.clone(),
                    )
                })
                .unwrap_or_default();
            QuestionFeedback {
                number: i + 1,
                question_text: q.question_text.clone(),
                skill_id: q.skill_id.clone(),
                is_followup: q.is_followup,
                skipped: q.is_skipped(),
                score: q.overall_score(),
                what_went_well: went_well,
                improvements,
            }
        })
        .collect()
}

fn timeline(session: &InterviewSession) -> Vec<TimelinePoint> {
    session
        .questions
        .iter()
        .enumerate()
        .map(|(i, q)| TimelinePoint {
            number: i + 1,
            is_followup: q.is_followup,
            score: q.overall_score(),
            difficulty: q.difficulty,
        })
        .collect()
}

fn dedup_keep_order(items: Vec<String>) -> Vec<String> {
    let mut seen = std::collections::HashSet::new();
    items
        .into_iter()
        .filter(|item| seen.insert(item.clone()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::evaluation::{EvaluationFeedback, ResponseEvaluation, ScoreBreakdown, record_score};
    use crate::roles::{CloudPreference, InterviewMode};
    use crate::session::{InterviewSetup, QuestionResponse, SKIPPED_TRANSCRIPT};

    fn scored_question(id: &str, skill: &str, score: f64, strengths: &[&str]) -> QuestionResponse {
        QuestionResponse {
            question_id: id.to_string(),
            question_text: format!("question {id}"),
            skill_id: skill.to_string(),
            difficulty: 5,
            is_followup: false,
            parent_question_id: None,
            followup_reason: None,
            transcript: Some("an answer".to_string()),
            evaluation: Some(ResponseEvaluation {
                question_id: id.to_string(),
                skill_id: skill.to_string(),
                scores: ScoreBreakdown {
                    technical_correctness: score,
                    depth_of_understanding: score,
                    practical_experience: score,
                    communication_clarity: score,
                    confidence: score,
                },
                feedback: EvaluationFeedback {
                    what_went_well: strengths.iter().map(|s| s.to_string()).collect(),
                    what_was_missing: vec!["more depth".to_string()],
                    red_flags: vec![],
                    seniority_signals: vec![],
                },
                needs_followup: false,
                followup_reason: None,
                degraded: false,
            }),
            asked_at: Utc::now(),
            answered_at: Some(Utc::now()),
        }
    }

    fn session_with_scores(scores: &[(&str, f64)]) -> InterviewSession {
        let mut session = InterviewSession::new(InterviewSetup {
            target_role: Role::Mid,
            years_of_experience: 3,
            cloud_preference: CloudPreference::Agnostic,
            mode: InterviewMode::Structured,
            max_questions: 10,
            include_skills: vec![],
            exclude_skills: vec![],
        });
        for (i, (skill, score)) in scores.iter().enumerate() {
            let q = scored_question(&format!("q{i}"), skill, *score, &["clear reasoning"]);
            session.add_question(q, format!("fp{i}"));
            record_score(&mut session, skill, *score);
        }
        session
    }

    #[test]
    fn default_verdict_cutpoints() {
        let policy = VerdictPolicy::default();
        assert_eq!(policy.verdict(90.0), HiringVerdict::StrongHire);
        assert_eq!(policy.verdict(85.0), HiringVerdict::StrongHire);
        assert_eq!(policy.verdict(70.0), HiringVerdict::Hire);
        assert_eq!(policy.verdict(55.0), HiringVerdict::Borderline);
        assert_eq!(policy.verdict(49.9), HiringVerdict::NeedsImprovement);
    }

    #[test]
    fn overall_is_running_score_times_ten() {
        let session = session_with_scores(&[("sql_joins", 8.0), ("spark_fundamentals", 6.0)]);
        let report = compile(&session, &VerdictPolicy::default());
        assert!((report.overall_score - 70.0).abs() < 1e-9);
        assert_eq!(report.verdict, HiringVerdict::Hire);
    }

    #[test]
    fn radar_averages_per_skill() {
        let session = session_with_scores(&[
            ("sql_joins", 8.0),
            ("sql_joins", 6.0),
            ("spark_fundamentals", 4.0),
        ]);
        let report = compile(&session, &VerdictPolicy::default());
        assert!((report.skill_radar["sql_joins"] - 7.0).abs() < 1e-9);
        assert!((report.skill_radar["spark_fundamentals"] - 4.0).abs() < 1e-9);
        // Skills never asked carry no radar entry.
        assert!(!report.skill_radar.contains_key("airflow_basics"));
    }

    #[test]
    fn strengths_are_deduplicated_in_order() {
        let mut session = session_with_scores(&[("sql_joins", 7.0)]);
        let q = scored_question("q9", "dag_design", 7.0, &["clear reasoning", "good examples"]);
        session.add_question(q, "fp9".to_string());
        record_score(&mut session, "dag_design", 7.0);
        let report = compile(&session, &VerdictPolicy::default());
        assert_eq!(
            report.top_strengths,
            vec!["clear reasoning".to_string(), "good examples".to_string()]
        );
    }

    #[test]
    fn roadmap_targets_weakest_skills_first() {
        let session = session_with_scores(&[
            ("sql_joins", 3.0),
            ("spark_fundamentals", 5.0),
            ("dag_design", 9.0),
        ]);
        let report = compile(&session, &VerdictPolicy::default());
        let focuses: Vec<&str> = report
            .study_roadmap
            .weeks
            .iter()
            .map(|w| w.focus.as_str())
            .collect();
        // Technical average is 5.67, so no fundamentals week; the weakest
        // skill leads.
        assert_eq!(focuses[0], "SQL Joins");
        assert!(focuses.contains(&"Mock interview practice"));
        assert!(!focuses.contains(&"DAG Design Patterns"));
        let weeks: Vec<u32> = report.study_roadmap.weeks.iter().map(|w| w.week).collect();
        assert_eq!(weeks, (1..=weeks.len() as u32).collect::<Vec<_>>());
    }

    #[test]
    fn under_experienced_candidates_get_adjusted_readiness() {
        let mut session = session_with_scores(&[("data_platform_design", 8.5)]);
        session.setup.target_role = Role::Senior;
        session.setup.years_of_experience = 1;
        let report = compile(&session, &VerdictPolicy::default());
        assert_eq!(report.role_readiness, RoleReadiness::NearlyReady);
    }

    #[test]
    fn skipped_questions_appear_unscored_in_feedback() {
        let mut session = session_with_scores(&[("sql_joins", 7.0)]);
        let mut skipped = scored_question("q8", "dag_design", 0.0, &[]);
        skipped.evaluation = None;
        skipped.transcript = Some(SKIPPED_TRANSCRIPT.to_string());
        session.add_question(skipped, "fp8".to_string());
        let report = compile(&session, &VerdictPolicy::default());
        let entry = report.question_feedback.last().unwrap();
        assert!(entry.skipped);
        assert!(entry.score.is_none());
        assert_eq!(report.performance_timeline.len(), 2);
        assert!(report.performance_timeline[1].score.is_none());
    }

    #[test]
    fn empty_session_compiles_without_panics() {
        let session = session_with_scores(&[]);
        let report = compile(&session, &VerdictPolicy::default());
        assert_eq!(report.overall_score, 0.0);
        assert_eq!(report.verdict, HiringVerdict::NeedsImprovement);
        assert!(report.skill_radar.is_empty());
        assert_eq!(report.dimension_averages, DimensionAverages::default());
    }

    #[test]
    fn report_round_trips_through_json() {
        let session = session_with_scores(&[("sql_joins", 7.0)]);
        let report = compile(&session, &VerdictPolicy::default());
        let json = serde_json::to_string(&report).unwrap();
        let back: InterviewReport = serde_json::from_str(&json).unwrap();
        assert_eq!(back, report);
    }
}
