//! Role, cloud, and skill taxonomy for the interview domain.
//!
//! The catalog is static: question generation and reporting both key off
//! skill ids, so the ids here are the single source of truth for what a
//! session can cover.

use serde::{Deserialize, Serialize};

/// Target role for an interview session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Junior,
    Mid,
    Senior,
    Staff,
    Principal,
}

impl Role {
    pub fn display_name(&self) -> &'static str {
        match self {
            Role::Junior => "Junior Data Engineer",
            Role::Mid => "Mid-Level Data Engineer",
            Role::Senior => "Senior Data Engineer",
            Role::Staff => "Staff Data Engineer",
            Role::Principal => "Principal Data Engineer",
        }
    }

    /// Starting difficulty (1-10) for a fresh session targeting this role.
    pub fn initial_difficulty(&self) -> u8 {
        match self {
            Role::Junior => 3,
            Role::Mid => 5,
            Role::Senior => 7,
            Role::Staff => 8,
            Role::Principal => 9,
        }
    }

    /// Expected years-of-experience range, used for readiness assessment.
    pub fn experience_range(&self) -> (u8, u8) {
        match self {
            Role::Junior => (0, 2),
            Role::Mid => (2, 5),
            Role::Senior => (5, 8),
            Role::Staff => (8, 12),
            Role::Principal => (12, 30),
        }
    }

    pub fn all() -> &'static [Role] {
        &[
            Role::Junior,
            Role::Mid,
            Role::Senior,
            Role::Staff,
            Role::Principal,
        ]
    }
}

/// Cloud platform preference steering question generation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CloudPreference {
    Aws,
    Gcp,
    Azure,
    Agnostic,
}

/// Whether the interviewer may probe with follow-up questions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InterviewMode {
    Structured,
    StructuredFollowup,
}

/// High-level skill grouping used for report breakdowns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SkillCategory {
    Sql,
    Etl,
    Spark,
    Streaming,
    Cloud,
    Orchestration,
    DistributedSystems,
    SystemDesign,
    DataQuality,
    Observability,
    Governance,
    Tooling,
}

/// A single entry in the static skill catalog.
#[derive(Debug, Clone, Serialize)]
pub struct Skill {
    pub id: &'static str,
    pub name: &'static str,
    pub category: SkillCategory,
    pub roles: &'static [Role],
}

const J: Role = Role::Junior;
const M: Role = Role::Mid;
const S: Role = Role::Senior;
const T: Role = Role::Staff;
const P: Role = Role::Principal;

/// Full skill catalog. Ids are stable and referenced by the fallback
/// question pool and by generated questions.
pub const SKILL_CATALOG: &[Skill] = &[
    Skill { id: "sql_basics", name: "SQL Fundamentals", category: SkillCategory::Sql, roles: &[J] },
    Skill { id: "sql_joins", name: "SQL Joins", category: SkillCategory::Sql, roles: &[J, M] },
    Skill { id: "sql_aggregations", name: "SQL Aggregations", category: SkillCategory::Sql, roles: &[J, M] },
    Skill { id: "sql_window_functions", name: "Window Functions", category: SkillCategory::Sql, roles: &[M, S] },
    Skill { id: "sql_optimization", name: "SQL Optimization", category: SkillCategory::Sql, roles: &[M, S] },
    Skill { id: "etl_concepts", name: "ETL Concepts", category: SkillCategory::Etl, roles: &[J] },
    Skill { id: "etl_pipeline_design", name: "ETL Pipeline Design", category: SkillCategory::Etl, roles: &[M, S] },
    Skill { id: "incremental_loads", name: "Incremental Loading", category: SkillCategory::Etl, roles: &[M, S] },
    Skill { id: "schema_evolution", name: "Schema Evolution", category: SkillCategory::DataQuality, roles: &[M, S] },
    Skill { id: "spark_fundamentals", name: "Spark Fundamentals", category: SkillCategory::Spark, roles: &[M] },
    Skill { id: "spark_tuning", name: "Spark Performance Tuning", category: SkillCategory::Spark, roles: &[S, T] },
    Skill { id: "data_skew_handling", name: "Data Skew Handling", category: SkillCategory::Spark, roles: &[S, T] },
    Skill { id: "stream_processing", name: "Stream Processing", category: SkillCategory::Streaming, roles: &[S, T] },
    Skill { id: "exactly_once_semantics", name: "Exactly-Once Semantics", category: SkillCategory::Streaming, roles: &[S, T] },
    Skill { id: "distributed_computing", name: "Distributed Computing", category: SkillCategory::DistributedSystems, roles: &[S, T] },
    Skill { id: "cap_theorem", name: "CAP Theorem", category: SkillCategory::DistributedSystems, roles: &[S, T] },
    Skill { id: "data_platform_design", name: "Data Platform Design", category: SkillCategory::SystemDesign, roles: &[S, T] },
    Skill { id: "lakehouse_architecture", name: "Lakehouse Architecture", category: SkillCategory::SystemDesign, roles: &[S, T] },
    Skill { id: "enterprise_data_architecture", name: "Enterprise Data Architecture", category: SkillCategory::SystemDesign, roles: &[T, P] },
    Skill { id: "airflow_basics", name: "Airflow Fundamentals", category: SkillCategory::Orchestration, roles: &[M, S] },
    Skill { id: "dag_design", name: "DAG Design Patterns", category: SkillCategory::Orchestration, roles: &[M, S] },
    Skill { id: "data_quality_concepts", name: "Data Quality Concepts", category: SkillCategory::DataQuality, roles: &[M, S] },
    Skill { id: "data_testing", name: "Data Testing", category: SkillCategory::DataQuality, roles: &[M, S] },
    Skill { id: "pipeline_monitoring", name: "Pipeline Monitoring", category: SkillCategory::Observability, roles: &[M, S] },
    Skill { id: "lineage_tracking", name: "Data Lineage", category: SkillCategory::Observability, roles: &[S, T] },
    Skill { id: "cloud_fundamentals", name: "Cloud Fundamentals", category: SkillCategory::Cloud, roles: &[J] },
    Skill { id: "cloud_data_services", name: "Cloud Data Services", category: SkillCategory::Cloud, roles: &[M, S] },
    Skill { id: "cloud_cost_optimization", name: "Cloud Cost Optimization", category: SkillCategory::Cloud, roles: &[S, T] },
    Skill { id: "multi_cloud_strategy", name: "Multi-Cloud Strategy", category: SkillCategory::Cloud, roles: &[T, P] },
    Skill { id: "data_governance", name: "Data Governance", category: SkillCategory::Governance, roles: &[T, P] },
    Skill { id: "data_security", name: "Data Security", category: SkillCategory::Governance, roles: &[S, T] },
    Skill { id: "platform_strategy", name: "Platform Strategy", category: SkillCategory::SystemDesign, roles: &[T, P] },
    Skill { id: "stakeholder_management", name: "Stakeholder Management", category: SkillCategory::Tooling, roles: &[T, P] },
    Skill { id: "technology_evaluation", name: "Technology Evaluation", category: SkillCategory::Tooling, roles: &[T, P] },
    Skill { id: "python_fundamentals", name: "Python Fundamentals", category: SkillCategory::Tooling, roles: &[J, M] },
    Skill { id: "relational_db_concepts", name: "Relational Database Concepts", category: SkillCategory::Sql, roles: &[J] },
];

/// All catalog skills applicable to a role.
pub fn skills_for_role(role: Role) -> Vec<&'static Skill> {
    SKILL_CATALOG
        .iter()
        .filter(|s| s.roles.contains(&role))
        .collect()
}

pub fn skill_name(skill_id: &str) -> &str {
    SKILL_CATALOG
        .iter()
        .find(|s| s.id == skill_id)
        .map(|s| s.name)
        .unwrap_or(skill_id)
}

/// Focus areas a role is expected to demonstrate, surfaced in reports.
pub fn focus_areas(role: Role) -> &'static [&'static str] {
    match role {
        Role::Junior => &[
            "SQL fundamentals",
            "ETL basics",
            "Relational databases",
            "Cloud fundamentals",
        ],
        Role::Mid => &[
            "Advanced SQL",
            "ETL pipeline design",
            "Spark fundamentals",
            "Workflow orchestration",
            "Data quality and testing",
        ],
        Role::Senior => &[
            "Data platform design",
            "Performance tuning",
            "Distributed systems",
            "Streaming design",
            "Observability and resiliency",
        ],
        Role::Staff => &[
            "Platform ownership",
            "Cross-domain architecture",
            "Governance and security",
            "Multi-cloud strategy",
        ],
        Role::Principal => &[
            "Enterprise architecture",
            "Technology vision",
            "Organization-wide impact",
            "Strategic partnerships",
        ],
    }
}
