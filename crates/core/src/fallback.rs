//! Curated static question pool used when the reasoning gateway cannot
//! produce a usable, non-duplicate question. Selection never fails: if
//! every pool entry has already been asked, the duplicate filter resets.

use rand::prelude::IndexedRandom;

use crate::dedup;
use crate::question::{FollowupKind, FollowupQuestion, Question, QuestionKind};
use crate::roles::{CloudPreference, Role};
use crate::session::InterviewSession;

struct PoolEntry {
    text: &'static str,
    skill_id: &'static str,
    kind: QuestionKind,
}

const fn entry(text: &'static str, skill_id: &'static str, kind: QuestionKind) -> PoolEntry {
    PoolEntry { text, skill_id, kind }
}

fn role_pool(role: Role) -> &'static [PoolEntry] {
    use QuestionKind::*;
    match role {
        Role::Junior => {
            const P: &[PoolEntry] = &[
                entry("What is the difference between an INNER JOIN and a LEFT JOIN?", "sql_joins", Conceptual),
                entry("Explain what a primary key is and why tables need one.", "relational_db_concepts", Conceptual),
                entry("Walk me through what happens in a basic ETL job.", "etl_concepts", Conceptual),
                entry("When would you use GROUP BY, and what does HAVING add to it?", "sql_aggregations", Conceptual),
                entry("What is the difference between a database and a data warehouse?", "relational_db_concepts", Conceptual),
                entry("How would you load a daily CSV export into a database table?", "etl_concepts", Scenario),
                entry("What does it mean for an operation to be idempotent, and why does that matter for data loads?", "etl_concepts", Conceptual),
                entry("Name a managed cloud service you would use for object storage and describe how you have used it.", "cloud_fundamentals", Scenario),
            ];
            P
        }
        Role::Mid => {
            const P: &[PoolEntry] = &[
                entry("How would you design an incremental load for a table that receives updates and deletes?", "incremental_loads", Design),
                entry("Explain window functions and give a case where GROUP BY cannot replace them.", "sql_window_functions", Conceptual),
                entry("A nightly Airflow DAG started failing intermittently. How do you investigate?", "airflow_basics", Troubleshooting),
                entry("What is the difference between a Spark transformation and an action?", "spark_fundamentals", Conceptual),
                entry("How do you test a data pipeline before promoting it to production?", "data_testing", Scenario),
                entry("A query that used to run in seconds now takes minutes. Walk me through your tuning process.", "sql_optimization", Troubleshooting),
                entry("How would you handle a source system adding and renaming columns over time?", "schema_evolution", Scenario),
                entry("What data quality checks would you put on an ingest pipeline, and where?", "data_quality_concepts", Design),
            ];
            P
        }
        Role::Senior => {
            const P: &[PoolEntry] = &[
                entry("Design a pipeline that ingests clickstream events and makes them queryable within five minutes.", "stream_processing", Design),
                entry("How do you detect and fix data skew in a Spark job?", "data_skew_handling", Troubleshooting),
                entry("Explain exactly-once semantics in stream processing and what it costs to achieve.", "exactly_once_semantics", Conceptual),
                entry("Compare a lakehouse architecture with a classic warehouse. When is each the wrong choice?", "lakehouse_architecture", Tradeoff),
                entry("What does the CAP theorem actually constrain in a real data platform?", "cap_theorem", Conceptual),
                entry("How would you design backfill for a pipeline with three years of history without disrupting daily loads?", "etl_pipeline_design", Design),
                entry("Describe how you would add lineage tracking to an existing platform.", "lineage_tracking", Design),
                entry("Your streaming job's consumer lag is growing steadily. What do you look at first?", "stream_processing", Troubleshooting),
            ];
            P
        }
        Role::Staff => {
            const P: &[PoolEntry] = &[
                entry("You own data platforms for six product teams with conflicting needs. How do you set platform strategy?", "platform_strategy", Behavioral),
                entry("Design a multi-region data platform with a four-hour recovery objective.", "data_platform_design", Design),
                entry("How would you roll out column-level access control across an organization?", "data_security", Design),
                entry("Walk me through evaluating build versus buy for a metadata catalog.", "technology_evaluation", Tradeoff),
                entry("A business unit wants to adopt a second cloud provider. How do you assess and contain the cost?", "multi_cloud_strategy", Tradeoff),
                entry("How do you drive down the compute bill of a platform by thirty percent without breaking SLAs?", "cloud_cost_optimization", Scenario),
            ];
            P
        }
        Role::Principal => {
            const P: &[PoolEntry] = &[
                entry("Describe a five-year data architecture vision for a company migrating off a legacy warehouse.", "enterprise_data_architecture", Design),
                entry("How do you establish data governance in an organization that has none?", "data_governance", Design),
                entry("Two VPs disagree on centralizing versus federating data ownership. How do you resolve it?", "stakeholder_management", Behavioral),
                entry("What criteria do you use to retire a widely-used internal data technology?", "technology_evaluation", Tradeoff),
                entry("How do you measure whether a data platform organization is succeeding?", "platform_strategy", Behavioral),
            ];
            P
        }
    }
}

fn cloud_pool(cloud: CloudPreference) -> &'static [PoolEntry] {
    use QuestionKind::*;
    match cloud {
        CloudPreference::Aws => {
            const P: &[PoolEntry] = &[
                entry("Compare Redshift, Athena, and querying Parquet on S3 directly. When do you pick each?", "cloud_data_services", Tradeoff),
                entry("How would you build an event-driven ingest pipeline with S3, Lambda, and SQS?", "cloud_data_services", Design),
                entry("What Glue features would you use for schema discovery, and where does Glue fall short?", "cloud_data_services", Conceptual),
            ];
            P
        }
        CloudPreference::Gcp => {
            const P: &[PoolEntry] = &[
                entry("How does BigQuery separate storage from compute, and how does that change cost tuning?", "cloud_data_services", Conceptual),
                entry("Design a streaming pipeline on Pub/Sub and Dataflow with late-data handling.", "cloud_data_services", Design),
                entry("When would you choose Bigtable over BigQuery?", "cloud_data_services", Tradeoff),
            ];
            P
        }
        CloudPreference::Azure => {
            const P: &[PoolEntry] = &[
                entry("Compare Synapse dedicated pools with serverless SQL over a data lake.", "cloud_data_services", Tradeoff),
                entry("How would you orchestrate ingestion with Azure Data Factory, and where are its limits?", "cloud_data_services", Conceptual),
                entry("Design a medallion architecture on ADLS and Databricks.", "cloud_data_services", Design),
            ];
            P
        }
        CloudPreference::Agnostic => &[],
    }
}

/// Picks a pool question the session has not asked yet. Resets the
/// duplicate filter when the pool is exhausted, so this always returns.
pub fn pick_question(session: &InterviewSession) -> Question {
    let role_entries = role_pool(session.setup.target_role);
    let cloud_entries = cloud_pool(session.setup.cloud_preference);
    let combined: Vec<&PoolEntry> = role_entries.iter().chain(cloud_entries.iter()).collect();

    let fresh: Vec<&PoolEntry> = combined
        .iter()
        .filter(|e| !dedup::is_duplicate(session, e.text))
        .copied()
        .collect();

    let mut rng = rand::rng();
    let pool = if fresh.is_empty() { &combined } else { &fresh };
    let chosen: &PoolEntry = pool.choose(&mut rng).copied().unwrap_or(&role_entries[0]);

    Question::new(
        chosen.text.to_string(),
        chosen.skill_id.to_string(),
        chosen.kind,
        session.current_difficulty,
    )
}

/// Canned follow-up used when the gateway cannot produce one. Banded by
/// how weak the triggering answer was.
pub fn pick_followup(score: f64) -> FollowupQuestion {
    let (kind, text) = if score < 2.5 {
        (
            FollowupKind::Clarify,
            "Let's take a step back. Can you explain the basic idea in your own words?",
        )
    } else {
        (
            FollowupKind::Example,
            "Can you walk me through a concrete example from a project you have worked on?",
        )
    };
    FollowupQuestion {
        kind,
        text: text.to_string(),
        reason: "answer needed more depth".to_string(),
    }
}
