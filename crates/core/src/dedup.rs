//! Question text normalization and fingerprinting for duplicate detection.

use sha2::{Digest, Sha256};

use crate::session::InterviewSession;

/// Lowercases, strips punctuation, and collapses whitespace so trivially
/// rephrased duplicates hash identically.
pub fn normalize(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut last_was_space = true;
    for c in text.to_lowercase().chars() {
        if c.is_alphanumeric() || c == '_' {
            out.push(c);
            last_was_space = false;
        } else if c.is_whitespace() && !last_was_space {
            out.push(' ');
            last_was_space = true;
        }
    }
    while out.ends_with(' ') {
        out.pop();
    }
    out
}

/// Stable fingerprint of normalized question text.
pub fn fingerprint(text: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(normalize(text).as_bytes());
    hex::encode(hasher.finalize())
}

pub fn is_duplicate(session: &InterviewSession, text: &str) -> bool {
    session.fingerprints.contains(&fingerprint(text))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::roles::{CloudPreference, InterviewMode, Role};
    use crate::session::InterviewSetup;

    #[test]
    fn normalization_is_case_and_punctuation_insensitive() {
        assert_eq!(
            normalize("What is a  JOIN?"),
            normalize("what is a join")
        );
        assert_eq!(normalize("  Explain   ETL!!  "), "explain etl");
    }

    #[test]
    fn underscores_survive_normalization() {
        assert_eq!(normalize("describe dag_design"), "describe dag_design");
    }

    #[test]
    fn equivalent_texts_share_a_fingerprint() {
        assert_eq!(
            fingerprint("Explain CAP theorem."),
            fingerprint("explain cap THEOREM")
        );
        assert_ne!(
            fingerprint("Explain CAP theorem."),
            fingerprint("Explain ACID properties.")
        );
    }

    #[test]
    fn fingerprint_is_hex_sha256() {
        let fp = fingerprint("anything");
        assert_eq!(fp.len(), 64);
        assert!(fp.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn duplicate_check_uses_session_set() {
        let mut session = InterviewSession::new(InterviewSetup {
            target_role: Role::Junior,
            years_of_experience: 1,
            cloud_preference: CloudPreference::Agnostic,
            mode: InterviewMode::Structured,
            max_questions: 3,
            include_skills: vec![],
            exclude_skills: vec![],
        });
        assert!(!is_duplicate(&session, "What is a primary key?"));
        session
            .fingerprints
            .insert(fingerprint("What is a primary key?"));
        assert!(is_duplicate(&session, "what IS a primary key??"));
    }
}
