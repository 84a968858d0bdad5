//! Candidate Matching: deterministic selection of the best candidate for a profile.
//!
//! Algorithm:
//! 1. Relevance: a record is considered only if its role equals the requested role
//!    (case-insensitive), contains it or is contained by it, or its stack overlaps
//!    the requested stack.
//! 2. Hard constraints: record.budget <= profile.max_budget and
//!    record.experience_years >= profile.min_experience_years.
//! 3. Ranking of qualified records: exact role > partial role > stack-only,
//!    then higher overlap count, then lower budget, then store order.
//!
//! When nothing qualifies the result is an explicit `MatchOutcome::NoMatch`; what
//! to do with it is decided by the caller through `MatchFallback`.

use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::models::{CandidateProfile, CandidateRecord};
use crate::store::CandidateStore;

// ────────────────────────────────────────────────────────────────────────────
// Output data models
// ────────────────────────────────────────────────────────────────────────────

/// How well a record's role title lines up with the requested role.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RoleMatch {
    None,
    Partial,
    Exact,
}

/// A hard constraint a record fails, or the reason it was never considered.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Violation {
    OverBudget { asks: u32, budget: u32 },
    Underqualified { years: u32, required: u32 },
    NotRelevant,
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Violation::OverBudget { asks, budget } => {
                write!(f, "asks {asks}, above the budget of {budget}")
            }
            Violation::Underqualified { years, required } => {
                write!(f, "{years} years of experience, {required} required")
            }
            Violation::NotRelevant => write!(f, "neither role nor stack overlaps the request"),
        }
    }
}

/// A record that did not qualify, with every reason why.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rejection {
    pub candidate_id: String,
    pub full_name: String,
    pub violations: Vec<Violation>,
}

/// The selected record together with the evidence for selecting it.
///
/// `violations` is empty for a qualified match and lists the broken hard
/// constraints when the record was chosen as a closest fallback.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchedCandidate {
    pub candidate: CandidateRecord,
    pub role_match: RoleMatch,
    pub stack_overlap: Vec<String>,
    pub violations: Vec<Violation>,
    /// Ordered reason lines: role, stack, budget, experience.
    pub justification: Vec<String>,
    pub summary: String,
}

impl MatchedCandidate {
    pub fn is_qualified(&self) -> bool {
        self.violations.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum MatchOutcome {
    Matched(MatchedCandidate),
    NoMatch {
        rejections: Vec<Rejection>,
        /// Best relevant record ignoring hard constraints, if any record is relevant.
        closest: Option<MatchedCandidate>,
    },
}

/// What the workflow does when no record satisfies both hard constraints.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchFallback {
    /// Abort the run before any inference call.
    #[default]
    Reject,
    /// Continue with the closest relevant record, flagged as not qualified.
    Closest,
}

impl FromStr for MatchFallback {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "reject" => Ok(MatchFallback::Reject),
            "closest" => Ok(MatchFallback::Closest),
            other => Err(format!(
                "unknown match fallback '{other}' (expected 'reject' or 'closest')"
            )),
        }
    }
}

impl fmt::Display for MatchFallback {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MatchFallback::Reject => write!(f, "reject"),
            MatchFallback::Closest => write!(f, "closest"),
        }
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Matching rule
// ────────────────────────────────────────────────────────────────────────────

struct Assessment<'a> {
    index: usize,
    record: &'a CandidateRecord,
    role_match: RoleMatch,
    stack_overlap: Vec<String>,
    violations: Vec<Violation>,
}

impl Assessment<'_> {
    fn is_relevant(&self) -> bool {
        self.role_match != RoleMatch::None || !self.stack_overlap.is_empty()
    }
}

/// Selects the best-matching record in `store` for `profile`.
pub fn match_candidate(profile: &CandidateProfile, store: &CandidateStore) -> MatchOutcome {
    let assessments: Vec<Assessment> = store
        .records()
        .iter()
        .enumerate()
        .map(|(index, record)| assess(index, record, profile))
        .collect();

    let mut qualified: Vec<&Assessment> = assessments
        .iter()
        .filter(|a| a.is_relevant() && a.violations.is_empty())
        .collect();
    qualified.sort_by(|a, b| rank(a, b));

    if let Some(best) = qualified.first() {
        return MatchOutcome::Matched(to_matched(best, profile));
    }

    let rejections = assessments
        .iter()
        .map(|a| Rejection {
            candidate_id: a.record.id.clone(),
            full_name: a.record.full_name.clone(),
            violations: if a.is_relevant() {
                a.violations.clone()
            } else {
                vec![Violation::NotRelevant]
            },
        })
        .collect();

    let closest = assessments
        .iter()
        .filter(|a| a.is_relevant())
        .min_by(|a, b| {
            a.violations
                .len()
                .cmp(&b.violations.len())
                .then_with(|| rank(a, b))
        })
        .map(|a| to_matched(a, profile));

    MatchOutcome::NoMatch {
        rejections,
        closest,
    }
}

fn assess<'a>(index: usize, record: &'a CandidateRecord, profile: &CandidateProfile) -> Assessment<'a> {
    let mut violations = Vec::new();
    if record.budget > profile.max_budget {
        violations.push(Violation::OverBudget {
            asks: record.budget,
            budget: profile.max_budget,
        });
    }
    if record.experience_years < profile.min_experience_years {
        violations.push(Violation::Underqualified {
            years: record.experience_years,
            required: profile.min_experience_years,
        });
    }

    Assessment {
        index,
        record,
        role_match: compare_roles(&record.role, &profile.role),
        stack_overlap: stack_overlap(&record.stack, &profile.required_stack),
        violations,
    }
}

/// Ordering for "better first": role match desc, overlap desc, budget asc, store order.
fn rank(a: &Assessment, b: &Assessment) -> Ordering {
    b.role_match
        .cmp(&a.role_match)
        .then_with(|| b.stack_overlap.len().cmp(&a.stack_overlap.len()))
        .then_with(|| a.record.budget.cmp(&b.record.budget))
        .then_with(|| a.index.cmp(&b.index))
}

fn compare_roles(candidate_role: &str, requested: &str) -> RoleMatch {
    let candidate_role = candidate_role.trim().to_lowercase();
    let requested = requested.trim().to_lowercase();

    if candidate_role.is_empty() || requested.is_empty() {
        RoleMatch::None
    } else if candidate_role == requested {
        RoleMatch::Exact
    } else if candidate_role.contains(&requested) || requested.contains(&candidate_role) {
        RoleMatch::Partial
    } else {
        RoleMatch::None
    }
}

/// Skills present in both stacks, in the candidate's own order and spelling.
fn stack_overlap(candidate_stack: &[String], requested: &[String]) -> Vec<String> {
    candidate_stack
        .iter()
        .filter(|skill| requested.iter().any(|r| r.eq_ignore_ascii_case(skill)))
        .cloned()
        .collect()
}

fn to_matched(assessment: &Assessment, profile: &CandidateProfile) -> MatchedCandidate {
    let record = assessment.record;
    let justification = build_justification(assessment, profile);
    let summary = build_summary(assessment, profile);

    MatchedCandidate {
        candidate: record.clone(),
        role_match: assessment.role_match,
        stack_overlap: assessment.stack_overlap.clone(),
        violations: assessment.violations.clone(),
        justification,
        summary,
    }
}

fn build_justification(assessment: &Assessment, profile: &CandidateProfile) -> Vec<String> {
    let record = assessment.record;
    let mut lines = Vec::with_capacity(4);

    lines.push(match assessment.role_match {
        RoleMatch::Exact => format!("Role '{}' matches the requested role exactly.", record.role),
        RoleMatch::Partial => format!(
            "Role '{}' partially matches the requested '{}'.",
            record.role, profile.role
        ),
        RoleMatch::None => format!(
            "Role '{}' differs from the requested '{}'; selected on stack overlap.",
            record.role, profile.role
        ),
    });

    lines.push(if assessment.stack_overlap.is_empty() {
        "No overlap with the requested stack.".to_string()
    } else {
        format!(
            "Stack overlap ({}): {}.",
            assessment.stack_overlap.len(),
            assessment.stack_overlap.join(", ")
        )
    });

    lines.push(if record.budget <= profile.max_budget {
        format!(
            "Budget: asks {} within the budget of {}.",
            record.budget, profile.max_budget
        )
    } else {
        format!(
            "Budget: asks {}, above the budget of {}.",
            record.budget, profile.max_budget
        )
    });

    lines.push(if record.experience_years >= profile.min_experience_years {
        format!(
            "Experience: {} years meets the required {}.",
            record.experience_years, profile.min_experience_years
        )
    } else {
        format!(
            "Experience: {} years, below the required {}.",
            record.experience_years, profile.min_experience_years
        )
    });

    lines
}

fn build_summary(assessment: &Assessment, profile: &CandidateProfile) -> String {
    let record = assessment.record;
    let head = format!(
        "{} ({}), {}, {} years, asks {}",
        record.full_name, record.id, record.role, record.experience_years, record.budget
    );

    if assessment.violations.is_empty() {
        format!(
            "Selected {head}: fits the budget of {} and the {} years required.",
            profile.max_budget, profile.min_experience_years
        )
    } else {
        let broken: Vec<String> = assessment.violations.iter().map(|v| v.to_string()).collect();
        format!(
            "Closest available {head}, NOT fully qualified: {}.",
            broken.join("; ")
        )
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Tests
// ────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn profile(role: &str, years: u32, budget: u32, stack: &[&str]) -> CandidateProfile {
        CandidateProfile {
            role: role.to_string(),
            min_experience_years: years,
            max_budget: budget,
            required_stack: stack.iter().map(|s| s.to_string()).collect(),
        }
    }

    fn expect_matched(outcome: MatchOutcome) -> MatchedCandidate {
        match outcome {
            MatchOutcome::Matched(m) => m,
            other => panic!("expected a match, got {other:?}"),
        }
    }

    #[test]
    fn test_backend_developer_selects_maria_petrova() {
        let store = CandidateStore::builtin();
        let outcome = match_candidate(
            &profile("Backend Developer", 4, 4000, &["Node.js"]),
            &store,
        );

        let matched = expect_matched(outcome);
        assert_eq!(matched.candidate.id, "c-202");
        assert_eq!(matched.candidate.full_name, "Maria Petrova");
        assert_eq!(matched.role_match, RoleMatch::Exact);
        assert_eq!(matched.stack_overlap, vec!["Node.js"]);
        assert!(matched.is_qualified());
        assert!(matched.candidate.budget <= 4000);
        assert!(matched.candidate.experience_years >= 4);
    }

    #[test]
    fn test_devops_over_budget_is_no_match() {
        let store = CandidateStore::builtin();
        let outcome = match_candidate(&profile("DevOps Engineer", 6, 4000, &[]), &store);

        match outcome {
            MatchOutcome::NoMatch {
                rejections,
                closest,
            } => {
                assert_eq!(rejections.len(), store.len());

                let devops = rejections
                    .iter()
                    .find(|r| r.candidate_id == "c-303")
                    .unwrap();
                assert_eq!(
                    devops.violations,
                    vec![Violation::OverBudget {
                        asks: 4500,
                        budget: 4000
                    }]
                );

                let closest = closest.expect("c-303 is relevant so a closest candidate exists");
                assert_eq!(closest.candidate.id, "c-303");
                assert!(!closest.is_qualified());
                assert!(closest.summary.contains("NOT fully qualified"));
            }
            other => panic!("expected NoMatch, got {other:?}"),
        }
    }

    #[test]
    fn test_no_relevant_record_has_no_closest() {
        let store = CandidateStore::builtin();
        let outcome = match_candidate(&profile("Astronaut", 0, 100_000, &["Orbital Mechanics"]), &store);
        match outcome {
            MatchOutcome::NoMatch {
                rejections,
                closest,
            } => {
                assert!(closest.is_none());
                assert!(rejections
                    .iter()
                    .all(|r| r.violations == vec![Violation::NotRelevant]));
            }
            other => panic!("expected NoMatch, got {other:?}"),
        }
    }

    #[test]
    fn test_every_match_respects_hard_constraints() {
        let store = CandidateStore::builtin();
        let requests = [
            profile("Backend Developer", 0, 10_000, &[]),
            profile("Developer", 2, 3200, &["React"]),
            profile("Engineer", 3, 2600, &[]),
            profile("Data Scientist", 5, 5000, &["Python"]),
            profile("Anything", 1, 3100, &["Node.js", "React"]),
        ];

        for request in &requests {
            if let MatchOutcome::Matched(m) = match_candidate(request, &store) {
                assert!(m.candidate.budget <= request.max_budget, "{request:?}");
                assert!(
                    m.candidate.experience_years >= request.min_experience_years,
                    "{request:?}"
                );
                assert!(m.violations.is_empty());
            }
        }
    }

    #[test]
    fn test_partial_role_match_via_substring() {
        let store = CandidateStore::builtin();
        // Ivan (3000) and Georgi (2800) both qualify on a partial role; lower budget wins.
        let matched = expect_matched(match_candidate(&profile("Developer", 2, 3000, &[]), &store));
        assert_eq!(matched.role_match, RoleMatch::Partial);
        assert_eq!(matched.candidate.id, "c-505");
    }

    #[test]
    fn test_overlap_count_breaks_role_ties() {
        let store = CandidateStore::builtin();
        // Ivan: React overlap 1; Georgi: Node.js + React overlap 2. Both partial roles.
        let matched = expect_matched(match_candidate(
            &profile("Developer", 2, 3000, &["React", "Node.js"]),
            &store,
        ));
        assert_eq!(matched.candidate.id, "c-505");
        assert_eq!(matched.stack_overlap.len(), 2);
    }

    #[test]
    fn test_exact_role_beats_higher_overlap() {
        let store = CandidateStore::builtin();
        let matched = expect_matched(match_candidate(
            &profile("Frontend Developer", 2, 3500, &["Node.js", "MongoDB"]),
            &store,
        ));
        assert_eq!(matched.candidate.id, "c-101");
        assert_eq!(matched.role_match, RoleMatch::Exact);
    }

    #[test]
    fn test_stack_only_relevance() {
        let store = CandidateStore::builtin();
        let matched = expect_matched(match_candidate(
            &profile("Test Automation Lead", 1, 3000, &["cypress"]),
            &store,
        ));
        assert_eq!(matched.candidate.id, "c-606");
        assert_eq!(matched.role_match, RoleMatch::None);
        assert_eq!(matched.stack_overlap, vec!["Cypress"]);
    }

    #[test]
    fn test_role_comparison_is_case_insensitive() {
        assert_eq!(compare_roles("Backend Developer", " backend developer "), RoleMatch::Exact);
        assert_eq!(compare_roles("Backend Developer", "backend"), RoleMatch::Partial);
        assert_eq!(compare_roles("QA Engineer", "DevOps Engineer"), RoleMatch::None);
        assert_eq!(compare_roles("QA Engineer", ""), RoleMatch::None);
    }

    #[test]
    fn test_matching_is_idempotent() {
        let store = CandidateStore::builtin();
        let request = profile("Backend Developer", 4, 4000, &["Node.js"]);
        let first = match_candidate(&request, &store);
        let second = match_candidate(&request, &store);
        assert_eq!(first, second);

        let MatchOutcome::Matched(m) = first else {
            panic!("expected match");
        };
        assert!(m.justification[0].starts_with("Role"));
        assert!(m.justification[1].starts_with("Stack overlap"));
        assert!(m.justification[2].starts_with("Budget"));
        assert!(m.justification[3].starts_with("Experience"));
    }

    #[test]
    fn test_closest_lists_every_broken_constraint() {
        let store = CandidateStore::builtin();
        let outcome = match_candidate(&profile("DevOps Engineer", 7, 2000, &[]), &store);
        let MatchOutcome::NoMatch { closest, .. } = outcome else {
            panic!("expected NoMatch");
        };
        let closest = closest.unwrap();
        assert_eq!(closest.candidate.id, "c-303");
        assert_eq!(closest.violations.len(), 2);
    }

    #[test]
    fn test_match_fallback_parsing() {
        assert_eq!("reject".parse::<MatchFallback>().unwrap(), MatchFallback::Reject);
        assert_eq!(" Closest ".parse::<MatchFallback>().unwrap(), MatchFallback::Closest);
        assert!("best".parse::<MatchFallback>().is_err());
        assert_eq!(MatchFallback::default(), MatchFallback::Reject);
        assert_eq!(MatchFallback::Closest.to_string(), "closest");
    }

    #[test]
    fn test_violation_display() {
        let v = Violation::OverBudget {
            asks: 4500,
            budget: 4000,
        };
        assert_eq!(v.to_string(), "asks 4500, above the budget of 4000");
        let v = Violation::Underqualified {
            years: 2,
            required: 4,
        };
        assert_eq!(v.to_string(), "2 years of experience, 4 required");
    }
}
