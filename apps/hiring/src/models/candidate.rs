use serde::{Deserialize, Serialize};

/// A single candidate as held in the candidate store. Never mutated after construction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CandidateRecord {
    pub id: String,
    pub full_name: String,
    pub email: String,
    pub role: String,
    pub experience_years: u32,
    /// Monthly budget the candidate asks for, in currency units.
    pub budget: u32,
    pub stack: Vec<String>,
}

impl CandidateRecord {
    pub fn new(
        id: &str,
        full_name: &str,
        email: &str,
        role: &str,
        experience_years: u32,
        budget: u32,
        stack: &[&str],
    ) -> Self {
        Self {
            id: id.to_string(),
            full_name: full_name.to_string(),
            email: email.to_string(),
            role: role.to_string(),
            experience_years,
            budget,
            stack: stack.iter().map(|s| s.to_string()).collect(),
        }
    }
}

/// Operator-supplied hiring request. Built once per run by the intake module.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CandidateInput {
    pub role: String,
    pub experience_years: u32,
    pub budget: u32,
    pub stack: Vec<String>,
}
