use serde::{Deserialize, Serialize};

use crate::models::CandidateInput;

/// Typed hiring profile handed from the profile step to the matching step.
///
/// This is the structured form of what used to travel between agents as a
/// JSON-shaped string. It is derived from `CandidateInput` and never re-parsed
/// from model output.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CandidateProfile {
    pub role: String,
    pub min_experience_years: u32,
    pub max_budget: u32,
    pub required_stack: Vec<String>,
}

impl CandidateProfile {
    pub fn from_input(input: &CandidateInput) -> Self {
        let mut required_stack: Vec<String> = Vec::with_capacity(input.stack.len());
        for skill in input.stack.iter().map(|s| s.trim()).filter(|s| !s.is_empty()) {
            if !required_stack.iter().any(|s| s.eq_ignore_ascii_case(skill)) {
                required_stack.push(skill.to_string());
            }
        }

        Self {
            role: input.role.trim().to_string(),
            min_experience_years: input.experience_years,
            max_budget: input.budget,
            required_stack,
        }
    }
}
