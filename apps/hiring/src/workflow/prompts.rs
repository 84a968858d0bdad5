// Personas and instruction templates for the four hiring steps.
// Templates use the runner's placeholders: {output:<step>}, {input:<name>}, {attachment}.

use crate::llm_client::prompts::{GROUNDING_INSTRUCTION, PLAIN_TEXT_SYSTEM};

/// The agent that runs a step: who it is, what it wants, where it comes from.
#[derive(Debug, Clone, Copy)]
pub struct Persona {
    pub role: &'static str,
    pub goal: &'static str,
    pub backstory: &'static str,
}

impl Persona {
    /// Renders the persona into a system prompt.
    pub fn system_prompt(&self) -> String {
        format!(
            "You are the {}.\nYour goal: {}\n{}\n\n{}\n\n{}",
            self.role, self.goal, self.backstory, PLAIN_TEXT_SYSTEM, GROUNDING_INSTRUCTION
        )
    }
}

pub const PROFILER: Persona = Persona {
    role: "Talent Profiler",
    goal: "Turn a structured hiring request into a clear candidate profile.",
    backstory: "You have screened thousands of engineering hires and know how to \
        describe exactly what a team needs in a few lines.",
};

pub const MATCHER: Persona = Persona {
    role: "Candidate Matcher",
    goal: "Explain why the selected candidate fits the hiring profile.",
    backstory: "You work alongside a deterministic matching rule. The rule picks the \
        candidate; you never overrule it, you explain it to the hiring manager.",
};

pub const OFFER_WRITER: Persona = Persona {
    role: "Offer Writer",
    goal: "Write a concise, warm and accurate job offer for the selected candidate.",
    backstory: "You have written offers for startups and enterprises alike and never \
        promise anything the hiring profile does not support.",
};

pub const DISPATCHER: Persona = Persona {
    role: "Dispatch Coordinator",
    goal: "Confirm to the hiring manager that the offer was sent, and to whom.",
    backstory: "You close the loop on every hiring decision with a short, factual \
        confirmation the manager can forward as-is.",
};

/// Step 1. Binds: profile_json.
pub const PROFILE_PROMPT_TEMPLATE: &str = r#"Turn the hiring request below into a short candidate profile for the recruiting team.

HIRING REQUEST (candidate_profile):
{input:profile_json}

Describe, in at most five lines:
- the role being hired for
- the minimum years of experience
- the budget ceiling
- the must-have skills (say "none specified" if the list is empty)"#;

/// Step 2. Depends on: profile. Binds: match_json. Attachment: candidate store.
pub const MATCH_PROMPT_TEMPLATE: &str = r#"HIRING PROFILE:
{output:profile}

The matching rule selected this candidate (matched_candidate). Do NOT pick a different one:
{input:match_json}

Write a short paragraph for the hiring manager explaining the selection, citing role, stack overlap, budget and experience.
If "violations" is not empty, the candidate does NOT fully meet the request: say plainly which constraints are broken.

The full candidate store is attached for reference:
{attachment}"#;

/// Step 3. Depends on: profile, match. Binds: candidate_json.
pub const OFFER_PROMPT_TEMPLATE: &str = r#"Write a job offer letter to the selected candidate.

CANDIDATE:
{input:candidate_json}

HIRING PROFILE:
{output:profile}

MATCH NOTES:
{output:match}

HARD RULES:
1. Address the candidate by full name
2. Name the role title from the hiring profile
3. The monthly compensation is exactly the candidate's requested budget; do not change it
4. Mention the skills from the candidate's stack that the team needs
5. Keep it under 200 words and end with a request to reply to accept"#;

/// Step 4. Depends on: offer, match. Binds: recipient.
pub const CONFIRM_PROMPT_TEMPLATE: &str = r#"The offer below has been sent to {input:recipient}.

OFFER SENT:
{output:offer}

Write a short send confirmation for the hiring manager containing:
- the recipient's name and email address
- the role and the offered compensation
- one line on why this candidate was chosen, based on the match notes
- the next step (waiting for the candidate's reply)

MATCH NOTES:
{output:match}"#;
