// Shared prompt fragments.
// Each step keeps its own templates in workflow/prompts.rs; this file holds the
// cross-cutting pieces every persona prompt ends with.

/// Appended to every system prompt. Steps exchange plain text, not JSON.
pub const PLAIN_TEXT_SYSTEM: &str = "Respond in plain text. \
    Do NOT wrap your answer in markdown code fences. \
    Do NOT include explanations of your reasoning process or apologies.";

/// Keeps the model from inventing candidate facts.
pub const GROUNDING_INSTRUCTION: &str = "\
    CRITICAL: Use only the facts provided in this instruction and its context. \
    Do NOT invent names, email addresses, salaries, dates or skills. \
    If a detail is missing, leave it out rather than guessing.";
