//! Input Collector: turns the operator's four raw values into a `CandidateInput`.
//!
//! Values may arrive pre-filled (CLI flags) or be prompted for one by one.
//! All parsing happens here, before any pipeline step is built, so a bad budget
//! never reaches the inference endpoint.

use std::io::{BufRead, Write};

use thiserror::Error;

use crate::models::CandidateInput;

#[derive(Debug, Error)]
pub enum InputError {
    #[error("'{field}' cannot be empty")]
    Empty { field: &'static str },

    #[error("'{field}' must be a whole non-negative number, got '{value}'")]
    NotANumber { field: &'static str, value: String },

    #[error("failed to read operator input: {0}")]
    Io(#[from] std::io::Error),
}

/// Raw, unparsed operator values. `None` means "ask for it".
#[derive(Debug, Clone, Default)]
pub struct RawInput {
    pub role: Option<String>,
    pub experience: Option<String>,
    pub budget: Option<String>,
    pub stack: Option<String>,
}

const ROLE_PROMPT: &str = "Desired role (e.g. Backend Developer): ";
const EXPERIENCE_PROMPT: &str = "Required years of experience: ";
const BUDGET_PROMPT: &str = "Budget: ";
const STACK_PROMPT: &str = "Skill stack (comma-separated): ";

/// Prompts for every value missing from `preset`, then parses the full set.
pub fn collect_input<R: BufRead, W: Write>(
    reader: &mut R,
    writer: &mut W,
    preset: &RawInput,
) -> Result<CandidateInput, InputError> {
    let role = value_or_prompt(reader, writer, preset.role.as_deref(), ROLE_PROMPT)?;
    let experience = value_or_prompt(
        reader,
        writer,
        preset.experience.as_deref(),
        EXPERIENCE_PROMPT,
    )?;
    let budget = value_or_prompt(reader, writer, preset.budget.as_deref(), BUDGET_PROMPT)?;
    let stack = value_or_prompt(reader, writer, preset.stack.as_deref(), STACK_PROMPT)?;

    parse_input(&role, &experience, &budget, &stack)
}

/// Parses the four raw strings. Experience and budget must be non-negative integers.
pub fn parse_input(
    role: &str,
    experience: &str,
    budget: &str,
    stack: &str,
) -> Result<CandidateInput, InputError> {
    let role = role.trim();
    if role.is_empty() {
        return Err(InputError::Empty { field: "role" });
    }

    Ok(CandidateInput {
        role: role.to_string(),
        experience_years: parse_whole_number("experience", experience)?,
        budget: parse_whole_number("budget", budget)?,
        stack: split_stack(stack),
    })
}

/// Splits a comma-separated stack, dropping blanks and keeping first-seen order.
pub fn split_stack(raw: &str) -> Vec<String> {
    let mut stack: Vec<String> = Vec::new();
    for item in raw.split(',').map(str::trim).filter(|s| !s.is_empty()) {
        if !stack.iter().any(|s| s.eq_ignore_ascii_case(item)) {
            stack.push(item.to_string());
        }
    }
    stack
}

fn parse_whole_number(field: &'static str, raw: &str) -> Result<u32, InputError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(InputError::Empty { field });
    }
    trimmed.parse::<u32>().map_err(|_| InputError::NotANumber {
        field,
        value: trimmed.to_string(),
    })
}

fn value_or_prompt<R: BufRead, W: Write>(
    reader: &mut R,
    writer: &mut W,
    preset: Option<&str>,
    prompt: &str,
) -> Result<String, InputError> {
    if let Some(value) = preset {
        return Ok(value.to_string());
    }

    write!(writer, "{prompt}")?;
    writer.flush()?;

    let mut line = String::new();
    reader.read_line(&mut line)?;
    Ok(line.trim_end_matches(['\r', '\n']).to_string())
}
