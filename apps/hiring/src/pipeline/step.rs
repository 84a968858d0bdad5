use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::llm_client::ContextEntry;

/// Read-only auxiliary data handed to a single step (e.g. the candidate store).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attachment {
    pub label: String,
    pub body: String,
}

/// A named value substituted for `{input:<name>}` in a step's template.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Binding {
    pub name: String,
    pub value: String,
}

/// Declaration of one pipeline step.
///
/// `instruction` may reference `{output:<step_id>}` for any declared dependency,
/// `{input:<name>}` for any binding and `{attachment}` when an attachment is
/// present. Dependencies the template does not reference are appended after it.
#[derive(Debug, Clone)]
pub struct StepDefinition {
    pub id: String,
    /// System prompt of the agent that runs this step.
    pub persona: String,
    pub instruction: String,
    pub depends_on: Vec<String>,
    pub bindings: Vec<Binding>,
    pub attachment: Option<Attachment>,
    pub model: String,
}

impl StepDefinition {
    pub fn new(id: &str, persona: &str, instruction: &str, model: &str) -> Self {
        Self {
            id: id.to_string(),
            persona: persona.to_string(),
            instruction: instruction.to_string(),
            depends_on: Vec::new(),
            bindings: Vec::new(),
            attachment: None,
            model: model.to_string(),
        }
    }

    pub fn depends_on(mut self, steps: &[&str]) -> Self {
        self.depends_on = steps.iter().map(|s| s.to_string()).collect();
        self
    }

    pub fn bind(mut self, name: &str, value: impl Into<String>) -> Self {
        self.bindings.push(Binding {
            name: name.to_string(),
            value: value.into(),
        });
        self
    }

    pub fn with_attachment(mut self, label: &str, body: String) -> Self {
        self.attachment = Some(Attachment {
            label: label.to_string(),
            body,
        });
        self
    }
}

/// What one step produced. Never mutated after the runner records it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineStepResult {
    pub step_id: String,
    /// The endpoint's text exactly as returned, including empty or garbled output.
    pub output: String,
    /// Outputs of the step's declared dependencies, in declaration order.
    pub context: Vec<ContextEntry>,
    pub model: String,
    pub completed_at: DateTime<Utc>,
    pub elapsed_ms: u64,
}

/// Output recorded under `step_id`, if that step has run.
pub fn find_output<'a>(results: &'a [PipelineStepResult], step_id: &str) -> Option<&'a str> {
    results
        .iter()
        .find(|r| r.step_id == step_id)
        .map(|r| r.output.as_str())
}
