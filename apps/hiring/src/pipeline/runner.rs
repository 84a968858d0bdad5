//! Sequential step executor.
//!
//! Flow per step: collect dependency outputs → assemble instruction → one
//! inference call → record the reply text as-is. There is no validation gate
//! between steps: empty or malformed text is passed downstream unchanged. An
//! endpoint error aborts the whole run.

use std::collections::HashSet;
use std::time::Instant;

use chrono::Utc;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::llm_client::{ContextEntry, InferenceEndpoint, InferenceRequest, LlmError};
use crate::pipeline::step::{Attachment, PipelineStepResult, StepDefinition};

const OUTPUT_PREFIX: &str = "output:";
const INPUT_PREFIX: &str = "input:";
const ATTACHMENT_TOKEN: &str = "attachment";

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("Invalid pipeline definition: {0}")]
    Definition(String),

    #[error("Step '{step}' failed: {source}")]
    Inference {
        step: String,
        #[source]
        source: LlmError,
    },
}

pub struct PipelineRunner<'a> {
    endpoint: &'a dyn InferenceEndpoint,
}

impl<'a> PipelineRunner<'a> {
    pub fn new(endpoint: &'a dyn InferenceEndpoint) -> Self {
        Self { endpoint }
    }

    /// Runs every step once, in declaration order. The definition list is
    /// validated up front, so a bad definition never reaches the endpoint.
    pub async fn run(
        &self,
        steps: &[StepDefinition],
    ) -> Result<Vec<PipelineStepResult>, PipelineError> {
        validate(steps)?;

        let mut results: Vec<PipelineStepResult> = Vec::with_capacity(steps.len());

        for (index, step) in steps.iter().enumerate() {
            info!(
                "Step {}/{} '{}' starting (model: {})",
                index + 1,
                steps.len(),
                step.id,
                step.model
            );

            let context = collect_context(step, &results);
            let instruction = assemble_instruction(step, &context);

            let request = InferenceRequest {
                step_id: step.id.clone(),
                model: step.model.clone(),
                system: step.persona.clone(),
                instruction,
                context: context.clone(),
            };

            let started = Instant::now();
            let reply = self
                .endpoint
                .infer(&request)
                .await
                .map_err(|source| PipelineError::Inference {
                    step: step.id.clone(),
                    source,
                })?;
            let elapsed_ms = started.elapsed().as_millis() as u64;

            if reply.text.trim().is_empty() {
                warn!("Step '{}' returned empty output, passing it on unchanged", step.id);
            }

            info!(
                "Step '{}' finished in {}ms ({} chars)",
                step.id,
                elapsed_ms,
                reply.text.len()
            );
            debug!(
                "Step '{}' token usage: prompt={:?}, completion={:?}",
                step.id, reply.prompt_tokens, reply.completion_tokens
            );

            results.push(PipelineStepResult {
                step_id: step.id.clone(),
                output: reply.text,
                context,
                model: reply.model,
                completed_at: Utc::now(),
                elapsed_ms,
            });
        }

        Ok(results)
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Definition checks
// ────────────────────────────────────────────────────────────────────────────

/// Ids unique; dependencies declared earlier; placeholders refer to declared
/// dependencies or bindings; `{attachment}` only where an attachment exists.
pub fn validate(steps: &[StepDefinition]) -> Result<(), PipelineError> {
    let mut seen: HashSet<&str> = HashSet::new();

    for step in steps {
        if step.id.trim().is_empty() {
            return Err(PipelineError::Definition("step id cannot be empty".to_string()));
        }

        for dependency in &step.depends_on {
            if !seen.contains(dependency.as_str()) {
                return Err(PipelineError::Definition(format!(
                    "step '{}' depends on '{}', which is not declared before it",
                    step.id, dependency
                )));
            }
        }

        for token in placeholders(&step.instruction) {
            if let Some(referenced) = token.strip_prefix(OUTPUT_PREFIX) {
                if !step.depends_on.iter().any(|d| d == referenced) {
                    return Err(PipelineError::Definition(format!(
                        "step '{}' references {{output:{}}} without declaring the dependency",
                        step.id, referenced
                    )));
                }
            } else if let Some(name) = token.strip_prefix(INPUT_PREFIX) {
                if !step.bindings.iter().any(|b| b.name == name) {
                    return Err(PipelineError::Definition(format!(
                        "step '{}' references {{input:{}}} but binds no such value",
                        step.id, name
                    )));
                }
            } else if token == ATTACHMENT_TOKEN && step.attachment.is_none() {
                return Err(PipelineError::Definition(format!(
                    "step '{}' references {{attachment}} but has none",
                    step.id
                )));
            }
        }

        if !seen.insert(step.id.as_str()) {
            return Err(PipelineError::Definition(format!(
                "duplicate step id '{}'",
                step.id
            )));
        }
    }

    Ok(())
}

/// Every `{...}` token in `template` without braces inside it.
fn placeholders(template: &str) -> Vec<&str> {
    let mut tokens = Vec::new();
    let mut rest = template;
    while let Some(start) = rest.find('{') {
        let tail = &rest[start + 1..];
        match tail.find(['{', '}']) {
            Some(end) if tail[end..].starts_with('}') => {
                tokens.push(&tail[..end]);
                rest = &tail[end + 1..];
            }
            Some(end) => rest = &tail[end..],
            None => break,
        }
    }
    tokens
}

// ────────────────────────────────────────────────────────────────────────────
// Instruction assembly
// ────────────────────────────────────────────────────────────────────────────

fn collect_context(step: &StepDefinition, results: &[PipelineStepResult]) -> Vec<ContextEntry> {
    step.depends_on
        .iter()
        .filter_map(|dependency| results.iter().find(|r| &r.step_id == dependency))
        .map(|r| ContextEntry {
            step_id: r.step_id.clone(),
            output: r.output.clone(),
        })
        .collect()
}

/// Single-pass render: placeholder text inside substituted outputs is never
/// expanded a second time.
fn assemble_instruction(step: &StepDefinition, context: &[ContextEntry]) -> String {
    let template = step.instruction.as_str();
    let mut rendered = String::with_capacity(template.len());
    let mut inlined: HashSet<&str> = HashSet::new();
    let mut attachment_inlined = false;

    let mut rest = template;
    while let Some(start) = rest.find('{') {
        rendered.push_str(&rest[..start]);
        let tail = &rest[start..];

        if let Some(end) = tail.find('}') {
            let token = &tail[1..end];
            if let Some(entry) = token
                .strip_prefix(OUTPUT_PREFIX)
                .and_then(|id| context.iter().find(|c| c.step_id == id))
            {
                rendered.push_str(&entry.output);
                inlined.insert(entry.step_id.as_str());
                rest = &tail[end + 1..];
                continue;
            }
            if let Some(binding) = token
                .strip_prefix(INPUT_PREFIX)
                .and_then(|name| step.bindings.iter().find(|b| b.name == name))
            {
                rendered.push_str(&binding.value);
                rest = &tail[end + 1..];
                continue;
            }
            if let (ATTACHMENT_TOKEN, Some(attachment)) = (token, step.attachment.as_ref()) {
                rendered.push_str(&attachment.body);
                attachment_inlined = true;
                rest = &tail[end + 1..];
                continue;
            }
        }

        rendered.push('{');
        rest = &tail[1..];
    }
    rendered.push_str(rest);

    let remaining: Vec<&ContextEntry> = context
        .iter()
        .filter(|c| !inlined.contains(c.step_id.as_str()))
        .collect();
    if !remaining.is_empty() {
        rendered.push_str("\n\nContext from earlier steps:");
        for entry in remaining {
            rendered.push_str(&format!("\n\n[{}]\n{}", entry.step_id, entry.output));
        }
    }

    if let (false, Some(Attachment { label, body })) = (attachment_inlined, step.attachment.as_ref()) {
        rendered.push_str(&format!("\n\n{label}:\n{body}"));
    }

    rendered
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm_client::mock::ScriptedEndpoint;

    fn four_steps() -> Vec<StepDefinition> {
        vec![
            StepDefinition::new("profile", "profiler", "Build a profile.", "m1"),
            StepDefinition::new("match", "matcher", "Match using {output:profile}.", "m2")
                .depends_on(&["profile"])
                .with_attachment("Store", "[records]".to_string()),
            StepDefinition::new("offer", "writer", "Write an offer.", "m1")
                .depends_on(&["profile", "match"]),
            StepDefinition::new("confirm", "dispatcher", "Confirm {output:offer}.", "m1")
                .depends_on(&["offer"]),
        ]
    }

    #[tokio::test]
    async fn test_four_steps_produce_four_results_in_order() {
        let endpoint = ScriptedEndpoint::new()
            .reply("profile", "P")
            .reply("match", "M")
            .reply("offer", "O")
            .reply("confirm", "C");

        let results = PipelineRunner::new(&endpoint)
            .run(&four_steps())
            .await
            .unwrap();

        let ids: Vec<&str> = results.iter().map(|r| r.step_id.as_str()).collect();
        assert_eq!(ids, vec!["profile", "match", "offer", "confirm"]);
        let outputs: Vec<&str> = results.iter().map(|r| r.output.as_str()).collect();
        assert_eq!(outputs, vec!["P", "M", "O", "C"]);
        assert_eq!(endpoint.call_count(), 4);
    }

    #[tokio::test]
    async fn test_context_is_exactly_declared_dependencies() {
        let endpoint = ScriptedEndpoint::new()
            .reply("profile", "P")
            .reply("match", "M")
            .reply("offer", "O")
            .reply("confirm", "C");

        let results = PipelineRunner::new(&endpoint)
            .run(&four_steps())
            .await
            .unwrap();

        let ctx = |i: usize| -> Vec<(String, String)> {
            results[i]
                .context
                .iter()
                .map(|c| (c.step_id.clone(), c.output.clone()))
                .collect()
        };
        assert!(ctx(0).is_empty());
        assert_eq!(ctx(1), vec![("profile".into(), "P".into())]);
        assert_eq!(
            ctx(2),
            vec![("profile".into(), "P".into()), ("match".into(), "M".into())]
        );
        assert_eq!(ctx(3), vec![("offer".into(), "O".into())]);

        let requests = endpoint.requests();
        assert_eq!(requests[3].context, results[3].context);
    }

    #[tokio::test]
    async fn test_instruction_inlines_and_appends_context() {
        let endpoint = ScriptedEndpoint::new()
            .reply("profile", "P-TEXT")
            .reply("match", "M-TEXT");

        PipelineRunner::new(&endpoint)
            .run(&four_steps())
            .await
            .unwrap();

        let requests = endpoint.requests();
        assert_eq!(requests[0].instruction, "Build a profile.");
        assert_eq!(requests[0].system, "profiler");
        assert_eq!(requests[0].model, "m1");

        // placeholder inlined, attachment appended under its label
        assert_eq!(
            requests[1].instruction,
            "Match using P-TEXT.\n\nStore:\n[records]"
        );

        // no placeholders: both dependencies appended in declaration order
        assert_eq!(
            requests[2].instruction,
            "Write an offer.\n\nContext from earlier steps:\n\n[profile]\nP-TEXT\n\n[match]\nM-TEXT"
        );
    }

    #[tokio::test]
    async fn test_attachment_placeholder_is_inlined() {
        let steps = vec![
            StepDefinition::new("only", "p", "Records: {attachment} end", "m")
                .with_attachment("Store", "[a,b]".to_string()),
        ];
        let endpoint = ScriptedEndpoint::new();
        PipelineRunner::new(&endpoint).run(&steps).await.unwrap();
        assert_eq!(endpoint.requests()[0].instruction, "Records: [a,b] end");
    }

    #[tokio::test]
    async fn test_outputs_are_not_expanded_twice() {
        let steps = vec![
            StepDefinition::new("a", "p", "first", "m"),
            StepDefinition::new("b", "p", "second", "m").depends_on(&["a"]),
            StepDefinition::new("c", "p", "{output:a} | {output:b}", "m").depends_on(&["a", "b"]),
        ];
        let endpoint = ScriptedEndpoint::new()
            .reply("a", "says {output:b}")
            .reply("b", "B");

        PipelineRunner::new(&endpoint).run(&steps).await.unwrap();
        assert_eq!(endpoint.requests()[2].instruction, "says {output:b} | B");
    }

    #[tokio::test]
    async fn test_bindings_are_not_rescanned() {
        let steps = vec![StepDefinition::new("a", "p", "Role: {input:role}!", "m")
            .bind("role", "{output:evil} {attachment}")];
        let endpoint = ScriptedEndpoint::new();
        PipelineRunner::new(&endpoint).run(&steps).await.unwrap();
        assert_eq!(
            endpoint.requests()[0].instruction,
            "Role: {output:evil} {attachment}!"
        );
    }

    #[test]
    fn test_validate_rejects_unbound_input() {
        let steps = vec![StepDefinition::new("a", "p", "Role: {input:role}", "m")];
        let err = validate(&steps).unwrap_err();
        assert!(err.to_string().contains("{input:role}"));
    }

    #[tokio::test]
    async fn test_json_braces_in_template_survive() {
        let steps = vec![StepDefinition::new(
            "a",
            "p",
            "Profile: {\"role\": \"QA\", \"stack\": []}",
            "m",
        )];
        let endpoint = ScriptedEndpoint::new();
        PipelineRunner::new(&endpoint).run(&steps).await.unwrap();
        assert_eq!(
            endpoint.requests()[0].instruction,
            "Profile: {\"role\": \"QA\", \"stack\": []}"
        );
    }

    #[tokio::test]
    async fn test_empty_output_flows_downstream() {
        let endpoint = ScriptedEndpoint::new().reply("profile", "");

        let results = PipelineRunner::new(&endpoint)
            .run(&four_steps())
            .await
            .unwrap();

        assert_eq!(results.len(), 4);
        assert_eq!(results[0].output, "");
        assert_eq!(results[1].context[0].output, "");
        assert_eq!(endpoint.requests()[1].instruction, "Match using .\n\nStore:\n[records]");
    }

    #[tokio::test]
    async fn test_endpoint_error_aborts_run() {
        let endpoint = ScriptedEndpoint::new().fail_on("offer");

        let err = PipelineRunner::new(&endpoint)
            .run(&four_steps())
            .await
            .unwrap_err();

        match err {
            PipelineError::Inference { step, source } => {
                assert_eq!(step, "offer");
                assert!(matches!(source, LlmError::Api { status: 503, .. }));
            }
            other => panic!("expected Inference error, got {other:?}"),
        }
        // profile, match, offer attempted; confirm never called
        assert_eq!(endpoint.call_count(), 3);
    }

    #[tokio::test]
    async fn test_invalid_definition_runs_nothing() {
        let steps = vec![
            StepDefinition::new("offer", "p", "x", "m").depends_on(&["match"]),
            StepDefinition::new("match", "p", "y", "m"),
        ];
        let endpoint = ScriptedEndpoint::new();
        let err = PipelineRunner::new(&endpoint).run(&steps).await.unwrap_err();
        assert!(matches!(err, PipelineError::Definition(_)));
        assert_eq!(endpoint.call_count(), 0);
    }

    #[test]
    fn test_validate_rejects_duplicates() {
        let steps = vec![
            StepDefinition::new("a", "p", "x", "m"),
            StepDefinition::new("a", "p", "y", "m"),
        ];
        let err = validate(&steps).unwrap_err();
        assert!(err.to_string().contains("duplicate step id 'a'"));
    }

    #[test]
    fn test_validate_rejects_self_dependency() {
        let steps = vec![StepDefinition::new("a", "p", "x", "m").depends_on(&["a"])];
        assert!(validate(&steps).is_err());
    }

    #[test]
    fn test_validate_rejects_undeclared_placeholder() {
        let steps = vec![
            StepDefinition::new("a", "p", "x", "m"),
            StepDefinition::new("b", "p", "uses {output:a}", "m"),
        ];
        let err = validate(&steps).unwrap_err();
        assert!(err.to_string().contains("{output:a}"));
    }

    #[test]
    fn test_validate_rejects_missing_attachment() {
        let steps = vec![StepDefinition::new("a", "p", "see {attachment}", "m")];
        assert!(validate(&steps).is_err());
    }

    #[test]
    fn test_validate_accepts_workflow_shape() {
        assert!(validate(&four_steps()).is_ok());
        assert!(validate(&[]).is_ok());
    }

    #[test]
    fn test_placeholders_skip_nested_braces() {
        let tokens = placeholders("{output:a} {\"k\": {x}} {attachment}");
        assert_eq!(tokens, vec!["output:a", "x", "attachment"]);
    }
}
