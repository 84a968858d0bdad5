//! Result Presenter.
//!
//! Pure formatting: every function takes data and returns the text to print.
//! `main` does the actual writing to stdout.

use crate::config::ModelSettings;
use crate::llm_client::{model_is_available, ModelTag};
use crate::store::CandidateStore;
use crate::workflow::HiringRun;

/// The final step's output, verbatim, under a short header.
///
/// Empty or whitespace-only text is printed as-is; the runner already warns about it.
pub fn render_final(run: &HiringRun) -> String {
    let mut output = header(run);
    if let Some(text) = run.final_output() {
        output.push_str(text);
    }
    output
}

/// Every step's output in execution order, each under its own banner.
pub fn render_steps(run: &HiringRun) -> String {
    let mut output = header(run);

    for (index, step) in run.steps.iter().enumerate() {
        output.push_str(&format!(
            "\n[{}/{}] {} (model: {}, {} ms)\n",
            index + 1,
            run.steps.len(),
            step.step_id,
            step.model,
            step.elapsed_ms
        ));
        output.push_str(&format!("{}\n", "-".repeat(60)));
        output.push_str(&step.output);
        output.push('\n');
    }

    output
}

/// The whole run as pretty JSON.
pub fn render_json(run: &HiringRun) -> Result<String, serde_json::Error> {
    serde_json::to_string_pretty(run)
}

/// The candidate store as a table.
pub fn render_candidates(store: &CandidateStore) -> String {
    if store.is_empty() {
        return "The candidate store is empty.".to_string();
    }

    let mut output = String::new();
    output.push_str(&format!(
        "{:<7} {:<18} {:<22} {:>5} {:>7}  {}\n",
        "ID", "Name", "Role", "Years", "Budget", "Stack"
    ));
    output.push_str(&format!("{}\n", "-".repeat(90)));

    for record in store.records() {
        output.push_str(&format!(
            "{:<7} {:<18} {:<22} {:>5} {:>7}  {}\n",
            record.id,
            record.full_name,
            record.role,
            record.experience_years,
            record.budget,
            record.stack.join(", ")
        ));
    }

    output
}

/// Which configured models the daemon has pulled.
pub fn render_model_check(base_url: &str, models: &ModelSettings, available: &[ModelTag]) -> String {
    let mut output = format!("Inference endpoint: {base_url}\n");

    for model in models.all() {
        let status = if model_is_available(model, available) {
            "ok"
        } else {
            "MISSING (run `ollama pull` first)"
        };
        output.push_str(&format!("  {:<24} {}\n", model, status));
    }

    output
}

fn header(run: &HiringRun) -> String {
    let candidate = &run.selected.candidate;
    let mut header = format!(
        "Hiring run {} | {} -> {} ({})\n",
        run.run_id, run.profile.role, candidate.full_name, candidate.id
    );
    if !run.selected.is_qualified() {
        header.push_str(&format!("WARNING: {}\n", run.selected.summary));
    }
    header.push('\n');
    header
}
