use thiserror::Error;

use crate::intake::InputError;
use crate::llm_client::LlmError;
use crate::matching::Rejection;
use crate::pipeline::PipelineError;

/// Application-level error type. Any variant aborts the run; nothing is retried
/// and no partial results are reported.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Invalid input: {0}")]
    Input(#[from] InputError),

    #[error(
        "No candidate satisfies the budget and experience constraints for '{role}':{}",
        format_rejections(.rejections)
    )]
    NoQualifiedCandidate {
        role: String,
        rejections: Vec<Rejection>,
    },

    #[error(transparent)]
    Pipeline(#[from] PipelineError),

    #[error("Inference endpoint error: {0}")]
    Llm(#[from] LlmError),

    #[error("Internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

fn format_rejections(rejections: &[Rejection]) -> String {
    rejections
        .iter()
        .map(|r| {
            let reasons: Vec<String> = r.violations.iter().map(|v| v.to_string()).collect();
            format!("\n  - {} ({}): {}", r.full_name, r.candidate_id, reasons.join("; "))
        })
        .collect()
}
