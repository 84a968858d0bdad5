//! Hiring workflow: wires input, the matching rule and the four steps together.
//!
//! Flow: CandidateInput → CandidateProfile → match_candidate() → fallback policy →
//!       build step definitions → PipelineRunner → HiringRun.
//!
//! Matching happens before any inference call, so a rejected request never
//! touches the endpoint. The candidate store is attached to the match step only.

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{info, warn};
use uuid::Uuid;

use crate::config::ModelSettings;
use crate::errors::AppError;
use crate::llm_client::InferenceEndpoint;
use crate::matching::{match_candidate, MatchFallback, MatchOutcome, MatchedCandidate};
use crate::models::{CandidateInput, CandidateProfile};
use crate::pipeline::{find_output, PipelineRunner, PipelineStepResult, StepDefinition};
use crate::store::CandidateStore;
use crate::workflow::prompts::{
    CONFIRM_PROMPT_TEMPLATE, DISPATCHER, MATCHER, MATCH_PROMPT_TEMPLATE, OFFER_PROMPT_TEMPLATE,
    OFFER_WRITER, PROFILER, PROFILE_PROMPT_TEMPLATE,
};

pub const PROFILE_STEP: &str = "profile";
pub const MATCH_STEP: &str = "match";
pub const OFFER_STEP: &str = "offer";
pub const CONFIRM_STEP: &str = "confirm";

const STORE_ATTACHMENT_LABEL: &str = "CANDIDATE STORE";

/// Everything one run produced.
#[derive(Debug, Clone, Serialize)]
pub struct HiringRun {
    pub run_id: Uuid,
    pub started_at: DateTime<Utc>,
    pub input: CandidateInput,
    pub profile: CandidateProfile,
    pub selected: MatchedCandidate,
    pub steps: Vec<PipelineStepResult>,
}

impl HiringRun {
    /// Text of the confirmation step, if it ran.
    pub fn final_output(&self) -> Option<&str> {
        find_output(&self.steps, CONFIRM_STEP)
    }
}

pub struct HiringWorkflow<'a> {
    store: &'a CandidateStore,
    models: &'a ModelSettings,
    fallback: MatchFallback,
}

impl<'a> HiringWorkflow<'a> {
    pub fn new(store: &'a CandidateStore, models: &'a ModelSettings, fallback: MatchFallback) -> Self {
        Self {
            store,
            models,
            fallback,
        }
    }

    /// Runs the full workflow for one operator request.
    pub async fn run(
        &self,
        input: CandidateInput,
        endpoint: &dyn InferenceEndpoint,
    ) -> Result<HiringRun, AppError> {
        let run_id = Uuid::new_v4();
        let started_at = Utc::now();
        info!("Hiring run {} started for role '{}'", run_id, input.role);

        let profile = CandidateProfile::from_input(&input);
        let selected = self.select(&profile)?;
        let steps = self.build_steps(&profile, &selected)?;

        let results = PipelineRunner::new(endpoint).run(&steps).await?;

        info!(
            "Hiring run {} finished: {} steps, candidate {}",
            run_id,
            results.len(),
            selected.candidate.id
        );

        Ok(HiringRun {
            run_id,
            started_at,
            input,
            profile,
            selected,
            steps: results,
        })
    }

    /// Applies the matching rule and the configured no-match fallback.
    pub fn select(&self, profile: &CandidateProfile) -> Result<MatchedCandidate, AppError> {
        match match_candidate(profile, self.store) {
            MatchOutcome::Matched(matched) => {
                info!("Matched candidate: {}", matched.summary);
                Ok(matched)
            }
            MatchOutcome::NoMatch {
                rejections,
                closest,
            } => match (self.fallback, closest) {
                (MatchFallback::Closest, Some(closest)) => {
                    warn!("No qualified candidate, falling back to closest: {}", closest.summary);
                    Ok(closest)
                }
                _ => Err(AppError::NoQualifiedCandidate {
                    role: profile.role.clone(),
                    rejections,
                }),
            },
        }
    }

    /// Declares the four steps for an already-selected candidate.
    pub fn build_steps(
        &self,
        profile: &CandidateProfile,
        selected: &MatchedCandidate,
    ) -> Result<Vec<StepDefinition>, AppError> {
        let profile_json = to_json(profile, "profile")?;
        let match_json = to_json(selected, "matched candidate")?;
        let candidate_json = to_json(&selected.candidate, "candidate")?;
        let store_json = self
            .store
            .to_json_pretty()
            .map_err(|e| AppError::Internal(anyhow::anyhow!("Failed to serialize candidate store: {e}")))?;
        let recipient = format!(
            "{} <{}>",
            selected.candidate.full_name, selected.candidate.email
        );

        Ok(vec![
            StepDefinition::new(
                PROFILE_STEP,
                &PROFILER.system_prompt(),
                PROFILE_PROMPT_TEMPLATE,
                self.models.for_step(PROFILE_STEP),
            )
            .bind("profile_json", profile_json),
            StepDefinition::new(
                MATCH_STEP,
                &MATCHER.system_prompt(),
                MATCH_PROMPT_TEMPLATE,
                self.models.for_step(MATCH_STEP),
            )
            .depends_on(&[PROFILE_STEP])
            .bind("match_json", match_json)
            .with_attachment(STORE_ATTACHMENT_LABEL, store_json),
            StepDefinition::new(
                OFFER_STEP,
                &OFFER_WRITER.system_prompt(),
                OFFER_PROMPT_TEMPLATE,
                self.models.for_step(OFFER_STEP),
            )
            .depends_on(&[PROFILE_STEP, MATCH_STEP])
            .bind("candidate_json", candidate_json),
            StepDefinition::new(
                CONFIRM_STEP,
                &DISPATCHER.system_prompt(),
                CONFIRM_PROMPT_TEMPLATE,
                self.models.for_step(CONFIRM_STEP),
            )
            .depends_on(&[OFFER_STEP, MATCH_STEP])
            .bind("recipient", recipient),
        ])
    }
}

fn to_json<T: Serialize>(value: &T, what: &str) -> Result<String, AppError> {
    serde_json::to_string_pretty(value)
        .map_err(|e| AppError::Internal(anyhow::anyhow!("Failed to serialize {what}: {e}")))
}
