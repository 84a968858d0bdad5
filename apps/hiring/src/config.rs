use anyhow::{Context, Result};

use crate::matching::MatchFallback;

pub const DEFAULT_BASE_URL: &str = "http://localhost:11434";
pub const DEFAULT_MODEL: &str = "llama3.2";

/// Application configuration loaded from environment variables.
/// Nothing is required; every value has a local-daemon default.
#[derive(Debug, Clone)]
pub struct Config {
    pub inference: InferenceSettings,
    pub models: ModelSettings,
    pub match_fallback: MatchFallback,
    pub rust_log: String,
}

/// Transport settings for the inference endpoint.
#[derive(Debug, Clone)]
pub struct InferenceSettings {
    pub base_url: String,
    pub timeout_secs: u64,
    pub temperature: Option<f32>,
    /// Total attempts per call. 1 means no retry.
    pub max_attempts: u32,
}

/// Which pulled model serves which step.
#[derive(Debug, Clone)]
pub struct ModelSettings {
    pub default_model: String,
    pub profile: Option<String>,
    pub matching: Option<String>,
    pub offer: Option<String>,
    pub confirm: Option<String>,
}

impl ModelSettings {
    #[cfg(test)]
    pub fn uniform(model: &str) -> Self {
        Self {
            default_model: model.to_string(),
            profile: None,
            matching: None,
            offer: None,
            confirm: None,
        }
    }

    /// Model for `step_id`, falling back to the default.
    pub fn for_step(&self, step_id: &str) -> &str {
        let chosen = match step_id {
            "profile" => self.profile.as_deref(),
            "match" => self.matching.as_deref(),
            "offer" => self.offer.as_deref(),
            "confirm" => self.confirm.as_deref(),
            _ => None,
        };
        chosen.unwrap_or(&self.default_model)
    }

    /// Every distinct model the workflow may call, default first.
    pub fn all(&self) -> Vec<&str> {
        let mut models = vec![self.default_model.as_str()];
        for model in [&self.profile, &self.matching, &self.offer, &self.confirm]
            .into_iter()
            .flatten()
        {
            if !models.contains(&model.as_str()) {
                models.push(model);
            }
        }
        models
    }
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the config from any key lookup. `from_env` passes the process environment.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let temperature = match get("INFERENCE_TEMPERATURE") {
            Some(raw) => Some(
                raw.trim()
                    .parse::<f32>()
                    .context("INFERENCE_TEMPERATURE must be a number")?,
            ),
            None => None,
        };

        let match_fallback = match get("MATCH_FALLBACK") {
            Some(raw) => raw
                .parse::<MatchFallback>()
                .map_err(anyhow::Error::msg)
                .context("MATCH_FALLBACK is invalid")?,
            None => MatchFallback::default(),
        };

        Ok(Config {
            inference: InferenceSettings {
                base_url: get("OLLAMA_BASE_URL").unwrap_or_else(|| DEFAULT_BASE_URL.to_string()),
                timeout_secs: get("INFERENCE_TIMEOUT_SECS")
                    .unwrap_or_else(|| "120".to_string())
                    .trim()
                    .parse::<u64>()
                    .context("INFERENCE_TIMEOUT_SECS must be a whole number of seconds")?,
                temperature,
                max_attempts: get("INFERENCE_MAX_ATTEMPTS")
                    .unwrap_or_else(|| "1".to_string())
                    .trim()
                    .parse::<u32>()
                    .context("INFERENCE_MAX_ATTEMPTS must be a whole number")?,
            },
            models: ModelSettings {
                default_model: get("INFERENCE_MODEL").unwrap_or_else(|| DEFAULT_MODEL.to_string()),
                profile: get("PROFILE_MODEL"),
                matching: get("MATCH_MODEL"),
                offer: get("OFFER_MODEL"),
                confirm: get("CONFIRM_MODEL"),
            },
            match_fallback,
            rust_log: get("RUST_LOG").unwrap_or_else(|| "info".to_string()),
        })
    }
}
