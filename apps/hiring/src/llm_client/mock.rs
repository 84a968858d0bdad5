//! Scripted in-memory endpoint for tests. Replies per step id and records every
//! request it receives, so tests can assert on assembled instructions and context.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;

use super::{InferenceEndpoint, InferenceReply, InferenceRequest, LlmError};

#[derive(Default)]
pub struct ScriptedEndpoint {
    replies: HashMap<String, String>,
    failing: Option<String>,
    seen: Mutex<Vec<InferenceRequest>>,
}

impl ScriptedEndpoint {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reply `text` whenever step `step_id` calls in.
    pub fn reply(mut self, step_id: &str, text: &str) -> Self {
        self.replies.insert(step_id.to_string(), text.to_string());
        self
    }

    /// Fail with a 503 when step `step_id` calls in.
    pub fn fail_on(mut self, step_id: &str) -> Self {
        self.failing = Some(step_id.to_string());
        self
    }

    pub fn requests(&self) -> Vec<InferenceRequest> {
        self.seen.lock().unwrap().clone()
    }

    pub fn call_count(&self) -> usize {
        self.seen.lock().unwrap().len()
    }
}

impl InferenceReply {
    pub fn plain(model: &str, text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            model: model.to_string(),
            prompt_tokens: None,
            completion_tokens: None,
        }
    }
}

#[async_trait]
impl InferenceEndpoint for ScriptedEndpoint {
    async fn infer(&self, request: &InferenceRequest) -> Result<InferenceReply, LlmError> {
        self.seen.lock().unwrap().push(request.clone());

        if self.failing.as_deref() == Some(request.step_id.as_str()) {
            return Err(LlmError::Api {
                status: 503,
                message: "endpoint unavailable".to_string(),
            });
        }

        let text = self
            .replies
            .get(&request.step_id)
            .cloned()
            .unwrap_or_else(|| format!("{} done", request.step_id));
        Ok(InferenceReply::plain(&request.model, text))
    }
}
