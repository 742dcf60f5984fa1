//! Inference abstraction and the Ollama HTTP client.
//!
//! The [`Inference`] trait decouples the pipeline from the model backend. Tests
//! use scripted implementations that replay canned replies without a server.

use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{debug, instrument, warn};

use crate::io::config::InferenceConfig;

/// Failure of a single inference call. No partial text is ever returned.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InferenceError {
    /// Connection, status, or decoding failure.
    ServiceUnreachable(String),
    /// The service answered with blank text.
    EmptyResponse,
}

impl fmt::Display for InferenceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ServiceUnreachable(detail) => {
                write!(f, "inference service unreachable: {detail}")
            }
            Self::EmptyResponse => write!(f, "inference service returned an empty response"),
        }
    }
}

impl std::error::Error for InferenceError {}

/// Single-shot, non-streaming text generation by model id.
pub trait Inference {
    fn infer(&self, model: &str, prompt: &str) -> Result<String, InferenceError>;
}

#[derive(Debug, Serialize)]
struct GenerateRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    stream: bool,
    options: GenerateOptions,
}

#[derive(Debug, Serialize)]
struct GenerateOptions {
    temperature: f32,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    response: String,
}

/// Blocking client for Ollama's `/api/generate`.
///
/// Temperature is pinned to zero so plans and code are reproducible.
pub struct OllamaClient {
    http: reqwest::blocking::Client,
    url: String,
}

impl OllamaClient {
    pub fn new(endpoint: &str, timeout: Duration) -> Result<Self, InferenceError> {
        let http = reqwest::blocking::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| InferenceError::ServiceUnreachable(e.to_string()))?;
        Ok(Self {
            http,
            url: format!("{}/api/generate", endpoint.trim_end_matches('/')),
        })
    }

    pub fn from_config(cfg: &InferenceConfig) -> Result<Self, InferenceError> {
        Self::new(&cfg.endpoint, Duration::from_secs(cfg.timeout_secs))
    }

}

impl Inference for OllamaClient {
    #[instrument(skip_all, fields(model = %model, prompt_len = prompt.len()))]
    fn infer(&self, model: &str, prompt: &str) -> Result<String, InferenceError> {
        let body = GenerateRequest {
            model,
            prompt,
            stream: false,
            options: GenerateOptions { temperature: 0.0 },
        };
        debug!(url = %self.url, "sending generate request");

        let response = self
            .http
            .post(&self.url)
            .json(&body)
            .send()
            .and_then(|r| r.error_for_status())
            .map_err(|e| {
                warn!(err = %e, "inference request failed");
                InferenceError::ServiceUnreachable(e.to_string())
            })?;

        let parsed: GenerateResponse = response.json().map_err(|e| {
            warn!(err = %e, "inference response could not be decoded");
            InferenceError::ServiceUnreachable(format!("decode response: {e}"))
        })?;

        let text = parsed.response.trim();
        if text.is_empty() {
            warn!("inference returned empty text");
            return Err(InferenceError::EmptyResponse);
        }
        debug!(response_len = text.len(), "inference completed");
        Ok(text.to_string())
    }
}
