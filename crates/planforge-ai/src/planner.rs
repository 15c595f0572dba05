use std::time::Duration;

use async_trait::async_trait;
use planforge_core::{PlanningError, Result, SprintPlan};

use crate::retry::RetryPolicy;

const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";
const DEFAULT_MODEL: &str = "gemini-2.0-flash";

/// Capability seam for the external planning service.
///
/// The orchestrator only ever talks to this trait; the concrete HTTP client
/// lives in [`crate::GeminiPlanner`] and test doubles implement it directly.
#[async_trait]
pub trait SprintPlanner: Send + Sync {
    /// Produce a structured plan for the rendered instruction document.
    async fn plan(&self, prompt: &str) -> Result<SprintPlan>;

    /// Short provider label used in logs.
    fn provider_name(&self) -> &str;
}

/// Connection settings for the hosted planning model.
#[derive(Debug, Clone)]
pub struct PlannerConfig {
    /// API key, sent as a request header and never as part of the URL.
    pub api_key: String,
    /// Model to use (e.g. "gemini-2.0-flash")
    pub model: String,
    pub base_url: String,
    /// Per-attempt HTTP timeout.
    pub timeout: Duration,
    /// End-to-end budget for one plan call, retries and backoff included.
    pub request_deadline: Duration,
    pub retry: RetryPolicy,
}

impl Default for PlannerConfig {
    fn default() -> Self {
        Self {
            api_key: std::env::var("GEMINI_API_KEY").unwrap_or_default(),
            model: std::env::var("GEMINI_MODEL").unwrap_or_else(|_| DEFAULT_MODEL.to_string()),
            base_url: std::env::var("GEMINI_BASE_URL")
                .unwrap_or_else(|_| DEFAULT_BASE_URL.to_string()),
            timeout: Duration::from_secs(30),
            request_deadline: Duration::from_secs(120),
            retry: RetryPolicy::default(),
        }
    }
}

impl PlannerConfig {
    /// Read settings from the environment, failing when no API key is set.
    pub fn from_env() -> Result<Self> {
        let config = Self::default();
        if config.api_key.is_empty() {
            return Err(PlanningError::Configuration(
                "planner API key is required; set the GEMINI_API_KEY environment variable"
                    .to_string(),
            ));
        }
        Ok(config)
    }
}
