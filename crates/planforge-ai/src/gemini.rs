use anyhow::anyhow;
use async_trait::async_trait;
use planforge_core::{PlanningError, Result, SprintPlan};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::planner::{PlannerConfig, SprintPlanner};
use crate::schema::parse_plan;

/// Raw wire call beneath [`GeminiPlanner`]. One invocation is one attempt;
/// retry and parsing stay in the planner so a scripted transport can drive
/// them in tests.
#[async_trait]
pub trait PlanTransport: Send + Sync {
    async fn generate(
        &self,
        config: &PlannerConfig,
        request: &GenerateContentRequest,
    ) -> anyhow::Result<GenerateContentResponse>;
}

/// Client for the hosted generative planning service.
///
/// Every attempt is a single call; transport failures, non-2xx responses and
/// answers with a broken envelope are retried with exponential backoff, while
/// an answer that fails schema decoding aborts immediately.
pub struct GeminiPlanner<T = HttpTransport> {
    config: PlannerConfig,
    transport: T,
}

impl GeminiPlanner<HttpTransport> {
    pub fn new(config: PlannerConfig) -> Result<Self> {
        let transport = HttpTransport::new(&config)?;
        Ok(Self { config, transport })
    }

    /// Create from environment variables.
    pub fn from_env() -> Result<Self> {
        Self::new(PlannerConfig::from_env()?)
    }
}

impl<T: PlanTransport> GeminiPlanner<T> {
    pub fn with_transport(config: PlannerConfig, transport: T) -> Self {
        Self { config, transport }
    }

    async fn invoke(&self, prompt: &str) -> Result<SprintPlan> {
        let max_attempts = self.config.retry.max_attempts;
        let mut last_error = None;

        for attempt in 1..=max_attempts {
            match self.try_invoke(prompt).await {
                Ok(answer) => {
                    debug!("planner answered on attempt {}/{}", attempt, max_attempts);
                    return parse_plan(&answer);
                }
                Err(e) => {
                    warn!(
                        "planner call failed (attempt {}/{}): {}",
                        attempt, max_attempts, e
                    );
                    last_error = Some(e.to_string());
                    // Exponential backoff: 1s, 2s, 4s
                    tokio::time::sleep(self.config.retry.delay_for(attempt)).await;
                }
            }
        }

        Err(PlanningError::PlannerUnavailable {
            attempts: max_attempts,
            message: last_error.unwrap_or_else(|| "no attempts were made".to_string()),
        })
    }

    /// One call to the service, returning the answer text. Any failure here
    /// counts as transient, a missing envelope field included.
    async fn try_invoke(&self, prompt: &str) -> anyhow::Result<String> {
        let request = GenerateContentRequest::new(prompt);
        let response = self.transport.generate(&self.config, &request).await?;
        response
            .first_text()
            .map(str::to_string)
            .ok_or_else(|| anyhow!("response envelope is missing candidate text"))
    }
}

#[async_trait]
impl<T: PlanTransport> SprintPlanner for GeminiPlanner<T> {
    async fn plan(&self, prompt: &str) -> Result<SprintPlan> {
        match tokio::time::timeout(self.config.request_deadline, self.invoke(prompt)).await {
            Ok(result) => result,
            Err(_) => Err(PlanningError::DeadlineExceeded(self.config.request_deadline)),
        }
    }

    fn provider_name(&self) -> &str {
        "gemini"
    }
}

/// Default transport: one POST per attempt against the hosted API. The API
/// key travels in a header and reqwest errors are stripped of their URL, so
/// surfaced messages never carry credentials.
pub struct HttpTransport {
    client: Client,
}

impl HttpTransport {
    pub fn new(config: &PlannerConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| {
                PlanningError::Configuration(format!(
                    "failed to build HTTP client: {}",
                    e.without_url()
                ))
            })?;
        Ok(Self { client })
    }
}

#[async_trait]
impl PlanTransport for HttpTransport {
    async fn generate(
        &self,
        config: &PlannerConfig,
        request: &GenerateContentRequest,
    ) -> anyhow::Result<GenerateContentResponse> {
        let url = format!(
            "{}/models/{}:generateContent",
            config.base_url, config.model
        );

        let response = self
            .client
            .post(&url)
            .header("x-goog-api-key", &config.api_key)
            .json(request)
            .send()
            .await
            .map_err(|e| anyhow!("planner request failed: {}", e.without_url()))?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(anyhow!("planner returned {}: {}", status, error_text));
        }

        response
            .json::<GenerateContentResponse>()
            .await
            .map_err(|e| anyhow!("planner response envelope is not valid JSON: {}", e.without_url()))
    }
}

// Wire request/response types for the generateContent endpoint.

#[derive(Debug, Serialize)]
pub struct GenerateContentRequest {
    contents: Vec<Content>,
}

#[derive(Debug, Serialize)]
struct Content {
    parts: Vec<Part>,
}

#[derive(Debug, Serialize)]
struct Part {
    text: String,
}

impl GenerateContentRequest {
    fn new(prompt: &str) -> Self {
        Self {
            contents: vec![Content {
                parts: vec![Part {
                    text: prompt.to_string(),
                }],
            }],
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<CandidatePart>,
}

#[derive(Debug, Deserialize)]
struct CandidatePart {
    text: Option<String>,
}

impl GenerateContentResponse {
    /// Text of the first part of the first candidate, when present.
    pub fn first_text(&self) -> Option<&str> {
        self.candidates
            .first()?
            .content
            .as_ref()?
            .parts
            .first()?
            .text
            .as_deref()
    }
}
