//! Generative Backend Binding
//!
//! Defines the [`GenerativeBackend`] seam the orchestrator calls through,
//! the structured [`BackendError`] taxonomy, and the [`GeminiClient`]
//! implementation over the `generateContent` REST surface. Failure
//! classification happens here, at the boundary: callers branch on error
//! variants, never on message text.

use async_trait::async_trait;
use serde_json::Value;
use tracing::debug;

/// Error types for backend calls.
///
/// Only [`BackendError::RateLimited`] is treated as transient; everything
/// else fails fast out of the retry loop.
#[derive(Debug, thiserror::Error)]
pub enum BackendError {
    /// The backend refused the call for quota reasons; rotating to another
    /// credential may help.
    #[error("backend rate limited: {0}")]
    RateLimited(String),

    /// The backend rejected the request for a non-quota reason.
    #[error("backend request failed: {0}")]
    Api(String),

    /// The request never produced a usable HTTP response.
    #[error("network error: {0}")]
    Network(String),

    /// The backend answered but the body could not be understood.
    #[error("malformed backend response: {0}")]
    InvalidResponse(String),

    /// The retry loop ran out of attempts without a definitive error.
    #[error("retries exhausted after {0} attempts")]
    RetriesExhausted(u32),
}

impl BackendError {
    /// Whether this failure should trigger credential rotation and retry.
    pub fn is_rate_limit(&self) -> bool {
        matches!(self, BackendError::RateLimited(_))
    }
}

impl From<reqwest::Error> for BackendError {
    fn from(err: reqwest::Error) -> Self {
        BackendError::Network(err.to_string())
    }
}

/// One backend invocation: a textual prompt plus an optional structured
/// output schema descriptor.
#[derive(Debug, Clone)]
pub struct GenerationRequest {
    pub model: String,
    pub prompt: String,
    /// When present, the backend is asked to emit JSON conforming to this
    /// schema; when absent, free text is requested.
    pub response_schema: Option<Value>,
}

/// What a backend call yields: the response text and, when the backend
/// reports it, a usage token count.
#[derive(Debug, Clone)]
pub struct BackendResponse {
    pub text: String,
    pub total_tokens: Option<u32>,
}

/// A generic client for one-shot generative calls.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait GenerativeBackend: Send + Sync {
    /// Executes a single generation bound to the given credential.
    async fn generate(
        &self,
        credential: &str,
        request: &GenerationRequest,
    ) -> Result<BackendResponse, BackendError>;
}

/// Wire types for the Gemini `generateContent` REST API.
mod wire {
    use serde::{Deserialize, Serialize};
    use serde_json::Value;

    #[derive(Serialize)]
    #[serde(rename_all = "camelCase")]
    pub(super) struct GenerateContentRequest {
        pub contents: Vec<Content>,
        #[serde(skip_serializing_if = "Option::is_none")]
        pub generation_config: Option<GenerationConfig>,
    }

    #[derive(Serialize)]
    pub(super) struct Content {
        pub role: String,
        pub parts: Vec<Part>,
    }

    #[derive(Serialize, Deserialize, Debug)]
    pub(super) struct Part {
        pub text: String,
    }

    #[derive(Serialize)]
    #[serde(rename_all = "camelCase")]
    pub(super) struct GenerationConfig {
        pub response_mime_type: String,
        pub response_schema: Value,
    }

    #[derive(Deserialize, Debug)]
    #[serde(rename_all = "camelCase")]
    pub(super) struct GenerateContentResponse {
        #[serde(default)]
        pub candidates: Vec<Candidate>,
        pub usage_metadata: Option<UsageMetadata>,
    }

    #[derive(Deserialize, Debug)]
    pub(super) struct Candidate {
        pub content: Option<CandidateContent>,
    }

    #[derive(Deserialize, Debug)]
    pub(super) struct CandidateContent {
        #[serde(default)]
        pub parts: Vec<ResponsePart>,
    }

    #[derive(Deserialize, Debug)]
    pub(super) struct ResponsePart {
        pub text: Option<String>,
    }

    #[derive(Deserialize, Debug)]
    #[serde(rename_all = "camelCase")]
    pub(super) struct UsageMetadata {
        pub total_token_count: Option<u32>,
    }

    #[derive(Deserialize, Debug)]
    pub(super) struct ErrorBody {
        pub error: Option<ErrorDetail>,
    }

    #[derive(Deserialize, Debug)]
    pub(super) struct ErrorDetail {
        pub message: Option<String>,
        pub status: Option<String>,
    }
}

const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";

/// `GenerativeBackend` implementation for the Gemini REST API.
pub struct GeminiClient {
    http: reqwest::Client,
    base_url: String,
}

impl GeminiClient {
    pub fn new() -> Self {
        Self::with_base_url(DEFAULT_BASE_URL.to_string())
    }

    /// Points the client at an alternative endpoint, used by tests and
    /// proxy deployments.
    pub fn with_base_url(base_url: String) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url,
        }
    }

    /// Maps a non-success HTTP reply onto the error taxonomy. Quota
    /// refusals arrive as 429s or as `RESOURCE_EXHAUSTED` payloads.
    fn classify_failure(status: reqwest::StatusCode, body: &str) -> BackendError {
        if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            return BackendError::RateLimited(format!("HTTP 429: {body}"));
        }
        if let Ok(parsed) = serde_json::from_str::<wire::ErrorBody>(body) {
            if let Some(detail) = parsed.error {
                let api_status = detail.status.unwrap_or_default();
                let message = detail.message.unwrap_or_else(|| body.to_string());
                let lowered = message.to_lowercase();
                if api_status == "RESOURCE_EXHAUSTED"
                    || lowered.contains("quota")
                    || lowered.contains("rate")
                {
                    return BackendError::RateLimited(message);
                }
                return BackendError::Api(format!("HTTP {status}: {message}"));
            }
        }
        BackendError::Api(format!("HTTP {status}: {body}"))
    }
}

impl Default for GeminiClient {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl GenerativeBackend for GeminiClient {
    async fn generate(
        &self,
        credential: &str,
        request: &GenerationRequest,
    ) -> Result<BackendResponse, BackendError> {
        let url = format!(
            "{}/models/{}:generateContent",
            self.base_url, request.model
        );

        let body = wire::GenerateContentRequest {
            contents: vec![wire::Content {
                role: "user".to_string(),
                parts: vec![wire::Part {
                    text: request.prompt.clone(),
                }],
            }],
            generation_config: request.response_schema.as_ref().map(|schema| {
                wire::GenerationConfig {
                    response_mime_type: "application/json".to_string(),
                    response_schema: schema.clone(),
                }
            }),
        };

        debug!(model = %request.model, structured = request.response_schema.is_some(), "dispatching generateContent request");

        let response = self
            .http
            .post(&url)
            .query(&[("key", credential)])
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(Self::classify_failure(status, &body));
        }

        let parsed: wire::GenerateContentResponse = response
            .json()
            .await
            .map_err(|err| BackendError::InvalidResponse(err.to_string()))?;

        let text = parsed
            .candidates
            .first()
            .and_then(|candidate| candidate.content.as_ref())
            .and_then(|content| content.parts.first())
            .and_then(|part| part.text.clone())
            .ok_or_else(|| {
                BackendError::InvalidResponse("response carried no candidate text".to_string())
            })?;

        let total_tokens = parsed
            .usage_metadata
            .and_then(|usage| usage.total_token_count);

        Ok(BackendResponse { text, total_tokens })
    }
}
