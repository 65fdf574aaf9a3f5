use reqwest::{header, Client, StatusCode};
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::services::retry::{AttemptError, RetryPolicy};

const USER_AGENT: &str = "AdTopia-Migration/1.0";
const CARDS_PER_GENERATION: u32 = 5;

/// Client for the Gamma card generation API.
pub struct GenerationClient {
    http: Client,
    endpoint: String,
    api_key: String,
    retry: RetryPolicy,
}

#[derive(Serialize)]
struct GenerationRequest<'a> {
    prompt: &'a str,
    format: &'a str,
    quality: &'a str,
    count: u32,
}

#[derive(Deserialize)]
struct GenerationResponse {
    zip_download_url: Option<String>,
    #[serde(default)]
    warnings: Option<Vec<String>>,
}

#[derive(Deserialize)]
struct ApiErrorBody {
    error: Option<ApiErrorDetail>,
}

#[derive(Deserialize)]
struct ApiErrorDetail {
    message: Option<String>,
}

/// Result of a generation call. Warnings are kept even when the call failed.
#[derive(Debug)]
pub struct GenerationResult {
    pub outcome: Result<String, GenerationError>,
    pub warnings: Vec<String>,
    pub attempts: u32,
}

impl GenerationResult {
    pub fn archive_url(&self) -> Option<&str> {
        self.outcome.as_deref().ok()
    }
}

impl GenerationClient {
    pub fn new(
        endpoint: &str,
        api_key: &str,
        timeout: Duration,
        retry: RetryPolicy,
    ) -> Result<Self, GenerationError> {
        let http = Client::builder()
            .user_agent(USER_AGENT)
            .timeout(timeout)
            .build()?;

        Ok(Self {
            http,
            endpoint: endpoint.to_string(),
            api_key: api_key.to_string(),
            retry,
        })
    }

    /// Request a card set for `prompt` and return the archive download URL.
    pub async fn generate(&self, prompt: &str, trace_id: &str) -> GenerationResult {
        let result = self
            .retry
            .run("gamma_generation", |attempt| {
                tracing::info!(
                    trace_id,
                    attempt,
                    max_attempts = self.retry.max_attempts,
                    "Calling Gamma API"
                );
                self.attempt(prompt, trace_id)
            })
            .await;

        match result {
            Ok(((archive_url, warnings), attempts)) => {
                tracing::info!(trace_id, attempts, "Gamma API success");
                GenerationResult {
                    outcome: Ok(archive_url),
                    warnings,
                    attempts,
                }
            }
            Err(failure) => {
                let warnings = match &failure.error {
                    GenerationError::MissingArchiveUrl { warnings } => warnings.clone(),
                    _ => Vec::new(),
                };
                GenerationResult {
                    outcome: Err(failure.error),
                    warnings,
                    attempts: failure.attempts,
                }
            }
        }
    }

    async fn attempt(
        &self,
        prompt: &str,
        trace_id: &str,
    ) -> Result<(String, Vec<String>), AttemptError<GenerationError>> {
        let body = GenerationRequest {
            prompt,
            format: "png",
            quality: "high",
            count: CARDS_PER_GENERATION,
        };

        let response = self
            .http
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(classify_transport_error)?;

        let status = response.status();
        match status {
            StatusCode::OK => {
                let data: GenerationResponse = response
                    .json()
                    .await
                    .map_err(|e| AttemptError::Fatal(GenerationError::Http(e)))?;

                let warnings = data.warnings.unwrap_or_default();
                if !warnings.is_empty() {
                    tracing::warn!(trace_id, warnings = ?warnings, "Gamma API returned warnings");
                }

                match data.zip_download_url.filter(|url| !url.is_empty()) {
                    Some(url) => Ok((url, warnings)),
                    None => Err(AttemptError::Fatal(GenerationError::MissingArchiveUrl {
                        warnings,
                    })),
                }
            }
            StatusCode::BAD_REQUEST => {
                let message = error_message(response).await;
                tracing::error!(trace_id, %message, "Bad request (400)");
                Err(AttemptError::Fatal(GenerationError::BadRequest(message)))
            }
            StatusCode::UNAUTHORIZED => {
                tracing::error!(trace_id, "Authentication failed (401), check GAMMA_API_KEY");
                Err(AttemptError::Fatal(GenerationError::Unauthorized))
            }
            StatusCode::TOO_MANY_REQUESTS => {
                let retry_after = response
                    .headers()
                    .get(header::RETRY_AFTER)
                    .and_then(|v| v.to_str().ok());
                let delay = self.retry.retry_after_delay(retry_after);
                tracing::warn!(
                    trace_id,
                    retry_after_ms = delay.as_millis() as u64,
                    "Rate limited (429)"
                );
                Err(AttemptError::Retry {
                    error: GenerationError::RateLimited,
                    delay: Some(delay),
                })
            }
            s if RetryPolicy::is_retryable_status(s) => {
                let body = response.text().await.unwrap_or_default();
                Err(AttemptError::retry(GenerationError::Server {
                    status: s.as_u16(),
                    body,
                }))
            }
            s => {
                let body = response.text().await.unwrap_or_default();
                Err(AttemptError::Fatal(GenerationError::UnexpectedStatus {
                    status: s.as_u16(),
                    body,
                }))
            }
        }
    }
}

fn classify_transport_error(error: reqwest::Error) -> AttemptError<GenerationError> {
    if error.is_timeout() {
        AttemptError::retry(GenerationError::Timeout)
    } else if error.is_builder() {
        AttemptError::Fatal(GenerationError::Http(error))
    } else {
        AttemptError::retry(GenerationError::Http(error))
    }
}

async fn error_message(response: reqwest::Response) -> String {
    let is_json = response
        .headers()
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|ct| ct.starts_with("application/json"));
    let text = response.text().await.unwrap_or_default();

    if is_json {
        if let Ok(ApiErrorBody {
            error: Some(ApiErrorDetail {
                message: Some(message),
            }),
        }) = serde_json::from_str::<ApiErrorBody>(&text)
        {
            return message;
        }
    }
    text
}

#[derive(Debug, thiserror::Error)]
pub enum GenerationError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Request timed out")]
    Timeout,

    #[error("Bad request (400): {0}")]
    BadRequest(String),

    #[error("Authentication failed (401)")]
    Unauthorized,

    #[error("Rate limited (429)")]
    RateLimited,

    #[error("Server error ({status}): {body}")]
    Server { status: u16, body: String },

    #[error("Unexpected status ({status}): {body}")]
    UnexpectedStatus { status: u16, body: String },

    #[error("No zip_download_url in response")]
    MissingArchiveUrl { warnings: Vec<String> },
}
