
use std::time::Duration;

use anyhow::{Context, Result};
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::{debug, error, warn};
use url::Url;

const EXPONENTIAL_BACKOFF_BASE: u64 = 2;

/// Blocking JSON-over-HTTP transport shared by the provider clients
#[derive(Debug, Clone)]
pub struct JsonHttpClient {
    base_url: Url,
    agent: ureq::Agent,
    retry_attempts: u32,
    bearer_token: Option<String>,
}

impl JsonHttpClient {
    /// Requests resolve relative to `base_url`, keeping any path prefix it has
    #[inline]
    pub fn new(mut base_url: Url, timeout: Duration, retry_attempts: u32) -> Self {
        if !base_url.path().ends_with('/') {
            let prefix = format!("{}/", base_url.path());
            base_url.set_path(&prefix);
        }
        Self {
            base_url,
            agent: build_agent(timeout),
            retry_attempts: retry_attempts.max(1),
            bearer_token: None,
        }
    }

    #[inline]
    #[must_use]
    pub fn with_bearer_token(mut self, token: String) -> Self {
        self.bearer_token = Some(token);
        self
    }

    #[inline]
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.agent = build_agent(timeout);
        self
    }

    #[inline]
    #[must_use]
    pub fn with_retry_attempts(mut self, attempts: u32) -> Self {
        self.retry_attempts = attempts.max(1);
        self
    }

    #[inline]
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    #[inline]
    pub fn retry_attempts(&self) -> u32 {
        self.retry_attempts
    }

    /// GET `path` and decode the JSON body
    #[inline]
    pub fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        let url = self.endpoint(path)?;

        debug!("GET {}", url);

        let response_text = self.make_request_with_retry(|| {
            let mut request = self.agent.get(url.as_str());
            if let Some(token) = &self.bearer_token {
                request = request.header("Authorization", &format!("Bearer {}", token));
            }
            request
                .call()
                .and_then(|mut resp| resp.body_mut().read_to_string())
        })?;

        serde_json::from_str(&response_text)
            .with_context(|| format!("Failed to parse response from {}", url))
    }

    /// POST `body` as JSON to `path` and decode the JSON response
    #[inline]
    pub fn post_json<B: Serialize, T: DeserializeOwned>(&self, path: &str, body: &B) -> Result<T> {
        let url = self.endpoint(path)?;

        let request_json = serde_json::to_string(body).context("Failed to serialize request")?;

        debug!("POST {} ({} bytes)", url, request_json.len());

        let response_text = self.make_request_with_retry(|| {
            let mut request = self
                .agent
                .post(url.as_str())
                .header("Content-Type", "application/json");
            if let Some(token) = &self.bearer_token {
                request = request.header("Authorization", &format!("Bearer {}", token));
            }
            request
                .send(&request_json)
                .and_then(|mut resp| resp.body_mut().read_to_string())
        })?;

        serde_json::from_str(&response_text)
            .with_context(|| format!("Failed to parse response from {}", url))
    }

    /// Full URL for an API path, always below the base path
    #[inline]
    pub fn endpoint(&self, path: &str) -> Result<Url> {
        self.base_url
            .join(path.trim_start_matches('/'))
            .with_context(|| format!("Failed to build URL for {}", path))
    }

    fn make_request_with_retry<F>(&self, mut request_fn: F) -> Result<String>
    where
        F: FnMut() -> Result<String, ureq::Error>,
    {
        let mut last_error = None;

        for attempt in 1..=self.retry_attempts {
            debug!("HTTP request attempt {}/{}", attempt, self.retry_attempts);

            match request_fn() {
                Ok(response_text) => {
                    debug!("Request succeeded on attempt {}", attempt);
                    return Ok(response_text);
                }
                Err(error) => {
                    let should_retry = match &error {
                        ureq::Error::StatusCode(status) => {
                            if *status >= 500 {
                                warn!(
                                    "Server error (status {}), attempt {}/{}",
                                    status, attempt, self.retry_attempts
                                );
                                true
                            } else {
                                warn!("Client error (status {}), not retrying", status);
                                return Err(anyhow::anyhow!("Client error: HTTP {}", status));
                            }
                        }
                        ureq::Error::ConnectionFailed
                        | ureq::Error::HostNotFound
                        | ureq::Error::Timeout(_)
                        | ureq::Error::Io(_) => {
                            warn!(
                                "Transport error: {}, attempt {}/{}",
                                error, attempt, self.retry_attempts
                            );
                            true
                        }
                        _ => {
                            warn!("Non-retryable error: {}", error);
                            false
                        }
                    };

                    if !should_retry {
                        return Err(anyhow::anyhow!("Non-retryable error: {}", error));
                    }

                    last_error = Some(anyhow::anyhow!("Request error: {}", error));

                    if attempt < self.retry_attempts {
                        let delay_ms = EXPONENTIAL_BACKOFF_BASE.pow(attempt - 1) * 1000;
                        let delay = Duration::from_millis(delay_ms);
                        debug!("Waiting {:?} before retry", delay);
                        std::thread::sleep(delay);
                    }
                }
            }
        }

        error!("All retry attempts failed for request to {}", self.base_url);

        Err(last_error.unwrap_or_else(|| anyhow::anyhow!("Request failed after retries")))
    }
}

fn build_agent(timeout: Duration) -> ureq::Agent {
    ureq::Agent::config_builder()
        .timeout_global(Some(timeout))
        .build()
        .into()
}
