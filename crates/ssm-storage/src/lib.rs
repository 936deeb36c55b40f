//! HTTP transport with retry/backoff, plus the seen-set ledger used for dedup.

use std::time::Duration;

use anyhow::Context;
use reqwest::header::AUTHORIZATION;
use reqwest::{RequestBuilder, StatusCode};
use serde::de::DeserializeOwned;
use serde::Serialize;
use thiserror::Error;
use tracing::{debug, info_span, Instrument};

mod ledger;

pub use ledger::{InMemoryLedger, SeenLedger};

const ERROR_BODY_SNIPPET: usize = 300;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryDisposition {
    Retryable,
    NonRetryable,
}

pub fn classify_status(status: StatusCode) -> RetryDisposition {
    if status.is_server_error() || status == StatusCode::TOO_MANY_REQUESTS {
        RetryDisposition::Retryable
    } else {
        RetryDisposition::NonRetryable
    }
}

pub fn classify_reqwest_error(err: &reqwest::Error) -> RetryDisposition {
    if err.is_timeout() || err.is_connect() {
        RetryDisposition::Retryable
    } else {
        RetryDisposition::NonRetryable
    }
}

#[derive(Debug, Clone, Copy)]
pub struct BackoffPolicy {
    pub max_retries: usize,
    pub base_delay: Duration,
    pub max_delay: Duration,
}

impl Default for BackoffPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            base_delay: Duration::from_millis(500),
            max_delay: Duration::from_secs(8),
        }
    }
}

impl BackoffPolicy {
    pub fn delay_for_attempt(&self, attempt_index: usize) -> Duration {
        let factor = 1u32.checked_shl(attempt_index as u32).unwrap_or(u32::MAX);
        let delay = self.base_delay.saturating_mul(factor);
        delay.min(self.max_delay)
    }
}

#[derive(Debug, Clone)]
pub struct HttpClientConfig {
    pub timeout: Duration,
    pub user_agent: Option<String>,
    pub backoff: BackoffPolicy,
}

impl Default for HttpClientConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(20),
            user_agent: None,
            backoff: BackoffPolicy::default(),
        }
    }
}

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("request to {url} failed: {source}")]
    Request {
        url: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("http status {status} from {url}: {body}")]
    HttpStatus { status: u16, url: String, body: String },
    #[error("invalid JSON from {url}: {source}")]
    Decode {
        url: String,
        #[source]
        source: serde_json::Error,
    },
}

impl FetchError {
    fn request(url: &str, err: reqwest::Error) -> Self {
        // Query strings carry API keys; keep them out of logs.
        Self::Request {
            url: url.to_string(),
            source: err.without_url(),
        }
    }
}

/// Thin JSON client shared by every remote collaborator.
///
/// GETs are retried with capped exponential backoff on throttling, server errors,
/// timeouts and connect failures. POSTs go out exactly once: creating an issue
/// twice is worse than reporting a failure and retrying next cycle.
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: reqwest::Client,
    backoff: BackoffPolicy,
}

impl HttpFetcher {
    pub fn new(config: HttpClientConfig) -> anyhow::Result<Self> {
        let mut builder = reqwest::Client::builder()
            .gzip(true)
            .brotli(true)
            .timeout(config.timeout);

        if let Some(user_agent) = &config.user_agent {
            builder = builder.user_agent(user_agent.clone());
        }

        let client = builder.build().context("building reqwest client")?;
        Ok(Self {
            client,
            backoff: config.backoff,
        })
    }

    pub async fn get_json<T: DeserializeOwned>(
        &self,
        service: &str,
        url: &str,
        query: &[(&str, String)],
    ) -> Result<T, FetchError> {
        let span = info_span!("http_get", service, url);
        async move {
            let mut attempt = 0;
            loop {
                let outcome = self.send(self.client.get(url).query(query), url).await;
                let retryable = match &outcome {
                    Err(FetchError::HttpStatus { status, .. }) => StatusCode::from_u16(*status)
                        .map(|s| classify_status(s) == RetryDisposition::Retryable)
                        .unwrap_or(false),
                    Err(FetchError::Request { source, .. }) => {
                        classify_reqwest_error(source) == RetryDisposition::Retryable
                    }
                    _ => false,
                };
                if retryable && attempt < self.backoff.max_retries {
                    let delay = self.backoff.delay_for_attempt(attempt);
                    debug!(attempt, ?delay, "retrying request");
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                    continue;
                }
                return outcome;
            }
        }
        .instrument(span)
        .await
    }

    pub async fn post_json<B, T>(
        &self,
        service: &str,
        url: &str,
        authorization: Option<&str>,
        body: &B,
    ) -> Result<T, FetchError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let span = info_span!("http_post", service, url);
        let mut request = self.client.post(url).json(body);
        if let Some(value) = authorization {
            request = request.header(AUTHORIZATION, value);
        }
        self.send(request, url).instrument(span).await
    }

    async fn send<T: DeserializeOwned>(
        &self,
        request: RequestBuilder,
        url: &str,
    ) -> Result<T, FetchError> {
        let resp = request
            .send()
            .await
            .map_err(|err| FetchError::request(url, err))?;
        let status = resp.status();
        let bytes = resp
            .bytes()
            .await
            .map_err(|err| FetchError::request(url, err))?;

        if !status.is_success() {
            return Err(FetchError::HttpStatus {
                status: status.as_u16(),
                url: url.to_string(),
                body: snippet(&bytes),
            });
        }

        serde_json::from_slice(&bytes).map_err(|source| FetchError::Decode {
            url: url.to_string(),
            source,
        })
    }
}

fn snippet(bytes: &[u8]) -> String {
    let text = String::from_utf8_lossy(bytes);
    let text = text.trim();
    match text.char_indices().nth(ERROR_BODY_SNIPPET) {
        Some((cut, _)) => format!("{}...", &text[..cut]),
        None => text.to_string(),
    }
}
