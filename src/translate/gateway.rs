//! Translation gateway: OpenAI-style chat/completions client.
//! Connection pooling via reqwest, simple token-bucket pacing and bounded
//! retry on 429/5xx. No request timeout: a hung gateway call blocks its
//! own job only. Unexpected response shapes are surfaced as a sum-type
//! variant rather than an error, so callers decide how to degrade.

use std::time::{Duration, Instant};

use async_trait::async_trait;
use serde_json::Value;
use tracing::warn;

#[derive(Debug)]
pub enum GatewayError {
    /// The service answered with a non-success status or unreadable body.
    ApiError(String),
    /// Rate-limit retries exhausted.
    RateLimited,
    /// Connection-level failure before any response arrived.
    Transport(String),
}

impl std::fmt::Display for GatewayError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            GatewayError::ApiError(msg) => write!(f, "gateway API error: {msg}"),
            GatewayError::RateLimited => write!(f, "gateway rate limited"),
            GatewayError::Transport(msg) => write!(f, "gateway transport error: {msg}"),
        }
    }
}

/// Raw completion returned by the gateway. A malformed or unexpected
/// response shape becomes `Unrecognized` carrying the raw JSON value;
/// callers must handle both variants explicitly.
#[derive(Debug, Clone)]
pub enum GatewayReply {
    Text(String),
    Unrecognized(Value),
}

/// `complete(prompt) -> completion text`, the whole contract. Implemented
/// by the HTTP client below and by mocks in tests.
#[async_trait]
pub trait TranslationGateway: Send + Sync {
    async fn complete(&self, prompt: &str) -> Result<GatewayReply, GatewayError>;
}

/// Chat-completions client for an OpenAI-compatible endpoint.
pub struct HttpGateway {
    http: reqwest::Client,
    api_key: String,
    base_url: String,
    model: String,
    /// Simple token-bucket: tracks the next allowed request time.
    next_allowed: tokio::sync::Mutex<Instant>,
    /// Minimum interval between requests (100ms = 10 req/s).
    min_interval: Duration,
}

impl HttpGateway {
    pub fn new(api_key: String, base_url: String, model: String) -> Result<Self, GatewayError> {
        // Deliberately no .timeout(): the pipeline tolerates a hung call.
        let http = reqwest::Client::builder()
            .pool_max_idle_per_host(4)
            .pool_idle_timeout(Duration::from_secs(90))
            .build()
            .map_err(|e| GatewayError::Transport(e.to_string()))?;

        Ok(Self {
            http,
            api_key,
            base_url,
            model,
            next_allowed: tokio::sync::Mutex::new(Instant::now()),
            min_interval: Duration::from_millis(100),
        })
    }

    /// Wait until the pacing bucket allows a request.
    async fn rate_limit_wait(&self) {
        let mut next = self.next_allowed.lock().await;
        let now = Instant::now();
        if *next > now {
            tokio::time::sleep(*next - now).await;
        }
        *next = Instant::now() + self.min_interval;
    }

    /// Send with bounded retry.
    /// 429: Retry-After or 1s/2s/4s (max 3). 5xx: exponential (max 2).
    async fn send_with_retry(&self, body: &Value) -> Result<reqwest::Response, GatewayError> {
        let mut attempt: u32 = 0;
        let max_429_retries: u32 = 3;
        let max_5xx_retries: u32 = 2;

        loop {
            let result = self
                .http
                .post(format!("{}/v1/chat/completions", self.base_url))
                .header("Authorization", format!("Bearer {}", self.api_key))
                .header("Content-Type", "application/json")
                .json(body)
                .send()
                .await;

            match result {
                Ok(resp) if resp.status().is_success() => {
                    return Ok(resp);
                }
                Ok(resp) if resp.status().as_u16() == 429 => {
                    if attempt >= max_429_retries {
                        return Err(GatewayError::RateLimited);
                    }
                    let wait = resp
                        .headers()
                        .get("retry-after")
                        .and_then(|v| v.to_str().ok())
                        .and_then(|s| s.parse::<u64>().ok())
                        .map(Duration::from_secs)
                        .unwrap_or_else(|| Duration::from_secs(1 << attempt));
                    warn!(attempt, wait_ms = wait.as_millis() as u64, "429 rate limited, retrying");
                    tokio::time::sleep(wait).await;
                    attempt += 1;
                }
                Ok(resp) if resp.status().is_server_error() => {
                    if attempt >= max_5xx_retries {
                        return Err(GatewayError::ApiError(format!(
                            "server error: {}",
                            resp.status()
                        )));
                    }
                    let wait = Duration::from_millis(500 * (1 << attempt));
                    warn!(
                        attempt,
                        status = resp.status().as_u16(),
                        wait_ms = wait.as_millis() as u64,
                        "5xx error, retrying"
                    );
                    tokio::time::sleep(wait).await;
                    attempt += 1;
                }
                Ok(resp) => {
                    let status = resp.status();
                    let body_text = resp.text().await.unwrap_or_default();
                    return Err(GatewayError::ApiError(format!(
                        "unexpected status {}: {}",
                        status,
                        body_text.chars().take(200).collect::<String>()
                    )));
                }
                Err(e) => {
                    return Err(GatewayError::Transport(e.to_string()));
                }
            }
        }
    }
}

#[async_trait]
impl TranslationGateway for HttpGateway {
    async fn complete(&self, prompt: &str) -> Result<GatewayReply, GatewayError> {
        self.rate_limit_wait().await;

        let body = serde_json::json!({
            "model": self.model,
            "messages": [{"role": "user", "content": prompt}],
        });

        let response = self.send_with_retry(&body).await?;
        let raw: Value = response
            .json()
            .await
            .map_err(|e| GatewayError::ApiError(format!("unreadable body: {e}")))?;

        match raw
            .pointer("/choices/0/message/content")
            .and_then(Value::as_str)
        {
            Some(text) => Ok(GatewayReply::Text(text.to_string())),
            None => {
                warn!("completion response shape unexpected, passing raw value through");
                Ok(GatewayReply::Unrecognized(raw))
            }
        }
    }
}
