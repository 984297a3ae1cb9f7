//! Provider adapter: turns (text, credential) into a condensed rewrite.
//!
//! The adapter is pure with respect to its arguments — it never touches pool
//! state directly. Callers (the pipeline) report success/failure back to the
//! pool themselves, mapping `AdapterError` variants to `pool::ErrorKind`.

pub mod parse;
pub mod request;
pub mod url;

use std::time::Duration;

use regex::Regex;
use reqwest::StatusCode;
use serde_json::Value;
use thiserror::Error;

use crate::job::ApiFamily;
use crate::pool::{Credential, ErrorKind};
use request::GenerationParams;

#[derive(Debug, Error)]
pub enum AdapterError {
    #[error("rate limited by provider")]
    RateLimit,
    #[error("credential rejected by provider: {0}")]
    InvalidKey(String),
    #[error("transport error: {0}")]
    Transport(String),
    #[error("response had no parseable content")]
    MalformedResponse,
    #[error("{0}")]
    General(String),
}

impl AdapterError {
    /// Maps an adapter failure onto the pool's coarser error taxonomy.
    pub fn as_pool_error_kind(&self) -> ErrorKind {
        match self {
            AdapterError::RateLimit => ErrorKind::RateLimit,
            AdapterError::InvalidKey(_) => ErrorKind::InvalidKey,
            AdapterError::Transport(_) | AdapterError::MalformedResponse | AdapterError::General(_) => ErrorKind::General,
        }
    }
}

/// Condenses `text` in one shot (no chunking — see `chunk` module for
/// splitting chapters ahead of calling this per-chunk).
pub async fn condense(
    client: &reqwest::Client,
    text: &str,
    family: ApiFamily,
    credential: &Credential,
    system_prompt: &str,
    params: &GenerationParams,
    debug: bool,
) -> Result<String, AdapterError> {
    let target = url::build_target(family, credential);
    let model = match family {
        ApiFamily::Gemini => credential.model.clone().unwrap_or_default(),
        ApiFamily::OpenAi => url::openai_model(credential).to_string(),
    };
    let body = request::build_body(family, &model, system_prompt, text, params);

    let per_request_timeout = if url::is_first_party_host(&target.url) {
        Duration::from_secs(params.timeout_official_api)
    } else {
        Duration::from_secs(params.timeout_third_party_api)
    };
    let wall_clock_ceiling = per_request_timeout * 2;
    let deadline = std::time::Instant::now() + wall_clock_ceiling;

    let mut last_err = AdapterError::General("no attempts made".into());

    for attempt in 0..params.max_retries {
        if std::time::Instant::now() >= deadline {
            return Err(AdapterError::General(
                "adapter call exceeded its wall-clock ceiling".into(),
            ));
        }

        if debug {
            eprintln!("DEBUG: adapter attempt {}/{} to {}", attempt + 1, params.max_retries, target.url);
        }

        match send_once(client, &target, &body, per_request_timeout).await {
            Ok(value) => match parse::parse_response(&value) {
                Some(text) => return Ok(text),
                None => {
                    last_err = AdapterError::MalformedResponse;
                }
            },
            Err(SendError::Status(status, retry_after, raw_body)) => {
                if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
                    return Err(AdapterError::InvalidKey(format!("HTTP {status}")));
                }
                if status == StatusCode::TOO_MANY_REQUESTS {
                    let sleep_for = retry_after
                        .or_else(|| parse_retry_info_seconds(&raw_body).map(|n| n + 5))
                        .unwrap_or_else(|| params.retry_delay * 2u64.pow(attempt));
                    if std::time::Instant::now() + Duration::from_secs(sleep_for) >= deadline {
                        return Err(AdapterError::RateLimit);
                    }
                    tokio::time::sleep(Duration::from_secs(sleep_for)).await;
                    last_err = AdapterError::RateLimit;
                    continue;
                }
                last_err = AdapterError::General(format!("HTTP {status}"));
            }
            Err(SendError::Transport(msg)) => {
                last_err = AdapterError::Transport(msg);
            }
        }

        if attempt + 1 >= params.max_retries {
            break;
        }
        let backoff = Duration::from_secs(params.retry_delay * 2u64.pow(attempt));
        if std::time::Instant::now() + backoff >= deadline {
            break;
        }
        tokio::time::sleep(backoff).await;
    }

    Err(last_err)
}

enum SendError {
    Status(StatusCode, Option<u64>, String),
    Transport(String),
}

async fn send_once(
    client: &reqwest::Client,
    target: &url::RequestTarget,
    body: &Value,
    timeout: Duration,
) -> Result<Value, SendError> {
    let mut request = client.post(&target.url).json(body).timeout(timeout);
    if let Some((name, value)) = &target.auth_header {
        request = request.header(*name, value);
    }

    let response = request.send().await.map_err(|e| SendError::Transport(e.to_string()))?;
    let status = response.status();

    if status != StatusCode::OK {
        let retry_after = response
            .headers()
            .get("retry-after")
            .and_then(|v| v.to_str().ok())
            .and_then(|s| s.parse::<u64>().ok());
        let raw = response.text().await.unwrap_or_default();
        return Err(SendError::Status(status, retry_after, raw));
    }

    response.json::<Value>().await.map_err(|e| SendError::Transport(e.to_string()))
}

/// Extracts the Google-style `RetryInfo.retryDelay: "<n>s"` field, if present.
fn parse_retry_info_seconds(raw_body: &str) -> Option<u64> {
    let re = Regex::new(r#""retryDelay"\s*:\s*"(\d+)s""#).ok()?;
    re.captures(raw_body)?.get(1)?.as_str().parse().ok()
}
