//! HTTP retry helpers for transient errors.
//!
//! Every API client sends through [`send_json`] rather than calling
//! `reqwest::RequestBuilder::send()` directly, so each request gets
//! exponential backoff on timeouts, connection resets, rate limiting and
//! server errors.
//!
//! ```ignore
//! let body = retry::send_json(|| client.get(&url).query(&params)).await?;
//! ```

use std::time::Duration;

use reqwest::StatusCode;

use crate::SourceError;

/// Retry attempts for transient HTTP errors. Backoff is 2s, 4s, 8s, 16s,
/// 32s.
const MAX_RETRIES: u32 = 5;

/// Full re-fetches allowed when a response body is not valid JSON.
const MAX_BODY_RETRIES: u32 = 2;

/// Maximum length of the response body preview included in error logs.
const BODY_PREVIEW_LEN: usize = 500;

/// What to do with a response status.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusAction {
    Accept,
    Retry,
    Fail,
}

/// 429 and 5xx are retried, any other 4xx is permanent.
#[must_use]
pub fn classify_status(status: StatusCode) -> StatusAction {
    if status == StatusCode::TOO_MANY_REQUESTS || status.is_server_error() {
        StatusAction::Retry
    } else if status.is_client_error() {
        StatusAction::Fail
    } else {
        StatusAction::Accept
    }
}

/// Sends an HTTP request and parses the response body as JSON.
///
/// `build_request` is called on each attempt since builders are consumed
/// by `.send()`. A body that fails to read or does not parse is re-fetched
/// up to [`MAX_BODY_RETRIES`] times.
///
/// # Errors
///
/// * [`SourceError::Transient`] once the retry budget is exhausted
/// * [`SourceError::Response`] for a non-retryable status
/// * [`SourceError::Http`] if the body never reads
/// * [`SourceError::Json`] if the body never parses
#[allow(clippy::future_not_send)]
pub async fn send_json<F>(build_request: F) -> Result<serde_json::Value, SourceError>
where
    F: Fn() -> reqwest::RequestBuilder,
{
    let mut body_attempt = 0;
    loop {
        let response = send_inner(&build_request, MAX_RETRIES).await?;
        let url = response.url().to_string();
        let status = response.status();

        let text = match response.text().await {
            Ok(text) => text,
            Err(e) => {
                let Some(delay) = body_retry_delay(body_attempt) else {
                    log::error!(
                        "Body read failed after {MAX_BODY_RETRIES} retries, giving up.\n  \
                         url: {url}\n  status: {status}\n  error: {e}"
                    );
                    return Err(SourceError::Http(e));
                };
                body_attempt += 1;
                log::warn!(
                    "Body read failed (body retry {body_attempt}/{MAX_BODY_RETRIES}), \
                     re-fetching in {delay:?}...\n  url: {url}\n  status: {status}\n  \
                     error: {e}"
                );
                tokio::time::sleep(delay).await;
                continue;
            }
        };

        match serde_json::from_str(&text) {
            Ok(value) => return Ok(value),
            Err(e) => {
                let Some(delay) = body_retry_delay(body_attempt) else {
                    log::error!(
                        "JSON parse failed after {MAX_BODY_RETRIES} retries, giving up.\n  \
                         url: {url}\n  status: {status}\n  body preview: {}",
                        preview(&text),
                    );
                    return Err(SourceError::Json(e));
                };
                body_attempt += 1;
                log::warn!(
                    "JSON parse failed (body retry {body_attempt}/{MAX_BODY_RETRIES}), \
                     re-fetching in {delay:?}...\n  url: {url}\n  status: {status}\n  \
                     parse error: {e}\n  body preview: {}",
                    preview(&text),
                );
                tokio::time::sleep(delay).await;
            }
        }
    }
}

/// Backoff before the next body re-fetch, or `None` once the body retry
/// budget is spent. `body_attempt` counts re-fetches already made.
#[must_use]
pub const fn body_retry_delay(body_attempt: u32) -> Option<Duration> {
    if body_attempt < MAX_BODY_RETRIES {
        Some(Duration::from_secs(1u64 << (body_attempt + 1)))
    } else {
        None
    }
}

fn preview(text: &str) -> String {
    if text.len() <= BODY_PREVIEW_LEN {
        return text.to_string();
    }
    let mut end = BODY_PREVIEW_LEN;
    while !text.is_char_boundary(end) {
        end -= 1;
    }
    format!("{}...", &text[..end])
}

/// Sends the request, retrying transient failures with exponential
/// backoff. Returns the first accepted response.
#[allow(clippy::future_not_send)]
async fn send_inner<F>(
    build_request: &F,
    max_retries: u32,
) -> Result<reqwest::Response, SourceError>
where
    F: Fn() -> reqwest::RequestBuilder,
{
    let mut last_failure = String::from("no attempt made");

    for attempt in 0..=max_retries {
        if attempt > 0 {
            let delay = Duration::from_secs(1u64 << attempt);
            log::warn!("  retry {attempt}/{max_retries} in {delay:?}...");
            tokio::time::sleep(delay).await;
        }

        match build_request().send().await {
            Err(e) if is_transient(&e) => {
                log::warn!("  transient error: {e}");
                last_failure = e.to_string();
            }
            Err(e) => return Err(SourceError::Http(e)),
            Ok(response) => {
                let status = response.status();
                match classify_status(status) {
                    StatusAction::Accept => return Ok(response),
                    StatusAction::Retry => {
                        log::warn!("  HTTP {status}");
                        last_failure = format!("HTTP {status}");
                    }
                    StatusAction::Fail => {
                        return Err(SourceError::Response {
                            message: format!("HTTP {status} from {}", response.url()),
                        });
                    }
                }
            }
        }
    }

    Err(SourceError::Transient {
        message: format!("{last_failure} after {max_retries} retries"),
    })
}

/// Returns `true` if the error is likely transient and worth retrying.
fn is_transient(e: &reqwest::Error) -> bool {
    e.is_timeout() || e.is_connect() || e.is_body() || e.is_request()
}
