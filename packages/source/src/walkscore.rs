//! Walk Score API client.

use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;
use unicorn_walkability::{RawWalkScore, WalkScoreError, WalkScoreQuery, WalkScoreSource};

use crate::{ResponseCache, SourceError, retry};

pub const API_KEY_VAR: &str = "WALKSCORE_API_KEY";
pub const DEFAULT_URL: &str = "https://api.walkscore.com/score";
const CACHE_NAMESPACE: &str = "walkscore";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

/// Body `status` of a scored location. Failures also arrive as HTTP 200.
const STATUS_OK: i64 = 1;

/// Statuses worth asking again later: score still being calculated,
/// internal error, daily quota exceeded.
const STATUS_RETRY_LATER: [i64; 3] = [2, 31, 41];

#[derive(Debug, Clone)]
pub struct WalkScoreApi {
    client: reqwest::Client,
    api_key: String,
    url: String,
    cache: Option<ResponseCache>,
}

/// Request parameters, without the key. Transit and bike scores are
/// always requested.
#[must_use]
pub fn score_params(query: &WalkScoreQuery) -> Vec<(&'static str, String)> {
    vec![
        ("format", "json".to_string()),
        ("address", query.address.clone()),
        ("lat", query.latitude.to_string()),
        ("lon", query.longitude.to_string()),
        ("transit", "1".to_string()),
        ("bike", "1".to_string()),
    ]
}

/// Checks the `status` field of a response body.
///
/// # Errors
///
/// Returns [`SourceError::Transient`] for statuses that may succeed later
/// and [`SourceError::Response`] for any other failure, including a
/// missing status.
pub fn check_status(body: &Value) -> Result<(), SourceError> {
    match body.get("status").and_then(Value::as_i64) {
        Some(STATUS_OK) => Ok(()),
        Some(code) if STATUS_RETRY_LATER.contains(&code) => Err(SourceError::Transient {
            message: format!("Walk Score status {code}"),
        }),
        Some(code) => Err(SourceError::Response {
            message: format!("Walk Score status {code}"),
        }),
        None => Err(SourceError::Response {
            message: "Walk Score response has no status".to_string(),
        }),
    }
}

impl WalkScoreApi {
    /// # Errors
    ///
    /// Returns [`SourceError::Http`] if the HTTP client cannot be built.
    pub fn new(api_key: impl Into<String>) -> Result<Self, SourceError> {
        let client = reqwest::Client::builder().timeout(REQUEST_TIMEOUT).build()?;
        Ok(Self {
            client,
            api_key: api_key.into(),
            url: DEFAULT_URL.to_string(),
            cache: None,
        })
    }

    /// Reads the key from `WALKSCORE_API_KEY`.
    ///
    /// # Errors
    ///
    /// Returns [`SourceError::MissingApiKey`] if the variable is unset.
    pub fn from_env() -> Result<Self, SourceError> {
        let key = std::env::var(API_KEY_VAR)
            .map_err(|_| SourceError::MissingApiKey { var: API_KEY_VAR })?;
        Self::new(key)
    }

    #[must_use]
    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = url.into();
        self
    }

    #[must_use]
    pub fn with_cache(mut self, cache: ResponseCache) -> Self {
        self.cache = Some(cache);
        self
    }

    /// Fetches the raw response for one location. Only successful
    /// responses are cached.
    ///
    /// # Errors
    ///
    /// Returns [`SourceError`] if the request or the cache fails, or the
    /// body reports a failed lookup.
    pub async fn fetch_raw(&self, query: &WalkScoreQuery) -> Result<Value, SourceError> {
        let params = score_params(query);
        if let Some(cache) = &self.cache
            && let Some(cached) = cache.load(CACHE_NAMESPACE, &params).await?
        {
            if check_status(&cached).is_ok() {
                return Ok(cached);
            }
            log::debug!("Ignoring cached failed walk score for {}", query.address);
        }

        let body = retry::send_json(|| {
            self.client
                .get(&self.url)
                .query(&params)
                .query(&[("wsapikey", &self.api_key)])
        })
        .await?;

        self.accept(&params, body).await
    }

    async fn accept(&self, params: &[(&str, String)], body: Value) -> Result<Value, SourceError> {
        check_status(&body)?;
        if let Some(cache) = &self.cache {
            cache.store(CACHE_NAMESPACE, params, &body).await?;
        }
        Ok(body)
    }
}

#[async_trait]
impl WalkScoreSource for WalkScoreApi {
    async fn fetch_score(&self, query: &WalkScoreQuery) -> Result<RawWalkScore, WalkScoreError> {
        let body = self
            .fetch_raw(query)
            .await
            .map_err(|e| WalkScoreError::Lookup(Box::new(e)))?;
        serde_json::from_value(body).map_err(|e| WalkScoreError::Lookup(Box::new(e)))
    }
}
