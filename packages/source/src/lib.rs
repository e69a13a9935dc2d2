#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Remote data sources for comparables, property details and walkability.
//!
//! [`ListingSource`] is the seam the valuation session talks to;
//! [`RealEstateApi`] implements it against the US Real Estate API and
//! [`WalkScoreApi`] implements the walkability lookup. Both return raw JSON
//! which `unicorn_listing` decodes.

pub mod cache;
pub mod realestate;
pub mod retry;
pub mod sampling;
pub mod walkscore;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use unicorn_listing_models::ListingStatus;

pub use cache::ResponseCache;
pub use realestate::RealEstateApi;
pub use sampling::houses_of_interest;
pub use walkscore::WalkScoreApi;

/// Errors that can occur while talking to a remote source.
#[derive(Debug, thiserror::Error)]
pub enum SourceError {
    /// HTTP request failed.
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON parsing failed.
    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),

    /// I/O error (response cache).
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The retry budget ran out on a transient failure.
    #[error("Transient failure after retries: {message}")]
    Transient { message: String },

    /// The server answered, but not with something usable.
    #[error("Unexpected response: {message}")]
    Response { message: String },

    /// A required API key is not set.
    #[error("Environment variable {var} is not set")]
    MissingApiKey { var: &'static str },
}

/// Where to search for comparables.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SearchArea {
    /// A city, e.g. `AUSTIN` in `TX`.
    City {
        /// City name as the API spells it.
        city: String,
        /// Two-letter state code.
        state_code: String,
    },
    /// A five-digit ZIP code.
    Zip(String),
}

/// One comparable search.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchQuery {
    /// `ForSale` or `Sold`. `Unknown` is searched as for-sale.
    pub status: ListingStatus,
    /// Where to search.
    pub area: SearchArea,
    /// Maximum number of listings to return across all pages.
    pub limit: usize,
    /// Results to skip before the first one returned.
    pub offset: usize,
    /// API property type filter, `single_family` by default.
    pub property_type: String,
}

impl SearchQuery {
    /// Single-family search from the first result.
    #[must_use]
    pub fn new(status: ListingStatus, area: SearchArea, limit: usize) -> Self {
        Self {
            status,
            area,
            limit,
            offset: 0,
            property_type: realestate::DEFAULT_PROPERTY_TYPE.to_string(),
        }
    }

    #[must_use]
    pub const fn with_offset(mut self, offset: usize) -> Self {
        self.offset = offset;
        self
    }
}

/// Raw listings gathered for a search, possibly over several pages.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SearchResults {
    /// Raw listing payloads, in API order.
    pub listings: Vec<Value>,
    /// Geography payload; only the v2 endpoints return one.
    pub geo: Option<Value>,
    /// Listings the API reports as matching, across all pages.
    pub total_available: usize,
}

impl SearchResults {
    #[must_use]
    pub fn len(&self) -> usize {
        self.listings.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.listings.is_empty()
    }
}

/// Source of listing payloads.
#[async_trait]
pub trait ListingSource: Send + Sync {
    /// Fetches up to `query.limit` comparable listings, paging as needed.
    ///
    /// # Errors
    ///
    /// Returns [`SourceError`] if a page cannot be fetched or parsed.
    async fn fetch_comparables(&self, query: &SearchQuery) -> Result<SearchResults, SourceError>;

    /// Fetches the property-detail payload for the subject property.
    ///
    /// # Errors
    ///
    /// Returns [`SourceError`] if the request fails.
    async fn fetch_property_detail(&self, property_id: &str) -> Result<Value, SourceError>;

    /// Fetches the current and historical valuation payload.
    ///
    /// # Errors
    ///
    /// Returns [`SourceError`] if the request fails.
    async fn fetch_property_value(&self, property_id: &str) -> Result<Value, SourceError>;

    /// Fetches location suggestions for free-text input.
    ///
    /// # Errors
    ///
    /// Returns [`SourceError`] if the request fails.
    async fn suggest_locations(&self, input: &str) -> Result<Value, SourceError>;
}
