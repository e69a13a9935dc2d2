#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Decoding of raw real-estate API payloads.
//!
//! The API returns two differently shaped documents for what is logically
//! the same thing: bulk search results (one object per comparable) and the
//! single-property detail lookup used for the user's home. Each shape gets
//! its own decoder that fails fast on missing required keys and maps
//! everything else into a [`ListingRecord`]:
//!
//! * [`market::decode_listing`] for search results
//! * [`subject::decode_subject`] for the user's home
//! * [`geo::decode_geo_summary`] for the market summary attached to searches
//! * [`valuation`] for home-value estimates and address suggestions

pub mod geo;
pub mod market;
pub mod parsing;
pub mod subject;
pub mod valuation;

pub use market::{decode_listing, listing_id};
pub use subject::decode_subject;
pub use unicorn_listing_models::{
    BathCounts, GeoSummary, LatLong, ListingAddress, ListingRecord, ListingStatus,
    SubjectProperty,
};

/// Errors raised while decoding a payload.
///
/// These are never retried: the payload is structurally unusable.
#[derive(Debug, thiserror::Error)]
pub enum DataError {
    /// A structurally mandatory key is absent.
    #[error("Missing required field `{field}` in {context}")]
    MissingField {
        /// The missing key.
        field: &'static str,
        /// Which payload (and record) the key was expected in.
        context: String,
    },

    /// The property-detail payload carried no property.
    #[error("Subject property payload is empty")]
    EmptySubject,

    /// The payload could not be mapped onto the expected shape.
    #[error("Malformed payload: {0}")]
    Malformed(#[from] serde_json::Error),
}

impl DataError {
    pub(crate) fn missing(field: &'static str, context: impl Into<String>) -> Self {
        Self::MissingField {
            field,
            context: context.into(),
        }
    }
}
