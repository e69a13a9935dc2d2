//! Market-level summaries returned alongside search results.
//!
//! None of these feed the feature matrix; they are kept for reporting.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// A recommended area (zip, city, county or neighborhood).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AreaInfo {
    /// API slug for the area.
    pub slug_id: Option<String>,
    /// Median listing price in the area.
    pub median_listing_price: Option<f64>,
    /// Two-letter state code.
    pub state_code: Option<String>,
    /// City name.
    pub city: Option<String>,
    /// Area type (`"postal_code"`, `"city"`, ...).
    pub geo_type: Option<String>,
}

/// Housing market statistics for the searched area.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MarketStatistics {
    /// Median days on market.
    pub median_days_on_market: Option<f64>,
    /// Median sold price.
    pub median_sold_price: Option<f64>,
    /// Median price per square foot.
    pub median_price_per_sqft: Option<f64>,
    /// Median listing price.
    pub median_listing_price: Option<f64>,
    /// Month-over-month metrics, passed through untouched.
    pub month_to_month: Option<serde_json::Value>,
    /// Per property type attribute maps.
    pub by_property_type: BTreeMap<String, BTreeMap<String, serde_json::Value>>,
}

/// Normalized secondary payload of a market search.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GeoSummary {
    /// Recommended zip codes.
    pub zips: Option<BTreeMap<String, AreaInfo>>,
    /// Recommended cities.
    pub cities: Option<BTreeMap<String, AreaInfo>>,
    /// Recommended counties.
    pub counties: Option<BTreeMap<String, AreaInfo>>,
    /// Recommended neighborhoods.
    pub neighborhoods: Option<BTreeMap<String, AreaInfo>>,
    /// Housing market statistics.
    pub market: Option<MarketStatistics>,
}

/// One dated estimate in a value history or forecast.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValuePoint {
    /// Estimate date as reported.
    pub date: String,
    /// Estimated value in dollars.
    pub estimate: f64,
}

/// Home-value estimates for a single property.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PropertyValuation {
    /// Current estimate, if any provider returned one.
    pub estimate: Option<f64>,
    /// Historical estimates grouped by provider name.
    pub historical: BTreeMap<String, Vec<ValuePoint>>,
    /// Forecasted estimates grouped by provider name.
    pub forecasted: BTreeMap<String, Vec<ValuePoint>>,
}

/// An address candidate returned by the location suggestion endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LocationSuggestion {
    /// Property id, present when the suggestion is an address.
    pub property_id: Option<String>,
    /// First full-address line.
    pub full_address: String,
    /// City name.
    pub city: Option<String>,
    /// Two-letter state code.
    pub state_code: Option<String>,
    /// ZIP code.
    pub postal_code: Option<String>,
    /// Relevance score.
    pub score: f64,
}
