//! Decoders for home-value estimates and address suggestions.

use std::collections::BTreeMap;

use serde::Deserialize;
use serde_json::Value;
use unicorn_listing_models::{LocationSuggestion, PropertyValuation, ValuePoint};

use crate::DataError;
use crate::parsing::{lenient_f64, value_as_id};

/// Provider name used when an estimate series does not name its source.
pub const UNKNOWN_PROVIDER: &str = "UNKNOWN";

/// Suggestions scoring at or below this are discarded.
pub const MIN_SUGGESTION_SCORE: f64 = 20.0;

#[derive(Debug, Default, Deserialize)]
struct RawValueEnvelope {
    #[serde(default)]
    data: Option<RawValueData>,
}

#[derive(Debug, Default, Deserialize)]
struct RawValueData {
    #[serde(default)]
    current_values: Option<Vec<RawEstimate>>,
    #[serde(default)]
    historical_values: Option<Vec<RawSeries>>,
    #[serde(default)]
    forecasted_values: Option<Vec<RawSeries>>,
}

#[derive(Debug, Deserialize)]
struct RawSeries {
    #[serde(default)]
    source: Option<RawProvider>,
    #[serde(default)]
    estimates: Option<Vec<RawEstimate>>,
}

#[derive(Debug, Deserialize)]
struct RawProvider {
    #[serde(default)]
    name: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RawEstimate {
    #[serde(default)]
    date: Option<String>,
    #[serde(default, deserialize_with = "lenient_f64")]
    estimate: Option<f64>,
}

/// Decodes the property-value payload.
///
/// # Errors
///
/// Returns [`DataError::Malformed`] when the payload's sections have the
/// wrong JSON types.
pub fn decode_property_value(payload: &Value) -> Result<PropertyValuation, DataError> {
    let data = RawValueEnvelope::deserialize(payload)?
        .data
        .unwrap_or_default();

    let estimate = data
        .current_values
        .as_deref()
        .and_then(|values| values.first())
        .and_then(|e| e.estimate);

    Ok(PropertyValuation {
        estimate,
        historical: group_by_provider(data.historical_values.unwrap_or_default()),
        forecasted: group_by_provider(data.forecasted_values.unwrap_or_default()),
    })
}

fn group_by_provider(series: Vec<RawSeries>) -> BTreeMap<String, Vec<ValuePoint>> {
    let mut grouped = BTreeMap::new();
    for entry in series {
        let provider = entry
            .source
            .and_then(|s| s.name)
            .filter(|n| !n.is_empty())
            .unwrap_or_else(|| UNKNOWN_PROVIDER.to_string());
        let points = entry
            .estimates
            .unwrap_or_default()
            .into_iter()
            .map(|e| ValuePoint {
                date: e.date.unwrap_or_default(),
                estimate: e.estimate.unwrap_or(0.0),
            });
        grouped
            .entry(provider)
            .or_insert_with(Vec::new)
            .extend(points);
    }
    grouped
}

/// Decodes the location-suggestion payload, keeping only plausible
/// addresses: a score above [`MIN_SUGGESTION_SCORE`] and a full address.
#[must_use]
pub fn decode_location_suggestions(payload: &Value) -> Vec<LocationSuggestion> {
    let Some(candidates) = payload.get("data").and_then(Value::as_array) else {
        return Vec::new();
    };

    candidates
        .iter()
        .filter_map(|candidate| {
            let score = candidate
                .get("_score")
                .and_then(Value::as_f64)
                .unwrap_or(0.0);
            if score <= MIN_SUGGESTION_SCORE {
                return None;
            }
            let full_address = match candidate.get("full_address")? {
                Value::Array(lines) => lines.first()?.as_str()?.to_string(),
                Value::String(line) => line.clone(),
                _ => return None,
            };
            let text = |key: &str| {
                candidate
                    .get(key)
                    .and_then(Value::as_str)
                    .map(ToString::to_string)
            };
            Some(LocationSuggestion {
                property_id: candidate.get("mpr_id").and_then(value_as_id),
                full_address,
                city: text("city"),
                state_code: text("state_code"),
                postal_code: text("postal_code"),
                score,
            })
        })
        .collect()
}
