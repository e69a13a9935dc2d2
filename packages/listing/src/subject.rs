//! Decoder for the single-property detail payload (the user's home).
//!
//! The detail endpoint describes the same logical fields as a search
//! result but in a different layout: bath counts live in `prop_common`
//! next to an aggregate `bath`, the garage is buried in free-text feature
//! lines, and the price comes from the price history.

use std::collections::BTreeSet;

use serde::Deserialize;
use serde_json::Value;
use unicorn_listing_models::{
    BathCounts, ListingAddress, ListingRecord, ListingStatus, SubjectProperty,
};

use crate::DataError;
use crate::market::{MISSING_POSTAL_CODE, RawCoordinate};
use crate::parsing::{
    count_or, lenient_f64, lenient_string, lenient_strings, upper_or_empty, value_as_id,
};

/// Property id used when the detail payload carries none.
pub const MISSING_SUBJECT_ID: &str = "USER_PID_MISSING";

/// Year assumed when the detail payload has no construction year.
const DEFAULT_YEAR_BUILT: i64 = 1950;

#[derive(Debug, Deserialize)]
struct RawDetailEnvelope {
    #[serde(default)]
    data: Option<RawDetailData>,
}

#[derive(Debug, Deserialize)]
struct RawDetailData {
    #[serde(default)]
    property_detail: Option<RawPropertyDetail>,
}

#[derive(Debug, Deserialize)]
struct RawPropertyDetail {
    #[serde(default)]
    id: Option<Value>,
    #[serde(default)]
    forwarded_mpr_ids: Option<Value>,
    #[serde(default)]
    prop_common: Option<RawPropCommon>,
    #[serde(default)]
    features: Option<Vec<RawFeatureGroup>>,
    #[serde(default)]
    public_records: Option<Vec<RawPublicRecord>>,
    #[serde(default)]
    address: Option<RawDetailAddress>,
    #[serde(default)]
    price_history: Option<Vec<RawPriceEvent>>,
    #[serde(default)]
    neighborhoods: Option<Vec<RawNeighborhood>>,
    #[serde(default, deserialize_with = "lenient_strings")]
    search_tags: Option<Vec<String>>,
}

#[derive(Debug, Default, Deserialize)]
struct RawPropCommon {
    #[serde(default, deserialize_with = "lenient_f64")]
    bath: Option<f64>,
    #[serde(default, deserialize_with = "lenient_f64")]
    bath_full: Option<f64>,
    #[serde(default, deserialize_with = "lenient_f64")]
    bath_3qtr: Option<f64>,
    #[serde(default, deserialize_with = "lenient_f64")]
    bath_half: Option<f64>,
    #[serde(default, deserialize_with = "lenient_f64")]
    bath_1qtr: Option<f64>,
    #[serde(default, deserialize_with = "lenient_f64")]
    year_built: Option<f64>,
    #[serde(default, deserialize_with = "lenient_f64")]
    lot_sqft: Option<f64>,
    #[serde(default, deserialize_with = "lenient_f64")]
    sqft: Option<f64>,
    #[serde(default, rename = "type", deserialize_with = "lenient_string")]
    property_type: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RawFeatureGroup {
    #[serde(default, deserialize_with = "lenient_string")]
    category: Option<String>,
    #[serde(default, deserialize_with = "lenient_strings")]
    text: Option<Vec<String>>,
}

#[derive(Debug, Default, Deserialize)]
struct RawPublicRecord {
    #[serde(default, deserialize_with = "lenient_f64")]
    stories: Option<f64>,
    #[serde(default, deserialize_with = "lenient_f64")]
    beds: Option<f64>,
}

#[derive(Debug, Default, Deserialize)]
struct RawDetailAddress {
    #[serde(default, deserialize_with = "lenient_string")]
    line: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    postal_code: Option<String>,
    #[serde(default)]
    location: Option<RawCoordinate>,
}

#[derive(Debug, Deserialize)]
struct RawPriceEvent {
    #[serde(default, deserialize_with = "lenient_string")]
    date: Option<String>,
    #[serde(default, deserialize_with = "lenient_f64")]
    price: Option<f64>,
}

#[derive(Debug, Default, Deserialize)]
struct RawNeighborhood {
    #[serde(default, deserialize_with = "lenient_string")]
    city: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    state_code: Option<String>,
}

/// Decodes the property-detail payload into a [`SubjectProperty`].
///
/// The subject is always modelled as sold, listed and updated today, at
/// distance zero from itself.
///
/// # Errors
///
/// Returns [`DataError::EmptySubject`] when `data.property_detail` is
/// missing, and [`DataError::MissingField`] when the first neighborhood has
/// no city or state code (both are needed to route to a per-city model).
pub fn decode_subject(payload: &Value) -> Result<SubjectProperty, DataError> {
    let envelope = RawDetailEnvelope::deserialize(payload)?;
    let detail = envelope
        .data
        .and_then(|d| d.property_detail)
        .ok_or(DataError::EmptySubject)?;

    let neighborhood = detail
        .neighborhoods
        .and_then(|n| n.into_iter().next())
        .unwrap_or_default();
    let city = neighborhood
        .city
        .filter(|c| !c.trim().is_empty())
        .ok_or_else(|| DataError::missing("city", "subject neighborhoods"))?;
    let state = neighborhood
        .state_code
        .filter(|s| !s.trim().is_empty())
        .ok_or_else(|| DataError::missing("state_code", "subject neighborhoods"))?;
    let city = upper_or_empty(Some(&city));
    let state = upper_or_empty(Some(&state));

    let property_id = detail
        .id
        .as_ref()
        .and_then(value_as_id)
        .unwrap_or_else(|| MISSING_SUBJECT_ID.to_string());

    let valuation_id = detail.forwarded_mpr_ids.as_ref().and_then(|ids| match ids {
        Value::Array(list) => list.first().and_then(value_as_id),
        other => value_as_id(other),
    });

    let common = detail.prop_common.unwrap_or_default();
    let public_record = detail
        .public_records
        .and_then(|r| r.into_iter().next())
        .unwrap_or_default();
    let address = detail.address.unwrap_or_default();

    let aggregate_baths = common.bath.filter(|b| *b != 0.0).unwrap_or(1.0);
    let baths = BathCounts {
        full: common.bath_full.unwrap_or(0.0).trunc(),
        three_quarter: common.bath_3qtr.unwrap_or(0.0).trunc(),
        half: common.bath_half.unwrap_or(0.0).trunc(),
        one_quarter: common.bath_1qtr.unwrap_or(0.0).trunc(),
    }
    .reconciled_with(aggregate_baths);

    let lat_long = address
        .location
        .as_ref()
        .map(RawCoordinate::to_lat_long)
        .unwrap_or_default();
    if lat_long.both().is_none() {
        log::warn!("Subject property {property_id} has no coordinates");
    }

    let record = ListingRecord {
        property_id,
        status: ListingStatus::Sold,
        price: latest_price(detail.price_history.as_deref().unwrap_or_default()),
        list_date_delta: Some(0),
        last_update_delta: Some(0),
        lat_long,
        baths,
        beds: count_or(public_record.beds, 1),
        year_built: count_or(common.year_built, DEFAULT_YEAR_BUILT),
        lot_sqft: count_or(common.lot_sqft, 0),
        sqft: count_or(common.sqft, 0),
        garage: garage_spaces(detail.features.as_deref().unwrap_or_default()),
        stories: count_or(public_record.stories, 1),
        new_construction: false,
        tags: detail
            .search_tags
            .unwrap_or_default()
            .into_iter()
            .collect::<BTreeSet<_>>(),
        property_type: common
            .property_type
            .filter(|t| !t.is_empty())
            .unwrap_or_else(|| "NONE".to_string()),
        address: ListingAddress {
            line: address.line.unwrap_or_default(),
            city: city.clone(),
            state: state.clone(),
            postal_code: address
                .postal_code
                .filter(|z| !z.is_empty())
                .unwrap_or_else(|| MISSING_POSTAL_CODE.to_string()),
            county: None,
            fips_code: None,
            street_view_url: None,
        },
    };

    log::debug!(
        "Decoded subject {} ({city}, {state}): price={}, baths={:?}",
        record.property_id,
        record.price,
        record.baths,
    );

    Ok(SubjectProperty {
        record,
        city,
        state,
        aggregate_baths,
        valuation_id,
    })
}

/// Price of the most recent non-zero price-history entry.
///
/// Entries are ordered by their raw date string, which sorts correctly for
/// the ISO dates the API returns. No usable entry gives `0`.
fn latest_price(history: &[RawPriceEvent]) -> f64 {
    history
        .iter()
        .filter_map(|event| {
            let price = event.price.filter(|p| *p != 0.0)?;
            Some((event.date.as_deref().unwrap_or("0"), price))
        })
        .max_by(|a, b| a.0.cmp(b.0))
        .map_or(0.0, |(_, price)| price.max(0.0))
}

/// Garage capacity parsed out of the free-text feature list.
///
/// Looks at the first feature group whose category starts with `Garage`
/// for a line like `"Garage Spaces: 2"`.
fn garage_spaces(features: &[RawFeatureGroup]) -> i64 {
    let Some(group) = features.iter().find(|g| {
        g.category
            .as_deref()
            .is_some_and(|c| c.starts_with("Garage"))
    }) else {
        return 0;
    };

    let mut spaces = 0;
    for line in group.text.as_deref().unwrap_or_default() {
        let mut split = line.split(':');
        let label = split.next().unwrap_or_default();
        if !label.to_lowercase().contains("garage space") {
            continue;
        }
        let Some(count) = split.next() else {
            continue;
        };
        match count.trim().parse::<i64>() {
            Ok(n) => spaces = n,
            Err(e) => log::warn!("Unparseable garage count in '{line}': {e}"),
        }
    }
    spaces
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn detail_payload() -> Value {
        json!({
            "data": {
                "property_detail": {
                    "id": "U-1",
                    "forwarded_mpr_ids": ["M555"],
                    "prop_common": {
                        "bath": 2.5,
                        "year_built": 2004,
                        "lot_sqft": 7000,
                        "sqft": 2100
                    },
                    "features": [
                        { "category": "Bedrooms", "text": ["Bedrooms: 3"] },
                        {
                            "category": "Garage and Parking",
                            "text": ["Garage Type: Attached", "Garage Spaces: 2"]
                        }
                    ],
                    "public_records": [{ "beds": 3, "stories": 2 }],
                    "address": {
                        "line": "5 Elm Ct",
                        "postal_code": "78702",
                        "location": { "lat": 30.26, "lon": -97.72 }
                    },
                    "price_history": [
                        { "date": "2015-06-01", "price": 250_000 },
                        { "date": "2021-04-15", "price": 410_000 },
                        { "date": "2023-01-01", "price": 0 }
                    ],
                    "neighborhoods": [{ "city": "Austin", "state_code": "tx" }],
                    "search_tags": ["central_air"]
                }
            }
        })
    }

    #[test]
    fn decodes_subject_property() {
        let subject = decode_subject(&detail_payload()).unwrap();
        assert_eq!(subject.model_key(), "AUSTIN_TX");
        assert_eq!(subject.valuation_id.as_deref(), Some("M555"));

        let record = &subject.record;
        assert_eq!(record.property_id, "U-1");
        assert_eq!(record.status, ListingStatus::Sold);
        assert!((record.price - 410_000.0).abs() < f64::EPSILON);
        assert_eq!(record.garage, 2);
        assert_eq!(record.beds, 3);
        assert_eq!(record.stories, 2);
        assert_eq!(record.year_built, 2004);
        assert_eq!(record.list_date_delta, Some(0));
        assert_eq!(record.lat_long.both(), Some((30.26, -97.72)));
    }

    #[test]
    fn reconciles_aggregate_baths() {
        let subject = decode_subject(&detail_payload()).unwrap();
        let baths = subject.record.baths;
        assert!((baths.full - 2.0).abs() < f64::EPSILON);
        assert!((baths.half - 1.0).abs() < f64::EPSILON);
        assert!(baths.three_quarter.abs() < f64::EPSILON);
        assert!(baths.one_quarter.abs() < f64::EPSILON);
    }

    #[test]
    fn empty_detail_is_rejected() {
        let err = decode_subject(&json!({ "data": {} })).unwrap_err();
        assert!(matches!(err, DataError::EmptySubject));
        let err = decode_subject(&json!({})).unwrap_err();
        assert!(matches!(err, DataError::EmptySubject));
    }

    #[test]
    fn missing_city_is_rejected() {
        let mut payload = detail_payload();
        payload["data"]["property_detail"]["neighborhoods"] = json!([{ "state_code": "TX" }]);
        let err = decode_subject(&payload).unwrap_err();
        assert!(matches!(err, DataError::MissingField { field: "city", .. }));
    }

    #[test]
    fn missing_state_is_rejected() {
        let mut payload = detail_payload();
        payload["data"]["property_detail"]["neighborhoods"] = json!([{ "city": "Austin" }]);
        let err = decode_subject(&payload).unwrap_err();
        assert!(matches!(err, DataError::MissingField { field: "state_code", .. }));
    }

    #[test]
    fn no_garage_group_means_zero() {
        let mut payload = detail_payload();
        payload["data"]["property_detail"]["features"] = json!([]);
        let subject = decode_subject(&payload).unwrap();
        assert_eq!(subject.record.garage, 0);
    }

    #[test]
    fn price_history_without_nonzero_prices_is_zero() {
        let mut payload = detail_payload();
        payload["data"]["property_detail"]["price_history"] =
            json!([{ "date": "2020-01-01", "price": 0 }, { "date": "2021-01-01" }]);
        let subject = decode_subject(&payload).unwrap();
        assert!(subject.record.price.abs() < f64::EPSILON);
    }

    #[test]
    fn missing_bath_aggregate_defaults_to_one_full_bath() {
        let mut payload = detail_payload();
        payload["data"]["property_detail"]["prop_common"] = json!({});
        let subject = decode_subject(&payload).unwrap();
        assert!((subject.record.baths.full - 1.0).abs() < f64::EPSILON);
        assert_eq!(subject.record.year_built, 1950);
    }
}
