//! Decoder for bulk search results (comparable listings).

use std::collections::BTreeSet;

use chrono::NaiveDate;
use serde::Deserialize;
use serde_json::Value;
use unicorn_listing_models::{
    BathCounts, LatLong, ListingAddress, ListingRecord, ListingStatus,
};

use crate::DataError;
use crate::parsing::{
    count_or, days_since, lenient_bool, lenient_f64, lenient_string, lenient_strings,
    upper_or_empty, value_as_id,
};

/// Placeholder used when the API omits the street line.
pub const MISSING_ADDRESS: &str = "No Address Provided by API";

/// Placeholder used when the API omits the ZIP code.
pub const MISSING_POSTAL_CODE: &str = "00000";

/// Raw search result shape. Only the keys we read are modelled.
#[derive(Debug, Deserialize)]
struct RawListing {
    #[serde(default)]
    property_id: Option<Value>,
    #[serde(default, deserialize_with = "lenient_string")]
    status: Option<String>,
    #[serde(default, deserialize_with = "lenient_f64")]
    list_price: Option<f64>,
    #[serde(default, deserialize_with = "lenient_f64")]
    sold_price: Option<f64>,
    #[serde(default, deserialize_with = "lenient_string")]
    list_date: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    sold_date: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    last_update_date: Option<String>,
    #[serde(default, deserialize_with = "lenient_strings")]
    tags: Option<Vec<String>>,
    #[serde(default)]
    flags: Option<RawFlags>,
    #[serde(default)]
    location: Option<RawLocation>,
    #[serde(default)]
    description: Option<RawDescription>,
}

#[derive(Debug, Default, Deserialize)]
struct RawFlags {
    #[serde(default, deserialize_with = "lenient_bool")]
    is_new_construction: Option<bool>,
}

#[derive(Debug, Default, Deserialize)]
struct RawLocation {
    #[serde(default)]
    address: Option<RawAddress>,
    #[serde(default)]
    county: Option<RawCounty>,
    #[serde(default)]
    coordinate: Option<RawCoordinate>,
    #[serde(default, deserialize_with = "lenient_string")]
    street_view_url: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct RawAddress {
    #[serde(default, deserialize_with = "lenient_string")]
    line: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    city: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    state_code: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    postal_code: Option<String>,
    #[serde(default)]
    coordinate: Option<RawCoordinate>,
}

#[derive(Debug, Default, Deserialize)]
struct RawCounty {
    #[serde(default, deserialize_with = "lenient_string")]
    name: Option<String>,
    #[serde(default)]
    fips_code: Option<Value>,
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct RawCoordinate {
    #[serde(default, deserialize_with = "lenient_f64")]
    pub(crate) lat: Option<f64>,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub(crate) lon: Option<f64>,
}

impl RawCoordinate {
    pub(crate) const fn to_lat_long(&self) -> LatLong {
        LatLong {
            latitude: self.lat,
            longitude: self.lon,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
struct RawDescription {
    #[serde(default, deserialize_with = "lenient_f64")]
    baths: Option<f64>,
    #[serde(default, deserialize_with = "lenient_f64")]
    baths_full: Option<f64>,
    #[serde(default, deserialize_with = "lenient_f64")]
    baths_3qtr: Option<f64>,
    #[serde(default, deserialize_with = "lenient_f64")]
    baths_half: Option<f64>,
    #[serde(default, deserialize_with = "lenient_f64")]
    baths_1qtr: Option<f64>,
    #[serde(default, deserialize_with = "lenient_f64")]
    beds: Option<f64>,
    #[serde(default, deserialize_with = "lenient_f64")]
    year_built: Option<f64>,
    #[serde(default, deserialize_with = "lenient_f64")]
    lot_sqft: Option<f64>,
    #[serde(default, deserialize_with = "lenient_f64")]
    sqft: Option<f64>,
    #[serde(default, deserialize_with = "lenient_f64")]
    garage: Option<f64>,
    #[serde(default, deserialize_with = "lenient_f64")]
    stories: Option<f64>,
    #[serde(default, deserialize_with = "lenient_f64")]
    list_price: Option<f64>,
    #[serde(default, deserialize_with = "lenient_f64")]
    sold_price: Option<f64>,
    #[serde(default, rename = "type", deserialize_with = "lenient_string")]
    property_type: Option<String>,
}

impl RawDescription {
    /// Bath categories, back-filled from the aggregate `baths` field when
    /// the payload carries no breakdown at all.
    fn bath_counts(&self) -> BathCounts {
        let counts = BathCounts {
            full: self.baths_full.unwrap_or(0.0),
            three_quarter: self.baths_3qtr.unwrap_or(0.0),
            half: self.baths_half.unwrap_or(0.0),
            one_quarter: self.baths_1qtr.unwrap_or(0.0),
        };

        let has_breakdown = self.baths_full.is_some()
            || self.baths_3qtr.is_some()
            || self.baths_half.is_some()
            || self.baths_1qtr.is_some();

        match self.baths {
            Some(aggregate) if !has_breakdown => counts.reconciled_with(aggregate),
            _ => counts,
        }
    }
}

/// Reads the `property_id` of a raw search result without decoding the
/// rest of it.
///
/// # Errors
///
/// Returns [`DataError::MissingField`] when the id is absent or empty.
pub fn listing_id(payload: &Value) -> Result<String, DataError> {
    payload
        .get("property_id")
        .and_then(value_as_id)
        .ok_or_else(|| DataError::missing("property_id", "search result"))
}

/// Decodes one search result into a [`ListingRecord`].
///
/// `today` anchors the day deltas so decoding is reproducible.
///
/// # Errors
///
/// Returns [`DataError`] if `property_id`, `location` or `description` is
/// absent, or the payload does not have the expected shape.
pub fn decode_listing(payload: &Value, today: NaiveDate) -> Result<ListingRecord, DataError> {
    let raw = RawListing::deserialize(payload)?;

    let property_id = raw
        .property_id
        .as_ref()
        .and_then(value_as_id)
        .ok_or_else(|| DataError::missing("property_id", "search result"))?;
    let location = raw
        .location
        .ok_or_else(|| DataError::missing("location", format!("listing {property_id}")))?;
    let description = raw
        .description
        .ok_or_else(|| DataError::missing("description", format!("listing {property_id}")))?;

    let status = ListingStatus::from_api(raw.status.as_deref());

    // The same price shows up both at the top level and under
    // `description`, usually with one of the two null.
    let price = match status {
        ListingStatus::ForSale => max_price(raw.list_price, description.list_price),
        ListingStatus::Sold | ListingStatus::Unknown => {
            max_price(raw.sold_price, description.sold_price)
        }
    };

    let event_date = match status {
        ListingStatus::ForSale => raw.list_date.as_deref(),
        ListingStatus::Sold | ListingStatus::Unknown => raw.sold_date.as_deref(),
    };

    let address = location.address.unwrap_or_default();
    let lat_long = address
        .coordinate
        .as_ref()
        .or(location.coordinate.as_ref())
        .map_or_else(LatLong::unknown, RawCoordinate::to_lat_long);

    let county = location.county.unwrap_or_default();

    let record = ListingRecord {
        property_id,
        status,
        price,
        list_date_delta: days_since(event_date, today),
        last_update_delta: days_since(raw.last_update_date.as_deref(), today),
        lat_long,
        baths: description.bath_counts(),
        beds: count_or(description.beds, 0),
        year_built: count_or(description.year_built, 0),
        lot_sqft: count_or(description.lot_sqft, 0),
        sqft: count_or(description.sqft, 0),
        garage: count_or(description.garage, 0),
        stories: count_or(description.stories, 1),
        new_construction: raw
            .flags
            .and_then(|f| f.is_new_construction)
            .unwrap_or(false),
        tags: raw.tags.unwrap_or_default().into_iter().collect::<BTreeSet<_>>(),
        property_type: description
            .property_type
            .filter(|t| !t.is_empty())
            .unwrap_or_else(|| "NONE".to_string()),
        address: ListingAddress {
            line: address
                .line
                .filter(|l| !l.is_empty())
                .unwrap_or_else(|| MISSING_ADDRESS.to_string()),
            city: upper_or_empty(address.city.as_deref()),
            state: upper_or_empty(address.state_code.as_deref()),
            postal_code: address
                .postal_code
                .filter(|z| !z.is_empty())
                .unwrap_or_else(|| MISSING_POSTAL_CODE.to_string()),
            county: county.name,
            fips_code: county.fips_code.as_ref().and_then(value_as_id),
            street_view_url: location.street_view_url,
        },
    };

    log::trace!("Decoded listing {}", record.property_id);

    Ok(record)
}

fn max_price(top_level: Option<f64>, nested: Option<f64>) -> f64 {
    top_level.unwrap_or(0.0).max(nested.unwrap_or(0.0)).max(0.0)
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 3, 1).unwrap()
    }

    fn for_sale_payload() -> Value {
        json!({
            "property_id": "1001",
            "status": "for_sale",
            "list_price": 310_000,
            "sold_price": 999_999,
            "list_date": "2024-02-20T08:00:00Z",
            "last_update_date": "2024-02-25T08:00:00Z",
            "tags": ["garage_1_or_more", "central_air", "central_air"],
            "flags": { "is_new_construction": true },
            "location": {
                "address": {
                    "line": "12 Oak St",
                    "city": "Austin",
                    "state_code": "tx",
                    "postal_code": "78701",
                    "coordinate": { "lat": 30.27, "lon": -97.74 }
                },
                "county": { "name": "Travis", "fips_code": 48453 },
                "street_view_url": "https://example.invalid/sv"
            },
            "description": {
                "baths_full": 2,
                "baths_half": 1,
                "beds": 3,
                "year_built": 1998,
                "lot_sqft": 6000,
                "sqft": 1800,
                "garage": 2,
                "list_price": 305_000,
                "sold_price": 1_000_000,
                "type": "single_family"
            }
        })
    }

    #[test]
    fn decodes_for_sale_listing() {
        let record = decode_listing(&for_sale_payload(), today()).unwrap();
        assert_eq!(record.property_id, "1001");
        assert_eq!(record.status, ListingStatus::ForSale);
        assert!((record.price - 310_000.0).abs() < f64::EPSILON);
        assert_eq!(record.list_date_delta, Some(10));
        assert_eq!(record.last_update_delta, Some(5));
        assert_eq!(record.lat_long.both(), Some((30.27, -97.74)));
        assert_eq!(record.beds, 3);
        assert_eq!(record.stories, 1);
        assert_eq!(record.tags.len(), 2);
        assert!(record.new_construction);
        assert_eq!(record.address.city, "AUSTIN");
        assert_eq!(record.address.state, "TX");
        assert_eq!(record.address.fips_code.as_deref(), Some("48453"));
        assert_eq!(record.property_type, "single_family");
    }

    #[test]
    fn for_sale_price_never_reads_sold_fields() {
        let mut payload = for_sale_payload();
        payload["list_price"] = Value::Null;
        payload["description"]["list_price"] = Value::Null;
        let record = decode_listing(&payload, today()).unwrap();
        assert!(record.price.abs() < f64::EPSILON);
    }

    #[test]
    fn sold_price_never_reads_list_fields() {
        let payload = json!({
            "property_id": "2002",
            "status": "sold",
            "list_price": 900_000,
            "sold_date": "2024-01-31T00:00:00Z",
            "location": {},
            "description": { "list_price": 950_000, "sold_price": 320_000 }
        });
        let record = decode_listing(&payload, today()).unwrap();
        assert!((record.price - 320_000.0).abs() < f64::EPSILON);
        assert_eq!(record.list_date_delta, Some(30));
    }

    #[test]
    fn missing_location_is_a_data_error() {
        let mut payload = for_sale_payload();
        payload.as_object_mut().unwrap().remove("location");
        let err = decode_listing(&payload, today()).unwrap_err();
        assert!(matches!(err, DataError::MissingField { field: "location", .. }));
    }

    #[test]
    fn missing_description_is_a_data_error() {
        let mut payload = for_sale_payload();
        payload.as_object_mut().unwrap().remove("description");
        let err = decode_listing(&payload, today()).unwrap_err();
        assert!(matches!(err, DataError::MissingField { field: "description", .. }));
    }

    #[test]
    fn missing_coordinate_is_unknown_not_zero() {
        let mut payload = for_sale_payload();
        payload["location"]["address"]["coordinate"] = json!({});
        let record = decode_listing(&payload, today()).unwrap();
        assert_eq!(record.lat_long, LatLong::unknown());

        payload["location"]["address"]
            .as_object_mut()
            .unwrap()
            .remove("coordinate");
        let record = decode_listing(&payload, today()).unwrap();
        assert_eq!(record.lat_long, LatLong::unknown());
    }

    #[test]
    fn malformed_dates_become_none() {
        let mut payload = for_sale_payload();
        payload["list_date"] = json!("2024-02-20");
        payload["last_update_date"] = json!("not a date");
        let record = decode_listing(&payload, today()).unwrap();
        assert!(record.list_date_delta.is_none());
        assert!(record.last_update_delta.is_none());
    }

    #[test]
    fn aggregate_baths_backfill_when_no_breakdown() {
        let payload = json!({
            "property_id": "3003",
            "status": "sold",
            "location": {},
            "description": { "baths": 1.5, "beds": 2 }
        });
        let record = decode_listing(&payload, today()).unwrap();
        assert!((record.baths.full - 1.0).abs() < f64::EPSILON);
        assert!((record.baths.half - 1.0).abs() < f64::EPSILON);
    }

    #[test]
    fn defaults_structure_fields() {
        let payload = json!({
            "property_id": 77,
            "location": {},
            "description": {}
        });
        let record = decode_listing(&payload, today()).unwrap();
        assert_eq!(record.property_id, "77");
        assert_eq!(record.status, ListingStatus::Unknown);
        assert_eq!(record.stories, 1);
        assert_eq!(record.beds, 0);
        assert_eq!(record.property_type, "NONE");
        assert_eq!(record.address.line, MISSING_ADDRESS);
        assert_eq!(record.address.postal_code, MISSING_POSTAL_CODE);
    }

    #[test]
    fn wrongly_typed_optional_fields_are_dropped() {
        let mut payload = for_sale_payload();
        payload["tags"] = json!(["central_air", null]);
        payload["list_date"] = json!(20_240_220);
        payload["flags"]["is_new_construction"] = json!("Y");
        payload["location"]["address"]["line"] = json!(12);
        let record = decode_listing(&payload, today()).unwrap();

        assert_eq!(record.tags.len(), 1);
        assert!(record.tags.contains("central_air"));
        assert!(record.list_date_delta.is_none());
        assert_eq!(record.last_update_delta, Some(5));
        assert!(!record.new_construction);
        assert_eq!(record.address.line, MISSING_ADDRESS);
        assert!((record.price - 310_000.0).abs() < f64::EPSILON);
    }

    #[test]
    fn listing_id_reads_without_full_decode() {
        assert_eq!(listing_id(&json!({ "property_id": "9" })).unwrap(), "9");
        assert!(listing_id(&json!({})).is_err());
    }
}
