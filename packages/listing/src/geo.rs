//! Decoder for the market summary that accompanies v2 searches.

use std::collections::BTreeMap;

use serde_json::Value;
use unicorn_listing_models::{AreaInfo, GeoSummary, MarketStatistics};

use crate::parsing::value_as_f64;

/// Key used for an area entry whose identifying field is absent.
const UNKEYED_AREA: &str = "_unkeyed";

/// Decodes the geo payload of a market search.
///
/// Every section is optional; an absent section stays `None` instead of
/// becoming an empty map so callers can tell "not returned" from "empty".
#[must_use]
pub fn decode_geo_summary(payload: &Value) -> GeoSummary {
    GeoSummary {
        zips: decode_areas(payload.pointer("/recommended_zips/geos")),
        cities: decode_areas(payload.pointer("/recommended_cities/geos")),
        counties: decode_areas(payload.pointer("/recommended_counties/geos")),
        neighborhoods: decode_areas(payload.pointer("/recommended_neighborhoods/geos")),
        market: payload
            .pointer("/geo_statistics/housing_market")
            .filter(|v| v.is_object())
            .map(decode_market_statistics),
    }
}

/// Areas are keyed by the value of the field their `geo_type` names (so a
/// `postal_code` entry is keyed by its zip), or by `slug_id` without one.
fn decode_areas(geos: Option<&Value>) -> Option<BTreeMap<String, AreaInfo>> {
    let geos = geos?.as_array()?;

    Some(
        geos.iter()
            .map(|entry| {
                let geo_type = string_field(entry, "geo_type");
                let key_field = geo_type.as_deref().unwrap_or("slug_id");
                let key = entry
                    .get(key_field)
                    .and_then(|v| match v {
                        Value::String(s) => Some(s.clone()),
                        Value::Number(n) => Some(n.to_string()),
                        _ => None,
                    })
                    .unwrap_or_else(|| UNKEYED_AREA.to_string());

                let info = AreaInfo {
                    slug_id: string_field(entry, "slug_id"),
                    median_listing_price: entry
                        .pointer("/geo_statistics/housing_market/median_listing_price")
                        .and_then(value_as_f64),
                    state_code: string_field(entry, "state_code"),
                    city: string_field(entry, "city"),
                    geo_type,
                };
                (key, info)
            })
            .collect(),
    )
}

fn decode_market_statistics(stats: &Value) -> MarketStatistics {
    let number = |key: &str| stats.get(key).and_then(value_as_f64);

    let by_property_type = stats
        .get("by_prop_type")
        .and_then(Value::as_array)
        .map(|types| {
            types
                .iter()
                .filter_map(|entry| {
                    let name = string_field(entry, "type")?;
                    let attributes = entry
                        .get("attributes")
                        .and_then(Value::as_object)
                        .map(|attrs| {
                            attrs
                                .iter()
                                .map(|(k, v)| (k.clone(), v.clone()))
                                .collect()
                        })
                        .unwrap_or_default();
                    Some((name, attributes))
                })
                .collect()
        })
        .unwrap_or_default();

    MarketStatistics {
        median_days_on_market: number("median_days_on_market"),
        median_sold_price: number("median_sold_price"),
        median_price_per_sqft: number("median_price_per_sqft"),
        median_listing_price: number("median_listing_price"),
        month_to_month: stats.get("month_to_month").filter(|v| !v.is_null()).cloned(),
        by_property_type,
    }
}

fn string_field(value: &Value, key: &str) -> Option<String> {
    value.get(key).and_then(Value::as_str).map(ToString::to_string)
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn keys_areas_by_their_geo_type_field() {
        let payload = json!({
            "recommended_zips": {
                "geos": [
                    {
                        "slug_id": "78702",
                        "postal_code": "78702",
                        "geo_type": "postal_code",
                        "state_code": "TX",
                        "city": "Austin",
                        "geo_statistics": { "housing_market": { "median_listing_price": 525_000 } }
                    }
                ]
            },
            "recommended_cities": {
                "geos": [{ "slug_id": "Round-Rock_TX", "state_code": "TX" }]
            }
        });

        let summary = decode_geo_summary(&payload);
        let zips = summary.zips.unwrap();
        let zip = &zips["78702"];
        assert_eq!(zip.geo_type.as_deref(), Some("postal_code"));
        assert_eq!(zip.median_listing_price, Some(525_000.0));

        let cities = summary.cities.unwrap();
        assert!(cities.contains_key("Round-Rock_TX"));
        assert!(summary.counties.is_none());
        assert!(summary.market.is_none());
    }

    #[test]
    fn decodes_market_statistics() {
        let payload = json!({
            "geo_statistics": {
                "housing_market": {
                    "median_days_on_market": 41,
                    "median_sold_price": 480_000,
                    "median_price_per_sqft": 270.5,
                    "median_listing_price": "499000",
                    "month_to_month": { "active_listing_count_percent_change": 0.04 },
                    "by_prop_type": [
                        { "type": "home", "attributes": { "median_sold_price": 470_000 } },
                        { "attributes": { "ignored": true } }
                    ]
                }
            }
        });

        let market = decode_geo_summary(&payload).market.unwrap();
        assert_eq!(market.median_days_on_market, Some(41.0));
        assert_eq!(market.median_listing_price, Some(499_000.0));
        assert!(market.month_to_month.is_some());
        assert_eq!(market.by_property_type.len(), 1);
        assert_eq!(
            market.by_property_type["home"]["median_sold_price"],
            json!(470_000)
        );
    }

    #[test]
    fn empty_payload_is_all_none() {
        let summary = decode_geo_summary(&json!({}));
        assert_eq!(summary, GeoSummary::default());
    }
}
