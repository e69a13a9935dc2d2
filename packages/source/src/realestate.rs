//! US Real Estate API client (RapidAPI).
//!
//! City searches use `/v2/for-sale` for listed homes and the v1
//! `/sold-homes` endpoint for sold homes; zip searches use the v2
//! by-zipcode endpoints. v2 responses nest results under
//! `data.home_search` and carry a `data.geo` payload, v1 responses keep
//! results directly under `data` and have no geography.

use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;
use unicorn_listing_models::ListingStatus;

use crate::{
    ListingSource, ResponseCache, SearchArea, SearchQuery, SearchResults, SourceError, retry,
};

pub const API_KEY_VAR: &str = "USREALESTATE_API_KEY";
pub const DEFAULT_BASE_URL: &str = "https://us-real-estate.p.rapidapi.com";
const API_HOST: &str = "us-real-estate.p.rapidapi.com";

/// Largest page the API serves.
pub const PAGE_SIZE: usize = 200;
/// Filters out placeholder listings priced at a few dollars.
pub const MIN_PRICE: u32 = 100;
pub const DEFAULT_PROPERTY_TYPE: &str = "single_family";

const REQUEST_TIMEOUT: Duration = Duration::from_secs(120);

/// Search endpoint for a status and area.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SearchEndpoint {
    pub path: &'static str,
    pub v2: bool,
    pub min_price: bool,
}

#[must_use]
pub const fn search_endpoint(status: ListingStatus, area: &SearchArea) -> SearchEndpoint {
    match (status, area) {
        (ListingStatus::Sold, SearchArea::City { .. }) => SearchEndpoint {
            path: "/sold-homes",
            v2: false,
            min_price: true,
        },
        (ListingStatus::Sold, SearchArea::Zip(_)) => SearchEndpoint {
            path: "/v2/sold-homes-by-zipcode",
            v2: true,
            min_price: false,
        },
        (_, SearchArea::City { .. }) => SearchEndpoint {
            path: "/v2/for-sale",
            v2: true,
            min_price: true,
        },
        (_, SearchArea::Zip(_)) => SearchEndpoint {
            path: "/v2/for-sale-by-zipcode",
            v2: true,
            min_price: true,
        },
    }
}

/// Query parameters for one page of a search.
#[must_use]
pub fn search_params(
    query: &SearchQuery,
    offset: usize,
    limit: usize,
) -> Vec<(&'static str, String)> {
    let endpoint = search_endpoint(query.status, &query.area);
    let sort = if query.status == ListingStatus::Sold {
        "sold_date"
    } else {
        "newest"
    };

    let mut params = vec![
        ("offset", offset.to_string()),
        ("limit", limit.to_string()),
        ("sort", sort.to_string()),
        ("property_type", query.property_type.clone()),
    ];
    if endpoint.min_price {
        params.push(("min_price", MIN_PRICE.to_string()));
    }
    match &query.area {
        SearchArea::City { city, state_code } => {
            params.push(("state_code", state_code.clone()));
            params.push(("city", city.clone()));
        }
        SearchArea::Zip(zip) => params.push(("zipcode", zip.clone())),
    }
    params
}

/// One page of search results.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SearchPage {
    pub listings: Vec<Value>,
    pub geo: Option<Value>,
    pub total: usize,
    pub count: usize,
}

/// Reads a search response in the v1 or v2 layout.
///
/// # Errors
///
/// Returns [`SourceError::Response`] if the result list is missing.
pub fn parse_search_page(body: &Value, v2: bool) -> Result<SearchPage, SourceError> {
    let pointer = if v2 { "/data/home_search" } else { "/data" };
    let search = body.pointer(pointer).ok_or_else(|| SourceError::Response {
        message: format!("search response has no {pointer}"),
    })?;
    let listings = search
        .get("results")
        .and_then(Value::as_array)
        .cloned()
        .ok_or_else(|| SourceError::Response {
            message: format!("search response has no {pointer}/results"),
        })?;

    let count = search.get("count").and_then(as_count).unwrap_or(listings.len());
    let total = search.get("total").and_then(as_count).unwrap_or(count);
    let geo = if v2 {
        body.pointer("/data/geo").filter(|g| !g.is_null()).cloned()
    } else {
        None
    };

    Ok(SearchPage {
        listings,
        geo,
        total,
        count,
    })
}

/// Counts arrive as numbers or numeric strings.
fn as_count(value: &Value) -> Option<usize> {
    value
        .as_u64()
        .or_else(|| value.as_str().and_then(|s| s.trim().parse().ok()))
        .and_then(|n| usize::try_from(n).ok())
}

/// Client for the US Real Estate API.
#[derive(Debug, Clone)]
pub struct RealEstateApi {
    client: reqwest::Client,
    api_key: String,
    base_url: String,
    cache: Option<ResponseCache>,
}

impl RealEstateApi {
    /// # Errors
    ///
    /// Returns [`SourceError::Http`] if the HTTP client cannot be built.
    pub fn new(api_key: impl Into<String>) -> Result<Self, SourceError> {
        let client = reqwest::Client::builder().timeout(REQUEST_TIMEOUT).build()?;
        Ok(Self {
            client,
            api_key: api_key.into(),
            base_url: DEFAULT_BASE_URL.to_string(),
            cache: None,
        })
    }

    /// Reads the key from `USREALESTATE_API_KEY`.
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
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    #[must_use]
    pub fn with_cache(mut self, cache: ResponseCache) -> Self {
        self.cache = Some(cache);
        self
    }

    async fn get(&self, path: &str, params: &[(&str, String)]) -> Result<Value, SourceError> {
        let namespace = path.trim_start_matches('/').replace('/', "_");
        if let Some(cache) = &self.cache
            && let Some(cached) = cache.load(&namespace, params).await?
        {
            return Ok(cached);
        }

        let url = format!("{}{path}", self.base_url);
        log::debug!("GET {url} {params:?}");
        let body = retry::send_json(|| {
            self.client
                .get(&url)
                .header("X-RapidAPI-Key", &self.api_key)
                .header("X-RapidAPI-Host", API_HOST)
                .query(params)
        })
        .await?;

        if let Some(cache) = &self.cache {
            cache.store(&namespace, params, &body).await?;
        }
        Ok(body)
    }
}

#[async_trait]
impl ListingSource for RealEstateApi {
    async fn fetch_comparables(&self, query: &SearchQuery) -> Result<SearchResults, SourceError> {
        let endpoint = search_endpoint(query.status, &query.area);
        let mut results = SearchResults::default();
        if query.limit == 0 {
            return Ok(results);
        }

        let mut offset = query.offset;
        let mut limit = query.limit.min(PAGE_SIZE);
        loop {
            let body = self
                .get(endpoint.path, &search_params(query, offset, limit))
                .await?;
            let page = parse_search_page(&body, endpoint.v2)?;
            log::debug!(
                "{} page at offset {offset}: {} of {} available",
                endpoint.path,
                page.count,
                page.total,
            );

            if results.geo.is_none() {
                results.geo = page.geo;
            }
            results.total_available = page.total;
            let received = page.listings.len();
            results.listings.extend(page.listings);

            let wanted = query.limit.min(page.total.saturating_sub(query.offset));
            let remaining = wanted.saturating_sub(results.listings.len());
            if remaining == 0 || received == 0 {
                break;
            }
            offset += received;
            limit = remaining.min(PAGE_SIZE);
        }

        log::info!(
            "Fetched {} {} listings ({} available)",
            results.len(),
            query.status,
            results.total_available,
        );
        Ok(results)
    }

    async fn fetch_property_detail(&self, property_id: &str) -> Result<Value, SourceError> {
        self.get(
            "/v2/property-detail",
            &[("property_id", property_id.to_string())],
        )
        .await
    }

    async fn fetch_property_value(&self, property_id: &str) -> Result<Value, SourceError> {
        self.get(
            "/for-sale/home-estimate-value",
            &[("property_id", property_id.to_string())],
        )
        .await
    }

    async fn suggest_locations(&self, input: &str) -> Result<Value, SourceError> {
        self.get("/location/suggest", &[("input", input.to_string())])
            .await
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn city() -> SearchArea {
        SearchArea::City {
            city: "Austin".to_string(),
            state_code: "TX".to_string(),
        }
    }

    fn param<'a>(params: &'a [(&str, String)], name: &str) -> Option<&'a str> {
        params
            .iter()
            .find(|(n, _)| *n == name)
            .map(|(_, v)| v.as_str())
    }

    #[test]
    fn endpoints_follow_status_and_area() {
        let zip = SearchArea::Zip("78701".to_string());
        assert_eq!(search_endpoint(ListingStatus::Sold, &city()).path, "/sold-homes");
        assert!(!search_endpoint(ListingStatus::Sold, &city()).v2);
        assert_eq!(search_endpoint(ListingStatus::ForSale, &city()).path, "/v2/for-sale");
        assert_eq!(
            search_endpoint(ListingStatus::Sold, &zip).path,
            "/v2/sold-homes-by-zipcode"
        );
        assert_eq!(
            search_endpoint(ListingStatus::ForSale, &zip).path,
            "/v2/for-sale-by-zipcode"
        );
    }

    #[test]
    fn sold_by_zip_has_no_price_floor() {
        let sold_zip = SearchQuery::new(ListingStatus::Sold, SearchArea::Zip("78701".into()), 10);
        let params = search_params(&sold_zip, 0, 10);
        assert_eq!(param(&params, "min_price"), None);
        assert_eq!(param(&params, "zipcode"), Some("78701"));
        assert_eq!(param(&params, "sort"), Some("sold_date"));

        let for_sale = SearchQuery::new(ListingStatus::ForSale, city(), 10);
        let params = search_params(&for_sale, 200, 50);
        assert_eq!(param(&params, "min_price"), Some("100"));
        assert_eq!(param(&params, "sort"), Some("newest"));
        assert_eq!(param(&params, "offset"), Some("200"));
        assert_eq!(param(&params, "limit"), Some("50"));
        assert_eq!(param(&params, "city"), Some("Austin"));
        assert_eq!(param(&params, "property_type"), Some("single_family"));
    }

    #[test]
    fn parses_v2_pages_with_geo() {
        let body = json!({
            "data": {
                "geo": { "recommended_zips": {} },
                "home_search": {
                    "total": "412",
                    "count": 2,
                    "results": [{ "property_id": "1" }, { "property_id": "2" }]
                }
            }
        });
        let page = parse_search_page(&body, true).unwrap();
        assert_eq!(page.total, 412);
        assert_eq!(page.count, 2);
        assert_eq!(page.listings.len(), 2);
        assert!(page.geo.is_some());
    }

    #[test]
    fn parses_v1_pages_without_geo() {
        let body = json!({
            "data": {
                "total": 3,
                "count": 1,
                "results": [{ "property_id": "9" }],
                "geo": { "ignored": true }
            }
        });
        let page = parse_search_page(&body, false).unwrap();
        assert_eq!((page.total, page.count), (3, 1));
        assert!(page.geo.is_none());
    }

    #[test]
    fn missing_results_is_a_response_error() {
        let body = json!({ "message": "You are not subscribed to this API." });
        assert!(matches!(
            parse_search_page(&body, true),
            Err(SourceError::Response { .. })
        ));
    }
}
