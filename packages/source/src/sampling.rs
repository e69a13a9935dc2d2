//! Mixed listed/sold comparable sampling.

use unicorn_listing_models::ListingStatus;

use crate::{ListingSource, SearchArea, SearchQuery, SearchResults, SourceError};

/// Splits `n` into listed and sold counts. The listed share is rounded
/// down.
#[must_use]
#[allow(
    clippy::cast_possible_truncation,
    clippy::cast_precision_loss,
    clippy::cast_sign_loss
)]
pub fn split_sample(n: usize, listed_to_sold_ratio: f64) -> (usize, usize) {
    let ratio = if listed_to_sold_ratio.is_finite() {
        listed_to_sold_ratio.clamp(0.0, 1.0)
    } else {
        0.0
    };
    let listed = ((n as f64 * ratio).floor() as usize).min(n);
    (listed, n - listed)
}

/// Gathers about `n` comparables around an area, `listed_to_sold_ratio`
/// of them currently listed and the rest recently sold.
///
/// A shortfall in one status is topped up from the other, continuing past
/// what was already fetched. Listed homes come first in the result so the
/// geography payload comes from the v2 for-sale search when there is one.
///
/// # Errors
///
/// Returns [`SourceError`] if any search fails.
pub async fn houses_of_interest(
    source: &dyn ListingSource,
    area: &SearchArea,
    n: usize,
    listed_to_sold_ratio: f64,
) -> Result<SearchResults, SourceError> {
    let (n_listed, n_sold) = split_sample(n, listed_to_sold_ratio);

    let mut listed = search(source, ListingStatus::ForSale, area, n_listed, 0).await?;
    let mut sold = search(source, ListingStatus::Sold, area, n_sold, 0).await?;

    let listed_shortfall = n_listed.saturating_sub(listed.len());
    let sold_shortfall = n_sold.saturating_sub(sold.len());

    if listed_shortfall > 0 {
        log::info!("Shortfall of {listed_shortfall} listed homes, topping up with sold homes");
        let extra = search(source, ListingStatus::Sold, area, listed_shortfall, sold.len()).await?;
        sold.listings.extend(extra.listings);
    }
    if sold_shortfall > 0 {
        log::info!("Shortfall of {sold_shortfall} sold homes, topping up with listed homes");
        let extra =
            search(source, ListingStatus::ForSale, area, sold_shortfall, listed.len()).await?;
        listed.listings.extend(extra.listings);
    }

    log::info!(
        "Houses of interest: {} listed, {} sold",
        listed.len(),
        sold.len()
    );
    listed.total_available += sold.total_available;
    listed.geo = listed.geo.or(sold.geo);
    listed.listings.extend(sold.listings);
    Ok(listed)
}

async fn search(
    source: &dyn ListingSource,
    status: ListingStatus,
    area: &SearchArea,
    limit: usize,
    offset: usize,
) -> Result<SearchResults, SourceError> {
    if limit == 0 {
        return Ok(SearchResults::default());
    }
    let query = SearchQuery::new(status, area.clone(), limit).with_offset(offset);
    source.fetch_comparables(&query).await
}
