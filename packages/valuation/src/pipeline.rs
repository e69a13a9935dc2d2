//! Valuation session orchestration.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use unicorn_comparables::ComparableSet;
use unicorn_features::{FeatureBuilder, FeatureMatrix, FeatureRecord};
use unicorn_listing::geo::decode_geo_summary;
use unicorn_listing::{GeoSummary, decode_subject};
use unicorn_model::store::{load_model, save_model};
use unicorn_model::{ModelKind, ModelStore, NeighborPricePredictor, Predictor};
use unicorn_source::{ListingSource, SearchArea, houses_of_interest};
use unicorn_walkability::{WalkScoreSource, WalkScores, WalkabilityConfig, WalkabilityEstimator};

use crate::config::{ModelConfig, SearchConfig};
use crate::{PriceToggle, ValuationConfig, ValuationError};

/// Raw API payloads for one session. Serializable so a fetched session
/// can be replayed offline.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SessionPayloads {
    pub subject: Value,
    pub listings: Vec<Value>,
    pub geo: Option<Value>,
}

/// Fetches the subject property and a mixed sample of comparables from
/// its city.
///
/// # Errors
///
/// Returns [`ValuationError`] if a request fails or the subject payload
/// cannot be decoded.
pub async fn fetch_payloads(
    source: &dyn ListingSource,
    property_id: &str,
    search: &SearchConfig,
) -> Result<SessionPayloads, ValuationError> {
    if property_id.trim().is_empty() {
        return Err(ValuationError::MissingPropertyId);
    }

    let subject = source.fetch_property_detail(property_id).await?;
    let home = decode_subject(&subject)?;
    let area = SearchArea::City {
        city: home.city,
        state_code: home.state,
    };
    let results = houses_of_interest(source, &area, search.n, search.listed_to_sold_ratio).await?;

    Ok(SessionPayloads {
        subject,
        listings: results.listings,
        geo: results.geo,
    })
}

/// One home, its comparables and everything derived from them.
#[derive(Debug, Clone)]
pub struct ValuationSession {
    set: ComparableSet,
    geo: GeoSummary,
    walk_scores: WalkScores,
}

impl ValuationSession {
    /// Decodes the payloads and builds the comparable set. Walkability
    /// starts out unscored.
    ///
    /// # Errors
    ///
    /// Returns [`ValuationError::Data`] if the subject or any listing
    /// cannot be decoded.
    pub fn prepare(
        listings: &[Value],
        subject: &Value,
        geo: Option<&Value>,
        config: &ValuationConfig,
        today: NaiveDate,
    ) -> Result<Self, ValuationError> {
        let subject = decode_subject(subject)?;
        let set = ComparableSet::build(listings, subject, &config.comparables, today)?;
        let geo = geo.map(decode_geo_summary).unwrap_or_default();

        Ok(Self {
            set,
            geo,
            walk_scores: WalkScores::disabled(),
        })
    }

    /// [`Self::prepare`] over a fetched or replayed payload bundle.
    ///
    /// # Errors
    ///
    /// See [`Self::prepare`].
    pub fn from_payloads(
        payloads: &SessionPayloads,
        config: &ValuationConfig,
        today: NaiveDate,
    ) -> Result<Self, ValuationError> {
        Self::prepare(
            &payloads.listings,
            &payloads.subject,
            payloads.geo.as_ref(),
            config,
            today,
        )
    }

    #[must_use]
    pub const fn set(&self) -> &ComparableSet {
        &self.set
    }

    #[must_use]
    pub const fn geo(&self) -> &GeoSummary {
        &self.geo
    }

    #[must_use]
    pub const fn walk_scores(&self) -> &WalkScores {
        &self.walk_scores
    }

    /// The `"{CITY}_{STATE}"` key models are stored under.
    #[must_use]
    pub fn model_key(&self) -> String {
        self.set.subject().model_key()
    }

    /// Scores walkability for the comparables and the subject.
    ///
    /// # Errors
    ///
    /// Returns [`ValuationError::WalkScore`] if the city regressor cannot
    /// be loaded, fitted or saved.
    pub async fn score_walkability(
        &mut self,
        config: &WalkabilityConfig,
        source: &dyn WalkScoreSource,
        store: &dyn ModelStore,
    ) -> Result<&WalkScores, ValuationError> {
        let mut estimator = WalkabilityEstimator::new(config.clone(), self.model_key());
        self.walk_scores = estimator.score(&self.set, source, store).await?;
        Ok(&self.walk_scores)
    }

    /// Training rows and targets for the comparables.
    #[must_use]
    pub fn feature_matrix(&self) -> FeatureMatrix {
        FeatureMatrix::from_set(&self.set, Some(self.walk_scores.as_map()))
    }

    /// The subject's features, in the same schema as the training rows.
    #[must_use]
    pub fn subject_features(&self) -> FeatureRecord {
        FeatureBuilder::build(self.set.normalized_subject(), self.walk_scores.subject())
    }

    /// Fits a fresh price predictor on the comparables.
    ///
    /// # Errors
    ///
    /// Returns [`ValuationError::NoComparables`] for an empty set and
    /// [`ValuationError::Model`] if fitting fails.
    pub fn train_price_model(
        &self,
        config: &ModelConfig,
    ) -> Result<NeighborPricePredictor, ValuationError> {
        if self.set.is_empty() {
            return Err(ValuationError::NoComparables {
                key: self.model_key(),
            });
        }
        let mut predictor = NeighborPricePredictor::new(config.neighbors);
        predictor.fit(&self.feature_matrix())?;
        Ok(predictor)
    }

    /// The stored price predictor for this city, or a freshly trained one
    /// that is then saved.
    ///
    /// # Errors
    ///
    /// Returns [`ValuationError`] if loading, training or saving fails.
    pub fn price_model(
        &self,
        config: &ModelConfig,
        store: &dyn ModelStore,
    ) -> Result<NeighborPricePredictor, ValuationError> {
        let key = self.model_key();
        if let Some(predictor) =
            load_model::<NeighborPricePredictor>(store, ModelKind::PricePredictor, &key)?
            && predictor.is_fitted()
        {
            log::info!("Using stored price predictor for {key}");
            return Ok(predictor);
        }

        let predictor = self.train_price_model(config)?;
        save_model(store, ModelKind::PricePredictor, &key, &predictor)?;
        Ok(predictor)
    }

    /// What-if estimator over the subject property.
    ///
    /// # Errors
    ///
    /// Returns [`ValuationError::Model`] if the base prediction fails.
    pub fn toggle<'a, P: Predictor>(
        &'a self,
        predictor: &'a P,
    ) -> Result<PriceToggle<'a, P>, ValuationError> {
        Ok(PriceToggle::new(predictor, &self.set, self.walk_scores.subject())?)
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use async_trait::async_trait;
    use serde_json::json;
    use unicorn_features::NUMERIC_COLUMNS;
    use unicorn_model::MemoryModelStore;
    use unicorn_walkability::{OfflineSource, RawWalkScore, WalkScoreError, WalkScoreQuery};

    use super::*;

    pub(crate) fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 6, 1).unwrap()
    }

    pub(crate) fn subject_payload() -> Value {
        json!({
            "data": {
                "property_detail": {
                    "id": "HOME",
                    "prop_common": {
                        "bath": 2.5,
                        "year_built": 2004,
                        "lot_sqft": 7000,
                        "sqft": 1900
                    },
                    "features": [
                        { "category": "Garage and Parking", "text": ["Garage Spaces: 2"] }
                    ],
                    "public_records": [{ "beds": 3, "stories": 1 }],
                    "address": {
                        "line": "5 Elm Ct",
                        "postal_code": "78702",
                        "location": { "lat": 30.0, "lon": -97.0 }
                    },
                    "price_history": [{ "date": "2021-04-15", "price": 310_000 }],
                    "neighborhoods": [{ "city": "Austin", "state_code": "TX" }]
                }
            }
        })
    }

    pub(crate) fn sold_payload(id: &str, price: Option<f64>, lat: f64, sqft: i64) -> Value {
        json!({
            "property_id": id,
            "status": "sold",
            "sold_price": price,
            "sold_date": "2024-05-01T00:00:00Z",
            "location": {
                "address": {
                    "line": "1 Test St",
                    "city": "Austin",
                    "state_code": "TX",
                    "postal_code": "78702",
                    "coordinate": { "lat": lat, "lon": -97.0 }
                }
            },
            "description": {
                "beds": 3,
                "baths_full": 2,
                "sqft": sqft,
                "lot_sqft": 6_500,
                "year_built": 1999
            }
        })
    }

    pub(crate) fn session() -> ValuationSession {
        let one_mile = 1.0 / 69.04;
        let listings = vec![
            sold_payload("A", Some(300_000.0), 30.0 + one_mile, 1_700),
            sold_payload("B", Some(320_000.0), 30.0 + one_mile, 1_900),
            sold_payload("C", None, 30.0 + one_mile, 2_100),
        ];
        let config = ValuationConfig::embedded().unwrap();
        ValuationSession::prepare(&listings, &subject_payload(), None, &config, today()).unwrap()
    }

    struct FixedSource;

    #[async_trait]
    impl WalkScoreSource for FixedSource {
        async fn fetch_score(&self, _: &WalkScoreQuery) -> Result<RawWalkScore, WalkScoreError> {
            Ok(RawWalkScore {
                walkscore: Some(json!(64)),
                ..RawWalkScore::default()
            })
        }
    }

    #[test]
    fn prepares_three_comparables_one_mile_out() {
        let session = session();
        let matrix = session.feature_matrix();

        assert_eq!(session.model_key(), "AUSTIN_TX");
        assert_eq!(matrix.len(), 3);
        assert_eq!(matrix.targets, [300_000, 320_000, 0]);
        let distance = matrix.rows[0].distance_to_home.unwrap();
        assert!((distance - 1.0).abs() < 0.01);
        assert_eq!(session.geo(), &GeoSummary::default());
    }

    #[test]
    fn subject_features_share_the_training_schema() {
        let session = session();
        let subject = session.subject_features();
        let row = &session.feature_matrix().rows[0];

        assert_eq!(subject.numeric_values().len(), NUMERIC_COLUMNS.len());
        assert_eq!(row.numeric_values().len(), NUMERIC_COLUMNS.len());
        assert_eq!(subject.distance_to_home, Some(0.0));
        assert_eq!(subject.baths_full, 2);
        assert_eq!(subject.baths_half, 1);
        assert_eq!(subject.walk_score, None);
    }

    #[tokio::test]
    async fn walk_scores_feed_every_row() {
        let mut session = session();
        let store = MemoryModelStore::new();
        let config = WalkabilityConfig {
            min_training_points: 2,
            ..WalkabilityConfig::default()
        };

        session
            .score_walkability(&config, &FixedSource, &store)
            .await
            .unwrap();

        assert!(session.feature_matrix().rows.iter().all(|r| r.walk_score == Some(64.0)));
        assert_eq!(session.subject_features().walk_score, Some(64.0));
        assert!(store.contains(ModelKind::WalkScore, "AUSTIN_TX"));
    }

    #[tokio::test]
    async fn stored_walk_score_model_scores_offline_sessions() {
        let store = MemoryModelStore::new();
        let config = WalkabilityConfig {
            min_training_points: 2,
            ..WalkabilityConfig::default()
        };
        session()
            .score_walkability(&config, &FixedSource, &store)
            .await
            .unwrap();

        let mut offline = session();
        offline
            .score_walkability(&config, &OfflineSource::new("no API key"), &store)
            .await
            .unwrap();

        let near_64 = |score: Option<f64>| score.is_some_and(|s| (s - 64.0).abs() < 1e-6);
        assert!(offline.feature_matrix().rows.iter().all(|r| near_64(r.walk_score)));
        assert!(near_64(offline.subject_features().walk_score));
        assert_eq!(offline.walk_scores().imputed, 0);
    }

    #[test]
    fn price_model_is_trained_once_then_reused() {
        let session = session();
        let store = MemoryModelStore::new();
        let config = ModelConfig { neighbors: 2 };

        let trained = session.price_model(&config, &store).unwrap();
        assert!(store.contains(ModelKind::PricePredictor, "AUSTIN_TX"));

        let reused = session.price_model(&ModelConfig { neighbors: 9 }, &store).unwrap();
        assert_eq!(trained, reused);
    }

    #[test]
    fn empty_set_cannot_be_trained() {
        let config = ValuationConfig::embedded().unwrap();
        let session =
            ValuationSession::prepare(&[], &subject_payload(), None, &config, today()).unwrap();
        assert!(matches!(
            session.train_price_model(&config.model),
            Err(ValuationError::NoComparables { .. })
        ));
    }
}
