//! Construction of the immutable comparable set.

use std::collections::BTreeSet;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use unicorn_listing::{DataError, decode_listing, listing_id};
use unicorn_listing_models::{ListingRecord, SubjectProperty};

use crate::quality::first_failure;
use crate::{AnnotatedRecord, ComparableConfig, NormalizationStats, NormalizedRecord, RejectReason};

/// A candidate the quality filter excluded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rejection {
    /// Listing id of the rejected candidate.
    pub property_id: String,
    /// First rule it failed.
    pub reason: RejectReason,
}

/// Deduplicated, filtered and normalized comparables for one subject
/// property, together with the stats needed to normalize the subject the
/// same way.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComparableSet {
    comparables: Vec<NormalizedRecord>,
    subject: SubjectProperty,
    normalized_subject: NormalizedRecord,
    stats: NormalizationStats,
    rejected: Vec<Rejection>,
    duplicates: usize,
}

impl ComparableSet {
    /// Builds the set from raw search payloads.
    ///
    /// A payload whose property id was already seen is skipped before it is
    /// decoded.
    ///
    /// # Errors
    ///
    /// Returns the first [`DataError`] raised while decoding a payload; a
    /// single undecodable listing aborts the whole set.
    pub fn build(
        payloads: &[Value],
        subject: SubjectProperty,
        config: &ComparableConfig,
        today: NaiveDate,
    ) -> Result<Self, DataError> {
        let mut seen = BTreeSet::new();
        let mut records = Vec::with_capacity(payloads.len());
        let mut duplicates = 0;

        for payload in payloads {
            let id = listing_id(payload)?;
            if !seen.insert(id) {
                duplicates += 1;
                continue;
            }
            records.push(decode_listing(payload, today)?);
        }

        if duplicates > 0 {
            log::debug!("Skipped {duplicates} duplicate listing payload(s)");
        }

        Ok(Self::assemble(records, duplicates, subject, config))
    }

    /// Builds the set from already decoded listings, applying the same
    /// dedupe, distance, filter and normalization stages.
    #[must_use]
    pub fn from_records(
        records: Vec<ListingRecord>,
        subject: SubjectProperty,
        config: &ComparableConfig,
    ) -> Self {
        let mut seen = BTreeSet::new();
        let total = records.len();
        let unique = records
            .into_iter()
            .filter(|r| seen.insert(r.property_id.clone()))
            .collect::<Vec<_>>();
        let duplicates = total - unique.len();

        Self::assemble(unique, duplicates, subject, config)
    }

    fn assemble(
        records: Vec<ListingRecord>,
        duplicates: usize,
        subject: SubjectProperty,
        config: &ComparableConfig,
    ) -> Self {
        let home = subject.record.lat_long;
        let mut rejected = Vec::new();

        let survivors = records
            .into_iter()
            .map(|record| AnnotatedRecord::relative_to(record, home))
            .filter(|annotated| match first_failure(&annotated.record, &config.quality) {
                Some(reason) => {
                    log::debug!(
                        "Rejected comparable {}: {reason}",
                        annotated.record.property_id
                    );
                    rejected.push(Rejection {
                        property_id: annotated.record.property_id.clone(),
                        reason,
                    });
                    false
                }
                None => true,
            })
            .collect::<Vec<_>>();

        let stats = NormalizationStats::fit(&survivors, config);
        let comparables = survivors
            .into_iter()
            .map(|annotated| stats.normalize(annotated))
            .collect::<Vec<_>>();
        let normalized_subject = stats.normalize(AnnotatedRecord::subject(subject.record.clone()));

        log::info!(
            "Comparable set for {}: {} kept, {} rejected, {duplicates} duplicate(s)",
            subject.model_key(),
            comparables.len(),
            rejected.len(),
        );

        Self {
            comparables,
            subject,
            normalized_subject,
            stats,
            rejected,
            duplicates,
        }
    }

    /// Normalizes a variant of the subject property (e.g., with an extra
    /// bedroom) using the stats fitted on this set.
    #[must_use]
    pub fn normalize_variant(&self, record: ListingRecord) -> NormalizedRecord {
        self.stats.normalize(AnnotatedRecord::subject(record))
    }

    /// The surviving comparables, in input order.
    #[must_use]
    pub fn comparables(&self) -> &[NormalizedRecord] {
        &self.comparables
    }

    /// The subject property as decoded.
    #[must_use]
    pub const fn subject(&self) -> &SubjectProperty {
        &self.subject
    }

    /// The subject property normalized with this set's stats.
    #[must_use]
    pub const fn normalized_subject(&self) -> &NormalizedRecord {
        &self.normalized_subject
    }

    /// The fitted normalization stats.
    #[must_use]
    pub const fn stats(&self) -> &NormalizationStats {
        &self.stats
    }

    /// Candidates excluded by the quality filter.
    #[must_use]
    pub fn rejected(&self) -> &[Rejection] {
        &self.rejected
    }

    /// Number of payloads skipped as duplicates.
    #[must_use]
    pub const fn duplicates(&self) -> usize {
        self.duplicates
    }

    /// Number of surviving comparables.
    #[must_use]
    pub fn len(&self) -> usize {
        self.comparables.len()
    }

    /// Whether no comparable survived.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.comparables.is_empty()
    }
}
