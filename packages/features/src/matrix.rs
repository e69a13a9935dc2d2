//! The training matrix built from a comparable set.

use std::collections::BTreeMap;
use std::io::Write;

use serde::{Deserialize, Serialize};
use unicorn_comparables::ComparableSet;

use crate::{FeatureBuilder, FeatureRecord, target};

/// Column order of [`FeatureMatrix::write_csv`].
const CSV_HEADER: [&str; 26] = [
    "property_id",
    "address",
    "status",
    "days_listed",
    "days_updated",
    "baths_full",
    "baths_3qtr",
    "baths_half",
    "baths_1qtr",
    "total_baths",
    "year_built",
    "lot_sqft",
    "lot_sqft_winz",
    "sqft",
    "sqft_winz",
    "garage",
    "stories",
    "beds",
    "tags",
    "new_construction",
    "distance_to_home",
    "lat",
    "long",
    "lat_winz",
    "long_winz",
    "walk_score",
];

/// Feature rows and their targets, index-aligned.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FeatureMatrix {
    /// One row per comparable, in set order.
    pub rows: Vec<FeatureRecord>,
    /// Whole-dollar prices; `0` where the listing had none.
    pub targets: Vec<i64>,
}

impl FeatureMatrix {
    /// Featurizes every comparable in `set`.
    ///
    /// `walk_scores` maps property id to score; pass `None` when
    /// walkability scoring is disabled.
    #[must_use]
    pub fn from_set(set: &ComparableSet, walk_scores: Option<&BTreeMap<String, f64>>) -> Self {
        let (rows, targets) = set
            .comparables()
            .iter()
            .map(|normalized| {
                let score = walk_scores
                    .and_then(|scores| scores.get(&normalized.record().property_id).copied());
                (
                    FeatureBuilder::build(normalized, score),
                    target(normalized.record()),
                )
            })
            .unzip();

        Self { rows, targets }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Writes the rows as CSV with a trailing `target` column. Tags are
    /// joined with `|`; missing values are empty cells.
    ///
    /// # Errors
    ///
    /// Returns a [`csv::Error`] if writing fails.
    pub fn write_csv<W: Write>(&self, writer: W) -> Result<(), csv::Error> {
        let mut csv = csv::Writer::from_writer(writer);
        csv.write_record(CSV_HEADER.iter().chain(std::iter::once(&"target")))?;

        for (row, target) in self.rows.iter().zip(&self.targets) {
            csv.write_record(csv_cells(row).iter().chain(std::iter::once(&target.to_string())))?;
        }

        csv.flush()?;
        log::debug!("Wrote {} feature rows as CSV", self.rows.len());
        Ok(())
    }
}

fn csv_cells(row: &FeatureRecord) -> [String; CSV_HEADER.len()] {
    fn opt(value: Option<f64>) -> String {
        value.map(|v| v.to_string()).unwrap_or_default()
    }

    [
        row.property_id.clone(),
        row.address.clone(),
        row.status.to_string(),
        row.days_listed.to_string(),
        row.days_updated.to_string(),
        row.baths_full.to_string(),
        row.baths_3qtr.to_string(),
        row.baths_half.to_string(),
        row.baths_1qtr.to_string(),
        row.total_baths.to_string(),
        row.year_built.to_string(),
        row.lot_sqft.to_string(),
        opt(row.lot_sqft_winz),
        row.sqft.to_string(),
        opt(row.sqft_winz),
        row.garage.to_string(),
        row.stories.to_string(),
        row.beds.to_string(),
        row.tags.join("|"),
        row.new_construction.to_string(),
        opt(row.distance_to_home),
        opt(row.lat),
        opt(row.long),
        opt(row.lat_winz),
        opt(row.long_winz),
        opt(row.walk_score),
    ]
}
