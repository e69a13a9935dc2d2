//! One-hot encoding of listing tags.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

/// Tags seen more than once during fitting, in sorted order.
///
/// Tags that appear on a single listing carry no signal for a neighbour
/// model and only widen the input, so they are dropped.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TagVocabulary {
    tags: Vec<String>,
}

impl TagVocabulary {
    /// Builds the vocabulary from one tag list per listing.
    #[must_use]
    pub fn fit<'a, I, T>(tag_lists: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: IntoIterator<Item = &'a String>,
    {
        let mut frequency = BTreeMap::<&str, usize>::new();
        for list in tag_lists {
            // A tag repeated within one listing still counts once.
            let unique = list.into_iter().map(String::as_str).collect::<BTreeSet<_>>();
            for tag in unique {
                *frequency.entry(tag).or_default() += 1;
            }
        }

        Self {
            tags: frequency
                .into_iter()
                .filter(|(_, count)| *count > 1)
                .map(|(tag, _)| tag.to_string())
                .collect(),
        }
    }

    /// The kept tags.
    #[must_use]
    pub fn tags(&self) -> &[String] {
        &self.tags
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.tags.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tags.is_empty()
    }

    /// `1.0` for each vocabulary tag present in `tags`, `0.0` otherwise.
    /// Unknown tags are ignored.
    #[must_use]
    pub fn encode(&self, tags: &[String]) -> Vec<f64> {
        let present = tags.iter().map(String::as_str).collect::<BTreeSet<_>>();
        self.tags
            .iter()
            .map(|t| if present.contains(t.as_str()) { 1.0 } else { 0.0 })
            .collect()
    }
}
