//! On-disk checkpoint of API responses.
//!
//! Listing searches and walkability lookups are metered, so replaying a
//! session should not pay for them twice. Responses are stored as JSON
//! under `<root>/<namespace>/<hash>.json`, where the hash covers the
//! namespace and the sorted request parameters.

use std::path::{Path, PathBuf};

use serde_json::Value;
use sha2::{Digest, Sha256};

use crate::SourceError;

#[derive(Debug, Clone)]
pub struct ResponseCache {
    root: PathBuf,
}

impl ResponseCache {
    #[must_use]
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Stable key for a request. Parameter order does not matter.
    #[must_use]
    pub fn key(namespace: &str, params: &[(&str, String)]) -> String {
        let mut sorted = params.to_vec();
        sorted.sort();

        let mut hasher = Sha256::new();
        hasher.update(namespace.as_bytes());
        for (name, value) in &sorted {
            hasher.update(b"\x1f");
            hasher.update(name.as_bytes());
            hasher.update(b"=");
            hasher.update(value.as_bytes());
        }
        hex::encode(hasher.finalize())
    }

    #[must_use]
    pub fn entry_path(&self, namespace: &str, params: &[(&str, String)]) -> PathBuf {
        self.root
            .join(namespace)
            .join(format!("{}.json", Self::key(namespace, params)))
    }

    /// Cached response for the request, if any.
    ///
    /// # Errors
    ///
    /// Returns [`SourceError`] if an existing entry cannot be read or parsed.
    pub async fn load(
        &self,
        namespace: &str,
        params: &[(&str, String)],
    ) -> Result<Option<Value>, SourceError> {
        let path = self.entry_path(namespace, params);
        match tokio::fs::read_to_string(&path).await {
            Ok(text) => {
                log::debug!("Cache hit: {}", path.display());
                Ok(Some(serde_json::from_str(&text)?))
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// Stores a response, replacing any earlier entry.
    ///
    /// # Errors
    ///
    /// Returns [`SourceError`] if the entry cannot be written.
    pub async fn store(
        &self,
        namespace: &str,
        params: &[(&str, String)],
        response: &Value,
    ) -> Result<(), SourceError> {
        let path = self.entry_path(namespace, params);
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(&path, serde_json::to_vec(response)?).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn params(city: &str) -> Vec<(&'static str, String)> {
        vec![("state_code", "TX".to_string()), ("city", city.to_string())]
    }

    #[test]
    fn key_ignores_parameter_order() {
        let mut reversed = params("Austin");
        reversed.reverse();
        assert_eq!(
            ResponseCache::key("sold", &params("Austin")),
            ResponseCache::key("sold", &reversed)
        );
        assert_ne!(
            ResponseCache::key("sold", &params("Austin")),
            ResponseCache::key("for_sale", &params("Austin"))
        );
        assert_ne!(
            ResponseCache::key("sold", &params("Austin")),
            ResponseCache::key("sold", &params("Dallas"))
        );
        assert_eq!(ResponseCache::key("sold", &[]).len(), 64);
    }

    #[tokio::test]
    async fn stores_and_loads_responses() {
        let root = std::env::temp_dir().join(format!("unicorn_cache_{}", std::process::id()));
        let cache = ResponseCache::new(&root);

        assert!(cache.load("sold", &params("Austin")).await.unwrap().is_none());

        let body = json!({ "data": { "total": 1 } });
        cache.store("sold", &params("Austin"), &body).await.unwrap();
        assert_eq!(cache.load("sold", &params("Austin")).await.unwrap(), Some(body));
        assert!(cache.entry_path("sold", &params("Austin")).starts_with(root.join("sold")));

        tokio::fs::remove_dir_all(&root).await.unwrap();
    }
}
