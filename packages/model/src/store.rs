//! Model persistence.
//!
//! Stores hold serialized models as JSON values so the trait stays object
//! safe; [`load_model`] and [`save_model`] do the typed conversion.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::{ModelError, ModelKind};

/// Keyed storage for fitted models.
pub trait ModelStore: Send + Sync {
    /// Loads the model stored under `kind` and `key`, if any.
    ///
    /// # Errors
    ///
    /// Returns [`ModelError`] if the stored model cannot be read.
    fn load(&self, kind: ModelKind, key: &str) -> Result<Option<Value>, ModelError>;

    /// Stores (or replaces) a model.
    ///
    /// # Errors
    ///
    /// Returns [`ModelError`] if the model cannot be written.
    fn save(&self, kind: ModelKind, key: &str, model: &Value) -> Result<(), ModelError>;

    /// Whether a model exists under `kind` and `key`.
    fn contains(&self, kind: ModelKind, key: &str) -> bool;
}

/// Loads and deserializes a model.
///
/// # Errors
///
/// Returns [`ModelError`] if the store fails or the stored JSON does not
/// match `T`.
pub fn load_model<T: DeserializeOwned>(
    store: &dyn ModelStore,
    kind: ModelKind,
    key: &str,
) -> Result<Option<T>, ModelError> {
    store
        .load(kind, key)?
        .map(|value| serde_json::from_value(value).map_err(ModelError::from))
        .transpose()
}

/// Serializes and stores a model.
///
/// # Errors
///
/// Returns [`ModelError`] if serialization or the store fails.
pub fn save_model<T: Serialize>(
    store: &dyn ModelStore,
    kind: ModelKind,
    key: &str,
    model: &T,
) -> Result<(), ModelError> {
    store.save(kind, key, &serde_json::to_value(model)?)
}

/// Stores models as pretty JSON files under `<root>/<kind>/<KEY>.json`.
#[derive(Debug, Clone)]
pub struct FileModelStore {
    root: PathBuf,
}

impl FileModelStore {
    #[must_use]
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Path of the file backing `kind` / `key`.
    #[must_use]
    pub fn model_path(&self, kind: ModelKind, key: &str) -> PathBuf {
        self.root.join(kind.as_ref()).join(format!("{key}.json"))
    }
}

impl ModelStore for FileModelStore {
    fn load(&self, kind: ModelKind, key: &str) -> Result<Option<Value>, ModelError> {
        let path = self.model_path(kind, key);
        if !path.exists() {
            return Ok(None);
        }
        let text = std::fs::read_to_string(&path)?;
        log::debug!("Loaded {kind} model from {}", path.display());
        Ok(Some(serde_json::from_str(&text)?))
    }

    fn save(&self, kind: ModelKind, key: &str, model: &Value) -> Result<(), ModelError> {
        let path = self.model_path(kind, key);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(&path, serde_json::to_string_pretty(model)?)?;
        log::info!("Saved {kind} model to {}", path.display());
        Ok(())
    }

    fn contains(&self, kind: ModelKind, key: &str) -> bool {
        self.model_path(kind, key).is_file()
    }
}

/// In-memory store, mostly for tests and dry runs.
#[derive(Debug, Default)]
pub struct MemoryModelStore {
    models: Mutex<BTreeMap<(ModelKind, String), Value>>,
}

impl MemoryModelStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn models(&self) -> std::sync::MutexGuard<'_, BTreeMap<(ModelKind, String), Value>> {
        // A panic while holding the lock cannot leave the map half-written.
        self.models
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }
}

impl ModelStore for MemoryModelStore {
    fn load(&self, kind: ModelKind, key: &str) -> Result<Option<Value>, ModelError> {
        Ok(self.models().get(&(kind, key.to_string())).cloned())
    }

    fn save(&self, kind: ModelKind, key: &str, model: &Value) -> Result<(), ModelError> {
        self.models().insert((kind, key.to_string()), model.clone());
        Ok(())
    }

    fn contains(&self, kind: ModelKind, key: &str) -> bool {
        self.models().contains_key(&(kind, key.to_string()))
    }
}
