//! In-memory slot backend.
//!
//! The reference backend: a `HashMap` of slot text guarded by an async
//! `RwLock`. It provides basic persistence capabilities via `save_to_file`
//! and `load_from_file`, serializing the map to JSON, which gives the store
//! a durable slot outside a browser context.

use std::any::Any;
use std::collections::HashMap;
use std::path::Path;

use async_trait::async_trait;
use tokio::sync::RwLock;

use super::{Backend, BackendError};
use crate::Result;

/// An in-memory implementation of the [`Backend`] trait.
///
/// Stores all slots in a `HashMap` protected by an async `RwLock`, so any
/// number of store handles can share one `InMemory` across tasks. Reads
/// proceed concurrently; writes serialize on the lock.
#[derive(Debug, Default)]
pub struct InMemory {
    slots: RwLock<HashMap<String, String>>,
}

impl InMemory {
    /// Create a new, empty in-memory backend.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of slots currently written.
    pub async fn len(&self) -> usize {
        self.slots.read().await.len()
    }

    /// Whether no slot has been written yet.
    pub async fn is_empty(&self) -> bool {
        self.slots.read().await.is_empty()
    }

    /// Saves the entire backend state to a JSON file.
    ///
    /// # Arguments
    /// * `path` - The file path to write the state to.
    pub async fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let slots = self.slots.read().await;
        let encoded = serde_json::to_string_pretty(&*slots).map_err(|e| {
            BackendError::SerializationFailed {
                key: "<file snapshot>".to_string(),
                source: e,
            }
        })?;
        std::fs::write(path, encoded).map_err(|e| BackendError::FileIo { source: e })?;
        Ok(())
    }

    /// Loads backend state from a JSON file written by [`save_to_file`].
    ///
    /// # Arguments
    /// * `path` - The file path to read the state from.
    ///
    /// [`save_to_file`]: InMemory::save_to_file
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let raw =
            std::fs::read_to_string(path).map_err(|e| BackendError::FileIo { source: e })?;
        let slots: HashMap<String, String> =
            serde_json::from_str(&raw).map_err(|e| BackendError::ValueCorrupt {
                key: "<file snapshot>".to_string(),
                expected: "slot map",
                reason: e.to_string(),
            })?;
        Ok(Self {
            slots: RwLock::new(slots),
        })
    }
}

#[async_trait]
impl Backend for InMemory {
    async fn get(&self, key: &str) -> Result<String> {
        let slots = self.slots.read().await;
        slots.get(key).cloned().ok_or_else(|| {
            BackendError::NotPresent {
                key: key.to_string(),
            }
            .into()
        })
    }

    async fn set(&self, key: &str, value: String) -> Result<()> {
        let mut slots = self.slots.write().await;
        slots.insert(key.to_string(), value);
        Ok(())
    }

    async fn has(&self, key: &str) -> Result<bool> {
        let slots = self.slots.read().await;
        Ok(slots.contains_key(key))
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}
