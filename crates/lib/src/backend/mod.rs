//! Storage backends for slotdb.
//!
//! This module provides the core [`Backend`] trait and the built-in
//! implementations. A backend is a flat, string-keyed namespace of slots,
//! each holding one text value. The store persists its entire state inside a
//! handful of well-known slots, so the trait surface is deliberately small:
//! raw get/set plus a cheap existence check.
//!
//! The [`Slots`] wrapper layers typed accessors on top of a backend: booleans
//! and timestamps are encoded as plain text, structured records as JSON. A
//! value that cannot be coerced back to the requested type surfaces as
//! [`BackendError::ValueCorrupt`].

use std::any::Any;
use std::fmt::Debug;
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Serialize, de::DeserializeOwned};

use crate::Result;

pub mod errors;
pub use errors::BackendError;

mod in_memory;
pub use in_memory::InMemory;

/// Backend trait abstracting the shared slot namespace.
///
/// Implementations handle the specifics of where slot text lives (in memory,
/// on disk, a browser's local storage behind FFI). All implementations must
/// be `Send` and `Sync` so handles can be shared across tasks and threads,
/// and implement `Any` to allow downcasting to a concrete backend.
///
/// Every method is async: awaiting the backend is one of the two suspension
/// points of the store's cooperative concurrency model (the other being the
/// lock's poll sleep).
#[async_trait]
pub trait Backend: Send + Sync + Any + Debug {
    /// Retrieves the raw text stored in a slot.
    ///
    /// # Returns
    /// The slot contents, or [`BackendError::NotPresent`] if the slot has
    /// never been written.
    async fn get(&self, key: &str) -> Result<String>;

    /// Writes raw text into a slot, replacing any previous value.
    async fn set(&self, key: &str, value: String) -> Result<()>;

    /// Cheap existence check for a slot.
    async fn has(&self, key: &str) -> Result<bool>;

    /// Returns a reference to the backend instance as a dynamic `Any` type.
    ///
    /// This allows for downcasting to a concrete backend implementation if
    /// necessary, enabling access to implementation-specific methods.
    fn as_any(&self) -> &dyn Any;
}

/// Typed wrapper over a shared [`Backend`].
///
/// This struct wraps an `Arc<dyn Backend>` and provides typed slot access
/// for the value kinds the store persists: booleans, epoch-millisecond
/// timestamps, opaque text, and JSON-encoded structured records. It is a
/// thin passthrough; all coercion failures are reported per slot.
#[derive(Clone, Debug)]
pub struct Slots {
    backend: Arc<dyn Backend>,
}

impl Slots {
    /// Create a new typed wrapper around a backend.
    pub fn new(backend: Arc<dyn Backend>) -> Self {
        Self { backend }
    }

    /// The wrapped backend.
    pub fn backend(&self) -> &Arc<dyn Backend> {
        &self.backend
    }

    /// Cheap existence check for a slot.
    pub async fn has(&self, key: &str) -> Result<bool> {
        self.backend.has(key).await
    }

    /// Read a slot as opaque text.
    pub async fn get_text(&self, key: &str) -> Result<String> {
        self.backend.get(key).await
    }

    /// Write opaque text into a slot.
    pub async fn set_text(&self, key: &str, value: impl Into<String>) -> Result<()> {
        self.backend.set(key, value.into()).await
    }

    /// Read a slot as a boolean flag.
    pub async fn get_flag(&self, key: &str) -> Result<bool> {
        let raw = self.backend.get(key).await?;
        match raw.as_str() {
            "true" => Ok(true),
            "false" => Ok(false),
            other => Err(BackendError::ValueCorrupt {
                key: key.to_string(),
                expected: "boolean",
                reason: format!("found '{other}'"),
            }
            .into()),
        }
    }

    /// Write a boolean flag into a slot.
    pub async fn set_flag(&self, key: &str, value: bool) -> Result<()> {
        self.backend
            .set(key, if value { "true" } else { "false" }.to_string())
            .await
    }

    /// Read a slot as an epoch-millisecond timestamp.
    pub async fn get_millis(&self, key: &str) -> Result<u64> {
        let raw = self.backend.get(key).await?;
        raw.parse::<u64>().map_err(|e| {
            BackendError::ValueCorrupt {
                key: key.to_string(),
                expected: "timestamp",
                reason: e.to_string(),
            }
            .into()
        })
    }

    /// Write an epoch-millisecond timestamp into a slot.
    pub async fn set_millis(&self, key: &str, value: u64) -> Result<()> {
        self.backend.set(key, value.to_string()).await
    }

    /// Read a slot as a JSON-encoded structured record.
    pub async fn get_record<T: DeserializeOwned>(&self, key: &str) -> Result<T> {
        let raw = self.backend.get(key).await?;
        serde_json::from_str(&raw).map_err(|e| {
            BackendError::ValueCorrupt {
                key: key.to_string(),
                expected: "structured record",
                reason: e.to_string(),
            }
            .into()
        })
    }

    /// Write a structured record into a slot as JSON.
    pub async fn set_record<T: Serialize>(&self, key: &str, value: &T) -> Result<()> {
        let encoded = serde_json::to_string(value).map_err(|e| BackendError::SerializationFailed {
            key: key.to_string(),
            source: e,
        })?;
        self.backend.set(key, encoded).await
    }
}
