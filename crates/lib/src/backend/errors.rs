//! Error types for the slot storage backends.
//!
//! This module defines structured error types for slot operations,
//! providing better error context and type safety compared to string-based errors.

use thiserror::Error;

/// Errors that can occur while reading or writing storage slots.
///
/// # Stability
///
/// - New variants may be added in minor versions (enum is `#[non_exhaustive]`)
/// - Existing variants will not be removed in minor versions
/// - Helper methods like `is_*()` provide stable APIs
#[non_exhaustive]
#[derive(Debug, Error)]
pub enum BackendError {
    /// The slot has never been written.
    #[error("Slot not present: {key}")]
    NotPresent {
        /// The key of the slot that was not found
        key: String,
    },

    /// A slot held a value that could not be coerced to the expected type.
    #[error("Corrupt value in slot '{key}': expected {expected}: {reason}")]
    ValueCorrupt {
        /// The key of the offending slot
        key: String,
        /// The type the caller asked for
        expected: &'static str,
        /// Why the coercion failed
        reason: String,
    },

    /// Serialization of a structured slot value failed.
    #[error("Serialization failed for slot '{key}'")]
    SerializationFailed {
        /// The key of the slot being written
        key: String,
        /// The underlying serialization error
        #[source]
        source: serde_json::Error,
    },

    /// File I/O error while persisting or loading a backend.
    #[error("File I/O error")]
    FileIo {
        /// The underlying I/O error
        #[source]
        source: std::io::Error,
    },
}

impl BackendError {
    /// Check if this error indicates the slot was never written.
    pub fn is_not_present(&self) -> bool {
        matches!(self, BackendError::NotPresent { .. })
    }

    /// Check if this error indicates a malformed persisted value.
    pub fn is_corrupt(&self) -> bool {
        matches!(self, BackendError::ValueCorrupt { .. })
    }

    /// Check if this error is related to I/O or serialization.
    pub fn is_io_error(&self) -> bool {
        matches!(
            self,
            BackendError::FileIo { .. } | BackendError::SerializationFailed { .. }
        )
    }

    /// Get the slot key if this error is about a specific slot.
    pub fn key(&self) -> Option<&str> {
        match self {
            BackendError::NotPresent { key }
            | BackendError::ValueCorrupt { key, .. }
            | BackendError::SerializationFailed { key, .. } => Some(key),
            BackendError::FileIo { .. } => None,
        }
    }
}

// Conversion from BackendError to the main Error type
impl From<BackendError> for crate::Error {
    fn from(err: BackendError) -> Self {
        crate::Error::Backend(err)
    }
}
