//! Error types for the store facade.

use thiserror::Error;

/// Errors raised by collection-level operations.
///
/// Lookup misses are not represented here; they surface as the not-found
/// sentinel (`None` / empty vec) from the operation itself.
#[non_exhaustive]
#[derive(Debug, Error)]
pub enum StoreError {
    /// A typed record serialized to something other than a JSON object.
    #[error("Documents must serialize to objects, found {found}")]
    DocumentNotObject {
        /// JSON kind of the rejected value
        found: &'static str,
    },

    /// The persisted blob holds a document whose `_id` disagrees with its key.
    #[error("Corrupt document in collection '{collection}': stored under '{key}' but carries id '{id}'")]
    CorruptDocument {
        /// The collection the document was found in
        collection: String,
        /// The key the document is stored under
        key: String,
        /// The `_id` the document actually carries
        id: String,
    },
}

impl StoreError {
    /// Check if this error indicates a malformed persisted blob.
    pub fn is_corrupt(&self) -> bool {
        matches!(self, StoreError::CorruptDocument { .. })
    }
}

impl From<StoreError> for crate::Error {
    fn from(err: StoreError) -> Self {
        crate::Error::Store(err)
    }
}
