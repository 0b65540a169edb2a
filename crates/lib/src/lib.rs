//!
//! slotdb: an embedded document store persisted as a single blob inside a
//! shared, string-keyed key-value slot.
//!
//! ## Core Concepts
//!
//! * **Backends ([`Backend`])**: a pluggable flat slot namespace — the only
//!   storage primitive is typed get/set/has on named slots.
//! * **The blob**: the entire state — every collection and its documents —
//!   is serialized into one `Documents` slot, alongside `LastUpdate`,
//!   `LastUpdater`, and `Locked` bookkeeping slots.
//! * **Documents ([`Document`])**: open key/value records identified by a
//!   generated `_id`, unique within their collection.
//! * **Collections ([`Collection`])**: handles bound to one collection name.
//!   Each handle is an independent *instance* with a random id and a cached
//!   copy of the blob, resynchronized whenever another instance wrote last.
//! * **Locking ([`lock::SlotLock`])**: cooperative mutual exclusion over a
//!   shared boolean slot — poll until clear, claim, persist, release. There
//!   is no compare-and-swap and no ownership token; the residual races are
//!   documented limitations, not bugs to paper over.
//! * **Queries ([`Query`], [`Patch`])**: per-field predicates with
//!   comparison (`$ge`, `$le`), membership (`$includes`), and pattern
//!   (`$regex`) operators, plus the write-time merge directives `$append`
//!   and `$remove`.

pub mod backend;
pub mod clock;
pub mod constants;
pub mod document;
pub mod lock;
pub mod query;
pub mod store;

pub use backend::{Backend, BackendError, InMemory, Slots};
#[cfg(any(test, feature = "testing"))]
pub use clock::FixedClock;
pub use clock::{Clock, SystemClock};
pub use document::{CollectionData, Collections, Document, Fields};
pub use lock::{LockError, LockSettings};
pub use query::{Patch, Query, QueryError};
pub use store::{Collection, Store, StoreError};

/// Result type used throughout the slotdb library.
pub type Result<T> = std::result::Result<T, Error>;

/// Common error type for the slotdb library.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Serialization error: {0}")]
    Serialize(#[from] serde_json::Error),

    /// Structured slot storage errors from the backend module
    #[error(transparent)]
    Backend(BackendError),

    /// Structured lock acquisition errors from the lock module
    #[error(transparent)]
    Lock(LockError),

    /// Structured predicate/patch errors from the query module
    #[error(transparent)]
    Query(QueryError),

    /// Structured facade errors from the store module
    #[error(transparent)]
    Store(StoreError),
}

impl Error {
    /// Get the originating module for this error.
    pub fn module(&self) -> &'static str {
        match self {
            Error::Serialize(_) => "serialize",
            Error::Backend(_) => "backend",
            Error::Lock(_) => "lock",
            Error::Query(_) => "query",
            Error::Store(_) => "store",
        }
    }

    /// Check if this error indicates a slot was never written.
    ///
    /// Lookup misses on documents are not errors at all; they surface as
    /// the not-found sentinel (`None` / empty vec).
    pub fn is_not_found(&self) -> bool {
        match self {
            Error::Backend(backend_err) => backend_err.is_not_present(),
            _ => false,
        }
    }

    /// Check if this error indicates a malformed persisted value.
    pub fn is_corrupt(&self) -> bool {
        match self {
            Error::Backend(backend_err) => backend_err.is_corrupt(),
            Error::Store(store_err) => store_err.is_corrupt(),
            _ => false,
        }
    }

    /// Check if this error indicates lock acquisition timed out.
    pub fn is_timeout(&self) -> bool {
        match self {
            Error::Lock(lock_err) => lock_err.is_timeout(),
            _ => false,
        }
    }

    /// Check if this error indicates an operator/field type violation.
    pub fn is_type_mismatch(&self) -> bool {
        match self {
            Error::Query(query_err) => query_err.is_type_mismatch(),
            _ => false,
        }
    }

    /// Check if this error indicates an unsupported operator key.
    pub fn is_unknown_operator(&self) -> bool {
        match self {
            Error::Query(query_err) => query_err.is_unknown_operator(),
            _ => false,
        }
    }

    /// Check if this error is I/O related.
    pub fn is_io_error(&self) -> bool {
        match self {
            Error::Backend(backend_err) => backend_err.is_io_error(),
            _ => false,
        }
    }
}
