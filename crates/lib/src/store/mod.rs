//! The public store facade.
//!
//! [`Store`] owns the shared slot namespace and hands out [`Collection`]
//! handles, each bound to one collection name. A handle is an *instance* in
//! the storage protocol: it carries a random unique instance id, a cached
//! copy of the persisted blob, and a cached last-updated timestamp.
//!
//! Every public operation resynchronizes the cache first: if the shared
//! `LastUpdater` slot names a different instance, the blob is reloaded from
//! storage before the operation proceeds. Mutations additionally claim the
//! cooperative lock, persist the entire blob, and release the lock.
//!
//! A persistence failure mid-mutation leaves the in-memory cache ahead of
//! the persisted blob until the next successful write. That inconsistency
//! window is a documented tradeoff of the single-blob design; the store
//! reports the error and does not roll the cache back.

use std::sync::Arc;

use serde::Serialize;
use serde_json::{Value, json};
use tokio::sync::Mutex;
use tracing::{debug, trace, warn};
use uuid::Uuid;

use crate::backend::{Backend, Slots};
use crate::clock::{Clock, SystemClock};
use crate::constants::{DOCUMENTS, ID_FIELD, LAST_UPDATE, LAST_UPDATER};
use crate::document::{Collections, Document, Fields, generate_id};
use crate::lock::{LockSettings, SlotLock};
use crate::query::{Patch, Query, kind_of};
use crate::Result;

pub mod errors;
pub use errors::StoreError;

/// Entry point to a shared slot namespace.
///
/// A `Store` is cheap to clone and carries no cache of its own; caching and
/// locking state live in the [`Collection`] handles it opens.
///
/// # Example
///
/// ```
/// use std::sync::Arc;
/// use serde_json::json;
/// use slotdb::{InMemory, Store};
///
/// # async fn demo() -> slotdb::Result<()> {
/// let store = Store::open(Arc::new(InMemory::new()));
/// store.clear_locks().await?; // startup recovery
///
/// let notes = store.open_collection("stickynotes");
/// let note = notes.insert_value(json!({"content": "hello"})).await?;
/// let found = notes.find_one(&json!({"_id": note.id()})).await?;
/// assert_eq!(found.as_ref(), Some(&note));
/// # Ok(())
/// # }
/// ```
#[derive(Clone, Debug)]
pub struct Store {
    slots: Slots,
    clock: Arc<dyn Clock>,
    lock_settings: LockSettings,
}

impl Store {
    /// Open a store over the given backend with the system clock.
    pub fn open(backend: Arc<dyn Backend>) -> Self {
        Self::open_impl(backend, Arc::new(SystemClock))
    }

    /// Open a store with an injected time provider.
    ///
    /// Testing hook: lets tests pin the `LastUpdate` bookkeeping to a
    /// controllable clock.
    #[cfg(any(test, feature = "testing"))]
    pub fn open_with_clock(backend: Arc<dyn Backend>, clock: Arc<dyn Clock>) -> Self {
        Self::open_impl(backend, clock)
    }

    fn open_impl(backend: Arc<dyn Backend>, clock: Arc<dyn Clock>) -> Self {
        Self {
            slots: Slots::new(backend),
            clock,
            lock_settings: LockSettings::default(),
        }
    }

    /// Override the lock polling interval and timeout.
    pub fn with_lock_settings(mut self, settings: LockSettings) -> Self {
        self.lock_settings = settings;
        self
    }

    /// The wrapped backend.
    pub fn backend(&self) -> &Arc<dyn Backend> {
        self.slots.backend()
    }

    /// Bind a handle to one collection name.
    ///
    /// Each call produces an independent instance with its own random
    /// instance id and its own cache; two handles in one process
    /// coordinate through the shared slots exactly like two tabs would.
    /// The collection itself is created lazily on first write.
    pub fn open_collection(&self, name: impl Into<String>) -> Collection {
        Collection {
            name: name.into(),
            instance_id: Uuid::new_v4().to_string(),
            slots: self.slots.clone(),
            clock: self.clock.clone(),
            lock: SlotLock::new(self.slots.clone(), self.lock_settings),
            cache: Mutex::new(BlobCache::default()),
        }
    }

    /// Startup-only recovery: unconditionally clear the shared lock flag.
    ///
    /// Intended for recovery from a holder that crashed while holding the
    /// lock. There is no ownership token, so this cannot distinguish a stale
    /// flag from a live one; never call it during normal operation.
    pub async fn clear_locks(&self) -> Result<()> {
        SlotLock::new(self.slots.clone(), self.lock_settings)
            .force_clear()
            .await
    }
}

/// Per-instance cached view of the persisted blob.
#[derive(Debug, Default)]
struct BlobCache {
    collections: Collections,
    last_update: u64,
}

/// A handle bound to one collection name.
///
/// Provides the CRUD surface: [`insert`], [`find`], [`find_one`],
/// [`update`], [`update_one`], [`remove`], [`remove_one`]. All operations
/// resync the cached blob first; mutations persist the whole blob under the
/// cooperative lock.
///
/// The handle is `Send + Sync`; operations on one handle serialize on its
/// internal cache, while independent handles interleave at await points and
/// coordinate through the shared slots.
///
/// [`insert`]: Collection::insert
/// [`find`]: Collection::find
/// [`find_one`]: Collection::find_one
/// [`update`]: Collection::update
/// [`update_one`]: Collection::update_one
/// [`remove`]: Collection::remove
/// [`remove_one`]: Collection::remove_one
#[derive(Debug)]
pub struct Collection {
    name: String,
    instance_id: String,
    slots: Slots,
    clock: Arc<dyn Clock>,
    lock: SlotLock,
    cache: Mutex<BlobCache>,
}

impl Collection {
    /// The collection name this handle is bound to.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// This handle's random unique instance id.
    pub fn instance_id(&self) -> &str {
        &self.instance_id
    }

    /// The cached timestamp of the last observed successful write.
    pub async fn last_update(&self) -> u64 {
        self.cache.lock().await.last_update
    }

    /// Insert a new document built from the given fields.
    ///
    /// Generates a fixed-length random hex id, regenerating on collision
    /// with any existing id in the collection, attaches it as `_id`, and
    /// persists the whole blob under the lock. Returns the stored document.
    ///
    /// On persistence failure the lock is released and the error surfaces;
    /// the in-memory cache keeps the inserted document (no rollback).
    pub async fn insert(&self, fields: Fields) -> Result<Document> {
        let mut guard = self.cache.lock().await;
        let cache = &mut *guard;
        self.resync(cache).await?;

        let collection = cache.collections.entry(self.name.clone()).or_default();
        let mut id = generate_id();
        while collection.contains_key(&id) {
            id = generate_id();
        }
        let doc = Document::with_id(id.clone(), fields);
        collection.insert(id, doc.clone());

        self.persist_under_lock(cache).await?;
        Ok(doc)
    }

    /// Insert any serializable record as a document.
    ///
    /// The record must serialize to a JSON object; anything else fails with
    /// [`StoreError::DocumentNotObject`].
    pub async fn insert_value(&self, record: impl Serialize) -> Result<Document> {
        let value = serde_json::to_value(record)?;
        match value {
            Value::Object(fields) => self.insert(fields).await,
            other => Err(StoreError::DocumentNotObject {
                found: kind_of(&other),
            }
            .into()),
        }
    }

    /// Find all documents matching the predicate, in scan order.
    ///
    /// Scan order carries no meaning; the store makes no ordering promise
    /// among documents. A predicate that matches nothing yields an empty
    /// vec, and an evaluation error aborts the whole call.
    pub async fn find(&self, predicate: &Value) -> Result<Vec<Document>> {
        let query = Query::parse(predicate)?;
        let mut guard = self.cache.lock().await;
        let cache = &mut *guard;
        self.resync(cache).await?;

        let Some(collection) = cache.collections.get(&self.name) else {
            return Ok(Vec::new());
        };
        trace!(collection = %self.name, documents = collection.len(), "scanning");
        let mut matched = Vec::new();
        for doc in collection.values() {
            if query.matches(doc)? {
                matched.push(doc.clone());
            }
        }
        Ok(matched)
    }

    /// First document matching the predicate, or `None`.
    pub async fn find_one(&self, predicate: &Value) -> Result<Option<Document>> {
        Ok(self.find(predicate).await?.into_iter().next())
    }

    /// Shallow-merge a patch into every document matching the predicate.
    ///
    /// Honors the `$append`/`$remove` merge directives. Returns the updated
    /// documents, or an empty vec if nothing matched (a miss is not an
    /// error).
    pub async fn update(&self, predicate: &Value, patch: &Value) -> Result<Vec<Document>> {
        let query = Query::parse(predicate)?;
        let patch = Patch::parse(patch)?;
        let mut guard = self.cache.lock().await;
        let cache = &mut *guard;
        self.resync(cache).await?;

        let updated = {
            let Some(collection) = cache.collections.get_mut(&self.name) else {
                return Ok(Vec::new());
            };
            let mut ids = Vec::new();
            for (id, doc) in collection.iter() {
                if query.matches(doc)? {
                    ids.push(id.clone());
                }
            }
            if ids.is_empty() {
                return Ok(Vec::new());
            }
            let mut updated = Vec::with_capacity(ids.len());
            for id in &ids {
                if let Some(doc) = collection.get_mut(id) {
                    patch.apply(doc)?;
                    updated.push(doc.clone());
                }
            }
            updated
        };

        self.persist_under_lock(cache).await?;
        Ok(updated)
    }

    /// Shallow-merge a patch into the first document matching the predicate.
    ///
    /// Returns the updated document, or `None` if nothing matched.
    pub async fn update_one(&self, predicate: &Value, patch: &Value) -> Result<Option<Document>> {
        let query = Query::parse(predicate)?;
        let patch = Patch::parse(patch)?;
        let mut guard = self.cache.lock().await;
        let cache = &mut *guard;
        self.resync(cache).await?;

        let updated = {
            let Some(collection) = cache.collections.get_mut(&self.name) else {
                return Ok(None);
            };
            let mut target = None;
            for (id, doc) in collection.iter() {
                if query.matches(doc)? {
                    target = Some(id.clone());
                    break;
                }
            }
            let Some(id) = target else {
                return Ok(None);
            };
            match collection.get_mut(&id) {
                Some(doc) => {
                    patch.apply(doc)?;
                    doc.clone()
                }
                None => return Ok(None),
            }
        };

        self.persist_under_lock(cache).await?;
        Ok(Some(updated))
    }

    /// Remove every document matching the predicate.
    ///
    /// Computes the target ids, claims the lock, deletes them from the
    /// cached collection, persists, and releases. Returns the removed
    /// documents. The same persistence-failure caveat as [`insert`] applies:
    /// deleted entries are not restored in the cache.
    ///
    /// [`insert`]: Collection::insert
    pub async fn remove(&self, predicate: &Value) -> Result<Vec<Document>> {
        let query = Query::parse(predicate)?;
        let mut guard = self.cache.lock().await;
        let cache = &mut *guard;
        self.resync(cache).await?;

        let ids = {
            let Some(collection) = cache.collections.get(&self.name) else {
                return Ok(Vec::new());
            };
            let mut ids = Vec::new();
            for (id, doc) in collection.iter() {
                if query.matches(doc)? {
                    ids.push(id.clone());
                }
            }
            ids
        };
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        self.lock.claim().await?;
        let mut removed = Vec::with_capacity(ids.len());
        if let Some(collection) = cache.collections.get_mut(&self.name) {
            for id in &ids {
                if let Some(doc) = collection.remove(id) {
                    removed.push(doc);
                }
            }
        }
        let persisted = self.persist(cache).await;
        let released = self.lock.release().await;
        if let Err(error) = &persisted {
            warn!(collection = %self.name, %error, "persistence failed; cache is ahead of the persisted blob");
        }
        persisted?;
        released?;
        Ok(removed)
    }

    /// Remove the first document matching the predicate.
    ///
    /// Resolves a single match, then delegates to [`remove`] scoped to its
    /// id. Returns the removed document, or `None` if nothing matched.
    ///
    /// [`remove`]: Collection::remove
    pub async fn remove_one(&self, predicate: &Value) -> Result<Option<Document>> {
        let Some(target) = self.find_one(predicate).await? else {
            return Ok(None);
        };
        let removed = self.remove(&json!({ ID_FIELD: target.id() })).await?;
        Ok(removed.into_iter().next())
    }

    /// Refresh the cached blob if another instance wrote last.
    ///
    /// Compares the shared `LastUpdater` id with this handle's own. On a
    /// mismatch (or before the first write anywhere) the full blob is
    /// reloaded from storage, created empty if the slot is absent. The
    /// cached last-updated timestamp is refreshed regardless.
    async fn resync(&self, cache: &mut BlobCache) -> Result<()> {
        let own_write = match self.slots.get_text(LAST_UPDATER).await {
            Ok(updater) => updater == self.instance_id,
            Err(e) if e.is_not_found() => false,
            Err(e) => return Err(e),
        };
        if !own_write {
            cache.collections = if self.slots.has(DOCUMENTS).await? {
                let collections: Collections = self.slots.get_record(DOCUMENTS).await?;
                validate_blob(&collections)?;
                collections
            } else {
                // First access anywhere: the blob is created lazily
                Collections::new()
            };
            debug!(collection = %self.name, "cache reloaded after foreign write");
        }
        cache.last_update = match self.slots.get_millis(LAST_UPDATE).await {
            Ok(ts) => ts,
            Err(e) if e.is_not_found() => 0,
            Err(e) => return Err(e),
        };
        Ok(())
    }

    /// Write the whole blob plus bookkeeping. Caller holds the lock.
    async fn persist(&self, cache: &mut BlobCache) -> Result<()> {
        self.slots.set_record(DOCUMENTS, &cache.collections).await?;
        let now = self.clock.now_millis();
        self.slots.set_millis(LAST_UPDATE, now).await?;
        self.slots
            .set_text(LAST_UPDATER, self.instance_id.clone())
            .await?;
        cache.last_update = now;
        debug!(collection = %self.name, last_update = now, "blob persisted");
        Ok(())
    }

    async fn persist_under_lock(&self, cache: &mut BlobCache) -> Result<()> {
        self.lock.claim().await?;
        let persisted = self.persist(cache).await;
        let released = self.lock.release().await;
        if let Err(error) = &persisted {
            warn!(collection = %self.name, %error, "persistence failed; cache is ahead of the persisted blob");
        }
        persisted?;
        released
    }
}

/// Reject a persisted blob whose document ids disagree with their keys.
fn validate_blob(collections: &Collections) -> Result<()> {
    for (name, collection) in collections {
        for (key, doc) in collection {
            if doc.id() != key {
                return Err(StoreError::CorruptDocument {
                    collection: name.clone(),
                    key: key.clone(),
                    id: doc.id().to_string(),
                }
                .into());
            }
        }
    }
    Ok(())
}
