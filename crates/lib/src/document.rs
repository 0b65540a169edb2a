//!
//! Defines the fundamental data unit (`Document`) and the collections blob
//! it is persisted inside.
//!
//! A document is an open key/value record identified by a generated `_id`
//! field that is unique within its collection. The whole store is persisted
//! as one blob: a mapping from collection name to documents keyed by id.

use std::collections::BTreeMap;

use rand::RngCore;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::constants::{DOC_ID_LEN, ID_FIELD};

/// The raw field map of a document.
pub type Fields = serde_json::Map<String, Value>;

/// All documents of one collection, keyed by document id.
pub type CollectionData = BTreeMap<String, Document>;

/// The full persisted blob: collection name to collection contents.
///
/// `BTreeMap` keeps the serialized encoding deterministic; the store makes
/// no ordering promise beyond what a scan happens to produce.
pub type Collections = BTreeMap<String, CollectionData>;

/// A schema-less record uniquely identified by `_id` within its collection.
///
/// Documents are created by `insert`, mutated by `update`, and destroyed by
/// `remove`. The `_id` field is attached by the store at insert time and is
/// authoritative: it always mirrors the key the document is stored under.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Document {
    fields: Fields,
}

impl Document {
    /// Build a document by attaching the given id to a partial field map.
    ///
    /// Any `_id` the caller supplied is replaced; the generated id is the
    /// only accepted primary key.
    pub(crate) fn with_id(id: impl Into<String>, mut fields: Fields) -> Self {
        fields.insert(ID_FIELD.to_string(), Value::String(id.into()));
        Self { fields }
    }

    /// The document's primary key.
    ///
    /// Empty only for a malformed persisted blob, which the store rejects
    /// when it reloads its cache.
    pub fn id(&self) -> &str {
        self.fields
            .get(ID_FIELD)
            .and_then(Value::as_str)
            .unwrap_or("")
    }

    /// Look up a field value.
    pub fn get(&self, field: &str) -> Option<&Value> {
        self.fields.get(field)
    }

    /// Whether the document carries the given field.
    pub fn contains(&self, field: &str) -> bool {
        self.fields.contains_key(field)
    }

    /// Borrow the underlying field map.
    pub fn fields(&self) -> &Fields {
        &self.fields
    }

    pub(crate) fn fields_mut(&mut self) -> &mut Fields {
        &mut self.fields
    }

    /// Consume the document, yielding its field map.
    pub fn into_fields(self) -> Fields {
        self.fields
    }

    /// Deserialize the document into a typed record.
    pub fn to_record<T: for<'de> Deserialize<'de>>(&self) -> crate::Result<T> {
        serde_json::from_value(Value::Object(self.fields.clone())).map_err(Into::into)
    }
}

/// Generate a candidate document id: a fixed-length random hex token.
///
/// Collision handling is the caller's job; the store regenerates until the
/// token is unique within the target collection.
pub(crate) fn generate_id() -> String {
    let mut bytes = [0u8; DOC_ID_LEN / 2];
    rand::thread_rng().fill_bytes(&mut bytes);
    hex::encode(bytes)
}
