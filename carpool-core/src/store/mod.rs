//! Keyed document storage with live subscriptions.
//!
//! A [`DocumentStore`] holds JSON documents grouped into named collections.
//! Callers read and write by `(collection, id)` and may subscribe to a
//! [`Query`]; listeners receive the full matching snapshot immediately and
//! again after every change to the queried collection.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::{Arc, Mutex, Weak};

use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use thiserror::Error;

mod memory;
#[cfg(feature = "store-sqlite")]
mod sqlite;

pub use memory::MemoryDocumentStore;
#[cfg(feature = "store-sqlite")]
pub use sqlite::SqliteDocumentStore;

/// A document and its identifier within a collection.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StoredDocument {
    /// Identifier, unique within the collection.
    pub id: String,
    /// Document body.
    pub data: Value,
}

/// Callback invoked with the current snapshot of a query.
pub type Listener = Box<dyn Fn(&[StoredDocument]) + Send + Sync>;

/// Selects documents of one collection whose fields equal given values.
///
/// Field names may use dots to reach into nested objects.
///
/// # Examples
/// ```
/// use carpool_core::Query;
/// use serde_json::json;
///
/// let query = Query::collection("routes").where_eq("driver.name", "Ana");
/// assert!(query.matches(&json!({ "driver": { "name": "Ana" } })));
/// assert!(!query.matches(&json!({ "driver": { "name": "Ben" } })));
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct Query {
    collection: String,
    filters: Vec<(String, Value)>,
}

impl Query {
    /// Select every document of `collection`.
    #[must_use]
    pub fn collection(name: impl Into<String>) -> Self {
        Self {
            collection: name.into(),
            filters: Vec::new(),
        }
    }

    /// Additionally require `field` to equal `value`.
    #[must_use]
    pub fn where_eq(mut self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.filters.push((field.into(), value.into()));
        self
    }

    /// Collection the query reads.
    #[must_use]
    pub fn collection_name(&self) -> &str {
        &self.collection
    }

    /// Whether `document` satisfies every filter.
    #[must_use]
    pub fn matches(&self, document: &Value) -> bool {
        self.filters
            .iter()
            .all(|(field, expected)| document.pointer(&field_pointer(field)) == Some(expected))
    }
}

/// JSON pointer for a dotted field path. `~` and `/` inside a segment are
/// escaped so they match literally.
fn field_pointer(field: &str) -> String {
    field.split('.').fold(String::new(), |mut pointer, segment| {
        pointer.push('/');
        pointer.push_str(&segment.replace('~', "~0").replace('/', "~1"));
        pointer
    })
}

/// Errors raised by document stores.
#[derive(Debug, Error)]
pub enum StoreError {
    /// A writer panicked while holding the store lock.
    #[error("document store lock was poisoned")]
    Poisoned,
    /// A typed value could not be encoded as JSON.
    #[error("failed to encode document {collection}/{id}: {source}")]
    Encode {
        /// Collection written.
        collection: String,
        /// Document identifier.
        id: String,
        /// Encoder failure.
        #[source]
        source: serde_json::Error,
    },
    /// A stored document did not decode into the requested type.
    #[error("failed to decode document {collection}/{id}: {source}")]
    Decode {
        /// Collection read.
        collection: String,
        /// Document identifier.
        id: String,
        /// Decoder failure.
        #[source]
        source: serde_json::Error,
    },
    /// Opening the `SQLite` database failed.
    #[cfg(feature = "store-sqlite")]
    #[error("failed to open document database at {path}: {source}")]
    Open {
        /// Location of the database on disk.
        path: std::path::PathBuf,
        /// Source error returned by `rusqlite`.
        #[source]
        source: rusqlite::Error,
    },
    /// Generic `SQLite` failure.
    #[cfg(feature = "store-sqlite")]
    #[error(transparent)]
    Database(#[from] rusqlite::Error),
}

/// Keyed JSON document storage with push-on-change subscriptions.
///
/// Implementations order query results by document identifier.
pub trait DocumentStore: Send + Sync {
    /// Read one document.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when the backend fails.
    fn get(&self, collection: &str, id: &str) -> Result<Option<Value>, StoreError>;

    /// Create or replace one document, then notify subscribers of
    /// `collection`.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when the backend fails.
    fn set(&self, collection: &str, id: &str, document: Value) -> Result<(), StoreError>;

    /// Remove one document, returning whether it existed.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when the backend fails.
    fn delete(&self, collection: &str, id: &str) -> Result<bool, StoreError>;

    /// Documents matching `query`, ordered by identifier.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when the backend fails.
    fn query(&self, query: &Query) -> Result<Vec<StoredDocument>, StoreError>;

    /// Deliver the snapshot of `query` to `listener` now and after every
    /// change to its collection, until the returned [`Subscription`] is
    /// unsubscribed or dropped.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when the initial snapshot cannot be read.
    fn subscribe(&self, query: Query, listener: Listener) -> Result<Subscription, StoreError>;
}

/// Typed helpers over [`DocumentStore`].
pub trait DocumentStoreExt: DocumentStore {
    /// Serialise `value` and store it.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Encode`] when serialisation fails.
    fn put<T: Serialize + ?Sized>(
        &self,
        collection: &str,
        id: &str,
        value: &T,
    ) -> Result<(), StoreError> {
        let document = serde_json::to_value(value).map_err(|source| StoreError::Encode {
            collection: collection.to_owned(),
            id: id.to_owned(),
            source,
        })?;
        self.set(collection, id, document)
    }

    /// Read a document and deserialise it.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Decode`] when the document has the wrong shape.
    fn fetch<T: DeserializeOwned>(&self, collection: &str, id: &str) -> Result<Option<T>, StoreError> {
        self.get(collection, id)?
            .map(|document| {
                serde_json::from_value(document).map_err(|source| StoreError::Decode {
                    collection: collection.to_owned(),
                    id: id.to_owned(),
                    source,
                })
            })
            .transpose()
    }
}

impl<S: DocumentStore + ?Sized> DocumentStoreExt for S {}

type SharedListener = Arc<dyn Fn(&[StoredDocument]) + Send + Sync>;

#[derive(Default)]
struct Registry {
    next_id: u64,
    entries: BTreeMap<u64, (Query, SharedListener)>,
}

/// Subscriber bookkeeping shared by the bundled stores.
#[derive(Clone, Default)]
pub(crate) struct Subscribers {
    registry: Arc<Mutex<Registry>>,
}

impl fmt::Debug for Subscribers {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let count = self.registry.lock().map_or(0, |registry| registry.entries.len());
        f.debug_struct("Subscribers")
            .field("active", &count)
            .finish()
    }
}

impl Subscribers {
    /// Register `listener`, deliver `snapshot` to it and return the handle.
    pub(crate) fn add(
        &self,
        query: Query,
        listener: Listener,
        snapshot: &[StoredDocument],
    ) -> Result<Subscription, StoreError> {
        let listener: SharedListener = Arc::from(listener);
        let id = {
            let mut registry = self.registry.lock().map_err(|_| StoreError::Poisoned)?;
            registry.next_id += 1;
            let id = registry.next_id;
            registry.entries.insert(id, (query, Arc::clone(&listener)));
            id
        };
        listener(snapshot);
        Ok(Subscription {
            id,
            registry: Arc::downgrade(&self.registry),
        })
    }

    /// Re-run every query on `collection` and deliver the results.
    ///
    /// Listeners run without the registry lock held, so they may call back
    /// into the store.
    pub(crate) fn notify<F>(&self, collection: &str, run: F)
    where
        F: Fn(&Query) -> Result<Vec<StoredDocument>, StoreError>,
    {
        let targets: Vec<(Query, SharedListener)> = match self.registry.lock() {
            Ok(registry) => registry
                .entries
                .values()
                .filter(|(query, _)| query.collection_name() == collection)
                .map(|(query, listener)| (query.clone(), Arc::clone(listener)))
                .collect(),
            Err(_) => {
                log::warn!("subscriber registry poisoned; skipping notifications");
                return;
            }
        };
        for (query, listener) in targets {
            match run(&query) {
                Ok(snapshot) => listener(&snapshot),
                Err(err) => log::warn!("failed to refresh subscription on {collection}: {err}"),
            }
        }
    }
}

/// Handle for an active subscription. Dropping it unsubscribes.
#[must_use = "dropping a subscription stops delivery"]
#[derive(Debug)]
pub struct Subscription {
    id: u64,
    registry: Weak<Mutex<Registry>>,
}

impl Subscription {
    /// Stop delivering snapshots.
    pub fn unsubscribe(self) {
        drop(self);
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(registry) = self.registry.upgrade()
            && let Ok(mut guard) = registry.lock()
        {
            guard.entries.remove(&self.id);
        }
    }
}

impl fmt::Debug for Registry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Registry")
            .field("entries", &self.entries.len())
            .finish_non_exhaustive()
    }
}
