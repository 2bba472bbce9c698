//! In-process document store.

use std::collections::BTreeMap;
use std::sync::Mutex;

use serde_json::Value;

use super::{DocumentStore, Listener, Query, StoreError, StoredDocument, Subscribers, Subscription};

type Collections = BTreeMap<String, BTreeMap<String, Value>>;

/// Document store held entirely in memory.
///
/// # Examples
/// ```
/// use carpool_core::{DocumentStore, MemoryDocumentStore};
/// use serde_json::json;
///
/// let store = MemoryDocumentStore::default();
/// store.set("groups", "g1", json!({ "name": "Morning run" }))?;
/// assert_eq!(store.get("groups", "g1")?, Some(json!({ "name": "Morning run" })));
/// # Ok::<(), carpool_core::StoreError>(())
/// ```
#[derive(Debug, Default)]
pub struct MemoryDocumentStore {
    collections: Mutex<Collections>,
    subscribers: Subscribers,
}

impl MemoryDocumentStore {
    fn read<T>(&self, f: impl FnOnce(&Collections) -> T) -> Result<T, StoreError> {
        let guard = self.collections.lock().map_err(|_| StoreError::Poisoned)?;
        Ok(f(&guard))
    }

    fn write<T>(&self, f: impl FnOnce(&mut Collections) -> T) -> Result<T, StoreError> {
        let mut guard = self.collections.lock().map_err(|_| StoreError::Poisoned)?;
        Ok(f(&mut guard))
    }
}

impl DocumentStore for MemoryDocumentStore {
    fn get(&self, collection: &str, id: &str) -> Result<Option<Value>, StoreError> {
        self.read(|collections| {
            collections
                .get(collection)
                .and_then(|documents| documents.get(id))
                .cloned()
        })
    }

    fn set(&self, collection: &str, id: &str, document: Value) -> Result<(), StoreError> {
        self.write(|collections| {
            collections
                .entry(collection.to_owned())
                .or_default()
                .insert(id.to_owned(), document);
        })?;
        self.subscribers.notify(collection, |query| self.query(query));
        Ok(())
    }

    fn delete(&self, collection: &str, id: &str) -> Result<bool, StoreError> {
        let removed = self.write(|collections| {
            collections
                .get_mut(collection)
                .is_some_and(|documents| documents.remove(id).is_some())
        })?;
        if removed {
            self.subscribers.notify(collection, |query| self.query(query));
        }
        Ok(removed)
    }

    fn query(&self, query: &Query) -> Result<Vec<StoredDocument>, StoreError> {
        self.read(|collections| {
            collections
                .get(query.collection_name())
                .map(|documents| {
                    documents
                        .iter()
                        .filter(|(_, data)| query.matches(data))
                        .map(|(id, data)| StoredDocument {
                            id: id.clone(),
                            data: data.clone(),
                        })
                        .collect()
                })
                .unwrap_or_default()
        })
    }

    fn subscribe(&self, query: Query, listener: Listener) -> Result<Subscription, StoreError> {
        let snapshot = self.query(&query)?;
        self.subscribers.add(query, listener, &snapshot)
    }
}
