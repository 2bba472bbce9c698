//! SQLite-backed document store.

use std::fmt;
use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use rusqlite::{Connection, OptionalExtension, params};
use serde_json::Value;

use super::{DocumentStore, Listener, Query, StoreError, StoredDocument, Subscribers, Subscription};

const SCHEMA_SQL: &str = "CREATE TABLE IF NOT EXISTS documents (
    collection TEXT NOT NULL,
    id TEXT NOT NULL,
    body TEXT NOT NULL,
    PRIMARY KEY (collection, id)
)";

/// Document store persisted in a single `SQLite` table.
///
/// Subscriptions are process-local: only writes made through this handle
/// notify its subscribers.
pub struct SqliteDocumentStore {
    connection: Mutex<Connection>,
    subscribers: Subscribers,
}

impl fmt::Debug for SqliteDocumentStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SqliteDocumentStore")
            .field("subscribers", &self.subscribers)
            .finish_non_exhaustive()
    }
}

impl SqliteDocumentStore {
    /// Open or create a store at `path`.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Open`] when the database cannot be opened and
    /// [`StoreError::Database`] when the schema cannot be created.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let path = path.as_ref();
        let connection = Connection::open(path).map_err(|source| StoreError::Open {
            path: path.to_path_buf(),
            source,
        })?;
        Self::with_connection(connection)
    }

    /// Create a store backed by a private in-memory database.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Database`] when the schema cannot be created.
    pub fn in_memory() -> Result<Self, StoreError> {
        Self::with_connection(Connection::open_in_memory()?)
    }

    fn with_connection(connection: Connection) -> Result<Self, StoreError> {
        connection.execute(SCHEMA_SQL, [])?;
        Ok(Self {
            connection: Mutex::new(connection),
            subscribers: Subscribers::default(),
        })
    }

    fn connection(&self) -> Result<MutexGuard<'_, Connection>, StoreError> {
        self.connection.lock().map_err(|_| StoreError::Poisoned)
    }
}

fn decode(collection: &str, id: String, body: &str) -> Result<StoredDocument, StoreError> {
    match serde_json::from_str(body) {
        Ok(data) => Ok(StoredDocument { id, data }),
        Err(source) => Err(StoreError::Decode {
            collection: collection.to_owned(),
            id,
            source,
        }),
    }
}

impl DocumentStore for SqliteDocumentStore {
    fn get(&self, collection: &str, id: &str) -> Result<Option<Value>, StoreError> {
        let body: Option<String> = self
            .connection()?
            .query_row(
                "SELECT body FROM documents WHERE collection = ?1 AND id = ?2",
                params![collection, id],
                |row| row.get(0),
            )
            .optional()?;
        body.map(|text| decode(collection, id.to_owned(), &text).map(|doc| doc.data))
            .transpose()
    }

    fn set(&self, collection: &str, id: &str, document: Value) -> Result<(), StoreError> {
        let body = document.to_string();
        self.connection()?.execute(
            "INSERT INTO documents (collection, id, body) VALUES (?1, ?2, ?3)
             ON CONFLICT (collection, id) DO UPDATE SET body = excluded.body",
            params![collection, id, body],
        )?;
        self.subscribers.notify(collection, |query| self.query(query));
        Ok(())
    }

    fn delete(&self, collection: &str, id: &str) -> Result<bool, StoreError> {
        let removed = self.connection()?.execute(
            "DELETE FROM documents WHERE collection = ?1 AND id = ?2",
            params![collection, id],
        )?;
        if removed > 0 {
            self.subscribers.notify(collection, |query| self.query(query));
        }
        Ok(removed > 0)
    }

    fn query(&self, query: &Query) -> Result<Vec<StoredDocument>, StoreError> {
        let collection = query.collection_name();
        let connection = self.connection()?;
        let mut statement = connection
            .prepare_cached("SELECT id, body FROM documents WHERE collection = ?1 ORDER BY id")?;
        let mut rows = statement.query(params![collection])?;
        let mut documents = Vec::new();
        while let Some(row) = rows.next()? {
            let id: String = row.get(0)?;
            let body: String = row.get(1)?;
            let document = decode(collection, id, &body)?;
            if query.matches(&document.data) {
                documents.push(document);
            }
        }
        Ok(documents)
    }

    fn subscribe(&self, query: Query, listener: Listener) -> Result<Subscription, StoreError> {
        let snapshot = self.query(&query)?;
        self.subscribers.add(query, listener, &snapshot)
    }
}
