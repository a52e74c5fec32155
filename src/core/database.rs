use std::future::Future;
use serde::Serialize;
use tokio::runtime::Handle;
use tracing::info;
use crate::collection::store::CollectionStore;
use crate::core::completion::{self, Deferred};
use crate::core::config::Config;
use crate::core::error::{Error, ErrorKind, Result};
use crate::core::types::{DocId, Document, Fields};
use crate::query::predicate::Predicate;
use crate::storage::codec::to_fields;

/// Public handle to a document database.
///
/// Every operation starts immediately and returns a [`Deferred`] that settles
/// exactly once. Await it, or pass a callback through [`Deferred::on_settle`].
/// Operations are never cancelled: dropping the `Deferred` only discards the
/// outcome.
pub struct Database {
    config: Config,
    store: CollectionStore,
    runtime: Handle,
}

impl Database {
    /// Opens (and bootstraps) a database on the current tokio runtime.
    pub fn open(config: Config) -> Result<Self> {
        let runtime = Handle::try_current().map_err(|e| {
            Error::with_source(ErrorKind::InvalidState, "a tokio runtime is required", e)
        })?;
        Self::open_with_runtime(config, runtime)
    }

    pub fn open_with_runtime(config: Config, runtime: Handle) -> Result<Self> {
        let store = CollectionStore::new(&config);
        store.bootstrap()?;
        info!(path = %config.storage_path.display(), "database opened");

        Ok(Database { config, store, runtime })
    }

    /// Creates the root directories again if something removed them.
    pub fn bootstrap(&self) -> Result<()> {
        self.store.bootstrap()
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Direct async access to the operations, without the completion wrapper.
    pub fn store(&self) -> &CollectionStore {
        &self.store
    }

    pub fn insert_one<T: Serialize + ?Sized>(&self, collection: &str, document: &T) -> Deferred<DocId> {
        let fields = match to_fields(document) {
            Ok(fields) => fields,
            Err(e) => return self.fail(e),
        };
        let collection = collection.to_string();
        self.dispatch(move |store| async move { store.insert_one(&collection, fields).await })
    }

    /// Best-effort batch insert; see [`CollectionStore::insert_many`].
    pub fn insert_many<T: Serialize>(&self, collection: &str, documents: &[T]) -> Deferred<Vec<DocId>> {
        let batch = match documents.iter().map(to_fields).collect::<Result<Vec<Fields>>>() {
            Ok(batch) => batch,
            Err(e) => return self.fail(e),
        };
        let collection = collection.to_string();
        self.dispatch(move |store| async move { store.insert_many(&collection, batch).await })
    }

    pub fn find(&self, collection: &str, predicate: Predicate) -> Deferred<Vec<Document>> {
        let collection = collection.to_string();
        self.dispatch(move |store| async move { store.find(&collection, &predicate).await })
    }

    pub fn find_by_id(&self, collection: &str, id: &str) -> Deferred<Option<Document>> {
        let collection = collection.to_string();
        let id = id.to_string();
        self.dispatch(move |store| async move { store.find_by_id(&collection, &id).await })
    }

    pub fn find_one(&self, collection: &str, predicate: Predicate) -> Deferred<Option<Document>> {
        let collection = collection.to_string();
        self.dispatch(move |store| async move { store.find_one(&collection, &predicate).await })
    }

    pub fn update_one<P: Serialize + ?Sized>(
        &self,
        collection: &str,
        predicate: Predicate,
        patch: &P,
    ) -> Deferred<()> {
        let patch = match to_fields(patch) {
            Ok(patch) => patch,
            Err(e) => return self.fail(e),
        };
        let collection = collection.to_string();
        self.dispatch(move |store| async move {
            store.update_one(&collection, &predicate, &patch).await
        })
    }

    /// Best-effort batch update; see [`CollectionStore::update_many`].
    pub fn update_many<P: Serialize + ?Sized>(
        &self,
        collection: &str,
        predicate: Predicate,
        patch: &P,
    ) -> Deferred<()> {
        let patch = match to_fields(patch) {
            Ok(patch) => patch,
            Err(e) => return self.fail(e),
        };
        let collection = collection.to_string();
        self.dispatch(move |store| async move {
            store.update_many(&collection, &predicate, &patch).await
        })
    }

    pub fn delete_one(&self, collection: &str, predicate: Predicate) -> Deferred<()> {
        let collection = collection.to_string();
        self.dispatch(move |store| async move { store.delete_one(&collection, &predicate).await })
    }

    pub fn drop_collection(&self, collection: &str) -> Deferred<()> {
        let collection = collection.to_string();
        self.dispatch(move |store| async move { store.drop_collection(&collection).await })
    }

    fn dispatch<T, F, Fut>(&self, operation: F) -> Deferred<T>
    where
        T: Send + 'static,
        F: FnOnce(CollectionStore) -> Fut,
        Fut: Future<Output = Result<T>> + Send + 'static,
    {
        completion::spawn(&self.runtime, operation(self.store.clone()))
    }

    fn fail<T: Send + 'static>(&self, err: Error) -> Deferred<T> {
        Deferred::settled(self.runtime.clone(), Err(err))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use tempfile::TempDir;

    #[test]
    fn test_open_outside_runtime_is_invalid_state() {
        let temp_dir = TempDir::new().unwrap();
        let err = Database::open(Config::new(temp_dir.path())).err().unwrap();
        assert_eq!(err.kind(), ErrorKind::InvalidState);
    }

    #[tokio::test]
    async fn test_non_object_document_settles_with_encode_error() {
        let temp_dir = TempDir::new().unwrap();
        let db = Database::open(Config::new(temp_dir.path())).unwrap();

        let err = db.insert_one("test", &"just a string").await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Encode);

        let mut bad_keys = HashMap::new();
        bad_keys.insert((1, 2), "tuple keys do not serialize");
        let err = db.insert_many("test", &[bad_keys]).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Encode);
        assert!(!db.store().layout().collection_path("test").unwrap().exists());
    }
}
