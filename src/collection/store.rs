use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::fs as tokio_fs;
use tracing::{debug, error, trace, warn};
use crate::core::config::Config;
use crate::core::error::{Error, Result};
use crate::core::types::{DocId, Document, Fields};
use crate::parallel::fanout::FanOut;
use crate::query::matcher::{filter, matches};
use crate::query::predicate::Predicate;
use crate::storage::codec::DocumentCodec;
use crate::storage::layout::{ensure_dir, StorageLayout};

/// Document operations over the directory-per-collection layout.
///
/// Nothing is cached: every call reads the filesystem, which is the only
/// source of truth. Calls are not serialized against each other, so two
/// concurrent operations on the same document race at the filesystem level.
#[derive(Debug, Clone)]
pub struct CollectionStore {
    layout: Arc<StorageLayout>,
    codec: DocumentCodec,
}

impl CollectionStore {
    pub fn new(config: &Config) -> Self {
        CollectionStore {
            layout: Arc::new(StorageLayout::new(config)),
            codec: DocumentCodec::new(config.pretty_print),
        }
    }

    pub fn layout(&self) -> &StorageLayout {
        &self.layout
    }

    pub fn bootstrap(&self) -> Result<()> {
        self.layout.bootstrap()
    }

    /// Persists one document under a freshly assigned id.
    pub async fn insert_one(&self, collection: &str, fields: Fields) -> Result<DocId> {
        let dir = self.layout.collection_path(collection)?;
        ensure_dir(&dir)?;

        let document = Document::new(self.codec.generate_id(), fields);
        let text = self.codec.encode(&document)?;
        write_unit(dir.join(self.layout.file_name(&document.id)), text).await?;

        debug!(collection, id = %document.id, "document inserted");
        Ok(document.id)
    }

    /// Persists a batch; ids come back in input order.
    ///
    /// Not atomic. Every document is encoded before any write starts, then the
    /// writes run concurrently. The first write failure is returned while the
    /// remaining writes still complete in the background, so some documents of
    /// a failed batch may be on disk.
    pub async fn insert_many(&self, collection: &str, batch: Vec<Fields>) -> Result<Vec<DocId>> {
        let dir = self.layout.collection_path(collection)?;
        ensure_dir(&dir)?;

        let mut writes = Vec::with_capacity(batch.len());
        for fields in batch {
            let document = Document::new(self.codec.generate_id(), fields);
            let text = self.codec.encode(&document)?;
            writes.push((dir.join(self.layout.file_name(&document.id)), text, document.id));
        }

        let ids = FanOut::spawn(writes.into_iter().map(|(path, text, id)| async move {
            write_unit(path, text).await.map(|()| id)
        }))
        .try_join()
        .await?;

        debug!(collection, count = ids.len(), "documents inserted");
        Ok(ids)
    }

    /// All documents matching `predicate`.
    ///
    /// An `id` term short-circuits to a point lookup. A collection that was
    /// never created is empty, not an error.
    pub async fn find(&self, collection: &str, predicate: &Predicate) -> Result<Vec<Document>> {
        if let Some(id) = predicate.id() {
            let found = match id.as_str() {
                Some(id) => self.find_by_id(collection, id).await?,
                None => None,
            };
            return Ok(found.into_iter().filter(|d| matches(d, predicate)).collect());
        }

        let dir = self.layout.collection_path(collection)?;
        let units = self.list_units(&dir).await?;
        trace!(collection, units = units.len(), "scanning collection");

        let codec = self.codec;
        let documents = FanOut::spawn(units.into_iter().map(|(path, id)| read_unit(path, id, codec)))
            .try_join()
            .await?;

        Ok(filter(documents.into_iter().flatten().collect(), predicate))
    }

    /// Point lookup; a missing document is `None`.
    pub async fn find_by_id(&self, collection: &str, id: &str) -> Result<Option<Document>> {
        let dir = self.layout.collection_path(collection)?;
        let Some(id) = DocId::parse(id) else {
            debug!(collection, id, "not a valid document id");
            return Ok(None);
        };
        read_unit(dir.join(self.layout.file_name(&id)), id, self.codec).await
    }

    pub async fn find_one(&self, collection: &str, predicate: &Predicate) -> Result<Option<Document>> {
        Ok(self.find(collection, predicate).await?.into_iter().next())
    }

    /// Merges `patch` into the first match. No match is a no-op.
    pub async fn update_one(&self, collection: &str, predicate: &Predicate, patch: &Fields) -> Result<()> {
        let Some(document) = self.find_one(collection, predicate).await? else {
            debug!(collection, "update matched nothing");
            return Ok(());
        };
        let id = document.id.clone();
        self.rewrite(collection, vec![document], patch).await?;
        debug!(collection, id = %id, "document updated");
        Ok(())
    }

    /// Merges `patch` into every match. Same partial-failure behavior as
    /// [`CollectionStore::insert_many`].
    pub async fn update_many(&self, collection: &str, predicate: &Predicate, patch: &Fields) -> Result<()> {
        let documents = self.find(collection, predicate).await?;
        if documents.is_empty() {
            debug!(collection, "update matched nothing");
            return Ok(());
        }
        let count = self.rewrite(collection, documents, patch).await?;
        debug!(collection, count, "documents updated");
        Ok(())
    }

    /// Patches and writes back already-read documents, settling on the first
    /// write failure.
    async fn rewrite(&self, collection: &str, documents: Vec<Document>, patch: &Fields) -> Result<usize> {
        let dir = self.layout.collection_path(collection)?;
        let mut writes = Vec::with_capacity(documents.len());
        for mut document in documents {
            document.merge(patch);
            let text = self.codec.encode(&document)?;
            writes.push((dir.join(self.layout.file_name(&document.id)), text));
        }

        let count = writes.len();
        FanOut::spawn(writes.into_iter().map(|(path, text)| write_unit(path, text)))
            .try_join()
            .await?;
        Ok(count)
    }

    /// Removes the first match. No match is a no-op.
    pub async fn delete_one(&self, collection: &str, predicate: &Predicate) -> Result<()> {
        let Some(document) = self.find_one(collection, predicate).await? else {
            debug!(collection, "delete matched nothing");
            return Ok(());
        };

        let path = self.layout.document_path(collection, &document.id)?;
        tokio_fs::remove_file(&path).await.map_err(|e| {
            error!(path = %path.display(), error = %e, "failed to remove document");
            Error::remove(format!("remove {}", path.display()), e)
        })?;
        debug!(collection, id = %document.id, "document deleted");
        Ok(())
    }

    /// Removes the collection and everything in it. A missing collection is a no-op.
    pub async fn drop_collection(&self, collection: &str) -> Result<()> {
        let dir = self.layout.collection_path(collection)?;
        match tokio_fs::remove_dir_all(&dir).await {
            Ok(()) => {
                debug!(collection, "collection dropped");
                Ok(())
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                trace!(collection, "drop of missing collection");
                Ok(())
            }
            Err(e) => {
                error!(collection, error = %e, "failed to drop collection");
                Err(Error::remove(format!("remove {}", dir.display()), e))
            }
        }
    }

    /// Persisted units of a collection, sorted by file name.
    async fn list_units(&self, dir: &Path) -> Result<Vec<(PathBuf, DocId)>> {
        let mut entries = match tokio_fs::read_dir(dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(Error::read(format!("list {}", dir.display()), e)),
        };

        let mut units = Vec::new();
        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(|e| Error::read(format!("list {}", dir.display()), e))?
        {
            let path = entry.path();
            let Some(id) = self.layout.document_id(&path) else {
                continue;
            };
            let file_type = entry
                .file_type()
                .await
                .map_err(|e| Error::read(format!("stat {}", path.display()), e))?;
            if file_type.is_file() {
                units.push((path, id));
            }
        }

        units.sort();
        Ok(units)
    }
}

async fn write_unit(path: PathBuf, text: String) -> Result<()> {
    tokio_fs::write(&path, text).await.map_err(|e| {
        error!(path = %path.display(), error = %e, "failed to write document");
        Error::write(format!("write {}", path.display()), e)
    })
}

/// Reads and decodes one unit. A missing file, or a directory squatting on
/// the unit's name, is `None`, the same as a scan would see it.
///
/// The file name is the document's address, so it wins over whatever `id`
/// the content claims.
async fn read_unit(path: PathBuf, id: DocId, codec: DocumentCodec) -> Result<Option<Document>> {
    let text = match tokio_fs::read_to_string(&path).await {
        Ok(text) => text,
        Err(e) if matches!(e.kind(), io::ErrorKind::NotFound | io::ErrorKind::IsADirectory) => {
            trace!(path = %path.display(), "document not found");
            return Ok(None);
        }
        Err(e) => {
            error!(path = %path.display(), error = %e, "failed to read document");
            return Err(Error::read(format!("read {}", path.display()), e));
        }
    };

    let mut document = codec.decode(&text).map_err(|e| {
        error!(path = %path.display(), error = %e, "corrupt document");
        Error::with_source(e.kind, format!("decode {}", path.display()), e)
    })?;
    if document.id != id {
        warn!(path = %path.display(), claimed = %document.id, "stored id disagrees with file name");
        document.id = id;
    }
    Ok(Some(document))
}
