use std::path::{Path, PathBuf};
use std::fs;
use tracing::debug;
use crate::core::config::Config;
use crate::core::error::{Error, Result};
use crate::core::types::{is_safe_component, DocId};

/// Directory structure for persisted documents
#[derive(Debug, Clone)]
pub struct StorageLayout {
    pub base_dir: PathBuf,              // Database root
    pub collections_dir: PathBuf,       // One subdirectory per collection
    pub indexes_dir: Option<PathBuf>,   // Reserved, only provisioned on request
    extension: String,
}

impl StorageLayout {
    pub fn new(config: &Config) -> Self {
        let base_dir = config.storage_path.clone();
        let collections_dir = base_dir.join("collections");
        let indexes_dir = config.reserve_index_dir.then(|| base_dir.join("indexes"));

        StorageLayout {
            base_dir,
            collections_dir,
            indexes_dir,
            extension: config.document_extension.trim_start_matches('.').to_string(),
        }
    }

    /// Creates the fixed roots. Safe to run any number of times.
    pub fn bootstrap(&self) -> Result<()> {
        ensure_dir(&self.base_dir)?;
        if let Some(indexes_dir) = &self.indexes_dir {
            ensure_dir(indexes_dir)?;
        }
        ensure_dir(&self.collections_dir)
    }

    pub fn collection_path(&self, collection: &str) -> Result<PathBuf> {
        if !is_safe_component(collection) {
            return Err(Error::invalid_argument(format!(
                "invalid collection name {:?}",
                collection
            )));
        }
        Ok(self.collections_dir.join(collection))
    }

    pub fn document_path(&self, collection: &str, id: &DocId) -> Result<PathBuf> {
        Ok(self.collection_path(collection)?.join(self.file_name(id)))
    }

    pub fn file_name(&self, id: &DocId) -> String {
        format!("{}.{}", id, self.extension)
    }

    /// Id of the persisted unit at `path`, or `None` for foreign files.
    pub fn document_id(&self, path: &Path) -> Option<DocId> {
        if path.extension()?.to_str()? != self.extension {
            return None;
        }
        DocId::parse(path.file_stem()?.to_str()?)
    }
}

/// Creates `path` (and parents) if missing; an existing directory is fine.
pub fn ensure_dir(path: &Path) -> Result<()> {
    if path.is_dir() {
        return Ok(());
    }
    debug!(path = %path.display(), "creating directory");
    fs::create_dir_all(path)
        .map_err(|e| Error::write(format!("create directory {}", path.display()), e))
}
