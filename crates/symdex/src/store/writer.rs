use crate::error::Error;
use crate::store::format;
use crate::store::{DocId, Document, HeaderFilesCache};
use anyhow::{Context, Result};
use log::{debug, warn};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

/// Write-capable document store. Owns the documents of one physical store,
/// appends only, and persists everything on [`StoreWriter::commit`].
/// Document ids start at 1 and are never reused: reopening an existing
/// store continues the allocation where the previous run left off.
pub struct StoreWriter {
    path: PathBuf,
    db_id: u32,
    docs: Vec<Document>,
    headers: HeaderFilesCache,
    dirty: bool,
}

impl StoreWriter {
    /// Open the store at `path`, creating it if absent. Reopening a store
    /// written with a different database id is refused.
    pub fn open_or_create(db_id: u32, path: impl AsRef<Path>) -> Result<Self, Error> {
        if db_id == 0 {
            return Err(Error::DatabaseFailure("database id must be non-zero".into()));
        }
        let path = path.as_ref().to_path_buf();
        let meta_path = path.join(format::META_FILE);
        if meta_path.is_file() {
            let meta_bytes = fs::read(&meta_path)?;
            let entries =
                format::decode_meta(&meta_bytes).map_err(|e| Error::DatabaseFailure(e.to_string()))?;
            let stored_id = read_db_id(&entries)?;
            if stored_id != db_id {
                return Err(Error::DatabaseFailure(format!(
                    "store at {} has database id {}, expected {}",
                    path.display(),
                    stored_id,
                    db_id
                )));
            }
            let headers = read_header_cache(&entries)?;
            let index_bytes = fs::read(path.join(format::INDEX_FILE))?;
            let docs = format::read_all_documents(&index_bytes)
                .map_err(|e| Error::DatabaseFailure(e.to_string()))?;
            debug!(
                "reopened store {} (db_id={}, {} documents)",
                path.display(),
                db_id,
                docs.len()
            );
            Ok(Self {
                path,
                db_id,
                docs,
                headers,
                dirty: false,
            })
        } else {
            fs::create_dir_all(&path)?;
            Ok(Self {
                path,
                db_id,
                docs: Vec::new(),
                headers: HeaderFilesCache::new(),
                dirty: true,
            })
        }
    }

    pub fn id(&self) -> u32 {
        self.db_id
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn headers_map(&self) -> &HeaderFilesCache {
        &self.headers
    }

    pub(crate) fn headers_map_mut(&mut self) -> &mut HeaderFilesCache {
        self.dirty = true;
        &mut self.headers
    }

    pub fn doc_count(&self) -> u32 {
        self.docs.len() as u32
    }

    /// Append a document and return its assigned id. Documents are never
    /// mutated after this point.
    pub fn add_document(&mut self, doc: Document) -> DocId {
        self.dirty = true;
        self.docs.push(doc);
        self.docs.len() as DocId
    }

    pub fn document(&self, id: DocId) -> Option<&Document> {
        if id == 0 {
            return None;
        }
        self.docs.get(id as usize - 1)
    }

    /// Flush metadata and documents to disk. Idempotent: a clean store is a
    /// no-op. Failures are logged and swallowed so the drop path can never
    /// panic out of a destructor.
    pub fn commit(&mut self) {
        if !self.dirty {
            return;
        }
        match self.try_commit() {
            Ok(()) => {
                self.dirty = false;
                debug!(
                    "committed store {} ({} documents)",
                    self.path.display(),
                    self.docs.len()
                );
            }
            Err(e) => warn!("commit of store {} failed: {:#}", self.path.display(), e),
        }
    }

    fn try_commit(&self) -> Result<()> {
        let mut meta = BTreeMap::new();
        meta.insert(
            format::META_KEY_DBID.to_string(),
            self.db_id.to_le_bytes().to_vec(),
        );
        meta.insert(
            format::META_KEY_HDRCACHE.to_string(),
            self.headers.to_bytes(),
        );
        fs::write(self.path.join(format::META_FILE), format::encode_meta(&meta))
            .context("write store metadata")?;
        let index = format::build_index_bytes(&self.docs)?;
        fs::write(self.path.join(format::INDEX_FILE), index).context("write store index")?;
        Ok(())
    }
}

impl Drop for StoreWriter {
    fn drop(&mut self) {
        self.commit();
    }
}

pub(crate) fn read_db_id(entries: &BTreeMap<String, Vec<u8>>) -> Result<u32, Error> {
    let blob = entries.get(format::META_KEY_DBID).ok_or_else(|| {
        Error::InvalidManifest(format!("missing {} metadata key", format::META_KEY_DBID))
    })?;
    if blob.len() != 4 {
        return Err(Error::DatabaseFailure(format!(
            "{} metadata must be 4 bytes, got {}",
            format::META_KEY_DBID,
            blob.len()
        )));
    }
    Ok(u32::from_le_bytes(blob.as_slice().try_into().unwrap()))
}

pub(crate) fn read_header_cache(
    entries: &BTreeMap<String, Vec<u8>>,
) -> Result<HeaderFilesCache, Error> {
    let blob = entries.get(format::META_KEY_HDRCACHE).ok_or_else(|| {
        Error::InvalidManifest(format!("missing {} metadata key", format::META_KEY_HDRCACHE))
    })?;
    HeaderFilesCache::from_bytes(blob).map_err(|e| Error::DatabaseFailure(e.to_string()))
}
