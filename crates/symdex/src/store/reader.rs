use crate::error::Error;
use crate::store::format::{self, IndexHeader};
use crate::store::writer::{read_db_id, read_header_cache};
use crate::store::{DocId, Document, HeaderFilesCache, TermField};
use anyhow::{Context, Result};
use memmap2::Mmap;
use std::collections::HashMap;
use std::fs::{self, File};
use std::path::{Path, PathBuf};

/// Offset of one inverted-section entry inside the mapped index file;
/// postings are decoded lazily on lookup.
#[derive(Clone, Copy, Debug)]
struct SectionEntry {
    off: usize,
    n: u32,
}

/// Read-only document store. Opening validates the out-of-band metadata:
/// a directory without both the `DBID` and `HDRMAPCACHE` keys is treated as
/// foreign or corrupt, never as a usable empty store.
pub struct StoreReader {
    path: PathBuf,
    db_id: u32,
    headers: HeaderFilesCache,
    mmap: Mmap,
    header: IndexHeader,
    term_index: HashMap<(u8, String), SectionEntry>,
    posting_index: HashMap<String, SectionEntry>,
}

impl StoreReader {
    pub fn open(path: impl AsRef<Path>) -> Result<Self, Error> {
        let path = path.as_ref().to_path_buf();
        if !path.is_dir() {
            return Err(Error::InvalidManifest(format!(
                "store path does not exist: {}",
                path.display()
            )));
        }
        let meta_path = path.join(format::META_FILE);
        if !meta_path.is_file() {
            return Err(Error::InvalidManifest(format!(
                "{} is not a store: no {}",
                path.display(),
                format::META_FILE
            )));
        }
        let meta_bytes = fs::read(&meta_path)?;
        let entries =
            format::decode_meta(&meta_bytes).map_err(|e| Error::DatabaseFailure(e.to_string()))?;
        let db_id = read_db_id(&entries)?;
        let headers = read_header_cache(&entries)?;

        let index_path = path.join(format::INDEX_FILE);
        let file = File::open(&index_path).map_err(|e| {
            Error::DatabaseFailure(format!("open {}: {}", index_path.display(), e))
        })?;
        let mmap = unsafe { Mmap::map(&file) }
            .map_err(|e| Error::DatabaseFailure(format!("map {}: {}", index_path.display(), e)))?;
        let header =
            format::parse_header(&mmap).map_err(|e| Error::DatabaseFailure(e.to_string()))?;
        let (term_index, posting_index) = build_section_indexes(&mmap, &header)
            .map_err(|e| Error::DatabaseFailure(e.to_string()))?;
        Ok(Self {
            path,
            db_id,
            headers,
            mmap,
            header,
            term_index,
            posting_index,
        })
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

    pub fn doc_count(&self) -> u32 {
        self.header.doc_count
    }

    pub fn document(&self, id: DocId) -> Result<Document, Error> {
        let off = format::doc_record_offset(&self.mmap, &self.header, id)
            .map_err(|e| Error::DatabaseFailure(e.to_string()))?;
        let mut at = off as usize;
        format::decode_document(&self.mmap, &mut at)
            .map_err(|e| Error::DatabaseFailure(format!("document {}: {}", id, e)))
    }

    /// Ids of the documents carrying the exact boolean term, ascending.
    pub fn term_docs(&self, field: TermField, text: &str) -> Result<Vec<DocId>, Error> {
        match self.term_index.get(&(field.code(), text.to_string())) {
            None => Ok(Vec::new()),
            Some(entry) => self.decode_term_entry(entry),
        }
    }

    /// Union of `term_docs` over every term of `field` whose text matches
    /// `re`, ascending and deduplicated.
    pub fn term_docs_matching(&self, field: TermField, re: &regex::Regex) -> Result<Vec<DocId>, Error> {
        let mut out = Vec::new();
        for ((f, text), entry) in &self.term_index {
            if *f == field.code() && re.is_match(text) {
                out.extend(self.decode_term_entry(entry)?);
            }
        }
        out.sort_unstable();
        out.dedup();
        Ok(out)
    }

    /// `(doc, position)` pairs for one free-text token, ascending by doc.
    pub fn posting_docs(&self, token: &str) -> Result<Vec<(DocId, u32)>, Error> {
        match self.posting_index.get(token) {
            None => Ok(Vec::new()),
            Some(entry) => self.decode_posting_entry(entry),
        }
    }

    pub fn posting_docs_matching(&self, re: &regex::Regex) -> Result<Vec<(DocId, u32)>, Error> {
        let mut out = Vec::new();
        for (token, entry) in &self.posting_index {
            if re.is_match(token) {
                out.extend(self.decode_posting_entry(entry)?);
            }
        }
        out.sort_unstable();
        out.dedup_by_key(|(d, _)| *d);
        Ok(out)
    }

    fn decode_term_entry(&self, entry: &SectionEntry) -> Result<Vec<DocId>, Error> {
        let mut off = entry.off;
        let mut out = Vec::with_capacity(entry.n as usize);
        let mut prev = 0u32;
        for _ in 0..entry.n {
            let delta = crate::refs::get_var_u32(&self.mmap, &mut off)
                .map_err(|e| Error::DatabaseFailure(e.to_string()))?;
            prev = prev.wrapping_add(delta);
            out.push(prev);
        }
        Ok(out)
    }

    fn decode_posting_entry(&self, entry: &SectionEntry) -> Result<Vec<(DocId, u32)>, Error> {
        let mut off = entry.off;
        let mut out = Vec::with_capacity(entry.n as usize);
        let mut prev = 0u32;
        for _ in 0..entry.n {
            let delta = crate::refs::get_var_u32(&self.mmap, &mut off)
                .map_err(|e| Error::DatabaseFailure(e.to_string()))?;
            prev = prev.wrapping_add(delta);
            let pos = crate::refs::get_u32(&self.mmap, &mut off)
                .map_err(|e| Error::DatabaseFailure(e.to_string()))?;
            out.push((prev, pos));
        }
        Ok(out)
    }
}

type SectionIndexes = (
    HashMap<(u8, String), SectionEntry>,
    HashMap<String, SectionEntry>,
);

fn build_section_indexes(buf: &[u8], header: &IndexHeader) -> Result<SectionIndexes> {
    use crate::refs::{get_str, get_u32, get_var_u32};

    let mut term_index = HashMap::new();
    let mut off = header.terms_off as usize;
    let n_terms = get_u32(buf, &mut off).context("while reading term count")? as usize;
    for _ in 0..n_terms {
        if off >= buf.len() {
            anyhow::bail!("index truncated while reading term field (off={})", off);
        }
        let field = buf[off];
        off += 1;
        let text = get_str(buf, &mut off).context("while reading term text")?;
        let n_docs = get_u32(buf, &mut off).context("while reading term doc count")?;
        let entry_off = off;
        for _ in 0..n_docs {
            let _ = get_var_u32(buf, &mut off).context("while skipping term postings")?;
        }
        term_index.insert(
            (field, text),
            SectionEntry {
                off: entry_off,
                n: n_docs,
            },
        );
    }

    let mut posting_index = HashMap::new();
    let mut off = header.postings_off as usize;
    let n_tokens = get_u32(buf, &mut off).context("while reading posting token count")? as usize;
    for _ in 0..n_tokens {
        let text = get_str(buf, &mut off).context("while reading posting token")?;
        let n_entries = get_u32(buf, &mut off).context("while reading posting entry count")?;
        let entry_off = off;
        for _ in 0..n_entries {
            let _ = get_var_u32(buf, &mut off).context("while skipping posting doc")?;
            let _ = get_u32(buf, &mut off).context("while skipping posting position")?;
        }
        posting_index.insert(
            text,
            SectionEntry {
                off: entry_off,
                n: n_entries,
            },
        );
    }
    Ok((term_index, posting_index))
}
