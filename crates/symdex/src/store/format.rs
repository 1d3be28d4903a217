//! On-disk store format: one `index.sdx` file holding the document records
//! plus the inverted term/posting sections, and one `meta.sdx` file holding
//! the out-of-band key→blob metadata table. All integers little-endian.

use crate::refs;
use crate::store::document::{Document, Posting, SlotValue, Term, TermField, ValueSlot};
use anyhow::{bail, Context, Result};
use std::collections::BTreeMap;

pub const MAGIC: u32 = 0x5359_4d44; // 'SYMD'
pub const VERSION: u32 = 1;

pub const INDEX_FILE: &str = "index.sdx";
pub const META_FILE: &str = "meta.sdx";

pub const META_KEY_DBID: &str = "DBID";
pub const META_KEY_HDRCACHE: &str = "HDRMAPCACHE";

/// Fixed header layout: magic, version, doc_count, then four section
/// offsets (doc offset table, doc records, term postings, text postings).
pub const HEADER_LEN: usize = 4 + 4 + 4 + 8 * 4;

pub fn encode_document(doc: &Document, buf: &mut Vec<u8>) {
    debug_assert!(doc.values.len() <= u8::MAX as usize);
    buf.push(doc.values.len() as u8);
    for (slot, value) in &doc.values {
        buf.push(slot.code());
        match value {
            SlotValue::Int(v) => {
                buf.push(0);
                refs::put_u64(buf, *v);
            }
            SlotValue::Str(s) => {
                buf.push(1);
                refs::put_str(buf, s);
            }
            SlotValue::Ref(r) => {
                buf.push(2);
                refs::put_u64(buf, r.pack());
            }
        }
    }
    refs::put_u16(buf, doc.terms.len() as u16);
    for t in &doc.terms {
        buf.push(t.field.code());
        refs::put_str(buf, &t.text);
    }
    refs::put_u16(buf, doc.postings.len() as u16);
    for p in &doc.postings {
        refs::put_str(buf, &p.text);
        refs::put_u32(buf, p.position);
    }
}

pub fn decode_document(buf: &[u8], off: &mut usize) -> Result<Document> {
    let mut doc = Document::new();
    if *off >= buf.len() {
        bail!("truncated document record (off={})", off);
    }
    let n_values = buf[*off] as usize;
    *off += 1;
    for _ in 0..n_values {
        if *off + 2 > buf.len() {
            bail!("truncated document value (off={})", off);
        }
        let slot = ValueSlot::from_code(buf[*off])
            .with_context(|| format!("unknown value slot code {}", buf[*off]))?;
        let tag = buf[*off + 1];
        *off += 2;
        let value = match tag {
            0 => SlotValue::Int(refs::get_u64(buf, off)?),
            1 => SlotValue::Str(refs::get_str(buf, off)?),
            2 => SlotValue::Ref(crate::refs::DocRef::unpack(refs::get_u64(buf, off)?)),
            _ => bail!("unknown slot value tag {}", tag),
        };
        doc.values.insert(slot, value);
    }
    let n_terms = refs::get_u16(buf, off)? as usize;
    for _ in 0..n_terms {
        if *off >= buf.len() {
            bail!("truncated document term (off={})", off);
        }
        let field = TermField::from_code(buf[*off])
            .with_context(|| format!("unknown term field code {}", buf[*off]))?;
        *off += 1;
        let text = refs::get_str(buf, off)?;
        doc.terms.push(Term { field, text });
    }
    let n_postings = refs::get_u16(buf, off)? as usize;
    for _ in 0..n_postings {
        let text = refs::get_str(buf, off)?;
        let position = refs::get_u32(buf, off)?;
        doc.postings.push(Posting { text, position });
    }
    Ok(doc)
}

/// Serialize the whole index file for `docs`. Document ids are implicit:
/// record `i` is document id `i + 1`.
pub fn build_index_bytes(docs: &[Document]) -> Result<Vec<u8>> {
    let mut buf = Vec::new();
    refs::put_u32(&mut buf, MAGIC);
    refs::put_u32(&mut buf, VERSION);
    refs::put_u32(&mut buf, docs.len() as u32);
    // Section offsets are patched in once the sections are laid out.
    for _ in 0..4 {
        refs::put_u64(&mut buf, 0);
    }

    // Doc offset table (placeholder), then the records.
    let doc_table_off = buf.len() as u64;
    for _ in 0..docs.len() {
        refs::put_u64(&mut buf, 0);
    }
    let docs_off = buf.len() as u64;
    let mut doc_offsets = Vec::with_capacity(docs.len());
    for doc in docs {
        doc_offsets.push(buf.len() as u64);
        encode_document(doc, &mut buf);
    }
    for (i, o) in doc_offsets.iter().enumerate() {
        let at = doc_table_off as usize + i * 8;
        buf[at..at + 8].copy_from_slice(&o.to_le_bytes());
    }

    // Inverted boolean-term postings, sorted for deterministic output.
    let terms_off = buf.len() as u64;
    let mut term_map: BTreeMap<(u8, &str), Vec<u32>> = BTreeMap::new();
    for (i, doc) in docs.iter().enumerate() {
        let id = i as u32 + 1;
        for t in &doc.terms {
            let entry = term_map.entry((t.field.code(), t.text.as_str())).or_default();
            if entry.last() != Some(&id) {
                entry.push(id);
            }
        }
    }
    refs::put_u32(&mut buf, term_map.len() as u32);
    for ((field, text), ids) in &term_map {
        buf.push(*field);
        refs::put_str(&mut buf, text);
        refs::put_u32(&mut buf, ids.len() as u32);
        let mut prev = 0u32;
        for id in ids {
            refs::put_var_u32(&mut buf, id.wrapping_sub(prev));
            prev = *id;
        }
    }

    // Free-text postings: token -> (doc, position) pairs.
    let postings_off = buf.len() as u64;
    let mut post_map: BTreeMap<&str, Vec<(u32, u32)>> = BTreeMap::new();
    for (i, doc) in docs.iter().enumerate() {
        let id = i as u32 + 1;
        for p in &doc.postings {
            post_map.entry(p.text.as_str()).or_default().push((id, p.position));
        }
    }
    refs::put_u32(&mut buf, post_map.len() as u32);
    for (text, entries) in &post_map {
        refs::put_str(&mut buf, text);
        refs::put_u32(&mut buf, entries.len() as u32);
        let mut prev = 0u32;
        for (id, pos) in entries {
            refs::put_var_u32(&mut buf, id.wrapping_sub(prev));
            refs::put_u32(&mut buf, *pos);
            prev = *id;
        }
    }

    // Patch the header offsets.
    let mut patch = Vec::with_capacity(8 * 4);
    refs::put_u64(&mut patch, doc_table_off);
    refs::put_u64(&mut patch, docs_off);
    refs::put_u64(&mut patch, terms_off);
    refs::put_u64(&mut patch, postings_off);
    buf[12..12 + 32].copy_from_slice(&patch);
    Ok(buf)
}

#[derive(Debug, Clone, Copy)]
pub struct IndexHeader {
    pub doc_count: u32,
    pub doc_table_off: u64,
    pub docs_off: u64,
    pub terms_off: u64,
    pub postings_off: u64,
}

pub fn parse_header(buf: &[u8]) -> Result<IndexHeader> {
    if buf.len() < HEADER_LEN {
        bail!("index file too small ({} bytes)", buf.len());
    }
    let mut off = 0usize;
    let magic = refs::get_u32(buf, &mut off)?;
    let version = refs::get_u32(buf, &mut off)?;
    if magic != MAGIC || version != VERSION {
        bail!("bad index header (magic={:#x}, version={})", magic, version);
    }
    let doc_count = refs::get_u32(buf, &mut off)?;
    let doc_table_off = refs::get_u64(buf, &mut off)?;
    let docs_off = refs::get_u64(buf, &mut off)?;
    let terms_off = refs::get_u64(buf, &mut off)?;
    let postings_off = refs::get_u64(buf, &mut off)?;
    Ok(IndexHeader {
        doc_count,
        doc_table_off,
        docs_off,
        terms_off,
        postings_off,
    })
}

/// Offset of document record `id` (1-based) from the doc offset table.
pub fn doc_record_offset(buf: &[u8], header: &IndexHeader, id: u32) -> Result<u64> {
    if id == 0 || id > header.doc_count {
        bail!("document id {} out of range (doc_count={})", id, header.doc_count);
    }
    let at = header.doc_table_off as usize + (id as usize - 1) * 8;
    let mut off = at;
    refs::get_u64(buf, &mut off)
}

pub fn read_all_documents(buf: &[u8]) -> Result<Vec<Document>> {
    let header = parse_header(buf)?;
    let mut docs = Vec::with_capacity(header.doc_count as usize);
    let mut off = header.docs_off as usize;
    for i in 0..header.doc_count {
        docs.push(
            decode_document(buf, &mut off)
                .with_context(|| format!("while decoding document {}", i + 1))?,
        );
    }
    Ok(docs)
}

pub fn encode_meta(entries: &BTreeMap<String, Vec<u8>>) -> Vec<u8> {
    let mut buf = Vec::new();
    refs::put_u32(&mut buf, MAGIC);
    refs::put_u32(&mut buf, VERSION);
    refs::put_u32(&mut buf, entries.len() as u32);
    for (key, blob) in entries {
        refs::put_str(&mut buf, key);
        refs::put_blob(&mut buf, blob);
    }
    buf
}

pub fn decode_meta(buf: &[u8]) -> Result<BTreeMap<String, Vec<u8>>> {
    let mut off = 0usize;
    let magic = refs::get_u32(buf, &mut off).context("metadata truncated")?;
    let version = refs::get_u32(buf, &mut off).context("metadata truncated")?;
    if magic != MAGIC || version != VERSION {
        bail!("bad metadata header");
    }
    let n = refs::get_u32(buf, &mut off)? as usize;
    let mut entries = BTreeMap::new();
    for _ in 0..n {
        let key = refs::get_str(buf, &mut off)?;
        let blob = refs::get_blob(buf, &mut off)?;
        entries.insert(key, blob);
    }
    Ok(entries)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::refs::DocRef;

    #[test]
    fn document_record_roundtrip() {
        let mut doc = Document::new();
        doc.set_str(ValueSlot::Name, "Widget");
        doc.set_int(ValueSlot::Line, 12);
        doc.set_ref(ValueSlot::SemanticContainer, DocRef::new(1, 3));
        doc.add_term(TermField::Decl, "Widget");
        doc.add_posting("widget", 12_004);
        let mut buf = Vec::new();
        encode_document(&doc, &mut buf);
        let mut off = 0usize;
        let back = decode_document(&buf, &mut off).unwrap();
        assert_eq!(off, buf.len());
        assert_eq!(back, doc);
    }

    #[test]
    fn meta_roundtrip() {
        let mut m = BTreeMap::new();
        m.insert(META_KEY_DBID.to_string(), vec![1, 0, 0, 0]);
        m.insert(META_KEY_HDRCACHE.to_string(), vec![0; 4]);
        let back = decode_meta(&encode_meta(&m)).unwrap();
        assert_eq!(back, m);
    }

    #[test]
    fn meta_rejects_bad_header() {
        assert!(decode_meta(&[0u8; 12]).is_err());
        assert!(decode_meta(&[]).is_err());
    }
}
