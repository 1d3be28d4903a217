//! Document stores: a read-write variant used while indexing and a
//! read-only variant used by the combined search index. Both sit on the
//! same physical format (see `format.rs`).

mod document;
pub use document::{DocId, Document, Posting, SlotValue, SymbolFlags, SymbolKind, Term, TermField, ValueSlot};

mod header_cache;
pub use header_cache::HeaderFilesCache;

pub(crate) mod format;

mod writer;
pub use writer::StoreWriter;

mod reader;
pub use reader::StoreReader;
