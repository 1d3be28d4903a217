//! Background C/C++ symbol indexing and federated symbol search.
//!
//! A semantic front-end reports declarations through a callback stream; the
//! mapper turns each one into a structured document; documents land in an
//! on-disk store that can later be opened read-only and searched, together
//! with any number of sibling stores, through [`CombinedIndex`].

pub mod error;
pub mod indexer;
pub mod refs;
pub mod search;
pub mod store;
pub mod test_helpers;

pub use crate::error::Error;
pub use crate::indexer::{IndexEvent, IndexStats, Indexer, IndexingOptions};
pub use crate::refs::DocRef;
pub use crate::search::{CombinedIndex, SearchHit};
pub use crate::store::{Document, HeaderFilesCache, StoreReader, StoreWriter};
