// Copyright 2025 Symdex Project
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Federated search over any number of read-only stores through one
//! lazily-rebuilt compound view.

mod query;
pub use query::{Occur, ParsedQuery, QueryClause, QueryNode};

use crate::error::Error;
use crate::refs::DocRef;
use crate::store::{DocId, StoreReader, SymbolKind, ValueSlot};
use std::sync::Arc;

/// One ranked search result.
#[derive(Debug, Clone)]
pub struct SearchHit {
    pub doc_ref: DocRef,
    /// Empty for anonymous entities.
    pub name: String,
    /// File path resolved through the owning store's header cache.
    pub file: Option<String>,
    pub line: u32,
    pub column: u32,
    pub kind: Option<SymbolKind>,
    pub scope: Option<String>,
    /// Higher is better; earlier occurrences in a file score higher.
    pub score: f32,
}

/// Snapshot of the store list a search executes against. Rebuilt at most
/// once per search when the registered set changed.
struct CompoundView {
    stores: Vec<Arc<StoreReader>>,
}

/// Read-only federation over N document stores.
#[derive(Default)]
pub struct CombinedIndex {
    stores: Vec<Arc<StoreReader>>,
    compound: Option<CompoundView>,
    stale: bool,
}

impl CombinedIndex {
    pub fn new() -> Self {
        Self {
            stores: Vec::new(),
            compound: None,
            stale: true,
        }
    }

    /// Register a store. Inserting the same store twice is a no-op; the
    /// compound view is invalidated either way.
    pub fn add_index(&mut self, store: Arc<StoreReader>) {
        if !self.stores.iter().any(|s| Arc::ptr_eq(s, &store)) {
            self.stores.push(store);
        }
        self.stale = true;
    }

    /// Remove a store by identity.
    pub fn remove_index(&mut self, store: &Arc<StoreReader>) {
        self.stores.retain(|s| !Arc::ptr_eq(s, store));
        self.stale = true;
    }

    pub fn index_count(&self) -> usize {
        self.stores.len()
    }

    /// Parse and execute `query`, returning at most `max_items` hits
    /// starting at `start`, sorted by relevance.
    pub fn search(
        &mut self,
        query: &str,
        start: usize,
        max_items: usize,
    ) -> Result<Vec<SearchHit>, Error> {
        if self.stores.is_empty() {
            return Err(Error::DatabaseFailure(
                "no indexes registered with the combined index".into(),
            ));
        }
        let parsed = ParsedQuery::parse(query)?;
        if self.stale || self.compound.is_none() {
            self.compound = Some(CompoundView {
                stores: self.stores.clone(),
            });
            self.stale = false;
        }
        let compound = self.compound.as_ref().unwrap();

        let mut hits: Vec<SearchHit> = Vec::new();
        for store in &compound.stores {
            for id in eval_store(store, &parsed)? {
                hits.push(make_hit(store, id)?);
            }
        }
        hits.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| a.doc_ref.cmp(&b.doc_ref))
        });
        Ok(hits.into_iter().skip(start).take(max_items).collect())
    }
}

/// Boolean "love/hate" evaluation: must-clauses intersect, must-not
/// clauses subtract. A query with no positive clause matches nothing.
fn eval_store(store: &StoreReader, parsed: &ParsedQuery) -> Result<Vec<DocId>, Error> {
    let mut included: Option<Vec<DocId>> = None;
    let mut excluded: Vec<DocId> = Vec::new();
    for clause in &parsed.clauses {
        let docs = eval_node(store, &clause.node)?;
        match clause.occur {
            Occur::Must => {
                included = Some(match included {
                    None => docs,
                    Some(current) => intersect_sorted(&current, &docs),
                });
            }
            Occur::MustNot => {
                excluded.extend(docs);
                excluded.sort_unstable();
                excluded.dedup();
            }
        }
    }
    let mut base = included.unwrap_or_default();
    base.retain(|id| excluded.binary_search(id).is_err());
    Ok(base)
}

fn eval_node(store: &StoreReader, node: &QueryNode) -> Result<Vec<DocId>, Error> {
    match node {
        QueryNode::Text { pattern, wildcard } => {
            let pairs = if *wildcard {
                let re = query::wildcard_regex(pattern, false)?;
                store.posting_docs_matching(&re)?
            } else {
                store.posting_docs(pattern)?
            };
            let mut ids: Vec<DocId> = pairs.into_iter().map(|(d, _)| d).collect();
            ids.sort_unstable();
            ids.dedup();
            Ok(ids)
        }
        QueryNode::Term {
            field,
            pattern,
            wildcard,
        } => {
            if *wildcard {
                let re = query::wildcard_regex(pattern, false)?;
                store.term_docs_matching(*field, &re)
            } else {
                store.term_docs(*field, pattern)
            }
        }
        QueryNode::Range { slot, lo, hi } => {
            let mut out = Vec::new();
            for id in 1..=store.doc_count() {
                let doc = store.document(id)?;
                if let Some(v) = doc.int_value(*slot) {
                    if v >= *lo && v <= *hi {
                        out.push(id);
                    }
                }
            }
            Ok(out)
        }
    }
}

fn intersect_sorted(left: &[DocId], right: &[DocId]) -> Vec<DocId> {
    let (probe, scan) = if left.len() < right.len() {
        (left, right)
    } else {
        (right, left)
    };
    probe
        .iter()
        .copied()
        .filter(|id| scan.binary_search(id).is_ok())
        .collect()
}

fn make_hit(store: &Arc<StoreReader>, id: DocId) -> Result<SearchHit, Error> {
    let doc = store.document(id)?;
    let line = doc.int_value(ValueSlot::Line).unwrap_or(0) as u32;
    let column = doc.int_value(ValueSlot::Column).unwrap_or(0) as u32;
    let file = doc
        .int_value(ValueSlot::File)
        .and_then(|fid| store.headers_map().name_of(fid as u32))
        .map(str::to_string);
    let kind = doc
        .int_value(ValueSlot::Kind)
        .and_then(|c| SymbolKind::from_code(c as u8));
    let position = line.saturating_mul(1000).saturating_add(column);
    Ok(SearchHit {
        doc_ref: DocRef::new(store.id(), id),
        name: doc.str_value(ValueSlot::Name).unwrap_or_default().to_string(),
        file,
        line,
        column,
        kind,
        scope: doc.str_value(ValueSlot::Scope).map(str::to_string),
        score: 1.0 / (1.0 + position as f32),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn intersect_keeps_common_ids() {
        assert_eq!(intersect_sorted(&[1, 3, 5, 7], &[2, 3, 7, 9]), vec![3, 7]);
        assert_eq!(intersect_sorted(&[], &[1, 2]), Vec::<DocId>::new());
    }
}
