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

//! The indexing orchestrator: owns the write-capable store and the
//! front-end, runs the mapper on one dedicated background thread per run,
//! and reports progress over a channel.

mod arena;
pub mod frontend;
mod mapper;

pub use frontend::{
    Access, ContainerHandle, DeclInfo, EntityKind, FileHandle, IncludeInfo, IndexCallbacks,
    IndexingOptions, RefInfo, SemanticFrontend, SourceLocation, TemplateKind, TypeInfo, TypeKind,
};
pub use mapper::{DeclLocation, DeclMapper, SeenDeclarations};

use crate::store::StoreWriter;
use anyhow::{bail, Context, Result};
use fnv::FnvHashMap;
use log::{info, warn};
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

/// Progress signals emitted during a run. `Finished` is terminal and is
/// sent exactly once, cancelled or not.
#[derive(Debug, Clone)]
pub enum IndexEvent {
    /// About to index this file.
    Indexing(PathBuf),
    /// One file's front-end pass failed; the run continues.
    Error { file: PathBuf, message: String },
    Finished(IndexStats),
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct IndexStats {
    pub files_indexed: usize,
    pub documents_stored: usize,
    pub duration: Duration,
}

/// Background indexing orchestrator. One run may be active at a time; the
/// mapper running on the background thread is the sole writer to the store
/// for the run's duration.
pub struct Indexer {
    frontend: Arc<dyn SemanticFrontend>,
    store: Option<StoreWriter>,
    compiler_args: Vec<String>,
    options: IndexingOptions,
    targets: Vec<PathBuf>,
    cancel: Arc<AtomicBool>,
    worker: Option<JoinHandle<StoreWriter>>,
}

impl Indexer {
    /// The front-end is acquired here and disposed when the indexer drops.
    pub fn new(frontend: Arc<dyn SemanticFrontend>, store: StoreWriter) -> Self {
        Self {
            frontend,
            store: Some(store),
            compiler_args: Vec::new(),
            options: IndexingOptions::NONE,
            targets: Vec::new(),
            cancel: Arc::new(AtomicBool::new(false)),
            worker: None,
        }
    }

    pub fn configure(&mut self, compiler_args: Vec<String>, options: IndexingOptions) {
        self.compiler_args = compiler_args;
        self.options = options;
    }

    /// Queue a file or directory for the next run.
    pub fn add_target(&mut self, path: impl Into<PathBuf>) {
        self.targets.push(path.into());
    }

    pub fn is_running(&self) -> bool {
        self.worker.as_ref().is_some_and(|w| !w.is_finished())
    }

    /// Spawn the background run. Only callable while idle.
    pub fn start(&mut self) -> Result<Receiver<IndexEvent>> {
        if self.worker.is_some() {
            bail!("an indexing run is already active");
        }
        let store = self
            .store
            .take()
            .context("write store unavailable (previous run not joined?)")?;
        self.cancel.store(false, Ordering::Relaxed);
        let (tx, rx) = mpsc::channel();
        let frontend = Arc::clone(&self.frontend);
        let cancel = Arc::clone(&self.cancel);
        let targets = self.targets.clone();
        let args = self.compiler_args.clone();
        let options = self.options;
        let handle = std::thread::spawn(move || {
            run_indexing(frontend, store, targets, args, options, cancel, tx)
        });
        self.worker = Some(handle);
        Ok(rx)
    }

    /// Request a cooperative stop. Asynchronous: in-flight front-end work
    /// for the current file finishes naturally.
    pub fn stop(&self) {
        self.cancel.store(true, Ordering::Relaxed);
    }

    /// Block until the background run exits and take the store back.
    pub fn wait(&mut self) {
        if let Some(handle) = self.worker.take() {
            match handle.join() {
                Ok(store) => self.store = Some(store),
                Err(_) => warn!("indexing thread panicked; store lost"),
            }
        }
    }

    /// The write store, available while no run is active.
    pub fn store(&self) -> Option<&StoreWriter> {
        self.store.as_ref()
    }

    /// Release the store, e.g. to reopen it read-only. Only while idle.
    pub fn into_store(mut self) -> Option<StoreWriter> {
        self.stop();
        self.wait();
        self.store.take()
    }
}

impl Drop for Indexer {
    fn drop(&mut self) {
        // Never release the store while the background thread can still
        // commit into it.
        self.stop();
        self.wait();
    }
}

fn run_indexing(
    frontend: Arc<dyn SemanticFrontend>,
    mut store: StoreWriter,
    targets: Vec<PathBuf>,
    args: Vec<String>,
    options: IndexingOptions,
    cancel: Arc<AtomicBool>,
    tx: Sender<IndexEvent>,
) -> StoreWriter {
    let started = Instant::now();
    let mut seen: FnvHashMap<DeclLocation, crate::refs::DocRef> = FnvHashMap::default();
    let mut stats = IndexStats::default();

    'targets: for target in &targets {
        if cancel.load(Ordering::Relaxed) {
            break;
        }
        if target.is_dir() {
            let walker = ignore::WalkBuilder::new(target)
                .standard_filters(true)
                .follow_links(true)
                .build();
            for dent in walker {
                // Cancellation is checked at every directory entry, not
                // only between whole targets.
                if cancel.load(Ordering::Relaxed) {
                    break 'targets;
                }
                let dent = match dent {
                    Ok(d) => d,
                    Err(e) => {
                        warn!("walk error under {}: {}", target.display(), e);
                        continue;
                    }
                };
                if !dent.file_type().is_some_and(|t| t.is_file()) {
                    continue;
                }
                if !looks_like_cpp_source(dent.path()) {
                    continue;
                }
                index_one_file(
                    &*frontend, &mut store, &mut seen, &cancel, &tx, &args, options,
                    dent.path(), &mut stats,
                );
            }
        } else {
            index_one_file(
                &*frontend, &mut store, &mut seen, &cancel, &tx, &args, options, target,
                &mut stats,
            );
        }
    }

    // Cancellation is "stop early", not "roll back": whatever was indexed
    // is committed, exactly once per run.
    store.commit();
    stats.documents_stored = seen.len();
    stats.duration = started.elapsed();
    info!(
        "indexing finished: {} files, {} documents in {:?}",
        stats.files_indexed, stats.documents_stored, stats.duration
    );
    let _ = tx.send(IndexEvent::Finished(stats));
    store
}

#[allow(clippy::too_many_arguments)]
fn index_one_file(
    frontend: &dyn SemanticFrontend,
    store: &mut StoreWriter,
    seen: &mut FnvHashMap<DeclLocation, crate::refs::DocRef>,
    cancel: &AtomicBool,
    tx: &Sender<IndexEvent>,
    args: &[String],
    options: IndexingOptions,
    path: &Path,
    stats: &mut IndexStats,
) {
    let _ = tx.send(IndexEvent::Indexing(path.to_path_buf()));
    let mut mapper = DeclMapper::new(store, seen, cancel);
    match frontend.index_file(args, options, path, &mut mapper) {
        Ok(()) => stats.files_indexed += 1,
        Err(message) => {
            warn!("indexing {} failed: {}", path.display(), message);
            let _ = tx.send(IndexEvent::Error {
                file: path.to_path_buf(),
                message,
            });
        }
    }
}

fn looks_like_cpp_source(path: &Path) -> bool {
    matches!(
        path.extension().and_then(|e| e.to_str()),
        Some("c" | "cc" | "cpp" | "cxx" | "h" | "hh" | "hpp" | "hxx" | "inl" | "ipp" | "mm")
    )
}
