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

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;
use symdex::search::CombinedIndex;
use symdex::store::StoreReader;

#[derive(Parser, Debug)]
#[command(name = "symdex", about = "Search and inspect symdex symbol stores")]
struct Args {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run a query across one or more stores
    Search {
        /// Query text (free text, `+`/`-`, `decl:`/`kind:`/... prefixes, `size:8..16` ranges)
        query: String,
        /// Store directories to search
        #[arg(required = true)]
        stores: Vec<PathBuf>,
        /// Skip this many ranked results
        #[arg(long, default_value_t = 0)]
        offset: usize,
        /// Maximum results to print
        #[arg(long, default_value_t = 50)]
        limit: usize,
        /// Emit JSON (NDJSON)
        #[arg(long)]
        json: bool,
    },
    /// Print a store's identity, size, and header-file table
    Inspect {
        store: PathBuf,
        /// Emit JSON
        #[arg(long)]
        json: bool,
    },
}

fn main() -> Result<()> {
    env_logger::init();
    let args = Args::parse();
    match args.command {
        Command::Search {
            query,
            stores,
            offset,
            limit,
            json,
        } => search(&query, &stores, offset, limit, json),
        Command::Inspect { store, json } => inspect(&store, json),
    }
}

fn search(query: &str, stores: &[PathBuf], offset: usize, limit: usize, json: bool) -> Result<()> {
    let mut index = CombinedIndex::new();
    for path in stores {
        let reader = StoreReader::open(path)
            .with_context(|| format!("opening store {}", path.display()))?;
        index.add_index(Arc::new(reader));
    }
    let hits = index.search(query, offset, limit)?;
    for h in hits {
        if json {
            let v = serde_json::json!({
                "ref": h.doc_ref.to_string(),
                "name": h.name,
                "file": h.file,
                "line": h.line,
                "column": h.column,
                "kind": h.kind.map(|k| k.as_str()),
                "scope": h.scope,
                "score": h.score,
            });
            println!("{}", v);
        } else {
            let file = h.file.as_deref().unwrap_or("<unknown>");
            let kind = h.kind.map(|k| k.as_str()).unwrap_or("entity");
            match h.scope.as_deref() {
                Some(scope) => println!(
                    "{}:{}:{}: {} {}::{}",
                    file, h.line, h.column, kind, scope, h.name
                ),
                None => println!("{}:{}:{}: {} {}", file, h.line, h.column, kind, h.name),
            }
        }
    }
    Ok(())
}

fn inspect(store: &PathBuf, json: bool) -> Result<()> {
    let reader =
        StoreReader::open(store).with_context(|| format!("opening store {}", store.display()))?;
    if json {
        let headers: Vec<_> = reader
            .headers_map()
            .iter()
            .map(|(id, name)| serde_json::json!({"id": id, "file": name}))
            .collect();
        let v = serde_json::json!({
            "path": store.display().to_string(),
            "db_id": reader.id(),
            "documents": reader.doc_count(),
            "headers": headers,
        });
        println!("{}", v);
    } else {
        println!("store:     {}", store.display());
        println!("db id:     {}", reader.id());
        println!("documents: {}", reader.doc_count());
        println!("headers:   {}", reader.headers_map().len());
        for (id, name) in reader.headers_map().iter() {
            println!("  {:>4}  {}", id, name);
        }
    }
    Ok(())
}
