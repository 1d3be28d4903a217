use std::fs;
use std::sync::Arc;
use std::time::Duration;
use symdex::indexer::{EntityKind, IndexEvent, Indexer};
use symdex::store::{StoreReader, StoreWriter};
use symdex::test_helpers::{GatedFrontend, ScriptedDecl, ScriptedFrontend};
use tempfile::tempdir;

fn scripted(files: &[&str]) -> ScriptedFrontend {
    let mut frontend = ScriptedFrontend::new();
    for (i, name) in files.iter().enumerate() {
        frontend.add_file(
            *name,
            vec![
                ScriptedDecl::new(format!("sym_{}", i), EntityKind::Function, 1, 1),
                ScriptedDecl::new(format!("aux_{}", i), EntityKind::Variable, 2, 1),
            ],
        );
    }
    frontend
}

fn drain(rx: std::sync::mpsc::Receiver<IndexEvent>) -> Vec<IndexEvent> {
    let mut events = Vec::new();
    while let Ok(ev) = rx.recv_timeout(Duration::from_secs(10)) {
        let done = matches!(ev, IndexEvent::Finished(_));
        events.push(ev);
        if done {
            break;
        }
    }
    events
}

#[test]
fn run_over_directory_emits_progress_and_commits() {
    let dir = tempdir().unwrap();
    let src = dir.path().join("src");
    fs::create_dir(&src).unwrap();
    fs::write(src.join("a.cpp"), "// a").unwrap();
    fs::write(src.join("b.cpp"), "// b").unwrap();
    fs::write(src.join("notes.txt"), "not source").unwrap();
    let store_path = dir.path().join("store");

    let store = StoreWriter::open_or_create(1, &store_path).unwrap();
    let mut indexer = Indexer::new(Arc::new(scripted(&["a.cpp", "b.cpp"])), store);
    indexer.configure(vec!["-std=c++17".into()], Default::default());
    indexer.add_target(&src);
    let rx = indexer.start().unwrap();
    let events = drain(rx);
    indexer.wait();

    let indexing: Vec<_> = events
        .iter()
        .filter(|e| matches!(e, IndexEvent::Indexing(_)))
        .collect();
    assert_eq!(indexing.len(), 2, "only the two source files are visited");
    let stats = match events.last() {
        Some(IndexEvent::Finished(stats)) => stats.clone(),
        other => panic!("expected Finished, got {:?}", other),
    };
    assert_eq!(stats.files_indexed, 2);
    assert_eq!(stats.documents_stored, 4);

    // the run commits exactly once; the store must be openable read-only
    drop(indexer);
    let reader = StoreReader::open(&store_path).unwrap();
    assert_eq!(reader.doc_count(), 4);
}

#[test]
fn per_file_failure_is_reported_and_run_continues() {
    let dir = tempdir().unwrap();
    let src = dir.path().join("src");
    fs::create_dir(&src).unwrap();
    fs::write(src.join("good.cpp"), "").unwrap();
    fs::write(src.join("broken.cpp"), "").unwrap();

    // only good.cpp is scripted; broken.cpp fails its pass
    let store = StoreWriter::open_or_create(1, dir.path().join("store")).unwrap();
    let mut indexer = Indexer::new(Arc::new(scripted(&["good.cpp"])), store);
    indexer.add_target(&src);
    let events = drain(indexer.start().unwrap());
    indexer.wait();

    let errors: Vec<_> = events
        .iter()
        .filter_map(|e| match e {
            IndexEvent::Error { file, message } => Some((file.clone(), message.clone())),
            _ => None,
        })
        .collect();
    assert_eq!(errors.len(), 1);
    assert!(errors[0].0.ends_with("broken.cpp"));
    let stats = match events.last() {
        Some(IndexEvent::Finished(stats)) => stats.clone(),
        other => panic!("expected Finished, got {:?}", other),
    };
    assert_eq!(stats.files_indexed, 1);
}

#[test]
fn start_twice_is_refused_while_running() {
    let dir = tempdir().unwrap();
    fs::write(dir.path().join("a.cpp"), "").unwrap();
    let (gated, gate) = GatedFrontend::new(scripted(&["a.cpp"]));
    let store = StoreWriter::open_or_create(1, dir.path().join("store")).unwrap();
    let mut indexer = Indexer::new(Arc::new(gated), store);
    indexer.add_target(dir.path().join("a.cpp"));
    let _rx = indexer.start().unwrap();
    assert!(indexer.start().is_err());
    gate.open();
    indexer.wait();
}

#[test]
fn stop_request_cuts_a_run_short() {
    let dir = tempdir().unwrap();
    let names = ["one.cpp", "two.cpp", "three.cpp"];
    for n in &names {
        fs::write(dir.path().join(n), "").unwrap();
    }

    // baseline: all three targets indexed
    let full = {
        let store = StoreWriter::open_or_create(1, dir.path().join("store-full")).unwrap();
        let mut indexer = Indexer::new(Arc::new(scripted(&names)), store);
        for n in &names {
            indexer.add_target(dir.path().join(n));
        }
        let events = drain(indexer.start().unwrap());
        indexer.wait();
        match events.last() {
            Some(IndexEvent::Finished(stats)) => stats.files_indexed,
            other => panic!("expected Finished, got {:?}", other),
        }
    };
    assert_eq!(full, 3);

    // cancelled: stop lands while the first file is still gated, so the
    // run ends strictly earlier but still finishes cleanly
    let (gated, gate) = GatedFrontend::new(scripted(&names));
    let store = StoreWriter::open_or_create(1, dir.path().join("store-cut")).unwrap();
    let mut indexer = Indexer::new(Arc::new(gated), store);
    for n in &names {
        indexer.add_target(dir.path().join(n));
    }
    let rx = indexer.start().unwrap();
    indexer.stop();
    gate.open();
    let events = drain(rx);
    let cut = match events.last() {
        Some(IndexEvent::Finished(stats)) => stats.files_indexed,
        other => panic!("expected Finished, got {:?}", other),
    };
    assert!(cut < full, "cancelled run indexed {} of {}", cut, full);
    // dropping the indexer joins the background context without incident
    drop(indexer);

    // cancellation is "stop early", not "roll back": the partial store
    // still committed and opens cleanly
    let reader = StoreReader::open(dir.path().join("store-cut")).unwrap();
    assert_eq!(reader.doc_count() as usize, cut * 2);
}
