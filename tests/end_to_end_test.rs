//! End-to-end scenarios over a real temp repository: indexing, call-graph
//! traversal and pack generation through the public API only.

use std::fs;
use std::path::Path;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;

use pui::{GraphEngine, Indexer, RepoMapPack, Settings, Store};

fn write(repo: &Path, rel: &str, content: &str) {
    let path = repo.join(rel);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).unwrap();
    }
    fs::write(path, content).unwrap();
}

fn index(repo: &Path, settings: &Settings, store: &Store) -> pui::IndexStats {
    let indexer = Indexer::new(repo, settings, store);
    let cancel = Arc::new(AtomicBool::new(false));
    indexer.run(false, &cancel).expect("index run should succeed")
}

#[test]
fn single_file_call_graph_is_traversable_in_both_directions() {
    let repo = tempfile::tempdir().unwrap();
    write(
        repo.path(),
        "lib.rs",
        "fn helper() {}\n\nfn caller() {\n    helper();\n}\n",
    );

    let settings = Settings::default();
    let store = Store::open_in_memory().unwrap();
    let stats = index(repo.path(), &settings, &store);
    assert_eq!(stats.files_new, 1);
    assert!(stats.symbols_added >= 2);

    let caller = store.get_symbol_by_name("caller").unwrap().expect("caller symbol indexed");
    let helper = store.get_symbol_by_name("helper").unwrap().expect("helper symbol indexed");

    let graph = GraphEngine::new(&store);
    let callees = graph.callees(caller.id, 2, 0.0).unwrap();
    assert!(callees.iter().any(|n| n.symbol_id == helper.id));

    let callers = graph.callers(helper.id, 2, 0.0).unwrap();
    assert!(callers.iter().any(|n| n.symbol_id == caller.id));
}

#[test]
fn adding_a_test_file_surfaces_it_as_a_test_in_impact() {
    let repo = tempfile::tempdir().unwrap();
    write(repo.path(), "src/lib.rs", "pub fn widget() {}\n");

    let settings = Settings::default();
    let store = Store::open_in_memory().unwrap();
    index(repo.path(), &settings, &store);

    write(
        repo.path(),
        "tests/widget_test.rs",
        "fn test_widget() {\n    widget();\n}\n",
    );
    let stats = index(repo.path(), &settings, &store);
    assert_eq!(stats.files_new, 1);

    let widget = store.get_symbol_by_name("widget").unwrap().expect("widget indexed");
    let graph = GraphEngine::new(&store);
    let result = graph
        .impact(vec![pui::graph::ImpactTarget::Symbol(widget.id)], 2)
        .unwrap();
    assert!(!result.affected_tests.is_empty());
}

#[test]
fn deleting_a_file_removes_its_symbols_from_the_store() {
    let repo = tempfile::tempdir().unwrap();
    write(repo.path(), "a.rs", "fn temporary() {}\n");

    let settings = Settings::default();
    let store = Store::open_in_memory().unwrap();
    index(repo.path(), &settings, &store);
    assert!(store.get_symbol_by_name("temporary").unwrap().is_some());

    fs::remove_file(repo.path().join("a.rs")).unwrap();
    let stats = index(repo.path(), &settings, &store);
    assert_eq!(stats.files_deleted, 1);
    assert!(store.get_symbol_by_name("temporary").unwrap().is_none());
}

#[test]
fn repomap_respects_a_tight_budget_across_thirty_files() {
    let repo = tempfile::tempdir().unwrap();
    for i in 0..30 {
        write(
            repo.path(),
            &format!("module_{i}.rs"),
            &format!("pub fn function_{i}() {{}}\npub struct Struct{i};\n"),
        );
    }

    let settings = Settings::default();
    let store = Store::open_in_memory().unwrap();
    let stats = index(repo.path(), &settings, &store);
    assert_eq!(stats.files_new, 30);

    let budget = 500;
    let pack = RepoMapPack::generate(&store, budget, None).unwrap();
    let rendered = pack.to_markdown();
    assert!(pui::budget::estimate_tokens(&rendered, true) <= (budget as f64 * 1.1) as usize);
}

#[test]
fn call_cycles_do_not_loop_forever_or_include_the_origin() {
    let repo = tempfile::tempdir().unwrap();
    write(
        repo.path(),
        "cycle.rs",
        "fn a() {\n    b();\n}\n\nfn b() {\n    a();\n}\n",
    );

    let settings = Settings::default();
    let store = Store::open_in_memory().unwrap();
    index(repo.path(), &settings, &store);

    let a = store.get_symbol_by_name("a").unwrap().expect("a indexed");
    let graph = GraphEngine::new(&store);
    let callers = graph.callers(a.id, 10, 0.0).unwrap();
    assert!(!callers.iter().any(|n| n.symbol_id == a.id));
}

#[test]
fn repomap_generation_is_idempotent() {
    let repo = tempfile::tempdir().unwrap();
    write(repo.path(), "one.rs", "pub fn alpha() {}\n");
    write(repo.path(), "two.rs", "pub fn beta() {}\n");

    let settings = Settings::default();
    let store = Store::open_in_memory().unwrap();
    index(repo.path(), &settings, &store);

    let first = RepoMapPack::generate(&store, settings.budgets.repomap, None).unwrap();
    let second = RepoMapPack::generate(&store, settings.budgets.repomap, None).unwrap();
    assert_eq!(first.to_markdown(), second.to_markdown());
    assert_eq!(first.to_json(), second.to_json());
}
