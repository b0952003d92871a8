//! Store Durability Integration Tests
//!
//! Records written through a file-backed ledger must survive a full
//! shutdown and come back with their identity intact.

use crate::*;
use ledgerdb::FileBackend;
use tempfile::TempDir;

fn file_ledger(dir: &TempDir, write_mode: WriteMode) -> Ledger {
    init_tracing();
    let backend = Arc::new(FileBackend::new(dir.path()).unwrap());
    Ledger::builder()
        .store_backend(backend)
        .write_mode(write_mode)
        .build()
        .unwrap()
}

#[test]
fn test_sync_writes_survive_restart() {
    let dir = TempDir::new().unwrap();

    let ledger = file_ledger(&dir, WriteMode::Sync);
    ledger.store.put("agent:1", json!({"role": "planner"})).unwrap();
    ledger.store.put("agent:2", json!({"role": "worker"})).unwrap();
    let original = ledger.store.query(&Filter::new()).unwrap();
    ledger.close();

    let reopened = file_ledger(&dir, WriteMode::Sync);
    assert_eq!(
        reopened.store.get("agent:1").unwrap(),
        json!({"role": "planner"})
    );
    assert_eq!(reopened.store.list().unwrap().len(), 2);

    // Identity survives, not just the payload.
    let mut restored = reopened.store.query(&Filter::new()).unwrap();
    restored.sort_by(|a, b| a.key.cmp(&b.key));
    let mut expected = original;
    expected.sort_by(|a, b| a.key.cmp(&b.key));
    for (restored, expected) in restored.iter().zip(&expected) {
        assert_eq!(restored.id, expected.id);
        assert_eq!(restored.inserted_at, expected.inserted_at);
    }
}

#[test]
fn test_async_writes_are_drained_by_close() {
    let dir = TempDir::new().unwrap();

    let ledger = file_ledger(&dir, WriteMode::Async);
    for i in 0..50 {
        ledger
            .store
            .put(&format!("item:{i}"), json!({"seq": i}))
            .unwrap();
    }
    // close() joins the background writer after it drains the queue.
    ledger.close();

    let reopened = file_ledger(&dir, WriteMode::Sync);
    assert_eq!(reopened.store.list().unwrap().len(), 50);
    assert_eq!(reopened.store.get("item:49").unwrap(), json!({"seq": 49}));
}

#[test]
fn test_delete_reaches_the_backend() {
    let dir = TempDir::new().unwrap();

    let ledger = file_ledger(&dir, WriteMode::Sync);
    ledger.store.put("keep", json!(1)).unwrap();
    ledger.store.put("drop", json!(2)).unwrap();
    ledger.store.delete("drop").unwrap();
    ledger.close();

    let reopened = file_ledger(&dir, WriteMode::Sync);
    assert_eq!(reopened.store.list().unwrap(), vec!["keep"]);
}

#[test]
fn test_overwrite_persists_the_latest_value() {
    let dir = TempDir::new().unwrap();

    let ledger = file_ledger(&dir, WriteMode::Sync);
    ledger.store.put("doc", json!({"v": 1})).unwrap();
    ledger.store.put("doc", json!({"v": 2})).unwrap();
    ledger.close();

    let reopened = file_ledger(&dir, WriteMode::Sync);
    assert_eq!(reopened.store.get("doc").unwrap(), json!({"v": 2}));
}

#[test]
fn test_corrupt_record_is_skipped_not_fatal() {
    let dir = TempDir::new().unwrap();

    let ledger = file_ledger(&dir, WriteMode::Sync);
    ledger.store.put("good", json!({"ok": true})).unwrap();
    ledger.store.put("bad", json!({"ok": false})).unwrap();
    ledger.close();

    // Corrupt one record file on disk. Startup must load what it can.
    let victim = std::fs::read_dir(dir.path())
        .unwrap()
        .map(|entry| entry.unwrap().path())
        .find(|path| {
            std::fs::read_to_string(path)
                .map(|body| body.contains("false"))
                .unwrap_or(false)
        })
        .expect("record file for 'bad' not found");
    std::fs::write(&victim, "{ not json").unwrap();

    let reopened = file_ledger(&dir, WriteMode::Sync);
    assert_eq!(reopened.store.list().unwrap(), vec!["good"]);
    assert_eq!(reopened.store.get("good").unwrap(), json!({"ok": true}));
}

#[test]
fn test_foreign_files_in_the_directory_are_ignored() {
    let dir = TempDir::new().unwrap();
    std::fs::write(dir.path().join("README.txt"), "not a record").unwrap();

    let ledger = file_ledger(&dir, WriteMode::Sync);
    assert!(ledger.store.list().unwrap().is_empty());

    ledger.store.put("doc", json!(1)).unwrap();
    assert_eq!(ledger.store.list().unwrap(), vec!["doc"]);
}
