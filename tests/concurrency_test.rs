//! Concurrency tests for the file store.
//!
//! Writers on separate threads (sharing one store, or holding separate
//! connections to one database file) must never corrupt the tree.

use std::sync::{Arc, Barrier};
use std::thread;

use filemeta::storage::StoreOptions;
use filemeta::{Error, FileEntity, ManagerOptions, SqliteStore, StorageManager};

const THREADS: usize = 8;

fn on_disk_manager(db: &std::path::Path) -> StorageManager {
    let store = SqliteStore::open(db, "alice", StoreOptions::default()).unwrap();
    StorageManager::new(Arc::new(store), ManagerOptions::default())
}

#[test]
fn test_concurrent_distinct_inserts() {
    let store = Arc::new(SqliteStore::open_in_memory("alice").unwrap());
    let manager = Arc::new(StorageManager::new(store, ManagerOptions::default()));
    manager.save_file(&mut FileEntity::folder("/shared").unwrap()).unwrap();

    let barrier = Arc::new(Barrier::new(THREADS));
    let handles: Vec<_> = (0..THREADS)
        .map(|t| {
            let manager = Arc::clone(&manager);
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                barrier.wait();
                for i in 0..50 {
                    let mut file = FileEntity::file(&format!("/shared/{}-{}.txt", t, i)).unwrap();
                    manager.save_file(&mut file)?;
                }
                Ok::<_, Error>(())
            })
        })
        .collect();

    for handle in handles {
        handle.join().unwrap().unwrap();
    }

    let shared = manager.get_file_by_path("/shared").unwrap().unwrap();
    assert_eq!(manager.get_folder_content(&shared, false).unwrap().len(), THREADS * 50);
    assert!(manager.check_consistency().unwrap().is_empty());
}

#[test]
fn test_concurrent_same_path_single_winner() {
    let dir = tempfile::tempdir().unwrap();
    let db = dir.path().join("files.db");
    on_disk_manager(&db).get_root().unwrap();

    let barrier = Arc::new(Barrier::new(THREADS));
    let handles: Vec<_> = (0..THREADS)
        .map(|t| {
            let db = db.clone();
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                let manager = on_disk_manager(&db);
                let mut file = FileEntity::file("/contested.txt").unwrap().with_etag(format!("writer-{}", t));
                barrier.wait();
                manager.save_file(&mut file)
            })
        })
        .collect();

    let results: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();
    let winners = results.iter().filter(|r| r.is_ok()).count();
    assert_eq!(winners, 1, "exactly one insert may win: {:?}", results);
    for result in results.iter().filter(|r| r.is_err()) {
        assert!(
            matches!(result, Err(Error::ConstraintViolation(_))),
            "losers fail on the unique path: {:?}",
            result
        );
    }

    let manager = on_disk_manager(&db);
    let root = manager.get_root().unwrap();
    assert_eq!(manager.get_folder_content(&root, false).unwrap().len(), 1);
}

#[test]
fn test_concurrent_root_creation() {
    let dir = tempfile::tempdir().unwrap();
    let db = dir.path().join("files.db");
    SqliteStore::open(&db, "alice", StoreOptions::default()).unwrap();

    let barrier = Arc::new(Barrier::new(THREADS));
    let handles: Vec<_> = (0..THREADS)
        .map(|_| {
            let db = db.clone();
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                let manager = on_disk_manager(&db);
                barrier.wait();
                manager.get_root().map(|root| root.id)
            })
        })
        .collect();

    let ids: Vec<_> = handles.into_iter().map(|h| h.join().unwrap().unwrap()).collect();
    assert!(ids.windows(2).all(|w| w[0] == w[1]));
    assert_eq!(on_disk_manager(&db).stats().unwrap().folders, 1);
}

#[test]
fn test_reader_never_sees_partial_move() {
    let store = Arc::new(SqliteStore::open_in_memory("alice").unwrap());
    let manager = Arc::new(StorageManager::new(store, ManagerOptions::default()));
    for path in ["/left/", "/right/", "/left/box/"] {
        manager.save_file(&mut FileEntity::new(path).unwrap()).unwrap();
    }
    let mut items: Vec<FileEntity> = (0..100)
        .map(|i| FileEntity::file(&format!("/left/box/{}.dat", i)).unwrap())
        .collect();
    manager.save_files(&mut items).unwrap();

    let mover = {
        let manager = Arc::clone(&manager);
        thread::spawn(move || {
            for round in 0..20 {
                let (from, to) = if round % 2 == 0 { ("/left", "/right") } else { ("/right", "/left") };
                let boxed = manager.get_file_by_path(&format!("{}/box", from)).unwrap().unwrap();
                let target = manager.get_file_by_path(to).unwrap().unwrap();
                manager.move_file(&boxed, &target).unwrap();
            }
        })
    };

    for _ in 0..50 {
        let left = manager.get_file_by_path("/left/box").unwrap();
        let right = manager.get_file_by_path("/right/box").unwrap();
        for found in left.into_iter().chain(right) {
            let children = manager.get_folder_content(&found, false).unwrap();
            assert_eq!(children.len(), 100);
            // One listing reflects one committed state of the move
            let prefix = children[0].path.parent().unwrap();
            assert!(children.iter().all(|c| c.path.parent().as_ref() == Some(&prefix)));
        }
    }

    mover.join().unwrap();
    assert!(manager.check_consistency().unwrap().is_empty());
}
