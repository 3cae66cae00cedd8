//! End-to-end tests for the storage manager.
//!
//! These run against real SQLite databases (in memory and on disk) through
//! the public API only.

use std::sync::Arc;

use filemeta::manager::ListOptions;
use filemeta::storage::StoreOptions;
use filemeta::{Error, FileEntity, ManagerOptions, ParentPolicy, SqliteStore, StorageManager};

fn manager() -> StorageManager {
    let store = SqliteStore::open_in_memory("alice@cloud.example.com").unwrap();
    StorageManager::new(Arc::new(store), ManagerOptions::default())
}

fn paths(entities: &[FileEntity]) -> Vec<String> {
    entities.iter().map(|e| e.path.to_string()).collect()
}

#[test]
fn test_single_file_in_root() {
    let manager = manager();
    let mut file = FileEntity::new("/1.txt").unwrap();
    manager.save_file(&mut file).unwrap();

    let root = manager.get_root().unwrap();
    let children = manager.get_folder_content(&root, false).unwrap();
    assert_eq!(children.len(), 1);
    assert_eq!(children[0].path.as_str(), "/1.txt");
    assert_eq!(children[0].parent_id, root.id);
    assert!(!children[0].is_folder);
}

#[test]
fn test_twenty_thousand_files_in_one_folder() {
    const COUNT: usize = 20_000;

    let manager = manager();
    let mut folder = FileEntity::folder("/bulk").unwrap();
    manager.save_file(&mut folder).unwrap();

    let mut files: Vec<FileEntity> = (0..COUNT)
        .map(|i| FileEntity::file(&format!("/bulk/{}.txt", i)).unwrap().with_size(i as u64))
        .collect();
    let ids = manager.save_files(&mut files).unwrap();
    assert_eq!(ids.len(), COUNT);
    assert!(files.iter().all(|f| f.id.is_some()));

    let children = manager.get_folder_content(&folder, false).unwrap();
    assert_eq!(children.len(), COUNT);

    for (i, id) in ids.iter().enumerate() {
        let found = manager
            .get_file_by_path(&format!("/bulk/{}.txt", i))
            .unwrap()
            .unwrap_or_else(|| panic!("/bulk/{}.txt not resolvable", i));
        assert_eq!(found.id, Some(*id));
        assert_eq!(found.size, i as u64);
    }
}

#[test]
fn test_oversized_batch_is_rejected_by_store() {
    let store = SqliteStore::open_in_memory_with(
        "alice",
        StoreOptions {
            max_batch_rows: 2,
            ..StoreOptions::default()
        },
    )
    .unwrap();
    store.ensure_root().unwrap();

    let batch: Vec<FileEntity> = ["/a", "/b", "/c"]
        .iter()
        .map(|p| FileEntity::file(p).unwrap())
        .collect();
    assert!(matches!(store.batch_insert(&batch), Err(Error::Validation(_))));
    assert_eq!(store.stats().unwrap().files, 0);

    // The manager splits the same rows into atomic units
    let manager = StorageManager::new(Arc::new(store), ManagerOptions::default());
    let mut batch = batch;
    manager.save_files(&mut batch).unwrap();
    assert_eq!(manager.stats().unwrap().files, 3);
}

#[test]
fn test_cascade_delete_removes_subtree() {
    let manager = manager();
    let mut a = FileEntity::new("/a/").unwrap();
    let mut b = FileEntity::new("/a/b/").unwrap();
    let mut c = FileEntity::new("/a/b/c.txt").unwrap();
    manager.save_file(&mut a).unwrap();
    manager.save_file(&mut b).unwrap();
    manager.save_file(&mut c).unwrap();

    assert!(matches!(
        manager.remove_file(&a, false),
        Err(Error::ConstraintViolation(_))
    ));
    assert!(manager.get_file_by_path("/a/b/c.txt").unwrap().is_some());

    let removed = manager.remove_file(&a, true).unwrap();
    assert_eq!(removed, 3);

    for path in ["/a", "/a/b", "/a/b/c.txt"] {
        assert!(manager.get_file_by_path(path).unwrap().is_none(), "{} still present", path);
    }
    for entity in [&a, &b, &c] {
        assert!(manager.get_file_by_id(entity.id.unwrap()).unwrap().is_none());
    }

    let root = manager.get_root().unwrap();
    assert!(manager.get_folder_content(&root, true).unwrap().is_empty());
    assert!(manager.check_consistency().unwrap().is_empty());
}

#[test]
fn test_cyclic_move_leaves_tree_unchanged() {
    let manager = manager();
    let mut x = FileEntity::folder("/x").unwrap();
    let mut y = FileEntity::folder("/x/y").unwrap();
    let mut z = FileEntity::file("/x/y/z.bin").unwrap();
    manager.save_file(&mut x).unwrap();
    manager.save_file(&mut y).unwrap();
    manager.save_file(&mut z).unwrap();

    assert!(matches!(manager.move_file(&x, &y), Err(Error::Cycle(_))));
    assert!(matches!(manager.move_file(&x, &x), Err(Error::Cycle(_))));

    let x_now = manager.get_file_by_id(x.id.unwrap()).unwrap().unwrap();
    assert_eq!(x_now.path.as_str(), "/x");
    assert_eq!(x_now.parent_id, manager.get_root().unwrap().id);
    assert_eq!(
        manager.get_file_by_path("/x/y/z.bin").unwrap().unwrap().id,
        z.id
    );
    assert!(manager.check_consistency().unwrap().is_empty());
}

#[test]
fn test_move_rewrites_descendant_paths() {
    let manager = manager();
    for path in ["/src/", "/src/lib/", "/dst/"] {
        manager.save_file(&mut FileEntity::new(path).unwrap()).unwrap();
    }
    let mut leaf = FileEntity::file("/src/lib/mod.rs").unwrap();
    manager.save_file(&mut leaf).unwrap();

    let lib = manager.get_file_by_path("/src/lib").unwrap().unwrap();
    let dst = manager.get_file_by_path("/dst").unwrap().unwrap();
    let moved = manager.move_file(&lib, &dst).unwrap();
    assert_eq!(moved.path.as_str(), "/dst/lib");
    assert_eq!(moved.id, lib.id);

    assert!(manager.get_file_by_path("/src/lib/mod.rs").unwrap().is_none());
    let leaf_now = manager.get_file_by_path("/dst/lib/mod.rs").unwrap().unwrap();
    assert_eq!(leaf_now.id, leaf.id);
    assert_eq!(leaf_now.parent_id, lib.id);

    let renamed = manager.rename_file(&moved, "library").unwrap();
    assert_eq!(renamed.path.as_str(), "/dst/library");
    assert_eq!(
        paths(&manager.get_folder_content(&renamed, false).unwrap()),
        vec!["/dst/library/mod.rs"]
    );
    assert!(manager.check_consistency().unwrap().is_empty());
}

#[test]
fn test_root_is_idempotent() {
    let manager = manager();
    let first = manager.get_root().unwrap();
    let second = manager.get_root().unwrap();
    assert_eq!(first.id, second.id);
    assert!(first.is_folder);
    assert_eq!(manager.stats().unwrap().folders, 1);
}

#[test]
fn test_missing_parent_policies() {
    let manager = manager();
    let mut orphan = FileEntity::file("/no/such/dir/file.txt").unwrap();
    assert!(matches!(
        manager.save_file(&mut orphan),
        Err(Error::MissingParent(_))
    ));
    assert!(orphan.id.is_none());

    let store = SqliteStore::open_in_memory("alice").unwrap();
    let options = ManagerOptions::new(ParentPolicy::CreatePlaceholders, &[]).unwrap();
    let manager = StorageManager::new(Arc::new(store), options);
    manager.save_file(&mut orphan).unwrap();

    for folder in ["/no", "/no/such", "/no/such/dir"] {
        assert!(manager.get_file_by_path(folder).unwrap().unwrap().is_folder);
    }
    assert!(manager.check_consistency().unwrap().is_empty());
}

#[test]
fn test_soft_delete_frees_path() {
    let manager = manager();
    let mut doc = FileEntity::file("/doc.txt").unwrap().with_etag("v1");
    manager.save_file(&mut doc).unwrap();

    manager.mark_file_deleted(&doc).unwrap();
    assert!(manager.get_file_by_path("/doc.txt").unwrap().is_none());

    let mut replacement = FileEntity::file("/doc.txt").unwrap().with_etag("v2");
    manager.save_file(&mut replacement).unwrap();
    assert_ne!(replacement.id, doc.id);

    let root = manager.get_root().unwrap();
    let with_deleted = manager
        .list_folder(
            &root,
            ListOptions {
                include_deleted: true,
                ..ListOptions::default()
            },
        )
        .unwrap();
    assert_eq!(with_deleted.len(), 2);

    assert_eq!(manager.purge_deleted().unwrap(), 1);
    assert_eq!(manager.stats().unwrap().deleted, 0);
}

#[test]
fn test_on_disk_database_survives_reopen() {
    let dir = tempfile::tempdir().unwrap();
    let db = dir.path().join("files.db");

    let file_id = {
        let store = SqliteStore::open(&db, "alice", StoreOptions::default()).unwrap();
        let manager = StorageManager::new(Arc::new(store), ManagerOptions::default());
        manager.save_file(&mut FileEntity::folder("/Photos").unwrap()).unwrap();
        let mut photo = FileEntity::file("/Photos/beach.jpg")
            .unwrap()
            .with_remote_id("remote-42")
            .with_size(204_800);
        manager.save_file(&mut photo).unwrap()
    };

    let store = SqliteStore::open(&db, "alice", StoreOptions::default()).unwrap();
    let manager = StorageManager::new(Arc::new(store), ManagerOptions::default());
    let photo = manager.get_file_by_path("/Photos/beach.jpg").unwrap().unwrap();
    assert_eq!(photo.id, Some(file_id));
    assert_eq!(photo.size, 204_800);
    assert_eq!(
        manager.get_file_by_remote_id("remote-42").unwrap().unwrap().id,
        Some(file_id)
    );

    // Identifiers are not reused after deletion
    manager.remove_file(&photo, false).unwrap();
    let mut next = FileEntity::file("/Photos/beach.jpg").unwrap();
    let next_id = manager.save_file(&mut next).unwrap();
    assert!(next_id > file_id);
}

#[test]
fn test_twenty_thousand_sequential_saves_under_root() {
    const COUNT: usize = 20_000;

    let manager = manager();
    let root = manager.get_root().unwrap();
    let root_id = root.id.unwrap();

    for i in 0..COUNT {
        let mut file = FileEntity::new(&format!("/{}.txt", i)).unwrap();
        file.set_parent_id(root_id);
        manager.save_file(&mut file).unwrap();
    }

    assert_eq!(manager.get_folder_content(&root, false).unwrap().len(), COUNT);
    for i in (0..COUNT).step_by(997) {
        let found = manager.get_file_by_path(&format!("/{}.txt", i)).unwrap().unwrap();
        assert_eq!(found.parent_id, Some(root_id));
    }
}

#[test]
fn test_locked_database_fails_one_write_only() {
    let dir = tempfile::tempdir().unwrap();
    let db = dir.path().join("files.db");
    let options = StoreOptions {
        busy_timeout: std::time::Duration::from_millis(50),
        ..StoreOptions::default()
    };
    let store = SqliteStore::open(&db, "alice", options).unwrap();
    let manager = StorageManager::new(Arc::new(store), ManagerOptions::default());
    manager.get_root().unwrap();

    let other = rusqlite::Connection::open(&db).unwrap();
    other.execute_batch("BEGIN IMMEDIATE").unwrap();

    let mut blocked = FileEntity::file("/blocked.txt").unwrap();
    let err = manager.save_file(&mut blocked).unwrap_err();
    assert!(matches!(err, Error::StorageUnavailable(_)), "{:?}", err);
    assert!(err.is_transient());
    assert!(blocked.id.is_none());

    other.execute_batch("ROLLBACK").unwrap();

    let mut retried = FileEntity::file("/blocked.txt").unwrap();
    manager.save_file(&mut retried).unwrap();
    assert_eq!(
        manager.get_file_by_path("/blocked.txt").unwrap().unwrap().id,
        retried.id
    );
    assert!(manager.check_consistency().unwrap().is_empty());
}
