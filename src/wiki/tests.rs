//! Tests for wiki repositories.

use super::*;
use crate::config::{Config, LockBackend, WikiIdentity};
use crate::context::AppContext;
use crate::error::{KbError, codes};
use crate::locks::{CreationLock, LockStore, SqliteLockStore, open_lock_store};
use std::sync::{Arc, Barrier};
use std::thread;
use tempfile::TempDir;

fn setup(identity: WikiIdentity, backend: LockBackend) -> (TempDir, AppContext, Config) {
    let temp_dir = TempDir::new().unwrap();
    let ctx = AppContext::at(temp_dir.path());
    let mut config = Config::default();
    config.wiki.identity = identity;
    config.lock.backend = backend;
    (temp_dir, ctx, config)
}

fn payload(name: &str, path: Option<&str>) -> CreateWikiRepo {
    CreateWikiRepo {
        name: name.to_string(),
        path: path.map(str::to_string),
        description: Some("team docs".to_string()),
        cover: None,
        embedding_model_id: "embed-1".to_string(),
        rerank_model_id: "rerank-1".to_string(),
    }
}

fn lock_entries(ctx: &AppContext, config: &Config) -> usize {
    open_lock_store(ctx, config).unwrap().list().unwrap().len()
}

// ============================================================================
// Validation
// ============================================================================

#[test]
fn test_validate_create_payload() {
    assert!(payload("Docs", Some("docs")).validate(WikiIdentity::Path).is_ok());
    assert!(payload("Docs", None).validate(WikiIdentity::Id).is_ok());

    let err = payload("Docs", None).validate(WikiIdentity::Path).unwrap_err();
    assert!(matches!(err, KbError::ValidationError(_)));
    assert!(err.to_string().contains("path is required"));

    assert!(payload("", Some("docs")).validate(WikiIdentity::Path).is_err());
    assert!(payload(&"n".repeat(256), Some("docs")).validate(WikiIdentity::Path).is_err());
    assert!(payload("Docs", Some("has space")).validate(WikiIdentity::Path).is_err());
    assert!(payload("Docs", Some("a/b")).validate(WikiIdentity::Id).is_err());
    assert!(payload("Docs", Some(&"p".repeat(501))).validate(WikiIdentity::Path).is_err());

    let mut long_description = payload("Docs", Some("docs"));
    long_description.description = Some("d".repeat(1001));
    assert!(long_description.validate(WikiIdentity::Path).is_err());

    let mut no_model = payload("Docs", Some("docs"));
    no_model.rerank_model_id = String::new();
    assert!(no_model.validate(WikiIdentity::Path).is_err());
}

#[test]
fn test_validate_update_patch() {
    assert!(UpdateWikiRepo::default().validate().is_ok());
    assert!(UpdateWikiRepo::default().is_empty());

    let clear_cover = UpdateWikiRepo {
        cover: Some(None),
        ..Default::default()
    };
    assert!(clear_cover.validate().is_ok());
    assert!(!clear_cover.is_empty());

    let blank_name = UpdateWikiRepo {
        name: Some(String::new()),
        ..Default::default()
    };
    assert!(blank_name.validate().is_err());
}

// ============================================================================
// Path identity
// ============================================================================

#[test]
fn test_create_and_get() {
    let (_temp_dir, ctx, config) = setup(WikiIdentity::Path, LockBackend::Sqlite);
    let mut service = WikiRepoService::open(&ctx, &config).unwrap();

    let repo = service.create(payload("Docs", Some("docs")), "alice").unwrap();
    assert_eq!(repo.creator_id, "alice");
    assert_eq!(repo.path.as_deref(), Some("docs"));
    assert!(repo.update_time.is_none());
    assert!(!repo.deleted);

    let by_path = service.get_by_path("docs").unwrap();
    assert_eq!(by_path.id, repo.id);
    assert_eq!(by_path.embedding_model_id, "embed-1");

    let by_id = service.get_by_id(&repo.id).unwrap();
    assert_eq!(by_id, by_path);
    assert_eq!(service.get("docs").unwrap(), by_path);
    assert_eq!(service.get(&repo.id).unwrap(), by_path);

    // The lock is gone once creation finished.
    assert_eq!(lock_entries(&ctx, &config), 0);
}

#[test]
fn test_duplicate_path_rejected_and_lock_released() {
    let (_temp_dir, ctx, config) = setup(WikiIdentity::Path, LockBackend::Sqlite);
    let mut service = WikiRepoService::open(&ctx, &config).unwrap();

    service.create(payload("Docs", Some("docs")), "alice").unwrap();
    let err = service.create(payload("Other", Some("docs")), "bob").unwrap_err();

    match &err {
        KbError::DuplicateKey { code, .. } => assert_eq!(*code, codes::WIKI_REPO_PATH_EXISTS),
        other => panic!("expected DuplicateKey, got {other:?}"),
    }
    assert_eq!(err.status_code(), 409);
    assert_eq!(lock_entries(&ctx, &config), 0);
    assert_eq!(service.list("bob").unwrap().len(), 0);
}

#[test]
fn test_concurrent_same_path_creates_exactly_one() {
    const THREADS: usize = 6;

    for backend in [LockBackend::Sqlite, LockBackend::File] {
        let (_temp_dir, ctx, config) = setup(WikiIdentity::Path, backend);

        // Open every service up front, as separate server instances would be.
        let services: Vec<WikiRepoService> = (0..THREADS)
            .map(|_| WikiRepoService::open(&ctx, &config).unwrap())
            .collect();
        let barrier = Arc::new(Barrier::new(THREADS));

        let handles: Vec<_> = services
            .into_iter()
            .enumerate()
            .map(|(i, mut service)| {
                let barrier = barrier.clone();
                thread::spawn(move || {
                    barrier.wait();
                    service.create(payload(&format!("Docs {i}"), Some("docs")), "alice")
                })
            })
            .collect();

        let results: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();
        let created = results.iter().filter(|r| r.is_ok()).count();
        let duplicates = results
            .iter()
            .filter(|r| matches!(r, Err(KbError::DuplicateKey { .. })))
            .count();

        assert_eq!(created, 1, "{backend:?}: {results:?}");
        assert_eq!(duplicates, THREADS - 1, "{backend:?}: {results:?}");

        let service = WikiRepoService::open(&ctx, &config).unwrap();
        assert_eq!(service.list("alice").unwrap().len(), 1);
        assert_eq!(lock_entries(&ctx, &config), 0);
    }
}

#[test]
fn test_concurrent_creators_same_path_with_custom_key() {
    const THREADS: usize = 4;

    for backend in [LockBackend::Sqlite, LockBackend::File] {
        let (_temp_dir, ctx, mut config) = setup(WikiIdentity::Path, backend);
        config.wiki.create_lock_key = Some("wiki:new:#{path}".to_string());

        let services: Vec<WikiRepoService> = (0..THREADS)
            .map(|_| WikiRepoService::open(&ctx, &config).unwrap())
            .collect();
        let barrier = Arc::new(Barrier::new(THREADS));

        let handles: Vec<_> = services
            .into_iter()
            .enumerate()
            .map(|(i, mut service)| {
                let barrier = barrier.clone();
                thread::spawn(move || {
                    barrier.wait();
                    service.create(payload("Docs", Some("docs")), &format!("user-{i}"))
                })
            })
            .collect();

        let results: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();
        let created = results.iter().filter(|r| r.is_ok()).count();
        assert_eq!(created, 1, "{backend:?}: {results:?}");
        assert!(
            results
                .iter()
                .filter(|r| r.is_err())
                .all(|r| matches!(r, Err(KbError::DuplicateKey { .. }))),
            "{backend:?}: {results:?}"
        );
        assert_eq!(lock_entries(&ctx, &config), 0);
    }
}

#[test]
fn test_path_mode_rejects_creator_scoped_key() {
    let (_temp_dir, ctx, mut config) = setup(WikiIdentity::Path, LockBackend::Sqlite);
    config.wiki.create_lock_key = Some("wiki-repo:create:#{creator_id}".to_string());

    let err = WikiRepoService::open(&ctx, &config).unwrap_err();
    assert!(matches!(err, KbError::UserError(_)));
    assert!(err.to_string().contains("#{creator_id}"), "{err}");
}

#[test]
fn test_concurrent_different_paths_all_succeed() {
    let (_temp_dir, ctx, config) = setup(WikiIdentity::Path, LockBackend::Sqlite);
    let services: Vec<WikiRepoService> = (0..4)
        .map(|_| WikiRepoService::open(&ctx, &config).unwrap())
        .collect();
    let barrier = Arc::new(Barrier::new(services.len()));

    let handles: Vec<_> = services
        .into_iter()
        .enumerate()
        .map(|(i, mut service)| {
            let barrier = barrier.clone();
            thread::spawn(move || {
                barrier.wait();
                service.create(payload("Docs", Some(&format!("docs-{i}"))), "alice")
            })
        })
        .collect();

    for handle in handles {
        handle.join().unwrap().unwrap();
    }

    let service = WikiRepoService::open(&ctx, &config).unwrap();
    assert_eq!(service.list("alice").unwrap().len(), 4);
}

#[test]
fn test_create_times_out_while_path_is_locked() {
    let (_temp_dir, ctx, mut config) = setup(WikiIdentity::Path, LockBackend::Sqlite);
    config.lock.wait_timeout_ms = 100;
    config.lock.poll_interval_ms = 10;
    let mut service = WikiRepoService::open(&ctx, &config).unwrap();

    let other: Arc<dyn LockStore> = Arc::new(SqliteLockStore::open(&ctx.lock_db_path).unwrap());
    let other = CreationLock::new(other, config.lock.policy("unused"));
    let held = other.acquire("wiki-repo:create:docs", CREATE_ACTION).unwrap();

    let err = service.create(payload("Docs", Some("docs")), "alice").unwrap_err();
    match &err {
        KbError::LockTimeout(message) => assert_eq!(message, &config.wiki.create_lock_message),
        other => panic!("expected LockTimeout, got {other:?}"),
    }
    assert!(err.is_retryable());

    // A different path is not blocked.
    service.create(payload("Other", Some("other")), "alice").unwrap();

    drop(held);
    service.create(payload("Docs", Some("docs")), "alice").unwrap();
}

#[test]
fn test_path_reusable_after_delete() {
    let (_temp_dir, ctx, config) = setup(WikiIdentity::Path, LockBackend::Sqlite);
    let mut service = WikiRepoService::open(&ctx, &config).unwrap();

    let first = service.create(payload("Docs", Some("docs")), "alice").unwrap();
    service.delete(&first.id, "alice").unwrap();

    assert!(matches!(service.get_by_path("docs"), Err(KbError::NotFound { .. })));
    assert!(matches!(service.get_by_id(&first.id), Err(KbError::NotFound { .. })));

    let second = service.create(payload("Docs again", Some("docs")), "alice").unwrap();
    assert_ne!(second.id, first.id);
    assert_eq!(service.get_by_path("docs").unwrap().id, second.id);
}

// ============================================================================
// Id identity
// ============================================================================

#[test]
fn test_id_identity_allows_shared_paths() {
    let (_temp_dir, ctx, config) = setup(WikiIdentity::Id, LockBackend::Sqlite);
    let mut service = WikiRepoService::open(&ctx, &config).unwrap();

    let a = service.create(payload("A", Some("docs")), "alice").unwrap();
    let b = service.create(payload("B", Some("docs")), "alice").unwrap();
    let c = service.create(payload("C", None), "alice").unwrap();

    assert_ne!(a.id, b.id);
    assert!(c.path.is_none());
    assert_eq!(service.list("alice").unwrap().len(), 3);
}

#[test]
fn test_id_identity_serializes_on_fixed_key() {
    let (_temp_dir, ctx, mut config) = setup(WikiIdentity::Id, LockBackend::Sqlite);
    config.lock.wait_timeout_ms = 100;
    config.lock.poll_interval_ms = 10;
    let mut service = WikiRepoService::open(&ctx, &config).unwrap();

    let other: Arc<dyn LockStore> = Arc::new(SqliteLockStore::open(&ctx.lock_db_path).unwrap());
    let other = CreationLock::new(other, config.lock.policy("unused"));
    let held = other.acquire("wiki-repo:create", CREATE_ACTION).unwrap();

    let err = service.create(payload("Any", None), "bob").unwrap_err();
    assert!(matches!(err, KbError::LockTimeout(_)));

    drop(held);
    service.create(payload("Any", None), "bob").unwrap();
}

#[test]
fn test_id_identity_with_per_creator_key() {
    let (_temp_dir, ctx, mut config) = setup(WikiIdentity::Id, LockBackend::File);
    config.wiki.create_lock_key = Some("wiki-repo:create:#{creator_id}".to_string());
    config.lock.wait_timeout_ms = 100;
    config.lock.poll_interval_ms = 10;
    let mut service = WikiRepoService::open(&ctx, &config).unwrap();

    let other = CreationLock::new(
        open_lock_store(&ctx, &config).unwrap(),
        config.lock.policy("unused"),
    );
    let _held = other.acquire("wiki-repo:create:alice", CREATE_ACTION).unwrap();

    // Bob's key is independent of Alice's.
    service.create(payload("Bob's", None), "bob").unwrap();
    assert!(matches!(
        service.create(payload("Alice's", None), "alice"),
        Err(KbError::LockTimeout(_))
    ));
}

// ============================================================================
// List / update / delete
// ============================================================================

#[test]
fn test_list_is_per_creator_and_ordered() {
    let (_temp_dir, ctx, config) = setup(WikiIdentity::Path, LockBackend::Sqlite);
    let mut service = WikiRepoService::open(&ctx, &config).unwrap();

    let a = service.create(payload("A", Some("a")), "alice").unwrap();
    thread::sleep(std::time::Duration::from_millis(5));
    let b = service.create(payload("B", Some("b")), "alice").unwrap();
    service.create(payload("C", Some("c")), "bob").unwrap();

    let ids: Vec<String> = service.list("alice").unwrap().into_iter().map(|r| r.id).collect();
    assert_eq!(ids, vec![b.id.clone(), a.id.clone()]);

    // Touching `a` moves it to the front.
    let patch = UpdateWikiRepo {
        name: Some("A2".to_string()),
        ..Default::default()
    };
    service.update(&a.id, patch, "alice").unwrap();
    let ids: Vec<String> = service.list("alice").unwrap().into_iter().map(|r| r.id).collect();
    assert_eq!(ids, vec![a.id, b.id]);

    assert!(service.list("nobody").unwrap().is_empty());
}

#[test]
fn test_update_applies_patch() {
    let (_temp_dir, ctx, config) = setup(WikiIdentity::Path, LockBackend::Sqlite);
    let mut service = WikiRepoService::open(&ctx, &config).unwrap();
    let mut create = payload("Docs", Some("docs"));
    create.cover = Some("https://example.com/c.png".to_string());
    let repo = service.create(create, "alice").unwrap();

    let patch = UpdateWikiRepo {
        name: Some("Handbook".to_string()),
        cover: Some(None),
        rerank_model_id: Some("rerank-2".to_string()),
        ..Default::default()
    };
    let updated = service.update(&repo.id, patch, "alice").unwrap();

    assert_eq!(updated.name, "Handbook");
    assert_eq!(updated.cover, None);
    assert_eq!(updated.description.as_deref(), Some("team docs"));
    assert_eq!(updated.rerank_model_id, "rerank-2");
    assert_eq!(updated.path.as_deref(), Some("docs"));
    assert_eq!(updated.updater_id.as_deref(), Some("alice"));
    assert!(updated.update_time.is_some());

    let detail = service.get_by_id(&repo.id).unwrap();
    assert_eq!(detail.name, "Handbook");
    assert_eq!(detail.cover, None);
}

#[test]
fn test_update_and_delete_require_creator() {
    let (_temp_dir, ctx, config) = setup(WikiIdentity::Path, LockBackend::Sqlite);
    let mut service = WikiRepoService::open(&ctx, &config).unwrap();
    let repo = service.create(payload("Docs", Some("docs")), "alice").unwrap();

    let patch = UpdateWikiRepo {
        name: Some("Mine now".to_string()),
        ..Default::default()
    };
    let err = service.update(&repo.id, patch, "mallory").unwrap_err();
    match &err {
        KbError::AccessDenied { code, .. } => assert_eq!(*code, codes::WIKI_REPO_ACCESS_DENIED),
        other => panic!("expected AccessDenied, got {other:?}"),
    }

    let err = service.delete(&repo.id, "mallory").unwrap_err();
    assert!(matches!(err, KbError::AccessDenied { .. }));
    assert_eq!(service.get_by_id(&repo.id).unwrap().name, "Docs");
}

#[test]
fn test_missing_repo_is_not_found() {
    let (_temp_dir, ctx, config) = setup(WikiIdentity::Path, LockBackend::Sqlite);
    let mut service = WikiRepoService::open(&ctx, &config).unwrap();

    let err = service.get("nope").unwrap_err();
    match &err {
        KbError::NotFound { code, .. } => assert_eq!(*code, codes::WIKI_REPO_NOT_FOUND),
        other => panic!("expected NotFound, got {other:?}"),
    }
    assert!(matches!(
        service.update("nope", UpdateWikiRepo::default(), "alice"),
        Err(KbError::NotFound { .. })
    ));
    assert!(matches!(service.delete("nope", "alice"), Err(KbError::NotFound { .. })));

    let repo = service.create(payload("Docs", Some("docs")), "alice").unwrap();
    service.delete(&repo.id, "alice").unwrap();
    assert!(matches!(service.delete(&repo.id, "alice"), Err(KbError::NotFound { .. })));
    assert!(service.list("alice").unwrap().is_empty());
}
