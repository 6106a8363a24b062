//! Tests for model providers.

use super::*;
use crate::config::{Config, LockBackend};
use crate::context::AppContext;
use crate::error::{KbError, codes};
use crate::locks::{CreationLock, open_lock_store};
use crate::model::{CreateModel, ModelService, ModelType};
use serde_json::json;
use std::sync::{Arc, Barrier};
use std::thread;
use tempfile::TempDir;

fn setup() -> (TempDir, AppContext, Config) {
    let temp_dir = TempDir::new().unwrap();
    let ctx = AppContext::at(temp_dir.path());
    (temp_dir, ctx, Config::default())
}

fn payload(platform: Platform) -> CreateModelProvider {
    CreateModelProvider {
        platform,
        api_key: "sk-test-key".to_string(),
        api_base_url: Some("https://api.example.com/v1".to_string()),
        description: None,
        config: Some(json!({"timeout_ms": 30000})),
    }
}

#[test]
fn test_create_and_get() {
    let (_temp_dir, ctx, config) = setup();
    let mut service = ModelProviderService::open(&ctx, &config).unwrap();

    let created = service.create(payload(Platform::Deepseek), "alice").unwrap();
    let fetched = service.get_by_id(&created.id).unwrap();

    assert_eq!(fetched, created);
    assert_eq!(fetched.platform, Platform::Deepseek);
    assert_eq!(fetched.config, Some(json!({"timeout_ms": 30000})));
    assert_eq!(fetched.creator_id, "alice");
}

#[test]
fn test_one_provider_per_platform_and_creator() {
    let (_temp_dir, ctx, config) = setup();
    let mut service = ModelProviderService::open(&ctx, &config).unwrap();

    service.create(payload(Platform::Deepseek), "alice").unwrap();

    let err = service.create(payload(Platform::Deepseek), "alice").unwrap_err();
    match &err {
        KbError::DuplicateKey { code, message } => {
            assert_eq!(*code, codes::MODEL_PROVIDER_PLATFORM_EXISTS);
            assert!(message.contains("already exists"));
        }
        other => panic!("expected DuplicateKey, got {other:?}"),
    }

    // Other platforms and other creators are unaffected.
    service.create(payload(Platform::VolcanoArk), "alice").unwrap();
    service.create(payload(Platform::Deepseek), "bob").unwrap();
    assert_eq!(service.list("alice").unwrap().len(), 2);
}

#[test]
fn test_concurrent_registration_creates_one() {
    const THREADS: usize = 4;

    for backend in [LockBackend::Sqlite, LockBackend::File] {
        let (_temp_dir, ctx, mut config) = setup();
        config.lock.backend = backend;

        let services: Vec<ModelProviderService> = (0..THREADS)
            .map(|_| ModelProviderService::open(&ctx, &config).unwrap())
            .collect();
        let barrier = Arc::new(Barrier::new(THREADS));

        let handles: Vec<_> = services
            .into_iter()
            .map(|mut service| {
                let barrier = barrier.clone();
                thread::spawn(move || {
                    barrier.wait();
                    service.create(payload(Platform::AlibabaTongyi), "alice")
                })
            })
            .collect();

        let results: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();
        assert_eq!(results.iter().filter(|r| r.is_ok()).count(), 1, "{backend:?}");
        assert!(
            results
                .iter()
                .filter(|r| r.is_err())
                .all(|r| matches!(r, Err(KbError::DuplicateKey { .. }))),
            "{backend:?}: {results:?}"
        );
    }
}

#[test]
fn test_create_times_out_while_key_is_held() {
    let (_temp_dir, ctx, mut config) = setup();
    config.lock.wait_timeout_ms = 100;
    config.lock.poll_interval_ms = 10;
    let mut service = ModelProviderService::open(&ctx, &config).unwrap();

    let other = CreationLock::new(
        open_lock_store(&ctx, &config).unwrap(),
        config.lock.policy("unused"),
    );
    let _held = other
        .acquire("model-provider:create:alice:DEEPSEEK", CREATE_ACTION)
        .unwrap();

    let err = service.create(payload(Platform::Deepseek), "alice").unwrap_err();
    match err {
        KbError::LockTimeout(message) => assert_eq!(message, config.provider.create_lock_message),
        other => panic!("expected LockTimeout, got {other:?}"),
    }

    service.create(payload(Platform::VolcanoArk), "alice").unwrap();
}

#[test]
fn test_platform_reusable_after_delete() {
    let (_temp_dir, ctx, config) = setup();
    let mut service = ModelProviderService::open(&ctx, &config).unwrap();

    let first = service.create(payload(Platform::Deepseek), "alice").unwrap();
    service.delete(&first.id, "alice").unwrap();
    assert!(matches!(service.get_by_id(&first.id), Err(KbError::NotFound { .. })));

    let second = service.create(payload(Platform::Deepseek), "alice").unwrap();
    assert_ne!(second.id, first.id);
}

#[test]
fn test_update_applies_patch() {
    let (_temp_dir, ctx, config) = setup();
    let mut service = ModelProviderService::open(&ctx, &config).unwrap();
    let created = service.create(payload(Platform::Deepseek), "alice").unwrap();

    let patch = UpdateModelProvider {
        api_key: Some("sk-rotated".to_string()),
        api_base_url: Some(None),
        config: Some(Some(json!({"region": "cn"}))),
        ..Default::default()
    };
    let updated = service.update(&created.id, patch, "alice").unwrap();

    assert_eq!(updated.api_key, "sk-rotated");
    assert_eq!(updated.api_base_url, None);
    assert_eq!(updated.config, Some(json!({"region": "cn"})));
    assert_eq!(updated.platform, Platform::Deepseek);
    assert_eq!(updated.updater_id.as_deref(), Some("alice"));

    assert_eq!(service.get_by_id(&created.id).unwrap(), updated);
}

#[test]
fn test_update_and_delete_require_creator() {
    let (_temp_dir, ctx, config) = setup();
    let mut service = ModelProviderService::open(&ctx, &config).unwrap();
    let created = service.create(payload(Platform::Deepseek), "alice").unwrap();

    let err = service
        .update(&created.id, UpdateModelProvider::default(), "mallory")
        .unwrap_err();
    match &err {
        KbError::AccessDenied { code, .. } => {
            assert_eq!(*code, codes::MODEL_PROVIDER_ACCESS_DENIED)
        }
        other => panic!("expected AccessDenied, got {other:?}"),
    }
    assert_eq!(err.status_code(), 403);

    assert!(matches!(
        service.delete(&created.id, "mallory"),
        Err(KbError::AccessDenied { .. })
    ));
    assert!(service.get_by_id(&created.id).is_ok());
}

#[test]
fn test_missing_provider_is_not_found() {
    let (_temp_dir, ctx, config) = setup();
    let mut service = ModelProviderService::open(&ctx, &config).unwrap();

    let err = service.get_by_id("nope").unwrap_err();
    match &err {
        KbError::NotFound { code, .. } => assert_eq!(*code, codes::MODEL_PROVIDER_NOT_FOUND),
        other => panic!("expected NotFound, got {other:?}"),
    }
    assert!(matches!(
        service.update("nope", UpdateModelProvider::default(), "alice"),
        Err(KbError::NotFound { .. })
    ));
    assert!(matches!(service.delete("nope", "alice"), Err(KbError::NotFound { .. })));
}

#[test]
fn test_model_types_follow_live_models() {
    let (_temp_dir, ctx, config) = setup();
    let mut service = ModelProviderService::open(&ctx, &config).unwrap();
    let mut models = ModelService::open(&ctx).unwrap();

    let provider = service.create(payload(Platform::Deepseek), "alice").unwrap();
    assert!(provider.model_types.is_empty());

    let add = |name: &str, model_type| CreateModel {
        provider_id: provider.id.clone(),
        name: name.to_string(),
        model_type,
        context_length: None,
    };
    models.create(add("rerank", ModelType::Rerank), "alice").unwrap();
    models.create(add("chat", ModelType::Llm), "alice").unwrap();
    let second_chat = models.create(add("reasoner", ModelType::Llm), "alice").unwrap();

    let listed = service.list("alice").unwrap();
    assert_eq!(listed[0].model_types, vec![ModelType::Llm, ModelType::Rerank]);
    assert_eq!(
        service.get_by_id(&provider.id).unwrap().model_types,
        vec![ModelType::Llm, ModelType::Rerank]
    );

    models.delete(&second_chat.id, "alice").unwrap();
    let listed = service.list("alice").unwrap();
    assert_eq!(listed[0].model_types, vec![ModelType::Llm, ModelType::Rerank]);

    let json = serde_json::to_value(&listed[0]).unwrap();
    assert_eq!(json["model_types"], json!(["LLM", "RERANK"]));
}

#[test]
fn test_invalid_payload_takes_no_lock() {
    let (_temp_dir, ctx, config) = setup();
    let mut service = ModelProviderService::open(&ctx, &config).unwrap();

    let mut bad = payload(Platform::Deepseek);
    bad.config = Some(json!(["not", "an", "object"]));
    assert!(matches!(
        service.create(bad, "alice"),
        Err(KbError::ValidationError(_))
    ));

    let store = open_lock_store(&ctx, &config).unwrap();
    assert!(store.list().unwrap().is_empty());
    assert!(service.list("alice").unwrap().is_empty());
}
