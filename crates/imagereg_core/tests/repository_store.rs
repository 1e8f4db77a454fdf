mod common;

use common::{ContendedStore, RacingCreate};
use imagereg_core::{
    ErrorKind, ImageRepository, MemoryObjectStore, RegistryError, RepositoryStore,
    RequestContext, RetryPolicy, SqliteObjectStore, ValidationError,
};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};
use uuid::Uuid;

fn store() -> RepositoryStore {
    RepositoryStore::new(Arc::new(SqliteObjectStore::open_in_memory().unwrap()))
}

fn ctx() -> RequestContext {
    RequestContext::new("default")
}

#[test]
fn strict_create_then_get_and_list() {
    let repositories = store();
    let created = repositories
        .create(&ctx(), &ImageRepository::new("test"))
        .unwrap();
    assert_eq!(created.name, "test");
    assert!(created.uid.is_some());
    assert!(created.tags.is_empty());
    assert_eq!(created.resource_version, 1);

    let loaded = repositories.get(&ctx(), "test").unwrap();
    assert_eq!(loaded, created);
    assert_eq!(repositories.list(&ctx()).unwrap(), vec![created]);
}

#[test]
fn strict_create_rejects_empty_name_duplicates_and_initial_tags() {
    let repositories = store();

    let err = repositories
        .create(&ctx(), &ImageRepository::new(""))
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Invalid);

    repositories
        .create(&ctx(), &ImageRepository::new("test"))
        .unwrap();
    let err = repositories
        .create(&ctx(), &ImageRepository::new("test"))
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::AlreadyExists);

    let mut tagged = ImageRepository::new("tagged");
    tagged.tags.insert("latest".to_string(), "sha1".to_string());
    let err = repositories.create(&ctx(), &tagged).unwrap_err();
    assert!(matches!(
        err,
        RegistryError::Invalid(ValidationError::NotAllowed { field: "tags", .. })
    ));
}

#[test]
fn list_is_empty_for_fresh_namespace() {
    assert!(store().list(&ctx()).unwrap().is_empty());
}

#[test]
fn create_if_absent_returns_existing_unchanged() {
    let repositories = store();
    let first = repositories.create_if_absent(&ctx(), "app").unwrap();
    repositories.set_tag(&ctx(), "app", "v1", "sha1").unwrap();

    let second = repositories.create_if_absent(&ctx(), "app").unwrap();
    assert_eq!(second.uid, first.uid);
    assert_eq!(second.tag("v1"), Some("sha1"));
}

#[test]
fn create_if_absent_returns_winner_after_losing_create_race() {
    let mut rival = ImageRepository::new("app");
    rival.namespace = "default".to_string();
    rival.uid = Some(Uuid::new_v4());
    let racing = Arc::new(RacingCreate::new(serde_json::to_string(&rival).unwrap()));
    let repositories = RepositoryStore::new(racing)
        .with_retry_policy(RetryPolicy::new(1, Duration::ZERO));

    let repository = repositories.create_if_absent(&ctx(), "app").unwrap();
    assert_eq!(repository.uid, rival.uid);
    assert_eq!(repository.resource_version, 1);
    assert_eq!(repositories.list(&ctx()).unwrap().len(), 1);
}

#[test]
fn create_if_absent_honours_expired_deadline() {
    let repositories = store();
    let expired = ctx().with_deadline(Instant::now());

    let err = repositories.create_if_absent(&expired, "app").unwrap_err();
    assert!(matches!(
        err,
        RegistryError::Conflict {
            attempts: 0,
            timed_out: true,
            ..
        }
    ));
    assert!(repositories.list(&ctx()).unwrap().is_empty());
}

#[test]
fn set_tag_overwrites_and_bumps_version() {
    let repositories = store();
    repositories.create_if_absent(&ctx(), "app").unwrap();

    let tagged = repositories.set_tag(&ctx(), "app", "latest", "sha1").unwrap();
    assert_eq!(tagged.tag("latest"), Some("sha1"));
    assert_eq!(tagged.resource_version, 2);

    let moved = repositories.set_tag(&ctx(), "app", "latest", "sha2").unwrap();
    assert_eq!(moved.tag("latest"), Some("sha2"));
    assert_eq!(moved.resource_version, 3);
}

#[test]
fn set_tag_to_same_identity_does_not_write() {
    let repositories = store();
    repositories.create_if_absent(&ctx(), "app").unwrap();
    let first = repositories.set_tag(&ctx(), "app", "v1", "sha1").unwrap();
    let again = repositories.set_tag(&ctx(), "app", "v1", "sha1").unwrap();

    assert_eq!(again.resource_version, first.resource_version);
    assert_eq!(again.tags, first.tags);
}

#[test]
fn set_tag_on_missing_repository_is_not_found() {
    let err = store()
        .set_tag(&ctx(), "missing", "v1", "sha1")
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);
}

#[test]
fn set_tag_retries_through_transient_conflicts() {
    let contended = Arc::new(ContendedStore::new(2));
    let repositories = RepositoryStore::new(contended.clone())
        .with_retry_policy(RetryPolicy::new(5, Duration::from_millis(1)));
    repositories.create_if_absent(&ctx(), "app").unwrap();

    let updated = repositories.set_tag(&ctx(), "app", "v1", "sha1").unwrap();
    assert_eq!(updated.tag("v1"), Some("sha1"));
    assert_eq!(contended.updates_attempted(), 3);
}

#[test]
fn set_tag_surfaces_retryable_conflict_after_bounded_attempts() {
    let contended = Arc::new(ContendedStore::new(u32::MAX));
    let repositories = RepositoryStore::new(contended.clone())
        .with_retry_policy(RetryPolicy::new(3, Duration::from_millis(1)));
    repositories.create_if_absent(&ctx(), "app").unwrap();

    let err = repositories.set_tag(&ctx(), "app", "v1", "sha1").unwrap_err();
    assert!(err.is_retryable());
    assert!(matches!(
        err,
        RegistryError::Conflict {
            attempts: 3,
            timed_out: false,
            ..
        }
    ));
    assert_eq!(contended.updates_attempted(), 3);
    assert!(repositories.get(&ctx(), "app").unwrap().tags.is_empty());
}

#[test]
fn set_tag_stops_retrying_at_deadline() {
    let contended = Arc::new(ContendedStore::new(u32::MAX));
    let repositories = RepositoryStore::new(contended.clone())
        .with_retry_policy(RetryPolicy::new(1_000, Duration::from_millis(20)));
    repositories.create_if_absent(&ctx(), "app").unwrap();

    let started = Instant::now();
    let deadline_ctx = ctx().with_timeout(Duration::from_millis(60));
    let err = repositories
        .set_tag(&deadline_ctx, "app", "v1", "sha1")
        .unwrap_err();

    assert!(matches!(err, RegistryError::Conflict { timed_out: true, .. }));
    assert!(err.is_retryable());
    assert!(contended.updates_attempted() < 1_000);
    assert!(started.elapsed() < Duration::from_secs(5));
}

#[test]
fn expired_deadline_fails_before_any_write() {
    let contended = Arc::new(ContendedStore::new(0));
    let repositories = RepositoryStore::new(contended.clone());
    repositories.create_if_absent(&ctx(), "app").unwrap();

    let expired = ctx().with_deadline(Instant::now());
    let err = repositories
        .set_tag(&expired, "app", "v1", "sha1")
        .unwrap_err();
    assert!(matches!(
        err,
        RegistryError::Conflict {
            attempts: 0,
            timed_out: true,
            ..
        }
    ));
    assert_eq!(contended.updates_attempted(), 0);
}

#[test]
fn delete_removes_repository_and_reports_missing() {
    let repositories = store();
    let err = repositories.delete(&ctx(), "test").unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);

    repositories.create_if_absent(&ctx(), "test").unwrap();
    repositories.delete(&ctx(), "test").unwrap();
    assert_eq!(
        repositories.get(&ctx(), "test").unwrap_err().kind(),
        ErrorKind::NotFound
    );
}

#[test]
fn concurrent_set_tag_on_different_tags_loses_nothing() {
    let repositories = RepositoryStore::new(Arc::new(MemoryObjectStore::new()))
        .with_retry_policy(RetryPolicy::new(100, Duration::from_millis(1)));
    repositories.create_if_absent(&ctx(), "app").unwrap();

    let handles: Vec<_> = (0..16)
        .map(|writer| {
            let repositories = repositories.clone();
            thread::spawn(move || {
                repositories
                    .set_tag(
                        &ctx(),
                        "app",
                        &format!("t{writer}"),
                        &format!("sha{writer}"),
                    )
                    .unwrap();
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }

    let repository = repositories.get(&ctx(), "app").unwrap();
    assert_eq!(repository.tags.len(), 16);
    for writer in 0..16 {
        assert_eq!(
            repository.tag(&format!("t{writer}")),
            Some(format!("sha{writer}").as_str())
        );
    }
}

#[test]
fn concurrent_set_tag_on_same_tag_keeps_one_valid_winner() {
    let repositories = RepositoryStore::new(Arc::new(MemoryObjectStore::new()))
        .with_retry_policy(RetryPolicy::new(100, Duration::from_millis(1)));
    repositories.create_if_absent(&ctx(), "app").unwrap();

    let handles: Vec<_> = (0..8)
        .map(|writer| {
            let repositories = repositories.clone();
            thread::spawn(move || {
                repositories
                    .set_tag(&ctx(), "app", "latest", &format!("sha{writer}"))
                    .unwrap();
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }

    let repository = repositories.get(&ctx(), "app").unwrap();
    assert_eq!(repository.tags.len(), 1);
    let winner = repository.tag("latest").unwrap();
    assert!((0..8).any(|writer| winner == format!("sha{writer}")));
}
