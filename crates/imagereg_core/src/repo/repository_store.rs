//! Repository store: tag tables updated with optimistic concurrency.
//!
//! # Responsibility
//! - Persist `ImageRepository` records and their tag tables.
//! - Provide `set_tag` as the only tag mutation path.
//!
//! # Invariants
//! - Every tag write is a read-modify-write conditioned on the version read,
//!   so concurrent writers to different tags never lose an update.
//! - Retries are bounded by `RetryPolicy::max_attempts` and by the request
//!   deadline; exhaustion surfaces a retryable `Conflict`.
//! - Deleting a repository never touches the images its tags name.

use crate::context::RequestContext;
use crate::error::{EntityKind, RegistryError, RegistryResult};
use crate::model::names::{validate_identity, validate_name, validate_tag, ValidationError};
use crate::model::now_epoch_ms;
use crate::model::repository::ImageRepository;
use crate::repo::{decode, encode, namespace_prefix, object_key, REPOSITORY_ROOT};
use crate::storage::{CreateOutcome, DeleteOutcome, ObjectStore, UpdateOutcome};
use log::{debug, info, warn};
use std::sync::Arc;
use std::time::{Duration, Instant};
use uuid::Uuid;

pub const DEFAULT_MAX_ATTEMPTS: u32 = 5;
pub const DEFAULT_BACKOFF: Duration = Duration::from_millis(10);

/// Bounded retry settings for version-conditioned writes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total write attempts, including the first. Always at least 1.
    pub max_attempts: u32,
    /// Base delay; attempt `n` waits `n * backoff` before retrying.
    pub backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            backoff: DEFAULT_BACKOFF,
        }
    }
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, backoff: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            backoff,
        }
    }

    /// Delay after the `attempt`-th failed try.
    pub fn delay_for(&self, attempt: u32) -> Duration {
        self.backoff.saturating_mul(attempt)
    }
}

/// Typed access to repository records.
#[derive(Clone)]
pub struct RepositoryStore {
    store: Arc<dyn ObjectStore>,
    retry: RetryPolicy,
}

impl RepositoryStore {
    pub fn new(store: Arc<dyn ObjectStore>) -> Self {
        Self {
            store,
            retry: RetryPolicy::default(),
        }
    }

    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = RetryPolicy::new(retry.max_attempts, retry.backoff);
        self
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        self.retry
    }

    pub fn get(&self, ctx: &RequestContext, name: &str) -> RegistryResult<ImageRepository> {
        validate_name("name", name)?;
        let key = object_key(REPOSITORY_ROOT, ctx, name)?;
        self.read(&key)?
            .ok_or_else(|| RegistryError::not_found(EntityKind::ImageRepository, name))
    }

    /// Lists repositories in the context namespace, ordered by name.
    pub fn list(&self, ctx: &RequestContext) -> RegistryResult<Vec<ImageRepository>> {
        let prefix = namespace_prefix(REPOSITORY_ROOT, ctx)?;
        self.store
            .list(&prefix)?
            .into_iter()
            .map(|(key, object)| {
                let mut repository: ImageRepository = decode(&key, &object.value)?;
                repository.resource_version = object.version;
                Ok(repository)
            })
            .collect()
    }

    /// Strictly creates an empty repository.
    ///
    /// # Errors
    /// - `Invalid` when the name is malformed or initial tags are supplied;
    ///   tags may only be set through `set_tag`.
    /// - `AlreadyExists` when the name is taken.
    pub fn create(
        &self,
        ctx: &RequestContext,
        repository: &ImageRepository,
    ) -> RegistryResult<ImageRepository> {
        repository.validate()?;
        if !repository.tags.is_empty() {
            return Err(ValidationError::NotAllowed {
                field: "tags",
                reason: "tags can only be set by applying an image repository mapping",
            }
            .into());
        }

        let key = object_key(REPOSITORY_ROOT, ctx, &repository.name)?;
        let mut record = stamp(ctx, &repository.name);
        match self.store.create(&key, &encode(&record)?)? {
            CreateOutcome::Created { version } => {
                record.resource_version = version;
                info!(
                    "event=repository_create module=repository_store status=ok mode=strict namespace={} name={}",
                    ctx.namespace(),
                    record.name
                );
                Ok(record)
            }
            CreateOutcome::AlreadyExists => Err(RegistryError::AlreadyExists {
                kind: EntityKind::ImageRepository,
                name: repository.name.clone(),
                reason: None,
            }),
        }
    }

    /// Returns the existing repository or creates an empty one.
    ///
    /// Losing a create race returns the winner's record. Only a repository
    /// deleted between the lost create and the re-read costs another attempt.
    ///
    /// # Errors
    /// - `Conflict` (retryable) when the deadline expires or every attempt
    ///   saw the repository vanish.
    pub fn create_if_absent(
        &self,
        ctx: &RequestContext,
        name: &str,
    ) -> RegistryResult<ImageRepository> {
        validate_name("name", name)?;
        let key = object_key(REPOSITORY_ROOT, ctx, name)?;

        let mut attempts = 0;
        while attempts < self.retry.max_attempts {
            if ctx.is_expired() {
                return Err(RegistryError::Conflict {
                    kind: EntityKind::ImageRepository,
                    name: name.to_string(),
                    attempts,
                    timed_out: true,
                });
            }
            attempts += 1;

            if let Some(existing) = self.read(&key)? {
                return Ok(existing);
            }

            let mut record = stamp(ctx, name);
            match self.store.create(&key, &encode(&record)?)? {
                CreateOutcome::Created { version } => {
                    record.resource_version = version;
                    info!(
                        "event=repository_create module=repository_store status=ok mode=if_absent namespace={} name={}",
                        ctx.namespace(),
                        name
                    );
                    return Ok(record);
                }
                CreateOutcome::AlreadyExists => {
                    if let Some(winner) = self.read(&key)? {
                        debug!(
                            "event=repository_create module=repository_store status=ok mode=if_absent namespace={} name={} created=false",
                            ctx.namespace(),
                            name
                        );
                        return Ok(winner);
                    }
                    debug!(
                        "event=repository_create module=repository_store status=retry namespace={} name={} attempt={} reason=vanished",
                        ctx.namespace(),
                        name,
                        attempts
                    );
                }
            }
        }

        Err(RegistryError::Conflict {
            kind: EntityKind::ImageRepository,
            name: name.to_string(),
            attempts,
            timed_out: false,
        })
    }

    /// Points `tag` at `identity`, overwriting any previous value.
    ///
    /// Re-tagging to the identity already stored is a no-op and does not
    /// bump the repository version.
    ///
    /// # Errors
    /// - `NotFound` when the repository does not exist.
    /// - `Conflict` (retryable) when every attempt lost a version race or the
    ///   request deadline expired first.
    pub fn set_tag(
        &self,
        ctx: &RequestContext,
        name: &str,
        tag: &str,
        identity: &str,
    ) -> RegistryResult<ImageRepository> {
        validate_name("name", name)?;
        validate_tag(tag)?;
        validate_identity(identity)?;
        let key = object_key(REPOSITORY_ROOT, ctx, name)?;
        let started_at = Instant::now();

        let mut attempts = 0;
        while attempts < self.retry.max_attempts {
            if ctx.is_expired() {
                warn!(
                    "event=set_tag module=repository_store status=error namespace={} name={} tag={} attempts={} duration_ms={} error_code=deadline_exceeded",
                    ctx.namespace(),
                    name,
                    tag,
                    attempts,
                    started_at.elapsed().as_millis()
                );
                return Err(RegistryError::Conflict {
                    kind: EntityKind::ImageRepository,
                    name: name.to_string(),
                    attempts,
                    timed_out: true,
                });
            }
            attempts += 1;

            let Some(object) = self.store.get(&key)? else {
                return Err(RegistryError::not_found(EntityKind::ImageRepository, name));
            };
            let mut repository: ImageRepository = decode(&key, &object.value)?;
            repository.resource_version = object.version;

            if repository.tag(tag) == Some(identity) {
                debug!(
                    "event=set_tag module=repository_store status=ok namespace={} name={} tag={} changed=false",
                    ctx.namespace(),
                    name,
                    tag
                );
                return Ok(repository);
            }

            let previous = repository
                .tags
                .insert(tag.to_string(), identity.to_string());
            let encoded = encode(&unversioned(&repository))?;

            match self.store.update(&key, object.version, &encoded)? {
                UpdateOutcome::Updated { version } => {
                    repository.resource_version = version;
                    info!(
                        "event=set_tag module=repository_store status=ok namespace={} name={} tag={} identity={} previous={} attempts={} duration_ms={}",
                        ctx.namespace(),
                        name,
                        tag,
                        identity,
                        previous.as_deref().unwrap_or("-"),
                        attempts,
                        started_at.elapsed().as_millis()
                    );
                    return Ok(repository);
                }
                UpdateOutcome::NotFound => {
                    return Err(RegistryError::not_found(EntityKind::ImageRepository, name));
                }
                UpdateOutcome::VersionConflict { current_version } => {
                    debug!(
                        "event=set_tag module=repository_store status=retry namespace={} name={} tag={} attempt={} read_version={} current_version={}",
                        ctx.namespace(),
                        name,
                        tag,
                        attempts,
                        object.version,
                        current_version
                    );
                    if attempts < self.retry.max_attempts {
                        self.backoff(ctx, attempts);
                    }
                }
            }
        }

        warn!(
            "event=set_tag module=repository_store status=error namespace={} name={} tag={} attempts={} duration_ms={} error_code=retries_exhausted",
            ctx.namespace(),
            name,
            tag,
            attempts,
            started_at.elapsed().as_millis()
        );
        Err(RegistryError::Conflict {
            kind: EntityKind::ImageRepository,
            name: name.to_string(),
            attempts,
            timed_out: false,
        })
    }

    pub fn delete(&self, ctx: &RequestContext, name: &str) -> RegistryResult<()> {
        validate_name("name", name)?;
        let key = object_key(REPOSITORY_ROOT, ctx, name)?;
        match self.store.delete(&key)? {
            DeleteOutcome::Deleted => {
                info!(
                    "event=repository_delete module=repository_store status=ok namespace={} name={}",
                    ctx.namespace(),
                    name
                );
                Ok(())
            }
            DeleteOutcome::NotFound => Err(RegistryError::not_found(
                EntityKind::ImageRepository,
                name,
            )),
        }
    }

    fn read(&self, key: &str) -> RegistryResult<Option<ImageRepository>> {
        let Some(object) = self.store.get(key)? else {
            return Ok(None);
        };
        let mut repository: ImageRepository = decode(key, &object.value)?;
        repository.resource_version = object.version;
        Ok(Some(repository))
    }

    fn backoff(&self, ctx: &RequestContext, attempt: u32) {
        let mut delay = self.retry.delay_for(attempt);
        if let Some(remaining) = ctx.remaining() {
            delay = delay.min(remaining);
        }
        if !delay.is_zero() {
            std::thread::sleep(delay);
        }
    }
}

fn stamp(ctx: &RequestContext, name: &str) -> ImageRepository {
    let mut repository = ImageRepository::new(name);
    repository.namespace = ctx.namespace().to_string();
    repository.uid = Some(Uuid::new_v4());
    repository.created_at = Some(now_epoch_ms());
    repository
}

fn unversioned(repository: &ImageRepository) -> ImageRepository {
    ImageRepository {
        resource_version: 0,
        ..repository.clone()
    }
}
