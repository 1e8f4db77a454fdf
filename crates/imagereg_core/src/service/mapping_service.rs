//! Tag-to-image mapping processor.
//!
//! # Responsibility
//! - Apply `ImageRepositoryMapping` requests: ensure the repository, ensure
//!   the image, then advance the tag.
//!
//! # Invariants
//! - A request naming an existing identity with different content fails with
//!   `AlreadyExists` and leaves the tag table untouched.
//! - Repeating an identical request succeeds and yields the same tag table.
//! - Tags may move freely between images; images never change.

use crate::context::RequestContext;
use crate::error::{EntityKind, ErrorKind, RegistryError, RegistryResult};
use crate::model::mapping::ImageRepositoryMapping;
use crate::model::repository::ImageRepository;
use crate::repo::image_store::ImageStore;
use crate::repo::repository_store::RepositoryStore;
use log::{error, info, warn};
use std::time::Instant;

/// Stateless coordinator over `ImageStore` and `RepositoryStore`.
#[derive(Clone)]
pub struct MappingProcessor {
    images: ImageStore,
    repositories: RepositoryStore,
}

impl MappingProcessor {
    pub fn new(images: ImageStore, repositories: RepositoryStore) -> Self {
        Self {
            images,
            repositories,
        }
    }

    /// Applies one mapping and returns the updated repository.
    ///
    /// A mapping into a repository that does not exist yet creates it.
    ///
    /// # Errors
    /// - `Invalid` for an empty or malformed repository name, tag or image.
    /// - `AlreadyExists` when the image identity is stored with a different
    ///   content reference. Not retryable.
    /// - `Conflict` when the tag write lost every optimistic-concurrency
    ///   race or the deadline expired. Retryable.
    /// - Store errors pass through unchanged.
    pub fn apply(
        &self,
        ctx: &RequestContext,
        mapping: &ImageRepositoryMapping,
    ) -> RegistryResult<ImageRepository> {
        let started_at = Instant::now();
        let result = self.apply_inner(ctx, mapping);
        match &result {
            Ok(repository) => info!(
                "event=mapping_apply module=mapping status=ok namespace={} repository={} tag={} identity={} resource_version={} duration_ms={}",
                ctx.namespace(),
                mapping.repository_name,
                mapping.tag,
                mapping.image.identity,
                repository.resource_version,
                started_at.elapsed().as_millis()
            ),
            Err(err) if err.kind() != ErrorKind::Internal => warn!(
                "event=mapping_apply module=mapping status=error namespace={} repository={} tag={} retryable={} duration_ms={} error={}",
                ctx.namespace(),
                mapping.repository_name,
                mapping.tag,
                err.is_retryable(),
                started_at.elapsed().as_millis(),
                err
            ),
            Err(err) => error!(
                "event=mapping_apply module=mapping status=error namespace={} repository={} tag={} retryable={} duration_ms={} error={}",
                ctx.namespace(),
                mapping.repository_name,
                mapping.tag,
                err.is_retryable(),
                started_at.elapsed().as_millis(),
                err
            ),
        }
        result
    }

    fn apply_inner(
        &self,
        ctx: &RequestContext,
        mapping: &ImageRepositoryMapping,
    ) -> RegistryResult<ImageRepository> {
        mapping.validate()?;

        self.repositories
            .create_if_absent(ctx, &mapping.repository_name)?;

        let (image, _created) = self
            .images
            .create_if_absent(ctx, &mapping.image)
            .map_err(|err| match err {
                RegistryError::ContentConflict {
                    identity,
                    stored_reference,
                    requested_reference,
                } => RegistryError::AlreadyExists {
                    kind: EntityKind::Image,
                    name: identity,
                    reason: Some(format!(
                        "images are immutable; stored content reference `{stored_reference}` differs from `{requested_reference}`"
                    )),
                },
                other => other,
            })?;

        self.repositories.set_tag(
            ctx,
            &mapping.repository_name,
            &mapping.tag,
            &image.identity,
        )
    }
}
