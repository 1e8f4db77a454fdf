//! Read-side tag resolution.
//!
//! # Invariants
//! - Never panics on referential inconsistency: a tag whose image was removed
//!   out of band resolves to `NotFound`.

use crate::context::RequestContext;
use crate::error::{EntityKind, RegistryError, RegistryResult};
use crate::model::image::Image;
use crate::repo::image_store::ImageStore;
use crate::repo::repository_store::RepositoryStore;
use log::warn;

#[derive(Clone)]
pub struct TagResolver {
    images: ImageStore,
    repositories: RepositoryStore,
}

impl TagResolver {
    pub fn new(images: ImageStore, repositories: RepositoryStore) -> Self {
        Self {
            images,
            repositories,
        }
    }

    /// Resolves `repository:tag` to the image it currently names.
    ///
    /// # Errors
    /// - `NotFound` for a missing repository, a missing tag, or a tag whose
    ///   image no longer exists.
    /// - `InvalidData` (internal) when the stored image cannot be decoded;
    ///   corruption is not reported as absence.
    pub fn resolve(
        &self,
        ctx: &RequestContext,
        repository_name: &str,
        tag: &str,
    ) -> RegistryResult<Image> {
        let repository = self.repositories.get(ctx, repository_name)?;
        let Some(identity) = repository.tag(tag) else {
            return Err(RegistryError::not_found(
                EntityKind::Tag,
                format!("{repository_name}:{tag}"),
            ));
        };

        match self.images.get(ctx, identity) {
            Err(RegistryError::NotFound { .. }) => {
                warn!(
                    "event=tag_resolve module=tag_resolver status=error namespace={} repository={} tag={} identity={} error_code=dangling_tag",
                    ctx.namespace(),
                    repository_name,
                    tag,
                    identity
                );
                Err(RegistryError::not_found(EntityKind::Image, identity))
            }
            other => other,
        }
    }
}
