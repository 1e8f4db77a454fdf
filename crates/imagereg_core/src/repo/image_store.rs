//! Image store: create-once records keyed by identity.
//!
//! # Responsibility
//! - Persist `Image` records exactly once per identity.
//! - Distinguish idempotent resubmission from an attempt to repoint content.
//!
//! # Invariants
//! - A stored image is never updated. `create_if_absent` returns the stored
//!   record unchanged or fails; it never merges request fields into it.
//! - `create` has no idempotence allowance: any existing identity fails.

use crate::context::RequestContext;
use crate::error::{EntityKind, RegistryError, RegistryResult};
use crate::model::image::Image;
use crate::model::names::validate_identity;
use crate::model::now_epoch_ms;
use crate::repo::{decode, encode, namespace_prefix, object_key, IMAGE_ROOT};
use crate::storage::{CreateOutcome, ObjectStore};
use log::{debug, info, warn};
use std::sync::Arc;
use uuid::Uuid;

/// Create/read attempts when an image vanishes between a losing create and
/// the follow-up read.
const CREATE_IF_ABSENT_ATTEMPTS: u32 = 3;

/// Typed access to image records.
#[derive(Clone)]
pub struct ImageStore {
    store: Arc<dyn ObjectStore>,
}

impl ImageStore {
    pub fn new(store: Arc<dyn ObjectStore>) -> Self {
        Self { store }
    }

    /// Stores `image` unless its identity exists.
    ///
    /// Returns `(stored, true)` when this call created the record and
    /// `(stored, false)` when an image with the same content reference was
    /// already present.
    ///
    /// # Errors
    /// - `Invalid` for a malformed image.
    /// - `ContentConflict` when the identity exists with a different
    ///   content reference.
    pub fn create_if_absent(
        &self,
        ctx: &RequestContext,
        image: &Image,
    ) -> RegistryResult<(Image, bool)> {
        image.validate()?;
        let key = object_key(IMAGE_ROOT, ctx, &image.identity)?;
        let record = stamp(ctx, image);
        let encoded = encode(&record)?;

        let mut attempts = 0;
        while attempts < CREATE_IF_ABSENT_ATTEMPTS {
            if ctx.is_expired() {
                return Err(RegistryError::Conflict {
                    kind: EntityKind::Image,
                    name: image.identity.clone(),
                    attempts,
                    timed_out: true,
                });
            }
            attempts += 1;

            if let CreateOutcome::Created { .. } = self.store.create(&key, &encoded)? {
                info!(
                    "event=image_create module=image_store status=ok mode=if_absent namespace={} identity={}",
                    ctx.namespace(),
                    record.identity
                );
                return Ok((record, true));
            }

            let Some(object) = self.store.get(&key)? else {
                debug!(
                    "event=image_create module=image_store status=retry namespace={} identity={} reason=vanished",
                    ctx.namespace(),
                    image.identity
                );
                continue;
            };

            let existing: Image = decode(&key, &object.value)?;
            if existing.same_content(image) {
                debug!(
                    "event=image_create module=image_store status=ok mode=if_absent namespace={} identity={} created=false",
                    ctx.namespace(),
                    existing.identity
                );
                return Ok((existing, false));
            }

            warn!(
                "event=image_create module=image_store status=error namespace={} identity={} error_code=content_conflict",
                ctx.namespace(),
                image.identity
            );
            return Err(RegistryError::ContentConflict {
                identity: image.identity.clone(),
                stored_reference: existing.content_reference,
                requested_reference: image.content_reference.clone(),
            });
        }

        Err(RegistryError::Conflict {
            kind: EntityKind::Image,
            name: image.identity.clone(),
            attempts,
            timed_out: false,
        })
    }

    /// Strictly creates `image`; any existing identity is an error.
    pub fn create(&self, ctx: &RequestContext, image: &Image) -> RegistryResult<Image> {
        image.validate()?;
        let key = object_key(IMAGE_ROOT, ctx, &image.identity)?;
        let record = stamp(ctx, image);

        match self.store.create(&key, &encode(&record)?)? {
            CreateOutcome::Created { .. } => {
                info!(
                    "event=image_create module=image_store status=ok mode=strict namespace={} identity={}",
                    ctx.namespace(),
                    record.identity
                );
                Ok(record)
            }
            CreateOutcome::AlreadyExists => Err(RegistryError::AlreadyExists {
                kind: EntityKind::Image,
                name: image.identity.clone(),
                reason: None,
            }),
        }
    }

    pub fn get(&self, ctx: &RequestContext, identity: &str) -> RegistryResult<Image> {
        validate_identity(identity)?;
        let key = object_key(IMAGE_ROOT, ctx, identity)?;
        match self.store.get(&key)? {
            Some(object) => decode(&key, &object.value),
            None => Err(RegistryError::not_found(EntityKind::Image, identity)),
        }
    }

    /// Lists images in the context namespace, ordered by identity.
    pub fn list(&self, ctx: &RequestContext) -> RegistryResult<Vec<Image>> {
        let prefix = namespace_prefix(IMAGE_ROOT, ctx)?;
        self.store
            .list(&prefix)?
            .into_iter()
            .map(|(key, object)| decode(&key, &object.value))
            .collect()
    }
}

/// Copies the client payload and assigns store-owned fields.
fn stamp(ctx: &RequestContext, image: &Image) -> Image {
    Image {
        identity: image.identity.clone(),
        namespace: ctx.namespace().to_string(),
        uid: Some(Uuid::new_v4()),
        created_at: Some(now_epoch_ms()),
        content_reference: image.content_reference.clone(),
        metadata: image.metadata.clone(),
    }
}
