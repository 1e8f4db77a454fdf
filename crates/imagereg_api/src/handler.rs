//! Resource handlers behind one capability trait.
//!
//! # Responsibility
//! - Decode request bodies into core types and encode results back.
//! - Delegate every state change to the core stores and services.
//!
//! # Invariants
//! - Handlers hold no state of their own beyond cloned store handles.
//! - Verbs a resource does not serve fail with `MethodNotSupported`.

use crate::error::{ApiError, ApiResult, Verb};
use crate::resource::ResourceKind;
use imagereg_core::{
    Image, ImageRepository, ImageRepositoryMapping, ImageStore, MappingProcessor,
    RegistryError, RepositoryStore, RequestContext, TagResolver,
};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{json, Value};

/// Capability surface shared by every served resource.
pub trait ResourceHandler: Send + Sync {
    fn kind(&self) -> ResourceKind;

    fn create(&self, _ctx: &RequestContext, _body: Value) -> ApiResult<Value> {
        Err(self.unsupported(Verb::Create))
    }

    fn get(&self, _ctx: &RequestContext, _name: &str) -> ApiResult<Value> {
        Err(self.unsupported(Verb::Get))
    }

    fn list(&self, _ctx: &RequestContext) -> ApiResult<Value> {
        Err(self.unsupported(Verb::List))
    }

    fn delete(&self, _ctx: &RequestContext, _name: &str) -> ApiResult<Value> {
        Err(self.unsupported(Verb::Delete))
    }

    fn unsupported(&self, verb: Verb) -> ApiError {
        ApiError::MethodNotSupported {
            resource: self.kind(),
            verb,
        }
    }
}

/// `images`: create / get / list.
pub struct ImagesHandler {
    images: ImageStore,
}

impl ImagesHandler {
    pub fn new(images: ImageStore) -> Self {
        Self { images }
    }
}

impl ResourceHandler for ImagesHandler {
    fn kind(&self) -> ResourceKind {
        ResourceKind::Images
    }

    fn create(&self, ctx: &RequestContext, body: Value) -> ApiResult<Value> {
        let image: Image = decode_body(self.kind(), body)?;
        encode(&self.images.create(ctx, &image)?)
    }

    fn get(&self, ctx: &RequestContext, name: &str) -> ApiResult<Value> {
        encode(&self.images.get(ctx, name)?)
    }

    fn list(&self, ctx: &RequestContext) -> ApiResult<Value> {
        encode_list(&self.images.list(ctx)?)
    }
}

/// `imageRepositories`: create / get / list / delete.
pub struct ImageRepositoriesHandler {
    repositories: RepositoryStore,
}

impl ImageRepositoriesHandler {
    pub fn new(repositories: RepositoryStore) -> Self {
        Self { repositories }
    }
}

impl ResourceHandler for ImageRepositoriesHandler {
    fn kind(&self) -> ResourceKind {
        ResourceKind::ImageRepositories
    }

    fn create(&self, ctx: &RequestContext, body: Value) -> ApiResult<Value> {
        let repository: ImageRepository = decode_body(self.kind(), body)?;
        encode(&self.repositories.create(ctx, &repository)?)
    }

    fn get(&self, ctx: &RequestContext, name: &str) -> ApiResult<Value> {
        encode(&self.repositories.get(ctx, name)?)
    }

    fn list(&self, ctx: &RequestContext) -> ApiResult<Value> {
        encode_list(&self.repositories.list(ctx)?)
    }

    fn delete(&self, ctx: &RequestContext, name: &str) -> ApiResult<Value> {
        self.repositories.delete(ctx, name)?;
        Ok(json!({ "status": "Success" }))
    }
}

/// `imageRepositoryMappings`: create only; mappings are never stored.
pub struct ImageRepositoryMappingsHandler {
    processor: MappingProcessor,
}

impl ImageRepositoryMappingsHandler {
    pub fn new(processor: MappingProcessor) -> Self {
        Self { processor }
    }
}

impl ResourceHandler for ImageRepositoryMappingsHandler {
    fn kind(&self) -> ResourceKind {
        ResourceKind::ImageRepositoryMappings
    }

    fn create(&self, ctx: &RequestContext, body: Value) -> ApiResult<Value> {
        let mapping: ImageRepositoryMapping = decode_body(self.kind(), body)?;
        encode(&self.processor.apply(ctx, &mapping)?)
    }
}

/// `imageRepositoryTags`: get only, addressed as `<repository>:<tag>`.
pub struct ImageRepositoryTagsHandler {
    resolver: TagResolver,
}

impl ImageRepositoryTagsHandler {
    pub fn new(resolver: TagResolver) -> Self {
        Self { resolver }
    }
}

impl ResourceHandler for ImageRepositoryTagsHandler {
    fn kind(&self) -> ResourceKind {
        ResourceKind::ImageRepositoryTags
    }

    fn get(&self, ctx: &RequestContext, name: &str) -> ApiResult<Value> {
        let (repository, tag) = split_tag_name(name)?;
        encode(&self.resolver.resolve(ctx, repository, tag)?)
    }
}

/// Splits `<repository>:<tag>`. Neither part may contain `:`.
pub fn split_tag_name(name: &str) -> ApiResult<(&str, &str)> {
    match name.split_once(':') {
        Some((repository, tag)) if !repository.is_empty() && !tag.is_empty() => {
            Ok((repository, tag))
        }
        _ => Err(ApiError::BadRequest(format!(
            "image repository tag name must be `<repository>:<tag>`, got `{name}`"
        ))),
    }
}

fn decode_body<T: DeserializeOwned>(kind: ResourceKind, body: Value) -> ApiResult<T> {
    serde_json::from_value(body)
        .map_err(|err| ApiError::BadRequest(format!("invalid {kind} body: {err}")))
}

/// Response encoding failures are server faults, never the caller's.
fn encode<T: Serialize>(value: &T) -> ApiResult<Value> {
    serde_json::to_value(value).map_err(|err| {
        ApiError::Registry(RegistryError::InvalidData(format!(
            "response cannot be encoded: {err}"
        )))
    })
}

fn encode_list<T: Serialize>(items: &[T]) -> ApiResult<Value> {
    Ok(json!({ "items": encode(&items)? }))
}
