//! Typed stores layered over the object store seam.
//!
//! # Responsibility
//! - `ImageStore` owns image records and their immutability rule.
//! - `RepositoryStore` owns repository tag tables and their retry loop.
//! - Keep key layout and JSON encoding inside this boundary.
//!
//! # Invariants
//! - Keys are `<root>/<namespace>/<name>`; namespace and name are validated
//!   before a key is built so no request can address another key space.
//! - Persisted values never carry a `resource_version`.

use crate::context::RequestContext;
use crate::error::{RegistryError, RegistryResult};
use crate::model::names::validate_name;
use serde::de::DeserializeOwned;
use serde::Serialize;

pub mod image_store;
pub mod repository_store;

const IMAGE_ROOT: &str = "images";
const REPOSITORY_ROOT: &str = "imagerepositories";

fn namespace_prefix(root: &str, ctx: &RequestContext) -> RegistryResult<String> {
    validate_name("namespace", ctx.namespace())?;
    Ok(format!("{root}/{}/", ctx.namespace()))
}

fn object_key(root: &str, ctx: &RequestContext, name: &str) -> RegistryResult<String> {
    Ok(format!("{}{name}", namespace_prefix(root, ctx)?))
}

fn encode<T: Serialize>(value: &T) -> RegistryResult<String> {
    serde_json::to_string(value)
        .map_err(|err| RegistryError::InvalidData(format!("failed to encode object: {err}")))
}

fn decode<T: DeserializeOwned>(key: &str, value: &str) -> RegistryResult<T> {
    serde_json::from_str(value)
        .map_err(|err| RegistryError::InvalidData(format!("object `{key}` cannot be decoded: {err}")))
}
