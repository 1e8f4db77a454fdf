//! Resource API over the registry metadata core.
//!
//! # Responsibility
//! - Expose `images`, `imageRepositories`, `imageRepositoryMappings` and
//!   `imageRepositoryTags` behind one request entry point.
//! - Translate core errors into stable status reasons.
//!
//! # Invariants
//! - This crate holds no registry state; all of it lives in `imagereg_core`.

pub mod error;
pub mod handler;
pub mod registry;
pub mod resource;

pub use error::{ApiError, ApiResult, Verb};
pub use handler::ResourceHandler;
pub use registry::{ApiRequest, OpenError, Registry};
pub use resource::{parse_resource, supported_resources, ResourceKind, UnknownResource};
