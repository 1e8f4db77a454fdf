//! Metadata core of the container-image registry.
//! Owns the invariants binding mutable tags to immutable images.

pub mod config;
pub mod context;
pub mod db;
pub mod error;
pub mod logging;
pub mod model;
pub mod repo;
pub mod service;
pub mod storage;

pub use config::{ConfigError, RegistryConfig};
pub use context::RequestContext;
pub use error::{EntityKind, ErrorKind, RegistryError, RegistryResult};
pub use logging::{default_log_level, init_logging, logging_status, LoggingError};
pub use model::image::Image;
pub use model::mapping::ImageRepositoryMapping;
pub use model::names::ValidationError;
pub use model::repository::ImageRepository;
pub use repo::image_store::ImageStore;
pub use repo::repository_store::{RepositoryStore, RetryPolicy};
pub use service::mapping_service::MappingProcessor;
pub use service::tag_resolver::TagResolver;
pub use storage::{
    CreateOutcome, DeleteOutcome, MemoryObjectStore, ObjectStore, SqliteObjectStore, StoreError,
    StoreResult, UpdateOutcome, VersionedObject,
};

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
