//! Registry facade: static routing from resource names to handlers.
//!
//! # Responsibility
//! - Build the shared stores once from `RegistryConfig`.
//! - Route each request to exactly one handler by resource name.
//! - Log one `event=api_request` record per request.
//!
//! # Invariants
//! - The handler set is closed; routing is a `match`, not a lookup table.
//! - Every request runs under a `RequestContext` carrying a namespace and
//!   the configured deadline, if any.

use crate::error::{ApiError, ApiResult, Verb};
use crate::handler::{
    ImageRepositoriesHandler, ImageRepositoryMappingsHandler, ImageRepositoryTagsHandler,
    ImagesHandler, ResourceHandler,
};
use crate::resource::{parse_resource, ResourceKind};
use imagereg_core::{
    init_logging, ConfigError, ImageStore, LoggingError, MappingProcessor, MemoryObjectStore,
    ObjectStore, RegistryConfig, RepositoryStore, RequestContext, SqliteObjectStore, StoreError,
    TagResolver,
};
use log::{error, info, warn};
use serde_json::Value;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// One registry call, independent of transport.
#[derive(Debug, Clone, PartialEq)]
pub struct ApiRequest {
    pub verb: Verb,
    pub resource: String,
    /// Target namespace; `None` selects the configured default.
    pub namespace: Option<String>,
    /// Object name for `get` / `delete`.
    pub name: Option<String>,
    /// JSON body for `create`.
    pub body: Option<Value>,
}

impl ApiRequest {
    pub fn new(verb: Verb, resource: impl Into<String>) -> Self {
        Self {
            verb,
            resource: resource.into(),
            namespace: None,
            name: None,
            body: None,
        }
    }

    pub fn in_namespace(mut self, namespace: impl Into<String>) -> Self {
        self.namespace = Some(namespace.into());
        self
    }

    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn with_body(mut self, body: Value) -> Self {
        self.body = Some(body);
        self
    }
}

#[derive(Debug)]
pub enum OpenError {
    Config(ConfigError),
    Logging(LoggingError),
    Store(StoreError),
}

impl Display for OpenError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Config(err) => write!(f, "{err}"),
            Self::Logging(err) => write!(f, "{err}"),
            Self::Store(err) => write!(f, "failed to open registry store: {err}"),
        }
    }
}

impl Error for OpenError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Config(err) => Some(err),
            Self::Logging(err) => Some(err),
            Self::Store(err) => Some(err),
        }
    }
}

impl From<ConfigError> for OpenError {
    fn from(value: ConfigError) -> Self {
        Self::Config(value)
    }
}

impl From<LoggingError> for OpenError {
    fn from(value: LoggingError) -> Self {
        Self::Logging(value)
    }
}

impl From<StoreError> for OpenError {
    fn from(value: StoreError) -> Self {
        Self::Store(value)
    }
}

/// Entry point serving the four registry resources.
pub struct Registry {
    images: ImagesHandler,
    repositories: ImageRepositoriesHandler,
    mappings: ImageRepositoryMappingsHandler,
    tags: ImageRepositoryTagsHandler,
    default_namespace: String,
    request_timeout: Option<Duration>,
}

impl Registry {
    /// Validates `config`, starts file logging when `log_dir` is set, and
    /// opens the configured store.
    ///
    /// # Errors
    /// - Invalid config, logging bootstrap failure, or an unopenable database.
    pub fn from_config(config: &RegistryConfig) -> Result<Self, OpenError> {
        config.validate()?;
        if let Some(log_dir) = &config.log_dir {
            init_logging(config.effective_log_level(), log_dir)?;
        }

        let store: Arc<dyn ObjectStore> = match &config.database_path {
            Some(path) => Arc::new(SqliteObjectStore::open(path)?),
            None => Arc::new(MemoryObjectStore::new()),
        };
        info!(
            "event=registry_open module=api status=ok backend={} default_namespace={}",
            if config.database_path.is_some() {
                "sqlite"
            } else {
                "memory"
            },
            config.default_namespace
        );
        Ok(Self::with_store(store, config))
    }

    /// Builds a registry over an existing store. Logging is left untouched.
    pub fn with_store(store: Arc<dyn ObjectStore>, config: &RegistryConfig) -> Self {
        let images = ImageStore::new(Arc::clone(&store));
        let repositories = RepositoryStore::new(store).with_retry_policy(config.retry_policy());

        Self {
            images: ImagesHandler::new(images.clone()),
            repositories: ImageRepositoriesHandler::new(repositories.clone()),
            mappings: ImageRepositoryMappingsHandler::new(MappingProcessor::new(
                images.clone(),
                repositories.clone(),
            )),
            tags: ImageRepositoryTagsHandler::new(TagResolver::new(images, repositories)),
            default_namespace: config.default_namespace.clone(),
            request_timeout: config.request_timeout(),
        }
    }

    /// Handler serving `kind`.
    pub fn handler(&self, kind: ResourceKind) -> &dyn ResourceHandler {
        match kind {
            ResourceKind::Images => &self.images,
            ResourceKind::ImageRepositories => &self.repositories,
            ResourceKind::ImageRepositoryMappings => &self.mappings,
            ResourceKind::ImageRepositoryTags => &self.tags,
        }
    }

    pub fn handle(&self, request: &ApiRequest) -> ApiResult<Value> {
        let started_at = Instant::now();
        let namespace = request
            .namespace
            .as_deref()
            .unwrap_or(self.default_namespace.as_str());

        let result = self.dispatch(request, namespace);
        let duration_ms = started_at.elapsed().as_millis();
        match &result {
            Ok(_) => info!(
                "event=api_request module=api status=ok verb={} resource={} namespace={} duration_ms={}",
                request.verb.as_str(),
                request.resource,
                namespace,
                duration_ms
            ),
            Err(err) if err.reason() != "InternalError" => warn!(
                "event=api_request module=api status=error verb={} resource={} namespace={} duration_ms={} reason={} retryable={}",
                request.verb.as_str(),
                request.resource,
                namespace,
                duration_ms,
                err.reason(),
                err.is_retryable()
            ),
            Err(err) => error!(
                "event=api_request module=api status=error verb={} resource={} namespace={} duration_ms={} reason={} error={}",
                request.verb.as_str(),
                request.resource,
                namespace,
                duration_ms,
                err.reason(),
                err
            ),
        }
        result
    }

    pub fn create(&self, namespace: &str, resource: &str, body: Value) -> ApiResult<Value> {
        self.handle(
            &ApiRequest::new(Verb::Create, resource)
                .in_namespace(namespace)
                .with_body(body),
        )
    }

    pub fn get(&self, namespace: &str, resource: &str, name: &str) -> ApiResult<Value> {
        self.handle(
            &ApiRequest::new(Verb::Get, resource)
                .in_namespace(namespace)
                .named(name),
        )
    }

    pub fn list(&self, namespace: &str, resource: &str) -> ApiResult<Value> {
        self.handle(&ApiRequest::new(Verb::List, resource).in_namespace(namespace))
    }

    pub fn delete(&self, namespace: &str, resource: &str, name: &str) -> ApiResult<Value> {
        self.handle(
            &ApiRequest::new(Verb::Delete, resource)
                .in_namespace(namespace)
                .named(name),
        )
    }

    fn dispatch(&self, request: &ApiRequest, namespace: &str) -> ApiResult<Value> {
        let kind = parse_resource(&request.resource)?;
        let handler = self.handler(kind);
        let ctx = self.context(namespace);

        match request.verb {
            Verb::Create => {
                let body = request
                    .body
                    .clone()
                    .ok_or_else(|| ApiError::BadRequest(format!("create {kind} requires a body")))?;
                handler.create(&ctx, body)
            }
            Verb::Get => handler.get(&ctx, required_name(request, kind)?),
            Verb::List => handler.list(&ctx),
            Verb::Delete => handler.delete(&ctx, required_name(request, kind)?),
        }
    }

    fn context(&self, namespace: &str) -> RequestContext {
        let ctx = RequestContext::new(namespace);
        match self.request_timeout {
            Some(timeout) => ctx.with_timeout(timeout),
            None => ctx,
        }
    }
}

fn required_name(request: &ApiRequest, kind: ResourceKind) -> ApiResult<&str> {
    match request.name.as_deref() {
        Some(name) if !name.trim().is_empty() => Ok(name),
        _ => Err(ApiError::BadRequest(format!(
            "{} {kind} requires a name",
            request.verb.as_str()
        ))),
    }
}
