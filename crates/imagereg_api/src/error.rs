//! API-boundary errors.
//!
//! Status reasons follow the Kubernetes `StatusReason` vocabulary; mapping
//! them to numeric codes is left to the transport.

use crate::resource::{ResourceKind, UnknownResource};
use imagereg_core::{ErrorKind, RegistryError};
use serde_json::{json, Value};
use std::error::Error;
use std::fmt::{Display, Formatter};

pub type ApiResult<T> = Result<T, ApiError>;

/// Request verbs understood by resource handlers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verb {
    Create,
    Get,
    List,
    Delete,
}

impl Verb {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Create => "create",
            Self::Get => "get",
            Self::List => "list",
            Self::Delete => "delete",
        }
    }
}

#[derive(Debug)]
pub enum ApiError {
    UnknownResource(UnknownResource),
    MethodNotSupported { resource: ResourceKind, verb: Verb },
    /// Body or name could not be interpreted.
    BadRequest(String),
    Registry(RegistryError),
}

impl ApiError {
    pub fn reason(&self) -> &'static str {
        match self {
            Self::UnknownResource(_) => "NotFound",
            Self::MethodNotSupported { .. } => "MethodNotAllowed",
            Self::BadRequest(_) => "BadRequest",
            Self::Registry(err) => match err.kind() {
                ErrorKind::Invalid => "Invalid",
                ErrorKind::NotFound => "NotFound",
                ErrorKind::AlreadyExists => "AlreadyExists",
                ErrorKind::Conflict => "Conflict",
                ErrorKind::Internal => "InternalError",
            },
        }
    }

    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Registry(err) => err.is_retryable(),
            _ => false,
        }
    }

    /// Failure status document returned to callers.
    pub fn to_status(&self) -> Value {
        json!({
            "status": "Failure",
            "reason": self.reason(),
            "message": self.to_string(),
            "retryable": self.is_retryable(),
        })
    }
}

impl Display for ApiError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::UnknownResource(err) => write!(f, "{err}"),
            Self::MethodNotSupported { resource, verb } => {
                write!(f, "{resource} does not support {}", verb.as_str())
            }
            Self::BadRequest(message) => write!(f, "bad request: {message}"),
            Self::Registry(err) => write!(f, "{err}"),
        }
    }
}

impl Error for ApiError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::UnknownResource(err) => Some(err),
            Self::Registry(err) => Some(err),
            _ => None,
        }
    }
}

impl From<RegistryError> for ApiError {
    fn from(value: RegistryError) -> Self {
        Self::Registry(value)
    }
}

impl From<UnknownResource> for ApiError {
    fn from(value: UnknownResource) -> Self {
        Self::UnknownResource(value)
    }
}
