//! Registry error taxonomy.
//!
//! # Responsibility
//! - Separate business-rule failures from transient and infrastructure ones.
//! - Give callers a stable `ErrorKind` and a retry hint.
//!
//! # Invariants
//! - `ContentConflict` and `AlreadyExists` are never retryable: the caller
//!   must change its input.
//! - `Conflict` is always retryable with backoff.

use crate::model::names::ValidationError;
use crate::storage::StoreError;
use std::error::Error;
use std::fmt::{Display, Formatter};

pub type RegistryResult<T> = Result<T, RegistryError>;

/// Entity named in not-found / already-exists errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntityKind {
    Image,
    ImageRepository,
    Tag,
}

impl EntityKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Image => "image",
            Self::ImageRepository => "image repository",
            Self::Tag => "image repository tag",
        }
    }
}

/// Coarse error classification used at the API boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Invalid,
    NotFound,
    AlreadyExists,
    Conflict,
    Internal,
}

#[derive(Debug)]
pub enum RegistryError {
    /// Malformed request input.
    Invalid(ValidationError),
    NotFound {
        kind: EntityKind,
        name: String,
    },
    AlreadyExists {
        kind: EntityKind,
        name: String,
        reason: Option<String>,
    },
    /// An image identity exists with a different content reference.
    ContentConflict {
        identity: String,
        stored_reference: String,
        requested_reference: String,
    },
    /// Optimistic-concurrency retries exhausted or the deadline expired.
    Conflict {
        kind: EntityKind,
        name: String,
        attempts: u32,
        timed_out: bool,
    },
    /// Persisted document cannot be decoded.
    InvalidData(String),
    Store(StoreError),
}

impl RegistryError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Invalid(_) => ErrorKind::Invalid,
            Self::NotFound { .. } => ErrorKind::NotFound,
            Self::AlreadyExists { .. } => ErrorKind::AlreadyExists,
            Self::ContentConflict { .. } | Self::Conflict { .. } => ErrorKind::Conflict,
            Self::InvalidData(_) | Self::Store(_) => ErrorKind::Internal,
        }
    }

    /// Whether repeating the identical request may succeed.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Conflict { .. } => true,
            Self::Store(err) => !err.is_fatal(),
            _ => false,
        }
    }

    pub(crate) fn not_found(kind: EntityKind, name: impl Into<String>) -> Self {
        Self::NotFound {
            kind,
            name: name.into(),
        }
    }
}

impl Display for RegistryError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Invalid(err) => write!(f, "invalid request: {err}"),
            Self::NotFound { kind, name } => write!(f, "{} `{name}` not found", kind.as_str()),
            Self::AlreadyExists { kind, name, reason } => {
                write!(f, "{} `{name}` already exists", kind.as_str())?;
                if let Some(reason) = reason {
                    write!(f, ": {reason}")?;
                }
                Ok(())
            }
            Self::ContentConflict {
                identity,
                stored_reference,
                requested_reference,
            } => write!(
                f,
                "image `{identity}` is stored with content reference `{stored_reference}`; refusing to repoint it to `{requested_reference}`"
            ),
            Self::Conflict {
                kind,
                name,
                attempts,
                timed_out,
            } => {
                if *timed_out {
                    write!(
                        f,
                        "{} `{name}` update deadline expired after {attempts} attempt(s); retry later",
                        kind.as_str()
                    )
                } else {
                    write!(
                        f,
                        "{} `{name}` was modified concurrently {attempts} time(s); retry later",
                        kind.as_str()
                    )
                }
            }
            Self::InvalidData(message) => write!(f, "invalid persisted data: {message}"),
            Self::Store(err) => write!(f, "{err}"),
        }
    }
}

impl Error for RegistryError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Invalid(err) => Some(err),
            Self::Store(err) => Some(err),
            _ => None,
        }
    }
}

impl From<ValidationError> for RegistryError {
    fn from(value: ValidationError) -> Self {
        Self::Invalid(value)
    }
}

impl From<StoreError> for RegistryError {
    fn from(value: StoreError) -> Self {
        Self::Store(value)
    }
}
