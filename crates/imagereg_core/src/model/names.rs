//! Naming rules shared by images, repositories and tags.

use once_cell::sync::Lazy;
use regex::Regex;
use std::error::Error;
use std::fmt::{Display, Formatter};

pub const MAX_NAME_LEN: usize = 253;
pub const MAX_TAG_LEN: usize = 128;

static NAME_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[a-z0-9]([a-z0-9._-]*[a-z0-9])?$").expect("valid repository name regex")
});
static TAG_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z0-9_][A-Za-z0-9_.-]*$").expect("valid tag regex"));

/// Field-level validation failure for registry write requests.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// Required field is empty or whitespace-only.
    Empty(&'static str),
    /// Field exceeds its maximum length.
    TooLong { field: &'static str, max: usize },
    /// Field contains characters outside its allowed set.
    InvalidFormat { field: &'static str, value: String },
    /// Field may not be supplied on this write path.
    NotAllowed { field: &'static str, reason: &'static str },
}

impl ValidationError {
    /// Name of the offending field.
    pub fn field(&self) -> &'static str {
        match self {
            Self::Empty(field) => field,
            Self::TooLong { field, .. } => field,
            Self::InvalidFormat { field, .. } => field,
            Self::NotAllowed { field, .. } => field,
        }
    }
}

impl Display for ValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Empty(field) => write!(f, "{field} must not be empty"),
            Self::TooLong { field, max } => {
                write!(f, "{field} must be at most {max} characters")
            }
            Self::InvalidFormat { field, value } => {
                write!(f, "{field} has invalid format: `{value}`")
            }
            Self::NotAllowed { field, reason } => write!(f, "{field} is not allowed: {reason}"),
        }
    }
}

impl Error for ValidationError {}

/// Validates a namespace or repository name.
pub fn validate_name(field: &'static str, value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        return Err(ValidationError::Empty(field));
    }
    if value.len() > MAX_NAME_LEN {
        return Err(ValidationError::TooLong {
            field,
            max: MAX_NAME_LEN,
        });
    }
    if !NAME_RE.is_match(value) {
        return Err(ValidationError::InvalidFormat {
            field,
            value: value.to_string(),
        });
    }
    Ok(())
}

/// Validates a tag name.
pub fn validate_tag(value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        return Err(ValidationError::Empty("tag"));
    }
    if value.len() > MAX_TAG_LEN {
        return Err(ValidationError::TooLong {
            field: "tag",
            max: MAX_TAG_LEN,
        });
    }
    if !TAG_RE.is_match(value) {
        return Err(ValidationError::InvalidFormat {
            field: "tag",
            value: value.to_string(),
        });
    }
    Ok(())
}

/// Validates an image identity.
///
/// Identities are opaque (often a digest such as `sha256:...`) but become
/// part of the storage key, so whitespace and `/` are rejected.
pub fn validate_identity(value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        return Err(ValidationError::Empty("image.identity"));
    }
    if value.len() > MAX_NAME_LEN {
        return Err(ValidationError::TooLong {
            field: "image.identity",
            max: MAX_NAME_LEN,
        });
    }
    if value.chars().any(|ch| ch.is_whitespace() || ch == '/') {
        return Err(ValidationError::InvalidFormat {
            field: "image.identity",
            value: value.to_string(),
        });
    }
    Ok(())
}
