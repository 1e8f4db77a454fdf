//! Image domain model.
//!
//! # Invariants
//! - `identity` is unique within a namespace and never reused.
//! - `content_reference` and `metadata` are frozen once the image is stored.
//! - `uid` and `created_at` are `None` until the image store persists it.

use crate::model::names::{validate_identity, ValidationError};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

/// Immutable content record addressed by `identity`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Image {
    /// Unique identity, typically a content digest.
    pub identity: String,
    /// Owning namespace. Filled from the request context on write.
    #[serde(default)]
    pub namespace: String,
    /// Store-assigned unique id.
    #[serde(default)]
    pub uid: Option<Uuid>,
    /// Store-assigned creation time in epoch milliseconds.
    #[serde(default)]
    pub created_at: Option<i64>,
    /// Opaque pull spec locating the underlying content blob.
    #[serde(default)]
    pub content_reference: String,
    /// Opaque structured content such as a decoded image config.
    #[serde(default)]
    pub metadata: Value,
}

impl Image {
    /// Builds an unsaved image payload without metadata.
    pub fn new(identity: impl Into<String>, content_reference: impl Into<String>) -> Self {
        Self {
            identity: identity.into(),
            namespace: String::new(),
            uid: None,
            created_at: None,
            content_reference: content_reference.into(),
            metadata: Value::Null,
        }
    }

    pub fn with_metadata(mut self, metadata: Value) -> Self {
        self.metadata = metadata;
        self
    }

    /// Checks the fields a client must supply.
    pub fn validate(&self) -> Result<(), ValidationError> {
        validate_identity(&self.identity)?;
        if self.content_reference.trim().is_empty() {
            return Err(ValidationError::Empty("image.content_reference"));
        }
        Ok(())
    }

    /// Whether `other` points at the same underlying content.
    ///
    /// Only the content reference participates; metadata differences on an
    /// otherwise identical resubmission are ignored.
    pub fn same_content(&self, other: &Image) -> bool {
        self.content_reference == other.content_reference
    }

    /// Returns whether the store has assigned identity metadata.
    pub fn is_persisted(&self) -> bool {
        self.uid.is_some()
    }
}
