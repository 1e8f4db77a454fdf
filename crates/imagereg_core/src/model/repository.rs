//! Image repository domain model.
//!
//! # Invariants
//! - `name` is unique within its namespace.
//! - Every `tags` value named an existing image when the tag was set.
//! - An empty `tags` table is a valid, freshly created repository.

use crate::model::names::{validate_name, ValidationError};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use uuid::Uuid;

/// Named collection of mutable tag pointers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageRepository {
    pub name: String,
    #[serde(default)]
    pub namespace: String,
    #[serde(default)]
    pub uid: Option<Uuid>,
    #[serde(default)]
    pub created_at: Option<i64>,
    /// Object store version observed when this value was read. Never persisted.
    #[serde(default, skip_serializing_if = "is_unversioned")]
    pub resource_version: u64,
    /// Tag name to image identity.
    #[serde(default)]
    pub tags: BTreeMap<String, String>,
}

fn is_unversioned(version: &u64) -> bool {
    *version == 0
}

impl ImageRepository {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            namespace: String::new(),
            uid: None,
            created_at: None,
            resource_version: 0,
            tags: BTreeMap::new(),
        }
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        validate_name("name", &self.name)
    }

    /// Image identity currently pointed at by `tag`.
    pub fn tag(&self, tag: &str) -> Option<&str> {
        self.tags.get(tag).map(String::as_str)
    }
}

#[cfg(test)]
mod tests {
    use super::ImageRepository;
    use serde_json::json;

    #[test]
    fn resource_version_is_not_serialized_when_unset() {
        let repo = ImageRepository::new("app");
        let value = serde_json::to_value(&repo).expect("serialize");
        assert!(value.get("resource_version").is_none());
        assert_eq!(value["tags"], json!({}));
    }

    #[test]
    fn tag_lookup_reads_table() {
        let mut repo = ImageRepository::new("app");
        repo.tags.insert("v1".to_string(), "sha1".to_string());
        assert_eq!(repo.tag("v1"), Some("sha1"));
        assert_eq!(repo.tag("v2"), None);
    }

    #[test]
    fn empty_name_is_invalid() {
        assert!(ImageRepository::new("").validate().is_err());
        ImageRepository::new("test").validate().expect("valid name");
    }
}
