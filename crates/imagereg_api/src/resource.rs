//! Resource names served by the registry API.

use std::error::Error;
use std::fmt::{Display, Formatter};

/// Closed set of resources routed by name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ResourceKind {
    Images,
    ImageRepositories,
    ImageRepositoryMappings,
    ImageRepositoryTags,
}

pub const RESOURCE_IMAGES: &str = "images";
pub const RESOURCE_IMAGE_REPOSITORIES: &str = "imageRepositories";
pub const RESOURCE_IMAGE_REPOSITORY_MAPPINGS: &str = "imageRepositoryMappings";
pub const RESOURCE_IMAGE_REPOSITORY_TAGS: &str = "imageRepositoryTags";

const SUPPORTED_RESOURCES: &[&str] = &[
    RESOURCE_IMAGES,
    RESOURCE_IMAGE_REPOSITORIES,
    RESOURCE_IMAGE_REPOSITORY_MAPPINGS,
    RESOURCE_IMAGE_REPOSITORY_TAGS,
];

impl ResourceKind {
    /// Stable resource name used for routing.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Images => RESOURCE_IMAGES,
            Self::ImageRepositories => RESOURCE_IMAGE_REPOSITORIES,
            Self::ImageRepositoryMappings => RESOURCE_IMAGE_REPOSITORY_MAPPINGS,
            Self::ImageRepositoryTags => RESOURCE_IMAGE_REPOSITORY_TAGS,
        }
    }
}

impl Display for ResourceKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Returns every routable resource name.
pub fn supported_resources() -> &'static [&'static str] {
    SUPPORTED_RESOURCES
}

/// Parses a resource name. Names are case-sensitive.
pub fn parse_resource(value: &str) -> Result<ResourceKind, UnknownResource> {
    match value.trim() {
        RESOURCE_IMAGES => Ok(ResourceKind::Images),
        RESOURCE_IMAGE_REPOSITORIES => Ok(ResourceKind::ImageRepositories),
        RESOURCE_IMAGE_REPOSITORY_MAPPINGS => Ok(ResourceKind::ImageRepositoryMappings),
        RESOURCE_IMAGE_REPOSITORY_TAGS => Ok(ResourceKind::ImageRepositoryTags),
        other => Err(UnknownResource(other.to_string())),
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownResource(pub String);

impl Display for UnknownResource {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "resource is not served: `{}`", self.0)
    }
}

impl Error for UnknownResource {}

#[cfg(test)]
mod tests {
    use super::{parse_resource, supported_resources, ResourceKind, UnknownResource};

    #[test]
    fn every_supported_name_round_trips() {
        for name in supported_resources() {
            let kind = parse_resource(name).expect("supported resource");
            assert_eq!(kind.as_str(), *name);
        }
    }

    #[test]
    fn names_are_case_sensitive() {
        assert_eq!(
            parse_resource("ImageRepositories").unwrap_err(),
            UnknownResource("ImageRepositories".to_string())
        );
        assert_eq!(parse_resource(" images ").unwrap(), ResourceKind::Images);
    }
}
