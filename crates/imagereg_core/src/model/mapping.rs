//! Transient write request binding a tag to an image.

use crate::model::image::Image;
use crate::model::names::{validate_name, validate_tag, ValidationError};
use serde::{Deserialize, Serialize};

/// `(repository, tag, image)` triple submitted by a client.
///
/// Never stored; applying it either creates or reuses `image` and then
/// points `tag` in `repository_name` at it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageRepositoryMapping {
    pub repository_name: String,
    pub tag: String,
    pub image: Image,
}

impl ImageRepositoryMapping {
    pub fn new(repository_name: impl Into<String>, tag: impl Into<String>, image: Image) -> Self {
        Self {
            repository_name: repository_name.into(),
            tag: tag.into(),
            image,
        }
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        validate_name("repository_name", &self.repository_name)?;
        validate_tag(&self.tag)?;
        self.image.validate()
    }
}

#[cfg(test)]
mod tests {
    use super::ImageRepositoryMapping;
    use crate::model::image::Image;
    use crate::model::names::ValidationError;

    #[test]
    fn validate_reports_first_missing_field() {
        let image = Image::new("sha1", "reg/app@sha1");
        let missing_repo = ImageRepositoryMapping::new("", "v1", image.clone());
        assert_eq!(
            missing_repo.validate().unwrap_err(),
            ValidationError::Empty("repository_name")
        );

        let missing_tag = ImageRepositoryMapping::new("app", "", image);
        assert_eq!(missing_tag.validate().unwrap_err(), ValidationError::Empty("tag"));

        let missing_identity = ImageRepositoryMapping::new("app", "v1", Image::new("", "ref"));
        assert_eq!(
            missing_identity.validate().unwrap_err(),
            ValidationError::Empty("image.identity")
        );
    }
}
