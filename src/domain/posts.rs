//! Post form rules that do not depend on persistence.
//!
//! Lookups (slug uniqueness, category and tag existence) happen in the admin
//! post service; everything checkable from the submitted values alone lives
//! here so it can be exercised without a database.

use bytes::Bytes;
use validator::{Validate, ValidationError};

use crate::domain::slug::is_slug_shaped;
use crate::domain::validation::FieldErrors;

pub const TITLE_MAX_CHARS: usize = 100;
pub const SLUG_MAX_CHARS: usize = 100;
pub const CONTENT_MAX_CHARS: usize = 5000;
pub const EXCERPT_MAX_CHARS: usize = 200;
pub const IMAGE_MAX_BYTES: usize = 1024 * 1024;

/// An image file received with a post form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageUpload {
    pub file_name: String,
    pub content_type: Option<String>,
    pub data: Bytes,
}

impl ImageUpload {
    /// Whether the payload sniffs as a raster image format.
    pub fn is_image(&self) -> bool {
        !self.data.is_empty() && imagesize::image_type(&self.data).is_ok()
    }
}

/// Raw post form as submitted; blank values are already `None`.
#[derive(Debug, Clone, Default, Validate)]
pub struct PostInput {
    #[validate(length(max = 100, message = "The title may not be greater than 100 characters."))]
    pub title: Option<String>,
    #[validate(
        length(max = 100, message = "The slug may not be greater than 100 characters."),
        custom(function = "validate_slug_shape")
    )]
    pub slug: Option<String>,
    pub category_id: Option<String>,
    pub tags: Vec<String>,
    #[validate(length(max = 5000, message = "The content may not be greater than 5000 characters."))]
    pub content: Option<String>,
    #[validate(length(max = 200, message = "The excerpt may not be greater than 200 characters."))]
    pub excerpt: Option<String>,
    pub image: Option<ImageUpload>,
}

/// A post form that passed every rule, ready to persist.
#[derive(Debug, Clone)]
pub struct PostDraft {
    pub title: String,
    pub slug: String,
    pub category_id: i64,
    pub tag_ids: Vec<i64>,
    pub content: Option<String>,
    pub excerpt: Option<String>,
    pub image: Option<ImageUpload>,
}

fn validate_slug_shape(slug: &str) -> Result<(), ValidationError> {
    if is_slug_shaped(slug) {
        Ok(())
    } else {
        Err(ValidationError::new("slug_shape").with_message(
            "The slug may only contain lowercase letters, numbers and single dashes.".into(),
        ))
    }
}

/// Trim a submitted value, mapping blank strings to `None`.
pub fn blank_to_none(value: Option<String>) -> Option<String> {
    value.and_then(|raw| {
        let trimmed = raw.trim();
        (!trimmed.is_empty()).then(|| trimmed.to_string())
    })
}

impl PostInput {
    /// Check every rule that needs no lookup.
    ///
    /// `has_stored_image` is true when updating a post that already carries
    /// an image; it satisfies the image-or-content requirement on its own.
    pub fn check_fields(&self, has_stored_image: bool) -> FieldErrors {
        let mut errors = FieldErrors::new();
        if let Err(failures) = self.validate() {
            errors.absorb(&failures);
        }

        if self.title.is_none() {
            errors.add("title", "The title field is required.");
        }
        if self.slug.is_none() {
            errors.add("slug", "The slug field is required.");
        }

        match self.category_id.as_deref() {
            None => errors.add("category_id", "The category id field is required."),
            Some(raw) if raw.parse::<i64>().is_err() => {
                errors.add("category_id", "The category id must be an integer.")
            }
            Some(_) => {}
        }

        for (index, raw) in self.tags.iter().enumerate() {
            if raw.trim().parse::<i64>().is_err() {
                errors.add(format!("tags.{index}"), "The tag must be an integer.");
            }
        }

        if let Some(image) = self.image.as_ref() {
            if !image.is_image() {
                errors.add("image", "The image must be an image.");
            }
            if image.data.len() > IMAGE_MAX_BYTES {
                errors.add(
                    "image",
                    "The image may not be greater than 1024 kilobytes.",
                );
            }
        }

        if self.content.is_none() && self.image.is_none() && !has_stored_image {
            errors.add(
                "image",
                "The image field is required when content is not present.",
            );
            errors.add(
                "content",
                "The content field is required when image is not present.",
            );
        }

        errors
    }

    pub fn category_id_value(&self) -> Option<i64> {
        self.category_id.as_deref()?.parse().ok()
    }

    /// Submitted tag ids that parse, paired with their position in the form.
    pub fn tag_entries(&self) -> Vec<(usize, i64)> {
        self.tags
            .iter()
            .enumerate()
            .filter_map(|(index, raw)| raw.trim().parse().ok().map(|id| (index, id)))
            .collect()
    }

    /// Convert into a draft; fails with the field errors when a rule is broken.
    pub fn into_draft(self, has_stored_image: bool) -> Result<PostDraft, FieldErrors> {
        self.check_fields(has_stored_image).into_result()?;

        let category_id = self.category_id_value();
        let tag_ids = dedup_preserving_order(self.tag_entries().into_iter().map(|(_, id)| id));
        let PostInput {
            title,
            slug,
            content,
            excerpt,
            image,
            ..
        } = self;

        match (title, slug, category_id) {
            (Some(title), Some(slug), Some(category_id)) => Ok(PostDraft {
                title,
                slug,
                category_id,
                tag_ids,
                content,
                excerpt,
                image,
            }),
            _ => {
                let mut errors = FieldErrors::new();
                errors.add("form", "The post form is incomplete.");
                Err(errors)
            }
        }
    }
}

fn dedup_preserving_order(ids: impl IntoIterator<Item = i64>) -> Vec<i64> {
    let mut seen = std::collections::BTreeSet::new();
    ids.into_iter().filter(|id| seen.insert(*id)).collect()
}
