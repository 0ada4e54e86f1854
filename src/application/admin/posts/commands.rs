use std::collections::BTreeSet;

use metrics::counter;

use crate::application::repos::{CreatePostParams, RepoError, UpdatePostParams};
use crate::domain::entities::{PostRecord, UserId};
use crate::domain::posts::{ImageUpload, PostDraft, PostInput};
use crate::domain::validation::FieldErrors;
use crate::infra::telemetry::{
    IMAGES_REMOVED_TOTAL, IMAGES_STORED_TOTAL, POSTS_CREATED_TOTAL, POSTS_DELETED_TOTAL,
    POSTS_UPDATED_TOTAL,
};

use super::service::AdminPostService;
use super::types::{
    AUTHOR_FOREIGN_KEY, AdminPostError, CATEGORY_FOREIGN_KEY, SLUG_TAKEN_MESSAGE,
    SLUG_UNIQUE_CONSTRAINT, TAG_FOREIGN_KEY,
};

impl AdminPostService {
    pub async fn create_post(
        &self,
        actor: UserId,
        input: PostInput,
    ) -> Result<PostRecord, AdminPostError> {
        let mut errors = input.check_fields(false);
        self.check_references(&input, None, &mut errors).await?;
        errors.into_result()?;

        let PostDraft {
            title,
            slug,
            category_id,
            tag_ids,
            content,
            excerpt,
            image,
        } = input.into_draft(false)?;
        let tag_count = tag_ids.len();

        let stored_image = self.store_image(image.as_ref()).await?;

        let params = CreatePostParams {
            user_id: actor,
            category_id,
            title,
            slug,
            content,
            excerpt,
            image: stored_image.clone(),
            tag_ids,
        };

        let post = match self.writer.create_post(params).await {
            Ok(post) => post,
            Err(err) => {
                self.discard_image(stored_image.as_deref()).await;
                return Err(map_write_error(err, actor));
            }
        };

        counter!(POSTS_CREATED_TOTAL).increment(1);
        tracing::info!(
            target = "postdesk::admin::posts",
            actor,
            post_id = post.id,
            slug = %post.slug,
            tags = tag_count,
            "Created post"
        );

        Ok(post)
    }

    pub async fn update_post(
        &self,
        actor: UserId,
        id: i64,
        input: PostInput,
    ) -> Result<PostRecord, AdminPostError> {
        let existing = self.load_owned(actor, id).await?;
        let has_stored_image = existing.image.is_some();

        let mut errors = input.check_fields(has_stored_image);
        self.check_references(&input, Some(existing.id), &mut errors)
            .await?;
        errors.into_result()?;

        let PostDraft {
            title,
            slug,
            category_id,
            tag_ids,
            content,
            excerpt,
            image,
        } = input.into_draft(has_stored_image)?;

        let new_image = self.store_image(image.as_ref()).await?;

        let params = UpdatePostParams {
            id: existing.id,
            category_id,
            title,
            slug,
            content,
            excerpt,
            image: new_image.clone().or_else(|| existing.image.clone()),
            tag_ids,
        };

        let post = match self.writer.update_post(params).await {
            Ok(post) => post,
            Err(err) => {
                self.discard_image(new_image.as_deref()).await;
                return Err(map_write_error(err, actor));
            }
        };

        if new_image.is_some()
            && let Some(previous) = existing.image.as_deref()
        {
            self.remove_replaced_image(post.id, previous).await;
        }

        counter!(POSTS_UPDATED_TOTAL).increment(1);
        tracing::info!(
            target = "postdesk::admin::posts",
            actor,
            post_id = post.id,
            slug = %post.slug,
            image_replaced = new_image.is_some(),
            "Updated post"
        );

        Ok(post)
    }

    /// Detach the post's tags and delete it. The stored image stays on disk.
    pub async fn delete_post(&self, actor: UserId, id: i64) -> Result<PostRecord, AdminPostError> {
        let post = self.load_owned(actor, id).await?;

        self.writer
            .delete_post(post.id)
            .await
            .map_err(|err| map_write_error(err, actor))?;

        counter!(POSTS_DELETED_TOTAL).increment(1);
        tracing::info!(
            target = "postdesk::admin::posts",
            actor,
            post_id = post.id,
            slug = %post.slug,
            "Deleted post"
        );

        Ok(post)
    }

    /// Rules that need a lookup: slug uniqueness (ignoring `current`),
    /// category existence and tag existence.
    async fn check_references(
        &self,
        input: &PostInput,
        current: Option<i64>,
        errors: &mut FieldErrors,
    ) -> Result<(), AdminPostError> {
        if let Some(slug) = input.slug.as_deref()
            && !errors.contains("slug")
            && let Some(other) = self.reader.find_by_slug(slug).await?
            && Some(other.id) != current
        {
            errors.add("slug", SLUG_TAKEN_MESSAGE);
        }

        if let Some(category_id) = input.category_id_value()
            && self.categories.find_category(category_id).await?.is_none()
        {
            errors.add("category_id", "The selected category id is invalid.");
        }

        let entries = input.tag_entries();
        if !entries.is_empty() {
            let ids: Vec<i64> = entries.iter().map(|(_, id)| *id).collect();
            let known: BTreeSet<i64> = self
                .tags
                .find_tags_by_ids(&ids)
                .await?
                .into_iter()
                .map(|tag| tag.id)
                .collect();

            for (index, id) in entries {
                if !known.contains(&id) {
                    errors.add(
                        format!("tags.{index}"),
                        format!("The selected tags.{index} is invalid."),
                    );
                }
            }
        }

        Ok(())
    }

    async fn store_image(
        &self,
        image: Option<&ImageUpload>,
    ) -> Result<Option<String>, AdminPostError> {
        let Some(image) = image else {
            return Ok(None);
        };

        let stored = self
            .uploads
            .store(
                &image.file_name,
                image.content_type.as_deref(),
                image.data.clone(),
            )
            .await?;

        counter!(IMAGES_STORED_TOTAL).increment(1);
        tracing::debug!(
            target = "postdesk::admin::posts",
            path = %stored.stored_path,
            size_bytes = stored.size_bytes,
            "Stored post image"
        );

        Ok(Some(stored.stored_path))
    }

    async fn discard_image(&self, path: Option<&str>) {
        let Some(path) = path else {
            return;
        };
        if let Err(err) = self.uploads.delete(path).await {
            tracing::warn!(
                target = "postdesk::admin::posts",
                error = %err,
                path,
                "Failed to remove image after rejected write"
            );
        }
    }

    async fn remove_replaced_image(&self, post_id: i64, path: &str) {
        match self.uploads.delete(path).await {
            Ok(()) => {
                counter!(IMAGES_REMOVED_TOTAL).increment(1);
            }
            Err(err) => {
                tracing::warn!(
                    target = "postdesk::admin::posts",
                    error = %err,
                    post_id,
                    path,
                    "Failed to remove replaced post image"
                );
            }
        }
    }
}

/// Constraint violations that slip past the pre-write checks (a slug taken or
/// a category or tag removed in between) surface as regular field errors.
fn map_write_error(err: RepoError, actor: UserId) -> AdminPostError {
    match err {
        RepoError::Duplicate { constraint } if constraint == SLUG_UNIQUE_CONSTRAINT => {
            field_error("slug", SLUG_TAKEN_MESSAGE)
        }
        RepoError::ForeignKey { constraint } => match constraint.as_str() {
            CATEGORY_FOREIGN_KEY => {
                field_error("category_id", "The selected category id is invalid.")
            }
            TAG_FOREIGN_KEY => field_error("tags", "The selected tags are invalid."),
            AUTHOR_FOREIGN_KEY => AdminPostError::UnknownActor { actor },
            _ => AdminPostError::Repo(RepoError::ForeignKey { constraint }),
        },
        RepoError::NotFound => AdminPostError::NotFound,
        other => AdminPostError::Repo(other),
    }
}

fn field_error(field: &str, message: &str) -> AdminPostError {
    let mut errors = FieldErrors::new();
    errors.add(field, message);
    AdminPostError::Validation(errors)
}
