use serde::Serialize;
use thiserror::Error;

use crate::application::repos::RepoError;
use crate::domain::entities::{CategoryRecord, PostRecord, TagRecord, UserId};
use crate::domain::slug::SlugError;
use crate::domain::validation::FieldErrors;
use crate::infra::uploads::UploadStorageError;

pub const SLUG_UNIQUE_CONSTRAINT: &str = "posts_slug_key";
pub const AUTHOR_FOREIGN_KEY: &str = "posts_user_id_fkey";
pub const CATEGORY_FOREIGN_KEY: &str = "posts_category_id_fkey";
pub const TAG_FOREIGN_KEY: &str = "post_tag_tag_id_fkey";
pub const SLUG_TAKEN_MESSAGE: &str = "The slug has already been taken.";

#[derive(Debug, Error)]
pub enum AdminPostError {
    #[error("post form is invalid: {0}")]
    Validation(FieldErrors),
    #[error("post not found")]
    NotFound,
    #[error("user {actor} does not own post {post_id}")]
    Forbidden { actor: UserId, post_id: i64 },
    #[error("user {actor} has no account")]
    UnknownActor { actor: UserId },
    #[error(transparent)]
    Slug(#[from] SlugError),
    #[error(transparent)]
    Storage(#[from] UploadStorageError),
    #[error(transparent)]
    Repo(#[from] RepoError),
}

impl From<FieldErrors> for AdminPostError {
    fn from(errors: FieldErrors) -> Self {
        Self::Validation(errors)
    }
}

/// Data backing the create form.
#[derive(Debug, Clone, Serialize)]
pub struct PostFormOptions {
    pub categories: Vec<CategoryRecord>,
    pub tags: Vec<TagRecord>,
}

/// A post together with its category and tags.
#[derive(Debug, Clone, Serialize)]
pub struct PostDetail {
    pub post: PostRecord,
    pub category: Option<CategoryRecord>,
    pub tags: Vec<TagRecord>,
}

/// Data backing the edit form: the post, its selected tag ids and the choices.
#[derive(Debug, Clone, Serialize)]
pub struct PostEditForm {
    pub post: PostRecord,
    pub tag_ids: Vec<i64>,
    pub categories: Vec<CategoryRecord>,
    pub tags: Vec<TagRecord>,
}
