//! Repository traits describing persistence adapters.

use async_trait::async_trait;
use thiserror::Error;

use crate::application::pagination::{CursorPage, PageRequest, PaginationError, PostCursor};
use crate::domain::entities::{CategoryRecord, PostRecord, TagRecord, UserId};

#[derive(Debug, Error)]
pub enum RepoError {
    #[error("persistence error: {0}")]
    Persistence(String),
    #[error("duplicate record violates unique constraint `{constraint}`")]
    Duplicate { constraint: String },
    #[error("resource not found")]
    NotFound,
    #[error("invalid input: {message}")]
    InvalidInput { message: String },
    #[error("referenced record missing for foreign key `{constraint}`")]
    ForeignKey { constraint: String },
    #[error("integrity error: {message}")]
    Integrity { message: String },
    #[error("database timeout")]
    Timeout,
    #[error(transparent)]
    Pagination(#[from] PaginationError),
}

impl RepoError {
    pub fn from_persistence(err: impl std::fmt::Display) -> Self {
        Self::Persistence(err.to_string())
    }
}

/// Which posts a listing covers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PostListScope {
    All,
    Owner(UserId),
}

#[derive(Debug, Clone)]
pub struct CreatePostParams {
    pub user_id: UserId,
    pub category_id: i64,
    pub title: String,
    pub slug: String,
    pub content: Option<String>,
    pub excerpt: Option<String>,
    pub image: Option<String>,
    pub tag_ids: Vec<i64>,
}

#[derive(Debug, Clone)]
pub struct UpdatePostParams {
    pub id: i64,
    pub category_id: i64,
    pub title: String,
    pub slug: String,
    pub content: Option<String>,
    pub excerpt: Option<String>,
    pub image: Option<String>,
    pub tag_ids: Vec<i64>,
}

#[async_trait]
pub trait PostsRepo: Send + Sync {
    async fn list_posts(
        &self,
        scope: PostListScope,
        page: PageRequest<PostCursor>,
    ) -> Result<CursorPage<PostRecord>, RepoError>;

    async fn find_by_id(&self, id: i64) -> Result<Option<PostRecord>, RepoError>;

    async fn find_by_slug(&self, slug: &str) -> Result<Option<PostRecord>, RepoError>;
}

#[async_trait]
pub trait PostsWriteRepo: Send + Sync {
    /// Insert the post and attach `params.tag_ids`. Either both land or
    /// neither does.
    async fn create_post(&self, params: CreatePostParams) -> Result<PostRecord, RepoError>;

    /// Update the post and replace its whole tag set with `params.tag_ids`
    /// in one unit.
    async fn update_post(&self, params: UpdatePostParams) -> Result<PostRecord, RepoError>;

    /// Detach every tag from the post, then remove it. Fails with
    /// [`RepoError::NotFound`] when no such post exists.
    async fn delete_post(&self, id: i64) -> Result<(), RepoError>;
}

#[async_trait]
pub trait CategoriesRepo: Send + Sync {
    async fn list_categories(&self) -> Result<Vec<CategoryRecord>, RepoError>;

    async fn find_category(&self, id: i64) -> Result<Option<CategoryRecord>, RepoError>;
}

#[async_trait]
pub trait TagsRepo: Send + Sync {
    async fn list_tags(&self) -> Result<Vec<TagRecord>, RepoError>;

    async fn list_tags_for_post(&self, post_id: i64) -> Result<Vec<TagRecord>, RepoError>;

    /// Tags among `ids` that exist; unknown ids are silently absent.
    async fn find_tags_by_ids(&self, ids: &[i64]) -> Result<Vec<TagRecord>, RepoError>;
}
