//! In-memory repositories shared by the service and router tests.

#![allow(dead_code)]

use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use time::{Duration, OffsetDateTime};
use tokio::sync::Mutex;

use postdesk::application::admin::AdminPostService;
use postdesk::application::pagination::{CursorPage, PageRequest, PostCursor};
use postdesk::application::repos::{
    CategoriesRepo, CreatePostParams, PostListScope, PostsRepo, PostsWriteRepo, RepoError,
    TagsRepo, UpdatePostParams,
};
use postdesk::domain::entities::{CategoryRecord, PostRecord, TagRecord, UserId};
use postdesk::domain::posts::{ImageUpload, PostInput};
use postdesk::infra::uploads::{UPLOAD_PREFIX, UploadStorage};

pub const PNG_BYTES: &[u8] = b"\x89PNG\r\n\x1a\n\0\0\0\rIHDR\0\0\0\x01\0\0\0\x01\x08\x06\0\0\0\x1f\x15\xc4\x89";

#[derive(Default)]
struct MemoryState {
    posts: Vec<PostRecord>,
    post_tag: Vec<(i64, i64)>,
    categories: Vec<CategoryRecord>,
    tags: Vec<TagRecord>,
    next_id: i64,
    clock: i64,
}

/// Stand-in for the Postgres adapter. Enforces the slug unique index and the
/// category and tag foreign keys the way the database does, and writes a post
/// together with its tags or not at all.
#[derive(Default)]
pub struct MemoryRepos {
    state: Mutex<MemoryState>,
}

impl MemoryRepos {
    pub fn seeded() -> Self {
        let state = MemoryState {
            categories: vec![
                CategoryRecord {
                    id: 1,
                    name: "News".to_string(),
                },
                CategoryRecord {
                    id: 2,
                    name: "Guides".to_string(),
                },
            ],
            tags: vec![
                TagRecord {
                    id: 10,
                    name: "rust".to_string(),
                },
                TagRecord {
                    id: 11,
                    name: "web".to_string(),
                },
                TagRecord {
                    id: 12,
                    name: "db".to_string(),
                },
            ],
            next_id: 1,
            ..MemoryState::default()
        };
        Self {
            state: Mutex::new(state),
        }
    }

    pub async fn post_count(&self) -> usize {
        self.state.lock().await.posts.len()
    }

    pub async fn tag_ids_for(&self, post_id: i64) -> Vec<i64> {
        let state = self.state.lock().await;
        state
            .post_tag
            .iter()
            .filter(|(post, _)| *post == post_id)
            .map(|(_, tag)| *tag)
            .collect()
    }

    pub async fn link_count(&self) -> usize {
        self.state.lock().await.post_tag.len()
    }

    /// Insert a post directly, bypassing the service rules.
    pub async fn insert_post(&self, user_id: UserId, title: &str, slug: &str) -> PostRecord {
        self.create_post(CreatePostParams {
            user_id,
            category_id: 1,
            title: title.to_string(),
            slug: slug.to_string(),
            content: Some("Body".to_string()),
            excerpt: None,
            image: None,
            tag_ids: Vec::new(),
        })
        .await
        .expect("insert post")
    }

    /// Delete a tag the way `ON DELETE CASCADE` would, links included.
    pub async fn remove_tag(&self, tag_id: i64) {
        let mut state = self.state.lock().await;
        state.tags.retain(|tag| tag.id != tag_id);
        state.post_tag.retain(|(_, tag)| *tag != tag_id);
    }
}

fn slug_conflict() -> RepoError {
    RepoError::Duplicate {
        constraint: "posts_slug_key".to_string(),
    }
}

fn missing_reference(constraint: &str) -> RepoError {
    RepoError::ForeignKey {
        constraint: constraint.to_string(),
    }
}

impl MemoryState {
    /// Foreign keys on `posts.category_id` and `post_tag.tag_id`.
    fn check_references(&self, category_id: i64, tag_ids: &[i64]) -> Result<(), RepoError> {
        if !self.categories.iter().any(|category| category.id == category_id) {
            return Err(missing_reference("posts_category_id_fkey"));
        }
        if !tag_ids
            .iter()
            .all(|id| self.tags.iter().any(|tag| tag.id == *id))
        {
            return Err(missing_reference("post_tag_tag_id_fkey"));
        }
        Ok(())
    }

    fn link_tags(&mut self, post_id: i64, tag_ids: &[i64]) {
        self.post_tag.retain(|(post, _)| *post != post_id);
        for tag in tag_ids {
            if !self.post_tag.contains(&(post_id, *tag)) {
                self.post_tag.push((post_id, *tag));
            }
        }
    }
}

#[async_trait]
impl PostsRepo for MemoryRepos {
    async fn list_posts(
        &self,
        scope: PostListScope,
        page: PageRequest<PostCursor>,
    ) -> Result<CursorPage<PostRecord>, RepoError> {
        let state = self.state.lock().await;
        let mut posts: Vec<PostRecord> = state
            .posts
            .iter()
            .filter(|post| match scope {
                PostListScope::All => true,
                PostListScope::Owner(user) => post.user_id == user,
            })
            .filter(|post| match page.cursor {
                Some(cursor) => (post.created_at, post.id) < (cursor.created_at(), cursor.id()),
                None => true,
            })
            .cloned()
            .collect();
        posts.sort_by(|a, b| (b.created_at, b.id).cmp(&(a.created_at, a.id)));

        let limit = page.limit as usize;
        let next_cursor = if posts.len() > limit {
            posts.truncate(limit);
            posts
                .last()
                .map(|post| PostCursor::new(post.created_at, post.id).encode())
        } else {
            None
        };

        Ok(CursorPage::new(posts, next_cursor))
    }

    async fn find_by_id(&self, id: i64) -> Result<Option<PostRecord>, RepoError> {
        let state = self.state.lock().await;
        Ok(state.posts.iter().find(|post| post.id == id).cloned())
    }

    async fn find_by_slug(&self, slug: &str) -> Result<Option<PostRecord>, RepoError> {
        let state = self.state.lock().await;
        Ok(state.posts.iter().find(|post| post.slug == slug).cloned())
    }
}

#[async_trait]
impl PostsWriteRepo for MemoryRepos {
    async fn create_post(&self, params: CreatePostParams) -> Result<PostRecord, RepoError> {
        let mut state = self.state.lock().await;
        if state.posts.iter().any(|post| post.slug == params.slug) {
            return Err(slug_conflict());
        }
        state.check_references(params.category_id, &params.tag_ids)?;

        state.next_id = state.next_id.max(1);
        let id = state.next_id;
        state.next_id += 1;
        state.clock += 1;
        let now = OffsetDateTime::UNIX_EPOCH + Duration::seconds(state.clock);

        let post = PostRecord {
            id,
            user_id: params.user_id,
            category_id: params.category_id,
            title: params.title,
            slug: params.slug,
            content: params.content,
            excerpt: params.excerpt,
            image: params.image,
            created_at: now,
            updated_at: now,
        };
        state.posts.push(post.clone());
        state.link_tags(id, &params.tag_ids);
        Ok(post)
    }

    async fn update_post(&self, params: UpdatePostParams) -> Result<PostRecord, RepoError> {
        let mut state = self.state.lock().await;
        if state
            .posts
            .iter()
            .any(|post| post.slug == params.slug && post.id != params.id)
        {
            return Err(slug_conflict());
        }
        if !state.posts.iter().any(|post| post.id == params.id) {
            return Err(RepoError::NotFound);
        }
        state.check_references(params.category_id, &params.tag_ids)?;

        state.clock += 1;
        let now = OffsetDateTime::UNIX_EPOCH + Duration::seconds(state.clock);
        state.link_tags(params.id, &params.tag_ids);
        let post = state
            .posts
            .iter_mut()
            .find(|post| post.id == params.id)
            .ok_or(RepoError::NotFound)?;

        post.category_id = params.category_id;
        post.title = params.title;
        post.slug = params.slug;
        post.content = params.content;
        post.excerpt = params.excerpt;
        post.image = params.image;
        post.updated_at = now;
        Ok(post.clone())
    }

    async fn delete_post(&self, id: i64) -> Result<(), RepoError> {
        let mut state = self.state.lock().await;
        state.post_tag.retain(|(post, _)| *post != id);
        let before = state.posts.len();
        state.posts.retain(|post| post.id != id);
        if state.posts.len() == before {
            return Err(RepoError::NotFound);
        }
        Ok(())
    }
}

/// What another request does between the service's checks and its write.
#[derive(Debug, Clone)]
pub enum Race {
    /// Another author claims the slug first.
    TakeSlug(String),
    /// The tag is deleted.
    RemoveTag(i64),
}

/// Writer that lets a concurrent request land right before every create or
/// update reaches the shared repositories.
pub struct RacingWriter {
    repos: Arc<MemoryRepos>,
    race: Race,
}

impl RacingWriter {
    async fn interleave(&self) {
        match &self.race {
            Race::TakeSlug(slug) => {
                if self.repos.find_by_slug(slug).await.ok().flatten().is_none() {
                    self.repos.insert_post(99, "Racer", slug).await;
                }
            }
            Race::RemoveTag(tag_id) => self.repos.remove_tag(*tag_id).await,
        }
    }
}

#[async_trait]
impl PostsWriteRepo for RacingWriter {
    async fn create_post(&self, params: CreatePostParams) -> Result<PostRecord, RepoError> {
        self.interleave().await;
        self.repos.create_post(params).await
    }

    async fn update_post(&self, params: UpdatePostParams) -> Result<PostRecord, RepoError> {
        self.interleave().await;
        self.repos.update_post(params).await
    }

    async fn delete_post(&self, id: i64) -> Result<(), RepoError> {
        self.repos.delete_post(id).await
    }
}

#[async_trait]
impl CategoriesRepo for MemoryRepos {
    async fn list_categories(&self) -> Result<Vec<CategoryRecord>, RepoError> {
        Ok(self.state.lock().await.categories.clone())
    }

    async fn find_category(&self, id: i64) -> Result<Option<CategoryRecord>, RepoError> {
        let state = self.state.lock().await;
        Ok(state
            .categories
            .iter()
            .find(|category| category.id == id)
            .cloned())
    }
}

#[async_trait]
impl TagsRepo for MemoryRepos {
    async fn list_tags(&self) -> Result<Vec<TagRecord>, RepoError> {
        Ok(self.state.lock().await.tags.clone())
    }

    async fn list_tags_for_post(&self, post_id: i64) -> Result<Vec<TagRecord>, RepoError> {
        let state = self.state.lock().await;
        Ok(state
            .post_tag
            .iter()
            .filter(|(post, _)| *post == post_id)
            .filter_map(|(_, tag)| state.tags.iter().find(|t| t.id == *tag).cloned())
            .collect())
    }

    async fn find_tags_by_ids(&self, ids: &[i64]) -> Result<Vec<TagRecord>, RepoError> {
        let state = self.state.lock().await;
        Ok(state
            .tags
            .iter()
            .filter(|tag| ids.contains(&tag.id))
            .cloned()
            .collect())
    }
}

/// A service wired to fresh in-memory repositories and a temporary upload root.
pub struct Harness {
    pub repos: Arc<MemoryRepos>,
    pub uploads: Arc<UploadStorage>,
    pub service: Arc<AdminPostService>,
    _root: tempfile::TempDir,
}

impl Harness {
    pub fn new() -> Self {
        let root = tempfile::tempdir().expect("temp upload root");
        let repos = Arc::new(MemoryRepos::seeded());
        let uploads =
            Arc::new(UploadStorage::new(root.path().to_path_buf()).expect("upload storage"));
        let service = Arc::new(AdminPostService::new(
            repos.clone(),
            repos.clone(),
            repos.clone(),
            repos.clone(),
            uploads.clone(),
        ));
        Self {
            repos,
            uploads,
            service,
            _root: root,
        }
    }

    /// A service sharing this harness' repositories and upload root whose
    /// writes race against `race`.
    pub fn racing_service(&self, race: Race) -> AdminPostService {
        let writer = Arc::new(RacingWriter {
            repos: self.repos.clone(),
            race,
        });
        AdminPostService::new(
            self.repos.clone(),
            writer,
            self.repos.clone(),
            self.repos.clone(),
            self.uploads.clone(),
        )
    }

    /// Number of files under the upload directory.
    pub fn stored_file_count(&self) -> usize {
        std::fs::read_dir(self.uploads.root().join(UPLOAD_PREFIX))
            .expect("uploads dir")
            .count()
    }

    pub fn image_exists(&self, stored_path: &str) -> bool {
        self.uploads
            .absolute_path(stored_path)
            .map(|path| path.exists())
            .unwrap_or(false)
    }
}

pub fn post_input(title: &str, slug: &str) -> PostInput {
    PostInput {
        title: Some(title.to_string()),
        slug: Some(slug.to_string()),
        category_id: Some("1".to_string()),
        tags: vec!["10".to_string(), "11".to_string()],
        content: Some("Some body text".to_string()),
        excerpt: None,
        image: None,
    }
}

pub fn png_upload(name: &str) -> ImageUpload {
    ImageUpload {
        file_name: name.to_string(),
        content_type: Some("image/png".to_string()),
        data: Bytes::from_static(PNG_BYTES),
    }
}
