use crate::application::pagination::{CursorPage, PageRequest, PostCursor};
use crate::application::repos::PostListScope;
use crate::domain::entities::{PostRecord, UserId};
use crate::domain::slug::{SlugAsyncError, generate_unique_slug_async};

use super::service::AdminPostService;
use super::types::{AdminPostError, PostDetail, PostEditForm, PostFormOptions};

impl AdminPostService {
    pub async fn list(
        &self,
        page: PageRequest<PostCursor>,
    ) -> Result<CursorPage<PostRecord>, AdminPostError> {
        self.reader
            .list_posts(PostListScope::All, page)
            .await
            .map_err(AdminPostError::from)
    }

    pub async fn list_for_owner(
        &self,
        actor: UserId,
        page: PageRequest<PostCursor>,
    ) -> Result<CursorPage<PostRecord>, AdminPostError> {
        self.reader
            .list_posts(PostListScope::Owner(actor), page)
            .await
            .map_err(AdminPostError::from)
    }

    pub async fn form_options(&self) -> Result<PostFormOptions, AdminPostError> {
        let (categories, tags) =
            tokio::try_join!(self.categories.list_categories(), self.tags.list_tags())?;
        Ok(PostFormOptions { categories, tags })
    }

    pub async fn load_post(&self, id: i64) -> Result<PostRecord, AdminPostError> {
        self.reader
            .find_by_id(id)
            .await?
            .ok_or(AdminPostError::NotFound)
    }

    /// Load a post and make sure `actor` owns it.
    pub async fn load_owned(&self, actor: UserId, id: i64) -> Result<PostRecord, AdminPostError> {
        let post = self.load_post(id).await?;
        if !post.is_owned_by(actor) {
            tracing::warn!(
                target = "postdesk::admin::posts",
                actor,
                post_id = id,
                owner = post.user_id,
                "Rejected access to post owned by another user"
            );
            return Err(AdminPostError::Forbidden { actor, post_id: id });
        }
        Ok(post)
    }

    pub async fn load_detail(&self, id: i64) -> Result<PostDetail, AdminPostError> {
        let post = self.load_post(id).await?;
        let (category, tags) = tokio::try_join!(
            self.categories.find_category(post.category_id),
            self.tags.list_tags_for_post(post.id)
        )?;
        Ok(PostDetail {
            post,
            category,
            tags,
        })
    }

    pub async fn edit_form(&self, actor: UserId, id: i64) -> Result<PostEditForm, AdminPostError> {
        let post = self.load_owned(actor, id).await?;
        let selected = async {
            self.tags
                .list_tags_for_post(post.id)
                .await
                .map_err(AdminPostError::from)
        };
        let (selected, options) = tokio::try_join!(selected, self.form_options())?;

        Ok(PostEditForm {
            post,
            tag_ids: selected.into_iter().map(|tag| tag.id).collect(),
            categories: options.categories,
            tags: options.tags,
        })
    }

    /// Suggest a free slug for `title`; a post whose id equals `ignore` does
    /// not count as a collision (used while editing that post).
    pub async fn preview_slug(
        &self,
        title: &str,
        ignore: Option<i64>,
    ) -> Result<String, AdminPostError> {
        let reader = self.reader.clone();
        let result = generate_unique_slug_async(title, move |candidate| {
            let reader = reader.clone();
            let candidate = candidate.to_string();
            async move {
                reader
                    .find_by_slug(&candidate)
                    .await
                    .map(|existing| existing.is_none_or(|post| Some(post.id) == ignore))
            }
        })
        .await;

        match result {
            Ok(slug) => Ok(slug),
            Err(SlugAsyncError::Slug(err)) => Err(AdminPostError::Slug(err)),
            Err(SlugAsyncError::Predicate(err)) => Err(AdminPostError::Repo(err)),
        }
    }
}
