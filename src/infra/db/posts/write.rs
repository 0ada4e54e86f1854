use async_trait::async_trait;
use sqlx::{Postgres, Transaction};

use crate::application::repos::{CreatePostParams, PostsWriteRepo, RepoError, UpdatePostParams};
use crate::domain::entities::PostRecord;

use super::types::PostRow;
use crate::infra::db::{PostgresRepositories, map_sqlx_error};

const RETURNING_COLUMNS: &str = "id, user_id, category_id, title, slug, content, excerpt, image, \
     created_at, updated_at";

#[async_trait]
impl PostsWriteRepo for PostgresRepositories {
    async fn create_post(&self, params: CreatePostParams) -> Result<PostRecord, RepoError> {
        let mut tx = self.begin().await.map_err(map_sqlx_error)?;

        let sql = format!(
            "INSERT INTO posts (user_id, category_id, title, slug, content, excerpt, image) \
             VALUES ($1, $2, $3, $4, $5, $6, $7) \
             RETURNING {RETURNING_COLUMNS}"
        );

        let row = sqlx::query_as::<_, PostRow>(&sql)
            .bind(params.user_id)
            .bind(params.category_id)
            .bind(params.title)
            .bind(params.slug)
            .bind(params.content)
            .bind(params.excerpt)
            .bind(params.image)
            .fetch_one(tx.as_mut())
            .await
            .map_err(map_sqlx_error)?;

        Self::replace_post_tags(&mut tx, row.id, &params.tag_ids).await?;

        tx.commit().await.map_err(map_sqlx_error)?;

        Ok(PostRecord::from(row))
    }

    async fn update_post(&self, params: UpdatePostParams) -> Result<PostRecord, RepoError> {
        let mut tx = self.begin().await.map_err(map_sqlx_error)?;

        let sql = format!(
            "UPDATE posts \
             SET category_id = $2, title = $3, slug = $4, content = $5, excerpt = $6, \
                 image = $7, updated_at = now() \
             WHERE id = $1 \
             RETURNING {RETURNING_COLUMNS}"
        );

        let row = sqlx::query_as::<_, PostRow>(&sql)
            .bind(params.id)
            .bind(params.category_id)
            .bind(params.title)
            .bind(params.slug)
            .bind(params.content)
            .bind(params.excerpt)
            .bind(params.image)
            .fetch_one(tx.as_mut())
            .await
            .map_err(map_sqlx_error)?;

        Self::replace_post_tags(&mut tx, row.id, &params.tag_ids).await?;

        tx.commit().await.map_err(map_sqlx_error)?;

        Ok(PostRecord::from(row))
    }

    async fn delete_post(&self, id: i64) -> Result<(), RepoError> {
        let mut tx = self.begin().await.map_err(map_sqlx_error)?;

        sqlx::query("DELETE FROM post_tag WHERE post_id = $1")
            .bind(id)
            .execute(tx.as_mut())
            .await
            .map_err(map_sqlx_error)?;

        let result = sqlx::query("DELETE FROM posts WHERE id = $1")
            .bind(id)
            .execute(tx.as_mut())
            .await
            .map_err(map_sqlx_error)?;

        if result.rows_affected() == 0 {
            return Err(RepoError::NotFound);
        }

        tx.commit().await.map_err(map_sqlx_error)?;

        Ok(())
    }
}

impl PostgresRepositories {
    /// Swap the post's tag set inside the caller's transaction. An unknown
    /// tag id fails on `post_tag_tag_id_fkey` and the caller's post write
    /// rolls back with it.
    async fn replace_post_tags(
        tx: &mut Transaction<'_, Postgres>,
        post_id: i64,
        tag_ids: &[i64],
    ) -> Result<(), RepoError> {
        sqlx::query("DELETE FROM post_tag WHERE post_id = $1")
            .bind(post_id)
            .execute(tx.as_mut())
            .await
            .map_err(map_sqlx_error)?;

        if tag_ids.is_empty() {
            return Ok(());
        }

        sqlx::query(
            "INSERT INTO post_tag (post_id, tag_id) \
             SELECT $1, id FROM UNNEST($2::bigint[]) AS id \
             ON CONFLICT DO NOTHING",
        )
        .bind(post_id)
        .bind(tag_ids)
        .execute(tx.as_mut())
        .await
        .map_err(map_sqlx_error)?;

        Ok(())
    }
}
