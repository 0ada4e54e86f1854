use async_trait::async_trait;
use sqlx::QueryBuilder;

use crate::application::pagination::{CursorPage, PageRequest, PostCursor};
use crate::application::repos::{PostListScope, PostsRepo, RepoError};
use crate::domain::entities::PostRecord;

use super::types::{POST_COLUMNS, PostRow};
use crate::infra::db::{PostgresRepositories, map_sqlx_error};

#[async_trait]
impl PostsRepo for PostgresRepositories {
    async fn list_posts(
        &self,
        scope: PostListScope,
        page: PageRequest<PostCursor>,
    ) -> Result<CursorPage<PostRecord>, RepoError> {
        let limit = i64::from(page.limit);

        let mut qb = QueryBuilder::new("SELECT ");
        qb.push(POST_COLUMNS);
        qb.push(" FROM posts p WHERE 1=1 ");

        if let PostListScope::Owner(user_id) = scope {
            qb.push(" AND p.user_id = ");
            qb.push_bind(user_id);
        }

        if let Some(cursor) = page.cursor {
            qb.push(" AND (p.created_at, p.id) < (");
            qb.push_bind(cursor.created_at());
            qb.push(", ");
            qb.push_bind(cursor.id());
            qb.push(")");
        }

        qb.push(" ORDER BY p.created_at DESC, p.id DESC LIMIT ");
        qb.push_bind(limit + 1);

        let mut rows = qb
            .build_query_as::<PostRow>()
            .fetch_all(self.pool())
            .await
            .map_err(map_sqlx_error)?;

        let has_more = (rows.len() as i64) > limit;
        if has_more {
            rows.pop();
        }

        let next_cursor = if has_more {
            rows.last()
                .map(|last| PostCursor::new(last.created_at, last.id).encode())
        } else {
            None
        };

        let records = rows.into_iter().map(PostRecord::from).collect();
        Ok(CursorPage::new(records, next_cursor))
    }

    async fn find_by_id(&self, id: i64) -> Result<Option<PostRecord>, RepoError> {
        let sql = format!("SELECT {POST_COLUMNS} FROM posts p WHERE p.id = $1");
        let row = sqlx::query_as::<_, PostRow>(&sql)
            .bind(id)
            .fetch_optional(self.pool())
            .await
            .map_err(map_sqlx_error)?;

        Ok(row.map(PostRecord::from))
    }

    async fn find_by_slug(&self, slug: &str) -> Result<Option<PostRecord>, RepoError> {
        let sql = format!("SELECT {POST_COLUMNS} FROM posts p WHERE p.slug = $1");
        let row = sqlx::query_as::<_, PostRow>(&sql)
            .bind(slug)
            .fetch_optional(self.pool())
            .await
            .map_err(map_sqlx_error)?;

        Ok(row.map(PostRecord::from))
    }
}
