use time::OffsetDateTime;

use crate::domain::entities::PostRecord;

pub(crate) const POST_COLUMNS: &str = "p.id, p.user_id, p.category_id, p.title, p.slug, \
     p.content, p.excerpt, p.image, p.created_at, p.updated_at";

#[derive(sqlx::FromRow)]
pub(crate) struct PostRow {
    pub(crate) id: i64,
    pub(crate) user_id: i64,
    pub(crate) category_id: i64,
    pub(crate) title: String,
    pub(crate) slug: String,
    pub(crate) content: Option<String>,
    pub(crate) excerpt: Option<String>,
    pub(crate) image: Option<String>,
    pub(crate) created_at: OffsetDateTime,
    pub(crate) updated_at: OffsetDateTime,
}

impl From<PostRow> for PostRecord {
    fn from(row: PostRow) -> Self {
        Self {
            id: row.id,
            user_id: row.user_id,
            category_id: row.category_id,
            title: row.title,
            slug: row.slug,
            content: row.content,
            excerpt: row.excerpt,
            image: row.image,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}
