use std::sync::Arc;

use axum::http::HeaderName;

use crate::application::admin::posts::AdminPostService;
use crate::infra::db::PostgresRepositories;

#[derive(Clone)]
pub struct AdminState {
    pub db: Arc<PostgresRepositories>,
    pub posts: Arc<AdminPostService>,
    /// Header set by the upstream auth layer with the acting user's id.
    pub user_header: HeaderName,
    pub page_size: u32,
    pub upload_limit_bytes: usize,
}
