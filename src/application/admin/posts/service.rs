use std::sync::Arc;

use crate::application::repos::{CategoriesRepo, PostsRepo, PostsWriteRepo, TagsRepo};
use crate::infra::uploads::UploadStorage;

#[derive(Clone)]
pub struct AdminPostService {
    pub(crate) reader: Arc<dyn PostsRepo>,
    pub(crate) writer: Arc<dyn PostsWriteRepo>,
    pub(crate) categories: Arc<dyn CategoriesRepo>,
    pub(crate) tags: Arc<dyn TagsRepo>,
    pub(crate) uploads: Arc<UploadStorage>,
}

impl AdminPostService {
    pub fn new(
        reader: Arc<dyn PostsRepo>,
        writer: Arc<dyn PostsWriteRepo>,
        categories: Arc<dyn CategoriesRepo>,
        tags: Arc<dyn TagsRepo>,
        uploads: Arc<UploadStorage>,
    ) -> Self {
        Self {
            reader,
            writer,
            categories,
            tags,
            uploads,
        }
    }
}
