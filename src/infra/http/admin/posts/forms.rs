//! Multipart post form parsing.

use axum_extra::extract::Multipart;
use serde::Deserialize;

use crate::domain::posts::{ImageUpload, PostInput, blank_to_none};

use super::super::errors::AdminApiError;

#[derive(Debug, Default, Deserialize)]
pub(in crate::infra::http::admin) struct ListQuery {
    pub(in crate::infra::http::admin) cursor: Option<String>,
    pub(in crate::infra::http::admin) limit: Option<u32>,
}

#[derive(Debug, Default, Deserialize)]
pub(in crate::infra::http::admin) struct SlugQuery {
    #[serde(default)]
    pub(in crate::infra::http::admin) title: String,
    pub(in crate::infra::http::admin) ignore: Option<String>,
}

impl SlugQuery {
    /// Id of the post being edited, if any; blank means none.
    pub(in crate::infra::http::admin) fn ignore_id(&self) -> Result<Option<i64>, AdminApiError> {
        match blank_to_none(self.ignore.clone()) {
            None => Ok(None),
            Some(raw) => raw.parse().map(Some).map_err(|_| {
                AdminApiError::bad_request("Invalid post id", Some(format!("ignore={raw}")))
            }),
        }
    }
}

/// Read the post form fields. Unknown fields (`_token`, `_method`, …) are
/// skipped and blank values count as absent.
pub(super) async fn read_post_form(multipart: &mut Multipart) -> Result<PostInput, AdminApiError> {
    let mut input = PostInput::default();

    while let Some(field) = multipart.next_field().await? {
        let Some(name) = field.name().map(str::to_string) else {
            continue;
        };

        match name.as_str() {
            "title" => input.title = blank_to_none(Some(field.text().await?)),
            "slug" => input.slug = blank_to_none(Some(field.text().await?)),
            "category_id" => input.category_id = blank_to_none(Some(field.text().await?)),
            "content" => input.content = blank_to_none(Some(field.text().await?)),
            "excerpt" => input.excerpt = blank_to_none(Some(field.text().await?)),
            "tags" | "tags[]" => {
                if let Some(tag) = blank_to_none(Some(field.text().await?)) {
                    input.tags.push(tag);
                }
            }
            "image" => {
                let file_name = field
                    .file_name()
                    .map(|value| value.trim().to_string())
                    .filter(|value| !value.is_empty());
                let content_type = field.content_type().map(|mime| mime.to_string());
                let data = field.bytes().await?;

                // an unselected file input still arrives as an empty part
                if file_name.is_none() && data.is_empty() {
                    continue;
                }

                input.image = Some(ImageUpload {
                    file_name: file_name.unwrap_or_else(|| "image".to_string()),
                    content_type,
                    data,
                });
            }
            _ => {}
        }
    }

    Ok(input)
}
