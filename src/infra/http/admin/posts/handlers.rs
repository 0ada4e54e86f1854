use axum::{
    Json,
    extract::{Path, Query, State, rejection::QueryRejection},
    http::{StatusCode, header::LOCATION},
    response::{IntoResponse, Response},
};
use axum_extra::extract::{Multipart, multipart::MultipartRejection};
use serde::Serialize;

use crate::application::admin::posts::{AdminPostError, PostDetail, PostEditForm, PostFormOptions};
use crate::application::error::ErrorReport;
use crate::application::pagination::{CursorPage, PageRequest, PostCursor};
use crate::domain::entities::PostRecord;

use super::super::AdminState;
use super::super::auth::AdminUser;
use super::super::errors::{AdminApiError, codes, slug_error_message};
use super::forms::{ListQuery, SlugQuery, read_post_form};

const SOURCE: &str = "infra::http::admin::posts";

#[derive(Debug, Serialize)]
struct DeletedPost {
    id: i64,
    title: String,
}

#[derive(Debug, Serialize)]
struct DeleteResponse {
    deleted: DeletedPost,
    message: String,
}

#[derive(Debug, Serialize)]
struct SlugResponse {
    success: bool,
    response: String,
}

pub(in crate::infra::http::admin) async fn admin_posts(
    State(state): State<AdminState>,
    AdminUser(_actor): AdminUser,
    query: Result<Query<ListQuery>, QueryRejection>,
) -> Result<Json<CursorPage<PostRecord>>, AdminApiError> {
    let Query(query) = query?;
    let page = page_request(&state, query)?;
    Ok(Json(state.posts.list(page).await?))
}

pub(in crate::infra::http::admin) async fn admin_posts_mine(
    State(state): State<AdminState>,
    AdminUser(actor): AdminUser,
    query: Result<Query<ListQuery>, QueryRejection>,
) -> Result<Json<CursorPage<PostRecord>>, AdminApiError> {
    let Query(query) = query?;
    let page = page_request(&state, query)?;
    Ok(Json(state.posts.list_for_owner(actor, page).await?))
}

pub(in crate::infra::http::admin) async fn admin_post_create_form(
    State(state): State<AdminState>,
    AdminUser(_actor): AdminUser,
) -> Result<Json<PostFormOptions>, AdminApiError> {
    Ok(Json(state.posts.form_options().await?))
}

pub(in crate::infra::http::admin) async fn admin_post_store(
    State(state): State<AdminState>,
    AdminUser(actor): AdminUser,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Response, AdminApiError> {
    let mut multipart = multipart?;
    let input = read_post_form(&mut multipart).await?;
    let post = state.posts.create_post(actor, input).await?;
    Ok(see_other(format!("/admin/posts/{}", post.id), Json(post)))
}

pub(in crate::infra::http::admin) async fn admin_post_show(
    State(state): State<AdminState>,
    AdminUser(_actor): AdminUser,
    Path(id): Path<String>,
) -> Result<Json<PostDetail>, AdminApiError> {
    let id = parse_post_id(&id)?;
    Ok(Json(state.posts.load_detail(id).await?))
}

pub(in crate::infra::http::admin) async fn admin_post_edit(
    State(state): State<AdminState>,
    AdminUser(actor): AdminUser,
    Path(id): Path<String>,
) -> Result<Json<PostEditForm>, AdminApiError> {
    let id = parse_post_id(&id)?;
    Ok(Json(state.posts.edit_form(actor, id).await?))
}

pub(in crate::infra::http::admin) async fn admin_post_update(
    State(state): State<AdminState>,
    AdminUser(actor): AdminUser,
    Path(id): Path<String>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Response, AdminApiError> {
    let id = parse_post_id(&id)?;
    let mut multipart = multipart?;
    let input = read_post_form(&mut multipart).await?;
    let post = state.posts.update_post(actor, id, input).await?;
    Ok(see_other(format!("/admin/posts/{}", post.id), Json(post)))
}

pub(in crate::infra::http::admin) async fn admin_post_delete(
    State(state): State<AdminState>,
    AdminUser(actor): AdminUser,
    Path(id): Path<String>,
) -> Result<Response, AdminApiError> {
    let id = parse_post_id(&id)?;
    let post = state.posts.delete_post(actor, id).await?;

    let query = url::form_urlencoded::Serializer::new(String::new())
        .append_pair("deleted", &post.title)
        .finish();
    let body = DeleteResponse {
        message: format!("The post \"{}\" has been deleted.", post.title),
        deleted: DeletedPost {
            id: post.id,
            title: post.title,
        },
    };

    Ok(see_other(format!("/admin/posts?{query}"), Json(body)))
}

pub(in crate::infra::http::admin) async fn admin_get_slug(
    State(state): State<AdminState>,
    AdminUser(_actor): AdminUser,
    query: Result<Query<SlugQuery>, QueryRejection>,
) -> Result<Response, AdminApiError> {
    let Query(query) = query?;
    let ignore = query.ignore_id()?;

    match state.posts.preview_slug(&query.title, ignore).await {
        Ok(slug) => Ok(Json(SlugResponse {
            success: true,
            response: slug,
        })
        .into_response()),
        Err(AdminPostError::Slug(err)) => {
            let status = StatusCode::UNPROCESSABLE_ENTITY;
            let body = SlugResponse {
                success: false,
                response: slug_error_message(&err).to_string(),
            };
            let mut response = (status, Json(body)).into_response();
            ErrorReport::from_error(SOURCE, status, &err).attach(&mut response);
            Ok(response)
        }
        Err(other) => Err(other.into()),
    }
}

fn page_request(
    state: &AdminState,
    query: ListQuery,
) -> Result<PageRequest<PostCursor>, AdminApiError> {
    let cursor = query
        .cursor
        .as_deref()
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(PostCursor::decode)
        .transpose()
        .map_err(|err| {
            AdminApiError::new(
                StatusCode::BAD_REQUEST,
                codes::INVALID_CURSOR,
                "Invalid cursor",
                Some(err.to_string()),
            )
        })?;

    Ok(PageRequest::new(
        query.limit.unwrap_or(state.page_size),
        cursor,
    ))
}

fn parse_post_id(raw: &str) -> Result<i64, AdminApiError> {
    raw.parse::<i64>()
        .map_err(|_| AdminApiError::not_found("Post not found"))
}

fn see_other(location: String, body: impl IntoResponse) -> Response {
    (StatusCode::SEE_OTHER, [(LOCATION, location)], body).into_response()
}
