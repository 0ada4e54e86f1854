use axum::Json;
use axum::extract::rejection::QueryRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum_extra::extract::multipart::{MultipartError, MultipartRejection};
use serde::Serialize;

use crate::application::admin::posts::AdminPostError;
use crate::application::error::ErrorReport;
use crate::application::repos::RepoError;
use crate::domain::slug::SlugError;
use crate::domain::validation::FieldErrors;

const SOURCE: &str = "infra::http::admin";

pub mod codes {
    pub const BAD_REQUEST: &str = "bad_request";
    pub const UNAUTHORIZED: &str = "unauthorized";
    pub const FORBIDDEN: &str = "forbidden";
    pub const NOT_FOUND: &str = "not_found";
    pub const PAYLOAD_TOO_LARGE: &str = "payload_too_large";
    pub const VALIDATION_FAILED: &str = "validation_failed";
    pub const INVALID_CURSOR: &str = "invalid_cursor";
    pub const DB_TIMEOUT: &str = "db_timeout";
    pub const REPO: &str = "repo_error";
    pub const STORAGE: &str = "storage_error";
}

#[derive(Debug, Serialize)]
pub struct AdminErrorBody {
    pub error: AdminErrorMessage,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fields: Option<FieldErrors>,
}

#[derive(Debug, Serialize)]
pub struct AdminErrorMessage {
    pub code: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hint: Option<String>,
}

/// JSON error response for the admin surface. The diagnostic report is kept
/// off the wire and handed to the response logger.
#[derive(Debug)]
pub struct AdminApiError {
    status: StatusCode,
    code: &'static str,
    message: &'static str,
    hint: Option<String>,
    fields: Option<FieldErrors>,
    report: ErrorReport,
}

impl AdminApiError {
    pub fn new(
        status: StatusCode,
        code: &'static str,
        message: &'static str,
        hint: Option<String>,
    ) -> Self {
        let detail = format!("{code}: {}", hint.as_deref().unwrap_or(message));
        Self {
            status,
            code,
            message,
            hint,
            fields: None,
            report: ErrorReport::from_message(SOURCE, status, detail),
        }
    }

    fn internal(
        status: StatusCode,
        code: &'static str,
        message: &'static str,
        error: &dyn std::error::Error,
    ) -> Self {
        Self {
            status,
            code,
            message,
            hint: None,
            fields: None,
            report: ErrorReport::from_error(SOURCE, status, error),
        }
    }

    pub fn bad_request(message: &'static str, hint: Option<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, codes::BAD_REQUEST, message, hint)
    }

    pub fn unauthorized(hint: impl Into<String>) -> Self {
        Self::new(
            StatusCode::UNAUTHORIZED,
            codes::UNAUTHORIZED,
            "Authentication required",
            Some(hint.into()),
        )
    }

    pub fn not_found(message: &'static str) -> Self {
        Self::new(StatusCode::NOT_FOUND, codes::NOT_FOUND, message, None)
    }

    pub fn validation(fields: FieldErrors) -> Self {
        let mut error = Self::new(
            StatusCode::UNPROCESSABLE_ENTITY,
            codes::VALIDATION_FAILED,
            "The given data was invalid",
            None,
        );
        error.report = ErrorReport::from_message(
            SOURCE,
            StatusCode::UNPROCESSABLE_ENTITY,
            fields.to_string(),
        );
        error.fields = Some(fields);
        error
    }

    #[cfg(test)]
    fn status(&self) -> StatusCode {
        self.status
    }
}

impl IntoResponse for AdminApiError {
    fn into_response(self) -> Response {
        let body = AdminErrorBody {
            error: AdminErrorMessage {
                code: self.code.to_string(),
                message: self.message.to_string(),
                hint: self.hint,
            },
            fields: self.fields,
        };
        let mut response = (self.status, Json(body)).into_response();
        self.report.attach(&mut response);
        response
    }
}

impl From<AdminPostError> for AdminApiError {
    fn from(error: AdminPostError) -> Self {
        match error {
            AdminPostError::Validation(fields) => Self::validation(fields),
            AdminPostError::NotFound => Self::not_found("Post not found"),
            AdminPostError::Forbidden { actor, post_id } => Self::new(
                StatusCode::FORBIDDEN,
                codes::FORBIDDEN,
                "You are not allowed to modify this post",
                Some(format!("user {actor} does not own post {post_id}")),
            ),
            AdminPostError::UnknownActor { actor } => {
                Self::unauthorized(format!("user {actor} has no account"))
            }
            AdminPostError::Slug(err) => slug_error(&err),
            AdminPostError::Storage(err) => Self::internal(
                StatusCode::INTERNAL_SERVER_ERROR,
                codes::STORAGE,
                "Could not store the uploaded image",
                &err,
            ),
            AdminPostError::Repo(err) => repo_error(err),
        }
    }
}

fn slug_error(err: &SlugError) -> AdminApiError {
    let mut fields = FieldErrors::new();
    fields.add("title", slug_error_message(err));
    AdminApiError::validation(fields)
}

/// Message shown to form users when no slug can be derived.
pub fn slug_error_message(err: &SlugError) -> &'static str {
    match err {
        SlugError::EmptyInput => "The title field is required.",
        SlugError::Unrepresentable { .. } => "The title must contain letters or numbers.",
        SlugError::Exhausted { .. } => "Too many posts already use a slug derived from this title.",
    }
}

fn repo_error(err: RepoError) -> AdminApiError {
    match err {
        RepoError::Pagination(p) => AdminApiError::new(
            StatusCode::BAD_REQUEST,
            codes::INVALID_CURSOR,
            "Invalid cursor",
            Some(p.to_string()),
        ),
        RepoError::NotFound => AdminApiError::not_found("Resource not found"),
        RepoError::Timeout => AdminApiError::internal(
            StatusCode::SERVICE_UNAVAILABLE,
            codes::DB_TIMEOUT,
            "Database timeout",
            &RepoError::Timeout,
        ),
        other => AdminApiError::internal(
            StatusCode::INTERNAL_SERVER_ERROR,
            codes::REPO,
            "Internal server error",
            &other,
        ),
    }
}

impl From<MultipartRejection> for AdminApiError {
    fn from(rejection: MultipartRejection) -> Self {
        Self::bad_request("Expected a multipart form", Some(rejection.to_string()))
    }
}

impl From<MultipartError> for AdminApiError {
    fn from(err: MultipartError) -> Self {
        match err.status() {
            StatusCode::PAYLOAD_TOO_LARGE => Self::new(
                StatusCode::PAYLOAD_TOO_LARGE,
                codes::PAYLOAD_TOO_LARGE,
                "Request body is too large",
                Some(err.to_string()),
            ),
            _ => Self::bad_request("Malformed multipart form", Some(err.to_string())),
        }
    }
}

impl From<QueryRejection> for AdminApiError {
    fn from(rejection: QueryRejection) -> Self {
        Self::bad_request("Invalid query string", Some(rejection.body_text()))
    }
}
