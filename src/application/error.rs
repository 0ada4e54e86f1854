use std::error::Error as StdError;

use axum::{http::StatusCode, response::Response};
use thiserror::Error;

use crate::{config::LoadError, infra::error::InfraError};

/// Diagnostic chain attached to error responses for the response logger.
#[derive(Debug, Clone)]
pub struct ErrorReport {
    pub source: &'static str,
    pub status: StatusCode,
    pub messages: Vec<String>,
}

impl ErrorReport {
    pub fn from_error(source: &'static str, status: StatusCode, error: &dyn StdError) -> Self {
        let mut messages = Vec::new();
        messages.push(error.to_string());
        let mut current = error.source();
        while let Some(inner) = current {
            messages.push(inner.to_string());
            current = inner.source();
        }
        Self {
            source,
            status,
            messages,
        }
    }

    pub fn from_message(
        source: &'static str,
        status: StatusCode,
        message: impl Into<String>,
    ) -> Self {
        Self {
            source,
            status,
            messages: vec![message.into()],
        }
    }

    pub fn attach(self, response: &mut Response) {
        response.extensions_mut().insert(self);
    }
}

#[derive(Debug, Error)]
pub enum AppError {
    #[error(transparent)]
    Config(#[from] LoadError),
    #[error(transparent)]
    Infra(#[from] InfraError),
    #[error("unexpected error: {0}")]
    Unexpected(String),
}

impl AppError {
    pub fn unexpected(message: impl Into<String>) -> Self {
        Self::Unexpected(message.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn report_collects_the_source_chain() {
        let err = AppError::from(InfraError::UploadRoot {
            root: "/srv/postdesk".into(),
            source: std::io::Error::other("disk unplugged"),
        });
        let report = ErrorReport::from_error("test", StatusCode::INTERNAL_SERVER_ERROR, &err);

        assert_eq!(
            report.messages,
            [
                "upload directory `/srv/postdesk` is not usable".to_string(),
                "disk unplugged".to_string(),
            ]
        );
    }

    #[test]
    fn message_reports_carry_a_single_entry() {
        let report = ErrorReport::from_message("test", StatusCode::BAD_REQUEST, "bad cursor");
        assert_eq!(report.status, StatusCode::BAD_REQUEST);
        assert_eq!(report.messages, ["bad cursor".to_string()]);
    }
}
