use crate::application::repos::RepoError;

pub fn map_sqlx_error(err: sqlx::Error) -> RepoError {
    match err {
        sqlx::Error::RowNotFound => RepoError::NotFound,
        sqlx::Error::Database(db) if db.message().contains("duplicate key") => {
            RepoError::Duplicate {
                constraint: db.constraint().unwrap_or("unknown").to_string(),
            }
        }
        sqlx::Error::Database(db) if db.is_foreign_key_violation() => RepoError::ForeignKey {
            constraint: db.constraint().unwrap_or("unknown").to_string(),
        },
        sqlx::Error::Database(db) if db.message().contains("invalid input syntax") => {
            RepoError::InvalidInput {
                message: db.message().to_string(),
            }
        }
        sqlx::Error::Database(db) if db.message().contains("violates") => RepoError::Integrity {
            message: db.message().to_string(),
        },
        sqlx::Error::Database(db)
            if db
                .message()
                .contains("canceling statement due to user request") =>
        {
            RepoError::Timeout
        }
        sqlx::Error::PoolTimedOut => RepoError::Timeout,
        other => RepoError::from_persistence(other),
    }
}

#[cfg(test)]
mod tests {
    use sqlx::error::{DatabaseError, ErrorKind};

    use super::*;

    #[test]
    fn row_not_found_maps_to_not_found() {
        assert!(matches!(
            map_sqlx_error(sqlx::Error::RowNotFound),
            RepoError::NotFound
        ));
    }

    #[test]
    fn pool_timeout_maps_to_timeout() {
        assert!(matches!(
            map_sqlx_error(sqlx::Error::PoolTimedOut),
            RepoError::Timeout
        ));
    }

    #[derive(Debug, thiserror::Error)]
    #[error("{message}")]
    struct PgFailure {
        message: String,
        constraint: Option<&'static str>,
        kind: fn() -> ErrorKind,
    }

    impl DatabaseError for PgFailure {
        fn message(&self) -> &str {
            &self.message
        }

        fn as_error(&self) -> &(dyn std::error::Error + Send + Sync + 'static) {
            self
        }

        fn as_error_mut(&mut self) -> &mut (dyn std::error::Error + Send + Sync + 'static) {
            self
        }

        fn into_error(self: Box<Self>) -> Box<dyn std::error::Error + Send + Sync + 'static> {
            self
        }

        fn constraint(&self) -> Option<&str> {
            self.constraint
        }

        fn kind(&self) -> ErrorKind {
            (self.kind)()
        }
    }

    fn database(
        message: &str,
        constraint: Option<&'static str>,
        kind: fn() -> ErrorKind,
    ) -> sqlx::Error {
        sqlx::Error::Database(Box::new(PgFailure {
            message: message.to_string(),
            constraint,
            kind,
        }))
    }

    #[test]
    fn foreign_key_violation_keeps_constraint_name() {
        let err = map_sqlx_error(database(
            "insert or update on table \"post_tag\" violates foreign key constraint \"post_tag_tag_id_fkey\"",
            Some("post_tag_tag_id_fkey"),
            || ErrorKind::ForeignKeyViolation,
        ));

        match err {
            RepoError::ForeignKey { constraint } => assert_eq!(constraint, "post_tag_tag_id_fkey"),
            other => panic!("expected foreign key error, got {other:?}"),
        }
    }

    #[test]
    fn duplicate_key_keeps_constraint_name() {
        let err = map_sqlx_error(database(
            "duplicate key value violates unique constraint \"posts_slug_key\"",
            Some("posts_slug_key"),
            || ErrorKind::UniqueViolation,
        ));

        assert!(matches!(err, RepoError::Duplicate { constraint } if constraint == "posts_slug_key"));
    }

    #[test]
    fn check_violation_is_an_integrity_error() {
        let err = map_sqlx_error(database(
            "new row for relation \"posts\" violates check constraint \"posts_image_or_content\"",
            Some("posts_image_or_content"),
            || ErrorKind::CheckViolation,
        ));

        assert!(matches!(err, RepoError::Integrity { .. }));
    }

    #[test]
    fn other_errors_become_persistence_failures() {
        let err = map_sqlx_error(sqlx::Error::PoolClosed);
        assert!(matches!(err, RepoError::Persistence(_)));
    }
}
