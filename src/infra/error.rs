//! Failures while wiring the process together at startup.

use std::net::SocketAddr;
use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum InfraError {
    #[error("database url is not configured")]
    MissingDatabaseUrl,
    #[error("could not connect to the database")]
    Connect(#[source] sqlx::Error),
    #[error("could not apply database migrations")]
    Migrate(#[source] sqlx::Error),
    #[error("upload directory `{}` is not usable", root.display())]
    UploadRoot {
        root: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("could not listen on {addr}")]
    Bind {
        addr: SocketAddr,
        #[source]
        source: std::io::Error,
    },
    #[error("setting `{key}` is out of range: {message}")]
    Setting { key: &'static str, message: String },
    #[error("failed to install tracing subscriber: {0}")]
    Telemetry(String),
}

impl InfraError {
    pub fn setting(key: &'static str, message: impl Into<String>) -> Self {
        Self::Setting {
            key,
            message: message.into(),
        }
    }
}
