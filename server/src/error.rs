use std::{io, net::SocketAddr};

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ServerError {
    #[error("Failed to bind {addr}: {source}")]
    Bind {
        addr: SocketAddr,
        #[source]
        source: io::Error,
    },

    #[error("IO error: {0}")]
    Io(#[from] io::Error),
}

#[derive(Error, Debug)]
pub enum SessionError {
    #[error("HTTP connection failed: {0}")]
    Http(#[from] hyper::Error),

    #[error("Session panicked: {0}")]
    Panicked(String),
}

/// Error type of body frames handed to the service by hyper.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Failure of [`MockService`](crate::service::MockService) to produce a response.
#[derive(Error, Debug)]
pub enum ServiceError {
    #[error("Failed to read request body: {0}")]
    Body(#[source] BoxError),
}
