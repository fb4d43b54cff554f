use std::io;
use thiserror::Error;

pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

#[derive(Error, Debug)]
pub enum Error {
    #[error("{reason}")]
    Application {
        reason: String,
        #[source]
        source: Option<BoxError>,
    },

    #[error("http status {status}")]
    Status { status: http::StatusCode },

    #[error("session invalidated")]
    InvalidSession,

    #[error("codec error: {reason}")]
    Codec { reason: String },

    #[error("invalid header: {reason}")]
    InvalidHeader { reason: String },

    #[error("invalid body: {reason}")]
    InvalidBody { reason: String },

    #[error("nothing to run: no application and no mount point")]
    NotConfigured,

    #[error("io error: {source}")]
    Io {
        #[from]
        source: io::Error,
    },

    #[error("http error: {source}")]
    Http {
        #[from]
        source: http::Error,
    },
}

impl Error {
    pub fn app<S: ToString>(reason: S) -> Self {
        Self::Application { reason: reason.to_string(), source: None }
    }

    pub fn caused_by<S: ToString, E: Into<BoxError>>(reason: S, source: E) -> Self {
        Self::Application { reason: reason.to_string(), source: Some(source.into()) }
    }

    pub fn status(status: http::StatusCode) -> Self {
        Self::Status { status }
    }

    pub fn codec<S: ToString>(reason: S) -> Self {
        Self::Codec { reason: reason.to_string() }
    }

    pub fn invalid_header<S: ToString>(reason: S) -> Self {
        Self::InvalidHeader { reason: reason.to_string() }
    }

    pub fn invalid_body<S: ToString>(reason: S) -> Self {
        Self::InvalidBody { reason: reason.to_string() }
    }

    pub fn io<E: Into<io::Error>>(e: E) -> Self {
        Self::Io { source: e.into() }
    }
}

impl From<http::header::InvalidHeaderValue> for Error {
    fn from(e: http::header::InvalidHeaderValue) -> Self {
        Self::invalid_header(e)
    }
}

impl From<http::header::InvalidHeaderName> for Error {
    fn from(e: http::header::InvalidHeaderName) -> Self {
        Self::invalid_header(e)
    }
}
