use std::io;
use std::net::SocketAddr;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ServerError {
    #[error("cannot bind {addr}: {source}")]
    Bind {
        addr: String,
        #[source]
        source: io::Error,
    },

    #[error("invalid server configuration: {reason}")]
    Config { reason: String },

    #[error("server engine failure: {reason}")]
    Engine { reason: String },

    #[error("server already running on {addr}")]
    AlreadyRunning { addr: SocketAddr },

    #[error("cannot set up logging: {reason}")]
    Logging { reason: String },

    #[error("application error: {source}")]
    Application {
        #[from]
        source: molecule::Error,
    },

    #[error("io error: {source}")]
    Io {
        #[from]
        source: io::Error,
    },
}

impl ServerError {
    pub fn bind<A: ToString>(addr: A, source: io::Error) -> Self {
        Self::Bind { addr: addr.to_string(), source }
    }

    pub fn config<S: ToString>(reason: S) -> Self {
        Self::Config { reason: reason.to_string() }
    }

    pub fn engine<S: ToString>(reason: S) -> Self {
        Self::Engine { reason: reason.to_string() }
    }

    pub fn logging<S: ToString>(reason: S) -> Self {
        Self::Logging { reason: reason.to_string() }
    }
}
