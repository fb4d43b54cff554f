use crate::error::ServerError;
use async_trait::async_trait;
use molecule::DynApplication;
use std::net::SocketAddr;

/// An engine serving an application over HTTP.
#[async_trait]
pub trait Server: Send + Sync {
    /// Starts serving `app` and returns once the server listens.
    async fn run(&mut self, app: DynApplication) -> Result<(), ServerError>;

    /// Stops accepting connections and waits for in-flight requests to complete.
    async fn shutdown(&mut self) -> Result<(), ServerError>;

    /// The address the server listens on, once running.
    fn local_addr(&self) -> Option<SocketAddr>;
}
