use crate::error::ServerError;
use serde::Deserialize;
use std::net::{SocketAddr, ToSocketAddrs};

pub const DEFAULT_HOST: &str = "0.0.0.0";
pub const DEFAULT_PORT: u16 = 8080;

/// The engine serving requests.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Engine {
    /// Async connections on the tokio runtime, with hyper.
    #[default]
    Hyper,
    /// Blocking worker threads, with tiny_http.
    Simple,
}

/// How and where to serve.
///
/// # Example
/// ```
/// use molecule_server::{Engine, ServerConfig};
///
/// let config = ServerConfig::builder().host("127.0.0.1").port(0).engine(Engine::Simple).workers(4).build();
/// assert_eq!(config.workers, 4);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub engine: Engine,
    /// Worker threads of the simple engine.
    pub workers: usize,
    /// Serves HTTP/2 with prior knowledge instead of HTTP/1.1, hyper engine only.
    pub http2: bool,
    /// Value of the `Server` header added to responses.
    pub server_name: Option<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
            engine: Engine::default(),
            workers: std::thread::available_parallelism().map_or(4, usize::from),
            http2: false,
            server_name: None,
        }
    }
}

impl ServerConfig {
    pub fn builder() -> ServerConfigBuilder {
        ServerConfigBuilder::new()
    }

    pub fn from_json(json: &str) -> Result<Self, ServerError> {
        serde_json::from_str(json).map_err(ServerError::config)
    }

    /// The socket address to listen on, resolving the host name if needed.
    pub fn address(&self) -> Result<SocketAddr, ServerError> {
        (self.host.as_str(), self.port)
            .to_socket_addrs()
            .map_err(|e| ServerError::bind(format!("{}:{}", self.host, self.port), e))?
            .next()
            .ok_or_else(|| ServerError::config(format!("no address for host {}", self.host)))
    }
}

#[derive(Debug, Default)]
pub struct ServerConfigBuilder {
    config: ServerConfig,
}

impl ServerConfigBuilder {
    fn new() -> Self {
        Self::default()
    }

    pub fn host<S: Into<String>>(mut self, host: S) -> Self {
        self.config.host = host.into();
        self
    }

    pub fn port(mut self, port: u16) -> Self {
        self.config.port = port;
        self
    }

    pub fn engine(mut self, engine: Engine) -> Self {
        self.config.engine = engine;
        self
    }

    pub fn workers(mut self, workers: usize) -> Self {
        self.config.workers = workers.max(1);
        self
    }

    pub fn http2(mut self, enabled: bool) -> Self {
        self.config.http2 = enabled;
        self
    }

    pub fn server_name<S: Into<String>>(mut self, name: S) -> Self {
        self.config.server_name = Some(name.into());
        self
    }

    pub fn build(self) -> ServerConfig {
        self.config
    }
}
