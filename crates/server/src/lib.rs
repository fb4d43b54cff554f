//! Engines serving molecule applications.
//!
//! [`HyperServer`] runs connections as tokio tasks with hyper; [`SimpleServer`] hands requests
//! to a pool of blocking worker threads with tiny_http. [`WebServer`] puts a middleware stack
//! in front of the application and picks the engine from a [`ServerConfig`].

mod config;
mod error;
mod exchange;
mod hyper_server;
mod server;
mod simple_server;
mod web_server;

pub mod logging;

pub use config::{DEFAULT_HOST, DEFAULT_PORT, Engine, ServerConfig, ServerConfigBuilder};
pub use error::ServerError;
pub use hyper_server::HyperServer;
pub use server::Server;
pub use simple_server::SimpleServer;
pub use web_server::WebServer;
