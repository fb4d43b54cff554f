//! The middlewares shipped with molecule.
//!
//! Each middleware is a small configuration struct; wiring it with [`Middleware::then`]
//! produces the application that does the work.
//!
//! [`Middleware::then`]: crate::middleware::Middleware::then

mod apache_logger;
mod basic_authentication;
mod compressor;
mod conditional_get;
mod content_length_header;
mod cookie_session_tracker;
mod cookies;
mod date_header;
mod etag;
mod failsafe;
mod failure_monitor;
mod file_server;
mod filter_map;
mod flash;
mod force_ssl;
mod http_method_override;
mod locales;
mod not_found;
mod server_header;
mod static_assets;
mod url_map;

pub use apache_logger::{ApacheCombinedLogger, ApacheCommonLogger};
pub use basic_authentication::{Authenticator, BasicAuthentication, RemoteUser};
pub use compressor::Compressor;
pub use conditional_get::ConditionalGet;
pub use content_length_header::ContentLengthHeader;
pub use cookie_session_tracker::{CookieSessionTracker, DEFAULT_SESSION_COOKIE};
pub use cookies::{CookieJar, Cookies};
pub use date_header::DateHeader;
pub use etag::ETag;
pub use failsafe::Failsafe;
pub use failure_monitor::{FailureMonitor, FailureReporter, LogFailureReporter};
pub use file_server::FileServer;
pub use filter_map::FilterMap;
pub use flash::{Flash, FlashHash};
pub use force_ssl::ForceSsl;
pub use http_method_override::HttpMethodOverride;
pub use locales::Locales;
pub use not_found::NotFound;
pub use server_header::ServerHeader;
pub use static_assets::StaticAssets;
pub use url_map::{MountPoint, UrlMap};

#[cfg(test)]
pub(crate) use failure_monitor::MockFailureReporter;
