//! HTTP header helpers: structured header parsing, content negotiation, cookies and dates.

mod accept_encoding;
mod accept_language;
mod authorization;
mod content_type;
mod cookie;
mod host;

pub mod cookie_decoder;
pub mod header;
pub mod http_date;
pub mod mime_types;

pub use accept_encoding::AcceptEncoding;
pub use accept_language::{AcceptLanguage, Locale};
pub use authorization::{Authorization, BasicCredentials};
pub use content_type::ContentType;
pub use cookie::Cookie;
pub use header::Header;
pub use host::Host;
pub use mime_types::MimeTypes;
