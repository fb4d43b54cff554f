//! Sessions: per-client data kept between requests.
//!
//! A [`SessionStore`] keeps sessions either on the server, in a [`SessionPool`], or on the
//! client, in a [`CookieSessionStore`]. The
//! [`CookieSessionTracker`](crate::middlewares::CookieSessionTracker) middleware ties a
//! session to each request.

mod cookie_store;
mod data;
mod encoder;
mod house_keeping;
mod pool;
pub(crate) mod store;

pub use cookie_store::CookieSessionStore;
pub use data::Session;
pub use encoder::{SecureSessionEncoder, SessionEncoder};
pub use house_keeping::PeriodicSessionHouseKeeping;
pub use pool::{NoSessionEvents, SessionPool, SessionPoolListener};
pub use store::{SecureIdentifierPolicy, SessionIdentifierPolicy, SessionStore};

#[cfg(test)]
pub(crate) use store::MockSessionStore;
