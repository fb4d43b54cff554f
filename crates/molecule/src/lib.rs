//! Molecule, a small async web framework.
//!
//! An [`Application`] turns a [`Request`] into a [`Response`]. [`Middleware`]s wrap
//! applications to add behavior around them, and a [`MiddlewareStack`] assembles them in
//! declaration order around the application that ends the chain. Requests are dispatched
//! with the [`routing::Router`], and per-client state is kept in [`session`]s.
//!
//! Serving applications over the network is the job of the `molecule-server` crate.

mod application;
mod body;
mod clock;
mod error;
mod request;
mod response;
mod stack;

pub mod http;
pub mod middleware;
pub mod middlewares;
pub mod routing;
pub mod session;

pub use application::{Application, DeferredApplication, DynApplication, FnApplication, app_fn, deferred_fn};
pub use body::Body;
pub use clock::{Clock, SystemClock};
pub use error::{BoxError, Error};
pub use middleware::{Middleware, MiddlewareExt};
pub use request::Request;
pub use response::Response;
pub use stack::MiddlewareStack;
