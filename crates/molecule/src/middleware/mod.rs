//! Middlewares decorate an application with some extra behavior.
//!
//! A [`Middleware`] is given its successor and returns a new application that usually
//! forwards to it, possibly altering the request on the way in and the response on the
//! way out. It may also answer on its own and never call its successor.

mod middleware_composer;
mod middleware_fn;
mod identity;

pub use identity::IdentityMiddleware;
pub use middleware_composer::MiddlewareComposer;
pub use middleware_fn::{MiddlewareFn, middleware_fn};

use crate::application::DynApplication;
use std::sync::Arc;

pub trait Middleware: Send + Sync {
    /// Wires this middleware in front of `next`.
    fn then(&self, next: DynApplication) -> DynApplication;
}

pub trait MiddlewareExt: Middleware {
    /// Chains `middleware` after this one: requests go through `self` first.
    fn and_then<M>(self, middleware: M) -> MiddlewareComposer<Self, M>
    where
        Self: Sized,
    {
        MiddlewareComposer::new(self, middleware)
    }

    /// Chains `middleware` before this one: requests go through `middleware` first.
    fn compose<M>(self, middleware: M) -> MiddlewareComposer<M, Self>
    where
        Self: Sized,
    {
        MiddlewareComposer::new(middleware, self)
    }
}

impl<T: Middleware + ?Sized> MiddlewareExt for T {}

impl<M: Middleware + ?Sized> Middleware for Arc<M> {
    fn then(&self, next: DynApplication) -> DynApplication {
        (**self).then(next)
    }
}

impl<M: Middleware + ?Sized> Middleware for Box<M> {
    fn then(&self, next: DynApplication) -> DynApplication {
        (**self).then(next)
    }
}
