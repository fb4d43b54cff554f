use crate::application::DynApplication;
use crate::middleware::Middleware;

#[derive(Debug, Copy, Clone)]
pub struct MiddlewareFn<F> {
    f: F,
}

/// Creates a middleware from a closure that wires an application in front of its successor.
pub fn middleware_fn<F>(f: F) -> MiddlewareFn<F>
where
    F: Fn(DynApplication) -> DynApplication + Send + Sync,
{
    MiddlewareFn { f }
}

impl<F> Middleware for MiddlewareFn<F>
where
    F: Fn(DynApplication) -> DynApplication + Send + Sync,
{
    fn then(&self, next: DynApplication) -> DynApplication {
        (self.f)(next)
    }
}
