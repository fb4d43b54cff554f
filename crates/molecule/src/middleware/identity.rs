use crate::application::DynApplication;
use crate::middleware::Middleware;

/// A middleware that does nothing: its successor is used as is.
#[derive(Debug, Default, Copy, Clone)]
pub struct IdentityMiddleware;

impl Middleware for IdentityMiddleware {
    #[inline]
    fn then(&self, next: DynApplication) -> DynApplication {
        next
    }
}
