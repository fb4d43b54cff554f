use crate::application::DynApplication;
use crate::middleware::{IdentityMiddleware, Middleware};

/// Two middlewares chained together: requests go through `first`, then through `second`.
#[derive(Debug, Clone)]
pub struct MiddlewareComposer<M1, M2> {
    first: M1,
    second: M2,
}

impl<M1, M2> MiddlewareComposer<M1, M2> {
    pub fn new(first: M1, second: M2) -> Self {
        Self { first, second }
    }
}

impl Default for MiddlewareComposer<IdentityMiddleware, IdentityMiddleware> {
    fn default() -> Self {
        Self::new(IdentityMiddleware, IdentityMiddleware)
    }
}

impl<M1, M2> Middleware for MiddlewareComposer<M1, M2>
where
    M1: Middleware,
    M2: Middleware,
{
    fn then(&self, next: DynApplication) -> DynApplication {
        let inner = self.second.then(next);
        self.first.then(inner)
    }
}
