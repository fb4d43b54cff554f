use crate::application::{Application, DynApplication};
use crate::error::Error;
use crate::middleware::Middleware;
use crate::request::Request;
use crate::response::Response;
use crate::routing::filter::{Filter, with_path_prefix};
use async_trait::async_trait;
use std::fmt;
use std::sync::Arc;

/// Applies middlewares to the requests they are mapped to, and only to those.
///
/// When several mappings match a request, the last one registered wins. Unmatched requests go
/// straight to the next application.
#[derive(Clone, Default)]
pub struct FilterMap {
    mappings: Vec<(Arc<dyn Filter>, Arc<dyn Middleware>)>,
}

impl FilterMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Applies `middleware` to requests whose path starts with `prefix`.
    pub fn map<M: Middleware + 'static>(&mut self, prefix: &str, middleware: M) -> &mut Self {
        self.map_filter(with_path_prefix(prefix), middleware)
    }

    /// Applies `middleware` to requests matching `filter`.
    pub fn map_filter<F, M>(&mut self, filter: F, middleware: M) -> &mut Self
    where
        F: Filter + 'static,
        M: Middleware + 'static,
    {
        self.mappings.push((Arc::new(filter), Arc::new(middleware)));
        self
    }
}

impl fmt::Debug for FilterMap {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FilterMap").field("mappings", &self.mappings.len()).finish()
    }
}

impl Middleware for FilterMap {
    fn then(&self, next: DynApplication) -> DynApplication {
        let chains = self.mappings.iter().map(|(filter, middleware)| (Arc::clone(filter), middleware.then(Arc::clone(&next)))).collect();
        Arc::new(FilterMapApp { chains, next })
    }
}

struct FilterMapApp {
    chains: Vec<(Arc<dyn Filter>, DynApplication)>,
    next: DynApplication,
}

#[async_trait]
impl Application for FilterMapApp {
    async fn handle(&self, request: &mut Request) -> Result<Response, Error> {
        let chain = self.chains.iter().rev().find(|(filter, _)| filter.matches(request)).map_or(&self.next, |(_, chain)| chain);
        chain.handle(request).await
    }
}
