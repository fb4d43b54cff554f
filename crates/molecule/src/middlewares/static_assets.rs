use crate::application::{Application, DynApplication};
use crate::error::Error;
use crate::middleware::Middleware;
use crate::middlewares::FileServer;
use crate::request::Request;
use crate::response::Response;
use async_trait::async_trait;
use std::sync::Arc;

/// Serves static files for requests under some path prefixes, and forwards the other requests.
///
/// Requests for a directory (a path ending with `/`) are served the directory index file.
#[derive(Debug, Clone)]
pub struct StaticAssets {
    file_server: Arc<FileServer>,
    prefixes: Vec<String>,
    index: String,
}

impl StaticAssets {
    pub fn new(file_server: FileServer) -> Self {
        Self { file_server: Arc::new(file_server), prefixes: Vec::new(), index: "index.html".to_string() }
    }

    /// Serves requests whose path starts with `prefix`.
    #[must_use]
    pub fn serve<S: Into<String>>(mut self, prefix: S) -> Self {
        self.prefixes.push(prefix.into());
        self
    }

    #[must_use]
    pub fn index<S: Into<String>>(mut self, index: S) -> Self {
        self.index = index.into();
        self
    }

    fn matches(&self, path: &str) -> bool {
        self.prefixes.iter().any(|prefix| path.starts_with(prefix.as_str()))
    }
}

impl Middleware for StaticAssets {
    fn then(&self, next: DynApplication) -> DynApplication {
        Arc::new(StaticAssetsApp { assets: self.clone(), next })
    }
}

struct StaticAssetsApp {
    assets: StaticAssets,
    next: DynApplication,
}

#[async_trait]
impl Application for StaticAssetsApp {
    async fn handle(&self, request: &mut Request) -> Result<Response, Error> {
        if !self.assets.matches(request.path()) {
            return self.next.handle(request).await;
        }
        if !request.path().ends_with('/') {
            return self.assets.file_server.handle(request).await;
        }

        let directory = request.path().to_string();
        request.set_path(format!("{directory}{}", self.assets.index));
        let result = self.assets.file_server.handle(request).await;
        request.set_path(directory);
        result
    }
}
