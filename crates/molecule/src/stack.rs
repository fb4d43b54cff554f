use crate::application::{Application, DynApplication};
use crate::error::Error;
use crate::middleware::Middleware;
use crate::middlewares::{NotFound, UrlMap};
use crate::request::Request;
use crate::response::Response;
use async_trait::async_trait;
use once_cell::sync::OnceCell;
use std::fmt;
use std::sync::Arc;
use tracing::debug;

type Warmup = Box<dyn Fn(&DynApplication) + Send + Sync>;

/// Assembles middlewares, mount points and a runner into a single application.
///
/// Middlewares wrap in declaration order: the first one added sees the request first.
/// Mount points registered between two middlewares are served at that position in the chain.
///
/// # Example
/// ```
/// use molecule::middlewares::{ContentLengthHeader, ServerHeader};
/// use molecule::{MiddlewareStack, Response, app_fn};
/// use http::StatusCode;
///
/// let mut stack = MiddlewareStack::new();
/// stack
///     .add(ServerHeader::new("molecule"))
///     .add(ContentLengthHeader)
///     .run(app_fn(|_| Ok(Response::text(StatusCode::OK, "Hello, World!"))));
///
/// let app = stack.boot().unwrap();
/// ```
#[derive(Default)]
pub struct MiddlewareStack {
    pipeline: Vec<Arc<dyn Middleware>>,
    map: Option<UrlMap>,
    runner: Option<DynApplication>,
    warmup: Option<Warmup>,
    booted: OnceCell<DynApplication>,
}

impl MiddlewareStack {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add<M: Middleware + 'static>(&mut self, middleware: M) -> &mut Self {
        self.add_shared(Arc::new(middleware))
    }

    pub fn add_shared(&mut self, middleware: Arc<dyn Middleware>) -> &mut Self {
        if let Some(map) = self.map.take() {
            self.pipeline.push(Arc::new(map));
        }
        self.pipeline.push(middleware);
        self
    }

    /// Serves `app` under the `path` prefix.
    pub fn mount<A: Application + 'static>(&mut self, path: &str, app: A) -> &mut Self {
        self.map.get_or_insert_with(UrlMap::new).mount(path, app);
        self
    }

    /// Registers a callback given the assembled application once it is booted.
    pub fn warmup<F>(&mut self, warmup: F) -> &mut Self
    where
        F: Fn(&DynApplication) + Send + Sync + 'static,
    {
        self.warmup = Some(Box::new(warmup));
        self
    }

    /// Sets the application at the end of the chain. With mount points, it answers requests no mount point matches.
    pub fn run<A: Application + 'static>(&mut self, runner: A) -> &mut Self {
        self.runner = Some(Arc::new(runner));
        self
    }

    /// Wires everything together.
    ///
    /// Fails when there is neither a runner nor a mount point.
    pub fn boot(&self) -> Result<DynApplication, Error> {
        if self.map.is_none() && self.runner.is_none() {
            return Err(Error::NotConfigured);
        }

        let mut app: DynApplication = match &self.runner {
            Some(runner) => Arc::clone(runner),
            None => Arc::new(NotFound),
        };

        if let Some(map) = &self.map {
            app = map.then(app);
        }

        for middleware in self.pipeline.iter().rev() {
            app = middleware.then(app);
        }

        debug!(middlewares = self.pipeline.len(), "middleware stack booted");
        if let Some(warmup) = &self.warmup {
            warmup(&app);
        }
        Ok(app)
    }
}

impl fmt::Debug for MiddlewareStack {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MiddlewareStack")
            .field("middlewares", &self.pipeline.len())
            .field("mounts", &self.map)
            .field("has_runner", &self.runner.is_some())
            .finish_non_exhaustive()
    }
}

/// A stack boots itself on its first request.
#[async_trait]
impl Application for MiddlewareStack {
    async fn handle(&self, request: &mut Request) -> Result<Response, Error> {
        let app = self.booted.get_or_try_init(|| self.boot())?;
        app.handle(request).await
    }
}

#[cfg(test)]
mod tests {
    use super::MiddlewareStack;
    use crate::application::{Application, DynApplication, app_fn};
    use crate::middleware::{Middleware, middleware_fn};
    use crate::{Error, Request, Response};
    use async_trait::async_trait;
    use http::StatusCode;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct Append(&'static str);

    struct Appending {
        text: &'static str,
        next: DynApplication,
    }

    #[async_trait]
    impl Application for Appending {
        async fn handle(&self, request: &mut Request) -> Result<Response, Error> {
            request.add_parameter("chain", self.text);
            self.next.handle(request).await
        }
    }

    impl Middleware for Append {
        fn then(&self, next: DynApplication) -> DynApplication {
            Arc::new(Appending { text: self.0, next })
        }
    }

    fn chain_reporter() -> impl Application {
        app_fn(|request| Ok(Response::text(StatusCode::OK, request.parameters("chain").join(","))))
    }

    async fn body_of(response: Response) -> String {
        let (_, _, body) = response.into_parts();
        String::from_utf8(body.into_bytes().await.unwrap().to_vec()).unwrap()
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 1)]
    async fn assembles_middlewares_in_declaration_order() {
        let mut stack = MiddlewareStack::new();
        stack.add(Append("a")).add(Append("b")).add(Append("c")).run(chain_reporter());

        let response = stack.handle(&mut Request::get("/")).await.unwrap();

        assert_eq!(body_of(response).await, "a,b,c");
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 1)]
    async fn serves_mount_points_where_they_were_declared() {
        let mut stack = MiddlewareStack::new();
        stack
            .add(Append("outer"))
            .mount("/api", chain_reporter())
            .add(Append("inner"))
            .run(chain_reporter());

        let api = stack.handle(&mut Request::get("/api/users")).await.unwrap();
        assert_eq!(body_of(api).await, "outer");

        let other = stack.handle(&mut Request::get("/home")).await.unwrap();
        assert_eq!(body_of(other).await, "outer,inner");
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 1)]
    async fn falls_back_to_not_found_when_only_mounts_are_defined() {
        let mut stack = MiddlewareStack::new();
        stack.mount("/api", chain_reporter());

        let response = stack.handle(&mut Request::get("/elsewhere")).await.unwrap();

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn refuses_to_boot_without_app_or_mount_points() {
        let mut stack = MiddlewareStack::new();
        stack.add(middleware_fn(|next| next));

        assert!(matches!(stack.boot(), Err(Error::NotConfigured)));
    }

    #[test]
    fn warms_up_assembled_application() {
        let warmed = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&warmed);

        let mut stack = MiddlewareStack::new();
        stack.run(chain_reporter()).warmup(move |_app| {
            counter.fetch_add(1, Ordering::SeqCst);
        });
        stack.boot().unwrap();

        assert_eq!(warmed.load(Ordering::SeqCst), 1);
    }
}
