use crate::config::{Engine, ServerConfig};
use crate::error::ServerError;
use crate::hyper_server::HyperServer;
use crate::server::Server;
use crate::simple_server::SimpleServer;
use molecule::middlewares::{FailureReporter, FilterMap, LogFailureReporter, ServerHeader};
use molecule::routing::{Router, Routes};
use molecule::{Application, DynApplication, Middleware, MiddlewareStack};
use std::fmt;
use std::net::SocketAddr;
use std::sync::Arc;
use tracing::info;

/// The entry point to serve a molecule application.
///
/// Collects middlewares, filters and mount points in a [`MiddlewareStack`], then serves the
/// assembled application with the engine of the configuration.
///
/// # Example
/// ```no_run
/// use molecule::middlewares::{ContentLengthHeader, Failsafe};
/// use molecule::{Response, app_fn};
/// use molecule_server::WebServer;
/// use http::StatusCode;
///
/// # async fn serve() -> Result<(), molecule_server::ServerError> {
/// let mut server = WebServer::create("127.0.0.1", 8080);
/// server.add(Failsafe).add(ContentLengthHeader);
/// server.route(|routes| {
///     routes.get("/hello/:name").to(app_fn(|request| {
///         let name = request.parameter("name").unwrap_or("World");
///         Ok(Response::text(StatusCode::OK, format!("Hello, {name}!")))
///     }));
/// }).await?;
/// # Ok(())
/// # }
/// ```
pub struct WebServer {
    config: ServerConfig,
    stack: MiddlewareStack,
    reporter: Arc<dyn FailureReporter>,
    server: Option<Box<dyn Server>>,
}

impl Default for WebServer {
    fn default() -> Self {
        Self::new(ServerConfig::default())
    }
}

impl WebServer {
    pub fn new(config: ServerConfig) -> Self {
        let mut stack = MiddlewareStack::new();
        if let Some(name) = &config.server_name {
            stack.add(ServerHeader::new(name.as_str()));
        }
        Self { config, stack, reporter: Arc::new(LogFailureReporter), server: None }
    }

    /// A server listening on `host:port` with the default engine.
    pub fn create(host: &str, port: u16) -> Self {
        Self::new(ServerConfig::builder().host(host).port(port).build())
    }

    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    pub fn report_failures_to<R: FailureReporter + 'static>(&mut self, reporter: R) -> &mut Self {
        self.reporter = Arc::new(reporter);
        self
    }

    pub fn add<M: Middleware + 'static>(&mut self, middleware: M) -> &mut Self {
        self.stack.add(middleware);
        self
    }

    /// Applies `middleware` only to requests under the `path` prefix.
    pub fn filter<M: Middleware + 'static>(&mut self, path: &str, middleware: M) -> &mut Self {
        let mut filters = FilterMap::new();
        filters.map(path, middleware);
        self.stack.add(filters);
        self
    }

    pub fn mount<A: Application + 'static>(&mut self, path: &str, app: A) -> &mut Self {
        self.stack.mount(path, app);
        self
    }

    pub fn warmup<F>(&mut self, warmup: F) -> &mut Self
    where
        F: Fn(&DynApplication) + Send + Sync + 'static,
    {
        self.stack.warmup(warmup);
        self
    }

    /// Starts serving `app` behind the middlewares added so far.
    pub async fn start<A: Application + 'static>(&mut self, app: A) -> Result<(), ServerError> {
        self.stack.run(app);
        self.boot().await
    }

    /// Starts serving the routes drawn by `draw`.
    pub async fn route<F: FnOnce(&mut Routes)>(&mut self, draw: F) -> Result<(), ServerError> {
        self.start(Router::draw(draw)).await
    }

    /// Starts serving the mount points only.
    pub async fn boot(&mut self) -> Result<(), ServerError> {
        if let Some(server) = &self.server {
            if let Some(addr) = server.local_addr() {
                return Err(ServerError::AlreadyRunning { addr });
            }
        }

        let app = self.stack.boot()?;
        let addr = self.config.address()?;
        let mut server: Box<dyn Server> = match self.config.engine {
            Engine::Hyper => Box::new(HyperServer::new(addr).http2(self.config.http2).reporting_to(Arc::clone(&self.reporter))),
            Engine::Simple => {
                Box::new(SimpleServer::new(addr).workers(self.config.workers).reporting_to(Arc::clone(&self.reporter)))
            }
        };
        server.run(app).await?;
        info!(uri = %self.uri(), engine = ?self.config.engine, "web server started");
        self.server = Some(server);
        Ok(())
    }

    pub async fn stop(&mut self) -> Result<(), ServerError> {
        match self.server.take() {
            Some(mut server) => server.shutdown().await,
            None => Ok(()),
        }
    }

    pub fn local_addr(&self) -> Option<SocketAddr> {
        self.server.as_ref().and_then(|server| server.local_addr())
    }

    /// The base uri of the server, with the actual port once started.
    pub fn uri(&self) -> String {
        let port = self.local_addr().map_or(self.config.port, |addr| addr.port());
        format!("http://{}:{port}", self.config.host)
    }
}

impl fmt::Debug for WebServer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WebServer")
            .field("config", &self.config)
            .field("stack", &self.stack)
            .field("local_addr", &self.local_addr())
            .finish_non_exhaustive()
    }
}
