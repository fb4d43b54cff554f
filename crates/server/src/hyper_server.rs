use crate::error::ServerError;
use crate::exchange::{respond, to_request};
use crate::server::Server;
use async_trait::async_trait;
use http_body_util::BodyExt;
use hyper::body::Incoming;
use hyper::server::conn::{http1, http2};
use hyper::service::service_fn;
use hyper_util::rt::{TokioExecutor, TokioIo};
use hyper_util::server::graceful::GracefulShutdown;
use molecule::middlewares::{FailureReporter, LogFailureReporter};
use molecule::{Body, DynApplication};
use std::fmt;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

const SHUTDOWN_GRACE_PERIOD: Duration = Duration::from_secs(10);

/// Serves applications on the tokio runtime with hyper, one task per connection.
///
/// Connections speak HTTP/1.1, or HTTP/2 with prior knowledge when enabled. Request bodies
/// are read in full before the application runs; response bodies are streamed.
pub struct HyperServer {
    addr: SocketAddr,
    http2: bool,
    reporter: Arc<dyn FailureReporter>,
    running: Option<Running>,
}

struct Running {
    local_addr: SocketAddr,
    stop: oneshot::Sender<()>,
    task: JoinHandle<()>,
}

impl HyperServer {
    pub fn new(addr: SocketAddr) -> Self {
        Self { addr, http2: false, reporter: Arc::new(LogFailureReporter), running: None }
    }

    pub fn http2(mut self, enabled: bool) -> Self {
        self.http2 = enabled;
        self
    }

    /// Where to report the failures applications did not recover from.
    pub fn reporting_to(mut self, reporter: Arc<dyn FailureReporter>) -> Self {
        self.reporter = reporter;
        self
    }
}

impl fmt::Debug for HyperServer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HyperServer")
            .field("addr", &self.addr)
            .field("http2", &self.http2)
            .field("local_addr", &self.local_addr())
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl Server for HyperServer {
    async fn run(&mut self, app: DynApplication) -> Result<(), ServerError> {
        if let Some(running) = &self.running {
            return Err(ServerError::AlreadyRunning { addr: running.local_addr });
        }

        let listener = TcpListener::bind(self.addr).await.map_err(|e| ServerError::bind(self.addr, e))?;
        let local_addr = listener.local_addr()?;
        info!(address = %local_addr, http2 = self.http2, "hyper server listening");

        let (stop, stopped) = oneshot::channel();
        let connections = Connections { app, reporter: Arc::clone(&self.reporter), http2: self.http2 };
        let task = tokio::spawn(connections.serve(listener, stopped));
        self.running = Some(Running { local_addr, stop, task });
        Ok(())
    }

    async fn shutdown(&mut self) -> Result<(), ServerError> {
        let Some(running) = self.running.take() else {
            return Ok(());
        };
        if running.stop.send(()).is_err() {
            debug!("accept loop already gone");
        }
        running.task.await.map_err(ServerError::engine)?;
        info!(address = %running.local_addr, "hyper server stopped");
        Ok(())
    }

    fn local_addr(&self) -> Option<SocketAddr> {
        self.running.as_ref().map(|running| running.local_addr)
    }
}

impl Drop for HyperServer {
    fn drop(&mut self) {
        if let Some(running) = self.running.take() {
            running.task.abort();
        }
    }
}

struct Connections {
    app: DynApplication,
    reporter: Arc<dyn FailureReporter>,
    http2: bool,
}

impl Connections {
    async fn serve(self, listener: TcpListener, mut stopped: oneshot::Receiver<()>) {
        let graceful = GracefulShutdown::new();
        loop {
            tokio::select! {
                accepted = listener.accept() => {
                    let (stream, remote_addr) = match accepted {
                        Ok(accepted) => accepted,
                        Err(e) => {
                            warn!(cause = %e, "failed to accept");
                            continue;
                        }
                    };
                    self.serve_connection(&graceful, TokioIo::new(stream), remote_addr);
                }
                _ = &mut stopped => break,
            }
        }

        drop(listener);
        tokio::select! {
            () = graceful.shutdown() => debug!("all connections closed"),
            () = tokio::time::sleep(SHUTDOWN_GRACE_PERIOD) => warn!("connections still open after grace period"),
        }
    }

    fn serve_connection(&self, graceful: &GracefulShutdown, io: TokioIo<tokio::net::TcpStream>, remote_addr: SocketAddr) {
        let app = Arc::clone(&self.app);
        let reporter = Arc::clone(&self.reporter);
        let service = service_fn(move |request: hyper::Request<Incoming>| {
            let app = Arc::clone(&app);
            let reporter = Arc::clone(&reporter);
            async move { exchange(&app, reporter.as_ref(), remote_addr, request).await }
        });

        if self.http2 {
            let connection = graceful.watch(http2::Builder::new(TokioExecutor::new()).serve_connection(io, service));
            tokio::spawn(async move {
                if let Err(e) = connection.await {
                    debug!(cause = %e, %remote_addr, "connection closed with error");
                }
            });
        } else {
            let connection = graceful.watch(http1::Builder::new().serve_connection(io, service));
            tokio::spawn(async move {
                if let Err(e) = connection.await {
                    debug!(cause = %e, %remote_addr, "connection closed with error");
                }
            });
        }
    }
}

async fn exchange(
    app: &DynApplication,
    reporter: &dyn FailureReporter,
    remote_addr: SocketAddr,
    request: hyper::Request<Incoming>,
) -> Result<http::Response<Body>, hyper::Error> {
    let (parts, body) = request.into_parts();
    let body = body.collect().await?.to_bytes();

    let mut request = to_request(parts, body, Some(remote_addr));
    let response = respond(app, reporter, &mut request).await;
    Ok(response.into())
}
