use crate::error::ServerError;
use crate::exchange::{respond, to_request};
use crate::server::Server;
use async_trait::async_trait;
use bytes::Bytes;
use http::header::{CONTENT_LENGTH, TRANSFER_ENCODING};
use http::{HeaderName, HeaderValue, Method, Version};
use molecule::middlewares::{FailureReporter, LogFailureReporter};
use molecule::{DynApplication, Response};
use std::fmt;
use std::io::Read;
use std::net::SocketAddr;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::{self, JoinHandle};
use std::time::Duration;
use tokio::runtime::Handle;
use tracing::{debug, error, info, warn};

const POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Serves applications from a fixed pool of blocking worker threads, with tiny_http.
///
/// Each worker takes the next request, drives the application to completion on the tokio
/// runtime the server was started from, then writes the buffered response.
pub struct SimpleServer {
    addr: SocketAddr,
    workers: usize,
    reporter: Arc<dyn FailureReporter>,
    running: Option<Running>,
}

struct Running {
    local_addr: SocketAddr,
    active: Arc<AtomicBool>,
    workers: Vec<JoinHandle<()>>,
}

impl SimpleServer {
    pub fn new(addr: SocketAddr) -> Self {
        Self { addr, workers: 4, reporter: Arc::new(LogFailureReporter), running: None }
    }

    pub fn workers(mut self, workers: usize) -> Self {
        self.workers = workers.max(1);
        self
    }

    pub fn reporting_to(mut self, reporter: Arc<dyn FailureReporter>) -> Self {
        self.reporter = reporter;
        self
    }
}

impl fmt::Debug for SimpleServer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SimpleServer")
            .field("addr", &self.addr)
            .field("workers", &self.workers)
            .field("local_addr", &self.local_addr())
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl Server for SimpleServer {
    async fn run(&mut self, app: DynApplication) -> Result<(), ServerError> {
        if let Some(running) = &self.running {
            return Err(ServerError::AlreadyRunning { addr: running.local_addr });
        }

        let server = tiny_http::Server::http(self.addr).map_err(ServerError::engine)?;
        let local_addr = server.server_addr().to_ip().ok_or_else(|| ServerError::engine("not listening on an ip address"))?;
        info!(address = %local_addr, workers = self.workers, "simple server listening");

        let server = Arc::new(server);
        let active = Arc::new(AtomicBool::new(true));
        let runtime = Handle::current();
        let workers = (0..self.workers)
            .map(|index| {
                let worker = Worker {
                    server: Arc::clone(&server),
                    active: Arc::clone(&active),
                    app: Arc::clone(&app),
                    reporter: Arc::clone(&self.reporter),
                    runtime: runtime.clone(),
                };
                thread::Builder::new().name(format!("molecule-worker-{index}")).spawn(move || worker.work())
            })
            .collect::<Result<Vec<_>, _>>()?;

        self.running = Some(Running { local_addr, active, workers });
        Ok(())
    }

    async fn shutdown(&mut self) -> Result<(), ServerError> {
        let Some(running) = self.running.take() else {
            return Ok(());
        };
        running.active.store(false, Ordering::SeqCst);
        tokio::task::spawn_blocking(move || {
            for worker in running.workers {
                if worker.join().is_err() {
                    warn!("worker thread panicked");
                }
            }
        })
        .await
        .map_err(ServerError::engine)?;

        info!(address = %running.local_addr, "simple server stopped");
        Ok(())
    }

    fn local_addr(&self) -> Option<SocketAddr> {
        self.running.as_ref().map(|running| running.local_addr)
    }
}

impl Drop for SimpleServer {
    fn drop(&mut self) {
        if let Some(running) = &self.running {
            running.active.store(false, Ordering::SeqCst);
        }
    }
}

struct Worker {
    server: Arc<tiny_http::Server>,
    active: Arc<AtomicBool>,
    app: DynApplication,
    reporter: Arc<dyn FailureReporter>,
    runtime: Handle,
}

impl Worker {
    fn work(self) {
        while self.active.load(Ordering::SeqCst) {
            match self.server.recv_timeout(POLL_INTERVAL) {
                Ok(Some(request)) => self.serve(request),
                Ok(None) => {}
                Err(e) => {
                    error!(cause = %e, "cannot receive request");
                    break;
                }
            }
        }
        debug!("worker stopped");
    }

    fn serve(&self, mut exchange: tiny_http::Request) {
        let mut body = Vec::new();
        if let Err(e) = exchange.as_reader().read_to_end(&mut body) {
            warn!(cause = %e, "cannot read request body");
            return;
        }

        let response = match incoming_parts(&exchange) {
            Ok(parts) => {
                let mut request = to_request(parts, Bytes::from(body), exchange.remote_addr().copied());
                self.runtime.block_on(respond(&self.app, self.reporter.as_ref(), &mut request))
            }
            Err(e) => {
                debug!(cause = %e, "malformed request");
                Response::text(http::StatusCode::BAD_REQUEST, "Bad Request")
            }
        };

        let outgoing = self.runtime.block_on(outgoing(response));
        if let Err(e) = exchange.respond(outgoing) {
            debug!(cause = %e, "cannot send response");
        }
    }
}

fn incoming_parts(exchange: &tiny_http::Request) -> Result<http::request::Parts, http::Error> {
    let version = match exchange.http_version() {
        tiny_http::HTTPVersion(1, 0) => Version::HTTP_10,
        tiny_http::HTTPVersion(2, _) => Version::HTTP_2,
        _ => Version::HTTP_11,
    };
    let mut builder = http::Request::builder()
        .method(Method::from_bytes(exchange.method().as_str().as_bytes())?)
        .uri(exchange.url())
        .version(version);
    for header in exchange.headers() {
        let name = HeaderName::from_bytes(header.field.as_str().as_str().as_bytes())?;
        builder = builder.header(name, HeaderValue::from_str(header.value.as_str())?);
    }
    Ok(builder.body(())?.into_parts().0)
}

async fn outgoing(response: Response) -> tiny_http::Response<std::io::Cursor<Vec<u8>>> {
    let (status, headers, body) = response.into_parts();
    let data = match body.into_bytes().await {
        Ok(bytes) => bytes.to_vec(),
        Err(e) => {
            warn!(cause = %e, "cannot read response body");
            Vec::new()
        }
    };

    let mut outgoing = tiny_http::Response::from_data(data).with_status_code(status.as_u16());
    for (name, value) in &headers {
        if name == CONTENT_LENGTH || name == TRANSFER_ENCODING {
            continue;
        }
        match tiny_http::Header::from_bytes(name.as_str().as_bytes(), value.as_bytes()) {
            Ok(header) => outgoing.add_header(header),
            Err(()) => debug!(header = %name, "dropping header tiny_http cannot send"),
        }
    }
    outgoing
}
