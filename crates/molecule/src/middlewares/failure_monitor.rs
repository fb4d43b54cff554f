use crate::application::{Application, DynApplication};
use crate::error::Error;
use crate::middleware::Middleware;
use crate::request::Request;
use crate::response::Response;
use async_trait::async_trait;
use std::fmt;
use std::sync::Arc;
use tracing::error;

/// Notified of the failures an application could not recover from.
#[cfg_attr(test, mockall::automock)]
pub trait FailureReporter: Send + Sync {
    fn error_occurred(&self, error: &Error);
}

impl<F> FailureReporter for F
where
    F: Fn(&Error) + Send + Sync,
{
    fn error_occurred(&self, error: &Error) {
        self(error);
    }
}

/// Reports failures as `tracing` error events.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogFailureReporter;

impl FailureReporter for LogFailureReporter {
    fn error_occurred(&self, e: &Error) {
        error!(cause = %e, "application failure");
    }
}

/// Reports the failures of its successor, then lets them through.
#[derive(Clone)]
pub struct FailureMonitor {
    reporter: Arc<dyn FailureReporter>,
}

impl FailureMonitor {
    pub fn new<R: FailureReporter + 'static>(reporter: R) -> Self {
        Self { reporter: Arc::new(reporter) }
    }

    pub fn shared(reporter: Arc<dyn FailureReporter>) -> Self {
        Self { reporter }
    }
}

impl fmt::Debug for FailureMonitor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FailureMonitor").finish_non_exhaustive()
    }
}

impl Middleware for FailureMonitor {
    fn then(&self, next: DynApplication) -> DynApplication {
        Arc::new(FailureMonitorApp { reporter: Arc::clone(&self.reporter), next })
    }
}

struct FailureMonitorApp {
    reporter: Arc<dyn FailureReporter>,
    next: DynApplication,
}

#[async_trait]
impl Application for FailureMonitorApp {
    async fn handle(&self, request: &mut Request) -> Result<Response, Error> {
        let result = self.next.handle(request).await;
        if let Err(e) = &result {
            self.reporter.error_occurred(e);
        }
        result
    }
}
