use crate::application::{Application, DynApplication};
use crate::clock::{Clock, SystemClock};
use crate::error::Error;
use crate::middleware::Middleware;
use crate::request::Request;
use crate::response::Response;
use async_trait::async_trait;
use http::header::DATE;
use std::fmt;
use std::sync::Arc;

/// Sets the `Date` header of responses, in RFC 1123 format.
#[derive(Clone)]
pub struct DateHeader {
    clock: Arc<dyn Clock>,
}

impl Default for DateHeader {
    fn default() -> Self {
        Self::new()
    }
}

impl DateHeader {
    pub fn new() -> Self {
        Self::with_clock(SystemClock)
    }

    pub fn with_clock<C: Clock + 'static>(clock: C) -> Self {
        Self { clock: Arc::new(clock) }
    }
}

impl fmt::Debug for DateHeader {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DateHeader").finish_non_exhaustive()
    }
}

impl Middleware for DateHeader {
    fn then(&self, next: DynApplication) -> DynApplication {
        Arc::new(DateHeaderApp { clock: Arc::clone(&self.clock), next })
    }
}

struct DateHeaderApp {
    clock: Arc<dyn Clock>,
    next: DynApplication,
}

#[async_trait]
impl Application for DateHeaderApp {
    async fn handle(&self, request: &mut Request) -> Result<Response, Error> {
        let mut response = self.next.handle(request).await?;
        response.set_date_header(DATE, self.clock.now())?;
        Ok(response)
    }
}
