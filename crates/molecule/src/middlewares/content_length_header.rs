use crate::application::{Application, DynApplication};
use crate::error::Error;
use crate::middleware::Middleware;
use crate::request::Request;
use crate::response::Response;
use async_trait::async_trait;
use http::header::{CONTENT_LENGTH, TRANSFER_ENCODING};
use std::sync::Arc;

/// Sets `Content-Length` on responses whose body size is known and which are not chunked.
#[derive(Debug, Default, Clone, Copy)]
pub struct ContentLengthHeader;

impl Middleware for ContentLengthHeader {
    fn then(&self, next: DynApplication) -> DynApplication {
        Arc::new(ContentLengthHeaderApp { next })
    }
}

struct ContentLengthHeaderApp {
    next: DynApplication,
}

#[async_trait]
impl Application for ContentLengthHeaderApp {
    async fn handle(&self, request: &mut Request) -> Result<Response, Error> {
        let mut response = self.next.handle(request).await?;
        if response.has_header(CONTENT_LENGTH) || response.has_header(TRANSFER_ENCODING) {
            return Ok(response);
        }
        if let Some(size) = response.size() {
            response.set_content_length(size);
        }
        Ok(response)
    }
}
