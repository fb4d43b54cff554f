use crate::application::{Application, DynApplication};
use crate::error::Error;
use crate::middleware::Middleware;
use crate::request::Request;
use crate::response::Response;
use async_trait::async_trait;
use http::header::{CACHE_CONTROL, ETAG, LAST_MODIFIED};
use http::{HeaderValue, StatusCode};
use sha2::{Digest, Sha256};
use std::sync::Arc;

/// Tags successful responses with a strong `ETag` computed from their body.
///
/// Responses that already carry a validator, responses opting out of caching with `no-cache`,
/// and streamed bodies of unknown size are left alone.
/// Tagged responses without `Cache-Control` are marked for revalidation.
#[derive(Debug, Default, Clone, Copy)]
pub struct ETag;

impl Middleware for ETag {
    fn then(&self, next: DynApplication) -> DynApplication {
        Arc::new(ETagApp { next })
    }
}

struct ETagApp {
    next: DynApplication,
}

fn taggable(response: &Response) -> bool {
    matches!(response.status(), StatusCode::OK | StatusCode::CREATED)
        && !response.has_header(ETAG)
        && !response.has_header(LAST_MODIFIED)
        && !response.header(CACHE_CONTROL).is_some_and(|directives| directives.contains("no-cache"))
        && response.size().is_some_and(|size| size > 0)
}

#[async_trait]
impl Application for ETagApp {
    async fn handle(&self, request: &mut Request) -> Result<Response, Error> {
        let mut response = self.next.handle(request).await?;
        if !taggable(&response) {
            return Ok(response);
        }

        let content = response.body_mut().buffer().await.map_err(|e| Error::caused_by("could not read response body", e))?;
        let tag = format!("\"{:x}\"", Sha256::digest(&content));
        response.headers_mut().insert(ETAG, HeaderValue::try_from(tag)?);
        if !response.has_header(CACHE_CONTROL) {
            response.headers_mut().insert(CACHE_CONTROL, HeaderValue::from_static("max-age=0; private; no-cache"));
        }
        Ok(response)
    }
}
