use crate::application::{Application, DynApplication};
use crate::body::Body;
use crate::error::Error;
use crate::http::http_date;
use crate::middleware::Middleware;
use crate::request::Request;
use crate::response::Response;
use async_trait::async_trait;
use http::header::{CONTENT_LENGTH, CONTENT_TYPE, ETAG, IF_MODIFIED_SINCE, IF_NONE_MATCH, LAST_MODIFIED};
use http::{Method, StatusCode};
use std::sync::Arc;

/// Answers `304 Not Modified` to conditional `GET` and `HEAD` requests whose validators show the
/// client copy is still fresh.
#[derive(Debug, Default, Clone, Copy)]
pub struct ConditionalGet;

impl Middleware for ConditionalGet {
    fn then(&self, next: DynApplication) -> DynApplication {
        Arc::new(ConditionalGetApp { next })
    }
}

struct ConditionalGetApp {
    next: DynApplication,
}

fn etag_matches(request: &Request, response: &Response) -> Option<bool> {
    let if_none_match = request.header(IF_NONE_MATCH)?;
    let Some(etag) = response.header(ETAG) else {
        return Some(false);
    };
    Some(if_none_match.split(',').map(str::trim).any(|tag| tag == "*" || tag == etag))
}

fn not_modified_since(request: &Request, response: &Response) -> Option<bool> {
    let since = request.header(IF_MODIFIED_SINCE)?;
    let last_modified = response.header(LAST_MODIFIED).and_then(http_date::parse);
    let since = http_date::parse(since);
    Some(matches!((last_modified, since), (Some(modified), Some(since)) if modified <= since))
}

fn still_fresh(request: &Request, response: &Response) -> bool {
    match (etag_matches(request, response), not_modified_since(request, response)) {
        (None, None) => false,
        (etag, modified) => etag.unwrap_or(true) && modified.unwrap_or(true),
    }
}

#[async_trait]
impl Application for ConditionalGetApp {
    async fn handle(&self, request: &mut Request) -> Result<Response, Error> {
        let mut response = self.next.handle(request).await?;

        let get_or_head = matches!(*request.method(), Method::GET | Method::HEAD);
        if get_or_head && response.status() == StatusCode::OK && still_fresh(request, &response) {
            response.set_status(StatusCode::NOT_MODIFIED).remove_header(CONTENT_TYPE).remove_header(CONTENT_LENGTH);
            response.set_body(Body::empty());
        }
        Ok(response)
    }
}
