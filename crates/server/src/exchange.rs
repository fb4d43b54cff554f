//! Conversions between the engines' messages and molecule requests and responses.

use bytes::Bytes;
use http::StatusCode;
use http::request::Parts;
use molecule::middlewares::FailureReporter;
use molecule::{DynApplication, Request, Response};
use std::net::SocketAddr;
use tracing::debug;

const FORM_URLENCODED: &str = "application/x-www-form-urlencoded";

/// Builds the molecule request for an incoming message whose body has been read.
///
/// Query parameters come first, then the parameters of a form encoded body.
pub(crate) fn to_request(parts: Parts, body: Bytes, remote_addr: Option<SocketAddr>) -> Request {
    let mut request = Request::new(parts.method, parts.uri);
    request.set_version(parts.version);
    *request.headers_mut() = parts.headers;
    if let Some(addr) = remote_addr {
        request.set_remote_addr(addr);
    }

    if let Some(query) = request.query().map(ToString::to_string) {
        add_parameters(&mut request, query.as_bytes());
    }
    let form = request.content_type().is_some_and(|content_type| content_type.starts_with(FORM_URLENCODED));
    if form {
        add_parameters(&mut request, &body);
    }
    request.set_body(body);
    request
}

fn add_parameters(request: &mut Request, encoded: &[u8]) {
    match serde_urlencoded::from_bytes::<Vec<(String, String)>>(encoded) {
        Ok(parameters) => {
            for (name, value) in parameters {
                request.add_parameter(name, value);
            }
        }
        Err(e) => debug!(cause = %e, "ignoring malformed parameters"),
    }
}

/// Runs the application, turning an unrecovered failure into a `500 Internal Server Error`.
pub(crate) async fn respond(app: &DynApplication, reporter: &dyn FailureReporter, request: &mut Request) -> Response {
    match app.handle(request).await {
        Ok(response) => response,
        Err(e) => {
            reporter.error_occurred(&e);
            Response::text(StatusCode::INTERNAL_SERVER_ERROR, "Internal Server Error")
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{respond, to_request};
    use bytes::Bytes;
    use http::header::CONTENT_TYPE;
    use http::{Method, StatusCode, Version};
    use molecule::{DynApplication, Error, Request, app_fn};
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn parts(method: Method, uri: &str) -> http::request::Parts {
        http::Request::builder().method(method).uri(uri).version(Version::HTTP_10).header(CONTENT_TYPE, "application/x-www-form-urlencoded; charset=utf-8").body(()).unwrap().into_parts().0
    }

    #[test]
    fn reads_query_and_form_parameters() {
        let request = to_request(parts(Method::POST, "/search?q=rust&page=2"), Bytes::from_static(b"q=http&sort=asc"), Some("10.0.0.1:4000".parse().unwrap()));

        assert_eq!(request.method(), Method::POST);
        assert_eq!(request.path(), "/search");
        assert_eq!(request.version(), Version::HTTP_10);
        assert_eq!(request.parameters("q"), vec!["rust", "http"]);
        assert_eq!(request.parameter("sort"), Some("asc"));
        assert_eq!(request.remote_ip().map(|ip| ip.to_string()).as_deref(), Some("10.0.0.1"));
        assert_eq!(request.body().as_ref(), b"q=http&sort=asc");
    }

    #[test]
    fn decodes_the_request_path() {
        let request = to_request(parts(Method::GET, "/products/red%20shoes?color=dark%20red"), Bytes::new(), None);

        assert_eq!(request.path(), "/products/red shoes");
        assert_eq!(request.uri().path(), "/products/red%20shoes");
        assert_eq!(request.parameter("color"), Some("dark red"));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 1)]
    async fn reports_failures_as_internal_errors() {
        let failures = Arc::new(AtomicUsize::new(0));
        let counted = Arc::clone(&failures);
        let reporter = move |_: &Error| {
            counted.fetch_add(1, Ordering::SeqCst);
        };
        let app: DynApplication = Arc::new(app_fn(|_| Err(Error::app("Boom!"))));

        let response = respond(&app, &reporter, &mut Request::get("/")).await;

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(failures.load(Ordering::SeqCst), 1);
    }
}
