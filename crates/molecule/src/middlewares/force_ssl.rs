use crate::application::{Application, DynApplication};
use crate::error::Error;
use crate::http::Host;
use crate::middleware::Middleware;
use crate::request::Request;
use crate::response::Response;
use async_trait::async_trait;
use http::header::{HOST, STRICT_TRANSPORT_SECURITY};
use http::{HeaderName, HeaderValue, Method, StatusCode};
use std::sync::Arc;

/// Redirects plain http requests to https, and tells browsers to stick to https.
///
/// `GET` and `HEAD` requests are redirected permanently; other methods get a temporary redirect
/// so the client repeats the same method. Behind a proxy terminating TLS, the request is
/// considered secure when the [`ForceSsl::redirect_on`] header says `https`.
#[derive(Debug, Clone, Default)]
pub struct ForceSsl {
    host: Option<String>,
    redirect_on: Option<HeaderName>,
}

impl ForceSsl {
    pub fn new() -> Self {
        Self::default()
    }

    /// Redirects to this host instead of the requested one.
    #[must_use]
    pub fn redirect_to<S: Into<String>>(mut self, host: S) -> Self {
        self.host = Some(host.into());
        self
    }

    /// Trusts this header, such as `X-Forwarded-Proto`, to tell the original scheme.
    #[must_use]
    pub fn redirect_on(mut self, header: HeaderName) -> Self {
        self.redirect_on = Some(header);
        self
    }

    fn secure(&self, request: &Request) -> bool {
        match &self.redirect_on {
            Some(header) => request.header(header).is_some_and(|scheme| scheme.eq_ignore_ascii_case("https")),
            None => request.secure(),
        }
    }

    fn location(&self, request: &Request) -> String {
        let host = match &self.host {
            Some(host) => host.clone(),
            None => request.header(HOST).map(|host| Host::parse(host).name().to_string()).unwrap_or_default(),
        };
        let path_and_query = request.uri().path_and_query().map_or("/", |pq| pq.as_str());
        format!("https://{host}{path_and_query}")
    }
}

impl Middleware for ForceSsl {
    fn then(&self, next: DynApplication) -> DynApplication {
        Arc::new(ForceSslApp { config: self.clone(), next })
    }
}

struct ForceSslApp {
    config: ForceSsl,
    next: DynApplication,
}

#[async_trait]
impl Application for ForceSslApp {
    async fn handle(&self, request: &mut Request) -> Result<Response, Error> {
        if !self.config.secure(request) {
            let status = match *request.method() {
                Method::GET | Method::HEAD => StatusCode::MOVED_PERMANENTLY,
                _ => StatusCode::TEMPORARY_REDIRECT,
            };
            return Response::redirect(&self.config.location(request), status);
        }

        let mut response = self.next.handle(request).await?;
        response.headers_mut().insert(STRICT_TRANSPORT_SECURITY, HeaderValue::from_static("max-age=31536000"));
        Ok(response)
    }
}

#[cfg(test)]
mod tests {
    use super::ForceSsl;
    use crate::application::{Application, app_fn};
    use crate::middleware::Middleware;
    use crate::request::Request;
    use crate::response::Response;
    use http::header::{HOST, LOCATION, STRICT_TRANSPORT_SECURITY};
    use http::{HeaderName, HeaderValue, StatusCode};
    use std::sync::Arc;

    async fn serve(ssl: ForceSsl, request: Request) -> Response {
        let app = ssl.then(Arc::new(app_fn(|_| Ok(Response::ok()))));
        let mut request = request.with_header(HOST, HeaderValue::from_static("example.com:8080"));
        app.handle(&mut request).await.unwrap()
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 1)]
    async fn redirects_plain_requests_permanently() {
        let response = serve(ForceSsl::new(), Request::get("/account?tab=orders")).await;

        assert_eq!(response.status(), StatusCode::MOVED_PERMANENTLY);
        assert_eq!(response.header(LOCATION), Some("https://example.com/account?tab=orders"));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 1)]
    async fn redirects_unsafe_methods_temporarily_to_custom_host() {
        let response = serve(ForceSsl::new().redirect_to("secure.example.com"), Request::post("/orders")).await;

        assert_eq!(response.status(), StatusCode::TEMPORARY_REDIRECT);
        assert_eq!(response.header(LOCATION), Some("https://secure.example.com/orders"));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 1)]
    async fn enforces_strict_transport_on_secure_requests() {
        let mut request = Request::get("/");
        request.set_secure(true);
        let response = serve(ForceSsl::new(), request).await;

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.header(STRICT_TRANSPORT_SECURITY), Some("max-age=31536000"));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 1)]
    async fn trusts_forwarded_protocol_header() {
        let forwarded_proto = HeaderName::from_static("x-forwarded-proto");
        let ssl = || ForceSsl::new().redirect_on(HeaderName::from_static("x-forwarded-proto"));

        let proxied = Request::get("/").with_header(forwarded_proto.clone(), HeaderValue::from_static("https"));
        let plain = Request::get("/").with_header(forwarded_proto, HeaderValue::from_static("http"));

        assert_eq!(serve(ssl(), proxied).await.status(), StatusCode::OK);
        assert_eq!(serve(ssl(), plain).await.status(), StatusCode::MOVED_PERMANENTLY);
    }
}
