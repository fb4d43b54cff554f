use crate::application::{Application, DynApplication};
use crate::error::Error;
use crate::middleware::Middleware;
use crate::request::Request;
use crate::response::Response;
use async_trait::async_trait;
use http::HeaderValue;
use http::header::SERVER;
use std::sync::Arc;

/// Sets the `Server` header, unless the application already did.
#[derive(Debug, Clone)]
pub struct ServerHeader {
    name: String,
}

impl ServerHeader {
    pub fn new<S: Into<String>>(name: S) -> Self {
        Self { name: name.into() }
    }
}

impl Middleware for ServerHeader {
    fn then(&self, next: DynApplication) -> DynApplication {
        Arc::new(ServerHeaderApp { name: self.name.clone(), next })
    }
}

struct ServerHeaderApp {
    name: String,
    next: DynApplication,
}

#[async_trait]
impl Application for ServerHeaderApp {
    async fn handle(&self, request: &mut Request) -> Result<Response, Error> {
        let mut response = self.next.handle(request).await?;
        if !response.has_header(SERVER) {
            response.headers_mut().insert(SERVER, HeaderValue::from_str(&self.name)?);
        }
        Ok(response)
    }
}

#[cfg(test)]
mod tests {
    use super::ServerHeader;
    use crate::application::{Application, app_fn};
    use crate::middleware::Middleware;
    use crate::request::Request;
    use crate::response::Response;
    use http::HeaderValue;
    use http::header::SERVER;
    use std::sync::Arc;

    #[tokio::test(flavor = "multi_thread", worker_threads = 1)]
    async fn names_the_server() {
        let app = ServerHeader::new("molecule/0.1").then(Arc::new(app_fn(|_| Ok(Response::ok()))));

        let response = app.handle(&mut Request::get("/")).await.unwrap();

        assert_eq!(response.header(SERVER), Some("molecule/0.1"));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 1)]
    async fn keeps_header_set_by_application() {
        let app = ServerHeader::new("molecule/0.1")
            .then(Arc::new(app_fn(|_| Ok(Response::ok().with_header(SERVER, HeaderValue::from_static("custom"))))));

        let response = app.handle(&mut Request::get("/")).await.unwrap();

        assert_eq!(response.headers_named(SERVER), vec!["custom"]);
    }
}
