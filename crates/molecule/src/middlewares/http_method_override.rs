use crate::application::{Application, DynApplication};
use crate::error::Error;
use crate::middleware::Middleware;
use crate::request::Request;
use crate::response::Response;
use async_trait::async_trait;
use http::Method;
use std::sync::Arc;
use tracing::trace;

/// Lets HTML forms, which can only `POST`, ask for another method with a `_method` parameter.
#[derive(Debug, Clone)]
pub struct HttpMethodOverride {
    parameter: String,
}

impl Default for HttpMethodOverride {
    fn default() -> Self {
        Self::new("_method")
    }
}

impl HttpMethodOverride {
    pub fn new<S: Into<String>>(parameter: S) -> Self {
        Self { parameter: parameter.into() }
    }
}

impl Middleware for HttpMethodOverride {
    fn then(&self, next: DynApplication) -> DynApplication {
        Arc::new(HttpMethodOverrideApp { parameter: self.parameter.clone(), next })
    }
}

struct HttpMethodOverrideApp {
    parameter: String,
    next: DynApplication,
}

#[async_trait]
impl Application for HttpMethodOverrideApp {
    async fn handle(&self, request: &mut Request) -> Result<Response, Error> {
        if *request.method() == Method::POST {
            let method = request.parameter(&self.parameter).and_then(|name| Method::from_bytes(name.trim().to_ascii_uppercase().as_bytes()).ok());
            if let Some(method) = method {
                trace!(%method, "overriding POST method");
                request.set_method(method);
            }
        }
        self.next.handle(request).await
    }
}
