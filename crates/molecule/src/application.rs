//! The [`Application`] trait: anything that turns a request into a response.
//!
//! Handling is asynchronous, so an application may defer its response until some other
//! work completes. Middlewares see the outcome once the future resolves and can then
//! post-process the response or react to the failure.

use crate::error::Error;
use crate::request::Request;
use crate::response::Response;
use async_trait::async_trait;
use std::future::Future;
use std::sync::Arc;

#[async_trait]
pub trait Application: Send + Sync {
    async fn handle(&self, request: &mut Request) -> Result<Response, Error>;
}

/// A shared, type erased application, the unit middlewares are wired with.
pub type DynApplication = Arc<dyn Application>;

#[async_trait]
impl<A> Application for Arc<A>
where
    A: Application + ?Sized,
{
    async fn handle(&self, request: &mut Request) -> Result<Response, Error> {
        (**self).handle(request).await
    }
}

#[async_trait]
impl<A> Application for Box<A>
where
    A: Application + ?Sized,
{
    async fn handle(&self, request: &mut Request) -> Result<Response, Error> {
        (**self).handle(request).await
    }
}

/// An application wrapping a synchronous closure.
#[derive(Debug, Clone, Copy)]
pub struct FnApplication<F> {
    f: F,
}

/// Creates an application from a closure answering immediately.
///
/// # Example
/// ```
/// use molecule::{Response, app_fn};
/// use http::StatusCode;
///
/// let hello = app_fn(|request| {
///     let name = request.parameter("name").unwrap_or("World");
///     Ok(Response::text(StatusCode::OK, format!("Hello, {name}!")))
/// });
/// ```
pub fn app_fn<F>(f: F) -> FnApplication<F>
where
    F: Fn(&mut Request) -> Result<Response, Error> + Send + Sync,
{
    FnApplication { f }
}

#[async_trait]
impl<F> Application for FnApplication<F>
where
    F: Fn(&mut Request) -> Result<Response, Error> + Send + Sync,
{
    async fn handle(&self, request: &mut Request) -> Result<Response, Error> {
        (self.f)(request)
    }
}

/// An application whose response completes later.
#[derive(Debug, Clone, Copy)]
pub struct DeferredApplication<F> {
    f: F,
}

/// Creates an application from a closure returning a future of the response.
///
/// The closure reads what it needs from the request up front; the returned future owns its
/// data, so it can be completed by another task.
pub fn deferred_fn<F, Fut>(f: F) -> DeferredApplication<F>
where
    F: Fn(&mut Request) -> Fut + Send + Sync,
    Fut: Future<Output = Result<Response, Error>> + Send + 'static,
{
    DeferredApplication { f }
}

#[async_trait]
impl<F, Fut> Application for DeferredApplication<F>
where
    F: Fn(&mut Request) -> Fut + Send + Sync,
    Fut: Future<Output = Result<Response, Error>> + Send + 'static,
{
    async fn handle(&self, request: &mut Request) -> Result<Response, Error> {
        (self.f)(request).await
    }
}
