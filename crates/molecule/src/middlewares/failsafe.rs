use crate::application::{Application, DynApplication};
use crate::error::Error;
use crate::middleware::Middleware;
use crate::request::Request;
use crate::response::Response;
use async_trait::async_trait;
use futures::FutureExt;
use http::StatusCode;
use std::any::Any;
use std::fmt::Write;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use tracing::error;

/// Turns failures and panics of its successor into an error page.
///
/// The page lists the error and its causes. The status is `500 Internal Server Error`, unless the
/// failure is an [`Error::Status`].
#[derive(Debug, Default, Clone, Copy)]
pub struct Failsafe;

impl Middleware for Failsafe {
    fn then(&self, next: DynApplication) -> DynApplication {
        Arc::new(FailsafeApp { next })
    }
}

struct FailsafeApp {
    next: DynApplication,
}

#[async_trait]
impl Application for FailsafeApp {
    async fn handle(&self, request: &mut Request) -> Result<Response, Error> {
        let outcome = AssertUnwindSafe(self.next.handle(request)).catch_unwind().await;

        match outcome {
            Ok(Ok(response)) => Ok(response),
            Ok(Err(e)) => {
                error!(cause = %e, path = request.path(), "request failed");
                let status = match &e { Error::Status { status } => *status, _ => StatusCode::INTERNAL_SERVER_ERROR };
                Ok(error_page(status, &causes_of(&e)))
            }
            Err(panic) => {
                let message = panic_message(panic.as_ref());
                error!(cause = %message, path = request.path(), "request panicked");
                Ok(error_page(StatusCode::INTERNAL_SERVER_ERROR, &[message]))
            }
        }
    }
}

fn causes_of(e: &Error) -> Vec<String> {
    let mut causes = vec![e.to_string()];
    let mut source = std::error::Error::source(e);
    while let Some(cause) = source {
        causes.push(cause.to_string());
        source = cause.source();
    }
    causes
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(message) = panic.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = panic.downcast_ref::<String>() {
        message.clone()
    } else {
        "panic".to_string()
    }
}

fn error_page(status: StatusCode, causes: &[String]) -> Response {
    let title = status.canonical_reason().unwrap_or("Error");
    let mut page = format!("<html>\n<head><title>{title}</title></head>\n<body>\n<h1>{title}</h1>\n<ul>\n");
    for cause in causes {
        let _ = writeln!(page, "<li>{}</li>", escape_html(cause));
    }
    page.push_str("</ul>\n</body>\n</html>\n");
    Response::html(status, page)
}

fn escape_html(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '&' => escaped.push_str("&amp;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            _ => escaped.push(c),
        }
    }
    escaped
}

#[cfg(test)]
mod tests {
    use super::Failsafe;
    use crate::application::{Application, app_fn};
    use crate::error::Error;
    use crate::middleware::Middleware;
    use crate::request::Request;
    use crate::response::Response;
    use http::StatusCode;
    use std::io;
    use std::sync::Arc;

    async fn body_of(response: Response) -> String {
        let (_, _, body) = response.into_parts();
        String::from_utf8(body.into_bytes().await.unwrap().to_vec()).unwrap()
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 1)]
    async fn renders_error_chain_as_html_page() {
        let app = Failsafe.then(Arc::new(app_fn(|_| Err(Error::caused_by("Could not <save>", io::Error::other("disk full"))))));

        let response = app.handle(&mut Request::get("/")).await.unwrap();

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(response.content_type(), Some("text/html; charset=utf-8"));
        let page = body_of(response).await;
        assert!(page.contains("<h1>Internal Server Error</h1>"));
        assert!(page.contains("<li>Could not &lt;save&gt;</li>"));
        assert!(page.contains("<li>disk full</li>"));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 1)]
    async fn uses_status_of_status_errors() {
        let app = Failsafe.then(Arc::new(app_fn(|_| Err(Error::status(StatusCode::BAD_REQUEST)))));

        let response = app.handle(&mut Request::get("/")).await.unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 1)]
    async fn recovers_from_panics() {
        let app = Failsafe.then(Arc::new(app_fn(|_| -> Result<Response, Error> { panic!("Crash!") })));

        let response = app.handle(&mut Request::get("/")).await.unwrap();

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert!(body_of(response).await.contains("<li>Crash!</li>"));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 1)]
    async fn lets_successful_responses_through() {
        let app = Failsafe.then(Arc::new(app_fn(|_| Ok(Response::text(StatusCode::OK, "fine")))));

        let response = app.handle(&mut Request::get("/")).await.unwrap();

        assert_eq!(response.status(), StatusCode::OK);
    }
}
