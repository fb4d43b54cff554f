use crate::application::Application;
use crate::error::Error;
use crate::request::Request;
use crate::response::Response;
use async_trait::async_trait;
use http::StatusCode;

/// Answers every request with `404 Not Found` and a short text page.
#[derive(Debug, Default, Clone, Copy)]
pub struct NotFound;

#[async_trait]
impl Application for NotFound {
    async fn handle(&self, request: &mut Request) -> Result<Response, Error> {
        Ok(Response::text(StatusCode::NOT_FOUND, format!("Not found: {}", request.path())))
    }
}

#[cfg(test)]
mod tests {
    use super::NotFound;
    use crate::application::Application;
    use crate::request::Request;
    use http::StatusCode;

    #[tokio::test(flavor = "multi_thread", worker_threads = 1)]
    async fn renders_missing_path() {
        let response = NotFound.handle(&mut Request::get("/missing?x=1")).await.unwrap();

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert_eq!(response.content_type(), Some("text/plain; charset=utf-8"));
        assert_eq!(response.size(), Some("Not found: /missing".len() as u64));
    }
}
