use crate::application::Application;
use crate::body::Body;
use crate::error::{BoxError, Error};
use crate::http::{MimeTypes, http_date};
use crate::request::Request;
use crate::response::Response;
use async_trait::async_trait;
use chrono::{DateTime, SubsecRound, Utc};
use futures::TryStreamExt;
use http::header::{ALLOW, IF_MODIFIED_SINCE, LAST_MODIFIED};
use http::{HeaderValue, Method, StatusCode};
use http_body::Frame;
use http_body_util::StreamBody;
use std::io;
use std::path::{Component, Path, PathBuf};
use tokio_util::io::ReaderStream;
use tracing::debug;

/// Serves the files found under a root directory.
///
/// Only `GET` and `HEAD` are allowed. Missing files, directories and paths escaping the root
/// directory are answered with `404 Not Found`.
#[derive(Debug, Clone)]
pub struct FileServer {
    root: PathBuf,
    mime_types: MimeTypes,
}

impl FileServer {
    pub fn new<P: Into<PathBuf>>(root: P) -> Self {
        Self { root: root.into(), mime_types: MimeTypes::defaults() }
    }

    #[must_use]
    pub fn with_mime_types(mut self, mime_types: MimeTypes) -> Self {
        self.mime_types = mime_types;
        self
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn resolve(&self, path: &str) -> Option<PathBuf> {
        let relative = Path::new(path.trim_start_matches('/'));
        let mut resolved = self.root.clone();
        for component in relative.components() {
            match component {
                Component::Normal(part) => resolved.push(part),
                Component::CurDir => {}
                _ => return None,
            }
        }
        Some(resolved)
    }

    async fn serve(&self, request: &Request) -> Result<Response, Error> {
        let Some(file) = self.resolve(request.path()) else {
            return Ok(not_found(request));
        };
        let metadata = match tokio::fs::metadata(&file).await {
            Ok(metadata) if metadata.is_file() => metadata,
            Ok(_) => return Ok(not_found(request)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(not_found(request)),
            Err(e) => return Err(e.into()),
        };

        let last_modified = DateTime::<Utc>::from(metadata.modified()?).trunc_subsecs(0);
        let unchanged = request.header(IF_MODIFIED_SINCE).and_then(http_date::parse).is_some_and(|since| last_modified <= since);
        if unchanged {
            return Ok(Response::of(StatusCode::NOT_MODIFIED));
        }

        let file_name = file.file_name().map(|name| name.to_string_lossy().into_owned()).unwrap_or_default();
        let content_type = self.mime_types.guess_from(&file_name).to_string();
        let mut response = Response::ok();
        response.set_content_type(&content_type)?.set_date_header(LAST_MODIFIED, last_modified)?.set_content_length(metadata.len());

        if *request.method() == Method::GET {
            let content = tokio::fs::File::open(&file).await?;
            let frames = ReaderStream::new(content).map_ok(Frame::data).map_err(BoxError::from);
            response.set_body(Body::stream(StreamBody::new(frames)));
        }
        debug!(file = %file.display(), %content_type, "serving file");
        Ok(response)
    }
}

fn not_found(request: &Request) -> Response {
    Response::text(StatusCode::NOT_FOUND, format!("Not found: {}", request.path()))
}

#[async_trait]
impl Application for FileServer {
    async fn handle(&self, request: &mut Request) -> Result<Response, Error> {
        match *request.method() {
            Method::GET | Method::HEAD => self.serve(request).await,
            _ => Ok(Response::of(StatusCode::METHOD_NOT_ALLOWED).with_header(ALLOW, HeaderValue::from_static("GET, HEAD"))),
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::FileServer;
    use crate::application::Application;
    use crate::request::Request;
    use crate::response::Response;
    use http::header::{ALLOW, CONTENT_TYPE, IF_MODIFIED_SINCE, LAST_MODIFIED};
    use http::{HeaderValue, Method, StatusCode};
    use std::path::PathBuf;

    /// A scratch directory with a couple of files, removed on drop.
    pub(crate) struct Site(pub(crate) PathBuf);

    impl Site {
        pub(crate) fn new(name: &str) -> Self {
            let root = std::env::temp_dir().join(format!("molecule-{name}-{}", uuid::Uuid::new_v4()));
            std::fs::create_dir_all(root.join("css")).unwrap();
            std::fs::write(root.join("index.html"), "<h1>Home</h1>").unwrap();
            std::fs::write(root.join("css/main.css"), "body { color: red; }").unwrap();
            Self(root)
        }
    }

    impl Drop for Site {
        fn drop(&mut self) {
            let _ = std::fs::remove_dir_all(&self.0);
        }
    }

    async fn body_of(response: Response) -> String {
        let (_, _, body) = response.into_parts();
        String::from_utf8(body.into_bytes().await.unwrap().to_vec()).unwrap()
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 1)]
    async fn serves_files_with_type_and_length() {
        let site = Site::new("serve");
        let server = FileServer::new(&site.0);

        let response = server.handle(&mut Request::get("/css/main.css")).await.unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.header(CONTENT_TYPE), Some("text/css"));
        assert_eq!(response.content_length(), Some(20));
        assert!(response.has_header(LAST_MODIFIED));
        assert_eq!(body_of(response).await, "body { color: red; }");
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 1)]
    async fn sends_headers_only_on_head() {
        let site = Site::new("head");
        let server = FileServer::new(&site.0);

        let response = server.handle(&mut Request::with_method(Method::HEAD, "/index.html")).await.unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.content_length(), Some(13));
        assert!(response.is_empty());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 1)]
    async fn answers_not_found_for_missing_files_directories_and_escapes() {
        let site = Site::new("missing");
        let server = FileServer::new(&site.0);

        for path in ["/missing.html", "/css", "/../etc/passwd"] {
            let response = server.handle(&mut Request::get(path)).await.unwrap();
            assert_eq!(response.status(), StatusCode::NOT_FOUND, "{path}");
        }
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 1)]
    async fn allows_only_get_and_head() {
        let site = Site::new("methods");
        let server = FileServer::new(&site.0);

        let response = server.handle(&mut Request::post("/index.html")).await.unwrap();

        assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
        assert_eq!(response.header(ALLOW), Some("GET, HEAD"));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 1)]
    async fn answers_not_modified_to_fresh_clients() {
        let site = Site::new("fresh");
        let server = FileServer::new(&site.0);

        let mut request = Request::get("/index.html").with_header(IF_MODIFIED_SINCE, HeaderValue::from_static("Fri, 31 Dec 9999 23:59:59 GMT"));
        let response = server.handle(&mut request).await.unwrap();

        assert_eq!(response.status(), StatusCode::NOT_MODIFIED);
    }
}
