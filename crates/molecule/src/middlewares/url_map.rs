use crate::application::{Application, DynApplication};
use crate::error::Error;
use crate::middleware::Middleware;
use crate::request::Request;
use crate::response::Response;
use async_trait::async_trait;
use std::fmt;
use std::sync::Arc;
use tracing::trace;

/// The mount point the current application is served under, bound as a request attribute.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MountPoint {
    path: String,
}

impl MountPoint {
    fn new(path: &str) -> Self {
        Self { path: path.to_string() }
    }

    /// The path the application is mounted at.
    pub fn app(&self) -> &str {
        &self.path
    }

    /// The full path of `path`, relative to the mount point, without trailing slash.
    pub fn uri(&self, path: &str) -> String {
        let mut uri = if self.path == "/" { path.to_string() } else { format!("{}{}", self.path, path) };
        if uri.len() > 1 && uri.ends_with('/') {
            uri.pop();
        }
        uri
    }
}

#[derive(Clone)]
struct Mount {
    point: MountPoint,
    app: DynApplication,
}

impl Mount {
    /// The path seen by the mounted application, if the request path is under this mount point.
    fn path_info(&self, path: &str) -> Option<String> {
        let mount = self.point.app();
        if mount == "/" {
            return Some(path.to_string());
        }
        match path.strip_prefix(mount)? {
            "" => Some("/".to_string()),
            rest if rest.starts_with('/') => Some(rest.to_string()),
            _ => None,
        }
    }
}

/// Dispatches requests to applications by path prefix, the most specific mount point first.
///
/// While the mounted application runs, the request path is relative to the mount point and the
/// [`MountPoint`] is available as a request attribute. Requests under no mount point go to the
/// next application.
#[derive(Clone, Default)]
pub struct UrlMap {
    mounts: Vec<Mount>,
}

impl UrlMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn mount<A: Application + 'static>(&mut self, path: &str, app: A) -> &mut Self {
        let trimmed = path.trim_end_matches('/');
        let path = if trimmed.is_empty() { "/".to_string() } else if trimmed.starts_with('/') { trimmed.to_string() } else { format!("/{trimmed}") };

        self.mounts.retain(|mount| mount.point.app() != path);
        self.mounts.push(Mount { point: MountPoint::new(&path), app: Arc::new(app) });
        self.mounts.sort_by(|a, b| b.point.app().len().cmp(&a.point.app().len()));
        self
    }

    pub fn len(&self) -> usize {
        self.mounts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.mounts.is_empty()
    }
}

impl fmt::Debug for UrlMap {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.mounts.iter().map(|mount| mount.point.app())).finish()
    }
}

impl Middleware for UrlMap {
    fn then(&self, next: DynApplication) -> DynApplication {
        Arc::new(UrlMapApp { mounts: self.mounts.clone(), next })
    }
}

struct UrlMapApp {
    mounts: Vec<Mount>,
    next: DynApplication,
}

#[async_trait]
impl Application for UrlMapApp {
    async fn handle(&self, request: &mut Request) -> Result<Response, Error> {
        let found = self.mounts.iter().find_map(|mount| mount.path_info(request.path()).map(|path_info| (mount, path_info)));
        let Some((mount, path_info)) = found else {
            return self.next.handle(request).await;
        };

        trace!(mount = mount.point.app(), path = %path_info, "dispatching to mount point");
        let original_path = request.path().to_string();
        let previous_mount = request.set_attribute(mount.point.clone());
        request.set_path(path_info);

        let result = mount.app.handle(request).await;

        request.set_path(original_path);
        match previous_mount {
            Some(previous) => request.set_attribute(previous),
            None => request.remove_attribute::<MountPoint>(),
        };
        result
    }
}
