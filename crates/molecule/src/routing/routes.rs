use crate::application::{Application, DynApplication};
use crate::routing::dynamic_path::{DynamicPath, PathMatcher};
use crate::routing::filter::{AcceptingFilter, Filter, MethodFilter, PathFilter, accepting, with_method};
use crate::request::Request;
use http::Method;
use std::fmt;
use std::sync::Arc;

/// A filter paired with the application serving the requests it matches.
pub struct Route {
    filter: Box<dyn Filter>,
    path: Option<Arc<dyn PathMatcher>>,
    app: DynApplication,
}

impl Route {
    pub fn new<F, A>(filter: F, app: A) -> Self
    where
        F: Filter + 'static,
        A: Application + 'static,
    {
        Self { filter: Box::new(filter), path: None, app: Arc::new(app) }
    }

    pub fn matches(&self, request: &Request) -> bool {
        self.filter.matches(request)
    }

    /// Parameters bound by the route path, for a request this route matches.
    pub fn bound_parameters(&self, request: &Request) -> Vec<(String, String)> {
        self.path.as_ref().map(|path| path.bound_parameters(request.path())).unwrap_or_default()
    }

    pub fn app(&self) -> &DynApplication {
        &self.app
    }
}

impl fmt::Debug for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Route").field("binds_parameters", &self.path.is_some()).finish_non_exhaustive()
    }
}

/// Matches a path, then optionally methods and an accepted media type.
struct RouteFilter {
    path: PathFilter,
    methods: Option<MethodFilter>,
    accept: Option<AcceptingFilter>,
}

impl Filter for RouteFilter {
    fn matches(&self, req: &Request) -> bool {
        self.path.matches(req)
            && self.methods.as_ref().is_none_or(|methods| methods.matches(req))
            && self.accept.as_ref().is_none_or(|accept| accept.matches(req))
    }
}

/// The route table being drawn, see [`Router::draw`](crate::routing::Router::draw).
#[derive(Debug, Default)]
pub struct Routes {
    routes: Vec<Route>,
}

macro_rules! method_route {
    ($name:ident, $method:ident) => {
        #[doc = concat!("Starts a route for ", stringify!($method), " requests to `path`.")]
        pub fn $name(&mut self, path: &str) -> RouteDefinition<'_> {
            self.map(path).via([Method::$method])
        }
    };
}

impl Routes {
    pub fn new() -> Self {
        Self::default()
    }

    /// Starts a route for requests to `path`, whatever their method.
    ///
    /// Segments of `path` starting with `:` match any value and bind it as a request parameter.
    pub fn map(&mut self, path: &str) -> RouteDefinition<'_> {
        self.map_path(DynamicPath::equal_to(path))
    }

    /// Starts a route for requests whose path satisfies `path`.
    pub fn map_path<P: PathMatcher + 'static>(&mut self, path: P) -> RouteDefinition<'_> {
        RouteDefinition { routes: self, path: Arc::new(path), methods: None, accept: None }
    }

    method_route!(get, GET);
    method_route!(post, POST);
    method_route!(put, PUT);
    method_route!(delete, DELETE);
    method_route!(patch, PATCH);
    method_route!(head, HEAD);
    method_route!(options, OPTIONS);

    /// Adds a route built elsewhere.
    pub fn add(&mut self, route: Route) -> &mut Self {
        self.routes.push(route);
        self
    }

    pub fn len(&self) -> usize {
        self.routes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }

    pub(crate) fn into_routes(self) -> Vec<Route> {
        self.routes
    }
}

/// A route under construction. It is registered once given its application with [`RouteDefinition::to`].
#[must_use = "a route is only registered once `to` gives it an application"]
pub struct RouteDefinition<'a> {
    routes: &'a mut Routes,
    path: Arc<dyn PathMatcher>,
    methods: Option<MethodFilter>,
    accept: Option<AcceptingFilter>,
}

impl<'a> RouteDefinition<'a> {
    /// Restricts the route to any of `methods`, replacing previous restrictions.
    pub fn via<I: IntoIterator<Item = Method>>(mut self, methods: I) -> Self {
        self.methods = Some(with_method(methods));
        self
    }

    /// Restricts the route to requests accepting `media_type`, such as `application/json`.
    pub fn accept(mut self, media_type: &str) -> Self {
        self.accept = Some(accepting(media_type));
        self
    }

    pub fn to<A: Application + 'static>(self, app: A) -> &'a mut Routes {
        let filter = RouteFilter { path: PathFilter::from_shared(Arc::clone(&self.path)), methods: self.methods, accept: self.accept };
        self.routes.routes.push(Route { filter: Box::new(filter), path: Some(self.path), app: Arc::new(app) });
        self.routes
    }
}
