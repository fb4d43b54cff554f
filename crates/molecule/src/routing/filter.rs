//! Request predicates used to select routes, filters and mount points.
//!
//! This module implements a filter system that allows you to:
//! - Filter requests based on HTTP methods
//! - Filter requests based on their path, exactly, by prefix or by dynamic pattern
//! - Filter requests based on headers and on the media types they accept
//! - Combine multiple filters using AND/OR logic
//! - Create custom filters using closures
//!
//! ## Thread Safety
//!
//! All filters must implement the `Filter` trait, which requires `Send + Sync`.
//! Routers are shared by all the connections of a server, and so are their filters.
//!
//! # Examples
//!
//! ```
//! use molecule::routing::filter::{all_filter, get_method, with_path_prefix};
//!
//! // Matches GET requests under /api
//! let mut api_reads = all_filter();
//! api_reads.and(get_method()).and(with_path_prefix("/api"));
//! ```

use crate::http::{Header, mime_types};
use crate::request::Request;
use crate::routing::dynamic_path::{DynamicPath, PathMatcher};
use http::{HeaderName, HeaderValue, Method};
use std::sync::Arc;

/// Core trait for request filtering.
///
/// Implementors of this trait can be used to filter HTTP requests
/// based on custom logic. Filters can be composed using [`AllFilter`]
/// and [`AnyFilter`].
pub trait Filter: Send + Sync {
    /// Check if the request matches this filter's criteria.
    fn matches(&self, req: &Request) -> bool;
}

impl<T: Filter + ?Sized> Filter for Box<T> {
    fn matches(&self, req: &Request) -> bool {
        (**self).matches(req)
    }
}

impl<T: Filter + ?Sized> Filter for Arc<T> {
    fn matches(&self, req: &Request) -> bool {
        (**self).matches(req)
    }
}

/// A filter that wraps a closure.
struct FnFilter<F: Fn(&Request) -> bool>(F);

impl<F: Fn(&Request) -> bool + Send + Sync> Filter for FnFilter<F> {
    fn matches(&self, req: &Request) -> bool {
        (self.0)(req)
    }
}

/// Creates a new filter from a closure.
///
/// # Example
/// ```
/// use molecule::routing::filter::fn_filter;
///
/// let custom_filter = fn_filter(|req| req.secure());
/// ```
pub fn fn_filter<F>(f: F) -> impl Filter
where
    F: Fn(&Request) -> bool + Send + Sync,
{
    FnFilter(f)
}

/// Creates a filter that always returns true.
pub fn true_filter() -> TrueFilter {
    TrueFilter
}

/// Creates a filter that always returns false.
pub fn false_filter() -> FalseFilter {
    FalseFilter
}

/// A filter that always returns true.
#[derive(Debug, Clone, Copy)]
pub struct TrueFilter;
impl Filter for TrueFilter {
    #[inline]
    fn matches(&self, _req: &Request) -> bool {
        true
    }
}

/// A filter that always returns false.
#[derive(Debug, Clone, Copy)]
pub struct FalseFilter;
impl Filter for FalseFilter {
    #[inline]
    fn matches(&self, _req: &Request) -> bool {
        false
    }
}

/// Creates a new OR-composed filter chain.
pub fn any_filter() -> AnyFilter {
    AnyFilter::new()
}

/// Compose filters with OR logic.
///
/// If any inner filter succeeds, the whole filter succeeds.
/// An empty filter chain returns true by default.
#[derive(Default)]
pub struct AnyFilter {
    filters: Vec<Box<dyn Filter>>,
}

impl AnyFilter {
    fn new() -> Self {
        Self { filters: vec![] }
    }

    /// Add a new filter to the OR chain.
    pub fn or<F: Filter + 'static>(&mut self, filter: F) -> &mut Self {
        self.filters.push(Box::new(filter));
        self
    }
}

impl Filter for AnyFilter {
    fn matches(&self, req: &Request) -> bool {
        self.filters.is_empty() || self.filters.iter().any(|filter| filter.matches(req))
    }
}

/// Creates a new AND-composed filter chain.
pub fn all_filter() -> AllFilter {
    AllFilter::new()
}

/// Compose filters with AND logic.
///
/// All inner filters must succeed for the whole filter to succeed.
/// An empty filter chain returns true by default.
#[derive(Default)]
pub struct AllFilter {
    filters: Vec<Box<dyn Filter>>,
}

impl AllFilter {
    fn new() -> Self {
        Self { filters: vec![] }
    }

    /// Add a new filter to the AND chain.
    pub fn and<F: Filter + 'static>(&mut self, filter: F) -> &mut Self {
        self.filters.push(Box::new(filter));
        self
    }
}

impl Filter for AllFilter {
    fn matches(&self, req: &Request) -> bool {
        self.filters.iter().all(|filter| filter.matches(req))
    }
}

/// A filter that matches HTTP methods.
#[derive(Debug, Clone)]
pub struct MethodFilter(Vec<Method>);

impl Filter for MethodFilter {
    fn matches(&self, req: &Request) -> bool {
        self.0.contains(req.method())
    }
}

/// Creates a filter that matches any of the given methods.
pub fn with_method<I: IntoIterator<Item = Method>>(methods: I) -> MethodFilter {
    MethodFilter(methods.into_iter().collect())
}

macro_rules! method_filter {
    ($method:ident, $upper_case_method:ident) => {
        #[doc = concat!("Creates a filter that matches HTTP ", stringify!($upper_case_method), " requests.")]
        #[inline]
        pub fn $method() -> MethodFilter {
            MethodFilter(vec![Method::$upper_case_method])
        }
    };
}

method_filter!(get_method, GET);
method_filter!(post_method, POST);
method_filter!(put_method, PUT);
method_filter!(delete_method, DELETE);
method_filter!(head_method, HEAD);
method_filter!(options_method, OPTIONS);
method_filter!(connect_method, CONNECT);
method_filter!(patch_method, PATCH);
method_filter!(trace_method, TRACE);

/// Creates a filter that matches a specific header name and value.
#[inline]
pub fn header(header_name: HeaderName, header_value: HeaderValue) -> HeaderFilter {
    HeaderFilter(header_name, header_value)
}

/// A filter that matches HTTP headers.
#[derive(Debug, Clone)]
pub struct HeaderFilter(HeaderName, HeaderValue);

impl Filter for HeaderFilter {
    fn matches(&self, req: &Request) -> bool {
        req.headers().get_all(&self.0).iter().any(|value| self.1.eq(value))
    }
}

/// A filter on the request path, using any [`PathMatcher`].
#[derive(Clone)]
pub struct PathFilter(Arc<dyn PathMatcher>);

impl PathFilter {
    pub fn new<P: PathMatcher + 'static>(matcher: P) -> Self {
        Self(Arc::new(matcher))
    }

    pub(crate) fn from_shared(matcher: Arc<dyn PathMatcher>) -> Self {
        Self(matcher)
    }
}

impl Filter for PathFilter {
    fn matches(&self, req: &Request) -> bool {
        self.0.matches(req.path())
    }
}

/// Matches requests whose path is exactly `path`.
pub fn with_path(path: &str) -> PathFilter {
    let expected = path.to_string();
    PathFilter::new(move |actual: &str| actual == expected)
}

/// Matches requests whose path starts with `prefix`.
pub fn with_path_prefix(prefix: &str) -> PathFilter {
    let prefix = prefix.to_string();
    PathFilter::new(move |actual: &str| actual.starts_with(&prefix))
}

/// Matches requests whose path fits the dynamic `pattern`, such as `/products/:id`.
pub fn with_dynamic_path(pattern: &str) -> PathFilter {
    PathFilter::new(DynamicPath::equal_to(pattern))
}

/// A filter on the media types listed in the `Accept` header.
#[derive(Debug, Clone)]
pub struct AcceptingFilter(String);

impl Filter for AcceptingFilter {
    fn matches(&self, req: &Request) -> bool {
        req.headers_named(http::header::ACCEPT)
            .into_iter()
            .any(|accept| Header::parse(accept).values().iter().any(|media_type| mime_types::matches(media_type, &self.0)))
    }
}

/// Matches requests accepting a media type that falls under `media_type` (e.g. `application/json` or `text/*`).
///
/// Requests without an `Accept` header do not match.
pub fn accepting(media_type: &str) -> AcceptingFilter {
    AcceptingFilter(media_type.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use http::header::{ACCEPT, AUTHORIZATION};

    fn request(method: Method, path: &str) -> Request {
        Request::with_method(method, path)
    }

    #[test]
    fn test_method_filters() {
        let get = request(Method::GET, "/");

        assert!(get_method().matches(&get));
        assert!(!post_method().matches(&get));
        assert!(with_method([Method::POST, Method::GET]).matches(&get));
    }

    #[test]
    fn test_header_filter() {
        let filter = header(AUTHORIZATION, HeaderValue::from_static("Bearer token"));

        let with_token = request(Method::GET, "/").with_header(AUTHORIZATION, HeaderValue::from_static("Bearer token"));
        assert!(filter.matches(&with_token));
        assert!(!filter.matches(&request(Method::GET, "/")));
    }

    #[test]
    fn test_path_filters() {
        let req = request(Method::GET, "/api/users");

        assert!(with_path("/api/users").matches(&req));
        assert!(!with_path("/api").matches(&req));
        assert!(with_path_prefix("/api").matches(&req));
        assert!(with_dynamic_path("/api/:resource").matches(&req));
    }

    #[test]
    fn test_accepting_filter() {
        let filter = accepting("application/json");

        let json = request(Method::GET, "/").with_header(ACCEPT, HeaderValue::from_static("text/html, application/json; q=0.9"));
        let html = request(Method::GET, "/").with_header(ACCEPT, HeaderValue::from_static("text/html"));
        let refused = request(Method::GET, "/").with_header(ACCEPT, HeaderValue::from_static("application/json; q=0"));

        assert!(filter.matches(&json));
        assert!(!filter.matches(&html));
        assert!(!filter.matches(&refused));
        assert!(!filter.matches(&request(Method::GET, "/")));
        assert!(accepting("text/*").matches(&html));
    }

    #[test]
    fn test_all_filter() {
        let req = request(Method::GET, "/admin");

        let mut filter = all_filter();
        assert!(filter.matches(&req));

        filter.and(get_method()).and(with_path("/admin"));
        assert!(filter.matches(&req));

        filter.and(false_filter());
        assert!(!filter.matches(&req));
    }

    #[test]
    fn test_any_filter() {
        let req = request(Method::GET, "/");

        let mut filter = any_filter();
        assert!(filter.matches(&req));

        filter.or(post_method()).or(fn_filter(|req| req.path() == "/"));
        assert!(filter.matches(&req));

        let mut none = any_filter();
        none.or(false_filter()).or(put_method());
        assert!(!none.matches(&req));
        assert!(true_filter().matches(&req));
    }
}
