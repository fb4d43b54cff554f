use crate::application::{Application, DynApplication};
use crate::error::Error;
use crate::middleware::Middleware;
use crate::middlewares::NotFound;
use crate::request::Request;
use crate::response::Response;
use crate::routing::filter::Filter;
use crate::routing::routes::{Route, Routes};
use async_trait::async_trait;
use std::fmt;
use std::sync::Arc;
use tracing::trace;

/// Dispatches requests to the first route that matches them, in declaration order.
///
/// Requests no route matches go to the fallback application, which answers `404 Not Found`
/// unless configured otherwise. Used as a middleware, a router falls back to its successor.
///
/// # Example
/// ```
/// use molecule::routing::Router;
/// use molecule::{Response, app_fn};
/// use http::StatusCode;
///
/// let router = Router::draw(|routes| {
///     routes.get("/products/:id").to(app_fn(|request| {
///         let id = request.parameter("id").unwrap_or_default();
///         Ok(Response::text(StatusCode::OK, format!("product {id}")))
///     }));
/// });
/// ```
#[derive(Clone)]
pub struct Router {
    routes: Vec<Arc<Route>>,
    fallback: DynApplication,
}

impl Default for Router {
    fn default() -> Self {
        Self { routes: Vec::new(), fallback: Arc::new(NotFound) }
    }
}

impl Router {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a router from the routes drawn by `draw`.
    pub fn draw<F: FnOnce(&mut Routes)>(draw: F) -> Self {
        let mut routes = Routes::new();
        draw(&mut routes);
        let mut router = Self::new();
        router.routes.extend(routes.into_routes().into_iter().map(Arc::new));
        router
    }

    pub fn add(&mut self, route: Route) -> &mut Self {
        self.routes.push(Arc::new(route));
        self
    }

    /// Serves the requests matching `filter` with `app`.
    pub fn route<F, A>(&mut self, filter: F, app: A) -> &mut Self
    where
        F: Filter + 'static,
        A: Application + 'static,
    {
        self.add(Route::new(filter, app))
    }

    /// Sets the application serving unmatched requests.
    pub fn default_to<A: Application + 'static>(&mut self, app: A) -> &mut Self {
        self.fallback = Arc::new(app);
        self
    }

    pub fn len(&self) -> usize {
        self.routes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }
}

impl fmt::Debug for Router {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Router").field("routes", &self.routes).finish_non_exhaustive()
    }
}

#[async_trait]
impl Application for Router {
    async fn handle(&self, request: &mut Request) -> Result<Response, Error> {
        let Some(route) = self.routes.iter().find(|route| route.matches(request)) else {
            trace!(path = request.path(), "no route matched");
            return self.fallback.handle(request).await;
        };

        for (name, value) in route.bound_parameters(request) {
            request.add_parameter(name, value);
        }
        route.app().handle(request).await
    }
}

impl Middleware for Router {
    fn then(&self, next: DynApplication) -> DynApplication {
        Arc::new(Self { routes: self.routes.clone(), fallback: next })
    }
}

#[cfg(test)]
mod tests {
    use super::Router;
    use crate::application::{Application, app_fn};
    use crate::middleware::Middleware;
    use crate::request::Request;
    use crate::response::Response;
    use crate::routing::filter::{fn_filter, with_path_prefix};
    use http::header::ACCEPT;
    use http::{HeaderValue, Method, StatusCode};
    use std::sync::Arc;

    fn answer(text: &'static str) -> impl Application {
        app_fn(move |_| Ok(Response::text(StatusCode::OK, text)))
    }

    async fn body_of(response: Response) -> String {
        let (_, _, body) = response.into_parts();
        String::from_utf8(body.into_bytes().await.unwrap().to_vec()).unwrap()
    }

    async fn dispatch(router: &Router, mut request: Request) -> (StatusCode, String) {
        let response = router.handle(&mut request).await.unwrap();
        (response.status(), body_of(response).await)
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 1)]
    async fn routes_by_path_and_method() {
        let router = Router::draw(|routes| {
            routes.get("/products").to(answer("list"));
            routes.post("/products").to(answer("create"));
            routes.map("/health").to(answer("up"));
        });

        assert_eq!(dispatch(&router, Request::get("/products")).await, (StatusCode::OK, "list".to_string()));
        assert_eq!(dispatch(&router, Request::post("/products")).await, (StatusCode::OK, "create".to_string()));
        assert_eq!(dispatch(&router, Request::with_method(Method::DELETE, "/health")).await.1, "up");
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 1)]
    async fn first_declared_route_wins() {
        let router = Router::draw(|routes| {
            routes.get("/products/new").to(answer("form"));
            routes.get("/products/:id").to(answer("show"));
        });

        assert_eq!(dispatch(&router, Request::get("/products/new")).await.1, "form");
        assert_eq!(dispatch(&router, Request::get("/products/12")).await.1, "show");
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 1)]
    async fn binds_dynamic_segments_to_parameters() {
        let router = Router::draw(|routes| {
            routes.get("/products/:id/reviews/:review").to(app_fn(|request| {
                let text = format!("{}#{}", request.parameter("id").unwrap_or_default(), request.parameter("review").unwrap_or_default());
                Ok(Response::text(StatusCode::OK, text))
            }));
        });

        let mut request = Request::get("/products/42/reviews/7");
        let response = router.handle(&mut request).await.unwrap();

        assert_eq!(body_of(response).await, "42#7");
        assert_eq!(request.parameter("id"), Some("42"));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 1)]
    async fn binds_decoded_segments() {
        let router = Router::draw(|routes| {
            routes.get("/products/:id").to(app_fn(|request| Ok(Response::text(StatusCode::OK, request.parameter("id").unwrap_or_default().to_string()))));
        });

        let mut request = Request::get("/products/red%20shoes");
        let response = router.handle(&mut request).await.unwrap();

        assert_eq!(body_of(response).await, "red shoes");
        assert_eq!(request.parameter("id"), Some("red shoes"));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 1)]
    async fn negotiates_on_accept_header() {
        let router = Router::draw(|routes| {
            routes.get("/report").accept("application/json").to(answer("json"));
            routes.get("/report").accept("text/html").to(answer("html"));
        });

        let json = Request::get("/report").with_header(ACCEPT, HeaderValue::from_static("application/json"));
        let html = Request::get("/report").with_header(ACCEPT, HeaderValue::from_static("text/html, */*; q=0.1"));

        assert_eq!(dispatch(&router, json).await.1, "json");
        assert_eq!(dispatch(&router, html).await.1, "html");
        assert_eq!(dispatch(&router, Request::get("/report")).await.0, StatusCode::NOT_FOUND);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 1)]
    async fn matches_several_methods_with_via() {
        let router = Router::draw(|routes| {
            routes.map("/form").via([Method::GET, Method::HEAD]).to(answer("form"));
        });

        assert_eq!(dispatch(&router, Request::with_method(Method::HEAD, "/form")).await.0, StatusCode::OK);
        assert_eq!(dispatch(&router, Request::post("/form")).await.0, StatusCode::NOT_FOUND);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 1)]
    async fn answers_not_found_by_default() {
        let router = Router::new();

        let (status, body) = dispatch(&router, Request::get("/missing")).await;

        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body, "Not found: /missing");
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 1)]
    async fn routes_with_custom_filters_and_fallback() {
        let mut router = Router::new();
        router
            .route(with_path_prefix("/admin"), answer("admin"))
            .route(fn_filter(|request| request.secure()), answer("secure"))
            .default_to(answer("fallback"));

        let mut secure = Request::get("/account");
        secure.set_secure(true);

        assert_eq!(dispatch(&router, Request::get("/admin/users")).await.1, "admin");
        assert_eq!(dispatch(&router, secure).await.1, "secure");
        assert_eq!(dispatch(&router, Request::get("/account")).await.1, "fallback");
        assert_eq!(router.len(), 2);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 1)]
    async fn falls_back_to_successor_as_middleware() {
        let router = Router::draw(|routes| {
            routes.get("/routed").to(answer("routed"));
        });
        let app = router.then(Arc::new(answer("successor")));

        let mut routed = Request::get("/routed");
        let mut other = Request::get("/other");

        assert_eq!(body_of(app.handle(&mut routed).await.unwrap()).await, "routed");
        assert_eq!(body_of(app.handle(&mut other).await.unwrap()).await, "successor");
    }
}
