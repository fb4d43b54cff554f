use crate::application::{Application, DynApplication};
use crate::error::Error;
use crate::http::Cookie;
use crate::middleware::Middleware;
use crate::middlewares::cookies::CookieJar;
use crate::middlewares::failure_monitor::{FailureReporter, LogFailureReporter};
use crate::request::Request;
use crate::response::Response;
use crate::session::{Session, SessionStore};
use async_trait::async_trait;
use std::fmt;
use std::sync::Arc;
use tracing::trace;

pub const DEFAULT_SESSION_COOKIE: &str = "molecule.session";

/// Tracks sessions with a cookie holding the session id.
///
/// The session is loaded from the store before the successor runs and bound to the request,
/// a fresh one when the client has none. Once the successor has responded, the session is
/// saved back and the cookie set when its id changed. Invalidated sessions are cleared from
/// the store and their cookie discarded. Fresh sessions left empty are not stored at all.
///
/// Requires a [`CookieJar`], bound by the [`Cookies`](crate::middlewares::Cookies) middleware.
/// Store failures are reported and do not prevent the response from being sent.
#[derive(Clone)]
pub struct CookieSessionTracker {
    store: Arc<dyn SessionStore>,
    cookie_name: String,
    expire_after: Option<i64>,
    reporter: Arc<dyn FailureReporter>,
}

impl CookieSessionTracker {
    pub fn new<S: SessionStore + 'static>(store: S) -> Self {
        Self {
            store: Arc::new(store),
            cookie_name: DEFAULT_SESSION_COOKIE.to_string(),
            expire_after: None,
            reporter: Arc::new(LogFailureReporter),
        }
    }

    pub fn using_cookie_name<S: Into<String>>(mut self, name: S) -> Self {
        self.cookie_name = name.into();
        self
    }

    /// Gives new sessions, and their cookie, a max age of `seconds`.
    pub fn expire_after(mut self, seconds: i64) -> Self {
        self.expire_after = Some(seconds);
        self
    }

    pub fn report_failures_to<R: FailureReporter + 'static>(mut self, reporter: R) -> Self {
        self.reporter = Arc::new(reporter);
        self
    }
}

impl fmt::Debug for CookieSessionTracker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CookieSessionTracker")
            .field("cookie_name", &self.cookie_name)
            .field("expire_after", &self.expire_after)
            .finish_non_exhaustive()
    }
}

impl Middleware for CookieSessionTracker {
    fn then(&self, next: DynApplication) -> DynApplication {
        Arc::new(CookieSessionTrackerApp { tracker: self.clone(), next })
    }
}

struct CookieSessionTrackerApp {
    tracker: CookieSessionTracker,
    next: DynApplication,
}

impl CookieSessionTrackerApp {
    fn session_id(&self, request: &Request) -> Result<Option<String>, Error> {
        let jar = request.attribute::<CookieJar>().ok_or_else(|| Error::app("no cookie jar bound to request"))?;
        Ok(jar.value(&self.tracker.cookie_name).map(ToString::to_string))
    }

    async fn acquire(&self, id: Option<&str>) -> Session {
        let loaded = match id {
            Some(id) => self.tracker.store.load(id).await.unwrap_or_else(|e| {
                self.tracker.reporter.error_occurred(&e);
                None
            }),
            None => None,
        };
        loaded.unwrap_or_else(|| {
            let mut session = Session::new();
            session.set_max_age(self.tracker.expire_after);
            session
        })
    }

    async fn commit(&self, request: &mut Request, session: Session, client_id: Option<&str>) -> Result<(), Error> {
        if session.is_fresh() && session.is_empty() {
            return Ok(());
        }
        let jar = request.attribute_mut::<CookieJar>().ok_or_else(|| Error::app("no cookie jar bound to request"))?;
        let name = &self.tracker.cookie_name;

        if session.is_invalid() {
            if let Some(id) = session.id() {
                if let Err(e) = self.tracker.store.clear(id).await {
                    self.tracker.reporter.error_occurred(&e);
                }
            }
            jar.discard(name);
            return Ok(());
        }

        let id = match self.tracker.store.save(&session).await {
            Ok(id) => id,
            Err(e) => {
                self.tracker.reporter.error_occurred(&e);
                return Ok(());
            }
        };
        if client_id != Some(id.as_str()) || session.expires() {
            trace!(cookie = %name, "sending session cookie");
            jar.add(Cookie::new(name.as_str(), id).with_http_only(true).with_max_age(session.max_age()));
        }
        Ok(())
    }
}

#[async_trait]
impl Application for CookieSessionTrackerApp {
    async fn handle(&self, request: &mut Request) -> Result<Response, Error> {
        let client_id = self.session_id(request)?;
        self.acquire(client_id.as_deref()).await.bind(request);

        let result = self.next.handle(request).await;
        let session = Session::unbind(request);

        let response = result?;
        if let Some(session) = session {
            self.commit(request, session, client_id.as_deref()).await?;
        }
        Ok(response)
    }
}

#[cfg(test)]
mod tests {
    use super::CookieSessionTracker;
    use crate::application::{Application, DynApplication, app_fn};
    use crate::error::Error;
    use crate::middleware::Middleware;
    use crate::middlewares::cookies::Cookies;
    use crate::middlewares::failure_monitor::MockFailureReporter;
    use crate::request::Request;
    use crate::response::Response;
    use crate::session::store::testing::SequentialIds;
    use crate::session::{MockSessionStore, Session, SessionPool, SessionStore};
    use http::header::{COOKIE, SET_COOKIE};
    use http::{HeaderValue, StatusCode};
    use std::sync::Arc;

    fn pool() -> Arc<SessionPool> {
        Arc::new(SessionPool::new().with_policy(SequentialIds::new("sid")))
    }

    fn tracked<A: Application + 'static>(tracker: &CookieSessionTracker, app: A) -> DynApplication {
        Cookies.then(tracker.then(Arc::new(app)))
    }

    fn with_session_cookie(id: &str) -> Request {
        Request::get("/").with_header(COOKIE, HeaderValue::try_from(format!("molecule.session={id}")).unwrap())
    }

    fn counter() -> impl Application {
        app_fn(|request| {
            let session = Session::bound_to_mut(request).unwrap();
            let visits = session.get_as::<u32>("visits").unwrap_or(0) + 1;
            session.put("visits", visits)?;
            Ok(Response::text(StatusCode::OK, visits.to_string()))
        })
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 1)]
    async fn creates_session_and_sends_cookie_once_data_is_stored() {
        let pool = pool();
        let app = tracked(&CookieSessionTracker::new(Arc::clone(&pool)), counter());

        let response = app.handle(&mut Request::get("/")).await.unwrap();

        assert_eq!(response.headers_named(SET_COOKIE), vec!["molecule.session=sid-1; path=/; httponly"]);
        assert_eq!(pool.load("sid-1").await.unwrap().unwrap().get_as::<u32>("visits"), Some(1));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 1)]
    async fn does_not_store_empty_fresh_sessions() {
        let pool = pool();
        let app = tracked(&CookieSessionTracker::new(Arc::clone(&pool)), app_fn(|_| Ok(Response::ok())));

        let response = app.handle(&mut Request::get("/")).await.unwrap();

        assert!(!response.has_header(SET_COOKIE));
        assert_eq!(pool.size(), 0);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 1)]
    async fn resumes_session_of_client_cookie() {
        let pool = pool();
        let mut existing = Session::new();
        existing.put("visits", 2).unwrap();
        let id = pool.save(&existing).await.unwrap();
        let app = tracked(&CookieSessionTracker::new(Arc::clone(&pool)), counter());

        let response = app.handle(&mut with_session_cookie(&id)).await.unwrap();

        assert!(!response.has_header(SET_COOKIE));
        assert_eq!(pool.load(&id).await.unwrap().unwrap().get_as::<u32>("visits"), Some(3));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 1)]
    async fn starts_over_when_client_session_is_unknown() {
        let pool = pool();
        let app = tracked(&CookieSessionTracker::new(Arc::clone(&pool)), counter());

        let response = app.handle(&mut with_session_cookie("expired")).await.unwrap();

        assert_eq!(response.headers_named(SET_COOKIE), vec!["molecule.session=sid-1; path=/; httponly"]);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 1)]
    async fn clears_invalidated_sessions_and_discards_cookie() {
        let pool = pool();
        let mut existing = Session::new();
        existing.put("user", "alice").unwrap();
        let id = pool.save(&existing).await.unwrap();
        let logout = app_fn(|request| {
            Session::bound_to_mut(request).unwrap().invalidate();
            Ok(Response::ok())
        });
        let app = tracked(&CookieSessionTracker::new(Arc::clone(&pool)), logout);

        let response = app.handle(&mut with_session_cookie(&id)).await.unwrap();

        assert_eq!(response.headers_named(SET_COOKIE), vec!["molecule.session=; path=/; max-age=0"]);
        assert_eq!(pool.size(), 0);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 1)]
    async fn refreshes_cookie_of_expiring_sessions() {
        let pool = pool();
        let tracker = CookieSessionTracker::new(Arc::clone(&pool)).using_cookie_name("sid").expire_after(300);
        let app = tracked(&tracker, counter());

        let first = app.handle(&mut Request::get("/")).await.unwrap();
        let mut again = Request::get("/").with_header(COOKIE, HeaderValue::from_static("sid=sid-1"));
        let second = app.handle(&mut again).await.unwrap();

        assert_eq!(first.headers_named(SET_COOKIE), vec!["sid=sid-1; path=/; max-age=300; httponly"]);
        assert_eq!(second.headers_named(SET_COOKIE), vec!["sid=sid-1; path=/; max-age=300; httponly"]);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 1)]
    async fn reports_store_failures_and_still_responds() {
        let mut store = MockSessionStore::new();
        store.expect_save().returning(|_| Err(Error::app("store is down")));
        let mut reporter = MockFailureReporter::new();
        reporter.expect_error_occurred().withf(|e| e.to_string() == "store is down").times(1).return_const(());
        let tracker = CookieSessionTracker::new(store).report_failures_to(reporter);
        let app = tracked(&tracker, counter());

        let response = app.handle(&mut Request::get("/")).await.unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert!(!response.has_header(SET_COOKIE));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 1)]
    async fn requires_a_cookie_jar() {
        let tracker = CookieSessionTracker::new(pool());
        let app = tracker.then(Arc::new(counter()));

        assert!(matches!(app.handle(&mut Request::get("/")).await, Err(Error::Application { .. })));
    }
}
