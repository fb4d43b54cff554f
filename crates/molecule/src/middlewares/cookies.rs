use crate::application::{Application, DynApplication};
use crate::error::Error;
use crate::http::Cookie;
use crate::middleware::Middleware;
use crate::request::Request;
use crate::response::Response;
use async_trait::async_trait;
use http::HeaderValue;
use http::header::SET_COOKIE;
use std::sync::Arc;

/// The cookies of a request, plus the cookies to send back with the response.
///
/// Bound as a request attribute by the [`Cookies`] middleware. Cookies added or discarded
/// while handling the request are sent as `Set-Cookie` headers once the response is ready.
#[derive(Debug, Clone, Default)]
pub struct CookieJar {
    cookies: Vec<Cookie>,
    changes: Vec<Cookie>,
}

impl CookieJar {
    pub fn new() -> Self {
        Self::default()
    }

    /// A jar holding the cookies sent by the client.
    pub fn from_request(request: &Request) -> Self {
        Self { cookies: request.cookies(), changes: Vec::new() }
    }

    pub fn get(&self, name: &str) -> Option<&Cookie> {
        self.cookies.iter().find(|cookie| cookie.name() == name)
    }

    pub fn value(&self, name: &str) -> Option<&str> {
        self.get(name).map(Cookie::value)
    }

    pub fn has(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    pub fn list(&self) -> &[Cookie] {
        &self.cookies
    }

    pub fn len(&self) -> usize {
        self.cookies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cookies.is_empty()
    }

    /// Adds a cookie to send back, replacing any cookie of the same name.
    pub fn add(&mut self, cookie: Cookie) -> &mut Self {
        self.forget(cookie.name());
        self.cookies.push(cookie.clone());
        self.changes.push(cookie);
        self
    }

    /// Adds a session cookie at the root path.
    pub fn set<N: Into<String>, V: Into<String>>(&mut self, name: N, value: V) -> &mut Self {
        self.add(Cookie::new(name, value))
    }

    /// Tells the client to drop the cookie stored at the root path.
    pub fn discard(&mut self, name: &str) -> &mut Self {
        self.discard_cookie(Cookie::new(name, ""))
    }

    /// Tells the client to drop `cookie`, which must carry the path and domain it was stored with.
    pub fn discard_cookie(&mut self, cookie: Cookie) -> &mut Self {
        self.forget(cookie.name());
        self.changes.push(cookie.with_max_age(Some(0)));
        self
    }

    /// Whether the cookie was added while handling this request.
    pub fn is_fresh(&self, name: &str) -> bool {
        self.changes.iter().rev().find(|cookie| cookie.name() == name).is_some_and(|cookie| cookie.max_age() != Some(0))
    }

    pub fn is_discarded(&self, name: &str) -> bool {
        self.changes.iter().rev().find(|cookie| cookie.name() == name).is_some_and(|cookie| cookie.max_age() == Some(0))
    }

    /// The cookies to send back, in the order they were added or discarded.
    pub fn changes(&self) -> &[Cookie] {
        &self.changes
    }

    fn forget(&mut self, name: &str) {
        self.cookies.retain(|cookie| cookie.name() != name);
        self.changes.retain(|cookie| cookie.name() != name);
    }
}

/// Binds a [`CookieJar`] to each request and writes its changes to the response.
#[derive(Debug, Default, Clone, Copy)]
pub struct Cookies;

impl Middleware for Cookies {
    fn then(&self, next: DynApplication) -> DynApplication {
        Arc::new(CookiesApp { next })
    }
}

struct CookiesApp {
    next: DynApplication,
}

#[async_trait]
impl Application for CookiesApp {
    async fn handle(&self, request: &mut Request) -> Result<Response, Error> {
        request.set_attribute(CookieJar::from_request(request));

        let mut response = self.next.handle(request).await?;

        if let Some(jar) = request.remove_attribute::<CookieJar>() {
            for cookie in jar.changes() {
                response.headers_mut().append(SET_COOKIE, HeaderValue::try_from(cookie.to_string())?);
            }
        }
        Ok(response)
    }
}
