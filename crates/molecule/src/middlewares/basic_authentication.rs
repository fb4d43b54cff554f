use crate::application::{Application, DynApplication};
use crate::error::Error;
use crate::http::{Authorization, BasicCredentials};
use crate::middleware::Middleware;
use crate::request::Request;
use crate::response::Response;
use async_trait::async_trait;
use http::header::{AUTHORIZATION, WWW_AUTHENTICATE};
use http::{HeaderValue, StatusCode};
use std::fmt;
use std::sync::Arc;
use tracing::debug;

/// Checks the credentials of users.
#[cfg_attr(test, mockall::automock)]
pub trait Authenticator: Send + Sync {
    fn authenticate(&self, username: &str, password: &str) -> bool;
}

impl<F> Authenticator for F
where
    F: Fn(&str, &str) -> bool + Send + Sync,
{
    fn authenticate(&self, username: &str, password: &str) -> bool {
        self(username, password)
    }
}

/// The name of the authenticated user, bound as a request attribute.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteUser(pub String);

impl RemoteUser {
    pub fn name(&self) -> &str {
        &self.0
    }
}

/// Restricts access to users presenting valid `Basic` credentials.
///
/// Requests without credentials, or with invalid ones, are challenged with a `401 Unauthorized`.
/// Requests using another authentication scheme get a `400 Bad Request`.
#[derive(Clone)]
pub struct BasicAuthentication {
    realm: String,
    authenticator: Arc<dyn Authenticator>,
}

impl BasicAuthentication {
    pub fn new<S: Into<String>, A: Authenticator + 'static>(realm: S, authenticator: A) -> Self {
        Self { realm: realm.into(), authenticator: Arc::new(authenticator) }
    }

    pub fn realm(&self) -> &str {
        &self.realm
    }
}

impl fmt::Debug for BasicAuthentication {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BasicAuthentication").field("realm", &self.realm).finish_non_exhaustive()
    }
}

impl Middleware for BasicAuthentication {
    fn then(&self, next: DynApplication) -> DynApplication {
        Arc::new(BasicAuthenticationApp { config: self.clone(), next })
    }
}

struct BasicAuthenticationApp {
    config: BasicAuthentication,
    next: DynApplication,
}

impl BasicAuthenticationApp {
    fn challenge(&self) -> Result<Response, Error> {
        let challenge = HeaderValue::try_from(format!("Basic realm=\"{}\"", self.config.realm))?;
        Ok(Response::of(StatusCode::UNAUTHORIZED).with_header(WWW_AUTHENTICATE, challenge))
    }
}

#[async_trait]
impl Application for BasicAuthenticationApp {
    async fn handle(&self, request: &mut Request) -> Result<Response, Error> {
        let Some(authorization) = request.header(AUTHORIZATION).map(Authorization::parse) else {
            return self.challenge();
        };
        if !authorization.has_scheme("Basic") {
            return Ok(Response::of(StatusCode::BAD_REQUEST));
        }

        let credentials = BasicCredentials::decode(authorization.params());
        if !self.config.authenticator.authenticate(credentials.username(), credentials.password()) {
            debug!(username = credentials.username(), realm = %self.config.realm, "authentication failed");
            return self.challenge();
        }

        request.set_attribute(RemoteUser(credentials.username().to_string()));
        self.next.handle(request).await
    }
}
