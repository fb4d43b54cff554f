use crate::application::{Application, DynApplication};
use crate::error::Error;
use crate::http::{AcceptLanguage, Locale};
use crate::middleware::Middleware;
use crate::request::Request;
use crate::response::Response;
use async_trait::async_trait;
use http::header::ACCEPT_LANGUAGE;
use std::sync::Arc;

/// Selects the locale of each request among the supported ones and binds it as a request attribute.
///
/// The first supported locale is the default, used when the client accepts none of the others.
#[derive(Debug, Clone)]
pub struct Locales {
    supported: Vec<Locale>,
}

impl Locales {
    pub fn new<I, S>(supported: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self { supported: supported.into_iter().map(|tag| Locale::from_language_tag(tag.as_ref())).collect() }
    }

    pub fn supported(&self) -> &[Locale] {
        &self.supported
    }

    fn select(&self, request: &Request) -> Option<Locale> {
        request
            .header(ACCEPT_LANGUAGE)
            .map(AcceptLanguage::parse)
            .and_then(|accepted| accepted.select_best(&self.supported))
            .or_else(|| self.supported.first().cloned())
    }
}

impl Middleware for Locales {
    fn then(&self, next: DynApplication) -> DynApplication {
        Arc::new(LocalesApp { locales: self.clone(), next })
    }
}

struct LocalesApp {
    locales: Locales,
    next: DynApplication,
}

#[async_trait]
impl Application for LocalesApp {
    async fn handle(&self, request: &mut Request) -> Result<Response, Error> {
        if let Some(locale) = self.locales.select(request) {
            request.set_attribute(locale);
        }
        self.next.handle(request).await
    }
}
