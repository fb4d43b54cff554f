use crate::application::{Application, DynApplication};
use crate::error::Error;
use crate::middleware::Middleware;
use crate::request::Request;
use crate::response::Response;
use crate::session::Session;
use async_trait::async_trait;
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

const FLASH_KEY: &str = "molecule.flash";

/// Messages passed on to the next request of the same client, such as a notice shown after
/// a redirect.
///
/// Messages put while handling a request are kept for the next one. Messages received from
/// the previous request are gone after this one, unless kept explicitly.
#[derive(Debug, Clone, Default)]
pub struct FlashHash {
    entries: BTreeMap<String, Value>,
    keep: BTreeSet<String>,
}

impl FlashHash {
    pub fn new() -> Self {
        Self::default()
    }

    fn restored(entries: BTreeMap<String, Value>) -> Self {
        Self { entries, keep: BTreeSet::new() }
    }

    pub fn bound_to(request: &Request) -> Option<&FlashHash> {
        request.attribute::<FlashHash>()
    }

    pub fn bound_to_mut(request: &mut Request) -> Option<&mut FlashHash> {
        request.attribute_mut::<FlashHash>()
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.entries.get(key)
    }

    pub fn get_as<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        self.entries.get(key).and_then(|value| T::deserialize(value).ok())
    }

    pub fn put<K, V>(&mut self, key: K, value: V) -> Result<Option<Value>, Error>
    where
        K: Into<String>,
        V: Serialize,
    {
        let key = key.into();
        let value = serde_json::to_value(value).map_err(Error::codec)?;
        self.keep.insert(key.clone());
        Ok(self.entries.insert(key, value))
    }

    pub fn remove(&mut self, key: &str) -> Option<Value> {
        self.keep.remove(key);
        self.entries.remove(key)
    }

    /// Carries the message received under `key` over to the next request.
    pub fn keep(&mut self, key: &str) -> &mut Self {
        if self.entries.contains_key(key) {
            self.keep.insert(key.to_string());
        }
        self
    }

    pub fn has(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    pub fn notice(&self) -> Option<&str> {
        self.entries.get("notice").and_then(Value::as_str)
    }

    pub fn set_notice<S: Into<String>>(&mut self, message: S) -> &mut Self {
        self.keep.insert("notice".to_string());
        self.entries.insert("notice".to_string(), Value::String(message.into()));
        self
    }

    pub fn alert(&self) -> Option<&str> {
        self.entries.get("alert").and_then(Value::as_str)
    }

    pub fn set_alert<S: Into<String>>(&mut self, message: S) -> &mut Self {
        self.keep.insert("alert".to_string());
        self.entries.insert("alert".to_string(), Value::String(message.into()));
        self
    }

    pub fn clear(&mut self) {
        self.entries.clear();
        self.keep.clear();
    }

    /// Drops the messages that are not carried over to the next request.
    pub fn sweep(&mut self) {
        let keep = &self.keep;
        self.entries.retain(|key, _| keep.contains(key));
    }
}

/// Binds a [`FlashHash`] to each request, stored in the session between requests.
///
/// Requires a session bound to the request, for instance by a
/// [`CookieSessionTracker`](crate::middlewares::CookieSessionTracker).
#[derive(Debug, Default, Clone, Copy)]
pub struct Flash;

impl Middleware for Flash {
    fn then(&self, next: DynApplication) -> DynApplication {
        Arc::new(FlashApp { next })
    }
}

struct FlashApp {
    next: DynApplication,
}

fn session_of(request: &mut Request) -> Result<&mut Session, Error> {
    Session::bound_to_mut(request).ok_or_else(|| Error::app("no session bound to request"))
}

#[async_trait]
impl Application for FlashApp {
    async fn handle(&self, request: &mut Request) -> Result<Response, Error> {
        let session = session_of(request)?;
        let entries = if session.contains(FLASH_KEY) {
            session.remove(FLASH_KEY)?.and_then(|value| serde_json::from_value(value).ok()).unwrap_or_default()
        } else {
            BTreeMap::new()
        };
        request.set_attribute(FlashHash::restored(entries));

        let result = self.next.handle(request).await;
        let flash = request.remove_attribute::<FlashHash>();
        let response = result?;

        if let Some(mut flash) = flash {
            flash.sweep();
            let session = session_of(request)?;
            if !session.is_invalid() && !flash.is_empty() {
                session.put(FLASH_KEY, flash.entries)?;
            }
        }
        Ok(response)
    }
}
