use crate::error::Error;
use crate::request::Request;
use chrono::{DateTime, TimeDelta, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

/// The data kept for a client between requests.
///
/// A session without id is fresh: it has never been saved to a store. Attributes are stored as
/// JSON values so any session can travel in a cookie. Once invalidated, a session refuses
/// modifications and is dropped from its store when the request completes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Session {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    id: Option<String>,
    #[serde(default)]
    attributes: BTreeMap<String, Value>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    max_age: Option<i64>,
    #[serde(skip)]
    invalid: bool,
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}

impl Session {
    /// A fresh session.
    pub fn new() -> Self {
        let now = Utc::now();
        Self { id: None, attributes: BTreeMap::new(), created_at: now, updated_at: now, max_age: None, invalid: false }
    }

    pub fn with_id<S: Into<String>>(id: S) -> Self {
        Self { id: Some(id.into()), ..Self::new() }
    }

    /// The session bound to `request`, if any.
    pub fn bound_to(request: &Request) -> Option<&Session> {
        request.attribute::<Session>()
    }

    pub fn bound_to_mut(request: &mut Request) -> Option<&mut Session> {
        request.attribute_mut::<Session>()
    }

    /// Binds this session to `request`, replacing any session already bound.
    pub fn bind(self, request: &mut Request) {
        request.set_attribute(self);
    }

    pub fn unbind(request: &mut Request) -> Option<Session> {
        request.remove_attribute::<Session>()
    }

    pub fn id(&self) -> Option<&str> {
        self.id.as_deref()
    }

    pub fn is_fresh(&self) -> bool {
        self.id.is_none()
    }

    /// A copy of this session stored under another id.
    pub fn renamed<S: Into<String>>(&self, id: S) -> Self {
        Self { id: Some(id.into()), ..self.clone() }
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn set_created_at(&mut self, at: DateTime<Utc>) -> &mut Self {
        self.created_at = at;
        self
    }

    pub fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    pub fn set_updated_at(&mut self, at: DateTime<Utc>) -> &mut Self {
        self.updated_at = at;
        self
    }

    /// Seconds the session lives after its last update, `None` if it never expires.
    pub fn max_age(&self) -> Option<i64> {
        self.max_age
    }

    pub fn set_max_age(&mut self, seconds: Option<i64>) -> &mut Self {
        self.max_age = seconds;
        self
    }

    pub fn expires(&self) -> bool {
        self.max_age.is_some()
    }

    pub fn expiration_time(&self) -> Option<DateTime<Utc>> {
        self.max_age.map(|seconds| self.updated_at + TimeDelta::seconds(seconds))
    }

    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expiration_time().is_some_and(|expiration| now >= expiration)
    }

    pub fn len(&self) -> usize {
        self.attributes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.attributes.is_empty()
    }

    pub fn contains(&self, key: &str) -> bool {
        self.attributes.contains_key(key)
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.attributes.get(key)
    }

    /// The attribute stored under `key`, read back as a `T`.
    ///
    /// Returns `None` when the attribute is missing or holds a value of another shape.
    pub fn get_as<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        self.attributes.get(key).and_then(|value| T::deserialize(value).ok())
    }

    /// Stores `value` under `key`, returning the previous value.
    pub fn put<K, V>(&mut self, key: K, value: V) -> Result<Option<Value>, Error>
    where
        K: Into<String>,
        V: Serialize,
    {
        self.check_valid()?;
        let value = serde_json::to_value(value).map_err(Error::codec)?;
        Ok(self.attributes.insert(key.into(), value))
    }

    pub fn remove(&mut self, key: &str) -> Result<Option<Value>, Error> {
        self.check_valid()?;
        Ok(self.attributes.remove(key))
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.attributes.keys().map(String::as_str)
    }

    pub fn clear(&mut self) {
        self.attributes.clear();
    }

    /// Copies the attributes of `other` into this session.
    pub fn merge(&mut self, other: &Session) -> Result<(), Error> {
        self.check_valid()?;
        self.attributes.extend(other.attributes.iter().map(|(key, value)| (key.clone(), value.clone())));
        Ok(())
    }

    /// Clears the session and marks it for removal from its store.
    pub fn invalidate(&mut self) {
        self.clear();
        self.invalid = true;
    }

    pub fn is_invalid(&self) -> bool {
        self.invalid
    }

    fn check_valid(&self) -> Result<(), Error> {
        if self.invalid { Err(Error::InvalidSession) } else { Ok(()) }
    }
}
