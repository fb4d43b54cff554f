use crate::clock::{Clock, SystemClock};
use crate::error::Error;
use crate::session::store::{SecureIdentifierPolicy, SessionIdentifierPolicy, SessionStore};
use crate::session::Session;
use async_trait::async_trait;
use chrono::{DateTime, TimeDelta, Utc};
use dashmap::DashMap;
use std::fmt;
use std::sync::Arc;
use tracing::debug;

/// Notified of the life cycle of pooled sessions.
#[cfg_attr(test, mockall::automock)]
pub trait SessionPoolListener: Send + Sync {
    fn session_created(&self, _id: &str) {}

    fn session_loaded(&self, _id: &str) {}

    fn session_saved(&self, _id: &str) {}

    fn session_dropped(&self, _id: &str) {}
}

/// Ignores all session events.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoSessionEvents;

impl SessionPoolListener for NoSessionEvents {}

/// An in-memory session store.
///
/// Sessions live until their own max age is reached. On top of that, the pool can expire
/// sessions that have been idle for too long, or that were created too long ago. Expired
/// sessions no longer load and are dropped by [`SessionPool::house_keeping`].
///
/// # Example
/// ```
/// use molecule::session::SessionPool;
/// use chrono::TimeDelta;
///
/// let pool = SessionPool::new().idle_timeout(TimeDelta::minutes(30)).renew_ids(true);
/// ```
pub struct SessionPool {
    sessions: DashMap<String, Session>,
    policy: Arc<dyn SessionIdentifierPolicy>,
    clock: Arc<dyn Clock>,
    listener: Arc<dyn SessionPoolListener>,
    idle_timeout: Option<TimeDelta>,
    time_to_live: Option<TimeDelta>,
    renew_ids: bool,
}

impl Default for SessionPool {
    fn default() -> Self {
        Self {
            sessions: DashMap::new(),
            policy: Arc::new(SecureIdentifierPolicy),
            clock: Arc::new(SystemClock),
            listener: Arc::new(NoSessionEvents),
            idle_timeout: None,
            time_to_live: None,
            renew_ids: false,
        }
    }
}

impl SessionPool {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_policy<P: SessionIdentifierPolicy + 'static>(mut self, policy: P) -> Self {
        self.policy = Arc::new(policy);
        self
    }

    pub fn with_clock<C: Clock + 'static>(mut self, clock: C) -> Self {
        self.clock = Arc::new(clock);
        self
    }

    pub fn with_listener<L: SessionPoolListener + 'static>(mut self, listener: L) -> Self {
        self.listener = Arc::new(listener);
        self
    }

    /// Expires sessions without max age that have not been updated for `timeout`.
    pub fn idle_timeout(mut self, timeout: TimeDelta) -> Self {
        self.idle_timeout = Some(timeout);
        self
    }

    /// Expires sessions created more than `ttl` ago, whatever their activity.
    ///
    /// Unlike the idle timeout, which counts from the last update, the time to live counts from
    /// creation, so saving a session does not extend it.
    pub fn time_to_live(mut self, ttl: TimeDelta) -> Self {
        self.time_to_live = Some(ttl);
        self
    }

    /// Gives sessions a new id each time they are saved.
    pub fn renew_ids(mut self, renew: bool) -> Self {
        self.renew_ids = renew;
        self
    }

    pub fn size(&self) -> usize {
        self.sessions.len()
    }

    /// Drops expired and invalidated sessions, returning how many were dropped.
    pub fn house_keeping(&self) -> usize {
        let now = self.clock.now();
        let stale: Vec<String> =
            self.sessions.iter().filter(|entry| !self.is_valid(entry.value(), now)).map(|entry| entry.key().clone()).collect();

        for id in &stale {
            self.drop_session(id);
        }
        if !stale.is_empty() {
            debug!(count = stale.len(), "dropped expired sessions");
        }
        stale.len()
    }

    fn is_valid(&self, session: &Session, now: DateTime<Utc>) -> bool {
        if session.is_invalid() || session.is_expired(now) {
            return false;
        }
        let idle = !session.expires() && self.idle_timeout.is_some_and(|timeout| now >= session.updated_at() + timeout);
        let too_old = self.time_to_live.is_some_and(|ttl| now >= session.created_at() + ttl);
        !(idle || too_old)
    }

    fn drop_session(&self, id: &str) {
        if self.sessions.remove(id).is_some() {
            self.listener.session_dropped(id);
        }
    }
}

impl fmt::Debug for SessionPool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionPool")
            .field("size", &self.sessions.len())
            .field("idle_timeout", &self.idle_timeout)
            .field("time_to_live", &self.time_to_live)
            .field("renew_ids", &self.renew_ids)
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl SessionStore for SessionPool {
    async fn load(&self, id: &str) -> Result<Option<Session>, Error> {
        let now = self.clock.now();
        let session = {
            let Some(mut entry) = self.sessions.get_mut(id) else {
                return Ok(None);
            };
            if !self.is_valid(entry.value(), now) {
                entry.value_mut().invalidate();
                return Ok(None);
            }
            entry.value().clone()
        };

        self.listener.session_loaded(id);
        Ok(Some(session))
    }

    async fn save(&self, session: &Session) -> Result<String, Error> {
        if session.is_invalid() {
            return Err(Error::InvalidSession);
        }
        let previous = session.id().filter(|_| !self.renew_ids);
        if let (Some(id), None) = (session.id(), previous) {
            self.drop_session(id);
        }

        let id = previous.map_or_else(|| self.policy.generate_id(), ToString::to_string);
        let now = self.clock.now();
        let mut stored = session.renamed(id.clone());
        stored.set_updated_at(now);
        let created = previous.is_none();
        if created {
            stored.set_created_at(now);
        }
        self.sessions.insert(id.clone(), stored);

        if created {
            self.listener.session_created(&id);
        } else {
            self.listener.session_saved(&id);
        }
        Ok(id)
    }

    async fn clear(&self, id: &str) -> Result<(), Error> {
        self.drop_session(id);
        Ok(())
    }
}
