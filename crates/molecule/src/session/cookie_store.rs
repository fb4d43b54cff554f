use crate::clock::{Clock, SystemClock};
use crate::error::Error;
use crate::session::encoder::SessionEncoder;
use crate::session::store::{SecureIdentifierPolicy, SessionIdentifierPolicy, SessionStore};
use crate::session::Session;
use async_trait::async_trait;
use std::fmt;
use std::sync::Arc;

/// Keeps sessions on the client: the session id handed back is the encoded session itself.
///
/// Nothing is stored on the server, so clearing a session only drops the client cookie.
/// Sessions past their max age no longer load.
pub struct CookieSessionStore {
    encoder: Arc<dyn SessionEncoder>,
    policy: Arc<dyn SessionIdentifierPolicy>,
    clock: Arc<dyn Clock>,
    renew_ids: bool,
}

impl CookieSessionStore {
    pub fn new<E: SessionEncoder + 'static>(encoder: E) -> Self {
        Self { encoder: Arc::new(encoder), policy: Arc::new(SecureIdentifierPolicy), clock: Arc::new(SystemClock), renew_ids: false }
    }

    pub fn with_policy<P: SessionIdentifierPolicy + 'static>(mut self, policy: P) -> Self {
        self.policy = Arc::new(policy);
        self
    }

    pub fn with_clock<C: Clock + 'static>(mut self, clock: C) -> Self {
        self.clock = Arc::new(clock);
        self
    }

    pub fn renew_ids(mut self, renew: bool) -> Self {
        self.renew_ids = renew;
        self
    }
}

impl fmt::Debug for CookieSessionStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CookieSessionStore").field("renew_ids", &self.renew_ids).finish_non_exhaustive()
    }
}

#[async_trait]
impl SessionStore for CookieSessionStore {
    async fn load(&self, id: &str) -> Result<Option<Session>, Error> {
        let now = self.clock.now();
        Ok(self.encoder.decode(id)?.filter(|session| !session.is_expired(now)))
    }

    async fn save(&self, session: &Session) -> Result<String, Error> {
        if session.is_invalid() {
            return Err(Error::InvalidSession);
        }
        let now = self.clock.now();
        let mut stored = match session.id() {
            Some(id) if !self.renew_ids => session.renamed(id),
            _ => {
                let mut renamed = session.renamed(self.policy.generate_id());
                renamed.set_created_at(now);
                renamed
            }
        };
        stored.set_updated_at(now);
        self.encoder.encode(&stored)
    }

    async fn clear(&self, _id: &str) -> Result<(), Error> {
        Ok(())
    }
}
