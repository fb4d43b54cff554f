use crate::error::Error;
use crate::session::Session;
use async_trait::async_trait;
use std::sync::Arc;
use uuid::Uuid;

/// Where sessions are kept between requests.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// The session stored under `id`, or `None` when unknown or no longer valid.
    async fn load(&self, id: &str) -> Result<Option<Session>, Error>;

    /// Stores `session` and returns the id to give back to the client.
    ///
    /// The returned id differs from the session id when the session is fresh or the store
    /// renews ids on every save.
    async fn save(&self, session: &Session) -> Result<String, Error>;

    async fn clear(&self, id: &str) -> Result<(), Error>;
}

#[async_trait]
impl<S> SessionStore for Arc<S>
where
    S: SessionStore + ?Sized,
{
    async fn load(&self, id: &str) -> Result<Option<Session>, Error> {
        (**self).load(id).await
    }

    async fn save(&self, session: &Session) -> Result<String, Error> {
        (**self).save(session).await
    }

    async fn clear(&self, id: &str) -> Result<(), Error> {
        (**self).clear(id).await
    }
}

/// Generates the ids of new sessions.
pub trait SessionIdentifierPolicy: Send + Sync {
    fn generate_id(&self) -> String;
}

/// Random version 4 UUIDs.
#[derive(Debug, Default, Clone, Copy)]
pub struct SecureIdentifierPolicy;

impl SessionIdentifierPolicy for SecureIdentifierPolicy {
    fn generate_id(&self) -> String {
        Uuid::new_v4().to_string()
    }
}

impl<F> SessionIdentifierPolicy for F
where
    F: Fn() -> String + Send + Sync,
{
    fn generate_id(&self) -> String {
        self()
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use super::SessionIdentifierPolicy;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Hands out `prefix-1`, `prefix-2`, and so on.
    #[derive(Debug)]
    pub(crate) struct SequentialIds {
        prefix: &'static str,
        next: AtomicUsize,
    }

    impl SequentialIds {
        pub(crate) fn new(prefix: &'static str) -> Self {
            Self { prefix, next: AtomicUsize::new(1) }
        }
    }

    impl SessionIdentifierPolicy for SequentialIds {
        fn generate_id(&self) -> String {
            format!("{}-{}", self.prefix, self.next.fetch_add(1, Ordering::SeqCst))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{SecureIdentifierPolicy, SessionIdentifierPolicy};
    use uuid::Uuid;

    #[test]
    fn generates_unique_uuids() {
        let policy = SecureIdentifierPolicy;
        let first = policy.generate_id();

        assert_eq!(Uuid::parse_str(&first).unwrap().get_version_num(), 4);
        assert_ne!(first, policy.generate_id());
    }

    #[test]
    fn accepts_closures_as_policies() {
        let policy = || "constant".to_string();

        assert_eq!(policy.generate_id(), "constant");
    }
}
