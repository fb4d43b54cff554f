use crate::session::SessionPool;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{debug, info};

const EVERY_HOUR: Duration = Duration::from_secs(3600);

/// Runs [`SessionPool::house_keeping`] at a fixed interval on the tokio runtime.
///
/// The chores stop when [`stop`](Self::stop) is called or the scheduler is dropped.
#[derive(Debug)]
pub struct PeriodicSessionHouseKeeping {
    pool: Arc<SessionPool>,
    interval: Duration,
    handle: Option<JoinHandle<()>>,
}

impl PeriodicSessionHouseKeeping {
    pub fn new(pool: Arc<SessionPool>) -> Self {
        Self::every(pool, EVERY_HOUR)
    }

    pub fn every(pool: Arc<SessionPool>, interval: Duration) -> Self {
        Self { pool, interval, handle: None }
    }

    /// Schedules the chores, the first run one interval from now.
    ///
    /// Must be called from within a tokio runtime.
    pub fn start(&mut self) {
        self.stop();
        let pool = Arc::clone(&self.pool);
        let interval = self.interval;
        info!(?interval, "starting session house keeping");

        self.handle = Some(tokio::spawn(async move {
            let mut ticks = tokio::time::interval_at(tokio::time::Instant::now() + interval, interval);
            loop {
                ticks.tick().await;
                let dropped = pool.house_keeping();
                debug!(dropped, remaining = pool.size(), "session house keeping done");
            }
        }));
    }

    pub fn stop(&mut self) {
        if let Some(handle) = self.handle.take() {
            handle.abort();
        }
    }

    pub fn is_running(&self) -> bool {
        self.handle.as_ref().is_some_and(|handle| !handle.is_finished())
    }
}

impl Drop for PeriodicSessionHouseKeeping {
    fn drop(&mut self) {
        self.stop();
    }
}

#[cfg(test)]
mod tests {
    use super::PeriodicSessionHouseKeeping;
    use crate::session::{Session, SessionPool, SessionStore};
    use std::sync::Arc;
    use std::time::Duration;

    #[tokio::test(flavor = "multi_thread", worker_threads = 1)]
    async fn periodically_drops_invalid_sessions() {
        let pool = Arc::new(SessionPool::new());
        let mut session = Session::new();
        session.set_max_age(Some(0));
        pool.save(&session).await.unwrap();

        let mut chores = PeriodicSessionHouseKeeping::every(Arc::clone(&pool), Duration::from_millis(10));
        chores.start();
        tokio::time::sleep(Duration::from_millis(100)).await;

        assert!(chores.is_running());
        assert_eq!(pool.size(), 0);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 1)]
    async fn stops_running_chores() {
        let mut chores = PeriodicSessionHouseKeeping::every(Arc::new(SessionPool::new()), Duration::from_millis(10));
        chores.start();
        chores.stop();

        assert!(!chores.is_running());
    }
}
