use super::ports::{Session, SessionKey, SessionStore};
use async_trait::async_trait;
use moka::future::Cache;
use std::time::Duration;

/// Process-local session store.
///
/// Sessions idle for longer than `idle_timeout` are evicted, and the total
/// number of sessions is bounded by `max_entries`.
#[derive(Clone)]
pub struct InMemorySessionStore {
    cache: Cache<SessionKey, Session>,
}

impl InMemorySessionStore {
    pub fn new(idle_timeout: Duration, max_entries: u64) -> Self {
        let cache = Cache::builder()
            .max_capacity(max_entries)
            .time_to_idle(idle_timeout)
            .build();
        Self { cache }
    }
}

#[async_trait]
impl SessionStore for InMemorySessionStore {
    async fn get(&self, key: &SessionKey) -> anyhow::Result<Option<Session>> {
        Ok(self.cache.get(key).await)
    }

    async fn set(&self, key: &SessionKey, session: Session) -> anyhow::Result<()> {
        self.cache.insert(key.clone(), session).await;
        Ok(())
    }

    async fn clear(&self, key: &SessionKey) -> anyhow::Result<()> {
        self.cache.invalidate(key).await;
        Ok(())
    }
}
