use std::sync::Arc;
use std::time::Duration;

use moka::future::Cache;
use tracing::debug;

use crate::config::CacheConfig;
use crate::users::repo_types::{User, UserField};

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum LookupKey {
    Id(i64),
    Field(UserField, String),
}

/// Bounded TTL cache in front of the user directory. Never authoritative:
/// every entry expires on its own, and every write path calls
/// [`UserCache::invalidate`] so readers cannot observe a stale record past
/// the write.
#[derive(Clone)]
pub struct UserCache {
    list: Cache<(), Arc<Vec<User>>>,
    lookups: Cache<LookupKey, Arc<User>>,
}

impl UserCache {
    pub fn new(ttl: Duration, capacity: u64) -> Self {
        let list = Cache::builder()
            .max_capacity(1)
            .time_to_live(ttl)
            .build();
        let lookups = Cache::builder()
            .max_capacity(capacity)
            .time_to_live(ttl)
            .build();
        Self { list, lookups }
    }

    pub fn from_config(config: &CacheConfig) -> Self {
        Self::new(Duration::from_secs(config.ttl_seconds), config.capacity)
    }

    pub async fn get_all(&self) -> Option<Arc<Vec<User>>> {
        self.list.get(&()).await
    }

    pub async fn put_all(&self, users: Arc<Vec<User>>) {
        self.list.insert((), users).await;
    }

    pub async fn get(&self, key: &LookupKey) -> Option<Arc<User>> {
        self.lookups.get(key).await
    }

    pub async fn put(&self, key: LookupKey, user: Arc<User>) {
        self.lookups.insert(key, user).await;
    }

    /// Drop everything. Called on every create/update/password change;
    /// clearing per-field entries alongside the list keeps lookups by the
    /// old value of a changed field from surviving the write.
    pub fn invalidate(&self) {
        self.list.invalidate_all();
        self.lookups.invalidate_all();
        debug!("user cache invalidated");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::OffsetDateTime;

    fn sample_user(id: i64, username: &str) -> Arc<User> {
        Arc::new(User {
            id,
            first_name: "Test".into(),
            last_name: "User".into(),
            username: username.into(),
            password_hash: "hash".into(),
            email: None,
            phone_number: None,
            created_at: OffsetDateTime::now_utc(),
            updated_at: OffsetDateTime::now_utc(),
            active_status: true,
        })
    }

    #[tokio::test]
    async fn miss_then_hit() {
        let cache = UserCache::new(Duration::from_secs(60), 120);
        let key = LookupKey::Field(UserField::Username, "alice01".into());
        assert!(cache.get(&key).await.is_none());
        cache.put(key.clone(), sample_user(1, "alice01")).await;
        assert_eq!(cache.get(&key).await.unwrap().id, 1);
    }

    #[tokio::test]
    async fn invalidate_clears_list_and_lookups() {
        let cache = UserCache::new(Duration::from_secs(60), 120);
        let key = LookupKey::Id(1);
        cache.put(key.clone(), sample_user(1, "alice01")).await;
        cache
            .put_all(Arc::new(vec![(*sample_user(1, "alice01")).clone()]))
            .await;
        cache.invalidate();
        // moka applies invalidation lazily; run pending tasks before asserting.
        cache.list.run_pending_tasks().await;
        cache.lookups.run_pending_tasks().await;
        assert!(cache.get(&key).await.is_none());
        assert!(cache.get_all().await.is_none());
    }

    #[tokio::test]
    async fn entries_expire_after_ttl() {
        let cache = UserCache::new(Duration::from_millis(20), 120);
        let key = LookupKey::Id(2);
        cache.put(key.clone(), sample_user(2, "bob")).await;
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(cache.get(&key).await.is_none());
    }
}
