use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{Duration, Instant};

use anyhow::Context;
use axum::async_trait;
use redis::aio::ConnectionManager;
use tracing::debug;

use crate::config::RedisConfig;

/// Key-value store with per-key expiry, used for outstanding OTP codes.
///
/// The store is auxiliary and never authoritative: losing its contents only
/// disables OTP flows until it is reachable again. Failures are surfaced to
/// the caller, never retried.
#[async_trait]
pub trait SecretStore: Send + Sync {
    /// Atomically store `value` under `key` with a TTL, only if no live
    /// entry exists. Returns `true` when the entry was written.
    async fn set_if_absent(&self, key: &str, value: &str, ttl: Duration) -> anyhow::Result<bool>;
    async fn get(&self, key: &str) -> anyhow::Result<Option<String>>;
    async fn delete(&self, key: &str) -> anyhow::Result<()>;
}

#[derive(Clone)]
pub struct RedisSecretStore {
    conn: ConnectionManager,
}

impl RedisSecretStore {
    pub async fn connect(config: &RedisConfig) -> anyhow::Result<Self> {
        let client = redis::Client::open(config.url()).context("invalid redis url")?;
        let conn = ConnectionManager::new(client)
            .await
            .context("connect to redis")?;
        debug!(host = %config.host, port = config.port, "connected to redis");
        Ok(Self { conn })
    }
}

#[async_trait]
impl SecretStore for RedisSecretStore {
    async fn set_if_absent(&self, key: &str, value: &str, ttl: Duration) -> anyhow::Result<bool> {
        let mut conn = self.conn.clone();
        // SET NX EX is the atomic "one live entry per key" primitive; two
        // concurrent writers cannot both see OK.
        let reply: Option<String> = redis::cmd("SET")
            .arg(key)
            .arg(value)
            .arg("NX")
            .arg("EX")
            .arg(ttl.as_secs().max(1))
            .query_async(&mut conn)
            .await
            .context("redis SET NX EX")?;
        Ok(reply.is_some())
    }

    async fn get(&self, key: &str) -> anyhow::Result<Option<String>> {
        let mut conn = self.conn.clone();
        let value: Option<String> = redis::cmd("GET")
            .arg(key)
            .query_async(&mut conn)
            .await
            .context("redis GET")?;
        Ok(value)
    }

    async fn delete(&self, key: &str) -> anyhow::Result<()> {
        let mut conn = self.conn.clone();
        let _removed: i64 = redis::cmd("DEL")
            .arg(key)
            .query_async(&mut conn)
            .await
            .context("redis DEL")?;
        Ok(())
    }
}

/// In-process store with the same expiry semantics, for unit tests and
/// `AppState::fake()`.
#[derive(Default)]
pub struct MemorySecretStore {
    entries: Mutex<HashMap<String, (String, Instant)>>,
}

impl MemorySecretStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl SecretStore for MemorySecretStore {
    async fn set_if_absent(&self, key: &str, value: &str, ttl: Duration) -> anyhow::Result<bool> {
        let mut entries = self.entries.lock().expect("secret store lock poisoned");
        let now = Instant::now();
        if let Some((_, deadline)) = entries.get(key) {
            if *deadline > now {
                return Ok(false);
            }
        }
        entries.insert(key.to_string(), (value.to_string(), now + ttl));
        Ok(true)
    }

    async fn get(&self, key: &str) -> anyhow::Result<Option<String>> {
        let mut entries = self.entries.lock().expect("secret store lock poisoned");
        match entries.get(key) {
            Some((value, deadline)) if *deadline > Instant::now() => Ok(Some(value.clone())),
            Some(_) => {
                entries.remove(key);
                Ok(None)
            }
            None => Ok(None),
        }
    }

    async fn delete(&self, key: &str) -> anyhow::Result<()> {
        let mut entries = self.entries.lock().expect("secret store lock poisoned");
        entries.remove(key);
        Ok(())
    }
}

/// A store whose every call fails, for exercising fail-closed paths.
#[cfg(test)]
pub struct BrokenSecretStore;

#[cfg(test)]
#[async_trait]
impl SecretStore for BrokenSecretStore {
    async fn set_if_absent(&self, _: &str, _: &str, _: Duration) -> anyhow::Result<bool> {
        anyhow::bail!("secret store down")
    }
    async fn get(&self, _: &str) -> anyhow::Result<Option<String>> {
        anyhow::bail!("secret store down")
    }
    async fn delete(&self, _: &str) -> anyhow::Result<()> {
        anyhow::bail!("secret store down")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn set_if_absent_rejects_live_entry() {
        let store = MemorySecretStore::new();
        assert!(store
            .set_if_absent("15551234567", "123456", Duration::from_secs(90))
            .await
            .unwrap());
        assert!(!store
            .set_if_absent("15551234567", "654321", Duration::from_secs(90))
            .await
            .unwrap());
        assert_eq!(
            store.get("15551234567").await.unwrap().as_deref(),
            Some("123456")
        );
    }

    #[tokio::test]
    async fn entries_expire() {
        let store = MemorySecretStore::new();
        store
            .set_if_absent("k", "v", Duration::from_millis(20))
            .await
            .unwrap();
        tokio::time::sleep(Duration::from_millis(40)).await;
        assert_eq!(store.get("k").await.unwrap(), None);
        // A fresh write is accepted once the old entry has expired.
        assert!(store
            .set_if_absent("k", "v2", Duration::from_secs(5))
            .await
            .unwrap());
    }

    #[tokio::test]
    async fn delete_removes_entry() {
        let store = MemorySecretStore::new();
        store
            .set_if_absent("k", "v", Duration::from_secs(5))
            .await
            .unwrap();
        store.delete("k").await.unwrap();
        assert_eq!(store.get("k").await.unwrap(), None);
    }
}
