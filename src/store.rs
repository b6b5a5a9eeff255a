//! Shared-store access: point reads, assignment pushes, and the change feed.

use std::collections::HashMap;

use async_trait::async_trait;
use deadpool_redis::redis::{self, AsyncCommands};
use deadpool_redis::{Config, Pool, Runtime};
use futures_util::stream::{BoxStream, StreamExt};
use tracing::debug;

use crate::config::StoreConfig;
use crate::error::{Result, SchedulerError};
use crate::event::Notification;
use crate::keys;

/// Point operations the scheduler performs against the shared store.
///
/// The change feed itself is not part of this trait: the event loop is fed
/// notifications separately, so tests can drive the scheduler with synthetic
/// events against [`InMemoryStore`].
#[async_trait]
pub trait SchedulerStore: Send + Sync {
    /// Reads a full list value.
    async fn read_list(&self, key: &str) -> Result<Vec<String>>;

    /// Reads a full hash value. Missing keys read as an empty map.
    async fn read_hash(&self, key: &str) -> Result<HashMap<String, String>>;

    /// Reads a single list element by index, `None` past the end.
    async fn list_index(&self, key: &str, index: usize) -> Result<Option<String>>;

    /// Pops the front element of a list, `None` if empty.
    async fn pop_front(&self, key: &str) -> Result<Option<String>>;

    /// Appends a value to the back of a list. The scheduler's only outbound
    /// command: pushing a task id onto a worker's inbound queue.
    async fn push_back(&self, key: &str, value: &str) -> Result<()>;

    /// Lists keys matching a glob pattern. Used only by the bootstrap scan.
    async fn scan_keys(&self, pattern: &str) -> Result<Vec<String>>;
}

#[async_trait]
impl<T: SchedulerStore + ?Sized> SchedulerStore for std::sync::Arc<T> {
    async fn read_list(&self, key: &str) -> Result<Vec<String>> {
        (**self).read_list(key).await
    }

    async fn read_hash(&self, key: &str) -> Result<HashMap<String, String>> {
        (**self).read_hash(key).await
    }

    async fn list_index(&self, key: &str, index: usize) -> Result<Option<String>> {
        (**self).list_index(key, index).await
    }

    async fn pop_front(&self, key: &str) -> Result<Option<String>> {
        (**self).pop_front(key).await
    }

    async fn push_back(&self, key: &str, value: &str) -> Result<()> {
        (**self).push_back(key, value).await
    }

    async fn scan_keys(&self, pattern: &str) -> Result<Vec<String>> {
        (**self).scan_keys(pattern).await
    }
}

/// Valkey/Redis-backed store.
pub struct ValkeyStore {
    pool: Pool,
    client: redis::Client,
    keyspace_prefix: String,
}

impl ValkeyStore {
    /// Connects to the store and verifies the connection with a PING.
    ///
    /// Any failure here is fatal to the caller; the scheduler defines no
    /// retry logic and relies on external restart.
    pub async fn connect(config: &StoreConfig) -> Result<Self> {
        let pool = Config::from_url(&config.url)
            .builder()
            .map_err(|e| SchedulerError::Connection(e.to_string()))?
            .max_size(config.max_connections)
            .runtime(Runtime::Tokio1)
            .build()
            .map_err(|e| SchedulerError::Connection(e.to_string()))?;

        let mut conn = pool.get().await?;
        redis::cmd("PING").query_async::<String>(&mut conn).await?;

        let client = redis::Client::open(config.url.as_str())
            .map_err(|e| SchedulerError::Connection(e.to_string()))?;

        let store = Self {
            pool,
            client,
            keyspace_prefix: keys::keyspace_prefix(config.database),
        };

        if config.configure_notifications {
            store.enable_keyspace_notifications().await?;
        }

        Ok(store)
    }

    /// The keyspace-notification channel prefix for the configured database.
    #[must_use]
    pub fn keyspace_prefix(&self) -> &str {
        &self.keyspace_prefix
    }

    /// Turns on keyspace notifications for all key events.
    async fn enable_keyspace_notifications(&self) -> Result<()> {
        let mut conn = self.pool.get().await?;
        redis::cmd("CONFIG")
            .arg("SET")
            .arg("notify-keyspace-events")
            .arg("AKE")
            .query_async::<()>(&mut conn)
            .await?;
        debug!("keyspace notifications enabled");
        Ok(())
    }

    /// Subscribes to all key mutations plus the worker-ready channel and
    /// returns the notification stream.
    ///
    /// The stream ends when the pub/sub connection drops; the caller treats
    /// that as an unrecoverable connectivity failure.
    pub async fn notifications(&self) -> Result<BoxStream<'static, Notification>> {
        let mut pubsub = self
            .client
            .get_async_pubsub()
            .await
            .map_err(SchedulerError::Store)?;

        pubsub
            .psubscribe(format!("{}*", self.keyspace_prefix))
            .await?;
        pubsub.subscribe(keys::READY_FOR_NEW_TASK).await?;

        Ok(pubsub
            .into_on_message()
            .map(|msg| Notification {
                channel: msg.get_channel_name().to_owned(),
                payload: msg.get_payload::<String>().unwrap_or_default(),
            })
            .boxed())
    }
}

#[async_trait]
impl SchedulerStore for ValkeyStore {
    async fn read_list(&self, key: &str) -> Result<Vec<String>> {
        let mut conn = self.pool.get().await?;
        Ok(conn.lrange(key, 0, -1).await?)
    }

    async fn read_hash(&self, key: &str) -> Result<HashMap<String, String>> {
        let mut conn = self.pool.get().await?;
        Ok(conn.hgetall(key).await?)
    }

    async fn list_index(&self, key: &str, index: usize) -> Result<Option<String>> {
        let mut conn = self.pool.get().await?;
        // Out-of-range indexes just read as nil.
        let index = isize::try_from(index).unwrap_or(isize::MAX);
        Ok(conn.lindex(key, index).await?)
    }

    async fn pop_front(&self, key: &str) -> Result<Option<String>> {
        let mut conn = self.pool.get().await?;
        Ok(conn.lpop(key, None).await?)
    }

    async fn push_back(&self, key: &str, value: &str) -> Result<()> {
        let mut conn = self.pool.get().await?;
        conn.rpush::<_, _, ()>(key, value).await?;
        Ok(())
    }

    async fn scan_keys(&self, pattern: &str) -> Result<Vec<String>> {
        let mut conn = self.pool.get().await?;
        let mut keys = Vec::new();
        let mut cursor: u64 = 0;
        loop {
            let (next, batch): (u64, Vec<String>) = redis::cmd("SCAN")
                .arg(cursor)
                .arg("MATCH")
                .arg(pattern)
                .arg("COUNT")
                .arg(100)
                .query_async(&mut conn)
                .await?;
            keys.extend(batch);
            if next == 0 {
                break;
            }
            cursor = next;
        }
        Ok(keys)
    }
}

impl std::fmt::Debug for ValkeyStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ValkeyStore")
            .field("keyspace_prefix", &self.keyspace_prefix)
            .finish_non_exhaustive()
    }
}

/// In-memory store for tests.
///
/// Holds lists and hashes directly; tests mutate it and hand the scheduler
/// the keyspace notification the store would have published.
#[derive(Debug, Default)]
pub struct InMemoryStore {
    lists: dashmap::DashMap<String, Vec<String>>,
    hashes: dashmap::DashMap<String, HashMap<String, String>>,
}

impl InMemoryStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends to a list without going through the trait, for test setup.
    pub fn seed_list(&self, key: &str, value: &str) {
        self.lists
            .entry(key.to_owned())
            .or_default()
            .push(value.to_owned());
    }

    /// Replaces a hash wholesale, for test setup.
    pub fn seed_hash(&self, key: &str, fields: HashMap<String, String>) {
        self.hashes.insert(key.to_owned(), fields);
    }

    /// Increments an integer hash field, creating it at zero first.
    pub fn increment_hash_field(&self, key: &str, field: &str) {
        let mut hash = self.hashes.entry(key.to_owned()).or_default();
        let counter = hash.entry(field.to_owned()).or_insert_with(|| "0".to_owned());
        let value: i64 = counter.parse().unwrap_or(0);
        *counter = (value + 1).to_string();
    }
}

#[async_trait]
impl SchedulerStore for InMemoryStore {
    async fn read_list(&self, key: &str) -> Result<Vec<String>> {
        Ok(self.lists.get(key).map(|l| l.clone()).unwrap_or_default())
    }

    async fn read_hash(&self, key: &str) -> Result<HashMap<String, String>> {
        Ok(self.hashes.get(key).map(|h| h.clone()).unwrap_or_default())
    }

    async fn list_index(&self, key: &str, index: usize) -> Result<Option<String>> {
        Ok(self
            .lists
            .get(key)
            .and_then(|l| l.get(index).cloned()))
    }

    async fn pop_front(&self, key: &str) -> Result<Option<String>> {
        Ok(self.lists.get_mut(key).and_then(|mut l| {
            if l.is_empty() {
                None
            } else {
                Some(l.remove(0))
            }
        }))
    }

    async fn push_back(&self, key: &str, value: &str) -> Result<()> {
        self.seed_list(key, value);
        Ok(())
    }

    async fn scan_keys(&self, pattern: &str) -> Result<Vec<String>> {
        // Only prefix globs are used by the bootstrap scan.
        let prefix = pattern.strip_suffix('*').unwrap_or(pattern);
        let mut matches: Vec<String> = self
            .lists
            .iter()
            .map(|e| e.key().clone())
            .chain(self.hashes.iter().map(|e| e.key().clone()))
            .filter(|k| k.starts_with(prefix))
            .collect();
        matches.sort();
        Ok(matches)
    }
}
