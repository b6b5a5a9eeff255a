//! Common test utilities for scheduler integration tests.

pub mod fixtures;

use std::collections::HashMap;
use std::sync::Arc;

use meridian_scheduler::store::InMemoryStore;
use meridian_scheduler::{keys, Notification, Scheduler, SchedulerStore};

/// A scheduler wired to a shared in-memory store.
///
/// Tests mutate the store the way the platform's other components would,
/// then hand the scheduler the keyspace notification the store would have
/// published, so every path from classification to assignment is exercised.
pub struct TestCluster {
    pub store: Arc<InMemoryStore>,
    pub scheduler: Scheduler<Arc<InMemoryStore>>,
    prefix: String,
}

impl TestCluster {
    /// Creates a cluster with empty store and caches.
    pub fn new() -> Self {
        let store = Arc::new(InMemoryStore::new());
        let prefix = keys::keyspace_prefix(0);
        let scheduler = Scheduler::new(store.clone(), prefix.clone());
        Self {
            store,
            scheduler,
            prefix,
        }
    }

    /// Delivers a raw notification to the scheduler.
    pub async fn emit(&mut self, channel: &str, payload: &str) {
        self.scheduler
            .handle(&Notification::new(channel, payload))
            .await
            .unwrap();
    }

    /// Delivers a keyspace notification for a key mutation.
    pub async fn emit_keyspace(&mut self, key: &str, kind: &str) {
        let channel = format!("{}{}", self.prefix, key);
        self.emit(&channel, kind).await;
    }

    /// Registers a worker: appends to the `Workers` list and notifies.
    pub async fn register_worker(&mut self, worker_id: &str) {
        self.store.seed_list(keys::WORKERS, worker_id);
        self.emit_keyspace(keys::WORKERS, keys::KIND_RPUSH).await;
    }

    /// Announces a worker's capability for a function.
    pub async fn announce_capability(&mut self, function_id: &str, worker_id: &str) {
        let key = format!("{}{}", keys::FUNCTION_TABLE_PREFIX, function_id);
        self.store.seed_list(&key, worker_id);
        self.emit_keyspace(&key, keys::KIND_RPUSH).await;
    }

    /// Submits a task: writes its description hash, appends its id to the
    /// global queue, and notifies.
    pub async fn submit_task(&mut self, task_id: &str, description: HashMap<String, String>) {
        self.store
            .seed_hash(&keys::task_description_key(task_id), description);
        self.submit_task_id_only(task_id).await;
    }

    /// Appends a task id to the global queue without writing a description.
    pub async fn submit_task_id_only(&mut self, task_id: &str) {
        self.store.seed_list(keys::GLOBAL_TASK_QUEUE, task_id);
        self.emit_keyspace(keys::GLOBAL_TASK_QUEUE, keys::KIND_RPUSH)
            .await;
    }

    /// Publishes object locations and notifies the mutation.
    pub async fn publish_object(&mut self, object_id: &str, locations: &[&str]) {
        let key = format!("{}{}", keys::OBJECT_PREFIX, object_id);
        for location in locations {
            self.store.seed_list(&key, location);
        }
        self.emit_keyspace(&key, keys::KIND_RPUSH).await;
    }

    /// Increments a worker's export counter and notifies.
    pub async fn bump_export(&mut self, worker_id: &str) {
        let key = format!("{}{}", keys::WORKER_INFO_PREFIX, worker_id);
        self.store
            .increment_hash_field(&key, keys::FIELD_EXPORT_COUNTER);
        self.emit_keyspace(&key, keys::KIND_HINCRBY).await;
    }

    /// Signals that a worker is ready for a new task.
    pub async fn signal_ready(&mut self, worker_id: &str) {
        self.emit(keys::READY_FOR_NEW_TASK, worker_id).await;
    }

    /// Returns the task ids assigned to a worker, in assignment order.
    pub async fn assigned(&self, worker_id: &str) -> Vec<String> {
        self.store
            .read_list(&keys::worker_queue_key(worker_id))
            .await
            .unwrap()
    }
}

impl Default for TestCluster {
    fn default() -> Self {
        Self::new()
    }
}
