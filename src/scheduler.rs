//! The event loop: dispatch one notification, update caches, run a match
//! pass, emit assignments.

use futures_util::stream::{Stream, StreamExt};
use tracing::{debug, info, trace, warn};

use crate::error::{Result, SchedulerError};
use crate::event::{Notification, SchedulerEvent};
use crate::keys;
use crate::matcher::{run_match_pass, Assignment};
use crate::state::{SchedulerState, TaskRecord};
use crate::store::SchedulerStore;

/// The global scheduler: owned state plus a handle to the shared store.
///
/// Strictly serial: one notification is fully processed (cache mutation,
/// match pass, assignment pushes) before the next is read, so the state
/// needs no synchronisation.
#[derive(Debug)]
pub struct Scheduler<S> {
    store: S,
    state: SchedulerState,
    keyspace_prefix: String,
}

impl<S: SchedulerStore> Scheduler<S> {
    /// Creates a scheduler with empty caches.
    pub fn new(store: S, keyspace_prefix: impl Into<String>) -> Self {
        Self {
            store,
            state: SchedulerState::new(),
            keyspace_prefix: keyspace_prefix.into(),
        }
    }

    /// Read access to the caches, for tests and diagnostics.
    #[must_use]
    pub fn state(&self) -> &SchedulerState {
        &self.state
    }

    /// Consumes the scheduler, returning the store.
    pub fn into_store(self) -> S {
        self.store
    }

    /// Seeds caches from the store's current contents.
    ///
    /// Workers are registered with export version 0 and marked available;
    /// capability and object-location lists are read wholesale; the global
    /// queue is drained into the unscheduled set. A match pass runs at the
    /// end so pre-existing work is assigned immediately.
    pub async fn bootstrap(&mut self) -> Result<()> {
        for worker_id in self.store.read_list(keys::WORKERS).await? {
            self.state.register_worker(worker_id);
        }

        for key in self
            .store
            .scan_keys(&format!("{}*", keys::FUNCTION_TABLE_PREFIX))
            .await?
        {
            let Some(function_id) = key.strip_prefix(keys::FUNCTION_TABLE_PREFIX) else {
                continue;
            };
            let function_id = function_id.to_owned();
            for worker_id in self.store.read_list(&key).await? {
                self.state.add_capability(function_id.clone(), worker_id);
            }
        }

        for key in self
            .store
            .scan_keys(&format!("{}*", keys::OBJECT_PREFIX))
            .await?
        {
            let Some(object_id) = key.strip_prefix(keys::OBJECT_PREFIX) else {
                continue;
            };
            let object_id = object_id.to_owned();
            let locations = self.store.read_list(&key).await?;
            self.state.set_object_locations(object_id, locations);
        }

        while let Some(task_id) = self.store.pop_front(keys::GLOBAL_TASK_QUEUE).await? {
            self.ingest_task(task_id).await?;
        }

        info!(
            workers = self.state.known_worker_count(),
            functions = self.state.function_capabilities.len(),
            objects = self.state.object_locations.len(),
            unscheduled = self.state.unscheduled.len(),
            "caches seeded from store"
        );

        self.dispatch_assignments().await
    }

    /// Processes one notification to completion.
    pub async fn handle(&mut self, note: &Notification) -> Result<()> {
        let event = SchedulerEvent::classify(note, &self.keyspace_prefix);
        if matches!(event, SchedulerEvent::Unrecognised) {
            trace!(channel = %note.channel, "unrecognised notification");
            return Ok(());
        }

        self.apply(event).await?;
        self.dispatch_assignments().await
    }

    /// Runs the loop until the feed ends, which only happens when the store
    /// connection is lost.
    pub async fn run(&mut self, feed: impl Stream<Item = Notification>) -> Result<()> {
        futures_util::pin_mut!(feed);
        while let Some(note) = feed.next().await {
            self.handle(&note).await?;
        }
        Err(SchedulerError::Connection(
            "notification stream ended".to_owned(),
        ))
    }

    /// Applies one recognised event's cache update.
    async fn apply(&mut self, event: SchedulerEvent) -> Result<()> {
        match event {
            SchedulerEvent::ObjectLocationsChanged { key, object_id } => {
                let locations = self.store.read_list(&key).await?;
                trace!(object_id = %object_id, locations = locations.len(), "object locations updated");
                self.state.set_object_locations(object_id, locations);
            }
            SchedulerEvent::TaskSubmitted => {
                match self.store.pop_front(keys::GLOBAL_TASK_QUEUE).await? {
                    Some(task_id) => self.ingest_task(task_id).await?,
                    // Raced with a bootstrap drain or a duplicate event.
                    None => warn!("submission event but the global queue was empty"),
                }
            }
            SchedulerEvent::WorkerRegistered => {
                let index = self.state.known_worker_count();
                match self.store.list_index(keys::WORKERS, index).await? {
                    Some(worker_id) => {
                        info!(worker_id = %worker_id, "worker registered");
                        self.state.register_worker(worker_id);
                    }
                    None => warn!(index, "worker registry shorter than expected"),
                }
            }
            SchedulerEvent::CapabilityAnnounced { key, function_id } => {
                let index = self.state.capability_count(&function_id);
                match self.store.list_index(&key, index).await? {
                    Some(worker_id) => {
                        debug!(function_id = %function_id, worker_id = %worker_id, "capability announced");
                        self.state.add_capability(function_id, worker_id);
                    }
                    None => warn!(
                        function_id = %function_id,
                        index,
                        "capability list shorter than expected"
                    ),
                }
            }
            SchedulerEvent::ExportCounterBumped { worker_id } => {
                self.state.bump_export_version(&worker_id);
            }
            SchedulerEvent::WorkerReady { worker_id } => {
                debug!(worker_id = %worker_id, "worker ready");
                self.state.mark_ready(worker_id);
            }
            SchedulerEvent::Unrecognised => {}
        }
        Ok(())
    }

    /// Fetches, parses and queues one popped task id.
    ///
    /// A missing or malformed description is a data-integrity anomaly: the
    /// task id is dropped with a warning and the loop continues.
    async fn ingest_task(&mut self, task_id: String) -> Result<()> {
        let description = self
            .store
            .read_hash(&keys::task_description_key(&task_id))
            .await?;

        if description.is_empty() {
            warn!(task_id = %task_id, "popped task id has no description; dropping");
            return Ok(());
        }

        match TaskRecord::from_description(&task_id, &description) {
            Ok(record) => {
                debug!(
                    task_id = %task_id,
                    function_id = %record.function_id,
                    dependencies = record.dependencies.len(),
                    required_export_version = record.required_export_version,
                    "task submitted"
                );
                self.state.record_task(task_id, record);
            }
            Err(e) => warn!(task_id = %task_id, error = %e, "dropping unusable task"),
        }
        Ok(())
    }

    /// Runs a match pass and pushes each assignment onto the matched
    /// worker's inbound queue.
    async fn dispatch_assignments(&mut self) -> Result<()> {
        let assignments = run_match_pass(&mut self.state);
        for Assignment { task_id, worker_id } in assignments {
            info!(task_id = %task_id, worker_id = %worker_id, "task assigned");
            self.store
                .push_back(&keys::worker_queue_key(&worker_id), &task_id)
                .await?;
        }
        Ok(())
    }
}
