//! In-memory scheduler state reconstructed from the change feed.
//!
//! Everything here is owned exclusively by the event loop; one notification is
//! fully applied before the next is read, so no synchronisation is needed.
//! Nothing is durable: on restart the caches start empty and are rebuilt from
//! live events (or a bootstrap scan, if enabled).

use std::collections::{HashMap, VecDeque};

use tracing::warn;

use crate::error::{Result, SchedulerError};
use crate::keys;

/// Unique task identifier.
pub type TaskId = String;
/// Unique worker identifier.
pub type WorkerId = String;
/// Unique function identifier.
pub type FunctionId = String;
/// Unique object identifier.
pub type ObjectId = String;
/// Opaque node/location identifier.
pub type NodeId = String;

/// A task's scheduling-relevant description, parsed once at submission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskRecord {
    /// Function the task invokes.
    pub function_id: FunctionId,
    /// Object ids of by-reference arguments, in slot order. By-value
    /// arguments contribute nothing and never block scheduling.
    pub dependencies: Vec<ObjectId>,
    /// Export generation the task was defined against.
    pub required_export_version: u64,
}

impl TaskRecord {
    /// Parses a task description hash.
    ///
    /// Argument slots are scanned from 0: a slot with an `arg:<i>:id` field
    /// contributes a dependency, a slot with only `arg:<i>:val` contributes
    /// nothing, and the first slot with neither ends the argument list.
    pub fn from_description(task_id: &str, fields: &HashMap<String, String>) -> Result<Self> {
        let function_id = fields
            .get(keys::FIELD_FUNCTION_ID)
            .ok_or_else(|| SchedulerError::MalformedTask {
                task_id: task_id.to_owned(),
                reason: format!("missing field {}", keys::FIELD_FUNCTION_ID),
            })?
            .clone();

        let required_export_version = fields
            .get(keys::FIELD_EXPORT_COUNTER)
            .ok_or_else(|| SchedulerError::MalformedTask {
                task_id: task_id.to_owned(),
                reason: format!("missing field {}", keys::FIELD_EXPORT_COUNTER),
            })?
            .parse::<u64>()
            .map_err(|e| SchedulerError::MalformedTask {
                task_id: task_id.to_owned(),
                reason: format!("unparseable {}: {e}", keys::FIELD_EXPORT_COUNTER),
            })?;

        let mut dependencies = Vec::new();
        let mut slot = 0;
        loop {
            if let Some(object_id) = fields.get(&keys::arg_id_field(slot)) {
                dependencies.push(object_id.clone());
            } else if !fields.contains_key(&keys::arg_val_field(slot)) {
                break;
            }
            slot += 1;
        }

        Ok(Self {
            function_id,
            dependencies,
            required_export_version,
        })
    }
}

/// Per-worker metadata.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WorkerRecord {
    /// Export generation this worker has loaded. Only ever increases.
    pub export_version: u64,
}

/// The four caches plus the two scheduling queues.
#[derive(Debug, Default)]
pub struct SchedulerState {
    /// Object id → known locations. Entry presence (even with an empty list)
    /// is the "dependency satisfied" signal; location values are preserved
    /// for surrounding systems but unused for placement in this version.
    pub object_locations: HashMap<ObjectId, Vec<NodeId>>,
    /// Function id → workers that announced capability, in announcement
    /// order. Append-only.
    pub function_capabilities: HashMap<FunctionId, Vec<WorkerId>>,
    /// Task id → parsed description. Records survive scheduling for
    /// auditing; only the unscheduled queue shrinks.
    pub tasks: HashMap<TaskId, TaskRecord>,
    /// All workers in registration order.
    pub workers: Vec<WorkerId>,
    /// Worker id → metadata.
    pub worker_info: HashMap<WorkerId, WorkerRecord>,
    /// Task ids awaiting assignment, FIFO.
    pub unscheduled: VecDeque<TaskId>,
    /// Worker ids free to accept work, readiness order.
    pub available: Vec<WorkerId>,
}

impl SchedulerState {
    /// Creates empty state.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Overwrites the cached location list for an object.
    pub fn set_object_locations(&mut self, object_id: ObjectId, locations: Vec<NodeId>) {
        self.object_locations.insert(object_id, locations);
    }

    /// Records a newly submitted task and queues it for scheduling.
    pub fn record_task(&mut self, task_id: TaskId, record: TaskRecord) {
        self.tasks.insert(task_id.clone(), record);
        self.unscheduled.push_back(task_id);
    }

    /// Registers a worker: known, export version 0, immediately available.
    pub fn register_worker(&mut self, worker_id: WorkerId) {
        self.workers.push(worker_id.clone());
        self.worker_info
            .insert(worker_id.clone(), WorkerRecord::default());
        self.available.push(worker_id);
    }

    /// Index into the `Workers` list where the next registration lands.
    #[must_use]
    pub fn known_worker_count(&self) -> usize {
        self.workers.len()
    }

    /// Appends a worker to a function's capability list.
    pub fn add_capability(&mut self, function_id: FunctionId, worker_id: WorkerId) {
        self.function_capabilities
            .entry(function_id)
            .or_default()
            .push(worker_id);
    }

    /// Length of a function's capability list; the index where the next
    /// announcement lands.
    #[must_use]
    pub fn capability_count(&self, function_id: &str) -> usize {
        self.function_capabilities
            .get(function_id)
            .map_or(0, Vec::len)
    }

    /// Increments a worker's export version by one.
    ///
    /// An increment for a worker that never registered is an anomaly and is
    /// dropped: inventing a record here would let tasks match a worker the
    /// scheduler knows nothing else about.
    pub fn bump_export_version(&mut self, worker_id: &str) {
        match self.worker_info.get_mut(worker_id) {
            Some(record) => record.export_version += 1,
            None => warn!(worker_id, "export counter bump for unknown worker"),
        }
    }

    /// Marks a worker as ready for a new task.
    ///
    /// The protocol relies on strict alternation (assigned → removed → ready
    /// → re-added); a duplicate ready signal is dropped so a worker can never
    /// appear twice in the availability queue.
    pub fn mark_ready(&mut self, worker_id: WorkerId) {
        if self.available.contains(&worker_id) {
            warn!(worker_id = %worker_id, "duplicate ready signal dropped");
            return;
        }
        self.available.push(worker_id);
    }
}
