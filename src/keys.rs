//! Key-space schema shared with the rest of the platform.
//!
//! The scheduler never owns these keys; it reads what submitters, workers and
//! the object store write, and appends to per-worker task queues. Names here
//! must stay in lockstep with the worker and client libraries.

/// Global submission queue of task ids, consumed FIFO by the scheduler.
pub const GLOBAL_TASK_QUEUE: &str = "GlobalTaskQueue";

/// Append-only list of worker ids, pushed as workers register.
pub const WORKERS: &str = "Workers";

/// Direct channel on which a worker publishes its own id when it is ready
/// for a new task. Not a keyspace event.
pub const READY_FOR_NEW_TASK: &str = "ReadyForNewTask";

/// Prefix of per-object location lists (`Object:<objectId>`).
pub const OBJECT_PREFIX: &str = "Object:";

/// Prefix of per-function capability lists (`FunctionTable:<functionId>`).
pub const FUNCTION_TABLE_PREFIX: &str = "FunctionTable:";

/// Prefix of per-worker info hashes (`WorkerInfo:<workerId>`).
pub const WORKER_INFO_PREFIX: &str = "WorkerInfo:";

/// Prefix of per-task description hashes (`graph:<taskId>`).
pub const TASK_DESCRIPTION_PREFIX: &str = "graph:";

/// Hash field holding a task's function id.
pub const FIELD_FUNCTION_ID: &str = "function_id";

/// Hash field holding a task's required export generation, and the
/// `WorkerInfo` field incremented as a worker loads newly exported code.
pub const FIELD_EXPORT_COUNTER: &str = "export_counter";

/// Keyspace mutation kinds the dispatcher recognises.
pub const KIND_RPUSH: &str = "rpush";
pub const KIND_HINCRBY: &str = "hincrby";

/// Returns the description hash key for a task.
#[must_use]
pub fn task_description_key(task_id: &str) -> String {
    format!("{TASK_DESCRIPTION_PREFIX}{task_id}")
}

/// Returns the inbound task queue key for a worker.
#[must_use]
pub fn worker_queue_key(worker_id: &str) -> String {
    format!("TaskQueue:Worker{worker_id}")
}

/// Returns the keyspace-notification channel prefix for a database index,
/// e.g. `__keyspace@0__:`.
#[must_use]
pub fn keyspace_prefix(database: u32) -> String {
    format!("__keyspace@{database}__:")
}

/// Hash field names for the positional argument slots of a task description.
///
/// Slot `i` carries `arg:<i>:id` for a by-reference argument or `arg:<i>:val`
/// for a by-value one; the first slot with neither ends the argument list.
#[must_use]
pub fn arg_id_field(slot: usize) -> String {
    format!("arg:{slot}:id")
}

/// See [`arg_id_field`].
#[must_use]
pub fn arg_val_field(slot: usize) -> String {
    format!("arg:{slot}:val")
}
