//! The match pass: one greedy assignment sweep over the scheduler state.

use tracing::trace;

use crate::state::{SchedulerState, TaskId, TaskRecord, WorkerId};

/// A single task→worker assignment produced by a match pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Assignment {
    /// The matched task.
    pub task_id: TaskId,
    /// The worker it was assigned to.
    pub worker_id: WorkerId,
}

/// Returns true if `worker_id` can run `task` right now.
///
/// All four gates must hold: the function is known at all, the worker's
/// loaded export generation is new enough, the worker itself announced
/// capability for the function, and every by-reference dependency has a
/// present entry in the object location cache (an empty location list still
/// counts as present).
#[must_use]
pub fn compatible(state: &SchedulerState, worker_id: &str, task: &TaskRecord) -> bool {
    let Some(capable_workers) = state.function_capabilities.get(&task.function_id) else {
        return false;
    };

    let Some(worker) = state.worker_info.get(worker_id) else {
        return false;
    };
    if worker.export_version < task.required_export_version {
        return false;
    }

    if !capable_workers.iter().any(|w| w == worker_id) {
        return false;
    }

    task.dependencies
        .iter()
        .all(|object_id| state.object_locations.contains_key(object_id))
}

/// Runs one greedy, first-fit match pass.
///
/// Tasks are considered in FIFO submission order; for each, workers are
/// scanned in readiness order and the earliest compatible one wins. A matched
/// worker is removed from availability immediately so it cannot be matched
/// twice in the same pass; matched tasks leave the unscheduled queue after
/// the sweep with the relative order of the rest preserved. Tasks that match
/// nothing simply stay queued and are re-evaluated on the next pass.
pub fn run_match_pass(state: &mut SchedulerState) -> Vec<Assignment> {
    let mut assignments = Vec::new();

    let queue: Vec<TaskId> = state.unscheduled.iter().cloned().collect();
    for task_id in queue {
        let Some(task) = state.tasks.get(&task_id).cloned() else {
            continue;
        };

        let matched = state
            .available
            .iter()
            .position(|worker_id| compatible(state, worker_id, &task));

        if let Some(index) = matched {
            let worker_id = state.available.remove(index);
            trace!(task_id = %task_id, worker_id = %worker_id, "matched");
            assignments.push(Assignment { task_id, worker_id });
        }
    }

    if !assignments.is_empty() {
        let matched: Vec<&TaskId> = assignments.iter().map(|a| &a.task_id).collect();
        state
            .unscheduled
            .retain(|task_id| !matched.contains(&task_id));
    }

    assignments
}
