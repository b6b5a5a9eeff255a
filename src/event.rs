//! Change-feed notifications and their classification.
//!
//! The scheduler's only input is the store's notification stream: keyspace
//! events (channel `__keyspace@<db>__:<key>`, payload = mutation kind) plus
//! the `ReadyForNewTask` application channel (payload = worker id).
//! [`SchedulerEvent::classify`] is the dispatcher's pattern match; anything it
//! does not recognise is a no-op and triggers no match pass.

use crate::keys;

/// A single notification delivered by the change feed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    /// Channel the message arrived on.
    pub channel: String,
    /// Message payload: the mutation kind for keyspace events, the worker id
    /// for `ReadyForNewTask`.
    pub payload: String,
}

impl Notification {
    /// Creates a notification.
    pub fn new(channel: impl Into<String>, payload: impl Into<String>) -> Self {
        Self {
            channel: channel.into(),
            payload: payload.into(),
        }
    }

    /// Creates a keyspace notification for a key mutation.
    pub fn keyspace(prefix: &str, key: &str, kind: &str) -> Self {
        Self::new(format!("{prefix}{key}"), kind)
    }
}

/// A recognised event shape, ready for the dispatcher.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SchedulerEvent {
    /// Any mutation on an `Object:<id>` location list.
    ObjectLocationsChanged {
        /// Store key of the mutated list.
        key: String,
        /// Object whose locations changed.
        object_id: String,
    },
    /// A task id was appended to the global submission queue.
    TaskSubmitted,
    /// A worker id was appended to the worker registry list.
    WorkerRegistered,
    /// A worker id was appended to a `FunctionTable:<id>` capability list.
    CapabilityAnnounced {
        /// Store key of the capability list.
        key: String,
        /// Function the capability is for.
        function_id: String,
    },
    /// A worker's `WorkerInfo` export counter was incremented.
    ExportCounterBumped {
        /// Worker whose counter was incremented.
        worker_id: String,
    },
    /// A worker signalled readiness for a new task.
    WorkerReady {
        /// The ready worker.
        worker_id: String,
    },
    /// Anything else; no cache change, no match pass.
    Unrecognised,
}

impl SchedulerEvent {
    /// Classifies a notification by channel-name pattern and mutation kind.
    ///
    /// `keyspace_prefix` is the channel prefix for the configured database,
    /// see [`keys::keyspace_prefix`].
    #[must_use]
    pub fn classify(note: &Notification, keyspace_prefix: &str) -> Self {
        if note.channel == keys::READY_FOR_NEW_TASK {
            return Self::WorkerReady {
                worker_id: note.payload.clone(),
            };
        }

        let Some(key) = note.channel.strip_prefix(keyspace_prefix) else {
            return Self::Unrecognised;
        };

        if let Some(object_id) = key.strip_prefix(keys::OBJECT_PREFIX) {
            return Self::ObjectLocationsChanged {
                key: key.to_owned(),
                object_id: object_id.to_owned(),
            };
        }

        if key == keys::GLOBAL_TASK_QUEUE && note.payload == keys::KIND_RPUSH {
            return Self::TaskSubmitted;
        }

        if key == keys::WORKERS && note.payload == keys::KIND_RPUSH {
            return Self::WorkerRegistered;
        }

        if let Some(function_id) = key.strip_prefix(keys::FUNCTION_TABLE_PREFIX) {
            if note.payload == keys::KIND_RPUSH {
                return Self::CapabilityAnnounced {
                    key: key.to_owned(),
                    function_id: function_id.to_owned(),
                };
            }
            return Self::Unrecognised;
        }

        if let Some(worker_id) = key.strip_prefix(keys::WORKER_INFO_PREFIX) {
            if note.payload == keys::KIND_HINCRBY {
                return Self::ExportCounterBumped {
                    worker_id: worker_id.to_owned(),
                };
            }
            return Self::Unrecognised;
        }

        Self::Unrecognised
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PREFIX: &str = "__keyspace@0__:";

    fn classify(channel: &str, payload: &str) -> SchedulerEvent {
        SchedulerEvent::classify(&Notification::new(channel, payload), PREFIX)
    }

    #[test]
    fn object_mutation_any_kind() {
        for kind in ["rpush", "lpush", "del", "lrem"] {
            let event = classify("__keyspace@0__:Object:obj-1", kind);
            assert_eq!(
                event,
                SchedulerEvent::ObjectLocationsChanged {
                    key: "Object:obj-1".to_owned(),
                    object_id: "obj-1".to_owned(),
                }
            );
        }
    }

    #[test]
    fn task_submission_requires_rpush() {
        assert_eq!(
            classify("__keyspace@0__:GlobalTaskQueue", "rpush"),
            SchedulerEvent::TaskSubmitted
        );
        // The scheduler's own LPOP echoes back as a keyspace event; it must
        // not be mistaken for a submission.
        assert_eq!(
            classify("__keyspace@0__:GlobalTaskQueue", "lpop"),
            SchedulerEvent::Unrecognised
        );
    }

    #[test]
    fn worker_registration() {
        assert_eq!(
            classify("__keyspace@0__:Workers", "rpush"),
            SchedulerEvent::WorkerRegistered
        );
        assert_eq!(
            classify("__keyspace@0__:Workers", "del"),
            SchedulerEvent::Unrecognised
        );
    }

    #[test]
    fn capability_announcement() {
        assert_eq!(
            classify("__keyspace@0__:FunctionTable:fn-1", "rpush"),
            SchedulerEvent::CapabilityAnnounced {
                key: "FunctionTable:fn-1".to_owned(),
                function_id: "fn-1".to_owned(),
            }
        );
        assert_eq!(
            classify("__keyspace@0__:FunctionTable:fn-1", "del"),
            SchedulerEvent::Unrecognised
        );
    }

    #[test]
    fn export_counter_bump_requires_hincrby() {
        assert_eq!(
            classify("__keyspace@0__:WorkerInfo:w-1", "hincrby"),
            SchedulerEvent::ExportCounterBumped {
                worker_id: "w-1".to_owned(),
            }
        );
        assert_eq!(
            classify("__keyspace@0__:WorkerInfo:w-1", "hset"),
            SchedulerEvent::Unrecognised
        );
    }

    #[test]
    fn ready_channel_carries_worker_id() {
        let event = SchedulerEvent::classify(
            &Notification::new("ReadyForNewTask", "w-7"),
            PREFIX,
        );
        assert_eq!(
            event,
            SchedulerEvent::WorkerReady {
                worker_id: "w-7".to_owned(),
            }
        );
    }

    #[test]
    fn foreign_channels_and_databases_ignored() {
        assert_eq!(
            classify("__keyspace@1__:Workers", "rpush"),
            SchedulerEvent::Unrecognised
        );
        assert_eq!(classify("log:2026", "hset"), SchedulerEvent::Unrecognised);
        assert_eq!(
            classify("__keyspace@0__:TaskQueue:Workerw-1", "rpush"),
            SchedulerEvent::Unrecognised
        );
    }
}
