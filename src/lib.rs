//! Meridian global scheduler - task-to-worker assignment driven by a shared
//! store's change feed.
//!
//! The scheduler is responsible for:
//!
//! - **Cache reconstruction**: Rebuilding object-location, capability, task
//!   and worker caches purely from keyspace notifications
//! - **Dispatch**: Classifying each notification and applying the matching
//!   cache update
//! - **Matching**: Greedy first-fit assignment of unscheduled tasks to
//!   available workers, gated by capability, export version and dependency
//!   presence
//! - **Assignment emission**: Pushing each matched task id onto the worker's
//!   inbound queue in the store
//!
//! # Architecture
//!
//! A single event loop owns all state: the store's pub/sub feed is the only
//! input, per-worker task queues the only output. One notification is fully
//! processed before the next is read, so no locking is needed anywhere.
//!
//! # Example
//!
//! ```ignore
//! use meridian_scheduler::{Scheduler, SchedulerConfig, ValkeyStore};
//!
//! let config = SchedulerConfig::default();
//! let store = ValkeyStore::connect(&config.store).await?;
//! let feed = store.notifications().await?;
//! let prefix = store.keyspace_prefix().to_owned();
//! Scheduler::new(store, prefix).run(feed).await?;
//! ```

pub mod config;
pub mod error;
pub mod event;
pub mod keys;
pub mod matcher;
pub mod scheduler;
pub mod state;
pub mod store;

// Re-export main types
pub use config::{BootstrapConfig, SchedulerConfig, StoreConfig};
pub use error::{Result, SchedulerError};
pub use event::{Notification, SchedulerEvent};
pub use matcher::{compatible, run_match_pass, Assignment};
pub use scheduler::Scheduler;
pub use state::{SchedulerState, TaskRecord, WorkerRecord};
pub use store::{InMemoryStore, SchedulerStore, ValkeyStore};
