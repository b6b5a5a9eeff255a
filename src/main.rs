//! Meridian scheduler binary.
//!
//! Connects to the shared store, subscribes to its change feed and runs the
//! scheduling loop until the connection is lost. Connectivity loss is fatal
//! by design: the process exits non-zero and external supervision restarts
//! it with empty caches.

use figment::providers::{Env, Format, Toml};
use figment::Figment;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use meridian_scheduler::{Scheduler, SchedulerConfig, ValkeyStore};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialise tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::from_default_env().add_directive("meridian_scheduler=info".parse()?),
        )
        .init();

    info!("Meridian scheduler starting");

    // Load configuration
    let config: SchedulerConfig = Figment::new()
        .merge(Toml::file("scheduler.toml"))
        .merge(Env::prefixed("SCHEDULER_").split("_"))
        .extract()?;

    info!(url = %config.store.url, database = config.store.database, "Configuration loaded");

    let store = match ValkeyStore::connect(&config.store).await {
        Ok(store) => {
            info!("Connected to store");
            store
        }
        Err(e) => {
            error!(error = %e, "Failed to connect to store");
            return Err(e.into());
        }
    };

    // Subscribe before any bootstrap scan so mutations that land during the
    // scan are still observed.
    let feed = store.notifications().await?;
    let keyspace_prefix = store.keyspace_prefix().to_owned();

    let mut scheduler = Scheduler::new(store, keyspace_prefix);

    if config.bootstrap.seed_on_start {
        scheduler.bootstrap().await?;
    }

    info!("Listening for change-feed events");
    let result = scheduler.run(feed).await;

    // run() only returns on connectivity loss.
    if let Err(e) = result {
        error!(error = %e, "Scheduler stopped");
        return Err(e.into());
    }
    Ok(())
}
