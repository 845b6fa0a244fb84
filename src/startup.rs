//! Daemon bootstrap: observability, database connection, instance lookup.
//!
//! Every failure here is fatal and happens before the first round, so no
//! table is touched unless the instance was resolved.

use thiserror::Error;

use crate::{
    config::{ConfigError, DaemonConfig, ObservabilityConfig},
    db::{DbError, DbPool, InstanceId, InstanceRepo},
    observability::{self, TracingError},
    retention::{CleanupRound, Intervals, RetentionPolicy, Scheduler},
};

#[derive(Debug, Error)]
pub enum StartupError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("Could not connect to database: {0}")]
    Connect(#[source] DbError),

    #[error("Could not find instance '{0}'")]
    InstanceNotFound(String),

    #[error("Could not look up instance '{name}': {source}")]
    InstanceLookup {
        name: String,
        #[source]
        source: DbError,
    },

    #[error(transparent)]
    Tracing(#[from] TracingError),
}

/// Install logging and, if enabled, the metrics exporter.
///
/// A metrics failure is logged and otherwise ignored.
pub fn init_observability(config: &ObservabilityConfig) -> Result<(), StartupError> {
    observability::init_tracing(&config.logging)?;

    if let Err(e) = observability::metrics::init_metrics(&config.metrics) {
        tracing::warn!(error = %e, "Failed to initialize metrics: {e}");
    }
    Ok(())
}

/// Connect to the configured database and check that it answers.
pub async fn connect(config: &DaemonConfig) -> Result<DbPool, StartupError> {
    let db = DbPool::from_config(&config.database, &config.cleanup.table_prefix)
        .await
        .map_err(StartupError::Connect)?;
    db.health_check().await.map_err(StartupError::Connect)?;

    tracing::debug!(database = config.database.kind(), "Connected to database");
    Ok(db)
}

/// Translate an instance name into its id.
pub async fn resolve_instance(
    instances: &dyn InstanceRepo,
    name: &str,
) -> Result<InstanceId, StartupError> {
    match instances.find_id(name).await {
        Ok(Some(id)) => {
            tracing::debug!(instance = name, instance_id = id, "Resolved instance");
            Ok(id)
        }
        Ok(None) => Err(StartupError::InstanceNotFound(name.to_string())),
        Err(source) => Err(StartupError::InstanceLookup {
            name: name.to_string(),
            source,
        }),
    }
}

/// Build the cleanup round for a resolved instance.
pub fn build_round(db: &DbPool, config: &DaemonConfig, instance_id: InstanceId) -> CleanupRound {
    CleanupRound::new(
        db.history(),
        RetentionPolicy::from_config(&config.retention),
        instance_id,
        config.cleanup.limit,
    )
    .with_dry_run(config.cleanup.dry_run)
}

/// Resolve the instance and build the scheduler on an open pool.
pub async fn build_scheduler(db: &DbPool, config: &DaemonConfig) -> Result<Scheduler, StartupError> {
    let instance_id = resolve_instance(db.instances().as_ref(), &config.cleanup.instance).await?;
    let round = build_round(db, config, instance_id);

    Ok(Scheduler::new(
        round,
        Intervals::from_config(&config.cleanup),
        config.cleanup.once,
    ))
}

/// Connect and build the scheduler.
///
/// The pool is returned so the caller can close it after the scheduler
/// stops.
pub async fn bootstrap(config: &DaemonConfig) -> Result<(DbPool, Scheduler), StartupError> {
    config.validate()?;
    let db = connect(config).await?;
    let scheduler = build_scheduler(&db, config).await?;
    Ok((db, scheduler))
}
