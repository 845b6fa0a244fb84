mod common;
mod error;
#[cfg(feature = "database-mysql")]
pub mod mysql;
#[cfg(feature = "database-postgres")]
pub mod postgres;
pub mod repos;
#[cfg(feature = "database-sqlite")]
pub mod sqlite;

#[cfg(all(
    test,
    any(
        feature = "database-mysql",
        feature = "database-postgres",
        feature = "database-sqlite"
    )
))]
pub mod tests;

use std::sync::Arc;

pub use common::{TIMESTAMP_FORMAT, parse_timestamp};
pub use error::{DbError, DbResult};
pub use repos::*;

use crate::config::DatabaseConfig;

/// Cached repository trait objects, created once at startup.
struct CachedRepos {
    history: Arc<dyn HistoryRepo>,
    instances: Arc<dyn InstanceRepo>,
}

enum PoolStorage {
    #[cfg(feature = "database-mysql")]
    Mysql(sqlx::MySqlPool),
    #[cfg(feature = "database-postgres")]
    Postgres(sqlx::PgPool),
    #[cfg(feature = "database-sqlite")]
    Sqlite(sqlx::SqlitePool),
    #[cfg(not(any(
        feature = "database-mysql",
        feature = "database-postgres",
        feature = "database-sqlite"
    )))]
    _None(std::convert::Infallible),
}

/// Connection pool for one IDO database.
///
/// Repositories are cached at construction time and share the pool.
pub struct DbPool {
    inner: PoolStorage,
    repos: CachedRepos,
}

impl DbPool {
    /// Create a DbPool from an existing MySQL pool.
    #[cfg(feature = "database-mysql")]
    pub fn from_mysql(pool: sqlx::MySqlPool, table_prefix: &str) -> Self {
        let repos = CachedRepos {
            history: Arc::new(mysql::MysqlHistoryRepo::new(pool.clone(), table_prefix)),
            instances: Arc::new(mysql::MysqlInstanceRepo::new(pool.clone(), table_prefix)),
        };
        DbPool {
            inner: PoolStorage::Mysql(pool),
            repos,
        }
    }

    /// Create a DbPool from an existing PostgreSQL pool.
    #[cfg(feature = "database-postgres")]
    pub fn from_postgres(pool: sqlx::PgPool, table_prefix: &str) -> Self {
        let repos = CachedRepos {
            history: Arc::new(postgres::PostgresHistoryRepo::new(
                pool.clone(),
                table_prefix,
            )),
            instances: Arc::new(postgres::PostgresInstanceRepo::new(
                pool.clone(),
                table_prefix,
            )),
        };
        DbPool {
            inner: PoolStorage::Postgres(pool),
            repos,
        }
    }

    /// Create a DbPool from an existing SQLite pool.
    /// Primarily useful for testing.
    #[cfg(feature = "database-sqlite")]
    pub fn from_sqlite(pool: sqlx::SqlitePool, table_prefix: &str) -> Self {
        let repos = CachedRepos {
            history: Arc::new(sqlite::SqliteHistoryRepo::new(pool.clone(), table_prefix)),
            instances: Arc::new(sqlite::SqliteInstanceRepo::new(pool.clone(), table_prefix)),
        };
        DbPool {
            inner: PoolStorage::Sqlite(pool),
            repos,
        }
    }

    /// Connect to the configured database.
    ///
    /// Pools are kept small: rounds run one statement at a time.
    pub async fn from_config(config: &DatabaseConfig, table_prefix: &str) -> DbResult<Self> {
        match config {
            DatabaseConfig::None => Err(DbError::NotConfigured),
            #[cfg(feature = "database-mysql")]
            DatabaseConfig::Mysql(cfg) => {
                let pool = sqlx::mysql::MySqlPoolOptions::new()
                    .max_connections(cfg.max_connections)
                    .max_lifetime(cfg.max_lifetime())
                    .acquire_timeout(cfg.acquire_timeout())
                    .connect(&cfg.url)
                    .await?;
                Ok(Self::from_mysql(pool, table_prefix))
            }
            #[cfg(feature = "database-postgres")]
            DatabaseConfig::Postgres(cfg) => {
                let pool = sqlx::postgres::PgPoolOptions::new()
                    .max_connections(cfg.max_connections)
                    .max_lifetime(cfg.max_lifetime())
                    .acquire_timeout(cfg.acquire_timeout())
                    .connect(&cfg.url)
                    .await?;
                Ok(Self::from_postgres(pool, table_prefix))
            }
            #[cfg(feature = "database-sqlite")]
            DatabaseConfig::Sqlite(cfg) => {
                let pool = sqlx::sqlite::SqlitePoolOptions::new()
                    .max_connections(1)
                    .connect_with(
                        sqlx::sqlite::SqliteConnectOptions::new()
                            .filename(&cfg.path)
                            .busy_timeout(std::time::Duration::from_millis(cfg.busy_timeout_ms)),
                    )
                    .await?;
                Ok(Self::from_sqlite(pool, table_prefix))
            }
        }
    }

    pub fn history(&self) -> Arc<dyn HistoryRepo> {
        Arc::clone(&self.repos.history)
    }

    pub fn instances(&self) -> Arc<dyn InstanceRepo> {
        Arc::clone(&self.repos.instances)
    }

    /// Check that the database answers a trivial query.
    pub async fn health_check(&self) -> DbResult<()> {
        match &self.inner {
            #[cfg(feature = "database-mysql")]
            PoolStorage::Mysql(pool) => {
                sqlx::query("SELECT 1").execute(pool).await?;
                Ok(())
            }
            #[cfg(feature = "database-postgres")]
            PoolStorage::Postgres(pool) => {
                sqlx::query("SELECT 1").execute(pool).await?;
                Ok(())
            }
            #[cfg(feature = "database-sqlite")]
            PoolStorage::Sqlite(pool) => {
                sqlx::query("SELECT 1").execute(pool).await?;
                Ok(())
            }
            #[cfg(not(any(
                feature = "database-mysql",
                feature = "database-postgres",
                feature = "database-sqlite"
            )))]
            PoolStorage::_None(infallible) => match *infallible {},
        }
    }

    /// Close all pooled connections.
    pub async fn close(&self) {
        match &self.inner {
            #[cfg(feature = "database-mysql")]
            PoolStorage::Mysql(pool) => pool.close().await,
            #[cfg(feature = "database-postgres")]
            PoolStorage::Postgres(pool) => pool.close().await,
            #[cfg(feature = "database-sqlite")]
            PoolStorage::Sqlite(pool) => pool.close().await,
            #[cfg(not(any(
                feature = "database-mysql",
                feature = "database-postgres",
                feature = "database-sqlite"
            )))]
            PoolStorage::_None(infallible) => match *infallible {},
        }
    }
}
