// PostgreSQL connection pool with pre-ping and health checks

use crate::config::DatabaseConfig;
use crate::errors::DatabaseError;
use sqlx::pool::PoolConnection;
use sqlx::postgres::{PgConnectOptions, PgPool, PgPoolOptions};
use sqlx::{ConnectOptions, Postgres};
use std::str::FromStr;
use std::time::Duration;
use tracing::{info, instrument};

/// Database connection pool wrapper
///
/// Cloning is cheap and shares the same underlying pool. The pool doubles as the
/// session factory: request handlers check out a connection with [`DbPool::session`].
#[derive(Debug, Clone)]
pub struct DbPool {
    pool: PgPool,
}

impl DbPool {
    /// Create a new database connection pool and open the first connection
    ///
    /// # Errors
    /// Returns `DatabaseError::InvalidUrl` if the URL cannot be parsed, and
    /// `DatabaseError::ConnectionFailed` if no connection can be established
    #[instrument(skip(config), fields(max_connections = config.max_connections))]
    pub async fn new(config: &DatabaseConfig) -> Result<Self, DatabaseError> {
        info!("Initializing database connection pool");

        let pool = pool_options(config)
            .connect_with(connect_options(config)?)
            .await
            .map_err(|e| DatabaseError::ConnectionFailed(e.to_string()))?;

        info!(
            max_connections = config.max_connections,
            min_connections = config.min_connections,
            "Database connection pool initialized successfully"
        );

        Ok(Self { pool })
    }

    /// Create a pool without opening any connection until first use
    pub fn connect_lazy(config: &DatabaseConfig) -> Result<Self, DatabaseError> {
        let pool = pool_options(config).connect_lazy_with(connect_options(config)?);
        Ok(Self { pool })
    }

    /// Get a reference to the underlying pool
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Check out one pooled connection for the duration of a unit of work
    pub async fn session(&self) -> Result<PoolConnection<Postgres>, DatabaseError> {
        self.pool.acquire().await.map_err(DatabaseError::from_check)
    }

    /// Open a short-lived session and run `SELECT 1` on it
    ///
    /// The session is returned to the pool when this function returns.
    #[instrument(skip(self))]
    pub async fn health_check(&self) -> Result<(), DatabaseError> {
        let mut session = self.session().await?;

        sqlx::query("SELECT 1")
            .execute(&mut *session)
            .await
            .map_err(DatabaseError::from_check)?;

        tracing::debug!("Database health check passed");
        Ok(())
    }

    /// [`DbPool::health_check`] bounded by `limit`
    ///
    /// Running out of time counts as `DatabaseError::Unavailable`, so a caller never
    /// waits out the pool's full acquire timeout.
    pub async fn health_check_within(&self, limit: Duration) -> Result<(), DatabaseError> {
        tokio::time::timeout(limit, self.health_check())
            .await
            .map_err(|_| {
                DatabaseError::Unavailable(format!(
                    "health check exceeded {}ms",
                    limit.as_millis()
                ))
            })?
    }

    /// Get the current number of connections in the pool
    pub fn size(&self) -> u32 {
        self.pool.size()
    }

    /// Whether [`DbPool::close`] has been called on this pool or a clone of it
    pub fn is_closed(&self) -> bool {
        self.pool.is_closed()
    }

    /// Close the connection pool gracefully
    ///
    /// Waits for checked-out connections to be returned, then closes all of them.
    #[instrument(skip(self))]
    pub async fn close(&self) {
        info!("Closing database connection pool");
        self.pool.close().await;
        info!("Database connection pool closed");
    }
}

fn connect_options(config: &DatabaseConfig) -> Result<PgConnectOptions, DatabaseError> {
    let options = PgConnectOptions::from_str(&config.url)
        .map_err(|e| DatabaseError::InvalidUrl(e.to_string()))?;
    Ok(options.disable_statement_logging())
}

fn pool_options(config: &DatabaseConfig) -> PgPoolOptions {
    PgPoolOptions::new()
        .max_connections(config.max_connections)
        .min_connections(config.min_connections)
        .acquire_timeout(Duration::from_secs(config.connect_timeout_seconds))
        // pre-ping: validate a pooled connection before handing it out
        .test_before_acquire(true)
}
