// Error types for the service's stateful resources

use thiserror::Error;

/// Database-specific errors
#[derive(Error, Debug)]
pub enum DatabaseError {
    #[error("Invalid database URL: {0}")]
    InvalidUrl(String),

    #[error("Database connection failed: {0}")]
    ConnectionFailed(String),

    #[error("Database unavailable: {0}")]
    Unavailable(String),

    #[error("Database health check failed: {0}")]
    HealthCheckFailed(String),

    #[error("Schema initialization failed: {0}")]
    SchemaFailed(String),
}

impl DatabaseError {
    /// Classify a driver error raised while talking to a running pool.
    ///
    /// Reachability problems (I/O, TLS, pool timeout, closed pool) become
    /// `Unavailable`; everything else keeps the caller-supplied variant.
    pub fn from_check(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::Io(_)
            | sqlx::Error::Tls(_)
            | sqlx::Error::PoolTimedOut
            | sqlx::Error::PoolClosed
            | sqlx::Error::WorkerCrashed => DatabaseError::Unavailable(err.to_string()),
            other => DatabaseError::HealthCheckFailed(other.to_string()),
        }
    }

    /// Whether this error means the database could not be reached at all
    pub fn is_connectivity(&self) -> bool {
        matches!(
            self,
            DatabaseError::ConnectionFailed(_) | DatabaseError::Unavailable(_)
        )
    }
}

/// Cache (Redis) errors
#[derive(Error, Debug)]
pub enum CacheError {
    #[error("Invalid Redis URL: {0}")]
    InvalidUrl(String),

    #[error("Redis connection failed: {0}")]
    ConnectionFailed(String),

    #[error("Redis command failed: {0}")]
    CommandFailed(String),
}

/// Fatal errors raised while acquiring resources at boot
#[derive(Error, Debug)]
pub enum StartupError {
    #[error("Failed to acquire database pool: {0}")]
    Database(#[source] DatabaseError),

    #[error("Failed to initialize schema: {0}")]
    Schema(#[source] DatabaseError),

    #[error("Failed to connect cache client: {0}")]
    Cache(#[from] CacheError),
}

/// A single resource that could not be released during shutdown
#[derive(Error, Debug, PartialEq, Eq)]
pub enum ReleaseError {
    #[error("Timed out releasing {resource} after {seconds}s")]
    Timeout {
        resource: &'static str,
        seconds: u64,
    },
}

/// Every release failure observed during one shutdown
#[derive(Error, Debug)]
#[error("{} resource(s) failed to release: {:?}", .0.len(), .0)]
pub struct ShutdownError(pub Vec<ReleaseError>);
