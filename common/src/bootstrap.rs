// Ordered acquisition and release of the process-wide resources
//
// Startup is strictly sequential: database pool, then schema, then cache.
// A failure at any step releases whatever was already acquired and aborts.

use crate::config::Settings;
use crate::db::{CacheClient, DbPool, SchemaMetadata};
use crate::errors::{ReleaseError, ShutdownError, StartupError};
use std::future::Future;
use std::time::Duration;
use tracing::{error, info, warn};

/// Owner of the database pool and cache client for the life of the process
#[derive(Debug)]
pub struct Resources {
    db_pool: Option<DbPool>,
    cache: Option<CacheClient>,
    shutdown_timeout: Duration,
}

impl Resources {
    /// Acquire every resource, in order, before any traffic is accepted
    ///
    /// # Errors
    /// Returns the first failure. Resources acquired before it are released first.
    #[tracing::instrument(skip_all)]
    pub async fn start(settings: &Settings, schema: &SchemaMetadata) -> Result<Self, StartupError> {
        let mut resources = Self::empty(Duration::from_secs(settings.server.shutdown_timeout_seconds));

        match resources.acquire(settings, schema).await {
            Ok(()) => {
                info!("All resources acquired");
                Ok(resources)
            }
            Err(e) => {
                error!(error = %e, "Resource acquisition failed, rolling back");
                if let Err(release) = resources.stop().await {
                    warn!(error = %release, "Rollback did not release every resource");
                }
                Err(e)
            }
        }
    }

    async fn acquire(&mut self, settings: &Settings, schema: &SchemaMetadata) -> Result<(), StartupError> {
        let db_pool = DbPool::new(&settings.database)
            .await
            .map_err(StartupError::Database)?;
        let db_pool = self.db_pool.insert(db_pool);

        schema.create_all(db_pool).await.map_err(StartupError::Schema)?;

        self.cache = Some(CacheClient::connect(&settings.redis).await?);
        Ok(())
    }

    pub(crate) fn empty(shutdown_timeout: Duration) -> Self {
        Self {
            db_pool: None,
            cache: None,
            shutdown_timeout,
        }
    }

    pub fn db_pool(&self) -> Option<&DbPool> {
        self.db_pool.as_ref()
    }

    pub fn cache(&self) -> Option<&CacheClient> {
        self.cache.as_ref()
    }

    /// Release every held resource
    ///
    /// Each release runs independently and is bounded by the shutdown timeout;
    /// a failure in one does not skip the other. Handles are taken, so a second
    /// call releases nothing.
    ///
    /// # Errors
    /// Returns every release that did not finish in time.
    #[tracing::instrument(skip(self))]
    pub async fn stop(&mut self) -> Result<(), ShutdownError> {
        let mut failures = Vec::new();

        if let Some(cache) = self.cache.take() {
            if let Err(e) = self.bounded("cache client", cache.close()).await {
                failures.push(e);
            }
        }

        if let Some(db_pool) = self.db_pool.take() {
            if let Err(e) = self.bounded("database pool", db_pool.close()).await {
                failures.push(e);
            }
        }

        if failures.is_empty() {
            info!("Resources released");
            Ok(())
        } else {
            for failure in &failures {
                error!(error = %failure, "Resource release failed");
            }
            Err(ShutdownError(failures))
        }
    }

    async fn bounded<F>(&self, resource: &'static str, release: F) -> Result<(), ReleaseError>
    where
        F: Future<Output = ()>,
    {
        tokio::time::timeout(self.shutdown_timeout, release)
            .await
            .map_err(|_| ReleaseError::Timeout {
                resource,
                seconds: self.shutdown_timeout.as_secs(),
            })
    }
}
