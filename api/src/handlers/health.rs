use axum::{extract::State, Json};
use chrono::{SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

use crate::state::AppState;
use common::errors::DatabaseError;
use common::SERVICE_NAME;
use std::time::Duration;

/// Body of `GET /health`
///
/// `status` is always `"healthy"`: it says the check ran, while the two booleans
/// carry the per-dependency result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub service: String,
    pub timestamp: String,
    pub database_connected: bool,
    pub redis_connected: bool,
}

impl HealthResponse {
    pub fn new(database_connected: bool, redis_connected: bool) -> Self {
        Self {
            status: "healthy".to_string(),
            service: SERVICE_NAME.to_string(),
            timestamp: Utc::now().to_rfc3339_opts(SecondsFormat::Micros, false),
            database_connected,
            redis_connected,
        }
    }

    /// Build the report from the database check outcome and cache presence
    pub fn from_checks(database: Result<(), DatabaseError>, cache_present: bool) -> Self {
        let database_connected = match database {
            Ok(()) => true,
            Err(e) if e.is_connectivity() => {
                tracing::warn!(error = %e, "Database unreachable during health check");
                false
            }
            Err(e) => {
                tracing::error!(error = %e, "Unexpected database error during health check");
                false
            }
        };

        Self::new(database_connected, cache_present)
    }
}

/// Health check endpoint
///
/// Never fails: a database check error, or a check slower than
/// `server.health_timeout_ms`, is logged and reported as `database_connected: false`.
/// The cache is reported by presence only.
#[tracing::instrument(skip(state))]
pub async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    let limit = Duration::from_millis(state.config.server.health_timeout_ms);
    let database = state.db_pool.health_check_within(limit).await;

    Json(HealthResponse::from_checks(database, state.cache.is_some()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::routes::create_router;
    use axum::{
        body::{to_bytes, Body},
        http::{Request, StatusCode},
        Router,
    };
    use common::config::{DatabaseConfig, Settings};
    use common::db::DbPool;
    use tower::ServiceExt;

    fn unreachable_state() -> AppState {
        let settings = Settings::default();
        let db_pool = DbPool::connect_lazy(&DatabaseConfig {
            url: "postgres://u:p@127.0.0.1:1/db".to_string(),
            max_connections: 1,
            min_connections: 0,
            connect_timeout_seconds: 1,
        })
        .unwrap();
        AppState::new(db_pool, None, settings)
    }

    async fn get_health(app: Router) -> (StatusCode, HealthResponse) {
        let response = app
            .oneshot(Request::get("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        let status = response.status();
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&body).unwrap())
    }

    #[test]
    fn test_response_constants() {
        let response = HealthResponse::new(true, false);
        assert_eq!(response.status, "healthy");
        assert_eq!(response.service, "template-service");
        assert!(response.database_connected);
        assert!(!response.redis_connected);
    }

    #[test]
    fn test_successful_check_and_present_cache_report_connected() {
        let response = HealthResponse::from_checks(Ok(()), true);
        assert_eq!(response.status, "healthy");
        assert!(response.database_connected);
        assert!(response.redis_connected);
    }

    #[test]
    fn test_failed_checks_report_disconnected_without_error() {
        let unreachable = HealthResponse::from_checks(
            Err(DatabaseError::Unavailable("refused".to_string())),
            true,
        );
        assert!(!unreachable.database_connected);
        assert!(unreachable.redis_connected);

        let unexpected = HealthResponse::from_checks(
            Err(DatabaseError::HealthCheckFailed("bad row".to_string())),
            false,
        );
        assert_eq!(unexpected.status, "healthy");
        assert!(!unexpected.database_connected);
        assert!(!unexpected.redis_connected);
    }

    #[test]
    fn test_timestamp_is_rfc3339_utc() {
        let response = HealthResponse::new(false, false);
        let parsed = chrono::DateTime::parse_from_rfc3339(&response.timestamp).unwrap();
        assert_eq!(parsed.offset().local_minus_utc(), 0);
        assert!(response.timestamp.ends_with("+00:00"));
    }

    #[test]
    fn test_serialized_field_names() {
        let value = serde_json::to_value(HealthResponse::new(true, true)).unwrap();
        for field in [
            "status",
            "service",
            "timestamp",
            "database_connected",
            "redis_connected",
        ] {
            assert!(value.get(field).is_some(), "missing {}", field);
        }
    }

    #[tokio::test]
    async fn test_unreachable_database_still_returns_ok() {
        let app = create_router(unreachable_state(), Router::new());

        let (status, body) = get_health(app).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body.status, "healthy");
        assert_eq!(body.service, "template-service");
        assert!(!body.database_connected);
        assert!(!body.redis_connected);
    }

    #[tokio::test]
    async fn test_down_database_answers_within_health_timeout() {
        let mut settings = Settings::default();
        settings.server.health_timeout_ms = 200;
        settings.database.url = "postgres://u:p@127.0.0.1:1/db".to_string();
        let db_pool = DbPool::connect_lazy(&settings.database).unwrap();
        let app = create_router(AppState::new(db_pool, None, settings), Router::new());

        let started = std::time::Instant::now();
        let (status, body) = get_health(app).await;

        assert!(started.elapsed() < Duration::from_secs(5));
        assert_eq!(status, StatusCode::OK);
        assert!(!body.database_connected);
    }

    #[tokio::test]
    async fn test_closed_pool_reports_disconnected() {
        let state = unreachable_state();
        state.db_pool.close().await;
        let app = create_router(state, Router::new());

        let (status, body) = get_health(app).await;

        assert_eq!(status, StatusCode::OK);
        assert!(!body.database_connected);
    }

    #[tokio::test]
    #[ignore] // Requires PostgreSQL and Redis to be running
    async fn test_live_dependencies_report_connected() {
        let settings = Settings::default();
        let db_pool = DbPool::new(&settings.database).await.unwrap();
        let cache = common::db::CacheClient::connect(&settings.redis).await.unwrap();
        let app = create_router(AppState::new(db_pool, Some(cache), settings), Router::new());

        let (status, body) = get_health(app).await;

        assert_eq!(status, StatusCode::OK);
        assert!(body.database_connected);
        assert!(body.redis_connected);
    }
}
