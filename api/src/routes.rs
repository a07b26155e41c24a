use axum::{http::HeaderValue, routing::get, Router};
use tower::ServiceBuilder;
use tower_http::cors::{AllowHeaders, AllowMethods, AllowOrigin, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::handlers;
use crate::state::AppState;
use common::config::CorsConfig;

/// Create the main application router
///
/// `template_routes` carries the template CRUD handlers; they share `AppState`
/// with the health endpoint and sit behind the same middleware.
pub fn create_router(state: AppState, template_routes: Router<AppState>) -> Router {
    let cors = cors_layer(&state.config.cors);

    Router::new()
        .route("/health", get(handlers::health::health_check))
        .merge(template_routes)
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(cors),
        )
        .with_state(state)
}

/// Build the cross-origin policy
///
/// With no configured origins every origin is accepted by echoing it back, so
/// credentials can be allowed too (a literal `*` cannot be combined with them).
pub fn cors_layer(config: &CorsConfig) -> CorsLayer {
    let origins = if config.allowed_origins.is_empty() {
        AllowOrigin::mirror_request()
    } else {
        let list: Vec<HeaderValue> = config
            .allowed_origins
            .iter()
            .filter_map(|origin| match HeaderValue::from_str(origin) {
                Ok(value) => Some(value),
                Err(e) => {
                    tracing::warn!(origin = %origin, error = %e, "Ignoring invalid CORS origin");
                    None
                }
            })
            .collect();
        AllowOrigin::list(list)
    };

    CorsLayer::new()
        .allow_origin(origins)
        .allow_methods(AllowMethods::mirror_request())
        .allow_headers(AllowHeaders::mirror_request())
        .allow_credentials(true)
}
