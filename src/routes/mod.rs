// ============================================================================
// Axum Routes Module
// ============================================================================
//
// Structure:
// - mod.rs: Main router assembly and middleware
// - health.rs: Health check and metrics endpoints
// - groups.rs: Group hierarchy, creation and bulk import
// - contacts.rs: Contact import and device registration
// - messages.rs: Broadcast, inbox, history and message administration
// - stats.rs: Dashboard totals
// - extractors.rs: Json/Path extractors rejecting with AppError
// - middleware.rs: Request logging, security headers
//
// ============================================================================

mod contacts;
mod extractors;
mod groups;
mod health;
mod messages;
mod middleware;
mod stats;

use axum::{
    Router,
    extract::DefaultBodyLimit,
    http::HeaderValue,
    routing::{get, post},
};
use broadcast_config::{CorsConfig, MAX_REQUEST_BODY_SIZE};
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::context::AppContext;

fn cors_layer(config: &CorsConfig) -> CorsLayer {
    let layer = CorsLayer::new().allow_methods(Any).allow_headers(Any);
    if config.allows_any() {
        return layer.allow_origin(Any);
    }

    let origins: Vec<HeaderValue> = config
        .allowed_origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!(origin = %origin, "Ignoring invalid CORS origin");
                None
            }
        })
        .collect();
    layer.allow_origin(origins)
}

/// Create the main application router with all routes
pub fn create_router(app_context: Arc<AppContext>) -> Router {
    let cors = cors_layer(&app_context.config.cors);

    Router::new()
        // Health and monitoring
        .route("/health", get(health::health_check))
        .route("/metrics", get(health::metrics))
        // Groups
        .route("/api/groups/", post(groups::create_group))
        .route("/api/groups/hierarchy/", get(groups::get_hierarchy))
        .route("/api/upload-groups/", post(groups::upload_groups))
        // Contacts and devices
        .route("/api/upload-contacts/:group_id/", post(contacts::upload_contacts))
        .route(
            "/api/register-device/:device_id/:phone_number",
            post(contacts::register_device),
        )
        // Messages. The static history route takes precedence over the
        // parameterised one; GET reads the parameter as a phone number,
        // PUT and DELETE as a message id.
        .route("/api/send-message/:group_id/", post(messages::send_message))
        .route("/api/messages/history/", get(messages::message_history))
        .route(
            "/api/messages/:key/",
            get(messages::contact_inbox)
                .put(messages::update_message)
                .delete(messages::delete_message),
        )
        .route("/api/stats/", get(stats::get_stats))
        // Apply middleware (order matters - last added runs first)
        .layer(
            ServiceBuilder::new()
                // Tracing layer (outermost - runs first)
                .layer(TraceLayer::new_for_http())
                .layer(cors)
                // Request logging
                .layer(axum::middleware::from_fn(
                    crate::routes::middleware::request_logging,
                ))
                // Security headers
                .layer(axum::middleware::from_fn(
                    crate::routes::middleware::add_security_headers,
                ))
                .layer(DefaultBodyLimit::max(MAX_REQUEST_BODY_SIZE))
                .into_inner(),
        )
        .with_state(app_context)
}
