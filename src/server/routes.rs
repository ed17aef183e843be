//! Router configuration.
//!
//! Builds the complete Axum router with all endpoints.

use axum::{
    Router,
    routing::{delete, get, post, put},
};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use super::health::{health_check, readiness_check};
use super::state::AppState;
use crate::api::{availability, events, items, people, reservations};

/// Build the complete Axum router.
///
/// Configures all routes:
/// - Health checks
/// - Item management and availability queries
/// - Event management
/// - Reservation creation and return workflow
/// - Person directory
///
/// # Arguments
///
/// - `state`: Application state to share with handlers
pub fn build_router(state: AppState) -> Router {
    let api_routes = Router::new()
        // Item management
        .route("/items", get(items::list_items))
        .route("/items", post(items::create_item))
        .route("/items/:id", get(items::get_item))
        .route("/items/:id", put(items::update_item))
        .route("/items/:id", delete(items::delete_item))
        .route(
            "/items/:id/availability",
            get(availability::get_item_availability),
        )
        // Event management
        .route("/events", get(events::list_events))
        .route("/events", post(events::create_event))
        .route("/events/:id", get(events::get_event))
        .route("/events/:id", put(events::update_event))
        .route("/events/:id", delete(events::delete_event))
        // Reservations and the return workflow
        .route("/reservations", get(reservations::list_reservations))
        .route("/reservations", post(reservations::create_reservation))
        .route(
            "/reservations/return",
            post(reservations::mark_many_returned),
        )
        .route(
            "/reservations/:id/return",
            post(reservations::mark_returned),
        )
        // Person directory
        .route("/people", get(people::list_known_people));

    Router::new()
        // Health checks
        .route("/health", get(health_check))
        .route("/ready", get(readiness_check))
        // API routes under /api prefix
        .nest("/api", api_routes)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
