//! Event management API endpoints.
//!
//! Provides CRUD operations for events:
//! - GET /api/events - List events by date (optionally only upcoming)
//! - POST /api/events - Create a new event (date must be in the future)
//! - GET /api/events/:id - Get event details
//! - PUT /api/events/:id - Replace an event's fields
//! - DELETE /api/events/:id - Delete an event (blocked while actively reserved)

use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::error::AppError;
use crate::server::state::AppState;
use crate::types::{Event, EventDraft, EventId};

// ============================================================================
// Request/Response Types
// ============================================================================

/// Request to create or replace an event.
#[derive(Debug, Deserialize)]
pub struct EventRequest {
    /// Event name
    pub name: String,
    /// Optional description
    #[serde(default)]
    pub description: Option<String>,
    /// When the event takes place (RFC 3339); must be in the future
    pub event_date: DateTime<Utc>,
    /// Optional location
    #[serde(default)]
    pub location: Option<String>,
}

impl From<EventRequest> for EventDraft {
    fn from(request: EventRequest) -> Self {
        Self {
            name: request.name,
            description: request.description,
            event_date: request.event_date,
            location: request.location,
        }
    }
}

/// Event details response.
#[derive(Debug, Serialize)]
pub struct EventResponse {
    /// Event ID
    pub id: Uuid,
    /// Event name
    pub name: String,
    /// Optional description
    pub description: Option<String>,
    /// When the event takes place
    pub event_date: DateTime<Utc>,
    /// Optional location
    pub location: Option<String>,
    /// Created timestamp
    pub created_at: DateTime<Utc>,
}

impl From<Event> for EventResponse {
    fn from(event: Event) -> Self {
        Self {
            id: *event.id.as_uuid(),
            name: event.name,
            description: event.description,
            event_date: event.event_date,
            location: event.location,
            created_at: event.created_at,
        }
    }
}

/// Query parameters for listing events.
#[derive(Debug, Deserialize)]
pub struct ListEventsQuery {
    /// When true, only events that have not yet taken place are returned
    #[serde(default)]
    pub upcoming: bool,
}

// ============================================================================
// Handlers
// ============================================================================

/// List events ordered by date.
///
/// # Example
///
/// ```bash
/// # All events
/// curl http://localhost:8080/api/events
///
/// # Only events still ahead (what the reservation form shows)
/// curl http://localhost:8080/api/events?upcoming=true
/// ```
pub async fn list_events(
    Query(query): Query<ListEventsQuery>,
    State(state): State<AppState>,
) -> Result<Json<Vec<EventResponse>>, AppError> {
    let events = state.service.list_events(query.upcoming).await?;
    Ok(Json(events.into_iter().map(EventResponse::from).collect()))
}

/// Create a new event.
///
/// # Example
///
/// ```bash
/// curl -X POST http://localhost:8080/api/events \
///   -H "Content-Type: application/json" \
///   -d '{"name": "Summer picnic", "event_date": "2026-08-15T12:00:00Z", "location": "Riverside park"}'
/// ```
pub async fn create_event(
    State(state): State<AppState>,
    Json(request): Json<EventRequest>,
) -> Result<(StatusCode, Json<EventResponse>), AppError> {
    let event = state.service.create_event(request.into()).await?;
    Ok((StatusCode::CREATED, Json(EventResponse::from(event))))
}

/// Get event details by ID.
pub async fn get_event(
    Path(event_id): Path<Uuid>,
    State(state): State<AppState>,
) -> Result<Json<EventResponse>, AppError> {
    let event = state.service.get_event(EventId::from_uuid(event_id)).await?;
    Ok(Json(EventResponse::from(event)))
}

/// Replace an event's fields. The date-in-future check applies again.
pub async fn update_event(
    Path(event_id): Path<Uuid>,
    State(state): State<AppState>,
    Json(request): Json<EventRequest>,
) -> Result<Json<EventResponse>, AppError> {
    let event = state
        .service
        .update_event(EventId::from_uuid(event_id), request.into())
        .await?;
    Ok(Json(EventResponse::from(event)))
}

/// Delete an event.
///
/// Fails with a validation error while active reservations reference it.
pub async fn delete_event(
    Path(event_id): Path<Uuid>,
    State(state): State<AppState>,
) -> Result<StatusCode, AppError> {
    state
        .service
        .delete_event(EventId::from_uuid(event_id))
        .await?;
    Ok(StatusCode::NO_CONTENT)
}
