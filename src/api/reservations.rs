//! Reservation API endpoints.
//!
//! - GET /api/reservations - List reservations joined with item/event summaries
//! - POST /api/reservations - Create a reservation (single or multi-item bulk)
//! - POST /api/reservations/:id/return - Mark one reservation returned
//! - POST /api/reservations/return - Mark many reservations returned

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::error::AppError;
use crate::server::state::AppState;
use crate::types::{
    EventId, ItemId, Reservation, ReservationId, ReservationLine, ReservationRequest,
    ReservationStatus, ReservationView,
};

// ============================================================================
// Request/Response Types
// ============================================================================

/// One requested (item, quantity) pair.
#[derive(Debug, Deserialize)]
pub struct ReservationLineRequest {
    /// Requested item ID
    pub item_id: Uuid,
    /// Requested quantity
    pub quantity: i32,
}

/// Request to create a reservation against one event.
///
/// A single-item reservation is simply a request with one entry in `items`.
#[derive(Debug, Deserialize)]
pub struct CreateReservationRequest {
    /// Event the items are reserved for
    pub event_id: Uuid,
    /// Name of the person reserving
    pub reserved_by: String,
    /// Requested (item, quantity) pairs
    pub items: Vec<ReservationLineRequest>,
}

/// Flat reservation row, returned from mutations.
#[derive(Debug, Serialize)]
pub struct ReservationResponse {
    /// Reservation ID
    pub id: Uuid,
    /// Reserved item ID
    pub item_id: Uuid,
    /// Event ID
    pub event_id: Uuid,
    /// Reserved quantity
    pub quantity: i32,
    /// Lifecycle status
    pub status: ReservationStatus,
    /// Condition notes recorded at return time
    pub condition_notes: Option<String>,
    /// Who reserved the item
    pub reserved_by: Option<String>,
    /// Who returned the item
    pub returned_by: Option<String>,
    /// When the reservation was created
    pub reserved_at: DateTime<Utc>,
    /// When the reservation was returned
    pub returned_at: Option<DateTime<Utc>>,
}

impl From<Reservation> for ReservationResponse {
    fn from(reservation: Reservation) -> Self {
        Self {
            id: *reservation.id.as_uuid(),
            item_id: *reservation.item_id.as_uuid(),
            event_id: *reservation.event_id.as_uuid(),
            quantity: reservation.quantity,
            status: reservation.status,
            condition_notes: reservation.condition_notes,
            reserved_by: reservation.reserved_by,
            returned_by: reservation.returned_by,
            reserved_at: reservation.reserved_at,
            returned_at: reservation.returned_at,
        }
    }
}

/// Compact item reference inside a reservation view.
#[derive(Debug, Serialize)]
pub struct ItemSummaryResponse {
    /// Item ID
    pub id: Uuid,
    /// Item name
    pub name: String,
    /// Item category
    pub category: String,
}

/// Compact event reference inside a reservation view.
#[derive(Debug, Serialize)]
pub struct EventSummaryResponse {
    /// Event ID
    pub id: Uuid,
    /// Event name
    pub name: String,
    /// When the event takes place
    pub event_date: DateTime<Utc>,
}

/// Reservation joined with item and event summaries.
#[derive(Debug, Serialize)]
pub struct ReservationViewResponse {
    /// Reservation ID
    pub id: Uuid,
    /// Reserved item summary
    pub item: ItemSummaryResponse,
    /// Event summary
    pub event: EventSummaryResponse,
    /// Reserved quantity
    pub quantity: i32,
    /// Lifecycle status
    pub status: ReservationStatus,
    /// Condition notes recorded at return time
    pub condition_notes: Option<String>,
    /// Who reserved the item
    pub reserved_by: Option<String>,
    /// Who returned the item
    pub returned_by: Option<String>,
    /// When the reservation was created
    pub reserved_at: DateTime<Utc>,
    /// When the reservation was returned
    pub returned_at: Option<DateTime<Utc>>,
}

impl From<ReservationView> for ReservationViewResponse {
    fn from(view: ReservationView) -> Self {
        Self {
            id: *view.id.as_uuid(),
            item: ItemSummaryResponse {
                id: *view.item.id.as_uuid(),
                name: view.item.name,
                category: view.item.category,
            },
            event: EventSummaryResponse {
                id: *view.event.id.as_uuid(),
                name: view.event.name,
                event_date: view.event.event_date,
            },
            quantity: view.quantity,
            status: view.status,
            condition_notes: view.condition_notes,
            reserved_by: view.reserved_by,
            returned_by: view.returned_by,
            reserved_at: view.reserved_at,
            returned_at: view.returned_at,
        }
    }
}

/// Request body for returning a single reservation.
#[derive(Debug, Default, Deserialize)]
pub struct ReturnRequest {
    /// Condition notes (e.g., damage observed at return)
    #[serde(default)]
    pub condition_notes: Option<String>,
    /// Who returned the item
    #[serde(default)]
    pub returned_by: Option<String>,
}

/// Request body for returning many reservations at once.
///
/// The notes/returner pair is shared by the whole batch; per-reservation
/// notes are not supported in bulk mode.
#[derive(Debug, Deserialize)]
pub struct BulkReturnRequest {
    /// Reservations to return
    pub reservation_ids: Vec<Uuid>,
    /// Condition notes applied to every returned row
    #[serde(default)]
    pub condition_notes: Option<String>,
    /// Who returned the items
    #[serde(default)]
    pub returned_by: Option<String>,
}

/// Response for a bulk return.
#[derive(Debug, Serialize)]
pub struct BulkReturnResponse {
    /// Number of reservations newly returned (already-returned rows are
    /// skipped and not counted)
    pub returned: usize,
}

// ============================================================================
// Handlers
// ============================================================================

/// List all reservations joined with item and event summaries, ordered by
/// reservation time.
pub async fn list_reservations(
    State(state): State<AppState>,
) -> Result<Json<Vec<ReservationViewResponse>>, AppError> {
    let views = state.service.list_reservations().await?;
    Ok(Json(
        views.into_iter().map(ReservationViewResponse::from).collect(),
    ))
}

/// Create a reservation for one event, single or multi-item.
///
/// All items are validated before any row is created; if any line fails the
/// whole request is rejected and nothing is reserved.
///
/// # Example
///
/// ```bash
/// curl -X POST http://localhost:8080/api/reservations \
///   -H "Content-Type: application/json" \
///   -d '{
///     "event_id": "550e8400-e29b-41d4-a716-446655440000",
///     "reserved_by": "Alice",
///     "items": [
///       {"item_id": "650e8400-e29b-41d4-a716-446655440000", "quantity": 4}
///     ]
///   }'
/// ```
pub async fn create_reservation(
    State(state): State<AppState>,
    Json(request): Json<CreateReservationRequest>,
) -> Result<(StatusCode, Json<Vec<ReservationResponse>>), AppError> {
    let request = ReservationRequest {
        event_id: EventId::from_uuid(request.event_id),
        reserved_by: request.reserved_by,
        lines: request
            .items
            .into_iter()
            .map(|line| ReservationLine {
                item_id: ItemId::from_uuid(line.item_id),
                quantity: line.quantity,
            })
            .collect(),
    };
    let created = state.service.create_reservation(request).await?;
    Ok((
        StatusCode::CREATED,
        Json(created.into_iter().map(ReservationResponse::from).collect()),
    ))
}

/// Mark one reservation as returned.
///
/// Returning an already-returned reservation is rejected with a validation
/// error; the first return's notes and timestamp stay untouched.
pub async fn mark_returned(
    Path(reservation_id): Path<Uuid>,
    State(state): State<AppState>,
    Json(request): Json<ReturnRequest>,
) -> Result<Json<ReservationResponse>, AppError> {
    let reservation = state
        .service
        .mark_returned(
            ReservationId::from_uuid(reservation_id),
            request.condition_notes,
            request.returned_by,
        )
        .await?;
    Ok(Json(ReservationResponse::from(reservation)))
}

/// Mark many reservations as returned with one shared notes/returner pair.
///
/// Not atomic across the batch: a mid-batch failure leaves earlier rows
/// returned and is reported as an error rather than masked.
pub async fn mark_many_returned(
    State(state): State<AppState>,
    Json(request): Json<BulkReturnRequest>,
) -> Result<Json<BulkReturnResponse>, AppError> {
    let ids: Vec<ReservationId> = request
        .reservation_ids
        .into_iter()
        .map(ReservationId::from_uuid)
        .collect();
    let returned = state
        .service
        .mark_many_returned(&ids, request.condition_notes, request.returned_by)
        .await?;
    Ok(Json(BulkReturnResponse { returned }))
}
