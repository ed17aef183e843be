//! Item availability query endpoint.
//!
//! Read-only: availability is recomputed from the item's stock and its
//! active reservations on every request, never cached.

use axum::{
    Json,
    extract::{Path, State},
};
use serde::Serialize;
use uuid::Uuid;

use super::error::AppError;
use crate::server::state::AppState;
use crate::types::ItemId;

// ============================================================================
// Response Types
// ============================================================================

/// Availability for a single item.
#[derive(Debug, Serialize)]
pub struct AvailabilityResponse {
    /// Item ID
    pub item_id: Uuid,
    /// Total stock quantity
    pub quantity: i32,
    /// Sum of active reservation quantities
    pub reserved: i64,
    /// Remaining available quantity (`quantity - reserved`); may be negative
    /// if the stock invariant was violated by a prior bug
    pub available: i64,
}

// ============================================================================
// Handlers
// ============================================================================

/// Get the remaining available quantity of one item.
///
/// # Example
///
/// ```bash
/// curl http://localhost:8080/api/items/550e8400-e29b-41d4-a716-446655440000/availability
/// # {"item_id":"550e8400-…","quantity":10,"reserved":4,"available":6}
/// ```
pub async fn get_item_availability(
    Path(item_id): Path<Uuid>,
    State(state): State<AppState>,
) -> Result<Json<AvailabilityResponse>, AppError> {
    let view = state
        .service
        .item_availability(ItemId::from_uuid(item_id))
        .await?;
    Ok(Json(AvailabilityResponse {
        item_id,
        quantity: view.item.quantity,
        reserved: view.reserved,
        available: view.available,
    }))
}
