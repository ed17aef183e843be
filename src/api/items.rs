//! Item management API endpoints.
//!
//! Provides CRUD operations for inventory items:
//! - GET /api/items - List items by name with computed availability
//! - POST /api/items - Create a new item
//! - GET /api/items/:id - Get an item with its active reservations
//! - PUT /api/items/:id - Replace an item's fields
//! - DELETE /api/items/:id - Delete an item (blocked while actively reserved)

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::error::AppError;
use super::reservations::ReservationViewResponse;
use crate::server::state::AppState;
use crate::types::{ItemAvailability, ItemDraft, ItemId};

// ============================================================================
// Request/Response Types
// ============================================================================

/// Request to create or replace an item.
#[derive(Debug, Deserialize)]
pub struct ItemRequest {
    /// Item name
    pub name: String,
    /// Optional description
    #[serde(default)]
    pub description: Option<String>,
    /// Category label
    pub category: String,
    /// Total stock quantity
    pub quantity: i32,
    /// Optional storage location
    #[serde(default)]
    pub storage_location: Option<String>,
}

impl From<ItemRequest> for ItemDraft {
    fn from(request: ItemRequest) -> Self {
        Self {
            name: request.name,
            description: request.description,
            category: request.category,
            quantity: request.quantity,
            storage_location: request.storage_location,
        }
    }
}

/// Item with computed availability.
#[derive(Debug, Serialize)]
pub struct ItemResponse {
    /// Item ID
    pub id: Uuid,
    /// Item name
    pub name: String,
    /// Optional description
    pub description: Option<String>,
    /// Category label
    pub category: String,
    /// Total stock quantity
    pub quantity: i32,
    /// Optional storage location
    pub storage_location: Option<String>,
    /// Sum of active reservation quantities
    pub reserved: i64,
    /// Remaining available quantity
    pub available: i64,
    /// Created timestamp
    pub created_at: DateTime<Utc>,
    /// Last-updated timestamp
    pub updated_at: DateTime<Utc>,
}

impl From<ItemAvailability> for ItemResponse {
    fn from(view: ItemAvailability) -> Self {
        Self {
            id: *view.item.id.as_uuid(),
            name: view.item.name,
            description: view.item.description,
            category: view.item.category,
            quantity: view.item.quantity,
            storage_location: view.item.storage_location,
            reserved: view.reserved,
            available: view.available,
            created_at: view.item.created_at,
            updated_at: view.item.updated_at,
        }
    }
}

/// Item detail including its active reservations.
#[derive(Debug, Serialize)]
pub struct ItemDetailResponse {
    /// The item with availability
    #[serde(flatten)]
    pub item: ItemResponse,
    /// Active reservations for this item, oldest first
    pub active_reservations: Vec<ReservationViewResponse>,
}

// ============================================================================
// Handlers
// ============================================================================

/// List all items by name with computed availability.
///
/// # Example
///
/// ```bash
/// curl http://localhost:8080/api/items
/// ```
pub async fn list_items(
    State(state): State<AppState>,
) -> Result<Json<Vec<ItemResponse>>, AppError> {
    let items = state.service.list_items().await?;
    Ok(Json(items.into_iter().map(ItemResponse::from).collect()))
}

/// Create a new item.
///
/// # Example
///
/// ```bash
/// curl -X POST http://localhost:8080/api/items \
///   -H "Content-Type: application/json" \
///   -d '{"name": "Tent", "category": "Camping", "quantity": 10}'
/// ```
pub async fn create_item(
    State(state): State<AppState>,
    Json(request): Json<ItemRequest>,
) -> Result<(StatusCode, Json<ItemResponse>), AppError> {
    let item = state.service.create_item(request.into()).await?;
    let response = ItemResponse::from(ItemAvailability {
        available: i64::from(item.quantity),
        reserved: 0,
        item,
    });
    Ok((StatusCode::CREATED, Json(response)))
}

/// Get one item with its availability and active reservations.
pub async fn get_item(
    Path(item_id): Path<Uuid>,
    State(state): State<AppState>,
) -> Result<Json<ItemDetailResponse>, AppError> {
    let detail = state.service.get_item(ItemId::from_uuid(item_id)).await?;
    Ok(Json(ItemDetailResponse {
        item: ItemResponse::from(ItemAvailability {
            item: detail.item,
            reserved: detail.reserved,
            available: detail.available,
        }),
        active_reservations: detail
            .active_reservations
            .into_iter()
            .map(ReservationViewResponse::from)
            .collect(),
    }))
}

/// Replace an item's fields.
pub async fn update_item(
    Path(item_id): Path<Uuid>,
    State(state): State<AppState>,
    Json(request): Json<ItemRequest>,
) -> Result<Json<ItemResponse>, AppError> {
    let id = ItemId::from_uuid(item_id);
    state.service.update_item(id, request.into()).await?;
    // Re-read through the availability path so the response carries the
    // current reserved/available counts.
    let view = state.service.item_availability(id).await?;
    Ok(Json(ItemResponse::from(view)))
}

/// Delete an item.
///
/// Fails with a validation error while active reservations reference it.
pub async fn delete_item(
    Path(item_id): Path<Uuid>,
    State(state): State<AppState>,
) -> Result<StatusCode, AppError> {
    state.service.delete_item(ItemId::from_uuid(item_id)).await?;
    Ok(StatusCode::NO_CONTENT)
}
