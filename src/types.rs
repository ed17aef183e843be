//! Domain types for the inventory and reservation tracker.
//!
//! This module contains the identifier newtypes, the stored entities
//! (items, events, reservations), the joined views served to callers, and
//! the typed reservation request that is validated once at the boundary
//! before it reaches the stock checks.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

use crate::error::InventoryError;

// ============================================================================
// Identifiers
// ============================================================================

/// Unique identifier for an inventory item
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ItemId(Uuid);

impl ItemId {
    /// Creates a new random `ItemId`
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Create an `ItemId` from a `Uuid`
    #[must_use]
    pub const fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    /// Get the inner UUID
    #[must_use]
    pub const fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for ItemId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ItemId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Unique identifier for an event
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EventId(Uuid);

impl EventId {
    /// Creates a new random `EventId`
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Create an `EventId` from a `Uuid`
    #[must_use]
    pub const fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    /// Get the inner UUID
    #[must_use]
    pub const fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for EventId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for EventId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Unique identifier for a reservation
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ReservationId(Uuid);

impl ReservationId {
    /// Creates a new random `ReservationId`
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Create a `ReservationId` from a `Uuid`
    #[must_use]
    pub const fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    /// Get the inner UUID
    #[must_use]
    pub const fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for ReservationId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ReservationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ============================================================================
// Entities
// ============================================================================

/// Inventory item with a total stock quantity.
///
/// The `quantity` field is the ceiling against which all reservations are
/// checked: the sum of active reservation quantities for an item must never
/// exceed it.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Item {
    /// Unique item identifier
    pub id: ItemId,
    /// Item name (e.g., "Folding table")
    pub name: String,
    /// Optional free-text description
    pub description: Option<String>,
    /// Free-text category label (e.g., "Furniture")
    pub category: String,
    /// Total stock quantity (at least 1)
    pub quantity: i32,
    /// Optional storage location
    pub storage_location: Option<String>,
    /// When the item was created
    pub created_at: DateTime<Utc>,
    /// When the item was last updated
    pub updated_at: DateTime<Utc>,
}

/// Event that items can be reserved for.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Event {
    /// Unique event identifier
    pub id: EventId,
    /// Event name (e.g., "Summer picnic")
    pub name: String,
    /// Optional free-text description
    pub description: Option<String>,
    /// When the event takes place; must be in the future at write time
    pub event_date: DateTime<Utc>,
    /// Optional event location
    pub location: Option<String>,
    /// When the event was created
    pub created_at: DateTime<Utc>,
}

/// Reservation lifecycle status.
///
/// A reservation is created as `Reserved` and transitions exactly once to
/// `Returned`. There is no cancelled or partial-return state.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReservationStatus {
    /// Active; counts against the item's availability
    Reserved,
    /// Closed; no longer counts against availability
    Returned,
}

impl ReservationStatus {
    /// Stable string form used in storage.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Reserved => "reserved",
            Self::Returned => "returned",
        }
    }

    /// Parse the storage string form.
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "reserved" => Some(Self::Reserved),
            "returned" => Some(Self::Returned),
            _ => None,
        }
    }
}

impl fmt::Display for ReservationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Reservation linking an item to an event for a quantity.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Reservation {
    /// Unique reservation identifier
    pub id: ReservationId,
    /// Reserved item
    pub item_id: ItemId,
    /// Event the item is reserved for
    pub event_id: EventId,
    /// Reserved quantity (at least 1)
    pub quantity: i32,
    /// Current lifecycle status
    pub status: ReservationStatus,
    /// Condition notes recorded at return time
    pub condition_notes: Option<String>,
    /// Who reserved the item
    pub reserved_by: Option<String>,
    /// Who returned the item
    pub returned_by: Option<String>,
    /// When the reservation was created
    pub reserved_at: DateTime<Utc>,
    /// When the reservation was returned (None while active)
    pub returned_at: Option<DateTime<Utc>>,
}

impl Reservation {
    /// Whether this reservation still counts against availability.
    #[must_use]
    pub const fn is_active(&self) -> bool {
        matches!(self.status, ReservationStatus::Reserved)
    }
}

// ============================================================================
// Drafts (typed write commands)
// ============================================================================

/// Field set for creating or replacing an item.
///
/// Update keeps the original whole-record form semantics: every field is
/// carried, not a sparse patch.
#[derive(Clone, Debug, PartialEq)]
pub struct ItemDraft {
    /// Item name (required, non-empty)
    pub name: String,
    /// Optional free-text description
    pub description: Option<String>,
    /// Category label (required, non-empty)
    pub category: String,
    /// Total stock quantity (at least 1)
    pub quantity: i32,
    /// Optional storage location
    pub storage_location: Option<String>,
}

/// Field set for creating or replacing an event.
#[derive(Clone, Debug, PartialEq)]
pub struct EventDraft {
    /// Event name (required, non-empty)
    pub name: String,
    /// Optional free-text description
    pub description: Option<String>,
    /// When the event takes place
    pub event_date: DateTime<Utc>,
    /// Optional event location
    pub location: Option<String>,
}

// ============================================================================
// Views
// ============================================================================

/// Item joined with its computed availability.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ItemAvailability {
    /// The item record
    pub item: Item,
    /// Sum of quantities across the item's active reservations
    pub reserved: i64,
    /// `item.quantity - reserved`; negative only if the stock invariant was
    /// violated by a prior bug, callers must not assume non-negativity
    pub available: i64,
}

/// Compact item reference embedded in reservation views.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ItemSummary {
    /// Item identifier
    pub id: ItemId,
    /// Item name
    pub name: String,
    /// Item category
    pub category: String,
}

/// Compact event reference embedded in reservation views.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct EventSummary {
    /// Event identifier
    pub id: EventId,
    /// Event name
    pub name: String,
    /// When the event takes place
    pub event_date: DateTime<Utc>,
}

/// Reservation joined with item and event summaries for rendering.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ReservationView {
    /// Reservation identifier
    pub id: ReservationId,
    /// Reserved item summary
    pub item: ItemSummary,
    /// Event summary
    pub event: EventSummary,
    /// Reserved quantity
    pub quantity: i32,
    /// Current lifecycle status
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

/// Item detail view: the item, its availability, and its active reservations.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ItemDetail {
    /// The item record
    pub item: Item,
    /// Sum of quantities across active reservations
    pub reserved: i64,
    /// Computed availability
    pub available: i64,
    /// Active reservations for this item, oldest first
    pub active_reservations: Vec<ReservationView>,
}

// ============================================================================
// Reservation request (boundary-validated command)
// ============================================================================

/// One requested (item, quantity) pair of a reservation request.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ReservationLine {
    /// Requested item
    pub item_id: ItemId,
    /// Requested quantity
    pub quantity: i32,
}

/// Raw reservation request as submitted by a caller.
///
/// Covers both the single-item and the multi-item bulk form: a single-item
/// reservation is a request with one line.
#[derive(Clone, Debug, PartialEq)]
pub struct ReservationRequest {
    /// Event the items are reserved for
    pub event_id: EventId,
    /// Name of the person reserving (required, non-empty)
    pub reserved_by: String,
    /// Requested (item, quantity) pairs
    pub lines: Vec<ReservationLine>,
}

impl ReservationRequest {
    /// Validate the request shape, producing an already-checked command.
    ///
    /// Checks, in order: the reserver name is non-empty, at least one line is
    /// present, no item appears twice, and every quantity is positive. Stock
    /// and availability are checked later, inside the store's transactional
    /// boundary.
    ///
    /// # Errors
    ///
    /// Returns [`InventoryError::InvalidInput`] when any shape check fails.
    pub fn validate(self) -> Result<ReservationCommand, InventoryError> {
        let reserved_by = self.reserved_by.trim().to_string();
        if reserved_by.is_empty() {
            return Err(InventoryError::InvalidInput(
                "reserver name is required".to_string(),
            ));
        }
        if self.lines.is_empty() {
            return Err(InventoryError::InvalidInput(
                "at least one item is required".to_string(),
            ));
        }
        let mut seen = std::collections::HashSet::new();
        for line in &self.lines {
            if !seen.insert(line.item_id) {
                return Err(InventoryError::InvalidInput(format!(
                    "item {} is listed more than once",
                    line.item_id
                )));
            }
            if line.quantity < 1 {
                return Err(InventoryError::InvalidInput(format!(
                    "quantity for item {} must be a positive integer",
                    line.item_id
                )));
            }
        }
        Ok(ReservationCommand {
            event_id: self.event_id,
            reserved_by,
            lines: self.lines,
        })
    }
}

/// Shape-checked reservation command.
///
/// Constructed only through [`ReservationRequest::validate`], so holders can
/// rely on a non-empty reserver name, a non-empty de-duplicated line list,
/// and positive quantities.
#[derive(Clone, Debug, PartialEq)]
pub struct ReservationCommand {
    /// Event the items are reserved for
    pub event_id: EventId,
    /// Name of the person reserving
    pub reserved_by: String,
    /// Checked (item, quantity) pairs
    pub lines: Vec<ReservationLine>,
}
