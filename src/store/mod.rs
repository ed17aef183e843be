//! Entity store abstraction for items, events, and reservations.
//!
//! # Design
//!
//! The [`EntityStore`] trait is deliberately minimal: read-by-id,
//! ordered listing, insert, replace, delete, plus the two operations that
//! must own a transactional boundary (committing a reservation command and
//! flipping a reservation to returned). Any tabular store can implement it.
//!
//! # Implementations
//!
//! - [`PostgresStore`]: production implementation backed by sqlx
//! - [`InMemoryStore`]: fast, deterministic implementation for tests
//!
//! # Why `reserve` lives here
//!
//! Availability is computed by reading current reservations, so a
//! read-validate-insert sequence done outside the store races with concurrent
//! requests for the same item. Each implementation therefore executes the
//! shared pure validation rule ([`crate::accounting::availability::validate_lines`])
//! inside its own atomicity mechanism: row locks in one Postgres transaction,
//! a single write guard in memory. Overbooking is rejected where the data
//! lives, not where it was last observed.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use thiserror::Error;

use crate::error::InventoryError;
use crate::types::{
    Event, EventDraft, EventId, Item, ItemDraft, ItemId, Reservation, ReservationCommand,
    ReservationId, ReservationView,
};

mod memory;
mod postgres;

pub use memory::InMemoryStore;
pub use postgres::PostgresStore;

/// Errors that can occur during entity store operations.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Query or transaction failure reported by the backing database.
    #[error("database error: {0}")]
    Database(String),
}

impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        Self::Database(err.to_string())
    }
}

/// Outcome of a conditional return update.
#[derive(Clone, Debug, PartialEq)]
pub enum ReturnOutcome {
    /// The reservation was active and is now returned.
    Returned(Reservation),
    /// The reservation exists but was already returned; nothing was changed.
    AlreadyReturned,
    /// No reservation with that id exists.
    Missing,
}

/// Durable storage for items, events, and reservations.
///
/// # Thread Safety
///
/// Implementations must be `Send + Sync`; the service shares one instance
/// across request handlers behind an `Arc<dyn EntityStore>`.
#[async_trait]
pub trait EntityStore: Send + Sync {
    // ------------------------------------------------------------------
    // Items
    // ------------------------------------------------------------------

    /// List all items ordered by name.
    async fn list_items(&self) -> Result<Vec<Item>, StoreError>;

    /// Fetch a single item.
    async fn get_item(&self, id: ItemId) -> Result<Option<Item>, StoreError>;

    /// Insert a new item, assigning its id, and return the stored record.
    async fn insert_item(&self, draft: ItemDraft, now: DateTime<Utc>) -> Result<Item, StoreError>;

    /// Replace an item's fields, bumping `updated_at`.
    ///
    /// Returns `None` when no item with that id exists.
    async fn update_item(
        &self,
        id: ItemId,
        draft: ItemDraft,
        now: DateTime<Utc>,
    ) -> Result<Option<Item>, StoreError>;

    /// Delete an item and any reservation history referencing it.
    ///
    /// Returns whether a row was deleted. Callers are expected to have
    /// rejected the delete if active reservations exist.
    async fn delete_item(&self, id: ItemId) -> Result<bool, StoreError>;

    // ------------------------------------------------------------------
    // Events
    // ------------------------------------------------------------------

    /// List all events ordered by event date.
    async fn list_events(&self) -> Result<Vec<Event>, StoreError>;

    /// Fetch a single event.
    async fn get_event(&self, id: EventId) -> Result<Option<Event>, StoreError>;

    /// Insert a new event, assigning its id, and return the stored record.
    async fn insert_event(
        &self,
        draft: EventDraft,
        now: DateTime<Utc>,
    ) -> Result<Event, StoreError>;

    /// Replace an event's fields.
    ///
    /// Returns `None` when no event with that id exists.
    async fn update_event(
        &self,
        id: EventId,
        draft: EventDraft,
    ) -> Result<Option<Event>, StoreError>;

    /// Delete an event and any reservation history referencing it.
    async fn delete_event(&self, id: EventId) -> Result<bool, StoreError>;

    // ------------------------------------------------------------------
    // Reservations
    // ------------------------------------------------------------------

    /// List all reservations joined with item and event summaries, ordered
    /// by reservation time.
    async fn list_reservations(&self) -> Result<Vec<ReservationView>, StoreError>;

    /// Fetch a single reservation row.
    async fn get_reservation(
        &self,
        id: ReservationId,
    ) -> Result<Option<Reservation>, StoreError>;

    /// All active (`reserved`) reservations for one item.
    async fn active_reservations_for_item(
        &self,
        item_id: ItemId,
    ) -> Result<Vec<Reservation>, StoreError>;

    /// Sum of active reservation quantities per item, in one pass.
    ///
    /// Items with no active reservations are absent from the map.
    async fn reserved_totals(&self) -> Result<HashMap<ItemId, i64>, StoreError>;

    /// Number of active reservations referencing an item.
    async fn count_active_for_item(&self, id: ItemId) -> Result<i64, StoreError>;

    /// Number of active reservations referencing an event.
    async fn count_active_for_event(&self, id: EventId) -> Result<i64, StoreError>;

    /// Atomically validate and commit a reservation command.
    ///
    /// Runs the event-existence check and the stock/availability rule inside
    /// the implementation's transactional boundary, then inserts one row per
    /// line with status `reserved`. All-or-nothing: if any line fails, no
    /// rows are created.
    ///
    /// # Errors
    ///
    /// - [`InventoryError::NotFound`] when the event or an item is missing
    /// - [`InventoryError::ExceedsTotalStock`] /
    ///   [`InventoryError::InsufficientAvailability`] when a line does not fit
    /// - [`InventoryError::Store`] when the store itself fails
    async fn reserve(
        &self,
        command: &ReservationCommand,
        now: DateTime<Utc>,
    ) -> Result<Vec<Reservation>, InventoryError>;

    /// Conditionally flip a reservation to `returned`.
    ///
    /// Only an active reservation is updated; an already-returned row is
    /// reported as [`ReturnOutcome::AlreadyReturned`] with its stored
    /// notes and timestamps untouched.
    async fn finish_return(
        &self,
        id: ReservationId,
        condition_notes: Option<&str>,
        returned_by: Option<&str>,
        now: DateTime<Utc>,
    ) -> Result<ReturnOutcome, StoreError>;

    /// Distinct non-empty reserver/returner names, sorted lexicographically.
    async fn people(&self) -> Result<Vec<String>, StoreError>;

    /// Cheap connectivity check for readiness probes.
    async fn ping(&self) -> Result<(), StoreError>;
}
