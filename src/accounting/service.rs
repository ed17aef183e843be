//! Inventory service: the operations exposed to presentation callers.
//!
//! Every mutation validates its typed input first, then goes through the
//! entity store. Store failures are logged here and re-raised unchanged; the
//! one exception is the advisory person directory, which degrades to an
//! empty list instead of propagating.

use chrono::{DateTime, Utc};
use std::sync::Arc;
use tracing::{error, info, warn};

use crate::clock::Clock;
use crate::error::InventoryError;
use crate::store::{EntityStore, ReturnOutcome, StoreError};
use crate::types::{
    Event, EventDraft, EventId, Item, ItemAvailability, ItemDetail, ItemDraft, ItemId,
    Reservation, ReservationId, ReservationRequest, ReservationStatus, ReservationView,
};

/// Accounting operations over an [`EntityStore`].
#[derive(Clone)]
pub struct InventoryService {
    store: Arc<dyn EntityStore>,
    clock: Arc<dyn Clock>,
}

impl InventoryService {
    /// Creates a service over the given store and clock.
    #[must_use]
    pub fn new(store: Arc<dyn EntityStore>, clock: Arc<dyn Clock>) -> Self {
        Self { store, clock }
    }

    fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    /// Log a store failure at the accounting layer and re-raise it unchanged.
    fn raise(err: StoreError) -> InventoryError {
        error!(error = %err, "entity store failure");
        InventoryError::Store(err)
    }

    /// Cheap store connectivity check for readiness probes.
    ///
    /// # Errors
    ///
    /// Returns the store's error when the backing database is unreachable.
    pub async fn ping(&self) -> Result<(), StoreError> {
        self.store.ping().await
    }

    // ------------------------------------------------------------------
    // Items
    // ------------------------------------------------------------------

    /// List all items by name with computed availability.
    ///
    /// Availability for the whole listing is derived from a single pass over
    /// the active reservations rather than one query per item.
    ///
    /// # Errors
    ///
    /// Returns [`InventoryError::Store`] when the store fails.
    pub async fn list_items(&self) -> Result<Vec<ItemAvailability>, InventoryError> {
        let items = self.store.list_items().await.map_err(Self::raise)?;
        let totals = self.store.reserved_totals().await.map_err(Self::raise)?;
        Ok(items
            .into_iter()
            .map(|item| {
                let reserved = totals.get(&item.id).copied().unwrap_or(0);
                let available = super::availability::available_quantity(&item, reserved);
                ItemAvailability { item, reserved, available }
            })
            .collect())
    }

    /// Fetch one item with its availability and active reservations.
    ///
    /// # Errors
    ///
    /// Returns [`InventoryError::NotFound`] for an unknown id,
    /// [`InventoryError::Store`] when the store fails.
    pub async fn get_item(&self, id: ItemId) -> Result<ItemDetail, InventoryError> {
        let item = self.require_item(id).await?;
        let views = self.store.list_reservations().await.map_err(Self::raise)?;
        let active_reservations: Vec<ReservationView> = views
            .into_iter()
            .filter(|view| view.item.id == id && view.status == ReservationStatus::Reserved)
            .collect();
        let reserved: i64 = active_reservations
            .iter()
            .map(|view| i64::from(view.quantity))
            .sum();
        let available = super::availability::available_quantity(&item, reserved);
        Ok(ItemDetail { item, reserved, available, active_reservations })
    }

    /// Create an item.
    ///
    /// # Errors
    ///
    /// Returns [`InventoryError::InvalidInput`] for an empty name or
    /// category or a quantity below 1, [`InventoryError::Store`] when the
    /// store fails.
    pub async fn create_item(&self, draft: ItemDraft) -> Result<Item, InventoryError> {
        let draft = validate_item_draft(draft)?;
        let item = self
            .store
            .insert_item(draft, self.now())
            .await
            .map_err(Self::raise)?;
        info!(item_id = %item.id, name = %item.name, quantity = item.quantity, "item created");
        Ok(item)
    }

    /// Replace an item's fields.
    ///
    /// # Errors
    ///
    /// Same as [`Self::create_item`], plus [`InventoryError::NotFound`] for
    /// an unknown id.
    pub async fn update_item(&self, id: ItemId, draft: ItemDraft) -> Result<Item, InventoryError> {
        let draft = validate_item_draft(draft)?;
        self.store
            .update_item(id, draft, self.now())
            .await
            .map_err(Self::raise)?
            .ok_or_else(|| InventoryError::not_found("item", *id.as_uuid()))
    }

    /// Delete an item.
    ///
    /// Blocked while active reservations reference the item; with none left,
    /// the item and its returned-reservation history are removed.
    ///
    /// # Errors
    ///
    /// Returns [`InventoryError::InvalidInput`] when active reservations
    /// exist, [`InventoryError::NotFound`] for an unknown id,
    /// [`InventoryError::Store`] when the store fails.
    pub async fn delete_item(&self, id: ItemId) -> Result<(), InventoryError> {
        let active = self
            .store
            .count_active_for_item(id)
            .await
            .map_err(Self::raise)?;
        if active > 0 {
            return Err(InventoryError::InvalidInput(format!(
                "item still has {active} active reservation(s); return them before deleting"
            )));
        }
        if self.store.delete_item(id).await.map_err(Self::raise)? {
            info!(item_id = %id, "item deleted");
            Ok(())
        } else {
            Err(InventoryError::not_found("item", *id.as_uuid()))
        }
    }

    // ------------------------------------------------------------------
    // Events
    // ------------------------------------------------------------------

    /// List events ordered by date, optionally only those still upcoming.
    ///
    /// # Errors
    ///
    /// Returns [`InventoryError::Store`] when the store fails.
    pub async fn list_events(&self, upcoming_only: bool) -> Result<Vec<Event>, InventoryError> {
        let events = self.store.list_events().await.map_err(Self::raise)?;
        if upcoming_only {
            let now = self.now();
            Ok(events.into_iter().filter(|e| e.event_date >= now).collect())
        } else {
            Ok(events)
        }
    }

    /// Fetch one event.
    ///
    /// # Errors
    ///
    /// Returns [`InventoryError::NotFound`] for an unknown id,
    /// [`InventoryError::Store`] when the store fails.
    pub async fn get_event(&self, id: EventId) -> Result<Event, InventoryError> {
        self.store
            .get_event(id)
            .await
            .map_err(Self::raise)?
            .ok_or_else(|| InventoryError::not_found("event", *id.as_uuid()))
    }

    /// Create an event. The event date must be strictly in the future at
    /// the moment of the write.
    ///
    /// # Errors
    ///
    /// Returns [`InventoryError::InvalidInput`] for an empty name or a
    /// non-future date, [`InventoryError::Store`] when the store fails.
    pub async fn create_event(&self, draft: EventDraft) -> Result<Event, InventoryError> {
        let now = self.now();
        let draft = validate_event_draft(draft, now)?;
        let event = self
            .store
            .insert_event(draft, now)
            .await
            .map_err(Self::raise)?;
        info!(event_id = %event.id, name = %event.name, date = %event.event_date, "event created");
        Ok(event)
    }

    /// Replace an event's fields, re-applying the date-in-future check.
    ///
    /// # Errors
    ///
    /// Same as [`Self::create_event`], plus [`InventoryError::NotFound`] for
    /// an unknown id.
    pub async fn update_event(
        &self,
        id: EventId,
        draft: EventDraft,
    ) -> Result<Event, InventoryError> {
        let draft = validate_event_draft(draft, self.now())?;
        self.store
            .update_event(id, draft)
            .await
            .map_err(Self::raise)?
            .ok_or_else(|| InventoryError::not_found("event", *id.as_uuid()))
    }

    /// Delete an event, guarded the same way as item deletion.
    ///
    /// # Errors
    ///
    /// Returns [`InventoryError::InvalidInput`] when active reservations
    /// exist, [`InventoryError::NotFound`] for an unknown id,
    /// [`InventoryError::Store`] when the store fails.
    pub async fn delete_event(&self, id: EventId) -> Result<(), InventoryError> {
        let active = self
            .store
            .count_active_for_event(id)
            .await
            .map_err(Self::raise)?;
        if active > 0 {
            return Err(InventoryError::InvalidInput(format!(
                "event still has {active} active reservation(s); return them before deleting"
            )));
        }
        if self.store.delete_event(id).await.map_err(Self::raise)? {
            info!(event_id = %id, "event deleted");
            Ok(())
        } else {
            Err(InventoryError::not_found("event", *id.as_uuid()))
        }
    }

    // ------------------------------------------------------------------
    // Reservations
    // ------------------------------------------------------------------

    /// List all reservations joined with item and event summaries.
    ///
    /// # Errors
    ///
    /// Returns [`InventoryError::Store`] when the store fails.
    pub async fn list_reservations(&self) -> Result<Vec<ReservationView>, InventoryError> {
        self.store.list_reservations().await.map_err(Self::raise)
    }

    /// Remaining available quantity of one item.
    ///
    /// May be negative if the stock invariant was violated by a prior bug.
    ///
    /// # Errors
    ///
    /// Returns [`InventoryError::NotFound`] for an unknown item,
    /// [`InventoryError::Store`] when the store fails.
    pub async fn available_quantity(&self, id: ItemId) -> Result<i64, InventoryError> {
        Ok(self.item_availability(id).await?.available)
    }

    /// One item joined with its reserved sum and availability.
    ///
    /// # Errors
    ///
    /// Returns [`InventoryError::NotFound`] for an unknown item,
    /// [`InventoryError::Store`] when the store fails.
    pub async fn item_availability(&self, id: ItemId) -> Result<ItemAvailability, InventoryError> {
        let item = self.require_item(id).await?;
        let active = self
            .store
            .active_reservations_for_item(id)
            .await
            .map_err(Self::raise)?;
        let reserved: i64 = active.iter().map(|r| i64::from(r.quantity)).sum();
        let available = super::availability::available_quantity(&item, reserved);
        Ok(ItemAvailability { item, reserved, available })
    }

    /// Validate and commit a reservation request, single or bulk.
    ///
    /// The request shape is checked here; stock and availability are checked
    /// inside the store's transactional boundary so concurrent requests
    /// cannot overbook. All-or-nothing: a failing line creates no rows.
    ///
    /// # Errors
    ///
    /// Returns [`InventoryError::InvalidInput`] for a malformed request,
    /// [`InventoryError::NotFound`] for a missing event or item, one of the
    /// insufficient-stock variants when a line does not fit, and
    /// [`InventoryError::Store`] when the store fails.
    pub async fn create_reservation(
        &self,
        request: ReservationRequest,
    ) -> Result<Vec<Reservation>, InventoryError> {
        let command = request.validate()?;
        match self.store.reserve(&command, self.now()).await {
            Ok(created) => {
                info!(
                    event_id = %command.event_id,
                    reserved_by = %command.reserved_by,
                    lines = created.len(),
                    "reservation created"
                );
                Ok(created)
            }
            Err(InventoryError::Store(err)) => Err(Self::raise(err)),
            Err(err) => Err(err),
        }
    }

    /// Mark one reservation as returned.
    ///
    /// Returning an already-returned reservation is rejected; the stored
    /// notes and timestamps of the first return are never overwritten.
    ///
    /// # Errors
    ///
    /// Returns [`InventoryError::NotFound`] for an unknown id,
    /// [`InventoryError::InvalidInput`] when the reservation was already
    /// returned, [`InventoryError::Store`] when the store fails.
    pub async fn mark_returned(
        &self,
        id: ReservationId,
        condition_notes: Option<String>,
        returned_by: Option<String>,
    ) -> Result<Reservation, InventoryError> {
        let outcome = self
            .store
            .finish_return(
                id,
                normalize(condition_notes.as_deref()),
                normalize(returned_by.as_deref()),
                self.now(),
            )
            .await
            .map_err(Self::raise)?;
        match outcome {
            ReturnOutcome::Returned(reservation) => {
                info!(reservation_id = %id, "reservation returned");
                Ok(reservation)
            }
            ReturnOutcome::AlreadyReturned => Err(InventoryError::InvalidInput(format!(
                "reservation {id} was already returned"
            ))),
            ReturnOutcome::Missing => {
                Err(InventoryError::not_found("reservation", *id.as_uuid()))
            }
        }
    }

    /// Mark many reservations as returned with one shared notes/returner
    /// pair.
    ///
    /// Not atomic across the batch: rows are updated one by one and a
    /// mid-batch store failure leaves earlier rows returned; the failure is
    /// surfaced, never masked. Already-returned rows are skipped so a
    /// retried batch is idempotent. Returns the number of newly returned
    /// rows.
    ///
    /// # Errors
    ///
    /// Returns [`InventoryError::InvalidInput`] for an empty id list,
    /// [`InventoryError::NotFound`] when an id does not exist, and
    /// [`InventoryError::Store`] when the store fails partway.
    pub async fn mark_many_returned(
        &self,
        ids: &[ReservationId],
        condition_notes: Option<String>,
        returned_by: Option<String>,
    ) -> Result<usize, InventoryError> {
        if ids.is_empty() {
            return Err(InventoryError::InvalidInput(
                "no reservations selected".to_string(),
            ));
        }
        let notes = normalize(condition_notes.as_deref());
        let by = normalize(returned_by.as_deref());
        let now = self.now();
        let mut returned = 0_usize;
        for &id in ids {
            let outcome = self
                .store
                .finish_return(id, notes, by, now)
                .await
                .map_err(Self::raise)?;
            match outcome {
                ReturnOutcome::Returned(_) => returned += 1,
                ReturnOutcome::AlreadyReturned => {}
                ReturnOutcome::Missing => {
                    return Err(InventoryError::not_found("reservation", *id.as_uuid()));
                }
            }
        }
        info!(requested = ids.len(), returned, "bulk return completed");
        Ok(returned)
    }

    // ------------------------------------------------------------------
    // Person directory
    // ------------------------------------------------------------------

    /// Distinct, sorted reserver/returner names for input auto-suggestion.
    ///
    /// Advisory only: a store failure degrades to an empty list rather than
    /// propagating.
    pub async fn known_people(&self) -> Vec<String> {
        match self.store.people().await {
            Ok(people) => people,
            Err(err) => {
                warn!(error = %err, "person directory lookup failed, returning empty list");
                Vec::new()
            }
        }
    }

    async fn require_item(&self, id: ItemId) -> Result<Item, InventoryError> {
        self.store
            .get_item(id)
            .await
            .map_err(Self::raise)?
            .ok_or_else(|| InventoryError::not_found("item", *id.as_uuid()))
    }
}

fn validate_item_draft(draft: ItemDraft) -> Result<ItemDraft, InventoryError> {
    let name = draft.name.trim().to_string();
    if name.is_empty() {
        return Err(InventoryError::InvalidInput(
            "item name is required".to_string(),
        ));
    }
    let category = draft.category.trim().to_string();
    if category.is_empty() {
        return Err(InventoryError::InvalidInput(
            "item category is required".to_string(),
        ));
    }
    if draft.quantity < 1 {
        return Err(InventoryError::InvalidInput(
            "item quantity must be a positive integer".to_string(),
        ));
    }
    Ok(ItemDraft { name, category, ..draft })
}

fn validate_event_draft(
    draft: EventDraft,
    now: DateTime<Utc>,
) -> Result<EventDraft, InventoryError> {
    let name = draft.name.trim().to_string();
    if name.is_empty() {
        return Err(InventoryError::InvalidInput(
            "event name is required".to_string(),
        ));
    }
    if draft.event_date <= now {
        return Err(InventoryError::InvalidInput(
            "event date must be in the future".to_string(),
        ));
    }
    Ok(EventDraft { name, ..draft })
}

/// Empty or whitespace-only optional strings collapse to `None`.
fn normalize(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|s| !s.is_empty())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::clock::FixedClock;
    use crate::store::InMemoryStore;
    use async_trait::async_trait;
    use chrono::Duration;
    use std::collections::HashMap;

    fn service() -> (InventoryService, DateTime<Utc>) {
        let now = Utc::now();
        let service = InventoryService::new(
            Arc::new(InMemoryStore::new()),
            Arc::new(FixedClock::new(now)),
        );
        (service, now)
    }

    fn item_draft(name: &str, quantity: i32) -> ItemDraft {
        ItemDraft {
            name: name.to_string(),
            description: None,
            category: "Gear".to_string(),
            quantity,
            storage_location: None,
        }
    }

    #[tokio::test]
    async fn test_create_item_rejects_blank_name() {
        let (service, _) = service();
        let err = service.create_item(item_draft("  ", 3)).await.unwrap_err();
        assert!(matches!(err, InventoryError::InvalidInput(_)));
    }

    #[tokio::test]
    async fn test_create_item_rejects_zero_quantity() {
        let (service, _) = service();
        let err = service.create_item(item_draft("Tent", 0)).await.unwrap_err();
        assert!(matches!(err, InventoryError::InvalidInput(_)));
    }

    #[tokio::test]
    async fn test_create_event_rejects_past_date() {
        let (service, now) = service();
        let err = service
            .create_event(EventDraft {
                name: "Yesterday's picnic".to_string(),
                description: None,
                event_date: now - Duration::days(1),
                location: None,
            })
            .await
            .unwrap_err();
        assert!(matches!(err, InventoryError::InvalidInput(_)));
        // No row was created.
        assert!(service.list_events(false).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_update_event_revalidates_date() {
        let (service, now) = service();
        let event = service
            .create_event(EventDraft {
                name: "Fair".to_string(),
                description: None,
                event_date: now + Duration::days(3),
                location: None,
            })
            .await
            .unwrap();
        let err = service
            .update_event(
                event.id,
                EventDraft {
                    name: "Fair".to_string(),
                    description: None,
                    event_date: now - Duration::hours(1),
                    location: None,
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, InventoryError::InvalidInput(_)));
    }

    #[tokio::test]
    async fn test_list_events_upcoming_filter() {
        let now = Utc::now();
        let store = Arc::new(InMemoryStore::new());
        let service = InventoryService::new(store.clone(), Arc::new(FixedClock::new(now)));

        service
            .create_event(EventDraft {
                name: "Soon".to_string(),
                description: None,
                event_date: now + Duration::hours(2),
                location: None,
            })
            .await
            .unwrap();
        // A past event can only exist in the store (created before it aged
        // out); insert it directly, below the service's date check.
        store
            .insert_event(
                EventDraft {
                    name: "Last year's fair".to_string(),
                    description: None,
                    event_date: now - Duration::days(365),
                    location: None,
                },
                now - Duration::days(400),
            )
            .await
            .unwrap();

        assert_eq!(service.list_events(false).await.unwrap().len(), 2);
        let upcoming = service.list_events(true).await.unwrap();
        assert_eq!(upcoming.len(), 1);
        assert_eq!(upcoming[0].name, "Soon");
    }

    /// Store stub whose every operation fails, for the degradation paths.
    struct BrokenStore;

    fn broken() -> StoreError {
        StoreError::Database("connection refused".to_string())
    }

    #[async_trait]
    impl EntityStore for BrokenStore {
        async fn list_items(&self) -> Result<Vec<Item>, StoreError> {
            Err(broken())
        }
        async fn get_item(&self, _id: ItemId) -> Result<Option<Item>, StoreError> {
            Err(broken())
        }
        async fn insert_item(
            &self,
            _draft: ItemDraft,
            _now: DateTime<Utc>,
        ) -> Result<Item, StoreError> {
            Err(broken())
        }
        async fn update_item(
            &self,
            _id: ItemId,
            _draft: ItemDraft,
            _now: DateTime<Utc>,
        ) -> Result<Option<Item>, StoreError> {
            Err(broken())
        }
        async fn delete_item(&self, _id: ItemId) -> Result<bool, StoreError> {
            Err(broken())
        }
        async fn list_events(&self) -> Result<Vec<Event>, StoreError> {
            Err(broken())
        }
        async fn get_event(&self, _id: EventId) -> Result<Option<Event>, StoreError> {
            Err(broken())
        }
        async fn insert_event(
            &self,
            _draft: EventDraft,
            _now: DateTime<Utc>,
        ) -> Result<Event, StoreError> {
            Err(broken())
        }
        async fn update_event(
            &self,
            _id: EventId,
            _draft: EventDraft,
        ) -> Result<Option<Event>, StoreError> {
            Err(broken())
        }
        async fn delete_event(&self, _id: EventId) -> Result<bool, StoreError> {
            Err(broken())
        }
        async fn list_reservations(&self) -> Result<Vec<ReservationView>, StoreError> {
            Err(broken())
        }
        async fn get_reservation(
            &self,
            _id: ReservationId,
        ) -> Result<Option<Reservation>, StoreError> {
            Err(broken())
        }
        async fn active_reservations_for_item(
            &self,
            _item_id: ItemId,
        ) -> Result<Vec<Reservation>, StoreError> {
            Err(broken())
        }
        async fn reserved_totals(&self) -> Result<HashMap<ItemId, i64>, StoreError> {
            Err(broken())
        }
        async fn count_active_for_item(&self, _id: ItemId) -> Result<i64, StoreError> {
            Err(broken())
        }
        async fn count_active_for_event(&self, _id: EventId) -> Result<i64, StoreError> {
            Err(broken())
        }
        async fn reserve(
            &self,
            _command: &crate::types::ReservationCommand,
            _now: DateTime<Utc>,
        ) -> Result<Vec<Reservation>, InventoryError> {
            Err(InventoryError::Store(broken()))
        }
        async fn finish_return(
            &self,
            _id: ReservationId,
            _condition_notes: Option<&str>,
            _returned_by: Option<&str>,
            _now: DateTime<Utc>,
        ) -> Result<ReturnOutcome, StoreError> {
            Err(broken())
        }
        async fn people(&self) -> Result<Vec<String>, StoreError> {
            Err(broken())
        }
        async fn ping(&self) -> Result<(), StoreError> {
            Err(broken())
        }
    }

    #[tokio::test]
    async fn test_known_people_swallows_store_failure() {
        let now = Utc::now();
        let service =
            InventoryService::new(Arc::new(BrokenStore), Arc::new(FixedClock::new(now)));
        assert!(service.known_people().await.is_empty());
    }

    #[tokio::test]
    async fn test_other_operations_surface_store_failure() {
        let now = Utc::now();
        let service =
            InventoryService::new(Arc::new(BrokenStore), Arc::new(FixedClock::new(now)));
        assert!(matches!(
            service.list_items().await.unwrap_err(),
            InventoryError::Store(_)
        ));
        assert!(matches!(
            service.list_reservations().await.unwrap_err(),
            InventoryError::Store(_)
        ));
    }
}
