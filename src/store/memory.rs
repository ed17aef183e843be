//! In-memory entity store for fast, deterministic testing.
//!
//! Mirrors the Postgres implementation's semantics exactly: the same
//! validation rule runs for `reserve`, a single write guard stands in for
//! the row-locking transaction, and deleting an item or event removes its
//! remaining reservation history just like `ON DELETE CASCADE`.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::{BTreeSet, HashMap};
use std::sync::RwLock;

use super::{EntityStore, ReturnOutcome, StoreError};
use crate::accounting::availability::validate_lines;
use crate::error::InventoryError;
use crate::types::{
    Event, EventDraft, EventId, EventSummary, Item, ItemDraft, ItemId, ItemSummary, Reservation,
    ReservationCommand, ReservationId, ReservationStatus, ReservationView,
};

#[derive(Default)]
struct Tables {
    items: HashMap<ItemId, Item>,
    events: HashMap<EventId, Event>,
    reservations: HashMap<ReservationId, Reservation>,
}

impl Tables {
    fn view(&self, reservation: &Reservation) -> Option<ReservationView> {
        let item = self.items.get(&reservation.item_id)?;
        let event = self.events.get(&reservation.event_id)?;
        Some(ReservationView {
            id: reservation.id,
            item: ItemSummary {
                id: item.id,
                name: item.name.clone(),
                category: item.category.clone(),
            },
            event: EventSummary {
                id: event.id,
                name: event.name.clone(),
                event_date: event.event_date,
            },
            quantity: reservation.quantity,
            status: reservation.status,
            condition_notes: reservation.condition_notes.clone(),
            reserved_by: reservation.reserved_by.clone(),
            returned_by: reservation.returned_by.clone(),
            reserved_at: reservation.reserved_at,
            returned_at: reservation.returned_at,
        })
    }
}

/// In-memory [`EntityStore`] backed by hash maps behind one `RwLock`.
#[derive(Default)]
pub struct InMemoryStore {
    tables: RwLock<Tables>,
}

impl InMemoryStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> Result<std::sync::RwLockReadGuard<'_, Tables>, StoreError> {
        self.tables
            .read()
            .map_err(|_| StoreError::Database("store lock poisoned".to_string()))
    }

    fn write(&self) -> Result<std::sync::RwLockWriteGuard<'_, Tables>, StoreError> {
        self.tables
            .write()
            .map_err(|_| StoreError::Database("store lock poisoned".to_string()))
    }
}

#[async_trait]
impl EntityStore for InMemoryStore {
    async fn list_items(&self) -> Result<Vec<Item>, StoreError> {
        let tables = self.read()?;
        let mut items: Vec<Item> = tables.items.values().cloned().collect();
        items.sort_by(|a, b| a.name.cmp(&b.name).then_with(|| a.id.cmp(&b.id)));
        Ok(items)
    }

    async fn get_item(&self, id: ItemId) -> Result<Option<Item>, StoreError> {
        Ok(self.read()?.items.get(&id).cloned())
    }

    async fn insert_item(&self, draft: ItemDraft, now: DateTime<Utc>) -> Result<Item, StoreError> {
        let item = Item {
            id: ItemId::new(),
            name: draft.name,
            description: draft.description,
            category: draft.category,
            quantity: draft.quantity,
            storage_location: draft.storage_location,
            created_at: now,
            updated_at: now,
        };
        self.write()?.items.insert(item.id, item.clone());
        Ok(item)
    }

    async fn update_item(
        &self,
        id: ItemId,
        draft: ItemDraft,
        now: DateTime<Utc>,
    ) -> Result<Option<Item>, StoreError> {
        let mut tables = self.write()?;
        let Some(item) = tables.items.get_mut(&id) else {
            return Ok(None);
        };
        item.name = draft.name;
        item.description = draft.description;
        item.category = draft.category;
        item.quantity = draft.quantity;
        item.storage_location = draft.storage_location;
        item.updated_at = now;
        Ok(Some(item.clone()))
    }

    async fn delete_item(&self, id: ItemId) -> Result<bool, StoreError> {
        let mut tables = self.write()?;
        let removed = tables.items.remove(&id).is_some();
        if removed {
            tables.reservations.retain(|_, r| r.item_id != id);
        }
        Ok(removed)
    }

    async fn list_events(&self) -> Result<Vec<Event>, StoreError> {
        let tables = self.read()?;
        let mut events: Vec<Event> = tables.events.values().cloned().collect();
        events.sort_by(|a, b| {
            a.event_date
                .cmp(&b.event_date)
                .then_with(|| a.id.as_uuid().cmp(b.id.as_uuid()))
        });
        Ok(events)
    }

    async fn get_event(&self, id: EventId) -> Result<Option<Event>, StoreError> {
        Ok(self.read()?.events.get(&id).cloned())
    }

    async fn insert_event(
        &self,
        draft: EventDraft,
        now: DateTime<Utc>,
    ) -> Result<Event, StoreError> {
        let event = Event {
            id: EventId::new(),
            name: draft.name,
            description: draft.description,
            event_date: draft.event_date,
            location: draft.location,
            created_at: now,
        };
        self.write()?.events.insert(event.id, event.clone());
        Ok(event)
    }

    async fn update_event(
        &self,
        id: EventId,
        draft: EventDraft,
    ) -> Result<Option<Event>, StoreError> {
        let mut tables = self.write()?;
        let Some(event) = tables.events.get_mut(&id) else {
            return Ok(None);
        };
        event.name = draft.name;
        event.description = draft.description;
        event.event_date = draft.event_date;
        event.location = draft.location;
        Ok(Some(event.clone()))
    }

    async fn delete_event(&self, id: EventId) -> Result<bool, StoreError> {
        let mut tables = self.write()?;
        let removed = tables.events.remove(&id).is_some();
        if removed {
            tables.reservations.retain(|_, r| r.event_id != id);
        }
        Ok(removed)
    }

    async fn list_reservations(&self) -> Result<Vec<ReservationView>, StoreError> {
        let tables = self.read()?;
        let mut views: Vec<ReservationView> = tables
            .reservations
            .values()
            .filter_map(|r| tables.view(r))
            .collect();
        views.sort_by(|a, b| {
            a.reserved_at
                .cmp(&b.reserved_at)
                .then_with(|| a.id.as_uuid().cmp(b.id.as_uuid()))
        });
        Ok(views)
    }

    async fn get_reservation(
        &self,
        id: ReservationId,
    ) -> Result<Option<Reservation>, StoreError> {
        Ok(self.read()?.reservations.get(&id).cloned())
    }

    async fn active_reservations_for_item(
        &self,
        item_id: ItemId,
    ) -> Result<Vec<Reservation>, StoreError> {
        let tables = self.read()?;
        let mut active: Vec<Reservation> = tables
            .reservations
            .values()
            .filter(|r| r.item_id == item_id && r.is_active())
            .cloned()
            .collect();
        active.sort_by(|a, b| {
            a.reserved_at
                .cmp(&b.reserved_at)
                .then_with(|| a.id.as_uuid().cmp(b.id.as_uuid()))
        });
        Ok(active)
    }

    async fn reserved_totals(&self) -> Result<HashMap<ItemId, i64>, StoreError> {
        let tables = self.read()?;
        Ok(crate::accounting::availability::reserved_totals(
            tables.reservations.values(),
        ))
    }

    async fn count_active_for_item(&self, id: ItemId) -> Result<i64, StoreError> {
        let tables = self.read()?;
        #[allow(clippy::cast_possible_wrap)] // Counts fit in i64 range
        Ok(tables
            .reservations
            .values()
            .filter(|r| r.item_id == id && r.is_active())
            .count() as i64)
    }

    async fn count_active_for_event(&self, id: EventId) -> Result<i64, StoreError> {
        let tables = self.read()?;
        #[allow(clippy::cast_possible_wrap)] // Counts fit in i64 range
        Ok(tables
            .reservations
            .values()
            .filter(|r| r.event_id == id && r.is_active())
            .count() as i64)
    }

    async fn reserve(
        &self,
        command: &ReservationCommand,
        now: DateTime<Utc>,
    ) -> Result<Vec<Reservation>, InventoryError> {
        // One write guard stands in for the Postgres row-locking transaction:
        // nothing can change between validation and insertion.
        let mut tables = self
            .write()
            .map_err(InventoryError::Store)?;

        if !tables.events.contains_key(&command.event_id) {
            return Err(InventoryError::not_found(
                "event",
                *command.event_id.as_uuid(),
            ));
        }

        let requested: Vec<ItemId> = command.lines.iter().map(|l| l.item_id).collect();
        let items: HashMap<ItemId, Item> = requested
            .iter()
            .filter_map(|id| tables.items.get(id).map(|item| (*id, item.clone())))
            .collect();
        let reserved =
            crate::accounting::availability::reserved_totals(tables.reservations.values());

        validate_lines(&items, &reserved, &command.lines)?;

        let mut created = Vec::with_capacity(command.lines.len());
        for line in &command.lines {
            let reservation = Reservation {
                id: ReservationId::new(),
                item_id: line.item_id,
                event_id: command.event_id,
                quantity: line.quantity,
                status: ReservationStatus::Reserved,
                condition_notes: None,
                reserved_by: Some(command.reserved_by.clone()),
                returned_by: None,
                reserved_at: now,
                returned_at: None,
            };
            tables.reservations.insert(reservation.id, reservation.clone());
            created.push(reservation);
        }
        Ok(created)
    }

    async fn finish_return(
        &self,
        id: ReservationId,
        condition_notes: Option<&str>,
        returned_by: Option<&str>,
        now: DateTime<Utc>,
    ) -> Result<ReturnOutcome, StoreError> {
        let mut tables = self.write()?;
        let Some(reservation) = tables.reservations.get_mut(&id) else {
            return Ok(ReturnOutcome::Missing);
        };
        if !reservation.is_active() {
            return Ok(ReturnOutcome::AlreadyReturned);
        }
        reservation.status = ReservationStatus::Returned;
        reservation.condition_notes = condition_notes.map(str::to_string);
        reservation.returned_by = returned_by.map(str::to_string);
        reservation.returned_at = Some(now);
        Ok(ReturnOutcome::Returned(reservation.clone()))
    }

    async fn people(&self) -> Result<Vec<String>, StoreError> {
        let tables = self.read()?;
        let mut names = BTreeSet::new();
        for reservation in tables.reservations.values() {
            for name in [&reservation.reserved_by, &reservation.returned_by] {
                if let Some(name) = name {
                    let trimmed = name.trim();
                    if !trimmed.is_empty() {
                        names.insert(trimmed.to_string());
                    }
                }
            }
        }
        Ok(names.into_iter().collect())
    }

    async fn ping(&self) -> Result<(), StoreError> {
        self.read().map(|_| ())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::panic)]
mod tests {
    use super::*;
    use crate::types::{ReservationLine, ReservationRequest};
    use chrono::Duration;

    fn draft(name: &str, quantity: i32) -> ItemDraft {
        ItemDraft {
            name: name.to_string(),
            description: None,
            category: "Gear".to_string(),
            quantity,
            storage_location: None,
        }
    }

    fn event_draft(name: &str, now: DateTime<Utc>) -> EventDraft {
        EventDraft {
            name: name.to_string(),
            description: None,
            event_date: now + Duration::days(7),
            location: None,
        }
    }

    async fn reserve_one(
        store: &InMemoryStore,
        event_id: EventId,
        item_id: ItemId,
        quantity: i32,
        now: DateTime<Utc>,
    ) -> Result<Vec<Reservation>, InventoryError> {
        let command = ReservationRequest {
            event_id,
            reserved_by: "Alice".to_string(),
            lines: vec![ReservationLine { item_id, quantity }],
        }
        .validate()
        .unwrap();
        store.reserve(&command, now).await
    }

    #[tokio::test]
    async fn test_items_are_listed_by_name() {
        let store = InMemoryStore::new();
        let now = Utc::now();
        store.insert_item(draft("Tent", 2), now).await.unwrap();
        store.insert_item(draft("Cooler", 1), now).await.unwrap();
        store.insert_item(draft("Projector", 1), now).await.unwrap();

        let names: Vec<String> = store
            .list_items()
            .await
            .unwrap()
            .into_iter()
            .map(|i| i.name)
            .collect();
        assert_eq!(names, vec!["Cooler", "Projector", "Tent"]);
    }

    #[tokio::test]
    async fn test_reserve_is_all_or_nothing() {
        let store = InMemoryStore::new();
        let now = Utc::now();
        let a = store.insert_item(draft("A", 5), now).await.unwrap();
        let b = store.insert_item(draft("B", 2), now).await.unwrap();
        let event = store.insert_event(event_draft("Fair", now), now).await.unwrap();

        let command = ReservationRequest {
            event_id: event.id,
            reserved_by: "Alice".to_string(),
            lines: vec![
                ReservationLine { item_id: a.id, quantity: 3 },
                ReservationLine { item_id: b.id, quantity: 5 },
            ],
        }
        .validate()
        .unwrap();

        let err = store.reserve(&command, now).await.unwrap_err();
        assert!(err.is_insufficient_stock());
        assert!(store.list_reservations().await.unwrap().is_empty());
        assert_eq!(store.reserved_totals().await.unwrap().get(&a.id), None);
    }

    #[tokio::test]
    async fn test_finish_return_is_conditional() {
        let store = InMemoryStore::new();
        let now = Utc::now();
        let tent = store.insert_item(draft("Tent", 10), now).await.unwrap();
        let event = store.insert_event(event_draft("Picnic", now), now).await.unwrap();
        let created = reserve_one(&store, event.id, tent.id, 4, now).await.unwrap();
        let id = created[0].id;

        let later = now + Duration::hours(1);
        let outcome = store
            .finish_return(id, Some("dirty"), Some("Bob"), later)
            .await
            .unwrap();
        let ReturnOutcome::Returned(returned) = outcome else {
            panic!("expected Returned outcome");
        };
        assert_eq!(returned.status, ReservationStatus::Returned);
        assert_eq!(returned.returned_at, Some(later));

        // Second return must not re-apply anything.
        let again = store
            .finish_return(id, Some("overwritten?"), Some("Mallory"), later + Duration::hours(1))
            .await
            .unwrap();
        assert_eq!(again, ReturnOutcome::AlreadyReturned);
        let row = store.get_reservation(id).await.unwrap().unwrap();
        assert_eq!(row.condition_notes.as_deref(), Some("dirty"));
        assert_eq!(row.returned_by.as_deref(), Some("Bob"));
        assert_eq!(row.returned_at, Some(later));
    }

    #[tokio::test]
    async fn test_delete_item_removes_history() {
        let store = InMemoryStore::new();
        let now = Utc::now();
        let tent = store.insert_item(draft("Tent", 10), now).await.unwrap();
        let event = store.insert_event(event_draft("Picnic", now), now).await.unwrap();
        let created = reserve_one(&store, event.id, tent.id, 1, now).await.unwrap();
        store
            .finish_return(created[0].id, None, None, now)
            .await
            .unwrap();

        assert!(store.delete_item(tent.id).await.unwrap());
        assert!(store.list_reservations().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_people_are_distinct_and_sorted() {
        let store = InMemoryStore::new();
        let now = Utc::now();
        let tent = store.insert_item(draft("Tent", 10), now).await.unwrap();
        let event = store.insert_event(event_draft("Picnic", now), now).await.unwrap();
        for name in ["Zoe", "Alice", "Zoe"] {
            let command = ReservationRequest {
                event_id: event.id,
                reserved_by: name.to_string(),
                lines: vec![ReservationLine { item_id: tent.id, quantity: 1 }],
            }
            .validate()
            .unwrap();
            store.reserve(&command, now).await.unwrap();
        }
        let views = store.list_reservations().await.unwrap();
        store
            .finish_return(views[0].id, None, Some("Bob"), now)
            .await
            .unwrap();

        assert_eq!(store.people().await.unwrap(), vec!["Alice", "Bob", "Zoe"]);
    }
}
