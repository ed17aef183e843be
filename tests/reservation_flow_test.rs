//! End-to-end accounting flows over the in-memory entity store.
//!
//! Exercises the reservation lifecycle through the service exactly as the
//! HTTP layer drives it: availability arithmetic, bulk all-or-nothing
//! validation, the return workflow, delete guards, and the person
//! directory.

#![allow(clippy::unwrap_used, clippy::panic)]

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use quartermaster::{
    EntityStore, EventDraft, EventId, FixedClock, InMemoryStore, InventoryError,
    InventoryService, ItemDraft, ItemId, ReservationLine, ReservationRequest, ReservationStatus,
};

struct Fixture {
    service: InventoryService,
    store: Arc<InMemoryStore>,
    now: DateTime<Utc>,
}

fn fixture() -> Fixture {
    let now = Utc::now();
    let store = Arc::new(InMemoryStore::new());
    let service = InventoryService::new(store.clone(), Arc::new(FixedClock::new(now)));
    Fixture { service, store, now }
}

fn item_draft(name: &str, quantity: i32) -> ItemDraft {
    ItemDraft {
        name: name.to_string(),
        description: None,
        category: "Camping".to_string(),
        quantity,
        storage_location: Some("Shelf B".to_string()),
    }
}

fn event_draft(name: &str, date: DateTime<Utc>) -> EventDraft {
    EventDraft {
        name: name.to_string(),
        description: None,
        event_date: date,
        location: Some("Riverside park".to_string()),
    }
}

fn single(event_id: EventId, reserved_by: &str, item_id: ItemId, quantity: i32) -> ReservationRequest {
    ReservationRequest {
        event_id,
        reserved_by: reserved_by.to_string(),
        lines: vec![ReservationLine { item_id, quantity }],
    }
}

/// Tent (10) reserved for the Picnic by Alice, returned dirty by Bob,
/// availability restored.
#[tokio::test]
async fn test_reserve_and_return_round_trip() {
    let f = fixture();
    let tent = f.service.create_item(item_draft("Tent", 10)).await.unwrap();
    let picnic = f
        .service
        .create_event(event_draft("Picnic", f.now + Duration::weeks(1)))
        .await
        .unwrap();

    let created = f
        .service
        .create_reservation(single(picnic.id, "Alice", tent.id, 4))
        .await
        .unwrap();
    assert_eq!(created.len(), 1);
    assert_eq!(created[0].status, ReservationStatus::Reserved);
    assert_eq!(created[0].reserved_by.as_deref(), Some("Alice"));

    assert_eq!(f.service.available_quantity(tent.id).await.unwrap(), 6);

    let returned = f
        .service
        .mark_returned(
            created[0].id,
            Some("dirty".to_string()),
            Some("Bob".to_string()),
        )
        .await
        .unwrap();
    assert_eq!(returned.status, ReservationStatus::Returned);
    assert_eq!(returned.condition_notes.as_deref(), Some("dirty"));
    assert_eq!(returned.returned_by.as_deref(), Some("Bob"));
    assert!(returned.returned_at.is_some());

    assert_eq!(f.service.available_quantity(tent.id).await.unwrap(), 10);
}

/// The reserved-sum invariant holds after every successful reservation.
#[tokio::test]
async fn test_reserved_sum_never_exceeds_stock() {
    let f = fixture();
    let tent = f.service.create_item(item_draft("Tent", 10)).await.unwrap();
    let picnic = f
        .service
        .create_event(event_draft("Picnic", f.now + Duration::weeks(1)))
        .await
        .unwrap();

    let mut accepted = 0_i64;
    for quantity in [4, 3, 2, 2, 1] {
        match f
            .service
            .create_reservation(single(picnic.id, "Alice", tent.id, quantity))
            .await
        {
            Ok(_) => accepted += i64::from(quantity),
            Err(err) => assert!(err.is_insufficient_stock()),
        }
        let totals = f.store.reserved_totals().await.unwrap();
        let reserved = totals.get(&tent.id).copied().unwrap_or(0);
        assert!(reserved <= i64::from(tent.quantity));
        assert_eq!(reserved, accepted);
    }
}

/// Availability decreases by exactly the reserved quantity per reservation.
#[tokio::test]
async fn test_availability_decrements_per_reservation() {
    let f = fixture();
    let crates = f.service.create_item(item_draft("Crate", 8)).await.unwrap();
    let fair = f
        .service
        .create_event(event_draft("Fair", f.now + Duration::days(3)))
        .await
        .unwrap();

    assert_eq!(f.service.available_quantity(crates.id).await.unwrap(), 8);
    f.service
        .create_reservation(single(fair.id, "Alice", crates.id, 3))
        .await
        .unwrap();
    assert_eq!(f.service.available_quantity(crates.id).await.unwrap(), 5);
    f.service
        .create_reservation(single(fair.id, "Bob", crates.id, 2))
        .await
        .unwrap();
    assert_eq!(f.service.available_quantity(crates.id).await.unwrap(), 3);
}

/// Bulk reservation is all-or-nothing: one failing line creates zero rows.
#[tokio::test]
async fn test_bulk_reservation_is_atomic_on_validation() {
    let f = fixture();
    let a = f.service.create_item(item_draft("A", 5)).await.unwrap();
    let b = f.service.create_item(item_draft("B", 2)).await.unwrap();
    let fair = f
        .service
        .create_event(event_draft("Fair", f.now + Duration::days(3)))
        .await
        .unwrap();

    let err = f
        .service
        .create_reservation(ReservationRequest {
            event_id: fair.id,
            reserved_by: "Alice".to_string(),
            lines: vec![
                ReservationLine { item_id: a.id, quantity: 3 },
                ReservationLine { item_id: b.id, quantity: 5 },
            ],
        })
        .await
        .unwrap_err();
    assert!(err.is_insufficient_stock());

    assert!(f.service.list_reservations().await.unwrap().is_empty());
    assert_eq!(f.service.available_quantity(a.id).await.unwrap(), 5);
    assert_eq!(f.service.available_quantity(b.id).await.unwrap(), 2);
}

/// Requesting exactly the available amount succeeds; one more fails.
#[tokio::test]
async fn test_boundary_at_exact_availability() {
    let f = fixture();
    let tent = f.service.create_item(item_draft("Tent", 6)).await.unwrap();
    let fair = f
        .service
        .create_event(event_draft("Fair", f.now + Duration::days(3)))
        .await
        .unwrap();

    f.service
        .create_reservation(single(fair.id, "Alice", tent.id, 2))
        .await
        .unwrap();
    // 4 remain; 5 must fail, 4 must succeed.
    let err = f
        .service
        .create_reservation(single(fair.id, "Bob", tent.id, 5))
        .await
        .unwrap_err();
    match err {
        InventoryError::InsufficientAvailability { available, requested, .. } => {
            assert_eq!(available, 4);
            assert_eq!(requested, 5);
        }
        other => panic!("expected InsufficientAvailability, got {other:?}"),
    }
    f.service
        .create_reservation(single(fair.id, "Bob", tent.id, 4))
        .await
        .unwrap();
    assert_eq!(f.service.available_quantity(tent.id).await.unwrap(), 0);
}

/// A request above total stock fails with the total-stock message even on a
/// fresh item.
#[tokio::test]
async fn test_request_above_total_stock() {
    let f = fixture();
    let tent = f.service.create_item(item_draft("Tent", 5)).await.unwrap();
    let fair = f
        .service
        .create_event(event_draft("Fair", f.now + Duration::days(3)))
        .await
        .unwrap();

    let err = f
        .service
        .create_reservation(single(fair.id, "Alice", tent.id, 6))
        .await
        .unwrap_err();
    match err {
        InventoryError::ExceedsTotalStock { total, requested, item } => {
            assert_eq!(total, 5);
            assert_eq!(requested, 6);
            assert_eq!(item, "Tent");
        }
        other => panic!("expected ExceedsTotalStock, got {other:?}"),
    }
}

/// Returning twice is rejected and must not re-apply any side effects.
#[tokio::test]
async fn test_double_return_is_rejected() {
    let f = fixture();
    let tent = f.service.create_item(item_draft("Tent", 10)).await.unwrap();
    let fair = f
        .service
        .create_event(event_draft("Fair", f.now + Duration::days(3)))
        .await
        .unwrap();
    let created = f
        .service
        .create_reservation(single(fair.id, "Alice", tent.id, 4))
        .await
        .unwrap();
    let id = created[0].id;

    f.service
        .mark_returned(id, Some("worn".to_string()), Some("Bob".to_string()))
        .await
        .unwrap();
    assert_eq!(f.service.available_quantity(tent.id).await.unwrap(), 10);

    let err = f
        .service
        .mark_returned(id, Some("scratched".to_string()), Some("Mallory".to_string()))
        .await
        .unwrap_err();
    assert!(matches!(err, InventoryError::InvalidInput(_)));

    // Availability is unchanged and the first return's record stands.
    assert_eq!(f.service.available_quantity(tent.id).await.unwrap(), 10);
    let row = f.store.get_reservation(id).await.unwrap().unwrap();
    assert_eq!(row.condition_notes.as_deref(), Some("worn"));
    assert_eq!(row.returned_by.as_deref(), Some("Bob"));
}

/// Bulk return shares one notes/returner pair, skips already-returned rows,
/// and rejects an empty id list.
#[tokio::test]
async fn test_bulk_return() {
    let f = fixture();
    let tent = f.service.create_item(item_draft("Tent", 10)).await.unwrap();
    let fair = f
        .service
        .create_event(event_draft("Fair", f.now + Duration::days(3)))
        .await
        .unwrap();

    let first = f
        .service
        .create_reservation(single(fair.id, "Alice", tent.id, 2))
        .await
        .unwrap()[0]
        .id;
    let second = f
        .service
        .create_reservation(single(fair.id, "Carol", tent.id, 3))
        .await
        .unwrap()[0]
        .id;

    // Empty list is invalid input.
    let err = f.service.mark_many_returned(&[], None, None).await.unwrap_err();
    assert!(matches!(err, InventoryError::InvalidInput(_)));

    // Return the first alone, then both in bulk: the already-returned row
    // is skipped, not re-applied.
    f.service
        .mark_returned(first, Some("fine".to_string()), Some("Bob".to_string()))
        .await
        .unwrap();
    let returned = f
        .service
        .mark_many_returned(
            &[first, second],
            Some("end of season".to_string()),
            Some("Dana".to_string()),
        )
        .await
        .unwrap();
    assert_eq!(returned, 1);

    let first_row = f.store.get_reservation(first).await.unwrap().unwrap();
    assert_eq!(first_row.condition_notes.as_deref(), Some("fine"));
    let second_row = f.store.get_reservation(second).await.unwrap().unwrap();
    assert_eq!(second_row.condition_notes.as_deref(), Some("end of season"));
    assert_eq!(second_row.returned_by.as_deref(), Some("Dana"));
    assert_eq!(f.service.available_quantity(tent.id).await.unwrap(), 10);
}

/// A bulk return naming an unknown reservation surfaces the failure.
#[tokio::test]
async fn test_bulk_return_unknown_id() {
    let f = fixture();
    let err = f
        .service
        .mark_many_returned(&[quartermaster::ReservationId::new()], None, None)
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        InventoryError::NotFound { entity: "reservation", .. }
    ));
}

/// Events dated in the past are rejected and create no row.
#[tokio::test]
async fn test_past_event_date_rejected() {
    let f = fixture();
    let err = f
        .service
        .create_event(event_draft("Yesterday", f.now - Duration::days(1)))
        .await
        .unwrap_err();
    assert!(matches!(err, InventoryError::InvalidInput(_)));
    assert!(f.service.list_events(false).await.unwrap().is_empty());
}

/// Reserving against a missing event or item fails with NotFound and
/// creates nothing.
#[tokio::test]
async fn test_reservation_against_missing_references() {
    let f = fixture();
    let tent = f.service.create_item(item_draft("Tent", 5)).await.unwrap();

    let err = f
        .service
        .create_reservation(single(EventId::new(), "Alice", tent.id, 1))
        .await
        .unwrap_err();
    assert!(matches!(err, InventoryError::NotFound { entity: "event", .. }));

    let fair = f
        .service
        .create_event(event_draft("Fair", f.now + Duration::days(3)))
        .await
        .unwrap();
    let err = f
        .service
        .create_reservation(single(fair.id, "Alice", ItemId::new(), 1))
        .await
        .unwrap_err();
    assert!(matches!(err, InventoryError::NotFound { entity: "item", .. }));

    assert!(f.service.list_reservations().await.unwrap().is_empty());
}

/// Deleting an item or event is blocked while active reservations exist
/// and allowed once they are returned.
#[tokio::test]
async fn test_delete_guard() {
    let f = fixture();
    let tent = f.service.create_item(item_draft("Tent", 5)).await.unwrap();
    let fair = f
        .service
        .create_event(event_draft("Fair", f.now + Duration::days(3)))
        .await
        .unwrap();
    let created = f
        .service
        .create_reservation(single(fair.id, "Alice", tent.id, 1))
        .await
        .unwrap();

    let err = f.service.delete_item(tent.id).await.unwrap_err();
    assert!(matches!(err, InventoryError::InvalidInput(_)));
    let err = f.service.delete_event(fair.id).await.unwrap_err();
    assert!(matches!(err, InventoryError::InvalidInput(_)));

    f.service
        .mark_returned(created[0].id, None, None)
        .await
        .unwrap();
    f.service.delete_item(tent.id).await.unwrap();
    f.service.delete_event(fair.id).await.unwrap();

    // History rows went with the records they referenced.
    assert!(f.service.list_reservations().await.unwrap().is_empty());
}

/// The person directory combines reservers and returners, deduplicated and
/// sorted.
#[tokio::test]
async fn test_known_people() {
    let f = fixture();
    let tent = f.service.create_item(item_draft("Tent", 10)).await.unwrap();
    let fair = f
        .service
        .create_event(event_draft("Fair", f.now + Duration::days(3)))
        .await
        .unwrap();

    let first = f
        .service
        .create_reservation(single(fair.id, "Zoe", tent.id, 1))
        .await
        .unwrap()[0]
        .id;
    f.service
        .create_reservation(single(fair.id, "Alice", tent.id, 1))
        .await
        .unwrap();
    f.service
        .create_reservation(single(fair.id, "Zoe", tent.id, 1))
        .await
        .unwrap();
    f.service
        .mark_returned(first, None, Some("Bob".to_string()))
        .await
        .unwrap();

    assert_eq!(f.service.known_people().await, vec!["Alice", "Bob", "Zoe"]);
}

/// Reservation views carry item and event summaries ordered by reservation
/// time.
#[tokio::test]
async fn test_reservation_views_are_joined_and_ordered() {
    let f = fixture();
    let tent = f.service.create_item(item_draft("Tent", 10)).await.unwrap();
    let fair = f
        .service
        .create_event(event_draft("Fair", f.now + Duration::days(3)))
        .await
        .unwrap();
    f.service
        .create_reservation(single(fair.id, "Alice", tent.id, 2))
        .await
        .unwrap();
    f.service
        .create_reservation(single(fair.id, "Bob", tent.id, 1))
        .await
        .unwrap();

    let views = f.service.list_reservations().await.unwrap();
    assert_eq!(views.len(), 2);
    for view in &views {
        assert_eq!(view.item.name, "Tent");
        assert_eq!(view.event.name, "Fair");
    }
    assert!(views[0].reserved_at <= views[1].reserved_at);
}

/// Item detail reports availability plus the item's active reservations.
#[tokio::test]
async fn test_item_detail_lists_active_reservations() {
    let f = fixture();
    let tent = f.service.create_item(item_draft("Tent", 10)).await.unwrap();
    let fair = f
        .service
        .create_event(event_draft("Fair", f.now + Duration::days(3)))
        .await
        .unwrap();
    let first = f
        .service
        .create_reservation(single(fair.id, "Alice", tent.id, 4))
        .await
        .unwrap()[0]
        .id;
    f.service
        .create_reservation(single(fair.id, "Bob", tent.id, 1))
        .await
        .unwrap();
    f.service.mark_returned(first, None, None).await.unwrap();

    let detail = f.service.get_item(tent.id).await.unwrap();
    assert_eq!(detail.reserved, 1);
    assert_eq!(detail.available, 9);
    assert_eq!(detail.active_reservations.len(), 1);
    assert_eq!(
        detail.active_reservations[0].reserved_by.as_deref(),
        Some("Bob")
    );
}
