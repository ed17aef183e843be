//! `PostgreSQL`-backed entity store.
//!
//! Uses plain sqlx queries with bound parameters. The one operation with
//! real concurrency stakes is [`PostgresStore::reserve`]: it locks the
//! requested item rows (`SELECT … FOR UPDATE`) inside a single transaction,
//! recomputes the active reservation sums under that lock, runs the shared
//! validation rule, and only then inserts. Two concurrent bulk requests for
//! the same item serialize on the row locks, so the loser revalidates
//! against committed state and the stock invariant holds without
//! SERIALIZABLE retry loops.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::{PgPool, PgPoolOptions};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use uuid::Uuid;

use super::{EntityStore, ReturnOutcome, StoreError};
use crate::accounting::availability::validate_lines;
use crate::config::PostgresConfig;
use crate::error::InventoryError;
use crate::types::{
    Event, EventDraft, EventId, EventSummary, Item, ItemDraft, ItemId, ItemSummary, Reservation,
    ReservationCommand, ReservationId, ReservationStatus, ReservationView,
};

/// Raw item row as selected from the `items` table.
type ItemRow = (
    Uuid,
    String,
    Option<String>,
    String,
    i32,
    Option<String>,
    DateTime<Utc>,
    DateTime<Utc>,
);

/// Raw event row as selected from the `events` table.
type EventRow = (
    Uuid,
    String,
    Option<String>,
    DateTime<Utc>,
    Option<String>,
    DateTime<Utc>,
);

/// Raw reservation row as selected from the `reservations` table.
type ReservationRow = (
    Uuid,
    Uuid,
    Uuid,
    i32,
    String,
    Option<String>,
    Option<String>,
    Option<String>,
    DateTime<Utc>,
    Option<DateTime<Utc>>,
);

const ITEM_COLUMNS: &str =
    "id, name, description, category, quantity, storage_location, created_at, updated_at";
const EVENT_COLUMNS: &str = "id, name, description, event_date, location, created_at";
const RESERVATION_COLUMNS: &str = "id, item_id, event_id, quantity, status, condition_notes, \
     reserved_by, returned_by, reserved_at, returned_at";

fn item_from_row(row: ItemRow) -> Item {
    let (id, name, description, category, quantity, storage_location, created_at, updated_at) = row;
    Item {
        id: ItemId::from_uuid(id),
        name,
        description,
        category,
        quantity,
        storage_location,
        created_at,
        updated_at,
    }
}

fn event_from_row(row: EventRow) -> Event {
    let (id, name, description, event_date, location, created_at) = row;
    Event {
        id: EventId::from_uuid(id),
        name,
        description,
        event_date,
        location,
        created_at,
    }
}

fn reservation_from_row(row: ReservationRow) -> Result<Reservation, StoreError> {
    let (
        id,
        item_id,
        event_id,
        quantity,
        status,
        condition_notes,
        reserved_by,
        returned_by,
        reserved_at,
        returned_at,
    ) = row;
    let status = ReservationStatus::parse(&status)
        .ok_or_else(|| StoreError::Database(format!("unknown reservation status: {status}")))?;
    Ok(Reservation {
        id: ReservationId::from_uuid(id),
        item_id: ItemId::from_uuid(item_id),
        event_id: EventId::from_uuid(event_id),
        quantity,
        status,
        condition_notes,
        reserved_by,
        returned_by,
        reserved_at,
        returned_at,
    })
}

/// `PostgreSQL` implementation of [`EntityStore`].
#[derive(Clone)]
pub struct PostgresStore {
    pool: Arc<PgPool>,
}

impl PostgresStore {
    /// Wrap an existing connection pool.
    #[must_use]
    pub const fn new(pool: Arc<PgPool>) -> Self {
        Self { pool }
    }

    /// Connect a new pool from configuration.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Database`] when the pool cannot be created.
    pub async fn connect(config: &PostgresConfig) -> Result<Self, StoreError> {
        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .min_connections(config.min_connections)
            .acquire_timeout(Duration::from_secs(config.connect_timeout))
            .idle_timeout(Duration::from_secs(config.idle_timeout))
            .connect(&config.url)
            .await?;
        Ok(Self::new(Arc::new(pool)))
    }

    /// Access the underlying connection pool.
    ///
    /// Useful for running migrations or manual queries.
    #[must_use]
    pub fn pool(&self) -> &PgPool {
        self.pool.as_ref()
    }
}

#[async_trait]
impl EntityStore for PostgresStore {
    async fn list_items(&self) -> Result<Vec<Item>, StoreError> {
        let rows: Vec<ItemRow> =
            sqlx::query_as(&format!("SELECT {ITEM_COLUMNS} FROM items ORDER BY name, id"))
                .fetch_all(self.pool.as_ref())
                .await?;
        Ok(rows.into_iter().map(item_from_row).collect())
    }

    async fn get_item(&self, id: ItemId) -> Result<Option<Item>, StoreError> {
        let row: Option<ItemRow> =
            sqlx::query_as(&format!("SELECT {ITEM_COLUMNS} FROM items WHERE id = $1"))
                .bind(id.as_uuid())
                .fetch_optional(self.pool.as_ref())
                .await?;
        Ok(row.map(item_from_row))
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
        sqlx::query(
            "INSERT INTO items (id, name, description, category, quantity, storage_location, created_at, updated_at)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8)",
        )
        .bind(item.id.as_uuid())
        .bind(&item.name)
        .bind(&item.description)
        .bind(&item.category)
        .bind(item.quantity)
        .bind(&item.storage_location)
        .bind(item.created_at)
        .bind(item.updated_at)
        .execute(self.pool.as_ref())
        .await?;
        Ok(item)
    }

    async fn update_item(
        &self,
        id: ItemId,
        draft: ItemDraft,
        now: DateTime<Utc>,
    ) -> Result<Option<Item>, StoreError> {
        let row: Option<ItemRow> = sqlx::query_as(&format!(
            "UPDATE items
             SET name = $2, description = $3, category = $4, quantity = $5,
                 storage_location = $6, updated_at = $7
             WHERE id = $1
             RETURNING {ITEM_COLUMNS}"
        ))
        .bind(id.as_uuid())
        .bind(&draft.name)
        .bind(&draft.description)
        .bind(&draft.category)
        .bind(draft.quantity)
        .bind(&draft.storage_location)
        .bind(now)
        .fetch_optional(self.pool.as_ref())
        .await?;
        Ok(row.map(item_from_row))
    }

    async fn delete_item(&self, id: ItemId) -> Result<bool, StoreError> {
        // Reservation history cascades at the schema level.
        let result = sqlx::query("DELETE FROM items WHERE id = $1")
            .bind(id.as_uuid())
            .execute(self.pool.as_ref())
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn list_events(&self) -> Result<Vec<Event>, StoreError> {
        let rows: Vec<EventRow> = sqlx::query_as(&format!(
            "SELECT {EVENT_COLUMNS} FROM events ORDER BY event_date, id"
        ))
        .fetch_all(self.pool.as_ref())
        .await?;
        Ok(rows.into_iter().map(event_from_row).collect())
    }

    async fn get_event(&self, id: EventId) -> Result<Option<Event>, StoreError> {
        let row: Option<EventRow> =
            sqlx::query_as(&format!("SELECT {EVENT_COLUMNS} FROM events WHERE id = $1"))
                .bind(id.as_uuid())
                .fetch_optional(self.pool.as_ref())
                .await?;
        Ok(row.map(event_from_row))
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
        sqlx::query(
            "INSERT INTO events (id, name, description, event_date, location, created_at)
             VALUES ($1, $2, $3, $4, $5, $6)",
        )
        .bind(event.id.as_uuid())
        .bind(&event.name)
        .bind(&event.description)
        .bind(event.event_date)
        .bind(&event.location)
        .bind(event.created_at)
        .execute(self.pool.as_ref())
        .await?;
        Ok(event)
    }

    async fn update_event(
        &self,
        id: EventId,
        draft: EventDraft,
    ) -> Result<Option<Event>, StoreError> {
        let row: Option<EventRow> = sqlx::query_as(&format!(
            "UPDATE events
             SET name = $2, description = $3, event_date = $4, location = $5
             WHERE id = $1
             RETURNING {EVENT_COLUMNS}"
        ))
        .bind(id.as_uuid())
        .bind(&draft.name)
        .bind(&draft.description)
        .bind(draft.event_date)
        .bind(&draft.location)
        .fetch_optional(self.pool.as_ref())
        .await?;
        Ok(row.map(event_from_row))
    }

    async fn delete_event(&self, id: EventId) -> Result<bool, StoreError> {
        let result = sqlx::query("DELETE FROM events WHERE id = $1")
            .bind(id.as_uuid())
            .execute(self.pool.as_ref())
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn list_reservations(&self) -> Result<Vec<ReservationView>, StoreError> {
        type ViewRow = (
            Uuid,
            i32,
            String,
            Option<String>,
            Option<String>,
            Option<String>,
            DateTime<Utc>,
            Option<DateTime<Utc>>,
            Uuid,
            String,
            String,
            Uuid,
            String,
            DateTime<Utc>,
        );
        let rows: Vec<ViewRow> = sqlx::query_as(
            "SELECT r.id, r.quantity, r.status, r.condition_notes, r.reserved_by, r.returned_by,
                    r.reserved_at, r.returned_at,
                    i.id, i.name, i.category,
                    e.id, e.name, e.event_date
             FROM reservations r
             JOIN items i ON i.id = r.item_id
             JOIN events e ON e.id = r.event_id
             ORDER BY r.reserved_at, r.id",
        )
        .fetch_all(self.pool.as_ref())
        .await?;

        rows.into_iter()
            .map(|row| {
                let (
                    id,
                    quantity,
                    status,
                    condition_notes,
                    reserved_by,
                    returned_by,
                    reserved_at,
                    returned_at,
                    item_id,
                    item_name,
                    item_category,
                    event_id,
                    event_name,
                    event_date,
                ) = row;
                let status = ReservationStatus::parse(&status).ok_or_else(|| {
                    StoreError::Database(format!("unknown reservation status: {status}"))
                })?;
                Ok(ReservationView {
                    id: ReservationId::from_uuid(id),
                    item: ItemSummary {
                        id: ItemId::from_uuid(item_id),
                        name: item_name,
                        category: item_category,
                    },
                    event: EventSummary {
                        id: EventId::from_uuid(event_id),
                        name: event_name,
                        event_date,
                    },
                    quantity,
                    status,
                    condition_notes,
                    reserved_by,
                    returned_by,
                    reserved_at,
                    returned_at,
                })
            })
            .collect()
    }

    async fn get_reservation(
        &self,
        id: ReservationId,
    ) -> Result<Option<Reservation>, StoreError> {
        let row: Option<ReservationRow> = sqlx::query_as(&format!(
            "SELECT {RESERVATION_COLUMNS} FROM reservations WHERE id = $1"
        ))
        .bind(id.as_uuid())
        .fetch_optional(self.pool.as_ref())
        .await?;
        row.map(reservation_from_row).transpose()
    }

    async fn active_reservations_for_item(
        &self,
        item_id: ItemId,
    ) -> Result<Vec<Reservation>, StoreError> {
        let rows: Vec<ReservationRow> = sqlx::query_as(&format!(
            "SELECT {RESERVATION_COLUMNS} FROM reservations
             WHERE item_id = $1 AND status = 'reserved'
             ORDER BY reserved_at, id"
        ))
        .bind(item_id.as_uuid())
        .fetch_all(self.pool.as_ref())
        .await?;
        rows.into_iter().map(reservation_from_row).collect()
    }

    async fn reserved_totals(&self) -> Result<HashMap<ItemId, i64>, StoreError> {
        let rows: Vec<(Uuid, i64)> = sqlx::query_as(
            "SELECT item_id, COALESCE(SUM(quantity), 0)
             FROM reservations
             WHERE status = 'reserved'
             GROUP BY item_id",
        )
        .fetch_all(self.pool.as_ref())
        .await?;
        Ok(rows
            .into_iter()
            .map(|(id, total)| (ItemId::from_uuid(id), total))
            .collect())
    }

    async fn count_active_for_item(&self, id: ItemId) -> Result<i64, StoreError> {
        let (count,): (i64,) = sqlx::query_as(
            "SELECT COUNT(*) FROM reservations WHERE item_id = $1 AND status = 'reserved'",
        )
        .bind(id.as_uuid())
        .fetch_one(self.pool.as_ref())
        .await?;
        Ok(count)
    }

    async fn count_active_for_event(&self, id: EventId) -> Result<i64, StoreError> {
        let (count,): (i64,) = sqlx::query_as(
            "SELECT COUNT(*) FROM reservations WHERE event_id = $1 AND status = 'reserved'",
        )
        .bind(id.as_uuid())
        .fetch_one(self.pool.as_ref())
        .await?;
        Ok(count)
    }

    #[tracing::instrument(skip(self, command), fields(event_id = %command.event_id, lines = command.lines.len()))]
    async fn reserve(
        &self,
        command: &ReservationCommand,
        now: DateTime<Utc>,
    ) -> Result<Vec<Reservation>, InventoryError> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| InventoryError::Store(StoreError::Database(e.to_string())))?;

        // The event must exist for the rows we are about to insert.
        let event: Option<(Uuid,)> = sqlx::query_as("SELECT id FROM events WHERE id = $1")
            .bind(command.event_id.as_uuid())
            .fetch_optional(&mut *tx)
            .await
            .map_err(|e| InventoryError::Store(StoreError::Database(e.to_string())))?;
        if event.is_none() {
            let _ = tx.rollback().await;
            return Err(InventoryError::not_found(
                "event",
                *command.event_id.as_uuid(),
            ));
        }

        let requested: Vec<Uuid> = command
            .lines
            .iter()
            .map(|line| *line.item_id.as_uuid())
            .collect();

        // Lock the requested item rows. Concurrent reserves for the same
        // items block here until we commit, closing the read-validate-insert
        // race window.
        let item_rows: Vec<ItemRow> = sqlx::query_as(&format!(
            "SELECT {ITEM_COLUMNS} FROM items WHERE id = ANY($1) FOR UPDATE"
        ))
        .bind(&requested)
        .fetch_all(&mut *tx)
        .await
        .map_err(|e| InventoryError::Store(StoreError::Database(e.to_string())))?;
        let items: HashMap<ItemId, Item> = item_rows
            .into_iter()
            .map(item_from_row)
            .map(|item| (item.id, item))
            .collect();

        // Active sums recomputed under the lock, in one pass.
        let sum_rows: Vec<(Uuid, i64)> = sqlx::query_as(
            "SELECT item_id, COALESCE(SUM(quantity), 0)
             FROM reservations
             WHERE item_id = ANY($1) AND status = 'reserved'
             GROUP BY item_id",
        )
        .bind(&requested)
        .fetch_all(&mut *tx)
        .await
        .map_err(|e| InventoryError::Store(StoreError::Database(e.to_string())))?;
        let reserved: HashMap<ItemId, i64> = sum_rows
            .into_iter()
            .map(|(id, total)| (ItemId::from_uuid(id), total))
            .collect();

        if let Err(err) = validate_lines(&items, &reserved, &command.lines) {
            let _ = tx.rollback().await;
            return Err(err);
        }

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
            sqlx::query(
                "INSERT INTO reservations
                 (id, item_id, event_id, quantity, status, condition_notes,
                  reserved_by, returned_by, reserved_at, returned_at)
                 VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)",
            )
            .bind(reservation.id.as_uuid())
            .bind(reservation.item_id.as_uuid())
            .bind(reservation.event_id.as_uuid())
            .bind(reservation.quantity)
            .bind(reservation.status.as_str())
            .bind(&reservation.condition_notes)
            .bind(&reservation.reserved_by)
            .bind(&reservation.returned_by)
            .bind(reservation.reserved_at)
            .bind(reservation.returned_at)
            .execute(&mut *tx)
            .await
            .map_err(|e| InventoryError::Store(StoreError::Database(e.to_string())))?;
            created.push(reservation);
        }

        tx.commit()
            .await
            .map_err(|e| InventoryError::Store(StoreError::Database(e.to_string())))?;
        Ok(created)
    }

    #[tracing::instrument(skip(self, condition_notes, returned_by), fields(reservation_id = %id))]
    async fn finish_return(
        &self,
        id: ReservationId,
        condition_notes: Option<&str>,
        returned_by: Option<&str>,
        now: DateTime<Utc>,
    ) -> Result<ReturnOutcome, StoreError> {
        // Conditional update: only an active row is touched, so a repeated
        // return can never overwrite the first return's notes or timestamp.
        let row: Option<ReservationRow> = sqlx::query_as(&format!(
            "UPDATE reservations
             SET status = 'returned', condition_notes = $2, returned_by = $3, returned_at = $4
             WHERE id = $1 AND status = 'reserved'
             RETURNING {RESERVATION_COLUMNS}"
        ))
        .bind(id.as_uuid())
        .bind(condition_notes)
        .bind(returned_by)
        .bind(now)
        .fetch_optional(self.pool.as_ref())
        .await?;

        if let Some(row) = row {
            return Ok(ReturnOutcome::Returned(reservation_from_row(row)?));
        }

        let exists: Option<(Uuid,)> = sqlx::query_as("SELECT id FROM reservations WHERE id = $1")
            .bind(id.as_uuid())
            .fetch_optional(self.pool.as_ref())
            .await?;
        Ok(if exists.is_some() {
            ReturnOutcome::AlreadyReturned
        } else {
            ReturnOutcome::Missing
        })
    }

    async fn people(&self) -> Result<Vec<String>, StoreError> {
        let rows: Vec<(String,)> = sqlx::query_as(
            "SELECT DISTINCT TRIM(name) AS person
             FROM (
                 SELECT reserved_by AS name FROM reservations
                 UNION ALL
                 SELECT returned_by FROM reservations
             ) AS names
             WHERE name IS NOT NULL AND TRIM(name) <> ''
             ORDER BY person",
        )
        .fetch_all(self.pool.as_ref())
        .await?;
        Ok(rows.into_iter().map(|(name,)| name).collect())
    }

    async fn ping(&self) -> Result<(), StoreError> {
        sqlx::query("SELECT 1").execute(self.pool.as_ref()).await?;
        Ok(())
    }
}
