//! Availability accounting: the pure rules every write path shares.
//!
//! Availability is never stored; it is recomputed from the item's total
//! stock and its currently-active reservations. The functions here are pure
//! so the same rule runs identically inside a Postgres transaction, inside
//! the in-memory store's write guard, and under property tests.

use std::collections::HashMap;

use crate::error::InventoryError;
use crate::types::{Item, ItemId, Reservation, ReservationLine};

/// Sum active reservation quantities per item in one pass.
///
/// This is the bulk-rendering path: one fold over the whole reservation
/// collection instead of one query per item.
#[must_use]
pub fn reserved_totals<'a, I>(reservations: I) -> HashMap<ItemId, i64>
where
    I: IntoIterator<Item = &'a Reservation>,
{
    let mut totals: HashMap<ItemId, i64> = HashMap::new();
    for reservation in reservations {
        if reservation.is_active() {
            *totals.entry(reservation.item_id).or_insert(0) += i64::from(reservation.quantity);
        }
    }
    totals
}

/// Remaining quantity of an item given the sum of its active reservations.
///
/// May be negative if the stock invariant was violated by a prior bug;
/// callers must not assume non-negativity.
#[must_use]
pub fn available_quantity(item: &Item, reserved: i64) -> i64 {
    i64::from(item.quantity) - reserved
}

/// Validate reservation lines against stock and current availability.
///
/// Checks each line, in order: the item exists, the requested quantity does
/// not exceed the item's total stock, and the requested quantity does not
/// exceed what is currently available. All lines are checked before any
/// insert happens, so a failing line rejects the whole batch.
///
/// `items` maps the requested ids to their records; `reserved` carries the
/// sum of active reservation quantities per item (absent means zero). Both
/// must be read inside the same transactional boundary that will perform the
/// inserts.
///
/// # Errors
///
/// - [`InventoryError::NotFound`] when a line references a missing item
/// - [`InventoryError::ExceedsTotalStock`] when a line exceeds total stock
/// - [`InventoryError::InsufficientAvailability`] when a line exceeds the
///   currently available quantity
pub fn validate_lines(
    items: &HashMap<ItemId, Item>,
    reserved: &HashMap<ItemId, i64>,
    lines: &[ReservationLine],
) -> Result<(), InventoryError> {
    for line in lines {
        let Some(item) = items.get(&line.item_id) else {
            return Err(InventoryError::not_found("item", *line.item_id.as_uuid()));
        };
        if line.quantity > item.quantity {
            return Err(InventoryError::ExceedsTotalStock {
                item: item.name.clone(),
                requested: line.quantity,
                total: item.quantity,
            });
        }
        let available = available_quantity(item, reserved.get(&line.item_id).copied().unwrap_or(0));
        if i64::from(line.quantity) > available {
            return Err(InventoryError::InsufficientAvailability {
                item: item.name.clone(),
                requested: line.quantity,
                available,
            });
        }
    }
    Ok(())
}
