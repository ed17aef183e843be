//! Error types for the accounting layer.
//!
//! Validation errors carry user-readable messages that callers are expected
//! to present verbatim; store failures are wrapped unchanged.

use thiserror::Error;
use uuid::Uuid;

use crate::store::StoreError;

/// Errors raised by the accounting operations.
#[derive(Debug, Error)]
pub enum InventoryError {
    /// Missing or malformed input: empty required fields, non-positive
    /// quantities, duplicate bulk lines, empty id lists, past event dates,
    /// guarded deletes, or a repeated return.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// A referenced item, event, or reservation does not exist.
    #[error("{entity} {id} not found")]
    NotFound {
        /// Kind of the missing record ("item", "event", "reservation")
        entity: &'static str,
        /// Identifier that failed to resolve
        id: Uuid,
    },

    /// Requested quantity exceeds the item's total stock.
    #[error("cannot reserve {requested} x \"{item}\": total stock is {total}")]
    ExceedsTotalStock {
        /// Item name, for the user-facing message
        item: String,
        /// Requested quantity
        requested: i32,
        /// The item's total stock
        total: i32,
    },

    /// Requested quantity exceeds what is currently available.
    #[error("cannot reserve {requested} x \"{item}\": only {available} currently available")]
    InsufficientAvailability {
        /// Item name, for the user-facing message
        item: String,
        /// Requested quantity
        requested: i32,
        /// Availability at validation time
        available: i64,
    },

    /// The entity store failed while reading or writing.
    #[error("store failure: {0}")]
    Store(#[from] StoreError),
}

impl InventoryError {
    /// Whether this is one of the two insufficient-stock rejections.
    #[must_use]
    pub const fn is_insufficient_stock(&self) -> bool {
        matches!(
            self,
            Self::ExceedsTotalStock { .. } | Self::InsufficientAvailability { .. }
        )
    }

    /// Shorthand for a [`InventoryError::NotFound`] with the given kind.
    #[must_use]
    pub const fn not_found(entity: &'static str, id: Uuid) -> Self {
        Self::NotFound { entity, id }
    }
}
