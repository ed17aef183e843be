//! Accounting layer: availability rules and the inventory service.
//!
//! [`availability`] holds the pure rules (the availability fold and the
//! stock validation run inside store transactions); [`InventoryService`]
//! owns the operation-level behavior: boundary validation, reservation
//! lifecycle, delete guards, and the advisory person directory.

pub mod availability;
mod service;

pub use service::InventoryService;
