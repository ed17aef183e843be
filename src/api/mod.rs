//! HTTP API: request/response types and handlers.
//!
//! Thin layer over [`crate::accounting::InventoryService`]: handlers decode
//! typed requests, call the service, and map domain errors to HTTP via
//! [`error::AppError`]. No business rule lives here.

pub mod availability;
pub mod error;
pub mod events;
pub mod items;
pub mod people;
pub mod reservations;
