//! Quartermaster - inventory and reservation tracking for an organization.
//!
//! Items have stock quantities, events occur on dates, and reservations link
//! an item to an event for a quantity, with a return workflow. The core of
//! the system is availability accounting:
//!
//! ```text
//! available = item.quantity - sum(quantity of active reservations)
//! ```
//!
//! # Architecture
//!
//! ```text
//! HTTP (axum)                 Accounting                  Entity Store
//! ┌──────────────┐      ┌─────────────────────┐      ┌──────────────────┐
//! │  api::items   │      │                     │      │  PostgresStore   │
//! │  api::events  │ ──▶ │  InventoryService   │ ──▶ │  (sqlx, row      │
//! │  api::reserv… │      │  availability rules │      │   locks on       │
//! │  api::people  │      │                     │      │   reserve)       │
//! └──────────────┘      └─────────────────────┘      │  InMemoryStore   │
//!                                                     │  (tests)         │
//!                                                     └──────────────────┘
//! ```
//!
//! # Key Behaviors
//!
//! ## 1. Concurrency-safe reservation
//!
//! Availability is derived from current reservations, so a naive
//! read-validate-insert sequence races with concurrent requests. The store
//! closes the window: `PostgresStore::reserve` locks the requested item rows
//! in one transaction, revalidates under the lock, and only then inserts.
//! One of two competing requests for the last unit wins; the other is
//! rejected with an insufficient-stock error.
//!
//! ## 2. All-or-nothing bulk reservation
//!
//! A multi-item request is validated line by line before any row is
//! created; a single failing line rejects the whole batch.
//!
//! ## 3. One-way return workflow
//!
//! A reservation transitions exactly once from `reserved` to `returned`,
//! recording who returned it and any condition notes. Bulk return applies
//! one shared notes/returner pair row by row and is deliberately not atomic
//! across the batch.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod accounting;
pub mod api;
pub mod clock;
pub mod config;
pub mod error;
pub mod server;
pub mod store;
pub mod types;

pub use accounting::InventoryService;
pub use clock::{Clock, FixedClock, SystemClock};
pub use config::Config;
pub use error::InventoryError;
pub use server::{AppState, build_router};
pub use store::{EntityStore, InMemoryStore, PostgresStore, StoreError};
pub use types::*;
