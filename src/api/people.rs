//! Person directory endpoint for input auto-suggestion.

use axum::{Json, extract::State};

use crate::server::state::AppState;

/// Distinct, sorted reserver/returner names across all reservations.
///
/// Advisory: a store failure yields an empty list, never an error.
///
/// # Example
///
/// ```bash
/// curl http://localhost:8080/api/people
/// # ["Alice","Bob"]
/// ```
pub async fn list_known_people(State(state): State<AppState>) -> Json<Vec<String>> {
    Json(state.service.known_people().await)
}
