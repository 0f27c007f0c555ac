//! API route configuration.

use crate::api::handlers::{
    bulk_shorten_handler, delete_record_handler, list_records_handler, shorten_handler,
};
use crate::state::AppState;
use axum::{
    Router,
    routing::{delete, get, post},
};

/// Versioned management API, nested under `/api/v1`.
///
/// # Endpoints
///
/// - `POST   /shorten`       - Create one short code
/// - `POST   /bulk-shorten`  - Create many short codes
/// - `GET    /urls`          - List live records (paginated)
/// - `DELETE /urls/{code}`   - Delete a record
pub fn api_routes() -> Router<AppState> {
    Router::new()
        .route("/shorten", post(shorten_handler))
        .route("/bulk-shorten", post(bulk_shorten_handler))
        .route("/urls", get(list_records_handler))
        .route("/urls/{code}", delete(delete_record_handler))
}
