//! Handlers for listing and deleting records.

use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
};

use crate::api::dto::pagination::PaginationParams;
use crate::api::dto::records::{RecordItem, RecordListResponse};
use crate::error::AppError;
use crate::state::AppState;

/// Lists live records, newest first.
///
/// # Endpoint
///
/// `GET /api/v1/urls?page=1&per_page=10`
///
/// Reflects the backing store, so records created since the last flush are
/// not included yet.
///
/// # Errors
///
/// - 400 Bad Request if `page` or `per_page` is below 1, or `per_page` is above 1000
/// - 500 Internal Server Error on database errors
pub async fn list_records_handler(
    State(state): State<AppState>,
    Query(params): Query<PaginationParams>,
) -> Result<Json<RecordListResponse>, AppError> {
    let (page, per_page) = params.resolve();

    let (records, count) = state.store.list(page, per_page).await?;

    let urls = records
        .into_iter()
        .map(|record| {
            let short_url = state.short_url(&record.code);
            RecordItem::new(record, short_url)
        })
        .collect();

    Ok(Json(RecordListResponse {
        urls,
        page,
        per_page,
        count,
    }))
}

/// Deletes a record.
///
/// # Endpoint
///
/// `DELETE /api/v1/urls/{code}`
///
/// # Response Codes
///
/// - **204 No Content**: Deleted
/// - **404 Not Found**: No live record with this code
pub async fn delete_record_handler(
    State(state): State<AppState>,
    Path(code): Path<String>,
) -> Result<StatusCode, AppError> {
    state.store.delete(&code).await?;
    Ok(StatusCode::NO_CONTENT)
}
