//! Handlers for the shorten endpoints.

use axum::{Json, extract::State, http::StatusCode};
use validator::Validate;

use crate::api::dto::shorten::{
    BatchSummary, BulkShortenRequest, BulkShortenResponse, ShortenRequest, ShortenResponse,
    ShortenResultItem,
};
use crate::domain::entities::NewRecord;
use crate::error::AppError;
use crate::state::AppState;

/// Creates a short code for one URL.
///
/// # Endpoint
///
/// `POST /api/v1/shorten`
///
/// # Request Body
///
/// ```json
/// {
///   "url": "https://example.com",
///   "title": "Example",       // optional
///   "slug": "my-link",        // optional
///   "expiry_in_secs": 3600    // optional
/// }
/// ```
///
/// # Response
///
/// `201 Created` with `{"code": "...", "short_url": "..."}`. The record is
/// served by redirects immediately but may not appear in listings until the
/// next flush.
///
/// # Errors
///
/// - 400 Bad Request on validation failure
/// - 409 Conflict if the slug is taken
pub async fn shorten_handler(
    State(state): State<AppState>,
    Json(payload): Json<ShortenRequest>,
) -> Result<(StatusCode, Json<ShortenResponse>), AppError> {
    payload.validate()?;

    let code = state.store.create(payload.into()).await?;
    let short_url = state.short_url(&code);

    Ok((StatusCode::CREATED, Json(ShortenResponse { code, short_url })))
}

/// Creates short codes for many URLs.
///
/// # Endpoint
///
/// `POST /api/v1/bulk-shorten`
///
/// # Batch Processing
///
/// Processes URLs independently. If one fails, others continue processing.
/// Each result includes either success data or error information.
///
/// # Response
///
/// ```json
/// {
///   "summary": { "total": 2, "successful": 1, "failed": 1 },
///   "items": [
///     { "url": "https://example.com", "code": "abc123", "short_url": "https://s.example.com/abc123" },
///     { "url": "nope", "error": { "code": "validation_error", "message": "...", "details": {} } }
///   ]
/// }
/// ```
///
/// # Errors
///
/// Returns 400 Bad Request if the list is empty or too long. Individual URL
/// errors are returned in the response items array.
pub async fn bulk_shorten_handler(
    State(state): State<AppState>,
    Json(payload): Json<BulkShortenRequest>,
) -> Result<Json<BulkShortenResponse>, AppError> {
    payload.validate()?;

    let total = payload.urls.len();
    let mut results: Vec<Option<ShortenResultItem>> = Vec::with_capacity(total);
    let mut accepted: Vec<(usize, String)> = Vec::new();
    let mut rows: Vec<NewRecord> = Vec::new();

    for (index, item) in payload.urls.into_iter().enumerate() {
        match item.validate() {
            Ok(()) => {
                accepted.push((index, item.url.clone()));
                rows.push(item.into());
                results.push(None);
            }
            Err(e) => results.push(Some(ShortenResultItem::Error {
                url: item.url,
                error: AppError::from(e).to_error_info(),
            })),
        }
    }

    let created = state.store.create_batch(rows).await;

    for ((index, url), outcome) in accepted.into_iter().zip(created) {
        results[index] = Some(match outcome {
            Ok(code) => ShortenResultItem::Success {
                url,
                short_url: state.short_url(&code),
                code,
            },
            Err(e) => ShortenResultItem::Error {
                url,
                error: AppError::from(e).to_error_info(),
            },
        });
    }

    let items: Vec<ShortenResultItem> = results.into_iter().flatten().collect();
    let successful = items
        .iter()
        .filter(|item| matches!(item, ShortenResultItem::Success { .. }))
        .count();

    Ok(Json(BulkShortenResponse {
        summary: BatchSummary {
            total,
            successful,
            failed: total - successful,
        },
        items,
    }))
}
