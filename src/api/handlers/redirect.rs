//! Handler for short URL redirect.

use axum::{
    extract::{ConnectInfo, Path, State},
    http::{HeaderMap, StatusCode, header},
    response::IntoResponse,
};
use std::net::SocketAddr;

use crate::domain::access_event::RequestMeta;
use crate::error::AppError;
use crate::state::AppState;

/// Browsers and proxies must revalidate so deletes and expiry take effect.
const REDIRECT_CACHE_CONTROL: &str = "public, max-age=0, must-revalidate";

/// Redirects a short code to its target.
///
/// # Endpoint
///
/// `GET /{code}`
///
/// # Request Flow
///
/// 1. Resolve the code from the in-memory cache (never the database)
/// 2. Hand an access event to the analytics queue (fire-and-forget)
/// 3. Return 302 Found
///
/// # Errors
///
/// Returns 404 Not Found if the code is unknown or expired.
pub async fn redirect_handler(
    Path(code): Path<String>,
    State(state): State<AppState>,
    headers: HeaderMap,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
) -> Result<impl IntoResponse, AppError> {
    let header_str = |name: header::HeaderName| headers.get(name).and_then(|v| v.to_str().ok());

    let requester = RequestMeta::new(
        header_str(header::HOST),
        Some(addr.ip().to_string()),
        header_str(header::USER_AGENT),
        header_str(header::REFERER),
    );

    let record = state.store.lookup(&code, requester).await?;

    Ok((
        StatusCode::FOUND,
        [
            (header::LOCATION, record.target),
            (header::CACHE_CONTROL, REDIRECT_CACHE_CONTROL.to_string()),
        ],
    ))
}
