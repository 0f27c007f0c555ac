//! Rate limiting middleware using token bucket algorithm.

use anyhow::{Result, anyhow};
use governor::clock::QuantaInstant;
use governor::middleware::NoOpMiddleware;
use std::sync::Arc;
use std::time::Duration;
use tower_governor::{
    GovernorLayer, governor::GovernorConfigBuilder, key_extractor::PeerIpKeyExtractor,
};

pub type RateLimitLayer =
    GovernorLayer<PeerIpKeyExtractor, NoOpMiddleware<QuantaInstant>, axum::body::Body>;

/// Creates a per-IP rate limiter for the redirect endpoint.
///
/// # Limits
///
/// - **Rate**: `per_second` tokens replenished per second
/// - **Burst**: `burst` requests
///
/// Requests exceeding the limit receive `429 Too Many Requests`.
///
/// # Key Extraction
///
/// Rate limits are applied per client IP address extracted from the
/// socket peer address.
///
/// # Errors
///
/// Returns an error if either limit is zero.
///
/// # Example
///
/// ```rust,ignore
/// let app = Router::new()
///     .route("/{code}", get(redirect_handler))
///     .layer(rate_limit::layer(10, 100)?);
/// ```
pub fn layer(per_second: u32, burst: u32) -> Result<RateLimitLayer> {
    if per_second == 0 {
        return Err(anyhow!("rate limit must be at least 1 request per second"));
    }

    let governor_conf = GovernorConfigBuilder::default()
        .period(Duration::from_secs(1) / per_second)
        .burst_size(burst)
        .finish()
        .ok_or_else(|| anyhow!("invalid rate limit: {per_second}/s, burst {burst}"))?;

    Ok(GovernorLayer::new(Arc::new(governor_conf)))
}
