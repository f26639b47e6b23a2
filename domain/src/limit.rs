//! Subscriber history depth bounds.

/// Depth given to every new subscriber, and the smallest depth one may request.
pub const MIN_LIMIT: u32 = 60;

/// Largest depth a subscriber may request. Every fetch uses this depth so a
/// single result set can serve all subscribers.
pub const MAX_LIMIT: u32 = 3600;

/// Constrains a requested depth to `[MIN_LIMIT, MAX_LIMIT]`.
///
/// Out-of-range requests are never rejected, only clamped.
pub fn clamp_limit(requested: i64) -> u32 {
    // The clamped value always fits in a u32.
    requested.clamp(i64::from(MIN_LIMIT), i64::from(MAX_LIMIT)) as u32
}
