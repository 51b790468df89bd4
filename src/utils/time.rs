use std::time::Duration;
use std::time::SystemTime;
use std::time::UNIX_EPOCH;

/// return millisecond since the epoch
pub(crate) fn now_millis() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as i64)
        .unwrap_or_default()
}

/// Doubling delay for the `attempt`-th restart (starting at 0), capped at `max_delay_ms`
pub(crate) fn backoff_delay(
    attempt: u32,
    base_delay_ms: u64,
    max_delay_ms: u64,
) -> Duration {
    let factor = 1u64.checked_shl(attempt).unwrap_or(u64::MAX);
    Duration::from_millis(base_delay_ms.saturating_mul(factor).min(max_delay_ms))
}
