//! Collaborator boundary: retries and contract clamping.
//!
//! Every collaborator call gets exactly one retry after a short backoff; a
//! second failure is surfaced to the caller, which parks the item instead of
//! failing the run. Out-of-range values in otherwise well-formed responses
//! are clamped and logged, never fatal.

use std::future::Future;
use std::time::Duration;

use anyhow::Result;
use tracing::warn;

const RETRY_BACKOFF: Duration = Duration::from_millis(750);

/// Call a collaborator, retrying once on failure.
pub async fn with_retry<T, F, Fut>(stage: &str, subject: &str, call: F) -> Result<T>
where
    F: Fn() -> Fut,
    Fut: Future<Output = Result<T>>,
{
    match call().await {
        Ok(value) => Ok(value),
        Err(first) => {
            warn!(stage, subject, error = %first, "Collaborator call failed, retrying once");
            tokio::time::sleep(RETRY_BACKOFF).await;
            call().await.map_err(|second| {
                warn!(stage, subject, error = %second, "Collaborator retry failed");
                second
            })
        }
    }
}

/// Clamp a wire base score into [1, 100], logging contract violations.
pub fn clamp_base_score(subject: &str, raw: i32) -> u8 {
    if !(1..=100).contains(&raw) {
        warn!(subject, raw, "Base score out of range, clamping");
    }
    raw.clamp(1, 100) as u8
}

/// Clamp a wire confidence into [0.0, 1.0].
pub fn clamp_confidence(subject: &str, raw: f64) -> f64 {
    if raw.is_nan() {
        warn!(subject, "Confidence is NaN, treating as 0");
        return 0.0;
    }
    if !(0.0..=1.0).contains(&raw) {
        warn!(subject, raw, "Confidence out of range, clamping");
        return raw.clamp(0.0, 1.0);
    }
    raw
}
