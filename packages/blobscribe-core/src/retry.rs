//! Retry logic for transient service errors.
//!
//! Provides exponential backoff for requests that fail with throttling,
//! server errors or network timeouts. Shared by the speech and text
//! analytics clients.

use std::fmt::Display;
use std::future::Future;
use std::time::Duration;

/// Retry delays for transient errors (exponential backoff).
pub(crate) const RETRY_DELAYS_MS: [u64; 3] = [200, 500, 1000];

/// Errors that know whether repeating the request may help.
pub(crate) trait Transient: Display {
    fn is_transient(&self) -> bool;
}

/// Executes a request with retry logic for transient errors.
///
/// Retries errors for which [`Transient::is_transient`] is true with backoff
/// (200ms, 500ms, 1000ms). Any other error, or the last transient one, is
/// returned as is.
///
/// # Arguments
/// * `component` - Log prefix of the calling client
/// * `action` - Action name for logging
/// * `operation` - Closure that performs the request
pub(crate) async fn with_retry<T, E, F, Fut>(
    component: &str,
    action: &str,
    mut operation: F,
) -> Result<T, E>
where
    E: Transient,
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
{
    let mut retries = 0;
    loop {
        match operation().await {
            Ok(r) => return Ok(r),
            Err(e) if e.is_transient() && retries < RETRY_DELAYS_MS.len() => {
                let delay_ms = RETRY_DELAYS_MS[retries];
                retries += 1;
                log::warn!("[{}] {} transient error: {}", component, action, e);
                log::info!(
                    "[{}] Retrying {} (attempt {}/{}) after {}ms",
                    component,
                    action,
                    retries + 1,
                    RETRY_DELAYS_MS.len() + 1,
                    delay_ms
                );
                tokio::time::sleep(Duration::from_millis(delay_ms)).await;
            }
            Err(e) => return Err(e),
        }
    }
}
