//! HTTP plumbing shared by remote engines: client construction, backoff,
//! and bridging async requests into the synchronous pipeline.

use std::future::Future;
use std::time::Duration;

use tokio::runtime::Handle;

/// User agent sent with every outgoing request.
pub const USER_AGENT: &str = concat!("foliacheck/", env!("CARGO_PKG_VERSION"));

/// Build a reqwest client with the given request timeout.
pub fn build_client(timeout: Duration) -> Result<reqwest::Client, reqwest::Error> {
    reqwest::Client::builder()
        .user_agent(USER_AGENT)
        .timeout(timeout)
        .build()
}

/// Exponential backoff delay for retry `attempt` (0-based), capped at a minute.
pub fn backoff_delay(attempt: u32, base_ms: u64) -> Duration {
    let delay_ms = base_ms.saturating_mul(2u64.saturating_pow(attempt));
    Duration::from_millis(delay_ms.min(60_000))
}

/// Block on an async future using the current tokio runtime handle.
///
/// Must be called from a blocking context (e.g. `spawn_blocking`), never from
/// inside an async task.
pub fn block_on_async<F, T, E>(future: F, no_runtime: impl FnOnce() -> E) -> Result<T, E>
where
    F: Future<Output = Result<T, E>>,
{
    let handle = Handle::try_current().map_err(|_| no_runtime())?;
    handle.block_on(future)
}
