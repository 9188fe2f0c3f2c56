//! Codec calls off the async executor, with a deadline.
//!
//! ## Why spawn_blocking?
//!
//! Decoding, rotating and re-encoding a card is CPU-bound and synchronous.
//! `tokio::task::spawn_blocking` moves it onto the blocking thread pool so
//! the runtime's worker threads stay free to drive the other cards.
//!
//! ## Why a timeout?
//!
//! A codec call that never returns would otherwise hang the whole batch at
//! its join. `tokio::time::timeout` bounds the wait; the blocking thread
//! cannot be interrupted and is left to finish in the background, but its
//! result is discarded and the unit is reported as failed.

use cgc_codec::ImageCodec;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

/// Why a blocking codec call did not produce a value.
#[derive(Debug)]
pub enum BlockingFailure<E> {
    /// The closure ran and returned an error.
    Failed(E),
    /// No result within the deadline.
    TimedOut { secs: u64 },
    /// The blocking task panicked or was cancelled.
    Panicked(String),
}

impl<E: fmt::Display> fmt::Display for BlockingFailure<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BlockingFailure::Failed(e) => write!(f, "{e}"),
            BlockingFailure::TimedOut { secs } => write!(f, "timed out after {secs}s"),
            BlockingFailure::Panicked(detail) => write!(f, "codec task panicked: {detail}"),
        }
    }
}

/// Run `f` against `codec` on the blocking pool, giving up after
/// `timeout_secs`.
pub async fn run_codec<T, E, F>(
    codec: &Arc<dyn ImageCodec>,
    timeout_secs: u64,
    f: F,
) -> Result<T, BlockingFailure<E>>
where
    F: FnOnce(&dyn ImageCodec) -> Result<T, E> + Send + 'static,
    T: Send + 'static,
    E: Send + 'static,
{
    let codec = Arc::clone(codec);
    let task = tokio::task::spawn_blocking(move || f(codec.as_ref()));

    match tokio::time::timeout(Duration::from_secs(timeout_secs), task).await {
        Err(_elapsed) => Err(BlockingFailure::TimedOut { secs: timeout_secs }),
        Ok(Err(join_err)) => Err(BlockingFailure::Panicked(join_err.to_string())),
        Ok(Ok(result)) => result.map_err(BlockingFailure::Failed),
    }
}
