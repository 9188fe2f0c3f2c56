//! Progress-callback trait for per-stage and per-card events.
//!
//! Inject an [`Arc<dyn PipelineProgressCallback>`] via
//! [`crate::config::PipelineConfigBuilder::progress_callback`] to receive
//! events as the pipeline moves through its stages.
//!
//! # Why callbacks instead of channels?
//!
//! The host decides where events go (a terminal progress bar, a log line, a
//! GUI counter) without the library knowing how it communicates. The trait is
//! `Send + Sync` because card events arrive from concurrently running workers.
//!
//! # Example
//!
//! ```rust
//! use card_games_converter::{PipelineConfig, PipelineProgressCallback};
//! use std::path::Path;
//! use std::sync::{Arc, atomic::{AtomicUsize, Ordering}};
//!
//! struct CountingCallback {
//!     cards: AtomicUsize,
//! }
//!
//! impl PipelineProgressCallback for CountingCallback {
//!     fn on_card_complete(&self, path: &Path) {
//!         let done = self.cards.fetch_add(1, Ordering::SeqCst) + 1;
//!         eprintln!("{done}: {}", path.display());
//!     }
//! }
//!
//! let counter = Arc::new(CountingCallback { cards: AtomicUsize::new(0) });
//!
//! let config = PipelineConfig::builder()
//!     .progress_callback(counter as Arc<dyn PipelineProgressCallback>)
//!     .build()
//!     .unwrap();
//! ```

use crate::convert::Stage;
use crate::pipeline::merge::Axis;
use std::path::Path;
use std::sync::Arc;

/// Called by the pipeline as it processes stages, cards and tiles.
///
/// All methods have default no-op implementations so callers only override
/// what they care about.
///
/// # Thread safety
///
/// `on_card_complete`, `on_card_error` and `on_tile_written` may be called
/// concurrently from different worker tasks. Protect shared mutable state
/// with `Mutex` or atomics.
pub trait PipelineProgressCallback: Send + Sync {
    /// Called when a stage begins.
    ///
    /// # Arguments
    /// * `stage` — the stage about to run
    /// * `units` — cards, groups or sheets the stage will handle (1 for
    ///   the estimate stage)
    fn on_stage_start(&self, stage: Stage, units: usize) {
        let _ = (stage, units);
    }

    /// Called when one card has been written to `individual/`.
    fn on_card_complete(&self, path: &Path) {
        let _ = path;
    }

    /// Called when one card failed. Its siblings keep running.
    fn on_card_error(&self, path: &Path, error: &str) {
        let _ = (path, error);
    }

    /// Called after a merged sheet is written.
    fn on_tile_written(&self, axis: Axis, path: &Path) {
        let _ = (axis, path);
    }

    /// Called once a stage has fully succeeded.
    fn on_stage_complete(&self, stage: Stage) {
        let _ = stage;
    }
}

/// A no-op implementation for callers that don't need progress events.
pub struct NoopProgressCallback;

impl PipelineProgressCallback for NoopProgressCallback {}

/// Convenience alias matching the type stored in [`crate::config::PipelineConfig`].
pub type ProgressCallback = Arc<dyn PipelineProgressCallback>;

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    #[derive(Default)]
    struct TrackingCallback {
        stages: Mutex<Vec<Stage>>,
        cards: AtomicUsize,
        errors: AtomicUsize,
        tiles: AtomicUsize,
    }

    impl PipelineProgressCallback for TrackingCallback {
        fn on_stage_start(&self, stage: Stage, _units: usize) {
            self.stages.lock().unwrap().push(stage);
        }

        fn on_card_complete(&self, _path: &Path) {
            self.cards.fetch_add(1, Ordering::SeqCst);
        }

        fn on_card_error(&self, _path: &Path, _error: &str) {
            self.errors.fetch_add(1, Ordering::SeqCst);
        }

        fn on_tile_written(&self, _axis: Axis, _path: &Path) {
            self.tiles.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[test]
    fn noop_callback_does_not_panic() {
        let cb = NoopProgressCallback;
        cb.on_stage_start(Stage::Dispatch, 9);
        cb.on_card_complete(Path::new("1.jpg"));
        cb.on_card_error(Path::new("2.jpg"), "boom");
        cb.on_tile_written(Axis::Vertical, Path::new("4.jpg"));
        cb.on_stage_complete(Stage::Dispatch);
    }

    #[test]
    fn tracking_callback_receives_events() {
        let tracker = TrackingCallback::default();

        tracker.on_stage_start(Stage::Dispatch, 3);
        tracker.on_card_complete(Path::new("1.jpg"));
        tracker.on_card_complete(Path::new("2.jpg"));
        tracker.on_card_error(Path::new("3.jpg"), "decode failed");
        tracker.on_stage_start(Stage::PartitionVertical, 1);
        tracker.on_tile_written(Axis::Vertical, Path::new("2.jpg"));

        assert_eq!(
            *tracker.stages.lock().unwrap(),
            vec![Stage::Dispatch, Stage::PartitionVertical]
        );
        assert_eq!(tracker.cards.load(Ordering::SeqCst), 2);
        assert_eq!(tracker.errors.load(Ordering::SeqCst), 1);
        assert_eq!(tracker.tiles.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn arc_dyn_callback_works() {
        let cb: ProgressCallback = Arc::new(NoopProgressCallback);
        cb.on_stage_start(Stage::Estimate, 1);
        cb.on_stage_complete(Stage::Estimate);
    }
}
