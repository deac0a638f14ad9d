//! Progress-callback trait for generation and imaging events.
//!
//! Inject an [`Arc<dyn ScreenplayProgressCallback>`] via
//! [`crate::config::ScreenplayConfigBuilder::progress_callback`] to receive
//! events as the pipeline writes the script and fetches scene images.
//!
//! # Example
//!
//! ```rust
//! use storyscript::{ScreenplayProgressCallback, ScreenplayConfig};
//! use std::sync::{Arc, atomic::{AtomicUsize, Ordering}};
//!
//! struct CountingCallback {
//!     images: AtomicUsize,
//! }
//!
//! impl ScreenplayProgressCallback for CountingCallback {
//!     fn on_image_complete(&self, scene: usize) {
//!         let done = self.images.fetch_add(1, Ordering::SeqCst) + 1;
//!         eprintln!("Scene {} illustrated ({} so far)", scene, done);
//!     }
//! }
//!
//! let counter = Arc::new(CountingCallback { images: AtomicUsize::new(0) });
//!
//! let config = ScreenplayConfig::builder()
//!     .progress_callback(counter as Arc<dyn ScreenplayProgressCallback>)
//!     .build()
//!     .unwrap();
//! ```

use std::sync::Arc;

/// Called by the pipeline as it generates and assembles a screenplay.
///
/// All methods default to no-ops. Image events fire concurrently from the
/// imaging stage, so implementations guard shared state with atomics or a
/// `Mutex`.
pub trait ScreenplayProgressCallback: Send + Sync {
    /// Called before a text-model request. `stage` is `"story"` or `"script"`.
    fn on_generation_start(&self, stage: &str) {
        let _ = stage;
    }

    /// Called when a text-model request returns usable text.
    ///
    /// # Arguments
    /// * `stage`: `"story"` or `"script"`
    /// * `chars`: character count of the returned text
    fn on_generation_complete(&self, stage: &str, chars: usize) {
        let _ = (stage, chars);
    }

    /// Called once before any image request, with the number of selected scenes.
    fn on_imaging_start(&self, selected: usize) {
        let _ = selected;
    }

    /// Called just before the image request for scene position `scene`.
    fn on_image_start(&self, scene: usize) {
        let _ = scene;
    }

    /// Called when scene `scene` received a valid image.
    fn on_image_complete(&self, scene: usize) {
        let _ = scene;
    }

    /// Called when scene `scene` ends up without an image.
    fn on_image_error(&self, scene: usize, error: &str) {
        let _ = (scene, error);
    }

    /// Called once the document is assembled.
    ///
    /// # Arguments
    /// * `scenes`: total scenes in the document
    /// * `illustrated`: scenes that carry an image
    fn on_assembly_complete(&self, scenes: usize, illustrated: usize) {
        let _ = (scenes, illustrated);
    }
}

/// Callback that ignores every event. Used when none is configured.
pub struct NoopProgressCallback;

impl ScreenplayProgressCallback for NoopProgressCallback {}

/// Type stored in [`crate::config::ScreenplayConfig`].
pub type ProgressCallback = Arc<dyn ScreenplayProgressCallback>;
