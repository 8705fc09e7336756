//! Progress-callback trait for per-image extraction events.
//!
//! Inject an [`Arc<dyn ExtractionProgressCallback>`] via
//! [`crate::config::ExtractionConfigBuilder::progress_callback`] to receive
//! events as the batch processes each image. Callers forward them to a
//! terminal bar, a log, or a UI without the library knowing which.
//!
//! # Example
//!
//! ```rust
//! use edgequake_offers::{ExtractionProgressCallback, ExtractionConfig};
//! use std::sync::{Arc, atomic::{AtomicUsize, Ordering}};
//!
//! struct CountingCallback {
//!     products: Arc<AtomicUsize>,
//! }
//!
//! impl ExtractionProgressCallback for CountingCallback {
//!     fn on_image_complete(&self, index: usize, total: usize, filename: &str, products: usize) {
//!         self.products.fetch_add(products, Ordering::SeqCst);
//!         eprintln!("{index}/{total} {filename}: {products} products");
//!     }
//! }
//!
//! let counter = Arc::new(CountingCallback {
//!     products: Arc::new(AtomicUsize::new(0)),
//! });
//!
//! let config = ExtractionConfig::builder()
//!     .progress_callback(counter as Arc<dyn ExtractionProgressCallback>)
//!     .build()
//!     .unwrap();
//! ```

use std::sync::Arc;

/// Called by the batch driver as it processes each image.
///
/// All methods have default no-op implementations so callers only override
/// what they care about. `index` is 1-indexed.
pub trait ExtractionProgressCallback: Send + Sync {
    /// Called once before the first image.
    fn on_batch_start(&self, total_images: usize) {
        let _ = total_images;
    }

    /// Called just before the model request for an image is sent.
    fn on_image_start(&self, index: usize, total_images: usize, filename: &str) {
        let _ = (index, total_images, filename);
    }

    /// Called when an image was processed; `products` may be zero.
    fn on_image_complete(&self, index: usize, total_images: usize, filename: &str, products: usize) {
        let _ = (index, total_images, filename, products);
    }

    /// Called when an image failed. The batch continues.
    fn on_image_error(&self, index: usize, total_images: usize, filename: &str, error: &str) {
        let _ = (index, total_images, filename, error);
    }

    /// Called once after every image has been attempted.
    fn on_batch_complete(&self, total_images: usize, success_count: usize, product_count: usize) {
        let _ = (total_images, success_count, product_count);
    }
}

/// A no-op implementation for callers that don't need progress events.
pub struct NoopProgressCallback;

impl ExtractionProgressCallback for NoopProgressCallback {}

/// Convenience alias matching the type stored in [`crate::config::ExtractionConfig`].
pub type ProgressCallback = Arc<dyn ExtractionProgressCallback>;

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Default)]
    struct TrackingCallback {
        starts: AtomicUsize,
        completes: AtomicUsize,
        errors: AtomicUsize,
        products: AtomicUsize,
    }

    impl ExtractionProgressCallback for TrackingCallback {
        fn on_image_start(&self, _index: usize, _total: usize, _filename: &str) {
            self.starts.fetch_add(1, Ordering::SeqCst);
        }

        fn on_image_complete(&self, _index: usize, _total: usize, _filename: &str, products: usize) {
            self.completes.fetch_add(1, Ordering::SeqCst);
            self.products.fetch_add(products, Ordering::SeqCst);
        }

        fn on_image_error(&self, _index: usize, _total: usize, _filename: &str, _error: &str) {
            self.errors.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[test]
    fn noop_callback_does_not_panic() {
        let cb = NoopProgressCallback;
        cb.on_batch_start(2);
        cb.on_image_start(1, 2, "a.jpg");
        cb.on_image_complete(1, 2, "a.jpg", 3);
        cb.on_image_error(2, 2, "b.jpg", "boom");
        cb.on_batch_complete(2, 1, 3);
    }

    #[test]
    fn tracking_callback_receives_events() {
        let tracker = TrackingCallback::default();
        tracker.on_image_start(1, 2, "a.jpg");
        tracker.on_image_complete(1, 2, "a.jpg", 4);
        tracker.on_image_start(2, 2, "b.jpg");
        tracker.on_image_error(2, 2, "b.jpg", "timeout");

        assert_eq!(tracker.starts.load(Ordering::SeqCst), 2);
        assert_eq!(tracker.completes.load(Ordering::SeqCst), 1);
        assert_eq!(tracker.errors.load(Ordering::SeqCst), 1);
        assert_eq!(tracker.products.load(Ordering::SeqCst), 4);
    }
}
