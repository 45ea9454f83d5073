//! Per-point progress reporting for hull construction.
//!
//! [`convex_hull_with_progress`](crate::algo::hull::convex_hull_with_progress)
//! reports once after the seed surface is built and then once per consumed
//! input point, whether it expanded the hull or was discarded. `current` is
//! the number of queued points consumed so far and `total` the queue length.
//!
//! # Example
//!
//! ```
//! use hullmesh::algo::hull::{convex_hull_with_progress, HullOptions};
//! use hullmesh::algo::Progress;
//! use nalgebra::Point3;
//!
//! let progress = Progress::new(|current, total, message| {
//!     println!("[{}/{}] {}", current, total, message);
//! });
//!
//! let points = vec![
//!     Point3::new(0.0, 0.0, 0.0),
//!     Point3::new(1.0, 0.0, 0.0),
//!     Point3::new(0.0, 1.0, 0.0),
//!     Point3::new(0.0, 0.0, 1.0),
//! ];
//! let hull = convex_hull_with_progress(&points, &HullOptions::default(), &progress).unwrap();
//! assert_eq!(hull.num_faces(), 4);
//! ```

/// A progress callback invoked as hull points are consumed.
///
/// The callback receives:
/// - `current`: Queued points consumed so far
/// - `total`: Number of queued points
/// - `message`: Description of the current phase
pub struct Progress {
    callback: Box<dyn Fn(usize, usize, &str) + Send + Sync>,
}

impl Progress {
    /// Create a new progress reporter with the given callback.
    pub fn new<F>(callback: F) -> Self
    where
        F: Fn(usize, usize, &str) + Send + Sync + 'static,
    {
        Self {
            callback: Box::new(callback),
        }
    }

    /// Report progress.
    #[inline]
    pub fn report(&self, current: usize, total: usize, message: &str) {
        (self.callback)(current, total, message);
    }

    /// Create a no-op progress reporter that discards all updates.
    pub fn none() -> Self {
        Self::new(|_, _, _| {})
    }
}

impl Default for Progress {
    fn default() -> Self {
        Self::none()
    }
}

impl std::fmt::Debug for Progress {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Progress").finish_non_exhaustive()
    }
}
