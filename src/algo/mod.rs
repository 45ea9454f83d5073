//! Algorithms built on the half-edge kernel.
//!
//! - **Convex hull**: incremental hull construction by horizon stitching
//!   ([`hull`])

pub mod hull;
pub mod progress;

pub use progress::Progress;
