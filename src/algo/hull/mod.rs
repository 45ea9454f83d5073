//! Incremental 3D convex hull.
//!
//! The hull is grown one point at a time on top of the half-edge kernel. A seed
//! triangle is built as a closed two-face surface; every further point either
//! lies inside the current hull and is discarded, or sees a connected set of
//! faces. Those faces are removed and the hole is closed by a fan of triangles
//! joining the point to the horizon, all in one [`TopologyEdit`](crate::mesh::TopologyEdit).
//!
//! # Tolerance
//!
//! A face is visible from a point when the point lies more than the tolerance
//! in front of the face plane. Points on a face plane are therefore discarded,
//! and nearly coplanar points never produce slivers. The tolerance is absolute
//! when set with [`HullOptions::with_tolerance`], otherwise it is
//! [`HullOptions::relative_tolerance`] times the diagonal of the input
//! bounding box.
//!
//! # Example
//!
//! ```
//! use hullmesh::algo::hull::{convex_hull, HullOptions};
//! use nalgebra::Point3;
//!
//! let mut points = Vec::new();
//! for x in [0.0, 1.0] {
//!     for y in [0.0, 1.0] {
//!         for z in [0.0, 1.0] {
//!             points.push(Point3::new(x, y, z));
//!         }
//!     }
//! }
//! points.push(Point3::new(0.5, 0.5, 0.5));
//!
//! let hull = convex_hull(&points, &HullOptions::default()).unwrap();
//! assert_eq!(hull.num_vertices(), 8);
//! assert_eq!(hull.num_faces(), 12);
//! assert_eq!(hull.num_edges(), 18);
//! ```

mod horizon;
mod incremental;

pub use horizon::{find_horizon, Horizon, HorizonEdge};
pub use incremental::{HullState, IncrementalHull, StepOutcome};

use nalgebra::Point3;

use crate::algo::Progress;
use crate::error::{MeshError, Result};
use crate::mesh::{to_face_vertex_triangles, HalfEdgeMesh};

/// Default visibility tolerance relative to the input bounding-box diagonal.
pub const DEFAULT_RELATIVE_TOLERANCE: f64 = 1e-9;

/// Options for convex hull construction.
#[derive(Debug, Clone)]
pub struct HullOptions {
    /// Absolute visibility tolerance. Overrides `relative_tolerance` when set.
    pub tolerance: Option<f64>,

    /// Tolerance as a fraction of the input bounding-box diagonal.
    pub relative_tolerance: f64,

    /// Run full invariant validation after every expansion step.
    pub validate_each_step: bool,
}

impl Default for HullOptions {
    fn default() -> Self {
        Self {
            tolerance: None,
            relative_tolerance: DEFAULT_RELATIVE_TOLERANCE,
            validate_each_step: cfg!(debug_assertions),
        }
    }
}

impl HullOptions {
    /// Use a fixed absolute tolerance.
    pub fn with_tolerance(mut self, tolerance: f64) -> Self {
        self.tolerance = Some(tolerance);
        self
    }

    /// Set the tolerance relative to the input extent.
    pub fn with_relative_tolerance(mut self, relative: f64) -> Self {
        self.relative_tolerance = relative;
        self
    }

    /// Enable or disable per-step validation.
    pub fn with_validation(mut self, validate: bool) -> Self {
        self.validate_each_step = validate;
        self
    }

    /// Check the options for invalid values.
    pub fn validate(&self) -> Result<()> {
        if let Some(tol) = self.tolerance {
            if !(tol >= 0.0 && tol.is_finite()) {
                return Err(MeshError::invalid_param(
                    "tolerance",
                    tol,
                    "must be finite and non-negative",
                ));
            }
        }
        if !(self.relative_tolerance >= 0.0 && self.relative_tolerance.is_finite()) {
            return Err(MeshError::invalid_param(
                "relative_tolerance",
                self.relative_tolerance,
                "must be finite and non-negative",
            ));
        }
        Ok(())
    }

    /// The effective absolute tolerance for `points`.
    pub fn resolve_tolerance(&self, points: &[Point3<f64>]) -> Result<f64> {
        self.validate()?;
        if let Some(tol) = self.tolerance {
            return Ok(tol);
        }

        let Some(first) = points.first() else {
            return Ok(0.0);
        };
        let (min, max) = points.iter().fold((*first, *first), |(lo, hi), p| {
            (lo.inf(p), hi.sup(p))
        });
        Ok(self.relative_tolerance * (max - min).norm())
    }
}

/// A finished convex hull.
#[derive(Debug, Clone)]
pub struct ConvexHull {
    pub(crate) mesh: HalfEdgeMesh,
    pub(crate) tolerance: f64,
    pub(crate) discarded: usize,
}

impl ConvexHull {
    /// The hull surface. Vertices swallowed during construction remain in its
    /// store as isolated vertices.
    #[inline]
    pub fn mesh(&self) -> &HalfEdgeMesh {
        &self.mesh
    }

    /// Take the hull surface.
    pub fn into_mesh(self) -> HalfEdgeMesh {
        self.mesh
    }

    /// The tolerance the hull was built with.
    #[inline]
    pub fn tolerance(&self) -> f64 {
        self.tolerance
    }

    /// Number of hull vertices (isolated vertices excluded).
    pub fn num_vertices(&self) -> usize {
        self.mesh.num_connected_vertices()
    }

    /// Number of hull faces.
    pub fn num_faces(&self) -> usize {
        self.mesh.num_faces()
    }

    /// Number of hull edges.
    pub fn num_edges(&self) -> usize {
        self.mesh.num_edges()
    }

    /// Number of input points found inside or on the hull.
    pub fn num_discarded(&self) -> usize {
        self.discarded
    }

    /// Hull vertex positions and outward-wound triangles.
    pub fn to_face_vertex(&self) -> Result<(Vec<Point3<f64>>, Vec<[usize; 3]>)> {
        to_face_vertex_triangles(&self.mesh)
    }

    /// Enclosed volume.
    pub fn volume(&self) -> Result<f64> {
        self.mesh.volume()
    }

    /// Whether `point` lies inside or on the hull, within the tolerance.
    pub fn contains(&self, point: &Point3<f64>) -> Result<bool> {
        for f in self.mesh.face_ids() {
            if let Some(plane) = self.mesh.face_plane(f)? {
                if plane.signed_distance(point) > self.tolerance {
                    return Ok(false);
                }
            }
        }
        Ok(true)
    }

    /// Whether every hull vertex lies on or behind every face plane.
    pub fn is_convex(&self) -> Result<bool> {
        for v in self.mesh.connected_vertex_ids() {
            if !self.contains(self.mesh.position(v)?)? {
                return Ok(false);
            }
        }
        Ok(true)
    }
}

/// Compute the convex hull of a point set.
///
/// # Errors
///
/// - [`MeshError::InsufficientPoints`] for fewer than 3 distinct points
/// - [`MeshError::DegenerateGeometry`] for collinear input, coplanar input
///   that is not a triangle, or non-finite coordinates
/// - [`MeshError::InvalidParameter`] for invalid options
/// - topology errors if an expansion step cannot be stitched
pub fn convex_hull(points: &[Point3<f64>], options: &HullOptions) -> Result<ConvexHull> {
    IncrementalHull::new(points, options)?.run()
}

/// Compute the convex hull of a point set, reporting progress per point.
pub fn convex_hull_with_progress(
    points: &[Point3<f64>],
    options: &HullOptions,
    progress: &Progress,
) -> Result<ConvexHull> {
    IncrementalHull::new(points, options)?.run_with_progress(progress)
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};

    use approx::assert_relative_eq;

    use super::*;

    fn tetra_points() -> Vec<Point3<f64>> {
        vec![
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(1.0, 0.0, 0.0),
            Point3::new(0.0, 1.0, 0.0),
            Point3::new(0.0, 0.0, 1.0),
        ]
    }

    #[test]
    fn test_default_options() {
        let options = HullOptions::default();
        assert!(options.tolerance.is_none());
        assert_eq!(options.relative_tolerance, DEFAULT_RELATIVE_TOLERANCE);
        assert!(options.validate().is_ok());
    }

    #[test]
    fn test_invalid_tolerance() {
        let options = HullOptions::default().with_tolerance(-1.0);
        assert!(matches!(
            options.validate(),
            Err(MeshError::InvalidParameter { name: "tolerance", .. })
        ));

        let options = HullOptions::default().with_relative_tolerance(f64::NAN);
        assert!(matches!(
            options.validate(),
            Err(MeshError::InvalidParameter { name: "relative_tolerance", .. })
        ));
        assert!(convex_hull(&tetra_points(), &options).is_err());
    }

    #[test]
    fn test_resolve_tolerance() {
        let points = vec![Point3::new(0.0, 0.0, 0.0), Point3::new(3.0, 4.0, 0.0)];
        let relative = HullOptions::default().with_relative_tolerance(0.1);
        assert_relative_eq!(relative.resolve_tolerance(&points).unwrap(), 0.5);

        let absolute = relative.with_tolerance(0.25);
        assert_relative_eq!(absolute.resolve_tolerance(&points).unwrap(), 0.25);

        assert_eq!(HullOptions::default().resolve_tolerance(&[]).unwrap(), 0.0);
    }

    #[test]
    fn test_tetrahedron_hull() {
        let hull = convex_hull(&tetra_points(), &HullOptions::default()).unwrap();
        assert_eq!(hull.num_vertices(), 4);
        assert_eq!(hull.num_faces(), 4);
        assert_eq!(hull.num_edges(), 6);
        assert_eq!(hull.num_discarded(), 0);
        assert_relative_eq!(hull.volume().unwrap(), 1.0 / 6.0, epsilon = 1e-12);
        assert!(hull.is_convex().unwrap());
    }

    #[test]
    fn test_contains() {
        let hull = convex_hull(&tetra_points(), &HullOptions::default()).unwrap();
        assert!(hull.contains(&Point3::new(0.1, 0.1, 0.1)).unwrap());
        assert!(hull.contains(&Point3::new(0.0, 0.0, 0.0)).unwrap());
        assert!(!hull.contains(&Point3::new(1.0, 1.0, 1.0)).unwrap());
    }

    #[test]
    fn test_export_triangles() {
        let hull = convex_hull(&tetra_points(), &HullOptions::default()).unwrap();
        let (positions, triangles) = hull.to_face_vertex().unwrap();
        assert_eq!(positions.len(), 4);
        assert_eq!(triangles.len(), 4);
    }

    #[test]
    fn test_progress_reports_each_point() {
        let mut points = tetra_points();
        points.push(Point3::new(0.2, 0.2, 0.2));
        points.push(Point3::new(1.0, 1.0, 1.0));

        let calls = Arc::new(AtomicUsize::new(0));
        let consumed = Arc::new(Mutex::new(Vec::new()));
        let (seen, log) = (Arc::clone(&calls), Arc::clone(&consumed));
        let progress = Progress::new(move |current, total, _| {
            assert_eq!(total, 3);
            seen.fetch_add(1, Ordering::Relaxed);
            log.lock().unwrap().push(current);
        });
        let hull = convex_hull_with_progress(&points, &HullOptions::default(), &progress).unwrap();

        // One report for the seed, one per remaining point.
        assert_eq!(calls.load(Ordering::Relaxed), 1 + 3);
        assert_eq!(*consumed.lock().unwrap(), vec![0, 1, 2, 3]);
        assert_eq!(hull.num_discarded(), 1);
    }
}
