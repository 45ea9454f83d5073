//! Incremental hull construction.
//!
//! [`IncrementalHull`] is a state machine over one input point sequence:
//!
//! - **Seeding**: pick three well-separated points and build the two-face seed,
//!   then queue the point farthest from the seed plane ahead of the rest
//! - **Expanding**: each step takes the next point; if no face can see it the
//!   point is discarded, otherwise the visible faces are replaced by a fan of
//!   triangles joining the point to the horizon
//! - **Done**: every point has been consumed
//!
//! Each expansion step is one [`TopologyEdit`]: if it fails validation the mesh
//! keeps the surface it had before the step and the error is returned.

use nalgebra::{Point3, Vector3};
use tracing::{debug, info, trace, warn};

use super::horizon::find_horizon;
use super::{ConvexHull, HullOptions};
use crate::algo::Progress;
use crate::error::{MeshError, Result};
use crate::mesh::{HalfEdgeMesh, Plane, TopologyEdit, VertexId};

/// Where an [`IncrementalHull`] is in its run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HullState {
    /// No surface yet.
    Seeding,
    /// Seeded; points remain to be consumed.
    Expanding,
    /// All input points consumed.
    Done,
}

/// What one step did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepOutcome {
    /// The seed surface was built.
    Seeded,
    /// The point extended the hull.
    Expanded {
        /// Faces removed (visible from the point).
        removed: usize,
        /// Faces stitched (one per horizon edge).
        added: usize,
    },
    /// The point lies inside or on the hull.
    Discarded,
}

/// Builds a convex hull one point at a time.
///
/// # Example
///
/// ```
/// use hullmesh::algo::hull::{HullOptions, HullState, IncrementalHull};
/// use nalgebra::Point3;
///
/// let points = vec![
///     Point3::new(0.0, 0.0, 0.0),
///     Point3::new(1.0, 0.0, 0.0),
///     Point3::new(0.0, 1.0, 0.0),
///     Point3::new(0.0, 0.0, 1.0),
///     Point3::new(0.1, 0.1, 0.1),
/// ];
///
/// let mut builder = IncrementalHull::new(&points, &HullOptions::default()).unwrap();
/// while builder.step().unwrap().is_some() {
///     assert!(builder.mesh().is_valid());
/// }
/// assert_eq!(builder.state(), HullState::Done);
///
/// let hull = builder.finish().unwrap();
/// assert_eq!(hull.num_faces(), 4);
/// assert_eq!(hull.num_discarded(), 1);
/// ```
#[derive(Debug, Clone)]
pub struct IncrementalHull<'p> {
    points: &'p [Point3<f64>],
    tolerance: f64,
    validate_each_step: bool,
    state: HullState,
    mesh: HalfEdgeMesh,
    queue: Vec<usize>,
    cursor: usize,
    discarded: usize,
}

impl<'p> IncrementalHull<'p> {
    /// Prepare a hull build over `points`.
    ///
    /// # Errors
    ///
    /// [`MeshError::InvalidParameter`] for a bad tolerance;
    /// [`MeshError::DegenerateGeometry`] for a non-finite coordinate.
    pub fn new(points: &'p [Point3<f64>], options: &HullOptions) -> Result<Self> {
        if let Some(i) = points.iter().position(|p| !is_finite(p)) {
            return Err(MeshError::degenerate(format!(
                "point {i} has a non-finite coordinate"
            )));
        }
        let tolerance = options.resolve_tolerance(points)?;

        Ok(Self {
            points,
            tolerance,
            validate_each_step: options.validate_each_step,
            state: HullState::Seeding,
            mesh: HalfEdgeMesh::new(),
            queue: Vec::new(),
            cursor: 0,
            discarded: 0,
        })
    }

    /// Current state.
    #[inline]
    pub fn state(&self) -> HullState {
        self.state
    }

    /// The surface built so far.
    #[inline]
    pub fn mesh(&self) -> &HalfEdgeMesh {
        &self.mesh
    }

    /// The effective visibility tolerance.
    #[inline]
    pub fn tolerance(&self) -> f64 {
        self.tolerance
    }

    /// Number of queued points not consumed yet.
    #[inline]
    pub fn remaining(&self) -> usize {
        self.queue.len() - self.cursor
    }

    /// Advance by one step. Returns `None` once the run is done.
    ///
    /// The first step seeds the hull; each later step consumes one point. A
    /// failed expansion step leaves the previous surface in place.
    pub fn step(&mut self) -> Result<Option<StepOutcome>> {
        match self.state {
            HullState::Seeding => self.seed().map(Some),
            HullState::Expanding => {
                let Some(&index) = self.queue.get(self.cursor) else {
                    self.state = HullState::Done;
                    return Ok(None);
                };
                self.cursor += 1;
                self.insert(self.points[index]).map(Some)
            }
            HullState::Done => Ok(None),
        }
    }

    /// Run to completion.
    pub fn run(mut self) -> Result<ConvexHull> {
        while self.step()?.is_some() {}
        self.finish()
    }

    /// Run to completion, reporting each consumed point.
    pub fn run_with_progress(mut self, progress: &Progress) -> Result<ConvexHull> {
        while self.step()?.is_some() {
            progress.report(self.cursor, self.queue.len(), "inserting points");
        }
        self.finish()
    }

    /// Hand over the finished hull.
    ///
    /// Hull vertices that ended up flat, lying inside a face or an edge of the
    /// final surface within the tolerance, are dropped first and counted as
    /// discarded. The vertex set is then the set of extreme input points,
    /// whatever order the points arrived in.
    ///
    /// # Errors
    ///
    /// [`MeshError::InvalidState`] unless the run is [`HullState::Done`].
    pub fn finish(mut self) -> Result<ConvexHull> {
        if self.state != HullState::Done {
            return Err(MeshError::InvalidState(format!(
                "hull build is still {:?}",
                self.state
            )));
        }
        self.prune_flat_vertices()?;

        info!(
            vertices = self.mesh.num_connected_vertices(),
            faces = self.mesh.num_faces(),
            discarded = self.discarded,
            "convex hull complete"
        );
        Ok(ConvexHull {
            mesh: self.mesh,
            tolerance: self.tolerance,
            discarded: self.discarded,
        })
    }

    /// Extend the seeded hull by one point outside the input sequence.
    ///
    /// # Errors
    ///
    /// [`MeshError::InvalidState`] before seeding. Topology errors abort the
    /// step and leave the previous surface in place.
    pub fn insert_point(&mut self, point: Point3<f64>) -> Result<StepOutcome> {
        if self.state == HullState::Seeding {
            return Err(MeshError::InvalidState(
                "cannot insert before the hull is seeded".to_string(),
            ));
        }
        if !is_finite(&point) {
            return Err(MeshError::degenerate(format!(
                "point {point} has a non-finite coordinate"
            )));
        }
        self.insert(point)
    }

    fn insert(&mut self, point: Point3<f64>) -> Result<StepOutcome> {
        let Some(horizon) = find_horizon(&self.mesh, &point, self.tolerance)? else {
            self.discarded += 1;
            trace!(%point, "point inside hull, discarded");
            return Ok(StepOutcome::Discarded);
        };

        let apex = self.mesh.add_vertex(point);
        let mut edit = TopologyEdit::new();
        for &f in &horizon.visible {
            edit.remove_face(f);
        }
        for edge in &horizon.edges {
            edit.stitch_face([edge.from, edge.to, apex]);
        }
        let (removed, added) = (edit.num_removals(), edit.num_stitches());

        if let Err(err) = edit.commit(&mut self.mesh) {
            warn!(%err, %point, "expansion step aborted");
            if self.mesh.vertex(apex).is_ok_and(|v| v.is_isolated()) {
                self.mesh.remove_isolated_vertex(apex)?;
            }
            return Err(err);
        }
        if self.validate_each_step {
            self.mesh.validate()?;
        }

        debug!(%point, removed, added, "expanded hull");
        Ok(StepOutcome::Expanded { removed, added })
    }

    /// Rebuild the hull without its flat vertices.
    ///
    /// Every remaining point is extreme, so the rebuilt surface encloses the
    /// same volume. Each rebuild drops at least one point, which bounds the
    /// recursion through [`IncrementalHull::finish`].
    fn prune_flat_vertices(&mut self) -> Result<()> {
        // A flat two-face hull has nothing to merge.
        if self.mesh.num_faces() <= 2 {
            return Ok(());
        }

        let mut extreme = Vec::with_capacity(self.mesh.num_connected_vertices());
        let mut flat = 0;
        for v in self.mesh.connected_vertex_ids() {
            if self.is_flat_vertex(v)? {
                flat += 1;
            } else {
                extreme.push(*self.mesh.position(v)?);
            }
        }
        if flat == 0 {
            return Ok(());
        }

        debug!(flat, kept = extreme.len(), "rebuilding hull without flat vertices");
        let options = HullOptions::default()
            .with_tolerance(self.tolerance)
            .with_validation(self.validate_each_step);
        let rebuilt = IncrementalHull::new(&extreme, &options)?.run()?;

        self.mesh = rebuilt.mesh;
        self.discarded += flat + rebuilt.discarded;
        Ok(())
    }

    /// Whether the faces around `v` span at most two planes, i.e. `v` lies
    /// inside a face or an edge of the surface rather than at a corner.
    fn is_flat_vertex(&self, v: VertexId) -> Result<bool> {
        let mut planes: Vec<Plane> = Vec::with_capacity(3);
        for f in self.mesh.faces_around(v)? {
            let Some(plane) = self.mesh.face_plane(f)? else {
                continue;
            };
            let corners = self.mesh.face_positions(f)?;
            let known = planes.iter().any(|p| {
                p.normal.dot(&plane.normal) > 0.0
                    && corners
                        .iter()
                        .all(|c| p.signed_distance(c).abs() <= self.tolerance)
            });
            if !known {
                planes.push(plane);
                if planes.len() > 2 {
                    return Ok(false);
                }
            }
        }
        Ok(!planes.is_empty())
    }

    fn seed(&mut self) -> Result<StepOutcome> {
        let points = self.points;
        let tol = self.tolerance;

        if points.len() < 3 {
            return Err(MeshError::InsufficientPoints {
                found: count_distinct(points, tol),
                required: 3,
            });
        }

        // Lowest point in (x, y, z) order, then the farthest from it.
        let i0 = (0..points.len())
            .min_by(|&a, &b| {
                let (p, q) = (points[a], points[b]);
                p.x.total_cmp(&q.x)
                    .then(p.y.total_cmp(&q.y))
                    .then(p.z.total_cmp(&q.z))
            })
            .unwrap_or(0);
        let p0 = points[i0];

        let (i1, d1) = farthest(points, |p| (p - p0).norm());
        if d1 <= tol {
            return Err(MeshError::InsufficientPoints {
                found: 1,
                required: 3,
            });
        }
        let p1 = points[i1];

        let axis = (p1 - p0) / d1;
        let (i2, d2) = farthest(points, |p| (p - p0).cross(&axis).norm());
        if d2 <= tol {
            let far_from_ends = points
                .iter()
                .any(|p| (p - p0).norm() > tol && (p - p1).norm() > tol);
            return Err(if far_from_ends {
                MeshError::degenerate("all input points are collinear")
            } else {
                MeshError::InsufficientPoints {
                    found: 2,
                    required: 3,
                }
            });
        }
        let p2 = points[i2];

        self.mesh = HalfEdgeMesh::create_seed(p0, p1, p2)?;
        let normal = (p1 - p0).cross(&(p2 - p0)).normalize();

        let (i3, d3) = farthest(points, |p| (p - p0).dot(&normal).abs());
        let seeds = [i0, i1, i2];
        let rest = (0..points.len()).filter(|i| !seeds.contains(i));

        if d3 > tol {
            self.queue = std::iter::once(i3)
                .chain(rest.filter(|&i| i != i3))
                .collect();
        } else {
            let outside = points
                .iter()
                .position(|p| !in_triangle(p, [p0, p1, p2], &normal, tol));
            if let Some(i) = outside {
                return Err(MeshError::degenerate(format!(
                    "all input points are coplanar and point {i} lies outside the seed triangle"
                )));
            }
            self.queue = rest.collect();
        }

        let planar = d3 <= tol;
        debug!(seed = ?[i0, i1, i2], apex = i3, planar, tolerance = tol, "seeded hull");
        self.state = HullState::Expanding;
        Ok(StepOutcome::Seeded)
    }
}

fn is_finite(p: &Point3<f64>) -> bool {
    p.iter().all(|c| c.is_finite())
}

/// Index and value of the point maximising `metric`.
fn farthest(points: &[Point3<f64>], metric: impl Fn(&Point3<f64>) -> f64) -> (usize, f64) {
    points
        .iter()
        .map(&metric)
        .enumerate()
        .fold((0, f64::NEG_INFINITY), |best, (i, d)| {
            if d > best.1 {
                (i, d)
            } else {
                best
            }
        })
}

/// Number of points more than `tol` apart, counted greedily.
fn count_distinct(points: &[Point3<f64>], tol: f64) -> usize {
    let mut distinct: Vec<Point3<f64>> = Vec::new();
    for p in points {
        if distinct.iter().all(|q| (p - q).norm() > tol) {
            distinct.push(*p);
        }
    }
    distinct.len()
}

/// Whether a point in the triangle's plane lies inside it, within `tol`.
fn in_triangle(p: &Point3<f64>, corners: [Point3<f64>; 3], normal: &Vector3<f64>, tol: f64) -> bool {
    (0..3).all(|i| {
        let (a, b) = (corners[i], corners[(i + 1) % 3]);
        let inward = normal.cross(&(b - a));
        let len = inward.norm();
        len == 0.0 || (p - a).dot(&inward) / len >= -tol
    })
}
