//! Transactional topology edits.
//!
//! A [`TopologyEdit`] stages face removals and face stitches, checks that the
//! whole batch leaves a closed manifold surface, and only then applies it.
//! When validation fails the mesh is untouched, which is what lets the hull
//! builder abort an expansion step and keep the last consistent surface.
//!
//! # Example
//!
//! ```
//! use hullmesh::prelude::*;
//! use nalgebra::Point3;
//!
//! let mut mesh = HalfEdgeMesh::create_seed(
//!     Point3::new(0.0, 0.0, 0.0),
//!     Point3::new(1.0, 0.0, 0.0),
//!     Point3::new(0.0, 1.0, 0.0),
//! )
//! .unwrap();
//!
//! // Raise a tetrahedron on the front face.
//! let front = mesh.face_ids().next().unwrap();
//! let corners: Vec<VertexId> = mesh.boundary_of(front).unwrap().map(|v| v.unwrap()).collect();
//! let apex = mesh.add_vertex(Point3::new(0.0, 0.0, 1.0));
//!
//! let mut edit = TopologyEdit::new();
//! edit.remove_face(front);
//! for i in 0..3 {
//!     edit.stitch_face([corners[i], corners[(i + 1) % 3], apex]);
//! }
//! edit.commit(&mut mesh).unwrap();
//!
//! assert_eq!(mesh.num_faces(), 4);
//! assert!(mesh.is_valid());
//! ```

use std::collections::HashSet;

use tracing::{debug, warn};

use super::halfedge::HalfEdgeMesh;
use super::index::{FaceId, HalfEdgeId, MeshHandle, VertexId};
use crate::error::{unpaired, MeshError, Result};

/// A staged batch of face removals and stitches.
#[derive(Debug, Clone, Default)]
pub struct TopologyEdit {
    removals: Vec<FaceId>,
    stitches: Vec<Vec<VertexId>>,
}

impl TopologyEdit {
    /// Create an empty edit.
    pub fn new() -> Self {
        Self::default()
    }

    /// Stage the removal of a face.
    pub fn remove_face(&mut self, f: FaceId) -> &mut Self {
        self.removals.push(f);
        self
    }

    /// Stage a new face bounded by `vertices` in winding order.
    pub fn stitch_face(&mut self, vertices: impl IntoIterator<Item = VertexId>) -> &mut Self {
        self.stitches.push(vertices.into_iter().collect());
        self
    }

    /// Number of staged removals.
    pub fn num_removals(&self) -> usize {
        self.removals.len()
    }

    /// Number of staged stitches.
    pub fn num_stitches(&self) -> usize {
        self.stitches.len()
    }

    /// Whether nothing is staged.
    pub fn is_empty(&self) -> bool {
        self.removals.is_empty() && self.stitches.is_empty()
    }

    /// Check that applying this edit to `mesh` yields a closed manifold surface,
    /// without modifying the mesh.
    ///
    /// # Errors
    ///
    /// - [`MeshError::InvalidHandle`] for a dead or twice-removed face, or a dead vertex
    /// - [`MeshError::DegenerateGeometry`] for a staged face with fewer than 3 or
    ///   repeated vertices
    /// - [`MeshError::NonManifoldEdge`] if a directed edge would exist twice or a
    ///   surviving half-edge would gain a second opposite
    /// - [`MeshError::UnpairedEdge`] if any half-edge would be left without an opposite
    pub fn validate(&self, mesh: &HalfEdgeMesh) -> Result<()> {
        if mesh.num_unpaired() > 0 {
            if let Some(he) = mesh.halfedge_ids().find(|&he| mesh.opposite(he).is_err()) {
                let edge = mesh.halfedge(he)?;
                return Err(unpaired(edge.from(), edge.to()));
            }
        }

        let mut removed_faces = HashSet::with_capacity(self.removals.len());
        let mut removed: HashSet<HalfEdgeId> = HashSet::new();
        for &f in &self.removals {
            if !removed_faces.insert(f) {
                return Err(f.invalid_handle());
            }
            for he in mesh.face_loop(f)? {
                removed.insert(he?);
            }
        }

        let mut added: HashSet<(VertexId, VertexId)> = HashSet::new();
        for face in &self.stitches {
            let n = face.len();
            if n < 3 {
                return Err(MeshError::degenerate(format!(
                    "a face needs at least 3 vertices, got {n}"
                )));
            }
            for (i, &v) in face.iter().enumerate() {
                mesh.vertex(v)?;
                if face[..i].contains(&v) {
                    return Err(MeshError::degenerate(format!("face repeats vertex {v:?}")));
                }
            }
            for i in 0..n {
                let (a, b) = (face[i], face[(i + 1) % n]);
                let survives = mesh
                    .find_halfedge(a, b)
                    .is_some_and(|he| !removed.contains(&he));
                if survives || !added.insert((a, b)) {
                    return Err(MeshError::NonManifoldEdge { from: a, to: b });
                }
            }
        }

        // Every new edge needs a partner: another new edge, or a surviving
        // half-edge whose current opposite is being removed.
        for &(a, b) in &added {
            if added.contains(&(b, a)) {
                continue;
            }
            match mesh.find_halfedge(b, a).filter(|he| !removed.contains(he)) {
                Some(twin) => {
                    let opposite = mesh.opposite(twin)?;
                    if !removed.contains(&opposite) {
                        return Err(MeshError::NonManifoldEdge { from: b, to: a });
                    }
                }
                None => return Err(unpaired(a, b)),
            }
        }

        // Every surviving half-edge that loses its opposite must be re-paired.
        for &he in &removed {
            let edge = mesh.halfedge(he)?;
            let opposite = mesh.opposite(he)?;
            if !removed.contains(&opposite) && !added.contains(&(edge.from(), edge.to())) {
                return Err(unpaired(edge.to(), edge.from()));
            }
        }

        Ok(())
    }

    /// Validate and apply the edit, returning the new faces in staging order.
    ///
    /// On a validation failure the mesh is unchanged. A failure while applying a
    /// validated edit means the mesh was already corrupt; it is reported as is
    /// and the mesh must be discarded.
    pub fn commit(self, mesh: &mut HalfEdgeMesh) -> Result<Vec<FaceId>> {
        if let Err(err) = self.validate(mesh) {
            debug!(%err, removals = self.removals.len(), stitches = self.stitches.len(), "rejected topology edit");
            return Err(err);
        }

        let applied = self.apply(mesh);
        if let Err(err) = &applied {
            warn!(%err, "validated topology edit failed to apply");
        }
        applied
    }

    fn apply(self, mesh: &mut HalfEdgeMesh) -> Result<Vec<FaceId>> {
        for f in self.removals {
            mesh.remove_face(f)?;
        }
        let faces = self
            .stitches
            .iter()
            .map(|face| mesh.stitch_face(face))
            .collect::<Result<Vec<_>>>()?;
        mesh.finish_stitching()?;
        Ok(faces)
    }
}

#[cfg(test)]
mod tests {
    use nalgebra::Point3;

    use super::*;

    fn seed() -> HalfEdgeMesh {
        HalfEdgeMesh::create_seed(
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(1.0, 0.0, 0.0),
            Point3::new(0.0, 1.0, 0.0),
        )
        .unwrap()
    }

    fn front_corners(mesh: &HalfEdgeMesh) -> (FaceId, Vec<VertexId>) {
        let front = mesh.face_ids().next().unwrap();
        let corners = mesh.boundary_of(front).unwrap().collect::<Result<_>>().unwrap();
        (front, corners)
    }

    #[test]
    fn test_raise_tetrahedron() {
        let mut mesh = seed();
        let (front, c) = front_corners(&mesh);
        let apex = mesh.add_vertex(Point3::new(0.0, 0.0, 1.0));

        let mut edit = TopologyEdit::new();
        edit.remove_face(front);
        for i in 0..3 {
            edit.stitch_face([c[i], c[(i + 1) % 3], apex]);
        }
        let faces = edit.commit(&mut mesh).unwrap();

        assert_eq!(faces.len(), 3);
        assert_eq!(mesh.num_faces(), 4);
        assert_eq!(mesh.num_edges(), 6);
        assert_eq!(mesh.euler_characteristic(), 2);
        mesh.validate().unwrap();
        assert!((mesh.volume().unwrap() - 1.0 / 6.0).abs() < 1e-12);
    }

    #[test]
    fn test_incomplete_fan_rolls_back() {
        let mut mesh = seed();
        let (front, c) = front_corners(&mesh);
        let apex = mesh.add_vertex(Point3::new(0.0, 0.0, 1.0));

        let mut edit = TopologyEdit::new();
        edit.remove_face(front);
        edit.stitch_face([c[0], c[1], apex]);
        edit.stitch_face([c[1], c[2], apex]);

        let result = edit.commit(&mut mesh);
        assert!(matches!(result, Err(MeshError::UnpairedEdge { .. })));
        assert_eq!(mesh.num_faces(), 2);
        assert_eq!(mesh.num_halfedges(), 6);
        mesh.validate().unwrap();
    }

    #[test]
    fn test_stitch_over_live_face_is_non_manifold() {
        let mut mesh = seed();
        let (_, c) = front_corners(&mesh);
        let apex = mesh.add_vertex(Point3::new(0.0, 0.0, 1.0));

        // Without removing the front face, its edges are still taken.
        let mut edit = TopologyEdit::new();
        for i in 0..3 {
            edit.stitch_face([c[i], c[(i + 1) % 3], apex]);
        }
        let result = edit.commit(&mut mesh);
        assert!(matches!(result, Err(MeshError::NonManifoldEdge { .. })));
        mesh.validate().unwrap();
    }

    #[test]
    fn test_double_removal_is_invalid_handle() {
        let mut mesh = seed();
        let (front, _) = front_corners(&mesh);

        let mut edit = TopologyEdit::new();
        edit.remove_face(front).remove_face(front);
        assert!(matches!(
            edit.commit(&mut mesh),
            Err(MeshError::InvalidHandle { kind: "face", .. })
        ));
        assert_eq!(mesh.num_faces(), 2);
    }

    #[test]
    fn test_stale_face_leaves_mesh_usable() {
        let mut mesh = seed();
        let (front, c) = front_corners(&mesh);
        let apex = mesh.add_vertex(Point3::new(0.0, 0.0, 1.0));

        let mut edit = TopologyEdit::new();
        edit.remove_face(front);
        for i in 0..3 {
            edit.stitch_face([c[i], c[(i + 1) % 3], apex]);
        }
        edit.commit(&mut mesh).unwrap();

        // `front` is gone; removing it again is a caller bug, not a broken mesh.
        let mut edit = TopologyEdit::new();
        edit.remove_face(front);
        let err = edit.commit(&mut mesh).unwrap_err();
        assert!(matches!(err, MeshError::InvalidHandle { kind: "face", .. }));
        assert!(!err.is_fatal());
        assert_eq!(mesh.num_faces(), 4);
        mesh.validate().unwrap();
    }

    #[test]
    fn test_empty_edit_is_noop() {
        let mut mesh = seed();
        let edit = TopologyEdit::new();
        assert!(edit.is_empty());
        assert!(edit.commit(&mut mesh).unwrap().is_empty());
        mesh.validate().unwrap();
    }
}
