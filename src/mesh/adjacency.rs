//! Read-only adjacency traversal.
//!
//! Every walk is an explicit cursor owned by the caller, borrowing the mesh
//! immutably, so any number of traversals can run side by side. Cursors are
//! finite and restartable. Each walk is bounded by `num_halfedges() + 1` steps;
//! a cycle that does not close within that bound, or a link that does not
//! resolve, yields [`MeshError::CorruptTopology`] and ends the walk.

use super::halfedge::HalfEdgeMesh;
use super::index::{FaceId, HalfEdgeId, VertexId};
use crate::error::{dangling, MeshError, Result};

/// Cursor over the half-edges leaving a vertex, walking `opposite -> next`.
#[derive(Debug, Clone)]
pub struct OutgoingEdges<'a> {
    mesh: &'a HalfEdgeMesh,
    vertex: VertexId,
    start: Option<HalfEdgeId>,
    current: Option<HalfEdgeId>,
    steps: usize,
    limit: usize,
}

impl<'a> OutgoingEdges<'a> {
    fn new(mesh: &'a HalfEdgeMesh, vertex: VertexId, start: Option<HalfEdgeId>) -> Self {
        Self {
            mesh,
            vertex,
            start,
            current: start,
            steps: 0,
            limit: mesh.num_halfedges() + 1,
        }
    }

    /// Rewind to the vertex's seed half-edge.
    pub fn restart(&mut self) {
        self.current = self.start;
        self.steps = 0;
    }

    fn advance(&self, current: HalfEdgeId) -> Result<HalfEdgeId> {
        let halfedges = &self.mesh.halfedges;
        let he = halfedges.get(current).ok_or_else(|| dangling(current, "fan"))?;
        if he.from != self.vertex {
            return Err(MeshError::corrupt(format!(
                "{current:?} in the fan of {:?} starts at {:?}",
                self.vertex, he.from
            )));
        }
        let opposite = halfedges
            .get(he.opposite)
            .ok_or_else(|| dangling(current, "opposite"))?;
        Ok(opposite.next)
    }
}

impl Iterator for OutgoingEdges<'_> {
    type Item = Result<HalfEdgeId>;

    fn next(&mut self) -> Option<Self::Item> {
        let current = self.current?;

        if self.steps >= self.limit {
            self.current = None;
            return Some(Err(MeshError::corrupt(format!(
                "fan around {:?} did not close within {} steps",
                self.vertex, self.limit
            ))));
        }
        self.steps += 1;

        match self.advance(current) {
            Ok(next) => {
                self.current = (Some(next) != self.start).then_some(next);
                Some(Ok(current))
            }
            Err(err) => {
                self.current = None;
                Some(Err(err))
            }
        }
    }
}

/// Cursor over the vertices adjacent to a vertex, in fan order.
#[derive(Debug, Clone)]
pub struct VertexNeighbors<'a> {
    edges: OutgoingEdges<'a>,
}

impl VertexNeighbors<'_> {
    /// Rewind to the first neighbour.
    pub fn restart(&mut self) {
        self.edges.restart();
    }
}

impl Iterator for VertexNeighbors<'_> {
    type Item = Result<VertexId>;

    fn next(&mut self) -> Option<Self::Item> {
        let mesh = self.edges.mesh;
        self.edges
            .next()
            .map(|he| he.and_then(|he| mesh.halfedge(he).map(|h| h.to)))
    }
}

/// Cursor over the half-edges bounding a face, walking `next`.
#[derive(Debug, Clone)]
pub struct FaceLoop<'a> {
    mesh: &'a HalfEdgeMesh,
    face: FaceId,
    start: HalfEdgeId,
    current: Option<HalfEdgeId>,
    steps: usize,
    limit: usize,
}

impl<'a> FaceLoop<'a> {
    fn new(mesh: &'a HalfEdgeMesh, face: FaceId, start: HalfEdgeId) -> Self {
        Self {
            mesh,
            face,
            start,
            current: Some(start),
            steps: 0,
            limit: mesh.num_halfedges() + 1,
        }
    }

    /// Rewind to the face's seed half-edge.
    pub fn restart(&mut self) {
        self.current = Some(self.start);
        self.steps = 0;
    }
}

impl Iterator for FaceLoop<'_> {
    type Item = Result<HalfEdgeId>;

    fn next(&mut self) -> Option<Self::Item> {
        let current = self.current?;

        if self.steps >= self.limit {
            self.current = None;
            return Some(Err(MeshError::corrupt(format!(
                "boundary of {:?} did not close within {} steps",
                self.face, self.limit
            ))));
        }
        self.steps += 1;

        let Some(he) = self.mesh.halfedges.get(current) else {
            self.current = None;
            return Some(Err(dangling(current, "face cycle")));
        };
        if he.face != self.face {
            self.current = None;
            return Some(Err(MeshError::corrupt(format!(
                "{current:?} on the boundary of {:?} names {:?}",
                self.face, he.face
            ))));
        }

        self.current = (he.next != self.start).then_some(he.next);
        Some(Ok(current))
    }
}

/// Cursor over the corners of a face, in winding order.
#[derive(Debug, Clone)]
pub struct FaceBoundary<'a> {
    edges: FaceLoop<'a>,
}

impl FaceBoundary<'_> {
    /// Rewind to the first corner.
    pub fn restart(&mut self) {
        self.edges.restart();
    }
}

impl Iterator for FaceBoundary<'_> {
    type Item = Result<VertexId>;

    fn next(&mut self) -> Option<Self::Item> {
        let mesh = self.edges.mesh;
        self.edges
            .next()
            .map(|he| he.and_then(|he| mesh.halfedge(he).map(|h| h.from)))
    }
}

impl HalfEdgeMesh {
    /// Walk the half-edges leaving `v`. Empty for an isolated vertex.
    pub fn outgoing_edges(&self, v: VertexId) -> Result<OutgoingEdges<'_>> {
        let seed = self.vertex(v)?.halfedge();
        Ok(OutgoingEdges::new(self, v, seed))
    }

    /// Walk the vertices adjacent to `v`.
    ///
    /// # Errors
    ///
    /// [`MeshError::InvalidHandle`] if `v` is not a live vertex. Broken fans
    /// surface as [`MeshError::CorruptTopology`] items.
    pub fn neighbors_of(&self, v: VertexId) -> Result<VertexNeighbors<'_>> {
        Ok(VertexNeighbors {
            edges: self.outgoing_edges(v)?,
        })
    }

    /// Walk the half-edges bounding `f`.
    pub fn face_loop(&self, f: FaceId) -> Result<FaceLoop<'_>> {
        let start = self.face(f)?.halfedge();
        if !self.contains_halfedge(start) {
            return Err(MeshError::corrupt(format!(
                "{f:?} seed half-edge {start:?} does not resolve"
            )));
        }
        Ok(FaceLoop::new(self, f, start))
    }

    /// Walk the corners of `f` in winding order.
    ///
    /// # Errors
    ///
    /// [`MeshError::InvalidHandle`] if `f` is not a live face.
    pub fn boundary_of(&self, f: FaceId) -> Result<FaceBoundary<'_>> {
        Ok(FaceBoundary {
            edges: self.face_loop(f)?,
        })
    }

    /// Faces incident to `v`, in fan order.
    pub fn faces_around(&self, v: VertexId) -> Result<Vec<FaceId>> {
        self.outgoing_edges(v)?
            .map(|he| he.and_then(|he| self.face_of(he)))
            .collect()
    }

    /// Faces sharing an edge with `f`, one per side, in boundary order.
    pub fn face_neighbors(&self, f: FaceId) -> Result<Vec<FaceId>> {
        self.face_loop(f)?
            .map(|he| {
                let opposite = self.opposite(he?)?;
                self.face_of(opposite)
            })
            .collect()
    }

    /// Number of edges incident to `v`.
    pub fn valence(&self, v: VertexId) -> Result<usize> {
        self.outgoing_edges(v)?.try_fold(0, |n, he| he.map(|_| n + 1))
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use nalgebra::Point3;

    use super::*;
    use crate::mesh::build_from_triangles;

    fn tetrahedron() -> HalfEdgeMesh {
        let vertices = vec![
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(1.0, 0.0, 0.0),
            Point3::new(0.0, 1.0, 0.0),
            Point3::new(0.0, 0.0, 1.0),
        ];
        let faces = vec![[0, 2, 1], [0, 1, 3], [1, 2, 3], [2, 0, 3]];
        build_from_triangles(&vertices, &faces).unwrap()
    }

    #[test]
    fn test_neighbors_of_tetrahedron_vertex() {
        let mesh = tetrahedron();
        for v in mesh.vertex_ids() {
            let neighbors: HashSet<_> = mesh
                .neighbors_of(v)
                .unwrap()
                .collect::<Result<_>>()
                .unwrap();
            assert_eq!(neighbors.len(), 3);
            assert!(!neighbors.contains(&v));
            assert_eq!(mesh.valence(v).unwrap(), 3);
        }
    }

    #[test]
    fn test_cursor_restart() {
        let mesh = tetrahedron();
        let v = mesh.vertex_ids().next().unwrap();
        let mut cursor = mesh.neighbors_of(v).unwrap();

        let first: Vec<_> = cursor.by_ref().collect::<Result<_>>().unwrap();
        assert!(cursor.next().is_none());
        cursor.restart();
        let second: Vec<_> = cursor.collect::<Result<_>>().unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_boundary_of_face() {
        let mesh = tetrahedron();
        for f in mesh.face_ids() {
            let corners: Vec<_> = mesh
                .boundary_of(f)
                .unwrap()
                .collect::<Result<_>>()
                .unwrap();
            assert_eq!(corners.len(), 3);
            assert_eq!(mesh.face_neighbors(f).unwrap().len(), 3);
            assert!(!mesh.face_neighbors(f).unwrap().contains(&f));
        }
    }

    #[test]
    fn test_faces_around_vertex() {
        let mesh = tetrahedron();
        let v = mesh.vertex_ids().next().unwrap();
        let faces: HashSet<_> = mesh.faces_around(v).unwrap().into_iter().collect();
        assert_eq!(faces.len(), 3);
    }

    #[test]
    fn test_isolated_vertex_has_no_neighbors() {
        let mut mesh = tetrahedron();
        let v = mesh.add_vertex(Point3::new(5.0, 5.0, 5.0));
        assert_eq!(mesh.neighbors_of(v).unwrap().count(), 0);
    }

    #[test]
    fn test_stale_handles() {
        let mut mesh = tetrahedron();
        let f = mesh.face_ids().next().unwrap();
        mesh.remove_face(f).unwrap();
        assert!(matches!(
            mesh.boundary_of(f),
            Err(MeshError::InvalidHandle { kind: "face", .. })
        ));

        let v = mesh.add_vertex(Point3::origin());
        mesh.remove_isolated_vertex(v).unwrap();
        assert!(matches!(
            mesh.neighbors_of(v),
            Err(MeshError::InvalidHandle { kind: "vertex", .. })
        ));
    }

    #[test]
    fn test_open_fan_is_reported() {
        let mut mesh = tetrahedron();
        let f = mesh.face_ids().last().unwrap();
        let corners: Vec<_> = mesh.boundary_of(f).unwrap().collect::<Result<_>>().unwrap();
        mesh.remove_face(f).unwrap();

        // Fans around the corners of the removed face now run into a missing
        // opposite. Corners whose seed edge was removed walk nothing until
        // the next stitching batch re-seats them.
        let seeded: Vec<_> = corners
            .into_iter()
            .filter(|&v| !mesh.vertex(v).unwrap().is_isolated())
            .collect();
        assert!(!seeded.is_empty());
        for v in seeded {
            let walked: Result<Vec<_>> = mesh.neighbors_of(v).unwrap().collect();
            assert!(matches!(walked, Err(MeshError::CorruptTopology { .. })));
        }
    }

    fn did_not_close(err: &MeshError) -> bool {
        matches!(err, MeshError::CorruptTopology { details } if details.contains("did not close"))
    }

    #[test]
    fn test_face_cycle_without_return_hits_step_bound() {
        let mut mesh = tetrahedron();
        let f = mesh.face_ids().next().unwrap();
        let edges: Vec<_> = mesh.face_loop(f).unwrap().collect::<Result<_>>().unwrap();

        // a -> b -> b -> ... never comes back to a.
        let b = edges[1];
        mesh.halfedges[b].next = b;

        let items: Vec<_> = mesh.boundary_of(f).unwrap().collect();
        assert_eq!(items.len(), mesh.num_halfedges() + 2);
        let err = items.last().unwrap().as_ref().unwrap_err();
        assert!(did_not_close(err), "{err}");
        assert!(items[..items.len() - 1].iter().all(|item| item.is_ok()));
    }

    #[test]
    fn test_fan_without_return_hits_step_bound() {
        let mut mesh = tetrahedron();
        let v = mesh.vertex_ids().next().unwrap();
        let fan: Vec<_> = mesh.outgoing_edges(v).unwrap().collect::<Result<_>>().unwrap();
        assert_eq!(fan.len(), 3);

        // Loop the fan back onto its second edge so the seed is never reached.
        let last_opposite = mesh.halfedges[fan[2]].opposite;
        mesh.halfedges[last_opposite].next = fan[1];

        let walked: Result<Vec<_>> = mesh.neighbors_of(v).unwrap().collect();
        let err = walked.unwrap_err();
        assert!(did_not_close(&err), "{err}");
        assert!(err.is_fatal());

        // The cursor fuses after the error.
        let mut cursor = mesh.outgoing_edges(v).unwrap();
        assert!(cursor.by_ref().any(|item| item.is_err()));
        assert!(cursor.next().is_none());
    }
}
