//! Half-edge mesh data structure.
//!
//! This module provides the half-edge (doubly-connected edge list) topology
//! graph for closed, orientable, manifold polygon surfaces.
//!
//! # Structure
//!
//! - Each undirected edge is split into two **half-edges** pointing in opposite
//!   directions
//! - Each half-edge knows its **opposite**, **next** and **prev** half-edges
//!   around its face, its **from**/**to** vertices, and its **face**
//! - Each vertex stores one outgoing half-edge
//! - Each face stores one half-edge on its boundary and its fixed side count
//!
//! # Closed surfaces only
//!
//! There are no boundary half-edges. Every half-edge belongs to exactly one
//! face and pairs with exactly one opposite. [`HalfEdgeMesh::remove_face`]
//! temporarily leaves the surviving neighbours pointing at the removed
//! half-edges; those stale handles no longer resolve, and the neighbours are
//! tracked as *unpaired* until [`HalfEdgeMesh::stitch_face`] pairs them
//! again. [`HalfEdgeMesh::finish_stitching`] fails with
//! [`MeshError::UnpairedEdge`] if any remain.
//!
//! Callers that need all-or-nothing updates should go through
//! [`TopologyEdit`](super::TopologyEdit), which validates a whole batch of
//! removals and stitches before touching the mesh.

use std::collections::{BTreeSet, HashMap};

use nalgebra::{Point3, Vector3};
use slotmap::SlotMap;
use tracing::trace;

use super::index::{FaceId, HalfEdgeId, MeshHandle, VertexId};
use super::store::{Vertex, VertexStore};
use crate::error::{dangling, unpaired, MeshError, Result};

/// Below this ratio of `|e1 x e2|` to `|e1| |e2|` three points count as collinear.
const COLLINEAR_SINE: f64 = 1e-12;

/// A half-edge in the mesh.
#[derive(Debug, Clone, Copy)]
pub struct HalfEdge {
    pub(crate) from: VertexId,
    pub(crate) to: VertexId,
    pub(crate) opposite: HalfEdgeId,
    pub(crate) next: HalfEdgeId,
    pub(crate) prev: HalfEdgeId,
    pub(crate) face: FaceId,
}

impl HalfEdge {
    fn new(from: VertexId, to: VertexId) -> Self {
        Self {
            from,
            to,
            opposite: HalfEdgeId::invalid(),
            next: HalfEdgeId::invalid(),
            prev: HalfEdgeId::invalid(),
            face: FaceId::invalid(),
        }
    }

    /// The vertex this half-edge originates from.
    #[inline]
    pub fn from(&self) -> VertexId {
        self.from
    }

    /// The vertex this half-edge points to.
    #[inline]
    pub fn to(&self) -> VertexId {
        self.to
    }

    /// The opposite half-edge handle. May be stale while a face removal is
    /// waiting to be re-stitched.
    #[inline]
    pub fn opposite(&self) -> HalfEdgeId {
        self.opposite
    }

    /// The next half-edge around the face.
    #[inline]
    pub fn next(&self) -> HalfEdgeId {
        self.next
    }

    /// The previous half-edge around the face.
    #[inline]
    pub fn prev(&self) -> HalfEdgeId {
        self.prev
    }

    /// The face this half-edge bounds.
    #[inline]
    pub fn face(&self) -> FaceId {
        self.face
    }
}

/// A face in the half-edge mesh.
#[derive(Debug, Clone, Copy)]
pub struct Face {
    pub(crate) halfedge: HalfEdgeId,
    sides: usize,
}

impl Face {
    /// One half-edge on the boundary of this face.
    #[inline]
    pub fn halfedge(&self) -> HalfEdgeId {
        self.halfedge
    }

    /// Number of polygon sides, fixed at creation.
    #[inline]
    pub fn sides(&self) -> usize {
        self.sides
    }
}

/// An oriented plane `normal . x = offset` with unit normal.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Plane {
    /// Unit normal pointing to the outside.
    pub normal: Vector3<f64>,
    /// Offset along the normal from the origin.
    pub offset: f64,
}

impl Plane {
    /// Signed distance of `point` from the plane; positive in front.
    #[inline]
    pub fn signed_distance(&self, point: &Point3<f64>) -> f64 {
        self.normal.dot(&point.coords) - self.offset
    }
}

/// A half-edge mesh for closed polygon surfaces.
///
/// The mesh exclusively owns its vertices, half-edges, and faces. Elements
/// refer to each other through generation-checked handles, so a reference to
/// a removed element fails with [`MeshError::InvalidHandle`] instead of
/// aliasing a newer element.
#[derive(Debug, Clone, Default)]
pub struct HalfEdgeMesh {
    pub(crate) vertices: VertexStore,
    pub(crate) halfedges: SlotMap<HalfEdgeId, HalfEdge>,
    pub(crate) faces: SlotMap<FaceId, Face>,

    /// Live directed edges, keyed by `(from, to)`.
    edge_map: HashMap<(VertexId, VertexId), HalfEdgeId>,

    /// Live half-edges whose opposite does not resolve.
    unpaired: BTreeSet<HalfEdgeId>,

    /// Vertices whose seed half-edge was removed and must be re-seated.
    reseat: BTreeSet<VertexId>,
}

impl HalfEdgeMesh {
    /// Create a new empty mesh.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a mesh with pre-allocated capacity.
    pub fn with_capacity(num_vertices: usize, num_faces: usize) -> Self {
        // Closed triangle mesh: HE = 3F
        let num_halfedges = num_faces * 3;

        Self {
            vertices: VertexStore::with_capacity(num_vertices),
            halfedges: SlotMap::with_capacity_and_key(num_halfedges),
            faces: SlotMap::with_capacity_and_key(num_faces),
            edge_map: HashMap::with_capacity(num_halfedges),
            unpaired: BTreeSet::new(),
            reseat: BTreeSet::new(),
        }
    }

    /// Build the minimal closed surface spanned by three points: a front and a
    /// back triangle sharing all three edges.
    ///
    /// The front face winds `p0 -> p1 -> p2`.
    ///
    /// # Errors
    ///
    /// [`MeshError::DegenerateGeometry`] if the points are coincident, collinear,
    /// or not finite.
    pub fn create_seed(p0: Point3<f64>, p1: Point3<f64>, p2: Point3<f64>) -> Result<Self> {
        let e1 = p1 - p0;
        let e2 = p2 - p0;
        let scale = e1.norm() * e2.norm();
        let area = e1.cross(&e2).norm();

        // Written as a negated comparison so NaN input is rejected too.
        if !(area > COLLINEAR_SINE * scale) {
            return Err(MeshError::degenerate(format!(
                "seed points {p0}, {p1}, {p2} are collinear or coincident"
            )));
        }

        let mut mesh = Self::with_capacity(3, 2);
        let a = mesh.add_vertex(p0);
        let b = mesh.add_vertex(p1);
        let c = mesh.add_vertex(p2);

        mesh.stitch_face(&[a, b, c])?;
        mesh.stitch_face(&[a, c, b])?;
        mesh.finish_stitching()?;

        Ok(mesh)
    }

    // ==================== Accessors ====================

    /// Number of stored vertices, including isolated ones.
    #[inline]
    pub fn num_vertices(&self) -> usize {
        self.vertices.len()
    }

    /// Number of vertices with at least one incident face.
    #[inline]
    pub fn num_connected_vertices(&self) -> usize {
        self.vertices.num_connected()
    }

    /// Number of half-edges.
    #[inline]
    pub fn num_halfedges(&self) -> usize {
        self.halfedges.len()
    }

    /// Number of undirected edges.
    #[inline]
    pub fn num_edges(&self) -> usize {
        self.halfedges.len() / 2
    }

    /// Number of faces.
    #[inline]
    pub fn num_faces(&self) -> usize {
        self.faces.len()
    }

    /// Number of half-edges currently waiting for an opposite.
    #[inline]
    pub fn num_unpaired(&self) -> usize {
        self.unpaired.len()
    }

    /// The vertex store.
    #[inline]
    pub fn vertices(&self) -> &VertexStore {
        &self.vertices
    }

    /// Get a vertex by handle.
    #[inline]
    pub fn vertex(&self, id: VertexId) -> Result<&Vertex> {
        self.vertices.get(id)
    }

    /// Get a half-edge by handle.
    #[inline]
    pub fn halfedge(&self, id: HalfEdgeId) -> Result<&HalfEdge> {
        self.halfedges.get(id).ok_or_else(|| id.invalid_handle())
    }

    /// Get a face by handle.
    #[inline]
    pub fn face(&self, id: FaceId) -> Result<&Face> {
        self.faces.get(id).ok_or_else(|| id.invalid_handle())
    }

    /// Get the position of a vertex.
    #[inline]
    pub fn position(&self, v: VertexId) -> Result<&Point3<f64>> {
        self.vertices.position(v)
    }

    /// Whether `id` refers to a live half-edge.
    #[inline]
    pub fn contains_halfedge(&self, id: HalfEdgeId) -> bool {
        self.halfedges.contains_key(id)
    }

    /// Whether `id` refers to a live face.
    #[inline]
    pub fn contains_face(&self, id: FaceId) -> bool {
        self.faces.contains_key(id)
    }

    // ==================== Topology Queries ====================

    /// Get the opposite half-edge.
    ///
    /// # Errors
    ///
    /// [`MeshError::InvalidHandle`] for a dead `he`; [`MeshError::UnpairedEdge`]
    /// if `he` is waiting to be re-stitched.
    pub fn opposite(&self, he: HalfEdgeId) -> Result<HalfEdgeId> {
        let edge = self.halfedge(he)?;
        if self.halfedges.contains_key(edge.opposite) {
            Ok(edge.opposite)
        } else {
            Err(unpaired(edge.from, edge.to))
        }
    }

    /// Get the next half-edge around the face.
    #[inline]
    pub fn next(&self, he: HalfEdgeId) -> Result<HalfEdgeId> {
        self.halfedge(he).map(HalfEdge::next)
    }

    /// Get the previous half-edge around the face.
    #[inline]
    pub fn prev(&self, he: HalfEdgeId) -> Result<HalfEdgeId> {
        self.halfedge(he).map(HalfEdge::prev)
    }

    /// Get the face a half-edge bounds.
    #[inline]
    pub fn face_of(&self, he: HalfEdgeId) -> Result<FaceId> {
        self.halfedge(he).map(HalfEdge::face)
    }

    /// Find the live half-edge running `from -> to`.
    #[inline]
    pub fn find_halfedge(&self, from: VertexId, to: VertexId) -> Option<HalfEdgeId> {
        self.edge_map.get(&(from, to)).copied()
    }

    /// Half-edges bounding a face, in `next` order starting at the face's seed edge.
    pub fn face_edges(&self, f: FaceId) -> Result<Vec<HalfEdgeId>> {
        self.face_loop(f)?.collect()
    }

    /// Half-edges leaving a vertex, in fan order. Empty for isolated vertices.
    pub fn vertex_outgoing_edges(&self, v: VertexId) -> Result<Vec<HalfEdgeId>> {
        self.outgoing_edges(v)?.collect()
    }

    // ==================== Iteration ====================

    /// Iterate over all vertex handles.
    pub fn vertex_ids(&self) -> impl Iterator<Item = VertexId> + '_ {
        self.vertices.ids()
    }

    /// Iterate over handles of vertices with at least one incident face.
    pub fn connected_vertex_ids(&self) -> impl Iterator<Item = VertexId> + '_ {
        self.vertices
            .iter()
            .filter(|(_, v)| !v.is_isolated())
            .map(|(id, _)| id)
    }

    /// Iterate over all half-edge handles.
    pub fn halfedge_ids(&self) -> impl Iterator<Item = HalfEdgeId> + '_ {
        self.halfedges.keys()
    }

    /// Iterate over all half-edges with their handles.
    pub fn halfedges(&self) -> impl Iterator<Item = (HalfEdgeId, &HalfEdge)> + '_ {
        self.halfedges.iter()
    }

    /// Iterate over all face handles.
    pub fn face_ids(&self) -> impl Iterator<Item = FaceId> + '_ {
        self.faces.keys()
    }

    /// Iterate over all faces with their handles.
    pub fn faces(&self) -> impl Iterator<Item = (FaceId, &Face)> + '_ {
        self.faces.iter()
    }

    // ==================== Mutation ====================

    /// Admit a new position. The vertex stays isolated until a face uses it.
    pub fn add_vertex(&mut self, position: Point3<f64>) -> VertexId {
        self.vertices.insert(position)
    }

    /// Drop a vertex that never became part of the surface.
    pub fn remove_isolated_vertex(&mut self, v: VertexId) -> Result<Point3<f64>> {
        self.reseat.remove(&v);
        self.vertices.remove_isolated(v)
    }

    /// Detach a face and its bounding half-edges.
    ///
    /// Opposite links on the surviving side are left as they are; those
    /// half-edges become unpaired until a matching face is stitched.
    ///
    /// # Errors
    ///
    /// [`MeshError::InvalidHandle`] if `f` is not a live face.
    pub fn remove_face(&mut self, f: FaceId) -> Result<()> {
        let edges = self.face_edges(f)?;

        for he in edges {
            let Some(removed) = self.halfedges.remove(he) else {
                return Err(dangling(he, "face cycle"));
            };
            self.edge_map.remove(&(removed.from, removed.to));
            self.unpaired.remove(&he);
            if self.halfedges.contains_key(removed.opposite) {
                self.unpaired.insert(removed.opposite);
            }

            let vertex = self.vertices.get_mut(removed.from)?;
            if vertex.halfedge == Some(he) {
                vertex.halfedge = None;
                self.reseat.insert(removed.from);
            }
        }

        self.faces.remove(f);
        trace!(face = ?f, unpaired = self.unpaired.len(), "removed face");
        Ok(())
    }

    /// Create a face bounded by `vertices` (in winding order) and pair each new
    /// half-edge with its reverse-direction partner.
    ///
    /// A new edge `a -> b` pairs with a live `b -> a` that is currently
    /// unpaired. If none exists yet, the new edge waits as unpaired for a later
    /// stitch, so adjacent faces connect regardless of stitch order.
    ///
    /// The mesh is untouched when this fails.
    ///
    /// # Errors
    ///
    /// - [`MeshError::DegenerateGeometry`] for fewer than 3 or repeated vertices
    /// - [`MeshError::InvalidHandle`] for a dead vertex
    /// - [`MeshError::NonManifoldEdge`] if `a -> b` already exists, or `b -> a`
    ///   already has an opposite
    pub fn stitch_face(&mut self, vertices: &[VertexId]) -> Result<FaceId> {
        let n = vertices.len();
        if n < 3 {
            return Err(MeshError::degenerate(format!(
                "a face needs at least 3 vertices, got {n}"
            )));
        }

        for (i, &v) in vertices.iter().enumerate() {
            if !self.vertices.contains(v) {
                return Err(v.invalid_handle());
            }
            if vertices[..i].contains(&v) {
                return Err(MeshError::degenerate(format!("face repeats vertex {v:?}")));
            }
        }

        for i in 0..n {
            let (a, b) = (vertices[i], vertices[(i + 1) % n]);
            if self.edge_map.contains_key(&(a, b)) {
                return Err(MeshError::NonManifoldEdge { from: a, to: b });
            }
            if let Some(&twin) = self.edge_map.get(&(b, a)) {
                if self.halfedges.contains_key(self.halfedge(twin)?.opposite) {
                    return Err(MeshError::NonManifoldEdge { from: b, to: a });
                }
            }
        }

        let ids: Vec<HalfEdgeId> = (0..n)
            .map(|i| {
                self.halfedges
                    .insert(HalfEdge::new(vertices[i], vertices[(i + 1) % n]))
            })
            .collect();
        let face = self.faces.insert(Face {
            halfedge: ids[0],
            sides: n,
        });

        for (i, &he) in ids.iter().enumerate() {
            let (a, b) = (vertices[i], vertices[(i + 1) % n]);
            {
                let edge = &mut self.halfedges[he];
                edge.next = ids[(i + 1) % n];
                edge.prev = ids[(i + n - 1) % n];
                edge.face = face;
            }

            match self.edge_map.get(&(b, a)).copied() {
                Some(twin) => {
                    self.halfedges[he].opposite = twin;
                    self.halfedges[twin].opposite = he;
                    self.unpaired.remove(&twin);
                }
                None => {
                    self.unpaired.insert(he);
                }
            }
            self.edge_map.insert((a, b), he);

            let vertex = self.vertices.get_mut(a)?;
            let seated = vertex
                .halfedge
                .is_some_and(|h| self.halfedges.contains_key(h));
            if !seated {
                vertex.halfedge = Some(he);
                self.reseat.remove(&a);
            }
        }

        trace!(face = ?face, sides = n, unpaired = self.unpaired.len(), "stitched face");
        Ok(face)
    }

    /// Close a stitching batch.
    ///
    /// Re-seats the outgoing half-edge of every vertex that lost its seed during
    /// face removal; vertices with no remaining half-edges become isolated.
    ///
    /// # Errors
    ///
    /// [`MeshError::UnpairedEdge`] if any half-edge is still without an opposite.
    /// The surface is not closed and the mesh must be discarded.
    pub fn finish_stitching(&mut self) -> Result<()> {
        if !self.reseat.is_empty() {
            for (id, he) in self.halfedges.iter() {
                if self.reseat.remove(&he.from) {
                    self.vertices.get_mut(he.from)?.halfedge = Some(id);
                }
            }
            if !self.reseat.is_empty() {
                trace!(isolated = self.reseat.len(), "vertices left without faces");
                self.reseat.clear();
            }
        }

        match self.unpaired.first() {
            Some(&he) => {
                let edge = self.halfedge(he)?;
                Err(unpaired(edge.from, edge.to))
            }
            None => Ok(()),
        }
    }

    // ==================== Geometry ====================

    /// Positions of a face's corners in winding order.
    pub fn face_positions(&self, f: FaceId) -> Result<Vec<Point3<f64>>> {
        self.boundary_of(f)?
            .map(|v| v.and_then(|v| self.position(v).copied()))
            .collect()
    }

    /// Area vector of a face (Newell's method); its length is twice the area.
    fn face_area_vector(&self, f: FaceId) -> Result<Vector3<f64>> {
        let positions = self.face_positions(f)?;
        let mut normal = Vector3::zeros();
        for (i, p) in positions.iter().enumerate() {
            let q = positions[(i + 1) % positions.len()];
            normal += p.coords.cross(&q.coords);
        }
        Ok(normal)
    }

    /// Compute the unit outward normal of a face. Zero for a degenerate face.
    pub fn face_normal(&self, f: FaceId) -> Result<Vector3<f64>> {
        let n = self.face_area_vector(f)?;
        Ok(n.try_normalize(f64::MIN_POSITIVE).unwrap_or_else(Vector3::zeros))
    }

    /// The supporting plane of a face, or `None` for a zero-area face.
    pub fn face_plane(&self, f: FaceId) -> Result<Option<Plane>> {
        let Some(normal) = self.face_area_vector(f)?.try_normalize(f64::MIN_POSITIVE) else {
            return Ok(None);
        };
        let centroid = self.face_centroid(f)?;
        Ok(Some(Plane {
            normal,
            offset: normal.dot(&centroid.coords),
        }))
    }

    /// Compute the area of a face.
    pub fn face_area(&self, f: FaceId) -> Result<f64> {
        Ok(0.5 * self.face_area_vector(f)?.norm())
    }

    /// Compute the centroid of a face's corners.
    pub fn face_centroid(&self, f: FaceId) -> Result<Point3<f64>> {
        let positions = self.face_positions(f)?;
        let sum = positions
            .iter()
            .fold(Vector3::zeros(), |acc, p| acc + p.coords);
        Ok(Point3::from(sum / positions.len() as f64))
    }

    /// Compute the total surface area of the mesh.
    pub fn surface_area(&self) -> Result<f64> {
        self.face_ids().map(|f| self.face_area(f)).sum()
    }

    /// Enclosed volume (divergence theorem over fan triangulations).
    ///
    /// Positive for outward-wound closed surfaces.
    pub fn volume(&self) -> Result<f64> {
        let mut six_volume = 0.0;
        for f in self.face_ids() {
            let positions = self.face_positions(f)?;
            let p0 = positions[0].coords;
            for w in positions[1..].windows(2) {
                six_volume += p0.dot(&w[0].coords.cross(&w[1].coords));
            }
        }
        Ok(six_volume / 6.0)
    }

    /// Compute the bounding box of the connected vertices.
    pub fn bounding_box(&self) -> Option<(Point3<f64>, Point3<f64>)> {
        self.vertices.bounding_box()
    }

    /// `V - E + F` over connected vertices. Equals 2 for a closed sphere-like surface.
    pub fn euler_characteristic(&self) -> i64 {
        self.num_connected_vertices() as i64 - self.num_edges() as i64 + self.num_faces() as i64
    }

    // ==================== Validation ====================

    /// Check every connectivity invariant.
    ///
    /// - every half-edge has a live opposite whose opposite is itself, with
    ///   reversed endpoints
    /// - `next.prev` and `prev.next` lead back to the half-edge, and `next`
    ///   starts where the half-edge ends
    /// - every face cycle closes after exactly its fixed side count and covers
    ///   only half-edges that name that face
    /// - every vertex seed half-edge leaves that vertex, and every vertex with a
    ///   half-edge leaving it has a seed
    ///
    /// # Errors
    ///
    /// [`MeshError::UnpairedEdge`] or [`MeshError::CorruptTopology`] describing
    /// the first violation found.
    pub fn validate(&self) -> Result<()> {
        if let Some(&he) = self.unpaired.first() {
            let edge = self.halfedge(he)?;
            return Err(unpaired(edge.from, edge.to));
        }

        for (id, he) in self.halfedges.iter() {
            if !self.vertices.contains(he.from) || !self.vertices.contains(he.to) {
                return Err(dangling(id, "vertex"));
            }
            if self.vertex(he.from)?.is_isolated() {
                return Err(MeshError::corrupt(format!(
                    "{:?} has outgoing {id:?} but no seed half-edge",
                    he.from
                )));
            }

            let Some(opposite) = self.halfedges.get(he.opposite) else {
                return Err(unpaired(he.from, he.to));
            };
            if opposite.opposite != id || opposite.from != he.to || opposite.to != he.from {
                return Err(MeshError::corrupt(format!(
                    "{id:?} and {:?} are not mutual opposites",
                    he.opposite
                )));
            }

            let next = self.halfedges.get(he.next).ok_or_else(|| dangling(id, "next"))?;
            let prev = self.halfedges.get(he.prev).ok_or_else(|| dangling(id, "prev"))?;
            if next.prev != id || prev.next != id {
                return Err(MeshError::corrupt(format!(
                    "{id:?} breaks next/prev symmetry"
                )));
            }
            if next.from != he.to {
                return Err(MeshError::corrupt(format!(
                    "{id:?} ends at {:?} but its next starts at {:?}",
                    he.to, next.from
                )));
            }
            if !self.faces.contains_key(he.face) {
                return Err(dangling(id, "face"));
            }
        }

        let mut covered = 0;
        for (fid, face) in self.faces.iter() {
            let edges = self.face_edges(fid)?;
            if edges.len() != face.sides {
                return Err(MeshError::corrupt(format!(
                    "{fid:?} was created with {} sides but its cycle has {}",
                    face.sides,
                    edges.len()
                )));
            }
            covered += edges.len();
        }
        if covered != self.halfedges.len() {
            return Err(MeshError::corrupt(format!(
                "{} half-edges do not belong to any face cycle",
                self.halfedges.len() - covered
            )));
        }

        for (vid, v) in self.vertices.iter() {
            if let Some(seed) = v.halfedge {
                let he = self.halfedges.get(seed).ok_or_else(|| {
                    MeshError::corrupt(format!("{vid:?} has a dangling seed half-edge"))
                })?;
                if he.from != vid {
                    return Err(MeshError::corrupt(format!(
                        "{vid:?} seed {seed:?} starts at {:?}",
                        he.from
                    )));
                }
            }
        }

        Ok(())
    }

    /// Check if the mesh is valid (all connectivity is consistent).
    pub fn is_valid(&self) -> bool {
        self.validate().is_ok()
    }
}
