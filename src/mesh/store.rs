//! Vertex storage.
//!
//! The store owns the positional data referenced by the topology graph. A
//! vertex's position is fixed once it is admitted; the only mutable part of a
//! vertex is its seed outgoing half-edge, which the topology graph keeps
//! pointed at a live half-edge (or clears when the vertex loses all faces).

use nalgebra::Point3;
use slotmap::SlotMap;

use super::index::{HalfEdgeId, MeshHandle, VertexId};
use crate::error::{MeshError, Result};

/// A vertex in the half-edge mesh.
#[derive(Debug, Clone)]
pub struct Vertex {
    position: Point3<f64>,
    pub(crate) halfedge: Option<HalfEdgeId>,
}

impl Vertex {
    fn new(position: Point3<f64>) -> Self {
        Self {
            position,
            halfedge: None,
        }
    }

    /// The 3D position of this vertex.
    #[inline]
    pub fn position(&self) -> &Point3<f64> {
        &self.position
    }

    /// One outgoing half-edge, used as a traversal seed.
    #[inline]
    pub fn halfedge(&self) -> Option<HalfEdgeId> {
        self.halfedge
    }

    /// A vertex with no incident faces.
    ///
    /// Freshly added vertices are isolated until a face is stitched through them;
    /// hull vertices swallowed by a later expansion become isolated again.
    #[inline]
    pub fn is_isolated(&self) -> bool {
        self.halfedge.is_none()
    }
}

/// Arena of vertices addressed by generation-checked [`VertexId`]s.
#[derive(Debug, Clone, Default)]
pub struct VertexStore {
    vertices: SlotMap<VertexId, Vertex>,
}

impl VertexStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store with pre-allocated capacity.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            vertices: SlotMap::with_capacity_and_key(capacity),
        }
    }

    /// Number of stored vertices, isolated ones included.
    #[inline]
    pub fn len(&self) -> usize {
        self.vertices.len()
    }

    /// Whether the store holds no vertices.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.vertices.is_empty()
    }

    /// Number of vertices with at least one incident face.
    pub fn num_connected(&self) -> usize {
        self.vertices.values().filter(|v| !v.is_isolated()).count()
    }

    /// Admit a new position. The vertex starts isolated.
    pub fn insert(&mut self, position: Point3<f64>) -> VertexId {
        self.vertices.insert(Vertex::new(position))
    }

    /// Whether `id` refers to a live vertex.
    #[inline]
    pub fn contains(&self, id: VertexId) -> bool {
        self.vertices.contains_key(id)
    }

    /// Look up a vertex.
    #[inline]
    pub fn get(&self, id: VertexId) -> Result<&Vertex> {
        self.vertices.get(id).ok_or_else(|| id.invalid_handle())
    }

    #[inline]
    pub(crate) fn get_mut(&mut self, id: VertexId) -> Result<&mut Vertex> {
        self.vertices.get_mut(id).ok_or_else(|| id.invalid_handle())
    }

    /// Look up a vertex position.
    #[inline]
    pub fn position(&self, id: VertexId) -> Result<&Point3<f64>> {
        self.get(id).map(Vertex::position)
    }

    /// Iterate over all vertex handles in storage order.
    pub fn ids(&self) -> impl Iterator<Item = VertexId> + '_ {
        self.vertices.keys()
    }

    /// Iterate over all vertices with their handles.
    pub fn iter(&self) -> impl Iterator<Item = (VertexId, &Vertex)> + '_ {
        self.vertices.iter()
    }

    /// Remove a vertex that never became part of the surface.
    ///
    /// Connected vertices cannot be removed; the store never compacts the
    /// surface out from under the topology graph.
    pub(crate) fn remove_isolated(&mut self, id: VertexId) -> Result<Point3<f64>> {
        if !self.get(id)?.is_isolated() {
            return Err(MeshError::InvalidState(format!(
                "{id:?} still has incident faces"
            )));
        }
        self.vertices
            .remove(id)
            .map(|v| v.position)
            .ok_or_else(|| id.invalid_handle())
    }

    /// Axis-aligned bounding box of the connected vertices.
    pub fn bounding_box(&self) -> Option<(Point3<f64>, Point3<f64>)> {
        let mut connected = self.vertices.values().filter(|v| !v.is_isolated());
        let first = connected.next()?.position;
        let mut min = first;
        let mut max = first;

        for v in connected {
            for i in 0..3 {
                min[i] = min[i].min(v.position[i]);
                max[i] = max[i].max(v.position[i]);
            }
        }

        Some((min, max))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_insert_and_lookup() {
        let mut store = VertexStore::new();
        let v = store.insert(Point3::new(1.0, 2.0, 3.0));

        assert_eq!(store.len(), 1);
        assert_eq!(*store.position(v).unwrap(), Point3::new(1.0, 2.0, 3.0));
        assert!(store.get(v).unwrap().is_isolated());
        assert_eq!(store.num_connected(), 0);
    }

    #[test]
    fn test_remove_isolated() {
        let mut store = VertexStore::new();
        let v = store.insert(Point3::origin());
        store.remove_isolated(v).unwrap();

        assert!(store.is_empty());
        assert!(matches!(
            store.get(v),
            Err(MeshError::InvalidHandle { kind: "vertex", .. })
        ));
    }

    #[test]
    fn test_bounding_box_skips_isolated() {
        let store = VertexStore::new();
        assert!(store.bounding_box().is_none());
    }
}
