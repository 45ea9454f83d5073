//! # Hullmesh
//!
//! A half-edge mesh kernel for closed, orientable polygon surfaces, and an
//! incremental 3D convex hull built on top of it.
//!
//! Hullmesh stores surfaces as a half-edge topology graph addressed by
//! generation-checked handles. Surfaces are only ever changed through
//! operations that keep them closed and manifold: a two-face seed, and
//! transactional batches of face removals and stitches.
//!
//! ## Features
//!
//! - **Half-edge data structure**: O(1) adjacency queries with stale-safe handles
//! - **Transactional edits**: removals and stitches validated as one batch
//! - **Bounded traversal**: cursors that report corrupt topology instead of looping
//! - **Convex hull**: incremental construction with tolerance-based visibility
//!
//! ## Quick Start
//!
//! ```
//! use hullmesh::prelude::*;
//! use nalgebra::Point3;
//!
//! let points = vec![
//!     Point3::new(0.0, 0.0, 0.0),
//!     Point3::new(1.0, 0.0, 0.0),
//!     Point3::new(0.0, 1.0, 0.0),
//!     Point3::new(0.0, 0.0, 1.0),
//!     Point3::new(0.2, 0.2, 0.2), // inside
//! ];
//!
//! let hull = convex_hull(&points, &HullOptions::default()).unwrap();
//! assert_eq!(hull.num_vertices(), 4);
//! assert_eq!(hull.num_faces(), 4);
//! assert_eq!(hull.num_edges(), 6);
//!
//! // Flatten for rendering
//! let (positions, triangles) = hull.to_face_vertex().unwrap();
//! assert_eq!(positions.len(), 4);
//! assert_eq!(triangles.len(), 4);
//! ```
//!
//! ## Mesh Traversal
//!
//! ```
//! use hullmesh::prelude::*;
//! use nalgebra::Point3;
//!
//! # let vertices = vec![
//! #     Point3::new(0.0, 0.0, 0.0),
//! #     Point3::new(1.0, 0.0, 0.0),
//! #     Point3::new(0.5, 1.0, 0.0),
//! #     Point3::new(0.5, 0.5, 1.0),
//! # ];
//! # let faces = vec![[0, 2, 1], [0, 1, 3], [1, 2, 3], [2, 0, 3]];
//! let mesh = build_from_triangles(&vertices, &faces).unwrap();
//!
//! // Iterate over neighbors of a vertex
//! let v = mesh.vertex_ids().next().unwrap();
//! for neighbor in mesh.neighbors_of(v).unwrap() {
//!     println!("Neighbor: {:?}", neighbor.unwrap());
//! }
//!
//! // Faces around a vertex
//! assert_eq!(mesh.faces_around(v).unwrap().len(), 3);
//!
//! // Vertices of a face, in winding order
//! let f = mesh.face_ids().next().unwrap();
//! let corners: Vec<VertexId> = mesh.boundary_of(f).unwrap().collect::<Result<_>>().unwrap();
//! assert_eq!(corners.len(), 3);
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod algo;
pub mod error;
pub mod mesh;

/// Prelude module for convenient imports.
///
/// This module re-exports the most commonly used types and functions:
///
/// ```
/// use hullmesh::prelude::*;
/// ```
pub mod prelude {
    pub use crate::algo::hull::{convex_hull, ConvexHull, HullOptions, IncrementalHull};
    pub use crate::error::{MeshError, Result};
    pub use crate::mesh::{
        build_from_polygons, build_from_triangles, to_face_vertex, to_face_vertex_triangles,
        Face, FaceId, HalfEdge, HalfEdgeId, HalfEdgeMesh, MeshHandle, TopologyEdit, Vertex,
        VertexId,
    };
}

// Re-export nalgebra types for convenience
pub use nalgebra;

#[cfg(test)]
mod tests {
    use super::prelude::*;
    use nalgebra::Point3;

    #[test]
    fn test_tetrahedron() {
        let vertices = vec![
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(1.0, 0.0, 0.0),
            Point3::new(0.5, 1.0, 0.0),
            Point3::new(0.5, 0.5, 1.0),
        ];

        let faces = vec![
            [0, 2, 1], // bottom
            [0, 1, 3], // front
            [1, 2, 3], // right
            [2, 0, 3], // left
        ];

        let mesh = build_from_triangles(&vertices, &faces).unwrap();
        assert_eq!(mesh.num_vertices(), 4);
        assert_eq!(mesh.num_faces(), 4);
        assert_eq!(mesh.num_halfedges(), 12);
        assert!(mesh.is_valid());

        // Every vertex of a closed tetrahedron has three neighbors
        for v in mesh.vertex_ids() {
            assert_eq!(mesh.valence(v).unwrap(), 3);
        }

        // The hull of a tetrahedron's corners is the same surface
        let hull = convex_hull(&vertices, &HullOptions::default()).unwrap();
        assert_eq!(hull.num_faces(), 4);
        assert!((hull.volume().unwrap() - mesh.volume().unwrap()).abs() < 1e-12);
    }
}
