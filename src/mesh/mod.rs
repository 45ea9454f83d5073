//! Core mesh data structures.
//!
//! This module provides the half-edge topology graph for closed, orientable,
//! manifold polygon surfaces, together with its vertex store, transactional
//! edits, and adjacency cursors.
//!
//! # Overview
//!
//! The primary type is [`HalfEdgeMesh`]. Its mutation primitives are
//! [`HalfEdgeMesh::create_seed`], [`HalfEdgeMesh::remove_face`] and
//! [`HalfEdgeMesh::stitch_face`]; [`TopologyEdit`] bundles removals and
//! stitches into an all-or-nothing batch.
//!
//! # Handles
//!
//! Mesh elements are identified by generation-checked handles:
//! - [`VertexId`] - Identifies a vertex
//! - [`HalfEdgeId`] - Identifies a half-edge
//! - [`FaceId`] - Identifies a face
//!
//! A handle to a removed element never resolves again, so stale references are
//! reported as [`MeshError::InvalidHandle`](crate::error::MeshError::InvalidHandle).
//!
//! # Construction
//!
//! ```
//! use hullmesh::mesh::{build_from_triangles, to_face_vertex_triangles};
//! use nalgebra::Point3;
//!
//! let vertices = vec![
//!     Point3::new(0.0, 0.0, 0.0),
//!     Point3::new(1.0, 0.0, 0.0),
//!     Point3::new(0.0, 1.0, 0.0),
//!     Point3::new(0.0, 0.0, 1.0),
//! ];
//! let faces = vec![[0, 2, 1], [0, 1, 3], [1, 2, 3], [2, 0, 3]];
//!
//! let mesh = build_from_triangles(&vertices, &faces).unwrap();
//! let (positions, indices) = to_face_vertex_triangles(&mesh).unwrap();
//! assert_eq!(positions.len(), 4);
//! assert_eq!(indices, faces);
//! ```

mod adjacency;
mod builder;
mod edit;
mod halfedge;
mod index;
mod store;

pub use adjacency::{FaceBoundary, FaceLoop, OutgoingEdges, VertexNeighbors};
pub use builder::{
    build_from_polygons, build_from_triangles, to_face_vertex, to_face_vertex_triangles,
};
pub use edit::TopologyEdit;
pub use halfedge::{Face, HalfEdge, HalfEdgeMesh, Plane};
pub use index::{FaceId, HalfEdgeId, MeshHandle, VertexId};
pub use store::{Vertex, VertexStore};
