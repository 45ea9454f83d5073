//! Error types for hullmesh.
//!
//! Every fault the kernel can detect is reported through [`MeshError`]. Nothing
//! is auto-corrected: invariant violations propagate to the caller, which decides
//! whether the mesh instance is still usable (see [`MeshError::is_fatal`]).

use thiserror::Error;

use crate::mesh::{HalfEdgeId, VertexId};

/// Result type alias using [`MeshError`].
pub type Result<T> = std::result::Result<T, MeshError>;

/// Errors that can occur during mesh construction, mutation, and hull building.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum MeshError {
    /// Input points are collinear, coincident, coplanar where volume is required,
    /// or otherwise unable to span the requested primitive.
    #[error("degenerate geometry: {details}")]
    DegenerateGeometry {
        /// Description of the degeneracy.
        details: String,
    },

    /// Too few distinct points were supplied.
    #[error("insufficient points: found {found} distinct, need at least {required}")]
    InsufficientPoints {
        /// Number of distinct points found.
        found: usize,
        /// Minimum number of distinct points required.
        required: usize,
    },

    /// A handle refers to a removed or never-existing entity.
    #[error("invalid {kind} handle {handle}")]
    InvalidHandle {
        /// Entity kind ("vertex", "half-edge", or "face").
        kind: &'static str,
        /// Debug rendering of the stale handle.
        handle: String,
    },

    /// A half-edge would end up with two distinct opposites, or a directed edge
    /// would be duplicated.
    #[error("non-manifold edge {from:?} -> {to:?}")]
    NonManifoldEdge {
        /// Origin vertex of the offending directed edge.
        from: VertexId,
        /// Target vertex of the offending directed edge.
        to: VertexId,
    },

    /// A half-edge was left without an opposite after a stitching batch.
    #[error("unpaired edge {from:?} -> {to:?}: surface is not closed")]
    UnpairedEdge {
        /// Origin vertex of the unpaired half-edge.
        from: VertexId,
        /// Target vertex of the unpaired half-edge.
        to: VertexId,
    },

    /// A traversal or validation pass found broken connectivity.
    #[error("corrupt topology: {details}")]
    CorruptTopology {
        /// Description of the broken invariant.
        details: String,
    },

    /// The faces visible from a new hull point are not bounded by a single
    /// simple horizon loop.
    #[error("mesh has non-manifold topology: {details}")]
    NonManifold {
        /// How the horizon fails to form one loop.
        details: String,
    },

    /// The mesh has no faces.
    #[error("mesh has no faces")]
    EmptyMesh,

    /// A face references an invalid vertex index.
    #[error("face {face} references invalid vertex index {vertex}")]
    InvalidVertexIndex {
        /// The face index.
        face: usize,
        /// The invalid vertex index.
        vertex: usize,
    },

    /// A face has fewer than three corners or repeats a vertex.
    #[error("face {face} is degenerate (fewer than 3 vertices or duplicate vertices)")]
    DegenerateFace {
        /// The face index.
        face: usize,
    },

    /// Invalid mesh state for the requested operation.
    #[error("invalid mesh state: {0}")]
    InvalidState(String),

    /// Invalid parameter value.
    #[error("invalid parameter: {name} = {value} ({reason})")]
    InvalidParameter {
        /// Parameter name.
        name: &'static str,
        /// The invalid value (as string).
        value: String,
        /// Reason the value is invalid.
        reason: &'static str,
    },
}

impl MeshError {
    /// Create an invalid parameter error.
    pub fn invalid_param<T: std::fmt::Display>(
        name: &'static str,
        value: T,
        reason: &'static str,
    ) -> Self {
        MeshError::InvalidParameter {
            name,
            value: value.to_string(),
            reason,
        }
    }

    /// Create a degenerate geometry error.
    pub fn degenerate(details: impl Into<String>) -> Self {
        MeshError::DegenerateGeometry {
            details: details.into(),
        }
    }

    /// Create a corrupt topology error.
    pub fn corrupt(details: impl Into<String>) -> Self {
        MeshError::CorruptTopology {
            details: details.into(),
        }
    }

    /// Whether this error can signal a mesh that must be discarded.
    ///
    /// Only [`MeshError::UnpairedEdge`] and [`MeshError::CorruptTopology`]
    /// describe broken connectivity. A stale handle is a caller bug and leaves
    /// the mesh untouched. An edit rejected by
    /// [`TopologyEdit::validate`](crate::mesh::TopologyEdit::validate) never
    /// modifies the mesh either, whatever the error kind; check
    /// [`HalfEdgeMesh::is_valid`](crate::mesh::HalfEdgeMesh::is_valid) when in doubt.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            MeshError::UnpairedEdge { .. } | MeshError::CorruptTopology { .. }
        )
    }
}

/// Build an [`MeshError::UnpairedEdge`] from a half-edge's endpoints.
pub(crate) fn unpaired(from: VertexId, to: VertexId) -> MeshError {
    MeshError::UnpairedEdge { from, to }
}

/// Build a [`MeshError::CorruptTopology`] describing a dangling link.
pub(crate) fn dangling(he: HalfEdgeId, link: &str) -> MeshError {
    MeshError::corrupt(format!("{he:?} has a dangling {link} link"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fatal_classification() {
        assert!(MeshError::corrupt("cycle").is_fatal());
        assert!(!MeshError::InvalidHandle {
            kind: "face",
            handle: "FaceId(1v1)".to_string()
        }
        .is_fatal());
        assert!(!MeshError::degenerate("collinear").is_fatal());
        assert!(!MeshError::InsufficientPoints {
            found: 2,
            required: 3
        }
        .is_fatal());
    }

    #[test]
    fn test_display() {
        let err = MeshError::invalid_param("tolerance", -1.0, "must be non-negative");
        assert_eq!(
            err.to_string(),
            "invalid parameter: tolerance = -1 (must be non-negative)"
        );
    }
}
