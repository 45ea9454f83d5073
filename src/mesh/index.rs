//! Handle types for mesh elements.
//!
//! Vertices, half-edges, and faces live in generational arenas and are addressed
//! by type-safe handles. A handle carries the generation of the slot it was
//! issued for, so a handle to a removed element never silently aliases whatever
//! element reuses the slot later; lookups through it fail with
//! [`MeshError::InvalidHandle`].

use slotmap::{new_key_type, Key};

use crate::error::MeshError;

new_key_type! {
    /// A generation-checked vertex handle.
    pub struct VertexId;

    /// A generation-checked half-edge handle.
    pub struct HalfEdgeId;

    /// A generation-checked face handle.
    pub struct FaceId;
}

/// Common behaviour of the three mesh handle types.
pub trait MeshHandle: Key {
    /// Human-readable element kind used in error messages.
    const KIND: &'static str;

    /// Create the null handle, which never refers to a live element.
    #[inline]
    fn invalid() -> Self {
        Self::null()
    }

    /// Check if this is a non-null handle.
    ///
    /// A non-null handle may still be stale; only the owning mesh can tell.
    #[inline]
    fn is_valid(&self) -> bool {
        !self.is_null()
    }

    /// The error reported when this handle does not resolve.
    fn invalid_handle(self) -> MeshError {
        MeshError::InvalidHandle {
            kind: Self::KIND,
            handle: format!("{:?}", self),
        }
    }
}

macro_rules! impl_mesh_handle {
    ($name:ident, $kind:literal) => {
        impl MeshHandle for $name {
            const KIND: &'static str = $kind;
        }
    };
}

impl_mesh_handle!(VertexId, "vertex");
impl_mesh_handle!(HalfEdgeId, "half-edge");
impl_mesh_handle!(FaceId, "face");

#[cfg(test)]
mod tests {
    use slotmap::SlotMap;

    use super::*;

    #[test]
    fn test_default_is_invalid() {
        let v = VertexId::default();
        assert!(!v.is_valid());
        assert_eq!(v, VertexId::invalid());
    }

    #[test]
    fn test_stale_handle_does_not_resolve() {
        let mut arena: SlotMap<FaceId, u8> = SlotMap::with_key();
        let stale = arena.insert(1);
        arena.remove(stale);
        let fresh = arena.insert(2);

        // The slot is reused but the generation differs.
        assert_ne!(stale, fresh);
        assert!(arena.get(stale).is_none());
        assert_eq!(arena.get(fresh), Some(&2));
    }

    #[test]
    fn test_invalid_handle_error() {
        match HalfEdgeId::invalid().invalid_handle() {
            MeshError::InvalidHandle { kind, .. } => assert_eq!(kind, "half-edge"),
            other => panic!("unexpected error {other:?}"),
        }
    }
}
