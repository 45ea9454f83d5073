//! Mesh construction and flattening.
//!
//! This module builds closed half-edge meshes from face-vertex lists and
//! flattens a mesh back into the plain vertex/index form consumed by renderers
//! and scene resources, which never see half-edge structure.

use std::collections::HashMap;

use nalgebra::Point3;

use super::edit::TopologyEdit;
use super::halfedge::HalfEdgeMesh;
use super::index::VertexId;
use crate::error::{MeshError, Result};

/// Build a closed half-edge mesh from vertices and polygon faces.
///
/// Each face lists vertex indices in outward winding order. All faces are
/// stitched as one [`TopologyEdit`], so every edge must be shared by exactly
/// two faces with opposite directions.
///
/// # Errors
///
/// - [`MeshError::EmptyMesh`] if `faces` is empty
/// - [`MeshError::InvalidVertexIndex`] for an out-of-range index
/// - [`MeshError::DegenerateFace`] for a face with fewer than 3 or repeated indices
/// - [`MeshError::NonManifoldEdge`] if a directed edge is used twice
/// - [`MeshError::UnpairedEdge`] if the surface is open
pub fn build_from_polygons<F: AsRef<[usize]>>(
    vertices: &[Point3<f64>],
    faces: &[F],
) -> Result<HalfEdgeMesh> {
    if faces.is_empty() {
        return Err(MeshError::EmptyMesh);
    }

    // Validate vertex indices
    for (fi, face) in faces.iter().enumerate() {
        let face = face.as_ref();
        for &vi in face {
            if vi >= vertices.len() {
                return Err(MeshError::InvalidVertexIndex { face: fi, vertex: vi });
            }
        }
        let repeats = face.iter().enumerate().any(|(i, v)| face[..i].contains(v));
        if face.len() < 3 || repeats {
            return Err(MeshError::DegenerateFace { face: fi });
        }
    }

    let mut mesh = HalfEdgeMesh::with_capacity(vertices.len(), faces.len());

    let vertex_ids: Vec<VertexId> = vertices.iter().map(|&pos| mesh.add_vertex(pos)).collect();

    let mut edit = TopologyEdit::new();
    for face in faces {
        edit.stitch_face(face.as_ref().iter().map(|&vi| vertex_ids[vi]));
    }
    edit.commit(&mut mesh)?;

    Ok(mesh)
}

/// Build a closed half-edge mesh from vertices and triangle faces.
///
/// # Example
/// ```
/// use hullmesh::mesh::build_from_triangles;
/// use nalgebra::Point3;
///
/// let vertices = vec![
///     Point3::new(0.0, 0.0, 0.0),
///     Point3::new(1.0, 0.0, 0.0),
///     Point3::new(0.0, 1.0, 0.0),
///     Point3::new(0.0, 0.0, 1.0),
/// ];
/// let faces = vec![[0, 2, 1], [0, 1, 3], [1, 2, 3], [2, 0, 3]];
///
/// let mesh = build_from_triangles(&vertices, &faces).unwrap();
/// assert_eq!(mesh.num_vertices(), 4);
/// assert_eq!(mesh.num_faces(), 4);
/// ```
pub fn build_from_triangles(
    vertices: &[Point3<f64>],
    faces: &[[usize; 3]],
) -> Result<HalfEdgeMesh> {
    build_from_polygons(vertices, faces)
}

/// Compact index of every connected vertex, in storage order.
fn connected_indices(mesh: &HalfEdgeMesh) -> (Vec<Point3<f64>>, HashMap<VertexId, usize>) {
    let mut positions = Vec::with_capacity(mesh.num_connected_vertices());
    let mut index = HashMap::with_capacity(mesh.num_connected_vertices());
    for (id, v) in mesh.vertices().iter().filter(|(_, v)| !v.is_isolated()) {
        index.insert(id, positions.len());
        positions.push(*v.position());
    }
    (positions, index)
}

/// Convert a half-edge mesh to a face-vertex representation.
///
/// Isolated vertices are dropped and the remaining ones renumbered densely;
/// faces keep their outward winding. Returns `(vertices, faces)`.
pub fn to_face_vertex(mesh: &HalfEdgeMesh) -> Result<(Vec<Point3<f64>>, Vec<Vec<usize>>)> {
    let (positions, index) = connected_indices(mesh);

    let faces = mesh
        .face_ids()
        .map(|f| {
            mesh.boundary_of(f)?
                .map(|v| {
                    let v = v?;
                    index
                        .get(&v)
                        .copied()
                        .ok_or_else(|| MeshError::corrupt(format!("{f:?} uses isolated {v:?}")))
                })
                .collect()
        })
        .collect::<Result<Vec<_>>>()?;

    Ok((positions, faces))
}

/// Convert an all-triangle half-edge mesh to vertex positions and index triples.
///
/// # Errors
///
/// [`MeshError::InvalidState`] if any face is not a triangle.
pub fn to_face_vertex_triangles(
    mesh: &HalfEdgeMesh,
) -> Result<(Vec<Point3<f64>>, Vec<[usize; 3]>)> {
    let (positions, faces) = to_face_vertex(mesh)?;
    let triangles = faces
        .into_iter()
        .map(|face| match face[..] {
            [a, b, c] => Ok([a, b, c]),
            _ => Err(MeshError::InvalidState(format!(
                "expected triangles, found a face with {} sides",
                face.len()
            ))),
        })
        .collect::<Result<Vec<_>>>()?;
    Ok((positions, triangles))
}
