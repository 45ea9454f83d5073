//! Visible region and horizon extraction.
//!
//! From the viewpoint of a new point, the faces whose plane it lies in front
//! of (beyond the tolerance) are *visible*. Starting at the most visible face,
//! the visible region is grown across shared edges; its boundary, the
//! *horizon*, is the loop of half-edges where a visible face meets a face that
//! stays. The new point is joined to every horizon edge.

use std::collections::{HashMap, HashSet};

use nalgebra::Point3;

use crate::error::{MeshError, Result};
use crate::mesh::{FaceId, HalfEdgeMesh, VertexId};

/// One horizon edge, directed as on the visible face it bounds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HorizonEdge {
    /// Origin vertex.
    pub from: VertexId,
    /// Target vertex.
    pub to: VertexId,
}

/// The visible faces and the ordered horizon loop around them.
#[derive(Debug, Clone)]
pub struct Horizon {
    /// Faces to remove, in discovery order.
    pub visible: Vec<FaceId>,
    /// Horizon edges forming one closed loop; `edges[i].to == edges[i + 1].from`.
    pub edges: Vec<HorizonEdge>,
}

/// Find the region of `mesh` visible from `point`.
///
/// Returns `Ok(None)` when no face is visible, i.e. the point lies inside or on
/// the surface within `tolerance`.
///
/// # Errors
///
/// [`MeshError::NonManifold`] if the boundary of the visible region is not a
/// single simple loop; topology errors from the mesh are passed through.
pub fn find_horizon(
    mesh: &HalfEdgeMesh,
    point: &Point3<f64>,
    tolerance: f64,
) -> Result<Option<Horizon>> {
    let mut distance: HashMap<FaceId, f64> = HashMap::with_capacity(mesh.num_faces());
    let mut best: Option<(FaceId, f64)> = None;

    for f in mesh.face_ids() {
        let d = match mesh.face_plane(f)? {
            Some(plane) => plane.signed_distance(point),
            None => f64::NEG_INFINITY,
        };
        distance.insert(f, d);
        if best.map_or(true, |(_, bd)| d > bd) {
            best = Some((f, d));
        }
    }

    let Some((start, d)) = best else {
        return Ok(None);
    };
    if d <= tolerance {
        return Ok(None);
    }

    let is_visible = |f: FaceId| distance.get(&f).is_some_and(|&d| d > tolerance);

    // Grow the visible region from the most visible face.
    let mut visible = vec![start];
    let mut seen: HashSet<FaceId> = HashSet::from([start]);
    let mut stack = vec![start];
    while let Some(f) = stack.pop() {
        for he in mesh.face_loop(f)? {
            let neighbor = mesh.face_of(mesh.opposite(he?)?)?;
            if is_visible(neighbor) && seen.insert(neighbor) {
                visible.push(neighbor);
                stack.push(neighbor);
            }
        }
    }

    let mut edges = Vec::new();
    for &f in &visible {
        for he in mesh.face_loop(f)? {
            let he = he?;
            let neighbor = mesh.face_of(mesh.opposite(he)?)?;
            if !seen.contains(&neighbor) {
                let edge = mesh.halfedge(he)?;
                edges.push(HorizonEdge {
                    from: edge.from(),
                    to: edge.to(),
                });
            }
        }
    }

    Ok(Some(Horizon {
        visible,
        edges: chain_loop(edges)?,
    }))
}

/// Order horizon edges head to tail, checking they form exactly one simple loop.
fn chain_loop(edges: Vec<HorizonEdge>) -> Result<Vec<HorizonEdge>> {
    let Some(&first) = edges.first() else {
        return Err(MeshError::NonManifold {
            details: "visible region has an empty horizon".to_string(),
        });
    };

    let mut by_origin: HashMap<VertexId, HorizonEdge> = HashMap::with_capacity(edges.len());
    for &edge in &edges {
        if by_origin.insert(edge.from, edge).is_some() {
            return Err(MeshError::NonManifold {
                details: format!("horizon passes through {:?} more than once", edge.from),
            });
        }
    }

    let mut ordered = Vec::with_capacity(edges.len());
    let mut current = first;
    loop {
        ordered.push(current);
        if current.to == first.from {
            break;
        }
        current = *by_origin.get(&current.to).ok_or_else(|| MeshError::NonManifold {
            details: format!("horizon does not close at {:?}", current.to),
        })?;
        if ordered.len() > edges.len() {
            break;
        }
    }

    if ordered.len() != edges.len() {
        return Err(MeshError::NonManifold {
            details: format!(
                "horizon splits into several loops ({} of {} edges reachable)",
                ordered.len(),
                edges.len()
            ),
        });
    }
    Ok(ordered)
}

#[cfg(test)]
mod tests {
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
    fn test_interior_point_sees_nothing() {
        let mesh = tetrahedron();
        let horizon = find_horizon(&mesh, &Point3::new(0.1, 0.1, 0.1), 1e-9).unwrap();
        assert!(horizon.is_none());
    }

    #[test]
    fn test_point_on_face_sees_nothing() {
        let mesh = tetrahedron();
        let horizon = find_horizon(&mesh, &Point3::new(0.2, 0.2, 0.0), 1e-9).unwrap();
        assert!(horizon.is_none());
    }

    #[test]
    fn test_single_visible_face() {
        let mesh = tetrahedron();
        let horizon = find_horizon(&mesh, &Point3::new(0.2, 0.2, -1.0), 1e-9)
            .unwrap()
            .unwrap();
        assert_eq!(horizon.visible.len(), 1);
        assert_eq!(horizon.edges.len(), 3);
    }

    #[test]
    fn test_horizon_is_a_closed_loop() {
        let mesh = tetrahedron();
        // Beyond the corner at the origin: three faces visible.
        let horizon = find_horizon(&mesh, &Point3::new(-1.0, -1.0, -1.0), 1e-9)
            .unwrap()
            .unwrap();
        assert_eq!(horizon.visible.len(), 3);
        assert_eq!(horizon.edges.len(), 3);
        for (i, edge) in horizon.edges.iter().enumerate() {
            let next = horizon.edges[(i + 1) % horizon.edges.len()];
            assert_eq!(edge.to, next.from);
        }
    }

    #[test]
    fn test_split_loop_is_rejected() {
        let mut store = crate::mesh::VertexStore::new();
        let v: Vec<VertexId> = (0..6)
            .map(|i| store.insert(Point3::new(i as f64, 0.0, 0.0)))
            .collect();
        let edge = |a: usize, b: usize| HorizonEdge { from: v[a], to: v[b] };

        let two_loops = vec![edge(0, 1), edge(1, 2), edge(2, 0), edge(3, 4), edge(4, 5), edge(5, 3)];
        assert!(matches!(
            chain_loop(two_loops),
            Err(MeshError::NonManifold { .. })
        ));

        let pinched = vec![edge(0, 1), edge(1, 2), edge(0, 3)];
        assert!(matches!(chain_loop(pinched), Err(MeshError::NonManifold { .. })));
    }
}
