use std::collections::HashMap;

use crate::geometry::Triangle;
use crate::math::Point3;

/// Merges corners with bitwise-identical positions.
///
/// Returns the welded vertex table, in first-seen order, and one index
/// triple per triangle. `-0.0` and `0.0` weld together.
#[must_use]
pub fn weld_vertices(triangles: &[Triangle]) -> (Vec<Point3>, Vec<[usize; 3]>) {
    let mut lookup: HashMap<[u64; 3], usize> = HashMap::with_capacity(triangles.len());
    let mut vertices = Vec::with_capacity(triangles.len() / 2 + 3);
    let mut indices = Vec::with_capacity(triangles.len());

    for triangle in triangles {
        let mut triple = [0; 3];
        for (slot, corner) in triple.iter_mut().zip(triangle.corners()) {
            *slot = *lookup.entry(position_key(corner)).or_insert_with(|| {
                vertices.push(*corner);
                vertices.len() - 1
            });
        }
        indices.push(triple);
    }

    (vertices, indices)
}

fn position_key(p: &Point3) -> [u64; 3] {
    // Adding zero maps -0.0 to 0.0.
    [
        (p.x + 0.0).to_bits(),
        (p.y + 0.0).to_bits(),
        (p.z + 0.0).to_bits(),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_meshes::{p, unit_cube};

    #[test]
    fn cube_welds_to_eight_vertices() {
        let (vertices, indices) = weld_vertices(&unit_cube());
        assert_eq!(vertices.len(), 8);
        assert_eq!(indices.len(), 12);
        assert!(indices.iter().flatten().all(|&i| i < 8));
    }

    #[test]
    fn negative_zero_welds_with_zero() {
        let triangles = vec![
            Triangle::from_corners([p(0.0, 0.0, 0.0), p(1.0, 0.0, 0.0), p(0.0, 1.0, 0.0)], 0),
            Triangle::from_corners([p(-0.0, 0.0, -0.0), p(0.0, -1.0, 0.0), p(1.0, 0.0, 0.0)], 0),
        ];
        let (vertices, indices) = weld_vertices(&triangles);
        assert_eq!(vertices.len(), 4);
        assert_eq!(indices[1][0], 0);
        assert_eq!(indices[1][2], 1);
    }

    #[test]
    fn nearby_points_stay_separate() {
        let triangles = vec![
            Triangle::from_corners([p(0.0, 0.0, 0.0), p(1.0, 0.0, 0.0), p(0.0, 1.0, 0.0)], 0),
            Triangle::from_corners([p(1e-12, 0.0, 0.0), p(1.0, 1.0, 0.0), p(0.0, 1.0, 0.0)], 0),
        ];
        let (vertices, _) = weld_vertices(&triangles);
        assert_eq!(vertices.len(), 5);
    }
}
