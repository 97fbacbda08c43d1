use tracing::debug;

use crate::geometry::{Aabb, Ray, Triangle};
use crate::math::intersect_3d::ray_triangle_intersect;
use crate::math::{Point3, TOLERANCE};

/// Maximum number of triangles stored in one leaf.
const LEAF_SIZE: usize = 4;

/// Padding added to node boxes so flat boxes still catch grazing rays,
/// relative to the diagonal of the soup.
const NODE_PADDING: f64 = 1e-9;

/// Hits closer than this along the ray are ignored, relative to the diagonal
/// of the soup.
const HIT_EPSILON: f64 = 1e-9;

/// A ray hit against the indexed soup.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RayHit {
    /// Id of the triangle that was hit.
    pub triangle: usize,
    /// Ray parameter of the hit; the distance when the direction is unit length.
    pub distance: f64,
}

#[derive(Debug, Clone)]
enum BvhNode {
    Leaf { aabb: Aabb, start: usize, end: usize },
    Internal { aabb: Aabb, left: usize, right: usize },
}

impl BvhNode {
    const fn aabb(&self) -> &Aabb {
        match self {
            Self::Leaf { aabb, .. } | Self::Internal { aabb, .. } => aabb,
        }
    }
}

/// Bounding volume hierarchy over the triangle soup, used for pick rays and
/// SDF ray casting.
///
/// Nodes live in a flat arena; a build owns its own copy of the triangle
/// corners, so it never observes later edits to the store. Geometry changes
/// require a full rebuild.
#[derive(Debug, Clone, Default)]
pub struct SpatialIndex {
    nodes: Vec<BvhNode>,
    order: Vec<usize>,
    corners: Vec<[Point3; 3]>,
    bounds: Option<Aabb>,
    scale: f64,
}

impl SpatialIndex {
    /// Builds the hierarchy over `triangles`; ids are positions in the slice.
    #[must_use]
    pub fn build(triangles: &[Triangle]) -> Self {
        if triangles.is_empty() {
            return Self::default();
        }

        let corners: Vec<[Point3; 3]> = triangles.iter().map(|t| *t.corners()).collect();
        let boxes: Vec<Aabb> = triangles.iter().map(Aabb::from_triangle).collect();
        let centroids: Vec<Point3> = triangles.iter().map(Triangle::centroid).collect();
        let bounds = boxes.iter().skip(1).fold(boxes[0], |acc, b| acc.union(b));
        let scale = bounds.diagonal();

        let mut order: Vec<usize> = (0..triangles.len()).collect();
        let mut nodes = Vec::with_capacity(2 * triangles.len() / LEAF_SIZE + 1);
        let soup = Soup {
            boxes: &boxes,
            centroids: &centroids,
            padding: NODE_PADDING * scale,
        };
        build_node(&mut nodes, &mut order, 0, &soup);

        debug!(
            triangles = triangles.len(),
            nodes = nodes.len(),
            "built spatial index"
        );

        Self {
            nodes,
            order,
            corners,
            bounds: Some(bounds),
            scale,
        }
    }

    /// Returns `true` if no triangle is indexed.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Number of indexed triangles.
    #[must_use]
    pub fn len(&self) -> usize {
        self.corners.len()
    }

    /// Bounding box of the soup at the last build, or `None` when empty.
    #[must_use]
    pub fn bounding_box(&self) -> Option<Aabb> {
        self.bounds
    }

    /// Minimum bounding-box corner, or the origin when empty.
    #[must_use]
    pub fn bounding_box_min(&self) -> Point3 {
        self.bounds.map_or_else(Point3::origin, |b| b.min)
    }

    /// Maximum bounding-box corner, or the origin when empty.
    #[must_use]
    pub fn bounding_box_max(&self) -> Point3 {
        self.bounds.map_or_else(Point3::origin, |b| b.max)
    }

    /// Returns the id of the triangle hit first along the ray, if any.
    ///
    /// Among hits at exactly the same distance, the one reached first in
    /// traversal order wins.
    #[must_use]
    pub fn intersect_ray(&self, ray: &Ray) -> Option<usize> {
        self.closest_hit(ray, &|_| true).map(|hit| hit.triangle)
    }

    /// Returns the nearest hit among triangles accepted by `filter`.
    #[must_use]
    pub fn closest_hit(&self, ray: &Ray, filter: &dyn Fn(usize) -> bool) -> Option<RayHit> {
        let length = ray.direction.norm();
        if self.nodes.is_empty() || !length.is_normal() {
            return None;
        }

        let dir_inv = ray.inverse_direction(TOLERANCE * length);
        let min_t = HIT_EPSILON * self.scale / length;
        let mut best: Option<RayHit> = None;
        let mut stack = vec![0_usize];

        while let Some(index) = stack.pop() {
            let node = &self.nodes[index];
            let Some((t_near, _)) = node.aabb().ray_intersect(&ray.origin, &dir_inv) else {
                continue;
            };
            if best.is_some_and(|b| t_near > b.distance) {
                continue;
            }

            match *node {
                BvhNode::Leaf { start, end, .. } => {
                    for &triangle in &self.order[start..end] {
                        if !filter(triangle) {
                            continue;
                        }
                        let Some(t) = ray_triangle_intersect(
                            &ray.origin,
                            &ray.direction,
                            &self.corners[triangle],
                            min_t,
                        ) else {
                            continue;
                        };
                        if best.map_or(true, |b| t < b.distance) {
                            best = Some(RayHit {
                                triangle,
                                distance: t,
                            });
                        }
                    }
                }
                BvhNode::Internal { left, right, .. } => {
                    // Left is popped first.
                    stack.push(right);
                    stack.push(left);
                }
            }
        }

        best
    }
}

/// Per-triangle inputs of a build.
struct Soup<'a> {
    boxes: &'a [Aabb],
    centroids: &'a [Point3],
    padding: f64,
}

/// Builds the subtree over `order` and returns its node index.
///
/// `offset` is the position of `order[0]` in the full permutation.
fn build_node(
    nodes: &mut Vec<BvhNode>,
    order: &mut [usize],
    offset: usize,
    soup: &Soup<'_>,
) -> usize {
    let Soup {
        boxes,
        centroids,
        padding,
    } = *soup;
    let aabb = order
        .iter()
        .skip(1)
        .fold(boxes[order[0]], |acc, &i| acc.union(&boxes[i]))
        .expand(padding);

    let index = nodes.len();
    if order.len() <= LEAF_SIZE {
        nodes.push(BvhNode::Leaf {
            aabb,
            start: offset,
            end: offset + order.len(),
        });
        return index;
    }

    // Split along the longest axis of the centroid spread.
    let (lo, hi) = order.iter().fold(
        (centroids[order[0]], centroids[order[0]]),
        |(lo, hi), &i| {
            (
                Point3::from(lo.coords.inf(&centroids[i].coords)),
                Point3::from(hi.coords.sup(&centroids[i].coords)),
            )
        },
    );
    let axis = (hi - lo).imax();

    // Ties keep id order so the build is reproducible.
    order.sort_by(|&a, &b| {
        centroids[a][axis]
            .total_cmp(&centroids[b][axis])
            .then(a.cmp(&b))
    });

    // Reserve this slot; children are appended after it.
    nodes.push(BvhNode::Leaf {
        aabb,
        start: offset,
        end: offset,
    });

    let mid = order.len() / 2;
    let (left_order, right_order) = order.split_at_mut(mid);
    let left = build_node(nodes, left_order, offset, soup);
    let right = build_node(nodes, right_order, offset + mid, soup);
    nodes[index] = BvhNode::Internal { aabb, left, right };
    index
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::math::Vector3;
    use crate::test_meshes::{cuboid, p, scaled, unit_cube};

    fn brute_force(triangles: &[Triangle], ray: &Ray) -> Option<f64> {
        triangles
            .iter()
            .filter_map(|t| {
                ray_triangle_intersect(&ray.origin, &ray.direction, t.corners(), HIT_EPSILON)
            })
            .min_by(f64::total_cmp)
    }

    #[test]
    fn ray_through_face_returns_that_face() {
        let triangles = unit_cube();
        let index = SpatialIndex::build(&triangles);

        for (id, t) in triangles.iter().enumerate() {
            let target = t.centroid();
            let origin = target + t.normal() * 3.0;
            let ray = Ray::through(origin, target);
            assert_eq!(index.intersect_ray(&ray), Some(id), "face {id}");
        }
    }

    #[test]
    fn micro_scale_cube_is_hit_through_every_face() {
        for scale in [1e-6, 1e-9] {
            let triangles = scaled(&unit_cube(), scale);
            let index = SpatialIndex::build(&triangles);

            let down = Ray::new(
                p(0.25 * scale, 0.75 * scale, 3.0 * scale),
                Vector3::new(0.0, 0.0, -1.0),
            );
            let hit = index.closest_hit(&down, &|_| true).unwrap();
            assert!(hit.triangle == 2 || hit.triangle == 3, "scale {scale}");
            assert!((hit.distance - 2.0 * scale).abs() < 1e-6 * scale);

            for (id, t) in triangles.iter().enumerate() {
                let target = t.centroid();
                let ray = Ray::through(target + t.normal() * 3.0 * scale, target);
                assert_eq!(index.intersect_ray(&ray), Some(id), "face {id} at {scale}");
            }
        }
    }

    #[test]
    fn ray_away_from_box_misses() {
        let index = SpatialIndex::build(&unit_cube());
        let ray = Ray::new(p(0.5, 0.5, 3.0), Vector3::new(0.0, 0.0, 1.0));
        assert_eq!(index.intersect_ray(&ray), None);

        let beside = Ray::new(p(5.0, 5.0, 5.0), Vector3::new(1.0, 0.0, 0.0));
        assert_eq!(index.intersect_ray(&beside), None);
    }

    #[test]
    fn empty_index_reports_nothing() {
        let index = SpatialIndex::build(&[]);
        assert!(index.is_empty());
        assert!(index.bounding_box().is_none());
        assert_eq!(index.bounding_box_min(), Point3::origin());
        assert_eq!(index.bounding_box_max(), Point3::origin());
        let ray = Ray::new(p(0.0, 0.0, -1.0), Vector3::new(0.0, 0.0, 1.0));
        assert_eq!(index.intersect_ray(&ray), None);
    }

    #[test]
    fn bounding_box_matches_soup() {
        let index = SpatialIndex::build(&cuboid(p(-1.0, 2.0, 3.0), p(4.0, 5.0, 6.0), 0));
        assert_eq!(index.bounding_box_min(), p(-1.0, 2.0, 3.0));
        assert_eq!(index.bounding_box_max(), p(4.0, 5.0, 6.0));
    }

    #[test]
    fn nearest_of_many_matches_brute_force() {
        let mut triangles = Vec::new();
        for i in 0..6 {
            for j in 0..6 {
                let x = f64::from(i) * 2.0;
                let y = f64::from(j) * 2.0;
                let z = f64::from((i * 7 + j * 3) % 5);
                triangles.extend(cuboid(p(x, y, z), p(x + 1.0, y + 1.0, z + 1.5), 0));
            }
        }
        let index = SpatialIndex::build(&triangles);
        assert_eq!(index.len(), triangles.len());

        for k in 0..40 {
            let k = f64::from(k);
            let origin = p(-3.0 + k * 0.1, -2.0 + k * 0.05, 9.0);
            let dir = Vector3::new(0.3 + k * 0.01, 0.25, -0.6);
            let ray = Ray::new(origin, dir);
            let expected = brute_force(&triangles, &ray);
            let hit = index.closest_hit(&ray, &|_| true).map(|h| h.distance);
            match (expected, hit) {
                (Some(a), Some(b)) => assert!((a - b).abs() < 1e-9),
                (None, None) => {}
                other => panic!("mismatch for ray {k}: {other:?}"),
            }
        }
    }

    #[test]
    fn filter_skips_rejected_triangles() {
        let triangles = unit_cube();
        let index = SpatialIndex::build(&triangles);
        // Straight down through the top face pair, then the bottom pair.
        let ray = Ray::new(p(0.25, 0.75, 3.0), Vector3::new(0.0, 0.0, -1.0));
        let first = index.closest_hit(&ray, &|_| true).unwrap();
        assert!(first.triangle == 2 || first.triangle == 3);
        assert!((first.distance - 2.0).abs() < 1e-12);

        let through = index
            .closest_hit(&ray, &|id| id != 2 && id != 3)
            .unwrap();
        assert!(through.triangle < 2);
        assert!((through.distance - 3.0).abs() < 1e-12);
    }

    #[test]
    fn coincident_triangles_resolve_deterministically() {
        let mut triangles = unit_cube();
        triangles.push(triangles[2].clone());
        let ray = Ray::through(p(0.75, 0.25, 3.0), triangles[2].centroid());

        let a = SpatialIndex::build(&triangles).intersect_ray(&ray);
        let b = SpatialIndex::build(&triangles).intersect_ray(&ray);
        assert!(a == Some(2) || a == Some(12));
        assert_eq!(a, b);
    }
}
