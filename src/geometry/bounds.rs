use crate::math::{Point3, Vector3};

use super::Triangle;

/// An axis-aligned bounding box.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Aabb {
    /// Minimum corner of the bounding box.
    pub min: Point3,
    /// Maximum corner of the bounding box.
    pub max: Point3,
}

impl Aabb {
    /// Bounding box of a single triangle.
    #[must_use]
    pub fn from_triangle(triangle: &Triangle) -> Self {
        let [a, b, c] = triangle.corners();
        Self {
            min: Point3::from(a.coords.inf(&b.coords).inf(&c.coords)),
            max: Point3::from(a.coords.sup(&b.coords).sup(&c.coords)),
        }
    }

    /// Smallest box containing both `self` and `other`.
    #[must_use]
    pub fn union(&self, other: &Self) -> Self {
        Self {
            min: Point3::from(self.min.coords.inf(&other.min.coords)),
            max: Point3::from(self.max.coords.sup(&other.max.coords)),
        }
    }

    /// Grows the box by `epsilon` on every side.
    #[must_use]
    pub fn expand(&self, epsilon: f64) -> Self {
        let e = Vector3::repeat(epsilon);
        Self {
            min: self.min - e,
            max: self.max + e,
        }
    }

    /// Length of the box diagonal.
    #[must_use]
    pub fn diagonal(&self) -> f64 {
        (self.max - self.min).norm()
    }

    /// Slab test against a ray given by its origin and inverse direction.
    ///
    /// Returns the entry and exit parameters clipped to `t >= 0`.
    #[must_use]
    pub fn ray_intersect(&self, origin: &Point3, dir_inv: &Vector3) -> Option<(f64, f64)> {
        let t1 = (self.min - origin).component_mul(dir_inv);
        let t2 = (self.max - origin).component_mul(dir_inv);

        let t_min = t1.inf(&t2).max();
        let t_max = t1.sup(&t2).min();

        if t_max >= t_min && t_max >= 0.0 {
            Some((t_min.max(0.0), t_max))
        } else {
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::Ray;

    fn p(x: f64, y: f64, z: f64) -> Point3 {
        Point3::new(x, y, z)
    }

    fn unit_box() -> Aabb {
        Aabb {
            min: p(0.0, 0.0, 0.0),
            max: p(1.0, 1.0, 1.0),
        }
    }

    #[test]
    fn triangle_box_spans_corners() {
        let t = Triangle::from_corners([p(0.0, 2.0, -1.0), p(3.0, 0.0, 0.0), p(1.0, 1.0, 4.0)], 0);
        let b = Aabb::from_triangle(&t);
        assert_eq!(b.min, p(0.0, 0.0, -1.0));
        assert_eq!(b.max, p(3.0, 2.0, 4.0));
    }

    #[test]
    fn diagonal_spans_min_to_max() {
        let b = unit_box().union(&Aabb {
            min: p(-1.0, 0.0, 0.0),
            max: p(0.0, 2.0, 1.0),
        });
        assert!((b.diagonal() - 3.0).abs() < 1e-12);
        assert!((b.expand(0.5).diagonal() - 22.0_f64.sqrt()).abs() < 1e-12);
    }

    #[test]
    fn ray_through_box_hits() {
        let ray = Ray::new(p(0.5, 0.5, -2.0), Vector3::new(0.0, 0.0, 1.0));
        let hit = unit_box().ray_intersect(&ray.origin, &ray.inverse_direction(1e-12));
        assert_eq!(hit, Some((2.0, 3.0)));
    }

    #[test]
    fn ray_pointing_away_misses() {
        let ray = Ray::new(p(0.5, 0.5, -2.0), Vector3::new(0.0, 0.0, -1.0));
        let hit = unit_box().ray_intersect(&ray.origin, &ray.inverse_direction(1e-12));
        assert!(hit.is_none());
    }

    #[test]
    fn ray_beside_box_misses() {
        let ray = Ray::new(p(2.0, 0.5, -2.0), Vector3::new(0.0, 0.0, 1.0));
        let hit = unit_box().ray_intersect(&ray.origin, &ray.inverse_direction(1e-12));
        assert!(hit.is_none());
    }

    #[test]
    fn origin_inside_box_starts_at_zero() {
        let ray = Ray::new(p(0.5, 0.5, 0.5), Vector3::new(1.0, 0.0, 0.0));
        let hit = unit_box().ray_intersect(&ray.origin, &ray.inverse_direction(1e-12));
        assert_eq!(hit, Some((0.0, 0.5)));
    }
}
