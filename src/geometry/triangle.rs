use serde::{Deserialize, Serialize};

use crate::math::intersect_3d::triangle_normal;
use crate::math::{Point3, Vector3};

/// Identifier of a palette entry. Opaque to the core.
pub type ColorIndex = u32;

/// A single flat-shaded, single-colored triangle of the soup.
///
/// Corners are stored in counter-clockwise order when seen from the side the
/// normal points to.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Triangle {
    corners: [Point3; 3],
    normal: Vector3,
    color: ColorIndex,
}

impl Triangle {
    /// Creates a triangle with an explicit face normal.
    #[must_use]
    pub fn new(corners: [Point3; 3], normal: Vector3, color: ColorIndex) -> Self {
        Self {
            corners,
            normal,
            color,
        }
    }

    /// Creates a triangle whose normal is derived from the corner winding.
    ///
    /// Degenerate triangles get a zero normal.
    #[must_use]
    pub fn from_corners(corners: [Point3; 3], color: ColorIndex) -> Self {
        let normal = triangle_normal(&corners).unwrap_or_else(Vector3::zeros);
        Self::new(corners, normal, color)
    }

    /// The three corners.
    #[must_use]
    pub fn corners(&self) -> &[Point3; 3] {
        &self.corners
    }

    /// The face normal as stored.
    #[must_use]
    pub fn normal(&self) -> &Vector3 {
        &self.normal
    }

    /// The palette id of this triangle.
    #[must_use]
    pub fn color(&self) -> ColorIndex {
        self.color
    }

    pub(crate) fn set_color(&mut self, color: ColorIndex) {
        self.color = color;
    }

    pub(crate) fn set_normal(&mut self, normal: Vector3) {
        self.normal = normal;
    }

    /// Unit normal: the stored normal if usable, otherwise the winding normal.
    #[must_use]
    pub fn unit_normal(&self) -> Option<Vector3> {
        let len = self.normal.norm();
        if len > f64::EPSILON {
            Some(self.normal / len)
        } else {
            triangle_normal(&self.corners)
        }
    }

    /// Centroid of the three corners.
    #[must_use]
    pub fn centroid(&self) -> Point3 {
        let [a, b, c] = &self.corners;
        Point3::from((a.coords + b.coords + c.coords) / 3.0)
    }

    /// Area of the triangle.
    #[must_use]
    pub fn area(&self) -> f64 {
        let [a, b, c] = &self.corners;
        (b - a).cross(&(c - a)).norm() * 0.5
    }

    /// Returns `true` when every coordinate and normal component is finite.
    #[must_use]
    pub fn is_finite(&self) -> bool {
        self.corners
            .iter()
            .all(|p| p.coords.iter().all(|c| c.is_finite()))
            && self.normal.iter().all(|c| c.is_finite())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn p(x: f64, y: f64, z: f64) -> Point3 {
        Point3::new(x, y, z)
    }

    #[test]
    fn from_corners_computes_normal() {
        let t = Triangle::from_corners([p(0.0, 0.0, 0.0), p(2.0, 0.0, 0.0), p(0.0, 2.0, 0.0)], 3);
        assert_relative_eq!(t.normal().z, 1.0);
        assert_relative_eq!(t.area(), 2.0);
        assert_eq!(t.color(), 3);
    }

    #[test]
    fn centroid_is_average() {
        let t = Triangle::from_corners([p(0.0, 0.0, 0.0), p(3.0, 0.0, 0.0), p(0.0, 3.0, 3.0)], 0);
        let c = t.centroid();
        assert_relative_eq!(c.x, 1.0);
        assert_relative_eq!(c.y, 1.0);
        assert_relative_eq!(c.z, 1.0);
    }

    #[test]
    fn unit_normal_falls_back_to_winding() {
        let t = Triangle::new(
            [p(0.0, 0.0, 0.0), p(0.0, 1.0, 0.0), p(1.0, 0.0, 0.0)],
            Vector3::zeros(),
            0,
        );
        let n = t.unit_normal();
        assert!(n.is_some_and(|n| (n.z + 1.0).abs() < 1e-12));
    }

    #[test]
    fn nan_is_not_finite() {
        let t = Triangle::from_corners([p(f64::NAN, 0.0, 0.0), p(1.0, 0.0, 0.0), p(0.0, 1.0, 0.0)], 0);
        assert!(!t.is_finite());
    }
}
