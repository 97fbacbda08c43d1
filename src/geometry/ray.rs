use crate::math::{Point3, Vector3};

/// A half-line `origin + t * direction`, `t >= 0`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Ray {
    /// Start point of the ray.
    pub origin: Point3,
    /// Direction of the ray. Not required to be unit length.
    pub direction: Vector3,
}

impl Ray {
    /// Creates a new ray.
    #[must_use]
    pub fn new(origin: Point3, direction: Vector3) -> Self {
        Self { origin, direction }
    }

    /// Creates a ray starting at `origin` and passing through `target`.
    #[must_use]
    pub fn through(origin: Point3, target: Point3) -> Self {
        Self::new(origin, target - origin)
    }

    /// Component-wise inverse direction for slab tests.
    ///
    /// Near-zero components map to `f64::MAX` instead of infinity so that
    /// `0 * inv` stays finite.
    #[must_use]
    pub fn inverse_direction(&self, epsilon: f64) -> Vector3 {
        self.direction
            .map(|d| if d.abs() > epsilon { 1.0 / d } else { f64::MAX })
    }
}
