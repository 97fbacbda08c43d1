use crate::error::{OperationError, Result};
use crate::geometry::{ColorIndex, Triangle};
use crate::math::{Point3, TOLERANCE};

/// Creates the 12-triangle soup of an axis-aligned box.
///
/// Triangles are emitted face by face in the order -Z, +Z, -Y, +Y, -X, +X,
/// two per face, wound counter-clockwise when seen from outside.
pub struct MakeBox {
    min_corner: Point3,
    max_corner: Point3,
    color: ColorIndex,
}

impl MakeBox {
    /// Creates a new `MakeBox` operation.
    #[must_use]
    pub fn new(min_corner: Point3, max_corner: Point3) -> Self {
        Self {
            min_corner,
            max_corner,
            color: 0,
        }
    }

    /// Sets the color id given to every triangle.
    #[must_use]
    pub fn with_color(mut self, color: ColorIndex) -> Self {
        self.color = color;
        self
    }

    /// Executes the operation, returning the triangle soup.
    ///
    /// # Errors
    ///
    /// Returns [`OperationError::InvalidInput`] if the box is flat or inverted
    /// along any axis.
    pub fn execute(&self) -> Result<Vec<Triangle>> {
        let extent = self.max_corner - self.min_corner;
        // Flatness is judged against the longest side.
        let longest = extent.amax();
        if extent.iter().any(|&e| e.is_nan() || e <= TOLERANCE * longest) {
            return Err(OperationError::InvalidInput(
                "box max corner must exceed min corner on every axis".into(),
            )
            .into());
        }

        let (lo, hi) = (self.min_corner, self.max_corner);
        let v = [
            Point3::new(lo.x, lo.y, lo.z),
            Point3::new(hi.x, lo.y, lo.z),
            Point3::new(hi.x, hi.y, lo.z),
            Point3::new(lo.x, hi.y, lo.z),
            Point3::new(lo.x, lo.y, hi.z),
            Point3::new(hi.x, lo.y, hi.z),
            Point3::new(hi.x, hi.y, hi.z),
            Point3::new(lo.x, hi.y, hi.z),
        ];
        let quads: [[usize; 4]; 6] = [
            [0, 3, 2, 1],
            [4, 5, 6, 7],
            [0, 1, 5, 4],
            [3, 7, 6, 2],
            [0, 4, 7, 3],
            [1, 2, 6, 5],
        ];

        let mut triangles = Vec::with_capacity(12);
        for [a, b, c, d] in quads {
            triangles.push(Triangle::from_corners([v[a], v[b], v[c]], self.color));
            triangles.push(Triangle::from_corners([v[a], v[c], v[d]], self.color));
        }
        Ok(triangles)
    }
}
