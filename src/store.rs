#![allow(clippy::cast_possible_truncation)]

use tracing::debug;

use crate::error::{Result, StoreError};
use crate::geometry::{ColorIndex, Triangle};
use crate::math::intersect_3d::triangle_normal;
use crate::math::{Point3, Vector3};

/// Owns the triangle soup and the four render buffers derived from it.
///
/// Every triangle contributes three consecutive slots to each buffer; the
/// slots share one color and one normal, so neighbouring triangles can carry
/// different colors. All buffers always have length `3 * triangle_count()`.
///
/// Buffers are generated only when the store is constructed. A color edit
/// rewrites three color slots in place.
#[derive(Debug, Clone, Default)]
pub struct TriangleMeshStore {
    triangles: Vec<Triangle>,
    vertex_buffer: Vec<[f32; 3]>,
    color_buffer: Vec<ColorIndex>,
    normal_buffer: Vec<[f32; 3]>,
    index_buffer: Vec<u32>,
}

impl TriangleMeshStore {
    /// Creates an empty store.
    #[must_use]
    pub fn empty() -> Self {
        Self::default()
    }

    /// Builds a store and its buffers from a triangle soup.
    ///
    /// A zero normal is replaced by the normal of the corner winding.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Construction`] if a triangle has a non-finite
    /// coordinate or normal, or if the soup is too large for a `u32` index
    /// buffer.
    pub fn new(mut triangles: Vec<Triangle>) -> Result<Self> {
        let slots = triangles.len().saturating_mul(3);
        if u32::try_from(slots).is_err() {
            return Err(StoreError::Construction(format!(
                "{} triangles exceed the index buffer range",
                triangles.len()
            ))
            .into());
        }

        for (index, triangle) in triangles.iter_mut().enumerate() {
            if !triangle.is_finite() {
                return Err(StoreError::Construction(format!(
                    "triangle {index} has a non-finite coordinate or normal"
                ))
                .into());
            }
            if triangle.normal().norm() <= f64::EPSILON {
                if let Some(n) = triangle_normal(triangle.corners()) {
                    triangle.set_normal(n);
                }
            }
        }

        let mut store = Self {
            triangles,
            ..Self::default()
        };
        store.generate_buffers();
        debug!(triangles = store.triangles.len(), "generated render buffers");
        Ok(store)
    }

    fn generate_buffers(&mut self) {
        let slots = self.triangles.len() * 3;
        self.vertex_buffer = Vec::with_capacity(slots);
        self.color_buffer = Vec::with_capacity(slots);
        self.normal_buffer = Vec::with_capacity(slots);

        for triangle in &self.triangles {
            let normal = to_render(triangle.normal());
            for corner in triangle.corners() {
                self.vertex_buffer.push(point_to_render(corner));
                self.color_buffer.push(triangle.color());
                self.normal_buffer.push(normal);
            }
        }

        // Vertices are never shared, so the index buffer is linear.
        self.index_buffer = (0..slots).filter_map(|i| u32::try_from(i).ok()).collect();

        debug_assert_eq!(self.index_buffer.len(), self.vertex_buffer.len());
    }

    /// Number of triangles in the soup.
    #[must_use]
    pub fn triangle_count(&self) -> usize {
        self.triangles.len()
    }

    /// Returns `true` if the soup has no triangles.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.triangles.is_empty()
    }

    /// The whole triangle soup.
    #[must_use]
    pub fn triangles(&self) -> &[Triangle] {
        &self.triangles
    }

    /// Returns the triangle with the given id.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::OutOfRange`] if `id >= triangle_count()`.
    pub fn triangle(&self, id: usize) -> Result<&Triangle> {
        self.triangles.get(id).ok_or_else(|| {
            StoreError::OutOfRange {
                index: id,
                count: self.triangles.len(),
            }
            .into()
        })
    }

    /// Returns the color id of the triangle with the given id.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::OutOfRange`] if `id >= triangle_count()`.
    pub fn triangle_color(&self, id: usize) -> Result<ColorIndex> {
        self.triangle(id).map(Triangle::color)
    }

    /// Recolors one triangle without touching geometry.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::OutOfRange`] if `id >= triangle_count()`.
    pub fn set_triangle_color(&mut self, id: usize, color: ColorIndex) -> Result<()> {
        let count = self.triangles.len();
        let triangle = self
            .triangles
            .get_mut(id)
            .ok_or(StoreError::OutOfRange { index: id, count })?;
        triangle.set_color(color);

        for slot in &mut self.color_buffer[id * 3..id * 3 + 3] {
            *slot = color;
        }
        Ok(())
    }

    /// Per-vertex positions, three per triangle.
    #[must_use]
    pub fn vertex_buffer(&self) -> &[[f32; 3]] {
        &self.vertex_buffer
    }

    /// Per-vertex color ids, three equal entries per triangle.
    #[must_use]
    pub fn color_buffer(&self) -> &[ColorIndex] {
        &self.color_buffer
    }

    /// Per-vertex normals, three equal entries per triangle.
    #[must_use]
    pub fn normal_buffer(&self) -> &[[f32; 3]] {
        &self.normal_buffer
    }

    /// Linear index buffer `0..3 * triangle_count()`.
    #[must_use]
    pub fn index_buffer(&self) -> &[u32] {
        &self.index_buffer
    }
}

fn to_render(v: &Vector3) -> [f32; 3] {
    [v.x as f32, v.y as f32, v.z as f32]
}

fn point_to_render(p: &Point3) -> [f32; 3] {
    to_render(&p.coords)
}
