pub mod cone;
pub mod intersect_3d;

/// 3D point type.
pub type Point3 = nalgebra::Point3<f64>;

/// 3D vector type.
pub type Vector3 = nalgebra::Vector3<f64>;

/// Global geometric tolerance for floating-point comparisons.
pub const TOLERANCE: f64 = 1e-10;

/// Returns an orthonormal pair `(u, v)` perpendicular to the unit vector `axis`.
#[must_use]
pub fn orthonormal_basis(axis: &Vector3) -> (Vector3, Vector3) {
    // Choose a reference vector not parallel to the axis
    let reference = if axis.x.abs() < 0.9 {
        Vector3::new(1.0, 0.0, 0.0)
    } else {
        Vector3::new(0.0, 1.0, 0.0)
    };
    let u = axis.cross(&reference).normalize();
    let v = axis.cross(&u);
    (u, v)
}
