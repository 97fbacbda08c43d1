use super::{Point3, Vector3, TOLERANCE};

/// Intersects the ray `origin + t * direction` with a triangle using the
/// Möller–Trumbore algorithm.
///
/// Both triangle sides are hit. Returns the ray parameter `t` of the hit when
/// `t > epsilon`; points on triangle edges count as hits. The parallel test
/// is relative to the edge and direction lengths, so it holds at any scale.
#[must_use]
#[allow(clippy::many_single_char_names)]
pub fn ray_triangle_intersect(
    origin: &Point3,
    direction: &Vector3,
    corners: &[Point3; 3],
    epsilon: f64,
) -> Option<f64> {
    let edge1 = corners[1] - corners[0];
    let edge2 = corners[2] - corners[0];

    let h = direction.cross(&edge2);
    let a = edge1.dot(&h);

    // Ray is parallel to the triangle plane
    if a.abs() <= TOLERANCE * direction.norm() * edge1.norm() * edge2.norm() {
        return None;
    }

    let f = 1.0 / a;
    let s = origin - corners[0];
    let u = f * s.dot(&h);
    if !(0.0..=1.0).contains(&u) {
        return None;
    }

    let q = s.cross(&edge1);
    let v = f * direction.dot(&q);
    if v < 0.0 || u + v > 1.0 {
        return None;
    }

    let t = f * edge2.dot(&q);
    (t > epsilon).then_some(t)
}

/// Computes the unit normal of a triangle from its corners (CCW winding).
///
/// Returns `None` for degenerate (zero-area) triangles.
#[must_use]
pub fn triangle_normal(corners: &[Point3; 3]) -> Option<Vector3> {
    let edge1 = corners[1] - corners[0];
    let edge2 = corners[2] - corners[0];
    let n = edge1.cross(&edge2);
    let len = n.norm();
    (len > TOLERANCE * edge1.norm() * edge2.norm()).then(|| n / len)
}
