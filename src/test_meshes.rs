//! Shared mesh fixtures for unit tests.

use crate::geometry::Triangle;
use crate::math::Point3;
use crate::operations::creation::MakeBox;

pub fn p(x: f64, y: f64, z: f64) -> Point3 {
    Point3::new(x, y, z)
}

/// Closed unit cube, 12 triangles, color 0.
pub fn unit_cube() -> Vec<Triangle> {
    cuboid(p(0.0, 0.0, 0.0), p(1.0, 1.0, 1.0), 0)
}

/// Closed box between two corners.
pub fn cuboid(min: Point3, max: Point3, color: u32) -> Vec<Triangle> {
    MakeBox::new(min, max)
        .with_color(color)
        .execute()
        .unwrap_or_default()
}

/// A thick cube (ids 0..12) and a separate thin plate (ids 12..24).
pub fn cube_and_plate() -> Vec<Triangle> {
    let mut triangles = cuboid(p(0.0, 0.0, 0.0), p(4.0, 4.0, 4.0), 0);
    triangles.extend(cuboid(p(10.0, 0.0, 0.0), p(14.0, 4.0, 0.2), 0));
    triangles
}

/// Copies `triangles` with every corner multiplied by `factor`; normals are
/// kept as given.
pub fn scaled(triangles: &[Triangle], factor: f64) -> Vec<Triangle> {
    triangles
        .iter()
        .map(|t| {
            let corners = t.corners().map(|c| Point3::from(c.coords * factor));
            Triangle::new(corners, *t.normal(), t.color())
        })
        .collect()
}

/// Two triangles sharing the edge (1,0,0)-(0,1,0); every other edge is a
/// boundary.
pub fn open_pair() -> Vec<Triangle> {
    vec![
        Triangle::from_corners([p(0.0, 0.0, 0.0), p(1.0, 0.0, 0.0), p(0.0, 1.0, 0.0)], 0),
        Triangle::from_corners([p(1.0, 0.0, 0.0), p(1.0, 1.0, 0.0), p(0.0, 1.0, 0.0)], 1),
    ]
}

/// Three triangles sharing one edge.
pub fn fin() -> Vec<Triangle> {
    let a = p(0.0, 0.0, 0.0);
    let b = p(1.0, 0.0, 0.0);
    vec![
        Triangle::from_corners([a, b, p(0.5, 1.0, 0.0)], 0),
        Triangle::from_corners([b, a, p(0.5, -1.0, 0.0)], 0),
        Triangle::from_corners([b, a, p(0.5, 0.0, 1.0)], 0),
    ]
}
