use std::f64::consts::PI;

use super::{orthonormal_basis, Vector3};

/// A sampled direction inside a cone, with the cosine of its angle to the axis.
#[derive(Debug, Clone, Copy)]
pub struct ConeSample {
    /// Unit direction.
    pub direction: Vector3,
    /// Cosine of the angle between `direction` and the cone axis.
    pub cos_angle: f64,
}

/// Samples `count` directions distributed over the spherical cap of
/// half-angle `half_angle` around the unit vector `axis`.
///
/// Uses a golden-angle spiral so that the sample set is deterministic and
/// evenly spread. The first sample is always closest to the axis.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn sample_cone(axis: &Vector3, half_angle: f64, count: usize) -> Vec<ConeSample> {
    if count == 0 {
        return Vec::new();
    }

    let golden_angle = PI * (3.0 - 5.0_f64.sqrt());
    let cos_max = half_angle.clamp(0.0, PI).cos();
    let (u, v) = orthonormal_basis(axis);

    (0..count)
        .map(|i| {
            let fraction = (i as f64 + 0.5) / count as f64;
            let cos_angle = 1.0 - (1.0 - cos_max) * fraction;
            let sin_angle = (1.0 - cos_angle * cos_angle).max(0.0).sqrt();
            let phi = golden_angle * i as f64;
            let direction = axis * cos_angle + (u * phi.cos() + v * phi.sin()) * sin_angle;
            ConeSample {
                direction: direction.normalize(),
                cos_angle,
            }
        })
        .collect()
}
