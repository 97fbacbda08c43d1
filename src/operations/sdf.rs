//! Shape diameter function.
//!
//! For every face, rays are cast from the centroid into the solid inside a
//! cone around the inward normal. The distances at which they leave the solid
//! are trimmed of outliers and averaged into one thickness estimate, and the
//! estimates are normalized to `[0, 1]` over the whole mesh.

// Face counts are far below the range where these casts lose information.
#![allow(clippy::cast_precision_loss)]

use std::f64::consts::PI;
use std::sync::atomic::{AtomicUsize, Ordering};

use rayon::prelude::*;
use tracing::{debug, info, warn};

use crate::error::{Result, SegmentationError};
use crate::geometry::{Ray, Triangle};
use crate::math::cone::sample_cone;
use crate::progress::Progress;
use crate::spatial::SpatialIndex;
use crate::topology::TopologyGraph;

/// Passes of neighbour averaging used to fill faces without a usable ray.
const MAX_FILL_PASSES: usize = 64;

/// Parameters controlling SDF ray casting.
#[derive(Debug, Clone, Copy)]
pub struct SdfParams {
    /// Rays cast per face.
    pub ray_count: usize,
    /// Full opening angle of the ray cone, in radians.
    pub cone_angle: f64,
    /// Relative spread below which all faces are considered equally thick.
    pub epsilon: f64,
}

impl Default for SdfParams {
    fn default() -> Self {
        Self {
            ray_count: 25,
            cone_angle: 2.0 * PI / 3.0,
            epsilon: 1e-9,
        }
    }
}

/// Computes normalized SDF values and stores them in the topology graph.
pub struct ComputeSdf {
    params: SdfParams,
}

impl ComputeSdf {
    /// Creates a new `ComputeSdf` operation.
    #[must_use]
    pub fn new(params: SdfParams) -> Self {
        Self { params }
    }

    /// Executes the computation.
    ///
    /// `index` and `triangles` must describe the same soup the graph was
    /// built from. Progress, if given, is written to its `sdf` field.
    ///
    /// # Errors
    ///
    /// Returns [`SegmentationError::InvalidTopology`] for an empty or invalid
    /// graph or a graph that does not match the soup, and
    /// [`SegmentationError::InvalidParameters`] for a zero ray count or a cone
    /// angle outside `(0, π]`.
    pub fn execute(
        &self,
        graph: &mut TopologyGraph,
        index: &SpatialIndex,
        triangles: &[Triangle],
        progress: Option<&Progress>,
    ) -> Result<()> {
        if !graph.is_valid()
            || graph.is_empty()
            || graph.check_triangle_count(triangles.len()).is_err()
            || index.len() != triangles.len()
        {
            return Err(SegmentationError::InvalidTopology.into());
        }
        if self.params.ray_count == 0 {
            return Err(SegmentationError::InvalidParameters("ray count must be positive".into()).into());
        }
        if !(self.params.cone_angle > 0.0 && self.params.cone_angle <= PI) {
            return Err(SegmentationError::InvalidParameters(format!(
                "cone angle {} is outside (0, pi]",
                self.params.cone_angle
            ))
            .into());
        }

        info!(
            faces = triangles.len(),
            rays = self.params.ray_count,
            "computing shape diameter function"
        );

        let total = triangles.len();
        let done = AtomicUsize::new(0);
        let raw: Vec<Option<f64>> = triangles
            .par_iter()
            .enumerate()
            .map(|(id, triangle)| {
                let value = self.face_diameter(id, triangle, index, triangles);
                let finished = done.fetch_add(1, Ordering::Relaxed) + 1;
                if let Some(progress) = progress {
                    #[allow(clippy::cast_possible_truncation)]
                    progress.sdf.set((finished as f64 / total as f64 * 0.9) as f32);
                }
                value
            })
            .collect();

        let missing = raw.iter().filter(|v| v.is_none()).count();
        if missing > 0 {
            debug!(missing, "faces without a usable ray");
        }

        let filled = fill_missing(graph, raw);
        let normalized = normalize(filled, self.params.epsilon);
        graph.set_sdf_values(normalized);

        if let Some(progress) = progress {
            progress.sdf.set(1.0);
        }
        info!(faces = total, "shape diameter function ready");
        Ok(())
    }

    /// Robust thickness estimate of one face, or `None` if no ray stayed
    /// inside the solid.
    fn face_diameter(
        &self,
        id: usize,
        triangle: &Triangle,
        index: &SpatialIndex,
        triangles: &[Triangle],
    ) -> Option<f64> {
        let inward = -triangle.unit_normal()?;
        let origin = triangle.centroid();
        let skip_self = |other: usize| other != id;

        let mut samples = Vec::with_capacity(self.params.ray_count);
        for sample in sample_cone(&inward, self.params.cone_angle / 2.0, self.params.ray_count) {
            let ray = Ray::new(origin, sample.direction);
            let Some(hit) = index.closest_hit(&ray, &skip_self) else {
                continue;
            };
            // A front-facing first hit means the ray left the solid through a
            // gap or started on an inward-facing face.
            let exits_solid = triangles[hit.triangle]
                .unit_normal()
                .is_some_and(|n| n.dot(&sample.direction) > 0.0);
            if exits_solid {
                samples.push((hit.distance, sample.cos_angle));
            }
        }

        robust_mean(&mut samples)
    }
}

/// Weighted mean of the distances within one standard deviation of the
/// median. Samples are `(distance, weight)` pairs.
fn robust_mean(samples: &mut [(f64, f64)]) -> Option<f64> {
    if samples.is_empty() {
        return None;
    }
    samples.sort_by(|a, b| a.0.total_cmp(&b.0));

    let n = samples.len();
    let median = if n % 2 == 0 {
        (samples[n / 2 - 1].0 + samples[n / 2].0) / 2.0
    } else {
        samples[n / 2].0
    };
    let mean = samples.iter().map(|s| s.0).sum::<f64>() / n as f64;
    let deviation = (samples.iter().map(|s| (s.0 - mean).powi(2)).sum::<f64>() / n as f64).sqrt();

    let (weighted, weights) = samples
        .iter()
        .filter(|s| (s.0 - median).abs() <= deviation)
        .fold((0.0, 0.0), |(sum, total), &(d, w)| (sum + d * w, total + w));

    if weights > 0.0 {
        Some(weighted / weights)
    } else {
        Some(median)
    }
}

/// Gives faces without a value the average of their valued neighbours, then
/// the global mean for anything still unreachable.
fn fill_missing(graph: &TopologyGraph, mut values: Vec<Option<f64>>) -> Vec<f64> {
    for _ in 0..MAX_FILL_PASSES {
        if values.iter().all(Option::is_some) {
            break;
        }
        let previous = values.clone();
        let mut changed = false;
        for (id, value) in values.iter_mut().enumerate() {
            if value.is_some() {
                continue;
            }
            let (sum, count) = graph
                .neighbours_of(id)
                .into_iter()
                .flatten()
                .filter_map(|n| previous[n])
                .fold((0.0, 0usize), |(s, c), v| (s + v, c + 1));
            if count > 0 {
                *value = Some(sum / count as f64);
                changed = true;
            }
        }
        if !changed {
            break;
        }
    }

    let known: Vec<f64> = values.iter().flatten().copied().collect();
    let fallback = if known.is_empty() {
        warn!("no SDF ray stayed inside the mesh; is it closed and outward-facing?");
        0.0
    } else {
        known.iter().sum::<f64>() / known.len() as f64
    };
    values.into_iter().map(|v| v.unwrap_or(fallback)).collect()
}

/// Linearly maps values to `[0, 1]`; an input whose spread is small relative
/// to its magnitude maps to 0.
fn normalize(values: Vec<f64>, epsilon: f64) -> Vec<f64> {
    let min = values.iter().copied().fold(f64::INFINITY, f64::min);
    let max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let range = max - min;
    if !range.is_finite() || range <= epsilon * max.abs().max(min.abs()) {
        return vec![0.0; values.len()];
    }
    values
        .into_iter()
        .map(|v| ((v - min) / range).clamp(0.0, 1.0))
        .collect()
}
