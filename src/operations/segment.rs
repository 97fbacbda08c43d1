// Face counts are far below the range where these casts lose information.
#![allow(clippy::cast_precision_loss)]

use std::collections::BTreeMap;

use tracing::{debug, info};

use crate::error::{Result, SegmentationError};
use crate::operations::region_grow::RegionGrow;
use crate::topology::TopologyGraph;

/// Upper bound on k-means refinement rounds.
const MAX_KMEANS_ITERATIONS: usize = 50;

/// Upper bound on label smoothing sweeps.
const MAX_SMOOTHING_SWEEPS: usize = 20;

/// Result of a segmentation: disjoint, non-empty segments covering every
/// triangle id.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Segmentation {
    segments: BTreeMap<usize, Vec<usize>>,
    triangle_to_segment: Vec<usize>,
}

impl Segmentation {
    /// Number of segments.
    #[must_use]
    pub fn segment_count(&self) -> usize {
        self.segments.len()
    }

    /// Triangle ids per segment id, each list in discovery order.
    #[must_use]
    pub fn segments(&self) -> &BTreeMap<usize, Vec<usize>> {
        &self.segments
    }

    /// Triangle ids of one segment.
    #[must_use]
    pub fn segment(&self, id: usize) -> Option<&[usize]> {
        self.segments.get(&id).map(Vec::as_slice)
    }

    /// Segment id of a triangle.
    #[must_use]
    pub fn segment_of(&self, triangle: usize) -> Option<usize> {
        self.triangle_to_segment.get(triangle).copied()
    }

    /// Segment id per triangle id.
    #[must_use]
    pub fn triangle_to_segment(&self) -> &[usize] {
        &self.triangle_to_segment
    }
}

/// Splits the mesh into parts of similar thickness.
///
/// SDF values are clustered with a one-dimensional k-means, cluster labels
/// are smoothed against the mesh adjacency, and every connected run of equal
/// labels becomes one segment. The segment count may therefore differ from
/// `number_of_clusters`.
pub struct Segment {
    number_of_clusters: usize,
    smoothing_lambda: f64,
}

impl Segment {
    /// Creates a new `Segment` operation.
    ///
    /// `smoothing_lambda` in `[0, 1]` trades fidelity to the SDF clusters
    /// (0) against short, crease-following boundaries (1).
    #[must_use]
    pub fn new(number_of_clusters: usize, smoothing_lambda: f64) -> Self {
        Self {
            number_of_clusters,
            smoothing_lambda,
        }
    }

    /// Executes the segmentation.
    ///
    /// # Errors
    ///
    /// Returns [`SegmentationError::InvalidParameters`] for zero clusters or
    /// a lambda outside `[0, 1]`, [`SegmentationError::SdfNotComputed`] if the
    /// graph carries no SDF values, and any traversal error raised while
    /// collecting connected segments.
    pub fn execute(&self, graph: &TopologyGraph) -> Result<Segmentation> {
        if self.number_of_clusters == 0 {
            return Err(
                SegmentationError::InvalidParameters("number of clusters must be positive".into())
                    .into(),
            );
        }
        if !(0.0..=1.0).contains(&self.smoothing_lambda) {
            return Err(SegmentationError::InvalidParameters(format!(
                "smoothing lambda {} is outside [0, 1]",
                self.smoothing_lambda
            ))
            .into());
        }
        let values = graph
            .sdf_values()
            .ok_or(SegmentationError::SdfNotComputed)?;
        if !graph.is_valid() {
            return Err(SegmentationError::InvalidTopology.into());
        }

        info!(
            faces = values.len(),
            clusters = self.number_of_clusters,
            lambda = self.smoothing_lambda,
            "segmenting mesh"
        );

        let centers = cluster_centers(values, self.number_of_clusters);
        let mut labels: Vec<usize> = values.iter().map(|&v| nearest(&centers, v)).collect();
        let sweeps = self.smooth(graph, values, &centers, &mut labels);
        debug!(clusters = centers.len(), sweeps, "labels smoothed");

        let segmentation = connected_segments(graph, &labels)?;
        info!(
            segments = segmentation.segment_count(),
            "segmentation finished"
        );
        Ok(segmentation)
    }

    /// Iterated conditional modes over the face adjacency. Returns the number
    /// of sweeps run.
    fn smooth(
        &self,
        graph: &TopologyGraph,
        values: &[f64],
        centers: &[f64],
        labels: &mut [usize],
    ) -> usize {
        let lambda = self.smoothing_lambda;
        if lambda <= 0.0 || centers.len() < 2 {
            return 0;
        }

        let adjacency: Vec<Vec<(usize, f64)>> = (0..labels.len())
            .map(|f| {
                graph
                    .neighbours_of(f)
                    .into_iter()
                    .flatten()
                    .map(|g| (g, cut_weight(graph, f, g)))
                    .collect()
            })
            .collect();

        let energy = |face: usize, label: usize, labels: &[usize]| {
            let data = (values[face] - centers[label]).powi(2);
            let cut: f64 = adjacency[face]
                .iter()
                .filter(|&&(g, _)| labels[g] != label)
                .map(|&(_, w)| w)
                .sum();
            (1.0 - lambda) * data + lambda * cut
        };

        for sweep in 1..=MAX_SMOOTHING_SWEEPS {
            let mut changed = false;
            for face in 0..labels.len() {
                let current = labels[face];
                let mut best = (current, energy(face, current, labels));
                for label in 0..centers.len() {
                    let e = energy(face, label, labels);
                    if e < best.1 {
                        best = (label, e);
                    }
                }
                if best.0 != current {
                    labels[face] = best.0;
                    changed = true;
                }
            }
            if !changed {
                return sweep;
            }
        }
        MAX_SMOOTHING_SWEEPS
    }
}

/// Cost of a segment boundary across the edge between two faces: 1 between
/// coplanar faces, 0 across a fold back onto itself.
fn cut_weight(graph: &TopologyGraph, f: usize, g: usize) -> f64 {
    match (graph.face_normal(f), graph.face_normal(g)) {
        (Some(a), Some(b)) => (1.0 + a.dot(&b).clamp(-1.0, 1.0)) / 2.0,
        _ => 0.5,
    }
}

/// One-dimensional k-means with quantile seeding. Clusters that end up empty
/// are dropped, so fewer than `k` centers may be returned.
fn cluster_centers(values: &[f64], k: usize) -> Vec<f64> {
    let n = values.len();
    let k = k.min(n);
    if k == 0 {
        return Vec::new();
    }

    let mut sorted = values.to_vec();
    sorted.sort_by(f64::total_cmp);
    let mut centers: Vec<f64> = (0..k).map(|i| sorted[(2 * i + 1) * n / (2 * k)]).collect();

    let mut labels = vec![usize::MAX; n];
    for _ in 0..MAX_KMEANS_ITERATIONS {
        let mut changed = false;
        for (label, &v) in labels.iter_mut().zip(values) {
            let closest = nearest(&centers, v);
            if *label != closest {
                *label = closest;
                changed = true;
            }
        }
        if !changed {
            break;
        }

        let mut sums = vec![(0.0, 0usize); k];
        for (&label, &v) in labels.iter().zip(values) {
            sums[label].0 += v;
            sums[label].1 += 1;
        }
        for (center, &(sum, count)) in centers.iter_mut().zip(&sums) {
            // An empty cluster keeps its center for the next round.
            if count > 0 {
                *center = sum / count as f64;
            }
        }
    }

    let mut used = vec![false; k];
    for &label in &labels {
        used[label] = true;
    }
    centers
        .into_iter()
        .zip(used)
        .filter_map(|(c, used)| used.then_some(c))
        .collect()
}

/// Index of the closest center; ties go to the lower index.
fn nearest(centers: &[f64], value: f64) -> usize {
    let mut best = 0;
    for (i, c) in centers.iter().enumerate().skip(1) {
        if (value - c).abs() < (value - centers[best]).abs() {
            best = i;
        }
    }
    best
}

/// Splits labels into connected runs of equal label.
fn connected_segments(graph: &TopologyGraph, labels: &[usize]) -> Result<Segmentation> {
    let mut triangle_to_segment = vec![usize::MAX; labels.len()];
    let mut segments = BTreeMap::new();

    for face in 0..labels.len() {
        if triangle_to_segment[face] != usize::MAX {
            continue;
        }
        let mut members = RegionGrow::from_seed(face)
            .execute(graph, &|candidate, from| labels[candidate] == labels[from])?;
        if members.is_empty() {
            members.push(face);
        }

        let id = segments.len();
        for &member in &members {
            triangle_to_segment[member] = id;
        }
        segments.insert(id, members);
    }

    Ok(Segmentation {
        segments,
        triangle_to_segment,
    })
}
