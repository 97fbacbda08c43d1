use std::sync::atomic::{AtomicU32, Ordering};

/// A single progress value in `[0, 1]` that may be written by a worker and
/// polled from another thread.
#[derive(Debug, Default)]
pub struct Percentage(AtomicU32);

impl Percentage {
    /// Current value.
    #[must_use]
    pub fn get(&self) -> f32 {
        f32::from_bits(self.0.load(Ordering::Relaxed))
    }

    /// Stores a new value, clamped to `[0, 1]`.
    pub fn set(&self, value: f32) {
        self.0.store(value.clamp(0.0, 1.0).to_bits(), Ordering::Relaxed);
    }
}

/// Progress of the long-running jobs of a model.
///
/// The core writes these fields while it works; the caller polls them.
/// Nothing is pushed.
#[derive(Debug, Default)]
pub struct Progress {
    /// Render buffers of a freshly imported or loaded model are ready.
    pub import_render: Percentage,
    /// Derived data of a freshly imported or loaded model is ready.
    pub import_compute: Percentage,
    /// Render buffer generation.
    pub buffers: Percentage,
    /// Spatial index construction.
    pub aabb_tree: Percentage,
    /// Topology graph construction.
    pub polyhedron: Percentage,
    /// SDF ray casting.
    pub sdf: Percentage,
    /// Segmentation clustering.
    pub segmentation: Percentage,
    /// Project export.
    pub export: Percentage,
}

impl Progress {
    /// Creates a progress tracker with every field at zero.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Zeroes every field at the start of a load.
    pub fn reset_load(&self) {
        for field in [
            &self.import_render,
            &self.import_compute,
            &self.buffers,
            &self.aabb_tree,
            &self.polyhedron,
            &self.sdf,
            &self.segmentation,
            &self.export,
        ] {
            field.set(0.0);
        }
    }
}
