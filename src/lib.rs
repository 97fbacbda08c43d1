pub mod error;
pub mod geometry;
pub mod math;
pub mod model;
pub mod operations;
pub mod palette;
pub mod progress;
pub mod spatial;
pub mod state;
pub mod store;
pub mod topology;

#[cfg(test)]
mod test_meshes;

pub use error::{MeshError, Result};
pub use geometry::{Aabb, ColorIndex, Ray, Triangle};
pub use model::MeshModel;
pub use palette::{Color, Palette};
pub use progress::Progress;
pub use spatial::SpatialIndex;
pub use state::{ProjectRecord, Snapshot};
pub use store::TriangleMeshStore;
pub use topology::TopologyGraph;
