pub mod bounds;
pub mod ray;
pub mod triangle;

pub use bounds::Aabb;
pub use ray::Ray;
pub use triangle::{ColorIndex, Triangle};
