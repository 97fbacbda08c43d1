pub mod creation;
pub mod region_grow;
pub mod sdf;
pub mod segment;

pub use creation::MakeBox;
pub use region_grow::{normal_angle_below, same_color, RegionGrow, VisitPredicate};
pub use sdf::{ComputeSdf, SdfParams};
pub use segment::{Segment, Segmentation};
