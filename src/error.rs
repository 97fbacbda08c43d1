use thiserror::Error;

/// Top-level error type for the meshpaint core.
#[derive(Debug, Error)]
pub enum MeshError {
    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Topology(#[from] TopologyError),

    #[error(transparent)]
    Segmentation(#[from] SegmentationError),

    #[error(transparent)]
    Serialization(#[from] SerializationError),

    #[error(transparent)]
    Operation(#[from] OperationError),
}

/// Errors raised by the triangle store.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("triangle index {index} is out of range (triangle count {count})")]
    OutOfRange { index: usize, count: usize },

    #[error("malformed triangle list: {0}")]
    Construction(String),
}

/// Errors related to building or walking the topology graph.
#[derive(Debug, Error)]
pub enum TopologyError {
    #[error("triangle {triangle} is degenerate after vertex welding")]
    DegenerateTriangle { triangle: usize },

    #[error("edge {from}->{to} of triangle {triangle} is non-manifold")]
    NonManifoldEdge {
        triangle: usize,
        from: usize,
        to: usize,
    },

    #[error("triangle {triangle} references vertex {vertex}, but only {count} vertices exist")]
    IndexOutOfRange {
        triangle: usize,
        vertex: usize,
        count: usize,
    },

    #[error("index table has {indices} entries for {triangles} triangles")]
    IndexCountMismatch { indices: usize, triangles: usize },

    #[error("adjacency traversal failed at triangle {triangle}: {reason}")]
    Traversal { triangle: usize, reason: String },
}

/// Errors raised by SDF computation and segmentation.
#[derive(Debug, Error)]
pub enum SegmentationError {
    #[error("SDF values must be computed before segmentation")]
    SdfNotComputed,

    #[error("topology graph is empty or invalid")]
    InvalidTopology,

    #[error("invalid segmentation parameters: {0}")]
    InvalidParameters(String),
}

/// Errors related to snapshots and the persisted project record.
#[derive(Debug, Error)]
pub enum SerializationError {
    #[error("section `{0}` is empty")]
    EmptySection(&'static str),

    #[error("inconsistent record: {0}")]
    Inconsistent(String),

    #[error("failed to encode project: {0}")]
    Encode(String),

    #[error("failed to decode project: {0}")]
    Decode(String),
}

/// Errors related to mesh-building operations.
#[derive(Debug, Error)]
pub enum OperationError {
    #[error("invalid input: {0}")]
    InvalidInput(String),
}

/// Convenience type alias for results using [`MeshError`].
pub type Result<T> = std::result::Result<T, MeshError>;
