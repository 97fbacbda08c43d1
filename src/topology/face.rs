use super::halfedge::HalfEdgeId;

slotmap::new_key_type! {
    /// Unique identifier for a face in the topology graph.
    pub struct FaceId;
}

/// Data associated with a topological face.
#[derive(Debug, Clone)]
pub struct FaceData {
    /// Half-edge running from corner 0 to corner 1 of the triangle.
    pub halfedge: HalfEdgeId,
    /// Id of the soup triangle this face was built from.
    pub triangle: usize,
}
