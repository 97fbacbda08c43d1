use super::face::FaceId;
use super::vertex::VertexId;

slotmap::new_key_type! {
    /// Unique identifier for a half-edge in the topology graph.
    pub struct HalfEdgeId;
}

/// One directed side of a mesh edge.
///
/// The three half-edges of a face form a cycle through `next`. `twin` is the
/// opposite half-edge of the neighbouring face, or `None` on a boundary.
#[derive(Debug, Clone)]
pub struct HalfEdgeData {
    /// Vertex this half-edge starts at.
    pub origin: VertexId,
    /// Face this half-edge bounds.
    pub face: FaceId,
    /// Next half-edge around `face`.
    pub next: HalfEdgeId,
    /// Opposite half-edge, if the edge is interior.
    pub twin: Option<HalfEdgeId>,
}
