pub mod face;
pub mod halfedge;
pub mod vertex;
mod weld;

pub use face::{FaceData, FaceId};
pub use halfedge::{HalfEdgeData, HalfEdgeId};
pub use vertex::{VertexData, VertexId};
pub use weld::weld_vertices;

use std::collections::HashMap;

use slotmap::SlotMap;
use tracing::{debug, warn};

use crate::error::TopologyError;
use crate::geometry::Triangle;
use crate::math::intersect_3d::triangle_normal;
use crate::math::{Point3, Vector3};

/// Adjacency structure derived from the triangle soup.
///
/// Vertices are welded by exact position and every soup triangle becomes one
/// face of a half-edge mesh stored in `slotmap` arenas. Triangle ids and face
/// handles map one-to-one in both directions, so callers only ever see
/// triangle ids.
///
/// A graph whose construction failed is kept around with `valid == false`:
/// it still carries the welded vertex and index tables, but every adjacency
/// query reports no neighbours.
///
/// The graph also owns the per-face SDF table, so rebuilding the graph
/// always discards stale SDF values.
#[derive(Debug, Clone, Default)]
pub struct TopologyGraph {
    vertex_table: Vec<Point3>,
    indices: Vec<[usize; 3]>,
    vertices: SlotMap<VertexId, VertexData>,
    halfedges: SlotMap<HalfEdgeId, HalfEdgeData>,
    faces: SlotMap<FaceId, FaceData>,
    face_of_triangle: Vec<FaceId>,
    valid: bool,
    sdf: Option<Vec<f64>>,
}

impl TopologyGraph {
    /// Builds the graph from a triangle soup, absorbing failures.
    ///
    /// On non-manifold or degenerate input a warning is logged and an
    /// invalid graph is returned.
    #[must_use]
    pub fn build(triangles: &[Triangle]) -> Self {
        let (vertices, indices) = weld_vertices(triangles);
        Self::from_indexed(vertices, indices)
    }

    /// Builds the graph from a triangle soup.
    ///
    /// # Errors
    ///
    /// Returns a [`TopologyError`] describing the first degenerate triangle or
    /// non-manifold edge found.
    pub fn try_build(triangles: &[Triangle]) -> Result<Self, TopologyError> {
        let (vertices, indices) = weld_vertices(triangles);
        Self::try_from_indexed(vertices, indices)
    }

    /// Builds the graph from an already welded vertex table, absorbing
    /// failures into an invalid graph.
    #[must_use]
    pub fn from_indexed(vertices: Vec<Point3>, indices: Vec<[usize; 3]>) -> Self {
        match assemble(&vertices, &indices) {
            Ok(arenas) => Self::with_arenas(vertices, indices, arenas),
            Err(err) => {
                warn!(error = %err, "topology build failed; adjacency disabled");
                Self {
                    vertex_table: vertices,
                    indices,
                    ..Self::default()
                }
            }
        }
    }

    /// Builds the graph from an already welded vertex table.
    ///
    /// # Errors
    ///
    /// Returns [`TopologyError::IndexOutOfRange`] for an index past the vertex
    /// table, [`TopologyError::DegenerateTriangle`] for a triangle with a
    /// repeated vertex, and [`TopologyError::NonManifoldEdge`] for a directed
    /// edge used twice.
    pub fn try_from_indexed(
        vertices: Vec<Point3>,
        indices: Vec<[usize; 3]>,
    ) -> Result<Self, TopologyError> {
        let arenas = assemble(&vertices, &indices)?;
        Ok(Self::with_arenas(vertices, indices, arenas))
    }

    fn with_arenas(vertex_table: Vec<Point3>, indices: Vec<[usize; 3]>, arenas: Arenas) -> Self {
        debug_assert_eq!(arenas.face_of_triangle.len(), indices.len());
        debug!(
            vertices = vertex_table.len(),
            faces = arenas.faces.len(),
            "built topology graph"
        );
        let valid = !indices.is_empty();
        Self {
            vertex_table,
            indices,
            vertices: arenas.vertices,
            halfedges: arenas.halfedges,
            faces: arenas.faces,
            face_of_triangle: arenas.face_of_triangle,
            valid,
            sdf: None,
        }
    }

    /// Returns `true` if the graph was built successfully from a non-empty soup.
    #[must_use]
    pub fn is_valid(&self) -> bool {
        self.valid
    }

    /// Returns `true` if the graph has no faces.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.faces.is_empty()
    }

    /// Number of faces in the half-edge mesh.
    #[must_use]
    pub fn face_count(&self) -> usize {
        self.faces.len()
    }

    /// Number of triangles described by the index table.
    #[must_use]
    pub fn triangle_count(&self) -> usize {
        self.indices.len()
    }

    /// Number of welded vertices.
    #[must_use]
    pub fn vertex_count(&self) -> usize {
        self.vertex_table.len()
    }

    /// Welded vertex positions.
    #[must_use]
    pub fn vertices(&self) -> &[Point3] {
        &self.vertex_table
    }

    /// One welded index triple per triangle.
    #[must_use]
    pub fn indices(&self) -> &[[usize; 3]] {
        &self.indices
    }

    /// Checks that the graph describes exactly `count` triangles.
    ///
    /// # Errors
    ///
    /// Returns [`TopologyError::IndexCountMismatch`] otherwise.
    pub fn check_triangle_count(&self, count: usize) -> Result<(), TopologyError> {
        if self.indices.len() == count {
            Ok(())
        } else {
            Err(TopologyError::IndexCountMismatch {
                indices: self.indices.len(),
                triangles: count,
            })
        }
    }

    /// Face handle of a triangle.
    #[must_use]
    pub fn face_of(&self, triangle: usize) -> Option<FaceId> {
        self.face_of_triangle.get(triangle).copied()
    }

    /// Triangle id of a face handle.
    #[must_use]
    pub fn triangle_of(&self, face: FaceId) -> Option<usize> {
        self.faces.get(face).map(|f| f.triangle)
    }

    /// Neighbours across the three edges of a triangle.
    ///
    /// Slot `k` holds the triangle sharing the edge from corner `k` to corner
    /// `k + 1`, or `None` for a boundary edge. An invalid graph, or a failed
    /// lookup, yields no neighbours.
    #[must_use]
    pub fn neighbours_of(&self, triangle: usize) -> [Option<usize>; 3] {
        self.try_neighbours_of(triangle).unwrap_or([None; 3])
    }

    /// Checked form of [`neighbours_of`](Self::neighbours_of).
    ///
    /// # Errors
    ///
    /// Returns [`TopologyError::Traversal`] when `triangle` has no face or the
    /// half-edge links around it are broken.
    pub fn try_neighbours_of(&self, triangle: usize) -> Result<[Option<usize>; 3], TopologyError> {
        if !self.valid {
            return Ok([None; 3]);
        }

        let fail = |reason: &str| TopologyError::Traversal {
            triangle,
            reason: reason.into(),
        };

        let face = self
            .face_of(triangle)
            .ok_or_else(|| fail("triangle has no face"))?;
        let start = self
            .faces
            .get(face)
            .ok_or_else(|| fail("stale face handle"))?
            .halfedge;

        let mut neighbours = [None; 3];
        let mut current = start;
        for slot in &mut neighbours {
            let he = self
                .halfedges
                .get(current)
                .ok_or_else(|| fail("stale half-edge handle"))?;
            if he.face != face {
                return Err(fail("half-edge cycle leaves its face"));
            }
            if let Some(twin) = he.twin {
                let twin_face = self
                    .halfedges
                    .get(twin)
                    .ok_or_else(|| fail("stale twin handle"))?
                    .face;
                let neighbour = self
                    .triangle_of(twin_face)
                    .ok_or_else(|| fail("twin has no face"))?;
                *slot = Some(neighbour);
            }
            current = he.next;
        }

        if current != start {
            return Err(fail("face cycle is not a triangle"));
        }
        Ok(neighbours)
    }

    /// Unit normal of a triangle computed from its welded corners.
    #[must_use]
    pub fn face_normal(&self, triangle: usize) -> Option<Vector3> {
        let triple = self.indices.get(triangle)?;
        let corners = [
            *self.vertex_table.get(triple[0])?,
            *self.vertex_table.get(triple[1])?,
            *self.vertex_table.get(triple[2])?,
        ];
        triangle_normal(&corners)
    }

    /// Position of a welded vertex handle.
    #[must_use]
    pub fn vertex_point(&self, vertex: VertexId) -> Option<Point3> {
        self.vertices.get(vertex).map(|v| v.point)
    }

    /// Returns `true` once per-face SDF values are available.
    #[must_use]
    pub fn is_sdf_computed(&self) -> bool {
        self.sdf.is_some()
    }

    /// Normalized SDF values indexed by triangle id.
    #[must_use]
    pub fn sdf_values(&self) -> Option<&[f64]> {
        self.sdf.as_deref()
    }

    /// Normalized SDF value of one triangle.
    #[must_use]
    pub fn sdf_value(&self, triangle: usize) -> Option<f64> {
        self.sdf.as_ref()?.get(triangle).copied()
    }

    pub(crate) fn set_sdf_values(&mut self, values: Vec<f64>) {
        debug_assert_eq!(values.len(), self.indices.len());
        self.sdf = Some(values);
    }
}

struct Arenas {
    vertices: SlotMap<VertexId, VertexData>,
    halfedges: SlotMap<HalfEdgeId, HalfEdgeData>,
    faces: SlotMap<FaceId, FaceData>,
    face_of_triangle: Vec<FaceId>,
}

fn assemble(vertex_table: &[Point3], indices: &[[usize; 3]]) -> Result<Arenas, TopologyError> {
    for (triangle, triple) in indices.iter().enumerate() {
        if let Some(&vertex) = triple.iter().find(|&&v| v >= vertex_table.len()) {
            return Err(TopologyError::IndexOutOfRange {
                triangle,
                vertex,
                count: vertex_table.len(),
            });
        }
        let [a, b, c] = *triple;
        if a == b || b == c || a == c {
            return Err(TopologyError::DegenerateTriangle { triangle });
        }
    }

    let mut vertices = SlotMap::with_capacity_and_key(vertex_table.len());
    let vertex_ids: Vec<VertexId> = vertex_table
        .iter()
        .map(|point| vertices.insert(VertexData::new(*point)))
        .collect();

    let mut halfedges: SlotMap<HalfEdgeId, HalfEdgeData> =
        SlotMap::with_capacity_and_key(indices.len() * 3);
    let mut faces: SlotMap<FaceId, FaceData> = SlotMap::with_capacity_and_key(indices.len());
    let mut face_of_triangle = Vec::with_capacity(indices.len());
    let mut directed: HashMap<(usize, usize), HalfEdgeId> = HashMap::with_capacity(indices.len() * 3);

    for (triangle, triple) in indices.iter().enumerate() {
        let face = faces.insert(FaceData {
            halfedge: HalfEdgeId::default(),
            triangle,
        });

        let mut ring = [HalfEdgeId::default(); 3];
        for k in 0..3 {
            let (from, to) = (triple[k], triple[(k + 1) % 3]);
            // A directed edge seen twice means more than two faces on the
            // edge or two faces with opposite winding.
            if directed.contains_key(&(from, to)) {
                return Err(TopologyError::NonManifoldEdge { triangle, from, to });
            }
            let he = halfedges.insert(HalfEdgeData {
                origin: vertex_ids[from],
                face,
                next: HalfEdgeId::default(),
                twin: None,
            });
            directed.insert((from, to), he);
            ring[k] = he;
        }

        for k in 0..3 {
            halfedges[ring[k]].next = ring[(k + 1) % 3];
        }
        faces[face].halfedge = ring[0];
        face_of_triangle.push(face);
    }

    for (&(from, to), &he) in &directed {
        if let Some(&twin) = directed.get(&(to, from)) {
            halfedges[he].twin = Some(twin);
        }
    }

    Ok(Arenas {
        vertices,
        halfedges,
        faces,
        face_of_triangle,
    })
}
