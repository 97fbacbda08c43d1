use std::io::{Read, Write};
use std::sync::Arc;

use tracing::info;

use crate::error::{Result, SegmentationError};
use crate::geometry::{ColorIndex, Ray, Triangle};
use crate::math::Point3;
use crate::operations::region_grow::RegionGrow;
use crate::operations::sdf::{ComputeSdf, SdfParams};
use crate::operations::segment::{Segment, Segmentation};
use crate::palette::Palette;
use crate::progress::Progress;
use crate::spatial::SpatialIndex;
use crate::state::{ProjectRecord, Snapshot};
use crate::store::TriangleMeshStore;
use crate::topology::TopologyGraph;

/// A paintable mesh with its derived structures.
///
/// The store is the source of truth. The spatial index is rebuilt whenever
/// the soup is replaced; the topology graph, and the SDF values it carries,
/// are dropped at the same time and rebuilt lazily on the next query that
/// needs adjacency. Color edits touch neither.
///
/// Mutating calls must be serialized by the caller. Long jobs report through
/// [`MeshModel::progress`], which may be polled from another thread.
#[derive(Debug)]
pub struct MeshModel {
    store: TriangleMeshStore,
    spatial: SpatialIndex,
    topology: Option<TopologyGraph>,
    palette: Palette,
    progress: Arc<Progress>,
}

impl MeshModel {
    /// Creates a model from an imported triangle soup and the default palette.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Construction`](crate::error::StoreError::Construction)
    /// for a malformed soup.
    pub fn new(triangles: Vec<Triangle>) -> Result<Self> {
        let progress = Arc::new(Progress::new());
        let (store, spatial) = build_derived(triangles, &progress)?;
        progress.import_render.set(1.0);
        info!(triangles = store.triangle_count(), "mesh model created");
        Ok(Self {
            store,
            spatial,
            topology: None,
            palette: Palette::default(),
            progress,
        })
    }

    /// Creates a model with no triangles and the default palette.
    #[must_use]
    pub fn empty() -> Self {
        Self {
            store: TriangleMeshStore::empty(),
            spatial: SpatialIndex::default(),
            topology: None,
            palette: Palette::default(),
            progress: Arc::new(Progress::new()),
        }
    }

    /// The triangle store and its render buffers.
    #[must_use]
    pub fn store(&self) -> &TriangleMeshStore {
        &self.store
    }

    /// The color table the stored color ids refer to.
    #[must_use]
    pub fn palette(&self) -> &Palette {
        &self.palette
    }

    /// Mutable access to the color table; no derived state depends on it.
    pub fn palette_mut(&mut self) -> &mut Palette {
        &mut self.palette
    }

    /// Shared handle to the progress values of this model.
    #[must_use]
    pub fn progress(&self) -> Arc<Progress> {
        Arc::clone(&self.progress)
    }

    /// Recolors one triangle. Derived structures are left untouched.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::OutOfRange`](crate::error::StoreError::OutOfRange)
    /// for an unknown id.
    pub fn set_triangle_color(&mut self, id: usize, color: ColorIndex) -> Result<()> {
        self.store.set_triangle_color(id, color)
    }

    /// Id of the first triangle hit by the ray.
    #[must_use]
    pub fn intersect_mesh(&self, ray: &Ray) -> Option<usize> {
        self.spatial.intersect_ray(ray)
    }

    /// Minimum corner of the mesh bounds, or the origin for an empty model.
    #[must_use]
    pub fn bounding_box_min(&self) -> Point3 {
        self.spatial.bounding_box_min()
    }

    /// Maximum corner of the mesh bounds, or the origin for an empty model.
    #[must_use]
    pub fn bounding_box_max(&self) -> Point3 {
        self.spatial.bounding_box_max()
    }

    /// The topology graph, built on first use.
    pub fn topology(&mut self) -> &TopologyGraph {
        self.ensure_topology()
    }

    /// Discards the topology graph and its SDF values and builds it anew.
    pub fn rebuild_topology(&mut self) -> &TopologyGraph {
        self.topology = None;
        self.ensure_topology()
    }

    /// Returns `true` if the soup forms a valid, non-empty half-edge mesh.
    pub fn polyhedron_valid(&mut self) -> bool {
        self.ensure_topology().is_valid()
    }

    /// Grows a region over the mesh adjacency from `seeds`.
    ///
    /// `should_visit` is called as `(store, candidate, from)`. The reached
    /// triangles are returned in visiting order; coloring them is up to the
    /// caller.
    ///
    /// # Errors
    ///
    /// Returns [`TopologyError::Traversal`](crate::error::TopologyError::Traversal)
    /// if the adjacency walk breaks down.
    pub fn bucket<F>(
        &mut self,
        seeds: impl IntoIterator<Item = usize>,
        should_visit: F,
    ) -> Result<Vec<usize>>
    where
        F: Fn(&TriangleMeshStore, usize, usize) -> bool,
    {
        let store = &self.store;
        let graph = lazy_topology(&mut self.topology, store, &self.progress);
        RegionGrow::new(seeds).execute(graph, &|candidate, from| {
            should_visit(store, candidate, from)
        })
    }

    /// Computes SDF values with default parameters.
    ///
    /// # Errors
    ///
    /// See [`MeshModel::compute_sdf_with`].
    pub fn compute_sdf(&mut self) -> Result<()> {
        self.compute_sdf_with(SdfParams::default())
    }

    /// Computes SDF values for every triangle.
    ///
    /// # Errors
    ///
    /// Returns [`SegmentationError::InvalidTopology`] if the mesh is empty or
    /// not a valid half-edge mesh, and
    /// [`SegmentationError::InvalidParameters`] for unusable parameters.
    pub fn compute_sdf_with(&mut self, params: SdfParams) -> Result<()> {
        self.progress.sdf.set(0.0);
        let graph = lazy_topology(&mut self.topology, &self.store, &self.progress);
        ComputeSdf::new(params).execute(
            graph,
            &self.spatial,
            self.store.triangles(),
            Some(&self.progress),
        )
    }

    /// Returns `true` once SDF values are available for the current soup.
    #[must_use]
    pub fn is_sdf_computed(&self) -> bool {
        self.topology
            .as_ref()
            .is_some_and(TopologyGraph::is_sdf_computed)
    }

    /// Normalized SDF value of one triangle.
    #[must_use]
    pub fn sdf_value(&self, id: usize) -> Option<f64> {
        self.topology.as_ref()?.sdf_value(id)
    }

    /// Segments the mesh by thickness.
    ///
    /// # Errors
    ///
    /// Returns [`SegmentationError::SdfNotComputed`] before
    /// [`MeshModel::compute_sdf`] and
    /// [`SegmentationError::InvalidParameters`] for unusable parameters.
    pub fn segmentation(
        &self,
        number_of_clusters: usize,
        smoothing_lambda: f64,
    ) -> Result<Segmentation> {
        let graph = self
            .topology
            .as_ref()
            .ok_or(SegmentationError::SdfNotComputed)?;
        self.progress.segmentation.set(0.0);
        let segmentation = Segment::new(number_of_clusters, smoothing_lambda).execute(graph)?;
        self.progress.segmentation.set(1.0);
        Ok(segmentation)
    }

    /// Captures palette and soup for a history manager.
    #[must_use]
    pub fn save_state(&self) -> Snapshot {
        Snapshot::new(self.palette.clone(), self.store.triangles().to_vec())
    }

    /// Replaces palette and soup with a snapshot.
    ///
    /// All buffers and the spatial index are rebuilt, the topology graph is
    /// dropped, and progress restarts from zero. On error the model is left
    /// unchanged.
    ///
    /// # Errors
    ///
    /// Returns [`SerializationError::EmptySection`](crate::error::SerializationError::EmptySection)
    /// for a half-empty snapshot and
    /// [`StoreError::Construction`](crate::error::StoreError::Construction)
    /// for a malformed soup.
    pub fn load_state(&mut self, snapshot: &Snapshot) -> Result<()> {
        snapshot.validate()?;
        let (palette, triangles) = snapshot.clone().into_parts();

        self.progress.reset_load();
        let (store, spatial) = build_derived(triangles, &self.progress)?;
        self.store = store;
        self.spatial = spatial;
        self.topology = None;
        self.palette = palette;
        self.progress.import_render.set(1.0);

        info!(triangles = self.store.triangle_count(), "state loaded");
        Ok(())
    }

    /// Writes the model as a project record.
    ///
    /// # Errors
    ///
    /// Returns a [`SerializationError`](crate::error::SerializationError) for
    /// an empty model or when encoding fails.
    pub fn write_project<W: Write>(&mut self, writer: &mut W) -> Result<()> {
        self.progress.export.set(0.0);
        let graph = lazy_topology(&mut self.topology, &self.store, &self.progress);
        let (vertices, indices) = (graph.vertices().to_vec(), graph.indices().to_vec());
        let record = ProjectRecord::new(
            self.palette.clone(),
            self.store.triangles().to_vec(),
            vertices,
            indices,
        )?;
        record.write_to(writer)?;
        self.progress.export.set(1.0);
        info!(
            triangles = record.triangles().len(),
            vertices = record.vertices().len(),
            "project written"
        );
        Ok(())
    }

    /// Replaces the model with a project record.
    ///
    /// The topology graph is restored from the stored vertex and index
    /// tables rather than welded again. On error the model is left unchanged
    /// apart from its progress values.
    ///
    /// # Errors
    ///
    /// Returns a [`SerializationError`](crate::error::SerializationError) for
    /// malformed or incomplete data,
    /// [`StoreError::Construction`](crate::error::StoreError::Construction)
    /// for a malformed soup and
    /// [`TopologyError::IndexCountMismatch`](crate::error::TopologyError::IndexCountMismatch)
    /// if the restored graph does not cover the soup.
    pub fn read_project<R: Read>(&mut self, reader: &mut R) -> Result<()> {
        self.progress.reset_load();
        let (palette, triangles, vertices, indices) =
            ProjectRecord::read_from(reader)?.into_parts();

        let (store, spatial) = build_derived(triangles, &self.progress)?;
        let topology = TopologyGraph::from_indexed(vertices, indices);
        topology.check_triangle_count(store.triangle_count())?;
        self.progress.polyhedron.set(1.0);

        self.store = store;
        self.spatial = spatial;
        self.topology = Some(topology);
        self.palette = palette;
        self.progress.import_render.set(1.0);
        self.progress.import_compute.set(1.0);

        info!(triangles = self.store.triangle_count(), "project loaded");
        Ok(())
    }

    fn ensure_topology(&mut self) -> &TopologyGraph {
        lazy_topology(&mut self.topology, &self.store, &self.progress)
    }
}

/// Returns the graph in `slot`, building it from the store first if needed.
fn lazy_topology<'a>(
    slot: &'a mut Option<TopologyGraph>,
    store: &TriangleMeshStore,
    progress: &Progress,
) -> &'a mut TopologyGraph {
    slot.get_or_insert_with(|| {
        progress.polyhedron.set(0.0);
        let graph = TopologyGraph::build(store.triangles());
        debug_assert!(graph.check_triangle_count(store.triangle_count()).is_ok());
        progress.polyhedron.set(1.0);
        progress.import_compute.set(1.0);
        info!(
            faces = graph.face_count(),
            valid = graph.is_valid(),
            "topology graph ready"
        );
        graph
    })
}

impl Default for MeshModel {
    fn default() -> Self {
        Self::empty()
    }
}

/// Builds the store and the spatial index for a soup.
fn build_derived(
    triangles: Vec<Triangle>,
    progress: &Progress,
) -> Result<(TriangleMeshStore, SpatialIndex)> {
    progress.buffers.set(0.0);
    let store = TriangleMeshStore::new(triangles)?;
    progress.buffers.set(1.0);

    progress.aabb_tree.set(0.0);
    let spatial = SpatialIndex::build(store.triangles());
    progress.aabb_tree.set(1.0);
    Ok((store, spatial))
}
