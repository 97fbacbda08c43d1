use std::collections::{HashSet, VecDeque};

use tracing::{debug, error};

use crate::error::Result;
use crate::store::TriangleMeshStore;
use crate::topology::TopologyGraph;

/// Decides whether traversal may step from `from` onto `candidate`.
///
/// Called as `predicate(candidate, from)`.
pub type VisitPredicate<'a> = dyn Fn(usize, usize) -> bool + 'a;

/// Breadth-first region growing over triangle adjacency.
///
/// All seeds start in the queue at once, in the order given. A neighbour is
/// visited only if the predicate accepts the step from the triangle it was
/// reached from. Used for bucket-fill painting and for splitting labels into
/// connected segments.
pub struct RegionGrow {
    seeds: Vec<usize>,
}

impl RegionGrow {
    /// Creates a new `RegionGrow` operation.
    #[must_use]
    pub fn new(seeds: impl IntoIterator<Item = usize>) -> Self {
        Self {
            seeds: seeds.into_iter().collect(),
        }
    }

    /// Creates a region growing from a single triangle.
    #[must_use]
    pub fn from_seed(seed: usize) -> Self {
        Self { seeds: vec![seed] }
    }

    /// Executes the traversal and returns reached triangles in visiting order.
    ///
    /// The result holds every seed and no duplicates. An empty or invalid
    /// graph yields an empty result.
    ///
    /// # Errors
    ///
    /// Returns [`TopologyError::Traversal`](crate::error::TopologyError::Traversal)
    /// if an adjacency lookup fails mid-traversal; no partial result is
    /// returned in that case.
    pub fn execute(
        &self,
        graph: &TopologyGraph,
        should_visit: &VisitPredicate<'_>,
    ) -> Result<Vec<usize>> {
        if graph.is_empty() || !graph.is_valid() {
            return Ok(Vec::new());
        }

        let mut visited: HashSet<usize> = HashSet::with_capacity(self.seeds.len());
        let mut queue: VecDeque<usize> = VecDeque::with_capacity(self.seeds.len());
        for &seed in &self.seeds {
            if visited.insert(seed) {
                queue.push_back(seed);
            }
        }

        let mut reached = Vec::with_capacity(queue.len());
        while let Some(current) = queue.pop_front() {
            let neighbours = graph.try_neighbours_of(current).inspect_err(|err| {
                error!(triangle = current, error = %err, "region growing aborted");
            })?;

            for neighbour in neighbours.into_iter().flatten() {
                if !visited.contains(&neighbour) && should_visit(neighbour, current) {
                    visited.insert(neighbour);
                    queue.push_back(neighbour);
                }
            }

            reached.push(current);
        }

        debug!(
            seeds = self.seeds.len(),
            reached = reached.len(),
            "region growing finished"
        );
        Ok(reached)
    }
}

/// Accepts a step when both triangles carry the same color id.
pub fn same_color(store: &TriangleMeshStore) -> impl Fn(usize, usize) -> bool + '_ {
    move |candidate, from| match (store.triangle(candidate), store.triangle(from)) {
        (Ok(a), Ok(b)) => a.color() == b.color(),
        _ => false,
    }
}

/// Accepts a step when the normals of both triangles differ by less than
/// `max_angle` radians.
pub fn normal_angle_below(
    store: &TriangleMeshStore,
    max_angle: f64,
) -> impl Fn(usize, usize) -> bool + '_ {
    move |candidate, from| {
        let (Ok(a), Ok(b)) = (store.triangle(candidate), store.triangle(from)) else {
            return false;
        };
        match (a.unit_normal(), b.unit_normal()) {
            (Some(na), Some(nb)) => na.dot(&nb).clamp(-1.0, 1.0).acos() < max_angle,
            _ => false,
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::f64::consts::FRAC_PI_4;

    use super::*;
    use crate::error::{MeshError, TopologyError};
    use crate::test_meshes::{cuboid, fin, open_pair, p, unit_cube};

    fn cube_graph() -> TopologyGraph {
        TopologyGraph::build(&unit_cube())
    }

    #[test]
    fn always_true_reaches_whole_cube() {
        let graph = cube_graph();
        let reached = RegionGrow::from_seed(5).execute(&graph, &|_, _| true).unwrap();
        assert_eq!(reached.len(), 12);
        assert_eq!(reached[0], 5);
        let unique: HashSet<usize> = reached.iter().copied().collect();
        assert_eq!(unique.len(), 12);
    }

    #[test]
    fn always_false_returns_only_seed() {
        let graph = cube_graph();
        let reached = RegionGrow::from_seed(7).execute(&graph, &|_, _| false).unwrap();
        assert_eq!(reached, vec![7]);
    }

    #[test]
    fn all_seeds_are_included_once() {
        let graph = cube_graph();
        let reached = RegionGrow::new([3, 9, 3])
            .execute(&graph, &|_, _| false)
            .unwrap();
        assert_eq!(reached, vec![3, 9]);
    }

    #[test]
    fn invalid_graph_yields_nothing() {
        let graph = TopologyGraph::build(&fin());
        let reached = RegionGrow::from_seed(0).execute(&graph, &|_, _| true).unwrap();
        assert!(reached.is_empty());

        let empty = TopologyGraph::build(&[]);
        assert!(RegionGrow::from_seed(0)
            .execute(&empty, &|_, _| true)
            .unwrap()
            .is_empty());
    }

    #[test]
    fn unknown_seed_aborts_traversal() {
        let graph = cube_graph();
        let err = RegionGrow::new([0, 99])
            .execute(&graph, &|_, _| true)
            .unwrap_err();
        assert!(matches!(
            err,
            MeshError::Topology(TopologyError::Traversal { triangle: 99, .. })
        ));
    }

    #[test]
    fn predicate_receives_source_triangle() {
        let graph = TopologyGraph::build(&open_pair());
        let calls = std::cell::RefCell::new(Vec::new());
        let reached = RegionGrow::from_seed(0)
            .execute(&graph, &|candidate, from| {
                calls.borrow_mut().push((candidate, from));
                true
            })
            .unwrap();
        assert_eq!(reached, vec![0, 1]);
        assert_eq!(calls.into_inner(), vec![(1, 0)]);
    }

    #[test]
    fn same_color_stops_at_color_border() {
        let mut store = TriangleMeshStore::new(unit_cube()).unwrap();
        // Paint the top face pair.
        store.set_triangle_color(2, 1).unwrap();
        store.set_triangle_color(3, 1).unwrap();
        let graph = TopologyGraph::build(store.triangles());

        let mut top = RegionGrow::from_seed(2)
            .execute(&graph, &same_color(&store))
            .unwrap();
        top.sort_unstable();
        assert_eq!(top, vec![2, 3]);

        let rest = RegionGrow::from_seed(0)
            .execute(&graph, &same_color(&store))
            .unwrap();
        assert_eq!(rest.len(), 10);
    }

    #[test]
    fn normal_angle_keeps_to_one_side() {
        let store = TriangleMeshStore::new(cuboid(p(0.0, 0.0, 0.0), p(2.0, 2.0, 2.0), 0)).unwrap();
        let graph = TopologyGraph::build(store.triangles());
        let mut side = RegionGrow::from_seed(4)
            .execute(&graph, &normal_angle_below(&store, FRAC_PI_4))
            .unwrap();
        side.sort_unstable();
        assert_eq!(side, vec![4, 5]);
    }
}
