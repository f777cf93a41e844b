// Single-source shortest paths (Dijkstra) over a GraphView
//
// ============================================================================
// DIJKSTRA
// ============================================================================
//
// 1. dist[source] = 0, every other vertex = infinity ("unreachable")
// 2. Pop the unsettled vertex u with the smallest distance
// 3. Relax each surviving out-edge:  if dist[v] > dist[u] + w(u,v) then
//       dist[v] = dist[u] + w(u,v);  pred[v] = u;  decrease-key(v)
// 4. Repeat until the heap is empty
//
// Requires non-negative weights (GraphModel rejects anything else).
// Ties: the heap orders equal distances by vertex handle, so results are
// deterministic for a given graph.
//
// Time complexity: O((V + E) log V)
// ============================================================================

use crate::graph::{GraphView, VertexId};
use crate::heap::IndexedMinHeap;
use crate::path::Path;

/// Distances and predecessors from one source vertex.
#[derive(Debug, Clone)]
pub struct ShortestPathTree {
    source: VertexId,
    distance: Vec<f64>,
    predecessor: Vec<Option<VertexId>>,
}

impl ShortestPathTree {
    pub fn source(&self) -> VertexId {
        self.source
    }

    /// Distance to `v`, `f64::INFINITY` if unreachable.
    pub fn distance(&self, v: VertexId) -> f64 {
        self.distance.get(v.index()).copied().unwrap_or(f64::INFINITY)
    }

    pub fn is_reachable(&self, v: VertexId) -> bool {
        self.distance(v).is_finite()
    }

    pub fn predecessor(&self, v: VertexId) -> Option<VertexId> {
        self.predecessor.get(v.index()).copied().flatten()
    }

    /// Reconstruct the path source -> `target`, walking predecessors back
    /// from the target and reversing.
    pub fn path_to(&self, target: VertexId) -> Option<Path> {
        if !self.is_reachable(target) {
            return None;
        }

        let mut sequence = vec![target];
        let mut current = target;
        while current != self.source {
            current = self.predecessor(current)?;
            sequence.push(current);
        }
        sequence.reverse();

        Some(Path::new(sequence, self.distance(target)))
    }
}

/// Run Dijkstra from `source` over every vertex of the view.
pub fn dijkstra(view: &GraphView<'_>, source: VertexId) -> ShortestPathTree {
    let n = view.graph().vertex_count();
    let mut distance = vec![f64::INFINITY; n];
    let mut predecessor: Vec<Option<VertexId>> = vec![None; n];
    let mut settled = vec![false; n];

    if source.index() >= n || view.is_vertex_removed(source) {
        return ShortestPathTree {
            source,
            distance,
            predecessor,
        };
    }

    let mut heap = IndexedMinHeap::new(n);
    distance[source.index()] = 0.0;
    heap.push_or_decrease(source.index(), 0.0);

    while let Some((u, dist_u)) = heap.pop() {
        settled[u] = true;
        let u_id = VertexId::new(u);

        for (v, weight) in view.out_edges(u_id) {
            let vi = v.index();
            if settled[vi] {
                continue;
            }
            let rhs = dist_u + weight;
            // edge relaxation
            if distance[vi] > rhs {
                distance[vi] = rhs;
                predecessor[vi] = Some(u_id);
                heap.push_or_decrease(vi, rhs);
            }
        }
    }

    ShortestPathTree {
        source,
        distance,
        predecessor,
    }
}

/// Shortest path `source -> target` in the view, or None if unreachable.
pub fn shortest_path(view: &GraphView<'_>, source: VertexId, target: VertexId) -> Option<Path> {
    dijkstra(view, source).path_to(target)
}
