// K shortest loopless paths (Yen-Lawler deviation search)
//
// ============================================================================
// YEN-LAWLER
// ============================================================================
//
// [1] J. Y. Yen, Finding the k shortest loopless paths in a network,
//     Management Science 17(11), 1971, 712-716
// [2] E. L. Lawler, A procedure for computing the k best solutions to
//     discrete optimization problems and its application to the shortest
//     path problem, Management Science 18(7), 1972, 401-405
//
// Every path p we pop from the candidate pool spawns "deviations": for each
// position i (from p's own deviation index on), force a new path that agrees
// with p on seq[0..=i] and then leaves it:
//
//   s ── a ── b ── c ── t        p, deviating at i = 1 (vertex a)
//        │
//        └── x ── y ── t         new suffix from a, computed by Dijkstra
//
// To force the new suffix to differ from everything already ranked:
//   - remove edge (seq[i], seq[i+1]) of every ranked path sharing seq[0..=i]
//   - remove vertices seq[0..i) so the suffix cannot loop back through them
//
// Lawler's refinement: a path derived at position i only needs to deviate at
// positions >= i, because earlier positions were covered by its parent.
//
// All removals happen on a GraphView; the shared graph is never touched.
// ============================================================================

use tracing::{debug, info};

use crate::config::RankerConfig;
use crate::errors::Result;
use crate::graph::{GraphModel, VertexId};
use crate::path::{Path, PathReport};
use crate::shortest_path::shortest_path;

/// Ranks source -> sink paths of a graph by ascending score.
#[derive(Debug, Clone)]
pub struct KShortestPathRanker<'g> {
    graph: &'g GraphModel,
    config: RankerConfig,
}

impl<'g> KShortestPathRanker<'g> {
    pub fn new(graph: &'g GraphModel, config: RankerConfig) -> Self {
        Self { graph, config }
    }

    pub fn config(&self) -> &RankerConfig {
        &self.config
    }

    /// Rank paths between the graph's reserved source and sink.
    ///
    /// # Errors
    /// - `MissingTerminal` if the graph has no source or sink vertex
    /// - `InvalidParameter` if `k` is 0
    pub fn rank(&self) -> Result<Vec<Path>> {
        let (source, sink) = self.graph.terminals()?;
        self.rank_between(source, sink)
    }

    /// Like [`rank`](Self::rank), converted to presentation form.
    pub fn rank_reports(&self) -> Result<Vec<PathReport>> {
        Ok(self
            .rank()?
            .iter()
            .map(|p| p.report(self.graph))
            .collect())
    }

    /// Rank paths between two arbitrary vertices.
    ///
    /// Returns at most `k` paths that pass the acceptance filter, ascending by
    /// score. Fewer paths than requested is not an error.
    pub fn rank_between(&self, source: VertexId, sink: VertexId) -> Result<Vec<Path>> {
        self.config.validate()?;
        let k = self.config.k;

        // Every popped path, accepted or filtered: drives the edge removals
        let mut ranked: Vec<Path> = Vec::new();
        let mut accepted: Vec<Path> = Vec::new();
        let mut pool: Vec<Path> = Vec::new();

        if let Some(first) = shortest_path(&self.graph.view(), source, sink) {
            pool.push(first);
        }

        while accepted.len() < k {
            if pool.is_empty() {
                debug!("Candidate pool exhausted after {} paths", ranked.len());
                break;
            }

            // Stable sort: equal scores keep insertion order
            pool.sort_by(|a, b| a.score.total_cmp(&b.score));
            pool.truncate(k - accepted.len() + 1);

            let p = pool.remove(0);
            ranked.push(p.clone());

            if self.accepts(&p) {
                if self.config.verbose {
                    info!("Path {} accepted (score {:.4}, {} vertices)", accepted.len() + 1, p.score, p.sequence.len());
                }
                accepted.push(p.clone());
            } else {
                debug!("Path filtered (score {:.4}, {} vertices)", p.score, p.sequence.len());
            }

            self.push_deviations(&p, sink, &ranked, &mut pool);
        }

        Ok(accepted)
    }

    /// Acceptance filter: enough interior vertices, and (optionally) a score
    /// larger than twice the first edge weight.
    ///
    /// The second test is a domain heuristic: source/sink connector edges
    /// usually carry the same weight, so a path through a single gene scores
    /// exactly 2 x its first edge.
    fn accepts(&self, p: &Path) -> bool {
        if p.interior_len() <= self.config.min_path_size {
            return false;
        }
        if !self.config.single_hop_guard {
            return true;
        }
        match self.graph.weight(p.sequence[0], p.sequence[1]) {
            Some(first_edge) => p.score > 2.0 * first_edge,
            None => false,
        }
    }

    fn push_deviations(&self, p: &Path, sink: VertexId, ranked: &[Path], pool: &mut Vec<Path>) {
        let seq = &p.sequence;
        let mut prefix_score = 0.0;

        for i in 0..seq.len().saturating_sub(1) {
            if i >= p.deviation {
                let mut view = self.graph.view();

                // edge deletion
                for r in ranked {
                    if r.shares_prefix_through(p, i) {
                        view.remove_edge(r.sequence[i], r.sequence[i + 1]);
                    }
                }
                // vertex deletion
                for &v in &seq[..i] {
                    view.remove_vertex(v);
                }

                if let Some(spur) = shortest_path(&view, seq[i], sink) {
                    let mut sequence = Vec::with_capacity(i + spur.sequence.len());
                    sequence.extend_from_slice(&seq[..i]);
                    sequence.extend_from_slice(&spur.sequence);

                    let candidate = Path {
                        sequence,
                        score: prefix_score + spur.score,
                        deviation: i,
                    };
                    let known = pool
                        .iter()
                        .chain(ranked.iter())
                        .any(|q| q.sequence == candidate.sequence);
                    if !known {
                        pool.push(candidate);
                    }
                }
            }

            prefix_score += self.graph.weight(seq[i], seq[i + 1]).unwrap_or(0.0);
        }
    }
}

/// Convenience wrapper: top-`k` paths with the given minimum path size.
pub fn rank_paths(graph: &GraphModel, k: usize, min_path_size: usize) -> Result<Vec<PathReport>> {
    let config = RankerConfig {
        k,
        min_path_size,
        ..RankerConfig::default()
    };
    KShortestPathRanker::new(graph, config).rank_reports()
}
