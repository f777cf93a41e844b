// Significance scope: which sink predecessors have a significantly short path
//
// ============================================================================
// LENGTH-LAYERED SHORTEST PATHS
// ============================================================================
//
// Plain Dijkstra finds the best path regardless of length, but a p-value is
// only meaningful against random paths of the SAME length. So we compute, for
// every vertex v and every length L, the best loopless path source -> v with
// exactly L edges:
//
//   best[source][0] = 0
//   best[v][L + 1]  = min over edges (u, v) of best[u][L] + w(u, v)
//                     where v is not already on the chain behind best[u][L]
//
// Layout: one flat array, slot (v, L) at v * (max_length + 1) + L.
//
//           L=0   L=1   L=2   L=3
//   s       0.0    -     -     -
//   a        -    1.0    -    3.5
//   b        -    2.0   2.0    -
//
// The loopless check walks the predecessor chain of (u, L) back to the
// source; the chain is only as good as the greedy choice per slot, so this is
// a heuristic for "shortest loopless path of length L", not an exact one.
// ============================================================================

use rand::Rng;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::config::ScopeConfig;
use crate::errors::Result;
use crate::graph::{GraphModel, VertexId};
use crate::path::{Path, PathReport};
use crate::sampler::{random_edge_table, NullScoreTable};

/// Best path score per (vertex, exact length) from one source.
#[derive(Debug, Clone)]
pub struct LayeredShortestPaths {
    source: VertexId,
    max_length: usize,
    scores: Vec<f64>,
    predecessors: Vec<Option<VertexId>>,
}

impl LayeredShortestPaths {
    /// Fill every layer `0..=max_length` from `source`.
    pub fn compute(graph: &GraphModel, source: VertexId, max_length: usize) -> Self {
        let n = graph.vertex_count();
        let width = max_length + 1;
        let mut layers = Self {
            source,
            max_length,
            scores: vec![f64::INFINITY; n * width],
            predecessors: vec![None; n * width],
        };
        if source.index() >= n {
            return layers;
        }
        layers.scores[source.index() * width] = 0.0;

        for length in 0..max_length {
            for u in graph.vertices() {
                let base = layers.scores[layers.slot(u, length)];
                if !base.is_finite() {
                    continue;
                }
                for (_, v, data) in graph.out_edges(u) {
                    if layers.on_chain(v, u, length) {
                        continue;
                    }
                    let rhs = base + data.weight;
                    let slot = layers.slot(v, length + 1);
                    if rhs < layers.scores[slot] {
                        layers.scores[slot] = rhs;
                        layers.predecessors[slot] = Some(u);
                    }
                }
            }
        }

        layers
    }

    pub fn source(&self) -> VertexId {
        self.source
    }

    pub fn max_length(&self) -> usize {
        self.max_length
    }

    /// Best score of a path with exactly `length` edges ending at `v`.
    pub fn score(&self, v: VertexId, length: usize) -> Option<f64> {
        if length > self.max_length {
            return None;
        }
        self.scores
            .get(self.slot(v, length))
            .copied()
            .filter(|s| s.is_finite())
    }

    /// The path behind [`score`](Self::score), source first.
    pub fn path(&self, v: VertexId, length: usize) -> Option<Path> {
        let score = self.score(v, length)?;
        let mut sequence = Vec::with_capacity(length + 1);
        let mut current = v;
        sequence.push(current);
        for l in (1..=length).rev() {
            current = self.predecessors[self.slot(current, l)]?;
            sequence.push(current);
        }
        sequence.reverse();
        Some(Path::new(sequence, score))
    }

    fn slot(&self, v: VertexId, length: usize) -> usize {
        v.index() * (self.max_length + 1) + length
    }

    /// True if `v` is `u` or lies on the chain behind slot (u, length).
    fn on_chain(&self, v: VertexId, u: VertexId, length: usize) -> bool {
        let mut current = u;
        let mut l = length;
        loop {
            if current == v {
                return true;
            }
            if l == 0 {
                return false;
            }
            match self.predecessors[self.slot(current, l)] {
                Some(p) => current = p,
                None => return false,
            }
            l -= 1;
        }
    }
}

/// Significant paths found by a scope query.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ScopeResult {
    /// One path per reached target, in target order
    pub paths: Vec<PathReport>,
    /// Names of the reached targets
    pub scope: Vec<String>,
}

/// Finds the sink predecessors that are significantly close to the source.
#[derive(Debug, Clone)]
pub struct ScopeEngine<'g> {
    graph: &'g GraphModel,
    config: ScopeConfig,
}

impl<'g> ScopeEngine<'g> {
    pub fn new(graph: &'g GraphModel, config: ScopeConfig) -> Self {
        Self { graph, config }
    }

    pub fn config(&self) -> &ScopeConfig {
        &self.config
    }

    /// Vertices with an edge into the sink, in handle order.
    pub fn targets(&self) -> Result<Vec<VertexId>> {
        let (_, sink) = self.graph.terminals()?;
        Ok(self
            .graph
            .vertices()
            .filter(|&v| v != sink && self.graph.edge(v, sink).is_some())
            .collect())
    }

    /// Run the query against a precomputed null table.
    ///
    /// # Errors
    /// - `MissingTerminal` if the graph has no source or sink
    /// - `InvalidParameter` for an invalid config
    pub fn run(&self, table: &NullScoreTable) -> Result<ScopeResult> {
        self.config.validate()?;
        let (source, _) = self.graph.terminals()?;
        let targets = self.targets()?;

        let max_length = table
            .max_length()
            .min(self.graph.vertex_count().saturating_sub(1));
        let layers = LayeredShortestPaths::compute(self.graph, source, max_length);

        if self.config.echo {
            info!("There are {} nodes in the neighborhood", targets.len());
        }

        let mut result = ScopeResult::default();
        for (i, &target) in targets.iter().enumerate() {
            let name = self.graph.vertex_name(target);
            if self.config.echo {
                info!("TARGET: {} {}/{}", name, i + 1, targets.len());
            }
            if result.scope.iter().any(|reached| reached == name) {
                if self.config.echo {
                    info!("Already found a path to {}", name);
                }
                continue;
            }

            match self.significant_path(&layers, table, target) {
                Some(report) => {
                    if self.config.echo {
                        info!("Found a path to {}", name);
                    }
                    result.paths.push(report);
                    result.scope.push(name.to_string());
                }
                None => {
                    if self.config.echo {
                        info!("Node {} out of scope", name);
                    }
                }
            }
        }

        info!(
            "{} of {} targets in scope",
            result.scope.len(),
            targets.len()
        );
        Ok(result)
    }

    /// Run with `table` if given, otherwise with a random-edge null table
    /// sampled up to `|V| - 1` edges.
    pub fn run_with<R: Rng + ?Sized>(&self, table: Option<&NullScoreTable>, rng: &mut R) -> Result<ScopeResult> {
        match table {
            Some(table) => self.run(table),
            None => self.run_with_fallback(rng),
        }
    }

    /// Sample a random-edge null table (`fallback_samples` per length) and
    /// run against it.
    pub fn run_with_fallback<R: Rng + ?Sized>(&self, rng: &mut R) -> Result<ScopeResult> {
        self.config.validate()?;
        self.graph.terminals()?;
        if self.targets()?.is_empty() {
            debug!("Sink has no predecessors, nothing to sample for");
            return Ok(ScopeResult::default());
        }
        let max_length = self.fallback_length();
        debug!(
            "No null table supplied, sampling {} random-edge scores up to length {}",
            self.config.fallback_samples, max_length
        );
        let table = random_edge_table(self.graph, max_length, self.config.fallback_samples, rng)?;
        self.run(&table)
    }

    /// Longest length `run` can read: a loopless path has at most `|V| - 1`
    /// edges.
    fn fallback_length(&self) -> usize {
        self.graph.vertex_count().saturating_sub(1).max(1)
    }

    /// Shortest significant path to `target`, trying lengths in order.
    fn significant_path(
        &self,
        layers: &LayeredShortestPaths,
        table: &NullScoreTable,
        target: VertexId,
    ) -> Option<PathReport> {
        for length in 1..=layers.max_length() {
            let Some(score) = layers.score(target, length) else {
                continue;
            };
            let Ok(pvalue) = table.p_value(score, length) else {
                break;
            };
            debug!(
                "{}: length {} score {:.4} p-value {:.4}",
                self.graph.vertex_name(target),
                length,
                score,
                pvalue
            );

            if pvalue < self.config.alpha {
                let path = layers.path(target, length)?;
                return Some(path.report(self.graph).with_pvalue(pvalue));
            }
            if pvalue > self.config.abandon_pvalue {
                break;
            }
        }
        None
    }
}
