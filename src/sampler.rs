// Null-distribution sampling of path scores
//
// To call a path "significant" we need to know what scores random paths of
// the same length get. This module draws those scores, per length, and keeps
// them sorted so p-values are a binary search away.
//
// ============================================================================
// METROPOLIS RANDOM-WALK SAMPLING
// ============================================================================
//
// Target: the uniform distribution over loopless walks with L edges.
// Proposal: a random walk that, at each step, picks uniformly among the
// out-neighbours not yet on the walk. A walk w is proposed with probability
//
//   q(w) = Π 1 / (#unvisited out-neighbours at step i)
//
// which is NOT uniform (vertices with few neighbours are over-proposed), so
// we run an independence Metropolis-Hastings chain:
//
//   accept w' over w with probability  min(1, q(w) / q(w'))
//
// Walks that hit a dead end (no unvisited out-neighbour) are rejected and
// rebuilt. The running failure count corrects the proposal probability by
// (1 - failures / recorded) while failures < recorded.
//
// The chain runs warmup_steps x sample_count iterations. Every
// warmup_steps-th iteration records the current score and restarts the
// chain, so the next proposal is always accepted.
//
// ============================================================================
// RANDOM-EDGE SAMPLING
// ============================================================================
//
// Cheaper and statistically weaker: a "path" of length L is the sum of L
// edge weights drawn uniformly (with replacement) from all edges.
// ============================================================================

use rand::Rng;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::config::{SamplerConfig, SamplingStrategy};
use crate::errors::{PathRankError, Result};
use crate::graph::{GraphModel, VertexId};
use crate::significance::p_value_unchecked;

// ============================================================================
// NULL SCORE TABLE
// ============================================================================

/// Sorted sampled scores per path length (length = number of edges, >= 1).
///
/// Serializes as a list of columns, column `i` holding the samples of length
/// `i + 1`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Vec<Vec<f64>>", into = "Vec<Vec<f64>>")]
pub struct NullScoreTable {
    columns: Vec<Vec<f64>>,
}

impl NullScoreTable {
    /// Build from externally sampled columns (column `i` = length `i + 1`).
    /// Columns are sorted on the way in.
    ///
    /// # Errors
    /// - `InvalidParameter` if there are no columns or a column is empty
    /// - `LengthMismatch` if columns differ in size
    /// - `InvalidParameter` if a sample is NaN
    pub fn from_columns(mut columns: Vec<Vec<f64>>) -> Result<Self> {
        let Some(first) = columns.first() else {
            return Err(PathRankError::InvalidParameter("null table has no columns".into()));
        };
        let size = first.len();
        if size == 0 {
            return Err(PathRankError::EmptySamples(1));
        }
        for (i, column) in columns.iter_mut().enumerate() {
            if column.len() != size {
                return Err(PathRankError::LengthMismatch(format!(
                    "null table column for length {} has {} samples, expected {}",
                    i + 1,
                    column.len(),
                    size
                )));
            }
            if column.iter().any(|x| x.is_nan()) {
                return Err(PathRankError::InvalidParameter(format!(
                    "null table column for length {} contains NaN",
                    i + 1
                )));
            }
            column.sort_by(|a, b| a.total_cmp(b));
        }
        Ok(Self { columns })
    }

    /// Longest path length with samples.
    pub fn max_length(&self) -> usize {
        self.columns.len()
    }

    /// Samples per length.
    pub fn sample_count(&self) -> usize {
        self.columns.first().map_or(0, Vec::len)
    }

    /// Sorted samples for `length`, if sampled.
    pub fn samples(&self, length: usize) -> Option<&[f64]> {
        if length == 0 {
            return None;
        }
        self.columns.get(length - 1).map(Vec::as_slice)
    }

    /// Empirical p-value of `score` among paths with `length` edges.
    ///
    /// # Errors
    /// - `EmptySamples` if the table has no samples for `length`
    pub fn p_value(&self, score: f64, length: usize) -> Result<f64> {
        self.samples(length)
            .map(|samples| p_value_unchecked(score, samples))
            .ok_or(PathRankError::EmptySamples(length))
    }
}

impl TryFrom<Vec<Vec<f64>>> for NullScoreTable {
    type Error = PathRankError;

    fn try_from(columns: Vec<Vec<f64>>) -> Result<Self> {
        Self::from_columns(columns)
    }
}

impl From<NullScoreTable> for Vec<Vec<f64>> {
    fn from(table: NullScoreTable) -> Self {
        table.columns
    }
}

// ============================================================================
// SAMPLER
// ============================================================================

/// Where Metropolis walks start.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum WalkStart {
    /// A uniformly chosen vertex per proposal
    #[default]
    Uniform,
    /// Always the given vertex
    Fixed(VertexId),
}

/// Draws null-distribution path scores from a graph.
#[derive(Debug, Clone)]
pub struct NullScoreSampler<'g> {
    graph: &'g GraphModel,
    config: SamplerConfig,
    start: WalkStart,
}

impl<'g> NullScoreSampler<'g> {
    pub fn new(graph: &'g GraphModel, config: SamplerConfig) -> Self {
        Self {
            graph,
            config,
            start: WalkStart::Uniform,
        }
    }

    pub fn with_start(mut self, start: WalkStart) -> Self {
        self.start = start;
        self
    }

    pub fn config(&self) -> &SamplerConfig {
        &self.config
    }

    /// Sample every length `1..=max_path_length` with the given RNG.
    ///
    /// # Errors
    /// - `InvalidParameter` for invalid config, an empty graph, or (random
    ///   edges) a graph without edges
    /// - `SamplingExhausted` if a Metropolis proposal keeps hitting dead ends
    pub fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> Result<NullScoreTable> {
        self.check()?;
        let columns = (1..=self.config.max_path_length)
            .map(|length| self.sample_column(length, rng))
            .collect::<Result<Vec<_>>>()?;
        self.log_summary();
        NullScoreTable::from_columns(columns)
    }

    /// Sample all lengths in parallel.
    ///
    /// Each length gets its own ChaCha stream derived from `config.seed`, so
    /// the result is the same regardless of thread count.
    pub fn sample_par(&self) -> Result<NullScoreTable> {
        self.check()?;
        let seed = self.config.seed;
        let columns = (1..=self.config.max_path_length)
            .into_par_iter()
            .map(|length| {
                let mut rng = ChaCha8Rng::seed_from_u64(seed);
                rng.set_stream(length as u64);
                self.sample_column(length, &mut rng)
            })
            .collect::<Result<Vec<_>>>()?;
        self.log_summary();
        NullScoreTable::from_columns(columns)
    }

    /// Sorted samples for a single length.
    pub fn sample_length<R: Rng + ?Sized>(&self, length: usize, rng: &mut R) -> Result<Vec<f64>> {
        self.check()?;
        self.sample_column(length, rng)
    }

    fn sample_column<R: Rng + ?Sized>(&self, length: usize, rng: &mut R) -> Result<Vec<f64>> {
        let mut samples = match self.config.strategy {
            SamplingStrategy::Metropolis => self.metropolis(length, rng)?,
            SamplingStrategy::RandomEdges => self.random_edges(length, rng),
        };
        samples.sort_by(|a, b| a.total_cmp(b));
        Ok(samples)
    }

    fn log_summary(&self) {
        info!(
            "Sampled {} scores for lengths 1..={} ({:?})",
            self.config.sample_count, self.config.max_path_length, self.config.strategy
        );
    }

    fn check(&self) -> Result<()> {
        self.config.validate()?;
        let n = self.graph.vertex_count();
        if n == 0 {
            return Err(PathRankError::InvalidParameter("cannot sample from an empty graph".into()));
        }
        if let WalkStart::Fixed(v) = self.start {
            if v.index() >= n {
                return Err(PathRankError::NodeOutOfBounds(v.index(), n));
            }
        }
        if self.config.strategy == SamplingStrategy::RandomEdges && self.graph.edge_count() == 0 {
            return Err(PathRankError::InvalidParameter(
                "cannot sample edge weights from a graph without edges".into(),
            ));
        }
        Ok(())
    }

    fn metropolis<R: Rng + ?Sized>(&self, length: usize, rng: &mut R) -> Result<Vec<f64>> {
        let warmup = self.config.warmup_steps;
        let wanted = self.config.sample_count;
        let mut walker = Walker::new(self.graph.vertex_count());

        let mut samples = Vec::with_capacity(wanted);
        let mut current_score = 0.0;
        // +inf: a fresh chain accepts its first proposal unconditionally
        let mut log_q_current = f64::INFINITY;
        let mut failures = 0usize;
        let mut changes = 0usize;

        for iteration in 1..=warmup * wanted {
            let (proposal_score, mut log_q) = self.propose(length, rng, &mut walker, &mut failures)?;

            let recorded = samples.len();
            if failures < recorded {
                log_q -= (1.0 - failures as f64 / recorded as f64).ln();
            }

            let accept = log_q_current == f64::INFINITY
                || rng.gen::<f64>() < (log_q_current - log_q).exp();
            if accept {
                changes += 1;
                current_score = proposal_score;
                log_q_current = log_q;
            }

            if iteration % warmup == 0 {
                samples.push(current_score);
                log_q_current = f64::INFINITY;
            }
        }

        debug!(
            "length {}: {} samples, {} accepted moves, {} dead ends",
            length,
            samples.len(),
            changes,
            failures
        );
        Ok(samples)
    }

    /// Build one loopless walk with `length` edges.
    /// Returns `(score, log proposal probability)`.
    fn propose<R: Rng + ?Sized>(
        &self,
        length: usize,
        rng: &mut R,
        walker: &mut Walker,
        failures: &mut usize,
    ) -> Result<(f64, f64)> {
        let n = self.graph.vertex_count();

        for _ in 0..self.config.max_retries {
            let start = match self.start {
                WalkStart::Uniform => VertexId::new(rng.gen_range(0..n)),
                WalkStart::Fixed(v) => v,
            };
            if let Some(found) = walker.walk(self.graph, start, length, rng) {
                return Ok(found);
            }
            // dead end: rejected, retried
            *failures += 1;
        }

        Err(PathRankError::SamplingExhausted {
            length,
            attempts: self.config.max_retries,
        })
    }

    fn random_edges<R: Rng + ?Sized>(&self, length: usize, rng: &mut R) -> Vec<f64> {
        let weights = self.graph.edge_weights();
        (0..self.config.sample_count)
            .map(|_| {
                (0..length)
                    .map(|_| weights[rng.gen_range(0..weights.len())])
                    .sum()
            })
            .collect()
    }
}

/// Reusable buffers for building loopless walks.
struct Walker {
    visited: Vec<bool>,
    walk: Vec<VertexId>,
    choices: Vec<(VertexId, f64)>,
}

impl Walker {
    fn new(n: usize) -> Self {
        Self {
            visited: vec![false; n],
            walk: Vec::new(),
            choices: Vec::new(),
        }
    }

    fn walk<R: Rng + ?Sized>(
        &mut self,
        graph: &GraphModel,
        start: VertexId,
        length: usize,
        rng: &mut R,
    ) -> Option<(f64, f64)> {
        self.walk.clear();
        self.walk.push(start);
        self.visited[start.index()] = true;

        let mut score = 0.0;
        let mut log_q = 0.0;
        let mut complete = true;

        for _ in 0..length {
            let Some(&u) = self.walk.last() else { break };
            self.choices.clear();
            for (_, head, data) in graph.out_edges(u) {
                if !self.visited[head.index()] {
                    self.choices.push((head, data.weight));
                }
            }
            if self.choices.is_empty() {
                complete = false;
                break;
            }

            log_q -= (self.choices.len() as f64).ln();
            let (next, weight) = self.choices[rng.gen_range(0..self.choices.len())];
            score += weight;
            self.visited[next.index()] = true;
            self.walk.push(next);
        }

        for v in &self.walk {
            self.visited[v.index()] = false;
        }

        complete.then_some((score, log_q))
    }
}

/// Random-edge null table: `sample_count` sums of 1..=`max_path_length`
/// uniformly drawn edge weights.
pub fn random_edge_table<R: Rng + ?Sized>(
    graph: &GraphModel,
    max_path_length: usize,
    sample_count: usize,
    rng: &mut R,
) -> Result<NullScoreTable> {
    let config = SamplerConfig {
        max_path_length,
        sample_count,
        strategy: SamplingStrategy::RandomEdges,
        ..SamplerConfig::default()
    };
    NullScoreSampler::new(graph, config).sample(rng)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn seeded() -> ChaCha8Rng {
        ChaCha8Rng::seed_from_u64(7)
    }

    /// Complete digraph on `n` vertices, edge weight = 1 + (i + j) / 10
    fn complete(n: usize) -> GraphModel {
        let mut b = GraphModel::builder();
        for i in 0..n {
            b.add_vertex(&format!("v{}", i)).unwrap();
        }
        for i in 0..n {
            for j in 0..n {
                if i != j {
                    b.add_edge_by_index(i, j, 1.0 + (i + j) as f64 / 10.0, String::new())
                        .unwrap();
                }
            }
        }
        b.build()
    }

    fn config(strategy: SamplingStrategy, max: usize, count: usize) -> SamplerConfig {
        SamplerConfig {
            max_path_length: max,
            sample_count: count,
            warmup_steps: 5,
            strategy,
            ..SamplerConfig::default()
        }
    }

    fn is_sorted(v: &[f64]) -> bool {
        v.windows(2).all(|w| w[0] <= w[1])
    }

    // =========================================================================
    // TABLE
    // =========================================================================

    #[test]
    fn test_table_sorts_and_validates() {
        let table = NullScoreTable::from_columns(vec![vec![3.0, 1.0, 2.0], vec![6.0, 4.0, 5.0]]).unwrap();
        assert_eq!(table.max_length(), 2);
        assert_eq!(table.sample_count(), 3);
        assert_eq!(table.samples(1), Some(&[1.0, 2.0, 3.0][..]));
        assert_eq!(table.samples(0), None);
        assert_eq!(table.samples(3), None);

        assert!(matches!(
            NullScoreTable::from_columns(vec![vec![1.0], vec![1.0, 2.0]]),
            Err(PathRankError::LengthMismatch(_))
        ));
        assert!(NullScoreTable::from_columns(vec![]).is_err());
        assert!(NullScoreTable::from_columns(vec![vec![]]).is_err());
        assert!(NullScoreTable::from_columns(vec![vec![f64::NAN]]).is_err());
    }

    #[test]
    fn test_table_p_value_lookup() {
        let table = NullScoreTable::from_columns(vec![vec![1.0, 2.0, 3.0, 4.0]]).unwrap();
        assert_eq!(table.p_value(0.5, 1).unwrap(), 0.0);
        assert_eq!(table.p_value(3.5, 1).unwrap(), 0.5);
        assert!(matches!(table.p_value(1.0, 2), Err(PathRankError::EmptySamples(2))));
    }

    #[test]
    fn test_table_json_round_trip_sorts() {
        let table: NullScoreTable = serde_json::from_str("[[2.0, 1.0], [4.0, 3.0]]").unwrap();
        assert_eq!(table.samples(2), Some(&[3.0, 4.0][..]));
        let json = serde_json::to_string(&table).unwrap();
        assert_eq!(json, "[[1.0,2.0],[3.0,4.0]]");
        assert!(serde_json::from_str::<NullScoreTable>("[[1.0], []]").is_err());
    }

    // =========================================================================
    // METROPOLIS
    // =========================================================================

    #[test]
    fn test_metropolis_shape() {
        let g = complete(5);
        let sampler = NullScoreSampler::new(&g, config(SamplingStrategy::Metropolis, 3, 1000));
        let table = sampler.sample(&mut seeded()).unwrap();

        assert_eq!(table.max_length(), 3);
        for length in 1..=3 {
            let samples = table.samples(length).unwrap();
            assert_eq!(samples.len(), 1000);
            assert!(is_sorted(samples));
            // every edge weighs between 1.1 and 1.7
            assert!(samples.iter().all(|&x| x >= 1.1 * length as f64 - 1e-9));
            assert!(samples.iter().all(|&x| x <= 1.7 * length as f64 + 1e-9));
        }
    }

    #[test]
    fn test_metropolis_is_reproducible() {
        let g = complete(4);
        let sampler = NullScoreSampler::new(&g, config(SamplingStrategy::Metropolis, 2, 50));
        let a = sampler.sample(&mut seeded()).unwrap();
        let b = sampler.sample(&mut seeded()).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_metropolis_retries_dead_ends() {
        // Only a -> b -> c supports a 2-edge walk; every other start dead-ends
        let mut b = GraphModel::builder();
        b.add_edge("a", "b", 1.0, "").unwrap();
        b.add_edge("b", "c", 2.0, "").unwrap();
        b.add_vertex("d").unwrap();
        let g = b.build();

        let sampler = NullScoreSampler::new(&g, config(SamplingStrategy::Metropolis, 2, 20));
        let table = sampler.sample(&mut seeded()).unwrap();
        assert!(table.samples(2).unwrap().iter().all(|&x| x == 3.0));
    }

    #[test]
    fn test_metropolis_gives_up_on_absorbing_graph() {
        let mut b = GraphModel::builder();
        b.add_edge("a", "b", 1.0, "").unwrap();
        let g = b.build();

        let mut cfg = config(SamplingStrategy::Metropolis, 2, 5);
        cfg.max_retries = 50;
        let result = NullScoreSampler::new(&g, cfg).sample(&mut seeded());
        assert!(matches!(
            result,
            Err(PathRankError::SamplingExhausted { length: 2, attempts: 50 })
        ));
    }

    #[test]
    fn test_fixed_start() {
        let mut b = GraphModel::builder();
        b.add_edge("s", "a", 1.0, "").unwrap();
        b.add_edge("a", "b", 10.0, "").unwrap();
        b.add_edge("b", "c", 10.0, "").unwrap();
        let g = b.build();
        let s = g.source().unwrap();

        let sampler = NullScoreSampler::new(&g, config(SamplingStrategy::Metropolis, 1, 10))
            .with_start(WalkStart::Fixed(s));
        let table = sampler.sample(&mut seeded()).unwrap();
        assert!(table.samples(1).unwrap().iter().all(|&x| x == 1.0));

        let bad = NullScoreSampler::new(&g, config(SamplingStrategy::Metropolis, 1, 10))
            .with_start(WalkStart::Fixed(VertexId::new(99)));
        assert!(matches!(bad.sample(&mut seeded()), Err(PathRankError::NodeOutOfBounds(99, 4))));
    }

    #[test]
    fn test_metropolis_is_uniform_over_walks() {
        // Ten one-edge walks: a -> b (1.0) and c -> d0..d8 (2.0). A naive
        // walk picks a and c equally often, so a -> b would get half the
        // samples instead of a tenth.
        let mut b = GraphModel::builder();
        b.add_edge("a", "b", 1.0, "").unwrap();
        for i in 0..9 {
            b.add_edge("c", &format!("d{}", i), 2.0, "").unwrap();
        }
        let g = b.build();

        let mut cfg = config(SamplingStrategy::Metropolis, 1, 4000);
        cfg.warmup_steps = 20;
        let table = NullScoreSampler::new(&g, cfg).sample(&mut seeded()).unwrap();

        let samples = table.samples(1).unwrap();
        let cheap = samples.iter().filter(|&&x| x == 1.0).count() as f64 / samples.len() as f64;
        assert!((0.05..0.15).contains(&cheap), "fraction of a -> b walks: {}", cheap);
    }

    #[test]
    fn test_sample_length_validates() {
        let g = complete(3);
        let mut cfg = config(SamplingStrategy::Metropolis, 1, 1);
        cfg.warmup_steps = 0;
        let sampler = NullScoreSampler::new(&g, cfg);
        assert!(sampler.sample_length(1, &mut seeded()).is_err());

        let ok = NullScoreSampler::new(&g, config(SamplingStrategy::Metropolis, 2, 10));
        assert_eq!(ok.sample_length(2, &mut seeded()).unwrap().len(), 10);
    }

    #[test]
    fn test_parallel_is_deterministic() {
        let g = complete(5);
        let sampler = NullScoreSampler::new(&g, config(SamplingStrategy::Metropolis, 3, 100));
        let a = sampler.sample_par().unwrap();
        let b = sampler.sample_par().unwrap();
        assert_eq!(a, b);
        assert_eq!(a.max_length(), 3);
        assert_eq!(a.sample_count(), 100);
    }

    // =========================================================================
    // RANDOM EDGES
    // =========================================================================

    #[test]
    fn test_random_edges_shape() {
        let g = complete(4);
        let table = random_edge_table(&g, 3, 1000, &mut seeded()).unwrap();
        for length in 1..=3 {
            let samples = table.samples(length).unwrap();
            assert_eq!(samples.len(), 1000);
            assert!(is_sorted(samples));
        }
    }

    #[test]
    fn test_random_edges_uses_every_edge() {
        // Two edges, 1.0 and 2.0: with 1000 draws both must appear
        let mut b = GraphModel::builder();
        b.add_edge("a", "b", 1.0, "").unwrap();
        b.add_edge("b", "c", 2.0, "").unwrap();
        let g = b.build();

        let table = random_edge_table(&g, 1, 1000, &mut seeded()).unwrap();
        let samples = table.samples(1).unwrap();
        assert_eq!(samples[0], 1.0);
        assert_eq!(samples[999], 2.0);
    }

    #[test]
    fn test_invalid_inputs() {
        let empty = GraphModel::builder().build();
        let sampler = NullScoreSampler::new(&empty, config(SamplingStrategy::Metropolis, 1, 1));
        assert!(matches!(sampler.sample(&mut seeded()), Err(PathRankError::InvalidParameter(_))));

        let mut b = GraphModel::builder();
        b.add_vertex("a").unwrap();
        let edgeless = b.build();
        assert!(random_edge_table(&edgeless, 1, 1, &mut seeded()).is_err());

        let g = complete(3);
        let mut cfg = config(SamplingStrategy::Metropolis, 1, 1);
        cfg.warmup_steps = 0;
        assert!(NullScoreSampler::new(&g, cfg).sample(&mut seeded()).is_err());
    }
}
