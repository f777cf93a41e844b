//! Paths through a [`GraphModel`] and their presentation form.

use serde::{Deserialize, Serialize};

use crate::graph::{GraphModel, VertexId};

/// A path as an ordered vertex sequence with its additive score.
#[derive(Debug, Clone, PartialEq)]
pub struct Path {
    /// Vertex handles, first to last, endpoints included.
    pub sequence: Vec<VertexId>,
    /// Sum of traversed edge weights.
    pub score: f64,
    /// Position from which this path was derived from an earlier one
    /// (0 for an initial shortest path).
    pub deviation: usize,
}

impl Path {
    pub fn new(sequence: Vec<VertexId>, score: f64) -> Self {
        Self {
            sequence,
            score,
            deviation: 0,
        }
    }

    /// Number of edges.
    pub fn edge_count(&self) -> usize {
        self.sequence.len().saturating_sub(1)
    }

    /// Number of vertices strictly between the endpoints.
    pub fn interior_len(&self) -> usize {
        self.sequence.len().saturating_sub(2)
    }

    /// True if no vertex appears twice.
    pub fn is_loopless(&self) -> bool {
        let mut seen = rustc_hash::FxHashSet::default();
        self.sequence.iter().all(|v| seen.insert(*v))
    }

    /// True if both paths agree on positions `0..=i` and `self` continues
    /// past `i` (so `self.sequence[i + 1]` exists).
    pub fn shares_prefix_through(&self, other: &Path, i: usize) -> bool {
        self.sequence.len() > i + 1
            && other.sequence.len() > i
            && self.sequence[..=i] == other.sequence[..=i]
    }

    /// Recompute the score from the graph's edge weights.
    ///
    /// Returns None if a consecutive pair has no edge.
    pub fn rescore(&self, graph: &GraphModel) -> Option<f64> {
        self.sequence
            .windows(2)
            .map(|w| graph.weight(w[0], w[1]))
            .sum()
    }

    /// Presentation form: vertex and edge labels without the source/sink
    /// sentinels, plus the weight of every traversed edge.
    pub fn report(&self, graph: &GraphModel) -> PathReport {
        let seq = &self.sequence;
        let mut start = 0;
        let mut end = seq.len();
        if seq.first().is_some() && seq.first().copied() == graph.source() {
            start = 1;
        }
        if end > start && seq.last().copied() == graph.sink() {
            end -= 1;
        }
        let inner = &seq[start..end];

        let genes = inner
            .iter()
            .map(|&v| graph.vertex_name(v).to_string())
            .collect();
        let compounds = inner
            .windows(2)
            .map(|w| graph.edge(w[0], w[1]).map(|e| e.label.clone()).unwrap_or_default())
            .collect();
        let weights = seq
            .windows(2)
            .map(|w| graph.weight(w[0], w[1]).unwrap_or(0.0))
            .collect();

        PathReport {
            genes,
            compounds,
            weights,
            distance: self.score,
            pvalue: None,
        }
    }
}

/// Output form of a ranked or significance-scored path.
///
/// `genes` are the vertex labels with the source/sink sentinels stripped,
/// `compounds` the labels of the edges between consecutive genes. `weights`
/// covers every traversed edge, including the connectors to and from the
/// sentinels, so its sum is `distance`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PathReport {
    pub genes: Vec<String>,
    pub compounds: Vec<String>,
    pub weights: Vec<f64>,
    pub distance: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pvalue: Option<f64>,
}

impl PathReport {
    pub fn with_pvalue(mut self, pvalue: f64) -> Self {
        self.pvalue = Some(pvalue);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chain() -> GraphModel {
        let mut b = GraphModel::builder();
        b.add_edge("s", "g1", 0.5, "c0").unwrap();
        b.add_edge("g1", "g2", 1.0, "c1").unwrap();
        b.add_edge("g2", "t", 0.25, "c2").unwrap();
        b.build()
    }

    fn ids(g: &GraphModel, names: &[&str]) -> Vec<VertexId> {
        names.iter().map(|n| g.vertex_id(n).unwrap()).collect()
    }

    #[test]
    fn test_report_strips_sentinels() {
        let g = chain();
        let p = Path::new(ids(&g, &["s", "g1", "g2", "t"]), 1.75);
        let r = p.report(&g);

        assert_eq!(r.genes, vec!["g1", "g2"]);
        assert_eq!(r.compounds, vec!["c1"]);
        assert_eq!(r.weights, vec![0.5, 1.0, 0.25]);
        assert!((r.weights.iter().sum::<f64>() - r.distance).abs() < 1e-12);
        assert_eq!(r.pvalue, None);
    }

    #[test]
    fn test_report_keeps_non_sink_tail() {
        let g = chain();
        let p = Path::new(ids(&g, &["s", "g1", "g2"]), 1.5);
        let r = p.report(&g).with_pvalue(0.01);
        assert_eq!(r.genes, vec!["g1", "g2"]);
        assert_eq!(r.compounds, vec!["c1"]);
        assert_eq!(r.weights, vec![0.5, 1.0]);
        assert_eq!(r.pvalue, Some(0.01));
    }

    #[test]
    fn test_rescore_and_loopless() {
        let g = chain();
        let p = Path::new(ids(&g, &["s", "g1", "g2", "t"]), 1.75);
        assert_eq!(p.rescore(&g), Some(1.75));
        assert!(p.is_loopless());
        assert_eq!(p.edge_count(), 3);
        assert_eq!(p.interior_len(), 2);

        let broken = Path::new(ids(&g, &["s", "g2"]), 0.0);
        assert_eq!(broken.rescore(&g), None);
    }

    #[test]
    fn test_shares_prefix_through() {
        let g = chain();
        let a = Path::new(ids(&g, &["s", "g1", "g2", "t"]), 0.0);
        let b = Path::new(ids(&g, &["s", "g1", "t"]), 0.0);
        assert!(a.shares_prefix_through(&b, 1));
        assert!(!a.shares_prefix_through(&b, 2));
        // b has no vertex after position 2
        assert!(!b.shares_prefix_through(&a, 2));
    }
}
