//! Weighted directed graph model for reaction/signaling networks.
//!
//! Vertices carry unique names and get dense handles in insertion order
//! (the order is significant: it is the tie-break order of every algorithm
//! in this crate). Edges carry a non-negative weight and a display label.
//! Two reserved vertex names mark the source (`"s"`) and the sink (`"t"`).
//!
//! The model is immutable once built. Algorithms that need to "delete"
//! vertices or edges (the deviation search of the ranker) work on a
//! [`GraphView`], an exclusion mask over the shared graph.

use indexmap::IndexSet;
use petgraph::graph::{DiGraph, EdgeIndex, NodeIndex};
use petgraph::visit::EdgeRef;
use rustc_hash::FxHashSet;
use serde::{Deserialize, Serialize};

use crate::errors::{PathRankError, Result};

/// Dense vertex handle (position in the input vertex list).
pub type VertexId = NodeIndex<u32>;

/// Edge handle (position in the input edge list).
pub type EdgeId = EdgeIndex<u32>;

/// Reserved name of the source vertex.
pub const SOURCE_NAME: &str = "s";

/// Reserved name of the sink vertex.
pub const SINK_NAME: &str = "t";

/// Payload of a directed edge.
#[derive(Debug, Clone, PartialEq)]
pub struct EdgeData {
    pub weight: f64,
    pub label: String,
}

// ============================================================================
// EXTERNAL INPUT FORMAT
// ============================================================================
//
// The graph-construction collaborator hands us:
//   vertices: ["s", "g1", "g2", "t"]
//   edges:    from = [1, 2, 3]      (1-based!)
//             to   = [2, 3, 4]
//             weight = [0.5, 1.2, 0.5]
//             label  = ["c1", "c2", "c3"]
//
// Indices are translated to 0-based handles on the way in.
// ============================================================================

/// Serializable graph input: vertex names plus three parallel edge arrays.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct GraphInput {
    pub vertices: Vec<String>,
    pub edges: EdgeListInput,
}

/// Parallel edge arrays with 1-based vertex indices.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct EdgeListInput {
    pub from: Vec<usize>,
    pub to: Vec<usize>,
    pub weight: Vec<f64>,
    /// Optional; missing labels default to the empty string.
    #[serde(default)]
    pub label: Vec<String>,
}

/// Immutable weighted directed graph with named vertices.
#[derive(Debug, Clone)]
pub struct GraphModel {
    graph: DiGraph<(), EdgeData>,
    names: IndexSet<String>,
    source: Option<VertexId>,
    sink: Option<VertexId>,
}

impl GraphModel {
    /// Start building a graph vertex by vertex.
    pub fn builder() -> GraphBuilder {
        GraphBuilder::default()
    }

    /// Build from the external parallel-array representation.
    ///
    /// # Errors
    /// - `LengthMismatch` if the edge arrays differ in length
    /// - `NodeOutOfBounds` if an index is 0 or past the vertex list
    /// - `DuplicateVertex`, `DuplicateEdge`, `InvalidWeight` per [`GraphBuilder`]
    pub fn from_input(input: &GraphInput) -> Result<Self> {
        Self::from_parallel_arrays(
            &input.vertices,
            &input.edges.from,
            &input.edges.to,
            &input.edges.weight,
            &input.edges.label,
        )
    }

    /// Build from vertex names and 1-based parallel edge arrays.
    ///
    /// `labels` may be empty (all labels default to `""`), otherwise it must
    /// match the other arrays in length.
    pub fn from_parallel_arrays<S: AsRef<str>>(
        vertices: &[S],
        from: &[usize],
        to: &[usize],
        weights: &[f64],
        labels: &[String],
    ) -> Result<Self> {
        if from.len() != to.len() || from.len() != weights.len() {
            return Err(PathRankError::LengthMismatch(format!(
                "edge arrays differ: from={}, to={}, weight={}",
                from.len(),
                to.len(),
                weights.len()
            )));
        }
        if !labels.is_empty() && labels.len() != from.len() {
            return Err(PathRankError::LengthMismatch(format!(
                "edge labels: expected {}, got {}",
                from.len(),
                labels.len()
            )));
        }

        let mut builder = GraphBuilder::default();
        for name in vertices {
            builder.add_vertex(name.as_ref())?;
        }

        let n = vertices.len();
        for i in 0..from.len() {
            // 1-based -> 0-based; 0 is as invalid as n + 1
            let src = to_zero_based(from[i], n)?;
            let dst = to_zero_based(to[i], n)?;
            let label = labels.get(i).cloned().unwrap_or_default();
            builder.add_edge_by_index(src, dst, weights[i], label)?;
        }

        Ok(builder.build())
    }

    pub fn vertex_count(&self) -> usize {
        self.graph.node_count()
    }

    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }

    /// All vertex handles in insertion order.
    pub fn vertices(&self) -> impl Iterator<Item = VertexId> + '_ {
        self.graph.node_indices()
    }

    pub fn vertex_name(&self, v: VertexId) -> &str {
        self.names
            .get_index(v.index())
            .map(String::as_str)
            .unwrap_or("")
    }

    pub fn vertex_id(&self, name: &str) -> Option<VertexId> {
        self.names.get_index_of(name).map(NodeIndex::new)
    }

    pub fn source(&self) -> Option<VertexId> {
        self.source
    }

    pub fn sink(&self) -> Option<VertexId> {
        self.sink
    }

    /// Source and sink handles, or the precondition error for the missing one.
    pub fn terminals(&self) -> Result<(VertexId, VertexId)> {
        let source = self.source.ok_or(PathRankError::MissingTerminal("source"))?;
        let sink = self.sink.ok_or(PathRankError::MissingTerminal("sink"))?;
        Ok((source, sink))
    }

    /// The edge `u -> v`, if present.
    pub fn edge(&self, u: VertexId, v: VertexId) -> Option<&EdgeData> {
        self.graph
            .find_edge(u, v)
            .map(|e| &self.graph[e])
    }

    pub fn weight(&self, u: VertexId, v: VertexId) -> Option<f64> {
        self.edge(u, v).map(|e| e.weight)
    }

    /// Outgoing edges of `u` as `(edge, head, payload)`.
    ///
    /// Order follows petgraph's adjacency lists (most recently added first).
    pub fn out_edges(&self, u: VertexId) -> impl Iterator<Item = (EdgeId, VertexId, &EdgeData)> + '_ {
        self.graph
            .edges(u)
            .map(|e| (e.id(), e.target(), e.weight()))
    }

    pub fn out_degree(&self, u: VertexId) -> usize {
        self.graph.edges(u).count()
    }

    /// Every edge weight in insertion order.
    pub fn edge_weights(&self) -> Vec<f64> {
        self.graph.edge_weights().map(|e| e.weight).collect()
    }

    /// An unrestricted view (nothing excluded).
    pub fn view(&self) -> GraphView<'_> {
        GraphView::new(self)
    }
}

fn to_zero_based(index: usize, n: usize) -> Result<usize> {
    if index == 0 || index > n {
        return Err(PathRankError::NodeOutOfBounds(index, n));
    }
    Ok(index - 1)
}

// ============================================================================
// BUILDER
// ============================================================================

/// Incremental constructor for [`GraphModel`]; validates as it goes.
#[derive(Debug, Default)]
pub struct GraphBuilder {
    graph: DiGraph<(), EdgeData>,
    names: IndexSet<String>,
}

impl GraphBuilder {
    /// Add a named vertex; its handle is its insertion position.
    ///
    /// # Errors
    /// - `DuplicateVertex` if the name is already taken
    pub fn add_vertex(&mut self, name: &str) -> Result<VertexId> {
        if !self.names.insert(name.to_string()) {
            return Err(PathRankError::DuplicateVertex(name.to_string()));
        }
        Ok(self.graph.add_node(()))
    }

    /// Add an edge between two named vertices, creating them if needed.
    pub fn add_edge(&mut self, from: &str, to: &str, weight: f64, label: &str) -> Result<EdgeId> {
        let src = self.vertex_or_insert(from);
        let dst = self.vertex_or_insert(to);
        self.add_edge_by_index(src.index(), dst.index(), weight, label.to_string())
    }

    /// Add an edge between two 0-based vertex handles.
    ///
    /// # Errors
    /// - `NodeOutOfBounds` if either handle does not exist
    /// - `InvalidWeight` if the weight is negative, NaN or infinite
    /// - `DuplicateEdge` if the ordered pair already has an edge
    pub fn add_edge_by_index(&mut self, src: usize, dst: usize, weight: f64, label: String) -> Result<EdgeId> {
        let n = self.graph.node_count();
        if src >= n {
            return Err(PathRankError::NodeOutOfBounds(src, n));
        }
        if dst >= n {
            return Err(PathRankError::NodeOutOfBounds(dst, n));
        }

        let (a, b) = (NodeIndex::new(src), NodeIndex::new(dst));
        if !weight.is_finite() || weight < 0.0 {
            return Err(PathRankError::InvalidWeight {
                from: self.name(a),
                to: self.name(b),
                weight,
            });
        }
        if self.graph.find_edge(a, b).is_some() {
            return Err(PathRankError::DuplicateEdge(self.name(a), self.name(b)));
        }

        Ok(self.graph.add_edge(a, b, EdgeData { weight, label }))
    }

    pub fn build(self) -> GraphModel {
        let source = self.names.get_index_of(SOURCE_NAME).map(NodeIndex::new);
        let sink = self.names.get_index_of(SINK_NAME).map(NodeIndex::new);
        GraphModel {
            graph: self.graph,
            names: self.names,
            source,
            sink,
        }
    }

    fn vertex_or_insert(&mut self, name: &str) -> VertexId {
        match self.names.get_index_of(name) {
            Some(i) => NodeIndex::new(i),
            None => {
                self.names.insert(name.to_string());
                self.graph.add_node(())
            }
        }
    }

    fn name(&self, v: VertexId) -> String {
        self.names.get_index(v.index()).cloned().unwrap_or_default()
    }
}

// ============================================================================
// EXCLUSION VIEW
// ============================================================================
//
// Yen's deviation search needs, per iteration, "the graph minus a few edges
// minus the prefix vertices". Instead of cloning the whole graph each time we
// keep the graph shared and record what is excluded:
//
//   removed_vertices[v] = true  -> v and all its incident edges are gone
//   removed_edges       = set of individually removed edges
// ============================================================================

/// A read-only graph with some vertices/edges masked out.
#[derive(Debug, Clone)]
pub struct GraphView<'g> {
    graph: &'g GraphModel,
    removed_vertices: Vec<bool>,
    removed_edges: FxHashSet<EdgeId>,
}

impl<'g> GraphView<'g> {
    pub fn new(graph: &'g GraphModel) -> Self {
        Self {
            graph,
            removed_vertices: vec![false; graph.vertex_count()],
            removed_edges: FxHashSet::default(),
        }
    }

    pub fn graph(&self) -> &'g GraphModel {
        self.graph
    }

    /// Drop every edge incident to `v`.
    pub fn remove_vertex(&mut self, v: VertexId) {
        if let Some(flag) = self.removed_vertices.get_mut(v.index()) {
            *flag = true;
        }
    }

    /// Drop the edge `u -> v` if it exists. Returns whether anything changed.
    pub fn remove_edge(&mut self, u: VertexId, v: VertexId) -> bool {
        match self.graph.graph.find_edge(u, v) {
            Some(e) => self.removed_edges.insert(e),
            None => false,
        }
    }

    pub fn is_vertex_removed(&self, v: VertexId) -> bool {
        self.removed_vertices.get(v.index()).copied().unwrap_or(true)
    }

    /// Outgoing edges of `u` that survive the mask, as `(head, weight)`.
    pub fn out_edges(&self, u: VertexId) -> impl Iterator<Item = (VertexId, f64)> + '_ {
        let blocked = self.is_vertex_removed(u);
        self.graph
            .out_edges(u)
            .filter(move |&(id, head, _)| {
                !blocked && !self.is_vertex_removed(head) && !self.removed_edges.contains(&id)
            })
            .map(|(_, head, data)| (head, data.weight))
    }
}
