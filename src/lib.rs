//! pathrank - ranked and statistically scored paths in weighted networks
//!
//! Reaction and signaling networks are modelled as weighted directed graphs
//! with a reserved source vertex `"s"` and sink vertex `"t"`. Lower path
//! scores (sums of edge weights) are better.
//!
//! - [`ranker`]: the K best source -> sink paths without repeated vertices
//! - [`sampler`]: null distributions of path scores per path length
//! - [`significance`]: empirical p-values against those distributions
//! - [`scope`]: which sink predecessors are significantly close to the source
//! - [`weights`]: edge weights from expression-profile correlations
//!
//! ```no_run
//! use pathrank::{GraphModel, KShortestPathRanker, RankerConfig};
//!
//! let mut builder = GraphModel::builder();
//! builder.add_edge("s", "g1", 0.5, "")?;
//! builder.add_edge("g1", "g2", 1.0, "c1")?;
//! builder.add_edge("g2", "t", 0.5, "")?;
//! let graph = builder.build();
//!
//! let paths = KShortestPathRanker::new(&graph, RankerConfig::default()).rank_reports()?;
//! # Ok::<(), pathrank::PathRankError>(())
//! ```

pub mod config;
pub mod errors;
pub mod graph;
pub mod heap;
pub mod path;
pub mod ranker;
pub mod sampler;
pub mod scope;
pub mod shortest_path;
pub mod significance;
pub mod weights;

pub use config::{load_config, load_config_file, PathRankConfig, RankerConfig, SamplerConfig, SamplingStrategy, ScopeConfig};
pub use errors::{PathRankError, Result};
pub use graph::{GraphInput, GraphModel, GraphView, VertexId};
pub use path::{Path, PathReport};
pub use ranker::{rank_paths, KShortestPathRanker};
pub use sampler::{NullScoreSampler, NullScoreTable, WalkStart};
pub use scope::{ScopeEngine, ScopeResult};
pub use significance::p_value;
