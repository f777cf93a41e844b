// Error types for graph construction, path ranking and significance scoring.
//
// Every public entry point returns Result<T, PathRankError> instead of
// panicking or silently returning nothing. "Not enough paths" and
// "target out of scope" are NOT errors - they are ordinary (smaller) results.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum PathRankError {
    /// The reserved source ("s") or sink ("t") vertex is not in the graph.
    #[error("No {0} vertex found in graph")]
    MissingTerminal(&'static str),

    #[error("Node index {0} out of bounds (graph has {1} nodes)")]
    NodeOutOfBounds(usize, usize),

    #[error("Duplicate vertex name: {0}")]
    DuplicateVertex(String),

    #[error("Duplicate edge {0} -> {1} (at most one edge per ordered pair)")]
    DuplicateEdge(String, String),

    #[error("Invalid weight {weight} on edge {from} -> {to}: weights must be finite and non-negative")]
    InvalidWeight { from: String, to: String, weight: f64 },

    #[error("Length mismatch: {0}")]
    LengthMismatch(String),

    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    #[error("No sampled scores available for path length {0}")]
    EmptySamples(usize),

    #[error("Random walk sampling for length {length} gave up after {attempts} dead ends")]
    SamplingExhausted { length: usize, attempts: usize },

    #[error("Config error: {0}")]
    Config(String),
}

pub type Result<T> = std::result::Result<T, PathRankError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = PathRankError::MissingTerminal("source");
        assert_eq!(err.to_string(), "No source vertex found in graph");

        let err = PathRankError::NodeOutOfBounds(7, 3);
        assert_eq!(err.to_string(), "Node index 7 out of bounds (graph has 3 nodes)");

        let err = PathRankError::SamplingExhausted { length: 4, attempts: 10 };
        assert!(err.to_string().contains("length 4"));
    }
}
