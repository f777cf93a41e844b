//! Empirical p-values against a sorted null sample.
//!
//! Lower path scores are better, so a path is significant when few random
//! paths of the same length score below it:
//!
//! ```text
//! samples (sorted): 0.2  0.5  0.9  1.4  2.0      N = 5
//! observed = 1.0        ^^^^^^^^^^^^^             3 samples are < 1.0
//! p = (3 - 1) / 5 = 0.4                           rank of 0.9 is 2
//! ```
//!
//! If nothing is below the observed score the p-value is 0.

use crate::errors::{PathRankError, Result};

/// p-value of `observed` against ascending `samples`.
///
/// Returns the zero-based rank of the largest sample strictly below
/// `observed`, divided by the sample count; 0 if no sample is below.
/// Ties resolve toward the lower rank. Monotone non-decreasing in `observed`.
///
/// # Errors
/// - `EmptySamples` if `samples` is empty (reported as length 0; callers
///   with a length in hand should use [`crate::sampler::NullScoreTable::p_value`])
pub fn p_value(observed: f64, samples: &[f64]) -> Result<f64> {
    if samples.is_empty() {
        return Err(PathRankError::EmptySamples(0));
    }
    Ok(p_value_unchecked(observed, samples))
}

pub(crate) fn p_value_unchecked(observed: f64, samples: &[f64]) -> f64 {
    debug_assert!(!samples.is_empty());
    debug_assert!(samples.windows(2).all(|w| w[0] <= w[1]), "samples must be sorted");

    let below = samples.partition_point(|&x| x < observed);
    if below == 0 {
        return 0.0;
    }
    (below - 1) as f64 / samples.len() as f64
}
