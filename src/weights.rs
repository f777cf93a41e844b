//! Edge weights from expression profiles.
//!
//! Every gene has a profile of observations (one row of an
//! [`ExpressionMatrix`]). An edge between two genes gets the Pearson
//! correlation of their profiles, computed over the observations where both
//! values are present (non-NaN).
//!
//! With `resamples > 1` the observation columns are drawn with replacement
//! per replicate and the weight is the median of the replicate correlations,
//! which damps the effect of a few outlying observations.
//!
//! The results are raw correlations in `[-1, 1]`, not distances: callers
//! transform them (e.g. `1 - r`) before ranking paths.

use rand::Rng;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::errors::{PathRankError, Result};

/// Weight given to an edge whose endpoints are the same gene.
pub const SAME_GENE_PENALTY: f64 = -1.0;

/// Gene-by-observation matrix, one row per gene.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExpressionMatrix {
    rows: Vec<Vec<f64>>,
}

impl ExpressionMatrix {
    /// # Errors
    /// - `LengthMismatch` if rows differ in length
    pub fn new(rows: Vec<Vec<f64>>) -> Result<Self> {
        if let Some(first) = rows.first() {
            let width = first.len();
            if let Some((i, row)) = rows.iter().enumerate().find(|(_, r)| r.len() != width) {
                return Err(PathRankError::LengthMismatch(format!(
                    "expression row {} has {} observations, expected {}",
                    i,
                    row.len(),
                    width
                )));
            }
        }
        Ok(Self { rows })
    }

    pub fn genes(&self) -> usize {
        self.rows.len()
    }

    pub fn observations(&self) -> usize {
        self.rows.first().map_or(0, Vec::len)
    }

    pub fn profile(&self, gene: usize) -> Option<&[f64]> {
        self.rows.get(gene).map(Vec::as_slice)
    }
}

/// An edge to weigh: 0-based matrix rows of its endpoints (None when the
/// gene has no profile) and whether both ends are the same gene.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProfileEdge {
    pub from: Option<usize>,
    pub to: Option<usize>,
    #[serde(default)]
    pub same_gene: bool,
}

/// Pearson correlation over the pairs where both values are present.
///
/// None when fewer than three such pairs exist, when any of the running sums
/// is zero, or when a profile has no variance.
pub fn pearson(x: &[f64], y: &[f64]) -> Option<f64> {
    pearson_over(x, y, 0..x.len().min(y.len()))
}

fn pearson_over(x: &[f64], y: &[f64], columns: impl Iterator<Item = usize>) -> Option<f64> {
    let (mut n, mut ex, mut ey, mut exx, mut eyy, mut exy) = (0.0, 0.0, 0.0, 0.0, 0.0, 0.0);
    for i in columns {
        let (xp, yp) = (x[i], y[i]);
        if xp.is_nan() || yp.is_nan() {
            continue;
        }
        n += 1.0;
        ex += xp;
        ey += yp;
        exx += xp * xp;
        eyy += yp * yp;
        exy += xp * yp;
    }

    if n <= 2.0 || ex == 0.0 || ey == 0.0 || exx == 0.0 || eyy == 0.0 || exy == 0.0 {
        return None;
    }
    let r = (n * exy - ex * ey) / ((n * exx - ex * ex) * (n * eyy - ey * ey)).sqrt();
    r.is_finite().then_some(r)
}

/// Correlation weight for every edge, in input order.
///
/// - missing endpoint: `None`
/// - same gene: [`SAME_GENE_PENALTY`]
/// - otherwise: the Pearson correlation (median over `resamples` bootstrap
///   replicates when `resamples > 1`); `None` if undefined
///
/// # Errors
/// - `InvalidParameter` if `resamples` is 0
/// - `NodeOutOfBounds` if an edge names a row the matrix does not have
pub fn correlation_weights<R: Rng + ?Sized>(
    matrix: &ExpressionMatrix,
    edges: &[ProfileEdge],
    resamples: usize,
    rng: &mut R,
) -> Result<Vec<Option<f64>>> {
    if resamples == 0 {
        return Err(PathRankError::InvalidParameter("resamples must be at least 1".into()));
    }

    let nobs = matrix.observations();
    let mut weights = Vec::with_capacity(edges.len());
    let mut replicates = Vec::with_capacity(resamples);

    for edge in edges {
        let (Some(from), Some(to)) = (edge.from, edge.to) else {
            weights.push(None);
            continue;
        };
        let x = matrix
            .profile(from)
            .ok_or(PathRankError::NodeOutOfBounds(from, matrix.genes()))?;
        let y = matrix
            .profile(to)
            .ok_or(PathRankError::NodeOutOfBounds(to, matrix.genes()))?;

        if edge.same_gene {
            weights.push(Some(SAME_GENE_PENALTY));
            continue;
        }

        if resamples == 1 {
            weights.push(pearson(x, y));
            continue;
        }

        replicates.clear();
        for _ in 0..resamples {
            let columns: Vec<usize> = (0..nobs).map(|_| rng.gen_range(0..nobs)).collect();
            if let Some(r) = pearson_over(x, y, columns.into_iter()) {
                replicates.push(r);
            }
        }
        weights.push(median(&mut replicates));
    }

    debug!(
        "Weighted {} edges ({} undefined)",
        weights.len(),
        weights.iter().filter(|w| w.is_none()).count()
    );
    Ok(weights)
}

fn median(values: &mut [f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    values.sort_by(|a, b| a.total_cmp(b));
    let mid = values.len() / 2;
    if values.len() % 2 == 0 {
        Some((values[mid - 1] + values[mid]) / 2.0)
    } else {
        Some(values[mid])
    }
}
