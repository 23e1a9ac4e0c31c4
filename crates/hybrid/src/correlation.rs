//! Row-centred cross-covariance of two matrices.

use crate::error::HybridError;

/// `(A - rowmean(A)) · (B - rowmean(B))ᵗ`.
///
/// Rows are variables and columns are observations; the result has one row
/// per row of `a` and one column per row of `b`. It is not normalised by
/// the row variances. Both operands must have the same number of columns.
///
/// # Errors
///
/// [`HybridError::ShapeMismatch`] when the column counts differ or a matrix
/// is ragged.
pub fn correlation_nd(a: &[Vec<f64>], b: &[Vec<f64>]) -> Result<Vec<Vec<f64>>, HybridError> {
    let cols = |m: &[Vec<f64>]| -> Result<usize, HybridError> {
        let first = m.first().map_or(0, Vec::len);
        match m.iter().find(|row| row.len() != first) {
            Some(row) => Err(HybridError::ShapeMismatch {
                left_cols: first,
                right_cols: row.len(),
            }),
            None => Ok(first),
        }
    };
    let (ca, cb) = (cols(a)?, cols(b)?);
    if !a.is_empty() && !b.is_empty() && ca != cb {
        return Err(HybridError::ShapeMismatch {
            left_cols: ca,
            right_cols: cb,
        });
    }

    let centred = |m: &[Vec<f64>]| -> Vec<Vec<f64>> {
        m.iter()
            .map(|row| {
                let mean = qhx_stats::mean(row);
                row.iter().map(|v| v - mean).collect()
            })
            .collect()
    };
    let (ac, bc) = (centred(a), centred(b));

    Ok(ac
        .iter()
        .map(|ra| {
            bc.iter()
                .map(|rb| ra.iter().zip(rb).map(|(x, y)| x * y).sum())
                .collect()
        })
        .collect())
}
