//! Small dense linear solvers.
//!
//! [`solve_small`] is stack-allocated and sized at compile time for the
//! 3x3 normal equations of the weighted sinusoid fit; [`solve_dense`] handles
//! the variable-size tridiagonal-plus-end-condition systems of the spline.

/// Pivots smaller than this are treated as singular.
const PIVOT_EPS: f64 = 1e-14;

/// Solves `a * x = b` for a fixed-size square system by Gaussian
/// elimination with partial pivoting.
///
/// Returns `None` when the matrix is singular to working precision.
pub fn solve_small<const N: usize>(mut a: [[f64; N]; N], mut b: [f64; N]) -> Option<[f64; N]> {
    let scale = a
        .iter()
        .flat_map(|row| row.iter())
        .fold(0.0_f64, |m, v| m.max(v.abs()));
    if scale == 0.0 || !scale.is_finite() {
        return None;
    }

    for col in 0..N {
        let pivot = (col..N).max_by(|&i, &j| {
            a[i][col]
                .abs()
                .partial_cmp(&a[j][col].abs())
                .unwrap_or(std::cmp::Ordering::Equal)
        })?;
        if a[pivot][col].abs() <= PIVOT_EPS * scale {
            return None;
        }
        a.swap(col, pivot);
        b.swap(col, pivot);

        for row in col + 1..N {
            let factor = a[row][col] / a[col][col];
            if factor == 0.0 {
                continue;
            }
            for k in col..N {
                a[row][k] -= factor * a[col][k];
            }
            b[row] -= factor * b[col];
        }
    }

    let mut x = [0.0; N];
    for row in (0..N).rev() {
        let tail: f64 = (row + 1..N).map(|k| a[row][k] * x[k]).sum();
        x[row] = (b[row] - tail) / a[row][row];
    }
    Some(x)
}

/// Heap-backed counterpart of [`solve_small`] for systems whose size is only
/// known at run time.
///
/// Returns `None` on a shape mismatch or a singular matrix.
pub fn solve_dense(mut a: Vec<Vec<f64>>, mut b: Vec<f64>) -> Option<Vec<f64>> {
    let n = b.len();
    if a.len() != n || a.iter().any(|row| row.len() != n) {
        return None;
    }
    let scale = a
        .iter()
        .flat_map(|row| row.iter())
        .fold(0.0_f64, |m, v| m.max(v.abs()));
    if n == 0 || scale == 0.0 || !scale.is_finite() {
        return None;
    }

    for col in 0..n {
        let pivot = (col..n).max_by(|&i, &j| {
            a[i][col]
                .abs()
                .partial_cmp(&a[j][col].abs())
                .unwrap_or(std::cmp::Ordering::Equal)
        })?;
        if a[pivot][col].abs() <= PIVOT_EPS * scale {
            return None;
        }
        a.swap(col, pivot);
        b.swap(col, pivot);

        for row in col + 1..n {
            let factor = a[row][col] / a[col][col];
            if factor == 0.0 {
                continue;
            }
            for k in col..n {
                a[row][k] -= factor * a[col][k];
            }
            b[row] -= factor * b[col];
        }
    }

    let mut x = vec![0.0; n];
    for row in (0..n).rev() {
        let tail: f64 = (row + 1..n).map(|k| a[row][k] * x[k]).sum();
        x[row] = (b[row] - tail) / a[row][row];
    }
    Some(x)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_solve_small_3x3() {
        // x = [1, -2, 3]
        let a = [[2.0, 1.0, -1.0], [-3.0, -1.0, 2.0], [-2.0, 1.0, 2.0]];
        let b = [
            2.0 * 1.0 + 1.0 * -2.0 - 3.0,
            -3.0 * 1.0 + 2.0 + 6.0,
            -2.0 - 2.0 + 6.0,
        ];
        let x = solve_small(a, b).unwrap();
        assert_relative_eq!(x[0], 1.0, epsilon = 1e-12);
        assert_relative_eq!(x[1], -2.0, epsilon = 1e-12);
        assert_relative_eq!(x[2], 3.0, epsilon = 1e-12);
    }

    #[test]
    fn test_solve_small_needs_pivoting() {
        let a = [[0.0, 1.0], [1.0, 0.0]];
        let x = solve_small(a, [5.0, 7.0]).unwrap();
        assert_relative_eq!(x[0], 7.0);
        assert_relative_eq!(x[1], 5.0);
    }

    #[test]
    fn test_solve_small_singular() {
        let a = [[1.0, 2.0], [2.0, 4.0]];
        assert!(solve_small(a, [1.0, 2.0]).is_none());
        assert!(solve_small([[0.0; 2]; 2], [0.0, 0.0]).is_none());
    }

    #[test]
    fn test_solve_dense_matches_small() {
        let a = [[4.0, 1.0, 0.0], [1.0, 4.0, 1.0], [0.0, 1.0, 4.0]];
        let b = [1.0, 2.0, 3.0];
        let small = solve_small(a, b).unwrap();
        let dense = solve_dense(a.iter().map(|r| r.to_vec()).collect(), b.to_vec()).unwrap();
        for (s, d) in small.iter().zip(dense.iter()) {
            assert_relative_eq!(s, d, epsilon = 1e-14);
        }
    }

    #[test]
    fn test_solve_dense_shape_mismatch() {
        assert!(solve_dense(vec![vec![1.0, 0.0]], vec![1.0]).is_none());
        assert!(solve_dense(vec![], vec![]).is_none());
    }
}
