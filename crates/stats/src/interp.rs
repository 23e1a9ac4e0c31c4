//! One-dimensional interpolation with linear extrapolation past the ends.

use crate::linalg::solve_dense;

/// Index `i` of the segment `[xp[i], xp[i+1]]` used for `x`, clamped to the
/// first and last segment so that out-of-range points extrapolate.
fn segment(xp: &[f64], x: f64) -> usize {
    let last = xp.len() - 2;
    match xp.partition_point(|&v| v <= x) {
        0 => 0,
        p => (p - 1).min(last),
    }
}

/// Piecewise-linear interpolation of `(xp, fp)` at each of `x`.
///
/// `xp` must be strictly increasing. Points outside `[xp[0], xp[n-1]]` are
/// extrapolated from the first or last segment. With fewer than two knots
/// the result is a constant (or NaN when there are none).
pub fn interp_linear(xp: &[f64], fp: &[f64], x: &[f64]) -> Vec<f64> {
    let n = xp.len().min(fp.len());
    match n {
        0 => return vec![f64::NAN; x.len()],
        1 => return vec![fp[0]; x.len()],
        _ => {}
    }
    let xp = &xp[..n];
    x.iter()
        .map(|&xi| {
            let i = segment(xp, xi);
            let slope = (fp[i + 1] - fp[i]) / (xp[i + 1] - xp[i]);
            fp[i] + slope * (xi - xp[i])
        })
        .collect()
}

/// Cubic interpolating spline with not-a-knot end conditions.
///
/// The knots are sorted on construction, so `x` may arrive in any order.
/// Evaluation outside the knot range extends the end polynomials.
#[derive(Debug, Clone)]
pub struct CubicSpline {
    x: Vec<f64>,
    y: Vec<f64>,
    /// Second derivatives at the knots.
    m: Vec<f64>,
}

impl CubicSpline {
    /// Builds the spline through `(x, y)`.
    ///
    /// Returns `None` if fewer than four points are given, any value is
    /// non-finite, or two abscissae coincide.
    pub fn new(x: &[f64], y: &[f64]) -> Option<Self> {
        if x.len() != y.len() || x.len() < 4 {
            return None;
        }
        if x.iter().chain(y.iter()).any(|v| !v.is_finite()) {
            return None;
        }

        let mut pairs: Vec<(f64, f64)> = x.iter().copied().zip(y.iter().copied()).collect();
        pairs.sort_by(|a, b| a.0.partial_cmp(&b.0).unwrap_or(std::cmp::Ordering::Equal));
        let (x, y): (Vec<f64>, Vec<f64>) = pairs.into_iter().unzip();
        if x.windows(2).any(|w| w[1] <= w[0]) {
            return None;
        }

        let n = x.len();
        let h: Vec<f64> = x.windows(2).map(|w| w[1] - w[0]).collect();
        let mut a = vec![vec![0.0; n]; n];
        let mut rhs = vec![0.0; n];

        // Continuity of the third derivative across the second and
        // second-to-last knots.
        a[0][0] = -h[1];
        a[0][1] = h[0] + h[1];
        a[0][2] = -h[0];
        a[n - 1][n - 3] = -h[n - 2];
        a[n - 1][n - 2] = h[n - 3] + h[n - 2];
        a[n - 1][n - 1] = -h[n - 3];

        for i in 1..n - 1 {
            a[i][i - 1] = h[i - 1];
            a[i][i] = 2.0 * (h[i - 1] + h[i]);
            a[i][i + 1] = h[i];
            rhs[i] = 6.0 * ((y[i + 1] - y[i]) / h[i] - (y[i] - y[i - 1]) / h[i - 1]);
        }

        let m = solve_dense(a, rhs)?;
        Some(Self { x, y, m })
    }

    /// Evaluates the spline at `t`.
    pub fn eval(&self, t: f64) -> f64 {
        let i = segment(&self.x, t);
        let h = self.x[i + 1] - self.x[i];
        let a = (self.x[i + 1] - t) / h;
        let b = (t - self.x[i]) / h;
        a * self.y[i]
            + b * self.y[i + 1]
            + ((a * a * a - a) * self.m[i] + (b * b * b - b) * self.m[i + 1]) * h * h / 6.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_interp_linear_inside() {
        let y = interp_linear(&[0.0, 1.0, 2.0], &[0.0, 10.0, 30.0], &[0.5, 1.5]);
        assert_relative_eq!(y[0], 5.0);
        assert_relative_eq!(y[1], 20.0);
    }

    #[test]
    fn test_interp_linear_extrapolates() {
        let y = interp_linear(&[0.0, 1.0, 2.0], &[0.0, 10.0, 30.0], &[-1.0, 3.0]);
        assert_relative_eq!(y[0], -10.0);
        assert_relative_eq!(y[1], 50.0);
    }

    #[test]
    fn test_interp_linear_at_knots() {
        let xp = [1.0, 2.0, 4.0];
        let fp = [3.0, -1.0, 7.0];
        let y = interp_linear(&xp, &fp, &xp);
        for (a, b) in y.iter().zip(fp.iter()) {
            assert_relative_eq!(a, b, epsilon = 1e-14);
        }
    }

    #[test]
    fn test_spline_reproduces_cubic() {
        // Not-a-knot splines are exact for cubic polynomials.
        let f = |t: f64| 0.5 * t * t * t - 2.0 * t * t + t - 3.0;
        let x = [0.0, 0.7, 1.5, 2.0, 3.1, 4.0];
        let y: Vec<f64> = x.iter().map(|&t| f(t)).collect();
        let spline = CubicSpline::new(&x, &y).unwrap();
        for t in [0.3, 1.0, 2.5, 3.9, -0.5, 4.5] {
            assert_relative_eq!(spline.eval(t), f(t), epsilon = 1e-9);
        }
    }

    #[test]
    fn test_spline_unsorted_input() {
        let x = [3.0, 1.0, 2.0, 0.0];
        let y: Vec<f64> = x.iter().map(|&t: &f64| t * t).collect();
        let spline = CubicSpline::new(&x, &y).unwrap();
        assert_relative_eq!(spline.eval(1.5), 2.25, epsilon = 1e-12);
    }

    #[test]
    fn test_spline_rejects_degenerate() {
        assert!(CubicSpline::new(&[0.0, 1.0, 2.0], &[0.0, 1.0, 4.0]).is_none());
        assert!(CubicSpline::new(&[0.0, 1.0, 1.0, 2.0], &[0.0, 1.0, 2.0, 3.0]).is_none());
        assert!(CubicSpline::new(&[0.0, 1.0, 2.0, f64::NAN], &[0.0; 4]).is_none());
    }
}
