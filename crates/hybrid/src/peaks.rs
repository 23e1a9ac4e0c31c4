//! Local-maximum search with height and topographic-prominence filters.

/// Indices of strict local maxima of `y`.
///
/// A flat top counts as one maximum at the middle of the plateau (rounded
/// down). The first and last samples are never peaks.
pub fn local_maxima(y: &[f64]) -> Vec<usize> {
    let mut peaks = Vec::new();
    if y.len() < 3 {
        return peaks;
    }
    let last = y.len() - 1;
    let mut i = 1;
    while i < last {
        if y[i - 1] < y[i] {
            let mut ahead = i + 1;
            while ahead < last && y[ahead] == y[i] {
                ahead += 1;
            }
            if y[ahead] < y[i] {
                peaks.push((i + ahead - 1) / 2);
                i = ahead;
                continue;
            }
        }
        i += 1;
    }
    peaks
}

/// Topographic prominence of the sample at `peak`.
///
/// On each side the scan continues while values stay at or below the peak,
/// tracking the lowest value seen; the prominence is the height above the
/// higher of those two minima.
pub fn peak_prominence(y: &[f64], peak: usize) -> f64 {
    let height = y[peak];

    let mut left_min = height;
    for &v in y[..peak].iter().rev() {
        if v > height {
            break;
        }
        left_min = left_min.min(v);
    }

    let mut right_min = height;
    for &v in &y[peak + 1..] {
        if v > height {
            break;
        }
        right_min = right_min.min(v);
    }

    height - left_min.max(right_min)
}

/// Local maxima of `y` with height at least `height` and prominence at
/// least `prominence`, in ascending index order.
pub fn find_peaks(y: &[f64], height: f64, prominence: f64) -> Vec<usize> {
    local_maxima(y)
        .into_iter()
        .filter(|&p| y[p] >= height)
        .filter(|&p| peak_prominence(y, p) >= prominence)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn strict_maxima_exclude_edges() {
        let y = [3.0, 1.0, 2.0, 1.0, 4.0];
        assert_eq!(local_maxima(&y), vec![2]);
    }

    #[test]
    fn plateau_reports_its_middle() {
        let y = [0.0, 1.0, 1.0, 1.0, 0.0];
        assert_eq!(local_maxima(&y), vec![2]);
        let y = [0.0, 1.0, 1.0, 0.0];
        assert_eq!(local_maxima(&y), vec![1]);
        // plateau running into the edge is not a peak
        let y = [0.0, 1.0, 1.0];
        assert!(local_maxima(&y).is_empty());
    }

    #[test]
    fn short_inputs_have_no_peaks() {
        assert!(local_maxima(&[]).is_empty());
        assert!(local_maxima(&[1.0, 2.0]).is_empty());
    }

    #[test]
    fn prominence_uses_higher_base() {
        let y = [0.0, 1.0, 0.5, 3.0, 0.2, 0.0];
        // peak at 1: left base 0.0, right scan stops at 3.0 with min 0.5
        assert_relative_eq!(peak_prominence(&y, 1), 0.5);
        // peak at 3: both sides reach the edges
        assert_relative_eq!(peak_prominence(&y, 3), 3.0);
    }

    #[test]
    fn prominence_scan_passes_equal_heights() {
        let y = [0.0, 1.0, 0.4, 1.0, 0.1];
        // equal neighbour does not stop the scan
        assert_relative_eq!(peak_prominence(&y, 1), 0.9);
    }

    #[test]
    fn filters_apply_together() {
        let y = [0.0, 0.5, 0.0, 1.0, 0.9, 0.95, 0.0];
        assert_eq!(local_maxima(&y), vec![1, 3, 5]);
        assert_eq!(find_peaks(&y, 0.6, 0.7), vec![3]);
        assert_eq!(find_peaks(&y, 0.0, 0.0), vec![1, 3, 5]);
    }
}
