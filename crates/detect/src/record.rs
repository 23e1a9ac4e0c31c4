//! Flat output records of a detection.

/// One common period of a band pair, or the absence of one.
///
/// A null record has NaN in `period`, both errors and `significance`; it
/// marks a pair that was analysed without agreement and must be kept.
#[derive(Clone, Debug, PartialEq)]
pub struct CommonPeriodRecord {
    /// Object identifier.
    pub object_id: String,
    /// Mean sampling interval of the first band (days).
    pub sampling_i: f64,
    /// Mean sampling interval of the second band (days).
    pub sampling_j: f64,
    /// Common period (days).
    pub period: f64,
    /// Upper period error, -1 when unknown.
    pub upper_error: f64,
    /// Lower period error, -1 when unknown.
    pub lower_error: f64,
    /// Shuffle significance in `[0, 1]`.
    pub significance: f64,
    /// Band pair, `"a-b"`.
    pub label: String,
}

impl CommonPeriodRecord {
    /// A record for a pair with no common period.
    pub fn null(object_id: impl Into<String>, sampling_i: f64, sampling_j: f64, label: impl Into<String>) -> Self {
        Self {
            object_id: object_id.into(),
            sampling_i,
            sampling_j,
            period: f64::NAN,
            upper_error: f64::NAN,
            lower_error: f64::NAN,
            significance: f64::NAN,
            label: label.into(),
        }
    }

    /// Returns `true` for a no-detection record.
    pub fn is_null(&self) -> bool {
        self.period.is_nan()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn null_record_keeps_label_and_sampling() {
        let r = CommonPeriodRecord::null("42", 3.5, 4.0, "g-r");
        assert!(r.is_null());
        assert!(r.upper_error.is_nan() && r.lower_error.is_nan() && r.significance.is_nan());
        assert_eq!(r.label, "g-r");
        assert_eq!(r.sampling_i, 3.5);
    }
}
