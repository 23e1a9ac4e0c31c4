//! Which bands of an object take part in a detection.

use crate::band::BandId;
use crate::source::ObjectLightCurves;

/// Band selection policy.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub enum AnalysisMode {
    /// Exactly these bands, in this order. A band the object lacks is
    /// treated as having no data.
    Fixed {
        /// Bands to analyse.
        bands: Vec<BandId>,
    },
    /// Every band the object has, in ascending order.
    #[default]
    Dynamic,
}

impl AnalysisMode {
    /// Fixed mode over the given band names.
    pub fn fixed<I, B>(bands: I) -> Self
    where
        I: IntoIterator<Item = B>,
        B: Into<BandId>,
    {
        AnalysisMode::Fixed {
            bands: bands.into_iter().map(Into::into).collect(),
        }
    }

    /// Bands of `object` selected by this mode.
    pub fn select(&self, object: &ObjectLightCurves) -> Vec<BandId> {
        match self {
            AnalysisMode::Fixed { bands } => bands.clone(),
            AnalysisMode::Dynamic => object.band_ids().cloned().collect(),
        }
    }

    /// Short name, `"fixed"` or `"dynamic"`.
    pub fn name(&self) -> &'static str {
        match self {
            AnalysisMode::Fixed { .. } => "fixed",
            AnalysisMode::Dynamic => "dynamic",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::light_curve::LightCurve;

    #[test]
    fn selection() {
        let lc = LightCurve::new(vec![0.0, 1.0], vec![0.0, 0.0], None).unwrap();
        let obj = ObjectLightCurves::new("x")
            .with_band("r", lc.clone())
            .with_band("g", lc);
        let dynamic: Vec<String> = AnalysisMode::Dynamic
            .select(&obj)
            .iter()
            .map(ToString::to_string)
            .collect();
        assert_eq!(dynamic, vec!["g", "r"]);

        let fixed = AnalysisMode::fixed(["r", "i", "g"]);
        let picked: Vec<String> = fixed.select(&obj).iter().map(ToString::to_string).collect();
        assert_eq!(picked, vec!["r", "i", "g"]);
        assert_eq!(fixed.name(), "fixed");
        assert_eq!(AnalysisMode::default().name(), "dynamic");
    }
}
