//! Where light curves come from.

use std::collections::BTreeMap;

use crate::band::BandId;
use crate::error::DetectError;
use crate::light_curve::LightCurve;

/// All cleaned light curves of one object, keyed by band.
///
/// This is the only data a detection worker sees.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ObjectLightCurves {
    object_id: String,
    bands: BTreeMap<BandId, LightCurve>,
}

impl ObjectLightCurves {
    /// Creates an object with no bands.
    pub fn new(object_id: impl Into<String>) -> Self {
        Self {
            object_id: object_id.into(),
            bands: BTreeMap::new(),
        }
    }

    /// Adds or replaces the light curve of `band`.
    pub fn with_band(mut self, band: impl Into<BandId>, curve: LightCurve) -> Self {
        self.insert(band, curve);
        self
    }

    /// Adds or replaces the light curve of `band`.
    pub fn insert(&mut self, band: impl Into<BandId>, curve: LightCurve) {
        self.bands.insert(band.into(), curve);
    }

    /// Object identifier.
    pub fn object_id(&self) -> &str {
        &self.object_id
    }

    /// Light curve of `band`, if observed.
    pub fn band(&self, band: &BandId) -> Option<&LightCurve> {
        self.bands.get(band)
    }

    /// Observed bands in ascending order.
    pub fn band_ids(&self) -> impl Iterator<Item = &BandId> {
        self.bands.keys()
    }

    /// Number of observed bands.
    pub fn n_bands(&self) -> usize {
        self.bands.len()
    }
}

/// Supplies per-object light curves to the detector.
///
/// Implementations are shared read-only across batch workers.
pub trait LightCurveSource: Sync {
    /// Identifiers of every object the source can supply.
    fn object_ids(&self) -> Vec<String>;

    /// The light curves of one object.
    ///
    /// # Errors
    ///
    /// [`DetectError::ObjectNotFound`] for unknown identifiers; other
    /// variants as the implementation requires.
    fn load(&self, object_id: &str) -> Result<ObjectLightCurves, DetectError>;
}

/// A source holding every object in memory.
#[derive(Clone, Debug, Default)]
pub struct MemorySource {
    objects: BTreeMap<String, ObjectLightCurves>,
}

impl MemorySource {
    /// Creates an empty source.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds or replaces an object.
    pub fn insert(&mut self, object: ObjectLightCurves) {
        self.objects.insert(object.object_id.clone(), object);
    }

    /// Number of objects.
    pub fn len(&self) -> usize {
        self.objects.len()
    }

    /// Returns `true` when the source holds no objects.
    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }
}

impl FromIterator<ObjectLightCurves> for MemorySource {
    fn from_iter<I: IntoIterator<Item = ObjectLightCurves>>(iter: I) -> Self {
        let mut source = Self::new();
        for object in iter {
            source.insert(object);
        }
        source
    }
}

impl LightCurveSource for MemorySource {
    fn object_ids(&self) -> Vec<String> {
        self.objects.keys().cloned().collect()
    }

    fn load(&self, object_id: &str) -> Result<ObjectLightCurves, DetectError> {
        self.objects
            .get(object_id)
            .cloned()
            .ok_or_else(|| DetectError::ObjectNotFound {
                set_id: object_id.to_string(),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lc(n: usize) -> LightCurve {
        LightCurve::new((0..n).map(|i| i as f64).collect(), vec![0.0; n], None).unwrap()
    }

    #[test]
    fn memory_source_round_trip() {
        let source: MemorySource = [
            ObjectLightCurves::new("b").with_band("r", lc(3)).with_band("g", lc(2)),
            ObjectLightCurves::new("a"),
        ]
        .into_iter()
        .collect();
        assert_eq!(source.len(), 2);
        assert_eq!(source.object_ids(), vec!["a", "b"]);

        let b = source.load("b").unwrap();
        let bands: Vec<&str> = b.band_ids().map(BandId::as_str).collect();
        assert_eq!(bands, vec!["g", "r"]);
        assert_eq!(b.band(&BandId::new("r")).map(LightCurve::len), Some(3));
        assert!(b.band(&BandId::new("z")).is_none());

        assert!(matches!(
            source.load("zz"),
            Err(DetectError::ObjectNotFound { .. })
        ));
    }
}
