//! Per-object detection: band analysis and pairwise reconciliation.
//!
//! An [`ObjectDetector`] walks one object through four steps:
//!
//! ```text
//! NotStarted --load--> BandsLoaded --analyze--> PerBandAnalyzed
//!     --reconcile--> PairsReconciled --finish--> Done
//! ```
//!
//! Any step may move the detector to `Failed`. A band that is missing,
//! too short, or whose transform fails does not fail the object: every
//! pair it belongs to gets a null record. The object fails only when no
//! selected band is usable or the frequency grid cannot be built.

use std::fmt;

use qhx_hybrid::{
    BandInput, PeakConfig, PeriodDetection, ReconcileConfig, hybrid2d, periods, same_periods,
};
use qhx_wwz::{FrequencyGrid, MIN_POINTS, WwzConfig, WwzError, estimate_wavelet_periods};
use rand::Rng;
use tracing::{debug, info, warn};

use crate::band::{BandId, pair_label};
use crate::error::DetectError;
use crate::light_curve::LightCurve;
use crate::mode::AnalysisMode;
use crate::record::CommonPeriodRecord;
use crate::source::ObjectLightCurves;

/// Default minimum number of observations for a band to be analysed.
pub const DEFAULT_MIN_POINTS: usize = 100;

/// Everything a per-object detection needs.
///
/// When the WWZ configuration has no period bounds they are estimated per
/// object from the timestamps of all usable bands.
#[derive(Clone, Debug, PartialEq)]
pub struct DetectionConfig {
    wwz: WwzConfig,
    peaks: PeakConfig,
    reconcile: ReconcileConfig,
    min_points: usize,
    mode: AnalysisMode,
}

impl Default for DetectionConfig {
    fn default() -> Self {
        Self {
            wwz: WwzConfig::default(),
            peaks: PeakConfig::default(),
            reconcile: ReconcileConfig::default(),
            min_points: DEFAULT_MIN_POINTS,
            mode: AnalysisMode::default(),
        }
    }
}

impl DetectionConfig {
    /// Default configuration: dynamic mode, 100 points per band, no period bounds.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the WWZ parameters.
    pub fn with_wwz(mut self, wwz: WwzConfig) -> Self {
        self.wwz = wwz;
        self
    }

    /// Sets the peak thresholds.
    pub fn with_peaks(mut self, peaks: PeakConfig) -> Self {
        self.peaks = peaks;
        self
    }

    /// Sets the cross-band matching parameters.
    pub fn with_reconcile(mut self, reconcile: ReconcileConfig) -> Self {
        self.reconcile = reconcile;
        self
    }

    /// Sets the minimum number of observations per band.
    pub fn with_min_points(mut self, min_points: usize) -> Self {
        self.min_points = min_points;
        self
    }

    /// Sets the band selection policy.
    pub fn with_mode(mut self, mode: AnalysisMode) -> Self {
        self.mode = mode;
        self
    }

    /// WWZ parameters.
    pub fn wwz(&self) -> &WwzConfig {
        &self.wwz
    }

    /// Peak thresholds.
    pub fn peaks(&self) -> &PeakConfig {
        &self.peaks
    }

    /// Cross-band matching parameters.
    pub fn reconcile(&self) -> &ReconcileConfig {
        &self.reconcile
    }

    /// Minimum number of observations per band.
    pub fn min_points(&self) -> usize {
        self.min_points
    }

    /// Band selection policy.
    pub fn mode(&self) -> &AnalysisMode {
        &self.mode
    }

    /// Checks every parameter that does not depend on the data.
    ///
    /// Period bounds, when set, must produce a valid grid.
    ///
    /// # Errors
    ///
    /// [`DetectError::InvalidConfig`], or the grid error from
    /// [`WwzConfig::grid`].
    pub fn validate(&self) -> Result<(), DetectError> {
        if self.min_points < MIN_POINTS {
            return Err(DetectError::InvalidConfig(format!(
                "min_points must be at least {MIN_POINTS}, got {}",
                self.min_points
            )));
        }
        if self.wwz.ntau() == 0 || self.wwz.ngrid() == 0 {
            return Err(DetectError::InvalidConfig(
                "ntau and ngrid must be positive".to_string(),
            ));
        }
        let rtol = self.reconcile.relative_tolerance();
        if !rtol.is_finite() || rtol < 0.0 {
            return Err(DetectError::InvalidConfig(format!(
                "relative_tolerance must be finite and non-negative, got {rtol}"
            )));
        }
        if self.reconcile.significance().num_trials() == 0 {
            return Err(DetectError::InvalidConfig(
                "num_trials must be positive".to_string(),
            ));
        }
        if matches!(&self.mode, AnalysisMode::Fixed { bands } if bands.is_empty()) {
            return Err(DetectError::InvalidConfig(
                "fixed mode needs at least one band".to_string(),
            ));
        }
        self.peaks.validate()?;
        if self.wwz.min_period().is_some() || self.wwz.max_period().is_some() {
            self.wwz.grid()?;
        }
        Ok(())
    }
}

/// Step of the detection a failure belongs to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Stage {
    /// Selecting bands and checking their data.
    Load,
    /// WWZ, correlation and peak extraction of one band.
    Analyze,
    /// Cross-band matching and significance.
    Reconcile,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Stage::Load => "load",
            Stage::Analyze => "analyze",
            Stage::Reconcile => "reconcile",
        })
    }
}

/// Progress of an [`ObjectDetector`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DetectionState {
    /// Nothing has run.
    NotStarted,
    /// Bands selected and the frequency grid fixed.
    BandsLoaded,
    /// Peaks extracted for every usable band.
    PerBandAnalyzed,
    /// Records built for every band pair.
    PairsReconciled,
    /// Report handed out.
    Done,
    /// Terminal; `stage` is the step that failed.
    Failed {
        /// Step that failed.
        stage: Stage,
    },
}

impl fmt::Display for DetectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DetectionState::Failed { stage } => write!(f, "Failed({stage})"),
            other => write!(f, "{other:?}"),
        }
    }
}

/// A band that could not take part in the detection.
#[derive(Clone, Debug)]
pub struct BandFailure {
    /// The band.
    pub band: BandId,
    /// Where it failed.
    pub stage: Stage,
    /// Why.
    pub error: DetectError,
}

/// Outcome of a successful per-object detection.
#[derive(Clone, Debug, Default)]
pub struct ObjectReport {
    /// Object identifier.
    pub object_id: String,
    /// One record per common period, or one null record per pair without any.
    pub records: Vec<CommonPeriodRecord>,
    /// Bands that were skipped, with the reason.
    pub band_failures: Vec<BandFailure>,
}

struct BandSlot<'a> {
    id: BandId,
    curve: Option<&'a LightCurve>,
    detection: Option<PeriodDetection>,
}

impl BandSlot<'_> {
    fn sampling(&self) -> f64 {
        self.curve.map_or(f64::NAN, LightCurve::mean_sampling)
    }

    fn input(&self) -> Option<BandInput<'_>> {
        let curve = self.curve?;
        let detection = self.detection.as_ref()?;
        Some(BandInput {
            time: curve.time(),
            magnitude: curve.magnitude(),
            errors: curve.errors(),
            detection,
        })
    }
}

/// Runs the detection of one object step by step.
pub struct ObjectDetector<'a> {
    object: &'a ObjectLightCurves,
    config: &'a DetectionConfig,
    state: DetectionState,
    wwz: WwzConfig,
    grid: Option<FrequencyGrid>,
    bands: Vec<BandSlot<'a>>,
    records: Vec<CommonPeriodRecord>,
    failures: Vec<BandFailure>,
}

impl<'a> ObjectDetector<'a> {
    /// A detector in state [`DetectionState::NotStarted`].
    pub fn new(object: &'a ObjectLightCurves, config: &'a DetectionConfig) -> Self {
        Self {
            object,
            config,
            state: DetectionState::NotStarted,
            wwz: config.wwz.clone(),
            grid: None,
            bands: Vec::new(),
            records: Vec::new(),
            failures: Vec::new(),
        }
    }

    /// Current state.
    pub fn state(&self) -> DetectionState {
        self.state
    }

    /// WWZ parameters in use; period bounds are filled in by [`load`](Self::load).
    pub fn wwz(&self) -> &WwzConfig {
        &self.wwz
    }

    /// Bands skipped so far.
    pub fn band_failures(&self) -> &[BandFailure] {
        &self.failures
    }

    fn require(&self, expected: DetectionState, step: &'static str) -> Result<(), DetectError> {
        if self.state == expected {
            Ok(())
        } else {
            Err(DetectError::InvalidState {
                step,
                state: self.state.to_string(),
            })
        }
    }

    fn fail(&mut self, stage: Stage, err: DetectError) -> DetectError {
        self.state = DetectionState::Failed { stage };
        err
    }

    fn skip_band(&mut self, band: BandId, stage: Stage, error: DetectError) {
        warn!(object_id = self.object.object_id(), band = %band, %stage, error = %error, "band skipped");
        self.failures.push(BandFailure { band, stage, error });
    }

    /// Selects bands, checks their length and fixes the frequency grid.
    ///
    /// # Errors
    ///
    /// [`DetectError::InsufficientData`] when no selected band has enough
    /// points, [`DetectError::ObjectNotFound`] when no band is selected at
    /// all, and grid or configuration errors.
    pub fn load(&mut self) -> Result<(), DetectError> {
        self.require(DetectionState::NotStarted, "load")?;
        if let Err(e) = self.config.validate() {
            return Err(self.fail(Stage::Load, e));
        }

        let object = self.object;
        let selected = self.config.mode.select(object);
        if selected.is_empty() {
            let err = DetectError::ObjectNotFound {
                set_id: self.object.object_id().to_string(),
            };
            return Err(self.fail(Stage::Load, err));
        }

        let min = self.config.min_points;
        for id in selected {
            let curve = object.band(&id);
            let len = curve.map_or(0, LightCurve::len);
            let usable = curve.filter(|c| c.len() >= min);
            if usable.is_none() {
                let err = DetectError::InsufficientData {
                    band: id.clone(),
                    set_id: self.object.object_id().to_string(),
                    len,
                    min,
                };
                self.skip_band(id.clone(), Stage::Load, err);
            }
            self.bands.push(BandSlot {
                id,
                curve: usable,
                detection: None,
            });
        }

        if self.bands.iter().all(|b| b.curve.is_none()) {
            let err = self
                .failures
                .last()
                .map(|f| f.error.clone())
                .unwrap_or_else(|| DetectError::ObjectNotFound {
                    set_id: self.object.object_id().to_string(),
                });
            return Err(self.fail(Stage::Load, err));
        }

        if self.wwz.min_period().is_none() || self.wwz.max_period().is_none() {
            let times: Vec<f64> = self
                .bands
                .iter()
                .filter_map(|b| b.curve)
                .flat_map(|c| c.time().iter().copied())
                .collect();
            match estimate_wavelet_periods(&times, None) {
                Some((longer, shorter)) => {
                    debug!(longer, shorter, "estimated period bounds");
                    self.wwz = self.wwz.clone().with_period_bounds(longer, shorter);
                }
                None => {
                    let err = WwzError::InvalidFrequencyBounds {
                        reason: "cannot estimate period bounds from the sampling".to_string(),
                    };
                    return Err(self.fail(Stage::Load, err.into()));
                }
            }
        }
        match self.wwz.grid() {
            Ok(grid) => self.grid = Some(grid),
            Err(e) => return Err(self.fail(Stage::Load, e.into())),
        }

        self.state = DetectionState::BandsLoaded;
        Ok(())
    }

    /// Runs WWZ, correlation and peak extraction on every usable band.
    ///
    /// A band whose analysis fails is skipped.
    ///
    /// # Errors
    ///
    /// Only [`DetectError::InvalidState`].
    pub fn analyze(&mut self) -> Result<(), DetectError> {
        self.require(DetectionState::BandsLoaded, "analyze")?;
        let Some(grid) = self.grid else {
            let err = DetectError::InvalidState {
                step: "analyze",
                state: "no frequency grid".to_string(),
            };
            return Err(self.fail(Stage::Analyze, err));
        };

        let mut skipped = Vec::new();
        for slot in &mut self.bands {
            let Some(curve) = slot.curve else { continue };
            let outcome = hybrid2d(curve.time(), curve.magnitude(), &self.wwz)
                .and_then(|h| periods(h.correlation(), &grid, &self.config.peaks));
            match outcome {
                Ok(detection) => {
                    debug!(band = %slot.id, n_peaks = detection.peaks.len(), periods = ?detection.periods(), "band analysed");
                    slot.detection = Some(detection);
                }
                Err(e) => skipped.push((slot.id.clone(), DetectError::from(e))),
            }
        }
        for (band, err) in skipped {
            self.skip_band(band, Stage::Analyze, err);
        }

        self.state = DetectionState::PerBandAnalyzed;
        Ok(())
    }

    /// Matches the periods of every band pair and tests their significance.
    ///
    /// Pairs follow the band selection order. A pair with a skipped band or
    /// without common periods yields one null record.
    ///
    /// # Errors
    ///
    /// [`DetectError::InvalidState`], or a hard error from matching.
    pub fn reconcile<R: Rng + ?Sized>(&mut self, rng: &mut R) -> Result<(), DetectError> {
        self.require(DetectionState::PerBandAnalyzed, "reconcile")?;
        let object = self.object;
        let object_id = object.object_id();

        let mut records = Vec::new();
        for (i, a) in self.bands.iter().enumerate() {
            for b in &self.bands[i + 1..] {
                let label = pair_label(&a.id, &b.id);
                let (sampling_i, sampling_j) = (a.sampling(), b.sampling());
                let common = match (a.input(), b.input()) {
                    (Some(ia), Some(ib)) => {
                        match same_periods(&ia, &ib, &self.wwz, &self.config.reconcile, rng) {
                            Ok(common) => common,
                            Err(e) => {
                                self.state = DetectionState::Failed {
                                    stage: Stage::Reconcile,
                                };
                                return Err(e.into());
                            }
                        }
                    }
                    _ => Vec::new(),
                };
                debug!(pair = %label, n_common = common.len(), "pair reconciled");
                if common.is_empty() {
                    records.push(CommonPeriodRecord::null(object_id, sampling_i, sampling_j, label));
                    continue;
                }
                records.extend(common.into_iter().map(|c| CommonPeriodRecord {
                    object_id: object_id.to_string(),
                    sampling_i,
                    sampling_j,
                    period: c.period,
                    upper_error: c.upper_error,
                    lower_error: c.lower_error,
                    significance: c.significance,
                    label: label.clone(),
                }));
            }
        }
        self.records = records;

        self.state = DetectionState::PairsReconciled;
        Ok(())
    }

    /// Hands out the records and band failures.
    ///
    /// # Errors
    ///
    /// Only [`DetectError::InvalidState`].
    pub fn finish(&mut self) -> Result<ObjectReport, DetectError> {
        self.require(DetectionState::PairsReconciled, "finish")?;
        self.state = DetectionState::Done;
        Ok(ObjectReport {
            object_id: self.object.object_id().to_string(),
            records: std::mem::take(&mut self.records),
            band_failures: std::mem::take(&mut self.failures),
        })
    }

    /// Runs every remaining step.
    ///
    /// # Errors
    ///
    /// The first hard error; [`state`](Self::state) then tells the stage.
    pub fn run<R: Rng + ?Sized>(&mut self, rng: &mut R) -> Result<ObjectReport, DetectError> {
        if self.state == DetectionState::NotStarted {
            self.load()?;
        }
        if self.state == DetectionState::BandsLoaded {
            self.analyze()?;
        }
        if self.state == DetectionState::PerBandAnalyzed {
            self.reconcile(rng)?;
        }
        self.finish()
    }
}

/// Detects the periods common to the bands of one object.
///
/// # Errors
///
/// See [`ObjectDetector::load`] and [`ObjectDetector::reconcile`].
#[tracing::instrument(level = "info", skip_all, fields(object_id = object.object_id()))]
pub fn detect_object<R: Rng + ?Sized>(
    object: &ObjectLightCurves,
    config: &DetectionConfig,
    rng: &mut R,
) -> Result<ObjectReport, DetectError> {
    let report = ObjectDetector::new(object, config).run(rng)?;
    info!(
        n_records = report.records.len(),
        n_null = report.records.iter().filter(|r| r.is_null()).count(),
        n_skipped_bands = report.band_failures.len(),
        "object done"
    );
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    fn sine_curve(n: usize, period: f64, phase: f64) -> LightCurve {
        let time: Vec<f64> = (0..n).map(|i| i as f64 * 3.0 + 0.4 * ((i * 37) % 11) as f64).collect();
        let mag = time
            .iter()
            .enumerate()
            .map(|(i, t)| {
                20.0 + 0.5 * (2.0 * std::f64::consts::PI * t / period + phase).sin()
                    + 0.03 * ((i * 7919) % 101) as f64 / 101.0
            })
            .collect();
        LightCurve::new(time, mag, None).unwrap()
    }

    fn config() -> DetectionConfig {
        DetectionConfig::new()
            .with_wwz(WwzConfig::new(15, 40).with_period_bounds(200.0, 10.0))
            .with_reconcile(ReconcileConfig::new().with_significance(
                qhx_hybrid::SignificanceConfig::new(3),
            ))
    }

    #[test]
    fn steps_must_run_in_order() {
        let object = ObjectLightCurves::new("1").with_band("g", sine_curve(120, 50.0, 0.0));
        let config = config();
        let mut detector = ObjectDetector::new(&object, &config);
        let err = detector.analyze().unwrap_err();
        assert!(matches!(err, DetectError::InvalidState { step: "analyze", .. }));
        assert_eq!(detector.state(), DetectionState::NotStarted);
        detector.load().unwrap();
        assert_eq!(detector.state(), DetectionState::BandsLoaded);
        assert!(detector.load().is_err());
        let mut rng = StdRng::seed_from_u64(0);
        assert!(detector.reconcile(&mut rng).is_err());
    }

    #[test]
    fn all_bands_short_fails_with_insufficient_data() {
        let object = ObjectLightCurves::new("7")
            .with_band("g", sine_curve(20, 50.0, 0.0))
            .with_band("r", sine_curve(30, 50.0, 0.0));
        let config = config();
        let mut detector = ObjectDetector::new(&object, &config);
        let err = detector.load().unwrap_err();
        match err {
            DetectError::InsufficientData { band, set_id, len, min } => {
                assert_eq!(band.as_str(), "r");
                assert_eq!(set_id, "7");
                assert_eq!(len, 30);
                assert_eq!(min, DEFAULT_MIN_POINTS);
            }
            other => panic!("unexpected error {other}"),
        }
        assert_eq!(detector.state(), DetectionState::Failed { stage: Stage::Load });
        assert_eq!(detector.band_failures().len(), 2);
    }

    #[test]
    fn missing_band_gives_null_records_for_its_pairs() {
        let object = ObjectLightCurves::new("9")
            .with_band("g", sine_curve(150, 50.0, 0.0))
            .with_band("r", sine_curve(150, 50.0, 0.3));
        let config = config().with_mode(AnalysisMode::fixed(["g", "r", "i"]));
        let mut rng = StdRng::seed_from_u64(3);
        let report = detect_object(&object, &config, &mut rng).unwrap();

        assert_eq!(report.band_failures.len(), 1);
        assert_eq!(report.band_failures[0].band.as_str(), "i");
        assert_eq!(report.band_failures[0].stage, Stage::Load);

        let gi: Vec<_> = report.records.iter().filter(|r| r.label == "g-i").collect();
        let ri: Vec<_> = report.records.iter().filter(|r| r.label == "r-i").collect();
        assert_eq!(gi.len(), 1);
        assert_eq!(ri.len(), 1);
        assert!(gi[0].is_null() && ri[0].is_null());
        assert!(gi[0].sampling_j.is_nan());
        assert!(gi[0].sampling_i > 0.0);
        assert!(report.records.iter().any(|r| r.label == "g-r"));
    }

    #[test]
    fn invalid_config_is_rejected_before_any_work() {
        let object = ObjectLightCurves::new("1").with_band("g", sine_curve(120, 50.0, 0.0));
        let config = config().with_min_points(2);
        let mut detector = ObjectDetector::new(&object, &config);
        assert!(matches!(detector.load(), Err(DetectError::InvalidConfig(_))));

        let bad_bounds = self::config().with_wwz(WwzConfig::new(15, 40).with_period_bounds(10.0, 10.0));
        assert!(matches!(bad_bounds.validate(), Err(DetectError::Wwz(_))));
        assert!(DetectionConfig::new().validate().is_ok());
    }

    #[test]
    fn bounds_are_estimated_when_unset() {
        let object = ObjectLightCurves::new("1").with_band("g", sine_curve(120, 50.0, 0.0));
        let config = DetectionConfig::new().with_wwz(WwzConfig::new(10, 20));
        let mut detector = ObjectDetector::new(&object, &config);
        detector.load().unwrap();
        let wwz = detector.wwz();
        assert!(wwz.min_period().is_some() && wwz.max_period().is_some());
    }

    #[test]
    fn state_display() {
        assert_eq!(DetectionState::PairsReconciled.to_string(), "PairsReconciled");
        assert_eq!(
            DetectionState::Failed { stage: Stage::Analyze }.to_string(),
            "Failed(analyze)"
        );
    }
}
