//! Pure conversion functions: TOML config structs -> crate API config types.

use std::path::Path;

use anyhow::{Context, Result, bail};

use crate::config::*;

use qhx_detect::{AnalysisMode, DetectionConfig, TiktokSignal, TimeUnit};
use qhx_hybrid::{MatchStrategy, PeakConfig, ReconcileConfig, SignificanceConfig};
use qhx_io::{ColumnNames, Compression, OutlierMethod, ReaderConfig, WriterConfig};
use qhx_wavelet::{SuperletConfig, WaveletKind};
use qhx_wwz::WwzConfig;

/// Output table format.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Csv,
    Parquet,
}

/// Parses a compression algorithm name.
pub fn parse_compression(s: &str) -> Result<Compression> {
    s.parse::<Compression>()
        .with_context(|| format!("invalid [io] compression: {s:?}"))
}

/// Parses an outlier cleaning method name.
pub fn parse_outliers(s: &str) -> Result<OutlierMethod> {
    s.parse::<OutlierMethod>()
        .with_context(|| format!("invalid [io] outliers: {s:?}"))
}

/// Parses a cross-band matching strategy name.
pub fn parse_match_strategy(s: &str) -> Result<MatchStrategy> {
    s.parse::<MatchStrategy>()
        .with_context(|| format!("invalid [reconcile] match_strategy: {s:?}"))
}

/// Parses a superlet wavelet family name.
pub fn parse_wavelet(s: &str) -> Result<WaveletKind> {
    s.parse::<WaveletKind>()
        .with_context(|| format!("invalid [superlet] wavelet: {s:?}"))
}

/// Parses a mock time unit name.
pub fn parse_time_unit(s: &str) -> Result<TimeUnit> {
    s.parse::<TimeUnit>()
        .with_context(|| format!("invalid time unit: {s:?}"))
}

/// Resolves the output format from an explicit name or the file extension.
pub fn parse_output_format(format: Option<&str>, path: &Path) -> Result<OutputFormat> {
    let name = match format {
        Some(f) => f.to_lowercase(),
        None => path
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_lowercase)
            .unwrap_or_default(),
    };
    match name.as_str() {
        "csv" => Ok(OutputFormat::Csv),
        "parquet" | "pq" => Ok(OutputFormat::Parquet),
        "" => bail!(
            "cannot infer output format of {}; set [io] format",
            path.display()
        ),
        other => bail!("unknown output format: {other:?} (expected csv or parquet)"),
    }
}

/// Builds the band selection from `[batch] mode` and `bands`.
pub fn parse_mode(batch: &BatchToml) -> Result<AnalysisMode> {
    match batch.mode.to_lowercase().as_str() {
        "dynamic" => {
            if !batch.bands.is_empty() {
                bail!("[batch] bands is only used with mode = \"fixed\"");
            }
            Ok(AnalysisMode::Dynamic)
        }
        "fixed" => {
            if batch.bands.is_empty() {
                bail!("[batch] mode = \"fixed\" needs a non-empty bands list");
            }
            Ok(AnalysisMode::fixed(batch.bands.iter().cloned()))
        }
        other => bail!("unknown [batch] mode: {other:?} (expected dynamic or fixed)"),
    }
}

/// Builds a [`ColumnNames`] from the TOML column section.
pub fn build_column_names(columns: &ColumnsToml) -> ColumnNames {
    ColumnNames {
        object_id: columns.object_id.clone(),
        band: columns.band.clone(),
        time: columns.time.clone(),
        magnitude: columns.magnitude.clone(),
        error: columns.error.clone(),
    }
}

/// Builds the injected signal from `[io.inject]`.
pub fn build_injection(inject: &InjectToml) -> Result<TiktokSignal> {
    let signal = TiktokSignal::new(
        inject.initial_period,
        inject.amplitude_damping,
        inject.frequency_damping,
    )
    .context("invalid [io.inject]")?;
    match inject.snr {
        Some(snr) => signal.with_snr(snr).context("invalid [io.inject] snr"),
        None => Ok(signal),
    }
}

/// Builds a [`ReaderConfig`] from the TOML I/O configuration.
pub fn build_reader_config(io: &IoConfig, seed: u64) -> Result<ReaderConfig> {
    let injection = io.inject.as_ref().map(build_injection).transpose()?;
    let mut cfg = ReaderConfig::default()
        .with_columns(build_column_names(&io.columns))
        .with_include_errors(io.include_errors)
        .with_seed(seed)
        .with_outliers(parse_outliers(&io.outliers)?, io.outlier_threshold)
        .with_injection(injection);
    for (stored, name) in &io.band_map {
        cfg = cfg.with_band_alias(stored.as_str(), name.as_str());
    }
    Ok(cfg)
}

/// Builds a [`WriterConfig`] from the TOML I/O configuration.
pub fn build_writer_config(io: &IoConfig) -> Result<WriterConfig> {
    Ok(WriterConfig::default()
        .with_compression(parse_compression(&io.compression)?)
        .with_row_group_size(io.row_group_size))
}

/// Builds a [`WwzConfig`] from the TOML grid section.
///
/// Either both period bounds are set or neither; unset bounds are
/// estimated per object from its sampling.
pub fn build_wwz_config(grid: &GridToml) -> Result<WwzConfig> {
    let cfg = WwzConfig::new(grid.ntau, grid.ngrid).with_decay_factor(grid.decay_factor);
    match (grid.min_period, grid.max_period) {
        (Some(min), Some(max)) => Ok(cfg.with_period_bounds(min, max)),
        (None, None) => Ok(cfg),
        _ => bail!("[grid] min_period and max_period must be set together"),
    }
}

/// Builds a [`PeakConfig`] from the TOML peaks section.
pub fn build_peak_config(peaks: &PeaksToml) -> PeakConfig {
    PeakConfig::new()
        .with_peak_height(peaks.peak_height)
        .with_prominence(peaks.prominence)
        .with_fwhm_fraction(peaks.fwhm_fraction)
}

/// Builds a [`ReconcileConfig`] from the reconcile and significance sections.
pub fn build_reconcile_config(
    reconcile: &ReconcileToml,
    significance: &SignificanceToml,
) -> Result<ReconcileConfig> {
    let signif = SignificanceConfig::new(significance.num_significance_trials)
        .with_mag_errors(significance.use_mag_errors);
    Ok(ReconcileConfig::new()
        .with_relative_tolerance(reconcile.relative_tolerance)
        .with_strategy(parse_match_strategy(&reconcile.match_strategy)?)
        .with_significance(signif))
}

/// Builds the full [`DetectionConfig`] and checks it.
pub fn build_detection_config(config: &QhxConfig) -> Result<DetectionConfig> {
    let detection = DetectionConfig::new()
        .with_wwz(build_wwz_config(&config.grid)?)
        .with_peaks(build_peak_config(&config.peaks))
        .with_reconcile(build_reconcile_config(
            &config.reconcile,
            &config.significance,
        )?)
        .with_min_points(config.batch.min_points)
        .with_mode(parse_mode(&config.batch)?);
    detection
        .validate()
        .context("invalid detection configuration")?;
    Ok(detection)
}

/// Builds a [`SuperletConfig`] from the TOML superlet section.
pub fn build_superlet_config(superlet: &SuperletToml) -> Result<SuperletConfig> {
    if superlet.order_min == 0 || superlet.order_max < superlet.order_min {
        bail!(
            "[superlet] needs 1 <= order_min <= order_max, got {}..{}",
            superlet.order_min,
            superlet.order_max
        );
    }
    if !superlet.c_1.is_finite() || superlet.c_1 <= 0.0 {
        bail!("[superlet] c_1 must be positive, got {}", superlet.c_1);
    }
    Ok(SuperletConfig::new(superlet.order_max)
        .with_order_min(superlet.order_min)
        .with_c_1(superlet.c_1)
        .with_adaptive(superlet.adaptive)
        .with_wavelet(parse_wavelet(&superlet.wavelet)?))
}
