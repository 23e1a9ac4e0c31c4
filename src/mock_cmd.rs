//! Mock command: synthetic multi-band light curve written as an observation table.

use anyhow::{Context, Result, bail};
use rand::{Rng, SeedableRng};
use rand::rngs::StdRng;
use tracing::{debug, info, info_span};

use qhx_detect::{
    DrwMock, LightCurve, MockLightCurve, ObjectLightCurves, OscillationPeriod,
    remove_fraction_with_seed,
};
use qhx_io::{ColumnNames, WriterConfig, write_observations_parquet};

use crate::cli::MockArgs;
use crate::convert;

/// Generate and write the mock object.
pub fn run(args: MockArgs) -> Result<()> {
    let _cmd = info_span!("mock").entered();

    let seed = args.seed.unwrap_or_else(rand::random);
    info!(seed, "using seed");
    let mut rng = StdRng::seed_from_u64(seed);

    let object = build_object(&args, &mut rng)?;
    write_observations_parquet(
        &args.output,
        std::slice::from_ref(&object),
        &ColumnNames::default(),
        &WriterConfig::default(),
    )
    .with_context(|| format!("failed to write mock table: {}", args.output.display()))?;
    info!(
        path = %args.output.display(),
        object_id = %args.object_id,
        n_bands = object.n_bands(),
        "mock light curve written"
    );
    Ok(())
}

/// One independent draw per band, all sharing the generator settings.
fn build_object(args: &MockArgs, rng: &mut StdRng) -> Result<ObjectLightCurves> {
    if args.bands.is_empty() {
        bail!("at least one band is required");
    }
    if let Some(err) = args.mag_error {
        if !err.is_finite() || err < 0.0 {
            bail!("mag_error must be finite and >= 0, got {err}");
        }
    }
    let unit = convert::parse_time_unit(&args.unit)?;
    let generator = MockLightCurve::new()
        .with_time_interval(args.time_interval, unit)
        .with_num_points(args.num_points)
        .with_period(args.period)
        .with_amplitude(args.amplitude)
        .with_remove_fraction(args.remove_fraction)
        .with_magnitude(args.magnitude);
    let drw = args.drw.then(|| {
        let oscillation = (args.amplitude != 0.0)
            .then_some((args.amplitude, OscillationPeriod::Days(args.period)));
        DrwMock::new(generator.span_days())
            .with_cadence(args.cadence)
            .with_oscillation(oscillation)
    });
    if drw.is_some() && !(0.0..1.0).contains(&args.remove_fraction) {
        bail!("remove_fraction must be in [0, 1), got {}", args.remove_fraction);
    }

    let mut object = ObjectLightCurves::new(args.object_id.as_str());
    for band in &args.bands {
        let band = band.trim();
        if band.is_empty() {
            bail!("empty band name in {:?}", args.bands);
        }
        let curve = match &drw {
            Some(drw) => {
                let walk = drw
                    .generate(rng)
                    .with_context(|| format!("DRW generation failed for band {band}"))?
                    .curve;
                let seed: u64 = rng.random();
                LightCurve::new(
                    remove_fraction_with_seed(walk.time(), args.remove_fraction, seed),
                    remove_fraction_with_seed(walk.magnitude(), args.remove_fraction, seed),
                    None,
                )?
            }
            None => generator
                .generate(rng)
                .with_context(|| format!("mock generation failed for band {band}"))?,
        };
        let curve = match args.mag_error {
            Some(err) => {
                let n = curve.len();
                LightCurve::new(curve.time().to_vec(), curve.magnitude().to_vec(), Some(vec![err; n]))?
            }
            None => curve,
        };
        debug!(band, n = curve.len(), "band generated");
        object.insert(band, curve);
    }
    Ok(object)
}
